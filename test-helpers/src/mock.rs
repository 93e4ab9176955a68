//! Scripted backend services.
//!
//! Each mock hands out a `handler()` closure with the same shape as the
//! real service functions, records every call it receives, and answers
//! from a script. Errors are `anyhow::Error` to stand in for transport
//! failures.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::anyhow;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{LocalBoxFuture, Ready, ready};
use payloads::{CallResult, Meta, Params};

type Scripted<T> = Result<CallResult<T>, anyhow::Error>;

/// A record with an id and a category, enough to exercise filtering and
/// paging.
#[derive(Debug, Clone, PartialEq)]
pub struct Pet {
    pub id: i64,
    pub category: String,
}

impl Pet {
    pub fn new(id: i64, category: &str) -> Self {
        Self {
            id,
            category: category.to_string(),
        }
    }
}

/// `count` pets alternating between the "dogs" and "cats" categories,
/// with ids starting at 1.
pub fn pets(count: i64) -> Vec<Pet> {
    (1..=count)
        .map(|id| Pet::new(id, if id % 2 == 1 { "dogs" } else { "cats" }))
        .collect()
}

/// A single-fetch or mutation endpoint answering from a queue.
pub struct MockCall<A, T> {
    responses: Rc<RefCell<VecDeque<Scripted<T>>>>,
    calls: Rc<RefCell<Vec<A>>>,
}

impl<A, T> Default for MockCall<A, T> {
    fn default() -> Self {
        Self {
            responses: Rc::new(RefCell::new(VecDeque::new())),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<A: 'static, T: 'static> MockCall<A, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_ok(&self, result: CallResult<T>) {
        self.responses.borrow_mut().push_back(Ok(result));
    }

    /// Queue a transport failure whose message is `message`.
    pub fn respond_err(&self, message: &str) {
        self.responses
            .borrow_mut()
            .push_back(Err(anyhow::Error::msg(message.to_string())));
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn handler(&self) -> impl Fn(A) -> Ready<Scripted<T>> + 'static {
        let responses = self.responses.clone();
        let calls = self.calls.clone();
        move |args| {
            calls.borrow_mut().push(args);
            let next = responses.borrow_mut().pop_front();
            ready(next.unwrap_or_else(|| Err(anyhow!("no scripted response"))))
        }
    }
}

impl<A: Clone, T> MockCall<A, T> {
    pub fn calls(&self) -> Vec<A> {
        self.calls.borrow().clone()
    }
}

/// An endpoint whose calls stay pending until the test releases them,
/// for observing in-flight state and ordering overlapping calls.
pub struct GatedCall<A, T> {
    senders: Rc<RefCell<Vec<Option<oneshot::Sender<Scripted<T>>>>>>,
    calls: Rc<RefCell<Vec<A>>>,
}

impl<A, T> Default for GatedCall<A, T> {
    fn default() -> Self {
        Self {
            senders: Rc::new(RefCell::new(Vec::new())),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<A: 'static, T: 'static> GatedCall<A, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(
        &self,
    ) -> impl Fn(A) -> LocalBoxFuture<'static, Scripted<T>> + 'static {
        let senders = self.senders.clone();
        let calls = self.calls.clone();
        move |args| {
            let (tx, rx) = oneshot::channel();
            senders.borrow_mut().push(Some(tx));
            calls.borrow_mut().push(args);
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(anyhow!("gate dropped unreleased")))
            }
            .boxed_local()
        }
    }

    /// Number of calls still waiting to be released.
    pub fn pending(&self) -> usize {
        self.senders.borrow().iter().filter(|s| s.is_some()).count()
    }

    /// Settle the `index`-th call (in arrival order) with `result`.
    pub fn release_ok(&self, index: usize, result: CallResult<T>) {
        self.release(index, Ok(result));
    }

    pub fn release_err(&self, index: usize, message: &str) {
        self.release(index, Err(anyhow::Error::msg(message.to_string())));
    }

    fn release(&self, index: usize, outcome: Scripted<T>) {
        let sender = self
            .senders
            .borrow_mut()
            .get_mut(index)
            .and_then(Option::take)
            .unwrap_or_else(|| panic!("call {index} is not pending"));
        if sender.send(outcome).is_err() {
            panic!("call {index} was dropped before release");
        }
    }
}

impl<A: Clone, T> GatedCall<A, T> {
    pub fn calls(&self) -> Vec<A> {
        self.calls.borrow().clone()
    }
}

type Filter<T> = Rc<dyn Fn(&T, &Params) -> bool>;

/// A paged list endpoint over a fixed dataset.
///
/// Serves `page_size` items per page and reports `currentPage`, `hasNext`,
/// `pages` and `total` in its meta. Scripted responses, when queued, are
/// served first.
pub struct MockListService<T> {
    items: Rc<Vec<T>>,
    page_size: usize,
    filter: Option<Filter<T>>,
    report_has_next: bool,
    scripted: Rc<RefCell<VecDeque<Scripted<Vec<T>>>>>,
    calls: Rc<RefCell<Vec<Params>>>,
}

impl<T: Clone + 'static> MockListService<T> {
    pub fn paged(items: Vec<T>, page_size: usize) -> Self {
        Self {
            items: Rc::new(items),
            page_size: page_size.max(1),
            filter: None,
            report_has_next: true,
            scripted: Rc::new(RefCell::new(VecDeque::new())),
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// A service with no dataset that only answers scripted responses.
    pub fn scripted() -> Self {
        Self::paged(Vec::new(), 1)
    }

    /// Keep only the items `filter` accepts for the requested params.
    pub fn with_filter(
        mut self,
        filter: impl Fn(&T, &Params) -> bool + 'static,
    ) -> Self {
        self.filter = Some(Rc::new(filter));
        self
    }

    /// Leave `hasNext` out of the meta, like backends that only report
    /// page counts.
    pub fn without_has_next(mut self) -> Self {
        self.report_has_next = false;
        self
    }

    pub fn respond_ok(&self, result: CallResult<Vec<T>>) {
        self.scripted.borrow_mut().push_back(Ok(result));
    }

    pub fn respond_err(&self, message: &str) {
        self.scripted
            .borrow_mut()
            .push_back(Err(anyhow::Error::msg(message.to_string())));
    }

    pub fn calls(&self) -> Vec<Params> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn handler(
        &self,
    ) -> impl Fn(Params) -> Ready<Scripted<Vec<T>>> + 'static {
        let items = self.items.clone();
        let page_size = self.page_size;
        let filter = self.filter.clone();
        let report_has_next = self.report_has_next;
        let scripted = self.scripted.clone();
        let calls = self.calls.clone();

        move |params: Params| {
            calls.borrow_mut().push(params.clone());
            if let Some(next) = scripted.borrow_mut().pop_front() {
                return ready(next);
            }

            let matching: Vec<T> = items
                .iter()
                .filter(|item| {
                    filter.as_ref().is_none_or(|f| f(*item, &params))
                })
                .cloned()
                .collect();
            let page = params.page().unwrap_or(1).max(1);
            let start = (page as usize - 1) * page_size;
            let data: Vec<T> =
                matching.iter().skip(start).take(page_size).cloned().collect();
            let total = matching.len();

            let meta = Meta {
                pages: Some(total.div_ceil(page_size) as u64),
                current_page: Some(page),
                has_next: report_has_next
                    .then_some(start + page_size < total),
                total: Some(total as u64),
                ..Meta::default()
            };
            ready(Ok(CallResult::success_with_meta(data, meta)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_paged_service_reports_meta() {
        let service = MockListService::paged(pets(5), 2);
        let handler = service.handler();

        let first = block_on(handler(Params::new())).unwrap();
        assert_eq!(first.data().unwrap().len(), 2);
        assert_eq!(first.meta().unwrap().has_next, Some(true));
        assert_eq!(first.meta().unwrap().pages, Some(3));

        let last = block_on(handler(Params::page_only(3))).unwrap();
        assert_eq!(last.data().unwrap(), &vec![Pet::new(5, "dogs")]);
        assert_eq!(last.meta().unwrap().has_next, Some(false));
        assert_eq!(service.call_count(), 2);
    }

    #[test]
    fn test_filter_applies_to_params() {
        let service = MockListService::paged(pets(6), 10).with_filter(
            |pet: &Pet, params| {
                params
                    .get("category")
                    .and_then(|c| c.as_str())
                    .is_none_or(|c| c == pet.category)
            },
        );
        let handler = service.handler();

        let cats = block_on(handler(Params::new().with("category", "cats")))
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(cats.iter().map(|p| p.id).collect::<Vec<_>>(), [2, 4, 6]);
    }

    #[test]
    fn test_unscripted_mock_call_errors() {
        let mock = MockCall::<(), i32>::new();
        let outcome = block_on(mock.handler()(()));
        assert!(outcome.is_err());
    }
}
