use std::cell::RefCell;
use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;

use payloads::{CallResult, Meta, Params};
use yew::prelude::*;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use super::{
    ApiFn, DepsGate, FETCH_FAILED, InFlight, Shared, erase,
    exception_message, failure_message,
};

/// A list accumulated across pages of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedState<T> {
    pub data: Vec<T>,
    pub meta: Meta,
    pub loading: bool,
    pub error: Option<String>,
    /// Params of the last successful fetch, the baseline for the next one.
    pub params: Params,
}

impl<T> PaginatedState<T> {
    pub fn new(initial_params: Params) -> Self {
        Self {
            data: Vec::new(),
            meta: Meta::default(),
            loading: false,
            error: None,
            params: initial_params,
        }
    }

    pub fn has_more(&self) -> bool {
        self.meta.has_next()
    }
}

impl<T> Default for PaginatedState<T> {
    fn default() -> Self {
        Self::new(Params::new())
    }
}

/// A paged list endpoint normalized into a [`PaginatedState`].
///
/// Requests for page 2 and beyond append to `data` in arrival order; any
/// other request replaces it. Changing filters through `update_params`
/// always restarts at page 1.
pub struct PaginatedApi<T> {
    list_fn: ApiFn<Params, Vec<T>>,
    shared: Shared<PaginatedState<T>>,
}

impl<T> Clone for PaginatedApi<T> {
    fn clone(&self) -> Self {
        Self {
            list_fn: self.list_fn.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + 'static> PaginatedApi<T> {
    pub fn new<F, Fut, E>(list_fn: F, initial_params: Params) -> Self
    where
        F: Fn(Params) -> Fut + 'static,
        Fut: Future<Output = Result<CallResult<Vec<T>>, E>> + 'static,
        E: Display,
    {
        Self {
            list_fn: erase(list_fn),
            shared: Shared::new(PaginatedState::new(initial_params)),
        }
    }

    pub fn with_state<F, Fut, E>(
        list_fn: F,
        state: Rc<RefCell<PaginatedState<T>>>,
    ) -> Self
    where
        F: Fn(Params) -> Fut + 'static,
        Fut: Future<Output = Result<CallResult<Vec<T>>, E>> + 'static,
        E: Display,
    {
        Self {
            list_fn: erase(list_fn),
            shared: Shared::from_cell(state),
        }
    }

    pub fn with_listener(mut self, listener: impl Fn() + 'static) -> Self {
        self.shared = self.shared.with_listener(listener);
        self
    }

    /// Fetch with `new_params` merged over the stored params.
    ///
    /// Only `new_params` decides between append and replace: a page above
    /// 1 appends, anything else (including no page at all) replaces. The
    /// merged params become the new baseline only when the fetch succeeds.
    pub async fn fetch_data(&self, new_params: Params) -> CallResult<Vec<T>> {
        let merged =
            self.shared.read(|state| state.params.merged(&new_params));
        let append = new_params.page().is_some_and(|page| page > 1);

        let _in_flight = InFlight::begin(
            &self.shared,
            |state| {
                state.loading = true;
                state.error = None;
            },
            |state| state.loading = false,
        );

        tracing::debug!(?merged, append, "Fetching list page");
        match (self.list_fn)(merged.clone()).await {
            Ok(CallResult::Success { data, meta }) => {
                self.shared.update(|state| {
                    if append {
                        state.data.extend(data.iter().cloned());
                    } else {
                        state.data = data.clone();
                    }
                    state.meta = meta.clone().unwrap_or_default();
                    state.params = merged;
                });
                CallResult::Success { data, meta }
            }
            Ok(CallResult::Failure { message }) => {
                let error = failure_message(message.as_deref(), FETCH_FAILED);
                tracing::warn!("List fetch failed: {error}");
                self.shared.update(|state| state.error = Some(error));
                CallResult::Failure { message }
            }
            Err(e) => {
                let message = exception_message(e);
                tracing::error!("List fetch raised: {message}");
                self.shared
                    .update(|state| state.error = Some(message.clone()));
                CallResult::failure(message)
            }
        }
    }

    /// Append the next page. Returns `None` without calling the backend
    /// when the last response did not report `hasNext`, the reported page
    /// has no successor, or a fetch is already running.
    pub async fn load_more(&self) -> Option<CallResult<Vec<T>>> {
        let next_page = self.shared.read(|state| {
            if !state.meta.has_next() || state.loading {
                return None;
            }
            state.meta.current_page.unwrap_or(1).checked_add(1)
        });
        let Some(next_page) = next_page else {
            tracing::debug!("No more pages to load");
            return None;
        };
        Some(self.fetch_data(Params::page_only(next_page)).await)
    }

    /// Reload page 1 with the current filters, replacing the list.
    pub async fn refresh(&self) -> CallResult<Vec<T>> {
        self.fetch_data(Params::page_only(1)).await
    }

    /// Apply new filters and restart at page 1.
    pub async fn update_params(
        &self,
        new_params: Params,
    ) -> CallResult<Vec<T>> {
        self.fetch_data(new_params.with_page(1)).await
    }

    pub fn has_more(&self) -> bool {
        self.shared.read(PaginatedState::has_more)
    }

    pub fn is_loading(&self) -> bool {
        self.shared.read(|state| state.loading)
    }

    pub fn state(&self) -> PaginatedState<T> {
        self.shared.snapshot()
    }
}

/// The fetch `use_paginated_api` starts after a render: page data for
/// the stored params, on mount and whenever deps take a new value.
pub(crate) fn initial_fetch<T: Clone + 'static>(
    api: &PaginatedApi<T>,
    deps_changed: bool,
) -> Option<LocalBoxFuture<'static, CallResult<Vec<T>>>> {
    if !deps_changed {
        return None;
    }
    let api = api.clone();
    Some(async move { api.fetch_data(Params::new()).await }.boxed_local())
}

/// Hook return type for a paged list
pub struct UsePaginatedApiHandle<T> {
    pub data: Vec<T>,
    pub meta: Meta,
    pub loading: bool,
    pub error: Option<String>,
    pub params: Params,
    pub has_more: bool,
    pub fetch_data: Callback<Params>,
    pub load_more: Callback<()>,
    pub refresh: Callback<()>,
    pub update_params: Callback<Params>,
    pub api: PaginatedApi<T>,
}

impl<T> UsePaginatedApiHandle<T> {
    /// Returns true while the first page is still on its way.
    pub fn is_initial_loading(&self) -> bool {
        self.loading && self.data.is_empty() && self.error.is_none()
    }
}

/// Manage a growing list fed by a paged endpoint.
///
/// Fetches with `initial_params` on mount and again whenever `deps`
/// change. The accumulated list survives dep changes until the next
/// successful fetch replaces it.
#[hook]
pub fn use_paginated_api<T, D, F, Fut, E>(
    deps: D,
    list_fn: F,
    initial_params: Params,
) -> UsePaginatedApiHandle<T>
where
    T: Clone + 'static,
    D: PartialEq + Clone + 'static,
    F: Fn(Params) -> Fut + 'static,
    Fut: Future<Output = Result<CallResult<Vec<T>>, E>> + 'static,
    E: Display + 'static,
{
    let force_update = use_force_update();
    let state = use_mut_ref(move || PaginatedState::<T>::new(initial_params));

    let gate = use_mut_ref(DepsGate::<D>::default);
    let deps_changed = gate.borrow_mut().observe(&deps);

    let api = {
        let state = state.clone();
        use_memo(deps, move |_| {
            PaginatedApi::with_state(list_fn, state)
                .with_listener(move || force_update.force_update())
        })
    };

    // Initial fetch on mount and when deps change
    {
        let api = api.clone();
        use_effect(move || {
            if let Some(fetch) = initial_fetch(&api, deps_changed) {
                yew::platform::spawn_local(async move {
                    fetch.await;
                });
            }
        });
    }

    let fetch_data = {
        let api = api.clone();
        Callback::from(move |params: Params| {
            let api = (*api).clone();
            yew::platform::spawn_local(async move {
                api.fetch_data(params).await;
            });
        })
    };

    let load_more = {
        let api = api.clone();
        Callback::from(move |_| {
            let api = (*api).clone();
            yew::platform::spawn_local(async move {
                api.load_more().await;
            });
        })
    };

    let refresh = {
        let api = api.clone();
        Callback::from(move |_| {
            let api = (*api).clone();
            yew::platform::spawn_local(async move {
                api.refresh().await;
            });
        })
    };

    let update_params = {
        let api = api.clone();
        Callback::from(move |params: Params| {
            let api = (*api).clone();
            yew::platform::spawn_local(async move {
                api.update_params(params).await;
            });
        })
    };

    let current = state.borrow().clone();
    let has_more = current.has_more();

    UsePaginatedApiHandle {
        data: current.data,
        meta: current.meta,
        loading: current.loading,
        error: current.error,
        params: current.params,
        has_more,
        fetch_data,
        load_more,
        refresh,
        update_params,
        api: (*api).clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;
    use test_helpers::{GatedCall, MockListService, Pet, pets, yield_now};

    fn ids(api: &PaginatedApi<Pet>) -> Vec<i64> {
        api.state().data.iter().map(|pet| pet.id).collect()
    }

    fn by_category() -> impl Fn(&Pet, &Params) -> bool + 'static {
        |pet: &Pet, params: &Params| {
            params
                .get("category")
                .and_then(|c| c.as_str())
                .is_none_or(|c| c == pet.category)
        }
    }

    #[test]
    fn test_first_page_replaces() {
        let service = MockListService::paged(pets(5), 2);
        let api = PaginatedApi::new(service.handler(), Params::new());

        let result = block_on(api.fetch_data(Params::page_only(1)));

        assert_eq!(result.data().unwrap().len(), 2);
        assert_eq!(ids(&api), vec![1, 2]);
        assert!(api.has_more());
    }

    #[test]
    fn test_page_one_replaces_even_after_appending() {
        let service = MockListService::paged(pets(6), 2);
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(api.fetch_data(Params::new()));
        block_on(api.fetch_data(Params::page_only(2)));
        assert_eq!(ids(&api), vec![1, 2, 3, 4]);

        let result = block_on(api.fetch_data(Params::page_only(1)));
        assert_eq!(api.state().data.len(), result.data().unwrap().len());
        assert_eq!(ids(&api), vec![1, 2]);
    }

    #[test]
    fn test_later_page_appends_in_arrival_order() {
        let service = MockListService::<i32>::scripted();
        service.respond_ok(CallResult::success(vec![1, 2]));
        service.respond_ok(CallResult::success(vec![3, 4]));
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(api.fetch_data(Params::new()));
        block_on(api.fetch_data(Params::page_only(2)));

        assert_eq!(api.state().data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_merges_params_over_stored_baseline() {
        let service = MockListService::paged(pets(4), 10);
        let api = PaginatedApi::new(
            service.handler(),
            Params::new().with("sort", "newest").with("limit", 10),
        );

        block_on(api.fetch_data(Params::new().with("sort", "oldest")));

        let sent = &service.calls()[0];
        assert_eq!(sent.get("sort"), Some(&json!("oldest")));
        assert_eq!(sent.get("limit"), Some(&json!(10)));
        assert_eq!(api.state().params, *sent);
    }

    #[test]
    fn test_missing_meta_defaults_to_empty() {
        let service = MockListService::<i32>::scripted();
        service.respond_ok(CallResult::success(vec![1]));
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(api.fetch_data(Params::new()));

        assert_eq!(api.state().meta, Meta::default());
        assert!(!api.has_more());
    }

    #[test]
    fn test_failure_keeps_data_and_params() {
        let service = MockListService::paged(pets(4), 2);
        service.respond_ok(CallResult::success(vec![Pet::new(1, "dogs")]));
        service.respond_ok(CallResult::Failure { message: None });
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(api.fetch_data(Params::new().with("category", "dogs")));
        let result =
            block_on(api.fetch_data(Params::new().with("category", "cats")));

        assert_eq!(result, CallResult::Failure { message: None });
        let state = api.state();
        assert_eq!(state.error.as_deref(), Some(FETCH_FAILED));
        assert_eq!(state.data, vec![Pet::new(1, "dogs")]);
        assert_eq!(state.params.get("category"), Some(&json!("dogs")));
        assert!(!state.loading);
    }

    #[test]
    fn test_exception_sets_error() {
        let service = MockListService::<i32>::scripted();
        service.respond_err("502 Bad Gateway");
        let api = PaginatedApi::new(service.handler(), Params::new());

        let result = block_on(api.fetch_data(Params::new()));

        assert_eq!(result, CallResult::failure("502 Bad Gateway"));
        assert_eq!(api.state().error.as_deref(), Some("502 Bad Gateway"));
        assert!(!api.is_loading());
    }

    #[test]
    fn test_load_more_requests_next_page() {
        let service = MockListService::paged(pets(5), 2);
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(api.refresh());
        let result = block_on(api.load_more());

        assert!(result.is_some_and(|r| r.is_success()));
        assert_eq!(service.calls()[1].page(), Some(2));
        assert_eq!(ids(&api), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_load_more_is_noop_without_has_next() {
        let service = MockListService::paged(pets(5), 2).without_has_next();
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(api.fetch_data(Params::new()));
        let result = block_on(api.load_more());

        assert_eq!(result, None);
        assert_eq!(service.call_count(), 1);
        assert!(!api.has_more());
    }

    #[test]
    fn test_load_more_is_noop_when_current_page_is_last_possible() {
        let service = MockListService::<Pet>::scripted();
        service.respond_ok(CallResult::success_with_meta(
            pets(2),
            Meta {
                current_page: Some(u64::MAX),
                has_next: Some(true),
                ..Meta::default()
            },
        ));
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(api.fetch_data(Params::new()));
        let result = block_on(api.load_more());

        assert_eq!(result, None);
        assert_eq!(service.call_count(), 1);
        assert_eq!(ids(&api), vec![1, 2]);
    }

    #[test]
    fn test_load_more_is_noop_before_first_fetch() {
        let service = MockListService::paged(pets(5), 2);
        let api = PaginatedApi::new(service.handler(), Params::new());

        assert_eq!(block_on(api.load_more()), None);
        assert_eq!(service.call_count(), 0);
    }

    #[test]
    fn test_load_more_is_noop_while_loading() {
        let gated = GatedCall::<Params, Vec<i32>>::new();
        let api = PaginatedApi::new(gated.handler(), Params::new());

        block_on(async {
            futures::join!(api.fetch_data(Params::new()), async {
                yield_now().await;
                gated.release_ok(
                    0,
                    CallResult::success_with_meta(
                        vec![1],
                        Meta {
                            has_next: Some(true),
                            current_page: Some(1),
                            ..Meta::default()
                        },
                    ),
                );
            });
        });
        assert!(api.has_more());

        block_on(async {
            futures::join!(api.load_more(), async {
                yield_now().await;
                assert!(api.is_loading());
                // a second trigger while page 2 is in flight does nothing
                assert_eq!(api.load_more().await, None);
                assert_eq!(gated.calls().len(), 2);
                gated.release_ok(1, CallResult::success(vec![2]));
            });
        });

        assert_eq!(api.state().data, vec![1, 2]);
    }

    #[test]
    fn test_update_params_resets_to_first_page() {
        let service =
            MockListService::paged(pets(10), 2).with_filter(by_category());
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(api.refresh());
        block_on(api.load_more());
        assert_eq!(ids(&api), vec![1, 2, 3, 4]);

        block_on(api.update_params(Params::new().with("category", "cats")));

        let sent = service.calls().last().cloned().unwrap();
        assert_eq!(sent.page(), Some(1));
        assert_eq!(sent.get("category"), Some(&json!("cats")));
        assert_eq!(ids(&api), vec![2, 4]);
    }

    #[test]
    fn test_update_params_overrides_explicit_page() {
        let service = MockListService::paged(pets(10), 2);
        let api = PaginatedApi::new(service.handler(), Params::new());

        block_on(
            api.update_params(Params::new().with("category", "x").with_page(4)),
        );

        assert_eq!(service.calls()[0].page(), Some(1));
    }

    #[test]
    fn test_refresh_keeps_filters() {
        let service =
            MockListService::paged(pets(10), 2).with_filter(by_category());
        let api = PaginatedApi::new(
            service.handler(),
            Params::new().with("category", "dogs"),
        );

        block_on(api.refresh());

        assert_eq!(ids(&api), vec![1, 3]);
        assert_eq!(service.calls()[0].get("category"), Some(&json!("dogs")));
    }

    /// Replays the per-render decisions `use_paginated_api` makes for each
    /// deps value, awaiting any fetch it starts.
    fn render_with_deps(api: &PaginatedApi<Pet>, renders: &[&str]) {
        let mut gate = DepsGate::default();
        for deps in renders {
            if let Some(fetch) = initial_fetch(api, gate.observe(deps)) {
                block_on(fetch);
            }
        }
    }

    #[test]
    fn test_mount_fetches_once_with_initial_params() {
        let service =
            MockListService::paged(pets(6), 2).with_filter(by_category());
        let api = PaginatedApi::new(
            service.handler(),
            Params::new().with("category", "cats"),
        );

        render_with_deps(&api, &["admin", "admin", "admin"]);

        assert_eq!(service.call_count(), 1);
        assert_eq!(
            service.calls(),
            vec![Params::new().with("category", "cats")]
        );
        assert_eq!(ids(&api), vec![2, 4]);
    }

    #[test]
    fn test_deps_change_fetches_again_and_replaces() {
        let service = MockListService::paged(pets(6), 2);
        let api = PaginatedApi::new(service.handler(), Params::new());

        render_with_deps(&api, &["admin", "admin", "public"]);

        assert_eq!(service.call_count(), 2);
        assert_eq!(ids(&api), vec![1, 2]);
    }
}
