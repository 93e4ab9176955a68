//! State-managed wrappers around backend calls.
//!
//! Each wrapper owns a private piece of state behind `Rc<RefCell<_>>` and
//! mutates it only from its own methods. The Yew hooks in the submodules
//! build these wrappers on top of `use_mut_ref` and re-render through
//! `use_force_update` whenever the state changes.

use std::cell::RefCell;
use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use payloads::CallResult;

pub mod use_api;
pub mod use_api_form;
pub mod use_books;
pub mod use_file_upload;
pub mod use_gallery;
pub mod use_paginated_api;
pub mod use_stories;
pub mod use_tours;

pub use use_api::{ApiCall, RequestState, UseApiHandle, UseApiOptions, use_api};
pub use use_api_form::{
    FormState, FormSubmit, UseApiFormHandle, UseApiFormOptions, use_api_form,
};
pub use use_file_upload::{
    FileUpload, ProgressReporter, UploadState, UseFileUploadHandle,
    use_file_upload,
};
pub use use_books::use_books;
pub use use_gallery::{use_gallery, use_gallery_upload};
pub use use_paginated_api::{
    PaginatedApi, PaginatedState, UsePaginatedApiHandle, use_paginated_api,
};
pub use use_stories::{
    use_create_story, use_delete_story, use_stories, use_story,
    use_update_story,
};
pub use use_tours::use_tours;

pub const API_CALL_FAILED: &str = "API call failed";
pub const FETCH_FAILED: &str = "Failed to fetch data";
pub const FORM_SUBMISSION_FAILED: &str = "Form submission failed";
pub const UPLOAD_FAILED: &str = "Upload failed";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// Wrapped backend call with its error type erased to a message.
pub(crate) type ApiFn<A, T> =
    Rc<dyn Fn(A) -> LocalBoxFuture<'static, Result<CallResult<T>, String>>>;

/// Callback invoked with the outcome of a submit or upload.
pub type ResultCallback<T> = Rc<dyn Fn(&CallResult<T>)>;

pub(crate) fn erase<A, T, F, Fut, E>(api_fn: F) -> ApiFn<A, T>
where
    F: Fn(A) -> Fut + 'static,
    Fut: Future<Output = Result<CallResult<T>, E>> + 'static,
    E: Display,
{
    Rc::new(move |args| {
        let fut = api_fn(args);
        async move { fut.await.map_err(|e| e.to_string()) }.boxed_local()
    })
}

/// Message for a call that returned an error instead of a result.
pub(crate) fn exception_message(error: String) -> String {
    if error.trim().is_empty() {
        UNEXPECTED_ERROR.to_string()
    } else {
        error
    }
}

/// Message for a logical failure, falling back to `fallback` when the
/// backend sent none.
pub(crate) fn failure_message(
    message: Option<&str>,
    fallback: &str,
) -> String {
    message.unwrap_or(fallback).to_string()
}

/// State cell shared between a wrapper and the component rendering it.
pub(crate) struct Shared<S> {
    state: Rc<RefCell<S>>,
    listener: Option<Rc<dyn Fn()>>,
}

impl<S> Clone for Shared<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            listener: self.listener.clone(),
        }
    }
}

impl<S> Shared<S> {
    pub(crate) fn new(state: S) -> Self {
        Self::from_cell(Rc::new(RefCell::new(state)))
    }

    pub(crate) fn from_cell(state: Rc<RefCell<S>>) -> Self {
        Self {
            state,
            listener: None,
        }
    }

    pub(crate) fn with_listener(
        mut self,
        listener: impl Fn() + 'static,
    ) -> Self {
        self.listener = Some(Rc::new(listener));
        self
    }

    /// Mutate the state, then notify the listener. The borrow is released
    /// before the listener runs so a synchronous re-render can read it.
    pub(crate) fn update(&self, f: impl FnOnce(&mut S)) {
        f(&mut self.state.borrow_mut());
        self.notify();
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.borrow())
    }

    fn notify(&self) {
        if let Some(listener) = &self.listener {
            listener();
        }
    }
}

impl<S: Clone> Shared<S> {
    pub(crate) fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }
}

/// Marks an operation as in flight for as long as it lives.
///
/// Dropping the guard clears the flag, so it is released on every exit
/// path: normal return, a panic inside the wrapped call or a callback, and
/// the owning future being dropped before it settles.
pub(crate) struct InFlight<S> {
    shared: Shared<S>,
    release: fn(&mut S),
}

impl<S> InFlight<S> {
    pub(crate) fn begin(
        shared: &Shared<S>,
        acquire: impl FnOnce(&mut S),
        release: fn(&mut S),
    ) -> Self {
        shared.update(acquire);
        Self {
            shared: shared.clone(),
            release,
        }
    }
}

impl<S> Drop for InFlight<S> {
    fn drop(&mut self) {
        self.shared.update(self.release);
    }
}

/// Tracks the deps a hook last ran its effect for.
///
/// `observe` is called once per render; it reports the first value and
/// every value that differs from the previous one.
#[derive(Debug)]
pub(crate) struct DepsGate<D> {
    last: Option<D>,
}

impl<D> Default for DepsGate<D> {
    fn default() -> Self {
        Self { last: None }
    }
}

impl<D: PartialEq + Clone> DepsGate<D> {
    pub(crate) fn observe(&mut self, deps: &D) -> bool {
        if self.last.as_ref() == Some(deps) {
            return false;
        }
        self.last = Some(deps.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Clone, Default)]
    struct Flag {
        on: bool,
    }

    #[test]
    fn test_update_notifies_after_releasing_borrow() {
        let cell = Rc::new(RefCell::new(Flag::default()));
        let observed = Rc::new(Cell::new(false));
        let shared = {
            let cell = cell.clone();
            let observed = observed.clone();
            Shared::from_cell(cell.clone())
                .with_listener(move || observed.set(cell.borrow().on))
        };

        shared.update(|flag| flag.on = true);
        assert!(observed.get());
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let shared = Shared::new(Flag::default());
        {
            let _guard =
                InFlight::begin(&shared, |f| f.on = true, |f| f.on = false);
            assert!(shared.snapshot().on);
        }
        assert!(!shared.snapshot().on);
    }

    #[test]
    fn test_in_flight_guard_releases_during_unwind() {
        let shared = Shared::new(Flag::default());
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
            || {
                let _guard = InFlight::begin(
                    &shared,
                    |f| f.on = true,
                    |f| f.on = false,
                );
                shared.update(|_| panic!("listener blew up"));
            },
        ));
        assert!(outcome.is_err());
        assert!(!shared.snapshot().on);
    }

    #[test]
    fn test_deps_gate_fires_on_first_value_and_changes() {
        let mut gate = DepsGate::default();
        let fired: Vec<bool> =
            [7, 7, 8, 8, 7].iter().map(|id| gate.observe(id)).collect();
        assert_eq!(fired, vec![true, false, true, false, true]);
    }

    #[test]
    fn test_exception_message_falls_back_when_blank() {
        assert_eq!(exception_message("timeout".into()), "timeout");
        assert_eq!(exception_message("  ".into()), UNEXPECTED_ERROR);
    }
}
