use std::cell::RefCell;
use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;

use payloads::CallResult;
use yew::prelude::*;

use futures::FutureExt;
use futures::future::LocalBoxFuture;

use super::{
    API_CALL_FAILED, ApiFn, DepsGate, InFlight, Shared, erase,
    exception_message, failure_message,
};

/// Lifecycle of a single backend operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T> Default for RequestState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// One backend call normalized into a [`RequestState`].
///
/// Overlapping calls are not serialized: each one writes its own outcome
/// when it settles, so the last to settle wins, and the first to settle
/// clears `loading` while the others are still running.
pub struct ApiCall<A, T> {
    api_fn: ApiFn<A, T>,
    shared: Shared<RequestState<T>>,
}

impl<A, T> Clone for ApiCall<A, T> {
    fn clone(&self) -> Self {
        Self {
            api_fn: self.api_fn.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<A: 'static, T: Clone + 'static> ApiCall<A, T> {
    pub fn new<F, Fut, E>(api_fn: F) -> Self
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<CallResult<T>, E>> + 'static,
        E: Display,
    {
        Self {
            api_fn: erase(api_fn),
            shared: Shared::new(RequestState::default()),
        }
    }

    /// Build over an externally owned state cell, as the Yew hook does
    /// with `use_mut_ref`.
    pub fn with_state<F, Fut, E>(
        api_fn: F,
        state: Rc<RefCell<RequestState<T>>>,
    ) -> Self
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<CallResult<T>, E>> + 'static,
        E: Display,
    {
        Self {
            api_fn: erase(api_fn),
            shared: Shared::from_cell(state),
        }
    }

    /// Run `listener` after every state change.
    pub fn with_listener(mut self, listener: impl Fn() + 'static) -> Self {
        self.shared = self.shared.with_listener(listener);
        self
    }

    /// Invoke the wrapped call once and record its outcome.
    ///
    /// Never fails: errors are stored in `error` and also returned as a
    /// [`CallResult::Failure`].
    pub async fn execute(&self, args: A) -> CallResult<T> {
        let _in_flight = InFlight::begin(
            &self.shared,
            |state| {
                state.loading = true;
                state.error = None;
            },
            |state| state.loading = false,
        );

        match (self.api_fn)(args).await {
            Ok(CallResult::Success { data, meta }) => {
                self.shared.update(|state| state.data = Some(data.clone()));
                CallResult::Success { data, meta }
            }
            Ok(CallResult::Failure { message }) => {
                let error =
                    failure_message(message.as_deref(), API_CALL_FAILED);
                tracing::warn!("API call failed: {error}");
                self.shared.update(|state| state.error = Some(error));
                CallResult::Failure { message }
            }
            Err(e) => {
                let message = exception_message(e);
                tracing::error!("API call raised: {message}");
                self.shared
                    .update(|state| state.error = Some(message.clone()));
                CallResult::failure(message)
            }
        }
    }

    /// Back to `(None, false, None)`. An in-flight call is not cancelled
    /// and will still record its outcome when it settles.
    pub fn reset(&self) {
        self.shared.update(|state| *state = RequestState::default());
    }

    pub fn state(&self) -> RequestState<T> {
        self.shared.snapshot()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.read(|state| state.loading)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UseApiOptions {
    /// Execute with `A::default()` on mount and whenever deps change.
    pub immediate: bool,
}

impl UseApiOptions {
    pub fn immediate() -> Self {
        Self { immediate: true }
    }
}

/// The call an `immediate` hook starts after a render, if any.
///
/// Runs `execute(A::default())` when `deps_changed`, which is true on
/// mount and whenever deps take a new value.
pub(crate) fn immediate_call<A, T>(
    api: &ApiCall<A, T>,
    options: UseApiOptions,
    deps_changed: bool,
) -> Option<LocalBoxFuture<'static, CallResult<T>>>
where
    A: Default + 'static,
    T: Clone + 'static,
{
    if !(options.immediate && deps_changed) {
        return None;
    }
    let api = api.clone();
    Some(async move { api.execute(A::default()).await }.boxed_local())
}

/// Hook return type for a single wrapped call
pub struct UseApiHandle<A, T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    /// Fire-and-forget execution. Use `api` to await the result.
    pub execute: Callback<A>,
    pub reset: Callback<()>,
    pub api: ApiCall<A, T>,
}

/// Wrap one backend call in component state.
///
/// The wrapped function is captured when `deps` first take a value and
/// replaced whenever `deps` change, mirroring `use_callback`.
///
/// # Example
///
/// ```rust,ignore
/// #[hook]
/// pub fn use_story(story_id: StoryId) -> UseApiHandle<(), Story> {
///     use_api(
///         story_id,
///         move |()| async move {
///             get_api_client().get_story(story_id).await
///         },
///         UseApiOptions::immediate(),
///     )
/// }
/// ```
#[hook]
pub fn use_api<A, T, D, F, Fut, E>(
    deps: D,
    api_fn: F,
    options: UseApiOptions,
) -> UseApiHandle<A, T>
where
    A: Default + 'static,
    T: Clone + 'static,
    D: PartialEq + Clone + 'static,
    F: Fn(A) -> Fut + 'static,
    Fut: Future<Output = Result<CallResult<T>, E>> + 'static,
    E: Display + 'static,
{
    let force_update = use_force_update();
    let state = use_mut_ref(RequestState::<T>::default);
    let gate = use_mut_ref(DepsGate::<D>::default);
    let deps_changed = gate.borrow_mut().observe(&deps);

    let api = {
        let state = state.clone();
        use_memo(deps, move |_| {
            ApiCall::with_state(api_fn, state)
                .with_listener(move || force_update.force_update())
        })
    };

    // Execute on mount and when deps change
    {
        let api = api.clone();
        use_effect(move || {
            if let Some(call) = immediate_call(&api, options, deps_changed) {
                yew::platform::spawn_local(async move {
                    call.await;
                });
            }
        });
    }

    let execute = {
        let api = api.clone();
        Callback::from(move |args: A| {
            let api = (*api).clone();
            yew::platform::spawn_local(async move {
                api.execute(args).await;
            });
        })
    };

    let reset = {
        let api = api.clone();
        Callback::from(move |_| api.reset())
    };

    let current = state.borrow().clone();

    UseApiHandle {
        data: current.data,
        loading: current.loading,
        error: current.error,
        execute,
        reset,
        api: (*api).clone(),
    }
}
