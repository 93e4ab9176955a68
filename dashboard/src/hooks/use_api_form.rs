use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;

use payloads::CallResult;
use yew::prelude::*;

use super::{
    ApiFn, FORM_SUBMISSION_FAILED, InFlight, ResultCallback, Shared, erase,
    exception_message, failure_message,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    pub loading: bool,
    pub error: Option<String>,
    pub success: bool,
}

/// A create or update call with success/error side effects.
///
/// Callbacks run after the state reflects the outcome. Their panics are
/// not caught and propagate to whoever awaited `submit`.
pub struct FormSubmit<A, T> {
    submit_fn: ApiFn<A, T>,
    on_success: Option<ResultCallback<T>>,
    on_error: Option<ResultCallback<T>>,
    shared: Shared<FormState>,
}

impl<A, T> Clone for FormSubmit<A, T> {
    fn clone(&self) -> Self {
        Self {
            submit_fn: self.submit_fn.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<A: 'static, T: 'static> FormSubmit<A, T> {
    pub fn new<F, Fut, E>(submit_fn: F) -> Self
    where
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<CallResult<T>, E>> + 'static,
        E: Display,
    {
        Self {
            submit_fn: erase(submit_fn),
            on_success: None,
            on_error: None,
            shared: Shared::new(FormState::default()),
        }
    }

    pub(crate) fn with_shared(mut self, shared: Shared<FormState>) -> Self {
        self.shared = shared;
        self
    }

    pub fn on_success(
        mut self,
        callback: impl Fn(&CallResult<T>) + 'static,
    ) -> Self {
        self.on_success = Some(Rc::new(callback));
        self
    }

    pub fn on_error(
        mut self,
        callback: impl Fn(&CallResult<T>) + 'static,
    ) -> Self {
        self.on_error = Some(Rc::new(callback));
        self
    }

    pub fn with_listener(mut self, listener: impl Fn() + 'static) -> Self {
        self.shared = self.shared.with_listener(listener);
        self
    }

    /// Submit `form` and record the outcome.
    ///
    /// Calls `on_success` exactly once on success, `on_error` exactly once
    /// on a logical failure or an error, never both.
    pub async fn submit(&self, form: A) -> CallResult<T> {
        let _in_flight = InFlight::begin(
            &self.shared,
            |state| {
                state.loading = true;
                state.error = None;
                state.success = false;
            },
            |state| state.loading = false,
        );

        let result = match (self.submit_fn)(form).await {
            Ok(result @ CallResult::Success { .. }) => {
                self.shared.update(|state| state.success = true);
                if let Some(on_success) = &self.on_success {
                    on_success(&result);
                }
                return result;
            }
            Ok(result) => {
                let error = failure_message(
                    result.message(),
                    FORM_SUBMISSION_FAILED,
                );
                tracing::warn!("Form submission failed: {error}");
                self.shared.update(|state| state.error = Some(error));
                result
            }
            Err(e) => {
                let message = exception_message(e);
                tracing::error!("Form submission raised: {message}");
                self.shared
                    .update(|state| state.error = Some(message.clone()));
                CallResult::failure(message)
            }
        };

        if let Some(on_error) = &self.on_error {
            on_error(&result);
        }
        result
    }

    /// Clear `error`, `success` and `loading`. Form field values belong to
    /// the caller and are untouched.
    pub fn reset(&self) {
        self.shared.update(|state| *state = FormState::default());
    }

    pub fn state(&self) -> FormState {
        self.shared.snapshot()
    }
}

/// Side effects for `use_api_form` and `use_file_upload`.
///
/// The latest options are used on every submit, so callbacks may capture
/// per-render values.
pub struct UseApiFormOptions<T> {
    pub on_success: Option<Callback<CallResult<T>>>,
    pub on_error: Option<Callback<CallResult<T>>>,
}

impl<T> Default for UseApiFormOptions<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }
}

impl<T> Clone for UseApiFormOptions<T> {
    fn clone(&self) -> Self {
        Self {
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
        }
    }
}

impl<T> UseApiFormOptions<T> {
    pub fn on_success(mut self, callback: Callback<CallResult<T>>) -> Self {
        self.on_success = Some(callback);
        self
    }

    pub fn on_error(mut self, callback: Callback<CallResult<T>>) -> Self {
        self.on_error = Some(callback);
        self
    }
}

/// Hook return type for a form submission
pub struct UseApiFormHandle<A, T> {
    pub loading: bool,
    pub error: Option<String>,
    pub success: bool,
    pub submit: Callback<A>,
    pub reset: Callback<()>,
    pub api: FormSubmit<A, T>,
}

/// Wrap a create/update call with loading, error and success state.
#[hook]
pub fn use_api_form<A, T, D, F, Fut, E>(
    deps: D,
    submit_fn: F,
    options: UseApiFormOptions<T>,
) -> UseApiFormHandle<A, T>
where
    A: 'static,
    T: Clone + 'static,
    D: PartialEq + Clone + 'static,
    F: Fn(A) -> Fut + 'static,
    Fut: Future<Output = Result<CallResult<T>, E>> + 'static,
    E: Display + 'static,
{
    let force_update = use_force_update();
    let state = use_mut_ref(FormState::default);
    let latest_options = use_mut_ref(UseApiFormOptions::<T>::default);
    *latest_options.borrow_mut() = options;

    let api = {
        let state = state.clone();
        let latest_options = latest_options.clone();
        use_memo(deps, move |_| {
            let on_success = latest_options.clone();
            let on_error = latest_options;
            FormSubmit::new(submit_fn)
                .with_shared(
                    Shared::from_cell(state)
                        .with_listener(move || force_update.force_update()),
                )
                .on_success(move |result| {
                    let callback = on_success.borrow().on_success.clone();
                    if let Some(callback) = callback {
                        callback.emit(result.clone());
                    }
                })
                .on_error(move |result| {
                    let callback = on_error.borrow().on_error.clone();
                    if let Some(callback) = callback {
                        callback.emit(result.clone());
                    }
                })
        })
    };

    let submit = {
        let api = api.clone();
        Callback::from(move |form: A| {
            let api = (*api).clone();
            yew::platform::spawn_local(async move {
                api.submit(form).await;
            });
        })
    };

    let reset = {
        let api = api.clone();
        Callback::from(move |_| api.reset())
    };

    let current = state.borrow().clone();

    UseApiFormHandle {
        loading: current.loading,
        error: current.error,
        success: current.success,
        submit,
        reset,
        api: (*api).clone(),
    }
}
