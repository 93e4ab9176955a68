use std::fmt::Display;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use payloads::CallResult;
use yew::prelude::*;

use super::{
    InFlight, ResultCallback, Shared, UPLOAD_FAILED, UseApiFormOptions,
    exception_message, failure_message,
};

#[derive(Debug, Clone, PartialEq)]
pub struct UploadState<T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub success: bool,
    /// Percent complete, 0 to 100.
    pub progress: u8,
}

impl<T> Default for UploadState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            success: false,
            progress: 0,
        }
    }
}

/// Handed to the upload function so the transport can report progress.
///
/// Each report overwrites the previous value; ordering is up to the
/// transport.
#[derive(Clone)]
pub struct ProgressReporter {
    report: Rc<dyn Fn(u8)>,
}

impl ProgressReporter {
    fn new(report: impl Fn(u8) + 'static) -> Self {
        Self {
            report: Rc::new(report),
        }
    }

    /// Record `percent`, clamped to 100.
    pub fn report(&self, percent: u8) {
        (self.report)(percent.min(100));
    }

    /// Adapter for transports that take a plain progress closure, such as
    /// [`payloads::APIClient::upload`].
    pub fn as_fn(&self) -> impl Fn(u8) + 'static {
        let reporter = self.clone();
        move |percent| reporter.report(percent)
    }
}

type UploadFn<F, M, T> = Rc<
    dyn Fn(
        F,
        M,
        ProgressReporter,
    ) -> LocalBoxFuture<'static, Result<CallResult<T>, String>>,
>;

/// A file upload with progress tracking.
pub struct FileUpload<F, M, T> {
    upload_fn: UploadFn<F, M, T>,
    on_success: Option<ResultCallback<T>>,
    on_error: Option<ResultCallback<T>>,
    shared: Shared<UploadState<T>>,
}

impl<F, M, T> Clone for FileUpload<F, M, T> {
    fn clone(&self) -> Self {
        Self {
            upload_fn: self.upload_fn.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<F: 'static, M: 'static, T: Clone + 'static> FileUpload<F, M, T> {
    pub fn new<U, Fut, E>(upload_fn: U) -> Self
    where
        U: Fn(F, M, ProgressReporter) -> Fut + 'static,
        Fut: Future<Output = Result<CallResult<T>, E>> + 'static,
        E: Display,
    {
        Self {
            upload_fn: Rc::new(move |file, metadata, progress| {
                let fut = upload_fn(file, metadata, progress);
                async move { fut.await.map_err(|e| e.to_string()) }
                    .boxed_local()
            }),
            on_success: None,
            on_error: None,
            shared: Shared::new(UploadState::default()),
        }
    }

    pub(crate) fn with_shared(
        mut self,
        shared: Shared<UploadState<T>>,
    ) -> Self {
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

    /// Upload `file` with `metadata` and record the outcome.
    pub async fn upload(&self, file: F, metadata: M) -> CallResult<T> {
        let _in_flight = InFlight::begin(
            &self.shared,
            |state| {
                state.progress = 0;
                state.loading = true;
                state.error = None;
                state.success = false;
            },
            |state| state.loading = false,
        );

        let progress = {
            let shared = self.shared.clone();
            ProgressReporter::new(move |percent| {
                shared.update(|state| state.progress = percent)
            })
        };

        let result = match (self.upload_fn)(file, metadata, progress).await {
            Ok(CallResult::Success { data, meta }) => {
                self.shared.update(|state| {
                    state.data = Some(data.clone());
                    state.success = true;
                });
                let result = CallResult::Success { data, meta };
                if let Some(on_success) = &self.on_success {
                    on_success(&result);
                }
                return result;
            }
            Ok(result) => {
                let error = failure_message(result.message(), UPLOAD_FAILED);
                tracing::warn!("Upload failed: {error}");
                self.shared.update(|state| state.error = Some(error));
                result
            }
            Err(e) => {
                let message = exception_message(e);
                tracing::error!("Upload raised: {message}");
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

    /// Back to the initial state with progress at 0.
    pub fn reset(&self) {
        self.shared.update(|state| *state = UploadState::default());
    }

    pub fn state(&self) -> UploadState<T> {
        self.shared.snapshot()
    }

    pub fn progress(&self) -> u8 {
        self.shared.read(|state| state.progress)
    }
}

/// Hook return type for a file upload
pub struct UseFileUploadHandle<F, M, T> {
    pub data: Option<T>,
    pub loading: bool,
    pub error: Option<String>,
    pub success: bool,
    pub progress: u8,
    pub upload: Callback<(F, M)>,
    pub reset: Callback<()>,
    pub api: FileUpload<F, M, T>,
}

/// Wrap an upload call with progress, loading, error and success state.
#[hook]
pub fn use_file_upload<F, M, T, D, U, Fut, E>(
    deps: D,
    upload_fn: U,
    options: UseApiFormOptions<T>,
) -> UseFileUploadHandle<F, M, T>
where
    F: 'static,
    M: 'static,
    T: Clone + 'static,
    D: PartialEq + Clone + 'static,
    U: Fn(F, M, ProgressReporter) -> Fut + 'static,
    Fut: Future<Output = Result<CallResult<T>, E>> + 'static,
    E: Display + 'static,
{
    let force_update = use_force_update();
    let state = use_mut_ref(UploadState::<T>::default);
    let latest_options = use_mut_ref(UseApiFormOptions::<T>::default);
    *latest_options.borrow_mut() = options;

    let api = {
        let state = state.clone();
        let latest_options = latest_options.clone();
        use_memo(deps, move |_| {
            let on_success = latest_options.clone();
            let on_error = latest_options;
            FileUpload::new(upload_fn)
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

    let upload = {
        let api = api.clone();
        Callback::from(move |(file, metadata): (F, M)| {
            let api = (*api).clone();
            yew::platform::spawn_local(async move {
                api.upload(file, metadata).await;
            });
        })
    };

    let reset = {
        let api = api.clone();
        Callback::from(move |_| api.reset())
    };

    let current = state.borrow().clone();

    UseFileUploadHandle {
        data: current.data,
        loading: current.loading,
        error: current.error,
        success: current.success,
        progress: current.progress,
        upload,
        reset,
        api: (*api).clone(),
    }
}
