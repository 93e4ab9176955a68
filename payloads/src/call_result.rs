use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ClientError, Meta};

/// Outcome of a single backend operation.
///
/// The backend reports failures inside a successful HTTP exchange, so a
/// `Failure` here is a logical failure. Transport problems are reported
/// separately as [`ClientError`].
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult<T> {
    Success { data: T, meta: Option<Meta> },
    Failure { message: Option<String> },
}

impl<T> CallResult<T> {
    pub fn success(data: T) -> Self {
        CallResult::Success { data, meta: None }
    }

    pub fn success_with_meta(data: T, meta: Meta) -> Self {
        CallResult::Success {
            data,
            meta: Some(meta),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        CallResult::Failure {
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            CallResult::Success { data, .. } => Some(data),
            CallResult::Failure { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            CallResult::Success { data, .. } => Some(data),
            CallResult::Failure { .. } => None,
        }
    }

    pub fn meta(&self) -> Option<&Meta> {
        match self {
            CallResult::Success { meta, .. } => meta.as_ref(),
            CallResult::Failure { .. } => None,
        }
    }

    /// Message reported by a failed call, if the backend supplied one.
    pub fn message(&self) -> Option<&str> {
        match self {
            CallResult::Success { .. } => None,
            CallResult::Failure { message } => message.as_deref(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallResult<U> {
        match self {
            CallResult::Success { data, meta } => CallResult::Success {
                data: f(data),
                meta,
            },
            CallResult::Failure { message } => CallResult::Failure { message },
        }
    }
}

/// The `{success, data, message, meta}` body every backend endpoint
/// answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl Envelope {
    /// Decode the envelope into a typed result.
    ///
    /// A successful envelope without `data` decodes `null`, which works for
    /// `()` and `Option<_>` payloads and is a decode error otherwise.
    pub fn into_call_result<T: DeserializeOwned>(
        self,
    ) -> Result<CallResult<T>, ClientError> {
        if !self.success {
            return Ok(CallResult::Failure {
                message: self.message,
            });
        }
        let data = serde_json::from_value(self.data)?;
        Ok(CallResult::Success {
            data,
            meta: self.meta,
        })
    }
}
