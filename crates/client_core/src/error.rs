use shared::{
    domain::RequestId,
    error::{ApiError, ErrorCode, LifecycleError},
};
use thiserror::Error;

/// Failure reported by a remote authority implementation.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("{}", .0.message)]
    Rejected(ApiError),
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        RemoteError::Transport(value.to_string())
    }
}

/// A remote call failed. Carries a message suitable for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SynchronizationError {
    pub message: String,
    pub code: Option<ErrorCode>,
}

impl From<RemoteError> for SynchronizationError {
    fn from(value: RemoteError) -> Self {
        match value {
            RemoteError::Transport(message) => Self {
                message: format!("could not reach the server: {message}"),
                code: None,
            },
            RemoteError::Rejected(api) => Self {
                message: api.message,
                code: Some(api.code),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeaveError {
    #[error(transparent)]
    Local(#[from] LifecycleError),
    #[error("leave request {0} is not loaded")]
    UnknownRequest(RequestId),
    #[error("leave request {0} already has a change in flight")]
    RequestBusy(RequestId),
    #[error("previous error must be dismissed first: {0}")]
    ErrorNotCleared(String),
    #[error(transparent)]
    Synchronization(#[from] SynchronizationError),
}

impl LeaveError {
    /// True when the error was raised before any remote call was made.
    pub fn is_local(&self) -> bool {
        !matches!(self, LeaveError::Synchronization(_))
    }
}
