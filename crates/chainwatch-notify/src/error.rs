//! Error types for the notification module.

use thiserror::Error;

use crate::registry::ListenerId;

/// Errors that can occur while managing listeners.
///
/// Failures inside a listener are never reported here: they are caught,
/// logged and counted by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The worker thread of a queued listener could not be started.
    #[error("failed to start listener worker: {0}")]
    WorkerSpawn(String),

    /// The registry was shut down.
    #[error("listener registry is shut down")]
    ShutDown,

    /// No listener with this id is registered.
    #[error("unknown listener: {0}")]
    UnknownListener(ListenerId),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
