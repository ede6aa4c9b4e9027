//! Error types for the hub.

use chainwatch_core::StateError;
use chainwatch_notify::NotifyError;
use thiserror::Error;

/// Errors that can occur during hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// A sync or pending-transaction state rule was violated.
    #[error("state error: {0}")]
    State(#[from] StateError),

    /// Listener management failed.
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// The configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
