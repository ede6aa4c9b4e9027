//! Error types for the Chainwatch core state model.

use thiserror::Error;

use crate::pending::PendingTransactionState;
use crate::types::Hash256;

/// Precondition violations raised while building or advancing state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("negative {field}: {value}")]
    NegativeCount { field: &'static str, value: i64 },

    #[error("unknown sync stage: {0}")]
    UnknownSyncStage(String),

    #[error("unknown sync stage tag: {0}")]
    UnknownStageTag(u8),

    #[error("unknown pending transaction state: {0}")]
    UnknownPendingState(String),

    #[error("invalid pending transaction transition: {from} -> {to}")]
    InvalidTransition {
        from: PendingTransactionState,
        to: PendingTransactionState,
    },

    #[error("transaction not tracked: {0}")]
    UnknownTransaction(Hash256),
}

/// Result type for core state operations.
pub type Result<T> = std::result::Result<T, StateError>;
