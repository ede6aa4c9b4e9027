//! Pending transaction lifecycle.
//!
//! ```text
//! NEW_PENDING -> PENDING | INCLUDED
//! PENDING     -> PENDING | INCLUDED | DROPPED
//! INCLUDED    -> PENDING | INCLUDED | DROPPED     (reorganizations)
//! DROPPED     -> (nothing)
//! ```
//!
//! `DROPPED` ends tracking. `INCLUDED` is not final: a reorganization can
//! move the transaction into another block, back to pending, or drop it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingTransactionState {
    /// Invalidated (bad nonce, insufficient funds or gas, bad signature) or
    /// outdated: not included within the configured number of blocks.
    Dropped,
    /// Just arrived. Next is either `Pending` or `Included`.
    NewPending,
    /// Not in any main-chain block, executed on top of the best block.
    Pending,
    /// In a block on the main chain, as far as the node currently knows.
    Included,
}

impl PendingTransactionState {
    pub const ALL: [PendingTransactionState; 4] = [
        PendingTransactionState::Dropped,
        PendingTransactionState::NewPending,
        PendingTransactionState::Pending,
        PendingTransactionState::Included,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            PendingTransactionState::Dropped => "DROPPED",
            PendingTransactionState::NewPending => "NEW_PENDING",
            PendingTransactionState::Pending => "PENDING",
            PendingTransactionState::Included => "INCLUDED",
        }
    }
}

impl fmt::Display for PendingTransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PendingTransactionState {
    type Err = StateError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PendingTransactionState::ALL
            .into_iter()
            .find(|state| state.name() == s)
            .ok_or_else(|| StateError::UnknownPendingState(s.to_string()))
    }
}

/// True for states in which the transaction still waits for inclusion.
pub const fn is_pending(state: PendingTransactionState) -> bool {
    matches!(
        state,
        PendingTransactionState::NewPending | PendingTransactionState::Pending
    )
}

/// Whether `from -> to` is an edge of the lifecycle graph.
pub const fn can_transition(from: PendingTransactionState, to: PendingTransactionState) -> bool {
    use PendingTransactionState::*;

    match from {
        NewPending => matches!(to, Pending | Included),
        Pending => matches!(to, Pending | Included | Dropped),
        Included => matches!(to, Pending | Included | Dropped),
        Dropped => false,
    }
}

/// Move `from -> to`, rejecting edges outside the lifecycle graph.
pub fn transition(
    from: PendingTransactionState,
    to: PendingTransactionState,
) -> Result<PendingTransactionState> {
    if can_transition(from, to) {
        Ok(to)
    } else {
        Err(StateError::InvalidTransition { from, to })
    }
}
