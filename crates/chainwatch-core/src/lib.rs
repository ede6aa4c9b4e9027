//! # Chainwatch Core
//!
//! State model for a blockchain node's observable progress: sync stages,
//! sync progress snapshots, and the lifecycle of pending transactions.
//!
//! This crate contains no I/O and no concurrency. It is pure computation
//! over value objects handed in by the node's drivers.
//!
//! ## Key Types
//!
//! - [`SyncStage`] - The phase the sync process is in
//! - [`SyncStatus`] - One immutable snapshot of sync progress
//! - [`SyncState`] - Coarse sync milestone (`UNSECURE`, `SECURE`, `COMPLETE`)
//! - [`PendingTransactionState`] - Lifecycle state of a pending transaction
//! - [`PendingTracker`] - Drives pending transactions through their lifecycle
//! - [`NodeEvent`] - A fact published to observers
//!
//! ## Stage classification
//!
//! Stages carry no behavior. Derived properties are free functions:
//!
//! ```rust
//! use chainwatch_core::{is_fast_sync, is_secure, SyncStage, SyncStatus};
//!
//! assert!(is_fast_sync(SyncStage::Headers));
//! assert!(!is_secure(SyncStage::PivotBlock));
//!
//! let status = SyncStatus::new(SyncStage::Headers, 5, 10, 100, 120);
//! assert_eq!(
//!     status.to_string(),
//!     "Headers (5 of 10), last block #100, best known #120"
//! );
//! ```

pub mod error;
pub mod event;
pub mod payload;
pub mod pending;
pub mod stage;
pub mod status;
pub mod tracker;
pub mod types;

pub use error::{Result, StateError};
pub use event::NodeEvent;
pub use payload::{
    Block, BlockSummary, Capability, HelloMessage, Node, PeerChannel, PendingStateSummary,
    StatusMessage, Transaction, TransactionExecutionSummary, TransactionReceipt, WireMessage,
};
pub use pending::{can_transition, is_pending, transition, PendingTransactionState};
pub use stage::{
    has_latest_state, is_fast_sync, is_secure, stage_traits, StageTraits, SyncStage, SyncState,
    UNSECURE_STAGES,
};
pub use status::SyncStatus;
pub use tracker::{PendingTracker, PendingUpdate, TrackerConfig};
pub use types::{Address, Hash256, NodeId};
