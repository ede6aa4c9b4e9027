//! # Chainwatch
//!
//! Progress reporting for a blockchain node: sync stages, pending
//! transaction lifecycle, and fan-out of node events to observers.
//!
//! ## Overview
//!
//! - **Sync progress**: immutable [`SyncStatus`] snapshots, classified by
//!   stage into fast-sync, secure and latest-state facts.
//! - **Pending transactions**: each transaction moves through
//!   `NEW_PENDING`, `PENDING`, `INCLUDED` and `DROPPED` along a fixed graph.
//! - **Observers**: anything implementing [`NodeEventNotifier`] can
//!   subscribe and receives every event the node publishes.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chainwatch::{HubConfig, NodeEventHub, NodeEventNotifier};
//! use chainwatch::core::{SyncStage, SyncState, SyncStatus};
//!
//! struct Milestones;
//!
//! impl NodeEventNotifier for Milestones {
//!     fn on_sync_done(&self, state: SyncState) {
//!         println!("sync: {state}");
//!     }
//! }
//!
//! let hub = NodeEventHub::new(HubConfig::default());
//! hub.subscribe("milestones", Arc::new(Milestones)).unwrap();
//!
//! let status = SyncStatus::new(SyncStage::Headers, 5, 10, 100, 120);
//! assert_eq!(hub.report_sync_status(status), Some(SyncState::Unsecure));
//! ```
//!
//! ## Re-exports
//!
//! - `chainwatch::core` - stages, snapshots, pending states, event payloads
//! - `chainwatch::notify` - listener contract and registry

pub mod error;
pub mod hub;

// Re-export component crates
pub use chainwatch_core as core;
pub use chainwatch_notify as notify;

// Re-export main types for convenience
pub use error::{HubError, Result};
pub use hub::{HubConfig, NodeEventHub};

pub use chainwatch_core::{
    NodeEvent, PendingTransactionState, PendingUpdate, SyncStage, SyncState, SyncStatus,
};
pub use chainwatch_notify::{DeliveryMode, ListenerId, NodeEventNotifier};
