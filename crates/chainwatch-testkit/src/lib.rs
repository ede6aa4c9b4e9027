//! # Chainwatch Testkit
//!
//! Testing utilities for Chainwatch.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: observers that record or fail, and builders for blocks,
//!   transactions and receipts
//! - **Generators**: proptest strategies for stages, snapshots and pending
//!   transaction histories
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use chainwatch_testkit::generators::sync_status;
//!
//! proptest! {
//!     #[test]
//!     fn rendering_names_the_stage(status in sync_status()) {
//!         prop_assert!(status.to_string().starts_with(status.stage().name()));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use std::sync::Arc;
//! use chainwatch_notify::{ListenerRegistry, NodeEventNotifier};
//! use chainwatch_testkit::fixtures::RecordingListener;
//!
//! let registry = ListenerRegistry::default();
//! let recorder = Arc::new(RecordingListener::new());
//! registry.register("recorder", recorder.clone()).unwrap();
//!
//! registry.on_no_connections();
//! assert_eq!(recorder.kinds(), vec!["no_connections"]);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    block, block_summary, fork_block, hash, peer_channel, receipt, transaction, FailingListener,
    RecordingListener,
};
pub use generators::{pending_state, sync_stage, sync_status, transition_path};
