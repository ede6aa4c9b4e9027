//! # Chainwatch Notify
//!
//! Fan-out of node events to observers.
//!
//! ## Overview
//!
//! Node drivers (networking, sync, block import, pending-state management)
//! publish through the [`NodeEventNotifier`] contract. Observers implement
//! the same contract and register with a [`ListenerRegistry`], which calls
//! each of them for every event.
//!
//! - Observers that are slow or may block should be registered with
//!   [`DeliveryMode::Queued`]: each gets its own ordered queue and worker.
//! - A panicking observer is logged and counted. It never stops delivery to
//!   the other observers and never reaches the publisher.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chainwatch_core::SyncState;
//! use chainwatch_notify::{ListenerRegistry, NodeEventNotifier};
//!
//! struct Printer;
//!
//! impl NodeEventNotifier for Printer {
//!     fn on_sync_done(&self, state: SyncState) {
//!         println!("sync reached {state}");
//!     }
//! }
//!
//! let registry = ListenerRegistry::default();
//! registry.register("printer", Arc::new(Printer)).unwrap();
//! registry.on_sync_done(SyncState::Secure);
//! ```

pub mod config;
pub mod error;
pub mod listener;
pub mod queue;
pub mod registry;

pub use config::{DeliveryMode, NotifierConfig};
pub use error::{NotifyError, Result};
pub use listener::{deliver, BestBlockForwarder, NodeEventNotifier, NoopListener};
pub use queue::QueuedListener;
pub use registry::{ListenerId, ListenerRegistry};
