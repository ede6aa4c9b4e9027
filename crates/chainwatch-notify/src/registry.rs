//! Listener registry and fan-out.
//!
//! [`ListenerRegistry`] is itself a [`NodeEventNotifier`]: drivers publish
//! through it and it hands every event to each registered listener. A
//! listener that panics is logged and counted; the remaining listeners still
//! get the event and the publisher never sees the failure.
//!
//! ## Ordering
//!
//! Each listener sees the events of one producer in the order that producer
//! published them. Events of different producers may interleave.
//!
//! ## Lifecycle
//!
//! ```text
//! new -> register / unregister (any time, any thread) -> shutdown
//! ```
//!
//! Publishing works on a snapshot of the listener list, so registration
//! never waits for a listener and a listener can't block registration.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chainwatch_core::{
    Block, BlockSummary, Hash256, HelloMessage, Node, NodeEvent, PeerChannel,
    PendingStateSummary, PendingTransactionState, StatusMessage, SyncState, Transaction,
    TransactionExecutionSummary, TransactionReceipt, WireMessage,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::{DeliveryMode, NotifierConfig};
use crate::error::{NotifyError, Result};
use crate::listener::{self, NodeEventNotifier};
use crate::queue::QueuedListener;

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

enum Slot {
    Inline {
        name: String,
        listener: Arc<dyn NodeEventNotifier>,
    },
    Queued(QueuedListener),
}

impl Slot {
    fn name(&self) -> &str {
        match self {
            Slot::Inline { name, .. } => name,
            Slot::Queued(queued) => queued.name(),
        }
    }
}

/// Fan-out of node events to any number of listeners.
pub struct ListenerRegistry {
    config: NotifierConfig,
    slots: RwLock<Vec<(ListenerId, Arc<Slot>)>>,
    next_id: AtomicU64,
    failures: Arc<AtomicU64>,
    shut_down: AtomicBool,
}

impl ListenerRegistry {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            config,
            slots: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            failures: Arc::new(AtomicU64::new(0)),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Register a listener with the configured delivery mode.
    pub fn register(
        &self,
        name: impl Into<String>,
        listener: Arc<dyn NodeEventNotifier>,
    ) -> Result<ListenerId> {
        self.register_with(name, listener, self.config.delivery)
    }

    /// Register a listener with an explicit delivery mode.
    ///
    /// A queued listener gets its own worker thread, which exits once the
    /// listener is unregistered or the registry shuts down.
    pub fn register_with(
        &self,
        name: impl Into<String>,
        listener: Arc<dyn NodeEventNotifier>,
        mode: DeliveryMode,
    ) -> Result<ListenerId> {
        if self.is_shut_down() {
            return Err(NotifyError::ShutDown);
        }

        let name = name.into();
        let slot = match mode {
            DeliveryMode::Inline => Slot::Inline {
                name: name.clone(),
                listener,
            },
            DeliveryMode::Queued => Slot::Queued(QueuedListener::spawn(
                name.clone(),
                listener,
                self.config.queue_warn_threshold,
                Arc::clone(&self.failures),
            )?),
        };

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        {
            let mut slots = self.slots.write();
            // Re-checked under the lock so a racing shutdown can't miss us.
            if self.is_shut_down() {
                if let Slot::Queued(queued) = &slot {
                    queued.close();
                }
                return Err(NotifyError::ShutDown);
            }
            slots.push((id, Arc::new(slot)));
        }

        tracing::debug!(listener = %name, %id, ?mode, "listener registered");
        Ok(id)
    }

    /// Remove a listener.
    ///
    /// A queued listener still receives what was queued before this call.
    pub fn unregister(&self, id: ListenerId) -> Result<()> {
        let removed = {
            let mut slots = self.slots.write();
            let index = slots
                .iter()
                .position(|(slot_id, _)| *slot_id == id)
                .ok_or(NotifyError::UnknownListener(id))?;
            slots.remove(index).1
        };

        if let Slot::Queued(queued) = removed.as_ref() {
            queued.close();
        }
        tracing::debug!(listener = %removed.name(), %id, "listener unregistered");
        Ok(())
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Listener invocations that panicked, across all listeners.
    pub fn failed_deliveries(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Hand `event` to every registered listener.
    pub fn publish(&self, event: NodeEvent) {
        if self.is_shut_down() {
            tracing::trace!(event = event.kind(), "registry shut down, event discarded");
            return;
        }

        let slots: Vec<Arc<Slot>> = self
            .slots
            .read()
            .iter()
            .map(|(_, slot)| Arc::clone(slot))
            .collect();
        tracing::trace!(event = event.kind(), listeners = slots.len(), "publishing node event");

        let event = Arc::new(event);
        for slot in slots {
            match slot.as_ref() {
                Slot::Inline { name, listener } => {
                    let delivered = panic::catch_unwind(AssertUnwindSafe(|| {
                        listener::deliver(listener.as_ref(), &event)
                    }));
                    if delivered.is_err() {
                        self.failures.fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            listener = %name,
                            event = event.kind(),
                            "listener panicked while handling event"
                        );
                    }
                }
                Slot::Queued(queued) => queued.enqueue(Arc::clone(&event)),
            }
        }
    }

    /// Stop delivering, drop every listener, and wait for queued listeners
    /// to finish what they already received.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }

        let slots: Vec<(ListenerId, Arc<Slot>)> = std::mem::take(&mut *self.slots.write());
        for (_, slot) in &slots {
            if let Slot::Queued(queued) = slot.as_ref() {
                queued.close();
            }
        }
        for (_, slot) in &slots {
            if let Slot::Queued(queued) = slot.as_ref() {
                queued.drain().await;
            }
        }
        tracing::info!(listeners = slots.len(), "listener registry shut down");
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new(NotifierConfig::default())
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .slots
            .read()
            .iter()
            .map(|(id, slot)| format!("{id}:{}", slot.name()))
            .collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &names)
            .field("failed_deliveries", &self.failed_deliveries())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl NodeEventNotifier for ListenerRegistry {
    fn trace(&self, message: &str) {
        self.publish(NodeEvent::Trace(message.to_string()));
    }

    fn on_node_discovered(&self, node: &Node) {
        self.publish(NodeEvent::NodeDiscovered(node.clone()));
    }

    fn on_handshake_peer(&self, channel: &PeerChannel, hello: &HelloMessage) {
        self.publish(NodeEvent::HandshakePeer {
            channel: channel.clone(),
            hello: hello.clone(),
        });
    }

    fn on_eth_status_updated(&self, channel: &PeerChannel, status: &StatusMessage) {
        self.publish(NodeEvent::EthStatusUpdated {
            channel: channel.clone(),
            status: status.clone(),
        });
    }

    fn on_recv_message(&self, channel: &PeerChannel, message: &WireMessage) {
        self.publish(NodeEvent::RecvMessage {
            channel: channel.clone(),
            message: message.clone(),
        });
    }

    fn on_send_message(&self, channel: &PeerChannel, message: &WireMessage) {
        self.publish(NodeEvent::SendMessage {
            channel: channel.clone(),
            message: message.clone(),
        });
    }

    fn on_block_with_best(&self, summary: &BlockSummary, best: bool) {
        self.publish(NodeEvent::Block {
            summary: summary.clone(),
            best,
        });
    }

    fn on_peer_disconnect(&self, host: &str, port: u16) {
        self.publish(NodeEvent::PeerDisconnect {
            host: host.to_string(),
            port,
        });
    }

    fn on_pending_transactions_received(&self, transactions: &[Transaction]) {
        self.publish(NodeEvent::PendingTransactionsReceived(transactions.to_vec()));
    }

    fn on_pending_state_changed(&self, pending_state: &PendingStateSummary) {
        self.publish(NodeEvent::PendingStateChanged(pending_state.clone()));
    }

    fn on_pending_transaction_update(
        &self,
        receipt: &TransactionReceipt,
        state: PendingTransactionState,
        block: &Block,
    ) {
        self.publish(NodeEvent::PendingTransactionUpdate {
            receipt: receipt.clone(),
            state,
            block: block.clone(),
        });
    }

    fn on_sync_done(&self, state: SyncState) {
        self.publish(NodeEvent::SyncDone(state));
    }

    fn on_no_connections(&self) {
        self.publish(NodeEvent::NoConnections);
    }

    fn on_vm_trace_created(&self, tx_hash: &Hash256, trace: &str) {
        self.publish(NodeEvent::VmTraceCreated {
            tx_hash: *tx_hash,
            trace: trace.to_string(),
        });
    }

    fn on_transaction_executed(&self, summary: &TransactionExecutionSummary) {
        self.publish(NodeEvent::TransactionExecuted(summary.clone()));
    }

    fn on_peer_added_to_sync_pool(&self, peer: &PeerChannel) {
        self.publish(NodeEvent::PeerAddedToSyncPool(peer.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Blocks(Mutex<Vec<(BlockSummary, bool)>>);

    impl NodeEventNotifier for Blocks {
        fn on_block_with_best(&self, summary: &BlockSummary, best: bool) {
            self.0.lock().push((summary.clone(), best));
        }
    }

    struct Exploding;

    impl NodeEventNotifier for Exploding {
        fn on_block_with_best(&self, _: &BlockSummary, _: bool) {
            panic!("observer failure");
        }
    }

    fn summary(number: u64) -> BlockSummary {
        BlockSummary {
            block: Block {
                number,
                hash: Hash256::from_bytes([number as u8; 32]),
                parent_hash: Hash256::ZERO,
                transactions: vec![],
            },
            receipts: vec![],
            summaries: vec![],
            total_difficulty: number as u128,
        }
    }

    #[test]
    fn test_three_listeners_one_delivery_each() {
        let registry = ListenerRegistry::default();
        let listeners: Vec<Arc<Blocks>> = (0..3).map(|_| Arc::new(Blocks::default())).collect();
        for (i, l) in listeners.iter().enumerate() {
            registry.register(format!("blocks-{i}"), l.clone()).unwrap();
        }

        registry.on_block(&summary(9));

        for l in &listeners {
            assert_eq!(*l.0.lock(), vec![(summary(9), false)]);
        }
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let registry = ListenerRegistry::default();
        let first = Arc::new(Blocks::default());
        let last = Arc::new(Blocks::default());
        registry.register("first", first.clone()).unwrap();
        registry.register("exploding", Arc::new(Exploding)).unwrap();
        registry.register("last", last.clone()).unwrap();

        registry.on_block_with_best(&summary(3), true);

        assert_eq!(first.0.lock().len(), 1);
        assert_eq!(last.0.lock().len(), 1);
        assert_eq!(registry.failed_deliveries(), 1);
    }

    #[test]
    fn test_unregister() {
        let registry = ListenerRegistry::default();
        let blocks = Arc::new(Blocks::default());
        let id = registry.register("blocks", blocks.clone()).unwrap();

        registry.on_block(&summary(1));
        registry.unregister(id).unwrap();
        registry.on_block(&summary(2));

        assert_eq!(blocks.0.lock().len(), 1);
        assert!(registry.is_empty());
        assert_eq!(registry.unregister(id), Err(NotifyError::UnknownListener(id)));
    }

    struct Stuck(std::sync::Barrier);

    impl NodeEventNotifier for Stuck {
        fn on_block_with_best(&self, _: &BlockSummary, _: bool) {
            self.0.wait();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_stuck_queued_listener_does_not_starve_others() {
        let registry = ListenerRegistry::default();
        let stuck = Arc::new(Stuck(std::sync::Barrier::new(2)));
        registry
            .register_with("stuck", stuck.clone(), DeliveryMode::Queued)
            .unwrap();
        let others: Vec<Arc<Blocks>> = (0..16).map(|_| Arc::new(Blocks::default())).collect();
        for (i, l) in others.iter().enumerate() {
            registry
                .register_with(format!("queued-{i}"), l.clone(), DeliveryMode::Queued)
                .unwrap();
        }

        registry.on_block(&summary(5));

        let delivered = async {
            while others.iter().any(|l| l.0.lock().is_empty()) {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(std::time::Duration::from_secs(5), delivered)
            .await
            .unwrap();

        let release = Arc::clone(&stuck);
        std::thread::spawn(move || release.0.wait());
        registry.shutdown().await;
        for l in &others {
            assert_eq!(*l.0.lock(), vec![(summary(5), false)]);
        }
    }

    #[test]
    fn test_listener_ids_are_unique() {
        let registry = ListenerRegistry::default();
        let a = registry.register("a", Arc::new(Blocks::default())).unwrap();
        let b = registry.register("b", Arc::new(Blocks::default())).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    struct SelfRemoving {
        registry: Arc<ListenerRegistry>,
        id: Mutex<Option<ListenerId>>,
        calls: AtomicU64,
    }

    impl NodeEventNotifier for SelfRemoving {
        fn on_no_connections(&self) {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if let Some(id) = self.id.lock().take() {
                self.registry.unregister(id).unwrap();
            }
        }
    }

    #[test]
    fn test_listener_can_unregister_during_delivery() {
        let registry = Arc::new(ListenerRegistry::default());
        let listener = Arc::new(SelfRemoving {
            registry: Arc::clone(&registry),
            id: Mutex::new(None),
            calls: AtomicU64::new(0),
        });
        let id = registry.register("self-removing", listener.clone()).unwrap();
        *listener.id.lock() = Some(id);

        registry.on_no_connections();
        registry.on_no_connections();

        assert_eq!(listener.calls.load(Ordering::Relaxed), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_queued_and_inline_receive_same_payload() {
        let registry = ListenerRegistry::default();
        let inline = Arc::new(Blocks::default());
        let queued = Arc::new(Blocks::default());
        registry.register_with("inline", inline.clone(), DeliveryMode::Inline).unwrap();
        registry.register_with("queued", queued.clone(), DeliveryMode::Queued).unwrap();

        registry.on_block_with_best(&summary(4), true);
        registry.shutdown().await;

        assert_eq!(*inline.0.lock(), *queued.0.lock());
        assert_eq!(inline.0.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_registration_and_drops_events() {
        let registry = ListenerRegistry::default();
        let blocks = Arc::new(Blocks::default());
        registry.register("blocks", blocks.clone()).unwrap();

        registry.shutdown().await;
        registry.on_block(&summary(1));

        assert!(blocks.0.lock().is_empty());
        assert!(registry.is_shut_down());
        assert_eq!(
            registry.register("late", Arc::new(Blocks::default())),
            Err(NotifyError::ShutDown)
        );
        // A second shutdown is a no-op.
        registry.shutdown().await;
    }
}
