//! The listener contract.
//!
//! [`NodeEventNotifier`] is what node drivers call to publish, and what
//! observers implement to subscribe. Every method is a one-way notification;
//! nothing an implementation does feeds back into the node.

use chainwatch_core::{
    Block, BlockSummary, Hash256, HelloMessage, Node, NodeEvent, PeerChannel,
    PendingStateSummary, PendingTransactionState, StatusMessage, SyncState, Transaction,
    TransactionExecutionSummary, TransactionReceipt, WireMessage,
};

/// Receiver of node events.
///
/// All methods default to doing nothing, so an observer implements only what
/// it cares about. The one exception is [`on_block`](Self::on_block), which
/// forwards to [`on_block_with_best`](Self::on_block_with_best) with
/// `best = false`.
///
/// Implementations must be callable from several producer threads at once
/// and should return promptly; register slow observers with
/// [`DeliveryMode::Queued`](crate::DeliveryMode::Queued).
pub trait NodeEventNotifier: Send + Sync {
    fn trace(&self, _message: &str) {}

    fn on_node_discovered(&self, _node: &Node) {}

    fn on_handshake_peer(&self, _channel: &PeerChannel, _hello: &HelloMessage) {}

    fn on_eth_status_updated(&self, _channel: &PeerChannel, _status: &StatusMessage) {}

    fn on_recv_message(&self, _channel: &PeerChannel, _message: &WireMessage) {}

    fn on_send_message(&self, _channel: &PeerChannel, _message: &WireMessage) {}

    /// A block was imported.
    fn on_block(&self, summary: &BlockSummary) {
        self.on_block_with_best(summary, false);
    }

    /// A block was imported; `best` is set when it became the best block.
    fn on_block_with_best(&self, _summary: &BlockSummary, _best: bool) {}

    fn on_peer_disconnect(&self, _host: &str, _port: u16) {}

    /// Superseded by [`on_pending_transaction_update`](Self::on_pending_transaction_update)
    /// with `NEW_PENDING`; still published for older observers.
    fn on_pending_transactions_received(&self, _transactions: &[Transaction]) {}

    /// The pending state changed, on a new pending transaction or a new best
    /// block. On a new best block the pending state is rebuilt on it and the
    /// remaining pending transactions are executed on top.
    fn on_pending_state_changed(&self, _pending_state: &PendingStateSummary) {}

    /// A pending transaction arrived, was executed, dropped, or included.
    ///
    /// `block` is the block the pending state is based on (`PENDING`) or the
    /// block the transaction went into (`INCLUDED`).
    fn on_pending_transaction_update(
        &self,
        _receipt: &TransactionReceipt,
        _state: PendingTransactionState,
        _block: &Block,
    ) {
    }

    fn on_sync_done(&self, _state: SyncState) {}

    fn on_no_connections(&self) {}

    fn on_vm_trace_created(&self, _tx_hash: &Hash256, _trace: &str) {}

    fn on_transaction_executed(&self, _summary: &TransactionExecutionSummary) {}

    fn on_peer_added_to_sync_pool(&self, _peer: &PeerChannel) {}
}

/// Call the method of `listener` matching `event`.
pub fn deliver(listener: &dyn NodeEventNotifier, event: &NodeEvent) {
    match event {
        NodeEvent::Trace(message) => listener.trace(message),
        NodeEvent::NodeDiscovered(node) => listener.on_node_discovered(node),
        NodeEvent::HandshakePeer { channel, hello } => listener.on_handshake_peer(channel, hello),
        NodeEvent::EthStatusUpdated { channel, status } => {
            listener.on_eth_status_updated(channel, status)
        }
        NodeEvent::RecvMessage { channel, message } => listener.on_recv_message(channel, message),
        NodeEvent::SendMessage { channel, message } => listener.on_send_message(channel, message),
        NodeEvent::Block { summary, best } => listener.on_block_with_best(summary, *best),
        NodeEvent::PeerDisconnect { host, port } => listener.on_peer_disconnect(host, *port),
        NodeEvent::PendingTransactionsReceived(transactions) => {
            listener.on_pending_transactions_received(transactions)
        }
        NodeEvent::PendingStateChanged(pending_state) => {
            listener.on_pending_state_changed(pending_state)
        }
        NodeEvent::PendingTransactionUpdate {
            receipt,
            state,
            block,
        } => listener.on_pending_transaction_update(receipt, *state, block),
        NodeEvent::SyncDone(state) => listener.on_sync_done(*state),
        NodeEvent::NoConnections => listener.on_no_connections(),
        NodeEvent::VmTraceCreated { tx_hash, trace } => listener.on_vm_trace_created(tx_hash, trace),
        NodeEvent::TransactionExecuted(summary) => listener.on_transaction_executed(summary),
        NodeEvent::PeerAddedToSyncPool(peer) => listener.on_peer_added_to_sync_pool(peer),
    }
}

/// Adapter for observers that only handle the two-argument block callback.
///
/// Wraps a closure over `(summary, best)` and exposes the full contract; a
/// single-argument [`on_block`](NodeEventNotifier::on_block) reaches the
/// closure with `best = false`.
pub struct BestBlockForwarder<F> {
    on_block: F,
}

impl<F> BestBlockForwarder<F>
where
    F: Fn(&BlockSummary, bool) + Send + Sync,
{
    pub fn new(on_block: F) -> Self {
        Self { on_block }
    }
}

impl<F> NodeEventNotifier for BestBlockForwarder<F>
where
    F: Fn(&BlockSummary, bool) + Send + Sync,
{
    fn on_block_with_best(&self, summary: &BlockSummary, best: bool) {
        (self.on_block)(summary, best);
    }
}

/// A listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl NodeEventNotifier for NoopListener {}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_core::{Address, NodeId};
    use parking_lot::Mutex;

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
            total_difficulty: 1,
        }
    }

    #[test]
    fn test_single_argument_on_block_forwards_false() {
        let seen = Mutex::new(Vec::new());
        let forwarder = BestBlockForwarder::new(|s: &BlockSummary, best| {
            seen.lock().push((s.number(), best));
        });

        forwarder.on_block(&summary(7));
        forwarder.on_block_with_best(&summary(7), false);
        forwarder.on_block_with_best(&summary(8), true);

        assert_eq!(*seen.lock(), vec![(7, false), (7, false), (8, true)]);
    }

    #[derive(Default)]
    struct Names(Mutex<Vec<&'static str>>);

    impl NodeEventNotifier for Names {
        fn trace(&self, _: &str) {
            self.0.lock().push("trace");
        }
        fn on_block_with_best(&self, _: &BlockSummary, best: bool) {
            self.0.lock().push(if best { "best_block" } else { "block" });
        }
        fn on_peer_disconnect(&self, _: &str, _: u16) {
            self.0.lock().push("peer_disconnect");
        }
        fn on_sync_done(&self, _: SyncState) {
            self.0.lock().push("sync_done");
        }
        fn on_no_connections(&self) {
            self.0.lock().push("no_connections");
        }
        fn on_pending_transaction_update(
            &self,
            _: &TransactionReceipt,
            _: PendingTransactionState,
            _: &Block,
        ) {
            self.0.lock().push("pending_transaction_update");
        }
    }

    #[test]
    fn test_deliver_routes_to_matching_method() {
        let names = Names::default();
        let tx = Transaction {
            hash: Hash256::from_bytes([1; 32]),
            nonce: 0,
            sender: Address::from_bytes([2; 20]),
            receiver: None,
            value: 0,
            gas_limit: 21_000,
        };
        let events = [
            NodeEvent::Trace("hi".into()),
            NodeEvent::Block {
                summary: summary(1),
                best: true,
            },
            NodeEvent::Block {
                summary: summary(2),
                best: false,
            },
            NodeEvent::PeerDisconnect {
                host: "127.0.0.1".into(),
                port: 30303,
            },
            NodeEvent::SyncDone(SyncState::Secure),
            NodeEvent::NoConnections,
            NodeEvent::PendingTransactionUpdate {
                receipt: TransactionReceipt {
                    transaction: tx,
                    success: true,
                    gas_used: 21_000,
                    error: None,
                },
                state: PendingTransactionState::Pending,
                block: summary(2).block,
            },
            // Not overridden by `Names`: falls through to the default no-op.
            NodeEvent::NodeDiscovered(Node::new(NodeId::random(), "10.0.0.2", 30303)),
        ];

        for event in &events {
            deliver(&names, event);
        }

        assert_eq!(
            *names.0.lock(),
            vec![
                "trace",
                "best_block",
                "block",
                "peer_disconnect",
                "sync_done",
                "no_connections",
                "pending_transaction_update",
            ]
        );
    }

    #[test]
    fn test_noop_listener_accepts_everything() {
        let listener: &dyn NodeEventNotifier = &NoopListener;
        listener.on_block(&summary(1));
        listener.on_no_connections();
        deliver(listener, &NodeEvent::Trace("ignored".into()));
    }
}
