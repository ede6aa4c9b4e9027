//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use chainwatch_core::{
    Address, Block, BlockSummary, Hash256, HelloMessage, Node, NodeEvent, NodeId, PeerChannel,
    PendingStateSummary, PendingTransactionState, StatusMessage, SyncState, Transaction,
    TransactionExecutionSummary, TransactionReceipt, WireMessage,
};
use chainwatch_notify::NodeEventNotifier;
use parking_lot::Mutex;

/// An observer that keeps every event it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<NodeEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far.
    pub fn events(&self) -> Vec<NodeEvent> {
        self.events.lock().clone()
    }

    /// Event kinds received so far.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(NodeEvent::kind).collect()
    }

    /// `(transaction, state)` of every pending transaction update received.
    pub fn pending_updates(&self) -> Vec<(Hash256, PendingTransactionState)> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                NodeEvent::PendingTransactionUpdate { receipt, state, .. } => {
                    Some((receipt.tx_hash(), *state))
                }
                _ => None,
            })
            .collect()
    }

    /// Milestones received through `on_sync_done`.
    pub fn sync_milestones(&self) -> Vec<SyncState> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                NodeEvent::SyncDone(state) => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn record(&self, event: NodeEvent) {
        self.events.lock().push(event);
    }
}

impl NodeEventNotifier for RecordingListener {
    fn trace(&self, message: &str) {
        self.record(NodeEvent::Trace(message.to_string()));
    }

    fn on_node_discovered(&self, node: &Node) {
        self.record(NodeEvent::NodeDiscovered(node.clone()));
    }

    fn on_handshake_peer(&self, channel: &PeerChannel, hello: &HelloMessage) {
        self.record(NodeEvent::HandshakePeer {
            channel: channel.clone(),
            hello: hello.clone(),
        });
    }

    fn on_eth_status_updated(&self, channel: &PeerChannel, status: &StatusMessage) {
        self.record(NodeEvent::EthStatusUpdated {
            channel: channel.clone(),
            status: status.clone(),
        });
    }

    fn on_recv_message(&self, channel: &PeerChannel, message: &WireMessage) {
        self.record(NodeEvent::RecvMessage {
            channel: channel.clone(),
            message: message.clone(),
        });
    }

    fn on_send_message(&self, channel: &PeerChannel, message: &WireMessage) {
        self.record(NodeEvent::SendMessage {
            channel: channel.clone(),
            message: message.clone(),
        });
    }

    fn on_block_with_best(&self, summary: &BlockSummary, best: bool) {
        self.record(NodeEvent::Block {
            summary: summary.clone(),
            best,
        });
    }

    fn on_peer_disconnect(&self, host: &str, port: u16) {
        self.record(NodeEvent::PeerDisconnect {
            host: host.to_string(),
            port,
        });
    }

    fn on_pending_transactions_received(&self, transactions: &[Transaction]) {
        self.record(NodeEvent::PendingTransactionsReceived(transactions.to_vec()));
    }

    fn on_pending_state_changed(&self, pending_state: &PendingStateSummary) {
        self.record(NodeEvent::PendingStateChanged(pending_state.clone()));
    }

    fn on_pending_transaction_update(
        &self,
        receipt: &TransactionReceipt,
        state: PendingTransactionState,
        block: &Block,
    ) {
        self.record(NodeEvent::PendingTransactionUpdate {
            receipt: receipt.clone(),
            state,
            block: block.clone(),
        });
    }

    fn on_sync_done(&self, state: SyncState) {
        self.record(NodeEvent::SyncDone(state));
    }

    fn on_no_connections(&self) {
        self.record(NodeEvent::NoConnections);
    }

    fn on_vm_trace_created(&self, tx_hash: &Hash256, trace: &str) {
        self.record(NodeEvent::VmTraceCreated {
            tx_hash: *tx_hash,
            trace: trace.to_string(),
        });
    }

    fn on_transaction_executed(&self, summary: &TransactionExecutionSummary) {
        self.record(NodeEvent::TransactionExecuted(summary.clone()));
    }

    fn on_peer_added_to_sync_pool(&self, peer: &PeerChannel) {
        self.record(NodeEvent::PeerAddedToSyncPool(peer.clone()));
    }
}

/// An observer that panics on blocks and sync milestones.
#[derive(Debug, Default)]
pub struct FailingListener {
    calls: AtomicU64,
}

impl FailingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Times the listener was invoked (and panicked).
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn fail(&self, what: &str) -> ! {
        self.calls.fetch_add(1, Ordering::Relaxed);
        panic!("failing listener: {what}");
    }
}

impl NodeEventNotifier for FailingListener {
    fn on_block_with_best(&self, _: &BlockSummary, _: bool) {
        self.fail("block");
    }

    fn on_sync_done(&self, _: SyncState) {
        self.fail("sync done");
    }

    fn on_pending_transaction_update(
        &self,
        _: &TransactionReceipt,
        _: PendingTransactionState,
        _: &Block,
    ) {
        self.fail("pending transaction update");
    }
}

/// Hash with every byte set to `tag`.
pub fn hash(tag: u8) -> Hash256 {
    Hash256::from_bytes([tag; 32])
}

/// Transfer transaction identified by `tag`.
pub fn transaction(tag: u8) -> Transaction {
    Transaction {
        hash: hash(tag),
        nonce: tag as u64,
        sender: Address::from_bytes([tag; 20]),
        receiver: Some(Address::from_bytes([tag.wrapping_add(1); 20])),
        value: 1_000,
        gas_limit: 21_000,
    }
}

/// Not-yet-executed receipt for [`transaction`]`(tag)`.
pub fn receipt(tag: u8) -> TransactionReceipt {
    TransactionReceipt {
        transaction: transaction(tag),
        success: true,
        gas_used: 0,
        error: None,
    }
}

/// Block `number` carrying the transactions hashed `txs`, chained to block
/// `number - 1`. Each transaction is [`transaction`] of the hash's first byte.
pub fn block(number: u64, txs: &[Hash256]) -> Block {
    let mut hash_bytes = [0u8; 32];
    hash_bytes[..8].copy_from_slice(&number.to_be_bytes());
    let mut parent_bytes = [0u8; 32];
    parent_bytes[..8].copy_from_slice(&number.saturating_sub(1).to_be_bytes());
    Block {
        number,
        hash: Hash256::from_bytes(hash_bytes),
        parent_hash: Hash256::from_bytes(parent_bytes),
        transactions: txs
            .iter()
            .map(|hash| Transaction {
                hash: *hash,
                ..transaction(hash.as_bytes()[0])
            })
            .collect(),
    }
}

/// A fork block: same number as [`block`] but a different hash.
pub fn fork_block(number: u64, txs: &[Hash256]) -> Block {
    let mut fork = block(number, txs);
    let mut bytes = *fork.hash.as_bytes();
    bytes[31] = 0xff;
    fork.hash = Hash256::from_bytes(bytes);
    fork
}

/// Summary of an imported `block`.
pub fn block_summary(block: Block) -> BlockSummary {
    let total_difficulty = block.number as u128 * 1_000;
    BlockSummary {
        block,
        receipts: vec![],
        summaries: vec![],
        total_difficulty,
    }
}

/// An outbound channel to a random peer.
pub fn peer_channel(host: &str, port: u16) -> PeerChannel {
    PeerChannel {
        node: Node::new(NodeId::random(), host, port),
        inbound: false,
    }
}

/// A random transaction hash.
pub fn random_hash() -> Hash256 {
    Hash256::from_bytes(rand::random())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_notify::ListenerRegistry;
    use std::sync::Arc;

    #[test]
    fn test_recorder_keeps_order() {
        let recorder = RecordingListener::new();
        recorder.trace("one");
        recorder.on_block(&block_summary(block(1, &[])));
        recorder.on_sync_done(SyncState::Secure);

        assert_eq!(recorder.kinds(), vec!["trace", "block", "sync_done"]);
        assert_eq!(recorder.sync_milestones(), vec![SyncState::Secure]);
        assert!(matches!(
            &recorder.events()[1],
            NodeEvent::Block { best: false, .. }
        ));
    }

    #[test]
    fn test_failing_listener_is_isolated() {
        let registry = ListenerRegistry::default();
        let failing = Arc::new(FailingListener::new());
        let recorder = Arc::new(RecordingListener::new());
        registry.register("failing", failing.clone()).unwrap();
        registry.register("recorder", recorder.clone()).unwrap();

        registry.on_sync_done(SyncState::Complete);

        assert_eq!(failing.calls(), 1);
        assert_eq!(recorder.sync_milestones(), vec![SyncState::Complete]);
    }

    #[test]
    fn test_blocks_chain() {
        let parent = block(4, &[]);
        let child = block(5, &[]);
        assert_eq!(child.parent_hash, parent.hash);
        assert_ne!(fork_block(5, &[]).hash, child.hash);
        assert_ne!(random_hash(), random_hash());
    }

    #[test]
    fn test_block_carries_full_transactions() {
        let mined = block(7, &[hash(3), hash(9)]);

        assert_eq!(mined.transactions, vec![transaction(3), transaction(9)]);
        assert!(mined.contains(&hash(3)));
        assert!(!mined.contains(&hash(4)));
        assert!(fork_block(7, &[hash(9)]).contains(&hash(9)));
    }
}
