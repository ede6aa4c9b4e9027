//! Node events: the facts published to observers.
//!
//! One variant per notification. Events are built once by the publishing
//! driver and shared read-only between every observer that receives them.

use serde::{Deserialize, Serialize};

use crate::payload::{
    Block, BlockSummary, HelloMessage, Node, PeerChannel, PendingStateSummary, StatusMessage,
    Transaction, TransactionExecutionSummary, TransactionReceipt, WireMessage,
};
use crate::pending::PendingTransactionState;
use crate::stage::SyncState;
use crate::types::Hash256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeEvent {
    /// Free-form diagnostic output.
    Trace(String),

    NodeDiscovered(Node),

    HandshakePeer {
        channel: PeerChannel,
        hello: HelloMessage,
    },

    EthStatusUpdated {
        channel: PeerChannel,
        status: StatusMessage,
    },

    RecvMessage {
        channel: PeerChannel,
        message: WireMessage,
    },

    SendMessage {
        channel: PeerChannel,
        message: WireMessage,
    },

    /// A block was imported. `best` is set when it became the new best block.
    Block { summary: BlockSummary, best: bool },

    PeerDisconnect { host: String, port: u16 },

    /// Legacy batch notification for newly received pending transactions.
    PendingTransactionsReceived(Vec<Transaction>),

    /// The pending state was rebuilt on a new transaction or best block.
    PendingStateChanged(PendingStateSummary),

    /// A pending transaction arrived, was executed, was included or dropped.
    ///
    /// `block` is the block the pending state is based on for `PENDING`, or
    /// the block the transaction went into for `INCLUDED`.
    PendingTransactionUpdate {
        receipt: TransactionReceipt,
        state: PendingTransactionState,
        block: Block,
    },

    SyncDone(SyncState),

    NoConnections,

    VmTraceCreated { tx_hash: Hash256, trace: String },

    TransactionExecuted(TransactionExecutionSummary),

    PeerAddedToSyncPool(PeerChannel),
}

impl NodeEvent {
    /// Short name of the event, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            NodeEvent::Trace(_) => "trace",
            NodeEvent::NodeDiscovered(_) => "node_discovered",
            NodeEvent::HandshakePeer { .. } => "handshake_peer",
            NodeEvent::EthStatusUpdated { .. } => "eth_status_updated",
            NodeEvent::RecvMessage { .. } => "recv_message",
            NodeEvent::SendMessage { .. } => "send_message",
            NodeEvent::Block { .. } => "block",
            NodeEvent::PeerDisconnect { .. } => "peer_disconnect",
            NodeEvent::PendingTransactionsReceived(_) => "pending_transactions_received",
            NodeEvent::PendingStateChanged(_) => "pending_state_changed",
            NodeEvent::PendingTransactionUpdate { .. } => "pending_transaction_update",
            NodeEvent::SyncDone(_) => "sync_done",
            NodeEvent::NoConnections => "no_connections",
            NodeEvent::VmTraceCreated { .. } => "vm_trace_created",
            NodeEvent::TransactionExecuted(_) => "transaction_executed",
            NodeEvent::PeerAddedToSyncPool(_) => "peer_added_to_sync_pool",
        }
    }
}
