//! Value objects handed in by the node's drivers.
//!
//! The core carries these through to observers and reads only the fields
//! declared here. Validation of their contents belongs to whoever built them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::{Address, Hash256, NodeId};

/// A peer endpoint found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
}

impl Node {
    pub fn new(id: NodeId, host: impl Into<String>, port: u16) -> Self {
        Self {
            id,
            host: host.into(),
            port,
        }
    }
}

/// A live connection to a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerChannel {
    pub node: Node,
    /// Whether the remote side opened the connection.
    pub inbound: bool,
}

/// A sub-protocol advertised in the p2p hello.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub version: u8,
}

/// Payload of the p2p handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloMessage {
    pub p2p_version: u8,
    pub client_id: String,
    pub capabilities: Vec<Capability>,
    pub listen_port: u16,
    pub peer_id: NodeId,
}

/// Payload of the eth sub-protocol status exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub protocol_version: u8,
    pub network_id: u64,
    pub total_difficulty: u128,
    pub best_hash: Hash256,
    pub genesis_hash: Hash256,
}

/// Any message crossing the wire, inbound or outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Sub-protocol name (`p2p`, `eth`, ...).
    pub protocol: String,
    pub code: u8,
    pub payload: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub hash: Hash256,
    pub nonce: u64,
    pub sender: Address,
    /// `None` for contract creation.
    pub receiver: Option<Address>,
    pub value: u128,
    pub gas_limit: u64,
}

/// Outcome of executing a transaction, either on a pending state or in a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction: Transaction,
    pub success: bool,
    pub gas_used: u64,
    /// Execution error, e.g. bad nonce or insufficient funds.
    pub error: Option<String>,
}

impl TransactionReceipt {
    pub fn tx_hash(&self) -> Hash256 {
        self.transaction.hash
    }

    /// Whether the transaction can be applied at all (as opposed to reverting).
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub hash: Hash256,
    pub parent_hash: Hash256,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn contains(&self, tx_hash: &Hash256) -> bool {
        self.transactions.iter().any(|tx| &tx.hash == tx_hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionExecutionSummary {
    pub tx_hash: Hash256,
    pub gas_used: u64,
    pub gas_refund: u64,
    pub failed: bool,
    pub logs: Vec<Bytes>,
}

/// Everything known about a block right after import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub block: Block,
    pub receipts: Vec<TransactionReceipt>,
    pub summaries: Vec<TransactionExecutionSummary>,
    pub total_difficulty: u128,
}

impl BlockSummary {
    pub fn number(&self) -> u64 {
        self.block.number
    }
}

/// The pending state after new transactions or a new best block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStateSummary {
    /// Block the pending state is built on.
    pub best_block: u64,
    /// Transactions currently executed on top of it, oldest first.
    pub pending: Vec<Hash256>,
}
