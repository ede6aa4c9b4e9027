//! Pending transaction tracking.
//!
//! [`PendingTracker`] applies block and reorganization facts to every
//! transaction the node holds as pending, and reports each resulting state
//! change as a [`PendingUpdate`]. Every change goes through
//! [`pending::transition`], so the tracker can't leave the lifecycle graph.
//!
//! Execution itself happens elsewhere; the tracker is told about it through
//! [`PendingTracker::mark_executed`] and [`PendingTracker::invalidate`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StateError};
use crate::payload::{Block, PendingStateSummary, TransactionReceipt};
use crate::pending::{self, PendingTransactionState};
use crate::types::Hash256;

/// Configuration for pending transaction tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Blocks a transaction may stay pending before it is dropped as
    /// outdated. Also the depth after which an included transaction is
    /// considered final and forgotten.
    pub outdated_threshold: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            outdated_threshold: 10,
        }
    }
}

/// A state change of one pending transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
    pub receipt: TransactionReceipt,
    pub state: PendingTransactionState,
    /// The block the pending state is built on, or the including block.
    pub block: Block,
}

#[derive(Debug, Clone)]
struct Tracked {
    receipt: TransactionReceipt,
    state: PendingTransactionState,
    /// Best block number when the transaction first arrived.
    first_seen: u64,
    /// Arrival order, for deterministic reporting.
    arrival: u64,
    /// Number and hash of the including block, when included.
    included_in: Option<(u64, Hash256)>,
}

/// Tracks the lifecycle of every pending transaction.
#[derive(Debug, Default)]
pub struct PendingTracker {
    config: TrackerConfig,
    txs: HashMap<Hash256, Tracked>,
    next_arrival: u64,
}

impl PendingTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            txs: HashMap::new(),
            next_arrival: 0,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Current state of a tracked transaction.
    pub fn state_of(&self, hash: &Hash256) -> Option<PendingTransactionState> {
        self.txs.get(hash).map(|t| t.state)
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// Start tracking a newly observed transaction.
    ///
    /// Returns `None` for a transaction that is already tracked.
    pub fn receive(&mut self, receipt: TransactionReceipt, tip: &Block) -> Option<PendingUpdate> {
        let hash = receipt.tx_hash();
        if self.txs.contains_key(&hash) {
            return None;
        }

        let arrival = self.next_arrival;
        self.next_arrival += 1;
        self.txs.insert(
            hash,
            Tracked {
                receipt: receipt.clone(),
                state: PendingTransactionState::NewPending,
                first_seen: tip.number,
                arrival,
                included_in: None,
            },
        );

        Some(PendingUpdate {
            receipt,
            state: PendingTransactionState::NewPending,
            block: tip.clone(),
        })
    }

    /// Record that a transaction was executed on top of `tip`.
    pub fn mark_executed(
        &mut self,
        hash: &Hash256,
        receipt: TransactionReceipt,
        tip: &Block,
    ) -> Result<PendingUpdate> {
        let tracked = self
            .txs
            .get_mut(hash)
            .ok_or(StateError::UnknownTransaction(*hash))?;
        tracked.receipt = receipt;
        advance(tracked, PendingTransactionState::Pending, tip)
    }

    /// Drop a transaction that turned out to be invalid.
    ///
    /// Only legal once it has been executed: a `NEW_PENDING` transaction
    /// can't be dropped directly.
    pub fn invalidate(&mut self, hash: &Hash256, reason: &str, tip: &Block) -> Result<PendingUpdate> {
        let tracked = self
            .txs
            .get_mut(hash)
            .ok_or(StateError::UnknownTransaction(*hash))?;
        tracked.receipt.error = Some(reason.to_string());
        let update = advance(tracked, PendingTransactionState::Dropped, tip)?;
        self.txs.remove(hash);
        Ok(update)
    }

    /// Apply a new best block that extends the current chain.
    ///
    /// Transactions in the block become `INCLUDED`. Every other waiting
    /// transaction is re-executed on the new block (`PENDING`) and dropped
    /// once it has waited `outdated_threshold` blocks. Included transactions
    /// buried deeper than the threshold are forgotten.
    pub fn on_best_block(&mut self, block: &Block) -> Result<Vec<PendingUpdate>> {
        let threshold = self.config.outdated_threshold;
        let mut updates = Vec::new();
        let mut finished = Vec::new();

        for hash in self.arrival_order() {
            let Some(tracked) = self.txs.get_mut(&hash) else {
                continue;
            };

            if block.contains(&hash) {
                tracked.included_in = Some((block.number, block.hash));
                updates.push(advance(tracked, PendingTransactionState::Included, block)?);
                continue;
            }

            match tracked.state {
                PendingTransactionState::NewPending | PendingTransactionState::Pending => {
                    updates.push(advance(tracked, PendingTransactionState::Pending, block)?);
                    if block.number.saturating_sub(tracked.first_seen) >= threshold {
                        updates.push(advance(tracked, PendingTransactionState::Dropped, block)?);
                        finished.push(hash);
                    }
                }
                PendingTransactionState::Included => {
                    let buried = tracked
                        .included_in
                        .map(|(number, _)| block.number.saturating_sub(number) >= threshold)
                        .unwrap_or(false);
                    if buried {
                        finished.push(hash);
                    }
                }
                PendingTransactionState::Dropped => finished.push(hash),
            }
        }

        for hash in finished {
            self.txs.remove(&hash);
        }
        Ok(updates)
    }

    /// Apply a chain reorganization.
    ///
    /// `reverted` are the blocks that left the main chain, `applied` the
    /// blocks of the new main chain, oldest first. An included transaction
    /// whose block was reverted is re-included if the new chain carries it,
    /// goes back to `PENDING` if it is still within the threshold, and is
    /// dropped otherwise. Waiting transactions found in the new chain become
    /// `INCLUDED`; the others are re-executed on the new tip (`PENDING`) and
    /// dropped once outdated, as on a best block.
    pub fn on_chain_reorg(&mut self, reverted: &[Block], applied: &[Block]) -> Result<Vec<PendingUpdate>> {
        let Some(tip) = applied.last() else {
            return Ok(Vec::new());
        };

        let threshold = self.config.outdated_threshold;
        let reverted: HashSet<Hash256> = reverted.iter().map(|b| b.hash).collect();
        let mut updates = Vec::new();
        let mut finished = Vec::new();

        for hash in self.arrival_order() {
            let Some(tracked) = self.txs.get_mut(&hash) else {
                continue;
            };
            let new_home = applied.iter().find(|b| b.contains(&hash));

            match tracked.state {
                PendingTransactionState::Included => {
                    let orphaned = tracked
                        .included_in
                        .map(|(_, block_hash)| reverted.contains(&block_hash))
                        .unwrap_or(false);
                    if !orphaned {
                        continue;
                    }

                    if let Some(block) = new_home {
                        tracked.included_in = Some((block.number, block.hash));
                        updates.push(advance(tracked, PendingTransactionState::Included, block)?);
                    } else if tip.number.saturating_sub(tracked.first_seen) < threshold {
                        tracked.included_in = None;
                        updates.push(advance(tracked, PendingTransactionState::Pending, tip)?);
                    } else {
                        updates.push(advance(tracked, PendingTransactionState::Dropped, tip)?);
                        finished.push(hash);
                    }
                }
                PendingTransactionState::NewPending | PendingTransactionState::Pending => {
                    if let Some(block) = new_home {
                        tracked.included_in = Some((block.number, block.hash));
                        updates.push(advance(tracked, PendingTransactionState::Included, block)?);
                        continue;
                    }

                    updates.push(advance(tracked, PendingTransactionState::Pending, tip)?);
                    if tip.number.saturating_sub(tracked.first_seen) >= threshold {
                        updates.push(advance(tracked, PendingTransactionState::Dropped, tip)?);
                        finished.push(hash);
                    }
                }
                PendingTransactionState::Dropped => finished.push(hash),
            }
        }

        for hash in finished {
            self.txs.remove(&hash);
        }
        Ok(updates)
    }

    /// Transactions currently waiting for inclusion, oldest first.
    pub fn pending_state(&self, best_block: u64) -> PendingStateSummary {
        let pending = self
            .arrival_order()
            .into_iter()
            .filter(|hash| {
                self.txs
                    .get(hash)
                    .map(|t| pending::is_pending(t.state))
                    .unwrap_or(false)
            })
            .collect();

        PendingStateSummary {
            best_block,
            pending,
        }
    }

    fn arrival_order(&self) -> Vec<Hash256> {
        let mut entries: Vec<(u64, Hash256)> =
            self.txs.iter().map(|(hash, t)| (t.arrival, *hash)).collect();
        entries.sort_unstable();
        entries.into_iter().map(|(_, hash)| hash).collect()
    }
}

fn advance(
    tracked: &mut Tracked,
    to: PendingTransactionState,
    block: &Block,
) -> Result<PendingUpdate> {
    tracked.state = pending::transition(tracked.state, to)?;
    Ok(PendingUpdate {
        receipt: tracked.receipt.clone(),
        state: tracked.state,
        block: block.clone(),
    })
}
