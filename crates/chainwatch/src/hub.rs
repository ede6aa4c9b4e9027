//! The node event hub: what a node embeds to publish its progress.
//!
//! The hub owns the listener registry, the pending transaction tracker and
//! the latest sync snapshot. Drivers report facts to it; it works out the
//! resulting notifications and fans them out.

use std::sync::Arc;

use chainwatch_core::{
    Block, BlockSummary, Hash256, PendingStateSummary, PendingTracker, PendingUpdate, SyncState,
    SyncStatus, TrackerConfig, Transaction, TransactionReceipt,
};
use chainwatch_notify::{
    DeliveryMode, ListenerId, ListenerRegistry, NodeEventNotifier, NotifierConfig,
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// Configuration for the hub.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Listener delivery settings.
    pub notifier: NotifierConfig,
    /// Pending transaction settings.
    pub tracker: TrackerConfig,
}

impl HubConfig {
    /// Read a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HubError::Config(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct SyncProgress {
    latest: Option<SyncStatus>,
    reached: Option<SyncState>,
}

/// Facade over sync reporting, pending transaction tracking and
/// observer fan-out.
pub struct NodeEventHub {
    config: HubConfig,
    registry: Arc<ListenerRegistry>,
    tracker: Mutex<PendingTracker>,
    sync: RwLock<SyncProgress>,
    /// Held while a milestone is chosen and published, so concurrent
    /// reporters can't publish milestones out of order.
    milestones: Mutex<()>,
}

impl NodeEventHub {
    /// Create a new hub.
    pub fn new(config: HubConfig) -> Self {
        Self {
            registry: Arc::new(ListenerRegistry::new(config.notifier.clone())),
            tracker: Mutex::new(PendingTracker::new(config.tracker.clone())),
            sync: RwLock::new(SyncProgress::default()),
            milestones: Mutex::new(()),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// The registry, for listener management.
    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    /// The publishing side, for event sources the hub doesn't drive itself
    /// (networking, block import, the VM).
    pub fn notifier(&self) -> Arc<dyn NodeEventNotifier> {
        self.registry.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Listeners
    // ─────────────────────────────────────────────────────────────────────────

    /// Register an observer with the configured delivery mode.
    pub fn subscribe(
        &self,
        name: impl Into<String>,
        listener: Arc<dyn NodeEventNotifier>,
    ) -> Result<ListenerId> {
        Ok(self.registry.register(name, listener)?)
    }

    /// Register an observer with an explicit delivery mode.
    pub fn subscribe_with(
        &self,
        name: impl Into<String>,
        listener: Arc<dyn NodeEventNotifier>,
        mode: DeliveryMode,
    ) -> Result<ListenerId> {
        Ok(self.registry.register_with(name, listener, mode)?)
    }

    pub fn unsubscribe(&self, id: ListenerId) -> Result<()> {
        Ok(self.registry.unregister(id)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a new sync snapshot.
    ///
    /// Publishes `on_sync_done` the first time the snapshot's stage reaches a
    /// milestone beyond every milestone reported so far. Returns the
    /// milestone published, if any.
    ///
    /// Safe to call from several threads; observers see milestones in
    /// increasing order. Must not be called from inside `on_sync_done`.
    pub fn report_sync_status(&self, status: SyncStatus) -> Option<SyncState> {
        let _publishing = self.milestones.lock();
        let milestone = {
            let mut sync = self.sync.write();
            sync.latest = Some(status);
            match SyncState::from_stage(status.stage()) {
                Some(state) if sync.reached.map_or(true, |reached| state > reached) => {
                    sync.reached = Some(state);
                    Some(state)
                }
                _ => None,
            }
        };

        tracing::debug!(%status, "sync status");
        if let Some(state) = milestone {
            tracing::info!(%state, stage = %status.stage(), "sync milestone reached");
            self.registry.on_sync_done(state);
        }
        milestone
    }

    /// Latest reported snapshot.
    pub fn sync_status(&self) -> Option<SyncStatus> {
        self.sync.read().latest
    }

    /// Highest milestone published so far.
    pub fn sync_state(&self) -> Option<SyncState> {
        self.sync.read().reached
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pending transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Start tracking newly received transactions on top of `tip`.
    ///
    /// Transactions that are already tracked are skipped. Returns the
    /// `NEW_PENDING` updates published.
    pub fn receive_pending(
        &self,
        receipts: Vec<TransactionReceipt>,
        tip: &Block,
    ) -> Vec<PendingUpdate> {
        let (updates, pending_state) = {
            let mut tracker = self.tracker.lock();
            let updates: Vec<PendingUpdate> = receipts
                .into_iter()
                .filter_map(|receipt| tracker.receive(receipt, tip))
                .collect();
            (updates, tracker.pending_state(tip.number))
        };
        if updates.is_empty() {
            return updates;
        }

        let received: Vec<Transaction> = updates
            .iter()
            .map(|update| update.receipt.transaction.clone())
            .collect();
        self.registry.on_pending_transactions_received(&received);
        self.publish_updates(&updates);
        self.registry.on_pending_state_changed(&pending_state);
        updates
    }

    /// Record that a pending transaction was executed on top of `tip`.
    pub fn mark_executed(
        &self,
        hash: &Hash256,
        receipt: TransactionReceipt,
        tip: &Block,
    ) -> Result<PendingUpdate> {
        let update = self.tracker.lock().mark_executed(hash, receipt, tip)?;
        self.publish_updates(std::slice::from_ref(&update));
        Ok(update)
    }

    /// Drop a pending transaction that failed validation.
    pub fn invalidate_pending(
        &self,
        hash: &Hash256,
        reason: &str,
        tip: &Block,
    ) -> Result<PendingUpdate> {
        let update = self.tracker.lock().invalidate(hash, reason, tip)?;
        tracing::debug!(tx = %hash, reason, "pending transaction dropped");
        self.publish_updates(std::slice::from_ref(&update));
        Ok(update)
    }

    /// Apply a new best block.
    ///
    /// Publishes the block as best, then every pending transaction update it
    /// causes, then the rebuilt pending state.
    pub fn on_best_block(&self, summary: &BlockSummary) -> Result<Vec<PendingUpdate>> {
        let (updates, pending_state) = {
            let mut tracker = self.tracker.lock();
            let updates = tracker.on_best_block(&summary.block)?;
            (updates, tracker.pending_state(summary.number()))
        };

        self.registry.on_block_with_best(summary, true);
        self.publish_updates(&updates);
        self.registry.on_pending_state_changed(&pending_state);
        Ok(updates)
    }

    /// Apply a chain reorganization.
    ///
    /// `reverted` are the blocks leaving the canonical chain and `applied`
    /// the blocks replacing them, lowest first.
    pub fn on_chain_reorg(&self, reverted: &[Block], applied: &[Block]) -> Result<Vec<PendingUpdate>> {
        let (updates, pending_state) = {
            let mut tracker = self.tracker.lock();
            let updates = tracker.on_chain_reorg(reverted, applied)?;
            let pending_state = applied
                .last()
                .map(|tip| tracker.pending_state(tip.number));
            (updates, pending_state)
        };

        tracing::debug!(
            reverted = reverted.len(),
            applied = applied.len(),
            updates = updates.len(),
            "chain reorganized"
        );
        self.publish_updates(&updates);
        if let Some(pending_state) = pending_state {
            self.registry.on_pending_state_changed(&pending_state);
        }
        Ok(updates)
    }

    /// Hashes of the transactions currently waiting, on top of `best_block`.
    pub fn pending_state(&self, best_block: u64) -> PendingStateSummary {
        self.tracker.lock().pending_state(best_block)
    }

    fn publish_updates(&self, updates: &[PendingUpdate]) {
        for update in updates {
            tracing::trace!(tx = %update.receipt.tx_hash(), state = %update.state, "pending update");
            self.registry
                .on_pending_transaction_update(&update.receipt, update.state, &update.block);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Stop publishing and wait for queued observers to catch up.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

impl Default for NodeEventHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_core::{Address, PendingTransactionState, SyncStage};

    fn block(number: u64, tags: &[u8]) -> Block {
        Block {
            number,
            hash: Hash256::from_bytes([number as u8; 32]),
            parent_hash: Hash256::from_bytes([number.wrapping_sub(1) as u8; 32]),
            transactions: tags.iter().map(|tag| receipt(*tag).transaction).collect(),
        }
    }

    fn receipt(tag: u8) -> TransactionReceipt {
        TransactionReceipt {
            transaction: Transaction {
                hash: Hash256::from_bytes([tag; 32]),
                nonce: tag as u64,
                sender: Address::from_bytes([tag; 20]),
                receiver: None,
                value: 1,
                gas_limit: 21_000,
            },
            success: true,
            gas_used: 0,
            error: None,
        }
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = HubConfig::from_json(r#"{ "tracker": { "outdated_threshold": 3 } }"#).unwrap();
        assert_eq!(config.tracker.outdated_threshold, 3);
        assert_eq!(config.notifier, NotifierConfig::default());
    }

    #[test]
    fn test_config_from_bad_json() {
        let err = HubConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, HubError::Config(_)));
    }

    #[test]
    fn test_milestones_only_move_forward() {
        let hub = NodeEventHub::default();
        let status = |stage| SyncStatus::new(stage, 1, 2, 3, 4);

        assert_eq!(hub.report_sync_status(status(SyncStage::PivotBlock)), None);
        assert_eq!(
            hub.report_sync_status(status(SyncStage::Headers)),
            Some(SyncState::Unsecure)
        );
        assert_eq!(hub.report_sync_status(status(SyncStage::Headers)), None);
        assert_eq!(
            hub.report_sync_status(status(SyncStage::BlockBodies)),
            Some(SyncState::Secure)
        );
        assert_eq!(hub.report_sync_status(status(SyncStage::Receipts)), None);
        assert_eq!(hub.report_sync_status(status(SyncStage::Headers)), None);
        assert_eq!(
            hub.report_sync_status(status(SyncStage::Complete)),
            Some(SyncState::Complete)
        );

        assert_eq!(hub.sync_state(), Some(SyncState::Complete));
        assert_eq!(hub.sync_status(), Some(status(SyncStage::Complete)));
    }

    #[test]
    fn test_duplicate_receipts_are_not_republished() {
        let hub = NodeEventHub::default();
        let tip = block(1, &[]);

        assert_eq!(hub.receive_pending(vec![receipt(1), receipt(2)], &tip).len(), 2);
        let again = hub.receive_pending(vec![receipt(2)], &tip);
        assert!(again.is_empty());
        assert_eq!(hub.pending_state(1).pending.len(), 2);
    }

    #[test]
    fn test_best_block_includes_its_transactions() {
        let hub = NodeEventHub::default();
        hub.receive_pending(vec![receipt(1), receipt(2)], &block(1, &[]));

        let mined = block(2, &[1]);
        let summary = BlockSummary {
            block: mined.clone(),
            receipts: vec![],
            summaries: vec![],
            total_difficulty: 2,
        };
        let updates = hub.on_best_block(&summary).unwrap();

        let states: Vec<_> = updates
            .iter()
            .map(|u| (u.receipt.tx_hash(), u.state, u.block.number))
            .collect();
        assert_eq!(
            states,
            vec![
                (receipt(1).tx_hash(), PendingTransactionState::Included, 2),
                (receipt(2).tx_hash(), PendingTransactionState::Pending, 2),
            ]
        );
        assert_eq!(updates[0].block, mined);
        assert_eq!(hub.pending_state(2).pending, vec![receipt(2).tx_hash()]);
    }

    #[test]
    fn test_unknown_transaction_is_state_error() {
        let hub = NodeEventHub::default();
        let tip = block(1, &[]);
        let hash = Hash256::from_bytes([9; 32]);

        let err = hub.mark_executed(&hash, receipt(9), &tip).unwrap_err();
        assert!(matches!(err, HubError::State(_)));
    }
}
