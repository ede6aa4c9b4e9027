//! Sync progress snapshots.
//!
//! A [`SyncStatus`] captures one instant of sync progress. The sync driver
//! builds a fresh one on every update; nothing mutates it afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, StateError};
use crate::stage::{self, SyncStage};

/// Progress of the sync process at one instant.
///
/// What the two counters measure depends on the stage:
///
/// | stage       | `current_count`                | `known_count`                     |
/// |-------------|--------------------------------|-----------------------------------|
/// | PivotBlock  | seconds spent looking          | seconds until the pivot is forced |
/// | StateNodes  | trie nodes downloaded          | trie nodes known so far           |
/// | Headers     | headers downloaded             | headers to download               |
/// | BlockBodies | bodies downloaded              | bodies to download                |
/// | Receipts    | blocks with receipts fetched   | blocks whose receipts are needed  |
///
/// `known_count` is an estimate, not a fixed denominator: state trie nodes are
/// discovered as their parents arrive, and `current_count` for PivotBlock
/// exceeds it when no peers are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    stage: SyncStage,
    current_count: u64,
    known_count: u64,
    last_imported_block: u64,
    block_best_known: u64,
}

impl SyncStatus {
    pub const fn new(
        stage: SyncStage,
        current_count: u64,
        known_count: u64,
        last_imported_block: u64,
        block_best_known: u64,
    ) -> Self {
        Self {
            stage,
            current_count,
            known_count,
            last_imported_block,
            block_best_known,
        }
    }

    /// Same stage and counters as `previous`, with fresh block numbers.
    pub const fn with_blocks(
        previous: &SyncStatus,
        last_imported_block: u64,
        block_best_known: u64,
    ) -> Self {
        Self::new(
            previous.stage,
            previous.current_count,
            previous.known_count,
            last_imported_block,
            block_best_known,
        )
    }

    /// A snapshot with both block numbers at zero.
    pub const fn without_blocks(stage: SyncStage, current_count: u64, known_count: u64) -> Self {
        Self::new(stage, current_count, known_count, 0, 0)
    }

    /// Build from signed counters, rejecting any negative value.
    pub fn try_from_signed(
        stage: SyncStage,
        current_count: i64,
        known_count: i64,
        last_imported_block: i64,
        block_best_known: i64,
    ) -> Result<Self> {
        fn unsigned(field: &'static str, value: i64) -> Result<u64> {
            u64::try_from(value).map_err(|_| StateError::NegativeCount { field, value })
        }

        Ok(Self::new(
            stage,
            unsigned("current_count", current_count)?,
            unsigned("known_count", known_count)?,
            unsigned("last_imported_block", last_imported_block)?,
            unsigned("block_best_known", block_best_known)?,
        ))
    }

    pub const fn stage(&self) -> SyncStage {
        self.stage
    }

    pub const fn current_count(&self) -> u64 {
        self.current_count
    }

    pub const fn known_count(&self) -> u64 {
        self.known_count
    }

    /// Highest block imported into the local chain. Import runs alongside
    /// header/body/receipt download, so this moves independently of the
    /// stage counters.
    pub const fn last_imported_block(&self) -> u64 {
        self.last_imported_block
    }

    /// Highest block any connected peer is known to have.
    pub const fn block_best_known(&self) -> u64 {
        self.block_best_known
    }

    pub const fn is_fast_sync(&self) -> bool {
        stage::is_fast_sync(self.stage)
    }

    pub fn is_secure(&self) -> bool {
        stage::is_secure(self.stage)
    }

    pub const fn has_latest_state(&self) -> bool {
        stage::has_latest_state(self.stage)
    }

    /// `current / known`, capped at 1.0.
    ///
    /// `None` for Off and Complete, and while nothing is known yet.
    pub fn progress_fraction(&self) -> Option<f64> {
        if !self.stage.reports_progress() || self.known_count == 0 {
            return None;
        }
        let fraction = self.current_count as f64 / self.known_count as f64;
        Some(fraction.min(1.0))
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stage)?;
        if self.stage.reports_progress() {
            write!(f, " ({} of {})", self.current_count, self.known_count)?;
        }
        write!(
            f,
            ", last block #{}, best known #{}",
            self.last_imported_block, self.block_best_known
        )
    }
}
