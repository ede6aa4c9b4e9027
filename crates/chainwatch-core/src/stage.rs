//! Sync stages and the properties derived from them.
//!
//! `SyncStage` is a plain tag. What a stage implies (is this fast sync, can
//! the state be trusted, is the chain head current) is answered by the free
//! functions below, all reading one lookup table.
//!
//! ```text
//! fast sync:  PivotBlock -> StateNodes -> Headers -> BlockBodies -> Receipts -> Complete
//! full sync:  Regular -> Complete
//! disabled:   Off
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StateError;

/// The phase the synchronization process is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SyncStage {
    /// Fast sync: choosing a pivot block. Normally several peers agree on it,
    /// but it is forced from the peers at hand after a timeout.
    PivotBlock = 0,
    /// Fast sync: downloading state trie nodes and importing blocks.
    StateNodes = 1,
    /// Fast sync: downloading headers to secure the downloaded state.
    Headers = 2,
    /// Fast sync: downloading block bodies.
    BlockBodies = 3,
    /// Fast sync: downloading receipts.
    Receipts = 4,
    /// Regular (full) sync in progress.
    Regular = 5,
    /// Fast sync: state is secure, all blocks and receipts downloaded.
    /// Regular sync: all blocks imported up to the chain head.
    Complete = 6,
    /// Syncing is turned off.
    Off = 7,
}

impl SyncStage {
    /// Every stage, in declaration order.
    pub const ALL: [SyncStage; 8] = [
        SyncStage::PivotBlock,
        SyncStage::StateNodes,
        SyncStage::Headers,
        SyncStage::BlockBodies,
        SyncStage::Receipts,
        SyncStage::Regular,
        SyncStage::Complete,
        SyncStage::Off,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            SyncStage::PivotBlock => "PivotBlock",
            SyncStage::StateNodes => "StateNodes",
            SyncStage::Headers => "Headers",
            SyncStage::BlockBodies => "BlockBodies",
            SyncStage::Receipts => "Receipts",
            SyncStage::Regular => "Regular",
            SyncStage::Complete => "Complete",
            SyncStage::Off => "Off",
        }
    }

    /// Whether a snapshot at this stage carries a progress fraction.
    pub const fn reports_progress(self) -> bool {
        !matches!(self, SyncStage::Off | SyncStage::Complete)
    }
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SyncStage {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncStage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| StateError::UnknownSyncStage(s.to_string()))
    }
}

impl TryFrom<u8> for SyncStage {
    type Error = StateError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        SyncStage::ALL
            .get(tag as usize)
            .copied()
            .ok_or(StateError::UnknownStageTag(tag))
    }
}

impl From<SyncStage> for u8 {
    fn from(stage: SyncStage) -> Self {
        stage as u8
    }
}

/// Stages whose state has not yet been confirmed by a verified header chain.
pub const UNSECURE_STAGES: [SyncStage; 3] =
    [SyncStage::PivotBlock, SyncStage::StateNodes, SyncStage::Headers];

/// Properties derived from a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTraits {
    pub fast_sync: bool,
    pub secure: bool,
    pub latest_state: bool,
}

/// Look up the derived properties of `stage`.
pub const fn stage_traits(stage: SyncStage) -> StageTraits {
    const fn t(fast_sync: bool, secure: bool, latest_state: bool) -> StageTraits {
        StageTraits {
            fast_sync,
            secure,
            latest_state,
        }
    }

    match stage {
        //                                 fast   secure latest
        SyncStage::PivotBlock => t(true, false, false),
        SyncStage::StateNodes => t(true, false, false),
        SyncStage::Headers => t(true, false, true),
        SyncStage::BlockBodies => t(true, true, true),
        SyncStage::Receipts => t(true, true, true),
        SyncStage::Regular => t(false, true, false),
        SyncStage::Complete => t(false, true, true),
        SyncStage::Off => t(false, true, false),
    }
}

/// True while a fast sync is under way.
pub const fn is_fast_sync(stage: SyncStage) -> bool {
    stage_traits(stage).fast_sync
}

/// True once the chain state can be trusted: every header up to the head
/// has been downloaded and verified.
///
/// Before that (pivot selection, state download, header download) the
/// state may already be queried but is not confirmed by the chain.
pub fn is_secure(stage: SyncStage) -> bool {
    !UNSECURE_STAGES.contains(&stage)
}

/// True when the local view of the chain head is current, even if the state
/// is not yet secure or historical blocks are still missing.
pub const fn has_latest_state(stage: SyncStage) -> bool {
    stage_traits(stage).latest_state
}

/// Coarse sync milestone reported to observers when it is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    /// Full state downloaded and the chain is at the latest block, so state
    /// queries and transaction submission work, but the state is not yet
    /// confirmed by the header chain. Historical blocks and receipts are
    /// not available.
    Unsecure,
    /// As `Unsecure`, but the state is confirmed by the full verified
    /// header chain. Historical blocks and receipts are still missing.
    Secure,
    /// All blocks and receipts are downloaded.
    Complete,
}

impl SyncState {
    /// The milestone a node sitting at `stage` has reached, if any.
    pub fn from_stage(stage: SyncStage) -> Option<SyncState> {
        if stage == SyncStage::Complete {
            return Some(SyncState::Complete);
        }
        match (has_latest_state(stage), is_secure(stage)) {
            (true, false) => Some(SyncState::Unsecure),
            (true, true) => Some(SyncState::Secure),
            (false, _) => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SyncState::Unsecure => "UNSECURE",
            SyncState::Secure => "SECURE",
            SyncState::Complete => "COMPLETE",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
