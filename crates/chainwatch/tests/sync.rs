//! Sync progress reporting.

use std::sync::{Arc, Barrier};
use std::thread;

use chainwatch::core::{SyncStage, SyncState, SyncStatus};
use chainwatch::NodeEventHub;
use chainwatch_testkit::{sync_stage, RecordingListener};
use proptest::prelude::*;

#[test]
fn fast_sync_reports_each_milestone_once() -> anyhow::Result<()> {
    let hub = NodeEventHub::default();
    let recorder = Arc::new(RecordingListener::new());
    hub.subscribe("recorder", recorder.clone())?;

    let stages = [
        SyncStage::PivotBlock,
        SyncStage::StateNodes,
        SyncStage::Headers,
        SyncStage::Headers,
        SyncStage::BlockBodies,
        SyncStage::Receipts,
        SyncStage::Complete,
    ];
    for (i, stage) in stages.into_iter().enumerate() {
        hub.report_sync_status(SyncStatus::new(stage, i as u64, 10, 100, 120));
    }

    assert_eq!(
        recorder.sync_milestones(),
        vec![SyncState::Unsecure, SyncState::Secure, SyncState::Complete]
    );
    let latest = hub.sync_status().ok_or_else(|| anyhow::anyhow!("no status"))?;
    assert_eq!(latest.to_string(), "Complete, last block #100, best known #120");
    Ok(())
}

#[test]
fn full_sync_reports_complete_only() -> anyhow::Result<()> {
    let hub = NodeEventHub::default();
    let recorder = Arc::new(RecordingListener::new());
    hub.subscribe("recorder", recorder.clone())?;

    hub.report_sync_status(SyncStatus::new(SyncStage::Regular, 0, 0, 10, 500));
    hub.report_sync_status(SyncStatus::new(SyncStage::Complete, 0, 0, 500, 500));

    assert_eq!(recorder.sync_milestones(), vec![SyncState::Complete]);
    Ok(())
}

#[test]
fn block_numbers_follow_without_new_counts() {
    let headers = SyncStatus::new(SyncStage::Headers, 5, 10, 100, 120);
    let later = SyncStatus::with_blocks(&headers, 110, 125);
    assert_eq!(later.to_string(), "Headers (5 of 10), last block #110, best known #125");
}

#[test]
fn concurrent_reporters_publish_milestones_in_order() -> anyhow::Result<()> {
    for _ in 0..50 {
        let hub = NodeEventHub::default();
        let recorder = Arc::new(RecordingListener::new());
        hub.subscribe("recorder", recorder.clone())?;

        let stages = [SyncStage::Headers, SyncStage::BlockBodies, SyncStage::Complete];
        let start = Barrier::new(stages.len());
        thread::scope(|scope| {
            for stage in stages {
                let (hub, start) = (&hub, &start);
                scope.spawn(move || {
                    start.wait();
                    hub.report_sync_status(SyncStatus::without_blocks(stage, 1, 1));
                });
            }
        });

        let milestones = recorder.sync_milestones();
        assert!(!milestones.is_empty());
        assert!(milestones.windows(2).all(|w| w[0] < w[1]), "{milestones:?}");
        assert_eq!(milestones.last(), Some(&SyncState::Complete));
    }
    Ok(())
}

proptest! {
    #[test]
    fn milestones_never_repeat_or_regress(stages in prop::collection::vec(sync_stage(), 0..32)) {
        let hub = NodeEventHub::default();
        let recorder = Arc::new(RecordingListener::new());
        hub.subscribe("recorder", recorder.clone()).unwrap();

        for stage in stages {
            hub.report_sync_status(SyncStatus::without_blocks(stage, 1, 2));
        }

        let milestones = recorder.sync_milestones();
        prop_assert!(milestones.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(hub.sync_state(), milestones.last().copied());
    }
}
