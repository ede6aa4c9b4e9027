//! Proptest generators for property-based testing.

use proptest::prelude::*;

use chainwatch_core::{can_transition, PendingTransactionState, SyncStage, SyncStatus};

/// Generate any sync stage.
pub fn sync_stage() -> impl Strategy<Value = SyncStage> {
    prop::sample::select(SyncStage::ALL.to_vec())
}

/// Generate any pending transaction state.
pub fn pending_state() -> impl Strategy<Value = PendingTransactionState> {
    prop::sample::select(PendingTransactionState::ALL.to_vec())
}

/// Generate a snapshot with arbitrary counters.
///
/// `current_count` may exceed `known_count`, as it does while a pivot block
/// search runs without peers.
pub fn sync_status() -> impl Strategy<Value = SyncStatus> {
    (
        sync_stage(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
    )
        .prop_map(|(stage, current, known, last, best)| {
            SyncStatus::new(stage, current, known, last, best)
        })
}

/// Generate a legal lifecycle of one transaction, starting at `NEW_PENDING`.
///
/// The path ends early when it reaches `DROPPED`.
pub fn transition_path(max_len: usize) -> impl Strategy<Value = Vec<PendingTransactionState>> {
    prop::collection::vec(any::<prop::sample::Index>(), 0..=max_len).prop_map(|choices| {
        let mut path = vec![PendingTransactionState::NewPending];
        for choice in choices {
            let Some(&from) = path.last() else { break };
            let next: Vec<PendingTransactionState> = PendingTransactionState::ALL
                .iter()
                .copied()
                .filter(|&to| can_transition(from, to))
                .collect();
            if next.is_empty() {
                break;
            }
            path.push(*choice.get(&next));
        }
        path
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwatch_core::{is_pending, transition};

    proptest! {
        #[test]
        fn generated_paths_are_legal(path in transition_path(16)) {
            prop_assert_eq!(path[0], PendingTransactionState::NewPending);
            for pair in path.windows(2) {
                prop_assert!(transition(pair[0], pair[1]).is_ok());
            }
        }

        #[test]
        fn dropped_only_at_the_end(path in transition_path(16)) {
            if let Some(i) = path.iter().position(|s| *s == PendingTransactionState::Dropped) {
                prop_assert_eq!(i, path.len() - 1);
            }
        }

        #[test]
        fn new_pending_never_reentered(path in transition_path(16)) {
            prop_assert!(path[1..].iter().all(|s| *s != PendingTransactionState::NewPending));
        }

        #[test]
        fn pending_states_are_the_waiting_ones(state in pending_state()) {
            let waiting = matches!(
                state,
                PendingTransactionState::NewPending | PendingTransactionState::Pending
            );
            prop_assert_eq!(is_pending(state), waiting);
        }

        #[test]
        fn snapshot_renders_its_stage(status in sync_status()) {
            prop_assert!(status.to_string().starts_with(status.stage().name()));
        }
    }
}
