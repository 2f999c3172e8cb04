//! Admission - pending entry を実行 slot に移す
//!
//! キューのロック内で動くので、submit と確定が同時に起きても
//! 同じ空き slot を二重に取ることはない。

use super::state::QueueState;
use crate::queue::TaskEntry;

/// 今もう 1 つ開始できるか
pub(crate) fn can_admit(state: &QueueState) -> bool {
    !state.paused && state.running < state.concurrency && !state.pending.is_empty()
}

/// 空き slot の数だけ entry を admit する
///
/// 返した entry はすでに slot を確保済み（`running` を加算済み）。
/// 呼び出し側はロックを離したあと、すべてを supervisor に渡すこと。
/// 開始できるものがなければ空を返すので、余分に呼んでも害はない。
pub(crate) fn admit_ready(state: &mut QueueState) -> Vec<TaskEntry> {
    let mut admitted = Vec::new();
    while can_admit(state) {
        let Some(entry) = state.pending.pop() else {
            break;
        };
        state.running += 1;
        admitted.push(entry);
    }
    admitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::entry::tests::entry;
    use rstest::rstest;

    fn state_with(concurrency: usize, paused: bool, running: usize, priorities: &[i32]) -> QueueState {
        let mut state = QueueState::new(concurrency, paused);
        state.running = running;
        for priority in priorities {
            let sequence = state.next_sequence();
            state.pending.push(entry(*priority, sequence.value()));
        }
        state
    }

    #[rstest]
    #[case::paused(1, true, 0, 1, 0)]
    #[case::full(2, false, 2, 3, 0)]
    #[case::nothing_pending(4, false, 0, 0, 0)]
    #[case::one_free_slot(3, false, 2, 5, 1)]
    #[case::fills_every_slot(3, false, 0, 5, 3)]
    #[case::fewer_than_slots(8, false, 1, 2, 2)]
    fn admits_up_to_free_slots(
        #[case] concurrency: usize,
        #[case] paused: bool,
        #[case] running: usize,
        #[case] pending: usize,
        #[case] expected: usize,
    ) {
        let priorities = vec![0; pending];
        let mut state = state_with(concurrency, paused, running, &priorities);

        let admitted = admit_ready(&mut state);

        assert_eq!(admitted.len(), expected);
        assert_eq!(state.running, running + expected);
        assert_eq!(state.pending.len(), pending - expected);
        assert!(state.running <= concurrency);
    }

    #[test]
    fn admits_highest_priority_first() {
        let mut state = state_with(2, false, 0, &[1, 10, 5]);
        let admitted: Vec<i32> = admit_ready(&mut state)
            .iter()
            .map(|e| e.priority.value())
            .collect();
        assert_eq!(admitted, vec![10, 5]);
        assert_eq!(state.pending.peek_priority().map(|p| p.value()), Some(1));
    }

    #[test]
    fn second_call_is_a_no_op() {
        let mut state = state_with(1, false, 0, &[0, 0]);
        assert_eq!(admit_ready(&mut state).len(), 1);
        assert!(admit_ready(&mut state).is_empty());
        assert_eq!(state.running, 1);
        assert!(!can_admit(&state));
    }
}
