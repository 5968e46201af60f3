// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

#![cfg(test)]
//! CONTEXT: Property-based tests for the feedback-queue policy
//! OWNERS: @kernel-sched-team
//! NOTE: Tests only; no kernel logic.
//!
//! TEST_SCOPE:
//!   - Occupancy counters always equal the per-level population of live processes
//!   - Quantum law: run length a multiple of 2^L below the floor demotes to L+1
//!   - Higher-level occupancy always preempts

use proptest::prelude::*;
use std::vec::Vec;

use super::{FeedbackQueue, TickDecision, TickPolicy, YieldReason};
use crate::{
    config::{quantum, MLFQ_FLOOR, MLFQ_LEVELS},
    process::Process,
    testing::process,
};

#[derive(Clone, Debug)]
enum Op {
    Admit,
    Tick { who: usize, run: u64 },
    Age { who: usize, wait: u64 },
    Retire { who: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Admit),
        (any::<usize>(), 0u64..64).prop_map(|(who, run)| Op::Tick { who, run }),
        (any::<usize>(), 0u64..64).prop_map(|(who, wait)| Op::Age { who, wait }),
        any::<usize>().prop_map(|who| Op::Retire { who }),
    ]
}

fn population(live: &[Process]) -> [usize; MLFQ_LEVELS] {
    let mut counts = [0; MLFQ_LEVELS];
    for p in live {
        counts[p.feedback.level] += 1;
    }
    counts
}

proptest! {
    #[test]
    fn occupancy_matches_population(ops in proptest::collection::vec(arb_op(), 1..200)) {
        let queue = FeedbackQueue::new();
        let mut live: Vec<Process> = Vec::new();
        let mut now = 0u64;
        let mut next_pid = 1u32;

        for op in ops {
            now += 1;
            match op {
                Op::Admit => {
                    let mut p = process(next_pid);
                    next_pid += 1;
                    queue.admit(&mut p, now);
                    live.push(p);
                }
                Op::Tick { who, run } if !live.is_empty() => {
                    let idx = who % live.len();
                    live[idx].feedback.run_ticks = run;
                    let _ = queue.on_tick(&mut live[idx], now);
                }
                Op::Age { who, wait } if !live.is_empty() => {
                    let idx = who % live.len();
                    let _ = queue.age(&mut live[idx], now + wait);
                }
                Op::Retire { who } if !live.is_empty() => {
                    let p = live.swap_remove(who % live.len());
                    queue.retire(&p);
                }
                _ => {}
            }
            prop_assert_eq!(queue.occupancy(), population(&live));
            prop_assert_eq!(queue.tracked(), live.len());
        }
    }

    #[test]
    fn quantum_law(level in 0usize..MLFQ_FLOOR, multiple in 1u64..8, now in 0u64..10_000) {
        let queue = FeedbackQueue::new();
        let mut p = process(1);
        queue.admit(&mut p, 0);
        for l in 0..level {
            p.feedback.run_ticks = quantum(l);
            let _ = queue.on_tick(&mut p, 0);
        }
        prop_assert_eq!(p.feedback.level, level);

        p.feedback.run_ticks = quantum(level) * multiple;
        let decision = queue.on_tick(&mut p, now);
        prop_assert_eq!(decision, TickDecision::Yield(YieldReason::Demoted { from: level, to: level + 1 }));
        prop_assert_eq!(p.feedback.level, level + 1);
        prop_assert_eq!(p.feedback.run_ticks, 0);
        prop_assert_eq!(p.feedback.entered_at, now);
    }

    #[test]
    fn higher_occupancy_preempts(level in 1usize..MLFQ_LEVELS, run in 0u64..64) {
        let queue = FeedbackQueue::new();
        let mut p = process(1);
        queue.admit(&mut p, 0);
        for l in 0..level {
            p.feedback.run_ticks = quantum(l);
            let _ = queue.on_tick(&mut p, 0);
        }
        let mut waiting = process(2);
        queue.admit(&mut waiting, 1);

        p.feedback.run_ticks = run;
        let before = queue.occupancy();
        prop_assert_eq!(
            queue.on_tick(&mut p, 2),
            TickDecision::Yield(YieldReason::HigherLevelReady { level: 0 })
        );
        prop_assert_eq!(p.feedback.level, level);
        prop_assert_eq!(p.feedback.run_ticks, run);
        prop_assert_eq!(queue.occupancy(), before);
    }
}
