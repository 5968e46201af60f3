// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Multi-level feedback queue tick policy.
//!
//! Level `L` has a quantum of 2^L ticks. Each tick, a process yields to any
//! occupied higher level first; otherwise, once its run length at the current
//! level is a multiple of the quantum it drops one level (or, at the floor,
//! rotates in place). Run length itself is counted by the process table's
//! per-tick accounting, not here.

use super::{TickDecision, TickPolicy, YieldReason};
use crate::{
    config::{quantum, AGING_THRESHOLD_TICKS, MLFQ_FLOOR, MLFQ_LEVELS},
    process::Process,
    sync::IrqMutex,
};

/// Occupancy of every level, shared by all harts.
pub struct FeedbackQueue {
    // One lock covers the higher-level scan and the level transition. It is
    // taken from the timer path, so it masks interrupts.
    occupancy: IrqMutex<[usize; MLFQ_LEVELS]>,
}

static_assertions::assert_impl_all!(FeedbackQueue: Send, Sync);

impl FeedbackQueue {
    pub const fn new() -> Self {
        Self { occupancy: IrqMutex::new([0; MLFQ_LEVELS]) }
    }

    /// Places a newly runnable process at the top level.
    pub fn admit(&self, p: &mut Process, now: u64) {
        let mut counts = self.occupancy.lock();
        counts[0] += 1;
        p.feedback.level = 0;
        p.feedback.run_ticks = 0;
        p.feedback.entered_at = now;
    }

    /// Removes an exiting process from its level.
    pub fn retire(&self, p: &Process) {
        let mut counts = self.occupancy.lock();
        let level = p.feedback.level.min(MLFQ_FLOOR);
        let _ = Self::leave(&mut counts, level, p);
    }

    /// Promotes `p` one level if it has waited at its level for at least
    /// [`AGING_THRESHOLD_TICKS`]. Returns whether it moved.
    pub fn age(&self, p: &mut Process, now: u64) -> bool {
        let level = p.feedback.level.min(MLFQ_FLOOR);
        if level == 0 || now.saturating_sub(p.feedback.entered_at) < AGING_THRESHOLD_TICKS {
            return false;
        }
        let mut counts = self.occupancy.lock();
        if !Self::leave(&mut counts, level, p) {
            return false;
        }
        counts[level - 1] += 1;
        p.feedback.level = level - 1;
        p.feedback.run_ticks = 0;
        p.feedback.entered_at = now;
        log_debug!(target: "mlfq", "pid {} aged {} -> {}", p.pid, level, level - 1);
        true
    }

    /// Snapshot of the per-level counters.
    pub fn occupancy(&self) -> [usize; MLFQ_LEVELS] {
        *self.occupancy.lock()
    }

    /// Number of processes occupying some level.
    pub fn tracked(&self) -> usize {
        self.occupancy.lock().iter().sum()
    }

    /// Takes `p` off `level`. An empty level means `p` was never admitted
    /// (or already retired); nothing is taken and the caller must not place
    /// it anywhere else.
    #[must_use]
    fn leave(counts: &mut [usize; MLFQ_LEVELS], level: usize, p: &Process) -> bool {
        if counts[level] == 0 {
            log_error!(target: "mlfq", "pid {} leaves empty level {}", p.pid, level);
            return false;
        }
        counts[level] -= 1;
        true
    }
}

impl Default for FeedbackQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TickPolicy for FeedbackQueue {
    fn on_tick(&self, p: &mut Process, now: u64) -> TickDecision {
        let mut counts = self.occupancy.lock();
        let level = p.feedback.level.min(MLFQ_FLOOR);

        if let Some(busy) = (0..level).find(|&higher| counts[higher] > 0) {
            return TickDecision::Yield(YieldReason::HigherLevelReady { level: busy });
        }

        if p.feedback.run_ticks % quantum(level) != 0 {
            return TickDecision::Continue;
        }

        p.feedback.run_ticks = 0;
        if level == MLFQ_FLOOR {
            return TickDecision::Yield(YieldReason::FloorRotation);
        }

        let next = level + 1;
        if !Self::leave(&mut counts, level, p) {
            // Untracked: give up the hart but keep the counters honest.
            return TickDecision::Yield(YieldReason::FloorRotation);
        }
        counts[next] += 1;
        p.feedback.level = next;
        p.feedback.entered_at = now;
        drop(counts);

        log_debug!(target: "mlfq", "pid {} demoted {} -> {} at tick {}", p.pid, level, next, now);
        TickDecision::Yield(YieldReason::Demoted { from: level, to: next })
    }
}
