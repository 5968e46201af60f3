// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Scheduling-tick policies consulted on every timer tick
//! OWNERS: @kernel-sched-team
//! PUBLIC API: TickPolicy, TickDecision, YieldReason, Policy, RoundRobin, Lottery, FeedbackQueue
//! DEPENDS_ON: config (policy kind, quanta), process (feedback fields)
//! INVARIANTS: One policy per boot; a decision never holds a lock across the yield it requests
//!
//! A policy only decides. The trap dispatcher performs the yield, so no
//! policy lock is ever held while the hart is handed to the scheduler.

mod feedback;
mod lottery;

#[cfg(test)]
mod tests_prop;

pub use feedback::FeedbackQueue;
pub use lottery::Lottery;

use crate::{config::PolicyKind, process::Process};

/// Why a tick gives up the hart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum YieldReason {
    /// Unconditional per-tick preemption.
    EveryTick,
    /// A strictly higher feedback level has occupants.
    HigherLevelReady { level: usize },
    /// Quantum met; the process moved one level down.
    Demoted { from: usize, to: usize },
    /// Quantum met at the floor level; the process rotates in place.
    FloorRotation,
}

#[must_use = "tick decisions must be acted upon"]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickDecision {
    /// Keep running the current process.
    Continue,
    /// Hand the hart back to the scheduler.
    Yield(YieldReason),
}

impl TickDecision {
    #[inline]
    pub fn yields(self) -> bool {
        matches!(self, TickDecision::Yield(_))
    }
}

/// Per-tick preemption policy.
pub trait TickPolicy {
    /// Called once per timer tick delivered while `p` is running. `now` is the
    /// global tick count.
    fn on_tick(&self, p: &mut Process, now: u64) -> TickDecision;
}

/// Yields on every tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct RoundRobin;

impl TickPolicy for RoundRobin {
    fn on_tick(&self, _p: &mut Process, _now: u64) -> TickDecision {
        TickDecision::Yield(YieldReason::EveryTick)
    }
}

/// The policy in force for this boot.
pub enum Policy {
    RoundRobin(RoundRobin),
    Lottery(Lottery),
    FeedbackQueue(FeedbackQueue),
}

impl Policy {
    pub fn new(kind: PolicyKind) -> Self {
        match kind {
            PolicyKind::RoundRobin => Policy::RoundRobin(RoundRobin),
            PolicyKind::Lottery => Policy::Lottery(Lottery::new()),
            PolicyKind::FeedbackQueue => Policy::FeedbackQueue(FeedbackQueue::new()),
        }
    }

    /// Builds the policy chosen through [`crate::config`].
    pub fn from_config() -> Self {
        Self::new(crate::config::active())
    }

    pub fn kind(&self) -> PolicyKind {
        match self {
            Policy::RoundRobin(_) => PolicyKind::RoundRobin,
            Policy::Lottery(_) => PolicyKind::Lottery,
            Policy::FeedbackQueue(_) => PolicyKind::FeedbackQueue,
        }
    }

    /// Feedback-queue state, for the process table's admit/retire/aging hooks.
    pub fn feedback(&self) -> Option<&FeedbackQueue> {
        match self {
            Policy::FeedbackQueue(queue) => Some(queue),
            _ => None,
        }
    }

    /// Ticket draw, for the process selector.
    pub fn lottery(&self) -> Option<&Lottery> {
        match self {
            Policy::Lottery(lottery) => Some(lottery),
            _ => None,
        }
    }
}

impl TickPolicy for Policy {
    fn on_tick(&self, p: &mut Process, now: u64) -> TickDecision {
        match self {
            Policy::RoundRobin(rr) => rr.on_tick(p, now),
            Policy::Lottery(lottery) => lottery.on_tick(p, now),
            Policy::FeedbackQueue(queue) => queue.on_tick(p, now),
        }
    }
}
