// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Build/boot configuration of the trap core
//! OWNERS: @kernel-sched-team
//! PUBLIC API: PolicyKind, select(), active(), ConfigError, scheduling constants
//! INVARIANTS: Exactly one policy per boot; frozen before the first trap

use core::{fmt, str::FromStr};

use spin::Once;

/// Number of feedback-queue priority levels.
pub const MLFQ_LEVELS: usize = 5;
/// Lowest-priority level; processes there rotate without further demotion.
pub const MLFQ_FLOOR: usize = MLFQ_LEVELS - 1;
/// Ticks a process may wait at a level before the selector ages it upward.
pub const AGING_THRESHOLD_TICKS: u64 = 30;
/// Width of the `ecall` instruction; the saved pc is advanced past it.
pub const ECALL_INSN_LEN: usize = 4;

/// Quantum, in ticks, of feedback-queue level `level`: 2^level.
#[inline]
pub const fn quantum(level: usize) -> u64 {
    1 << level
}

/// The scheduling-tick policies a kernel can be built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolicyKind {
    /// Preempt on every tick.
    RoundRobin,
    /// Preempt on every tick; the selector weighs processes by tickets.
    Lottery,
    /// Multi-level feedback queue with 2^L quanta.
    FeedbackQueue,
}

impl PolicyKind {
    /// Policy picked by cargo features: `sched_mlfq`, then `sched_lbs`, then
    /// round-robin.
    pub const fn build_default() -> Self {
        if cfg!(feature = "sched_mlfq") {
            PolicyKind::FeedbackQueue
        } else if cfg!(feature = "sched_lbs") {
            PolicyKind::Lottery
        } else {
            PolicyKind::RoundRobin
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PolicyKind::RoundRobin => "RR",
            PolicyKind::Lottery => "LBS",
            PolicyKind::FeedbackQueue => "MLFQ",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The policy was already chosen (explicitly or by a first read).
    AlreadySelected(PolicyKind),
    /// Unknown policy name.
    UnknownPolicy,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::AlreadySelected(kind) => write!(f, "policy already selected: {kind}"),
            ConfigError::UnknownPolicy => f.write_str("unknown scheduling policy"),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rr") {
            Ok(PolicyKind::RoundRobin)
        } else if s.eq_ignore_ascii_case("lbs") || s.eq_ignore_ascii_case("lottery") {
            Ok(PolicyKind::Lottery)
        } else if s.eq_ignore_ascii_case("mlfq") {
            Ok(PolicyKind::FeedbackQueue)
        } else {
            Err(ConfigError::UnknownPolicy)
        }
    }
}

/// One-shot policy slot.
pub struct PolicySlot {
    kind: Once<PolicyKind>,
}

impl PolicySlot {
    pub const fn new() -> Self {
        Self { kind: Once::new() }
    }

    /// Chooses `kind`. Fails if a policy is already in force.
    pub fn select(&self, kind: PolicyKind) -> Result<PolicyKind, ConfigError> {
        let mut installed = false;
        let active = *self.kind.call_once(|| {
            installed = true;
            kind
        });
        if installed {
            Ok(active)
        } else {
            Err(ConfigError::AlreadySelected(active))
        }
    }

    /// The policy in force; freezes the build default if none was selected.
    pub fn active(&self) -> PolicyKind {
        *self.kind.call_once(PolicyKind::build_default)
    }
}

impl Default for PolicySlot {
    fn default() -> Self {
        Self::new()
    }
}

static POLICY: PolicySlot = PolicySlot::new();

/// Selects the kernel's scheduling policy. Call once during boot, before
/// interrupts are enabled on any hart.
pub fn select(kind: PolicyKind) -> Result<PolicyKind, ConfigError> {
    let result = POLICY.select(kind);
    match result {
        Ok(kind) => log_info!(target: "config", "scheduling policy {}", kind),
        Err(err) => log_warn!(target: "config", "{}", err),
    }
    result
}

/// The kernel's scheduling policy.
pub fn active() -> PolicyKind {
    POLICY.active()
}
