// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Trap and scheduling-tick core for the multi-hart Sv39 kernel.
//!
//! Every trap taken by a hart lands here: system calls are handed to the
//! syscall table, load/store page faults are resolved by copy-on-write
//! duplication, device interrupts are routed through the PLIC to their
//! drivers, and timer ticks drive the alarm and the active scheduling-tick
//! policy. The frame allocator, page-table walker, process table, drivers and
//! the assembly trampoline are collaborators reached through [`hal`] traits.

#![cfg_attr(not(test), no_std)]
#![forbid(clippy::unwrap_used)]

#[macro_use]
pub mod log;

pub mod alarm;
mod arch;
pub mod clock;
pub mod config;
pub mod determinism;
pub mod hal;
pub mod mm;
pub mod panic;
pub mod process;
pub mod sched;
pub mod sync;
pub mod trap;
pub mod types;
pub mod uart;

#[cfg(test)]
pub(crate) mod testing;

pub use clock::TickClock;
pub use config::PolicyKind;
pub use process::{Process, ProcState};
pub use sched::{Policy, TickDecision, TickPolicy};
pub use trap::{TrapCore, TrapFrame, TrapVectors, UserTrapOutcome};
