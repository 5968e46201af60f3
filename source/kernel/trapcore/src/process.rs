// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: The slice of a process record the trap core reads and mutates
//! OWNERS: @kernel-sched-team
//! PUBLIC API: Process, ProcState, AlarmState, FeedbackState
//! INVARIANTS: Records are created and destroyed by the process table only;
//!             `killed` is the sole field written from other harts

use core::sync::atomic::{AtomicBool, Ordering};

use crate::{
    mm::PageTableHandle,
    trap::TrapFrame,
    types::Pid,
};

const NAME_LEN: usize = 16;

/// Lifecycle state as tracked by the process table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Used,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

/// Periodic callback registration (sigalarm).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlarmState {
    /// Armed until the handler has been entered once.
    pub armed: bool,
    /// Tick quota after which the handler runs.
    pub interval: u64,
    /// Timer ticks delivered to the process since arming.
    pub elapsed: u64,
    /// User address of the handler.
    pub handler: usize,
}

/// Multi-level feedback queue bookkeeping.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedbackState {
    /// Current level, 0 is the highest priority.
    pub level: usize,
    /// Ticks consumed at the current level; bumped by run-time accounting.
    pub run_ticks: u64,
    /// Tick at which the process entered its current level.
    pub entered_at: u64,
}

/// Process fields touched during trap handling.
pub struct Process {
    pub pid: Pid,
    name: [u8; NAME_LEN],
    pub state: ProcState,
    killed: AtomicBool,
    /// Bottom of the process's kernel stack (one page).
    pub kstack: usize,
    pub pagetable: PageTableHandle,
    pub trapframe: TrapFrame,
    /// Trapframe captured when the alarm fired, restored on sigreturn.
    pub alarm_frame: TrapFrame,
    pub alarm: AlarmState,
    pub feedback: FeedbackState,
}

impl Process {
    pub fn new(pid: Pid, name: &str, kstack: usize, pagetable: PageTableHandle) -> Self {
        let mut buf = [0u8; NAME_LEN];
        let len = name.len().min(NAME_LEN - 1);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            pid,
            name: buf,
            state: ProcState::Used,
            killed: AtomicBool::new(false),
            kstack,
            pagetable,
            trapframe: TrapFrame::default(),
            alarm_frame: TrapFrame::default(),
            alarm: AlarmState::default(),
            feedback: FeedbackState::default(),
        }
    }

    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or("?")
    }

    /// Requests cooperative termination; honoured at the next trap boundary.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.state == ProcState::Running
    }
}
