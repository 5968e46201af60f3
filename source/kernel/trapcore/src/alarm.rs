// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Alarm delivery (sigalarm/sigreturn)
//! OWNERS: @kernel-team
//! PUBLIC API: arm(), on_tick(), complete()
//! DEPENDS_ON: process::AlarmState, trap::TrapFrame
//! INVARIANTS: Fires at most once per arming; the snapshot is taken before the
//!             resume pc is redirected
//!
//! The elapsed counter is only reset by [`arm`]. Firing disarms the alarm
//! and leaves the counter running, so the handler is entered once per arming
//! rather than every `interval` ticks.

use crate::process::Process;

/// Registers `handler` to run after `interval` timer ticks (sigalarm). An
/// interval of zero disarms.
pub fn arm(p: &mut Process, interval: u64, handler: usize) {
    p.alarm.interval = interval;
    p.alarm.handler = handler;
    p.alarm.elapsed = 0;
    p.alarm.armed = interval != 0;
}

/// Accounts one timer tick delivered to `p` in user mode. Returns `true` when
/// the alarm fired and the resume pc now points at the handler.
pub fn on_tick(p: &mut Process) -> bool {
    p.alarm.elapsed += 1;
    if !p.alarm.armed || p.alarm.elapsed != p.alarm.interval {
        return false;
    }
    p.alarm_frame = p.trapframe;
    p.alarm.armed = false;
    p.trapframe.epc = p.alarm.handler;
    log_debug!(target: "alarm", "pid {} alarm fired, handler {:#x}", p.pid, p.alarm.handler);
    true
}

/// Handler finished (sigreturn): resumes the interrupted context. Returns the
/// restored `a0` so the syscall return value does not clobber it.
pub fn complete(p: &mut Process) -> usize {
    p.trapframe = p.alarm_frame;
    p.trapframe.a(0)
}
