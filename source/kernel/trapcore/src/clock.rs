// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Global tick counter advanced by the boot hart's timer interrupt
//! OWNERS: @kernel-sched-team
//! PUBLIC API: TickClock::{new, now, advance, channel}
//! DEPENDS_ON: hal::ProcessHost (run-time accounting, wakeup)
//! INVARIANTS: Monotonic; incremented only under its lock; sleepers woken
//!             under the same lock so no wakeup is lost; the lock masks
//!             interrupts, so readers never block the boot hart's tick

use crate::{
    hal::{ProcessHost, WaitChannel},
    sync::IrqMutex,
};

/// Kernel-lifetime tick counter doubling as a sleep channel.
pub struct TickClock {
    ticks: IrqMutex<u64>,
}

static_assertions::assert_impl_all!(TickClock: Send, Sync);

impl TickClock {
    pub const fn new() -> Self {
        Self { ticks: IrqMutex::new(0) }
    }

    /// Current tick count.
    pub fn now(&self) -> u64 {
        *self.ticks.lock()
    }

    /// Channel identity sleepers on the tick counter wait on.
    pub fn channel(&self) -> WaitChannel {
        WaitChannel(&self.ticks as *const IrqMutex<u64> as usize)
    }

    /// Advances the counter by one tick. Only the boot hart calls this, once
    /// per forwarded timer interrupt.
    pub fn advance(&self, host: &dyn ProcessHost) -> u64 {
        let mut ticks = self.ticks.lock();
        *ticks += 1;
        host.on_clock_tick();
        host.wakeup(self.channel());
        *ticks
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
