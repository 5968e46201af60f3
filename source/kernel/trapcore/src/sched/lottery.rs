// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lottery (ticket-weighted) scheduling.
//!
//! At tick level this behaves exactly like round-robin: the running process
//! yields every tick so the selector runs often enough for ticket weights to
//! show. The selector draws winners through [`Lottery::draw`].

use core::sync::atomic::{AtomicU64, Ordering};

use super::{TickDecision, TickPolicy, YieldReason};
use crate::process::Process;

// xorshift64 has a fixed point at zero.
const ZERO_SEED_REPLACEMENT: u64 = 0x9e37_79b9_7f4a_7c15;

pub struct Lottery {
    state: AtomicU64,
    last_ticket: AtomicU64,
}

impl Lottery {
    /// Seeds the draw stream from [`crate::determinism::seed`].
    pub fn new() -> Self {
        Self::with_seed(crate::determinism::seed())
    }

    pub fn with_seed(seed: u64) -> Self {
        let seed = if seed == 0 { ZERO_SEED_REPLACEMENT } else { seed };
        Self { state: AtomicU64::new(seed), last_ticket: AtomicU64::new(0) }
    }

    /// Picks a winner among `tickets` (one entry per runnable process) with
    /// probability proportional to its ticket count. `None` when no tickets
    /// are held.
    pub fn draw(&self, tickets: &[u32]) -> Option<usize> {
        let total: u64 = tickets.iter().map(|&t| u64::from(t)).sum();
        if total == 0 {
            return None;
        }
        let ticket = self.next() % total;
        self.last_ticket.store(ticket, Ordering::Relaxed);

        let mut upper = 0u64;
        tickets.iter().position(|&t| {
            upper += u64::from(t);
            ticket < upper
        })
    }

    /// The ticket drawn by the most recent successful [`Lottery::draw`].
    pub fn last_ticket(&self) -> u64 {
        self.last_ticket.load(Ordering::Relaxed)
    }

    fn next(&self) -> u64 {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let mut x = current;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            match self.state.compare_exchange_weak(current, x, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => return x,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Default for Lottery {
    fn default() -> Self {
        Self::new()
    }
}

impl TickPolicy for Lottery {
    fn on_tick(&self, _p: &mut Process, _now: u64) -> TickDecision {
        TickDecision::Yield(YieldReason::EveryTick)
    }
}
