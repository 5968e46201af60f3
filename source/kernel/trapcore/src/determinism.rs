// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Deterministic boot knobs
//! OWNERS: @kernel-team
//! PUBLIC API: seed(), set_seed()
//! INVARIANTS: Relaxed atomics sufficient; default value stable across boots
//!
//! The lottery draw consumes this seed so that ticket-weighted runs replay
//! identically under QEMU and on the host.

use core::sync::atomic::{AtomicU64, Ordering};

const DEFAULT_SEED: u64 = 0x7472_6170_636f; // ASCII "trapco"

static SEED: AtomicU64 = AtomicU64::new(DEFAULT_SEED);

/// Returns the deterministic seed for pseudo random number generators.
#[inline]
pub fn seed() -> u64 {
    SEED.load(Ordering::Relaxed)
}

/// Overrides the deterministic seed. Must happen before the lottery is built.
#[inline]
pub fn set_seed(value: u64) {
    SEED.store(value, Ordering::Relaxed);
}
