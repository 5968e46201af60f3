// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Locks shared between thread context and trap handlers
//! OWNERS: @kernel-sync-team
//! PUBLIC API: IntrGuard::new(), IrqMutex::{new, lock}
//! DEPENDS_ON: spin::Mutex, arch::riscv SIE access
//! INVARIANTS: Interrupts stay masked on the holding hart for as long as an
//!             IrqMutex guard lives; the prior SIE state is restored on release

mod irq_mutex;

pub use irq_mutex::{IntrGuard, IrqMutex, IrqMutexGuard};
