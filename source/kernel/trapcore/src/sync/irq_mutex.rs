// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Spin lock that masks supervisor interrupts while held.
//!
//! A hart holding a plain spin lock can take a timer interrupt whose handler
//! spins on the same lock, and never get back to release it. Every lock the
//! trap path takes is therefore an [`IrqMutex`].

use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use crate::arch::riscv;

/// Masks interrupts on the executing hart until dropped, then restores the
/// state it found. Guards nest when dropped in reverse order.
pub struct IntrGuard {
    was_on: bool,
    // Tied to the hart whose SIE it saved.
    _hart: PhantomData<*const ()>,
}

impl IntrGuard {
    pub fn new() -> Self {
        let was_on = riscv::intr_get();
        riscv::intr_off();
        Self { was_on, _hart: PhantomData }
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        if self.was_on {
            riscv::intr_on();
        }
    }
}

pub struct IrqMutex<T> {
    inner: spin::Mutex<T>,
}

impl<T> IrqMutex<T> {
    pub const fn new(value: T) -> Self {
        Self { inner: spin::Mutex::new(value) }
    }

    /// Masks interrupts, then spins for the lock.
    pub fn lock(&self) -> IrqMutexGuard<'_, T> {
        let intr = IntrGuard::new();
        let guard = self.inner.lock();
        IrqMutexGuard { guard, _intr: intr }
    }
}

pub struct IrqMutexGuard<'a, T> {
    // Field order matters: the lock is released before interrupts come back.
    guard: spin::MutexGuard<'a, T>,
    _intr: IntrGuard,
}

impl<T> Deref for IrqMutexGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for IrqMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}
