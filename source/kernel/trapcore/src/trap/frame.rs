// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-process trapframe shared with the trampoline.
//!
//! The trampoline's `uservec` saves user registers here and loads
//! `kernel_sp`, `kernel_hartid` and `kernel_satp` before jumping to
//! `kernel_trap`; `userret` restores the registers and `sret`s to user mode.
//! Field offsets are part of that contract and must not move.

use core::mem::offset_of;

use static_assertions::const_assert_eq;

/// Number of general-purpose registers saved (x1..x31).
pub const GPR_COUNT: usize = 31;

/// Index of `a0` in [`TrapFrame::regs`] (ra, sp, gp, tp, t0-t2, s0, s1, a0...).
const A0: usize = 9;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// Kernel page table.
    pub kernel_satp: usize,
    /// Top of the process's kernel stack.
    pub kernel_sp: usize,
    /// Address of the user trap entry.
    pub kernel_trap: usize,
    /// Saved user program counter.
    pub epc: usize,
    /// Hart id, reloaded into `tp`.
    pub kernel_hartid: usize,
    /// ra, sp, gp, tp, t0-t2, s0-s1, a0-a7, s2-s11, t3-t6.
    pub regs: [usize; GPR_COUNT],
}

const_assert_eq!(offset_of!(TrapFrame, kernel_satp), 0);
const_assert_eq!(offset_of!(TrapFrame, kernel_sp), 8);
const_assert_eq!(offset_of!(TrapFrame, kernel_trap), 16);
const_assert_eq!(offset_of!(TrapFrame, epc), 24);
const_assert_eq!(offset_of!(TrapFrame, kernel_hartid), 32);
const_assert_eq!(offset_of!(TrapFrame, regs), 40);
const_assert_eq!(core::mem::size_of::<TrapFrame>(), 288);

impl TrapFrame {
    /// Argument/return register `a{n}`.
    #[inline]
    pub fn a(&self, n: usize) -> usize {
        debug_assert!(n < 8);
        self.regs[A0 + n]
    }

    #[inline]
    pub fn set_a(&mut self, n: usize, value: usize) {
        debug_assert!(n < 8);
        self.regs[A0 + n] = value;
    }

    /// Syscall number register.
    #[inline]
    pub fn a7(&self) -> usize {
        self.a(7)
    }
}
