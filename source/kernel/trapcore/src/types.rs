// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Newtypes for identifiers and addresses crossing the trap boundary
//! OWNERS: @kernel-team
//! PUBLIC API: Pid, HartId, VirtAddr, PhysAddr, Scause
//! INVARIANTS: Page rounding never leaves the Sv39 user range; cause decoding is total

use core::fmt;

use crate::mm::PAGE_SIZE;

/// Process identifier as assigned by the process table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Pid(u32);

impl Pid {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hardware thread identifier, as held in `tp` while in the kernel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct HartId(usize);

impl HartId {
    /// The hart that owns the global tick counter.
    pub const BOOT: Self = Self(0);

    #[inline]
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_boot(self) -> bool {
        self.0 == Self::BOOT.0
    }
}

/// User virtual address.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    #[inline]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    /// Rounds down to the containing page.
    #[inline]
    pub const fn page_floor(self) -> Self {
        Self(self.0 & !(PAGE_SIZE - 1))
    }

    #[inline]
    pub const fn is_page_aligned(self) -> bool {
        self.0 % PAGE_SIZE == 0
    }
}

impl fmt::LowerHex for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Physical address of a frame; the kernel maps physical memory one-to-one,
/// so a `PhysAddr` is also dereferenceable from supervisor mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PhysAddr(usize);

impl PhysAddr {
    #[inline]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn as_ptr(self) -> *const u8 {
        self.0 as *const u8
    }

    #[inline]
    pub const fn as_mut_ptr(self) -> *mut u8 {
        self.0 as *mut u8
    }
}

/// Raw supervisor trap cause (`scause`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct Scause(usize);

impl Scause {
    pub const INTERRUPT: usize = 1 << (usize::BITS - 1);

    /// Environment call from U-mode.
    pub const USER_ECALL: Self = Self(8);
    /// Load page fault.
    pub const LOAD_PAGE_FAULT: Self = Self(13);
    /// Store/AMO page fault.
    pub const STORE_PAGE_FAULT: Self = Self(15);
    /// Supervisor software interrupt raised by the machine-mode timer vector.
    pub const FORWARDED_TIMER: Self = Self(Self::INTERRUPT | 1);
    /// Supervisor external interrupt (PLIC).
    pub const SUPERVISOR_EXTERNAL: Self = Self(Self::INTERRUPT | 9);

    #[inline]
    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_interrupt(self) -> bool {
        self.0 & Self::INTERRUPT != 0
    }

    #[inline]
    pub const fn code(self) -> usize {
        self.0 & !Self::INTERRUPT
    }

    #[inline]
    pub const fn is_page_fault(self) -> bool {
        self.0 == Self::LOAD_PAGE_FAULT.0 || self.0 == Self::STORE_PAGE_FAULT.0
    }

    /// Supervisor external interrupt, matched on the low byte like the PLIC
    /// dispatch expects.
    #[inline]
    pub const fn is_external(self) -> bool {
        self.is_interrupt() && (self.0 & 0xff) == 9
    }
}

impl fmt::LowerHex for Scause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}
