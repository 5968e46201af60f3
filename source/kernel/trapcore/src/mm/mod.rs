// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sv39 vocabulary shared with the page-table manager, and the
//! copy-on-write fault resolver built on top of it.

use core::fmt;

use bitflags::bitflags;

use crate::types::PhysAddr;

mod cow;

pub use cow::{resolve_fault, FaultError};

/// Size of a page in bytes.
pub const PAGE_SIZE: usize = 4096;

/// One past the highest user virtual address. Sv39 allows one bit more, but
/// the top half is kept out of reach to avoid sign-extension.
pub const MAXVA: usize = 1 << (9 + 9 + 9 + 12 - 1);

const SATP_SV39: usize = 8 << 60;
const PTE_FLAG_MASK: usize = 0x3ff;
const PTE_PPN_SHIFT: usize = 10;

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Flags stored in an Sv39 PTE.
    pub struct PageFlags: usize {
        const VALID = 1 << 0;
        const READ = 1 << 1;
        const WRITE = 1 << 2;
        const EXECUTE = 1 << 3;
        const USER = 1 << 4;
        const GLOBAL = 1 << 5;
        const ACCESSED = 1 << 6;
        const DIRTY = 1 << 7;
        /// Software-reserved bits; carried through untouched.
        const RSW0 = 1 << 8;
        const RSW1 = 1 << 9;
    }
}

/// Error returned by mapping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    /// Virtual or physical address is not page aligned.
    Unaligned,
    /// Mapping would exceed the user address range.
    OutOfRange,
    /// Mapping lacks permissions to proceed.
    PermissionDenied,
    /// Mapping overlaps an existing entry.
    Overlap,
    /// Provided flags are not suitable for installing a mapping.
    InvalidFlags,
    /// The manager could not allocate an intermediate table page.
    NoMemory,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            MapError::Unaligned => "unaligned address",
            MapError::OutOfRange => "address out of range",
            MapError::PermissionDenied => "permission denied",
            MapError::Overlap => "mapping overlaps existing entry",
            MapError::InvalidFlags => "invalid flags",
            MapError::NoMemory => "out of table pages",
        };
        f.write_str(msg)
    }
}

/// A leaf page-table entry as returned by [`crate::hal::PageTableManager::lookup`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub struct Pte(usize);

impl Pte {
    #[inline]
    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    /// Builds a leaf entry pointing at `pa`.
    #[inline]
    pub const fn leaf(pa: PhysAddr, flags: PageFlags) -> Self {
        Self(((pa.raw() >> 12) << PTE_PPN_SHIFT) | flags.bits())
    }

    #[inline]
    pub const fn bits(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 & PageFlags::VALID.bits() != 0
    }

    /// Low ten bits of the entry, software-reserved bits included.
    #[inline]
    pub const fn flags(self) -> PageFlags {
        PageFlags::from_bits_truncate(self.0 & PTE_FLAG_MASK)
    }

    #[inline]
    pub const fn pa(self) -> PhysAddr {
        PhysAddr::new((self.0 >> PTE_PPN_SHIFT) << 12)
    }
}

/// Opaque handle to a process's root page table (physical address of the
/// root page).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
#[repr(transparent)]
pub struct PageTableHandle(usize);

impl PageTableHandle {
    #[inline]
    pub const fn from_root(root: PhysAddr) -> Self {
        Self(root.raw())
    }

    #[inline]
    pub const fn root(self) -> PhysAddr {
        PhysAddr::new(self.0)
    }

    /// `satp` value selecting Sv39 translation rooted at this table.
    #[inline]
    pub const fn satp(self) -> usize {
        SATP_SV39 | (self.0 >> 12)
    }
}
