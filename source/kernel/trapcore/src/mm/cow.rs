// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Copy-on-write fault resolution.
//!
//! A load or store page fault against a mapped page gives the faulting
//! address space a private, writable copy of the frame. The faulting
//! instruction is then retried against the copy.

use core::fmt;

use super::{MapError, PageFlags, PageTableHandle, MAXVA, PAGE_SIZE};
use crate::{
    hal::{FrameAllocator, PageTableManager},
    types::VirtAddr,
};

/// Why a page fault could not be resolved. Each case is fatal to the
/// faulting process only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultError {
    /// The faulting page has no valid mapping.
    NotMapped,
    /// The faulting address lies outside the user range.
    AddressOutOfRange,
    /// No frame was available for the private copy.
    OutOfFrames,
    /// Installing the private copy failed.
    Remap(MapError),
}

impl fmt::Display for FaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultError::NotMapped => f.write_str("no mapping"),
            FaultError::AddressOutOfRange => f.write_str("address out of range"),
            FaultError::OutOfFrames => f.write_str("out of frames"),
            FaultError::Remap(err) => write!(f, "remap failed: {err}"),
        }
    }
}

/// Replaces the page containing `fault_addr` with a writable private copy.
pub fn resolve_fault(
    pt: PageTableHandle,
    fault_addr: usize,
    frames: &dyn FrameAllocator,
    vm: &dyn PageTableManager,
) -> Result<VirtAddr, FaultError> {
    let va = VirtAddr::new(fault_addr).page_floor();
    if va.raw() >= MAXVA {
        return Err(FaultError::AddressOutOfRange);
    }
    let pte = vm.lookup(pt, va).filter(|pte| pte.is_valid()).ok_or(FaultError::NotMapped)?;
    let flags = pte.flags() | PageFlags::WRITE;
    let old = pte.pa();
    let new = frames.alloc_frame().ok_or(FaultError::OutOfFrames)?;

    // SAFETY: `old` backs a valid mapping and `new` is a fresh frame owned by
    // us; both are PAGE_SIZE bytes in the kernel's direct map and distinct.
    unsafe { core::ptr::copy_nonoverlapping(old.as_ptr(), new.as_mut_ptr(), PAGE_SIZE) };

    vm.unmap(pt, va, 1, true);
    if let Err(err) = vm.map(pt, va, PAGE_SIZE, new, flags) {
        // SAFETY: `new` was never installed, and nothing else holds it.
        unsafe { frames.free_frame(new) };
        return Err(FaultError::Remap(err));
    }
    Ok(va)
}
