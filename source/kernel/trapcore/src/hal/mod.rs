// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Capabilities the trap core consumes from the rest of the kernel.
//!
//! Each trait is a seam to a collaborator that lives outside this crate: the
//! per-hart control registers, the PLIC, device drivers, the frame allocator,
//! the page-table manager, the process table/scheduler, the syscall table,
//! and the trampoline that drops back to user mode.

pub mod virt;

use crate::{
    mm::{MapError, PageFlags, PageTableHandle, Pte},
    process::Process,
    types::{HartId, PhysAddr, VirtAddr},
};

/// Supervisor trap CSRs of the executing hart.
///
/// All accessors act on the hart that calls them; implementations never touch
/// another hart's registers.
pub trait TrapCsr {
    fn sepc(&self) -> usize;
    fn set_sepc(&self, value: usize);
    fn sstatus(&self) -> usize;
    fn set_sstatus(&self, value: usize);
    fn scause(&self) -> usize;
    fn stval(&self) -> usize;
    fn set_stvec(&self, addr: usize);
    /// Kernel `satp` currently installed on this hart.
    fn satp(&self) -> usize;
    /// Clears `sip.SSIP`, acknowledging the forwarded timer interrupt.
    fn clear_ssip(&self);
    fn hart_id(&self) -> HartId;
    fn intr_on(&self);
    fn intr_off(&self);
    fn intr_enabled(&self) -> bool;
}

/// Platform-level interrupt controller, S-mode context of a hart.
pub trait InterruptController {
    /// Claims the highest-priority pending interrupt; 0 when none is pending.
    fn claim(&self, hart: HartId) -> u32;
    /// Signals that `irq` has been serviced so the line can fire again.
    fn complete(&self, hart: HartId, irq: u32);
}

/// Interrupt handlers of the drivers wired to the PLIC.
pub trait DeviceDrivers {
    fn uart_intr(&self);
    fn disk_intr(&self);
}

/// Physical frame allocator.
///
/// # Safety
/// `alloc_frame` must return a page-aligned, `PAGE_SIZE`-byte frame that is
/// exclusively owned by the caller and addressable through the kernel's
/// one-to-one physical mapping.
pub unsafe trait FrameAllocator {
    fn alloc_frame(&self) -> Option<PhysAddr>;

    /// Returns a frame to the pool.
    ///
    /// # Safety
    /// `pa` came from [`alloc_frame`](Self::alloc_frame) on this allocator,
    /// is mapped nowhere, and is not used after the call.
    unsafe fn free_frame(&self, pa: PhysAddr);
}

/// Page-table walk/map/unmap primitives. Frame reference counting across
/// sharers is the manager's business.
pub trait PageTableManager {
    /// Returns the valid leaf entry for the page containing `va`.
    fn lookup(&self, pt: PageTableHandle, va: VirtAddr) -> Option<Pte>;
    /// Removes `pages` mappings starting at page-aligned `va`; with `release`,
    /// drops this table's ownership of the backing frames.
    fn unmap(&self, pt: PageTableHandle, va: VirtAddr, pages: usize, release: bool);
    fn map(
        &self,
        pt: PageTableHandle,
        va: VirtAddr,
        size: usize,
        pa: PhysAddr,
        flags: PageFlags,
    ) -> Result<(), MapError>;
}

/// Identity of something a process can sleep on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct WaitChannel(pub usize);

/// Process table and scheduler loop.
pub trait ProcessHost {
    /// Gives up the hart; returns once the scheduler resumes the caller.
    fn yield_cpu(&self);
    /// Terminates `p`. On the real kernel this does not return.
    fn exit(&self, p: &mut Process, status: i32);
    /// Per-tick run-time accounting, called with the tick lock held.
    fn on_clock_tick(&self);
    /// Wakes every process sleeping on `chan`.
    fn wakeup(&self, chan: WaitChannel);
}

/// System-call table.
pub trait SyscallTable {
    /// Runs the system call described by `p.trapframe` (number in `a7`,
    /// arguments in `a0..a5`) and stores the result in `a0`.
    fn dispatch(&self, p: &mut Process);
}

/// Final hop to user space through the trampoline.
pub trait UserReturn {
    /// Switches to the user address space `satp` and resumes at `sepc` in
    /// user mode. On the real kernel this does not return.
    fn enter_user(&self, satp: usize);
}
