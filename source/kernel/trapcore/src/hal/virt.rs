// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! HAL pieces targeting QEMU's `virt` machine.

use core::ptr::{read_volatile, write_volatile};

use super::InterruptController;
use crate::types::HartId;

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub use crate::arch::riscv::Csr;

/// PLIC source id of the console UART.
pub const UART0_IRQ: u32 = 10;
/// PLIC source id of the first virtio-mmio block device.
pub const VIRTIO0_IRQ: u32 = 1;

const PLIC_BASE: usize = 0x0c00_0000;
const PLIC_SCLAIM_BASE: usize = PLIC_BASE + 0x20_1004;
const PLIC_CONTEXT_STRIDE: usize = 0x2000;

/// Claim/complete register for the S-mode context of `hart`.
#[inline]
const fn sclaim(hart: HartId) -> usize {
    PLIC_SCLAIM_BASE + hart.as_raw() * PLIC_CONTEXT_STRIDE
}

/// Memory-mapped PLIC of the virt board.
pub struct VirtPlic;

impl InterruptController for VirtPlic {
    fn claim(&self, hart: HartId) -> u32 {
        // SAFETY: the PLIC window is identity mapped in the kernel page table
        // and the S-mode claim register of each hart is a plain 32-bit word.
        unsafe { read_volatile(sclaim(hart) as *const u32) }
    }

    fn complete(&self, hart: HartId, irq: u32) {
        // SAFETY: see `claim`; writing the id back completes the claim.
        unsafe { write_volatile(sclaim(hart) as *mut u32, irq) }
    }
}
