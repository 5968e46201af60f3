// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Boot UART used as the log sink and by the panic path.

#![cfg_attr(not(all(target_arch = "riscv64", target_os = "none")), allow(dead_code))]

use core::fmt::{self, Write};

use crate::sync::{IrqMutex, IrqMutexGuard};

/// Address of the first UART on the `virt` machine.
const UART0_BASE: usize = 0x1000_0000;
const UART_TX: usize = 0x0;
const UART_LSR: usize = 0x5;
const LSR_TX_IDLE: u8 = 1 << 5;

// Trap handlers log, so holders must not be interruptible.
static UART0: IrqMutex<KernelUart> = IrqMutex::new(KernelUart::new(UART0_BASE));

/// NS16550A transmitter capable of formatted writes.
#[derive(Clone, Copy)]
pub struct KernelUart {
    base: usize,
}

impl KernelUart {
    pub const fn new(base: usize) -> Self {
        Self { base }
    }

    /// Returns a guard for the boot UART singleton.
    pub fn lock() -> IrqMutexGuard<'static, KernelUart> {
        UART0.lock()
    }

    fn put(&self, byte: u8) {
        transmit(self.base, byte);
    }
}

impl Write for KernelUart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            if byte == b'\n' {
                self.put(b'\r');
            }
            self.put(byte);
        }
        Ok(())
    }
}

// Lock-free emission for panic context, where the UART mutex may be held by
// the hart that faulted.
pub struct RawUart;

impl Write for RawUart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            if byte == b'\n' {
                transmit(UART0_BASE, b'\r');
            }
            transmit(UART0_BASE, byte);
        }
        Ok(())
    }
}

pub fn raw_writer() -> RawUart {
    RawUart
}

#[inline]
fn transmit(base: usize, byte: u8) {
    // SAFETY: `base` is the MMIO window of the virt UART, identity mapped in
    // the kernel page table.
    unsafe {
        while core::ptr::read_volatile((base + UART_LSR) as *const u8) & LSR_TX_IDLE == 0 {}
        core::ptr::write_volatile((base + UART_TX) as *mut u8, byte);
    }
}
