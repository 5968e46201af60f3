// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! RISC-V supervisor CSR access for the trap path.
//!
//! Host builds only see the inert helpers; the register backend exists on the
//! bare-metal target.

/// Parks the hart until the next interrupt.
#[inline]
pub fn wait_for_interrupt() {
    #[cfg(target_arch = "riscv64")]
    unsafe {
        core::arch::asm!("wfi", options(nomem, nostack));
    }
}

/// Requests a failure shutdown from firmware, then parks the hart.
#[allow(dead_code)]
pub fn halt() -> ! {
    #[cfg(all(target_arch = "riscv64", target_os = "none"))]
    {
        let _ = sbi_rt::system_reset(sbi_rt::Shutdown, sbi_rt::SystemFailure);
    }
    loop {
        wait_for_interrupt();
    }
}

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
pub use backend::Csr;
pub use sie::{intr_get, intr_off, intr_on};

/// `sstatus.SIE` of the executing hart.
#[cfg(all(target_arch = "riscv64", target_os = "none"))]
mod sie {
    use riscv::register::sstatus;

    pub fn intr_get() -> bool {
        sstatus::read().sie()
    }

    pub fn intr_on() {
        // SAFETY: only re-enables what an interrupt guard saw enabled.
        unsafe { sstatus::set_sie() };
    }

    pub fn intr_off() {
        unsafe { sstatus::clear_sie() };
    }
}


#[cfg(not(any(test, all(target_arch = "riscv64", target_os = "none"))))]
mod sie {
    pub fn intr_get() -> bool {
        false
    }

    pub fn intr_on() {}

    pub fn intr_off() {}
}

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
mod backend {
    use core::arch::asm;

    use riscv::register::{satp, scause, sepc, stval, stvec};

    use crate::{hal::TrapCsr, types::HartId};

    const SIP_SSIP: usize = 1 << 1;

    /// CSR file of the executing hart.
    pub struct Csr;

    impl TrapCsr for Csr {
        fn sepc(&self) -> usize {
            sepc::read()
        }

        fn set_sepc(&self, value: usize) {
            unsafe { asm!("csrw sepc, {0}", in(reg) value, options(nostack)) };
        }

        fn sstatus(&self) -> usize {
            let value: usize;
            unsafe { asm!("csrr {0}, sstatus", out(reg) value, options(nomem, nostack)) };
            value
        }

        fn set_sstatus(&self, value: usize) {
            unsafe { asm!("csrw sstatus, {0}", in(reg) value, options(nostack)) };
        }

        fn scause(&self) -> usize {
            scause::read().bits()
        }

        fn stval(&self) -> usize {
            stval::read()
        }

        fn set_stvec(&self, addr: usize) {
            // SAFETY: the trap core only installs the kernel vector or the
            // trampoline's user vector, both valid handlers.
            unsafe { stvec::write(addr, riscv::register::mtvec::TrapMode::Direct) };
        }

        fn satp(&self) -> usize {
            satp::read().bits()
        }

        fn clear_ssip(&self) {
            unsafe { asm!("csrc sip, {0}", in(reg) SIP_SSIP, options(nostack)) };
        }

        fn hart_id(&self) -> HartId {
            let tp: usize;
            unsafe { asm!("mv {0}, tp", out(reg) tp, options(nomem, nostack)) };
            HartId::from_raw(tp)
        }

        fn intr_on(&self) {
            super::intr_on();
        }

        fn intr_off(&self) {
            super::intr_off();
        }

        fn intr_enabled(&self) -> bool {
            super::intr_get()
        }
    }
}
