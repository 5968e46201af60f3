// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Device-interrupt classification.

use super::TrapCore;
use crate::{
    hal::virt::{UART0_IRQ, VIRTIO0_IRQ},
    types::Scause,
};

/// What [`TrapCore::devintr`] made of a trap cause.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceIntr {
    /// Not a device interrupt.
    Unrecognized,
    /// External interrupt routed through the PLIC.
    Device,
    /// Forwarded timer tick.
    Timer,
}

impl TrapCore<'_> {
    /// Services the interrupt behind `scause`, if it is one this kernel
    /// handles.
    pub fn devintr(&self, scause: Scause) -> DeviceIntr {
        if scause.is_external() {
            let hart = self.csr.hart_id();
            let irq = self.plic.claim(hart);
            match irq {
                0 => {}
                UART0_IRQ => self.drivers.uart_intr(),
                VIRTIO0_IRQ => self.drivers.disk_intr(),
                other => log_warn!(target: "trap", "unexpected interrupt irq={}", other),
            }
            // The PLIC allows each source one outstanding claim.
            if irq != 0 {
                self.plic.complete(hart, irq);
            }
            DeviceIntr::Device
        } else if scause == Scause::FORWARDED_TIMER {
            if self.csr.hart_id().is_boot() {
                self.clock.advance(self.procs);
            }
            self.csr.clear_ssip();
            DeviceIntr::Timer
        } else {
            DeviceIntr::Unrecognized
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::PolicyKind, log::take_captured, testing::Rig, types::HartId};

    #[test]
    fn uart_and_disk_are_routed_and_completed() {
        let rig = Rig::new(PolicyKind::RoundRobin);
        rig.hart.hart.set(1);
        rig.plic.raise(UART0_IRQ);
        rig.plic.raise(VIRTIO0_IRQ);
        let core = rig.core();

        assert_eq!(core.devintr(Scause::SUPERVISOR_EXTERNAL), DeviceIntr::Device);
        assert_eq!(core.devintr(Scause::SUPERVISOR_EXTERNAL), DeviceIntr::Device);
        assert_eq!(rig.drivers.uart.get(), 1);
        assert_eq!(rig.drivers.disk.get(), 1);
        let hart = HartId::from_raw(1);
        assert_eq!(rig.plic.completed.borrow().as_slice(), &[(hart, UART0_IRQ), (hart, VIRTIO0_IRQ)]);
    }

    #[test]
    fn spurious_claim_is_not_completed() {
        let rig = Rig::new(PolicyKind::RoundRobin);
        assert_eq!(rig.core().devintr(Scause::SUPERVISOR_EXTERNAL), DeviceIntr::Device);
        assert!(rig.plic.completed.borrow().is_empty());
    }

    #[test]
    fn unknown_irq_is_logged_and_completed() {
        let _ = take_captured();
        let rig = Rig::new(PolicyKind::RoundRobin);
        rig.plic.raise(33);
        assert_eq!(rig.core().devintr(Scause::SUPERVISOR_EXTERNAL), DeviceIntr::Device);
        assert_eq!(rig.plic.completed.borrow().as_slice(), &[(HartId::BOOT, 33)]);
        assert_eq!(take_captured(), ["[WARN trap] unexpected interrupt irq=33"]);
    }

    #[test]
    fn boot_hart_tick_advances_the_clock() {
        let rig = Rig::new(PolicyKind::RoundRobin);
        assert_eq!(rig.core().devintr(Scause::FORWARDED_TIMER), DeviceIntr::Timer);
        assert_eq!(rig.clock.now(), 1);
        assert_eq!(rig.hart.clock_ticks.get(), 1);
        assert_eq!(rig.hart.wakeups.borrow().as_slice(), &[rig.clock.channel()]);
        assert_eq!(rig.hart.ssip_clears.get(), 1);
    }

    #[test]
    fn secondary_hart_tick_only_acknowledges() {
        let rig = Rig::new(PolicyKind::RoundRobin);
        rig.hart.hart.set(3);
        assert_eq!(rig.core().devintr(Scause::FORWARDED_TIMER), DeviceIntr::Timer);
        assert_eq!(rig.clock.now(), 0);
        assert!(rig.hart.wakeups.borrow().is_empty());
        assert_eq!(rig.hart.ssip_clears.get(), 1);
    }

    #[test]
    fn exceptions_and_other_interrupts_are_unrecognized() {
        let rig = Rig::new(PolicyKind::RoundRobin);
        let core = rig.core();
        for bits in [2, 8, 13, Scause::INTERRUPT | 5] {
            assert_eq!(core.devintr(Scause::from_bits(bits)), DeviceIntr::Unrecognized);
        }
        assert_eq!(rig.hart.ssip_clears.get(), 0);
    }
}
