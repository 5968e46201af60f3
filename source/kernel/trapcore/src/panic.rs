// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Opt-in panic handler emitting deterministic diagnostics over UART
//! OWNERS: @kernel-team
//! PUBLIC API: panic handler (no_std, `panic_handler` feature)
//! DEPENDS_ON: trap::last_trap(), uart::raw_writer(), arch::riscv::halt()
//! INVARIANTS: No allocation; never takes the logging lock; stable output fields
//!
//! Trap handlers report fatal conditions with fixed messages
//! (`usertrap: not from user mode`, `kerneltrap: not from supervisor mode`,
//! `kerneltrap: interrupts enabled`, `kerneltrap: unexpected scause`), which
//! this handler prints verbatim before shutting the machine down.

#[cfg(all(not(test), feature = "panic_handler"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    use core::fmt::Write;

    use crate::{trap, uart};

    let mut w = uart::raw_writer();

    let _ = w.write_str("\nPANIC: ");
    if let Some(location) = info.location() {
        let _ = write!(w, "{}:{}: ", location.file(), location.line());
    }
    match info.message().as_str() {
        Some(msg) => {
            let _ = w.write_str(msg);
        }
        None => {
            let _ = write!(w, "{}", info.message());
        }
    }
    let _ = w.write_str("\n");

    if let Some(rec) = trap::last_trap() {
        let _ = w.write_str("PANIC: last trap:\n");
        let _ = trap::fmt_trap(&rec, &mut w);
    }

    crate::arch::riscv::halt()
}
