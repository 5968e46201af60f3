// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Entry points called by the assembly trap vectors.
//!
//! `uservec` (via the trampoline) calls `usertrap` and `kernelvec` calls
//! `kerneltrap`, neither with arguments. Both recover the kernel's
//! [`TrapCore`] and the current process from the environment registered at
//! boot.

use super::{TrapCore, UserTrapOutcome};
use crate::{process::Process, sync::IrqMutex};

/// Returns the process running on the calling hart, or null.
pub type CurrentProcess = fn() -> *mut Process;

struct TrapEnv {
    core_addr: usize,
    current: CurrentProcess,
}

static TRAP_ENV: IrqMutex<Option<TrapEnv>> = IrqMutex::new(None);

/// Registers the trap core and current-process lookup used by the vector
/// entry points.
///
/// # Safety
/// `current` must return either null or a pointer to the calling hart's
/// running process, valid and not otherwise borrowed for the duration of the
/// trap. Every collaborator behind `core` must be usable from any hart.
pub unsafe fn register_trap_env(core: &'static TrapCore<'static>, current: CurrentProcess) {
    *TRAP_ENV.lock() = Some(TrapEnv { core_addr: core as *const TrapCore<'static> as usize, current });
    log_info!(target: "trap", "trap environment registered");
}

fn env() -> (&'static TrapCore<'static>, CurrentProcess) {
    // Copy out so the lock is not held while handling; kernel traps nest.
    let guard = TRAP_ENV.lock();
    match guard.as_ref() {
        // SAFETY: registered from a `&'static TrapCore<'static>`.
        Some(env) => (unsafe { &*(env.core_addr as *const TrapCore<'static>) }, env.current),
        None => panic!("trap taken before register_trap_env"),
    }
}

/// Body of the `usertrap` entry point.
pub fn handle_user_trap() -> UserTrapOutcome {
    let (core, current) = env();
    // SAFETY: `register_trap_env` contract.
    match unsafe { current().as_mut() } {
        Some(p) => core.usertrap(p),
        None => panic!("usertrap: no current process"),
    }
}

/// Body of the `kerneltrap` entry point.
pub fn handle_kernel_trap() {
    let (core, current) = env();
    // SAFETY: `register_trap_env` contract.
    core.kerneltrap(unsafe { current().as_mut() });
}

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
#[no_mangle]
pub extern "C" fn usertrap() {
    let _ = handle_user_trap();
}

#[cfg(all(target_arch = "riscv64", target_os = "none"))]
#[no_mangle]
pub extern "C" fn kerneltrap() {
    handle_kernel_trap();
}
