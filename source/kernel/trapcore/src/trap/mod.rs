// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Supervisor trap dispatch for user and kernel traps
//! OWNERS: @kernel-team
//! PUBLIC API: trap_init(), TrapCore::{trap_init_hart, usertrap, usertrapret, kerneltrap, devintr}
//! DEPENDS_ON: hal traits, mm::resolve_fault, alarm, sched::TickPolicy, clock::TickClock
//! INVARIANTS: stvec points at the kernel vector while in the kernel; interrupts stay
//!             off from usertrapret until sret; kerneltrap leaves sepc/sstatus as it found them
//!
//! Everything the handlers touch outside this crate is reached through
//! [`TrapCore`]'s collaborator references, so the same code runs against the
//! real CSRs on the target and against fakes on the host. The `extern "C"`
//! entry points the assembly vectors call live in [`entry`].

mod devintr;
mod diag;
pub mod entry;
mod frame;


pub use devintr::DeviceIntr;
pub use diag::{describe_cause, fmt_trap, last_trap, recent_traps, TrapRecord};
pub use frame::{TrapFrame, GPR_COUNT};

use crate::{
    alarm,
    clock::TickClock,
    config::{self, PolicyKind, ECALL_INSN_LEN},
    hal::{
        DeviceDrivers, FrameAllocator, InterruptController, PageTableManager, ProcessHost,
        SyscallTable, TrapCsr, UserReturn,
    },
    mm::{self, PAGE_SIZE},
    process::Process,
    sched::{Policy, TickPolicy},
    types::Scause,
};

/// Previous privilege was supervisor.
pub const SSTATUS_SPP: usize = 1 << 8;
/// Interrupts enabled before the trap (restored into SIE by `sret`).
pub const SSTATUS_SPIE: usize = 1 << 5;
pub const SSTATUS_SIE: usize = 1 << 1;

/// Exit status of a process killed at a trap boundary.
const KILLED_STATUS: i32 = -1;

/// One-time setup before any hart takes a trap. The tick clock is const
/// initialized; what remains is freezing the scheduling-policy selection.
pub fn trap_init() -> PolicyKind {
    let kind = config::active();
    log_info!(target: "trap", "trap core ready, policy {}", kind);
    kind
}

/// Trap vector addresses installed into `stvec`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrapVectors {
    /// `kernelvec`, taking traps while in supervisor mode.
    pub kernel_vec: usize,
    /// `uservec` as mapped at the trampoline page in every address space.
    pub user_vec: usize,
    /// Address `uservec` jumps to after switching to the kernel page table;
    /// stored into each trapframe's `kernel_trap`.
    pub user_trap_entry: usize,
}

/// How [`TrapCore::usertrap`] finished.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserTrapOutcome {
    /// The process was sent back to user mode.
    Resumed,
    /// The process was killed and handed to `exit`.
    Exited,
}

/// Trap handlers together with the collaborators they drive.
pub struct TrapCore<'a> {
    pub csr: &'a dyn TrapCsr,
    pub plic: &'a dyn InterruptController,
    pub drivers: &'a dyn DeviceDrivers,
    pub frames: &'a dyn FrameAllocator,
    pub vm: &'a dyn PageTableManager,
    pub procs: &'a dyn ProcessHost,
    pub syscalls: &'a dyn SyscallTable,
    pub user: &'a dyn UserReturn,
    pub clock: &'a TickClock,
    pub policy: &'a Policy,
    pub vectors: TrapVectors,
}

impl TrapCore<'_> {
    /// Routes this hart's traps to the kernel vector. Called once per hart
    /// during boot.
    pub fn trap_init_hart(&self) {
        self.csr.set_stvec(self.vectors.kernel_vec);
        log_info!(target: "trap", "hart {} trap vector installed", self.csr.hart_id().as_raw());
    }

    /// Handles an interrupt, exception or system call taken in user mode on
    /// behalf of `p`, then returns to user space unless `p` was killed.
    pub fn usertrap(&self, p: &mut Process) -> UserTrapOutcome {
        if self.csr.sstatus() & SSTATUS_SPP != 0 {
            panic!("usertrap: not from user mode");
        }

        // Traps taken from here on are kernel traps.
        self.csr.set_stvec(self.vectors.kernel_vec);

        p.trapframe.epc = self.csr.sepc();
        let scause = Scause::from_bits(self.csr.scause());
        self.note(scause);

        let mut timer = false;
        if scause == Scause::USER_ECALL {
            if p.is_killed() {
                return self.exit_killed(p);
            }
            // Resume after the ecall instruction.
            p.trapframe.epc += ECALL_INSN_LEN;
            // sepc, scause and sstatus are consumed; an interrupt may clobber them now.
            self.csr.intr_on();
            self.syscalls.dispatch(p);
        } else if scause.is_page_fault() {
            let stval = self.csr.stval();
            if let Err(err) = mm::resolve_fault(p.pagetable, stval, self.frames, self.vm) {
                log_warn!(
                    target: "trap",
                    "usertrap(): page fault pid={} stval={:#x}: {}",
                    p.pid,
                    stval,
                    err
                );
                p.kill();
            }
        } else {
            match self.devintr(scause) {
                DeviceIntr::Timer => timer = true,
                DeviceIntr::Device => {}
                DeviceIntr::Unrecognized => {
                    log_warn!(
                        target: "trap",
                        "usertrap(): unexpected scause {:#x} pid={} sepc={:#x} stval={:#x} name={}",
                        scause,
                        p.pid,
                        self.csr.sepc(),
                        self.csr.stval(),
                        p.name()
                    );
                    p.kill();
                }
            }
        }

        if p.is_killed() {
            return self.exit_killed(p);
        }

        if timer {
            alarm::on_tick(p);
            if self.policy.on_tick(p, self.clock.now()).yields() {
                self.procs.yield_cpu();
            }
        }

        self.usertrapret(p);
        UserTrapOutcome::Resumed
    }

    /// Returns to user space: prepares `p`'s trapframe for the next user
    /// trap and hands over to the trampoline.
    pub fn usertrapret(&self, p: &mut Process) {
        // Until sret, a trap would land in uservec with kernel state.
        self.csr.intr_off();
        self.csr.set_stvec(self.vectors.user_vec);

        let tf = &mut p.trapframe;
        tf.kernel_satp = self.csr.satp();
        tf.kernel_sp = p.kstack + PAGE_SIZE;
        tf.kernel_trap = self.vectors.user_trap_entry;
        tf.kernel_hartid = self.csr.hart_id().as_raw();

        // sret: drop to user mode, re-enable interrupts there.
        let sstatus = (self.csr.sstatus() & !SSTATUS_SPP) | SSTATUS_SPIE;
        self.csr.set_sstatus(sstatus);
        self.csr.set_sepc(tf.epc);

        self.user.enter_user(p.pagetable.satp());
    }

    /// Handles an interrupt or exception taken in supervisor mode. `current`
    /// is the process running on this hart, if any.
    pub fn kerneltrap(&self, current: Option<&mut Process>) {
        let saved = SavedTrapRegs::capture(self.csr);
        let scause = Scause::from_bits(self.csr.scause());

        if saved.sstatus & SSTATUS_SPP == 0 {
            panic!("kerneltrap: not from supervisor mode");
        }
        if self.csr.intr_enabled() {
            panic!("kerneltrap: interrupts enabled");
        }
        self.note(scause);

        let which = self.devintr(scause);
        if which == DeviceIntr::Unrecognized {
            log_error!(
                target: "trap",
                "kerneltrap: scause {:#x} ({}) sepc={:#x} stval={:#x}",
                scause,
                describe_cause(scause),
                saved.sepc,
                self.csr.stval()
            );
            panic!("kerneltrap: unexpected scause");
        }

        if which == DeviceIntr::Timer {
            if let Some(p) = current.filter(|p| p.is_running()) {
                if self.policy.on_tick(p, self.clock.now()).yields() {
                    self.procs.yield_cpu();
                }
            }
        }
        // `saved` restores sepc/sstatus for kernelvec's sret; the yield may
        // have taken traps that overwrote them.
    }

    fn exit_killed(&self, p: &mut Process) -> UserTrapOutcome {
        self.procs.exit(p, KILLED_STATUS);
        UserTrapOutcome::Exited
    }

    fn note(&self, scause: Scause) {
        diag::record(TrapRecord {
            scause,
            sepc: self.csr.sepc(),
            stval: self.csr.stval(),
            hart: self.csr.hart_id(),
        });
    }
}

/// `sepc`/`sstatus` at kernel trap entry, written back when dropped.
struct SavedTrapRegs<'a> {
    csr: &'a dyn TrapCsr,
    sepc: usize,
    sstatus: usize,
}

impl<'a> SavedTrapRegs<'a> {
    fn capture(csr: &'a dyn TrapCsr) -> Self {
        Self { csr, sepc: csr.sepc(), sstatus: csr.sstatus() }
    }
}

impl Drop for SavedTrapRegs<'_> {
    fn drop(&mut self) {
        self.csr.set_sepc(self.sepc);
        self.csr.set_sstatus(self.sstatus);
    }
}
