// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Trap diagnostics: the most recent trap and a small ring of recent ones,
//! read back by the panic handler.

use core::fmt::{self, Write};

use crate::{
    sync::IrqMutex,
    types::{HartId, Scause},
};

/// CSR snapshot of one trap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrapRecord {
    pub scause: Scause,
    pub sepc: usize,
    pub stval: usize,
    pub hart: HartId,
}

const TRAP_RING_LEN: usize = 32;

struct TrapRing {
    slots: [Option<TrapRecord>; TRAP_RING_LEN],
    next: usize,
}

static LAST_TRAP: IrqMutex<Option<TrapRecord>> = IrqMutex::new(None);
static TRAP_RING: IrqMutex<TrapRing> =
    IrqMutex::new(TrapRing { slots: [None; TRAP_RING_LEN], next: 0 });

pub fn record(rec: TrapRecord) {
    *LAST_TRAP.lock() = Some(rec);
    let mut ring = TRAP_RING.lock();
    let idx = ring.next;
    ring.slots[idx] = Some(rec);
    ring.next = (idx + 1) % TRAP_RING_LEN;
}

pub fn last_trap() -> Option<TrapRecord> {
    *LAST_TRAP.lock()
}

/// Up to `out.len()` most recent records, newest first. Returns how many
/// were written.
pub fn recent_traps(out: &mut [TrapRecord]) -> usize {
    let ring = TRAP_RING.lock();
    let mut written = 0;
    for back in 1..=TRAP_RING_LEN {
        if written == out.len() {
            break;
        }
        let idx = (ring.next + TRAP_RING_LEN - back) % TRAP_RING_LEN;
        match ring.slots[idx] {
            Some(rec) => {
                out[written] = rec;
                written += 1;
            }
            None => break,
        }
    }
    written
}

pub fn describe_cause(scause: Scause) -> &'static str {
    if scause.is_interrupt() {
        match scause.code() {
            1 => "SupervisorSoftInt",
            5 => "SupervisorTimerInt",
            9 => "SupervisorExternalInt",
            _ => "Interrupt",
        }
    } else {
        match scause.code() {
            0 => "InstructionAddressMisaligned",
            1 => "InstructionAccessFault",
            2 => "IllegalInstruction",
            3 => "Breakpoint",
            4 => "LoadAddressMisaligned",
            5 => "LoadAccessFault",
            6 => "StoreAMOAddressMisaligned",
            7 => "StoreAMOAccessFault",
            8 => "EnvironmentCallFromUMode",
            9 => "EnvironmentCallFromSMode",
            12 => "InstructionPageFault",
            13 => "LoadPageFault",
            15 => "StoreAMOPageFault",
            _ => "Exception",
        }
    }
}

pub fn fmt_trap<W: Write>(rec: &TrapRecord, f: &mut W) -> fmt::Result {
    writeln!(f, " hart={}", rec.hart.as_raw())?;
    writeln!(f, " sepc=0x{:016x}", rec.sepc)?;
    writeln!(f, " scause=0x{:016x} ({})", rec.scause.bits(), describe_cause(rec.scause))?;
    writeln!(f, " stval=0x{:016x}", rec.stval)
}
