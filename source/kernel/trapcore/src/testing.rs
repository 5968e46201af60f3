// Copyright 2024 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0

//! CONTEXT: Host-side fakes for the collaborator traits
//! OWNERS: @kernel-team
//! NOTE: Tests only; no kernel logic.

use std::{
    boxed::Box,
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    vec::Vec,
};

use crate::{
    clock::TickClock,
    config::PolicyKind,
    hal::{
        DeviceDrivers, FrameAllocator, InterruptController, PageTableManager, ProcessHost,
        SyscallTable, TrapCsr, UserReturn, WaitChannel,
    },
    mm::{MapError, PageFlags, PageTableHandle, Pte, PAGE_SIZE},
    process::{ProcState, Process},
    sched::Policy,
    trap::{TrapCore, TrapVectors},
    types::{HartId, Pid, PhysAddr, VirtAddr},
};

pub use crate::trap::{SSTATUS_SIE, SSTATUS_SPIE, SSTATUS_SPP};

pub const KERNEL_SATP: usize = (8 << 60) | 0x8_0000;
pub const USER_PT: PageTableHandle = PageTableHandle::from_root(PhysAddr::new(0x8765_4000));
pub const KSTACK: usize = 0x3f_ffff_a000;

pub const VECTORS: TrapVectors =
    TrapVectors { kernel_vec: 0x8000_1000, user_vec: 0x3f_ffff_f000, user_trap_entry: 0x8000_2000 };

/// A process in user mode with a user page table and kernel stack.
pub fn process(pid: u32) -> Process {
    let mut p = Process::new(Pid::from_raw(pid), "user", KSTACK, USER_PT);
    p.state = ProcState::Running;
    p
}

/// Everything on a hart outside the trap core: its CSR file, the process
/// table and scheduler, the syscall table and the trampoline.
#[derive(Default)]
pub struct FakeHart {
    pub sepc: Cell<usize>,
    pub sstatus: Cell<usize>,
    pub scause: Cell<usize>,
    pub stval: Cell<usize>,
    pub hart: Cell<usize>,
    pub stvec_writes: RefCell<Vec<usize>>,
    pub ssip_clears: Cell<usize>,

    pub yields: Cell<usize>,
    /// Clobbers `sepc`/`sstatus` while "another process" runs.
    pub scribble_on_yield: Cell<bool>,
    pub exits: RefCell<Vec<(Pid, i32)>>,
    pub clock_ticks: Cell<u64>,
    /// Interrupt state of the host hart at each `on_clock_tick`.
    pub intr_at_tick: RefCell<Vec<bool>>,
    pub wakeups: RefCell<Vec<WaitChannel>>,

    /// `(a7, interrupts enabled)` for each dispatched syscall.
    pub syscalls: RefCell<Vec<(usize, bool)>>,
    pub entered_user: RefCell<Vec<usize>>,
}

impl FakeHart {
    /// Latches the CSRs of a trap taken from user mode.
    pub fn trap_from_user(&self, scause: usize, sepc: usize, stval: usize) {
        self.scause.set(scause);
        self.sepc.set(sepc);
        self.stval.set(stval);
        self.sstatus.set(SSTATUS_SPIE);
    }

    /// Latches the CSRs of a trap taken from supervisor mode with interrupts
    /// masked by the hardware.
    pub fn trap_from_kernel(&self, scause: usize, sepc: usize) {
        self.scause.set(scause);
        self.sepc.set(sepc);
        self.sstatus.set(SSTATUS_SPP | SSTATUS_SPIE);
    }

    pub fn stvec(&self) -> Option<usize> {
        self.stvec_writes.borrow().last().copied()
    }
}

impl TrapCsr for FakeHart {
    fn sepc(&self) -> usize {
        self.sepc.get()
    }
    fn set_sepc(&self, value: usize) {
        self.sepc.set(value);
    }
    fn sstatus(&self) -> usize {
        self.sstatus.get()
    }
    fn set_sstatus(&self, value: usize) {
        self.sstatus.set(value);
    }
    fn scause(&self) -> usize {
        self.scause.get()
    }
    fn stval(&self) -> usize {
        self.stval.get()
    }
    fn set_stvec(&self, addr: usize) {
        self.stvec_writes.borrow_mut().push(addr);
    }
    fn satp(&self) -> usize {
        KERNEL_SATP
    }
    fn clear_ssip(&self) {
        self.ssip_clears.set(self.ssip_clears.get() + 1);
    }
    fn hart_id(&self) -> HartId {
        HartId::from_raw(self.hart.get())
    }
    fn intr_on(&self) {
        self.sstatus.set(self.sstatus.get() | SSTATUS_SIE);
    }
    fn intr_off(&self) {
        self.sstatus.set(self.sstatus.get() & !SSTATUS_SIE);
    }
    fn intr_enabled(&self) -> bool {
        self.sstatus.get() & SSTATUS_SIE != 0
    }
}

impl ProcessHost for FakeHart {
    fn yield_cpu(&self) {
        self.yields.set(self.yields.get() + 1);
        if self.scribble_on_yield.get() {
            self.sepc.set(0xdead_beef);
            self.sstatus.set(SSTATUS_SIE | SSTATUS_SPIE);
            self.scause.set(8);
        }
    }

    fn exit(&self, p: &mut Process, status: i32) {
        self.exits.borrow_mut().push((p.pid, status));
        p.state = ProcState::Zombie;
    }

    fn on_clock_tick(&self) {
        self.clock_ticks.set(self.clock_ticks.get() + 1);
        self.intr_at_tick.borrow_mut().push(crate::arch::riscv::intr_get());
    }

    fn wakeup(&self, chan: WaitChannel) {
        self.wakeups.borrow_mut().push(chan);
    }
}

impl SyscallTable for FakeHart {
    fn dispatch(&self, p: &mut Process) {
        let num = p.trapframe.a7();
        self.syscalls.borrow_mut().push((num, self.intr_enabled()));
        p.trapframe.set_a(0, num * 10);
    }
}

impl UserReturn for FakeHart {
    fn enter_user(&self, satp: usize) {
        self.entered_user.borrow_mut().push(satp);
    }
}

#[derive(Default)]
pub struct FakePlic {
    pub pending: RefCell<VecDeque<u32>>,
    pub completed: RefCell<Vec<(HartId, u32)>>,
}

impl FakePlic {
    pub fn raise(&self, irq: u32) {
        self.pending.borrow_mut().push_back(irq);
    }
}

impl InterruptController for FakePlic {
    fn claim(&self, _hart: HartId) -> u32 {
        self.pending.borrow_mut().pop_front().unwrap_or(0)
    }

    fn complete(&self, hart: HartId, irq: u32) {
        self.completed.borrow_mut().push((hart, irq));
    }
}

#[derive(Default)]
pub struct FakeDrivers {
    pub uart: Cell<usize>,
    pub disk: Cell<usize>,
}

impl DeviceDrivers for FakeDrivers {
    fn uart_intr(&self) {
        self.uart.set(self.uart.get() + 1);
    }

    fn disk_intr(&self) {
        self.disk.set(self.disk.get() + 1);
    }
}

#[repr(C, align(4096))]
struct Page([u8; PAGE_SIZE]);

/// Bounded pool of real, page-aligned host pages.
pub struct FakeFrames {
    capacity: usize,
    pages: RefCell<Vec<Box<Page>>>,
    freed: RefCell<Vec<PhysAddr>>,
}

impl FakeFrames {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, pages: RefCell::new(Vec::new()), freed: RefCell::new(Vec::new()) }
    }

    /// Takes a frame from the pool and fills it with `byte`.
    pub fn fill(&self, byte: u8) -> PhysAddr {
        let pa = self.alloc_frame().expect("fake frame pool exhausted");
        // SAFETY: `pa` is a live page owned by this pool.
        unsafe { core::ptr::write_bytes(pa.as_mut_ptr(), byte, PAGE_SIZE) };
        pa
    }

    pub fn contents(&self, pa: PhysAddr) -> Vec<u8> {
        let pages = self.pages.borrow();
        let page = pages
            .iter()
            .find(|page| page.0.as_ptr() as usize == pa.raw())
            .expect("frame not owned by this pool");
        page.0.to_vec()
    }

    pub fn allocated(&self) -> usize {
        self.pages.borrow().len()
    }

    pub fn freed(&self) -> Vec<PhysAddr> {
        self.freed.borrow().clone()
    }
}

// SAFETY: frames are boxed, page-aligned, PAGE_SIZE bytes and never handed
// out twice; host memory stands in for the direct map.
unsafe impl FrameAllocator for FakeFrames {
    fn alloc_frame(&self) -> Option<PhysAddr> {
        let mut pages = self.pages.borrow_mut();
        if pages.len() == self.capacity {
            return None;
        }
        let mut page = Box::new(Page([0; PAGE_SIZE]));
        let pa = PhysAddr::new(page.0.as_mut_ptr() as usize);
        pages.push(page);
        Some(pa)
    }

    unsafe fn free_frame(&self, pa: PhysAddr) {
        let mut pages = self.pages.borrow_mut();
        let idx = pages
            .iter()
            .position(|page| page.0.as_ptr() as usize == pa.raw())
            .expect("freed frame not owned by this pool");
        pages.swap_remove(idx);
        self.freed.borrow_mut().push(pa);
    }
}

/// Single-level map from (root, page) to leaf entry.
#[derive(Default)]
pub struct FakePageTables {
    entries: RefCell<HashMap<(PageTableHandle, VirtAddr), Pte>>,
    released: RefCell<Vec<PhysAddr>>,
    /// Makes every `map` fail with this error.
    pub fail_map: Cell<Option<MapError>>,
}

impl FakePageTables {
    /// Installs `pte` in [`USER_PT`].
    pub fn install(&self, va: VirtAddr, pte: Pte) {
        self.entries.borrow_mut().insert((USER_PT, va), pte);
    }

    pub fn released(&self) -> Vec<PhysAddr> {
        self.released.borrow().clone()
    }
}

impl PageTableManager for FakePageTables {
    fn lookup(&self, pt: PageTableHandle, va: VirtAddr) -> Option<Pte> {
        self.entries.borrow().get(&(pt, va.page_floor())).copied()
    }

    fn unmap(&self, pt: PageTableHandle, va: VirtAddr, pages: usize, release: bool) {
        let mut entries = self.entries.borrow_mut();
        for i in 0..pages {
            let page = VirtAddr::new(va.raw() + i * PAGE_SIZE);
            if let Some(pte) = entries.remove(&(pt, page)) {
                if release {
                    self.released.borrow_mut().push(pte.pa());
                }
            }
        }
    }

    fn map(
        &self,
        pt: PageTableHandle,
        va: VirtAddr,
        size: usize,
        pa: PhysAddr,
        flags: PageFlags,
    ) -> Result<(), MapError> {
        if let Some(err) = self.fail_map.get() {
            return Err(err);
        }
        if !va.is_page_aligned() || size != PAGE_SIZE {
            return Err(MapError::Unaligned);
        }
        let mut entries = self.entries.borrow_mut();
        if entries.contains_key(&(pt, va)) {
            return Err(MapError::Overlap);
        }
        entries.insert((pt, va), Pte::leaf(pa, flags | PageFlags::VALID));
        Ok(())
    }
}

/// One hart's worth of collaborators plus the shared clock and policy.
pub struct Rig {
    pub hart: FakeHart,
    pub plic: FakePlic,
    pub drivers: FakeDrivers,
    pub frames: FakeFrames,
    pub vm: FakePageTables,
    pub clock: TickClock,
    pub policy: Policy,
}

impl Rig {
    pub fn new(kind: PolicyKind) -> Self {
        Self {
            hart: FakeHart::default(),
            plic: FakePlic::default(),
            drivers: FakeDrivers::default(),
            frames: FakeFrames::new(8),
            vm: FakePageTables::default(),
            clock: TickClock::new(),
            policy: Policy::new(kind),
        }
    }

    pub fn core(&self) -> TrapCore<'_> {
        TrapCore {
            csr: &self.hart,
            plic: &self.plic,
            drivers: &self.drivers,
            frames: &self.frames,
            vm: &self.vm,
            procs: &self.hart,
            syscalls: &self.hart,
            user: &self.hart,
            clock: &self.clock,
            policy: &self.policy,
            vectors: VECTORS,
        }
    }
}
