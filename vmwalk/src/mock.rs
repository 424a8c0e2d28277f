//! In-memory process used by the tests.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
};

use super::{
    AddressBounds, Error, Host, Mapping, Pid, Platform, ProcessControlBlock, Release, Result, VirtualMemoryQuery,
    VirtualMemoryRead, VirtualQuery, MEM_COMMIT, MEM_FREE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE,
};

/// Deterministic contents of the byte at each address.
pub fn pattern(addr: usize, size: usize) -> Vec<u8> {
    (addr..addr + size).map(|a| (a % 251) as u8).collect()
}

pub struct MockProcess {
    maps: Vec<Mapping>,
    memory: Vec<(usize, Vec<u8>)>,
    holes: Vec<usize>,
    emulated: Result<Option<usize>>,
    native: Result<Option<usize>>,
    released: Rc<Cell<usize>>,
}

impl MockProcess {
    pub const STATUS_ACCESS_DENIED: u32 = 0xc000_0022;

    pub fn new() -> Self {
        Self {
            maps: Vec::new(),
            memory: Vec::new(),
            holes: Vec::new(),
            emulated: Ok(None),
            native: Ok(None),
            released: Rc::new(Cell::new(0)),
        }
    }

    pub fn raw(mut self, map: Mapping) -> Self {
        self.maps.push(map);
        self
    }

    pub fn committed_with(self, addr: usize, size: usize, allocation_base: usize, protect: u32) -> Self {
        self.raw(Mapping { addr, size, allocation_base, state: MEM_COMMIT, protect })
            .fill(addr, &pattern(addr, size))
    }

    pub fn committed(self, addr: usize, size: usize, allocation_base: usize) -> Self {
        self.committed_with(addr, size, allocation_base, PAGE_READWRITE)
    }

    pub fn reserved(self, addr: usize, size: usize, allocation_base: usize) -> Self {
        self.raw(Mapping { addr, size, allocation_base, state: MEM_RESERVE, protect: 0 })
    }

    pub fn free(self, addr: usize, size: usize) -> Self {
        self.raw(Mapping { addr, size, allocation_base: 0, state: MEM_FREE, protect: PAGE_NOACCESS })
    }

    pub fn fill(mut self, addr: usize, bytes: &[u8]) -> Self {
        self.memory.push((addr, bytes.to_vec()));
        self
    }

    /// Makes the byte at `addr` unreadable, as if the target unmapped it after
    /// it was enumerated.
    pub fn unmapped(mut self, addr: usize) -> Self {
        self.holes.push(addr);
        self
    }

    pub fn control_blocks(mut self, emulated: Option<usize>, native: Option<usize>) -> Self {
        self.emulated = Ok(emulated);
        self.native = Ok(native);
        self
    }

    pub fn emulated_query_fails(mut self) -> Self {
        let code = Self::STATUS_ACCESS_DENIED;
        self.emulated = Err(Error::QueryInformation { class: "ProcessWow64Information", code });
        self
    }

    pub fn control_block_query_fails(self) -> Self {
        let mut process = self.emulated_query_fails();
        let code = Self::STATUS_ACCESS_DENIED;
        process.native = Err(Error::QueryInformation { class: "ProcessBasicInformation", code });
        process
    }
}

impl VirtualMemoryQuery for MockProcess {
    /// Gaps before the last entry read as free space, past it the query fails.
    fn query(&self, addr: usize) -> Option<Mapping> {
        if let Some(map) = self
            .maps
            .iter()
            .find(|m| m.addr <= addr && m.end().map_or(true, |end| addr < end))
        {
            return Some(*map);
        }

        let next = self.maps.iter().map(|m| m.addr).filter(|&a| a > addr).min()?;
        Some(Mapping { addr, size: next - addr, allocation_base: 0, state: MEM_FREE, protect: PAGE_NOACCESS })
    }
}

impl VirtualMemoryRead for MockProcess {
    fn read_exact_at(&self, buf: &mut [u8], addr: usize) -> Result<()> {
        let size = buf.len();
        let err = Error::ReadFailure { addr, size, code: 299 };
        let end = addr.checked_add(size).ok_or(err.clone())?;

        if self.holes.iter().any(|&h| addr <= h && h < end) {
            return Err(err);
        }

        let (start, bytes) = self
            .memory
            .iter()
            .find(|(start, bytes)| *start <= addr && end <= start + bytes.len())
            .ok_or(err)?;
        buf.copy_from_slice(&bytes[addr - start..end - start]);
        Ok(())
    }
}

impl ProcessControlBlock for MockProcess {
    fn emulated_control_block(&self) -> Result<Option<usize>> {
        self.emulated.clone()
    }

    fn native_control_block(&self) -> Result<Option<usize>> {
        self.native.clone()
    }
}

impl Release for MockProcess {
    fn release(self) -> Result<()> {
        self.released.set(self.released.get() + 1);
        Ok(())
    }
}

pub struct MockSystem {
    pub bounds: AddressBounds,
    pub host: Host,
    privilege: Result<()>,
    privilege_attempts: Cell<usize>,
    processes: RefCell<HashMap<Pid, MockProcess>>,
}

impl MockSystem {
    pub const INVALID_PARAMETER: u32 = 87;

    pub fn new() -> Self {
        Self {
            bounds: AddressBounds::new(0x10000, 0x7ffe_0000),
            host: Host::Wide,
            privilege: Ok(()),
            privilege_attempts: Cell::new(0),
            processes: RefCell::new(HashMap::new()),
        }
    }

    /// Registers a process and returns its release counter.
    pub fn insert(&self, pid: Pid, process: MockProcess) -> Rc<Cell<usize>> {
        let released = process.released.clone();
        self.processes.borrow_mut().insert(pid, process);
        released
    }

    pub fn deny_privilege(&mut self) {
        self.privilege = Err(Error::Privilege(1300));
    }

    pub fn privilege_attempts(&self) -> usize {
        self.privilege_attempts.get()
    }
}

impl Platform for MockSystem {
    type Process = MockProcess;

    fn enable_debug_privilege(&self) -> Result<()> {
        self.privilege_attempts.set(self.privilege_attempts.get() + 1);
        self.privilege.clone()
    }

    fn open_process(&self, pid: Pid) -> Result<Self::Process> {
        self.processes
            .borrow_mut()
            .remove(&pid)
            .ok_or(Error::AttachDenied { pid, code: Self::INVALID_PARAMETER })
    }

    fn address_bounds(&self, _process: &Self::Process) -> AddressBounds {
        self.bounds
    }

    fn host(&self) -> Host {
        self.host
    }
}
