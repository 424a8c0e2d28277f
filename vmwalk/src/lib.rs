mod block;
mod buffer;
mod error;
mod handle;
mod mapping;
mod module;
mod region;

#[cfg(test)]
mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

pub use self::{
    block::{Block, Blocks, ScanContext},
    buffer::ScratchBuffer,
    error::{Code, Error, Result},
    handle::{AddressBounds, ProcessHandle},
    mapping::{Mapping, Walk, MEM_COMMIT, MEM_FREE, MEM_RESERVE, PAGE_NOACCESS, PAGE_READONLY, PAGE_READWRITE},
    module::{ArchMode, Host},
    region::{Region, SubSpan, MAX_SUB_SPANS},
};

pub type Pid = u32;

pub trait VirtualMemoryRead {
    /// Copies exactly `buf.len()` bytes starting at `addr`. A short read is an error.
    fn read_exact_at(&self, buf: &mut [u8], addr: usize) -> Result<()>;
}

pub trait VirtualMemoryQuery {
    /// Metadata of the span containing `addr`, or `None` if the query failed.
    fn query(&self, addr: usize) -> Option<Mapping>;
}

/// Access to the target's process control block(s).
pub trait ProcessControlBlock {
    /// Address of the narrower control block kept by the emulation layer.
    /// `Ok(None)` when the target does not run under emulation.
    fn emulated_control_block(&self) -> Result<Option<usize>>;

    /// Address of the native control block, `Ok(None)` if the OS reports null.
    fn native_control_block(&self) -> Result<Option<usize>>;
}

/// Gives the OS access handle back. Consumes the owner so it runs once.
pub trait Release {
    fn release(self) -> Result<()>;
}

pub trait VirtualQuery {
    fn start(&self) -> usize;
    fn size(&self) -> usize;

    fn end(&self) -> Option<usize> {
        self.start().checked_add(self.size())
    }
}

/// Process-wide operations of the host OS.
pub trait Platform {
    type Process: VirtualMemoryRead + VirtualMemoryQuery + ProcessControlBlock + Release;

    /// Raises the caller's privilege so that other processes can be read.
    fn enable_debug_privilege(&self) -> Result<()>;

    fn open_process(&self, pid: Pid) -> Result<Self::Process>;

    fn address_bounds(&self, process: &Self::Process) -> AddressBounds;

    fn host(&self) -> Host;
}

#[cfg(target_os = "windows")]
pub fn attach(pid: Pid) -> Result<ProcessHandle<windows::Process>> {
    ProcessHandle::attach(&windows::Windows, pid)
}
