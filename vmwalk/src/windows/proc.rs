use core::{ffi::c_void, mem};

use windows_sys::Win32::{
    Foundation::{CloseHandle, GetLastError, BOOL, FALSE, HANDLE},
    System::{
        Diagnostics::Debug::ReadProcessMemory,
        Memory::{VirtualQueryEx, MEMORY_BASIC_INFORMATION},
        SystemInformation::GetSystemInfo,
        Threading::{GetCurrentProcess, IsWow64Process, OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ},
    },
};

use super::token;
use crate::{
    AddressBounds, Error, Host, Mapping, Pid, Platform, ProcessControlBlock, Release, Result, VirtualMemoryQuery,
    VirtualMemoryRead,
};

const PROCESS_BASIC_INFORMATION: u32 = 0;
const PROCESS_WOW64_INFORMATION: u32 = 26;

// highest user address of a large-address-aware 32-bit process on a 64-bit system
const EMULATED_MAX_ADDRESS: usize = 0xfffe_ffff;

#[allow(dead_code)]
#[repr(C)]
struct ProcessBasicInfo {
    exit_status: i32,
    peb_base: usize,
    affinity_mask: usize,
    base_priority: i32,
    unique_pid: usize,
    inherited_from_pid: usize,
}

#[link(name = "ntdll")]
extern "system" {
    fn NtQueryInformationProcess(
        handle: HANDLE,
        class: u32,
        info: *mut c_void,
        len: u32,
        ret_len: *mut u32,
    ) -> i32;
}

struct HandleWrapper(HANDLE);

impl HandleWrapper {
    fn close(self) -> Result<(), u32> {
        let handle = self.0;
        mem::forget(self);
        if unsafe { CloseHandle(handle) } == FALSE {
            return Err(unsafe { GetLastError() });
        }
        Ok(())
    }
}

impl Drop for HandleWrapper {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

/// A target opened with read and query rights only.
pub struct Process {
    handle: HandleWrapper,
}

impl Process {
    pub fn open(pid: Pid) -> Result<Self> {
        let handle = unsafe { OpenProcess(PROCESS_VM_READ | PROCESS_QUERY_INFORMATION, FALSE, pid) };
        if handle == 0 {
            let code = unsafe { GetLastError() };
            return Err(Error::AttachDenied { pid, code });
        }
        Ok(Self { handle: HandleWrapper(handle) })
    }

    #[inline]
    pub fn handle(&self) -> HANDLE {
        self.handle.0
    }

    pub fn is_wow64(&self) -> bool {
        is_wow64(self.handle.0)
    }

    unsafe fn query_information<T>(&self, class: u32, info: &mut T) -> Result<(), u32> {
        let mut len = 0;
        let status = NtQueryInformationProcess(
            self.handle.0,
            class,
            info as *mut T as _,
            mem::size_of::<T>() as u32,
            &mut len,
        );
        if status < 0 {
            return Err(status as u32);
        }
        Ok(())
    }
}

impl VirtualMemoryRead for Process {
    fn read_exact_at(&self, buf: &mut [u8], addr: usize) -> Result<()> {
        let size = buf.len();
        let mut read = 0;
        unsafe {
            let ret = ReadProcessMemory(self.handle.0, addr as _, buf.as_mut_ptr() as _, size, &mut read);
            if ret == FALSE {
                let code = GetLastError();
                return Err(Error::ReadFailure { addr, size, code });
            }
        }
        if read != size {
            return Err(Error::ReadFailure { addr, size, code: 0 });
        }
        Ok(())
    }
}

impl VirtualMemoryQuery for Process {
    fn query(&self, addr: usize) -> Option<Mapping> {
        unsafe {
            let mut info = mem::MaybeUninit::<MEMORY_BASIC_INFORMATION>::uninit();
            let ret = VirtualQueryEx(
                self.handle.0,
                addr as _,
                info.as_mut_ptr(),
                mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            );
            if ret == 0 {
                return None;
            }
            let info = info.assume_init();
            Some(Mapping {
                addr: info.BaseAddress as usize,
                size: info.RegionSize,
                allocation_base: info.AllocationBase as usize,
                state: info.State,
                protect: info.Protect,
            })
        }
    }
}

impl ProcessControlBlock for Process {
    fn emulated_control_block(&self) -> Result<Option<usize>> {
        let mut peb: usize = 0;
        unsafe { self.query_information(PROCESS_WOW64_INFORMATION, &mut peb) }
            .map_err(|code| Error::QueryInformation { class: "ProcessWow64Information", code })?;
        Ok((peb != 0).then_some(peb))
    }

    fn native_control_block(&self) -> Result<Option<usize>> {
        let mut info = ProcessBasicInfo {
            exit_status: 0,
            peb_base: 0,
            affinity_mask: 0,
            base_priority: 0,
            unique_pid: 0,
            inherited_from_pid: 0,
        };
        unsafe { self.query_information(PROCESS_BASIC_INFORMATION, &mut info) }
            .map_err(|code| Error::QueryInformation { class: "ProcessBasicInformation", code })?;
        Ok((info.peb_base != 0).then_some(info.peb_base))
    }
}

impl Release for Process {
    fn release(self) -> Result<()> {
        self.handle.close().map_err(Error::Detach)
    }
}

fn is_wow64(handle: HANDLE) -> bool {
    let mut wow64: BOOL = FALSE;
    unsafe { IsWow64Process(handle, &mut wow64) != FALSE && wow64 != FALSE }
}

/// The live system.
pub struct Windows;

impl Platform for Windows {
    type Process = Process;

    fn enable_debug_privilege(&self) -> Result<()> {
        token::enable_debug_privilege().map_err(Error::Privilege)
    }

    fn open_process(&self, pid: Pid) -> Result<Self::Process> {
        Process::open(pid)
    }

    fn address_bounds(&self, process: &Self::Process) -> AddressBounds {
        let info = unsafe {
            let mut info = mem::MaybeUninit::uninit();
            GetSystemInfo(info.as_mut_ptr());
            info.assume_init()
        };
        let min = info.lpMinimumApplicationAddress as usize;
        let mut max = info.lpMaximumApplicationAddress as usize;
        if self.host() == Host::Wide && process.is_wow64() {
            max = max.min(EMULATED_MAX_ADDRESS);
        }
        AddressBounds::new(min, max)
    }

    fn host(&self) -> Host {
        if cfg!(target_pointer_width = "64") {
            Host::Wide
        } else if is_wow64(unsafe { GetCurrentProcess() }) {
            Host::NarrowEmulated
        } else {
            Host::Narrow
        }
    }
}
