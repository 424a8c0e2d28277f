use core::{mem, ptr};

use windows_sys::Win32::{
    Foundation::{CloseHandle, GetLastError, ERROR_NOT_ALL_ASSIGNED, FALSE, HANDLE, LUID, WIN32_ERROR},
    Security::{
        AdjustTokenPrivileges, LookupPrivilegeValueW, LUID_AND_ATTRIBUTES, SE_PRIVILEGE_ENABLED,
        TOKEN_ADJUST_PRIVILEGES, TOKEN_PRIVILEGES,
    },
    System::Threading::{GetCurrentProcess, OpenProcessToken},
};

/// Enables `SeDebugPrivilege` on the calling process' token.
pub fn enable_debug_privilege() -> Result<(), WIN32_ERROR> {
    unsafe {
        let mut token: HANDLE = 0;
        if OpenProcessToken(GetCurrentProcess(), TOKEN_ADJUST_PRIVILEGES, &mut token) == FALSE {
            return Err(GetLastError());
        }
        let ret = adjust(token);
        CloseHandle(token);
        ret
    }
}

unsafe fn adjust(token: HANDLE) -> Result<(), WIN32_ERROR> {
    let name = "SeDebugPrivilege\0".encode_utf16().collect::<Vec<u16>>();
    let mut luid: LUID = mem::zeroed();
    if LookupPrivilegeValueW(ptr::null(), name.as_ptr(), &mut luid) == FALSE {
        return Err(GetLastError());
    }

    let privileges = TOKEN_PRIVILEGES {
        PrivilegeCount: 1,
        Privileges: [LUID_AND_ATTRIBUTES { Luid: luid, Attributes: SE_PRIVILEGE_ENABLED }],
    };
    let ret = AdjustTokenPrivileges(
        token,
        FALSE,
        &privileges,
        mem::size_of::<TOKEN_PRIVILEGES>() as u32,
        ptr::null_mut(),
        ptr::null_mut(),
    );
    // succeeds even when the privilege is not held, the last error tells
    let err = GetLastError();
    if ret == FALSE || err == ERROR_NOT_ALL_ASSIGNED {
        return Err(err);
    }
    Ok(())
}
