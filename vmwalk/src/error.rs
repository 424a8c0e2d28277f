use crate::Pid;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// OS error code as reported by the platform (`GetLastError` / `NTSTATUS`).
pub type Code = u32;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("out of memory")]
    AllocationFailure,

    #[error("could not attach to process {pid}, code: {code}")]
    AttachDenied { pid: Pid, code: Code },

    #[error("could not enable debug privilege, code: {0}")]
    Privilege(Code),

    #[error("could not detach from process, code: {0}")]
    Detach(Code),

    #[error("read of {size:#x} bytes at {addr:#x} failed, code: {code}")]
    ReadFailure { addr: usize, size: usize, code: Code },

    #[error("allocation is split into more than {} sub-regions", crate::region::MAX_SUB_SPANS)]
    RegionTooFragmented,

    #[error("{class} query failed, code: {code:#x}")]
    QueryInformation { class: &'static str, code: Code },

    #[error("primary module lookup is not supported for this architecture combination")]
    ResolutionUnsupported,

    #[error("primary module lookup failed: {0}")]
    ResolutionFailed(&'static str),
}
