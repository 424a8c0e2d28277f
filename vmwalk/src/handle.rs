use log::{debug, warn};

use super::{Host, Pid, Platform, Release, Result};

/// Lowest and highest address an application can map in the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBounds {
    pub min: usize,
    pub max: usize,
}

impl AddressBounds {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// An attached target process.
///
/// The bounds and the caller's own width are captured once when attaching and
/// never change afterwards.
pub struct ProcessHandle<P> {
    pid: Pid,
    process: P,
    bounds: AddressBounds,
    host: Host,
}

impl<P: Release> ProcessHandle<P> {
    pub fn attach<S: Platform<Process = P>>(platform: &S, pid: Pid) -> Result<Self> {
        // missing privilege only narrows what can be opened below
        if let Err(err) = platform.enable_debug_privilege() {
            debug!("debug privilege not enabled: {err}");
        }

        let process = platform.open_process(pid)?;
        let bounds = platform.address_bounds(&process);
        let host = platform.host();
        debug!("attached to {pid}, bounds {:#x}-{:#x}, host {host:?}", bounds.min, bounds.max);

        Ok(Self { pid, process, bounds, host })
    }

    pub fn detach(self) -> Result<()> {
        let pid = self.pid;
        self.process.release().inspect_err(|err| warn!("detach from {pid}: {err}"))
    }
}

impl<P> ProcessHandle<P> {
    #[inline]
    pub const fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub const fn bounds(&self) -> AddressBounds {
        self.bounds
    }

    #[inline]
    pub const fn host(&self) -> Host {
        self.host
    }

    #[inline]
    pub const fn process(&self) -> &P {
        &self.process
    }
}

impl<P> core::fmt::Debug for ProcessHandle<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("bounds", &self.bounds)
            .field("host", &self.host)
            .finish()
    }
}
