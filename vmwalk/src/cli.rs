use std::fmt::Display;

use super::cmd::{SubCommandBase, SubCommandBlocks, SubCommandRegion};

pub struct Error(pub String);

impl From<vmwalk::Error> for Error {
    fn from(value: vmwalk::Error) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(target_os = "windows")]
mod imp {
    use log::info;
    use vmwalk::{windows::Process, ProcessHandle, ScanContext, VirtualQuery};

    use super::Error;

    /// Runs `f` on a fresh scan and detaches whatever it returned.
    pub fn with_context<T>(
        pid: vmwalk::Pid,
        f: impl FnOnce(&mut ScanContext<'_, Process>) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let handle: ProcessHandle<Process> = vmwalk::attach(pid)?;
        let ret = f(&mut ScanContext::new(&handle));
        handle.detach()?;
        ret
    }

    pub fn blocks(pid: vmwalk::Pid) -> Result<(), Error> {
        with_context(pid, |ctx| {
            let (mut count, mut total) = (0, 0_usize);
            for block in ctx.blocks() {
                let end = block.end().unwrap_or(usize::MAX);
                println!("{:#x}-{end:#x} {:#x}", block.base, block.size);
                count += 1;
                total = total.saturating_add(block.size);
            }
            info!("{count} blocks, {total:#x} bytes");
            Ok(())
        })
    }

    pub fn region(pid: vmwalk::Pid, addr: usize) -> Result<(), Error> {
        with_context(pid, |ctx| {
            ctx.seek(addr);
            let region = ctx.fetch_region_data()?;
            println!("allocation {:#x}, {:#x} bytes", region.allocation_base(), region.len());
            for span in region.spans() {
                println!("  +{:#x} {:#x} @{:#x}", span.offset, span.size, span.position);
            }
            Ok(())
        })
    }

    pub fn base(pid: vmwalk::Pid) -> Result<(), Error> {
        with_context(pid, |ctx| {
            match ctx.fetch_primary_module_base() {
                Ok(base) => println!("{base:#x}"),
                Err(err) => {
                    info!("{err}");
                    println!("unknown");
                }
            }
            Ok(())
        })
    }
}

#[cfg(not(target_os = "windows"))]
mod imp {
    use super::Error;

    const UNSUPPORTED: &str = "unsupported platform";

    pub fn blocks(_pid: vmwalk::Pid) -> Result<(), Error> {
        Err(UNSUPPORTED.into())
    }

    pub fn region(_pid: vmwalk::Pid, _addr: usize) -> Result<(), Error> {
        Err(UNSUPPORTED.into())
    }

    pub fn base(_pid: vmwalk::Pid) -> Result<(), Error> {
        Err(UNSUPPORTED.into())
    }
}

impl SubCommandBlocks {
    pub fn init(self) -> Result<(), Error> {
        imp::blocks(self.pid)
    }
}

impl SubCommandRegion {
    pub fn init(self) -> Result<(), Error> {
        imp::region(self.pid, self.addr.0)
    }
}

impl SubCommandBase {
    pub fn init(self) -> Result<(), Error> {
        imp::base(self.pid)
    }
}
