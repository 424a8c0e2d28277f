use log::debug;

use super::{Error, ProcessControlBlock, ProcessHandle, Result, VirtualMemoryRead};

/// How the calling process itself runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// 64-bit caller.
    Wide,
    /// 32-bit caller on a 32-bit OS.
    Narrow,
    /// 32-bit caller under the emulation layer of a 64-bit OS.
    NarrowEmulated,
}

/// Which control block layout holds the image base of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchMode {
    /// 64-bit control block read by a 64-bit caller.
    Native64,
    /// 32-bit control block of an emulated target read by a 64-bit caller.
    Emulated32,
    /// 32-bit control block read by a 32-bit caller.
    Native32,
}

impl ArchMode {
    // (offset of the image base field, width of the field)
    const IMAGE_BASE_FIELD: [(usize, usize); 3] = [(0x10, 8), (0x08, 4), (0x08, 4)];

    #[inline]
    pub const fn image_base_field(self) -> (usize, usize) {
        Self::IMAGE_BASE_FIELD[self as usize]
    }

    /// Picks the layout and finds the control block it applies to.
    pub fn resolve<P: ProcessControlBlock>(host: Host, process: &P) -> Result<(Self, usize)> {
        match host {
            Host::Wide => {
                match process.emulated_control_block() {
                    Ok(Some(addr)) => return Ok((Self::Emulated32, addr)),
                    Ok(None) => {}
                    Err(err) => debug!("{err}, falling back to the native control block"),
                }
                Ok((Self::Native64, native_control_block(process)?))
            }
            Host::Narrow => Ok((Self::Native32, native_control_block(process)?)),
            // a 64-bit target is out of reach, an emulated one looks like a 32-bit system
            Host::NarrowEmulated => match process.emulated_control_block()? {
                Some(_) => Ok((Self::Native32, native_control_block(process)?)),
                None => Err(Error::ResolutionUnsupported),
            },
        }
    }
}

fn native_control_block<P: ProcessControlBlock>(process: &P) -> Result<usize> {
    process
        .native_control_block()?
        .ok_or(Error::ResolutionFailed("null control block"))
}

impl<P> ProcessHandle<P>
where
    P: VirtualMemoryRead + ProcessControlBlock,
{
    /// Image base of the target's main executable, read straight from its
    /// process control block.
    ///
    /// The field used is undocumented. An error means the base is unknown,
    /// not that the module is missing; fall back to enumerating memory.
    pub fn primary_module_base(&self) -> Result<usize> {
        let process = self.process();
        let (mode, control_block) = ArchMode::resolve(self.host(), process)?;
        let (offset, width) = mode.image_base_field();
        debug!("{mode:?} control block at {control_block:#x}");

        let addr = control_block
            .checked_add(offset)
            .ok_or(Error::ResolutionFailed("control block out of range"))?;

        let mut buf = [0_u8; 8];
        process
            .read_exact_at(&mut buf[..width], addr)
            .map_err(|_| Error::ResolutionFailed("image base unreadable"))?;

        match usize::try_from(u64::from_le_bytes(buf)) {
            Ok(0) => Err(Error::ResolutionFailed("null image base")),
            Ok(base) => Ok(base),
            Err(_) => Err(Error::ResolutionFailed("image base out of range")),
        }
    }
}
