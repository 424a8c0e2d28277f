use log::debug;

use super::{
    Mapping, ProcessControlBlock, ProcessHandle, Result, ScratchBuffer, VirtualMemoryQuery, VirtualMemoryRead,
    VirtualQuery, Walk,
};

/// A committed, accessible span of the target.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub base: usize,
    pub size: usize,
}

impl VirtualQuery for Block {
    fn start(&self) -> usize {
        self.base
    }

    fn size(&self) -> usize {
        self.size
    }
}

impl From<Mapping> for Block {
    fn from(map: Mapping) -> Self {
        Self { base: map.addr, size: map.size }
    }
}

/// State of one scan over an attached process.
///
/// Not meant to be shared between threads while a scan is running; every
/// fetch reuses the same scratch buffer.
pub struct ScanContext<'a, P> {
    pub(crate) handle: &'a ProcessHandle<P>,
    pub(crate) current: Block,
    pub(crate) buffer: ScratchBuffer,
}

impl<'a, P> ScanContext<'a, P>
where
    P: VirtualMemoryRead + VirtualMemoryQuery,
{
    pub fn new(handle: &'a ProcessHandle<P>) -> Self {
        Self { handle, current: Block::default(), buffer: ScratchBuffer::new() }
    }

    #[inline]
    pub const fn current(&self) -> Block {
        self.current
    }

    #[inline]
    pub const fn handle(&self) -> &'a ProcessHandle<P> {
        self.handle
    }

    /// Restarts the scan at the lowest application address.
    pub fn first_block(&mut self) -> Option<Block> {
        self.current = Block { base: self.handle.bounds().min, size: 0 };
        self.next_block()
    }

    /// The next block past the end of the current one, `None` once exhausted.
    pub fn next_block(&mut self) -> Option<Block> {
        let Some(start) = self.current.end() else {
            debug!("block {:#x}+{:#x} ends past the address range", self.current.base, self.current.size);
            return None;
        };

        let block = Walk::new(self.handle.process(), start, self.handle.bounds().max)
            .find(Mapping::is_scannable)
            .map(Block::from)?;

        self.current = block;
        Some(block)
    }

    /// Moves the cursor to `addr` without looking at the memory there.
    ///
    /// Only `fetch_region_data` honours the new position; block enumeration
    /// must be restarted with `first_block`.
    pub fn seek(&mut self, addr: usize) {
        self.current = Block { base: addr, size: 0 };
    }

    /// Copies the current block out of the target.
    pub fn fetch_block_data(&mut self) -> Result<&[u8]> {
        let Block { base, size } = self.current;
        let buf = self.buffer.reserve(size)?;
        self.handle.process().read_exact_at(buf, base)?;
        Ok(self.buffer.get(size))
    }

    pub fn blocks(&mut self) -> Blocks<'_, 'a, P> {
        Blocks { ctx: self, started: false }
    }
}

impl<P> ScanContext<'_, P>
where
    P: VirtualMemoryRead + ProcessControlBlock,
{
    pub fn fetch_primary_module_base(&self) -> Result<usize> {
        self.handle.primary_module_base()
    }
}

/// Iterator form of `first_block` followed by `next_block`.
pub struct Blocks<'c, 'a, P> {
    ctx: &'c mut ScanContext<'a, P>,
    started: bool,
}

impl<P: VirtualMemoryRead + VirtualMemoryQuery> Iterator for Blocks<'_, '_, P> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        if self.started {
            self.ctx.next_block()
        } else {
            self.started = true;
            self.ctx.first_block()
        }
    }
}
