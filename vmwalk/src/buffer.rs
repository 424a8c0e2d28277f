use super::{Error, Result};

/// Grow-only byte buffer reused across fetches of one scan.
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    buf: Vec<u8>,
}

impl ScratchBuffer {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Makes room for at least `size` bytes and hands out the first `size`.
    ///
    /// Growing replaces the old allocation, so views handed out earlier must
    /// not outlive this call. On failure the buffer is left empty.
    pub fn reserve(&mut self, size: usize) -> Result<&mut [u8]> {
        if self.buf.len() < size {
            self.buf = Vec::new();
            self.buf.try_reserve_exact(size).map_err(|_| Error::AllocationFailure)?;
            self.buf.resize(size, 0);
        }
        Ok(&mut self.buf[..size])
    }

    #[inline]
    pub fn get(&self, size: usize) -> &[u8] {
        &self.buf[..size]
    }
}
