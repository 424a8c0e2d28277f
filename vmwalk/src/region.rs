use arrayvec::ArrayVec;
use log::debug;

use super::{Error, Mapping, Result, ScanContext, VirtualMemoryQuery, VirtualMemoryRead, Walk};

/// Most sub-regions one allocation may be split into before assembly gives up.
pub const MAX_SUB_SPANS: usize = 32;

/// A piece of an assembled region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubSpan {
    /// Distance from the allocation base.
    pub offset: usize,
    pub size: usize,
    /// Where the bytes start inside `Region::data`.
    pub position: usize,
}

/// One OS allocation read as a single contiguous byte range.
///
/// Sub-regions that are not committed or not accessible are left out, so the
/// flattened data may be shorter than the allocation itself.
#[derive(Debug)]
pub struct Region<'a> {
    allocation_base: usize,
    spans: ArrayVec<SubSpan, MAX_SUB_SPANS>,
    data: &'a [u8],
}

impl<'a> Region<'a> {
    #[inline]
    pub const fn allocation_base(&self) -> usize {
        self.allocation_base
    }

    #[inline]
    pub fn spans(&self) -> &[SubSpan] {
        &self.spans
    }

    #[inline]
    pub const fn data(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn span_data(&self, span: &SubSpan) -> &'a [u8] {
        &self.data[span.position..span.position + span.size]
    }
}

impl<P> ScanContext<'_, P>
where
    P: VirtualMemoryRead + VirtualMemoryQuery,
{
    /// Reads the whole allocation that starts at the current block.
    ///
    /// Fails without returning anything when the allocation has more than
    /// [`MAX_SUB_SPANS`] usable sub-regions or when any of them cannot be read.
    pub fn fetch_region_data(&mut self) -> Result<Region<'_>> {
        let process = self.handle.process();
        let bounds = self.handle.bounds();

        let mut allocation_base = None;
        let mut maps = ArrayVec::<Mapping, MAX_SUB_SPANS>::new();
        let mut total = 0_usize;

        for map in Walk::new(process, self.current.base, bounds.max) {
            match allocation_base {
                None => allocation_base = Some(map.allocation_base),
                Some(base) if base != map.allocation_base => break,
                Some(_) => {}
            }

            if !map.is_scannable() {
                continue;
            }

            maps.try_push(map).map_err(|_| Error::RegionTooFragmented)?;
            total = total.checked_add(map.size).ok_or(Error::AllocationFailure)?;
        }

        let allocation_base = allocation_base.unwrap_or(self.current.base);
        debug!("allocation {allocation_base:#x}: {} sub-regions, {total:#x} bytes", maps.len());

        let buf = self.buffer.reserve(total)?;
        let mut position = 0;
        for map in &maps {
            process.read_exact_at(&mut buf[position..position + map.size], map.addr)?;
            position += map.size;
        }

        let mut position = 0;
        let spans = maps
            .iter()
            .map(|map| {
                let span = SubSpan { offset: map.addr.saturating_sub(allocation_base), size: map.size, position };
                position += map.size;
                span
            })
            .collect();

        Ok(Region { allocation_base, spans, data: self.buffer.get(total) })
    }
}
