use log::debug;

use super::{VirtualMemoryQuery, VirtualQuery};

pub const MEM_COMMIT: u32 = 0x1000;
pub const MEM_RESERVE: u32 = 0x2000;
pub const MEM_FREE: u32 = 0x10000;

pub const PAGE_NOACCESS: u32 = 0x01;
pub const PAGE_READONLY: u32 = 0x02;
pub const PAGE_READWRITE: u32 = 0x04;

/// One entry of the target's virtual memory metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub addr: usize,
    pub size: usize,
    pub allocation_base: usize,
    pub state: u32,
    pub protect: u32,
}

impl Mapping {
    #[inline]
    pub const fn is_committed(&self) -> bool {
        self.state == MEM_COMMIT
    }

    #[inline]
    pub const fn is_accessible(&self) -> bool {
        self.protect & PAGE_NOACCESS == 0
    }

    /// Committed and not marked inaccessible.
    #[inline]
    pub const fn is_scannable(&self) -> bool {
        self.is_committed() && self.is_accessible()
    }
}

impl VirtualQuery for Mapping {
    fn start(&self) -> usize {
        self.addr
    }

    fn size(&self) -> usize {
        self.size
    }
}

/// Forward walk over every metadata entry from a cursor up to `max_addr`.
///
/// Entries are clipped so that none starts below the cursor it was queried at.
/// The walk ends for good at `max_addr`, on a failed query, or when an entry's
/// end does not fit in `usize` (a narrower caller looking at a wider target).
pub struct Walk<'a, P: ?Sized> {
    process: &'a P,
    addr: usize,
    max_addr: usize,
}

impl<'a, P: VirtualMemoryQuery + ?Sized> Walk<'a, P> {
    pub const fn new(process: &'a P, addr: usize, max_addr: usize) -> Self {
        Self { process, addr, max_addr }
    }

    #[inline]
    pub const fn cursor(&self) -> usize {
        self.addr
    }

    #[inline]
    fn finish(&mut self) {
        self.addr = self.max_addr;
    }
}

impl<P: VirtualMemoryQuery + ?Sized> Iterator for Walk<'_, P> {
    type Item = Mapping;

    fn next(&mut self) -> Option<Self::Item> {
        if self.addr >= self.max_addr {
            return None;
        }

        let Some(mut map) = self.process.query(self.addr) else {
            debug!("query at {:#x} failed, stopping", self.addr);
            self.finish();
            return None;
        };

        let Some(end) = map.end().filter(|&end| end > self.addr) else {
            debug!("entry {:#x}+{:#x} overflows the address range, stopping", map.addr, map.size);
            self.finish();
            return None;
        };

        if map.addr < self.addr {
            map.size = end - self.addr;
            map.addr = self.addr;
        }

        self.addr = end;
        Some(map)
    }
}

impl<P: VirtualMemoryQuery + ?Sized> core::iter::FusedIterator for Walk<'_, P> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockProcess;

    #[test]
    fn test_walk_visits_every_entry() {
        let process = MockProcess::new()
            .committed(0x10000, 0x1000, 0x10000)
            .reserved(0x11000, 0x3000, 0x10000)
            .free(0x14000, 0xc000)
            .committed(0x20000, 0x2000, 0x20000);

        let maps = Walk::new(&process, 0x10000, 0x7ffe0000).collect::<Vec<_>>();
        let starts = maps.iter().map(|m| m.addr).collect::<Vec<_>>();
        assert_eq!(starts, [0x10000, 0x11000, 0x14000, 0x20000]);
        assert!(maps[0].is_scannable());
        assert!(!maps[1].is_scannable());
        assert!(!maps[2].is_scannable());
    }

    #[test]
    fn test_walk_clips_to_cursor() {
        let process = MockProcess::new().committed(0x10000, 0x4000, 0x10000);

        let map = Walk::new(&process, 0x12000, 0x7ffe0000).next().unwrap();
        assert_eq!((map.addr, map.size), (0x12000, 0x2000));
        assert_eq!(map.allocation_base, 0x10000);
    }

    #[test]
    fn test_walk_stops_on_overflow() {
        let process = MockProcess::new()
            .committed(0x10000, 0x1000, 0x10000)
            .raw(Mapping {
                addr: 0x11000,
                size: usize::MAX - 0x1000,
                allocation_base: 0x11000,
                state: MEM_COMMIT,
                protect: PAGE_READWRITE,
            });

        let mut walk = Walk::new(&process, 0x10000, usize::MAX);
        assert_eq!(walk.next().map(|m| m.addr), Some(0x10000));
        assert_eq!(walk.next(), None);
        assert_eq!(walk.next(), None);
    }

    #[test]
    fn test_walk_stops_on_failed_query() {
        let process = MockProcess::new().committed(0x10000, 0x1000, 0x10000);

        let mut walk = Walk::new(&process, 0x10000, 0x7ffe0000);
        assert!(walk.next().is_some());
        assert_eq!(walk.next(), None);
        assert_eq!(walk.cursor(), 0x7ffe0000);
    }

    #[test]
    fn test_protection_flags() {
        let map = Mapping { addr: 0, size: 0x1000, allocation_base: 0, state: MEM_COMMIT, protect: PAGE_NOACCESS };
        assert!(map.is_committed());
        assert!(!map.is_accessible());

        let map = Mapping { state: MEM_RESERVE, protect: PAGE_READONLY, ..map };
        assert!(!map.is_committed());
        assert!(map.is_accessible());
    }
}
