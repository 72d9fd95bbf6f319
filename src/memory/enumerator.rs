// Fri Oct 16 2026 - Alex

//! Lazy walk over a foreign address space.
//!
//! A [`RegionCursor`] is a plain value: advancing returns a new cursor and
//! never touches the old one, so copies walk independently. Every step asks
//! the process again, so a walk sees the address space as it is at each
//! query rather than as it was when the walk began.

use crate::memory::region::query;
use crate::memory::{Address, MemoryError, RegionDescriptor, SysError, VirtualMemory};
use std::fmt;
use std::iter::FusedIterator;

#[derive(Debug, Clone, Copy)]
enum CursorState {
    Start,
    Positioned(RegionDescriptor),
    End,
}

pub struct RegionCursor<'p, P: VirtualMemory + ?Sized> {
    process: &'p P,
    state: CursorState,
}

impl<'p, P: VirtualMemory + ?Sized> RegionCursor<'p, P> {
    /// A cursor before the first region. Nothing has been queried yet.
    pub fn start(process: &'p P) -> Self {
        Self { process, state: CursorState::Start }
    }

    /// The past-the-end sentinel.
    pub fn end(process: &'p P) -> Self {
        Self { process, state: CursorState::End }
    }

    /// A cursor on the region at address zero.
    pub fn begin(process: &'p P) -> Result<Self, MemoryError> {
        Self::start(process).advance()
    }

    pub fn current(&self) -> Option<&RegionDescriptor> {
        match &self.state {
            CursorState::Positioned(region) => Some(region),
            _ => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self.state, CursorState::End)
    }

    pub fn process(&self) -> &'p P {
        self.process
    }

    /// The cursor one region further on.
    ///
    /// The walk ends once a region reaches the top of the 64-bit space. Query
    /// failures are returned as errors, never folded into the end state.
    pub fn advance(&self) -> Result<Self, MemoryError> {
        let next = match self.state {
            CursorState::Start => Address::zero(),
            CursorState::Positioned(region) => match region.end() {
                Some(next) => next,
                None => return Ok(Self::end(self.process)),
            },
            CursorState::End => return Ok(Self::end(self.process)),
        };

        let region = query(self.process, next)?;
        let region = Self::anchor(region, next)?;
        Ok(Self {
            process: self.process,
            state: CursorState::Positioned(region),
        })
    }

    // Pins a queried region to start exactly at the cursor so the walk has
    // no gaps or overlaps even if the primitive or the address space shifts
    // underneath it.
    fn anchor(region: RegionDescriptor, next: Address) -> Result<RegionDescriptor, MemoryError> {
        if region.size() == 0 {
            return Err(MemoryError::QueryFailed(SysError::errno("region query", libc::EINVAL)));
        }
        if region.base() > next {
            return Ok(RegionDescriptor::free(next, region.base() - next));
        }
        let region = region.clipped_from(next);
        if region.size() == 0 {
            return Err(MemoryError::QueryFailed(SysError::errno("region query", libc::EINVAL)));
        }
        Ok(region)
    }
}

impl<'p, P: VirtualMemory + ?Sized> Clone for RegionCursor<'p, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'p, P: VirtualMemory + ?Sized> Copy for RegionCursor<'p, P> {}

impl<'p, P: VirtualMemory + ?Sized> PartialEq for RegionCursor<'p, P> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.state, &other.state) {
            (CursorState::Start, CursorState::Start) => true,
            (CursorState::End, CursorState::End) => true,
            (CursorState::Positioned(a), CursorState::Positioned(b)) => a.base() == b.base(),
            _ => false,
        }
    }
}

impl<'p, P: VirtualMemory + ?Sized> Eq for RegionCursor<'p, P> {}

impl<'p, P: VirtualMemory + ?Sized> fmt::Debug for RegionCursor<'p, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionCursor")
            .field("pid", &self.process.pid())
            .field("state", &self.state)
            .finish()
    }
}

/// Iterator over the regions of a process, from address zero upwards.
///
/// Yields `Err(QueryFailed)` at most once and then stops.
pub struct RegionEnumerator<'p, P: VirtualMemory + ?Sized> {
    cursor: RegionCursor<'p, P>,
    failed: bool,
}

impl<'p, P: VirtualMemory + ?Sized> RegionEnumerator<'p, P> {
    pub fn new(process: &'p P) -> Self {
        Self::from_cursor(RegionCursor::start(process))
    }

    pub fn from_cursor(cursor: RegionCursor<'p, P>) -> Self {
        Self { cursor, failed: false }
    }

    pub fn cursor(&self) -> RegionCursor<'p, P> {
        self.cursor
    }
}

impl<'p, P: VirtualMemory + ?Sized> Clone for RegionEnumerator<'p, P> {
    fn clone(&self) -> Self {
        Self { cursor: self.cursor, failed: self.failed }
    }
}

impl<'p, P: VirtualMemory + ?Sized> Iterator for RegionEnumerator<'p, P> {
    type Item = Result<RegionDescriptor, MemoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_end() {
            return None;
        }
        match self.cursor.advance() {
            Ok(cursor) => {
                self.cursor = cursor;
                cursor.current().copied().map(Ok)
            }
            Err(e) => {
                log::debug!("pid {}: region walk stopped: {}", self.cursor.process.pid(), e);
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl<'p, P: VirtualMemory + ?Sized> FusedIterator for RegionEnumerator<'p, P> {}

/// The regions of one process as a restartable collection. Each iteration
/// starts a fresh walk.
pub struct RegionList<'p, P: VirtualMemory + ?Sized> {
    process: &'p P,
}

impl<'p, P: VirtualMemory + ?Sized> RegionList<'p, P> {
    pub fn new(process: &'p P) -> Self {
        Self { process }
    }

    pub fn iter(&self) -> RegionEnumerator<'p, P> {
        RegionEnumerator::new(self.process)
    }

    pub fn begin(&self) -> Result<RegionCursor<'p, P>, MemoryError> {
        RegionCursor::begin(self.process)
    }

    pub fn end(&self) -> RegionCursor<'p, P> {
        RegionCursor::end(self.process)
    }
}

impl<'p, P: VirtualMemory + ?Sized> Clone for RegionList<'p, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'p, P: VirtualMemory + ?Sized> Copy for RegionList<'p, P> {}

impl<'p, P: VirtualMemory + ?Sized> IntoIterator for RegionList<'p, P> {
    type Item = Result<RegionDescriptor, MemoryError>;
    type IntoIter = RegionEnumerator<'p, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, 'p, P: VirtualMemory + ?Sized> IntoIterator for &'a RegionList<'p, P> {
    type Item = Result<RegionDescriptor, MemoryError>;
    type IntoIter = RegionEnumerator<'p, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub fn enumerate<P: VirtualMemory + ?Sized>(process: &P) -> RegionEnumerator<'_, P> {
    RegionEnumerator::new(process)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::testing::{SimulatedProcess, PAGE_SIZE};
    use crate::memory::{ForeignProcess, Protection, RawHandle, RegionState, RegionType, RemoteAllocator};

    fn populated() -> SimulatedProcess {
        let process = SimulatedProcess::new();
        process.map(Address::new(0x40_0000), 0x2000, Protection::READ_EXECUTE, RegionType::Image);
        process.map(Address::new(0x40_2000), 0x1000, Protection::READ_WRITE, RegionType::Image);
        process.map_with_state(
            Address::new(0x100_0000),
            0x10000,
            Protection::NO_ACCESS,
            RegionState::Reserved,
            RegionType::Private,
        );
        process.map(Address::new(0x7fff_0000_0000), 0x21000, Protection::READ_WRITE, RegionType::Private);
        process
    }

    fn walk(process: &SimulatedProcess) -> Vec<RegionDescriptor> {
        enumerate(process).collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn test_walk_is_contiguous_and_strictly_increasing() {
        let process = populated();
        let regions = walk(&process);
        assert_eq!(regions[0].base(), Address::zero());
        for pair in regions.windows(2) {
            assert_eq!(pair[0].end(), Some(pair[1].base()));
            assert!(pair[1] > pair[0]);
        }
        assert_eq!(regions.last().unwrap().end(), None);
    }

    #[test]
    fn test_walk_covers_every_mapping() {
        let process = populated();
        let mapped: Vec<_> = walk(&process).into_iter().filter(|r| !r.is_free()).collect();
        assert_eq!(mapped.len(), 4);
        for region in &mapped {
            assert!(region.allocation_base().is_some());
            assert!(region.kind().is_some());
            assert!(!region.allocation_protection().is_empty());
            assert_ne!(region.size(), 0);
        }
        assert_eq!(mapped[2].state(), RegionState::Reserved);
    }

    #[test]
    fn test_empty_address_space_is_one_free_region() {
        let process = SimulatedProcess::new();
        let regions = walk(&process);
        assert!(regions.iter().all(|r| r.is_free()));
        assert_eq!(regions[0].base(), Address::zero());
        for pair in regions.windows(2) {
            assert_eq!(pair[0].end(), Some(pair[1].base()));
        }
        assert_eq!(regions.last().unwrap().end(), None);
    }

    #[test]
    fn test_allocation_appears_exactly_once() {
        let process = populated();
        let alloc = RemoteAllocator::acquire(&process, 4096).unwrap();
        let base = alloc.base().unwrap();
        let matches: Vec<_> = walk(&process).into_iter().filter(|r| r.base() == base).collect();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].is_committed());
        assert_eq!(matches[0].protection(), Protection::READ_WRITE_EXECUTE);
        assert_eq!(matches[0].size(), PAGE_SIZE);
    }

    #[test]
    fn test_every_region_matches_a_fresh_query() {
        let process = populated();
        for region in walk(&process) {
            let again = query(&process, region.base()).unwrap();
            assert_eq!(region, again);
        }
    }

    #[test]
    fn test_cursor_equality_and_sentinel() {
        let process = populated();
        let list = RegionList::new(&process);
        let first = list.begin().unwrap();
        let copy = first;
        assert_eq!(first, copy);
        assert_ne!(first, list.end());
        assert_eq!(list.end(), RegionCursor::end(&process));
        assert_eq!(first.current().unwrap().base(), Address::zero());

        let second = first.advance().unwrap();
        assert_ne!(first, second);
        assert_eq!(second.current().unwrap().base(), first.current().unwrap().end().unwrap());
        // advancing the copy does not move the original
        assert_eq!(first, copy);
    }

    #[test]
    fn test_cursor_loop_reaches_end() {
        let process = populated();
        let list = RegionList::new(&process);
        let mut cursor = list.begin().unwrap();
        let mut steps = 0;
        while cursor != list.end() {
            cursor = cursor.advance().unwrap();
            steps += 1;
        }
        assert_eq!(steps, walk(&process).len());
        assert!(cursor.advance().unwrap().is_end());
    }

    #[test]
    fn test_clones_walk_independently() {
        let process = populated();
        let mut a = enumerate(&process);
        a.next().unwrap().unwrap();
        let b = a.clone();
        let rest_a: Vec<_> = a.map(|r| r.unwrap()).collect();
        let rest_b: Vec<_> = b.map(|r| r.unwrap()).collect();
        assert_eq!(rest_a, rest_b);
        assert!(!rest_a.is_empty());
    }

    #[test]
    fn test_clones_walk_on_separate_threads() {
        fn assert_send<T: Send>(_: &T) {}

        let process = populated();
        let mut walker = enumerate(&process);
        walker.next().unwrap().unwrap();
        let other = walker.clone();
        assert_send(&walker);

        let spans = |it: RegionEnumerator<'_, SimulatedProcess>| {
            it.map(|r| r.map(|r| (r.base(), r.size())))
                .collect::<Result<Vec<_>, _>>()
                .unwrap()
        };
        let (left, right) = std::thread::scope(|s| {
            let left = s.spawn(|| spans(walker));
            let right = s.spawn(|| spans(other));
            (left.join().unwrap(), right.join().unwrap())
        });

        assert_eq!(left, right);
        assert!(!left.is_empty());
        for pair in left.windows(2) {
            assert_eq!(pair[0].0.checked_add(pair[0].1), Some(pair[1].0));
        }
    }

    #[test]
    fn test_region_list_is_restartable() {
        let process = populated();
        let list = RegionList::new(&process);
        let first: Vec<_> = list.iter().map(|r| r.unwrap()).collect();
        let second: Vec<_> = (&list).into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_walk_is_lazy() {
        let process = populated();
        let mut regions = enumerate(&process);
        assert_eq!(process.query_count(), 0);
        regions.next();
        regions.next();
        assert_eq!(process.query_count(), 2);
    }

    #[test]
    fn test_failure_mid_walk_is_not_end() {
        let process = populated();
        process.fail_queries_after(2, libc::ESRCH);
        let items: Vec<_> = enumerate(&process).collect();
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok() && items[1].is_ok());
        let err = items[2].as_ref().unwrap_err();
        assert!(matches!(err, MemoryError::QueryFailed(_)));
        assert_eq!(err.code(), Some(libc::ESRCH));
    }

    #[test]
    fn test_cursor_advance_surfaces_failure() {
        let process = populated();
        let cursor = RegionCursor::begin(&process).unwrap();
        process.fail_queries(libc::EACCES);
        assert!(matches!(cursor.advance(), Err(MemoryError::QueryFailed(_))));
        process.heal();
        assert!(cursor.advance().is_ok());
    }

    #[test]
    fn test_walk_sees_changes_made_during_the_walk() {
        let process = populated();
        let mut regions = enumerate(&process);
        regions.next().unwrap().unwrap();
        process.unmap(Address::new(0x100_0000));
        let rest: Vec<_> = regions.map(|r| r.unwrap()).collect();
        assert!(rest.iter().all(|r| r.state() != RegionState::Reserved));
    }

    #[test]
    fn test_region_overlapping_the_cursor_is_clipped() {
        let process = SimulatedProcess::new();
        process.map(Address::new(0x10000), 0x2000, Protection::READ, RegionType::Private);
        let mut cursor = RegionCursor::begin(&process).unwrap();
        cursor = cursor.advance().unwrap();
        assert_eq!(cursor.current().unwrap().base(), Address::new(0x10000));

        process.map(Address::new(0x11000), 0x3000, Protection::READ_WRITE, RegionType::Private);
        let next = cursor.advance().unwrap();
        let region = next.current().unwrap();
        assert_eq!(region.base(), Address::new(0x12000));
        assert_eq!(region.size(), 0x2000);
    }

    struct SparseProcess {
        mappings: Vec<(u64, u64)>,
    }

    impl ForeignProcess for SparseProcess {
        fn pid(&self) -> u32 {
            7
        }

        fn raw_handle(&self) -> RawHandle {
            7
        }
    }

    impl VirtualMemory for SparseProcess {
        fn allocate(&self, _size: u64) -> Result<Address, SysError> {
            Err(SysError::errno("allocate", libc::EOPNOTSUPP))
        }

        fn free(&self, _base: Address, _size: u64) -> Result<(), SysError> {
            Err(SysError::errno("free", libc::EOPNOTSUPP))
        }

        // Reports the next mapping at or after the address, skipping gaps.
        fn query_region(&self, address: Address) -> Result<RegionDescriptor, SysError> {
            let found = self
                .mappings
                .iter()
                .find(|(base, size)| base + size > address.as_u64())
                .map(|&(base, size)| {
                    RegionDescriptor::mapped(
                        Address::new(base),
                        size,
                        Protection::READ,
                        RegionState::Committed,
                        RegionType::Private,
                    )
                });
            Ok(found.unwrap_or_else(|| RegionDescriptor::free_gap(address, None, 0x1000)))
        }
    }

    #[test]
    fn test_gaps_skipped_by_the_primitive_are_filled() {
        let process = SparseProcess { mappings: vec![(0x1000, 0x1000), (0x8000, 0x2000)] };
        let regions: Vec<_> = enumerate(&process).map(|r| r.unwrap()).collect();
        let bases: Vec<_> = regions.iter().map(|r| r.base().as_u64()).collect();
        assert_eq!(bases, vec![0, 0x1000, 0x2000, 0x8000, 0xa000]);
        assert!(regions[0].is_free());
        assert!(regions[2].is_free());
        assert_eq!(regions[2].size(), 0x6000);
    }

    struct ZeroSizeProcess;

    impl ForeignProcess for ZeroSizeProcess {
        fn pid(&self) -> u32 {
            8
        }

        fn raw_handle(&self) -> RawHandle {
            8
        }
    }

    impl VirtualMemory for ZeroSizeProcess {
        fn allocate(&self, _size: u64) -> Result<Address, SysError> {
            Err(SysError::errno("allocate", libc::EOPNOTSUPP))
        }

        fn free(&self, _base: Address, _size: u64) -> Result<(), SysError> {
            Err(SysError::errno("free", libc::EOPNOTSUPP))
        }

        fn query_region(&self, address: Address) -> Result<RegionDescriptor, SysError> {
            Ok(RegionDescriptor::free(address, 0))
        }
    }

    #[test]
    fn test_zero_sized_region_fails_instead_of_looping() {
        let mut regions = enumerate(&ZeroSizeProcess);
        let err = regions.next().unwrap().unwrap_err();
        assert_eq!(err.code(), Some(libc::EINVAL));
        assert!(regions.next().is_none());
    }

    #[test]
    fn test_enumerate_through_trait_object() {
        let process = populated();
        let dynamic: &dyn VirtualMemory = &process;
        let count = enumerate(dynamic).count();
        assert_eq!(count, walk(&process).len());
    }
}
