// Fri Oct 16 2026 - Alex

use crate::memory::{
    Address, ForeignProcess, Protection, RawHandle, RegionDescriptor, RegionState, RegionType, SysError, VirtualMemory,
};
use crate::utils::align_up;
use parking_lot::Mutex;
use std::collections::BTreeMap;

pub const PAGE_SIZE: u64 = 0x1000;
pub const GRANULARITY: u64 = 0x10000;
const LOWEST_ALLOCATION: u64 = 0x10000;

#[derive(Debug, Clone, Copy)]
struct SimRegion {
    size: u64,
    protection: Protection,
    state: RegionState,
    kind: RegionType,
    allocated: bool,
}

#[derive(Default)]
struct SimState {
    regions: BTreeMap<u64, SimRegion>,
    alloc_failure: Option<i32>,
    free_failure: Option<i32>,
    query_failure: Option<i32>,
    queries_until_failure: Option<usize>,
    queries: usize,
    frees: Vec<(Address, u64)>,
}

/// In-memory address space standing in for a foreign process.
pub struct SimulatedProcess {
    pid: u32,
    state: Mutex<SimState>,
}

impl SimulatedProcess {
    pub fn new() -> Self {
        Self::with_pid(4242)
    }

    pub fn with_pid(pid: u32) -> Self {
        Self {
            pid,
            state: Mutex::new(SimState::default()),
        }
    }

    pub fn map(&self, base: Address, size: u64, protection: Protection, kind: RegionType) -> Address {
        self.map_with_state(base, size, protection, RegionState::Committed, kind)
    }

    pub fn map_with_state(
        &self,
        base: Address,
        size: u64,
        protection: Protection,
        state: RegionState,
        kind: RegionType,
    ) -> Address {
        let region = SimRegion {
            size: align_up(size, PAGE_SIZE),
            protection,
            state,
            kind,
            allocated: false,
        };
        self.state.lock().regions.insert(base.as_u64(), region);
        base
    }

    pub fn unmap(&self, base: Address) {
        self.state.lock().regions.remove(&base.as_u64());
    }

    pub fn fail_allocations(&self, code: i32) {
        self.state.lock().alloc_failure = Some(code);
    }

    pub fn fail_frees(&self, code: i32) {
        self.state.lock().free_failure = Some(code);
    }

    pub fn fail_queries(&self, code: i32) {
        self.state.lock().query_failure = Some(code);
    }

    /// Lets `count` more queries succeed, then fails every later one.
    pub fn fail_queries_after(&self, count: usize, code: i32) {
        let mut state = self.state.lock();
        state.queries_until_failure = Some(count);
        state.query_failure = Some(code);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.alloc_failure = None;
        state.free_failure = None;
        state.query_failure = None;
        state.queries_until_failure = None;
    }

    /// Every free attempt, failed or not.
    pub fn frees(&self) -> Vec<(Address, u64)> {
        self.state.lock().frees.clone()
    }

    pub fn free_count(&self) -> usize {
        self.state.lock().frees.len()
    }

    pub fn query_count(&self) -> usize {
        self.state.lock().queries
    }

    pub fn is_allocated(&self, base: Address) -> bool {
        self.state
            .lock()
            .regions
            .get(&base.as_u64())
            .map(|r| r.allocated)
            .unwrap_or(false)
    }
}

impl ForeignProcess for SimulatedProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn raw_handle(&self) -> RawHandle {
        self.pid as RawHandle
    }
}

impl VirtualMemory for SimulatedProcess {
    fn allocate(&self, size: u64) -> Result<Address, SysError> {
        let mut state = self.state.lock();
        if let Some(code) = state.alloc_failure {
            return Err(SysError::errno("simulated allocate", code));
        }
        if size == 0 {
            return Err(SysError::errno("simulated allocate", libc::EINVAL));
        }
        let rounded = align_up(size, PAGE_SIZE);
        let mut candidate = LOWEST_ALLOCATION;
        for (&base, region) in state.regions.range(..) {
            if candidate + rounded <= base {
                break;
            }
            candidate = candidate.max(align_up(base + region.size, GRANULARITY));
        }
        state.regions.insert(
            candidate,
            SimRegion {
                size: rounded,
                protection: Protection::READ_WRITE_EXECUTE,
                state: RegionState::Committed,
                kind: RegionType::Private,
                allocated: true,
            },
        );
        Ok(Address::new(candidate))
    }

    fn free(&self, base: Address, size: u64) -> Result<(), SysError> {
        let mut state = self.state.lock();
        state.frees.push((base, size));
        if let Some(code) = state.free_failure {
            return Err(SysError::errno("simulated free", code));
        }
        let owned = state.regions.get(&base.as_u64()).map(|r| r.allocated).unwrap_or(false);
        if !owned {
            return Err(SysError::errno("simulated free", libc::EINVAL));
        }
        state.regions.remove(&base.as_u64());
        Ok(())
    }

    fn query_region(&self, address: Address) -> Result<RegionDescriptor, SysError> {
        let mut state = self.state.lock();
        let remaining = state.queries_until_failure;
        match remaining {
            Some(0) => {}
            Some(n) => {
                state.queries_until_failure = Some(n - 1);
                state.queries += 1;
                return Ok(Self::describe(&state, address));
            }
            None => {}
        }
        if let Some(code) = state.query_failure {
            return Err(SysError::errno("simulated query", code));
        }
        state.queries += 1;
        Ok(Self::describe(&state, address))
    }
}

impl SimulatedProcess {
    fn describe(state: &SimState, address: Address) -> RegionDescriptor {
        let addr = address.as_u64();
        if let Some((&base, region)) = state.regions.range(..=addr).next_back() {
            if addr - base < region.size {
                return RegionDescriptor::mapped(Address::new(base), region.size, region.protection, region.state, region.kind);
            }
        }
        let next = addr
            .checked_add(1)
            .and_then(|from| state.regions.range(from..).next())
            .map(|(&base, _)| Address::new(base));
        RegionDescriptor::free_gap(address, next, PAGE_SIZE)
    }
}
