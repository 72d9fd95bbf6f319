// Fri Oct 16 2026 - Alex

use crate::memory::{Address, MemoryError, Protection, VirtualMemory};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionState {
    Free,
    Reserved,
    Committed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionType {
    /// Anonymous memory owned by the process alone.
    Private,
    /// A file or shared mapping.
    Mapped,
    /// A mapped executable image.
    Image,
}

impl fmt::Display for RegionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => write!(f, "free"),
            Self::Reserved => write!(f, "reserved"),
            Self::Committed => write!(f, "committed"),
        }
    }
}

impl fmt::Display for RegionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::Mapped => write!(f, "mapped"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Snapshot of one region of a foreign address space at the moment it was
/// queried. Identity is the base address: equality, hashing and ordering
/// ignore every other field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegionDescriptor {
    base: Address,
    size: u64,
    protection: Protection,
    state: RegionState,
    kind: Option<RegionType>,
    allocation_base: Option<Address>,
    allocation_protection: Protection,
}

impl RegionDescriptor {
    /// A mapped region. The allocation group defaults to the region itself.
    pub fn mapped(base: Address, size: u64, protection: Protection, state: RegionState, kind: RegionType) -> Self {
        debug_assert!(state != RegionState::Free);
        Self {
            base,
            size,
            protection,
            state,
            kind: Some(kind),
            allocation_base: Some(base),
            allocation_protection: protection,
        }
    }

    pub fn free(base: Address, size: u64) -> Self {
        Self {
            base,
            size,
            protection: Protection::empty(),
            state: RegionState::Free,
            kind: None,
            allocation_base: None,
            allocation_protection: Protection::empty(),
        }
    }

    /// The unmapped gap that holds `address`: starts at `address` rounded
    /// down to `page_size` and runs to `next_mapped`, or to the top of the
    /// 64-bit space when nothing is mapped above.
    pub fn free_gap(address: Address, next_mapped: Option<Address>, page_size: u64) -> Self {
        let base = address.align_down(page_size);
        let size = match next_mapped {
            Some(next) => next - base,
            None => (u64::MAX - base.as_u64()).saturating_add(1),
        };
        Self::free(base, size)
    }

    pub fn with_allocation(mut self, allocation_base: Address, allocation_protection: Protection) -> Self {
        if self.state != RegionState::Free {
            self.allocation_base = Some(allocation_base);
            self.allocation_protection = allocation_protection;
        }
        self
    }

    /// The part of this region at or above `start`.
    pub(crate) fn clipped_from(mut self, start: Address) -> Self {
        if start > self.base {
            self.size = self.size.saturating_sub(start - self.base);
            self.base = start;
        }
        self
    }

    pub fn base(&self) -> Address {
        self.base
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// One past the last byte, or `None` at the top of the address space.
    pub fn end(&self) -> Option<Address> {
        self.base.checked_add(self.size)
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    pub fn kind(&self) -> Option<RegionType> {
        self.kind
    }

    pub fn allocation_base(&self) -> Option<Address> {
        self.allocation_base
    }

    pub fn allocation_protection(&self) -> Protection {
        self.allocation_protection
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.base && (addr - self.base) < self.size
    }

    pub fn is_free(&self) -> bool {
        self.state == RegionState::Free
    }

    pub fn is_committed(&self) -> bool {
        self.state == RegionState::Committed
    }

    pub fn is_readable(&self) -> bool {
        self.protection.can_read()
    }

    pub fn is_writable(&self) -> bool {
        self.protection.can_write()
    }

    pub fn is_executable(&self) -> bool {
        self.protection.can_execute()
    }
}

impl PartialEq for RegionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base
    }
}

impl Eq for RegionDescriptor {}

impl Hash for RegionDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.base.hash(state);
    }
}

impl PartialOrd for RegionDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RegionDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base.cmp(&other.base)
    }
}

impl fmt::Display for RegionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:>#14x} {} {}", self.base, self.size, self.protection, self.state)?;
        if let Some(kind) = self.kind {
            write!(f, " {}", kind)?;
        }
        Ok(())
    }
}

/// Describes the region containing `address`, or the free gap around it.
pub fn query<P: VirtualMemory + ?Sized>(process: &P, address: Address) -> Result<RegionDescriptor, MemoryError> {
    let region = process.query_region(address).map_err(MemoryError::QueryFailed)?;
    log::trace!("pid {}: region at {} -> {}", process.pid(), address, region);
    Ok(region)
}
