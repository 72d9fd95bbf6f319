// Fri Oct 16 2026 - Alex

use crate::memory::{Address, RegionDescriptor, SysError};

/// Opaque platform handle: a Mach task port on macOS, the pid on Linux.
pub type RawHandle = u64;

/// A process other than (or possibly the same as) the caller, as seen by the
/// memory layer. Implementors are borrowed, never owned or closed here.
pub trait ForeignProcess {
    fn pid(&self) -> u32;

    fn raw_handle(&self) -> RawHandle;

    fn is_same_process(&self, other: &dyn ForeignProcess) -> bool {
        self.pid() == other.pid()
    }
}

/// Raw virtual memory primitives of a foreign process. None of these retry.
pub trait VirtualMemory: ForeignProcess {
    /// Reserves and commits `size` bytes readable, writable and executable.
    fn allocate(&self, size: u64) -> Result<Address, SysError>;

    /// Releases an allocation previously returned by [`VirtualMemory::allocate`].
    fn free(&self, base: Address, size: u64) -> Result<(), SysError>;

    /// Describes the region containing `address`. Unmapped addresses yield a
    /// free region; only handle-level problems are errors.
    fn query_region(&self, address: Address) -> Result<RegionDescriptor, SysError>;
}
