// Fri Oct 16 2026 - Alex

pub mod address;
pub mod allocator;
pub mod enumerator;
pub mod error;
pub mod maps;
pub mod protection;
pub mod region;
pub mod sys;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use address::Address;
pub use allocator::{clear_release_failure_hook, set_release_failure_hook, ReleaseFailure, RemoteAllocator};
pub use enumerator::{enumerate, RegionCursor, RegionEnumerator, RegionList};
pub use error::{CodeDomain, MemoryError, SysError};
pub use protection::Protection;
pub use region::{query, RegionDescriptor, RegionState, RegionType};
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub use sys::Process;
pub use traits::{ForeignProcess, RawHandle, VirtualMemory};
