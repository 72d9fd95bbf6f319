// Fri Oct 16 2026 - Alex

pub mod config;
pub mod memory;
pub mod utils;

pub use config::{Config, ConfigError};
pub use memory::{enumerate, query, MemoryError, RegionDescriptor, RegionList, RemoteAllocator, VirtualMemory};
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub use memory::Process;
