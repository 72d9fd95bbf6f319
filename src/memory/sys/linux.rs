// Fri Oct 16 2026 - Alex

use crate::memory::maps::{self, MapEntry};
use crate::memory::{Address, ForeignProcess, MemoryError, RawHandle, RegionDescriptor, SysError, VirtualMemory};
use crate::utils::page_size;
use libc::c_void;
use std::fs;
use std::path::Path;

/// A process addressed through procfs.
///
/// Region queries work for any process whose maps the caller may read.
/// Linux cannot map memory into another process without running code in it,
/// so allocation only works when the target is the calling process.
#[derive(Debug, Clone)]
pub struct Process {
    pid: u32,
}

impl Process {
    pub fn open(pid: u32) -> Result<Self, MemoryError> {
        if !Path::new(&format!("/proc/{}", pid)).exists() {
            return Err(MemoryError::ProcessNotFound(pid));
        }
        Ok(Self { pid })
    }

    pub fn current() -> Self {
        Self { pid: std::process::id() }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    fn is_current(&self) -> bool {
        self.pid == std::process::id()
    }

    fn read_maps(&self) -> Result<Vec<MapEntry>, SysError> {
        let path = format!("/proc/{}/maps", self.pid);
        let content = fs::read_to_string(&path).map_err(|e| SysError::from_io("read /proc/<pid>/maps", &e))?;
        Ok(maps::parse_maps_content(&content))
    }
}

/// Page-rounded `size` plus one guard page on each side.
fn guarded_span(operation: &'static str, size: u64, page: u64) -> Result<usize, SysError> {
    size.checked_add(page - 1)
        .map(|s| s & !(page - 1))
        .and_then(|s| s.checked_add(2 * page))
        .and_then(|s| usize::try_from(s).ok())
        .ok_or_else(|| SysError::errno(operation, libc::EINVAL))
}

impl ForeignProcess for Process {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn raw_handle(&self) -> RawHandle {
        self.pid as RawHandle
    }
}

impl VirtualMemory for Process {
    // Each allocation sits between two PROT_NONE guard pages so the kernel
    // never merges it into a neighbouring anonymous mapping.
    fn allocate(&self, size: u64) -> Result<Address, SysError> {
        if !self.is_current() {
            return Err(SysError::errno("mmap", libc::EOPNOTSUPP));
        }
        let page = page_size();
        let span = guarded_span("mmap", size, page)?;
        let reserved = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                span,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if reserved == libc::MAP_FAILED {
            return Err(SysError::last_os_error("mmap"));
        }

        let base = reserved as usize + page as usize;
        let len = span - 2 * page as usize;
        let result = unsafe {
            libc::mprotect(
                base as *mut c_void,
                len,
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
            )
        };
        if result != 0 {
            let err = SysError::last_os_error("mprotect");
            if unsafe { libc::munmap(reserved, span) } != 0 {
                log::warn!("munmap of {:p} after failed mprotect: {}", reserved, SysError::last_os_error("munmap"));
            }
            return Err(err);
        }
        Ok(Address::new(base as u64))
    }

    fn free(&self, base: Address, size: u64) -> Result<(), SysError> {
        if !self.is_current() {
            return Err(SysError::errno("munmap", libc::EOPNOTSUPP));
        }
        let page = page_size();
        let span = guarded_span("munmap", size, page)?;
        let start = base
            .as_u64()
            .checked_sub(page)
            .ok_or_else(|| SysError::errno("munmap", libc::EINVAL))?;
        let result = unsafe { libc::munmap(start as usize as *mut c_void, span) };
        if result != 0 {
            return Err(SysError::last_os_error("munmap"));
        }
        Ok(())
    }

    fn query_region(&self, address: Address) -> Result<RegionDescriptor, SysError> {
        let entries = self.read_maps()?;
        Ok(maps::describe(&entries, address, page_size()))
    }
}
