// Fri Oct 16 2026 - Alex

use std::fmt;
use thiserror::Error;

/// Namespace a platform diagnostic code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeDomain {
    /// `errno` values from libc calls and procfs reads.
    Errno,
    /// Mach `kern_return_t` values.
    Kern,
}

/// A failed platform call: which call, and the code it reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysError {
    pub operation: &'static str,
    pub code: i32,
    pub domain: CodeDomain,
}

impl SysError {
    pub fn errno(operation: &'static str, code: i32) -> Self {
        Self { operation, code, domain: CodeDomain::Errno }
    }

    pub fn kern(operation: &'static str, code: i32) -> Self {
        Self { operation, code, domain: CodeDomain::Kern }
    }

    /// Captures `errno` as left by the last libc call on this thread.
    pub fn last_os_error(operation: &'static str) -> Self {
        let code = std::io::Error::last_os_error().raw_os_error().unwrap_or(0);
        Self::errno(operation, code)
    }

    pub fn from_io(operation: &'static str, err: &std::io::Error) -> Self {
        Self::errno(operation, err.raw_os_error().unwrap_or(libc::EIO))
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.domain {
            CodeDomain::Errno => write!(
                f,
                "{} failed: {} (errno {})",
                self.operation,
                std::io::Error::from_raw_os_error(self.code),
                self.code
            ),
            CodeDomain::Kern => write!(f, "{} failed: kern_return_t {}", self.operation, self.code),
        }
    }
}

impl std::error::Error for SysError {}

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Allocation failed: {0}")]
    AllocationFailed(SysError),
    #[error("Deallocation failed: {0}")]
    DeallocationFailed(SysError),
    #[error("Region query failed: {0}")]
    QueryFailed(SysError),
    #[error("Process not found: {0}")]
    ProcessNotFound(u32),
}

impl MemoryError {
    /// Platform diagnostic code carried by the error, if any.
    pub fn code(&self) -> Option<i32> {
        self.sys_error().map(|e| e.code)
    }

    pub fn sys_error(&self) -> Option<&SysError> {
        match self {
            Self::AllocationFailed(e) | Self::DeallocationFailed(e) | Self::QueryFailed(e) => Some(e),
            Self::ProcessNotFound(_) => None,
        }
    }
}
