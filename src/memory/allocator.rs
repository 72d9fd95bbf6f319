// Fri Oct 16 2026 - Alex

use crate::memory::{Address, MemoryError, SysError, VirtualMemory};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A release that failed while an allocator was being dropped. The foreign
/// memory it describes may have leaked.
#[derive(Debug)]
pub struct ReleaseFailure {
    pub pid: u32,
    pub base: Address,
    pub size: u64,
    pub error: MemoryError,
}

type ReleaseFailureHook = Arc<dyn Fn(&ReleaseFailure) + Send + Sync>;

static RELEASE_FAILURE_HOOK: Lazy<RwLock<Option<ReleaseFailureHook>>> = Lazy::new(|| RwLock::new(None));

/// Installs a process-wide observer for drop-time release failures. Replaces
/// any previous hook. Failures are logged whether or not a hook is set.
pub fn set_release_failure_hook<F>(hook: F)
where
    F: Fn(&ReleaseFailure) + Send + Sync + 'static,
{
    *RELEASE_FAILURE_HOOK.write() = Some(Arc::new(hook));
}

pub fn clear_release_failure_hook() {
    *RELEASE_FAILURE_HOOK.write() = None;
}

struct Allocation<'p, P: VirtualMemory + ?Sized> {
    process: &'p P,
    base: Address,
    size: u64,
}

/// Exclusive owner of one RWX allocation inside a foreign process.
///
/// The allocation is released exactly once: by [`RemoteAllocator::release`],
/// or on drop. A failed release still leaves the allocator empty, so the same
/// base is never freed twice.
pub struct RemoteAllocator<'p, P: VirtualMemory + ?Sized> {
    inner: Option<Allocation<'p, P>>,
}

impl<'p, P: VirtualMemory + ?Sized> RemoteAllocator<'p, P> {
    /// An allocator that owns nothing.
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn acquire(process: &'p P, size: u64) -> Result<Self, MemoryError> {
        if size == 0 {
            return Err(MemoryError::AllocationFailed(SysError::errno("allocate", libc::EINVAL)));
        }
        let base = process.allocate(size).map_err(MemoryError::AllocationFailed)?;
        log::debug!("pid {}: allocated {} bytes at {}", process.pid(), size, base);
        Ok(Self {
            inner: Some(Allocation { process, base, size }),
        })
    }

    /// Frees the owned allocation. A no-op on an empty allocator.
    pub fn release(&mut self) -> Result<(), MemoryError> {
        let Some(allocation) = self.inner.take() else {
            return Ok(());
        };
        allocation
            .process
            .free(allocation.base, allocation.size)
            .map_err(MemoryError::DeallocationFailed)?;
        log::debug!(
            "pid {}: released {} bytes at {}",
            allocation.process.pid(),
            allocation.size,
            allocation.base
        );
        Ok(())
    }

    /// Moves the allocation out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        Self { inner: self.inner.take() }
    }

    /// Releases the current allocation, then takes ownership of `other`'s.
    ///
    /// `other` is adopted even when the release fails; the error then refers
    /// to the previous allocation, which may have leaked.
    pub fn adopt(&mut self, mut other: Self) -> Result<(), MemoryError> {
        let released = self.release();
        self.inner = other.inner.take();
        released
    }

    pub fn base(&self) -> Option<Address> {
        self.inner.as_ref().map(|a| a.base)
    }

    /// The requested size, not the platform-rounded one.
    pub fn size(&self) -> Option<u64> {
        self.inner.as_ref().map(|a| a.size)
    }

    pub fn process(&self) -> Option<&'p P> {
        self.inner.as_ref().map(|a| a.process)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    pub fn owns_memory(&self) -> bool {
        self.inner.is_some()
    }

    fn release_unchecked(&mut self) {
        let Some(allocation) = self.inner.as_ref() else {
            return;
        };
        let (pid, base, size) = (allocation.process.pid(), allocation.base, allocation.size);
        if let Err(error) = self.release() {
            log::error!("pid {}: leaking {} bytes at {}: {}", pid, size, base, error);
            let failure = ReleaseFailure { pid, base, size, error };
            // The guard is dropped before the call so a hook may replace itself.
            let hook = RELEASE_FAILURE_HOOK.read().clone();
            if let Some(hook) = hook {
                hook(&failure);
            }
        }
        debug_assert!(self.inner.is_none());
    }
}

impl<'p, P: VirtualMemory + ?Sized> Drop for RemoteAllocator<'p, P> {
    fn drop(&mut self) {
        self.release_unchecked();
    }
}

impl<'p, P: VirtualMemory + ?Sized> Default for RemoteAllocator<'p, P> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'p, P: VirtualMemory + ?Sized> PartialEq for RemoteAllocator<'p, P> {
    fn eq(&self, other: &Self) -> bool {
        self.base() == other.base()
    }
}

impl<'p, P: VirtualMemory + ?Sized> Eq for RemoteAllocator<'p, P> {}

impl<'p, P: VirtualMemory + ?Sized> PartialOrd for RemoteAllocator<'p, P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'p, P: VirtualMemory + ?Sized> Ord for RemoteAllocator<'p, P> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base().cmp(&other.base())
    }
}

impl<'p, P: VirtualMemory + ?Sized> fmt::Debug for RemoteAllocator<'p, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(a) => f
                .debug_struct("RemoteAllocator")
                .field("pid", &a.process.pid())
                .field("base", &a.base)
                .field("size", &a.size)
                .finish(),
            None => f.write_str("RemoteAllocator(empty)"),
        }
    }
}

impl<'p, P: VirtualMemory + ?Sized> fmt::Display for RemoteAllocator<'p, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.base() {
            Some(base) => write!(f, "{}", base),
            None => write!(f, "{}", Address::zero()),
        }
    }
}
