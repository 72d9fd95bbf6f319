// Fri Oct 16 2026 - Alex

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Sub;

/// A virtual address in the target process. Never dereferenced locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address {
    value: u64,
}

impl Address {
    pub const fn new(value: u64) -> Self {
        Self { value }
    }

    pub const fn zero() -> Self {
        Self { value: 0 }
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self { value: ptr as usize as u64 }
    }

    pub const fn as_u64(&self) -> u64 {
        self.value
    }

    pub fn align_down(&self, alignment: u64) -> Self {
        Self { value: crate::utils::align_down(self.value, alignment) }
    }

    /// `None` when `self + size` does not fit in 64 bits.
    pub fn checked_add(&self, size: u64) -> Option<Self> {
        self.value.checked_add(size).map(Self::new)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.value)
    }
}

/// Distance in bytes. `rhs` must not be above `self`.
impl Sub<Address> for Address {
    type Output = u64;
    fn sub(self, rhs: Address) -> Self::Output {
        self.value - rhs.value
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Address> for u64 {
    fn from(addr: Address) -> Self {
        addr.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add_detects_top_of_address_space() {
        assert_eq!(Address::new(0x1000).checked_add(0x1000), Some(Address::new(0x2000)));
        assert_eq!(Address::new(u64::MAX - 0xfff).checked_add(0x1000), None);
    }

    #[test]
    fn test_align_down() {
        assert_eq!(Address::new(0x1234).align_down(0x1000), Address::new(0x1000));
        assert_eq!(Address::new(0x2000).align_down(0x1000), Address::new(0x2000));
    }

    #[test]
    fn test_display() {
        assert_eq!(Address::new(0xdead).to_string(), "0x000000000000dead");
    }
}
