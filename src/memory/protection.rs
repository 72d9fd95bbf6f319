// Fri Oct 16 2026 - Alex

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Page protection of a region. The low three bits match `PROT_*` and
    /// `VM_PROT_*`; `NO_ACCESS` marks a mapped but inaccessible range so that
    /// only free regions carry an empty set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Protection: u32 {
        const READ = 0b0001;
        const WRITE = 0b0010;
        const EXECUTE = 0b0100;
        const NO_ACCESS = 0b1000;

        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
        const READ_EXECUTE = Self::READ.bits() | Self::EXECUTE.bits();
        const READ_WRITE_EXECUTE = Self::READ.bits() | Self::WRITE.bits() | Self::EXECUTE.bits();
    }
}

impl Protection {
    /// Converts raw `PROT_*`/`VM_PROT_*` bits of a mapped range.
    pub fn from_flags(flags: u32) -> Self {
        let access = Self::from_bits_truncate(flags & 7);
        if access.is_empty() {
            Self::NO_ACCESS
        } else {
            access
        }
    }

    /// Parses the `rwx` triple used by `/proc/<pid>/maps`.
    pub fn from_perms(perms: &str) -> Self {
        let bytes = perms.as_bytes();
        let mut flags = 0;
        if bytes.first() == Some(&b'r') {
            flags |= Self::READ.bits();
        }
        if bytes.get(1) == Some(&b'w') {
            flags |= Self::WRITE.bits();
        }
        if bytes.get(2) == Some(&b'x') {
            flags |= Self::EXECUTE.bits();
        }
        Self::from_flags(flags)
    }

    pub fn to_flags(self) -> u32 {
        (self & Self::READ_WRITE_EXECUTE).bits()
    }

    pub fn can_read(self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(self) -> bool {
        self.contains(Self::WRITE)
    }

    pub fn can_execute(self) -> bool {
        self.contains(Self::EXECUTE)
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.can_read() { 'r' } else { '-' },
            if self.can_write() { 'w' } else { '-' },
            if self.can_execute() { 'x' } else { '-' }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_perms() {
        assert_eq!(Protection::from_perms("r-xp"), Protection::READ_EXECUTE);
        assert_eq!(Protection::from_perms("rwxp"), Protection::READ_WRITE_EXECUTE);
        assert_eq!(Protection::from_perms("---p"), Protection::NO_ACCESS);
    }

    #[test]
    fn test_mapped_protection_is_never_empty() {
        assert!(!Protection::from_flags(0).is_empty());
        assert_eq!(Protection::from_flags(0).to_flags(), 0);
        assert_eq!(Protection::from_flags(7).to_flags(), 7);
    }

    #[test]
    fn test_display() {
        assert_eq!(Protection::READ_WRITE.to_string(), "rw-");
        assert_eq!(Protection::NO_ACCESS.to_string(), "---");
    }
}
