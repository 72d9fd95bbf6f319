// Fri Oct 16 2026 - Alex

//! `/proc/<pid>/maps` parsing and region classification.
//!
//! Line format:
//! address           perms offset  dev   inode   pathname
//! 00400000-00452000 r-xp 00000000 08:02 173521  /usr/bin/ls

use crate::memory::{Address, Protection, RegionDescriptor, RegionState, RegionType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub start: u64,
    pub end: u64,
    pub protection: Protection,
    pub shared: bool,
    pub offset: u64,
    pub device: (u32, u32),
    pub inode: u64,
    pub pathname: String,
}

impl MapEntry {
    pub fn size(&self) -> u64 {
        self.end - self.start
    }

    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn is_file_backed(&self) -> bool {
        self.inode != 0
    }

    fn same_file(&self, other: &Self) -> bool {
        self.is_file_backed() && self.device == other.device && self.inode == other.inode
    }
}

/// Parses maps content; malformed lines are skipped.
pub fn parse_maps_content(content: &str) -> Vec<MapEntry> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_map_line)
        .collect()
}

fn parse_map_line(line: &str) -> Option<MapEntry> {
    let mut parts = line.split_whitespace();

    let (start_str, end_str) = parts.next()?.split_once('-')?;
    let start = u64::from_str_radix(start_str, 16).ok()?;
    let end = u64::from_str_radix(end_str, 16).ok()?;
    if end <= start {
        return None;
    }

    let perms = parts.next()?;
    let protection = Protection::from_perms(perms);
    let shared = perms.as_bytes().get(3) == Some(&b's');

    let offset = u64::from_str_radix(parts.next()?, 16).ok()?;
    let device = parse_device(parts.next()?).unwrap_or((0, 0));
    let inode = parts.next()?.parse::<u64>().unwrap_or(0);
    let pathname = parts.collect::<Vec<_>>().join(" ");

    Some(MapEntry {
        start,
        end,
        protection,
        shared,
        offset,
        device,
        inode,
        pathname,
    })
}

fn parse_device(s: &str) -> Option<(u32, u32)> {
    let (major, minor) = s.split_once(':')?;
    let major = u32::from_str_radix(major, 16).ok()?;
    let minor = u32::from_str_radix(minor, 16).ok()?;
    Some((major, minor))
}

/// Describes `address` against a sorted list of mappings.
pub fn describe(entries: &[MapEntry], address: Address, page_size: u64) -> RegionDescriptor {
    let addr = address.as_u64();
    let Some(index) = entries.iter().position(|e| e.contains(addr)) else {
        let next = entries.iter().find(|e| e.start > addr).map(|e| Address::new(e.start));
        return RegionDescriptor::free_gap(address, next, page_size);
    };

    let entry = &entries[index];
    let group = &entries[allocation_group_start(entries, index)];
    RegionDescriptor::mapped(
        Address::new(entry.start),
        entry.size(),
        entry.protection,
        classify_state(entry),
        classify_type(entries, entry),
    )
    .with_allocation(Address::new(group.start), group.protection)
}

// Private anonymous PROT_NONE ranges are address space held back without
// backing, the closest Linux has to a reservation.
fn classify_state(entry: &MapEntry) -> RegionState {
    if entry.protection == Protection::NO_ACCESS && !entry.shared && !entry.is_file_backed() {
        RegionState::Reserved
    } else {
        RegionState::Committed
    }
}

fn classify_type(entries: &[MapEntry], entry: &MapEntry) -> RegionType {
    if entry.is_file_backed() {
        let executable = entries
            .iter()
            .any(|other| other.same_file(entry) && other.protection.can_execute());
        if executable {
            RegionType::Image
        } else {
            RegionType::Mapped
        }
    } else if entry.shared {
        RegionType::Mapped
    } else {
        RegionType::Private
    }
}

fn allocation_group_start(entries: &[MapEntry], index: usize) -> usize {
    let mut first = index;
    while first > 0 {
        let prev = &entries[first - 1];
        let cur = &entries[first];
        if prev.end != cur.start || !prev.same_file(cur) {
            break;
        }
        first -= 1;
    }
    first
}
