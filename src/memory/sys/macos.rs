// Fri Oct 16 2026 - Alex

#![allow(non_camel_case_types)]

use crate::memory::{
    Address, ForeignProcess, MemoryError, Protection, RawHandle, RegionDescriptor, RegionState, RegionType, SysError,
    VirtualMemory,
};
use crate::utils::page_size;
use libc::{c_int, c_uint, pid_t};

type mach_port_t = c_uint;
type kern_return_t = c_int;
type mach_vm_address_t = u64;
type mach_vm_size_t = u64;
type vm_prot_t = c_int;
type vm_region_flavor_t = c_int;
type vm_region_info_t = *mut c_int;
type boolean_t = c_uint;

const KERN_SUCCESS: kern_return_t = 0;
const KERN_INVALID_ADDRESS: kern_return_t = 1;
const VM_FLAGS_ANYWHERE: c_int = 1;
const VM_PROT_ALL: vm_prot_t = 7;
const VM_REGION_BASIC_INFO_64: vm_region_flavor_t = 9;
const VM_REGION_BASIC_INFO_COUNT_64: u32 = 9;

#[repr(C, packed(4))]
#[derive(Debug, Clone, Copy, Default)]
struct vm_region_basic_info_64 {
    protection: vm_prot_t,
    max_protection: vm_prot_t,
    inheritance: c_uint,
    shared: boolean_t,
    reserved: boolean_t,
    offset: u64,
    behavior: c_int,
    user_wired_count: u16,
}

extern "C" {
    fn mach_task_self() -> mach_port_t;
    fn task_for_pid(target_task: mach_port_t, pid: c_int, task: *mut mach_port_t) -> kern_return_t;
    fn mach_port_deallocate(task: mach_port_t, name: mach_port_t) -> kern_return_t;
    fn mach_vm_allocate(
        target_task: mach_port_t,
        address: *mut mach_vm_address_t,
        size: mach_vm_size_t,
        flags: c_int,
    ) -> kern_return_t;
    fn mach_vm_protect(
        target_task: mach_port_t,
        address: mach_vm_address_t,
        size: mach_vm_size_t,
        set_maximum: boolean_t,
        new_protection: vm_prot_t,
    ) -> kern_return_t;
    fn mach_vm_deallocate(target_task: mach_port_t, address: mach_vm_address_t, size: mach_vm_size_t) -> kern_return_t;
    fn mach_vm_region(
        target_task: mach_port_t,
        address: *mut mach_vm_address_t,
        size: *mut mach_vm_size_t,
        flavor: vm_region_flavor_t,
        info: vm_region_info_t,
        info_count: *mut u32,
        object_name: *mut mach_port_t,
    ) -> kern_return_t;
}

/// A process addressed through its Mach task port. Attaching to anything but
/// the calling process needs root or the debugger entitlement.
pub struct Process {
    pid: u32,
    task: mach_port_t,
    owns_port: bool,
}

impl Process {
    pub fn open(pid: u32) -> Result<Self, MemoryError> {
        if pid == std::process::id() {
            return Ok(Self::current());
        }
        let mut task: mach_port_t = 0;
        let result = unsafe { task_for_pid(mach_task_self(), pid as pid_t, &mut task) };
        if result != KERN_SUCCESS {
            log::warn!("task_for_pid({}) returned {}; root privileges may be required", pid, result);
            return Err(MemoryError::ProcessNotFound(pid));
        }
        Ok(Self { pid, task, owns_port: true })
    }

    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            task: unsafe { mach_task_self() },
            owns_port: false,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn task(&self) -> mach_port_t {
        self.task
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        if self.owns_port {
            let result = unsafe { mach_port_deallocate(mach_task_self(), self.task) };
            if result != KERN_SUCCESS {
                log::warn!("mach_port_deallocate for pid {} returned {}", self.pid, result);
            }
        }
    }
}

impl ForeignProcess for Process {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn raw_handle(&self) -> RawHandle {
        self.task as RawHandle
    }
}

impl VirtualMemory for Process {
    fn allocate(&self, size: u64) -> Result<Address, SysError> {
        let mut address: mach_vm_address_t = 0;
        let result = unsafe { mach_vm_allocate(self.task, &mut address, size, VM_FLAGS_ANYWHERE) };
        if result != KERN_SUCCESS {
            return Err(SysError::kern("mach_vm_allocate", result));
        }

        let result = unsafe { mach_vm_protect(self.task, address, size, 0, VM_PROT_ALL) };
        if result != KERN_SUCCESS {
            let cleanup = unsafe { mach_vm_deallocate(self.task, address, size) };
            if cleanup != KERN_SUCCESS {
                log::warn!(
                    "pid {}: mach_vm_deallocate of 0x{:x} after failed protect returned {}",
                    self.pid,
                    address,
                    cleanup
                );
            }
            return Err(SysError::kern("mach_vm_protect", result));
        }

        Ok(Address::new(address))
    }

    fn free(&self, base: Address, size: u64) -> Result<(), SysError> {
        let result = unsafe { mach_vm_deallocate(self.task, base.as_u64(), size) };
        if result != KERN_SUCCESS {
            return Err(SysError::kern("mach_vm_deallocate", result));
        }
        Ok(())
    }

    // mach_vm_region reports the first mapping at or above the address and
    // says nothing about the gap before it, so gaps are synthesized here.
    fn query_region(&self, address: Address) -> Result<RegionDescriptor, SysError> {
        let mut start: mach_vm_address_t = address.as_u64();
        let mut size: mach_vm_size_t = 0;
        let mut info: vm_region_basic_info_64 = Default::default();
        let mut info_count: u32 = VM_REGION_BASIC_INFO_COUNT_64;
        let mut object_name: mach_port_t = 0;

        let result = unsafe {
            mach_vm_region(
                self.task,
                &mut start,
                &mut size,
                VM_REGION_BASIC_INFO_64,
                &mut info as *mut _ as vm_region_info_t,
                &mut info_count,
                &mut object_name,
            )
        };

        match result {
            KERN_SUCCESS => {}
            KERN_INVALID_ADDRESS => return Ok(RegionDescriptor::free_gap(address, None, page_size())),
            code => return Err(SysError::kern("mach_vm_region", code)),
        }

        if start > address.as_u64() {
            return Ok(RegionDescriptor::free_gap(address, Some(Address::new(start)), page_size()));
        }

        let protection = Protection::from_flags(info.protection as u32);
        let state = if info.protection == 0 { RegionState::Reserved } else { RegionState::Committed };
        let kind = if info.shared != 0 { RegionType::Mapped } else { RegionType::Private };
        Ok(RegionDescriptor::mapped(Address::new(start), size, protection, state, kind)
            .with_allocation(Address::new(start), Protection::from_flags(info.max_protection as u32)))
    }
}
