//! The Boot Services table (UEFI 2.10 §7).
//!
//! Boot services are available from the time the firmware passes control to an image until
//! `ExitBootServices` returns successfully. Each service has a named signature alias so that
//! the table, the safe wrappers in [`crate::api`] and tests can all refer to it by name.
//!
//! # Function Pointers
//!
//! Services are stored as bare `unsafe extern "efiapi" fn` pointers, not `Option<fn>`: the
//! firmware fills every slot, and a bare pointer keeps the field pointer-sized. The single
//! exception is the `reserved` slot, which is a plain `*mut c_void`.

use core::ffi::c_void;

use bitflags::bitflags;

use crate::event::{
    CheckEventFn, CloseEventFn, CreateEventExFn, CreateEventFn, RaiseTplFn, RestoreTplFn,
    SetTimerFn, SignalEventFn, WaitForEventFn,
};
use crate::memory::{
    AllocatePagesFn, AllocatePoolFn, EfiAllocateType, EfiMemoryType, FreePagesFn, FreePoolFn,
    GetMemoryMapFn,
};
use crate::protocol::device_path::DevicePathProtocol;
use crate::table::TableHeader;
use crate::{EfiEvent, EfiGuid, EfiHandle, EfiPhysicalAddress, EfiStatus, EfiTpl};

// ── Supporting types ─────────────────────────────────────────────────

/// Interface type for `InstallProtocolInterface`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceType {
    /// The only defined interface type.
    NativeInterface = 0,
}

/// Search type for `LocateHandle` and `LocateHandleBuffer`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateSearchType {
    /// Every handle in the handle database; `protocol` and `search_key` are ignored.
    AllHandles = 0,
    /// The next handle that is new for the registration in `search_key`.
    ByRegisterNotify = 1,
    /// Every handle that supports `protocol`.
    ByProtocol = 2,
}

bitflags! {
    /// Attributes for `OpenProtocol`.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OpenProtocolAttributes: u32 {
        /// Used by `HandleProtocol` compatibility.
        const BY_HANDLE_PROTOCOL = 0x0000_0001;
        /// Retrieve the interface without tracking the open.
        const GET_PROTOCOL = 0x0000_0002;
        /// Only test for the protocol; `interface` is ignored.
        const TEST_PROTOCOL = 0x0000_0004;
        /// A bus driver opening on behalf of a child controller.
        const BY_CHILD_CONTROLLER = 0x0000_0008;
        /// A driver managing the controller.
        const BY_DRIVER = 0x0000_0010;
        /// Exclusive access; other drivers are disconnected if possible.
        const EXCLUSIVE = 0x0000_0020;
    }
}

/// An agent that has a protocol interface open (`EFI_OPEN_PROTOCOL_INFORMATION_ENTRY`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OpenProtocolInformationEntry {
    /// The agent that opened the protocol.
    pub agent_handle: EfiHandle,
    /// The controller the open was made for.
    pub controller_handle: EfiHandle,
    /// Raw [`OpenProtocolAttributes`] bits.
    pub attributes: u32,
    /// Number of times this agent opened the protocol.
    pub open_count: u32,
}

impl OpenProtocolInformationEntry {
    /// The attributes as flags, keeping unknown bits.
    #[must_use]
    pub const fn attributes(&self) -> OpenProtocolAttributes {
        OpenProtocolAttributes::from_bits_retain(self.attributes)
    }
}

// ── Protocol handler services ────────────────────────────────────────

/// `EFI_INSTALL_PROTOCOL_INTERFACE`
pub type InstallProtocolInterfaceFn = unsafe extern "efiapi" fn(
    handle: *mut EfiHandle,
    protocol: *const EfiGuid,
    interface_type: InterfaceType,
    interface: *mut c_void,
) -> EfiStatus;

/// `EFI_REINSTALL_PROTOCOL_INTERFACE`
pub type ReinstallProtocolInterfaceFn = unsafe extern "efiapi" fn(
    handle: EfiHandle,
    protocol: *const EfiGuid,
    old_interface: *mut c_void,
    new_interface: *mut c_void,
) -> EfiStatus;

/// `EFI_UNINSTALL_PROTOCOL_INTERFACE`
pub type UninstallProtocolInterfaceFn = unsafe extern "efiapi" fn(
    handle: EfiHandle,
    protocol: *const EfiGuid,
    interface: *mut c_void,
) -> EfiStatus;

/// `EFI_HANDLE_PROTOCOL`
pub type HandleProtocolFn = unsafe extern "efiapi" fn(
    handle: EfiHandle,
    protocol: *const EfiGuid,
    interface: *mut *mut c_void,
) -> EfiStatus;

/// `EFI_REGISTER_PROTOCOL_NOTIFY`
pub type RegisterProtocolNotifyFn = unsafe extern "efiapi" fn(
    protocol: *const EfiGuid,
    event: EfiEvent,
    registration: *mut *mut c_void,
) -> EfiStatus;

/// `EFI_LOCATE_HANDLE`
pub type LocateHandleFn = unsafe extern "efiapi" fn(
    search_type: LocateSearchType,
    protocol: *const EfiGuid,
    search_key: *mut c_void,
    buffer_size: *mut usize,
    buffer: *mut EfiHandle,
) -> EfiStatus;

/// `EFI_LOCATE_DEVICE_PATH`
pub type LocateDevicePathFn = unsafe extern "efiapi" fn(
    protocol: *const EfiGuid,
    device_path: *mut *mut DevicePathProtocol,
    device: *mut EfiHandle,
) -> EfiStatus;

/// `EFI_INSTALL_CONFIGURATION_TABLE`
pub type InstallConfigurationTableFn =
    unsafe extern "efiapi" fn(guid: *const EfiGuid, table: *mut c_void) -> EfiStatus;

// ── Image services ───────────────────────────────────────────────────

/// `EFI_IMAGE_LOAD`
pub type LoadImageFn = unsafe extern "efiapi" fn(
    boot_policy: bool,
    parent_image_handle: EfiHandle,
    device_path: *mut DevicePathProtocol,
    source_buffer: *mut c_void,
    source_size: usize,
    image_handle: *mut EfiHandle,
) -> EfiStatus;

/// `EFI_IMAGE_START`
pub type StartImageFn = unsafe extern "efiapi" fn(
    image_handle: EfiHandle,
    exit_data_size: *mut usize,
    exit_data: *mut *mut u16,
) -> EfiStatus;

/// `EFI_EXIT`
pub type ExitFn = unsafe extern "efiapi" fn(
    image_handle: EfiHandle,
    exit_status: EfiStatus,
    exit_data_size: usize,
    exit_data: *mut u16,
) -> EfiStatus;

/// `EFI_IMAGE_UNLOAD`. Also the type of `LoadedImageProtocol::unload`.
pub type UnloadImageFn = unsafe extern "efiapi" fn(image_handle: EfiHandle) -> EfiStatus;

/// `EFI_EXIT_BOOT_SERVICES`
pub type ExitBootServicesFn =
    unsafe extern "efiapi" fn(image_handle: EfiHandle, map_key: usize) -> EfiStatus;

// ── Miscellaneous services ───────────────────────────────────────────

/// `EFI_GET_NEXT_MONOTONIC_COUNT`
pub type GetNextMonotonicCountFn = unsafe extern "efiapi" fn(count: *mut u64) -> EfiStatus;

/// `EFI_STALL`
pub type StallFn = unsafe extern "efiapi" fn(microseconds: usize) -> EfiStatus;

/// `EFI_SET_WATCHDOG_TIMER`. `timeout` is in seconds; zero disables the timer.
pub type SetWatchdogTimerFn = unsafe extern "efiapi" fn(
    timeout: usize,
    watchdog_code: u64,
    data_size: usize,
    watchdog_data: *mut u16,
) -> EfiStatus;

// ── Driver support services ──────────────────────────────────────────

/// `EFI_CONNECT_CONTROLLER`
pub type ConnectControllerFn = unsafe extern "efiapi" fn(
    controller_handle: EfiHandle,
    driver_image_handle: *mut EfiHandle,
    remaining_device_path: *mut DevicePathProtocol,
    recursive: bool,
) -> EfiStatus;

/// `EFI_DISCONNECT_CONTROLLER`
pub type DisconnectControllerFn = unsafe extern "efiapi" fn(
    controller_handle: EfiHandle,
    driver_image_handle: EfiHandle,
    child_handle: EfiHandle,
) -> EfiStatus;

// ── Open and close protocol services ─────────────────────────────────

/// `EFI_OPEN_PROTOCOL`
pub type OpenProtocolFn = unsafe extern "efiapi" fn(
    handle: EfiHandle,
    protocol: *const EfiGuid,
    interface: *mut *mut c_void,
    agent_handle: EfiHandle,
    controller_handle: EfiHandle,
    attributes: OpenProtocolAttributes,
) -> EfiStatus;

/// `EFI_CLOSE_PROTOCOL`
pub type CloseProtocolFn = unsafe extern "efiapi" fn(
    handle: EfiHandle,
    protocol: *const EfiGuid,
    agent_handle: EfiHandle,
    controller_handle: EfiHandle,
) -> EfiStatus;

/// `EFI_OPEN_PROTOCOL_INFORMATION`. The entry buffer is pool memory owned by the caller.
pub type OpenProtocolInformationFn = unsafe extern "efiapi" fn(
    handle: EfiHandle,
    protocol: *const EfiGuid,
    entry_buffer: *mut *mut OpenProtocolInformationEntry,
    entry_count: *mut usize,
) -> EfiStatus;

// ── Library services ─────────────────────────────────────────────────

/// `EFI_PROTOCOLS_PER_HANDLE`
pub type ProtocolsPerHandleFn = unsafe extern "efiapi" fn(
    handle: EfiHandle,
    protocol_buffer: *mut *mut *mut EfiGuid,
    protocol_buffer_count: *mut usize,
) -> EfiStatus;

/// `EFI_LOCATE_HANDLE_BUFFER`
pub type LocateHandleBufferFn = unsafe extern "efiapi" fn(
    search_type: LocateSearchType,
    protocol: *const EfiGuid,
    search_key: *mut c_void,
    no_handles: *mut usize,
    buffer: *mut *mut EfiHandle,
) -> EfiStatus;

/// `EFI_LOCATE_PROTOCOL`
pub type LocateProtocolFn = unsafe extern "efiapi" fn(
    protocol: *const EfiGuid,
    registration: *mut c_void,
    interface: *mut *mut c_void,
) -> EfiStatus;

/// `EFI_INSTALL_MULTIPLE_PROTOCOL_INTERFACES`, declared for one GUID/interface pair.
///
/// The firmware service is variadic: GUID/interface pairs follow `handle` and the list ends
/// with a null GUID pointer. Stable Rust cannot declare a variadic function pointer, so this
/// alias fixes the arity at one pair plus the terminator, which is call-compatible with the
/// variadic definition on every UEFI calling convention. Pass `core::ptr::null()` as
/// `terminator`. Install several protocols by calling it once per pair.
pub type InstallMultipleProtocolInterfacesFn = unsafe extern "efiapi" fn(
    handle: *mut EfiHandle,
    protocol: *const EfiGuid,
    interface: *mut c_void,
    terminator: *const c_void,
) -> EfiStatus;

/// `EFI_UNINSTALL_MULTIPLE_PROTOCOL_INTERFACES`, declared for one GUID/interface pair.
///
/// See [`InstallMultipleProtocolInterfacesFn`] for the calling convention.
pub type UninstallMultipleProtocolInterfacesFn = unsafe extern "efiapi" fn(
    handle: EfiHandle,
    protocol: *const EfiGuid,
    interface: *mut c_void,
    terminator: *const c_void,
) -> EfiStatus;

// ── 32-bit CRC and memory utility services ───────────────────────────

/// `EFI_CALCULATE_CRC32`
pub type CalculateCrc32Fn =
    unsafe extern "efiapi" fn(data: *mut c_void, data_size: usize, crc32: *mut u32) -> EfiStatus;

/// `EFI_COPY_MEM`. The regions may overlap.
pub type CopyMemFn =
    unsafe extern "efiapi" fn(destination: *mut c_void, source: *mut c_void, length: usize);

/// `EFI_SET_MEM`
pub type SetMemFn = unsafe extern "efiapi" fn(buffer: *mut c_void, size: usize, value: u8);

// ── Boot Services ────────────────────────────────────────────────────

/// The Boot Services table (`EFI_BOOT_SERVICES`).
#[repr(C)]
pub struct BootServices {
    /// Header with [`TableHeader::BOOT_SERVICES_SIGNATURE`].
    pub header: TableHeader,

    // Task priority
    /// Raises the task priority level.
    pub raise_tpl: RaiseTplFn,
    /// Restores the task priority level.
    pub restore_tpl: RestoreTplFn,

    // Memory
    /// Allocates pages.
    pub allocate_pages: AllocatePagesFn,
    /// Frees pages.
    pub free_pages: FreePagesFn,
    /// Returns the current memory map.
    pub get_memory_map: GetMemoryMapFn,
    /// Allocates pool memory.
    pub allocate_pool: AllocatePoolFn,
    /// Frees pool memory.
    pub free_pool: FreePoolFn,

    // Event and timer
    /// Creates an event.
    pub create_event: CreateEventFn,
    /// Arms or cancels a timer event.
    pub set_timer: SetTimerFn,
    /// Blocks until one of the events is signaled.
    pub wait_for_event: WaitForEventFn,
    /// Signals an event.
    pub signal_event: SignalEventFn,
    /// Closes an event.
    pub close_event: CloseEventFn,
    /// Checks whether an event is signaled.
    pub check_event: CheckEventFn,

    // Protocol handler
    /// Installs a protocol interface on a handle.
    pub install_protocol_interface: InstallProtocolInterfaceFn,
    /// Replaces a protocol interface on a handle.
    pub reinstall_protocol_interface: ReinstallProtocolInterfaceFn,
    /// Removes a protocol interface from a handle.
    pub uninstall_protocol_interface: UninstallProtocolInterfaceFn,
    /// Queries a handle for a protocol.
    pub handle_protocol: HandleProtocolFn,
    /// Must be null.
    pub reserved: *mut c_void,
    /// Registers an event signaled on protocol installation.
    pub register_protocol_notify: RegisterProtocolNotifyFn,
    /// Returns handles matching a search.
    pub locate_handle: LocateHandleFn,
    /// Finds the handle closest to a device path that supports a protocol.
    pub locate_device_path: LocateDevicePathFn,
    /// Adds, updates or removes a configuration table entry.
    pub install_configuration_table: InstallConfigurationTableFn,

    // Image
    /// Loads an image.
    pub load_image: LoadImageFn,
    /// Starts a loaded image.
    pub start_image: StartImageFn,
    /// Exits the calling image.
    pub exit: ExitFn,
    /// Unloads an image.
    pub unload_image: UnloadImageFn,
    /// Terminates boot services.
    pub exit_boot_services: ExitBootServicesFn,

    // Miscellaneous
    /// Returns a monotonic counter value.
    pub get_next_monotonic_count: GetNextMonotonicCountFn,
    /// Busy-waits for a number of microseconds.
    pub stall: StallFn,
    /// Sets or disables the watchdog timer.
    pub set_watchdog_timer: SetWatchdogTimerFn,

    // Driver support
    /// Connects drivers to a controller.
    pub connect_controller: ConnectControllerFn,
    /// Disconnects drivers from a controller.
    pub disconnect_controller: DisconnectControllerFn,

    // Open and close protocol
    /// Opens a protocol interface with tracking.
    pub open_protocol: OpenProtocolFn,
    /// Closes a protocol opened with `open_protocol`.
    pub close_protocol: CloseProtocolFn,
    /// Lists the agents that have a protocol open.
    pub open_protocol_information: OpenProtocolInformationFn,

    // Library
    /// Lists the protocols installed on a handle.
    pub protocols_per_handle: ProtocolsPerHandleFn,
    /// Returns handles matching a search in pool memory.
    pub locate_handle_buffer: LocateHandleBufferFn,
    /// Finds the first interface of a protocol.
    pub locate_protocol: LocateProtocolFn,
    /// Installs protocol interfaces on a handle.
    pub install_multiple_protocol_interfaces: InstallMultipleProtocolInterfacesFn,
    /// Removes protocol interfaces from a handle.
    pub uninstall_multiple_protocol_interfaces: UninstallMultipleProtocolInterfacesFn,

    // CRC
    /// Computes a CRC32.
    pub calculate_crc32: CalculateCrc32Fn,

    // Memory utility
    /// Copies memory; the regions may overlap.
    pub copy_mem: CopyMemFn,
    /// Fills memory with a byte.
    pub set_mem: SetMemFn,

    // UEFI 2.0
    /// Creates an event, optionally in a group.
    pub create_event_ex: CreateEventExFn,
}

impl BootServices {
    /// Raises the task priority level and returns the previous one.
    ///
    /// # Safety
    ///
    /// `new_tpl` must not be lower than the current level. The caller must restore the
    /// returned level with [`restore_tpl`](Self::restore_tpl).
    pub unsafe fn raise_tpl(&self, new_tpl: EfiTpl) -> EfiTpl {
        unsafe { (self.raise_tpl)(new_tpl) }
    }

    /// Restores a level returned by [`raise_tpl`](Self::raise_tpl).
    ///
    /// # Safety
    ///
    /// `old_tpl` must be the value returned by the matching `raise_tpl` call.
    pub unsafe fn restore_tpl(&self, old_tpl: EfiTpl) {
        unsafe { (self.restore_tpl)(old_tpl) }
    }

    /// Allocates `pages` pages of `memory_type` memory.
    ///
    /// For [`EfiAllocateType::AllocateMaxAddress`] and
    /// [`EfiAllocateType::AllocateAddress`], `address` is the
    /// limit or the exact address; it is ignored for `AnyPages`.
    ///
    /// # Errors
    ///
    /// Returns the firmware status, typically `OUT_OF_RESOURCES` or `NOT_FOUND`.
    ///
    /// # Safety
    ///
    /// Boot services must still be active. The caller owns the returned pages.
    pub unsafe fn allocate_pages(
        &self,
        alloc_type: EfiAllocateType,
        memory_type: EfiMemoryType,
        pages: usize,
        address: EfiPhysicalAddress,
    ) -> Result<EfiPhysicalAddress, EfiStatus> {
        let mut memory = address;
        let status =
            unsafe { (self.allocate_pages)(alloc_type, memory_type, pages, &raw mut memory) };
        status.to_result_with(memory)
    }

    /// Frees `pages` pages starting at `memory`.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` or `INVALID_PARAMETER` if the range was not allocated by
    /// `allocate_pages`.
    ///
    /// # Safety
    ///
    /// `memory` and `pages` must describe an allocation from `allocate_pages` that is no
    /// longer referenced.
    pub unsafe fn free_pages(
        &self,
        memory: EfiPhysicalAddress,
        pages: usize,
    ) -> Result<(), EfiStatus> {
        unsafe { (self.free_pages)(memory, pages) }.to_result()
    }

    /// Allocates `size` bytes of pool memory, 8-byte aligned.
    ///
    /// # Errors
    ///
    /// Returns `OUT_OF_RESOURCES` or `INVALID_PARAMETER`.
    ///
    /// # Safety
    ///
    /// Boot services must still be active. The caller must release the buffer with
    /// [`free_pool`](Self::free_pool).
    pub unsafe fn allocate_pool(
        &self,
        pool_type: EfiMemoryType,
        size: usize,
    ) -> Result<*mut u8, EfiStatus> {
        let mut buffer: *mut c_void = core::ptr::null_mut();
        let status = unsafe { (self.allocate_pool)(pool_type, size, &raw mut buffer) };
        status.to_result_with(buffer.cast())
    }

    /// Frees pool memory.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_PARAMETER` if `buffer` is not a pool allocation.
    ///
    /// # Safety
    ///
    /// `buffer` must come from [`allocate_pool`](Self::allocate_pool) (or a service that
    /// returns pool memory) and must not be used afterwards.
    pub unsafe fn free_pool(&self, buffer: *mut u8) -> Result<(), EfiStatus> {
        unsafe { (self.free_pool)(buffer.cast()) }.to_result()
    }

    /// Finds the first interface of `protocol` in the handle database.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if no handle supports the protocol.
    ///
    /// # Safety
    ///
    /// Boot services must still be active. The returned pointer is only valid while the
    /// interface stays installed.
    pub unsafe fn locate_protocol(&self, protocol: &EfiGuid) -> Result<*mut c_void, EfiStatus> {
        let mut interface: *mut c_void = core::ptr::null_mut();
        let status =
            unsafe { (self.locate_protocol)(protocol, core::ptr::null_mut(), &raw mut interface) };
        status.to_result_with(interface)
    }

    /// Queries `handle` for `protocol`.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` if the handle does not support the protocol.
    ///
    /// # Safety
    ///
    /// Boot services must still be active and `handle` must be a valid handle.
    pub unsafe fn handle_protocol(
        &self,
        handle: EfiHandle,
        protocol: &EfiGuid,
    ) -> Result<*mut c_void, EfiStatus> {
        let mut interface: *mut c_void = core::ptr::null_mut();
        let status = unsafe { (self.handle_protocol)(handle, protocol, &raw mut interface) };
        status.to_result_with(interface)
    }

    /// Stalls the processor for at least `microseconds`.
    ///
    /// # Errors
    ///
    /// Returns the firmware status on failure.
    ///
    /// # Safety
    ///
    /// Boot services must still be active.
    pub unsafe fn stall(&self, microseconds: usize) -> Result<(), EfiStatus> {
        unsafe { (self.stall)(microseconds) }.to_result()
    }

    /// Sets the watchdog timer to `timeout` seconds, or disables it when `timeout` is zero.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_PARAMETER` for a reserved `watchdog_code` or `UNSUPPORTED`.
    ///
    /// # Safety
    ///
    /// Boot services must still be active.
    pub unsafe fn set_watchdog_timer(
        &self,
        timeout: usize,
        watchdog_code: u64,
    ) -> Result<(), EfiStatus> {
        unsafe { (self.set_watchdog_timer)(timeout, watchdog_code, 0, core::ptr::null_mut()) }
            .to_result()
    }
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<InterfaceType>() == 4);
    assert!(core::mem::size_of::<LocateSearchType>() == 4);
    assert!(core::mem::size_of::<OpenProtocolAttributes>() == 4);
    // header + 44 pointer-sized slots
    assert!(
        core::mem::size_of::<BootServices>()
            == core::mem::size_of::<TableHeader>() + 44 * core::mem::size_of::<usize>()
    );
};

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(core::mem::size_of::<OpenProtocolInformationEntry>() == 24);

    assert!(core::mem::size_of::<BootServices>() == 376);
    assert!(core::mem::offset_of!(BootServices, raise_tpl) == 24);
    assert!(core::mem::offset_of!(BootServices, allocate_pages) == 40);
    assert!(core::mem::offset_of!(BootServices, get_memory_map) == 56);
    assert!(core::mem::offset_of!(BootServices, create_event) == 80);
    assert!(core::mem::offset_of!(BootServices, install_protocol_interface) == 128);
    assert!(core::mem::offset_of!(BootServices, handle_protocol) == 152);
    assert!(core::mem::offset_of!(BootServices, reserved) == 160);
    assert!(core::mem::offset_of!(BootServices, install_configuration_table) == 192);
    assert!(core::mem::offset_of!(BootServices, load_image) == 200);
    assert!(core::mem::offset_of!(BootServices, exit_boot_services) == 232);
    assert!(core::mem::offset_of!(BootServices, stall) == 248);
    assert!(core::mem::offset_of!(BootServices, set_watchdog_timer) == 256);
    assert!(core::mem::offset_of!(BootServices, open_protocol) == 280);
    assert!(core::mem::offset_of!(BootServices, locate_protocol) == 320);
    assert!(core::mem::offset_of!(BootServices, calculate_crc32) == 344);
    assert!(core::mem::offset_of!(BootServices, create_event_ex) == 368);
};

#[cfg(target_pointer_width = "32")]
const _: () = {
    assert!(core::mem::size_of::<OpenProtocolInformationEntry>() == 16);
    assert!(core::mem::size_of::<BootServices>() == 200);
    assert!(core::mem::offset_of!(BootServices, reserved) == 92);
    assert!(core::mem::offset_of!(BootServices, create_event_ex) == 196);
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_protocol_attribute_values() {
        assert_eq!(OpenProtocolAttributes::BY_HANDLE_PROTOCOL.bits(), 0x01);
        assert_eq!(OpenProtocolAttributes::GET_PROTOCOL.bits(), 0x02);
        assert_eq!(OpenProtocolAttributes::TEST_PROTOCOL.bits(), 0x04);
        assert_eq!(OpenProtocolAttributes::BY_CHILD_CONTROLLER.bits(), 0x08);
        assert_eq!(OpenProtocolAttributes::BY_DRIVER.bits(), 0x10);
        assert_eq!(OpenProtocolAttributes::EXCLUSIVE.bits(), 0x20);
    }

    #[test]
    fn information_entry_keeps_unknown_bits() {
        let entry = OpenProtocolInformationEntry {
            agent_handle: core::ptr::null_mut(),
            controller_handle: core::ptr::null_mut(),
            attributes: 0x30 | 0x100,
            open_count: 1,
        };
        let attrs = entry.attributes();
        assert!(
            attrs.contains(OpenProtocolAttributes::BY_DRIVER | OpenProtocolAttributes::EXCLUSIVE)
        );
        assert_eq!(attrs.bits(), 0x130);
    }

    #[test]
    fn search_and_interface_values() {
        assert_eq!(LocateSearchType::AllHandles as u32, 0);
        assert_eq!(LocateSearchType::ByRegisterNotify as u32, 1);
        assert_eq!(LocateSearchType::ByProtocol as u32, 2);
        assert_eq!(InterfaceType::NativeInterface as u32, 0);
    }
}
