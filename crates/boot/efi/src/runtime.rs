//! The Runtime Services table (UEFI 2.10 §8).
//!
//! Runtime services stay callable after `ExitBootServices`. Once the OS calls
//! `SetVirtualAddressMap`, every pointer handed to them must be a virtual address.

use core::ffi::c_void;

use bitflags::bitflags;

use crate::memory::EfiMemoryDescriptor;
use crate::table::TableHeader;
use crate::{Boolean, EfiGuid, EfiPhysicalAddress, EfiStatus, FALSE};

// ── Time ─────────────────────────────────────────────────────────────

bitflags! {
    /// Bits of [`EfiTime::daylight`].
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Daylight: u8 {
        /// The time is affected by daylight saving time.
        const ADJUST_DAYLIGHT = 0x01;
        /// The time has been adjusted for daylight saving time.
        const IN_DAYLIGHT = 0x02;
    }
}

/// A calendar time (`EFI_TIME`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EfiTime {
    /// 1900 - 9999
    pub year: u16,
    /// 1 - 12
    pub month: u8,
    /// 1 - 31
    pub day: u8,
    /// 0 - 23
    pub hour: u8,
    /// 0 - 59
    pub minute: u8,
    /// 0 - 59
    pub second: u8,
    /// Padding.
    pub pad1: u8,
    /// 0 - 999,999,999
    pub nanosecond: u32,
    /// Offset from UTC in minutes (-1440 to 1440), or [`EfiTime::UNSPECIFIED_TIMEZONE`].
    pub time_zone: i16,
    /// Raw [`Daylight`] bits.
    pub daylight: u8,
    /// Padding.
    pub pad2: u8,
}

impl EfiTime {
    /// `time_zone` value for a local time with no known offset.
    pub const UNSPECIFIED_TIMEZONE: i16 = 0x07FF;

    /// The daylight bits as flags, keeping unknown bits.
    #[must_use]
    pub const fn daylight(&self) -> Daylight {
        Daylight::from_bits_retain(self.daylight)
    }

    /// Returns `true` if the time is interpreted as local time with no offset.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.time_zone == Self::UNSPECIFIED_TIMEZONE
    }

    /// Checks every field against its documented range, including the day against the
    /// length of the month.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (1900..=9999).contains(&self.year)
            && (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= days_in_month(self.year, self.month)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 59
            && self.nanosecond <= 999_999_999
            && (self.is_local() || (-1440..=1440).contains(&self.time_zone))
            && Daylight::from_bits(self.daylight).is_some()
    }
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Real time clock capabilities (`EFI_TIME_CAPABILITIES`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct EfiTimeCapabilities {
    /// Counts per second.
    pub resolution: u32,
    /// Error rate in parts per million, times 10^6.
    pub accuracy: u32,
    /// Raw `BOOLEAN`; see [`clears_on_set`](Self::clears_on_set).
    pub sets_to_zero: Boolean,
}

impl EfiTimeCapabilities {
    /// `true` if setting the time clears sub-resolution counts. Any non-zero byte counts as
    /// true.
    #[must_use]
    pub const fn clears_on_set(&self) -> bool {
        self.sets_to_zero != FALSE
    }
}

// ── Reset and capsules ───────────────────────────────────────────────

/// Reset kind for `ResetSystem`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetType {
    /// Power-cycle equivalent reset.
    Cold = 0,
    /// Reset without power cycling the platform.
    Warm = 1,
    /// Enter the ACPI G2/S5 or G3 state.
    Shutdown = 2,
    /// Platform-defined reset; the reset data starts with a GUID naming it.
    PlatformSpecific = 3,
}

bitflags! {
    /// Bits of [`CapsuleHeader::flags`] defined by UEFI. The low 16 bits belong to the
    /// capsule GUID owner.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapsuleFlags: u32 {
        /// Keep the capsule in memory across a system reset.
        const PERSIST_ACROSS_RESET = 0x0001_0000;
        /// Publish the capsule in the configuration table after reset.
        const POPULATE_SYSTEM_TABLE = 0x0002_0000;
        /// Have `UpdateCapsule` reset the platform itself.
        const INITIATE_RESET = 0x0004_0000;
    }
}

/// Header of a firmware capsule (`EFI_CAPSULE_HEADER`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CapsuleHeader {
    /// Identifies the capsule format.
    pub capsule_guid: EfiGuid,
    /// Size of this header; the image may extend it.
    pub header_size: u32,
    /// Raw [`CapsuleFlags`] bits.
    pub flags: u32,
    /// Size of the capsule, header included.
    pub capsule_image_size: u32,
}

impl CapsuleHeader {
    /// The flags, keeping GUID-specific bits.
    #[must_use]
    pub const fn flags(&self) -> CapsuleFlags {
        CapsuleFlags::from_bits_retain(self.flags)
    }
}

// ── Variables ────────────────────────────────────────────────────────

bitflags! {
    /// Attributes of a UEFI variable.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VariableAttributes: u32 {
        /// Stored in non-volatile storage.
        const NON_VOLATILE = 0x0000_0001;
        /// Accessible while boot services are active.
        const BOOTSERVICE_ACCESS = 0x0000_0002;
        /// Accessible through runtime services.
        const RUNTIME_ACCESS = 0x0000_0004;
        /// A hardware error record.
        const HARDWARE_ERROR_RECORD = 0x0000_0008;
        /// Deprecated count-based authenticated write access.
        const AUTHENTICATED_WRITE_ACCESS = 0x0000_0010;
        /// Time-based authenticated write access.
        const TIME_BASED_AUTHENTICATED_WRITE_ACCESS = 0x0000_0020;
        /// `SetVariable` appends instead of replacing.
        const APPEND_WRITE = 0x0000_0040;
        /// Enhanced authenticated access with a metadata header.
        const ENHANCED_AUTHENTICATED_ACCESS = 0x0000_0080;
    }
}

// ── Service signatures ───────────────────────────────────────────────

/// `EFI_GET_TIME`
pub type GetTimeFn = unsafe extern "efiapi" fn(
    time: *mut EfiTime,
    capabilities: *mut EfiTimeCapabilities,
) -> EfiStatus;

/// `EFI_SET_TIME`
pub type SetTimeFn = unsafe extern "efiapi" fn(time: *mut EfiTime) -> EfiStatus;

/// `EFI_GET_WAKEUP_TIME`
pub type GetWakeupTimeFn = unsafe extern "efiapi" fn(
    enabled: *mut Boolean,
    pending: *mut Boolean,
    time: *mut EfiTime,
) -> EfiStatus;

/// `EFI_SET_WAKEUP_TIME`
pub type SetWakeupTimeFn =
    unsafe extern "efiapi" fn(enable: bool, time: *mut EfiTime) -> EfiStatus;

/// `EFI_SET_VIRTUAL_ADDRESS_MAP`
pub type SetVirtualAddressMapFn = unsafe extern "efiapi" fn(
    memory_map_size: usize,
    descriptor_size: usize,
    descriptor_version: u32,
    virtual_map: *mut EfiMemoryDescriptor,
) -> EfiStatus;

/// `EFI_CONVERT_POINTER`
pub type ConvertPointerFn =
    unsafe extern "efiapi" fn(debug_disposition: usize, address: *mut *mut c_void) -> EfiStatus;

/// `EFI_GET_VARIABLE`
pub type GetVariableFn = unsafe extern "efiapi" fn(
    variable_name: *mut u16,
    vendor_guid: *mut EfiGuid,
    attributes: *mut u32,
    data_size: *mut usize,
    data: *mut c_void,
) -> EfiStatus;

/// `EFI_GET_NEXT_VARIABLE_NAME`
pub type GetNextVariableNameFn = unsafe extern "efiapi" fn(
    variable_name_size: *mut usize,
    variable_name: *mut u16,
    vendor_guid: *mut EfiGuid,
) -> EfiStatus;

/// `EFI_SET_VARIABLE`
pub type SetVariableFn = unsafe extern "efiapi" fn(
    variable_name: *mut u16,
    vendor_guid: *mut EfiGuid,
    attributes: u32,
    data_size: usize,
    data: *mut c_void,
) -> EfiStatus;

/// `EFI_GET_NEXT_HIGH_MONO_COUNT`
pub type GetNextHighMonoCountFn = unsafe extern "efiapi" fn(high_count: *mut u32) -> EfiStatus;

/// `EFI_RESET_SYSTEM`. Never returns.
pub type ResetSystemFn = unsafe extern "efiapi" fn(
    reset_type: ResetType,
    reset_status: EfiStatus,
    data_size: usize,
    reset_data: *mut c_void,
) -> !;

/// `EFI_UPDATE_CAPSULE`
pub type UpdateCapsuleFn = unsafe extern "efiapi" fn(
    capsule_header_array: *mut *mut CapsuleHeader,
    capsule_count: usize,
    scatter_gather_list: EfiPhysicalAddress,
) -> EfiStatus;

/// `EFI_QUERY_CAPSULE_CAPABILITIES`
pub type QueryCapsuleCapabilitiesFn = unsafe extern "efiapi" fn(
    capsule_header_array: *mut *mut CapsuleHeader,
    capsule_count: usize,
    maximum_capsule_size: *mut u64,
    reset_type: *mut ResetType,
) -> EfiStatus;

/// `EFI_QUERY_VARIABLE_INFO`
pub type QueryVariableInfoFn = unsafe extern "efiapi" fn(
    attributes: u32,
    maximum_variable_storage_size: *mut u64,
    remaining_variable_storage_size: *mut u64,
    maximum_variable_size: *mut u64,
) -> EfiStatus;

// ── Runtime Services ─────────────────────────────────────────────────

/// The Runtime Services table (`EFI_RUNTIME_SERVICES`).
#[repr(C)]
pub struct RuntimeServices {
    /// Header with [`TableHeader::RUNTIME_SERVICES_SIGNATURE`].
    pub header: TableHeader,

    // Time
    /// Reads the real time clock.
    pub get_time: GetTimeFn,
    /// Sets the real time clock.
    pub set_time: SetTimeFn,
    /// Reads the wakeup alarm.
    pub get_wakeup_time: GetWakeupTimeFn,
    /// Sets or disables the wakeup alarm.
    pub set_wakeup_time: SetWakeupTimeFn,

    // Virtual memory
    /// Switches runtime services to virtual addressing.
    pub set_virtual_address_map: SetVirtualAddressMapFn,
    /// Converts a pointer during the virtual address change event.
    pub convert_pointer: ConvertPointerFn,

    // Variables
    /// Reads a variable.
    pub get_variable: GetVariableFn,
    /// Enumerates variable names.
    pub get_next_variable_name: GetNextVariableNameFn,
    /// Writes or deletes a variable.
    pub set_variable: SetVariableFn,

    // Miscellaneous
    /// Returns the high 32 bits of the monotonic counter.
    pub get_next_high_monotonic_count: GetNextHighMonoCountFn,
    /// Resets the platform.
    pub reset_system: ResetSystemFn,

    // Capsules
    /// Passes capsules to the firmware.
    pub update_capsule: UpdateCapsuleFn,
    /// Reports whether capsules can be processed.
    pub query_capsule_capabilities: QueryCapsuleCapabilitiesFn,

    // Variable information
    /// Reports variable storage usage.
    pub query_variable_info: QueryVariableInfoFn,
}

impl RuntimeServices {
    /// Reads the current time.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR` on a hardware failure or `UNSUPPORTED` after
    /// `ExitBootServices` on platforms without a runtime clock.
    ///
    /// # Safety
    ///
    /// `self` must be valid for the current addressing mode.
    pub unsafe fn get_time(&self) -> Result<EfiTime, EfiStatus> {
        let mut time = EfiTime::default();
        let status = unsafe { (self.get_time)(&raw mut time, core::ptr::null_mut()) };
        status.to_result_with(time)
    }

    /// Resets the platform. `data` is passed as the reset data; for a normal reset it is
    /// empty.
    ///
    /// # Safety
    ///
    /// This function does not return. All state that must survive has to be flushed first,
    /// and `self` must be valid for the current addressing mode.
    pub unsafe fn reset_system(
        &self,
        reset_type: ResetType,
        status: EfiStatus,
        data: &[u8],
    ) -> ! {
        let reset_data = if data.is_empty() {
            core::ptr::null_mut()
        } else {
            data.as_ptr().cast_mut().cast()
        };
        log::info!("efi: resetting platform ({reset_type:?}, {status})");
        unsafe { (self.reset_system)(reset_type, status, data.len(), reset_data) }
    }
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<EfiTime>() == 16);
    assert!(core::mem::offset_of!(EfiTime, year) == 0);
    assert!(core::mem::offset_of!(EfiTime, month) == 2);
    assert!(core::mem::offset_of!(EfiTime, day) == 3);
    assert!(core::mem::offset_of!(EfiTime, hour) == 4);
    assert!(core::mem::offset_of!(EfiTime, minute) == 5);
    assert!(core::mem::offset_of!(EfiTime, second) == 6);
    assert!(core::mem::offset_of!(EfiTime, pad1) == 7);
    assert!(core::mem::offset_of!(EfiTime, nanosecond) == 8);
    assert!(core::mem::offset_of!(EfiTime, time_zone) == 12);
    assert!(core::mem::offset_of!(EfiTime, daylight) == 14);
    assert!(core::mem::offset_of!(EfiTime, pad2) == 15);

    assert!(core::mem::size_of::<EfiTimeCapabilities>() == 12);
    assert!(core::mem::offset_of!(EfiTimeCapabilities, sets_to_zero) == 8);

    assert!(core::mem::size_of::<CapsuleHeader>() == 28);
    assert!(core::mem::offset_of!(CapsuleHeader, header_size) == 16);
    assert!(core::mem::offset_of!(CapsuleHeader, flags) == 20);
    assert!(core::mem::offset_of!(CapsuleHeader, capsule_image_size) == 24);

    assert!(core::mem::size_of::<ResetType>() == 4);

    // header + 14 pointer-sized slots
    assert!(
        core::mem::size_of::<RuntimeServices>()
            == core::mem::size_of::<TableHeader>() + 14 * core::mem::size_of::<usize>()
    );
};

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(core::mem::size_of::<RuntimeServices>() == 136);
    assert!(core::mem::offset_of!(RuntimeServices, get_time) == 24);
    assert!(core::mem::offset_of!(RuntimeServices, set_virtual_address_map) == 56);
    assert!(core::mem::offset_of!(RuntimeServices, get_variable) == 72);
    assert!(core::mem::offset_of!(RuntimeServices, reset_system) == 104);
    assert!(core::mem::offset_of!(RuntimeServices, query_variable_info) == 128);
};

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_time() -> EfiTime {
        EfiTime {
            year: 2024,
            month: 2,
            day: 29,
            hour: 23,
            minute: 59,
            second: 59,
            nanosecond: 999_999_999,
            time_zone: -480,
            daylight: Daylight::ADJUST_DAYLIGHT.bits(),
            ..EfiTime::default()
        }
    }

    #[test]
    fn valid_time() {
        assert!(sample_time().is_valid());
    }

    #[test]
    fn invalid_dates() {
        let mut t = sample_time();
        t.year = 2023;
        assert!(!t.is_valid(), "2023 is not a leap year");

        let mut t = sample_time();
        t.year = 1900;
        assert!(!t.is_valid(), "1900 is not a leap year");

        let mut t = sample_time();
        t.year = 2000;
        assert!(t.is_valid(), "2000 is a leap year");

        let mut t = sample_time();
        t.month = 4;
        t.day = 31;
        assert!(!t.is_valid());

        let mut t = sample_time();
        t.month = 13;
        assert!(!t.is_valid());

        let mut t = sample_time();
        t.year = 1899;
        assert!(!t.is_valid());
    }

    #[test]
    fn time_zone_range() {
        let mut t = sample_time();
        t.time_zone = 1440;
        assert!(t.is_valid());
        t.time_zone = -1441;
        assert!(!t.is_valid());
        t.time_zone = EfiTime::UNSPECIFIED_TIMEZONE;
        assert!(t.is_valid());
        assert!(t.is_local());
    }

    #[test]
    fn unknown_daylight_bits_are_invalid() {
        let mut t = sample_time();
        t.daylight = 0x04;
        assert!(!t.is_valid());
        assert_eq!(t.daylight().bits(), 0x04);
    }

    #[test]
    fn capsule_flags() {
        let header = CapsuleHeader {
            capsule_guid: EfiGuid::NULL,
            header_size: 28,
            flags: 0x0003_0001,
            capsule_image_size: 28,
        };
        let flags = header.flags();
        assert!(flags.contains(CapsuleFlags::PERSIST_ACROSS_RESET));
        assert!(flags.contains(CapsuleFlags::POPULATE_SYSTEM_TABLE));
        assert!(!flags.contains(CapsuleFlags::INITIATE_RESET));
        assert_eq!(flags.bits() & 0xFFFF, 1);
    }

    #[test]
    fn variable_attribute_values() {
        assert_eq!(VariableAttributes::NON_VOLATILE.bits(), 0x01);
        assert_eq!(VariableAttributes::BOOTSERVICE_ACCESS.bits(), 0x02);
        assert_eq!(VariableAttributes::RUNTIME_ACCESS.bits(), 0x04);
        assert_eq!(VariableAttributes::HARDWARE_ERROR_RECORD.bits(), 0x08);
        assert_eq!(VariableAttributes::AUTHENTICATED_WRITE_ACCESS.bits(), 0x10);
        assert_eq!(VariableAttributes::TIME_BASED_AUTHENTICATED_WRITE_ACCESS.bits(), 0x20);
        assert_eq!(VariableAttributes::APPEND_WRITE.bits(), 0x40);
        assert_eq!(VariableAttributes::ENHANCED_AUTHENTICATED_ACCESS.bits(), 0x80);
    }

    #[test]
    fn reset_type_values() {
        assert_eq!(ResetType::Cold as u32, 0);
        assert_eq!(ResetType::Warm as u32, 1);
        assert_eq!(ResetType::Shutdown as u32, 2);
        assert_eq!(ResetType::PlatformSpecific as u32, 3);
    }

    #[test]
    fn capability_flag_from_raw_byte() {
        let mut caps = EfiTimeCapabilities::default();
        assert!(!caps.clears_on_set());
        caps.sets_to_zero = 2;
        assert!(caps.clears_on_set());
    }
}
