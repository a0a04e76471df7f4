//! The EFI System Table and the structures shared by all service tables (UEFI 2.10 §4).
//!
//! A pointer to [`SystemTable`] is the second argument of every image entry point. From it the
//! image reaches the [`BootServices`], the [`RuntimeServices`], the console protocols and the
//! configuration tables published by the platform.

use core::ffi::c_void;
use core::fmt;

use crate::boot::BootServices;
use crate::protocol::simple_text_input::SimpleTextInputProtocol;
use crate::protocol::simple_text_output::SimpleTextOutputProtocol;
use crate::runtime::RuntimeServices;
use crate::{EfiGuid, EfiHandle, EfiStatus};

// ── Table Header ─────────────────────────────────────────────────────

/// Header preceding the system, boot services and runtime services tables.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    /// Identifies the table that follows.
    pub signature: u64,
    /// Specification revision the table conforms to, see [`Revision`].
    pub revision: u32,
    /// Size of the whole table in bytes, header included.
    pub header_size: u32,
    /// CRC32 of the table with this field set to zero while computing.
    pub crc32: u32,
    /// Must be zero.
    pub reserved: u32,
}

impl TableHeader {
    /// `"IBI SYST"` read as a little-endian `u64`.
    pub const SYSTEM_TABLE_SIGNATURE: u64 = u64::from_le_bytes(*b"IBI SYST");
    /// `"BOOTSERV"` read as a little-endian `u64`.
    pub const BOOT_SERVICES_SIGNATURE: u64 = u64::from_le_bytes(*b"BOOTSERV");
    /// `"RUNTSERV"` read as a little-endian `u64`.
    pub const RUNTIME_SERVICES_SIGNATURE: u64 = u64::from_le_bytes(*b"RUNTSERV");

    /// The revision as a [`Revision`].
    #[must_use]
    pub const fn revision(&self) -> Revision {
        Revision(self.revision)
    }
}

/// A specification revision: major in the upper 16 bits, minor in the lower 16 bits.
///
/// The minor part encodes two decimal digits, so UEFI 2.3.1 is `(2 << 16) | 31` and 2.10 is
/// `(2 << 16) | 100`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(pub u32);

impl Revision {
    /// UEFI 1.02
    pub const EFI_1_02: Self = Self::new(1, 2);
    /// UEFI 1.10
    pub const EFI_1_10: Self = Self::new(1, 10);
    /// UEFI 2.0
    pub const EFI_2_00: Self = Self::new(2, 0);
    /// UEFI 2.3.1
    pub const EFI_2_31: Self = Self::new(2, 31);
    /// UEFI 2.7
    pub const EFI_2_70: Self = Self::new(2, 70);
    /// UEFI 2.9
    pub const EFI_2_90: Self = Self::new(2, 90);
    /// UEFI 2.10
    pub const EFI_2_100: Self = Self::new(2, 100);
    /// The revision these definitions were transcribed from.
    pub const SPECIFICATION: Self = Self::EFI_2_100;

    /// Builds a revision from its parts.
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self(((major as u32) << 16) | minor as u32)
    }

    /// The major version.
    #[must_use]
    pub const fn major(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The minor version, including the sub-minor digit.
    #[must_use]
    pub const fn minor(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minor = self.minor();
        if self.major() < 2 {
            return write!(f, "{}.{:02}", self.major(), minor);
        }
        if minor >= 100 {
            // 2.10 is encoded as 100; the format has outgrown two digits.
            return write!(f, "{}.{}", self.major(), minor / 10);
        }
        match minor % 10 {
            0 => write!(f, "{}.{}", self.major(), minor / 10),
            sub => write!(f, "{}.{}.{}", self.major(), minor / 10, sub),
        }
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({self})")
    }
}

// ── Configuration Table ──────────────────────────────────────────────

/// One entry of the configuration table array (`EFI_CONFIGURATION_TABLE`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ConfigurationTable {
    /// Identifies the table.
    pub vendor_guid: EfiGuid,
    /// The table itself.
    pub vendor_table: *mut c_void,
}

// ── System Table ─────────────────────────────────────────────────────

/// The EFI System Table (`EFI_SYSTEM_TABLE`).
#[repr(C)]
pub struct SystemTable {
    /// Header with [`TableHeader::SYSTEM_TABLE_SIGNATURE`].
    pub header: TableHeader,
    /// NUL-terminated UCS-2 name of the firmware vendor.
    pub firmware_vendor: *const u16,
    /// Vendor-specific firmware revision.
    pub firmware_revision: u32,
    /// Handle of the active console input device.
    pub console_in_handle: EfiHandle,
    /// Simple Text Input Protocol of `console_in_handle`.
    pub console_in: *mut SimpleTextInputProtocol,
    /// Handle of the active console output device.
    pub console_out_handle: EfiHandle,
    /// Simple Text Output Protocol of `console_out_handle`.
    pub console_out: *mut SimpleTextOutputProtocol,
    /// Handle of the active standard error device.
    pub standard_error_handle: EfiHandle,
    /// Simple Text Output Protocol of `standard_error_handle`.
    pub standard_error: *mut SimpleTextOutputProtocol,
    /// The Runtime Services table.
    pub runtime_services: *mut RuntimeServices,
    /// The Boot Services table. Invalid after `ExitBootServices`.
    pub boot_services: *mut BootServices,
    /// Number of entries in `configuration_table`.
    pub number_of_table_entries: usize,
    /// The configuration table array.
    pub configuration_table: *mut ConfigurationTable,
}

impl SystemTable {
    /// Returns the boot services table.
    ///
    /// # Safety
    ///
    /// Boot services must still be active and `self.boot_services` valid.
    #[must_use]
    pub unsafe fn boot_services(&self) -> &BootServices {
        unsafe { &*self.boot_services }
    }

    /// Returns the runtime services table.
    ///
    /// # Safety
    ///
    /// `self.runtime_services` must be valid (and converted, if a virtual map was applied).
    #[must_use]
    pub unsafe fn runtime_services(&self) -> &RuntimeServices {
        unsafe { &*self.runtime_services }
    }

    /// Returns the configuration table entries.
    ///
    /// # Safety
    ///
    /// `configuration_table` must point to `number_of_table_entries` valid entries.
    #[must_use]
    pub unsafe fn configuration_tables(&self) -> &[ConfigurationTable] {
        if self.configuration_table.is_null() {
            return &[];
        }
        unsafe {
            core::slice::from_raw_parts(self.configuration_table, self.number_of_table_entries)
        }
    }

    /// Looks up a configuration table by GUID.
    ///
    /// # Safety
    ///
    /// Same requirements as [`configuration_tables`](Self::configuration_tables).
    #[must_use]
    pub unsafe fn find_configuration_table(&self, guid: &EfiGuid) -> Option<*mut c_void> {
        unsafe { self.configuration_tables() }
            .iter()
            .find(|entry| entry.vendor_guid == *guid)
            .map(|entry| entry.vendor_table)
    }

    /// Returns the firmware vendor string, without its terminator.
    ///
    /// # Safety
    ///
    /// `firmware_vendor` must be null or point to a NUL-terminated UCS-2 string that
    /// outlives `self`.
    #[must_use]
    pub unsafe fn firmware_vendor(&self) -> &[u16] {
        if self.firmware_vendor.is_null() {
            return &[];
        }
        unsafe { crate::ucs2::from_ptr(self.firmware_vendor) }
    }
}

/// `EFI_IMAGE_ENTRY_POINT`
pub type ImageEntryPointFn =
    unsafe extern "efiapi" fn(image_handle: EfiHandle, system_table: *mut SystemTable) -> EfiStatus;

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = assert!(core::mem::size_of::<TableHeader>() == 24);

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(core::mem::size_of::<ConfigurationTable>() == 24);

    // 4 bytes of padding after firmware_revision
    assert!(core::mem::size_of::<SystemTable>() == 120);
    assert!(core::mem::offset_of!(SystemTable, header) == 0);
    assert!(core::mem::offset_of!(SystemTable, firmware_vendor) == 24);
    assert!(core::mem::offset_of!(SystemTable, firmware_revision) == 32);
    assert!(core::mem::offset_of!(SystemTable, console_in_handle) == 40);
    assert!(core::mem::offset_of!(SystemTable, console_in) == 48);
    assert!(core::mem::offset_of!(SystemTable, console_out_handle) == 56);
    assert!(core::mem::offset_of!(SystemTable, console_out) == 64);
    assert!(core::mem::offset_of!(SystemTable, standard_error_handle) == 72);
    assert!(core::mem::offset_of!(SystemTable, standard_error) == 80);
    assert!(core::mem::offset_of!(SystemTable, runtime_services) == 88);
    assert!(core::mem::offset_of!(SystemTable, boot_services) == 96);
    assert!(core::mem::offset_of!(SystemTable, number_of_table_entries) == 104);
    assert!(core::mem::offset_of!(SystemTable, configuration_table) == 112);
};

#[cfg(target_pointer_width = "32")]
const _: () = {
    assert!(core::mem::size_of::<ConfigurationTable>() == 20);

    assert!(core::mem::size_of::<SystemTable>() == 72);
    assert!(core::mem::offset_of!(SystemTable, firmware_vendor) == 24);
    assert!(core::mem::offset_of!(SystemTable, firmware_revision) == 28);
    assert!(core::mem::offset_of!(SystemTable, console_in_handle) == 32);
    assert!(core::mem::offset_of!(SystemTable, runtime_services) == 56);
    assert!(core::mem::offset_of!(SystemTable, boot_services) == 60);
    assert!(core::mem::offset_of!(SystemTable, configuration_table) == 68);
};

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_system_table() -> SystemTable {
        SystemTable {
            header: TableHeader {
                signature: TableHeader::SYSTEM_TABLE_SIGNATURE,
                revision: Revision::EFI_2_100.0,
                header_size: core::mem::size_of::<SystemTable>() as u32,
                crc32: 0,
                reserved: 0,
            },
            firmware_vendor: core::ptr::null(),
            firmware_revision: 0x0001_0000,
            console_in_handle: core::ptr::null_mut(),
            console_in: core::ptr::null_mut(),
            console_out_handle: core::ptr::null_mut(),
            console_out: core::ptr::null_mut(),
            standard_error_handle: core::ptr::null_mut(),
            standard_error: core::ptr::null_mut(),
            runtime_services: core::ptr::null_mut(),
            boot_services: core::ptr::null_mut(),
            number_of_table_entries: 0,
            configuration_table: core::ptr::null_mut(),
        }
    }

    #[test]
    fn signatures() {
        assert_eq!(TableHeader::SYSTEM_TABLE_SIGNATURE, 0x5453_5953_2049_4249);
        assert_eq!(TableHeader::BOOT_SERVICES_SIGNATURE, 0x5652_4553_544f_4f42);
        assert_eq!(TableHeader::RUNTIME_SERVICES_SIGNATURE, 0x5652_4553_544e_5552);
    }

    #[test]
    fn revision_encoding() {
        assert_eq!(Revision::EFI_2_100.0, 0x0002_0064);
        assert_eq!(Revision::EFI_2_31.0, 0x0002_001f);
        assert_eq!(Revision::EFI_2_100.major(), 2);
        assert_eq!(Revision::EFI_2_100.minor(), 100);
        assert!(Revision::EFI_2_90 < Revision::SPECIFICATION);
    }

    #[test]
    fn revision_display() {
        assert_eq!(Revision::EFI_2_100.to_string(), "2.10");
        assert_eq!(Revision::EFI_2_31.to_string(), "2.3.1");
        assert_eq!(Revision::EFI_2_70.to_string(), "2.7");
        assert_eq!(Revision::EFI_1_10.to_string(), "1.10");
        assert_eq!(Revision::EFI_1_02.to_string(), "1.02");
    }

    #[test]
    fn configuration_lookup() {
        let mut acpi = 0u8;
        let mut smbios = 0u8;
        let mut entries = [
            ConfigurationTable {
                vendor_guid: EfiGuid::SMBIOS_TABLE,
                vendor_table: (&raw mut smbios).cast(),
            },
            ConfigurationTable {
                vendor_guid: EfiGuid::ACPI_20_TABLE,
                vendor_table: (&raw mut acpi).cast(),
            },
        ];
        let mut st = empty_system_table();
        st.number_of_table_entries = entries.len();
        st.configuration_table = entries.as_mut_ptr();

        unsafe {
            assert_eq!(st.configuration_tables().len(), 2);
            assert_eq!(
                st.find_configuration_table(&EfiGuid::ACPI_20_TABLE),
                Some((&raw mut acpi).cast())
            );
            assert_eq!(st.find_configuration_table(&EfiGuid::DEVICE_TREE_TABLE), None);
        }
    }

    #[test]
    fn firmware_vendor_string() {
        let vendor: Vec<u16> = "EDK II\0".encode_utf16().collect();
        let mut st = empty_system_table();
        assert!(unsafe { st.firmware_vendor() }.is_empty());

        st.firmware_vendor = vendor.as_ptr();
        let name = unsafe { st.firmware_vendor() };
        assert_eq!(String::from_utf16(name).unwrap(), "EDK II");
    }
}
