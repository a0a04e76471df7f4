//! Safe wrappers over the raw tables.
//!
//! [`SystemTable`] tracks the boot phase in its type: boot services, consoles and files are
//! only reachable from a `SystemTable<Boot>`, and [`SystemTable::exit_boot_services`]
//! consumes it. Borrows of boot-time resources therefore cannot outlive
//! `ExitBootServices`.

use core::marker::PhantomData;

use crate::memory::MemoryMap;
use crate::protocol::simple_text_input::InputKey;
use crate::runtime::RuntimeServices;
use crate::table::{self, ConfigurationTable, Revision};
use crate::{EfiGuid, EfiHandle, EfiStatus};

pub mod boot;
pub mod console;
pub mod fs;

pub use boot::BootServices;
pub use console::Console;
pub use fs::{File, FileSystem};

// ── Type-state markers ───────────────────────────────────────────────

/// Boot services are active.
pub enum Boot {}

/// Boot services have been exited; only runtime services remain.
pub enum Runtime {}

mod sealed {
    pub trait Phase {}
    impl Phase for super::Boot {}
    impl Phase for super::Runtime {}
}

/// The system table, parameterized by boot phase.
pub struct SystemTable<S: sealed::Phase> {
    handle: EfiHandle,
    raw: *mut table::SystemTable,
    _phase: PhantomData<S>,
}

impl<S: sealed::Phase> SystemTable<S> {
    /// Returns the image handle.
    #[must_use]
    pub fn image_handle(&self) -> EfiHandle {
        self.handle
    }

    /// Returns the raw table.
    #[must_use]
    pub fn as_raw(&self) -> *mut table::SystemTable {
        self.raw
    }

    /// The UEFI revision the firmware implements.
    #[must_use]
    pub fn revision(&self) -> Revision {
        unsafe { (*self.raw).header.revision() }
    }

    /// The firmware vendor, without its terminator.
    #[must_use]
    pub fn firmware_vendor(&self) -> &[u16] {
        unsafe { (*self.raw).firmware_vendor() }
    }

    /// The runtime services table.
    #[must_use]
    pub fn runtime_services(&self) -> &RuntimeServices {
        unsafe { (*self.raw).runtime_services() }
    }

    /// The configuration tables (ACPI, SMBIOS, device tree, ...).
    #[must_use]
    pub fn configuration_tables(&self) -> &[ConfigurationTable] {
        unsafe { (*self.raw).configuration_tables() }
    }

    /// Looks up a configuration table by vendor GUID.
    #[must_use]
    pub fn find_configuration_table(&self, guid: &EfiGuid) -> Option<*mut core::ffi::c_void> {
        unsafe { (*self.raw).find_configuration_table(guid) }
    }
}

impl SystemTable<Boot> {
    /// Wraps the arguments of the image entry point.
    ///
    /// # Safety
    ///
    /// - `handle` must be the image handle passed to the entry point.
    /// - `raw` must point to the firmware's system table.
    /// - Boot services must still be active.
    pub unsafe fn from_raw(handle: EfiHandle, raw: *mut table::SystemTable) -> Self {
        Self {
            handle,
            raw,
            _phase: PhantomData,
        }
    }

    /// Borrows the boot services.
    #[must_use]
    pub fn boot_services(&self) -> BootServices<'_> {
        BootServices::new(unsafe { (*self.raw).boot_services() }, self.handle)
    }

    /// The console output device.
    #[must_use]
    pub fn console_out(&self) -> Console<'_> {
        unsafe { Console::from_raw((*self.raw).console_out) }
    }

    /// The standard error device.
    #[must_use]
    pub fn console_err(&self) -> Console<'_> {
        unsafe { Console::from_raw((*self.raw).standard_error) }
    }

    /// Reads a pending keystroke from the console input device.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR`, or `UNSUPPORTED` if there is no console input.
    pub fn read_key(&self) -> Result<Option<InputKey>, EfiStatus> {
        let input = unsafe { (*self.raw).console_in };
        if input.is_null() {
            return Err(EfiStatus::UNSUPPORTED);
        }
        unsafe { (*input).read_key() }
    }

    /// Exits boot services and returns the runtime view with the final memory map.
    ///
    /// `buf` receives the memory map; size it with
    /// [`BootServices::memory_map_size`]. If the map changes between `GetMemoryMap` and
    /// `ExitBootServices` (reported as `INVALID_PARAMETER`) the map is fetched once more
    /// and the exit retried, as the firmware allows.
    ///
    /// # Errors
    ///
    /// Returns the `GetMemoryMap` status, or the `ExitBootServices` status of the second
    /// attempt.
    pub fn exit_boot_services(
        self,
        buf: &mut [u8],
    ) -> Result<(SystemTable<Runtime>, MemoryMap<'_>), EfiStatus> {
        let bs = self.boot_services();
        let mut retried = false;
        let (map_size, map_key, descriptor_size, descriptor_version) = loop {
            let map = bs.fill_memory_map(buf)?;
            let status = unsafe { (bs.as_raw().exit_boot_services)(self.handle, map.1) };
            match status {
                EfiStatus::SUCCESS => break map,
                EfiStatus::INVALID_PARAMETER if !retried => {
                    log::debug!("efi: stale memory map key, retrying ExitBootServices");
                    retried = true;
                }
                status => return Err(status),
            }
        };

        #[cfg(feature = "logger")]
        crate::logger::LOGGER.detach();

        let runtime = SystemTable {
            handle: self.handle,
            raw: self.raw,
            _phase: PhantomData,
        };
        let map = MemoryMap::new(&buf[..map_size], map_key, descriptor_size, descriptor_version);
        Ok((runtime, map))
    }
}

#[cfg(test)]
mod tests {
    use super::console::tests::{fake_console, take_output};
    use super::*;
    use crate::table::TableHeader;

    fn system_table(
        vendor: &[u16],
        console_out: *mut crate::protocol::simple_text_output::SimpleTextOutputProtocol,
    ) -> table::SystemTable {
        table::SystemTable {
            header: TableHeader {
                signature: TableHeader::SYSTEM_TABLE_SIGNATURE,
                revision: Revision::EFI_2_70.0,
                header_size: u32::try_from(core::mem::size_of::<table::SystemTable>()).unwrap(),
                crc32: 0,
                reserved: 0,
            },
            firmware_vendor: vendor.as_ptr(),
            firmware_revision: 0x0001_0000,
            console_in_handle: core::ptr::null_mut(),
            console_in: core::ptr::null_mut(),
            console_out_handle: core::ptr::null_mut(),
            console_out,
            standard_error_handle: core::ptr::null_mut(),
            standard_error: console_out,
            runtime_services: core::ptr::null_mut(),
            boot_services: core::ptr::null_mut(),
            number_of_table_entries: 0,
            configuration_table: core::ptr::null_mut(),
        }
    }

    #[test]
    fn boot_view_accessors() {
        let vendor: Vec<u16> = "EDK II\0".encode_utf16().collect();
        let mut out = fake_console(core::ptr::null_mut());
        let mut raw = system_table(&vendor, &raw mut out);
        let st = unsafe { SystemTable::<Boot>::from_raw(0x1000 as EfiHandle, &raw mut raw) };

        assert_eq!(st.image_handle() as usize, 0x1000);
        assert_eq!(st.revision(), Revision::EFI_2_70);
        assert_eq!(String::from_utf16(st.firmware_vendor()).unwrap(), "EDK II");
        assert!(st.configuration_tables().is_empty());
        assert!(st.find_configuration_table(&EfiGuid::ACPI_20_TABLE).is_none());
        assert_eq!(st.read_key(), Err(EfiStatus::UNSUPPORTED));

        st.console_out().output_string("hi\n").unwrap();
        st.console_err().output_string("err").unwrap();
        assert_eq!(take_output(), ["hi\r\n", "err"]);
    }
}
