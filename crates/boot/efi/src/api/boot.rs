//! Boot Services wrapper.

use core::ffi::c_void;

use crate::boot::{self, OpenProtocolAttributes};
use crate::memory::{EfiAllocateType, EfiMemoryDescriptor, EfiMemoryType, MemoryMap, PAGE_SIZE};
use crate::protocol::Protocol;
use crate::protocol::file::SimpleFileSystemProtocol;
use crate::protocol::loaded_image::LoadedImageProtocol;
use crate::{EfiHandle, EfiPhysicalAddress, EfiStatus};

use super::fs::FileSystem;

/// Safe view of the Boot Services table, valid until boot services are exited.
#[derive(Clone, Copy)]
pub struct BootServices<'st> {
    raw: &'st boot::BootServices,
    image_handle: EfiHandle,
}

impl<'st> BootServices<'st> {
    pub(crate) fn new(raw: &'st boot::BootServices, image_handle: EfiHandle) -> Self {
        Self { raw, image_handle }
    }

    /// The raw table.
    #[must_use]
    pub fn as_raw(&self) -> &'st boot::BootServices {
        self.raw
    }

    /// The handle of the running image.
    #[must_use]
    pub fn image_handle(&self) -> EfiHandle {
        self.image_handle
    }

    /// Finds the first instance of protocol `P` in the handle database.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` if no handle carries `P`.
    pub fn locate_protocol<P: Protocol>(&self) -> Result<&'st mut P, EfiStatus> {
        let interface = unsafe { self.raw.locate_protocol(&P::GUID) }?;
        Self::interface(interface)
    }

    /// Returns the instance of protocol `P` installed on `handle`.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` if `handle` does not carry `P`.
    pub fn handle_protocol<P: Protocol>(&self, handle: EfiHandle) -> Result<&'st mut P, EfiStatus> {
        let interface = unsafe { self.raw.handle_protocol(handle, &P::GUID) }?;
        Self::interface(interface)
    }

    /// Opens protocol `P` on `handle` on behalf of the running image.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` if `handle` does not carry `P`, or `ACCESS_DENIED` /
    /// `ALREADY_STARTED` if the requested access conflicts with an existing opener.
    pub fn open_protocol<P: Protocol>(
        &self,
        handle: EfiHandle,
        attributes: OpenProtocolAttributes,
    ) -> Result<&'st mut P, EfiStatus> {
        let mut interface: *mut c_void = core::ptr::null_mut();
        let status = unsafe {
            (self.raw.open_protocol)(
                handle,
                &P::GUID,
                &raw mut interface,
                self.image_handle,
                core::ptr::null_mut(),
                attributes,
            )
        };
        status.to_result()?;
        Self::interface(interface)
    }

    fn interface<P>(interface: *mut c_void) -> Result<&'st mut P, EfiStatus> {
        if interface.is_null() {
            return Err(EfiStatus::NOT_FOUND);
        }
        // SAFETY: the firmware returned an interface registered under `P::GUID`.
        Ok(unsafe { &mut *interface.cast::<P>() })
    }

    /// The Loaded Image Protocol of the running image.
    ///
    /// # Errors
    ///
    /// Returns the firmware status if the image handle has no loaded image interface.
    pub fn loaded_image(&self) -> Result<&'st mut LoadedImageProtocol, EfiStatus> {
        self.handle_protocol(self.image_handle)
    }

    /// The file system the running image was loaded from.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` if the boot device has no Simple File System.
    pub fn boot_file_system(&self) -> Result<FileSystem<'st>, EfiStatus> {
        let device = self.loaded_image()?.device_handle;
        let raw = self.handle_protocol::<SimpleFileSystemProtocol>(device)?;
        Ok(FileSystem::new(raw))
    }

    /// Allocates `pages` 4 KiB pages.
    ///
    /// `address` is only read for [`EfiAllocateType::AllocateMaxAddress`] and
    /// [`EfiAllocateType::AllocateAddress`].
    ///
    /// # Errors
    ///
    /// Returns `OUT_OF_RESOURCES` or `NOT_FOUND`.
    pub fn allocate_pages(
        &self,
        alloc_type: EfiAllocateType,
        memory_type: EfiMemoryType,
        pages: usize,
        address: EfiPhysicalAddress,
    ) -> Result<EfiPhysicalAddress, EfiStatus> {
        unsafe { self.raw.allocate_pages(alloc_type, memory_type, pages, address) }
    }

    /// Frees pages obtained from [`allocate_pages`](Self::allocate_pages).
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND` or `INVALID_PARAMETER`.
    ///
    /// # Safety
    ///
    /// Nothing may reference the pages afterwards.
    pub unsafe fn free_pages(
        &self,
        address: EfiPhysicalAddress,
        pages: usize,
    ) -> Result<(), EfiStatus> {
        unsafe { self.raw.free_pages(address, pages) }
    }

    /// Size of the buffer needed for [`get_memory_map`](Self::get_memory_map), with room
    /// for `extra` more descriptors. The map can grow between the query and the call, and
    /// allocating the buffer itself adds entries.
    ///
    /// # Errors
    ///
    /// Returns the firmware status if the size query fails unexpectedly.
    pub fn memory_map_size(&self, extra: usize) -> Result<usize, EfiStatus> {
        let mut map_size = 0usize;
        let mut map_key = 0usize;
        let mut descriptor_size = 0usize;
        let mut descriptor_version = 0u32;
        let status = unsafe {
            (self.raw.get_memory_map)(
                &raw mut map_size,
                core::ptr::null_mut(),
                &raw mut map_key,
                &raw mut descriptor_size,
                &raw mut descriptor_version,
            )
        };
        match status {
            EfiStatus::BUFFER_TOO_SMALL | EfiStatus::SUCCESS => {
                let descriptor_size =
                    descriptor_size.max(core::mem::size_of::<EfiMemoryDescriptor>());
                Ok(map_size + extra * descriptor_size)
            }
            status => Err(status),
        }
    }

    /// Fills `buf` with the current memory map.
    ///
    /// # Errors
    ///
    /// Returns `BUFFER_TOO_SMALL` if `buf` cannot hold the map; see
    /// [`memory_map_size`](Self::memory_map_size).
    pub fn get_memory_map<'buf>(&self, buf: &'buf mut [u8]) -> Result<MemoryMap<'buf>, EfiStatus> {
        let (map_size, map_key, descriptor_size, descriptor_version) = self.fill_memory_map(buf)?;
        let buf: &'buf [u8] = buf;
        Ok(MemoryMap::new(&buf[..map_size], map_key, descriptor_size, descriptor_version))
    }

    /// Calls `GetMemoryMap` on `buf` and returns `(map_size, map_key, descriptor_size,
    /// descriptor_version)`. `map_size` never exceeds `buf.len()`.
    pub(crate) fn fill_memory_map(
        &self,
        buf: &mut [u8],
    ) -> Result<(usize, usize, usize, u32), EfiStatus> {
        let mut map_size = buf.len();
        let mut map_key = 0usize;
        let mut descriptor_size = 0usize;
        let mut descriptor_version = 0u32;
        let status = unsafe {
            (self.raw.get_memory_map)(
                &raw mut map_size,
                buf.as_mut_ptr().cast(),
                &raw mut map_key,
                &raw mut descriptor_size,
                &raw mut descriptor_version,
            )
        };
        status.to_result()?;
        if map_size > buf.len() {
            return Err(EfiStatus::BAD_BUFFER_SIZE);
        }
        Ok((map_size, map_key, descriptor_size, descriptor_version))
    }

    /// Busy-waits for at least `microseconds`.
    ///
    /// # Errors
    ///
    /// Returns the firmware status on failure.
    pub fn stall(&self, microseconds: usize) -> Result<(), EfiStatus> {
        unsafe { self.raw.stall(microseconds) }
    }

    /// Arms the watchdog for `timeout` seconds, or disarms it when `timeout` is zero.
    ///
    /// The firmware arms a five minute watchdog before starting a boot option; loaders that
    /// take longer should call `set_watchdog_timer(0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_PARAMETER` or `UNSUPPORTED`.
    pub fn set_watchdog_timer(&self, timeout: usize, watchdog_code: u64) -> Result<(), EfiStatus> {
        unsafe { self.raw.set_watchdog_timer(timeout, watchdog_code) }
    }
}

/// Number of pages needed to hold `bytes`.
#[must_use]
pub const fn pages_for(bytes: u64) -> u64 {
    bytes.div_ceil(PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_rounding() {
        assert_eq!(pages_for(0), 0);
        assert_eq!(pages_for(1), 1);
        assert_eq!(pages_for(4096), 1);
        assert_eq!(pages_for(4097), 2);
    }
}
