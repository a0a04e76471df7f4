//! Loaded Image Protocol (UEFI 2.10 §9.1).
//!
//! Installed by the firmware on every image handle. Describes where the image came from,
//! where it sits in memory and which load options it was started with.

use core::ffi::c_void;

use crate::boot::UnloadImageFn;
use crate::memory::EfiMemoryType;
use crate::table::SystemTable;
use crate::{EfiGuid, EfiHandle};

use super::Protocol;
use super::device_path::DevicePathProtocol;

/// The Loaded Image Protocol (`EFI_LOADED_IMAGE_PROTOCOL`).
#[repr(C)]
pub struct LoadedImageProtocol {
    /// [`LoadedImageProtocol::REVISION`].
    pub revision: u32,
    /// Handle of the image that loaded this one, or null for firmware-loaded images.
    pub parent_handle: EfiHandle,
    /// The system table passed to the image.
    pub system_table: *mut SystemTable,

    // Source location
    /// Device the image was loaded from.
    pub device_handle: EfiHandle,
    /// File path of the image, relative to `device_handle`.
    pub file_path: *mut DevicePathProtocol,
    /// Must be null.
    pub reserved: *mut c_void,

    // Load options
    /// Size of `load_options` in bytes.
    pub load_options_size: u32,
    /// Load options, usually a UCS-2 command line.
    pub load_options: *mut c_void,

    // Location in memory
    /// Base address of the image.
    pub image_base: *mut c_void,
    /// Size of the image in bytes.
    pub image_size: u64,
    /// Memory type of the code sections.
    pub image_code_type: EfiMemoryType,
    /// Memory type of the data sections.
    pub image_data_type: EfiMemoryType,
    /// Unload handler, if the image supports unloading.
    pub unload: Option<UnloadImageFn>,
}

impl LoadedImageProtocol {
    /// `EFI_LOADED_IMAGE_PROTOCOL_REVISION`
    pub const REVISION: u32 = 0x1000;

    /// The load options as bytes.
    ///
    /// # Safety
    ///
    /// `load_options` must be null or point to `load_options_size` readable bytes that
    /// outlive `self`.
    #[must_use]
    pub unsafe fn load_options(&self) -> &[u8] {
        if self.load_options.is_null() || self.load_options_size == 0 {
            return &[];
        }
        unsafe {
            core::slice::from_raw_parts(
                self.load_options.cast::<u8>(),
                self.load_options_size as usize,
            )
        }
    }

    /// The memory range the image occupies, as `(base, size)`.
    #[must_use]
    pub fn image_range(&self) -> (u64, u64) {
        (self.image_base as u64, self.image_size)
    }
}

// SAFETY: matches `EFI_LOADED_IMAGE_PROTOCOL`.
unsafe impl Protocol for LoadedImageProtocol {
    const GUID: EfiGuid = EfiGuid::LOADED_IMAGE_PROTOCOL;
}

// ── Compile-time layout assertions ──────────────────────────────────

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(core::mem::size_of::<LoadedImageProtocol>() == 96);
    // 4 bytes of padding after `revision` and after `load_options_size`
    assert!(core::mem::offset_of!(LoadedImageProtocol, revision) == 0);
    assert!(core::mem::offset_of!(LoadedImageProtocol, parent_handle) == 8);
    assert!(core::mem::offset_of!(LoadedImageProtocol, system_table) == 16);
    assert!(core::mem::offset_of!(LoadedImageProtocol, device_handle) == 24);
    assert!(core::mem::offset_of!(LoadedImageProtocol, file_path) == 32);
    assert!(core::mem::offset_of!(LoadedImageProtocol, reserved) == 40);
    assert!(core::mem::offset_of!(LoadedImageProtocol, load_options_size) == 48);
    assert!(core::mem::offset_of!(LoadedImageProtocol, load_options) == 56);
    assert!(core::mem::offset_of!(LoadedImageProtocol, image_base) == 64);
    assert!(core::mem::offset_of!(LoadedImageProtocol, image_size) == 72);
    assert!(core::mem::offset_of!(LoadedImageProtocol, image_code_type) == 80);
    assert!(core::mem::offset_of!(LoadedImageProtocol, image_data_type) == 84);
    assert!(core::mem::offset_of!(LoadedImageProtocol, unload) == 88);
};

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_image(options: &mut [u8]) -> LoadedImageProtocol {
        LoadedImageProtocol {
            revision: LoadedImageProtocol::REVISION,
            parent_handle: core::ptr::null_mut(),
            system_table: core::ptr::null_mut(),
            device_handle: core::ptr::null_mut(),
            file_path: core::ptr::null_mut(),
            reserved: core::ptr::null_mut(),
            load_options_size: u32::try_from(options.len()).unwrap(),
            load_options: options.as_mut_ptr().cast(),
            image_base: 0x10_0000 as *mut c_void,
            image_size: 0x2000,
            image_code_type: EfiMemoryType::LOADER_CODE,
            image_data_type: EfiMemoryType::LOADER_DATA,
            unload: None,
        }
    }

    #[test]
    fn load_options_slice() {
        let mut options: Vec<u8> = "quiet\0".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let image = loaded_image(&mut options);
        assert_eq!(unsafe { image.load_options() }.len(), 12);
        assert_eq!(image.image_range(), (0x10_0000, 0x2000));

        let image = loaded_image(&mut []);
        assert!(unsafe { image.load_options() }.is_empty());
    }
}
