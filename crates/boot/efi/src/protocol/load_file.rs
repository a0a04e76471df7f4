//! Load File and Load File 2 protocols (UEFI 2.10 §13.1, §13.2).

use core::ffi::c_void;

use crate::{EfiGuid, EfiStatus};

use super::Protocol;
use super::device_path::DevicePathProtocol;

/// `EFI_LOAD_FILE`. With a null `buffer` (or a too small `buffer_size`) the firmware returns
/// `BUFFER_TOO_SMALL` and the required size.
pub type LoadFileFn = unsafe extern "efiapi" fn(
    this: *mut LoadFileProtocol,
    file_path: *mut DevicePathProtocol,
    boot_policy: bool,
    buffer_size: *mut usize,
    buffer: *mut c_void,
) -> EfiStatus;

/// The Load File Protocol (`EFI_LOAD_FILE_PROTOCOL`).
///
/// Load File 2 has the same layout; `boot_policy` must be `false` for it.
#[repr(C)]
pub struct LoadFileProtocol {
    /// Loads the file at `file_path` into `buffer`.
    pub load_file: LoadFileFn,
}

impl LoadFileProtocol {
    /// Returns the size of the file at `file_path`.
    ///
    /// # Errors
    ///
    /// Returns `NOT_FOUND`, `NO_MEDIA` or another firmware status if the file cannot be
    /// sized.
    ///
    /// # Safety
    ///
    /// `self` must be a live firmware instance and `file_path` a valid device path.
    pub unsafe fn file_size(
        &mut self,
        file_path: *mut DevicePathProtocol,
        boot_policy: bool,
    ) -> Result<usize, EfiStatus> {
        let mut size = 0usize;
        let status = unsafe {
            (self.load_file)(self, file_path, boot_policy, &raw mut size, core::ptr::null_mut())
        };
        match status {
            EfiStatus::BUFFER_TOO_SMALL => Ok(size),
            status => status.to_result_with(size),
        }
    }

    /// Loads the file into `buffer` and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `BUFFER_TOO_SMALL` if `buffer` cannot hold the file, or the firmware status.
    ///
    /// # Safety
    ///
    /// `self` must be a live firmware instance and `file_path` a valid device path.
    pub unsafe fn load(
        &mut self,
        file_path: *mut DevicePathProtocol,
        boot_policy: bool,
        buffer: &mut [u8],
    ) -> Result<usize, EfiStatus> {
        let mut size = buffer.len();
        let buffer = buffer.as_mut_ptr().cast();
        let status =
            unsafe { (self.load_file)(self, file_path, boot_policy, &raw mut size, buffer) };
        status.to_result_with(size)
    }
}

// SAFETY: matches `EFI_LOAD_FILE_PROTOCOL`.
unsafe impl Protocol for LoadFileProtocol {
    const GUID: EfiGuid = EfiGuid::LOAD_FILE_PROTOCOL;
}

/// The Load File 2 Protocol. Used for non-boot files such as PCI option ROMs and Linux
/// initrds.
#[repr(transparent)]
pub struct LoadFile2Protocol(pub LoadFileProtocol);

// SAFETY: `LoadFile2Protocol` is layout-identical to `EFI_LOAD_FILE2_PROTOCOL`.
unsafe impl Protocol for LoadFile2Protocol {
    const GUID: EfiGuid = EfiGuid::LOAD_FILE2_PROTOCOL;
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<LoadFileProtocol>() == core::mem::size_of::<usize>());
    assert!(core::mem::size_of::<LoadFile2Protocol>() == core::mem::size_of::<usize>());
};
