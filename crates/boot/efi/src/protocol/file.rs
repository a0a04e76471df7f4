//! Simple File System and File protocols (UEFI 2.10 §13.4, §13.5).
//!
//! `FileInfo` and `FileSystemInfo` end in a flexible UCS-2 array. Their Rust definitions
//! cover the fixed part only (the trailing field is zero-sized) and the firmware-filled
//! buffers are read through [`FileInfo::parse`] and [`FileSystemInfo::parse`], which copy
//! the fixed part out and borrow the name.

use core::ffi::c_void;

use bitflags::bitflags;

use crate::runtime::EfiTime;
use crate::ucs2::Ucs2Bytes;
use crate::{EfiEvent, EfiGuid, EfiStatus};

use super::Protocol;

// ── Simple File System ───────────────────────────────────────────────

/// `EFI_SIMPLE_FILE_SYSTEM_PROTOCOL_OPEN_VOLUME`
pub type OpenVolumeFn = unsafe extern "efiapi" fn(
    this: *mut SimpleFileSystemProtocol,
    root: *mut *mut FileProtocol,
) -> EfiStatus;

/// The Simple File System Protocol (`EFI_SIMPLE_FILE_SYSTEM_PROTOCOL`).
#[repr(C)]
pub struct SimpleFileSystemProtocol {
    /// [`SimpleFileSystemProtocol::REVISION`] or later.
    pub revision: u64,
    /// Opens the root directory of the volume.
    pub open_volume: OpenVolumeFn,
}

impl SimpleFileSystemProtocol {
    /// `EFI_SIMPLE_FILE_SYSTEM_PROTOCOL_REVISION`
    pub const REVISION: u64 = 0x0001_0000;
}

// SAFETY: matches `EFI_SIMPLE_FILE_SYSTEM_PROTOCOL`.
unsafe impl Protocol for SimpleFileSystemProtocol {
    const GUID: EfiGuid = EfiGuid::SIMPLE_FILE_SYSTEM_PROTOCOL;
}

// ── File ─────────────────────────────────────────────────────────────

/// Asynchronous I/O request for the `*_ex` file services (`EFI_FILE_IO_TOKEN`).
#[repr(C)]
#[derive(Debug)]
pub struct FileIoToken {
    /// Signaled on completion; null for a blocking request.
    pub event: EfiEvent,
    /// Completion status, written by the firmware.
    pub status: EfiStatus,
    /// Bytes to transfer, updated with the bytes transferred.
    pub buffer_size: usize,
    /// Data buffer.
    pub buffer: *mut c_void,
}

/// `EFI_FILE_OPEN`
pub type FileOpenFn = unsafe extern "efiapi" fn(
    this: *mut FileProtocol,
    new_handle: *mut *mut FileProtocol,
    file_name: *const u16,
    open_mode: FileMode,
    attributes: FileAttributes,
) -> EfiStatus;

/// `EFI_FILE_CLOSE`. Always succeeds.
pub type FileCloseFn = unsafe extern "efiapi" fn(this: *mut FileProtocol) -> EfiStatus;

/// `EFI_FILE_DELETE`. Closes the handle even on failure.
pub type FileDeleteFn = unsafe extern "efiapi" fn(this: *mut FileProtocol) -> EfiStatus;

/// `EFI_FILE_READ`. On a directory, reads one `FileInfo` entry per call.
pub type FileReadFn = unsafe extern "efiapi" fn(
    this: *mut FileProtocol,
    buffer_size: *mut usize,
    buffer: *mut c_void,
) -> EfiStatus;

/// `EFI_FILE_WRITE`
pub type FileWriteFn = unsafe extern "efiapi" fn(
    this: *mut FileProtocol,
    buffer_size: *mut usize,
    buffer: *const c_void,
) -> EfiStatus;

/// `EFI_FILE_GET_POSITION`
pub type FileGetPositionFn =
    unsafe extern "efiapi" fn(this: *mut FileProtocol, position: *mut u64) -> EfiStatus;

/// `EFI_FILE_SET_POSITION`. [`FileProtocol::END_OF_FILE`] seeks to the end.
pub type FileSetPositionFn =
    unsafe extern "efiapi" fn(this: *mut FileProtocol, position: u64) -> EfiStatus;

/// `EFI_FILE_GET_INFO`
pub type FileGetInfoFn = unsafe extern "efiapi" fn(
    this: *mut FileProtocol,
    information_type: *const EfiGuid,
    buffer_size: *mut usize,
    buffer: *mut c_void,
) -> EfiStatus;

/// `EFI_FILE_SET_INFO`
pub type FileSetInfoFn = unsafe extern "efiapi" fn(
    this: *mut FileProtocol,
    information_type: *const EfiGuid,
    buffer_size: usize,
    buffer: *const c_void,
) -> EfiStatus;

/// `EFI_FILE_FLUSH`
pub type FileFlushFn = unsafe extern "efiapi" fn(this: *mut FileProtocol) -> EfiStatus;

/// `EFI_FILE_OPEN_EX`
pub type FileOpenExFn = unsafe extern "efiapi" fn(
    this: *mut FileProtocol,
    new_handle: *mut *mut FileProtocol,
    file_name: *const u16,
    open_mode: FileMode,
    attributes: FileAttributes,
    token: *mut FileIoToken,
) -> EfiStatus;

/// `EFI_FILE_READ_EX`, `EFI_FILE_WRITE_EX` and `EFI_FILE_FLUSH_EX`.
pub type FileIoExFn =
    unsafe extern "efiapi" fn(this: *mut FileProtocol, token: *mut FileIoToken) -> EfiStatus;

/// The File Protocol (`EFI_FILE_PROTOCOL`), revision 2 layout.
///
/// The last four services exist only when `revision` is at least
/// [`FileProtocol::REVISION2`]; check [`FileProtocol::supports_ex`] before calling them.
#[repr(C)]
pub struct FileProtocol {
    /// [`FileProtocol::REVISION`] or [`FileProtocol::REVISION2`].
    pub revision: u64,
    /// Opens a file relative to this one.
    pub open: FileOpenFn,
    /// Closes the handle.
    pub close: FileCloseFn,
    /// Deletes the file and closes the handle.
    pub delete: FileDeleteFn,
    /// Reads file data or a directory entry.
    pub read: FileReadFn,
    /// Writes file data.
    pub write: FileWriteFn,
    /// Returns the current position.
    pub get_position: FileGetPositionFn,
    /// Sets the current position.
    pub set_position: FileSetPositionFn,
    /// Reads an information structure selected by GUID.
    pub get_info: FileGetInfoFn,
    /// Writes an information structure selected by GUID.
    pub set_info: FileSetInfoFn,
    /// Flushes modified data to the device.
    pub flush: FileFlushFn,
    /// Opens a file, optionally asynchronously.
    pub open_ex: FileOpenExFn,
    /// Reads, optionally asynchronously.
    pub read_ex: FileIoExFn,
    /// Writes, optionally asynchronously.
    pub write_ex: FileIoExFn,
    /// Flushes, optionally asynchronously.
    pub flush_ex: FileIoExFn,
}

impl FileProtocol {
    /// `EFI_FILE_PROTOCOL_REVISION`
    pub const REVISION: u64 = 0x0001_0000;
    /// `EFI_FILE_PROTOCOL_REVISION2`
    pub const REVISION2: u64 = 0x0002_0000;
    /// `EFI_FILE_PROTOCOL_LATEST_REVISION`
    pub const LATEST_REVISION: u64 = Self::REVISION2;
    /// Position that `set_position` maps to the end of the file.
    pub const END_OF_FILE: u64 = u64::MAX;

    /// Returns `true` if the asynchronous `*_ex` services are present.
    #[must_use]
    pub const fn supports_ex(&self) -> bool {
        self.revision >= Self::REVISION2
    }
}

bitflags! {
    /// Open mode for `open`. Valid combinations are `READ`, `READ | WRITE` and
    /// `READ | WRITE | CREATE`.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FileMode: u64 {
        /// Open for reading.
        const READ = 0x0000_0000_0000_0001;
        /// Open for writing.
        const WRITE = 0x0000_0000_0000_0002;
        /// Create the file if it does not exist.
        const CREATE = 0x8000_0000_0000_0000;
    }
}

bitflags! {
    /// File attributes, used when creating a file and in [`FileInfo::attribute`].
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FileAttributes: u64 {
        /// Read-only.
        const READ_ONLY = 0x0000_0000_0000_0001;
        /// Hidden.
        const HIDDEN = 0x0000_0000_0000_0002;
        /// System file.
        const SYSTEM = 0x0000_0000_0000_0004;
        /// Reserved.
        const RESERVED = 0x0000_0000_0000_0008;
        /// Directory.
        const DIRECTORY = 0x0000_0000_0000_0010;
        /// Archive.
        const ARCHIVE = 0x0000_0000_0000_0020;
        /// Every defined attribute bit.
        const VALID_ATTR = 0x0000_0000_0000_0037;
    }
}

// ── Information structures ───────────────────────────────────────────

/// Fixed part of `EFI_FILE_INFO`. The NUL-terminated file name follows at
/// [`FileInfo::FILE_NAME_OFFSET`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FileInfo {
    /// Size of the whole structure, name included.
    pub size: u64,
    /// File size in bytes.
    pub file_size: u64,
    /// Bytes allocated on the volume.
    pub physical_size: u64,
    /// Creation time.
    pub create_time: EfiTime,
    /// Last access time.
    pub last_access_time: EfiTime,
    /// Last modification time.
    pub modification_time: EfiTime,
    /// Raw [`FileAttributes`] bits.
    pub attribute: u64,
    /// Start of the file name.
    pub file_name: [u16; 0],
}

impl FileInfo {
    /// Offset of the file name.
    pub const FILE_NAME_OFFSET: usize = core::mem::offset_of!(FileInfo, file_name);

    /// The attributes as flags, keeping unknown bits.
    #[must_use]
    pub const fn attributes(&self) -> FileAttributes {
        FileAttributes::from_bits_retain(self.attribute)
    }

    /// Returns `true` for a directory.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.attributes().contains(FileAttributes::DIRECTORY)
    }

    /// Reads a `GetInfo(FILE_INFO)` or directory `Read` result.
    ///
    /// The name is bounded by both `size` and the buffer length, and stops at the first NUL.
    /// Returns `None` if the buffer is shorter than the fixed part.
    #[must_use]
    pub fn parse(buffer: &[u8]) -> Option<(Self, Ucs2Bytes<'_>)> {
        let fixed = buffer.get(..Self::FILE_NAME_OFFSET)?;
        // SAFETY: `fixed` covers `size_of::<FileInfo>()` bytes and every bit pattern is valid.
        let info = unsafe { fixed.as_ptr().cast::<Self>().read_unaligned() };
        let end = usize::try_from(info.size).map_or(buffer.len(), |s| s.min(buffer.len()));
        let name = buffer.get(Self::FILE_NAME_OFFSET..end).unwrap_or(&[]);
        Some((info, Ucs2Bytes::until_nul(name)))
    }
}

/// Fixed part of `EFI_FILE_SYSTEM_INFO`. The volume label follows at
/// [`FileSystemInfo::VOLUME_LABEL_OFFSET`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemInfo {
    /// Size of the whole structure, label included.
    pub size: u64,
    /// `true` if the volume only allows reads.
    pub read_only: bool,
    /// Volume size in bytes.
    pub volume_size: u64,
    /// Free bytes on the volume.
    pub free_space: u64,
    /// Nominal block size.
    pub block_size: u32,
    /// Start of the volume label.
    pub volume_label: [u16; 0],
}

impl FileSystemInfo {
    /// Offset of the volume label.
    pub const VOLUME_LABEL_OFFSET: usize = core::mem::offset_of!(FileSystemInfo, volume_label);

    /// Reads a `GetInfo(FILE_SYSTEM_INFO)` result. Returns `None` if the buffer is shorter
    /// than the fixed part.
    #[must_use]
    pub fn parse(buffer: &[u8]) -> Option<(Self, Ucs2Bytes<'_>)> {
        let fixed = buffer.get(..Self::VOLUME_LABEL_OFFSET)?;
        let u64_at = |at: usize| fixed[at..at + 8].try_into().ok().map(u64::from_le_bytes);
        // Fields are decoded one by one so a `read_only` byte other than 0 or 1 never
        // becomes a `bool`.
        let info = Self {
            size: u64_at(0)?,
            read_only: fixed[8] != 0,
            volume_size: u64_at(16)?,
            free_space: u64_at(24)?,
            block_size: u32::from_le_bytes(fixed[32..36].try_into().ok()?),
            volume_label: [],
        };
        let end = usize::try_from(info.size).map_or(buffer.len(), |s| s.min(buffer.len()));
        let label = buffer.get(Self::VOLUME_LABEL_OFFSET..end).unwrap_or(&[]);
        Some((info, Ucs2Bytes::until_nul(label)))
    }
}

/// `EFI_FILE_SYSTEM_VOLUME_LABEL`: a NUL-terminated UCS-2 label and nothing else.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FileSystemVolumeLabel {
    /// First unit of the label.
    pub volume_label: [u16; 1],
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<FileInfo>() == 80);
    assert!(core::mem::offset_of!(FileInfo, create_time) == 24);
    assert!(core::mem::offset_of!(FileInfo, last_access_time) == 40);
    assert!(core::mem::offset_of!(FileInfo, modification_time) == 56);
    assert!(core::mem::offset_of!(FileInfo, attribute) == 72);
    assert!(FileInfo::FILE_NAME_OFFSET == 80);

    assert!(core::mem::offset_of!(FileSystemInfo, read_only) == 8);
    assert!(core::mem::offset_of!(FileSystemInfo, volume_size) == 16);
    assert!(core::mem::offset_of!(FileSystemInfo, free_space) == 24);
    assert!(core::mem::offset_of!(FileSystemInfo, block_size) == 32);
    assert!(FileSystemInfo::VOLUME_LABEL_OFFSET == 36);
    assert!(core::mem::size_of::<FileSystemInfo>() == 40);

    assert!(core::mem::size_of::<FileSystemVolumeLabel>() == 2);
    assert!(core::mem::size_of::<FileMode>() == 8);
    assert!(core::mem::size_of::<FileAttributes>() == 8);
};

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(core::mem::size_of::<SimpleFileSystemProtocol>() == 16);
    assert!(core::mem::size_of::<FileIoToken>() == 32);

    assert!(core::mem::size_of::<FileProtocol>() == 120);
    assert!(core::mem::offset_of!(FileProtocol, open) == 8);
    assert!(core::mem::offset_of!(FileProtocol, read) == 32);
    assert!(core::mem::offset_of!(FileProtocol, get_info) == 64);
    assert!(core::mem::offset_of!(FileProtocol, flush) == 80);
    assert!(core::mem::offset_of!(FileProtocol, open_ex) == 88);
    assert!(core::mem::offset_of!(FileProtocol, flush_ex) == 112);
};

#[cfg(target_pointer_width = "32")]
const _: () = {
    assert!(core::mem::size_of::<SimpleFileSystemProtocol>() == 12);
    assert!(core::mem::size_of::<FileIoToken>() == 16);
    assert!(core::mem::size_of::<FileProtocol>() == 64);
};

#[cfg(test)]
mod tests {
    use super::*;

    fn file_info_bytes(name: &str, file_size: u64, attribute: u64) -> Vec<u8> {
        let name: Vec<u8> = name
            .encode_utf16()
            .chain(core::iter::once(0))
            .flat_map(u16::to_le_bytes)
            .collect();
        let size = (FileInfo::FILE_NAME_OFFSET + name.len()) as u64;
        let mut buf = vec![0u8; FileInfo::FILE_NAME_OFFSET];
        buf[0..8].copy_from_slice(&size.to_le_bytes());
        buf[8..16].copy_from_slice(&file_size.to_le_bytes());
        buf[16..24].copy_from_slice(&4096u64.to_le_bytes());
        buf[72..80].copy_from_slice(&attribute.to_le_bytes());
        buf.extend_from_slice(&name);
        buf
    }

    #[test]
    fn mode_and_attribute_values() {
        assert_eq!(FileMode::READ.bits(), 1);
        assert_eq!(FileMode::WRITE.bits(), 2);
        assert_eq!(FileMode::CREATE.bits(), 1 << 63);
        assert_eq!(FileAttributes::DIRECTORY.bits(), 0x10);
        assert_eq!(FileAttributes::ARCHIVE.bits(), 0x20);
        assert_eq!(FileAttributes::VALID_ATTR.bits(), 0x37);
        assert!(!FileAttributes::VALID_ATTR.contains(FileAttributes::RESERVED));
    }

    #[test]
    fn parse_file_info() {
        let buf = file_info_bytes("kernel.elf", 1234, 0x20);
        let (info, name) = FileInfo::parse(&buf).unwrap();
        assert_eq!(info.file_size, 1234);
        assert_eq!(info.physical_size, 4096);
        assert_eq!(info.attributes(), FileAttributes::ARCHIVE);
        assert!(!info.is_directory());
        assert_eq!(name.to_string(), "kernel.elf");
    }

    #[test]
    fn parse_file_info_unaligned_and_short() {
        let buf = file_info_bytes("EFI", 0, 0x10);
        let mut shifted = vec![0xEE];
        shifted.extend_from_slice(&buf);
        let (info, name) = FileInfo::parse(&shifted[1..]).unwrap();
        assert!(info.is_directory());
        assert_eq!(name.to_string(), "EFI");

        assert!(FileInfo::parse(&buf[..79]).is_none());
        // Name truncated by the buffer, not by `size`.
        let (_, name) = FileInfo::parse(&buf[..84]).unwrap();
        assert_eq!(name.to_string(), "EF");
    }

    #[test]
    fn parse_file_system_info() {
        let mut buf = vec![0u8; FileSystemInfo::VOLUME_LABEL_OFFSET];
        let label: Vec<u8> = "ESP\0".encode_utf16().flat_map(u16::to_le_bytes).collect();
        let size = (buf.len() + label.len()) as u64;
        buf[0..8].copy_from_slice(&size.to_le_bytes());
        buf[8] = 1;
        buf[16..24].copy_from_slice(&(64u64 << 20).to_le_bytes());
        buf[24..32].copy_from_slice(&(10u64 << 20).to_le_bytes());
        buf[32..36].copy_from_slice(&512u32.to_le_bytes());
        buf.extend_from_slice(&label);

        let (info, label) = FileSystemInfo::parse(&buf).unwrap();
        assert!(info.read_only);
        assert_eq!(info.volume_size, 64 << 20);
        assert_eq!(info.free_space, 10 << 20);
        assert_eq!(info.block_size, 512);
        assert_eq!(label.to_string(), "ESP");
    }

    #[test]
    fn ex_services_need_revision2() {
        assert_eq!(FileProtocol::LATEST_REVISION, 0x0002_0000);
        assert!(FileProtocol::REVISION < FileProtocol::REVISION2);
    }
}
