//! File system wrappers.

use core::ffi::c_void;
use core::marker::PhantomData;

use crate::protocol::file::{
    FileAttributes, FileInfo, FileMode, FileProtocol, FileSystemInfo, SimpleFileSystemProtocol,
};
use crate::ucs2::{self, Ucs2Bytes};
use crate::{EfiGuid, EfiStatus};

/// Longest path accepted by [`File::open`], terminator included.
const MAX_PATH: usize = 256;

/// Safe wrapper around a Simple File System Protocol instance.
pub struct FileSystem<'st> {
    raw: *mut SimpleFileSystemProtocol,
    _lifetime: PhantomData<&'st ()>,
}

impl<'st> FileSystem<'st> {
    /// Wraps a protocol reference obtained from boot services.
    pub fn new(raw: &'st mut SimpleFileSystemProtocol) -> Self {
        Self {
            raw,
            _lifetime: PhantomData,
        }
    }

    /// Opens the root directory of the volume.
    ///
    /// # Errors
    ///
    /// Returns `NO_MEDIA`, `MEDIA_CHANGED`, `VOLUME_CORRUPTED` or another firmware status.
    pub fn open_volume(&self) -> Result<File<'st>, EfiStatus> {
        let mut root: *mut FileProtocol = core::ptr::null_mut();
        unsafe { ((*self.raw).open_volume)(self.raw, &raw mut root) }.to_result()?;
        File::from_raw(root)
    }
}

/// An open file or directory. Closed on drop.
pub struct File<'st> {
    raw: *mut FileProtocol,
    _lifetime: PhantomData<&'st ()>,
}

impl<'st> File<'st> {
    fn from_raw(raw: *mut FileProtocol) -> Result<Self, EfiStatus> {
        if raw.is_null() {
            return Err(EfiStatus::NOT_FOUND);
        }
        Ok(Self {
            raw,
            _lifetime: PhantomData,
        })
    }

    /// Opens `name` relative to this directory.
    ///
    /// `name` uses `\` as separator and may not exceed 255 characters. `attributes` only
    /// matter with [`FileMode::CREATE`].
    ///
    /// # Errors
    ///
    /// Returns `BUFFER_TOO_SMALL` for an overlong name, `NOT_FOUND` if the file does not
    /// exist, or another firmware status.
    pub fn open(
        &self,
        name: &str,
        mode: FileMode,
        attributes: FileAttributes,
    ) -> Result<File<'st>, EfiStatus> {
        let mut path = [0u16; MAX_PATH];
        ucs2::encode_into(name, &mut path)?;

        let mut handle: *mut FileProtocol = core::ptr::null_mut();
        let status = unsafe {
            ((*self.raw).open)(self.raw, &raw mut handle, path.as_ptr(), mode, attributes)
        };
        status.to_result()?;
        File::from_raw(handle)
    }

    /// Reads into `buf` from the current position and returns the number of bytes read.
    /// Zero means end of file.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR`, `VOLUME_CORRUPTED`, or `BUFFER_TOO_SMALL` when reading a
    /// directory entry into a buffer that is too small.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, EfiStatus> {
        let mut size = buf.len();
        let status =
            unsafe { ((*self.raw).read)(self.raw, &raw mut size, buf.as_mut_ptr().cast()) };
        status.to_result_with(size)
    }

    /// Reads until `buf` is full or the file ends. Returns the number of bytes read.
    ///
    /// # Errors
    ///
    /// Returns the first failing read status.
    pub fn read_all(&mut self, buf: &mut [u8]) -> Result<usize, EfiStatus> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    /// Reads the next directory entry. Returns `None` once every entry has been read.
    ///
    /// # Errors
    ///
    /// Returns `BUFFER_TOO_SMALL` if `buf` cannot hold the entry, or another read status.
    pub fn read_entry<'buf>(
        &mut self,
        buf: &'buf mut [u8],
    ) -> Result<Option<(FileInfo, Ucs2Bytes<'buf>)>, EfiStatus> {
        let size = self.read(buf)?;
        if size == 0 {
            return Ok(None);
        }
        let buf: &'buf [u8] = buf;
        FileInfo::parse(&buf[..size]).map(Some).ok_or(EfiStatus::VOLUME_CORRUPTED)
    }

    /// Writes `data` at the current position and returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns `WRITE_PROTECTED`, `ACCESS_DENIED`, `VOLUME_FULL` or another firmware status.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, EfiStatus> {
        let mut size = data.len();
        let status = unsafe { ((*self.raw).write)(self.raw, &raw mut size, data.as_ptr().cast()) };
        status.to_result_with(size)
    }

    /// Returns the current position.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` for a directory.
    pub fn position(&self) -> Result<u64, EfiStatus> {
        let mut position = 0u64;
        unsafe { ((*self.raw).get_position)(self.raw, &raw mut position) }.to_result_with(position)
    }

    /// Moves to `position`. [`FileProtocol::END_OF_FILE`] moves to the end; on a directory
    /// only zero is accepted and restarts the listing.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` for a nonzero position on a directory.
    pub fn set_position(&mut self, position: u64) -> Result<(), EfiStatus> {
        unsafe { ((*self.raw).set_position)(self.raw, position) }.to_result()
    }

    /// Size of the information structure selected by `information_type`.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` for an unknown information type.
    pub fn info_size(&self, information_type: &EfiGuid) -> Result<usize, EfiStatus> {
        let mut size = 0usize;
        let status = unsafe {
            ((*self.raw).get_info)(self.raw, information_type, &raw mut size, core::ptr::null_mut())
        };
        match status {
            EfiStatus::BUFFER_TOO_SMALL => Ok(size),
            status => status.to_result_with(size),
        }
    }

    /// Reads the information structure selected by `information_type` into `buf` and
    /// returns its size.
    ///
    /// # Errors
    ///
    /// Returns `BUFFER_TOO_SMALL` if `buf` is too small (see [`info_size`](Self::info_size))
    /// or `UNSUPPORTED` for an unknown information type.
    pub fn get_info(&self, information_type: &EfiGuid, buf: &mut [u8]) -> Result<usize, EfiStatus> {
        let mut size = buf.len();
        let status = unsafe {
            ((*self.raw).get_info)(
                self.raw,
                information_type,
                &raw mut size,
                buf.as_mut_ptr().cast::<c_void>(),
            )
        };
        status.to_result_with(size)
    }

    /// Reads the [`FileInfo`] of this file. The name borrows from `buf`.
    ///
    /// # Errors
    ///
    /// Returns `BUFFER_TOO_SMALL` if `buf` is too small, or `VOLUME_CORRUPTED` if the
    /// firmware returned less than the fixed part of the structure.
    pub fn info<'buf>(
        &self,
        buf: &'buf mut [u8],
    ) -> Result<(FileInfo, Ucs2Bytes<'buf>), EfiStatus> {
        let size = self.get_info(&EfiGuid::FILE_INFO, buf)?;
        let buf: &'buf [u8] = buf;
        FileInfo::parse(&buf[..size.min(buf.len())]).ok_or(EfiStatus::VOLUME_CORRUPTED)
    }

    /// Reads the [`FileSystemInfo`] of the volume holding this file. The label borrows
    /// from `buf`.
    ///
    /// # Errors
    ///
    /// Returns `BUFFER_TOO_SMALL` if `buf` is too small, or `VOLUME_CORRUPTED` if the
    /// firmware returned less than the fixed part of the structure.
    pub fn volume_info<'buf>(
        &self,
        buf: &'buf mut [u8],
    ) -> Result<(FileSystemInfo, Ucs2Bytes<'buf>), EfiStatus> {
        let size = self.get_info(&EfiGuid::FILE_SYSTEM_INFO, buf)?;
        let buf: &'buf [u8] = buf;
        FileSystemInfo::parse(&buf[..size.min(buf.len())]).ok_or(EfiStatus::VOLUME_CORRUPTED)
    }

    /// File size in bytes, read through a stack buffer. Fails with `BUFFER_TOO_SMALL` for
    /// names longer than the buffer allows.
    ///
    /// # Errors
    ///
    /// Returns the `get_info` status.
    pub fn file_size(&self) -> Result<u64, EfiStatus> {
        let mut buf = [0u8; FileInfo::FILE_NAME_OFFSET + 2 * MAX_PATH];
        self.info(&mut buf).map(|(info, _)| info.file_size)
    }

    /// Writes buffered data to the device.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR`, `WRITE_PROTECTED`, `VOLUME_FULL` or another firmware status.
    pub fn flush(&mut self) -> Result<(), EfiStatus> {
        unsafe { ((*self.raw).flush)(self.raw) }.to_result()
    }

    /// Deletes the file and closes the handle.
    ///
    /// # Errors
    ///
    /// Returns `WARN_DELETE_FAILURE` if the firmware closed the handle without deleting the
    /// file.
    pub fn delete(self) -> Result<(), EfiStatus> {
        let raw = self.raw;
        // `Delete` closes the handle whatever the outcome.
        core::mem::forget(self);
        match unsafe { ((*raw).delete)(raw) } {
            EfiStatus::WARN_DELETE_FAILURE => Err(EfiStatus::WARN_DELETE_FAILURE),
            status => status.to_result(),
        }
    }

    /// Returns the underlying protocol pointer.
    #[must_use]
    pub fn as_raw(&self) -> *mut FileProtocol {
        self.raw
    }
}

impl Drop for File<'_> {
    fn drop(&mut self) {
        let status = unsafe { ((*self.raw).close)(self.raw) };
        if status.is_error() {
            log::warn!("efi: closing file handle failed: {status}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::protocol::file::FileIoToken;

    std::thread_local! {
        static CLOSED: Cell<usize> = const { Cell::new(0) };
        static DELETED: Cell<usize> = const { Cell::new(0) };
    }

    /// A file held in memory; `proto` comes first so `*mut FileProtocol` casts back to it.
    #[repr(C)]
    struct FakeFile {
        proto: FileProtocol,
        name: String,
        directory: bool,
        data: Vec<u8>,
        position: u64,
    }

    fn fake(this: *mut FileProtocol) -> &'static mut FakeFile {
        unsafe { &mut *this.cast::<FakeFile>() }
    }

    fn new_file(name: &str, directory: bool, data: &[u8]) -> *mut FileProtocol {
        let file = Box::new(FakeFile {
            proto: FileProtocol {
                revision: FileProtocol::REVISION,
                open,
                close,
                delete,
                read,
                write,
                get_position,
                set_position,
                get_info,
                set_info,
                flush,
                open_ex,
                read_ex: io_ex,
                write_ex: io_ex,
                flush_ex: io_ex,
            },
            name: name.to_owned(),
            directory,
            data: data.to_vec(),
            position: 0,
        });
        Box::into_raw(file).cast()
    }

    fn info_bytes(file: &FakeFile) -> Vec<u8> {
        let name: Vec<u8> =
            file.name.encode_utf16().chain([0]).flat_map(u16::to_le_bytes).collect();
        let info = FileInfo {
            size: (FileInfo::FILE_NAME_OFFSET + name.len()) as u64,
            file_size: file.data.len() as u64,
            physical_size: 4096,
            attribute: if file.directory { FileAttributes::DIRECTORY.bits() } else { 0 },
            ..FileInfo::default()
        };
        let mut bytes = vec![0u8; FileInfo::FILE_NAME_OFFSET];
        unsafe { bytes.as_mut_ptr().cast::<FileInfo>().write_unaligned(info) };
        bytes.extend_from_slice(&name);
        bytes
    }

    unsafe extern "efiapi" fn open(
        _: *mut FileProtocol,
        new_handle: *mut *mut FileProtocol,
        file_name: *const u16,
        mode: FileMode,
        _: FileAttributes,
    ) -> EfiStatus {
        let name: String = ucs2::decode(unsafe { ucs2::from_ptr(file_name) }).collect();
        if name == "missing" && !mode.contains(FileMode::CREATE) {
            return EfiStatus::NOT_FOUND;
        }
        let data = if name == "missing" { Vec::new() } else { name.repeat(3).into_bytes() };
        unsafe { *new_handle = new_file(&name, name.ends_with('\\'), &data) };
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn close(this: *mut FileProtocol) -> EfiStatus {
        CLOSED.with(|c| c.set(c.get() + 1));
        drop(unsafe { Box::from_raw(this.cast::<FakeFile>()) });
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn delete(this: *mut FileProtocol) -> EfiStatus {
        let read_only = fake(this).name.starts_with("ro");
        drop(unsafe { Box::from_raw(this.cast::<FakeFile>()) });
        if read_only {
            return EfiStatus::WARN_DELETE_FAILURE;
        }
        DELETED.with(|c| c.set(c.get() + 1));
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn read(
        this: *mut FileProtocol,
        size: *mut usize,
        buffer: *mut c_void,
    ) -> EfiStatus {
        let file = fake(this);
        let chunk = if file.directory {
            // One entry: the directory itself, then end of listing.
            if file.position > 0 {
                Vec::new()
            } else {
                info_bytes(file)
            }
        } else {
            let start = (file.position as usize).min(file.data.len());
            let end = (start + unsafe { *size }).min(file.data.len());
            file.data[start..end].to_vec()
        };
        if file.directory && chunk.len() > unsafe { *size } {
            unsafe { *size = chunk.len() };
            return EfiStatus::BUFFER_TOO_SMALL;
        }
        unsafe {
            core::ptr::copy_nonoverlapping(chunk.as_ptr(), buffer.cast(), chunk.len());
            *size = chunk.len();
        }
        file.position += if file.directory { 1 } else { chunk.len() as u64 };
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn write(
        this: *mut FileProtocol,
        size: *mut usize,
        buffer: *const c_void,
    ) -> EfiStatus {
        let file = fake(this);
        if file.name.starts_with("ro") {
            return EfiStatus::WRITE_PROTECTED;
        }
        let data = unsafe { core::slice::from_raw_parts(buffer.cast::<u8>(), *size) };
        let start = file.position as usize;
        if file.data.len() < start + data.len() {
            file.data.resize(start + data.len(), 0);
        }
        file.data[start..start + data.len()].copy_from_slice(data);
        file.position += data.len() as u64;
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn get_position(
        this: *mut FileProtocol,
        position: *mut u64,
    ) -> EfiStatus {
        let file = fake(this);
        if file.directory {
            return EfiStatus::UNSUPPORTED;
        }
        unsafe { *position = file.position };
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn set_position(this: *mut FileProtocol, position: u64) -> EfiStatus {
        let file = fake(this);
        file.position = if position == FileProtocol::END_OF_FILE {
            file.data.len() as u64
        } else {
            position
        };
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn get_info(
        this: *mut FileProtocol,
        information_type: *const EfiGuid,
        size: *mut usize,
        buffer: *mut c_void,
    ) -> EfiStatus {
        if unsafe { *information_type } != EfiGuid::FILE_INFO {
            return EfiStatus::UNSUPPORTED;
        }
        let bytes = info_bytes(fake(this));
        if unsafe { *size } < bytes.len() {
            unsafe { *size = bytes.len() };
            return EfiStatus::BUFFER_TOO_SMALL;
        }
        unsafe {
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer.cast(), bytes.len());
            *size = bytes.len();
        }
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn set_info(
        _: *mut FileProtocol,
        _: *const EfiGuid,
        _: usize,
        _: *const c_void,
    ) -> EfiStatus {
        EfiStatus::UNSUPPORTED
    }

    unsafe extern "efiapi" fn flush(_: *mut FileProtocol) -> EfiStatus {
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn open_ex(
        _: *mut FileProtocol,
        _: *mut *mut FileProtocol,
        _: *const u16,
        _: FileMode,
        _: FileAttributes,
        _: *mut FileIoToken,
    ) -> EfiStatus {
        EfiStatus::UNSUPPORTED
    }

    unsafe extern "efiapi" fn io_ex(_: *mut FileProtocol, _: *mut FileIoToken) -> EfiStatus {
        EfiStatus::UNSUPPORTED
    }

    unsafe extern "efiapi" fn open_volume(
        _: *mut SimpleFileSystemProtocol,
        root: *mut *mut FileProtocol,
    ) -> EfiStatus {
        unsafe { *root = new_file("\\", true, &[]) };
        EfiStatus::SUCCESS
    }

    fn closed() -> usize {
        CLOSED.with(Cell::get)
    }

    fn file_system() -> SimpleFileSystemProtocol {
        SimpleFileSystemProtocol {
            revision: SimpleFileSystemProtocol::REVISION,
            open_volume,
        }
    }

    #[test]
    fn open_read_and_close_on_drop() {
        let mut raw = file_system();
        let fs = FileSystem::new(&mut raw);
        let before = closed();
        {
            let root = fs.open_volume().unwrap();
            let mut file = root.open("abc", FileMode::READ, FileAttributes::empty()).unwrap();
            let mut buf = [0u8; 4];
            assert_eq!(file.read(&mut buf).unwrap(), 4);
            assert_eq!(&buf, b"abca");
            assert_eq!(file.position().unwrap(), 4);

            let mut rest = [0u8; 16];
            assert_eq!(file.read_all(&mut rest).unwrap(), 5);
            assert_eq!(&rest[..5], b"bcabc");
            assert_eq!(file.read(&mut rest).unwrap(), 0);
        }
        assert_eq!(closed() - before, 2);
    }

    #[test]
    fn missing_file_is_not_found() {
        let mut raw = file_system();
        let root = FileSystem::new(&mut raw).open_volume().unwrap();
        let err = root.open("missing", FileMode::READ, FileAttributes::empty()).err();
        assert_eq!(err, Some(EfiStatus::NOT_FOUND));

        let long = "x".repeat(MAX_PATH);
        let err = root.open(&long, FileMode::READ, FileAttributes::empty()).err();
        assert_eq!(err, Some(EfiStatus::BUFFER_TOO_SMALL));
    }

    #[test]
    fn write_seek_and_info() {
        let mut raw = file_system();
        let root = FileSystem::new(&mut raw).open_volume().unwrap();
        let mode = FileMode::READ | FileMode::WRITE | FileMode::CREATE;
        let mut file = root.open("missing", mode, FileAttributes::ARCHIVE).unwrap();

        assert_eq!(file.write(b"hello").unwrap(), 5);
        file.set_position(FileProtocol::END_OF_FILE).unwrap();
        assert_eq!(file.write(b"!").unwrap(), 1);
        file.flush().unwrap();
        assert_eq!(file.file_size().unwrap(), 6);

        let needed = file.info_size(&EfiGuid::FILE_INFO).unwrap();
        assert_eq!(needed, FileInfo::FILE_NAME_OFFSET + 16);
        let mut small = [0u8; 8];
        assert_eq!(file.info(&mut small).err(), Some(EfiStatus::BUFFER_TOO_SMALL));

        let mut buf = vec![0u8; needed];
        let (info, name) = file.info(&mut buf).unwrap();
        assert_eq!(info.file_size, 6);
        assert_eq!(name.to_string(), "missing");

        let mut buf = [0u8; 128];
        assert_eq!(file.volume_info(&mut buf).err(), Some(EfiStatus::UNSUPPORTED));
    }

    #[test]
    fn directory_entries() {
        let mut raw = file_system();
        let mut root = FileSystem::new(&mut raw).open_volume().unwrap();
        assert_eq!(root.position(), Err(EfiStatus::UNSUPPORTED));

        let mut small = [0u8; 16];
        assert_eq!(root.read_entry(&mut small).err(), Some(EfiStatus::BUFFER_TOO_SMALL));

        let mut buf = [0u8; 256];
        let (info, name) = root.read_entry(&mut buf).unwrap().unwrap();
        assert!(info.is_directory());
        assert_eq!(name.to_string(), "\\");
        assert!(root.read_entry(&mut buf).unwrap().is_none());

        root.set_position(0).unwrap();
        assert!(root.read_entry(&mut buf).unwrap().is_some());
    }

    #[test]
    fn delete_does_not_close_twice() {
        let mut raw = file_system();
        let root = FileSystem::new(&mut raw).open_volume().unwrap();
        let (closed_before, deleted_before) = (closed(), DELETED.with(Cell::get));
        let file = root.open("tmp", FileMode::READ, FileAttributes::empty()).unwrap();
        file.delete().unwrap();
        assert_eq!(closed(), closed_before);
        assert_eq!(DELETED.with(Cell::get) - deleted_before, 1);

        let file = root.open("ro.txt", FileMode::READ, FileAttributes::empty()).unwrap();
        assert_eq!(file.delete(), Err(EfiStatus::WARN_DELETE_FAILURE));

        let mut file = root.open("ro.txt", FileMode::READ, FileAttributes::empty()).unwrap();
        assert_eq!(file.write(b"x"), Err(EfiStatus::WRITE_PROTECTED));
    }
}
