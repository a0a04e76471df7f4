//! Device Path Protocol (UEFI 2.10 §10).
//!
//! A device path is a packed sequence of variable-length nodes. Every node starts with the
//! 4-byte [`DevicePathProtocol`] header; the path ends with an end-of-entire-path node.
//! Nodes carry no alignment guarantee, so [`DevicePathNodes`] walks a byte buffer instead of
//! casting pointers.

use core::fmt;

use crate::EfiGuid;

use super::Protocol;

/// Header of a device path node (`EFI_DEVICE_PATH_PROTOCOL`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePathProtocol {
    /// Node type, see [`node_type`].
    pub node_type: u8,
    /// Node sub-type, interpreted per `node_type`.
    pub sub_type: u8,
    /// Length of the node in bytes, header included, stored little-endian.
    pub length: [u8; 2],
}

impl DevicePathProtocol {
    /// Size of the node header.
    pub const HEADER_SIZE: usize = 4;

    /// The end-of-entire-path node.
    pub const END_ENTIRE: Self = Self {
        node_type: node_type::END,
        sub_type: end_sub_type::END_ENTIRE,
        length: (Self::HEADER_SIZE as u16).to_le_bytes(),
    };

    /// Returns the total length of this node in bytes.
    #[must_use]
    pub const fn node_length(&self) -> u16 {
        u16::from_le_bytes(self.length)
    }

    /// Returns `true` if this node ends the entire device path.
    #[must_use]
    pub const fn is_end(&self) -> bool {
        self.node_type == node_type::END && self.sub_type == end_sub_type::END_ENTIRE
    }

    /// Returns `true` if this node ends one instance of a multi-instance path.
    #[must_use]
    pub const fn is_end_instance(&self) -> bool {
        self.node_type == node_type::END && self.sub_type == end_sub_type::END_INSTANCE
    }
}

// SAFETY: `DevicePathProtocol` is the header layout of the device path protocol interface.
unsafe impl Protocol for DevicePathProtocol {
    const GUID: EfiGuid = EfiGuid::DEVICE_PATH_PROTOCOL;
}

/// Device path node types.
pub mod node_type {
    /// Hardware device path.
    pub const HARDWARE: u8 = 0x01;
    /// ACPI device path.
    pub const ACPI: u8 = 0x02;
    /// Messaging device path.
    pub const MESSAGING: u8 = 0x03;
    /// Media device path.
    pub const MEDIA: u8 = 0x04;
    /// BIOS Boot Specification device path.
    pub const BIOS_BOOT_SPEC: u8 = 0x05;
    /// End of hardware device path.
    pub const END: u8 = 0x7F;
}

/// Sub-types of [`node_type::MEDIA`] nodes.
pub mod media_sub_type {
    /// Hard drive partition.
    pub const HARD_DRIVE: u8 = 0x01;
    /// El Torito CD-ROM boot entry.
    pub const CD_ROM: u8 = 0x02;
    /// Vendor-defined media.
    pub const VENDOR: u8 = 0x03;
    /// NUL-terminated UCS-2 file path.
    pub const FILE_PATH: u8 = 0x04;
    /// Media protocol GUID.
    pub const MEDIA_PROTOCOL: u8 = 0x05;
    /// PI firmware file.
    pub const PIWG_FIRMWARE_FILE: u8 = 0x06;
    /// PI firmware volume.
    pub const PIWG_FIRMWARE_VOLUME: u8 = 0x07;
    /// Byte range relative to the parent device.
    pub const RELATIVE_OFFSET_RANGE: u8 = 0x08;
    /// RAM disk.
    pub const RAM_DISK: u8 = 0x09;
}

/// Sub-types of [`node_type::END`] nodes.
pub mod end_sub_type {
    /// Ends one instance; another instance follows.
    pub const END_INSTANCE: u8 = 0x01;
    /// Ends the entire device path.
    pub const END_ENTIRE: u8 = 0xFF;
}

// ── Node walking ─────────────────────────────────────────────────────

/// One node of a device path, borrowed from the buffer it was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePathNode<'a> {
    /// Node type, see [`node_type`].
    pub node_type: u8,
    /// Node sub-type.
    pub sub_type: u8,
    /// Node payload after the 4-byte header.
    pub data: &'a [u8],
}

impl<'a> DevicePathNode<'a> {
    /// Total length of the node, header included.
    #[must_use]
    pub fn len(&self) -> usize {
        DevicePathProtocol::HEADER_SIZE + self.data.len()
    }

    /// Returns `true` if the node has no payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// For a media file path node, the UCS-2 path up to its NUL terminator.
    #[must_use]
    pub fn file_path(&self) -> Option<impl Iterator<Item = u16> + use<'a>> {
        if self.node_type != node_type::MEDIA || self.sub_type != media_sub_type::FILE_PATH {
            return None;
        }
        Some(
            self.data
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .take_while(|&c| c != 0),
        )
    }
}

/// A malformed device path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePathError {
    /// A node header is cut off at the given offset.
    TruncatedHeader(usize),
    /// The node at `offset` declares a length below 4 or past the end of the buffer.
    InvalidLength {
        /// Offset of the node in the buffer.
        offset: usize,
        /// The declared node length.
        length: u16,
    },
    /// The buffer ended without an end-of-entire-path node.
    MissingEnd,
}

impl fmt::Display for DevicePathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedHeader(offset) => {
                write!(f, "device path node header truncated at offset {offset}")
            }
            Self::InvalidLength { offset, length } => {
                write!(f, "device path node at offset {offset} has invalid length {length}")
            }
            Self::MissingEnd => f.write_str("device path has no end node"),
        }
    }
}

impl core::error::Error for DevicePathError {}

/// Iterator over the nodes of a device path held in a byte buffer.
///
/// Yields every node up to, but not including, the end-of-entire-path node. End-of-instance
/// nodes are yielded so callers can split multi-instance paths. A malformed node yields one
/// error and ends the iteration.
#[derive(Debug, Clone)]
pub struct DevicePathNodes<'a> {
    buffer: &'a [u8],
    offset: usize,
    done: bool,
}

impl<'a> DevicePathNodes<'a> {
    /// Walks the device path at the start of `buffer`.
    #[must_use]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            done: false,
        }
    }

    /// Walks a device path given by pointer.
    ///
    /// # Errors
    ///
    /// Returns the first [`DevicePathError`] met while sizing the path.
    ///
    /// # Safety
    ///
    /// `path` must point to a device path terminated by an end-of-entire-path node, and the
    /// memory must stay valid and unchanged for `'a`.
    pub unsafe fn from_ptr(path: *const DevicePathProtocol) -> Result<Self, DevicePathError> {
        let size = unsafe { device_path_size(path) }?;
        let buffer = unsafe { core::slice::from_raw_parts(path.cast::<u8>(), size) };
        Ok(Self::new(buffer))
    }

    /// Bytes consumed so far, end node included once it has been reached.
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for DevicePathNodes<'a> {
    type Item = Result<DevicePathNode<'a>, DevicePathError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = &self.buffer[self.offset..];
        if rest.is_empty() {
            self.done = true;
            return Some(Err(DevicePathError::MissingEnd));
        }
        let Some(header) = rest.get(..DevicePathProtocol::HEADER_SIZE) else {
            self.done = true;
            return Some(Err(DevicePathError::TruncatedHeader(self.offset)));
        };
        let length = u16::from_le_bytes([header[2], header[3]]);
        let len = usize::from(length);
        if len < DevicePathProtocol::HEADER_SIZE || len > rest.len() {
            log::debug!("efi: device path node at {} has length {length}", self.offset);
            self.done = true;
            return Some(Err(DevicePathError::InvalidLength {
                offset: self.offset,
                length,
            }));
        }

        self.offset += len;
        let (node_type, sub_type) = (header[0], header[1]);
        if node_type == node_type::END && sub_type == end_sub_type::END_ENTIRE {
            self.done = true;
            return None;
        }
        Some(Ok(DevicePathNode {
            node_type,
            sub_type,
            data: &rest[DevicePathProtocol::HEADER_SIZE..len],
        }))
    }
}

impl core::iter::FusedIterator for DevicePathNodes<'_> {}

/// Size of the device path at `path` in bytes, end node included.
///
/// # Errors
///
/// Returns [`DevicePathError::InvalidLength`] for a node shorter than its header.
///
/// # Safety
///
/// `path` must point to a device path terminated by an end-of-entire-path node.
pub unsafe fn device_path_size(path: *const DevicePathProtocol) -> Result<usize, DevicePathError> {
    let base = path.cast::<u8>();
    let mut offset = 0usize;
    loop {
        let node = unsafe { base.add(offset).cast::<DevicePathProtocol>().read_unaligned() };
        let length = node.node_length();
        if usize::from(length) < DevicePathProtocol::HEADER_SIZE {
            return Err(DevicePathError::InvalidLength { offset, length });
        }
        offset += usize::from(length);
        if node.is_end() {
            return Ok(offset);
        }
    }
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<DevicePathProtocol>() == 4);
    assert!(core::mem::align_of::<DevicePathProtocol>() == 1);
    assert!(core::mem::offset_of!(DevicePathProtocol, sub_type) == 1);
    assert!(core::mem::offset_of!(DevicePathProtocol, length) == 2);
};
