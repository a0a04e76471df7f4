//! Load options (UEFI 2.10 §3.1.3).
//!
//! `Boot####`, `Driver####` and `SysPrep####` variables hold an `EFI_LOAD_OPTION`: a
//! six-byte packed header followed by three variable-length parts.
//!
//! ```text
//! +------------+--------------------+-------------+----------------+---------------+
//! | attributes | file_path_list_len | description | file_path_list | optional_data |
//! |    u32     |        u16         | UCS-2, NUL  |  device paths  |  rest of var  |
//! +------------+--------------------+-------------+----------------+---------------+
//! ```
//!
//! The header is not padded on disk, so [`LoadOption`] (which is `repr(C)` and eight bytes)
//! is never overlaid on variable data. [`ExpandedLoadOption::parse`] reads the parts out of
//! the raw bytes instead.

use core::fmt;

use bitflags::bitflags;

use crate::protocol::device_path::DevicePathNodes;
use crate::ucs2::Ucs2Bytes;

bitflags! {
    /// `LOAD_OPTION_*` attribute bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct LoadOptionAttributes: u32 {
        /// The boot manager may try this option.
        const ACTIVE = 0x0000_0001;
        /// Reconnect all drivers after loading this driver option.
        const FORCE_RECONNECT = 0x0000_0002;
        /// Not shown in the boot manager menu.
        const HIDDEN = 0x0000_0008;
        /// Category mask.
        const CATEGORY = 0x0000_1F00;
        /// Category: boot option (the zero value within [`Self::CATEGORY`]).
        const CATEGORY_BOOT = 0x0000_0000;
        /// Category: application, only launched on explicit request.
        const CATEGORY_APP = 0x0000_0100;
    }
}

/// Fixed header of `EFI_LOAD_OPTION`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOption {
    /// See [`LoadOptionAttributes`].
    pub attributes: u32,
    /// Length in bytes of the file path list that follows the description.
    pub file_path_list_length: u16,
}

impl LoadOption {
    /// Size of the header as stored in a variable, without trailing padding.
    pub const PACKED_SIZE: usize = 6;

    /// The attribute bits, unknown bits retained.
    #[must_use]
    pub const fn attributes(&self) -> LoadOptionAttributes {
        LoadOptionAttributes::from_bits_retain(self.attributes)
    }

    /// The category field (`attributes & CATEGORY`).
    #[must_use]
    pub const fn category(&self) -> u32 {
        self.attributes & LoadOptionAttributes::CATEGORY.bits()
    }

    /// Returns `true` if [`LoadOptionAttributes::ACTIVE`] is set.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.attributes().contains(LoadOptionAttributes::ACTIVE)
    }
}

/// A malformed load option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOptionError {
    /// The variable is shorter than the six-byte header.
    Truncated(usize),
    /// No NUL terminator was found for the description.
    UnterminatedDescription,
    /// The file path list runs past the end of the variable.
    FilePathOverrun {
        /// Declared `file_path_list_length`.
        declared: u16,
        /// Bytes left after the description.
        available: usize,
    },
}

impl fmt::Display for LoadOptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated(len) => write!(f, "load option truncated: {len} bytes"),
            Self::UnterminatedDescription => f.write_str("load option description has no NUL"),
            Self::FilePathOverrun {
                declared,
                available,
            } => write!(
                f,
                "load option file path list is {declared} bytes but only {available} remain"
            ),
        }
    }
}

impl core::error::Error for LoadOptionError {}

/// A load option split into its parts, borrowing from the variable data.
#[derive(Debug, Clone, Copy)]
pub struct ExpandedLoadOption<'a> {
    /// The fixed header.
    pub header: LoadOption,
    /// The description, without its terminator.
    pub description: Ucs2Bytes<'a>,
    /// The packed device path list.
    pub file_path_list: &'a [u8],
    /// Whatever follows the file path list.
    pub optional_data: &'a [u8],
}

impl<'a> ExpandedLoadOption<'a> {
    /// Splits a load option variable into header, description, file path list and optional
    /// data.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadOptionError`] if the header is cut off, the description has no
    /// terminator or the file path list overruns the data.
    pub fn parse(data: &'a [u8]) -> Result<Self, LoadOptionError> {
        let (Some(attributes), Some(length)) = (data.get(0..4), data.get(4..6)) else {
            return Err(LoadOptionError::Truncated(data.len()));
        };
        let header = LoadOption {
            attributes: u32::from_le_bytes([
                attributes[0],
                attributes[1],
                attributes[2],
                attributes[3],
            ]),
            file_path_list_length: u16::from_le_bytes([length[0], length[1]]),
        };

        let rest = &data[LoadOption::PACKED_SIZE..];
        let description = Ucs2Bytes::until_nul(rest);
        // The terminator itself must be present.
        let paths_start = description.byte_len() + 2;
        if rest.len() < paths_start {
            return Err(LoadOptionError::UnterminatedDescription);
        }

        let rest = &rest[paths_start..];
        let declared = header.file_path_list_length;
        let Some(file_path_list) = rest.get(..usize::from(declared)) else {
            log::debug!("efi: load option file path list overruns variable ({declared} bytes)");
            return Err(LoadOptionError::FilePathOverrun {
                declared,
                available: rest.len(),
            });
        };
        let optional_data = &rest[usize::from(declared)..];

        Ok(Self {
            header,
            description,
            file_path_list,
            optional_data,
        })
    }

    /// Total size of the option, header included.
    #[must_use]
    pub fn len(&self) -> usize {
        LoadOption::PACKED_SIZE
            + self.description_len()
            + self.file_path_list.len()
            + self.optional_data.len()
    }

    /// Returns `true` if the option has no description, no paths and no optional data.
    /// The header is always present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.file_path_list.is_empty()
            && self.optional_data.is_empty()
    }

    /// Size of the description in bytes, terminator included.
    #[must_use]
    pub fn description_len(&self) -> usize {
        self.description.byte_len() + 2
    }

    /// Walks the device paths in the file path list.
    ///
    /// The first path is the one the boot manager loads. Further instances, separated by
    /// end-of-entire-path nodes, are not reached by this iterator.
    #[must_use]
    pub fn device_paths(&self) -> DevicePathNodes<'a> {
        DevicePathNodes::new(self.file_path_list)
    }
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::offset_of!(LoadOption, attributes) == 0);
    assert!(core::mem::offset_of!(LoadOption, file_path_list_length) == 4);
    assert!(core::mem::size_of::<LoadOption>() == 8);
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::device_path::{end_sub_type, media_sub_type, node_type};

    fn boot_option(attributes: u32, description: &str, optional: &[u8]) -> Vec<u8> {
        let mut path = Vec::new();
        let file: Vec<u8> =
            "\\EFI\\BOOT\\BOOTX64.EFI\0".encode_utf16().flat_map(u16::to_le_bytes).collect();
        path.extend_from_slice(&[node_type::MEDIA, media_sub_type::FILE_PATH]);
        path.extend_from_slice(&u16::try_from(4 + file.len()).unwrap().to_le_bytes());
        path.extend_from_slice(&file);
        path.extend_from_slice(&[node_type::END, end_sub_type::END_ENTIRE, 4, 0]);

        let mut buf = Vec::new();
        buf.extend_from_slice(&attributes.to_le_bytes());
        buf.extend_from_slice(&u16::try_from(path.len()).unwrap().to_le_bytes());
        buf.extend(description.encode_utf16().chain([0]).flat_map(u16::to_le_bytes));
        buf.extend_from_slice(&path);
        buf.extend_from_slice(optional);
        buf
    }

    #[test]
    fn attribute_values() {
        assert_eq!(LoadOptionAttributes::ACTIVE.bits(), 0x1);
        assert_eq!(LoadOptionAttributes::FORCE_RECONNECT.bits(), 0x2);
        assert_eq!(LoadOptionAttributes::HIDDEN.bits(), 0x8);
        assert_eq!(LoadOptionAttributes::CATEGORY.bits(), 0x1F00);
        assert_eq!(LoadOptionAttributes::CATEGORY_BOOT.bits(), 0);
        assert_eq!(LoadOptionAttributes::CATEGORY_APP.bits(), 0x100);
    }

    #[test]
    fn parse_boot_option() {
        let data = boot_option(0x1 | 0x100, "Linux", b"quiet");
        let option = ExpandedLoadOption::parse(&data).unwrap();

        assert!(option.header.is_active());
        assert_eq!(option.header.category(), LoadOptionAttributes::CATEGORY_APP.bits());
        assert_eq!(option.description.to_string(), "Linux");
        assert_eq!(option.description_len(), 12);
        assert_eq!(option.optional_data, b"quiet");
        assert_eq!(option.len(), data.len());
        assert!(!option.is_empty());

        let nodes: Vec<_> = option.device_paths().map(Result::unwrap).collect();
        assert_eq!(nodes.len(), 1);
        let file: Vec<u16> = nodes[0].file_path().unwrap().collect();
        assert_eq!(String::from_utf16(&file).unwrap(), "\\EFI\\BOOT\\BOOTX64.EFI");
    }

    #[test]
    fn parse_without_optional_data() {
        let data = boot_option(0x1, "", &[]);
        let option = ExpandedLoadOption::parse(&data).unwrap();
        assert!(option.description.is_empty());
        assert!(option.optional_data.is_empty());
        assert_eq!(option.header.category(), 0);
    }

    #[test]
    fn rejects_truncated_header() {
        assert_eq!(
            ExpandedLoadOption::parse(&[1, 0, 0, 0, 4]).unwrap_err(),
            LoadOptionError::Truncated(5)
        );
    }

    #[test]
    fn rejects_unterminated_description() {
        let mut data = vec![1, 0, 0, 0, 0, 0];
        data.extend("Boot".encode_utf16().flat_map(u16::to_le_bytes));
        assert_eq!(
            ExpandedLoadOption::parse(&data).unwrap_err(),
            LoadOptionError::UnterminatedDescription
        );
    }

    #[test]
    fn rejects_file_path_overrun() {
        let mut data = boot_option(0x1, "X", &[]);
        // Declare two more bytes than are present.
        let declared = u16::from_le_bytes([data[4], data[5]]) + 2;
        data[4..6].copy_from_slice(&declared.to_le_bytes());
        let err = ExpandedLoadOption::parse(&data).unwrap_err();
        assert_eq!(
            err,
            LoadOptionError::FilePathOverrun {
                declared,
                available: usize::from(declared) - 2,
            }
        );
        assert!(err.to_string().contains("file path list"));
    }
}
