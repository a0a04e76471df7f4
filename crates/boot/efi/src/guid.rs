//! UEFI Globally Unique Identifiers.
//!
//! [`EfiGuid`] follows the field breakdown of UEFI 2.10 Appendix A. The first three fields are
//! stored in native (little-endian) byte order, so the sixteen bytes in memory differ from the
//! textual form: `8be4df61-93ca-11d2-...` is laid out as `61 df e4 8b ca 93 d2 11 ...`.

use core::fmt;
use core::str::FromStr;

/// A 128-bit UEFI GUID.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EfiGuid {
    /// Low field of the timestamp.
    pub time_low: u32,
    /// Middle field of the timestamp.
    pub time_mid: u16,
    /// High field of the timestamp multiplexed with the version number.
    pub time_high_and_version: u16,
    /// High field of the clock sequence multiplexed with the variant.
    pub clock_seq_high_and_reserved: u8,
    /// Low field of the clock sequence.
    pub clock_seq_low: u8,
    /// Spatially unique node identifier.
    pub node: [u8; 6],
}

#[expect(
    clippy::unreadable_literal,
    reason = "GUID values are copied verbatim from the specification"
)]
impl EfiGuid {
    /// Builds a GUID from the EDK2 initializer form `{ d1, d2, d3, { d4[0..8] } }`.
    #[must_use]
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            time_low: data1,
            time_mid: data2,
            time_high_and_version: data3,
            clock_seq_high_and_reserved: data4[0],
            clock_seq_low: data4[1],
            node: [data4[2], data4[3], data4[4], data4[5], data4[6], data4[7]],
        }
    }

    /// Decodes the sixteen-byte in-memory representation.
    #[must_use]
    pub const fn from_bytes(b: [u8; 16]) -> Self {
        Self {
            time_low: u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            time_mid: u16::from_le_bytes([b[4], b[5]]),
            time_high_and_version: u16::from_le_bytes([b[6], b[7]]),
            clock_seq_high_and_reserved: b[8],
            clock_seq_low: b[9],
            node: [b[10], b[11], b[12], b[13], b[14], b[15]],
        }
    }

    /// Returns the sixteen-byte in-memory representation.
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; 16] {
        let a = self.time_low.to_le_bytes();
        let b = self.time_mid.to_le_bytes();
        let c = self.time_high_and_version.to_le_bytes();
        let n = self.node;
        [
            a[0],
            a[1],
            a[2],
            a[3],
            b[0],
            b[1],
            c[0],
            c[1],
            self.clock_seq_high_and_reserved,
            self.clock_seq_low,
            n[0],
            n[1],
            n[2],
            n[3],
            n[4],
            n[5],
        ]
    }

    /// The all-zero GUID.
    pub const NULL: Self = Self::from_bytes([0; 16]);

    // ── Variables ────────────────────────────────────────────────────

    /// Vendor GUID of the architecturally defined global variables (§3.3).
    pub const GLOBAL_VARIABLE: Self = Self::new(
        0x8be4df61,
        0x93ca,
        0x11d2,
        [0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c],
    );

    // ── Protocols ────────────────────────────────────────────────────

    /// Loaded Image Protocol (§9.1.1).
    pub const LOADED_IMAGE_PROTOCOL: Self = Self::new(
        0x5b1b31a1,
        0x9562,
        0x11d2,
        [0x8e, 0x3f, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b],
    );

    /// Loaded Image Device Path Protocol (§9.2).
    pub const LOADED_IMAGE_DEVICE_PATH_PROTOCOL: Self = Self::new(
        0xbc62157e,
        0x3e33,
        0x4fec,
        [0x99, 0x20, 0x2d, 0x3b, 0x36, 0xd7, 0x50, 0xdf],
    );

    /// Device Path Protocol (§10.2).
    pub const DEVICE_PATH_PROTOCOL: Self = Self::new(
        0x09576e91,
        0x6d3f,
        0x11d2,
        [0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b],
    );

    /// Simple Text Input Ex Protocol (§12.2.1).
    pub const SIMPLE_TEXT_INPUT_EX_PROTOCOL: Self = Self::new(
        0xdd9e7534,
        0x7762,
        0x4698,
        [0x8c, 0x14, 0xf5, 0x85, 0x17, 0xa6, 0x25, 0xaa],
    );

    /// Simple Text Input Protocol (§12.3.1).
    pub const SIMPLE_TEXT_INPUT_PROTOCOL: Self = Self::new(
        0x387477c1,
        0x69c7,
        0x11d2,
        [0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b],
    );

    /// Simple Text Output Protocol (§12.4.1).
    pub const SIMPLE_TEXT_OUTPUT_PROTOCOL: Self = Self::new(
        0x387477c2,
        0x69c7,
        0x11d2,
        [0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b],
    );

    /// Load File Protocol (§13.1.1).
    pub const LOAD_FILE_PROTOCOL: Self = Self::new(
        0x56ec3091,
        0x954c,
        0x11d2,
        [0x8e, 0x3f, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b],
    );

    /// Load File 2 Protocol (§13.2.1). Same interface as
    /// [`LOAD_FILE_PROTOCOL`](Self::LOAD_FILE_PROTOCOL).
    pub const LOAD_FILE2_PROTOCOL: Self = Self::new(
        0x4006c0c1,
        0xfcb3,
        0x403e,
        [0x99, 0x6d, 0x4a, 0x6c, 0x87, 0x24, 0xe0, 0x6d],
    );

    /// Simple File System Protocol (§13.4.1).
    pub const SIMPLE_FILE_SYSTEM_PROTOCOL: Self = Self::new(
        0x0964e5b22,
        0x6459,
        0x11d2,
        [0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b],
    );

    // ── File information types ───────────────────────────────────────

    /// `EFI_FILE_INFO` information type for `GetInfo`/`SetInfo` (§13.5.16).
    pub const FILE_INFO: Self = Self::new(
        0x09576e92,
        0x6d3f,
        0x11d2,
        [0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b],
    );

    /// `EFI_FILE_SYSTEM_INFO` information type (§13.5.17).
    pub const FILE_SYSTEM_INFO: Self = Self::new(
        0x09576e93,
        0x6d3f,
        0x11d2,
        [0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69, 0x72, 0x3b],
    );

    /// `EFI_FILE_SYSTEM_VOLUME_LABEL` information type (§13.5.18).
    pub const FILE_SYSTEM_VOLUME_LABEL: Self = Self::new(
        0xdb47d7d3,
        0xfe81,
        0x11d3,
        [0x9a, 0x35, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d],
    );

    // ── Event groups ─────────────────────────────────────────────────

    /// Signaled when `ExitBootServices` is called (§7.1.2).
    pub const EVENT_GROUP_EXIT_BOOT_SERVICES: Self = Self::new(
        0x27abf055,
        0xb1b8,
        0x4c26,
        [0x80, 0x48, 0x74, 0x8f, 0x37, 0xba, 0xa2, 0xdf],
    );

    /// Signaled when `SetVirtualAddressMap` is called.
    pub const EVENT_GROUP_VIRTUAL_ADDRESS_CHANGE: Self = Self::new(
        0x13fa7698,
        0xc831,
        0x49c7,
        [0x87, 0xea, 0x8f, 0x43, 0xfc, 0xc2, 0x51, 0x96],
    );

    /// Signaled when the memory map changes.
    pub const EVENT_GROUP_MEMORY_MAP_CHANGE: Self = Self::new(
        0x78bee926,
        0x692f,
        0x48fd,
        [0x9e, 0xdb, 0x01, 0x42, 0x2e, 0xf0, 0xd7, 0xab],
    );

    /// Signaled right before the boot manager launches a boot option.
    pub const EVENT_GROUP_READY_TO_BOOT: Self = Self::new(
        0x7ce88fb3,
        0x4bd7,
        0x4679,
        [0x87, 0xa8, 0xa8, 0xd8, 0xde, 0xe5, 0x0d, 0x2b],
    );

    // ── Configuration tables ─────────────────────────────────────────

    /// ACPI 1.0 RSDP.
    pub const ACPI_TABLE: Self = Self::new(
        0xeb9d2d30,
        0x2d88,
        0x11d3,
        [0x9a, 0x16, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d],
    );

    /// ACPI 2.0+ RSDP.
    pub const ACPI_20_TABLE: Self = Self::new(
        0x8868e871,
        0xe4f1,
        0x11d3,
        [0xbc, 0x22, 0x00, 0x80, 0xc7, 0x3c, 0x88, 0x81],
    );

    /// SMBIOS entry point.
    pub const SMBIOS_TABLE: Self = Self::new(
        0xeb9d2d31,
        0x2d88,
        0x11d3,
        [0x9a, 0x16, 0x00, 0x90, 0x27, 0x3f, 0xc1, 0x4d],
    );

    /// SMBIOS 3.0 entry point.
    pub const SMBIOS3_TABLE: Self = Self::new(
        0xf2fd1544,
        0x9794,
        0x4a2c,
        [0x99, 0x2e, 0xe5, 0xbb, 0xcf, 0x20, 0xe3, 0x94],
    );

    /// Flattened device tree blob.
    pub const DEVICE_TREE_TABLE: Self = Self::new(
        0xb1b621d5,
        0xf19c,
        0x41a5,
        [0x83, 0x0b, 0xd9, 0x15, 0x2c, 0x69, 0xaa, 0xe0],
    );
}

impl fmt::Debug for EfiGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EfiGuid({self})")
    }
}

impl fmt::Display for EfiGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = &self.node;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.time_low,
            self.time_mid,
            self.time_high_and_version,
            self.clock_seq_high_and_reserved,
            self.clock_seq_low,
            n[0],
            n[1],
            n[2],
            n[3],
            n[4],
            n[5],
        )
    }
}

// ── Parsing ──────────────────────────────────────────────────────────

/// Error returned when parsing an [`EfiGuid`] from its text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidParseError {
    /// The input is not 36 characters long.
    InvalidLength(usize),
    /// A hyphen is missing at the given byte offset.
    MissingHyphen(usize),
    /// A non-hex character was found at the given byte offset.
    InvalidDigit(usize),
}

impl fmt::Display for GuidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLength(len) => write!(f, "expected 36 characters, found {len}"),
            Self::MissingHyphen(at) => write!(f, "expected '-' at offset {at}"),
            Self::InvalidDigit(at) => write!(f, "invalid hex digit at offset {at}"),
        }
    }
}

impl core::error::Error for GuidParseError {}

const HYPHENS: [usize; 4] = [8, 13, 18, 23];

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl FromStr for EfiGuid {
    type Err = GuidParseError;

    /// Parses `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        if s.len() != 36 {
            return Err(GuidParseError::InvalidLength(s.len()));
        }

        // Text order: the 32 hex digits read left to right, big-endian per field.
        let mut digits = [0u8; 16];
        let mut out = 0;
        let mut i = 0;
        while i < s.len() {
            if HYPHENS.contains(&i) {
                if s[i] != b'-' {
                    return Err(GuidParseError::MissingHyphen(i));
                }
                i += 1;
                continue;
            }
            let hi = hex_value(s[i]).ok_or(GuidParseError::InvalidDigit(i))?;
            let lo = hex_value(s[i + 1]).ok_or(GuidParseError::InvalidDigit(i + 1))?;
            digits[out] = (hi << 4) | lo;
            out += 1;
            i += 2;
        }

        let d = digits;
        Ok(Self {
            time_low: u32::from_be_bytes([d[0], d[1], d[2], d[3]]),
            time_mid: u16::from_be_bytes([d[4], d[5]]),
            time_high_and_version: u16::from_be_bytes([d[6], d[7]]),
            clock_seq_high_and_reserved: d[8],
            clock_seq_low: d[9],
            node: [d[10], d[11], d[12], d[13], d[14], d[15]],
        })
    }
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<EfiGuid>() == 16);
    assert!(core::mem::align_of::<EfiGuid>() == 4);
    assert!(core::mem::offset_of!(EfiGuid, time_low) == 0);
    assert!(core::mem::offset_of!(EfiGuid, time_mid) == 4);
    assert!(core::mem::offset_of!(EfiGuid, time_high_and_version) == 6);
    assert!(core::mem::offset_of!(EfiGuid, clock_seq_high_and_reserved) == 8);
    assert!(core::mem::offset_of!(EfiGuid, clock_seq_low) == 9);
    assert!(core::mem::offset_of!(EfiGuid, node) == 10);
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Reinterprets the GUID's memory, independent of `to_bytes`.
    fn raw_bytes(guid: &EfiGuid) -> [u8; 16] {
        unsafe { core::mem::transmute_copy(guid) }
    }

    #[test]
    fn global_variable_encoding() {
        assert_eq!(
            raw_bytes(&EfiGuid::GLOBAL_VARIABLE),
            [
                0x61, 0xdf, 0xe4, 0x8b, 0xca, 0x93, 0xd2, 0x11, 0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03,
                0x2b, 0x8c
            ]
        );
    }

    #[test]
    fn loaded_image_encoding() {
        assert_eq!(
            raw_bytes(&EfiGuid::LOADED_IMAGE_PROTOCOL),
            [
                0xa1, 0x31, 0x1b, 0x5b, 0x62, 0x95, 0xd2, 0x11, 0x8e, 0x3f, 0x00, 0xa0, 0xc9, 0x69,
                0x72, 0x3b
            ]
        );
    }

    #[test]
    fn device_path_encoding() {
        assert_eq!(
            raw_bytes(&EfiGuid::DEVICE_PATH_PROTOCOL),
            [
                0x91, 0x6e, 0x57, 0x09, 0x3f, 0x6d, 0xd2, 0x11, 0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69,
                0x72, 0x3b
            ]
        );
    }

    #[test]
    fn simple_file_system_encoding() {
        assert_eq!(
            raw_bytes(&EfiGuid::SIMPLE_FILE_SYSTEM_PROTOCOL),
            [
                0x22, 0x5b, 0x4e, 0x96, 0x59, 0x64, 0xd2, 0x11, 0x8e, 0x39, 0x00, 0xa0, 0xc9, 0x69,
                0x72, 0x3b
            ]
        );
    }

    #[test]
    fn to_bytes_matches_memory() {
        for guid in [
            EfiGuid::GLOBAL_VARIABLE,
            EfiGuid::SIMPLE_TEXT_INPUT_EX_PROTOCOL,
            EfiGuid::FILE_SYSTEM_VOLUME_LABEL,
            EfiGuid::DEVICE_TREE_TABLE,
        ] {
            assert_eq!(guid.to_bytes(), raw_bytes(&guid));
            assert_eq!(EfiGuid::from_bytes(guid.to_bytes()), guid);
        }
    }

    #[test]
    fn display_form() {
        assert_eq!(
            EfiGuid::GLOBAL_VARIABLE.to_string(),
            "8be4df61-93ca-11d2-aa0d-00e098032b8c"
        );
        assert_eq!(
            EfiGuid::SIMPLE_FILE_SYSTEM_PROTOCOL.to_string(),
            "964e5b22-6459-11d2-8e39-00a0c969723b"
        );
    }

    #[test]
    fn parse_accepts_mixed_case() {
        let guid: EfiGuid = "5B1B31A1-9562-11d2-8E3F-00A0C969723B".parse().unwrap();
        assert_eq!(guid, EfiGuid::LOADED_IMAGE_PROTOCOL);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(
            "5b1b31a1-9562-11d2-8e3f".parse::<EfiGuid>(),
            Err(GuidParseError::InvalidLength(23))
        );
        assert_eq!(
            "5b1b31a1_9562-11d2-8e3f-00a0c969723b".parse::<EfiGuid>(),
            Err(GuidParseError::MissingHyphen(8))
        );
        assert_eq!(
            "5b1b31a1-9562-11d2-8e3f-00a0c969723g".parse::<EfiGuid>(),
            Err(GuidParseError::InvalidDigit(35))
        );
    }

    #[test]
    fn null_guid_is_zero() {
        assert_eq!(EfiGuid::NULL.to_bytes(), [0; 16]);
        assert_eq!(EfiGuid::NULL.to_string(), "00000000-0000-0000-0000-000000000000");
    }
}
