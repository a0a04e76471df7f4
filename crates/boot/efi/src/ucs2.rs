//! UCS-2 string helpers.
//!
//! UEFI strings (`CHAR16 *`) are NUL-terminated UCS-2: one `u16` per character, Basic
//! Multilingual Plane only. Strings embedded in firmware-filled buffers (file names,
//! volume labels, load option descriptions) are not necessarily 2-byte aligned, so those
//! are read through [`Ucs2Bytes`] instead of `&[u16]`.

use core::fmt;

use crate::EfiStatus;

/// The replacement character, used for code points UCS-2 cannot represent.
pub const REPLACEMENT: u16 = 0xFFFD;

/// Converts a UTF-8 string to a NUL-terminated UCS-2 string in `buf`.
///
/// Returns the number of `u16` units written **including** the terminator. Characters
/// outside the BMP are replaced with U+FFFD.
///
/// # Errors
///
/// Returns `BUFFER_TOO_SMALL` if `buf` cannot hold the string and its terminator.
pub fn encode_into(s: &str, buf: &mut [u16]) -> Result<usize, EfiStatus> {
    let mut len = 0;
    for ch in s.chars() {
        let unit = u16::try_from(u32::from(ch)).unwrap_or(REPLACEMENT);
        // Keep one slot for the terminator.
        if len + 1 >= buf.len() {
            return Err(EfiStatus::BUFFER_TOO_SMALL);
        }
        buf[len] = unit;
        len += 1;
    }
    *buf.get_mut(len).ok_or(EfiStatus::BUFFER_TOO_SMALL)? = 0;
    Ok(len + 1)
}

/// Decodes UCS-2 units up to the first NUL (or the end of `units`).
///
/// Unpaired surrogates decode to U+FFFD.
pub fn decode(units: &[u16]) -> impl Iterator<Item = char> + '_ {
    units
        .iter()
        .take_while(|&&unit| unit != 0)
        .map(|&unit| char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER))
}

/// Returns the string at `ptr`, without its terminator.
///
/// # Safety
///
/// `ptr` must be non-null, 2-byte aligned and point to a NUL-terminated UCS-2 string that
/// lives for `'a` and is not written to meanwhile.
#[must_use]
pub unsafe fn from_ptr<'a>(ptr: *const u16) -> &'a [u16] {
    let mut len = 0;
    // SAFETY: the caller guarantees a terminator, so every unit up to it is readable.
    while unsafe { ptr.add(len).read() } != 0 {
        len += 1;
    }
    unsafe { core::slice::from_raw_parts(ptr, len) }
}

/// A UCS-2 string stored as little-endian bytes at any alignment.
///
/// Built with [`Ucs2Bytes::until_nul`], so it never includes the terminator.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Ucs2Bytes<'a> {
    bytes: &'a [u8],
}

impl<'a> Ucs2Bytes<'a> {
    /// Takes the string at the start of `bytes`, up to the first NUL unit or the last whole
    /// unit. A trailing odd byte is ignored.
    #[must_use]
    pub fn until_nul(bytes: &'a [u8]) -> Self {
        let units = bytes.len() / 2;
        let len = (0..units)
            .find(|&i| bytes[2 * i] == 0 && bytes[2 * i + 1] == 0)
            .unwrap_or(units);
        Self { bytes: &bytes[..2 * len] }
    }

    /// Number of UCS-2 units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len() / 2
    }

    /// Returns `true` for the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Size in bytes, without the terminator.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// The raw UCS-2 units.
    pub fn units(&self) -> impl Iterator<Item = u16> + use<'a> {
        self.bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
    }

    /// The decoded characters. Unpaired surrogates decode to U+FFFD.
    pub fn chars(&self) -> impl Iterator<Item = char> + use<'a> {
        self.units()
            .map(|unit| char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER))
    }
}

impl fmt::Display for Ucs2Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        self.chars().try_for_each(|c| f.write_char(c))
    }
}

impl fmt::Debug for Ucs2Bytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_bytes(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn encode_ascii() {
        let mut buf = [0xAAAAu16; 8];
        assert_eq!(encode_into("EFI", &mut buf), Ok(4));
        assert_eq!(&buf[..4], &[u16::from(b'E'), u16::from(b'F'), u16::from(b'I'), 0]);
    }

    #[test]
    fn encode_replaces_non_bmp() {
        let mut buf = [0u16; 4];
        assert_eq!(encode_into("a\u{1F600}é", &mut buf), Ok(4));
        assert_eq!(buf, [0x61, REPLACEMENT, 0xE9, 0]);
    }

    #[test]
    fn encode_needs_room_for_terminator() {
        let mut buf = [0u16; 3];
        assert_eq!(encode_into("abc", &mut buf), Err(EfiStatus::BUFFER_TOO_SMALL));
        assert_eq!(encode_into("", &mut []), Err(EfiStatus::BUFFER_TOO_SMALL));
        assert_eq!(encode_into("", &mut buf), Ok(1));
    }

    #[test]
    fn decode_stops_at_nul() {
        let units = [0x48, 0x69, 0, 0x21];
        assert_eq!(decode(&units).collect::<String>(), "Hi");
        assert_eq!(decode(&[0xD800, 0x41]).collect::<String>(), "\u{FFFD}A");
    }

    #[test]
    fn from_ptr_excludes_terminator() {
        let units: Vec<u16> = "Vendor\0".encode_utf16().collect();
        let s = unsafe { from_ptr(units.as_ptr()) };
        assert_eq!(s.len(), 6);
        assert_eq!(decode(s).collect::<String>(), "Vendor");
    }

    #[test]
    fn bytes_until_nul() {
        let mut bytes = le_bytes("boot\0junk");
        let s = Ucs2Bytes::until_nul(&bytes);
        assert_eq!(s.len(), 4);
        assert_eq!(s.byte_len(), 8);
        assert_eq!(s.to_string(), "boot");

        // Unterminated, with a stray odd byte.
        bytes.truncate(7);
        let s = Ucs2Bytes::until_nul(&bytes);
        assert_eq!(s.to_string(), "boo");
        assert!(Ucs2Bytes::until_nul(&[]).is_empty());
        assert_eq!(format!("{s:?}"), "\"boo\"");
    }

    #[test]
    fn bytes_at_odd_offset() {
        let mut bytes = vec![0xFF];
        bytes.extend_from_slice(&le_bytes("ESP\0"));
        let s = Ucs2Bytes::until_nul(&bytes[1..]);
        assert_eq!(s.units().collect::<Vec<_>>(), [0x45, 0x53, 0x50]);
    }
}
