//! Simple Text Output Protocol (UEFI 2.10 §12.4).
//!
//! Text-mode output to a console device: NUL-terminated UCS-2 strings, cursor control and
//! colors.

use crate::{Boolean, EfiGuid, EfiStatus, FALSE};

use super::Protocol;

/// `EFI_TEXT_RESET`
pub type TextResetFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextOutputProtocol,
    extended_verification: bool,
) -> EfiStatus;

/// `EFI_TEXT_STRING`. `string` is NUL-terminated UCS-2.
pub type TextStringFn =
    unsafe extern "efiapi" fn(this: *mut SimpleTextOutputProtocol, string: *const u16) -> EfiStatus;

/// `EFI_TEXT_TEST_STRING`
pub type TextTestStringFn =
    unsafe extern "efiapi" fn(this: *mut SimpleTextOutputProtocol, string: *const u16) -> EfiStatus;

/// `EFI_TEXT_QUERY_MODE`
pub type TextQueryModeFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextOutputProtocol,
    mode_number: usize,
    columns: *mut usize,
    rows: *mut usize,
) -> EfiStatus;

/// `EFI_TEXT_SET_MODE`
pub type TextSetModeFn =
    unsafe extern "efiapi" fn(this: *mut SimpleTextOutputProtocol, mode_number: usize) -> EfiStatus;

/// `EFI_TEXT_SET_ATTRIBUTE`. See [`color::attribute`].
pub type TextSetAttributeFn =
    unsafe extern "efiapi" fn(this: *mut SimpleTextOutputProtocol, attribute: usize) -> EfiStatus;

/// `EFI_TEXT_CLEAR_SCREEN`
pub type TextClearScreenFn =
    unsafe extern "efiapi" fn(this: *mut SimpleTextOutputProtocol) -> EfiStatus;

/// `EFI_TEXT_SET_CURSOR_POSITION`
pub type TextSetCursorPositionFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextOutputProtocol,
    column: usize,
    row: usize,
) -> EfiStatus;

/// `EFI_TEXT_ENABLE_CURSOR`
pub type TextEnableCursorFn =
    unsafe extern "efiapi" fn(this: *mut SimpleTextOutputProtocol, visible: bool) -> EfiStatus;

/// The Simple Text Output Protocol (`EFI_SIMPLE_TEXT_OUTPUT_PROTOCOL`).
#[repr(C)]
pub struct SimpleTextOutputProtocol {
    /// Resets the output device.
    pub reset: TextResetFn,
    /// Writes a string at the cursor.
    pub output_string: TextStringFn,
    /// Checks whether every character of a string can be rendered.
    pub test_string: TextTestStringFn,
    /// Returns the geometry of a text mode.
    pub query_mode: TextQueryModeFn,
    /// Switches the text mode.
    pub set_mode: TextSetModeFn,
    /// Sets the colors used by later output.
    pub set_attribute: TextSetAttributeFn,
    /// Clears the screen to the background color.
    pub clear_screen: TextClearScreenFn,
    /// Moves the cursor.
    pub set_cursor_position: TextSetCursorPositionFn,
    /// Shows or hides the cursor.
    pub enable_cursor: TextEnableCursorFn,
    /// Current mode, owned by the firmware.
    pub mode: *mut SimpleTextOutputMode,
}

impl SimpleTextOutputProtocol {
    /// Writes a NUL-terminated UCS-2 string.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR` or `UNSUPPORTED`. `WARN_UNKNOWN_GLYPH` is a warning and is
    /// reported as success.
    ///
    /// # Safety
    ///
    /// `self` must be a live firmware instance and `string` must be NUL-terminated.
    pub unsafe fn output_string(&mut self, string: *const u16) -> Result<(), EfiStatus> {
        unsafe { (self.output_string)(self, string) }.to_result()
    }

    /// Clears the screen.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR` or `UNSUPPORTED`.
    ///
    /// # Safety
    ///
    /// `self` must be a live firmware instance.
    pub unsafe fn clear_screen(&mut self) -> Result<(), EfiStatus> {
        unsafe { (self.clear_screen)(self) }.to_result()
    }

    /// Returns `(columns, rows)` of text mode `mode_number`.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` for an invalid mode number.
    ///
    /// # Safety
    ///
    /// `self` must be a live firmware instance.
    pub unsafe fn query_mode(&mut self, mode_number: usize) -> Result<(usize, usize), EfiStatus> {
        let (mut columns, mut rows) = (0usize, 0usize);
        let status =
            unsafe { (self.query_mode)(self, mode_number, &raw mut columns, &raw mut rows) };
        status.to_result_with((columns, rows))
    }

    /// Copies the current mode, if the firmware published one.
    ///
    /// # Safety
    ///
    /// `self.mode` must be null or point to a valid mode structure.
    #[must_use]
    pub unsafe fn current_mode(&self) -> Option<SimpleTextOutputMode> {
        if self.mode.is_null() {
            return None;
        }
        Some(unsafe { *self.mode })
    }
}

// SAFETY: matches `EFI_SIMPLE_TEXT_OUTPUT_PROTOCOL`.
unsafe impl Protocol for SimpleTextOutputProtocol {
    const GUID: EfiGuid = EfiGuid::SIMPLE_TEXT_OUTPUT_PROTOCOL;
}

/// State of a text output device (`SIMPLE_TEXT_OUTPUT_MODE`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimpleTextOutputMode {
    /// Number of modes supported by `query_mode` and `set_mode`.
    pub max_mode: i32,
    /// Current mode number.
    pub mode: i32,
    /// Current attribute.
    pub attribute: i32,
    /// Cursor column.
    pub cursor_column: i32,
    /// Cursor row.
    pub cursor_row: i32,
    /// Raw `BOOLEAN`; see [`cursor_is_visible`](Self::cursor_is_visible).
    pub cursor_visible: Boolean,
}

impl SimpleTextOutputMode {
    /// Whether the cursor is visible. Any non-zero byte counts as true.
    #[must_use]
    pub const fn cursor_is_visible(&self) -> bool {
        self.cursor_visible != FALSE
    }
}

/// Text colors for `set_attribute`.
pub mod color {
    /// Black.
    pub const BLACK: usize = 0x00;
    /// Blue.
    pub const BLUE: usize = 0x01;
    /// Green.
    pub const GREEN: usize = 0x02;
    /// Cyan.
    pub const CYAN: usize = 0x03;
    /// Red.
    pub const RED: usize = 0x04;
    /// Magenta.
    pub const MAGENTA: usize = 0x05;
    /// Brown.
    pub const BROWN: usize = 0x06;
    /// Light gray.
    pub const LIGHT_GRAY: usize = 0x07;
    /// Brightness bit; only valid for foreground colors.
    pub const BRIGHT: usize = 0x08;
    /// Dark gray.
    pub const DARK_GRAY: usize = BLACK | BRIGHT;
    /// Light blue.
    pub const LIGHT_BLUE: usize = BLUE | BRIGHT;
    /// Light green.
    pub const LIGHT_GREEN: usize = GREEN | BRIGHT;
    /// Light cyan.
    pub const LIGHT_CYAN: usize = CYAN | BRIGHT;
    /// Light red.
    pub const LIGHT_RED: usize = RED | BRIGHT;
    /// Light magenta.
    pub const LIGHT_MAGENTA: usize = MAGENTA | BRIGHT;
    /// Yellow.
    pub const YELLOW: usize = BROWN | BRIGHT;
    /// White.
    pub const WHITE: usize = LIGHT_GRAY | BRIGHT;

    /// Combines a foreground and a background color (`EFI_TEXT_ATTRIBUTE`).
    ///
    /// Backgrounds are limited to `0x00..=0x07`; the bright bit of `background` spills into
    /// bit 7, exactly as the firmware macro does.
    #[must_use]
    pub const fn attribute(foreground: usize, background: usize) -> usize {
        foreground | (background << 4)
    }

    /// Splits an attribute into `(foreground, background)`.
    #[must_use]
    pub const fn split(attribute: usize) -> (usize, usize) {
        (attribute & 0x0F, (attribute >> 4) & 0x07)
    }
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<SimpleTextOutputMode>() == 24);
    assert!(core::mem::offset_of!(SimpleTextOutputMode, cursor_row) == 16);
    assert!(core::mem::offset_of!(SimpleTextOutputMode, cursor_visible) == 20);
};

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(core::mem::size_of::<SimpleTextOutputProtocol>() == 80);
    assert!(core::mem::offset_of!(SimpleTextOutputProtocol, output_string) == 8);
    assert!(core::mem::offset_of!(SimpleTextOutputProtocol, set_attribute) == 40);
    assert!(core::mem::offset_of!(SimpleTextOutputProtocol, mode) == 72);
};

#[cfg(target_pointer_width = "32")]
const _: () = assert!(core::mem::size_of::<SimpleTextOutputProtocol>() == 40);

#[cfg(test)]
mod tests {
    use super::color::*;
    use super::*;

    #[test]
    fn bright_colors() {
        assert_eq!(DARK_GRAY, 0x08);
        assert_eq!(LIGHT_BLUE, 0x09);
        assert_eq!(YELLOW, 0x0E);
        assert_eq!(WHITE, 0x0F);
    }

    #[test]
    fn attribute_packing() {
        assert_eq!(attribute(WHITE, BLUE), 0x1F);
        assert_eq!(attribute(LIGHT_GRAY, BLACK), 0x07);
        assert_eq!(attribute(YELLOW, RED), 0x4E);
        assert_eq!(split(0x4E), (YELLOW, RED));
    }

    #[test]
    fn cursor_visibility_from_raw_byte() {
        let mut mode = SimpleTextOutputMode::default();
        assert!(!mode.cursor_is_visible());
        mode.cursor_visible = 1;
        assert!(mode.cursor_is_visible());
        mode.cursor_visible = 0xFF;
        assert!(mode.cursor_is_visible());
    }
}
