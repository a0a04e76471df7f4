//! Text console wrapper.

use core::fmt;
use core::marker::PhantomData;

use crate::EfiStatus;
use crate::protocol::simple_text_output::{
    SimpleTextOutputMode, SimpleTextOutputProtocol, color,
};
use crate::ucs2::REPLACEMENT;

/// Units per `OutputString` call, terminator included.
const CHUNK: usize = 128;

/// Safe wrapper around a Simple Text Output Protocol instance.
///
/// Methods take `&self`; the firmware serializes access to the device.
pub struct Console<'st> {
    raw: *mut SimpleTextOutputProtocol,
    _lifetime: PhantomData<&'st ()>,
}

impl<'st> Console<'st> {
    /// Wraps a console pointer.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live Simple Text Output Protocol that stays valid for `'st`.
    pub unsafe fn from_raw(raw: *mut SimpleTextOutputProtocol) -> Self {
        Self {
            raw,
            _lifetime: PhantomData,
        }
    }

    /// Returns the underlying protocol pointer.
    #[must_use]
    pub fn as_raw(&self) -> *mut SimpleTextOutputProtocol {
        self.raw
    }

    /// Writes a UTF-8 string.
    ///
    /// The string is converted to UCS-2 in chunks of 128 units on the stack. `\n` is
    /// written as `\r\n` and characters outside the BMP become U+FFFD.
    ///
    /// # Errors
    ///
    /// Returns the first error status reported by the device.
    pub fn output_string(&self, s: &str) -> Result<(), EfiStatus> {
        let mut chunk = Chunk::new();
        for ch in s.chars() {
            if ch == '\n' {
                chunk.push(self, u16::from(b'\r'))?;
                chunk.push(self, u16::from(b'\n'))?;
            } else {
                chunk.push(self, u16::try_from(u32::from(ch)).unwrap_or(REPLACEMENT))?;
            }
        }
        chunk.flush(self)
    }

    /// Writes `units` as-is. A missing NUL terminator is added per chunk.
    ///
    /// # Errors
    ///
    /// Returns the first error status reported by the device.
    pub fn output_ucs2(&self, units: &[u16]) -> Result<(), EfiStatus> {
        let mut chunk = Chunk::new();
        for &unit in units.iter().take_while(|&&u| u != 0) {
            chunk.push(self, unit)?;
        }
        chunk.flush(self)
    }

    /// Clears the screen.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR` or `UNSUPPORTED`.
    pub fn clear_screen(&self) -> Result<(), EfiStatus> {
        unsafe { ((*self.raw).clear_screen)(self.raw) }.to_result()
    }

    /// Sets the foreground and background colors, see [`color`].
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR` or `UNSUPPORTED`.
    pub fn set_attribute(&self, foreground: usize, background: usize) -> Result<(), EfiStatus> {
        let attribute = color::attribute(foreground, background);
        unsafe { ((*self.raw).set_attribute)(self.raw, attribute) }.to_result()
    }

    /// Moves the cursor.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` if the position is outside the current mode.
    pub fn set_cursor_position(&self, column: usize, row: usize) -> Result<(), EfiStatus> {
        unsafe { ((*self.raw).set_cursor_position)(self.raw, column, row) }.to_result()
    }

    /// Shows or hides the cursor.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` if the device cannot hide its cursor.
    pub fn enable_cursor(&self, visible: bool) -> Result<(), EfiStatus> {
        unsafe { ((*self.raw).enable_cursor)(self.raw, visible) }.to_result()
    }

    /// Resets the device.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR`.
    pub fn reset(&self) -> Result<(), EfiStatus> {
        unsafe { ((*self.raw).reset)(self.raw, false) }.to_result()
    }

    /// The current mode, if the firmware published one.
    #[must_use]
    pub fn mode(&self) -> Option<SimpleTextOutputMode> {
        unsafe { (*self.raw).current_mode() }
    }

    /// `(columns, rows)` of the current mode.
    ///
    /// # Errors
    ///
    /// Returns `UNSUPPORTED` if no mode is set.
    pub fn size(&self) -> Result<(usize, usize), EfiStatus> {
        let mode = self.mode().ok_or(EfiStatus::UNSUPPORTED)?;
        let number = usize::try_from(mode.mode).map_err(|_| EfiStatus::UNSUPPORTED)?;
        unsafe { (*self.raw).query_mode(number) }
    }
}

impl fmt::Write for Console<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.output_string(s).map_err(|_| fmt::Error)
    }
}

/// A NUL-terminated staging buffer for `OutputString`.
struct Chunk {
    buf: [u16; CHUNK],
    len: usize,
}

impl Chunk {
    fn new() -> Self {
        Self {
            buf: [0; CHUNK],
            len: 0,
        }
    }

    fn push(&mut self, console: &Console<'_>, unit: u16) -> Result<(), EfiStatus> {
        // Keep one slot for the terminator.
        if self.len + 1 == CHUNK {
            self.flush(console)?;
        }
        self.buf[self.len] = unit;
        self.len += 1;
        Ok(())
    }

    fn flush(&mut self, console: &Console<'_>) -> Result<(), EfiStatus> {
        if self.len == 0 {
            return Ok(());
        }
        self.buf[self.len] = 0;
        self.len = 0;
        unsafe { ((*console.raw).output_string)(console.raw, self.buf.as_ptr()) }.to_result()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use core::fmt::Write;
    use std::cell::RefCell;

    use super::*;

    std::thread_local! {
        static CALLS: RefCell<Vec<Vec<u16>>> = const { RefCell::new(Vec::new()) };
        static ATTRIBUTE: RefCell<Option<usize>> = const { RefCell::new(None) };
    }

    unsafe extern "efiapi" fn reset(_: *mut SimpleTextOutputProtocol, _: bool) -> EfiStatus {
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn output_string(
        _: *mut SimpleTextOutputProtocol,
        string: *const u16,
    ) -> EfiStatus {
        let units = unsafe { crate::ucs2::from_ptr(string) }.to_vec();
        CALLS.with(|calls| calls.borrow_mut().push(units));
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn failing_output(
        _: *mut SimpleTextOutputProtocol,
        _: *const u16,
    ) -> EfiStatus {
        EfiStatus::DEVICE_ERROR
    }

    unsafe extern "efiapi" fn string_op(
        _: *mut SimpleTextOutputProtocol,
        _: *const u16,
    ) -> EfiStatus {
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn query_mode(
        _: *mut SimpleTextOutputProtocol,
        mode: usize,
        columns: *mut usize,
        rows: *mut usize,
    ) -> EfiStatus {
        if mode != 0 {
            return EfiStatus::UNSUPPORTED;
        }
        unsafe {
            *columns = 80;
            *rows = 25;
        }
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn usize_op(_: *mut SimpleTextOutputProtocol, _: usize) -> EfiStatus {
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn set_attribute(
        _: *mut SimpleTextOutputProtocol,
        attribute: usize,
    ) -> EfiStatus {
        ATTRIBUTE.with(|a| *a.borrow_mut() = Some(attribute));
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn clear_screen(_: *mut SimpleTextOutputProtocol) -> EfiStatus {
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn set_cursor_position(
        _: *mut SimpleTextOutputProtocol,
        _: usize,
        _: usize,
    ) -> EfiStatus {
        EfiStatus::SUCCESS
    }

    unsafe extern "efiapi" fn enable_cursor(
        _: *mut SimpleTextOutputProtocol,
        _: bool,
    ) -> EfiStatus {
        EfiStatus::UNSUPPORTED
    }

    /// A console that records every `OutputString` call on the current thread.
    pub(crate) fn fake_console(mode: *mut SimpleTextOutputMode) -> SimpleTextOutputProtocol {
        SimpleTextOutputProtocol {
            reset,
            output_string,
            test_string: string_op,
            query_mode,
            set_mode: usize_op,
            set_attribute,
            clear_screen,
            set_cursor_position,
            enable_cursor,
            mode,
        }
    }

    /// Drains the recorded `OutputString` calls.
    /// The last attribute passed to `set_attribute`, clearing it.
    pub(crate) fn take_attribute() -> Option<usize> {
        ATTRIBUTE.with(|a| a.borrow_mut().take())
    }

    pub(crate) fn take_output() -> Vec<String> {
        CALLS.with(|calls| {
            calls
                .borrow_mut()
                .drain(..)
                .map(|units| String::from_utf16(&units).unwrap())
                .collect()
        })
    }

    #[test]
    fn translates_newlines() {
        let mut proto = fake_console(core::ptr::null_mut());
        let console = unsafe { Console::from_raw(&raw mut proto) };
        console.output_string("a\nb\n").unwrap();
        assert_eq!(take_output(), ["a\r\nb\r\n"]);

        console.output_string("").unwrap();
        assert!(take_output().is_empty());
    }

    #[test]
    fn splits_long_strings_into_chunks() {
        let mut proto = fake_console(core::ptr::null_mut());
        let console = unsafe { Console::from_raw(&raw mut proto) };
        let long = "x".repeat(300);
        console.output_string(&long).unwrap();

        let calls = take_output();
        assert_eq!(calls.iter().map(String::len).collect::<Vec<_>>(), [127, 127, 46]);
        assert_eq!(calls.concat(), long);
    }

    #[test]
    fn newline_pair_may_straddle_chunks() {
        let mut proto = fake_console(core::ptr::null_mut());
        let console = unsafe { Console::from_raw(&raw mut proto) };
        let text = format!("{}\n", "y".repeat(126));
        console.output_string(&text).unwrap();

        let calls = take_output();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.concat(), format!("{}\r\n", "y".repeat(126)));
    }

    #[test]
    fn replaces_non_bmp_characters() {
        let mut proto = fake_console(core::ptr::null_mut());
        let console = unsafe { Console::from_raw(&raw mut proto) };
        console.output_string("ok \u{1F980}").unwrap();
        assert_eq!(take_output(), ["ok \u{FFFD}"]);

        let units: Vec<u16> = "raw\0ignored".encode_utf16().collect();
        console.output_ucs2(&units).unwrap();
        assert_eq!(take_output(), ["raw"]);
    }

    #[test]
    fn fmt_write_and_errors() {
        let mut proto = fake_console(core::ptr::null_mut());
        let mut console = unsafe { Console::from_raw(&raw mut proto) };
        write!(console, "{}-{:02}", "boot", 7).unwrap();
        assert_eq!(take_output().concat(), "boot-07");

        proto.output_string = failing_output;
        let mut console = unsafe { Console::from_raw(&raw mut proto) };
        assert_eq!(console.output_string("x"), Err(EfiStatus::DEVICE_ERROR));
        assert!(write!(console, "x").is_err());
    }

    #[test]
    fn attributes_and_mode() {
        let mut mode = SimpleTextOutputMode {
            max_mode: 1,
            ..SimpleTextOutputMode::default()
        };
        let mut proto = fake_console(&raw mut mode);
        let console = unsafe { Console::from_raw(&raw mut proto) };

        console.set_attribute(color::YELLOW, color::BLUE).unwrap();
        assert_eq!(ATTRIBUTE.with(|a| *a.borrow()), Some(0x1E));
        assert_eq!(console.mode().unwrap().max_mode, 1);
        assert_eq!(console.size(), Ok((80, 25)));
        assert_eq!(console.enable_cursor(false), Err(EfiStatus::UNSUPPORTED));
        console.clear_screen().unwrap();
        console.set_cursor_position(0, 0).unwrap();
        console.reset().unwrap();

        let mut proto = fake_console(core::ptr::null_mut());
        let console = unsafe { Console::from_raw(&raw mut proto) };
        assert_eq!(console.size(), Err(EfiStatus::UNSUPPORTED));
    }
}
