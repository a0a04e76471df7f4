//! Simple Text Input and Simple Text Input Ex protocols (UEFI 2.10 §12.2, §12.3).

use core::ffi::c_void;

use bitflags::bitflags;

use crate::{EfiEvent, EfiGuid, EfiStatus};

use super::Protocol;

// ── Simple Text Input ────────────────────────────────────────────────

/// `EFI_INPUT_RESET`
pub type InputResetFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextInputProtocol,
    extended_verification: bool,
) -> EfiStatus;

/// `EFI_INPUT_READ_KEY`. Returns `NOT_READY` when no keystroke is pending.
pub type InputReadKeyFn =
    unsafe extern "efiapi" fn(this: *mut SimpleTextInputProtocol, key: *mut InputKey) -> EfiStatus;

/// The Simple Text Input Protocol (`EFI_SIMPLE_TEXT_INPUT_PROTOCOL`).
#[repr(C)]
pub struct SimpleTextInputProtocol {
    /// Resets the input device.
    pub reset: InputResetFn,
    /// Reads the next keystroke.
    pub read_key_stroke: InputReadKeyFn,
    /// Signaled when a keystroke is available.
    pub wait_for_key: EfiEvent,
}

impl SimpleTextInputProtocol {
    /// Reads the next keystroke, or `None` if no key is pending.
    ///
    /// # Errors
    ///
    /// Returns `DEVICE_ERROR` or `UNSUPPORTED`.
    ///
    /// # Safety
    ///
    /// `self` must be a live firmware instance.
    pub unsafe fn read_key(&mut self) -> Result<Option<InputKey>, EfiStatus> {
        let mut key = InputKey::default();
        match unsafe { (self.read_key_stroke)(self, &raw mut key) } {
            EfiStatus::NOT_READY => Ok(None),
            status => status.to_result_with(Some(key)),
        }
    }
}

// SAFETY: matches `EFI_SIMPLE_TEXT_INPUT_PROTOCOL`.
unsafe impl Protocol for SimpleTextInputProtocol {
    const GUID: EfiGuid = EfiGuid::SIMPLE_TEXT_INPUT_PROTOCOL;
}

/// A keystroke (`EFI_INPUT_KEY`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputKey {
    /// A [`scan_code`] for non-printing keys, zero otherwise.
    pub scan_code: u16,
    /// The UCS-2 character, zero for non-printing keys.
    pub unicode_char: u16,
}

impl InputKey {
    /// The character as a `char`, if the key produced one.
    #[must_use]
    pub fn char(&self) -> Option<char> {
        if self.unicode_char == 0 {
            return None;
        }
        char::from_u32(u32::from(self.unicode_char))
    }
}

/// Scan codes for keys without a character.
pub mod scan_code {
    /// No scan code; the key has a character.
    pub const NULL: u16 = 0x00;
    /// Cursor up.
    pub const UP: u16 = 0x01;
    /// Cursor down.
    pub const DOWN: u16 = 0x02;
    /// Cursor right.
    pub const RIGHT: u16 = 0x03;
    /// Cursor left.
    pub const LEFT: u16 = 0x04;
    /// Home.
    pub const HOME: u16 = 0x05;
    /// End.
    pub const END: u16 = 0x06;
    /// Insert.
    pub const INSERT: u16 = 0x07;
    /// Delete.
    pub const DELETE: u16 = 0x08;
    /// Page up.
    pub const PAGE_UP: u16 = 0x09;
    /// Page down.
    pub const PAGE_DOWN: u16 = 0x0A;
    /// F1
    pub const F1: u16 = 0x0B;
    /// F2
    pub const F2: u16 = 0x0C;
    /// F3
    pub const F3: u16 = 0x0D;
    /// F4
    pub const F4: u16 = 0x0E;
    /// F5
    pub const F5: u16 = 0x0F;
    /// F6
    pub const F6: u16 = 0x10;
    /// F7
    pub const F7: u16 = 0x11;
    /// F8
    pub const F8: u16 = 0x12;
    /// F9
    pub const F9: u16 = 0x13;
    /// F10
    pub const F10: u16 = 0x14;
    /// F11
    pub const F11: u16 = 0x15;
    /// F12
    pub const F12: u16 = 0x16;
    /// Escape.
    pub const ESC: u16 = 0x17;
}

// ── Simple Text Input Ex ─────────────────────────────────────────────

bitflags! {
    /// Modifier keys held during a keystroke (`KeyShiftState`).
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyShiftState: u32 {
        /// Right shift.
        const RIGHT_SHIFT_PRESSED = 0x0000_0001;
        /// Left shift.
        const LEFT_SHIFT_PRESSED = 0x0000_0002;
        /// Right control.
        const RIGHT_CONTROL_PRESSED = 0x0000_0004;
        /// Left control.
        const LEFT_CONTROL_PRESSED = 0x0000_0008;
        /// Right alt.
        const RIGHT_ALT_PRESSED = 0x0000_0010;
        /// Left alt.
        const LEFT_ALT_PRESSED = 0x0000_0020;
        /// Right logo key.
        const RIGHT_LOGO_PRESSED = 0x0000_0040;
        /// Left logo key.
        const LEFT_LOGO_PRESSED = 0x0000_0080;
        /// Menu key.
        const MENU_KEY_PRESSED = 0x0000_0100;
        /// SysReq key.
        const SYS_REQ_PRESSED = 0x0000_0200;
        /// The other bits are valid. Without it the state is unknown.
        const SHIFT_STATE_VALID = 0x8000_0000;
    }
}

bitflags! {
    /// Lock key state (`EFI_KEY_TOGGLE_STATE`).
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyToggleState: u8 {
        /// Scroll lock is on.
        const SCROLL_LOCK_ACTIVE = 0x01;
        /// Num lock is on.
        const NUM_LOCK_ACTIVE = 0x02;
        /// Caps lock is on.
        const CAPS_LOCK_ACTIVE = 0x04;
        /// Partial keystrokes (a lone modifier) are reported.
        const KEY_STATE_EXPOSED = 0x40;
        /// The other bits are valid.
        const TOGGLE_STATE_VALID = 0x80;
    }
}

/// Modifier and toggle state of a keystroke (`EFI_KEY_STATE`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    /// Raw [`KeyShiftState`] bits.
    pub key_shift_state: u32,
    /// Raw [`KeyToggleState`] bits.
    pub key_toggle_state: u8,
}

impl KeyState {
    /// The shift state, or `None` if the firmware did not mark it valid.
    #[must_use]
    pub const fn shift_state(&self) -> Option<KeyShiftState> {
        let state = KeyShiftState::from_bits_retain(self.key_shift_state);
        if state.contains(KeyShiftState::SHIFT_STATE_VALID) {
            Some(state)
        } else {
            None
        }
    }

    /// The toggle state, or `None` if the firmware did not mark it valid.
    #[must_use]
    pub const fn toggle_state(&self) -> Option<KeyToggleState> {
        let state = KeyToggleState::from_bits_retain(self.key_toggle_state);
        if state.contains(KeyToggleState::TOGGLE_STATE_VALID) {
            Some(state)
        } else {
            None
        }
    }
}

/// A keystroke with its modifier state (`EFI_KEY_DATA`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyData {
    /// The key itself.
    pub key: InputKey,
    /// Modifier and toggle state.
    pub key_state: KeyState,
}

/// `EFI_INPUT_RESET_EX`
pub type InputResetExFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextInputExProtocol,
    extended_verification: bool,
) -> EfiStatus;

/// `EFI_INPUT_READ_KEY_EX`
pub type InputReadKeyExFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextInputExProtocol,
    key_data: *mut KeyData,
) -> EfiStatus;

/// `EFI_SET_STATE`
pub type SetStateFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextInputExProtocol,
    key_toggle_state: *mut KeyToggleState,
) -> EfiStatus;

/// `EFI_KEY_NOTIFY_FUNCTION`
pub type KeyNotifyFn = unsafe extern "efiapi" fn(key_data: *mut KeyData) -> EfiStatus;

/// `EFI_REGISTER_KEYSTROKE_NOTIFY`
pub type RegisterKeystrokeNotifyFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextInputExProtocol,
    key_data: *mut KeyData,
    key_notification_function: KeyNotifyFn,
    notify_handle: *mut *mut c_void,
) -> EfiStatus;

/// `EFI_UNREGISTER_KEYSTROKE_NOTIFY`
pub type UnregisterKeystrokeNotifyFn = unsafe extern "efiapi" fn(
    this: *mut SimpleTextInputExProtocol,
    notification_handle: *mut c_void,
) -> EfiStatus;

/// The Simple Text Input Ex Protocol (`EFI_SIMPLE_TEXT_INPUT_EX_PROTOCOL`).
#[repr(C)]
pub struct SimpleTextInputExProtocol {
    /// Resets the input device.
    pub reset: InputResetExFn,
    /// Reads the next keystroke with modifier state.
    pub read_key_stroke_ex: InputReadKeyExFn,
    /// Signaled when a keystroke is available.
    pub wait_for_key_ex: EfiEvent,
    /// Sets the lock key state.
    pub set_state: SetStateFn,
    /// Registers a function called on a matching keystroke.
    pub register_key_notify: RegisterKeystrokeNotifyFn,
    /// Removes a registration.
    pub unregister_key_notify: UnregisterKeystrokeNotifyFn,
}

// SAFETY: matches `EFI_SIMPLE_TEXT_INPUT_EX_PROTOCOL`.
unsafe impl Protocol for SimpleTextInputExProtocol {
    const GUID: EfiGuid = EfiGuid::SIMPLE_TEXT_INPUT_EX_PROTOCOL;
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<InputKey>() == 4);
    assert!(core::mem::size_of::<KeyState>() == 8);
    assert!(core::mem::offset_of!(KeyState, key_toggle_state) == 4);
    assert!(core::mem::size_of::<KeyData>() == 12);
    assert!(core::mem::offset_of!(KeyData, key_state) == 4);
};

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(core::mem::size_of::<SimpleTextInputProtocol>() == 24);
    assert!(core::mem::offset_of!(SimpleTextInputProtocol, wait_for_key) == 16);
    assert!(core::mem::size_of::<SimpleTextInputExProtocol>() == 48);
    assert!(core::mem::offset_of!(SimpleTextInputExProtocol, wait_for_key_ex) == 16);
    assert!(core::mem::offset_of!(SimpleTextInputExProtocol, unregister_key_notify) == 40);
};
