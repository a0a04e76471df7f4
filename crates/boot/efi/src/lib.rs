//! Rust definitions of the UEFI 2.10 binary interface.
//!
//! This crate mirrors the data layout of the [Unified Extensible Firmware Interface
//! (UEFI)](https://uefi.org/specs/UEFI/2.10/) specification: the common scalar types, GUIDs,
//! status codes, the boot and runtime service tables, and the console, file system, load file
//! and loaded image protocols. Every `#[repr(C)]` type here is checked at compile time against
//! the offsets and sizes the specification publishes.
//!
//! # Organization
//!
//! - [`guid`] - [`EfiGuid`] and the well-known protocol, table and event group GUIDs
//! - [`status`] - [`EfiStatus`] with every success, warning and error code
//! - [`memory`] - allocation types, memory types, descriptors and a memory map iterator
//! - [`event`] - event type flags, timer delays and the event service signatures
//! - [`table`] - table header, [`SystemTable`](table::SystemTable), configuration tables
//! - [`boot`] - the Boot Services table and its service signatures
//! - [`runtime`] - the Runtime Services table, time, capsules and variables
//! - [`load_option`] - `Boot####` load option header and parser
//! - [`protocol`] - protocol interface structures
//! - [`api`] - safe wrappers built on the raw tables
//! - [`ucs2`] - UTF-8 / UCS-2 conversion used by the wrappers
//!
//! # Calling Convention
//!
//! Every firmware function pointer is declared `unsafe extern "efiapi" fn(...)`, which resolves
//! to the MS x64 convention on x86-64 and to the platform C convention elsewhere.
//!
//! # Function Tables
//!
//! Service tables and protocol structures are vtables owned by the firmware. Consumer code only
//! ever receives pointers to them; none of these types are meant to be constructed outside of
//! tests.
//!
//! ## `bool` in FFI
//!
//! UEFI's `BOOLEAN` is a `UINT8` restricted to `TRUE` (1) and `FALSE` (0). Function signatures
//! use Rust's `bool` for it, which is sound because compliant firmware only passes those two
//! values. The [`Boolean`] alias is used for fields whose contents are not under our control.

#![cfg_attr(not(test), no_std)]

pub mod api;
pub mod boot;
pub mod event;
pub mod guid;
pub mod load_option;
#[cfg(feature = "logger")]
pub mod logger;
pub mod memory;
pub mod protocol;
pub mod runtime;
pub mod status;
pub mod table;
pub mod ucs2;

use core::ffi::c_void;

pub use guid::EfiGuid;
pub use status::EfiStatus;

// ── Common types (UEFI 2.10 §2.3.1) ──────────────────────────────────

/// Logical boolean, one byte. `0` is false, `1` is true.
pub type Boolean = u8;
/// Signed value of native width.
pub type Intn = isize;
/// Unsigned value of native width.
pub type Uintn = usize;
/// 1-byte signed value.
pub type Int8 = i8;
/// 1-byte unsigned value.
pub type Uint8 = u8;
/// 2-byte signed value.
pub type Int16 = i16;
/// 2-byte unsigned value.
pub type Uint16 = u16;
/// 4-byte signed value.
pub type Int32 = i32;
/// 4-byte unsigned value.
pub type Uint32 = u32;
/// 8-byte signed value.
pub type Int64 = i64;
/// 8-byte unsigned value.
pub type Uint64 = u64;
/// 1-byte character.
pub type Char8 = u8;
/// 2-byte UCS-2 character.
pub type Char16 = u16;

/// An opaque handle to a UEFI object (protocol, image, device, etc.).
pub type EfiHandle = *mut c_void;

/// An opaque handle to a UEFI event.
pub type EfiEvent = *mut c_void;

/// A logical block address.
pub type EfiLba = u64;

/// A task priority level.
pub type EfiTpl = usize;

/// A physical memory address.
pub type EfiPhysicalAddress = u64;

/// A virtual memory address.
pub type EfiVirtualAddress = u64;

/// `BOOLEAN` false.
pub const FALSE: Boolean = 0;
/// `BOOLEAN` true.
pub const TRUE: Boolean = 1;

/// Task Priority Level constants (UEFI 2.10 §7.1.8).
pub mod tpl {
    use super::EfiTpl;

    /// Normal application level.
    pub const APPLICATION: EfiTpl = 4;
    /// Level for most notification callbacks.
    pub const CALLBACK: EfiTpl = 8;
    /// Level for notifications that must run with minimal delay.
    pub const NOTIFY: EfiTpl = 16;
    /// Highest level; interrupts are masked.
    pub const HIGH_LEVEL: EfiTpl = 31;
}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<EfiLba>() == 8);
    assert!(core::mem::size_of::<EfiPhysicalAddress>() == 8);
    assert!(core::mem::size_of::<Char16>() == 2);
    assert!(core::mem::size_of::<EfiTpl>() == core::mem::size_of::<*mut c_void>());
};
