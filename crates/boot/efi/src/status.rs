//! UEFI status codes (UEFI 2.10 Appendix D).
//!
//! [`EfiStatus`] wraps the native-width `EFI_STATUS` value. The code space is split in three:
//!
//! - **Success**: `0`.
//! - **Warnings**: non-zero with the high bit clear. The operation completed, with caveats.
//! - **Errors**: high bit set. The low bits carry the error number from Appendix D, so
//!   `EFI_LOAD_ERROR` is `ERROR_BIT | 1`.

use core::fmt;

/// The high bit of `usize`, set for every error code.
pub const ERROR_BIT: usize = 1 << (usize::BITS - 1);

/// A UEFI status code, layout-compatible with `EFI_STATUS`.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EfiStatus(pub usize);

macro_rules! status_codes {
    ($( $(#[$doc:meta])* $name:ident = $value:expr => $text:literal; )*) => {
        impl EfiStatus {
            $(
                $(#[$doc])*
                pub const $name: Self = Self($value);
            )*

            /// Every status code defined by the specification, in numeric order within
            /// each class (success, warnings, errors).
            pub const ALL: &'static [Self] = &[$(Self::$name),*];

            /// Returns the specification name (`EFI_…`) of this status, if it is a defined code.
            #[must_use]
            pub const fn name(self) -> Option<&'static str> {
                match self {
                    $(Self::$name => Some($text),)*
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    /// The operation completed successfully.
    SUCCESS = 0 => "EFI_SUCCESS";

    /// The string contained characters that could not be rendered and were skipped.
    WARN_UNKNOWN_GLYPH = 1 => "EFI_WARN_UNKNOWN_GLYPH";
    /// The handle was closed, but the file was not deleted.
    WARN_DELETE_FAILURE = 2 => "EFI_WARN_DELETE_FAILURE";
    /// The handle was closed, but the data to the file was not flushed properly.
    WARN_WRITE_FAILURE = 3 => "EFI_WARN_WRITE_FAILURE";
    /// The resulting buffer was too small, and the data was truncated.
    WARN_BUFFER_TOO_SMALL = 4 => "EFI_WARN_BUFFER_TOO_SMALL";
    /// The data has not been updated within the timeframe set by local policy.
    WARN_STALE_DATA = 5 => "EFI_WARN_STALE_DATA";
    /// The resulting buffer contains a UEFI-compliant file system.
    WARN_FILE_SYSTEM = 6 => "EFI_WARN_FILE_SYSTEM";
    /// The operation will be processed across a system reset.
    WARN_RESET_REQUIRED = 7 => "EFI_WARN_RESET_REQUIRED";

    /// The image failed to load.
    LOAD_ERROR = ERROR_BIT | 1 => "EFI_LOAD_ERROR";
    /// A parameter was incorrect.
    INVALID_PARAMETER = ERROR_BIT | 2 => "EFI_INVALID_PARAMETER";
    /// The operation is not supported.
    UNSUPPORTED = ERROR_BIT | 3 => "EFI_UNSUPPORTED";
    /// The buffer was not the proper size for the request.
    BAD_BUFFER_SIZE = ERROR_BIT | 4 => "EFI_BAD_BUFFER_SIZE";
    /// The buffer is not large enough to hold the requested data.
    BUFFER_TOO_SMALL = ERROR_BIT | 5 => "EFI_BUFFER_TOO_SMALL";
    /// There is no data pending upon return.
    NOT_READY = ERROR_BIT | 6 => "EFI_NOT_READY";
    /// The physical device reported an error while attempting the operation.
    DEVICE_ERROR = ERROR_BIT | 7 => "EFI_DEVICE_ERROR";
    /// The device cannot be written to.
    WRITE_PROTECTED = ERROR_BIT | 8 => "EFI_WRITE_PROTECTED";
    /// A resource has run out.
    OUT_OF_RESOURCES = ERROR_BIT | 9 => "EFI_OUT_OF_RESOURCES";
    /// An inconsistency was detected on the file system.
    VOLUME_CORRUPTED = ERROR_BIT | 10 => "EFI_VOLUME_CORRUPTED";
    /// There is no more space on the file system.
    VOLUME_FULL = ERROR_BIT | 11 => "EFI_VOLUME_FULL";
    /// The device does not contain any medium to perform the operation.
    NO_MEDIA = ERROR_BIT | 12 => "EFI_NO_MEDIA";
    /// The medium in the device has changed since the last access.
    MEDIA_CHANGED = ERROR_BIT | 13 => "EFI_MEDIA_CHANGED";
    /// The item was not found.
    NOT_FOUND = ERROR_BIT | 14 => "EFI_NOT_FOUND";
    /// Access was denied.
    ACCESS_DENIED = ERROR_BIT | 15 => "EFI_ACCESS_DENIED";
    /// The server was not found or did not respond to the request.
    NO_RESPONSE = ERROR_BIT | 16 => "EFI_NO_RESPONSE";
    /// A mapping to a device does not exist.
    NO_MAPPING = ERROR_BIT | 17 => "EFI_NO_MAPPING";
    /// The timeout time expired.
    TIMEOUT = ERROR_BIT | 18 => "EFI_TIMEOUT";
    /// The protocol has not been started.
    NOT_STARTED = ERROR_BIT | 19 => "EFI_NOT_STARTED";
    /// The protocol has already been started.
    ALREADY_STARTED = ERROR_BIT | 20 => "EFI_ALREADY_STARTED";
    /// The operation was aborted.
    ABORTED = ERROR_BIT | 21 => "EFI_ABORTED";
    /// An ICMP error occurred during the network operation.
    ICMP_ERROR = ERROR_BIT | 22 => "EFI_ICMP_ERROR";
    /// A TFTP error occurred during the network operation.
    TFTP_ERROR = ERROR_BIT | 23 => "EFI_TFTP_ERROR";
    /// A protocol error occurred during the network operation.
    PROTOCOL_ERROR = ERROR_BIT | 24 => "EFI_PROTOCOL_ERROR";
    /// The function encountered an internal version that was incompatible.
    INCOMPATIBLE_VERSION = ERROR_BIT | 25 => "EFI_INCOMPATIBLE_VERSION";
    /// The function was not performed due to a security violation.
    SECURITY_VIOLATION = ERROR_BIT | 26 => "EFI_SECURITY_VIOLATION";
    /// A CRC error was detected.
    CRC_ERROR = ERROR_BIT | 27 => "EFI_CRC_ERROR";
    /// Beginning or end of media was reached.
    END_OF_MEDIA = ERROR_BIT | 28 => "EFI_END_OF_MEDIA";
    /// The end of the file was reached.
    END_OF_FILE = ERROR_BIT | 31 => "EFI_END_OF_FILE";
    /// The language specified was invalid.
    INVALID_LANGUAGE = ERROR_BIT | 32 => "EFI_INVALID_LANGUAGE";
    /// The security status of the data is unknown or compromised.
    COMPROMISED_DATA = ERROR_BIT | 33 => "EFI_COMPROMISED_DATA";
    /// There is an address conflict during IP address configuration.
    IP_ADDRESS_CONFLICT = ERROR_BIT | 34 => "EFI_IP_ADDRESS_CONFLICT";
    /// An HTTP error occurred during the network operation.
    HTTP_ERROR = ERROR_BIT | 35 => "EFI_HTTP_ERROR";
}

impl EfiStatus {
    /// Builds the error status with the given Appendix D error number.
    #[inline]
    #[must_use]
    pub const fn from_error_code(code: usize) -> Self {
        Self(ERROR_BIT | code)
    }

    /// Returns the status number with the error bit stripped.
    #[inline]
    #[must_use]
    pub const fn code(self) -> usize {
        self.0 & !ERROR_BIT
    }

    /// Returns `true` for `EFI_SUCCESS`.
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the high bit is set.
    #[inline]
    #[must_use]
    pub const fn is_error(self) -> bool {
        self.0 & ERROR_BIT != 0
    }

    /// Returns `true` for non-zero codes with the high bit clear.
    #[inline]
    #[must_use]
    pub const fn is_warning(self) -> bool {
        !self.is_success() && !self.is_error()
    }

    /// Converts to a `Result`, treating warnings as success.
    ///
    /// # Errors
    ///
    /// Returns `Err(self)` if the status is an error.
    #[inline]
    pub const fn to_result(self) -> Result<(), Self> {
        if self.is_error() { Err(self) } else { Ok(()) }
    }

    /// Converts to a `Result` carrying `value` on success or warning.
    ///
    /// # Errors
    ///
    /// Returns `Err(self)` if the status is an error.
    #[inline]
    pub fn to_result_with<T>(self, value: T) -> Result<T, Self> {
        self.to_result().map(|()| value)
    }
}

impl From<EfiStatus> for usize {
    fn from(status: EfiStatus) -> Self {
        status.0
    }
}

impl fmt::Debug for EfiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "EfiStatus({name})"),
            None => write!(f, "EfiStatus({:#x})", self.0),
        }
    }
}

impl fmt::Display for EfiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name() {
            return f.write_str(name);
        }
        if self.is_error() {
            write!(f, "unknown error {}", self.code())
        } else {
            write!(f, "unknown warning {}", self.0)
        }
    }
}

impl core::error::Error for EfiStatus {}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = assert!(core::mem::size_of::<EfiStatus>() == core::mem::size_of::<usize>());
