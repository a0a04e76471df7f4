//! `log` backend that writes to a UEFI text console.
//!
//! ```ignore
//! let st = unsafe { SystemTable::<Boot>::from_raw(image, system_table) };
//! efi::logger::init(&st, log::LevelFilter::Info)?;
//! log::info!("firmware {}", st.revision());
//! ```
//!
//! The console belongs to boot services, so [`SystemTable::exit_boot_services`] detaches
//! the logger; later records are dropped.

use core::fmt::Write;
use core::sync::atomic::{AtomicPtr, Ordering};

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::api::{Boot, Console, SystemTable};
use crate::protocol::simple_text_output::{SimpleTextOutputProtocol, color};

/// The logger installed by [`init`].
pub static LOGGER: ConsoleLogger = ConsoleLogger::new();

/// A [`Log`] implementation over a Simple Text Output Protocol.
///
/// Warnings and errors are written in color; the previous attribute is restored afterwards.
pub struct ConsoleLogger {
    console: AtomicPtr<SimpleTextOutputProtocol>,
}

impl ConsoleLogger {
    /// A logger with no console attached.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            console: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    /// Directs output to `console`.
    ///
    /// # Safety
    ///
    /// `console` must stay valid until [`detach`](Self::detach) is called.
    pub unsafe fn attach(&self, console: *mut SimpleTextOutputProtocol) {
        self.console.store(console, Ordering::Release);
    }

    /// Stops writing to the console.
    pub fn detach(&self) {
        self.console.store(core::ptr::null_mut(), Ordering::Release);
    }

    /// Returns `true` while a console is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        !self.console.load(Ordering::Acquire).is_null()
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        self.is_attached()
    }

    fn log(&self, record: &Record<'_>) {
        let raw = self.console.load(Ordering::Acquire);
        if raw.is_null() {
            return;
        }
        // SAFETY: `attach` requires the console to stay valid while attached.
        let mut console = unsafe { Console::from_raw(raw) };

        let highlight = match record.level() {
            log::Level::Error => Some(color::LIGHT_RED),
            log::Level::Warn => Some(color::YELLOW),
            _ => None,
        };
        // Without a published mode the attribute cannot be restored, so stay uncolored.
        let previous = console.mode().map(|mode| mode.attribute);
        let restore = match (highlight, previous) {
            (Some(foreground), Some(attribute)) => {
                let _ = console.set_attribute(foreground, color::BLACK);
                Some(color::split(usize::try_from(attribute).unwrap_or(0)))
            }
            _ => None,
        };
        let _ = write!(console, "[{:<5}] ", record.level());
        if let Some((foreground, background)) = restore {
            let _ = console.set_attribute(foreground, background);
        }
        let _ = writeln!(console, "{}: {}", record.target(), record.args());
    }

    fn flush(&self) {}
}

/// Attaches [`LOGGER`] to the console of `st` and installs it as the global logger.
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger was already installed.
pub fn init(st: &SystemTable<Boot>, level: LevelFilter) -> Result<(), SetLoggerError> {
    // SAFETY: the console stays valid until `exit_boot_services`, which detaches it.
    unsafe { LOGGER.attach(st.console_out().as_raw()) };
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::console::tests::{fake_console, take_attribute, take_output};
    use crate::protocol::simple_text_output::SimpleTextOutputMode;

    fn log_warning(logger: &ConsoleLogger) {
        logger.log(
            &Record::builder()
                .level(log::Level::Warn)
                .target("loader")
                .args(format_args!("no kernel"))
                .build(),
        );
    }

    fn log_entries(logger: &ConsoleLogger, count: usize) {
        logger.log(
            &Record::builder()
                .level(log::Level::Info)
                .target("loader")
                .args(format_args!("found {count} entries"))
                .build(),
        );
    }

    #[test]
    fn writes_records_while_attached() {
        let logger = ConsoleLogger::new();
        log_entries(&logger, 3);
        assert!(take_output().is_empty());

        let mut proto = fake_console(core::ptr::null_mut());
        unsafe { logger.attach(&raw mut proto) };
        let metadata = Metadata::builder().level(log::Level::Info).target("loader").build();
        assert!(logger.enabled(&metadata));
        log_entries(&logger, 3);
        assert_eq!(take_output().concat(), "[INFO ] loader: found 3 entries\r\n");

        logger.detach();
        assert!(!logger.is_attached());
        assert!(!logger.enabled(&metadata));
        log_entries(&logger, 4);
        assert!(take_output().is_empty());
    }

    #[test]
    fn warnings_restore_the_previous_attribute() {
        let mut mode = SimpleTextOutputMode {
            attribute: 0x17,
            ..SimpleTextOutputMode::default()
        };
        let mut proto = fake_console(&raw mut mode);
        let logger = ConsoleLogger::new();
        unsafe { logger.attach(&raw mut proto) };

        log_warning(&logger);
        assert_eq!(take_attribute(), Some(color::attribute(color::LIGHT_GRAY, color::BLUE)));
        assert_eq!(take_output().concat(), "[WARN ] loader: no kernel\r\n");
    }

    #[test]
    fn warnings_stay_uncolored_without_a_mode() {
        let mut proto = fake_console(core::ptr::null_mut());
        let logger = ConsoleLogger::new();
        unsafe { logger.attach(&raw mut proto) };

        log_warning(&logger);
        assert_eq!(take_attribute(), None);
        assert_eq!(take_output().concat(), "[WARN ] loader: no kernel\r\n");
    }
}
