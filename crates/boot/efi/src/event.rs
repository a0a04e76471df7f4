//! Event, timer and task priority services vocabulary (UEFI 2.10 §7.1).

use core::ffi::c_void;

use bitflags::bitflags;

use crate::{EfiEvent, EfiGuid, EfiStatus, EfiTpl};

bitflags! {
    /// Event type bits passed to `CreateEvent`/`CreateEventEx`.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventType: u32 {
        /// The event is a timer event and may be passed to `SetTimer`.
        const TIMER = 0x8000_0000;
        /// The event is allocated from runtime memory.
        const RUNTIME = 0x4000_0000;
        /// The notification function is queued when the event is waited on or checked.
        const NOTIFY_WAIT = 0x0000_0100;
        /// The notification function is queued when the event is signaled.
        const NOTIFY_SIGNAL = 0x0000_0200;
        /// Signaled on `ExitBootServices`. Cannot be combined with other types.
        const SIGNAL_EXIT_BOOT_SERVICES = 0x0000_0201;
        /// Signaled on `SetVirtualAddressMap`. Cannot be combined with other types.
        const SIGNAL_VIRTUAL_ADDRESS_CHANGE = 0x6000_0202;
    }
}

/// Timer mode for `SetTimer`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerDelay {
    /// Cancel the event's timer.
    Cancel = 0,
    /// Signal every `trigger_time` 100 ns units.
    Periodic = 1,
    /// Signal once after `trigger_time` 100 ns units.
    Relative = 2,
}

/// `EFI_EVENT_NOTIFY`
pub type EventNotifyFn = unsafe extern "efiapi" fn(event: EfiEvent, context: *mut c_void);

/// `EFI_CREATE_EVENT`
pub type CreateEventFn = unsafe extern "efiapi" fn(
    event_type: EventType,
    notify_tpl: EfiTpl,
    notify_function: Option<EventNotifyFn>,
    notify_context: *mut c_void,
    event: *mut EfiEvent,
) -> EfiStatus;

/// `EFI_CREATE_EVENT_EX`
pub type CreateEventExFn = unsafe extern "efiapi" fn(
    event_type: EventType,
    notify_tpl: EfiTpl,
    notify_function: Option<EventNotifyFn>,
    notify_context: *const c_void,
    event_group: *const EfiGuid,
    event: *mut EfiEvent,
) -> EfiStatus;

/// `EFI_CLOSE_EVENT`
pub type CloseEventFn = unsafe extern "efiapi" fn(event: EfiEvent) -> EfiStatus;

/// `EFI_SIGNAL_EVENT`
pub type SignalEventFn = unsafe extern "efiapi" fn(event: EfiEvent) -> EfiStatus;

/// `EFI_WAIT_FOR_EVENT`
pub type WaitForEventFn = unsafe extern "efiapi" fn(
    number_of_events: usize,
    event: *mut EfiEvent,
    index: *mut usize,
) -> EfiStatus;

/// `EFI_CHECK_EVENT`
pub type CheckEventFn = unsafe extern "efiapi" fn(event: EfiEvent) -> EfiStatus;

/// `EFI_SET_TIMER`. `trigger_time` is in 100 ns units.
pub type SetTimerFn = unsafe extern "efiapi" fn(
    event: EfiEvent,
    timer_type: TimerDelay,
    trigger_time: u64,
) -> EfiStatus;

/// `EFI_RAISE_TPL`. Returns the previous level.
pub type RaiseTplFn = unsafe extern "efiapi" fn(new_tpl: EfiTpl) -> EfiTpl;

/// `EFI_RESTORE_TPL`
pub type RestoreTplFn = unsafe extern "efiapi" fn(old_tpl: EfiTpl);

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<EventType>() == 4);
    assert!(core::mem::size_of::<TimerDelay>() == 4);
    // `Option<fn>` uses the null niche, matching an OPTIONAL function pointer.
    assert!(core::mem::size_of::<Option<EventNotifyFn>>() == core::mem::size_of::<usize>());
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_values() {
        assert_eq!(EventType::TIMER.bits(), 0x8000_0000);
        assert_eq!(EventType::RUNTIME.bits(), 0x4000_0000);
        assert_eq!(EventType::NOTIFY_WAIT.bits(), 0x100);
        assert_eq!(EventType::NOTIFY_SIGNAL.bits(), 0x200);
    }

    #[test]
    fn composite_event_types() {
        // EXIT_BOOT_SERVICES carries NOTIFY_SIGNAL, VIRTUAL_ADDRESS_CHANGE adds RUNTIME.
        assert!(EventType::SIGNAL_EXIT_BOOT_SERVICES.contains(EventType::NOTIFY_SIGNAL));
        assert!(
            EventType::SIGNAL_VIRTUAL_ADDRESS_CHANGE
                .contains(EventType::RUNTIME | EventType::NOTIFY_SIGNAL)
        );
        assert_eq!(EventType::SIGNAL_VIRTUAL_ADDRESS_CHANGE.bits(), 0x6000_0202);
    }

    #[test]
    fn timer_delay_values() {
        assert_eq!(TimerDelay::Cancel as u32, 0);
        assert_eq!(TimerDelay::Periodic as u32, 1);
        assert_eq!(TimerDelay::Relative as u32, 2);
    }
}
