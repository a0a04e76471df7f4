//! What the compiled `efi` crate actually contains.
//!
//! Layouts are read with `size_of`/`align_of`/`offset_of!` on the host, so a catalog only
//! describes the pointer width it was built for.

use std::mem::{align_of, size_of};

use efi::boot::{BootServices, OpenProtocolInformationEntry};
use efi::load_option::LoadOption;
use efi::memory::EfiMemoryDescriptor;
use efi::protocol::device_path::DevicePathProtocol;
use efi::protocol::file::{
    FileInfo, FileIoToken, FileProtocol, FileSystemInfo, SimpleFileSystemProtocol,
};
use efi::protocol::load_file::LoadFileProtocol;
use efi::protocol::loaded_image::LoadedImageProtocol;
use efi::protocol::simple_text_input::{
    InputKey, KeyData, KeyState, SimpleTextInputExProtocol, SimpleTextInputProtocol,
};
use efi::protocol::simple_text_output::{SimpleTextOutputMode, SimpleTextOutputProtocol};
use efi::runtime::{CapsuleHeader, EfiTime, EfiTimeCapabilities, RuntimeServices};
use efi::table::{ConfigurationTable, SystemTable, TableHeader};
use efi::{EfiGuid, EfiStatus};
use serde::Serialize;

/// Everything the tool knows how to compare.
#[derive(Debug, Serialize)]
pub struct Catalog {
    /// Pointer width of the build, in bits.
    pub pointer_width: usize,
    /// Structure layouts, in declaration order.
    pub structs: Vec<StructLayout>,
    /// Every defined status code.
    pub statuses: Vec<StatusEntry>,
    /// Named GUIDs.
    pub guids: Vec<GuidEntry>,
}

/// Size, alignment and field offsets of one `#[repr(C)]` type.
#[derive(Debug, Serialize)]
pub struct StructLayout {
    /// The UEFI type name, e.g. `EFI_SYSTEM_TABLE`.
    pub name: &'static str,
    /// `size_of` in bytes.
    pub size: usize,
    /// `align_of` in bytes.
    pub align: usize,
    /// Field offsets in declaration order.
    pub fields: Vec<FieldLayout>,
}

/// Offset of one field.
#[derive(Debug, Serialize)]
pub struct FieldLayout {
    /// Rust field name.
    pub name: &'static str,
    /// Byte offset from the start of the structure.
    pub offset: usize,
}

/// Class of a status code, from its high bit and value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    /// `EFI_SUCCESS`.
    Success,
    /// Non-zero with the high bit clear.
    Warning,
    /// High bit set.
    Error,
}

impl StatusClass {
    /// Classifies `status`.
    pub fn of(status: EfiStatus) -> Self {
        if status.is_success() {
            Self::Success
        } else if status.is_error() {
            Self::Error
        } else {
            Self::Warning
        }
    }
}

/// One named status code.
#[derive(Debug, Serialize)]
pub struct StatusEntry {
    /// `EFI_…` name.
    pub name: &'static str,
    /// Success, warning or error.
    pub class: StatusClass,
    /// Value with the high bit stripped, as numbered in Appendix D.
    pub code: usize,
}

/// One named GUID.
#[derive(Debug, Serialize)]
pub struct GuidEntry {
    /// UEFI name, e.g. `EFI_LOADED_IMAGE_PROTOCOL_GUID`.
    pub name: &'static str,
    /// Registry format, lower case.
    pub value: String,
}

impl StructLayout {
    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl Catalog {
    /// Builds the catalog for the running build.
    pub fn build() -> Self {
        Self {
            pointer_width: size_of::<usize>() * 8,
            structs: structs(),
            statuses: statuses(),
            guids: GUIDS
                .iter()
                .map(|&(name, guid)| GuidEntry {
                    name,
                    value: guid.to_string(),
                })
                .collect(),
        }
    }

    /// Keeps only entries whose name contains `pattern`, ignoring case.
    pub fn retain_matching(&mut self, pattern: &str) {
        let pattern = pattern.to_ascii_uppercase();
        let keep = |name: &str| name.to_ascii_uppercase().contains(&pattern);
        self.structs.retain(|s| keep(s.name));
        self.statuses.retain(|s| keep(s.name));
        self.guids.retain(|g| keep(g.name));
    }

    /// Looks up a structure by UEFI name.
    pub fn find_struct(&self, name: &str) -> Option<&StructLayout> {
        self.structs.iter().find(|s| s.name == name)
    }

    /// Looks up a status by `EFI_…` name.
    pub fn find_status(&self, name: &str) -> Option<&StatusEntry> {
        self.statuses.iter().find(|s| s.name == name)
    }

    /// Looks up a GUID by UEFI name.
    pub fn find_guid(&self, name: &str) -> Option<&GuidEntry> {
        self.guids.iter().find(|g| g.name == name)
    }
}

fn statuses() -> Vec<StatusEntry> {
    EfiStatus::ALL
        .iter()
        .filter_map(|&status| {
            Some(StatusEntry {
                name: status.name()?,
                class: StatusClass::of(status),
                code: status.code(),
            })
        })
        .collect()
}

macro_rules! layout {
    ($name:literal, $ty:ty { $($field:ident),* $(,)? }) => {
        StructLayout {
            name: $name,
            size: size_of::<$ty>(),
            align: align_of::<$ty>(),
            fields: vec![$(FieldLayout {
                name: stringify!($field),
                offset: core::mem::offset_of!($ty, $field),
            }),*],
        }
    };
}

#[allow(clippy::too_many_lines)]
fn structs() -> Vec<StructLayout> {
    vec![
        layout!("EFI_GUID", EfiGuid {
            time_low,
            time_mid,
            time_high_and_version,
            clock_seq_high_and_reserved,
            clock_seq_low,
            node,
        }),
        layout!("EFI_TABLE_HEADER", TableHeader {
            signature,
            revision,
            header_size,
            crc32,
            reserved,
        }),
        layout!("EFI_CONFIGURATION_TABLE", ConfigurationTable { vendor_guid, vendor_table }),
        layout!("EFI_SYSTEM_TABLE", SystemTable {
            header,
            firmware_vendor,
            firmware_revision,
            console_in_handle,
            console_in,
            console_out_handle,
            console_out,
            standard_error_handle,
            standard_error,
            runtime_services,
            boot_services,
            number_of_table_entries,
            configuration_table,
        }),
        layout!("EFI_BOOT_SERVICES", BootServices {
            header,
            raise_tpl,
            restore_tpl,
            allocate_pages,
            free_pages,
            get_memory_map,
            allocate_pool,
            free_pool,
            create_event,
            set_timer,
            wait_for_event,
            signal_event,
            close_event,
            check_event,
            install_protocol_interface,
            reinstall_protocol_interface,
            uninstall_protocol_interface,
            handle_protocol,
            reserved,
            register_protocol_notify,
            locate_handle,
            locate_device_path,
            install_configuration_table,
            load_image,
            start_image,
            exit,
            unload_image,
            exit_boot_services,
            get_next_monotonic_count,
            stall,
            set_watchdog_timer,
            connect_controller,
            disconnect_controller,
            open_protocol,
            close_protocol,
            open_protocol_information,
            protocols_per_handle,
            locate_handle_buffer,
            locate_protocol,
            install_multiple_protocol_interfaces,
            uninstall_multiple_protocol_interfaces,
            calculate_crc32,
            copy_mem,
            set_mem,
            create_event_ex,
        }),
        layout!("EFI_OPEN_PROTOCOL_INFORMATION_ENTRY", OpenProtocolInformationEntry {
            agent_handle,
            controller_handle,
            attributes,
            open_count,
        }),
        layout!("EFI_RUNTIME_SERVICES", RuntimeServices {
            header,
            get_time,
            set_time,
            get_wakeup_time,
            set_wakeup_time,
            set_virtual_address_map,
            convert_pointer,
            get_variable,
            get_next_variable_name,
            set_variable,
            get_next_high_monotonic_count,
            reset_system,
            update_capsule,
            query_capsule_capabilities,
            query_variable_info,
        }),
        layout!("EFI_TIME", EfiTime {
            year,
            month,
            day,
            hour,
            minute,
            second,
            pad1,
            nanosecond,
            time_zone,
            daylight,
            pad2,
        }),
        layout!("EFI_TIME_CAPABILITIES", EfiTimeCapabilities {
            resolution,
            accuracy,
            sets_to_zero,
        }),
        layout!("EFI_CAPSULE_HEADER", CapsuleHeader {
            capsule_guid,
            header_size,
            flags,
            capsule_image_size,
        }),
        layout!("EFI_MEMORY_DESCRIPTOR", EfiMemoryDescriptor {
            memory_type,
            physical_start,
            virtual_start,
            number_of_pages,
            attribute,
        }),
        layout!("EFI_LOAD_OPTION", LoadOption { attributes, file_path_list_length }),
        layout!("EFI_DEVICE_PATH_PROTOCOL", DevicePathProtocol { node_type, sub_type, length }),
        layout!("EFI_LOADED_IMAGE_PROTOCOL", LoadedImageProtocol {
            revision,
            parent_handle,
            system_table,
            device_handle,
            file_path,
            reserved,
            load_options_size,
            load_options,
            image_base,
            image_size,
            image_code_type,
            image_data_type,
            unload,
        }),
        layout!("EFI_LOAD_FILE_PROTOCOL", LoadFileProtocol { load_file }),
        layout!("EFI_SIMPLE_TEXT_OUTPUT_PROTOCOL", SimpleTextOutputProtocol {
            reset,
            output_string,
            test_string,
            query_mode,
            set_mode,
            set_attribute,
            clear_screen,
            set_cursor_position,
            enable_cursor,
            mode,
        }),
        layout!("SIMPLE_TEXT_OUTPUT_MODE", SimpleTextOutputMode {
            max_mode,
            mode,
            attribute,
            cursor_column,
            cursor_row,
            cursor_visible,
        }),
        layout!("EFI_SIMPLE_TEXT_INPUT_PROTOCOL", SimpleTextInputProtocol {
            reset,
            read_key_stroke,
            wait_for_key,
        }),
        layout!("EFI_INPUT_KEY", InputKey { scan_code, unicode_char }),
        layout!("EFI_KEY_STATE", KeyState { key_shift_state, key_toggle_state }),
        layout!("EFI_KEY_DATA", KeyData { key, key_state }),
        layout!("EFI_SIMPLE_TEXT_INPUT_EX_PROTOCOL", SimpleTextInputExProtocol {
            reset,
            read_key_stroke_ex,
            wait_for_key_ex,
            set_state,
            register_key_notify,
            unregister_key_notify,
        }),
        layout!("EFI_SIMPLE_FILE_SYSTEM_PROTOCOL", SimpleFileSystemProtocol {
            revision,
            open_volume,
        }),
        layout!("EFI_FILE_PROTOCOL", FileProtocol {
            revision,
            open,
            close,
            delete,
            read,
            write,
            get_position,
            set_position,
            get_info,
            set_info,
            flush,
            open_ex,
            read_ex,
            write_ex,
            flush_ex,
        }),
        layout!("EFI_FILE_IO_TOKEN", FileIoToken { event, status, buffer_size, buffer }),
        layout!("EFI_FILE_INFO", FileInfo {
            size,
            file_size,
            physical_size,
            create_time,
            last_access_time,
            modification_time,
            attribute,
            file_name,
        }),
        layout!("EFI_FILE_SYSTEM_INFO", FileSystemInfo {
            size,
            read_only,
            volume_size,
            free_space,
            block_size,
            volume_label,
        }),
    ]
}

/// GUIDs by their UEFI names.
pub const GUIDS: &[(&str, EfiGuid)] = &[
    ("EFI_GLOBAL_VARIABLE", EfiGuid::GLOBAL_VARIABLE),
    ("EFI_LOADED_IMAGE_PROTOCOL_GUID", EfiGuid::LOADED_IMAGE_PROTOCOL),
    ("EFI_LOADED_IMAGE_DEVICE_PATH_PROTOCOL_GUID", EfiGuid::LOADED_IMAGE_DEVICE_PATH_PROTOCOL),
    ("EFI_DEVICE_PATH_PROTOCOL_GUID", EfiGuid::DEVICE_PATH_PROTOCOL),
    ("EFI_SIMPLE_TEXT_INPUT_EX_PROTOCOL_GUID", EfiGuid::SIMPLE_TEXT_INPUT_EX_PROTOCOL),
    ("EFI_SIMPLE_TEXT_INPUT_PROTOCOL_GUID", EfiGuid::SIMPLE_TEXT_INPUT_PROTOCOL),
    ("EFI_SIMPLE_TEXT_OUTPUT_PROTOCOL_GUID", EfiGuid::SIMPLE_TEXT_OUTPUT_PROTOCOL),
    ("EFI_LOAD_FILE_PROTOCOL_GUID", EfiGuid::LOAD_FILE_PROTOCOL),
    ("EFI_LOAD_FILE2_PROTOCOL_GUID", EfiGuid::LOAD_FILE2_PROTOCOL),
    ("EFI_SIMPLE_FILE_SYSTEM_PROTOCOL_GUID", EfiGuid::SIMPLE_FILE_SYSTEM_PROTOCOL),
    ("EFI_FILE_INFO_ID", EfiGuid::FILE_INFO),
    ("EFI_FILE_SYSTEM_INFO_ID", EfiGuid::FILE_SYSTEM_INFO),
    ("EFI_FILE_SYSTEM_VOLUME_LABEL_ID", EfiGuid::FILE_SYSTEM_VOLUME_LABEL),
    ("EFI_EVENT_GROUP_EXIT_BOOT_SERVICES", EfiGuid::EVENT_GROUP_EXIT_BOOT_SERVICES),
    ("EFI_EVENT_GROUP_VIRTUAL_ADDRESS_CHANGE", EfiGuid::EVENT_GROUP_VIRTUAL_ADDRESS_CHANGE),
    ("EFI_EVENT_GROUP_MEMORY_MAP_CHANGE", EfiGuid::EVENT_GROUP_MEMORY_MAP_CHANGE),
    ("EFI_EVENT_GROUP_READY_TO_BOOT", EfiGuid::EVENT_GROUP_READY_TO_BOOT),
    ("EFI_ACPI_TABLE_GUID", EfiGuid::ACPI_TABLE),
    ("EFI_ACPI_20_TABLE_GUID", EfiGuid::ACPI_20_TABLE),
    ("SMBIOS_TABLE_GUID", EfiGuid::SMBIOS_TABLE),
    ("SMBIOS3_TABLE_GUID", EfiGuid::SMBIOS3_TABLE),
    ("EFI_DTB_TABLE_GUID", EfiGuid::DEVICE_TREE_TABLE),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_names_are_unique() {
        let catalog = Catalog::build();
        for (i, s) in catalog.structs.iter().enumerate() {
            assert!(
                catalog.structs[i + 1..].iter().all(|t| t.name != s.name),
                "duplicate {}",
                s.name
            );
        }
        for (i, (name, _)) in GUIDS.iter().enumerate() {
            assert!(GUIDS[i + 1..].iter().all(|(n, _)| n != name), "duplicate {name}");
        }
    }

    #[test]
    fn offsets_are_within_size() {
        for s in Catalog::build().structs {
            for f in &s.fields {
                assert!(f.offset <= s.size, "{}.{} at {}", s.name, f.name, f.offset);
            }
        }
    }

    #[test]
    fn status_classes() {
        let catalog = Catalog::build();
        let success = catalog.find_status("EFI_SUCCESS").unwrap();
        assert_eq!(success.class, StatusClass::Success);
        let warning = catalog.find_status("EFI_WARN_DELETE_FAILURE").unwrap();
        assert_eq!((warning.class, warning.code), (StatusClass::Warning, 2));
        let error = catalog.find_status("EFI_END_OF_FILE").unwrap();
        assert_eq!((error.class, error.code), (StatusClass::Error, 31));
    }

    #[test]
    fn guids_render_in_registry_format() {
        let catalog = Catalog::build();
        let acpi = catalog.find_guid("EFI_ACPI_20_TABLE_GUID").unwrap();
        assert_eq!(acpi.value, "8868e871-e4f1-11d3-bc22-0080c73c8881");
    }
}
