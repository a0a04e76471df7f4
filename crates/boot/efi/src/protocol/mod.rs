//! Protocol interface definitions.
//!
//! A protocol is a table of function pointers (and sometimes data) that the firmware
//! installs on a handle under a GUID. The structures here are views of firmware-owned
//! memory: they are reached through pointers returned by boot services and are never built
//! by consumer code outside tests.
//!
//! - [`device_path`]: Device Path Protocol and a node walker
//! - [`file`]: Simple File System and File protocols
//! - [`load_file`]: Load File and Load File 2 protocols
//! - [`loaded_image`]: Loaded Image Protocol
//! - [`simple_text_input`]: Simple Text Input and Simple Text Input Ex protocols
//! - [`simple_text_output`]: Simple Text Output Protocol

use crate::EfiGuid;

pub mod device_path;
pub mod file;
pub mod load_file;
pub mod loaded_image;
pub mod simple_text_input;
pub mod simple_text_output;

/// A protocol interface structure that can be located by GUID.
///
/// # Safety
///
/// `GUID` must identify a protocol whose interface has exactly the layout of `Self`.
pub unsafe trait Protocol {
    /// The protocol GUID.
    const GUID: EfiGuid;
}

#[cfg(test)]
mod tests {
    use super::device_path::DevicePathProtocol;
    use super::file::SimpleFileSystemProtocol;
    use super::load_file::{LoadFile2Protocol, LoadFileProtocol};
    use super::loaded_image::LoadedImageProtocol;
    use super::simple_text_input::{SimpleTextInputExProtocol, SimpleTextInputProtocol};
    use super::simple_text_output::SimpleTextOutputProtocol;
    use super::*;

    #[test]
    fn protocol_guids_are_distinct() {
        let guids = [
            DevicePathProtocol::GUID,
            SimpleFileSystemProtocol::GUID,
            LoadFileProtocol::GUID,
            LoadFile2Protocol::GUID,
            LoadedImageProtocol::GUID,
            SimpleTextInputProtocol::GUID,
            SimpleTextInputExProtocol::GUID,
            SimpleTextOutputProtocol::GUID,
        ];
        for (i, a) in guids.iter().enumerate() {
            for b in &guids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
