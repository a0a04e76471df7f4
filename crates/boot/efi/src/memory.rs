//! Memory allocation services vocabulary (UEFI 2.10 §7.2).
//!
//! # Memory Map Stride
//!
//! `GetMemoryMap` reports a `descriptor_size` that may be larger than
//! [`EfiMemoryDescriptor`]. Walking the map must step by that value; [`MemoryMap`] does.

use core::ffi::c_void;

use bitflags::bitflags;

use crate::{EfiPhysicalAddress, EfiStatus, EfiVirtualAddress};

/// Size of a UEFI page in bytes. Page counts in descriptors are always in this unit.
pub const PAGE_SIZE: u64 = 4096;

/// The descriptor version this crate's [`EfiMemoryDescriptor`] describes.
pub const MEMORY_DESCRIPTOR_VERSION: u32 = 1;

/// Allocation strategy for `AllocatePages`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EfiAllocateType {
    /// Any range of pages that satisfies the request.
    AllocateAnyPages = 0,
    /// Any range whose uppermost address is at or below the input address.
    AllocateMaxAddress = 1,
    /// Exactly the pages at the input address.
    AllocateAddress = 2,
    /// Upper bound of the enumeration; not a valid argument.
    MaxAllocateType = 3,
}

/// The type of a memory region.
///
/// Kept as an open `u32` newtype instead of a Rust enum: firmware reports OEM
/// (`0x7000_0000..`) and OS loader (`0x8000_0000..`) values that a closed enum
/// could not represent.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EfiMemoryType(pub u32);

impl EfiMemoryType {
    /// Not usable.
    pub const RESERVED: Self = Self(0);
    /// Code of a loaded UEFI application.
    pub const LOADER_CODE: Self = Self(1);
    /// Data of a loaded UEFI application and its default pool allocations.
    pub const LOADER_DATA: Self = Self(2);
    /// Code of a loaded boot services driver.
    pub const BOOT_SERVICES_CODE: Self = Self(3);
    /// Data of a loaded boot services driver.
    pub const BOOT_SERVICES_DATA: Self = Self(4);
    /// Code of a loaded runtime services driver.
    pub const RUNTIME_SERVICES_CODE: Self = Self(5);
    /// Data of a loaded runtime services driver.
    pub const RUNTIME_SERVICES_DATA: Self = Self(6);
    /// Free, unallocated memory.
    pub const CONVENTIONAL: Self = Self(7);
    /// Memory in which errors have been detected.
    pub const UNUSABLE: Self = Self(8);
    /// Memory holding ACPI tables, reclaimable once they are consumed.
    pub const ACPI_RECLAIM: Self = Self(9);
    /// Address space reserved for ACPI firmware use.
    pub const ACPI_NVS: Self = Self(10);
    /// Memory-mapped I/O requiring a runtime mapping.
    pub const MEMORY_MAPPED_IO: Self = Self(11);
    /// Memory-mapped I/O port space.
    pub const MEMORY_MAPPED_IO_PORT_SPACE: Self = Self(12);
    /// Processor firmware code.
    pub const PAL_CODE: Self = Self(13);
    /// Byte-addressable non-volatile memory.
    pub const PERSISTENT: Self = Self(14);
    /// Memory that must be accepted before use by the isolation architecture.
    pub const UNACCEPTED: Self = Self(15);
    /// Upper bound of the defined types.
    pub const MAX: Self = Self(16);

    /// Returns the specification name for defined types.
    #[must_use]
    pub const fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::RESERVED => "EfiReservedMemoryType",
            Self::LOADER_CODE => "EfiLoaderCode",
            Self::LOADER_DATA => "EfiLoaderData",
            Self::BOOT_SERVICES_CODE => "EfiBootServicesCode",
            Self::BOOT_SERVICES_DATA => "EfiBootServicesData",
            Self::RUNTIME_SERVICES_CODE => "EfiRuntimeServicesCode",
            Self::RUNTIME_SERVICES_DATA => "EfiRuntimeServicesData",
            Self::CONVENTIONAL => "EfiConventionalMemory",
            Self::UNUSABLE => "EfiUnusableMemory",
            Self::ACPI_RECLAIM => "EfiACPIReclaimMemory",
            Self::ACPI_NVS => "EfiACPIMemoryNVS",
            Self::MEMORY_MAPPED_IO => "EfiMemoryMappedIO",
            Self::MEMORY_MAPPED_IO_PORT_SPACE => "EfiMemoryMappedIOPortSpace",
            Self::PAL_CODE => "EfiPalCode",
            Self::PERSISTENT => "EfiPersistentMemory",
            Self::UNACCEPTED => "EfiUnacceptedMemoryType",
            _ => return None,
        })
    }

    /// Returns `true` for memory the OS may use freely after `ExitBootServices`.
    #[must_use]
    pub const fn is_usable_after_exit(self) -> bool {
        matches!(
            self,
            Self::LOADER_CODE
                | Self::LOADER_DATA
                | Self::BOOT_SERVICES_CODE
                | Self::BOOT_SERVICES_DATA
                | Self::CONVENTIONAL
                | Self::PERSISTENT
        )
    }
}

impl core::fmt::Debug for EfiMemoryType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "EfiMemoryType({:#x})", self.0),
        }
    }
}

/// A memory region as returned by `GetMemoryMap` (`EFI_MEMORY_DESCRIPTOR`).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EfiMemoryDescriptor {
    /// Region type, an [`EfiMemoryType`] value.
    pub memory_type: u32,
    /// Physical address of the first byte; 4 KiB aligned.
    pub physical_start: EfiPhysicalAddress,
    /// Virtual address of the first byte; 4 KiB aligned.
    pub virtual_start: EfiVirtualAddress,
    /// Number of 4 KiB pages.
    pub number_of_pages: u64,
    /// Capability bits, see [`EfiMemoryAttributes`].
    pub attribute: u64,
}

impl EfiMemoryDescriptor {
    /// The region type.
    #[must_use]
    pub const fn memory_type(&self) -> EfiMemoryType {
        EfiMemoryType(self.memory_type)
    }

    /// The capability bits, keeping any bits this crate does not name.
    #[must_use]
    pub const fn attributes(&self) -> EfiMemoryAttributes {
        EfiMemoryAttributes::from_bits_retain(self.attribute)
    }

    /// Length of the region in bytes, saturating at `u64::MAX`.
    #[must_use]
    pub const fn size_in_bytes(&self) -> u64 {
        self.number_of_pages.saturating_mul(PAGE_SIZE)
    }

    /// Physical address one past the last byte, saturating at `u64::MAX`.
    #[must_use]
    pub const fn physical_end(&self) -> EfiPhysicalAddress {
        self.physical_start.saturating_add(self.size_in_bytes())
    }
}

bitflags! {
    /// Memory region capability and protection attributes.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EfiMemoryAttributes: u64 {
        /// Uncacheable.
        const UC = 0x0000_0000_0000_0001;
        /// Write combining.
        const WC = 0x0000_0000_0000_0002;
        /// Write through.
        const WT = 0x0000_0000_0000_0004;
        /// Write back.
        const WB = 0x0000_0000_0000_0008;
        /// Uncacheable, exported, supports fetch-and-add.
        const UCE = 0x0000_0000_0000_0010;
        /// Write protected.
        const WP = 0x0000_0000_0000_1000;
        /// Read protected.
        const RP = 0x0000_0000_0000_2000;
        /// Execute protected.
        const XP = 0x0000_0000_0000_4000;
        /// Non-volatile.
        const NV = 0x0000_0000_0000_8000;
        /// Higher reliability than other memory in the system.
        const MORE_RELIABLE = 0x0000_0000_0001_0000;
        /// Read-only protection supported.
        const RO = 0x0000_0000_0002_0000;
        /// Specific-purpose memory.
        const SP = 0x0000_0000_0004_0000;
        /// Can be protected with CPU cryptographic capabilities.
        const CPU_CRYPTO = 0x0000_0000_0008_0000;
        /// Bits 44..=59 carry ISA-specific attributes when `ISA_VALID` is set.
        const ISA_MASK = 0x0FFF_F000_0000_0000;
        /// The `ISA_MASK` bits are meaningful.
        const ISA_VALID = 0x4000_0000_0000_0000;
        /// Needs a virtual mapping from `SetVirtualAddressMap`.
        const RUNTIME = 0x8000_0000_0000_0000;
    }
}

// ── Service signatures ───────────────────────────────────────────────

/// `EFI_ALLOCATE_PAGES`
pub type AllocatePagesFn = unsafe extern "efiapi" fn(
    alloc_type: EfiAllocateType,
    memory_type: EfiMemoryType,
    pages: usize,
    memory: *mut EfiPhysicalAddress,
) -> EfiStatus;

/// `EFI_FREE_PAGES`
pub type FreePagesFn =
    unsafe extern "efiapi" fn(memory: EfiPhysicalAddress, pages: usize) -> EfiStatus;

/// `EFI_GET_MEMORY_MAP`
pub type GetMemoryMapFn = unsafe extern "efiapi" fn(
    memory_map_size: *mut usize,
    memory_map: *mut EfiMemoryDescriptor,
    map_key: *mut usize,
    descriptor_size: *mut usize,
    descriptor_version: *mut u32,
) -> EfiStatus;

/// `EFI_ALLOCATE_POOL`
pub type AllocatePoolFn = unsafe extern "efiapi" fn(
    pool_type: EfiMemoryType,
    size: usize,
    buffer: *mut *mut c_void,
) -> EfiStatus;

/// `EFI_FREE_POOL`
pub type FreePoolFn = unsafe extern "efiapi" fn(buffer: *mut c_void) -> EfiStatus;

// ── Memory map ───────────────────────────────────────────────────────

/// A memory map snapshot held in a caller-provided buffer.
pub struct MemoryMap<'buf> {
    buffer: &'buf [u8],
    map_key: usize,
    descriptor_size: usize,
    descriptor_version: u32,
}

impl<'buf> MemoryMap<'buf> {
    /// Wraps the output of `GetMemoryMap`. `buffer` must already be truncated to the
    /// returned `memory_map_size`.
    #[must_use]
    pub fn new(
        buffer: &'buf [u8],
        map_key: usize,
        descriptor_size: usize,
        descriptor_version: u32,
    ) -> Self {
        if descriptor_size < core::mem::size_of::<EfiMemoryDescriptor>() {
            log::warn!(
                "efi: memory map descriptor size {descriptor_size} is smaller than {}",
                core::mem::size_of::<EfiMemoryDescriptor>()
            );
        }
        if descriptor_version != MEMORY_DESCRIPTOR_VERSION {
            log::debug!("efi: memory map descriptor version {descriptor_version}");
        }
        Self {
            buffer,
            map_key,
            descriptor_size,
            descriptor_version,
        }
    }

    /// Key identifying this snapshot; `ExitBootServices` requires the current one.
    #[must_use]
    pub fn map_key(&self) -> usize {
        self.map_key
    }

    /// Stride between descriptors as reported by the firmware.
    #[must_use]
    pub fn descriptor_size(&self) -> usize {
        self.descriptor_size
    }

    /// Descriptor version as reported by the firmware.
    #[must_use]
    pub fn descriptor_version(&self) -> u32 {
        self.descriptor_version
    }

    /// Number of complete descriptors in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.descriptor_size < core::mem::size_of::<EfiMemoryDescriptor>() {
            return 0;
        }
        self.buffer.len() / self.descriptor_size
    }

    /// Returns `true` if the map holds no complete descriptor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the descriptors.
    #[must_use]
    pub fn iter(&self) -> MemoryMapIter<'buf> {
        MemoryMapIter {
            buffer: self.buffer,
            descriptor_size: self.descriptor_size,
            remaining: self.len(),
        }
    }

    /// Total number of pages of the given type, saturating at `u64::MAX`.
    #[must_use]
    pub fn pages_of_type(&self, memory_type: EfiMemoryType) -> u64 {
        self.iter()
            .filter(|d| d.memory_type() == memory_type)
            .fold(0u64, |total, d| total.saturating_add(d.number_of_pages))
    }
}

impl<'buf> IntoIterator for &MemoryMap<'buf> {
    type Item = EfiMemoryDescriptor;
    type IntoIter = MemoryMapIter<'buf>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`MemoryMap`], stepping by the firmware descriptor size.
///
/// Descriptors are copied out with an unaligned read, so the backing buffer needs no
/// particular alignment.
pub struct MemoryMapIter<'buf> {
    buffer: &'buf [u8],
    descriptor_size: usize,
    remaining: usize,
}

impl Iterator for MemoryMapIter<'_> {
    type Item = EfiMemoryDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let (head, tail) = self.buffer.split_at(self.descriptor_size);
        self.buffer = tail;
        self.remaining -= 1;
        // SAFETY: `head` holds at least `size_of::<EfiMemoryDescriptor>()` bytes, checked by
        // `MemoryMap::len`, and every bit pattern is a valid descriptor.
        Some(unsafe { head.as_ptr().cast::<EfiMemoryDescriptor>().read_unaligned() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for MemoryMapIter<'_> {}

// ── Compile-time layout assertions ──────────────────────────────────

const _: () = {
    assert!(core::mem::size_of::<EfiAllocateType>() == 4);
    assert!(core::mem::size_of::<EfiMemoryType>() == 4);
    assert!(core::mem::size_of::<EfiMemoryDescriptor>() == 40);
    assert!(core::mem::offset_of!(EfiMemoryDescriptor, memory_type) == 0);
    // 4 bytes of padding after the type
    assert!(core::mem::offset_of!(EfiMemoryDescriptor, physical_start) == 8);
    assert!(core::mem::offset_of!(EfiMemoryDescriptor, virtual_start) == 16);
    assert!(core::mem::offset_of!(EfiMemoryDescriptor, number_of_pages) == 24);
    assert!(core::mem::offset_of!(EfiMemoryDescriptor, attribute) == 32);
};
