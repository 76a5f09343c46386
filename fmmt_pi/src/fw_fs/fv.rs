//! Firmware Volume (FV) Definitions
//!
//! Based on the values defined in the UEFI Platform Initialization (PI)
//! Specification V1.8A 3.1 Firmware Storage Code Definitions.
//!
//! ## License
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

/// Firmware volume signature, ASCII `_FVH` read as a little-endian u32.
pub const SIGNATURE: u32 = u32::from_le_bytes(*b"_FVH");

/// Byte offset of the 16-bit header checksum field within the FV header.
pub const CHECKSUM_OFFSET: usize = 50;

/// Raw firmware volume constant definitions
pub mod raw {
    /// `EFI_FVB_ATTRIBUTES_2` bits used by this crate
    pub mod attributes {
        /// Erase polarity: erased bytes read as 0xFF when set, 0x00 when clear
        pub const ERASE_POLARITY: u32 = 0x00000800;
    }

    /// `EFI_FV_EXT_TYPE_*` extension entry discriminants
    pub mod ext_entry_type {
        /// OEM-specific type mask entry
        pub const OEM_TYPE: u16 = 0x0001;
        /// GUID-formatted entry
        pub const GUID_TYPE: u16 = 0x0002;
        /// Used-size bookkeeping entry
        pub const USED_SIZE_TYPE: u16 = 0x0003;
    }
}

/// EFI_FIRMWARE_VOLUME_HEADER
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// First 16 bytes are zeros for reset-vector compatibility
    pub zero_vector: [u8; 16],
    /// File system format GUID
    pub file_system_guid: r_efi::efi::Guid,
    /// Total volume length in bytes, header included
    pub fv_length: u64,
    /// Must equal [`SIGNATURE`]
    pub signature: u32,
    /// `EFI_FVB_ATTRIBUTES_2` bitfield
    pub attributes: u32,
    /// Length of this header, block map included
    pub header_length: u16,
    /// 16-bit checksum; the header must sum to zero in LE u16 words
    pub checksum: u16,
    /// Offset to the extended header, 0 if none
    pub ext_header_offset: u16,
    /// Reserved, must be 0
    pub reserved: u8,
    /// Header revision
    pub revision: u8,
    /// Variable-length block map array
    pub block_map: [BlockMapEntry; 0],
}

/// One entry in the FV block map
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMapEntry {
    /// Number of blocks of this size
    pub num_blocks: u32,
    /// Length of each block in bytes
    pub length: u32,
}

/// EFI_FIRMWARE_VOLUME_EXT_HEADER
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExtHeader {
    /// Firmware volume name GUID
    pub fv_name: r_efi::efi::Guid,
    /// Size of the extended header plus all extension entries
    pub ext_header_size: u32,
}

/// EFI_FIRMWARE_VOLUME_EXT_ENTRY
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExtEntryHeader {
    /// Size of this entry, header included
    pub ext_entry_size: u16,
    /// Entry discriminant, see [`raw::ext_entry_type`]
    pub ext_entry_type: u16,
}
