//! Firmware File System (FFS) File Definitions
//!
//! Based on the values defined in the UEFI Platform Initialization (PI)
//! Specification V1.8A Section 3.2.3.1 EFI_FFS_FILE_HEADER.
//!
//! ## License
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

use r_efi::efi;

/// Raw FFS file constant definitions
pub mod raw {
    /// File State Bits
    pub mod state {
        /// File header is under construction
        pub const HEADER_CONSTRUCTION: u8 = 0x01;
        /// File header is valid
        pub const HEADER_VALID: u8 = 0x02;
        /// File data is valid
        pub const DATA_VALID: u8 = 0x04;
    }

    /// File Type Definitions
    pub mod r#type {
        /// Raw data file
        pub const RAW: u8 = 0x01;
        /// Freeform file
        pub const FREEFORM: u8 = 0x02;
        /// Security (SEC) core file
        pub const SECURITY_CORE: u8 = 0x03;
        /// PEI core file
        pub const PEI_CORE: u8 = 0x04;
        /// DXE core file
        pub const DXE_CORE: u8 = 0x05;
        /// Pre-EFI module (PEIM) file
        pub const PEIM: u8 = 0x06;
        /// DXE driver file
        pub const DRIVER: u8 = 0x07;
        /// Application file
        pub const APPLICATION: u8 = 0x09;
        /// Firmware volume image file
        pub const FIRMWARE_VOLUME_IMAGE: u8 = 0x0B;
        /// FFS pad file
        pub const FFS_PAD: u8 = 0xF0;
    }
}

/// Byte offset of the 8-bit header checksum within the file header.
pub const HEADER_CHECKSUM_OFFSET: usize = 16;
/// Byte offset of the file-data checksum within the file header.
pub const FILE_CHECKSUM_OFFSET: usize = 17;
/// Byte offset of the state byte within the file header.
pub const STATE_OFFSET: usize = 23;

// EFI_FFS_FILE_HEADER
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Unique file GUID identifier
    pub name: efi::Guid,
    /// Header checksum
    pub integrity_check_header: u8,
    /// File data checksum, or 0xAA when the CHECKSUM attribute is clear
    pub integrity_check_file: u8,
    /// File type, see [`raw::r#type`]
    pub file_type: u8,
    /// File attributes
    pub attributes: u8,
    /// 24-bit little-endian file size; 0 signals the large variant
    pub size: [u8; 3],
    /// File state bits
    pub state: u8,
}

// EFI_FFS_FILE_HEADER2
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header2 {
    /// Standard file header with `size == 0` and the LARGE_FILE attribute set
    pub header: Header,
    /// Explicit 64-bit file size
    pub extended_size: u64,
}
