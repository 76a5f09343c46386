//! Firmware File System (FFS) File Attribute Definitions
//!
//! Based on the values defined in the UEFI Platform Initialization (PI)
//! Specification V1.8A Section 3.2.3.1 EFI_FFS_FILE_HEADER.
//!
//! ## License
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

/// Raw FFS attribute bit definitions
pub mod raw {
    /// File uses the large (64-bit size) header variant
    pub const LARGE_FILE: u8 = 0x01;
    /// 2-byte data alignment
    pub const DATA_ALIGNMENT_2: u8 = 0x02;
    /// File must reside at a fixed address
    pub const FIXED: u8 = 0x04;
    /// Data alignment mask
    pub const DATA_ALIGNMENT: u8 = 0x38;
    /// File data carries an 8-bit checksum
    pub const CHECKSUM: u8 = 0x40;
}
