//! FFS file node.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::{string::String, vec::Vec};
use core::{fmt, mem, ptr};

use crate::{checksum, err::FirmwareFileSystemError};
use fmmt_pi::fw_fs::{ffs, guid};
use r_efi::efi;

/// An FFS file and the bytes backing it.
///
/// Handles both the standard 24-byte header and the large-file variant
/// selected by a zero size field plus the LARGE_FILE attribute. The header
/// checksum is repaired in place on construction; file data checksums are
/// verified but never rewritten.
pub struct FfsFileNode {
    data: Vec<u8>,
    base: u64,
    header: ffs::file::Header,
    size: usize,
    header_length: usize,
    checksum_was_invalid: bool,
    ui_name: Option<String>,
    version: Option<String>,
}

impl FfsFileNode {
    /// Instantiate a new FfsFileNode from a byte window starting at absolute
    /// offset `base` within the enclosing volume.
    pub fn new(buffer: &[u8], base: u64) -> Result<Self, FirmwareFileSystemError> {
        if buffer.len() < mem::size_of::<ffs::file::Header>() {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }

        // Safety: buffer is long enough to contain the header, and the read is unaligned.
        let header = unsafe { ptr::read_unaligned(buffer.as_ptr() as *const ffs::file::Header) };

        let size24 =
            u32::from_le_bytes([header.size[0], header.size[1], header.size[2], 0]) as usize;
        let (size, header_length) = if size24 == 0 {
            if header.attributes & ffs::attributes::raw::LARGE_FILE == 0 {
                Err(FirmwareFileSystemError::InvalidHeader)?;
            }
            if buffer.len() < mem::size_of::<ffs::file::Header2>() {
                Err(FirmwareFileSystemError::InvalidHeader)?;
            }
            // Safety: bounds checked above.
            let header2 =
                unsafe { ptr::read_unaligned(buffer.as_ptr() as *const ffs::file::Header2) };
            let size: usize = header2
                .extended_size
                .try_into()
                .map_err(|_| FirmwareFileSystemError::InvalidHeader)?;
            (size, mem::size_of::<ffs::file::Header2>())
        } else {
            (size24, mem::size_of::<ffs::file::Header>())
        };

        if size < header_length || size > buffer.len() {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }

        let mut data = buffer[..size].to_vec();
        let checksum_valid = checksum::fix_ffs_checksum(&mut data[..header_length])?;
        if !checksum_valid {
            log::warn!("ffs file {:?} at {base:#x}: header checksum repaired", header.name);
        }

        if header.attributes & ffs::attributes::raw::CHECKSUM != 0 {
            let sum = checksum::sum8(&data[header_length..]);
            if sum.wrapping_add(header.integrity_check_file) != 0 {
                Err(FirmwareFileSystemError::DataCorrupt)?;
            }
        }

        let header = unsafe { ptr::read_unaligned(data.as_ptr() as *const ffs::file::Header) };

        Ok(Self {
            data,
            base,
            header,
            size,
            header_length,
            checksum_was_invalid: !checksum_valid,
            ui_name: None,
            version: None,
        })
    }

    /// Absolute offset of this file within the enclosing volume.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// File name GUID.
    pub fn name(&self) -> efi::Guid {
        self.header.name
    }

    /// Raw file type byte, see [`ffs::file::raw::r#type`].
    pub fn file_type_raw(&self) -> u8 {
        self.header.file_type
    }

    /// Raw attribute bits.
    pub fn attributes_raw(&self) -> u8 {
        self.header.attributes
    }

    /// Raw state bits.
    pub fn state_raw(&self) -> u8 {
        self.header.state
    }

    /// Total file length in bytes, header included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Length of the file header; 24 bytes, or 32 for the large variant.
    pub fn header_length(&self) -> usize {
        self.header_length
    }

    /// Erase polarity inferred from the unused high state bits.
    pub fn erase_polarity(&self) -> bool {
        self.header.state & 0x80 != 0
    }

    /// True if the stored header checksum had to be repaired on load.
    pub fn checksum_was_invalid(&self) -> bool {
        self.checksum_was_invalid
    }

    /// True for the FSP information file.
    pub fn is_fsp(&self) -> bool {
        self.header.name == guid::FSP_FFS_INFORMATION_FILE
    }

    /// True for the volume-top file, which must stay at the end of its volume.
    pub fn is_vtf(&self) -> bool {
        self.header.name == guid::EFI_FFS_VOLUME_TOP_FILE
    }

    /// True for pad files, which carry no meaningful content.
    pub fn is_pad(&self) -> bool {
        self.header.file_type == ffs::file::raw::r#type::FFS_PAD
    }

    /// File content following the header.
    pub fn content(&self) -> &[u8] {
        &self.data[self.header_length..]
    }

    /// The full serialized file.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Human-readable name recovered from a UI section, if any.
    pub fn ui_name(&self) -> Option<&str> {
        self.ui_name.as_deref()
    }

    pub fn set_ui_name(&mut self, name: String) {
        self.ui_name = Some(name);
    }

    /// Version string recovered from a version section, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: String) {
        self.version = Some(version);
    }
}

impl fmt::Debug for FfsFileNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FfsFileNode")
            .field("base", &format_args!("{:#x}", self.base))
            .field("name", &self.header.name)
            .field("file_type", &format_args!("{:#x}", self.header.file_type))
            .field("size", &format_args!("{:#x}", self.size))
            .field("ui_name", &self.ui_name)
            .field("checksum_was_invalid", &self.checksum_was_invalid)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmmt_pi::fw_fs::ffs::attributes::raw as attr;

    const NAME: efi::Guid =
        efi::Guid::from_fields(0x11223344, 0x5566, 0x7788, 0x99, 0xaa, &[1, 2, 3, 4, 5, 6]);

    fn build_file(content_length: usize, attributes: u8) -> Vec<u8> {
        let size = 24 + content_length;
        let mut file = vec![0u8; size];
        file[..16].copy_from_slice(NAME.as_bytes());
        file[18] = ffs::file::raw::r#type::RAW;
        file[19] = attributes;
        file[20..23].copy_from_slice(&(size as u32).to_le_bytes()[..3]);
        file[23] = 0xf8; // erase polarity 1, header and data valid
        for (index, byte) in file[24..].iter_mut().enumerate() {
            *byte = index as u8;
        }
        if attributes & attr::CHECKSUM != 0 {
            let sum = checksum::sum8(&file[24..]);
            file[17] = 0u8.wrapping_sub(sum);
        } else {
            file[17] = 0xaa;
        }
        let header_sum = checksum::sum8(&file[..24]).wrapping_sub(file[17]).wrapping_sub(file[23]);
        file[16] = 0u8.wrapping_sub(header_sum);
        file
    }

    fn build_large_file(content_length: usize) -> Vec<u8> {
        let size = 32 + content_length;
        let mut file = vec![0u8; size];
        file[..16].copy_from_slice(NAME.as_bytes());
        file[17] = 0xaa;
        file[18] = ffs::file::raw::r#type::FREEFORM;
        file[19] = attr::LARGE_FILE;
        // size bytes stay zero for the large variant
        file[23] = 0xf8;
        file[24..32].copy_from_slice(&(size as u64).to_le_bytes());
        let header_sum = checksum::sum8(&file[..32]).wrapping_sub(file[17]).wrapping_sub(file[23]);
        file[16] = 0u8.wrapping_sub(header_sum);
        file
    }

    #[test]
    fn parses_standard_file() {
        let file = build_file(0x40, 0);
        let node = FfsFileNode::new(&file, 0x100).unwrap();
        assert_eq!(node.base(), 0x100);
        assert_eq!(node.name(), NAME);
        assert_eq!(node.file_type_raw(), ffs::file::raw::r#type::RAW);
        assert_eq!(node.size(), 24 + 0x40);
        assert_eq!(node.header_length(), 24);
        assert_eq!(node.content().len(), 0x40);
        assert!(node.erase_polarity());
        assert!(!node.checksum_was_invalid());
        assert_eq!(node.data(), &file[..]);
    }

    #[test]
    fn zero_size_without_large_attribute_is_malformed() {
        let mut file = build_file(0x40, 0);
        file[20..23].fill(0);
        assert_eq!(
            FfsFileNode::new(&file, 0).unwrap_err(),
            FirmwareFileSystemError::InvalidHeader
        );
    }

    #[test]
    fn parses_large_file() {
        let file = build_large_file(0x80);
        let node = FfsFileNode::new(&file, 0).unwrap();
        assert_eq!(node.size(), 32 + 0x80);
        assert_eq!(node.header_length(), 32);
        assert_eq!(node.content().len(), 0x80);
        assert!(!node.checksum_was_invalid());
    }

    #[test]
    fn repairs_header_checksum() {
        let mut file = build_file(8, 0);
        let good = file[16];
        file[16] = good.wrapping_add(0x55);
        let node = FfsFileNode::new(&file, 0).unwrap();
        assert!(node.checksum_was_invalid());
        assert_eq!(node.data()[16], good);
        // all other bytes survive the round trip
        assert_eq!(&node.data()[..16], &file[..16]);
        assert_eq!(&node.data()[17..], &file[17..]);
    }

    #[test]
    fn verifies_data_checksum_when_attribute_set() {
        let file = build_file(0x20, attr::CHECKSUM);
        assert!(FfsFileNode::new(&file, 0).is_ok());

        let mut corrupt = file;
        corrupt[30] = corrupt[30].wrapping_add(1);
        assert_eq!(
            FfsFileNode::new(&corrupt, 0).unwrap_err(),
            FirmwareFileSystemError::DataCorrupt
        );
    }

    #[test]
    fn recognizes_well_known_files() {
        let mut file = build_file(4, 0);
        file[..16].copy_from_slice(guid::EFI_FFS_VOLUME_TOP_FILE.as_bytes());
        let header_sum = checksum::sum8(&file[..24]).wrapping_sub(file[17]).wrapping_sub(file[23]);
        file[16] = file[16].wrapping_sub(header_sum);
        let node = FfsFileNode::new(&file, 0).unwrap();
        assert!(node.is_vtf());
        assert!(!node.is_fsp());
    }

    #[test]
    fn truncated_buffer_is_malformed() {
        let file = build_file(0x40, 0);
        assert_eq!(
            FfsFileNode::new(&file[..30], 0).unwrap_err(),
            FirmwareFileSystemError::InvalidHeader
        );
    }
}
