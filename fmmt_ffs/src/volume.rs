//! Firmware volume node.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::vec::Vec;
use core::{fmt, mem, ptr};

use crate::{checksum, err::FirmwareFileSystemError};
use fmmt_pi::fw_fs::fv;
use r_efi::efi;

/// A decoded firmware volume extension entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtEntry {
    /// OEM-defined file types; the mask records which type values are claimed.
    Oem { type_mask: u32, data: Vec<u8> },
    /// Vendor-specific data identified by a format GUID.
    Guid { format_type: efi::Guid, data: Vec<u8> },
    /// Number of bytes of the volume actually in use.
    UsedSize(u32),
    /// An entry type this crate does not interpret; preserved verbatim.
    Unknown { entry_type: u16, data: Vec<u8> },
}

/// A firmware volume and the bytes backing it.
///
/// Construction decodes the header, block map, and optional extension
/// header, and repairs the header checksum in place. Aside from the
/// checksum, the owned bytes are exactly the bytes the node was built from.
pub struct FirmwareVolumeNode {
    data: Vec<u8>,
    base: u64,
    header: fv::Header,
    block_map: Vec<fv::BlockMapEntry>,
    ext_header: Option<fv::ExtHeader>,
    ext_entry: Option<ExtEntry>,
    checksum_was_invalid: bool,
}

impl FirmwareVolumeNode {
    /// Instantiate a new FirmwareVolumeNode from a byte window starting at
    /// absolute offset `base` within the enclosing image.
    pub fn new(buffer: &[u8], base: u64) -> Result<Self, FirmwareFileSystemError> {
        if buffer.len() < mem::size_of::<fv::Header>() {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }

        // Safety: buffer is long enough to contain the header, and the read is unaligned.
        let header = unsafe { ptr::read_unaligned(buffer.as_ptr() as *const fv::Header) };

        if header.signature != fv::SIGNATURE {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }

        let header_length = header.header_length as usize;
        if header_length < mem::size_of::<fv::Header>() || header_length % 2 != 0 {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }

        let fv_length: usize =
            header.fv_length.try_into().map_err(|_| FirmwareFileSystemError::InvalidHeader)?;
        if fv_length < header_length || fv_length > buffer.len() {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }

        let block_map = Self::parse_block_map(&buffer[..header_length])?;

        let (ext_header, ext_entry) = if header.ext_header_offset != 0 {
            let (ext_header, ext_entry) =
                Self::parse_ext_header(&buffer[..fv_length], header.ext_header_offset as usize)?;
            // content begins at the 8-byte-aligned end of the ext header; that
            // rounded offset must still land inside the volume
            let end = header.ext_header_offset as usize + ext_header.ext_header_size as usize;
            if (end + 7) & !7 > fv_length {
                Err(FirmwareFileSystemError::InvalidHeader)?;
            }
            (Some(ext_header), ext_entry)
        } else {
            (None, None)
        };

        let mut data = buffer[..fv_length].to_vec();
        let checksum_valid = checksum::fix_fv_checksum(&mut data[..header_length])?;
        if !checksum_valid {
            log::warn!("firmware volume at {base:#x}: header checksum repaired");
        }
        // re-read so the cached header reflects the repaired checksum field
        let header = unsafe { ptr::read_unaligned(data.as_ptr() as *const fv::Header) };

        Ok(Self { data, base, header, block_map, ext_header, ext_entry, checksum_was_invalid: !checksum_valid })
    }

    // Decodes the block map between the fixed header and header_length. A
    // trailing all-zero terminator entry is stripped from the decoded view
    // but remains part of the owned bytes.
    fn parse_block_map(header: &[u8]) -> Result<Vec<fv::BlockMapEntry>, FirmwareFileSystemError> {
        let map_bytes = &header[mem::size_of::<fv::Header>()..];
        if map_bytes.len() % mem::size_of::<fv::BlockMapEntry>() != 0 {
            Err(FirmwareFileSystemError::InvalidBlockMap)?;
        }
        let mut block_map = map_bytes
            .chunks_exact(mem::size_of::<fv::BlockMapEntry>())
            .map(|entry| fv::BlockMapEntry {
                num_blocks: u32::from_le_bytes(entry[0..4].try_into().unwrap()),
                length: u32::from_le_bytes(entry[4..8].try_into().unwrap()),
            })
            .collect::<Vec<_>>();
        if let Some(last) = block_map.last() {
            if last.num_blocks == 0 && last.length == 0 {
                block_map.pop();
            }
        }
        Ok(block_map)
    }

    fn parse_ext_header(
        buffer: &[u8],
        offset: usize,
    ) -> Result<(fv::ExtHeader, Option<ExtEntry>), FirmwareFileSystemError> {
        let ext_header_size = mem::size_of::<fv::ExtHeader>();
        if offset + ext_header_size > buffer.len() {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }
        // Safety: bounds checked above.
        let ext_header =
            unsafe { ptr::read_unaligned(buffer[offset..].as_ptr() as *const fv::ExtHeader) };

        let total = ext_header.ext_header_size as usize;
        if total < ext_header_size || offset + total > buffer.len() {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }
        if total == ext_header_size {
            return Ok((ext_header, None));
        }

        let entry_offset = offset + ext_header_size;
        let entry_header_size = mem::size_of::<fv::ExtEntryHeader>();
        if total - ext_header_size < entry_header_size {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }
        // Safety: bounds checked above.
        let entry_header = unsafe {
            ptr::read_unaligned(buffer[entry_offset..].as_ptr() as *const fv::ExtEntryHeader)
        };
        let entry_size = entry_header.ext_entry_size as usize;
        if entry_size < entry_header_size || entry_offset + entry_size > offset + total {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }
        let entry_data = &buffer[entry_offset + entry_header_size..entry_offset + entry_size];

        let entry = match entry_header.ext_entry_type {
            fv::raw::ext_entry_type::OEM_TYPE => {
                if entry_data.len() < 4 {
                    Err(FirmwareFileSystemError::InvalidHeader)?;
                }
                ExtEntry::Oem {
                    type_mask: u32::from_le_bytes(entry_data[0..4].try_into().unwrap()),
                    data: entry_data[4..].to_vec(),
                }
            }
            fv::raw::ext_entry_type::GUID_TYPE => {
                if entry_data.len() < mem::size_of::<efi::Guid>() {
                    Err(FirmwareFileSystemError::InvalidHeader)?;
                }
                // Safety: bounds checked above.
                let format_type =
                    unsafe { ptr::read_unaligned(entry_data.as_ptr() as *const efi::Guid) };
                ExtEntry::Guid { format_type, data: entry_data[mem::size_of::<efi::Guid>()..].to_vec() }
            }
            fv::raw::ext_entry_type::USED_SIZE_TYPE => {
                if entry_data.len() < 4 {
                    Err(FirmwareFileSystemError::InvalidHeader)?;
                }
                ExtEntry::UsedSize(u32::from_le_bytes(entry_data[0..4].try_into().unwrap()))
            }
            entry_type => ExtEntry::Unknown { entry_type, data: entry_data.to_vec() },
        };
        Ok((ext_header, Some(entry)))
    }

    /// Absolute offset of this volume within the enclosing image.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Total length of the volume in bytes.
    pub fn size(&self) -> u64 {
        self.header.fv_length
    }

    /// Length of the header region, including the block map.
    pub fn header_length(&self) -> usize {
        self.header.header_length as usize
    }

    /// Raw volume attribute bits.
    pub fn attributes(&self) -> u32 {
        self.header.attributes
    }

    /// The byte value that unwritten flash reads as under this volume's
    /// erase polarity.
    pub fn erase_byte(&self) -> u8 {
        if self.attributes() & fv::raw::attributes::ERASE_POLARITY != 0 {
            0xff
        } else {
            0x00
        }
    }

    /// GUID identifying the file system format of the volume contents.
    pub fn file_system_guid(&self) -> efi::Guid {
        self.header.file_system_guid
    }

    /// Volume name GUID from the extension header, if one is present.
    pub fn fv_name(&self) -> Option<efi::Guid> {
        self.ext_header.map(|ext| ext.fv_name)
    }

    /// Decoded block map, with any trailing terminator entry stripped.
    pub fn block_map(&self) -> &Vec<fv::BlockMapEntry> {
        &self.block_map
    }

    /// Decoded extension entry following the extension header, if any.
    pub fn ext_entry(&self) -> Option<&ExtEntry> {
        self.ext_entry.as_ref()
    }

    /// True if the stored header checksum had to be repaired on load.
    pub fn checksum_was_invalid(&self) -> bool {
        self.checksum_was_invalid
    }

    /// Offset within the volume where file content begins. Follows the
    /// extension header (rounded to 8-byte alignment) when one is present.
    pub fn content_offset(&self) -> usize {
        match self.ext_header {
            Some(ext) => {
                let end = self.header.ext_header_offset as usize + ext.ext_header_size as usize;
                (end + 7) & !7
            }
            None => self.header_length(),
        }
    }

    /// The file content region of the volume.
    pub fn content(&self) -> &[u8] {
        &self.data[self.content_offset()..]
    }

    /// Number of trailing bytes holding the erase value.
    pub fn free_space(&self) -> usize {
        let erase = self.erase_byte();
        self.content().iter().rev().take_while(|&&byte| byte == erase).count()
    }

    /// The full serialized volume.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Resizes the volume to `new_length` bytes. Growth appends erased
    /// bytes; shrinking truncates. The length field, the final block map
    /// entry, and the header checksum are updated in place so that the sum
    /// of the block map still covers the volume.
    pub fn set_size(&mut self, new_length: u64) -> Result<(), FirmwareFileSystemError> {
        let length: usize =
            new_length.try_into().map_err(|_| FirmwareFileSystemError::InvalidParameter)?;
        if length < self.content_offset() {
            Err(FirmwareFileSystemError::InvalidParameter)?;
        }
        let Some(last) = self.block_map.last().copied() else {
            return Err(FirmwareFileSystemError::InvalidBlockMap);
        };
        let covered: u64 = self.block_map[..self.block_map.len() - 1]
            .iter()
            .map(|entry| entry.num_blocks as u64 * entry.length as u64)
            .sum();
        let block_length = last.length as u64;
        if block_length == 0 || new_length < covered || (new_length - covered) % block_length != 0 {
            Err(FirmwareFileSystemError::InvalidParameter)?;
        }
        let num_blocks: u32 = ((new_length - covered) / block_length)
            .try_into()
            .map_err(|_| FirmwareFileSystemError::InvalidParameter)?;

        self.data.resize(length, self.erase_byte());
        self.data[32..40].copy_from_slice(&new_length.to_le_bytes());
        let entry_offset =
            mem::size_of::<fv::Header>() + (self.block_map.len() - 1) * mem::size_of::<fv::BlockMapEntry>();
        self.data[entry_offset..entry_offset + 4].copy_from_slice(&num_blocks.to_le_bytes());
        if let Some(entry) = self.block_map.last_mut() {
            entry.num_blocks = num_blocks;
        }
        let header_length = self.header_length();
        checksum::fix_fv_checksum(&mut self.data[..header_length])?;
        self.header = unsafe { ptr::read_unaligned(self.data.as_ptr() as *const fv::Header) };
        Ok(())
    }

    /// Adjusts the volume length so at least `length` erased bytes trail the
    /// used content, rounding up to the volume's block granularity.
    pub fn set_free_space(&mut self, length: usize) -> Result<(), FirmwareFileSystemError> {
        let Some(last) = self.block_map.last() else {
            return Err(FirmwareFileSystemError::InvalidBlockMap);
        };
        let block_length = last.length as u64;
        if block_length == 0 {
            Err(FirmwareFileSystemError::InvalidBlockMap)?;
        }
        let used = self.data.len() - self.free_space();
        let target = (used + length) as u64;
        self.set_size(target.div_ceil(block_length) * block_length)
    }

    /// Rewrites the volume name GUID in the extension header.
    pub fn set_fv_name(&mut self, name: efi::Guid) -> Result<(), FirmwareFileSystemError> {
        let Some(mut ext) = self.ext_header else {
            return Err(FirmwareFileSystemError::InvalidParameter);
        };
        let offset = self.header.ext_header_offset as usize;
        self.data[offset..offset + mem::size_of::<efi::Guid>()].copy_from_slice(name.as_bytes());
        ext.fv_name = name;
        self.ext_header = Some(ext);
        let header_length = self.header_length();
        checksum::fix_fv_checksum(&mut self.data[..header_length])?;
        Ok(())
    }
}

impl fmt::Debug for FirmwareVolumeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirmwareVolumeNode")
            .field("base", &format_args!("{:#x}", self.base))
            .field("size", &format_args!("{:#x}", self.size()))
            .field("file_system_guid", &self.file_system_guid())
            .field("fv_name", &self.fv_name())
            .field("block_map", &self.block_map)
            .field("checksum_was_invalid", &self.checksum_was_invalid)
            .finish()
    }
}
