//! FFS section node.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::{string::String, vec::Vec};
use core::{fmt, mem, ptr};

use crate::err::FirmwareFileSystemError;
use fmmt_pi::fw_fs::ffs::section;
use r_efi::efi;

/// Decoded type-specific section header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionExtHeader {
    Compression { uncompressed_length: u32, compression_type: u8 },
    GuidDefined { section_definition_guid: efi::Guid, data_offset: u16, attributes: u16 },
    Version { build_number: u16, version_string: String },
    UserInterface { file_name_string: String },
    FreeformSubtypeGuid { sub_type_guid: efi::Guid },
}

/// A firmware file section and the bytes backing it.
///
/// The common header uses a 24-bit size; a size field of all 0xFF escapes to
/// the 8-byte extended header with an explicit 32-bit size. Sections carry
/// no checksum, so the owned bytes are never rewritten.
pub struct SectionNode {
    data: Vec<u8>,
    base: u64,
    section_type: u8,
    size: usize,
    common_header_length: usize,
    ext_header: Option<SectionExtHeader>,
}

impl SectionNode {
    /// Instantiate a new SectionNode from a byte window starting at absolute
    /// offset `base` within the enclosing file.
    pub fn new(buffer: &[u8], base: u64) -> Result<Self, FirmwareFileSystemError> {
        if buffer.len() < mem::size_of::<section::Header>() {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }

        // Safety: buffer is long enough to contain the header, and the read is unaligned.
        let common = unsafe { ptr::read_unaligned(buffer.as_ptr() as *const section::Header) };

        let (size, common_header_length) = if common.size == section::EXTENDED_SIZE_ESCAPE {
            if buffer.len() < mem::size_of::<section::header::CommonSectionHeaderExtended>() {
                Err(FirmwareFileSystemError::InvalidHeader)?;
            }
            // Safety: bounds checked above.
            let extended = unsafe {
                ptr::read_unaligned(
                    buffer.as_ptr() as *const section::header::CommonSectionHeaderExtended
                )
            };
            (
                extended.extended_size as usize,
                mem::size_of::<section::header::CommonSectionHeaderExtended>(),
            )
        } else {
            let size =
                u32::from_le_bytes([common.size[0], common.size[1], common.size[2], 0]) as usize;
            (size, mem::size_of::<section::Header>())
        };

        if size < common_header_length || size > buffer.len() {
            Err(FirmwareFileSystemError::InvalidHeader)?;
        }

        let body = &buffer[common_header_length..size];
        let ext_header = Self::parse_ext_header(common.section_type, body, common_header_length)?;

        Ok(Self {
            data: buffer[..size].to_vec(),
            base,
            section_type: common.section_type,
            size,
            common_header_length,
            ext_header,
        })
    }

    // Decodes the type-specific header that follows the common header. The
    // body slice covers everything after the common header up to the
    // declared section size.
    fn parse_ext_header(
        section_type: u8,
        body: &[u8],
        common_header_length: usize,
    ) -> Result<Option<SectionExtHeader>, FirmwareFileSystemError> {
        let ext = match section_type {
            section::raw_type::encapsulated::COMPRESSION => {
                if body.len() < mem::size_of::<section::header::Compression>() {
                    Err(FirmwareFileSystemError::InvalidHeader)?;
                }
                // Safety: bounds checked above; the struct is packed.
                let compression = unsafe {
                    ptr::read_unaligned(body.as_ptr() as *const section::header::Compression)
                };
                SectionExtHeader::Compression {
                    uncompressed_length: compression.uncompressed_length,
                    compression_type: compression.compression_type,
                }
            }
            section::raw_type::encapsulated::GUID_DEFINED => {
                if body.len() < mem::size_of::<section::header::GuidDefined>() {
                    Err(FirmwareFileSystemError::InvalidHeader)?;
                }
                // Safety: bounds checked above.
                let guid_defined = unsafe {
                    ptr::read_unaligned(body.as_ptr() as *const section::header::GuidDefined)
                };
                let data_offset = guid_defined.data_offset as usize;
                if data_offset
                    < common_header_length + mem::size_of::<section::header::GuidDefined>()
                    || data_offset > common_header_length + body.len()
                {
                    Err(FirmwareFileSystemError::InvalidHeader)?;
                }
                SectionExtHeader::GuidDefined {
                    section_definition_guid: guid_defined.section_definition_guid,
                    data_offset: guid_defined.data_offset,
                    attributes: guid_defined.attributes,
                }
            }
            section::raw_type::VERSION => {
                if body.len() < mem::size_of::<section::header::Version>() {
                    Err(FirmwareFileSystemError::InvalidHeader)?;
                }
                let build_number = u16::from_le_bytes([body[0], body[1]]);
                SectionExtHeader::Version {
                    build_number,
                    version_string: utf16_string(&body[2..])?,
                }
            }
            section::raw_type::USER_INTERFACE => {
                SectionExtHeader::UserInterface { file_name_string: utf16_string(body)? }
            }
            section::raw_type::FREEFORM_SUBTYPE_GUID => {
                if body.len() < mem::size_of::<section::header::FreeformSubtypeGuid>() {
                    Err(FirmwareFileSystemError::InvalidHeader)?;
                }
                // Safety: bounds checked above.
                let freeform = unsafe {
                    ptr::read_unaligned(
                        body.as_ptr() as *const section::header::FreeformSubtypeGuid
                    )
                };
                SectionExtHeader::FreeformSubtypeGuid { sub_type_guid: freeform.sub_type_guid }
            }
            _ => return Ok(None),
        };
        Ok(Some(ext))
    }

    /// Absolute offset of this section within the enclosing file.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Raw section type byte, see [`section::raw_type`].
    pub fn section_type_raw(&self) -> u8 {
        self.section_type
    }

    /// Decoded section type, or `None` for types outside the PI enumeration.
    pub fn section_type(&self) -> Option<section::Type> {
        section::Type::try_from(self.section_type).ok()
    }

    /// Total section length in bytes, header included.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Length of the common header; 4 bytes, or 8 for the extended variant.
    pub fn common_header_length(&self) -> usize {
        self.common_header_length
    }

    /// Length of the type-specific header that follows the common header.
    pub fn ext_header_length(&self) -> usize {
        match &self.ext_header {
            Some(SectionExtHeader::Compression { .. }) => {
                mem::size_of::<section::header::Compression>()
            }
            Some(SectionExtHeader::GuidDefined { data_offset, .. }) => {
                *data_offset as usize - self.common_header_length
            }
            // version and UI strings are part of the header, not the content
            Some(SectionExtHeader::Version { .. }) | Some(SectionExtHeader::UserInterface { .. }) => {
                self.size - self.common_header_length
            }
            Some(SectionExtHeader::FreeformSubtypeGuid { .. }) => {
                mem::size_of::<section::header::FreeformSubtypeGuid>()
            }
            None => 0,
        }
    }

    /// Total header length; the common header plus any type-specific header.
    pub fn header_length(&self) -> usize {
        self.common_header_length + self.ext_header_length()
    }

    /// Decoded type-specific header, if this section type carries one.
    pub fn ext_header(&self) -> Option<&SectionExtHeader> {
        self.ext_header.as_ref()
    }

    /// Section content following all headers.
    pub fn content(&self) -> &[u8] {
        &self.data[self.header_length()..]
    }

    /// The full serialized section.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// True for encapsulation sections whose content is itself a section stream.
    pub fn is_encapsulation(&self) -> bool {
        matches!(
            self.section_type,
            section::raw_type::encapsulated::COMPRESSION
                | section::raw_type::encapsulated::GUID_DEFINED
                | section::raw_type::encapsulated::DISPOSABLE
                | section::raw_type::FIRMWARE_VOLUME_IMAGE
        )
    }

    pub fn is_ui_section(&self) -> bool {
        self.section_type == section::raw_type::USER_INTERFACE
    }

    pub fn is_ver_section(&self) -> bool {
        self.section_type == section::raw_type::VERSION
    }

    pub fn is_pad_section(&self) -> bool {
        self.section_type == section::raw_type::FFS_PAD
    }
}

// Decodes a null-terminated little-endian UTF-16 string.
fn utf16_string(bytes: &[u8]) -> Result<String, FirmwareFileSystemError> {
    if bytes.len() % 2 != 0 {
        Err(FirmwareFileSystemError::InvalidHeader)?;
    }
    let units =
        bytes.chunks_exact(2).map(|pair| u16::from_le_bytes([pair[0], pair[1]])).collect::<Vec<_>>();
    let mut value = String::from_utf16_lossy(&units);
    while value.ends_with('\0') {
        value.pop();
    }
    Ok(value)
}

impl fmt::Debug for SectionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionNode")
            .field("base", &format_args!("{:#x}", self.base))
            .field("section_type", &format_args!("{:#x}", self.section_type))
            .field("size", &format_args!("{:#x}", self.size))
            .field("ext_header", &self.ext_header)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_section(section_type: u8, body: &[u8]) -> Vec<u8> {
        let size = 4 + body.len();
        let mut section = vec![0u8; size];
        section[..3].copy_from_slice(&(size as u32).to_le_bytes()[..3]);
        section[3] = section_type;
        section[4..].copy_from_slice(body);
        section
    }

    fn utf16_bytes(value: &str) -> Vec<u8> {
        value.encode_utf16().chain(core::iter::once(0)).flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn parses_raw_section() {
        let section = build_section(section::raw_type::RAW, &[1, 2, 3, 4]);
        let node = SectionNode::new(&section, 0x20).unwrap();
        assert_eq!(node.base(), 0x20);
        assert_eq!(node.section_type_raw(), section::raw_type::RAW);
        assert_eq!(node.size(), 8);
        assert_eq!(node.header_length(), 4);
        assert_eq!(node.content(), &[1, 2, 3, 4]);
        assert!(!node.is_encapsulation());
        assert_eq!(node.data(), &section[..]);
    }

    #[test]
    fn parses_extended_size_section() {
        let content = vec![0xa5u8; 0x20];
        let size = 8 + content.len();
        let mut section = vec![0u8; size];
        section[..3].copy_from_slice(&section::EXTENDED_SIZE_ESCAPE);
        section[3] = section::raw_type::RAW;
        section[4..8].copy_from_slice(&(size as u32).to_le_bytes());
        section[8..].copy_from_slice(&content);

        let node = SectionNode::new(&section, 0).unwrap();
        assert_eq!(node.size(), size);
        assert_eq!(node.common_header_length(), 8);
        assert_eq!(node.header_length(), 8);
        assert_eq!(node.content(), &content[..]);
    }

    #[test]
    fn parses_compression_section() {
        let mut body = vec![0u8; 5 + 16];
        body[..4].copy_from_slice(&0x4000u32.to_le_bytes());
        body[4] = 1; // standard compression
        let section = build_section(section::raw_type::encapsulated::COMPRESSION, &body);
        let node = SectionNode::new(&section, 0).unwrap();
        assert_eq!(
            node.ext_header(),
            Some(&SectionExtHeader::Compression { uncompressed_length: 0x4000, compression_type: 1 })
        );
        assert_eq!(node.header_length(), 4 + 5);
        assert_eq!(node.content().len(), 16);
        assert!(node.is_encapsulation());
    }

    #[test]
    fn parses_guid_defined_section() {
        let guid = efi::Guid::from_fields(1, 2, 3, 4, 5, &[6, 7, 8, 9, 10, 11]);
        let mut body = vec![0u8; 20 + 8];
        body[..16].copy_from_slice(guid.as_bytes());
        body[16..18].copy_from_slice(&24u16.to_le_bytes()); // data follows the headers
        body[18..20].copy_from_slice(&1u16.to_le_bytes());
        let section = build_section(section::raw_type::encapsulated::GUID_DEFINED, &body);
        let node = SectionNode::new(&section, 0).unwrap();
        assert_eq!(
            node.ext_header(),
            Some(&SectionExtHeader::GuidDefined {
                section_definition_guid: guid,
                data_offset: 24,
                attributes: 1
            })
        );
        assert_eq!(node.header_length(), 24);
        assert_eq!(node.content().len(), 8);
    }

    #[test]
    fn guid_defined_data_offset_inside_headers_is_malformed() {
        let mut body = vec![0u8; 20];
        body[16..18].copy_from_slice(&10u16.to_le_bytes());
        let section = build_section(section::raw_type::encapsulated::GUID_DEFINED, &body);
        assert_eq!(
            SectionNode::new(&section, 0).unwrap_err(),
            FirmwareFileSystemError::InvalidHeader
        );
    }

    #[test]
    fn parses_user_interface_section() {
        let section = build_section(section::raw_type::USER_INTERFACE, &utf16_bytes("Shell"));
        let node = SectionNode::new(&section, 0).unwrap();
        assert_eq!(
            node.ext_header(),
            Some(&SectionExtHeader::UserInterface { file_name_string: "Shell".into() })
        );
        // the whole section is header; no content remains
        assert_eq!(node.header_length(), node.size());
        assert!(node.content().is_empty());
        assert!(node.is_ui_section());
        assert_eq!(node.section_type(), Some(section::Type::UserInterface));
    }

    #[test]
    fn parses_version_section() {
        let mut body = 7u16.to_le_bytes().to_vec();
        body.extend_from_slice(&utf16_bytes("1.2"));
        let section = build_section(section::raw_type::VERSION, &body);
        let node = SectionNode::new(&section, 0).unwrap();
        assert_eq!(
            node.ext_header(),
            Some(&SectionExtHeader::Version { build_number: 7, version_string: "1.2".into() })
        );
        assert_eq!(node.header_length(), node.size());
        assert!(node.is_ver_section());
    }

    #[test]
    fn parses_freeform_subtype_guid_section() {
        let guid = efi::Guid::from_fields(0xaabbccdd, 1, 2, 3, 4, &[5, 6, 7, 8, 9, 10]);
        let mut body = guid.as_bytes().to_vec();
        body.extend_from_slice(&[0xee; 4]);
        let section = build_section(section::raw_type::FREEFORM_SUBTYPE_GUID, &body);
        let node = SectionNode::new(&section, 0).unwrap();
        assert_eq!(
            node.ext_header(),
            Some(&SectionExtHeader::FreeformSubtypeGuid { sub_type_guid: guid })
        );
        assert_eq!(node.header_length(), 20);
        assert_eq!(node.content(), &[0xee; 4]);
    }

    #[test]
    fn declared_size_beyond_buffer_is_malformed() {
        let mut section = build_section(section::raw_type::RAW, &[0; 8]);
        section[0] = 0xff; // inflate the declared size
        assert_eq!(
            SectionNode::new(&section, 0).unwrap_err(),
            FirmwareFileSystemError::InvalidHeader
        );
    }

    #[test]
    fn odd_length_ui_string_is_malformed() {
        let mut body = utf16_bytes("X");
        body.push(0);
        let section = build_section(section::raw_type::USER_INTERFACE, &body);
        assert_eq!(
            SectionNode::new(&section, 0).unwrap_err(),
            FirmwareFileSystemError::InvalidHeader
        );
    }
}
