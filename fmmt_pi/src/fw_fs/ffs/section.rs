//! Firmware File System (FFS) Section Definitions
//!
//! Based on the values defined in the UEFI Platform Initialization (PI)
//! Specification V1.8A Section 3.2.4 Firmware File Section.
//!
//! ## License
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

/// 24-bit size field value that escapes to the extended-size header.
pub const EXTENDED_SIZE_ESCAPE: [u8; 3] = [0xff, 0xff, 0xff];

/// Firmware File System Leaf Section Types
/// Note: Typically called `EFI_SECTION_*` in EDK II code.
pub mod raw_type {
    /// Matches any section type
    pub const ALL: u8 = 0x00;
    /// Encapsulated section type constants
    pub mod encapsulated {
        /// Compression encapsulated section
        pub const COMPRESSION: u8 = 0x01;
        /// GUID-defined encapsulated section
        pub const GUID_DEFINED: u8 = 0x02;
        /// Disposable encapsulated section
        pub const DISPOSABLE: u8 = 0x03;
    }
    /// PE32 executable section
    pub const PE32: u8 = 0x10;
    /// Position-independent code section
    pub const PIC: u8 = 0x11;
    /// Terse executable section
    pub const TE: u8 = 0x12;
    /// DXE dependency expression section
    pub const DXE_DEPEX: u8 = 0x13;
    /// Version information section
    pub const VERSION: u8 = 0x14;
    /// User interface string section
    pub const USER_INTERFACE: u8 = 0x15;
    /// Compatibility16 section
    pub const COMPATIBILITY16: u8 = 0x16;
    /// Firmware volume image section
    pub const FIRMWARE_VOLUME_IMAGE: u8 = 0x17;
    /// Freeform GUID subtype section
    pub const FREEFORM_SUBTYPE_GUID: u8 = 0x18;
    /// Raw data section
    pub const RAW: u8 = 0x19;
    /// PEI dependency expression section
    pub const PEI_DEPEX: u8 = 0x1B;
    /// MM dependency expression section
    pub const MM_DEPEX: u8 = 0x1C;
    /// FFS pad section type
    pub const FFS_PAD: u8 = 0xF0;
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Section type enumeration for firmware file sections
pub enum Type {
    /// All section types
    All = raw_type::ALL,
    /// Compression section
    Compression = raw_type::encapsulated::COMPRESSION,
    /// GUID-defined section
    GuidDefined = raw_type::encapsulated::GUID_DEFINED,
    /// Disposable section
    Disposable = raw_type::encapsulated::DISPOSABLE,
    /// PE32 executable
    Pe32 = raw_type::PE32,
    /// Position-independent code
    Pic = raw_type::PIC,
    /// Terse executable
    Te = raw_type::TE,
    /// DXE dependency expression
    DxeDepex = raw_type::DXE_DEPEX,
    /// Version information
    Version = raw_type::VERSION,
    /// User interface string
    UserInterface = raw_type::USER_INTERFACE,
    /// Compatibility16 binary
    Compatibility16 = raw_type::COMPATIBILITY16,
    /// Firmware volume image
    FirmwareVolumeImage = raw_type::FIRMWARE_VOLUME_IMAGE,
    /// Freeform GUID subtype
    FreeformSubtypeGuid = raw_type::FREEFORM_SUBTYPE_GUID,
    /// Raw data
    Raw = raw_type::RAW,
    /// PEI dependency expression
    PeiDepex = raw_type::PEI_DEPEX,
    /// MM dependency expression
    MmDepex = raw_type::MM_DEPEX,
    /// FFS pad section
    FfsPad = raw_type::FFS_PAD,
}

impl TryFrom<u8> for Type {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            raw_type::ALL => Ok(Type::All),
            raw_type::encapsulated::COMPRESSION => Ok(Type::Compression),
            raw_type::encapsulated::GUID_DEFINED => Ok(Type::GuidDefined),
            raw_type::encapsulated::DISPOSABLE => Ok(Type::Disposable),
            raw_type::PE32 => Ok(Type::Pe32),
            raw_type::PIC => Ok(Type::Pic),
            raw_type::TE => Ok(Type::Te),
            raw_type::DXE_DEPEX => Ok(Type::DxeDepex),
            raw_type::VERSION => Ok(Type::Version),
            raw_type::USER_INTERFACE => Ok(Type::UserInterface),
            raw_type::COMPATIBILITY16 => Ok(Type::Compatibility16),
            raw_type::FIRMWARE_VOLUME_IMAGE => Ok(Type::FirmwareVolumeImage),
            raw_type::FREEFORM_SUBTYPE_GUID => Ok(Type::FreeformSubtypeGuid),
            raw_type::RAW => Ok(Type::Raw),
            raw_type::PEI_DEPEX => Ok(Type::PeiDepex),
            raw_type::MM_DEPEX => Ok(Type::MmDepex),
            raw_type::FFS_PAD => Ok(Type::FfsPad),
            other => Err(other),
        }
    }
}

/// EFI_COMMON_SECTION_HEADER per PI spec 1.8A 3.2.4.1
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// Section size (24-bit little-endian), header included
    pub size: [u8; 3],
    /// Section type identifier
    pub section_type: u8,
}

/// Section extended header structures
pub mod header {
    use r_efi::efi;

    /// EFI_COMMON_SECTION_HEADER2 per PI spec 1.8A 3.2.4.1
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct CommonSectionHeaderExtended {
        /// Section size, all 0xFF in the extended variant
        pub size: [u8; 3],
        /// Section type identifier
        pub section_type: u8,
        /// Explicit 32-bit section size, header included
        pub extended_size: u32,
    }

    /// EFI_COMPRESSION_SECTION per PI spec 1.8A 3.2.5.2
    #[repr(C, packed)]
    #[derive(Debug, Clone, Copy)]
    pub struct Compression {
        /// Uncompressed data length
        pub uncompressed_length: u32,
        /// Compression algorithm type
        pub compression_type: u8,
    }

    /// EFI_GUID_DEFINED_SECTION per PI spec 1.8A 3.2.5.7
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct GuidDefined {
        /// GUID identifying the section format
        pub section_definition_guid: efi::Guid,
        /// Offset to section data from the start of the section
        pub data_offset: u16,
        /// Section attributes
        pub attributes: u16,
        // Guid-specific header fields follow.
    }

    /// EFI_VERSION_SECTION per PI spec 1.8A 3.2.5.15
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct Version {
        /// Build number; a null-terminated UTF-16 version string follows
        pub build_number: u16,
    }

    /// EFI_FREEFORM_SUBTYPE_GUID_SECTION per PI spec 1.8A 3.2.5.6
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct FreeformSubtypeGuid {
        /// Subtype GUID identifier
        pub sub_type_guid: efi::Guid,
    }
}
