//! ELF payload image node.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::vec::Vec;
use core::fmt;
use scroll::{LE, Pread};

use crate::error::{Error, Result};

/// ELF identification magic.
pub const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// `e_ident[EI_CLASS]` values.
pub mod class {
    pub const ELFCLASS32: u8 = 1;
    pub const ELFCLASS64: u8 = 2;
}

// e_ident[EI_DATA] little-endian encoding; the only one supported.
const ELFDATA2LSB: u8 = 1;

// Section type for uninitialized data, which occupies no file bytes.
const SHT_NOBITS: u32 = 8;

// Universal payload information section magics.
const UPLD_IDENTIFIER_UPLD: u32 = u32::from_le_bytes(*b"UPLD");
const UPLD_IDENTIFIER_PLDH: u32 = u32::from_le_bytes(*b"PLDH");

// Serialized size of UNIVERSAL_PAYLOAD_INFO_HEADER.
const SIZEOF_UPLD_INFO: usize = 56;

/// Class-independent view of an ELF header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    pub class: u8,
    pub elf_type: u16,
    pub machine: u16,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

/// Class-independent view of one program header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

/// Class-independent view of one section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionHeader {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

/// UNIVERSAL_PAYLOAD_INFO_HEADER carried in a payload ELF section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpldInfo {
    pub identifier: u32,
    pub header_length: u32,
    pub spec_revision: u16,
    pub revision: u32,
    pub attribute: u32,
    pub capability: u32,
    pub producer_id: [u8; 16],
    pub image_id: [u8; 16],
}

/// An ELF payload image and the bytes backing it.
///
/// Decodes both 32-bit and 64-bit little-endian images into a
/// class-independent header view and locates an embedded universal payload
/// information structure when one is present.
pub struct ElfNode {
    data: Vec<u8>,
    base: u64,
    header: ElfHeader,
    program_headers: Vec<ProgramHeader>,
    section_headers: Vec<SectionHeader>,
    upld_info: Option<UpldInfo>,
    upld_info_aligned: bool,
}

impl ElfNode {
    /// Instantiate a new ElfNode from a byte window starting at absolute
    /// offset `base` within the enclosing section.
    pub fn new(buffer: &[u8], base: u64) -> Result<Self> {
        if buffer.len() < 16 {
            Err(Error::BufferTooShort(16, "ELF identification"))?;
        }
        if buffer[..4] != ELF_MAGIC {
            Err(Error::InvalidMagic)?;
        }
        let elf_class = buffer[4];
        if elf_class != class::ELFCLASS32 && elf_class != class::ELFCLASS64 {
            Err(Error::UnsupportedClass(elf_class))?;
        }
        if buffer[5] != ELFDATA2LSB {
            Err(Error::InvalidImage)?;
        }

        let header = Self::parse_header(buffer, elf_class)?;
        let program_headers = Self::parse_program_headers(buffer, &header)?;
        let section_headers = Self::parse_section_headers(buffer, &header)?;

        let mut node = Self {
            data: buffer.to_vec(),
            base,
            header,
            program_headers,
            section_headers,
            upld_info: None,
            upld_info_aligned: false,
        };
        node.locate_upld_info()?;
        Ok(node)
    }

    fn parse_header(buffer: &[u8], elf_class: u8) -> Result<ElfHeader> {
        let offset = &mut 16usize;
        let elf_type = buffer.gread_with::<u16>(offset, LE)?;
        let machine = buffer.gread_with::<u16>(offset, LE)?;
        let _version = buffer.gread_with::<u32>(offset, LE)?;
        let (entry, phoff, shoff) = if elf_class == class::ELFCLASS64 {
            (
                buffer.gread_with::<u64>(offset, LE)?,
                buffer.gread_with::<u64>(offset, LE)?,
                buffer.gread_with::<u64>(offset, LE)?,
            )
        } else {
            (
                buffer.gread_with::<u32>(offset, LE)? as u64,
                buffer.gread_with::<u32>(offset, LE)? as u64,
                buffer.gread_with::<u32>(offset, LE)? as u64,
            )
        };
        Ok(ElfHeader {
            class: elf_class,
            elf_type,
            machine,
            entry,
            phoff,
            shoff,
            flags: buffer.gread_with::<u32>(offset, LE)?,
            ehsize: buffer.gread_with::<u16>(offset, LE)?,
            phentsize: buffer.gread_with::<u16>(offset, LE)?,
            phnum: buffer.gread_with::<u16>(offset, LE)?,
            shentsize: buffer.gread_with::<u16>(offset, LE)?,
            shnum: buffer.gread_with::<u16>(offset, LE)?,
            shstrndx: buffer.gread_with::<u16>(offset, LE)?,
        })
    }

    fn parse_program_headers(buffer: &[u8], header: &ElfHeader) -> Result<Vec<ProgramHeader>> {
        let mut program_headers = Vec::with_capacity(header.phnum as usize);
        for index in 0..header.phnum as usize {
            let offset = &mut (header.phoff as usize + index * header.phentsize as usize);
            let entry = if header.class == class::ELFCLASS64 {
                let p_type = buffer.gread_with::<u32>(offset, LE)?;
                let p_flags = buffer.gread_with::<u32>(offset, LE)?;
                ProgramHeader {
                    p_type,
                    p_flags,
                    p_offset: buffer.gread_with::<u64>(offset, LE)?,
                    p_vaddr: buffer.gread_with::<u64>(offset, LE)?,
                    p_paddr: buffer.gread_with::<u64>(offset, LE)?,
                    p_filesz: buffer.gread_with::<u64>(offset, LE)?,
                    p_memsz: buffer.gread_with::<u64>(offset, LE)?,
                    p_align: buffer.gread_with::<u64>(offset, LE)?,
                }
            } else {
                let p_type = buffer.gread_with::<u32>(offset, LE)?;
                let p_offset = buffer.gread_with::<u32>(offset, LE)? as u64;
                let p_vaddr = buffer.gread_with::<u32>(offset, LE)? as u64;
                let p_paddr = buffer.gread_with::<u32>(offset, LE)? as u64;
                let p_filesz = buffer.gread_with::<u32>(offset, LE)? as u64;
                let p_memsz = buffer.gread_with::<u32>(offset, LE)? as u64;
                let p_flags = buffer.gread_with::<u32>(offset, LE)?;
                let p_align = buffer.gread_with::<u32>(offset, LE)? as u64;
                ProgramHeader { p_type, p_flags, p_offset, p_vaddr, p_paddr, p_filesz, p_memsz, p_align }
            };
            program_headers.push(entry);
        }
        Ok(program_headers)
    }

    fn parse_section_headers(buffer: &[u8], header: &ElfHeader) -> Result<Vec<SectionHeader>> {
        let mut section_headers = Vec::with_capacity(header.shnum as usize);
        for index in 0..header.shnum as usize {
            let offset = &mut (header.shoff as usize + index * header.shentsize as usize);
            let sh_name = buffer.gread_with::<u32>(offset, LE)?;
            let sh_type = buffer.gread_with::<u32>(offset, LE)?;
            let entry = if header.class == class::ELFCLASS64 {
                SectionHeader {
                    sh_name,
                    sh_type,
                    sh_flags: buffer.gread_with::<u64>(offset, LE)?,
                    sh_addr: buffer.gread_with::<u64>(offset, LE)?,
                    sh_offset: buffer.gread_with::<u64>(offset, LE)?,
                    sh_size: buffer.gread_with::<u64>(offset, LE)?,
                    sh_link: buffer.gread_with::<u32>(offset, LE)?,
                    sh_info: buffer.gread_with::<u32>(offset, LE)?,
                    sh_addralign: buffer.gread_with::<u64>(offset, LE)?,
                    sh_entsize: buffer.gread_with::<u64>(offset, LE)?,
                }
            } else {
                SectionHeader {
                    sh_name,
                    sh_type,
                    sh_flags: buffer.gread_with::<u32>(offset, LE)? as u64,
                    sh_addr: buffer.gread_with::<u32>(offset, LE)? as u64,
                    sh_offset: buffer.gread_with::<u32>(offset, LE)? as u64,
                    sh_size: buffer.gread_with::<u32>(offset, LE)? as u64,
                    sh_link: buffer.gread_with::<u32>(offset, LE)?,
                    sh_info: buffer.gread_with::<u32>(offset, LE)?,
                    sh_addralign: buffer.gread_with::<u32>(offset, LE)? as u64,
                    sh_entsize: buffer.gread_with::<u32>(offset, LE)? as u64,
                }
            };
            section_headers.push(entry);
        }
        Ok(section_headers)
    }

    // Scans section data for the universal payload information structure,
    // identified by its leading magic.
    fn locate_upld_info(&mut self) -> Result<()> {
        for section in &self.section_headers {
            if section.sh_type == SHT_NOBITS || section.sh_size < 4 {
                continue;
            }
            let Ok(start) = usize::try_from(section.sh_offset) else {
                continue;
            };
            if start + 4 > self.data.len() {
                continue;
            }
            let identifier = self.data.pread_with::<u32>(start, LE)?;
            if identifier != UPLD_IDENTIFIER_UPLD && identifier != UPLD_IDENTIFIER_PLDH {
                continue;
            }
            if (section.sh_size as usize) < SIZEOF_UPLD_INFO
                || start + SIZEOF_UPLD_INFO > self.data.len()
            {
                Err(Error::BufferTooShort(SIZEOF_UPLD_INFO, "universal payload info"))?;
            }
            self.upld_info = Some(Self::parse_upld_info(&self.data[start..start + SIZEOF_UPLD_INFO])?);
            self.upld_info_aligned = start % 4 == 0;
            return Ok(());
        }
        Ok(())
    }

    fn parse_upld_info(bytes: &[u8]) -> Result<UpldInfo> {
        let offset = &mut 0usize;
        let identifier = bytes.gread_with::<u32>(offset, LE)?;
        let header_length = bytes.gread_with::<u32>(offset, LE)?;
        let spec_revision = bytes.gread_with::<u16>(offset, LE)?;
        let _reserved = bytes.gread_with::<u16>(offset, LE)?;
        let revision = bytes.gread_with::<u32>(offset, LE)?;
        let attribute = bytes.gread_with::<u32>(offset, LE)?;
        let capability = bytes.gread_with::<u32>(offset, LE)?;
        let mut producer_id = [0u8; 16];
        producer_id.copy_from_slice(&bytes[*offset..*offset + 16]);
        let mut image_id = [0u8; 16];
        image_id.copy_from_slice(&bytes[*offset + 16..*offset + 32]);
        Ok(UpldInfo {
            identifier,
            header_length,
            spec_revision,
            revision,
            attribute,
            capability,
            producer_id,
            image_id,
        })
    }

    /// Absolute offset of this image within the enclosing section.
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    pub fn program_headers(&self) -> &[ProgramHeader] {
        &self.program_headers
    }

    pub fn section_headers(&self) -> &[SectionHeader] {
        &self.section_headers
    }

    /// Universal payload information, if an UPLD or PLDH section was found.
    pub fn upld_info(&self) -> Option<&UpldInfo> {
        self.upld_info.as_ref()
    }

    /// True when the payload information section sits on a 4-byte file
    /// offset, as payload loaders expect.
    pub fn upld_info_aligned(&self) -> bool {
        self.upld_info_aligned
    }

    /// The full serialized image.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for ElfNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElfNode")
            .field("base", &format_args!("{:#x}", self.base))
            .field("class", &self.header.class)
            .field("machine", &format_args!("{:#x}", self.header.machine))
            .field("sections", &self.section_headers.len())
            .field("upld_info", &self.upld_info.is_some())
            .finish()
    }
}
