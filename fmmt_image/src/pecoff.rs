//! PE/COFF and TE image node.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::vec::Vec;
use core::fmt;
use scroll::{LE, Pread, Pwrite};

use crate::{
    error::{Error, Result},
    relocation::{Fixup, FixupKind, parse_relocation_blocks},
};
use goblin::pe::header::{
    COFF_MACHINE_ARM, COFF_MACHINE_ARM64, COFF_MACHINE_EBC, COFF_MACHINE_RISCV64,
    COFF_MACHINE_THUMB, COFF_MACHINE_X86, COFF_MACHINE_X86_64, DOS_MAGIC, PE_MAGIC,
    PE_POINTER_OFFSET, SIZEOF_COFF_HEADER,
};
use goblin::pe::optional_header::{MAGIC_32, MAGIC_64};

// Magic value for TE header.
const TE_MAGIC: u16 = 0x5A56;
// The size of the TE header.
const SIZEOF_TE_HEADER: usize = 40;
// The size of the PE32 signature.
const SIZEOF_PE32_SIGNATURE: usize = 4;

// TE header field offsets.
const TE_MACHINE_OFFSET: usize = 2;
const TE_SUBSYSTEM_OFFSET: usize = 5;
const TE_STRIPPED_SIZE_OFFSET: usize = 6;
const TE_IMAGE_BASE_OFFSET: usize = 16;
const TE_RELOC_DIR_OFFSET: usize = 24;

// Optional header field offsets, relative to the optional header magic.
const OPT_IMAGE_BASE_OFFSET_32: usize = 28;
const OPT_IMAGE_BASE_OFFSET_64: usize = 24;
const OPT_SIZE_OF_IMAGE_OFFSET: usize = 56;
const OPT_SUBSYSTEM_OFFSET: usize = 68;
const OPT_NUM_DIRS_OFFSET_32: usize = 92;
const OPT_NUM_DIRS_OFFSET_64: usize = 108;
const OPT_DATA_DIRS_OFFSET_32: usize = 96;
const OPT_DATA_DIRS_OFFSET_64: usize = 112;

// Index of the base relocation data directory.
const BASE_RELOCATION_DIRECTORY: usize = 5;

// Firmware subsystem values (IMAGE_SUBSYSTEM_*).
const SUBSYSTEM_EFI_APPLICATION: u16 = 10;
const SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER: u16 = 11;
const SUBSYSTEM_EFI_RUNTIME_DRIVER: u16 = 12;
const SUBSYSTEM_SAL_RUNTIME_DRIVER: u16 = 13;

/// Header layout variant of a parsed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Terse executable; relocation RVAs are biased by the stripped header size.
    Te { stripped_size: u16 },
    Pe32,
    Pe32Plus,
}

/// How a rebase target is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseMode {
    /// Move the image so it is linked at the given address.
    Absolute(u64),
    /// Shift the image by a signed displacement.
    Delta(i64),
}

/// A PE32, PE32+, or TE image and the bytes backing it.
///
/// Construction validates the machine and subsystem, records every base
/// relocation as an absolute file offset, and normalizes a bare ARM machine
/// type to Thumb in place. Images whose SizeOfImage disagrees with the
/// buffer length are kept but marked non-rebasable.
pub struct PeCoffNode {
    data: Vec<u8>,
    base: u64,
    format: ImageFormat,
    machine: u16,
    image_type: u16,
    image_address: u64,
    size_of_image: u32,
    image_base_field_offset: usize,
    rebasable: bool,
    fixups: Vec<Fixup>,
}

impl PeCoffNode {
    /// Instantiate a new PeCoffNode from a byte window starting at absolute
    /// offset `base` within the enclosing section.
    pub fn new(buffer: &[u8], base: u64) -> Result<Self> {
        let data = buffer.to_vec();
        match data.pread_with::<u16>(0, LE)? {
            TE_MAGIC => Self::from_te(data, base, 0),
            DOS_MAGIC => {
                let pe_pointer =
                    data.pread_with::<u32>(PE_POINTER_OFFSET as usize, LE)? as usize;
                if data.pread_with::<u32>(pe_pointer, LE)? == PE_MAGIC {
                    Self::from_pe(data, base, pe_pointer)
                } else if data.pread_with::<u16>(pe_pointer, LE)? == TE_MAGIC {
                    // a TE image behind a DOS stub
                    Self::from_te(data, base, pe_pointer)
                } else {
                    Err(Error::InvalidImage)
                }
            }
            signature => Err(Error::BadSignature(signature)),
        }
    }

    fn from_te(mut data: Vec<u8>, base: u64, header_offset: usize) -> Result<Self> {
        if data.len() < header_offset + SIZEOF_TE_HEADER {
            Err(Error::BufferTooShort(header_offset + SIZEOF_TE_HEADER, "TE header"))?;
        }

        let machine = Self::check_machine(&mut data, header_offset + TE_MACHINE_OFFSET)?;
        let image_type =
            Self::check_subsystem(data[header_offset + TE_SUBSYSTEM_OFFSET] as u16)?;
        let stripped_size =
            data.pread_with::<u16>(header_offset + TE_STRIPPED_SIZE_OFFSET, LE)?;
        let image_address =
            data.pread_with::<u64>(header_offset + TE_IMAGE_BASE_OFFSET, LE)?;

        // RVAs still assume the stripped headers are present; this folds the
        // difference into every RVA-to-file-offset conversion.
        let rva_adjust =
            (header_offset + SIZEOF_TE_HEADER) as i64 - stripped_size as i64;

        let dir_rva = data.pread_with::<u32>(header_offset + TE_RELOC_DIR_OFFSET, LE)?;
        let dir_size = data.pread_with::<u32>(header_offset + TE_RELOC_DIR_OFFSET + 4, LE)?;

        let wide = Self::is_wide_machine(machine);
        let mut node = Self {
            data,
            base,
            format: ImageFormat::Te { stripped_size },
            machine,
            image_type,
            image_address,
            size_of_image: 0,
            image_base_field_offset: header_offset + TE_IMAGE_BASE_OFFSET,
            rebasable: true,
            fixups: Vec::new(),
        };
        node.size_of_image = node.data.len() as u32;
        node.extract_fixups(dir_rva, dir_size, rva_adjust, wide)?;
        Ok(node)
    }

    fn from_pe(mut data: Vec<u8>, base: u64, pe_pointer: usize) -> Result<Self> {
        let optional_offset = pe_pointer + SIZEOF_PE32_SIGNATURE + SIZEOF_COFF_HEADER;

        let machine = Self::check_machine(&mut data, pe_pointer + SIZEOF_PE32_SIGNATURE)?;
        let format = match data.pread_with::<u16>(optional_offset, LE)? {
            MAGIC_32 => ImageFormat::Pe32,
            MAGIC_64 => ImageFormat::Pe32Plus,
            _ => Err(Error::InvalidImage)?,
        };
        let image_type =
            Self::check_subsystem(data.pread_with::<u16>(optional_offset + OPT_SUBSYSTEM_OFFSET, LE)?)?;
        let size_of_image =
            data.pread_with::<u32>(optional_offset + OPT_SIZE_OF_IMAGE_OFFSET, LE)?;

        let (image_base_field_offset, image_address, num_dirs_offset, dirs_offset) = match format {
            ImageFormat::Pe32 => (
                optional_offset + OPT_IMAGE_BASE_OFFSET_32,
                data.pread_with::<u32>(optional_offset + OPT_IMAGE_BASE_OFFSET_32, LE)? as u64,
                optional_offset + OPT_NUM_DIRS_OFFSET_32,
                optional_offset + OPT_DATA_DIRS_OFFSET_32,
            ),
            _ => (
                optional_offset + OPT_IMAGE_BASE_OFFSET_64,
                data.pread_with::<u64>(optional_offset + OPT_IMAGE_BASE_OFFSET_64, LE)?,
                optional_offset + OPT_NUM_DIRS_OFFSET_64,
                optional_offset + OPT_DATA_DIRS_OFFSET_64,
            ),
        };

        // The image is only safe to patch when the buffer covers exactly the
        // loaded layout; a stripped or truncated image is kept read-only.
        let rebasable = size_of_image as usize == data.len();

        let num_dirs = data.pread_with::<u32>(num_dirs_offset, LE)?;
        let (dir_rva, dir_size) = if num_dirs as usize > BASE_RELOCATION_DIRECTORY {
            let dir_offset = dirs_offset + BASE_RELOCATION_DIRECTORY * 8;
            (
                data.pread_with::<u32>(dir_offset, LE)?,
                data.pread_with::<u32>(dir_offset + 4, LE)?,
            )
        } else {
            (0, 0)
        };

        let wide = format == ImageFormat::Pe32Plus;
        let mut node = Self {
            data,
            base,
            format,
            machine,
            image_type,
            image_address,
            size_of_image,
            image_base_field_offset,
            rebasable,
            fixups: Vec::new(),
        };
        if rebasable {
            node.extract_fixups(dir_rva, dir_size, 0, wide)?;
        }
        Ok(node)
    }

    // Validates the COFF machine type, rewriting a bare ARM machine to Thumb.
    fn check_machine(data: &mut [u8], machine_offset: usize) -> Result<u16> {
        let machine = data.pread_with::<u16>(machine_offset, LE)?;
        match machine {
            COFF_MACHINE_ARM => {
                data.pwrite_with::<u16>(COFF_MACHINE_THUMB, machine_offset, LE)?;
                Ok(COFF_MACHINE_THUMB)
            }
            COFF_MACHINE_X86
            | COFF_MACHINE_X86_64
            | COFF_MACHINE_THUMB
            | COFF_MACHINE_ARM64
            | COFF_MACHINE_EBC
            | COFF_MACHINE_RISCV64 => Ok(machine),
            machine => Err(Error::UnsupportedMachine(machine)),
        }
    }

    fn check_subsystem(subsystem: u16) -> Result<u16> {
        match subsystem {
            SUBSYSTEM_EFI_APPLICATION
            | SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER
            | SUBSYSTEM_EFI_RUNTIME_DRIVER
            | SUBSYSTEM_SAL_RUNTIME_DRIVER => Ok(subsystem),
            subsystem => Err(Error::UnsupportedImageType(subsystem)),
        }
    }

    fn is_wide_machine(machine: u16) -> bool {
        matches!(machine, COFF_MACHINE_X86_64 | COFF_MACHINE_ARM64 | COFF_MACHINE_RISCV64)
    }

    // Resolves the relocation directory and records every fixup, verifying
    // each patch target lies inside the owned bytes.
    fn extract_fixups(
        &mut self,
        dir_rva: u32,
        dir_size: u32,
        rva_adjust: i64,
        wide: bool,
    ) -> Result<()> {
        if dir_size == 0 {
            return Ok(());
        }
        let dir_offset = dir_rva as i64 + rva_adjust;
        let dir_offset: usize = dir_offset.try_into().map_err(|_| Error::InvalidImage)?;
        let dir_data = self
            .data
            .get(dir_offset..dir_offset + dir_size as usize)
            .ok_or(Error::BufferTooShort(dir_size as usize, "relocation directory"))?;

        let fixups = parse_relocation_blocks(dir_data, self.base as i64 + rva_adjust, wide)?;
        for fixup in &fixups {
            let target = fixup
                .offset
                .checked_sub(self.base)
                .and_then(|offset| usize::try_from(offset).ok())
                .ok_or(Error::InvalidImage)?;
            if target + fixup.kind.width() > self.data.len() {
                Err(Error::InvalidImage)?;
            }
        }
        self.fixups = fixups;
        Ok(())
    }

    /// Absolute offset of this image within the enclosing section.
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// COFF machine type after normalization.
    pub fn machine(&self) -> u16 {
        self.machine
    }

    /// Image subsystem (IMAGE_SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER \[0xB\], etc.).
    pub fn image_type(&self) -> u16 {
        self.image_type
    }

    /// Address the image is currently linked at, from the header.
    pub fn image_address(&self) -> u64 {
        self.image_address
    }

    pub fn size_of_image(&self) -> u32 {
        self.size_of_image
    }

    /// False when the header layout disagrees with the buffer, in which case
    /// [`rebase`](Self::rebase) leaves the image untouched.
    pub fn rebasable(&self) -> bool {
        self.rebasable
    }

    /// Recorded base relocations, as absolute file offsets.
    pub fn fixups(&self) -> &[Fixup] {
        &self.fixups
    }

    /// The full serialized image.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Moves the image to a new link address, patching the header image base
    /// and every recorded fixup in place.
    pub fn rebase(&mut self, mode: RebaseMode) -> Result<()> {
        if !self.rebasable {
            log::debug!("image at {:#x}: not rebasable, leaving in place", self.base);
            return Ok(());
        }
        let delta = match mode {
            RebaseMode::Absolute(address) => address.wrapping_sub(self.image_address),
            RebaseMode::Delta(delta) => delta as u64,
        };
        if delta == 0 {
            return Ok(());
        }

        let new_address = self.image_address.wrapping_add(delta);
        match self.format {
            ImageFormat::Pe32 => {
                self.data.pwrite_with::<u32>(new_address as u32, self.image_base_field_offset, LE)?;
            }
            _ => {
                self.data.pwrite_with::<u64>(new_address, self.image_base_field_offset, LE)?;
            }
        }

        for fixup in &self.fixups {
            // targets were bounds-checked at construction
            let target = (fixup.offset - self.base) as usize;
            match fixup.kind {
                FixupKind::HighLow => {
                    let value = self.data.pread_with::<u32>(target, LE)?;
                    self.data.pwrite_with::<u32>(value.wrapping_add(delta as u32), target, LE)?;
                }
                FixupKind::Dir64 => {
                    let value = self.data.pread_with::<u64>(target, LE)?;
                    self.data.pwrite_with::<u64>(value.wrapping_add(delta), target, LE)?;
                }
            }
        }

        self.image_address = match self.format {
            ImageFormat::Pe32 => {
                self.data.pread_with::<u32>(self.image_base_field_offset, LE)? as u64
            }
            _ => self.data.pread_with::<u64>(self.image_base_field_offset, LE)?,
        };
        Ok(())
    }
}

impl fmt::Debug for PeCoffNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeCoffNode")
            .field("base", &format_args!("{:#x}", self.base))
            .field("format", &self.format)
            .field("machine", &format_args!("{:#x}", self.machine))
            .field("image_type", &self.image_type)
            .field("image_address", &format_args!("{:#x}", self.image_address))
            .field("rebasable", &self.rebasable)
            .field("fixups", &self.fixups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE_LEN: usize = 0x400;

    fn write_u16(image: &mut [u8], offset: usize, value: u16) {
        image[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn write_u32(image: &mut [u8], offset: usize, value: u32) {
        image[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn write_u64(image: &mut [u8], offset: usize, value: u64) {
        image[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    // one relocation block with a single fixup entry plus an absolute pad
    fn write_reloc_block(image: &mut [u8], offset: usize, page_rva: u32, entry: u16) {
        write_u32(image, offset, page_rva);
        write_u32(image, offset + 4, 12);
        write_u16(image, offset + 8, entry);
        write_u16(image, offset + 10, 0);
    }

    // PE32 with a HIGHLOW fixup at RVA 0x210 over a field holding 0x10000000
    fn build_pe32() -> Vec<u8> {
        let mut image = vec![0u8; IMAGE_LEN];
        write_u16(&mut image, 0, DOS_MAGIC);
        write_u32(&mut image, 0x3c, 0x40);
        write_u32(&mut image, 0x40, PE_MAGIC);
        write_u16(&mut image, 0x44, COFF_MACHINE_X86);
        write_u16(&mut image, 0x54, 224); // optional header size
        let opt = 0x58;
        write_u16(&mut image, opt, MAGIC_32);
        write_u32(&mut image, opt + 28, 0x1000_0000); // image base
        write_u32(&mut image, opt + 56, IMAGE_LEN as u32); // size of image
        write_u16(&mut image, opt + 68, SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER);
        write_u32(&mut image, opt + 92, 16); // directory count
        write_u32(&mut image, opt + 96 + 40, 0x140); // reloc dir rva
        write_u32(&mut image, opt + 96 + 44, 12); // reloc dir size
        write_reloc_block(&mut image, 0x140, 0x200, (3 << 12) | 0x10);
        write_u32(&mut image, 0x210, 0x1000_0000); // the relocated field
        image
    }

    // PE32+ with a DIR64 fixup at RVA 0x218
    fn build_pe32_plus() -> Vec<u8> {
        let mut image = vec![0u8; IMAGE_LEN];
        write_u16(&mut image, 0, DOS_MAGIC);
        write_u32(&mut image, 0x3c, 0x40);
        write_u32(&mut image, 0x40, PE_MAGIC);
        write_u16(&mut image, 0x44, COFF_MACHINE_X86_64);
        write_u16(&mut image, 0x54, 240);
        let opt = 0x58;
        write_u16(&mut image, opt, MAGIC_64);
        write_u64(&mut image, opt + 24, 0x1_8000_0000);
        write_u32(&mut image, opt + 56, IMAGE_LEN as u32);
        write_u16(&mut image, opt + 68, SUBSYSTEM_EFI_APPLICATION);
        write_u32(&mut image, opt + 108, 16);
        write_u32(&mut image, opt + 112 + 40, 0x140);
        write_u32(&mut image, opt + 112 + 44, 12);
        write_reloc_block(&mut image, 0x140, 0x200, (10 << 12) | 0x18);
        write_u64(&mut image, 0x218, 0x1_8000_1000);
        image
    }

    // TE with stripped_size 0x200 and a DIR64 fixup at page 0x400 offset 0x20
    fn build_te(machine: u16) -> Vec<u8> {
        let mut image = vec![0u8; IMAGE_LEN];
        write_u16(&mut image, 0, TE_MAGIC);
        write_u16(&mut image, 2, machine);
        image[4] = 1; // section count
        image[5] = SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER as u8;
        write_u16(&mut image, 6, 0x200); // stripped size
        write_u64(&mut image, 16, 0x8000_0000); // image base
        // reloc dir rva 0x240 maps to file offset 0x240 + 40 - 0x200 = 0x68
        write_u32(&mut image, 24, 0x240);
        write_u32(&mut image, 28, 12);
        write_reloc_block(&mut image, 0x68, 0x400, (10 << 12) | 0x20);
        // fixup target: 40 - 0x200 + 0x400 + 0x20 = 0x248
        write_u64(&mut image, 0x248, 0x8000_0480);
        image
    }

    #[test]
    fn parses_pe32_and_records_fixups() {
        let node = PeCoffNode::new(&build_pe32(), 0).unwrap();
        assert_eq!(node.format(), ImageFormat::Pe32);
        assert_eq!(node.machine(), COFF_MACHINE_X86);
        assert_eq!(node.image_type(), SUBSYSTEM_EFI_BOOT_SERVICE_DRIVER);
        assert_eq!(node.image_address(), 0x1000_0000);
        assert!(node.rebasable());
        assert_eq!(node.fixups(), &[Fixup { kind: FixupKind::HighLow, offset: 0x210 }]);
    }

    #[test]
    fn pe32_rebase_patches_field_and_image_base() {
        let mut node = PeCoffNode::new(&build_pe32(), 0).unwrap();
        node.rebase(RebaseMode::Delta(0x1000)).unwrap();
        assert_eq!(node.image_address(), 0x1000_1000);
        let field = u32::from_le_bytes(node.data()[0x210..0x214].try_into().unwrap());
        assert_eq!(field, 0x1000_1000);
        let stored = u32::from_le_bytes(node.data()[0x58 + 28..0x58 + 32].try_into().unwrap());
        assert_eq!(stored, 0x1000_1000);
    }

    #[test]
    fn absolute_rebase_matches_delta_rebase() {
        let mut by_delta = PeCoffNode::new(&build_pe32(), 0).unwrap();
        by_delta.rebase(RebaseMode::Delta(0x1000)).unwrap();
        let mut by_address = PeCoffNode::new(&build_pe32(), 0).unwrap();
        by_address.rebase(RebaseMode::Absolute(0x1000_1000)).unwrap();
        assert_eq!(by_delta.data(), by_address.data());
    }

    #[test]
    fn rebase_then_inverse_restores_image() {
        let original = build_pe32_plus();
        let mut node = PeCoffNode::new(&original, 0).unwrap();
        node.rebase(RebaseMode::Delta(0x10_0000)).unwrap();
        assert_ne!(node.data(), &original[..]);
        node.rebase(RebaseMode::Delta(-0x10_0000)).unwrap();
        assert_eq!(node.data(), &original[..]);
    }

    #[test]
    fn dir64_in_pe32_is_rejected() {
        let mut image = build_pe32();
        write_u16(&mut image, 0x140 + 8, (10 << 12) | 0x10);
        assert!(matches!(
            PeCoffNode::new(&image, 0),
            Err(Error::UnsupportedRelocationType(10))
        ));
    }

    #[test]
    fn te_fixup_offsets_account_for_stripped_headers() {
        let base = 0x5000;
        let node = PeCoffNode::new(&build_te(COFF_MACHINE_X86_64), base).unwrap();
        assert_eq!(node.format(), ImageFormat::Te { stripped_size: 0x200 });
        // base + header size - stripped size + page rva + low offset
        assert_eq!(
            node.fixups(),
            &[Fixup { kind: FixupKind::Dir64, offset: base + 40 - 0x200 + 0x400 + 0x20 }]
        );
    }

    #[test]
    fn te_rebase_patches_fixup() {
        let mut node = PeCoffNode::new(&build_te(COFF_MACHINE_X86_64), 0).unwrap();
        node.rebase(RebaseMode::Absolute(0x9000_0000)).unwrap();
        assert_eq!(node.image_address(), 0x9000_0000);
        let field = u64::from_le_bytes(node.data()[0x248..0x250].try_into().unwrap());
        assert_eq!(field, 0x9000_0480);
    }

    #[test]
    fn dos_wrapped_te_is_accepted() {
        let mut image = vec![0u8; IMAGE_LEN];
        write_u16(&mut image, 0, DOS_MAGIC);
        write_u32(&mut image, 0x3c, 0x80);
        write_u16(&mut image, 0x80, TE_MAGIC);
        write_u16(&mut image, 0x82, COFF_MACHINE_X86_64);
        image[0x85] = SUBSYSTEM_EFI_RUNTIME_DRIVER as u8;
        // stripped size equal to the bytes before the section data keeps
        // RVAs identical to file offsets
        write_u16(&mut image, 0x86, 0x80 + 40);
        write_u64(&mut image, 0x90, 0x1000_0000);
        write_u32(&mut image, 0x98, 0x100);
        write_u32(&mut image, 0x9c, 12);
        write_reloc_block(&mut image, 0x100, 0x200, (10 << 12) | 0x0);
        write_u64(&mut image, 0x200, 0x1000_0200);

        let node = PeCoffNode::new(&image, 0).unwrap();
        assert_eq!(node.format(), ImageFormat::Te { stripped_size: 0x80 + 40 });
        assert_eq!(node.fixups(), &[Fixup { kind: FixupKind::Dir64, offset: 0x200 }]);
    }

    #[test]
    fn bare_arm_machine_is_normalized_to_thumb() {
        let mut image = build_te(COFF_MACHINE_ARM);
        // 32-bit machine, so the fixup must be HIGHLOW
        write_u16(&mut image, 0x68 + 8, (3 << 12) | 0x20);
        let node = PeCoffNode::new(&image, 0).unwrap();
        assert_eq!(node.machine(), COFF_MACHINE_THUMB);
        assert_eq!(u16::from_le_bytes(node.data()[2..4].try_into().unwrap()), COFF_MACHINE_THUMB);
    }

    #[test]
    fn unknown_machine_is_rejected() {
        let mut image = build_te(COFF_MACHINE_X86_64);
        write_u16(&mut image, 2, 0x1234);
        assert!(matches!(PeCoffNode::new(&image, 0), Err(Error::UnsupportedMachine(0x1234))));
    }

    #[test]
    fn non_firmware_subsystem_is_rejected() {
        let mut image = build_te(COFF_MACHINE_X86_64);
        image[5] = 2; // windows gui
        assert!(matches!(PeCoffNode::new(&image, 0), Err(Error::UnsupportedImageType(2))));
    }

    #[test]
    fn size_of_image_mismatch_disables_rebasing() {
        let mut image = build_pe32();
        write_u32(&mut image, 0x58 + 56, 0x800);
        let before = image.clone();
        let mut node = PeCoffNode::new(&image, 0).unwrap();
        assert!(!node.rebasable());
        assert!(node.fixups().is_empty());
        node.rebase(RebaseMode::Delta(0x1000)).unwrap();
        assert_eq!(node.data(), &before[..]);
    }

    #[test]
    fn unrecognized_signature_is_rejected() {
        let image = [0u8; 64];
        assert!(matches!(PeCoffNode::new(&image, 0), Err(Error::BadSignature(0))));
    }
}
