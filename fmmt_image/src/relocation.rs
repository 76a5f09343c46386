//! PE/COFF base relocation support.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::vec::Vec;
use scroll::Pread;

use crate::error::{Error, Result};

pub const IMAGE_REL_BASED_ABSOLUTE: u16 = 0;
pub const IMAGE_REL_BASED_HIGHLOW: u16 = 3;
pub const IMAGE_REL_BASED_DIR64: u16 = 10;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pread)]
pub struct BaseRelocationBlockHeader {
    pub page_rva: u32,
    pub block_size: u32,
}

/// Width class of a single base relocation fixup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupKind {
    /// 32-bit fixup (IMAGE_REL_BASED_HIGHLOW).
    HighLow,
    /// 64-bit fixup (IMAGE_REL_BASED_DIR64); only legal in 64-bit images.
    Dir64,
}

impl FixupKind {
    /// Number of image bytes the fixup patches.
    pub fn width(&self) -> usize {
        match self {
            FixupKind::HighLow => 4,
            FixupKind::Dir64 => 8,
        }
    }
}

/// One base relocation, resolved to an absolute file offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    pub kind: FixupKind,
    /// Absolute offset of the patched bytes, node base included.
    pub offset: u64,
}

/// Walks the relocation directory and resolves every fixup to an absolute
/// file offset.
///
/// `page_to_offset` converts a page RVA to an absolute file offset; for TE
/// images it folds in the stripped-header adjustment. `wide` permits DIR64
/// entries. ABSOLUTE entries pad blocks and are skipped; any other
/// relocation type fails the whole parse.
pub(crate) fn parse_relocation_blocks(
    block: &[u8],
    page_to_offset: i64,
    wide: bool,
) -> Result<Vec<Fixup>> {
    let mut offset: usize = 0;
    let mut fixups = Vec::new();

    while offset < block.len() {
        let block_start = offset;
        let block_header: BaseRelocationBlockHeader = block.gread_with(&mut offset, scroll::LE)?;
        let block_size = block_header.block_size as usize;
        if block_size < core::mem::size_of::<BaseRelocationBlockHeader>()
            || block_start + block_size > block.len()
        {
            Err(Error::InvalidImage)?;
        }

        while offset < block_start + block_size {
            let entry: u16 = block.gread_with(&mut offset, scroll::LE)?;
            let fixup_type = entry >> 12;
            let low12 = (entry & 0xfff) as i64;
            let kind = match fixup_type {
                IMAGE_REL_BASED_ABSOLUTE => continue,
                IMAGE_REL_BASED_HIGHLOW => FixupKind::HighLow,
                IMAGE_REL_BASED_DIR64 if wide => FixupKind::Dir64,
                other => return Err(Error::UnsupportedRelocationType(other)),
            };
            let target = page_to_offset + block_header.page_rva as i64 + low12;
            fixups.push(Fixup { kind, offset: target as u64 });
        }

        // block start on 32-bit boundary, so align up if needed.
        offset = (offset + 3) & !3;
    }

    Ok(fixups)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(page_rva: u32, entries: &[u16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&page_rva.to_le_bytes());
        bytes.extend_from_slice(&((8 + entries.len() * 2) as u32).to_le_bytes());
        for entry in entries {
            bytes.extend_from_slice(&entry.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn resolves_fixups_to_absolute_offsets() {
        let dir = block(0x1000, &[(3 << 12) | 0x10, 0]);
        let fixups = parse_relocation_blocks(&dir, 0x200, false).unwrap();
        assert_eq!(fixups, vec![Fixup { kind: FixupKind::HighLow, offset: 0x1210 }]);
    }

    #[test]
    fn walks_multiple_blocks_with_alignment() {
        // first block has an odd entry count, so the next block starts after padding
        let mut dir = block(0x1000, &[(3 << 12) | 0x4]);
        dir.extend_from_slice(&[0, 0]);
        dir.extend_from_slice(&block(0x2000, &[(10 << 12) | 0x8, 0]));
        let fixups = parse_relocation_blocks(&dir, 0, true).unwrap();
        assert_eq!(
            fixups,
            vec![
                Fixup { kind: FixupKind::HighLow, offset: 0x1004 },
                Fixup { kind: FixupKind::Dir64, offset: 0x2008 },
            ]
        );
    }

    #[test]
    fn dir64_needs_a_wide_image() {
        let dir = block(0, &[(10 << 12) | 0x8, 0]);
        assert!(matches!(
            parse_relocation_blocks(&dir, 0, false),
            Err(Error::UnsupportedRelocationType(10))
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let dir = block(0, &[(5 << 12) | 0x8, 0]);
        assert!(matches!(
            parse_relocation_blocks(&dir, 0, true),
            Err(Error::UnsupportedRelocationType(5))
        ));
    }

    #[test]
    fn oversized_block_is_rejected() {
        let mut dir = block(0, &[(3 << 12) | 0x8, 0]);
        dir[4] = 0x40; // block_size larger than the directory
        assert!(matches!(parse_relocation_blocks(&dir, 0, false), Err(Error::InvalidImage)));
    }
}
