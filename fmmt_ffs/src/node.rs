//! Leaf nodes without structure of their own.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use alloc::vec::Vec;
use core::fmt;

use crate::err::FirmwareFileSystemError;

/// An opaque run of bytes; section content that no other node type claims.
pub struct BinaryNode {
    data: Vec<u8>,
    base: u64,
}

impl BinaryNode {
    pub fn new(buffer: &[u8], base: u64) -> Self {
        Self { data: buffer.to_vec(), base }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for BinaryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryNode")
            .field("base", &format_args!("{:#x}", self.base))
            .field("size", &format_args!("{:#x}", self.data.len()))
            .finish()
    }
}

/// A run of erased bytes trailing the used portion of a volume.
///
/// Construction verifies every byte holds the erase value, so the node can
/// re-emit its range without retaining a copy of anything but the length.
pub struct FreeSpaceNode {
    base: u64,
    length: usize,
    erase_byte: u8,
}

impl FreeSpaceNode {
    pub fn new(buffer: &[u8], base: u64, erase_byte: u8) -> Result<Self, FirmwareFileSystemError> {
        if buffer.iter().any(|&byte| byte != erase_byte) {
            Err(FirmwareFileSystemError::InvalidParameter)?;
        }
        Ok(Self { base, length: buffer.len(), erase_byte })
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn size(&self) -> usize {
        self.length
    }

    pub fn erase_byte(&self) -> u8 {
        self.erase_byte
    }

    /// Re-materializes the erased range.
    pub fn data(&self) -> Vec<u8> {
        alloc::vec![self.erase_byte; self.length]
    }
}

impl fmt::Debug for FreeSpaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeSpaceNode")
            .field("base", &format_args!("{:#x}", self.base))
            .field("size", &format_args!("{:#x}", self.length))
            .field("erase_byte", &format_args!("{:#x}", self.erase_byte))
            .finish()
    }
}
