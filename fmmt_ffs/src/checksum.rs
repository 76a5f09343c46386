//! Header checksum calculation and in-place repair.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use crate::err::FirmwareFileSystemError;
use fmmt_pi::fw_fs::{ffs, fv};

/// Sums a byte slice as little-endian 16-bit words, wrapping on overflow.
///
/// A header with a correct checksum field sums to zero.
pub fn sum16(bytes: &[u8]) -> u16 {
    bytes.chunks_exact(2).fold(0u16, |sum, word| {
        sum.wrapping_add(u16::from_le_bytes([word[0], word[1]]))
    })
}

/// Sums a byte slice as 8-bit values, wrapping on overflow.
pub fn sum8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}

/// Repairs the 16-bit checksum of a firmware volume header in place.
///
/// `header` must span the full header (including the block map) and must be
/// an even number of bytes. Returns `true` if the stored checksum was
/// already correct, `false` if it had to be rewritten.
pub fn fix_fv_checksum(header: &mut [u8]) -> Result<bool, FirmwareFileSystemError> {
    if header.len() < fv::CHECKSUM_OFFSET + 2 || header.len() % 2 != 0 {
        Err(FirmwareFileSystemError::InvalidHeader)?;
    }
    let sum = sum16(header);
    if sum == 0 {
        return Ok(true);
    }
    let stored = u16::from_le_bytes([header[fv::CHECKSUM_OFFSET], header[fv::CHECKSUM_OFFSET + 1]]);
    let fixed = stored.wrapping_sub(sum);
    header[fv::CHECKSUM_OFFSET..fv::CHECKSUM_OFFSET + 2].copy_from_slice(&fixed.to_le_bytes());
    Ok(false)
}

/// Repairs the 8-bit header checksum of an FFS file header in place.
///
/// The sum excludes the state byte and the file (data) checksum byte, both
/// of which are allowed to change after the header checksum is computed.
/// Returns `true` if the stored checksum was already correct.
pub fn fix_ffs_checksum(header: &mut [u8]) -> Result<bool, FirmwareFileSystemError> {
    if header.len() < ffs::file::STATE_OFFSET + 1 {
        Err(FirmwareFileSystemError::InvalidHeader)?;
    }
    let sum = sum8(header)
        .wrapping_sub(header[ffs::file::STATE_OFFSET])
        .wrapping_sub(header[ffs::file::FILE_CHECKSUM_OFFSET]);
    if sum == 0 {
        return Ok(true);
    }
    let offset = ffs::file::HEADER_CHECKSUM_OFFSET;
    header[offset] = header[offset].wrapping_sub(sum);
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum16_wraps() {
        assert_eq!(sum16(&[0xff, 0xff, 0x02, 0x00]), 1);
    }

    #[test]
    fn fv_checksum_repair_makes_header_sum_to_zero() {
        let mut header = vec![0u8; 64];
        header[0] = 0x12;
        header[1] = 0x34;
        header[55] = 0x9a;
        assert_eq!(fix_fv_checksum(&mut header), Ok(false));
        assert_eq!(sum16(&header), 0);
        // a second pass reports the checksum as already valid
        assert_eq!(fix_fv_checksum(&mut header), Ok(true));
    }

    #[test]
    fn fv_checksum_rejects_odd_length() {
        let mut header = vec![0u8; 57];
        assert_eq!(fix_fv_checksum(&mut header), Err(FirmwareFileSystemError::InvalidHeader));
    }

    #[test]
    fn ffs_checksum_excludes_state_and_file_checksum() {
        let mut header = vec![0u8; 24];
        header[0] = 0x40;
        header[ffs::file::FILE_CHECKSUM_OFFSET] = 0xaa;
        header[ffs::file::STATE_OFFSET] = 0xf8;
        assert_eq!(fix_ffs_checksum(&mut header), Ok(false));
        let state = header[ffs::file::STATE_OFFSET];
        let file = header[ffs::file::FILE_CHECKSUM_OFFSET];
        assert_eq!(sum8(&header).wrapping_sub(state).wrapping_sub(file), 0);
        // the excluded bytes were left untouched
        assert_eq!(state, 0xf8);
        assert_eq!(file, 0xaa);
        assert_eq!(fix_ffs_checksum(&mut header), Ok(true));
    }
}
