//! Well-known firmware storage GUIDs
//!
//! ## License
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
use r_efi::efi;

/// FSP_FFS_INFORMATION_FILE_GUID: 912740BE-2284-4734-B971-84B027353F0C
///
/// Marks the FSP information file placed at the start of an FSP firmware volume.
pub const FSP_FFS_INFORMATION_FILE: efi::Guid =
    efi::Guid::from_fields(0x912740BE, 0x2284, 0x4734, 0xB9, 0x71, &[0x84, 0xB0, 0x27, 0x35, 0x3F, 0x0C]);

/// EFI_FFS_VOLUME_TOP_FILE_GUID: 1BA0062E-C779-4582-8566-336AE8F78F09
///
/// Marks the Volume Top File (VTF), which must stay anchored at the top of its volume.
pub const EFI_FFS_VOLUME_TOP_FILE: efi::Guid =
    efi::Guid::from_fields(0x1BA0062E, 0xC779, 0x4582, 0x85, 0x66, &[0x33, 0x6A, 0xE8, 0xF7, 0x8F, 0x09]);
