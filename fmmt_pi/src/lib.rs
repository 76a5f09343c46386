//! Raw Firmware Storage Definitions
//!
//! Structure layouts and constants for firmware volumes, firmware file system
//! (FFS) files, and sections, based on the values defined in the UEFI Platform
//! Initialization (PI) Specification V1.8A Section 3, Firmware Storage Code
//! Definitions.
//!
//! ## License
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#![no_std]

pub mod fw_fs;
