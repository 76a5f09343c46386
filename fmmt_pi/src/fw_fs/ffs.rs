//! Firmware File System (FFS) Definitions
//!
//! Based on the values defined in the UEFI Platform Initialization (PI)
//! Specification V1.8A Section 3.2.2 Firmware File System.
//!
//! ## License
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
pub mod attributes;
pub mod file;
pub mod section;
