//! Firmware File System (FFS) container node model.
//!
//! Nodes own their byte range, decode their headers on construction, and
//! re-emit the bytes they were built from. The only bytes a node rewrites
//! on load are its header checksum fields, which are repaired in place.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod checksum;
mod err;
mod file;
mod node;
mod section;
mod volume;

pub use checksum::{fix_ffs_checksum, fix_fv_checksum};
pub use err::FirmwareFileSystemError;
pub use file::FfsFileNode;
pub use node::{BinaryNode, FreeSpaceNode};
pub use section::{SectionExtHeader, SectionNode};
pub use volume::{ExtEntry, FirmwareVolumeNode};
