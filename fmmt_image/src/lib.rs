//! Executable image node model.
//!
//! [`PeCoffNode`] decodes PE32, PE32+, and TE images, records their base
//! relocations as absolute file offsets, and can rebase the image in place.
//! [`ElfNode`] decodes ELF headers and locates an embedded universal payload
//! information structure.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod elf;
mod error;
mod pecoff;
mod relocation;

pub use elf::{ElfHeader, ElfNode, ProgramHeader, SectionHeader, UpldInfo};
pub use error::{Error, Result};
pub use pecoff::{ImageFormat, PeCoffNode, RebaseMode};
pub use relocation::{Fixup, FixupKind};
