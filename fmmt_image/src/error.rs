//! Executable image errors.
//!
//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
pub type Result<T> = core::result::Result<T, Error>;

/// Type for describing errors that result from working with executable images.
#[derive(Debug)]
pub enum Error {
    /// The leading bytes match neither a TE signature nor a DOS header.
    BadSignature(u16),
    /// The image ELF identification bytes are not the ELF magic.
    InvalidMagic,
    /// A header field carries a value inconsistent with the rest of the image.
    InvalidImage,
    /// The buffer ended before the named structure could be read.
    BufferTooShort(usize, &'static str),
    /// The COFF machine type is not one this crate relocates.
    UnsupportedMachine(u16),
    /// The image subsystem is not a firmware subsystem.
    UnsupportedImageType(u16),
    /// A base relocation entry uses a type this crate cannot apply.
    UnsupportedRelocationType(u16),
    /// The ELF class byte is neither 32-bit nor 64-bit.
    UnsupportedClass(u8),
    Parse(scroll::Error),
}

impl From<scroll::Error> for Error {
    fn from(e: scroll::Error) -> Self {
        Error::Parse(e)
    }
}
