//! ## License
//!
//! Copyright (c) Microsoft Corporation or its affiliates.
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!

/// Describes errors in processing FFS structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareFileSystemError {
    /// A structure header failed to decode or carried an illegal field value.
    InvalidHeader,
    /// A firmware volume block map is inconsistent with the header length.
    InvalidBlockMap,
    /// The caller passed an argument that does not apply to this node.
    InvalidParameter,
    /// The structure is well-formed but uses a feature this crate does not handle.
    Unsupported,
    /// Content bytes failed their integrity check.
    DataCorrupt,
}
