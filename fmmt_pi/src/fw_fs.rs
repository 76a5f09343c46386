//! Firmware Storage (FV/FFS) Definitions
//!
//! ## License
//!
//! SPDX-License-Identifier: BSD-2-Clause-Patent
//!
pub mod ffs;
pub mod fv;
pub mod guid;
