// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! I/O layer for trace files.
//!
//! The decoders themselves never touch files; this module maps files into
//! memory and hosts the page-oriented trace formats.

pub mod arena;
pub mod formats;

pub use arena::MmapArena;
