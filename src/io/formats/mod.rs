// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! File format implementations.
//!
//! - [`netscaler`]: NetScaler packet trace pages and records

pub mod netscaler;
