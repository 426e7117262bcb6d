// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! CLI subcommands.

mod ber;
mod schema;
mod trace;

pub use ber::BerCmd;
pub use schema::SchemaCmd;
pub use trace::TraceCmd;
