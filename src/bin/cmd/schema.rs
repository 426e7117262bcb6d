// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Schema command - compile and inspect schema tables.

use std::path::PathBuf;

use clap::Subcommand;

use super::ber::read_schema;
use crate::common::{output_json_or, Result};
use wirecodec::schema::{TagMode, TypeDef};
use wirecodec::{DecoderConfig, SchemaNode, SchemaTable};

/// Schema table operations.
#[derive(Subcommand, Clone, Debug)]
pub enum SchemaCmd {
    /// Compile a JSON type list into a binary schema table
    Compile {
        /// JSON source
        #[arg(value_name = "SOURCE")]
        source: PathBuf,

        /// Output table
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,
    },

    /// Show the types of a schema table
    Show {
        /// Schema table (binary or JSON)
        #[arg(value_name = "TABLE")]
        table: PathBuf,

        /// Only show this type
        #[arg(long = "type", value_name = "NAME")]
        type_name: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl SchemaCmd {
    pub fn run(self, _config: &DecoderConfig) -> Result<()> {
        match self {
            SchemaCmd::Compile { source, output } => cmd_compile(source, output),
            SchemaCmd::Show {
                table,
                type_name,
                json,
            } => cmd_show(table, type_name, json),
        }
    }
}

/// Cmd: Compile JSON to a binary table
fn cmd_compile(source: PathBuf, output: PathBuf) -> Result<()> {
    let text = std::fs::read_to_string(&source)?;
    let table = SchemaTable::from_json_str(&text)?;
    let bytes = table.to_bytes()?;
    std::fs::write(&output, &bytes)?;
    println!(
        "Compiled {} types into {} ({} bytes)",
        table.len(),
        output.display(),
        bytes.len()
    );
    Ok(())
}

/// Cmd: Show types
fn cmd_show(path: PathBuf, type_name: Option<String>, json: bool) -> Result<()> {
    let table = read_schema(&path)?;
    let types: Vec<&TypeDef> = table
        .types()
        .iter()
        .filter(|def| type_name.as_deref().map_or(true, |name| def.node.name == name))
        .collect();

    if let Some(name) = &type_name {
        if types.is_empty() {
            anyhow::bail!("type '{name}' not found in {}", path.display());
        }
    }

    output_json_or(json, &types, || {
        println!("=== {} ({} types) ===", path.display(), table.len());
        for def in &types {
            println!();
            print_node(&table, &def.node, 0, Some(def.id));
        }
        Ok(())
    })
}

fn print_node(table: &SchemaTable, node: &SchemaNode, depth: usize, id: Option<u32>) {
    let indent = "  ".repeat(depth);
    let mut line = match id {
        Some(id) => format!("{indent}[{id}] {}: {}", node.name, node.kind.asn1_name()),
        None => format!("{indent}{}: {}", node.name, node.kind.asn1_name()),
    };
    match node.tag_mode() {
        TagMode::Natural => {}
        TagMode::Implicit(tag) => line.push_str(&format!(" {tag} IMPLICIT")),
        TagMode::Explicit(tag) => line.push_str(&format!(" {tag} EXPLICIT")),
    }
    if let Some(target) = node.type_id {
        let target_name = table
            .resolve_type_ref(target)
            .map_or("?", |t| t.name.as_str());
        line.push_str(&format!(" -> {target_name}"));
    }
    if node.optional {
        line.push_str(" OPTIONAL");
    }
    println!("{line}");
    for (value, label) in &node.named_values {
        println!("{indent}  {label}({value})");
    }
    for child in &node.children {
        print_node(table, child, depth + 1, None);
    }
}
