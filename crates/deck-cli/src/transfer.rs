//! # Export / Import Subcommands
//!
//! Whole-deck documents `{ version, exportedAt, sections, localeOverrides }`
//! in JSON or YAML. Import replaces the deck and its overrides wholesale.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use deck_store::{DeckController, DocumentFormat};

use crate::emit;

/// Document encoding selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Yaml,
}

impl From<FormatArg> for DocumentFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Json => DocumentFormat::Json,
            FormatArg::Yaml => DocumentFormat::Yaml,
        }
    }
}

/// Arguments of `deck export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Document format.
    #[arg(long, value_enum, default_value = "json")]
    pub format: FormatArg,
    /// Write to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Arguments of `deck import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Document to import.
    pub file: PathBuf,
    /// Document format; inferred from the file extension when omitted.
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

/// Export the deck.
pub fn cmd_export(deck: &DeckController, args: &ExportArgs, out: &mut dyn Write) -> Result<u8> {
    let text = deck.export(args.format.into())?;
    emit(&text, args.output.as_deref(), out)?;
    if let Some(path) = &args.output {
        tracing::info!(path = %path.display(), sections = deck.sections().len(), "deck exported");
    }
    Ok(0)
}

/// Replace the deck with a document.
pub fn cmd_import(deck: &DeckController, args: &ImportArgs, out: &mut dyn Write) -> Result<u8> {
    let format = match args.format {
        Some(format) => format.into(),
        None => infer_format(&args.file)?,
    };
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let sections = deck.import(&text, format)?;
    writeln!(
        out,
        "OK: imported {} sections from {}",
        sections.len(),
        args.file.display()
    )?;
    Ok(0)
}

fn infer_format(path: &Path) -> Result<DocumentFormat> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("cannot infer format of {}; pass --format", path.display()))?;
    extension
        .parse()
        .map_err(|e: String| anyhow!("{e}; pass --format"))
}
