//! # Locale Subcommand
//!
//! Per-locale field overrides:
//!
//! - `set <id> <locale> <field>=<value>...` — deep-merge overrides.
//! - `clear <id> <locale>` — drop the locale's overrides.
//! - `list <id>` — locales carrying overrides, with their values.

use std::io::Write;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use deck_core::LocaleCode;
use deck_store::{DeckController, FieldOverrides};

use crate::parse_value;

/// Arguments for the `deck locale` subcommand.
#[derive(Args, Debug)]
pub struct LocaleArgs {
    #[command(subcommand)]
    pub command: LocaleCommand,
}

/// Locale subcommands.
#[derive(Subcommand, Debug)]
pub enum LocaleCommand {
    /// Merge field overrides for a locale.
    Set {
        /// Section identifier.
        id: String,
        /// Locale code (e.g. "fr", "pt-BR").
        locale: String,
        /// `field=value` pairs; values parse as JSON when possible.
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Remove every override of a locale.
    Clear {
        /// Section identifier.
        id: String,
        /// Locale code.
        locale: String,
    },

    /// Show the locales carrying overrides.
    List {
        /// Section identifier.
        id: String,
    },
}

/// Execute the locale subcommand.
pub fn run_locale(deck: &DeckController, args: &LocaleArgs, out: &mut dyn Write) -> Result<u8> {
    match &args.command {
        LocaleCommand::Set {
            id,
            locale,
            assignments,
        } => cmd_set(deck, id, locale, assignments, out),
        LocaleCommand::Clear { id, locale } => cmd_clear(deck, id, locale, out),
        LocaleCommand::List { id } => cmd_list(deck, id, out),
    }
}

fn cmd_set(
    deck: &DeckController,
    id: &str,
    locale: &str,
    assignments: &[String],
    out: &mut dyn Write,
) -> Result<u8> {
    let locale = LocaleCode::new(locale)?;
    let overrides = parse_assignments(assignments)?;
    let merged = deck.set_locale_override(id, &locale, overrides)?;
    writeln!(
        out,
        "OK: {id} [{locale}] now overrides {} field(s)",
        merged.len()
    )?;
    Ok(0)
}

fn cmd_clear(deck: &DeckController, id: &str, locale: &str, out: &mut dyn Write) -> Result<u8> {
    let locale = LocaleCode::new(locale)?;
    if !deck.clear_locale_override(id, &locale)? {
        bail!("no {locale} overrides for section {id}");
    }
    writeln!(out, "OK: cleared {locale} overrides of {id}")?;
    Ok(0)
}

fn cmd_list(deck: &DeckController, id: &str, out: &mut dyn Write) -> Result<u8> {
    deck.section(id)?;
    let locales = deck.overrides().locales(id);
    if locales.is_empty() {
        writeln!(out, "No locale overrides for {id}.")?;
        return Ok(0);
    }
    writeln!(out, "Locales of {id} ({}):", locales.len())?;
    for code in &locales {
        let locale = LocaleCode::new(code.as_str())?;
        writeln!(out, "  {code}")?;
        for (field, value) in deck.overrides().load(id, &locale) {
            writeln!(out, "    {field} = {value}")?;
        }
    }
    Ok(0)
}

/// Parse `field=value` pairs into an override map.
fn parse_assignments(assignments: &[String]) -> Result<FieldOverrides> {
    let mut overrides = FieldOverrides::new();
    for assignment in assignments {
        let (field, value) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("expected field=value, got {assignment:?}"))?;
        let field = field.trim();
        if field.is_empty() {
            bail!("empty field name in {assignment:?}");
        }
        overrides.insert(field.to_string(), parse_value(value));
    }
    Ok(overrides)
}
