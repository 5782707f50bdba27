//! # Section Subcommands
//!
//! `init`, `list`, `show`, `add`, `generate`, `set-field`, `reorder`,
//! `delete` and `duplicate` over the file-backed deck. Each mutating
//! command persists through the section store before printing its
//! confirmation.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use deck_core::SectionDraft;
use deck_store::{seed_if_empty, DeckController};

use crate::{parse_locale, parse_value};

/// Arguments of `deck show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Section identifier.
    pub id: String,
    /// Resolve field values for this locale.
    #[arg(long)]
    pub locale: Option<String>,
}

/// Arguments of `deck add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// JSON file holding a section draft (`metadata`, `code`, `editableFields`).
    pub draft: PathBuf,
}

/// Arguments of `deck generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// File holding raw generator output, optionally fenced in Markdown.
    pub output: PathBuf,
    /// Model that produced the output.
    #[arg(long)]
    pub model: Option<String>,
}

/// Arguments of `deck set-field`.
#[derive(Args, Debug)]
pub struct SetFieldArgs {
    /// Section identifier.
    pub id: String,
    /// Editable field name.
    pub field: String,
    /// New value, parsed as JSON when possible and as a string otherwise.
    pub value: String,
}

/// Arguments of `deck reorder`.
#[derive(Args, Debug)]
pub struct ReorderArgs {
    /// Every section id exactly once, in the new order.
    #[arg(required = true)]
    pub ids: Vec<String>,
}

/// Seed the default sections into an empty deck.
pub fn cmd_init(deck: &DeckController, out: &mut dyn Write) -> Result<u8> {
    if seed_if_empty(deck.store()).context("failed to read the stored deck")? {
        deck.reload();
        writeln!(out, "OK: seeded {} default sections", deck.sections().len())?;
    } else {
        writeln!(
            out,
            "Deck already holds {} sections; nothing to do.",
            deck.sections().len()
        )?;
    }
    Ok(0)
}

/// List sections in order.
pub fn cmd_list(deck: &DeckController, out: &mut dyn Write) -> Result<u8> {
    let sections = deck.sections();
    if sections.is_empty() {
        writeln!(out, "No sections found. Run `deck init` to seed the defaults.")?;
        return Ok(0);
    }
    writeln!(out, "Sections ({}):", sections.len())?;
    for section in &sections {
        let flag = if section.metadata.is_default {
            " [default]"
        } else {
            ""
        };
        writeln!(
            out,
            "  {:>2}  {}  {}{}",
            section.order, section.id, section.metadata.title, flag
        )?;
    }
    Ok(0)
}

/// Print one section with its resolved field values.
pub fn cmd_show(deck: &DeckController, args: &ShowArgs, out: &mut dyn Write) -> Result<u8> {
    let locale = parse_locale(args.locale.as_deref())?;
    let section = deck.section(&args.id)?;
    let fields = deck.resolver().resolve(&section, locale.as_ref());

    writeln!(out, "Section: {}", section.id)?;
    writeln!(out, "  Title: {}", section.metadata.title)?;
    if !section.metadata.description.is_empty() {
        writeln!(out, "  Description: {}", section.metadata.description)?;
    }
    writeln!(out, "  Order: {}", section.order)?;
    writeln!(out, "  Deletable: {}", section.is_deletable())?;
    writeln!(out, "  Updated: {}", section.metadata.updated_at.to_rfc3339())?;
    let locales = deck.overrides().locales(section.id.as_str());
    if !locales.is_empty() {
        writeln!(out, "  Locales: {}", locales.join(", "))?;
    }
    match &locale {
        Some(locale) => writeln!(out, "  Fields ({}):", locale.as_str())?,
        None => writeln!(out, "  Fields:")?,
    }
    for (name, value) in &fields {
        writeln!(out, "    {name} = {value}")?;
    }
    Ok(0)
}

/// Add a section from a draft file.
pub fn cmd_add(deck: &DeckController, args: &AddArgs, out: &mut dyn Write) -> Result<u8> {
    let text = read(&args.draft)?;
    let draft: SectionDraft = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a section draft", args.draft.display()))?;
    let section = deck.add(draft)?;
    writeln!(
        out,
        "OK: added {} \"{}\" at position {}",
        section.id, section.metadata.title, section.order
    )?;
    Ok(0)
}

/// Admit raw generator output as a new section.
pub fn cmd_generate(deck: &DeckController, args: &GenerateArgs, out: &mut dyn Write) -> Result<u8> {
    let raw = read(&args.output)?;
    let section = deck.admit_generated(&raw, args.model.as_deref())?;
    writeln!(
        out,
        "OK: admitted {} \"{}\" at position {}",
        section.id, section.metadata.title, section.order
    )?;
    Ok(0)
}

/// Set one editable field.
pub fn cmd_set_field(deck: &DeckController, args: &SetFieldArgs, out: &mut dyn Write) -> Result<u8> {
    let value = parse_value(&args.value);
    let section = deck.update_field(&args.id, &args.field, value.clone())?;
    writeln!(out, "OK: {}.{} = {value}", section.id, args.field)?;
    Ok(0)
}

/// Reorder the deck.
pub fn cmd_reorder(deck: &DeckController, args: &ReorderArgs, out: &mut dyn Write) -> Result<u8> {
    let sections = deck.reorder(&args.ids)?;
    writeln!(out, "OK: reordered {} sections", sections.len())?;
    for section in &sections {
        writeln!(out, "  {:>2}  {}", section.order, section.id)?;
    }
    Ok(0)
}

/// Delete a user-created section.
pub fn cmd_delete(deck: &DeckController, id: &str, out: &mut dyn Write) -> Result<u8> {
    let removed = deck.delete(id)?;
    writeln!(out, "OK: deleted {} \"{}\"", removed.id, removed.metadata.title)?;
    Ok(0)
}

/// Copy a section directly after itself.
pub fn cmd_duplicate(deck: &DeckController, id: &str, out: &mut dyn Write) -> Result<u8> {
    let copy = deck.duplicate(id)?;
    writeln!(
        out,
        "OK: duplicated {id} as {} at position {}",
        copy.id, copy.order
    )?;
    Ok(0)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_deck;
    use serde_json::json;

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    fn seeded() -> (tempfile::TempDir, DeckController) {
        let dir = tempfile::tempdir().unwrap();
        let deck = open_deck(dir.path());
        cmd_init(&deck, &mut Vec::new()).unwrap();
        (dir, deck)
    }

    fn draft_file(dir: &Path, title: &str) -> PathBuf {
        let path = dir.join(format!("{title}.json"));
        let draft = json!({
            "metadata": { "title": title },
            "code": "const Note = ({ text }) => <p>{text}</p>;",
            "editableFields": { "text": { "type": "text", "label": "Text", "value": "hi" } }
        });
        std::fs::write(&path, draft.to_string()).unwrap();
        path
    }

    #[test]
    fn init_seeds_once() {
        let dir = tempfile::tempdir().unwrap();
        let deck = open_deck(dir.path());
        let mut out = Vec::new();
        assert_eq!(cmd_init(&deck, &mut out).unwrap(), 0);
        assert!(output(out).contains("seeded 2 default sections"));
        assert!(dir.path().join(deck_store::SECTIONS_FILE).exists());

        let mut out = Vec::new();
        cmd_init(&deck, &mut out).unwrap();
        assert!(output(out).contains("nothing to do"));
        assert_eq!(deck.sections().len(), 2);
    }

    #[test]
    fn list_empty_deck_suggests_init() {
        let dir = tempfile::tempdir().unwrap();
        let mut out = Vec::new();
        cmd_list(&open_deck(dir.path()), &mut out).unwrap();
        assert!(output(out).contains("deck init"));
    }

    #[test]
    fn list_shows_order_and_defaults() {
        let (_dir, deck) = seeded();
        let mut out = Vec::new();
        cmd_list(&deck, &mut out).unwrap();
        let text = output(out);
        assert!(text.contains("Sections (2):"));
        assert!(text.contains("section-hero"));
        assert!(text.contains("[default]"));
    }

    #[test]
    fn add_then_show_and_delete() {
        let (dir, deck) = seeded();
        let path = draft_file(dir.path(), "Note");
        let mut out = Vec::new();
        cmd_add(&deck, &AddArgs { draft: path }, &mut out).unwrap();
        assert!(output(out).contains("at position 2"));

        let id = deck.sections()[2].id.to_string();
        let mut out = Vec::new();
        cmd_show(
            &deck,
            &ShowArgs {
                id: id.clone(),
                locale: None,
            },
            &mut out,
        )
        .unwrap();
        assert!(output(out).contains("text = \"hi\""));

        cmd_delete(&deck, &id, &mut Vec::new()).unwrap();
        assert_eq!(deck.sections().len(), 2);
    }

    #[test]
    fn changes_persist_across_opens() {
        let (dir, deck) = seeded();
        let args = SetFieldArgs {
            id: "section-hero".into(),
            field: "title".into(),
            value: "Hello".into(),
        };
        cmd_set_field(&deck, &args, &mut Vec::new()).unwrap();

        let reopened = open_deck(dir.path());
        let hero = reopened.section("section-hero").unwrap();
        assert_eq!(hero.field_values()["title"], json!("Hello"));
    }

    #[test]
    fn default_sections_cannot_be_deleted() {
        let (_dir, deck) = seeded();
        let err = cmd_delete(&deck, "section-hero", &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("section-hero"));
    }

    #[test]
    fn reorder_and_duplicate() {
        let (_dir, deck) = seeded();
        let args = ReorderArgs {
            ids: vec!["section-closing".into(), "section-hero".into()],
        };
        cmd_reorder(&deck, &args, &mut Vec::new()).unwrap();
        assert_eq!(deck.sections()[0].id.as_str(), "section-closing");

        let mut out = Vec::new();
        cmd_duplicate(&deck, "section-closing", &mut out).unwrap();
        assert!(output(out).contains("at position 1"));
        assert_eq!(deck.sections().len(), 3);
    }

    #[test]
    fn generate_admits_fenced_output() {
        let (dir, deck) = seeded();
        let path = dir.path().join("gen.txt");
        let body = json!({
            "metadata": { "title": "Generated" },
            "code": "render(<p>gen</p>)",
            "editableFields": {}
        });
        std::fs::write(&path, format!("```json\n{body}\n```")).unwrap();
        let args = GenerateArgs {
            output: path,
            model: Some("test-model".into()),
        };
        cmd_generate(&deck, &args, &mut Vec::new()).unwrap();
        assert_eq!(deck.sections()[2].metadata.title, "Generated");
    }

    #[test]
    fn unknown_section_is_an_error() {
        let (_dir, deck) = seeded();
        let args = ShowArgs {
            id: "section-missing".into(),
            locale: None,
        };
        assert!(cmd_show(&deck, &args, &mut Vec::new()).is_err());
    }
}
