//! # Render Subcommand
//!
//! Renders the deck (or one section) through the same boundary-guarded
//! pipeline the server uses and writes a standalone HTML page, or the
//! per-section results as JSON with `--json`.
//!
//! Exit code 2 signals that at least one section rendered its fallback.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use deck_render::html::{escape_attr, escape_text};
use deck_render::{DeckRenderer, SectionRender};
use deck_store::DeckController;

use crate::{emit, parse_locale};

/// Arguments of `deck render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Render only this section.
    #[arg(long)]
    pub id: Option<String>,
    /// Resolve field values for this locale.
    #[arg(long)]
    pub locale: Option<String>,
    /// Print the render results as JSON instead of HTML.
    #[arg(long)]
    pub json: bool,
    /// Write to this file instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Execute the render subcommand.
pub fn cmd_render(deck: &DeckController, args: &RenderArgs, out: &mut dyn Write) -> Result<u8> {
    let locale = parse_locale(args.locale.as_deref())?;
    let renderer = DeckRenderer::default();
    let resolver = deck.resolver();

    let results = match &args.id {
        Some(id) => {
            let section = deck.section(id)?;
            let fields = resolver.resolve(&section, locale.as_ref());
            vec![renderer.render_section(&section, &fields)]
        }
        None => {
            let sections = deck.sections();
            renderer.render_deck(resolver.resolve_all(&sections, locale.as_ref()))
        }
    };

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    for result in results.iter().filter(|r| !r.is_ok()) {
        if let Some(error) = &result.error {
            tracing::warn!(section_id = %result.section_id, kind = %error.kind, "{}", error.message);
        }
    }

    let text = if args.json {
        serde_json::to_string_pretty(&results)?
    } else {
        page(&results, locale.as_ref().map(|l| l.as_str()))
    };
    emit(&text, args.output.as_deref(), out)?;

    Ok(if failed > 0 { 2 } else { 0 })
}

/// Standalone HTML page holding every rendered section in order.
fn page(results: &[SectionRender], lang: Option<&str>) -> String {
    let mut html = String::from("<!DOCTYPE html>\n");
    html.push_str(&format!(
        "<html lang=\"{}\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n",
        escape_attr(lang.unwrap_or("en")),
        escape_text("deck")
    ));
    for result in results {
        html.push_str(&format!(
            "<div class=\"deck-section\" data-section-id=\"{}\" data-status=\"{}\">{}</div>\n",
            escape_attr(result.section_id.as_str()),
            if result.is_ok() { "ok" } else { "error" },
            result.html
        ));
    }
    html.push_str("</body>\n</html>");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_deck;
    use crate::sections::cmd_init;
    use deck_core::SectionDraft;
    use serde_json::json;

    fn seeded() -> (tempfile::TempDir, DeckController) {
        let dir = tempfile::tempdir().unwrap();
        let deck = open_deck(dir.path());
        cmd_init(&deck, &mut Vec::new()).unwrap();
        (dir, deck)
    }

    fn args() -> RenderArgs {
        RenderArgs {
            id: None,
            locale: None,
            json: false,
            output: None,
        }
    }

    #[test]
    fn renders_seeded_deck_as_page() {
        let (_dir, deck) = seeded();
        let mut out = Vec::new();
        assert_eq!(cmd_render(&deck, &args(), &mut out).unwrap(), 0);
        let html = String::from_utf8(out).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("data-section-id=\"section-hero\""));
        assert!(html.contains("<h1>Welcome</h1>"));
        assert!(html.contains("mailto:"));
    }

    #[test]
    fn locale_overrides_apply() {
        let (_dir, deck) = seeded();
        let locale = deck_core::LocaleCode::new("fr").unwrap();
        let mut overrides = serde_json::Map::new();
        overrides.insert("title".into(), json!("Bienvenue"));
        deck.set_locale_override("section-hero", &locale, overrides)
            .unwrap();

        let mut out = Vec::new();
        let render = RenderArgs {
            id: Some("section-hero".into()),
            locale: Some("fr".into()),
            ..args()
        };
        cmd_render(&deck, &render, &mut out).unwrap();
        let html = String::from_utf8(out).unwrap();
        assert!(html.contains("lang=\"fr\""));
        assert!(html.contains("<h1>Bienvenue</h1>"));
    }

    #[test]
    fn failing_section_exits_2_and_keeps_siblings() {
        let (_dir, deck) = seeded();
        let draft: SectionDraft = serde_json::from_value(json!({
            "metadata": { "title": "Broken" },
            "code": "render(<p>{missing.value}</p>)"
        }))
        .unwrap();
        deck.add(draft).unwrap();

        let mut out = Vec::new();
        let render = RenderArgs {
            json: true,
            ..args()
        };
        assert_eq!(cmd_render(&deck, &render, &mut out).unwrap(), 2);
        let results: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(results[0]["status"], json!("ok"));
        assert_eq!(results[2]["status"], json!("error"));
    }

    #[test]
    fn writes_to_output_file() {
        let (dir, deck) = seeded();
        let path = dir.path().join("deck.html");
        let render = RenderArgs {
            output: Some(path.clone()),
            ..args()
        };
        cmd_render(&deck, &render, &mut Vec::new()).unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("</html>"));
    }
}
