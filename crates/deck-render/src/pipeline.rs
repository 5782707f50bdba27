//! # Render Pipeline
//!
//! `code + fields → transform → parse → evaluate → UiNode tree → HTML`.
//!
//! [`LiveRenderer`] is the bare pipeline. [`DeckRenderer`] owns one
//! [`SectionBoundary`] per section and never returns an error: a failed
//! section yields a [`SectionRender`] with `status: "error"` and the
//! fallback affordance in place of its content.

use std::collections::HashMap;
use std::sync::Arc;

use deck_core::{FieldValues, Section, SectionId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::boundary::{fallback_node, SectionBoundary};
use crate::error::{RenderError, RenderLimits};
use crate::eval::Interpreter;
use crate::html::to_html;
use crate::parser::parse_program;
use crate::transform;
use crate::ui::UiNode;

/// Evaluates section code against field values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveRenderer {
    limits: RenderLimits,
}

impl LiveRenderer {
    pub fn new(limits: RenderLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> RenderLimits {
        self.limits
    }

    /// Run the pipeline without a boundary. Errors propagate to the caller;
    /// panics do not get caught here.
    pub fn render(&self, code: &str, fields: &FieldValues) -> Result<Vec<UiNode>, RenderError> {
        let prepared = transform::prepare(code, fields);
        let program = parse_program(&prepared.source)?;
        Interpreter::new(self.limits).run(&program, fields)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderFailure {
    pub kind: String,
    pub message: String,
}

impl From<&RenderError> for RenderFailure {
    fn from(error: &RenderError) -> Self {
        Self {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome of rendering one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRender {
    pub section_id: SectionId,
    pub status: RenderStatus,
    pub nodes: Vec<UiNode>,
    pub html: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RenderFailure>,
}

impl SectionRender {
    pub fn is_ok(&self) -> bool {
        self.status == RenderStatus::Ok
    }

    fn from_result(section_id: &SectionId, result: Result<Vec<UiNode>, RenderError>) -> Self {
        match result {
            Ok(nodes) => Self {
                section_id: section_id.clone(),
                status: RenderStatus::Ok,
                html: to_html(&nodes),
                nodes,
                error: None,
            },
            Err(error) => {
                let nodes = vec![fallback_node(section_id, &error)];
                Self {
                    section_id: section_id.clone(),
                    status: RenderStatus::Error,
                    html: to_html(&nodes),
                    nodes,
                    error: Some(RenderFailure::from(&error)),
                }
            }
        }
    }
}

/// Renders a whole deck, one boundary per section.
///
/// The registry lock is held only to look a boundary up. Each boundary has
/// its own lock, so different sections render concurrently while renders of
/// the same section queue behind each other.
#[derive(Debug, Default)]
pub struct DeckRenderer {
    renderer: LiveRenderer,
    boundaries: Mutex<HashMap<SectionId, Arc<Mutex<SectionBoundary>>>>,
}

impl DeckRenderer {
    pub fn new(limits: RenderLimits) -> Self {
        Self {
            renderer: LiveRenderer::new(limits),
            boundaries: Mutex::new(HashMap::new()),
        }
    }

    pub fn limits(&self) -> RenderLimits {
        self.renderer.limits()
    }

    /// Render one section with its resolved field values.
    pub fn render_section(&self, section: &Section, fields: &FieldValues) -> SectionRender {
        let boundary = self.boundary(&section.id);
        let result = boundary
            .lock()
            .render(&self.renderer, &section.code, fields);
        SectionRender::from_result(&section.id, result)
    }

    fn boundary(&self, id: &SectionId) -> Arc<Mutex<SectionBoundary>> {
        let mut boundaries = self.boundaries.lock();
        Arc::clone(
            boundaries
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(SectionBoundary::new(id.clone())))),
        )
    }

    fn existing(&self, id: &SectionId) -> Option<Arc<Mutex<SectionBoundary>>> {
        self.boundaries.lock().get(id).cloned()
    }

    /// Render every section in order. Boundaries of sections no longer in
    /// the deck are dropped.
    pub fn render_deck<'a, I>(&self, sections: I) -> Vec<SectionRender>
    where
        I: IntoIterator<Item = (&'a Section, FieldValues)>,
    {
        let rendered: Vec<SectionRender> = sections
            .into_iter()
            .map(|(section, fields)| self.render_section(section, &fields))
            .collect();
        self.boundaries
            .lock()
            .retain(|id, _| rendered.iter().any(|r| &r.section_id == id));
        rendered
    }

    /// Reset the section's boundary and render it again.
    pub fn retry(&self, section: &Section, fields: &FieldValues) -> SectionRender {
        self.reset(&section.id);
        self.render_section(section, fields)
    }

    pub fn reset(&self, id: &SectionId) {
        if let Some(boundary) = self.existing(id) {
            boundary.lock().reset();
        }
    }

    pub fn forget(&self, id: &SectionId) {
        self.boundaries.lock().remove(id);
    }

    pub fn last_error(&self, id: &SectionId) -> Option<RenderError> {
        self.existing(id)
            .and_then(|b| b.lock().last_error().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn render_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RenderStatus::Error).unwrap(), json!("error"));
    }

    #[test]
    fn syntax_errors_surface_from_the_bare_pipeline() {
        let err = LiveRenderer::default()
            .render("const = ;", &FieldValues::new())
            .unwrap_err();
        assert_eq!(err.kind(), "syntax");
    }

    #[test]
    fn fields_become_props_of_the_extracted_component() {
        let mut fields = FieldValues::new();
        fields.insert("label".into(), json!("Go"));
        let nodes = LiveRenderer::default()
            .render("const Cta = ({ label }) => <button>{label}</button>;", &fields)
            .unwrap();
        assert_eq!(nodes[0].tag(), Some("button"));
        assert_eq!(nodes[0].text_content(), "Go");
    }

    fn section(id: &str, code: &str) -> Section {
        serde_json::from_value(json!({
            "id": id,
            "order": 0,
            "metadata": {
                "title": id,
                "createdAt": "2026-01-01T00:00:00.000Z",
                "updatedAt": "2026-01-01T00:00:00.000Z"
            },
            "code": code,
            "editableFields": {}
        }))
        .unwrap()
    }

    #[test]
    fn a_busy_section_does_not_block_its_siblings() {
        let deck = Arc::new(DeckRenderer::default());
        let busy = section("section-busy", "render(<p>busy</p>)");
        let other = section("section-other", "render(<p>other</p>)");

        // Hold the busy section's boundary as an in-flight render would.
        let boundary = deck.boundary(&busy.id);
        let _in_flight = boundary.lock();

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = Arc::clone(&deck);
        std::thread::spawn(move || {
            let result = worker.render_section(&other, &FieldValues::new());
            let _ = tx.send(result.is_ok());
        });
        let finished = rx.recv_timeout(std::time::Duration::from_secs(10));
        assert_eq!(finished, Ok(true));
    }
}
