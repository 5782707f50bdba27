//! # Section Boundary
//!
//! A supervisor around one section's render call. Any failure raised while
//! the section evaluates (a syntax error, a thrown error, a capability
//! violation, an exhausted budget, or a panic inside the interpreter) is
//! caught here and recorded. Until the section is reset the boundary
//! reports the recorded failure and shows a fallback affordance with a
//! retry action; siblings rendered through their own boundaries are never
//! affected.
//!
//! A boundary resets itself when the section's code or field values change,
//! so an edit that fixes the section is picked up without a manual retry.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use deck_core::{FieldValues, SectionId};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::RenderError;
use crate::pipeline::LiveRenderer;
use crate::ui::UiNode;

/// Stack reserved for one evaluation. Deeply nested sections recurse
/// through the parser and interpreter; the limits keep them well inside it.
pub const RENDER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Value of `data-action` on the fallback's retry button.
pub const RETRY_ACTION: &str = "retry-section";

#[derive(Debug, Clone)]
struct Failure {
    error: RenderError,
    input: u64,
}

/// Error boundary for a single section.
#[derive(Debug, Clone)]
pub struct SectionBoundary {
    section_id: SectionId,
    failure: Option<Failure>,
}

impl SectionBoundary {
    pub fn new(section_id: SectionId) -> Self {
        Self {
            section_id,
            failure: None,
        }
    }

    pub fn section_id(&self) -> &SectionId {
        &self.section_id
    }

    pub fn last_error(&self) -> Option<&RenderError> {
        self.failure.as_ref().map(|f| &f.error)
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Clear the recorded failure so the next render evaluates again.
    pub fn reset(&mut self) {
        if self.failure.take().is_some() {
            debug!(section_id = %self.section_id, "render boundary reset");
        }
    }

    /// Render the section through the boundary.
    ///
    /// While a failure is recorded for the same code and fields, the
    /// recorded error is returned without evaluating again.
    pub fn render(
        &mut self,
        renderer: &LiveRenderer,
        code: &str,
        fields: &FieldValues,
    ) -> Result<Vec<UiNode>, RenderError> {
        let input = input_hash(code, fields);
        if let Some(failure) = &self.failure {
            if failure.input == input {
                return Err(failure.error.clone());
            }
            self.reset();
        }

        match evaluate(renderer, code, fields) {
            Ok(nodes) => Ok(nodes),
            Err(error) => {
                warn!(
                    section_id = %self.section_id,
                    kind = error.kind(),
                    error = %error,
                    "section render failed; showing fallback"
                );
                self.failure = Some(Failure {
                    error: error.clone(),
                    input,
                });
                Err(error)
            }
        }
    }

    /// Reset, then render again.
    pub fn retry(
        &mut self,
        renderer: &LiveRenderer,
        code: &str,
        fields: &FieldValues,
    ) -> Result<Vec<UiNode>, RenderError> {
        self.reset();
        self.render(renderer, code, fields)
    }

    /// The fallback shown in place of the section while it is failed.
    pub fn fallback(&self) -> Option<UiNode> {
        self.last_error()
            .map(|error| fallback_node(&self.section_id, error))
    }
}

/// Inline error affordance for a failed section.
pub fn fallback_node(section_id: &SectionId, error: &RenderError) -> UiNode {
    UiNode::element(
        "div",
        attrs(&[
            ("role", "alert"),
            ("className", "section-error"),
            ("data-section-id", section_id.as_str()),
            ("data-error-kind", error.kind()),
        ]),
        vec![
            UiNode::element(
                "p",
                attrs(&[("className", "section-error-title")]),
                vec![UiNode::text("This section failed to render.")],
            ),
            UiNode::element(
                "pre",
                attrs(&[("className", "section-error-message")]),
                vec![UiNode::text(error.to_string())],
            ),
            UiNode::element(
                "button",
                attrs(&[
                    ("type", "button"),
                    ("data-action", RETRY_ACTION),
                    ("data-section-id", section_id.as_str()),
                ]),
                vec![UiNode::text("Retry")],
            ),
        ],
    )
}

fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::from(*v)))
        .collect()
}

fn input_hash(code: &str, fields: &FieldValues) -> u64 {
    let mut hasher = DefaultHasher::new();
    code.hash(&mut hasher);
    for (name, value) in fields {
        name.hash(&mut hasher);
        value.to_string().hash(&mut hasher);
    }
    hasher.finish()
}

/// Run one evaluation on a dedicated stack, converting a panic into
/// [`RenderError::Panicked`].
fn evaluate(
    renderer: &LiveRenderer,
    code: &str,
    fields: &FieldValues,
) -> Result<Vec<UiNode>, RenderError> {
    thread::scope(|scope| {
        let spawned = thread::Builder::new()
            .name("section-render".into())
            .stack_size(RENDER_STACK_SIZE)
            .spawn_scoped(scope, || renderer.render(code, fields));
        match spawned {
            Ok(handle) => handle.join().unwrap_or_else(|payload| Err(panicked(payload))),
            Err(err) => {
                warn!(error = %err, "render thread unavailable; evaluating inline");
                panic::catch_unwind(AssertUnwindSafe(|| renderer.render(code, fields)))
                    .unwrap_or_else(|payload| Err(panicked(payload)))
            }
        }
    })
}

fn panicked(payload: Box<dyn Any + Send>) -> RenderError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "evaluation panicked".to_string());
    RenderError::Panicked(message)
}
