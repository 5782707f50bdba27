//! # deck-render — Live Render Pipeline
//!
//! Turns a section's stored code and its resolved field values into a
//! rendered UI tree without giving the code any access to the host.
//!
//! - [`transform`]: strips module syntax, rewrites legacy global shims,
//!   extracts the component name and appends the render call.
//! - [`parser`]: parses the supported component language (a JavaScript
//!   subset with JSX) into an [`ast::Program`].
//! - [`eval`]: the metered interpreter. Only what [`scope`] installs is
//!   reachable; host capabilities fail with
//!   [`RenderError::CapabilityDenied`].
//! - [`boundary`]: the per-section error boundary with its fallback
//!   affordance and reset.
//! - [`pipeline`]: [`LiveRenderer`] and the deck-level [`DeckRenderer`].
//! - [`html`]: serializes [`UiNode`] trees to escaped HTML.
//!
//! ## Data Flow
//!
//! ```text
//! code ──▶ transform ──▶ parser ──▶ Interpreter ──▶ Vec<UiNode> ──▶ to_html
//!                                        ▲
//!             fields ──▶ scope::install ─┘
//! ```
//!
//! ## Usage
//!
//! ```
//! use deck_core::FieldValues;
//! use deck_render::{to_html, LiveRenderer};
//!
//! let mut fields = FieldValues::new();
//! fields.insert("title".into(), serde_json::json!("Hello"));
//! let nodes = LiveRenderer::default()
//!     .render("const Title = ({ title }) => <h1>{title}</h1>;", &fields)
//!     .unwrap();
//! assert_eq!(to_html(&nodes), "<h1>Hello</h1>");
//! ```

pub mod ast;
pub mod boundary;
pub mod error;
pub mod eval;
pub mod html;
pub mod parser;
pub mod pipeline;
pub mod scope;
pub mod transform;
pub mod ui;
pub mod value;

pub use boundary::{fallback_node, SectionBoundary, RETRY_ACTION};
pub use error::{RenderError, RenderLimits};
pub use eval::Interpreter;
pub use html::to_html;
pub use parser::parse_program;
pub use pipeline::{DeckRenderer, LiveRenderer, RenderFailure, RenderStatus, SectionRender};
pub use transform::{prepare, Prepared};
pub use ui::UiNode;
