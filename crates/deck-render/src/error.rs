//! # Render Errors and Limits
//!
//! Every failure between receiving a section's code and producing its UI
//! tree is a [`RenderError`]. None of them escape the section's boundary:
//! the pipeline turns them into a fallback affordance local to the section.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure while transforming, evaluating or mounting section code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The code could not be parsed.
    #[error("syntax error at offset {offset}: {message}")]
    Syntax {
        /// Byte offset into the transformed source.
        offset: usize,
        message: String,
    },

    /// The program finished without calling `render(...)`.
    #[error("code did not call render()")]
    NoRenderCall,

    /// The code reached for something outside the render scope.
    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    /// A value was used in a way its type does not support.
    #[error("type error: {0}")]
    Type(String),

    /// The code threw.
    #[error("uncaught error: {0}")]
    Thrown(String),

    /// Call or element nesting went past the configured depth.
    #[error("maximum nesting depth of {0} exceeded")]
    DepthExceeded(usize),

    /// Step or node budget ran out.
    #[error("render budget exceeded: {0}")]
    BudgetExceeded(String),

    /// The interpreter itself panicked; caught at the section boundary.
    #[error("renderer panicked: {0}")]
    Panicked(String),
}

impl RenderError {
    /// Stable machine-readable kind, used in serialized render results.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "syntax",
            Self::NoRenderCall => "no_render_call",
            Self::CapabilityDenied(_) => "capability_denied",
            Self::Type(_) => "type",
            Self::Thrown(_) => "thrown",
            Self::DepthExceeded(_) => "depth_exceeded",
            Self::BudgetExceeded(_) => "budget_exceeded",
            Self::Panicked(_) => "panicked",
        }
    }
}

/// Resource limits applied to one section render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderLimits {
    /// Maximum nesting of calls and elements.
    pub max_depth: usize,
    /// Maximum number of UI nodes produced.
    pub max_nodes: usize,
    /// Maximum number of evaluation steps.
    pub max_steps: usize,
    /// Maximum materialized size of any single value (strings, arrays,
    /// objects, markup), in bytes.
    pub max_value_bytes: usize,
    /// Maximum total size of the rendered tree, in bytes.
    pub max_output_bytes: usize,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 10_000,
            max_steps: 200_000,
            max_value_bytes: 1 << 20,
            max_output_bytes: 8 << 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let limits = RenderLimits::default();
        assert_eq!(limits.max_depth, 64);
        assert_eq!(limits.max_nodes, 10_000);
        assert_eq!(limits.max_steps, 200_000);
        assert_eq!(limits.max_value_bytes, 1_048_576);
        assert!(limits.max_output_bytes > limits.max_value_bytes);
    }

    #[test]
    fn display_names_the_failure() {
        let err = RenderError::Syntax {
            offset: 12,
            message: "expected `)`".into(),
        };
        assert_eq!(err.to_string(), "syntax error at offset 12: expected `)`");
        assert_eq!(err.kind(), "syntax");
        assert_eq!(
            RenderError::CapabilityDenied("fetch".into()).to_string(),
            "capability denied: fetch"
        );
    }
}
