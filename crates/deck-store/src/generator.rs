//! # Generator Admission
//!
//! Output of the external content generator crosses a trust boundary
//! before it may become a section. Admission runs in stages and stops at
//! the first failing one:
//!
//! 1. Trim and strip an optional Markdown code fence.
//! 2. Parse as JSON. A parse failure keeps the parser diagnostic (with line
//!    and column) and a leading excerpt of the raw text.
//! 3. Validate the shape against a JSON Schema (Draft 2020-12). Every
//!    violation is reported with its instance path.
//! 4. Fill a missing field `label` from the field name and deserialize into
//!    a [`SectionDraft`].
//!
//! Admission never touches the store; the caller adds the draft.

use deck_core::{GeneratorError, SectionDraft};
use serde_json::{json, Value};

/// Characters of raw output kept in a malformed-JSON diagnostic.
const EXCERPT_LEN: usize = 160;

fn draft_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "object",
        "required": ["metadata", "code", "editableFields"],
        "properties": {
            "metadata": {
                "type": "object",
                "required": ["title"],
                "properties": {
                    "title": { "type": "string", "minLength": 1 },
                    "description": { "type": "string" },
                    "category": { "type": "string" }
                }
            },
            "code": { "type": "string", "minLength": 1 },
            "editableFields": {
                "type": "object",
                "additionalProperties": {
                    "type": "object",
                    "required": ["type", "value"],
                    "properties": {
                        "type": { "enum": ["text", "textarea", "color", "image", "number"] },
                        "label": { "type": "string" }
                    }
                }
            },
            "dependencies": {
                "type": "array",
                "items": { "type": "string" }
            }
        }
    })
}

/// Remove a surrounding ```` ``` ```` / ```` ```json ```` fence, if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Validate `instance` against the draft schema, collecting every violation.
fn shape_violations(instance: &Value) -> Result<(), GeneratorError> {
    let schema = draft_schema();
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft202012);
    let validator = opts.build(&schema).map_err(|e| GeneratorError::UnexpectedShape {
        violations: vec![format!("schema compilation failed: {e}")],
    })?;

    let violations: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            let path = if path.is_empty() { "/".to_string() } else { path };
            format!("{path}: {e}")
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(GeneratorError::UnexpectedShape { violations })
    }
}

/// Admit raw generator output as a section draft.
///
/// `model` is recorded as `metadata.generatorModel` when the output does not
/// already name one.
pub fn admit(raw: &str, model: Option<&str>) -> Result<SectionDraft, GeneratorError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(GeneratorError::Empty);
    }

    let mut value: Value = serde_json::from_str(body).map_err(|e| GeneratorError::MalformedJson {
        diagnostic: e.to_string(),
        excerpt: body.chars().take(EXCERPT_LEN).collect(),
    })?;

    shape_violations(&value)?;

    if let Some(fields) = value.get_mut("editableFields").and_then(Value::as_object_mut) {
        for (name, field) in fields.iter_mut() {
            if let Some(field) = field.as_object_mut() {
                field
                    .entry("label")
                    .or_insert_with(|| Value::String(name.clone()));
            }
        }
    }

    let mut draft: SectionDraft =
        serde_json::from_value(value).map_err(|e| GeneratorError::UnexpectedShape {
            violations: vec![e.to_string()],
        })?;
    draft.validate().map_err(|e| GeneratorError::UnexpectedShape {
        violations: vec![e.to_string()],
    })?;

    if draft.metadata.generator_model.is_none() {
        draft.metadata.generator_model = model.map(str::to_string);
    }
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::FieldType;

    const GOOD: &str = r#"{
        "metadata": { "title": "Pricing", "description": "Three tiers" },
        "code": "function Pricing({ headline }) { return <h2>{headline}</h2>; }",
        "editableFields": {
            "headline": { "type": "text", "value": "Plans" }
        },
        "dependencies": ["lucide-react"]
    }"#;

    #[test]
    fn admits_well_formed_output() {
        let draft = admit(GOOD, Some("gpt-x")).unwrap();
        assert_eq!(draft.metadata.title, "Pricing");
        assert_eq!(draft.metadata.generator_model.as_deref(), Some("gpt-x"));
        let field = &draft.editable_fields["headline"];
        assert_eq!(field.field_type, FieldType::Text);
        assert_eq!(field.label, "headline");
    }

    #[test]
    fn strips_markdown_fence() {
        let fenced = format!("```json\n{GOOD}\n```\n");
        assert!(admit(&fenced, None).is_ok());
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn malformed_json_keeps_diagnostic() {
        let err = admit("{ \"metadata\": ", None).unwrap_err();
        match err {
            GeneratorError::MalformedJson { diagnostic, excerpt } => {
                assert!(diagnostic.contains("line"));
                assert!(excerpt.starts_with("{ \"metadata\""));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wrong_shape_lists_violations() {
        let err = admit(
            r#"{"metadata": {"title": "x"}, "code": "", "editableFields": {"a": {"type": "video", "value": 1}}}"#,
            None,
        )
        .unwrap_err();
        match err {
            GeneratorError::UnexpectedShape { violations } => {
                assert!(violations.iter().any(|v| v.starts_with("/code")));
                assert!(violations.iter().any(|v| v.starts_with("/editableFields/a/type")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn editable_fields_must_be_a_map() {
        let err = admit(r#"{"metadata": {"title": "x"}, "code": "f", "editableFields": []}"#, None)
            .unwrap_err();
        assert!(matches!(err, GeneratorError::UnexpectedShape { .. }));
    }

    #[test]
    fn blank_code_is_rejected_after_schema() {
        let err = admit(r#"{"metadata": {"title": "x"}, "code": "   ", "editableFields": {}}"#, None)
            .unwrap_err();
        assert!(err.to_string().contains("code must not be empty"));
    }

    #[test]
    fn empty_output_is_reported() {
        assert_eq!(admit("  \n ", None), Err(GeneratorError::Empty));
        assert_eq!(admit("```\n```", None), Err(GeneratorError::Empty));
    }
}
