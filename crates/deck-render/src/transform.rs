//! # Source Transform
//!
//! Prepares stored section code for evaluation:
//!
//! 1. Module syntax is removed. `import` statements (single or multi-line)
//!    are dropped; `export` prefixes are stripped, and an expression default
//!    export becomes `const Component = …`.
//! 2. Compatibility shims from older generated code are rewritten: global
//!    library access through `window.*` becomes a direct reference, and a
//!    `"use client"` directive is dropped.
//! 3. The component name is extracted: the default export if it names one,
//!    otherwise the first capitalised function or `const` binding, otherwise
//!    `Component`.
//! 4. Unless the code mounts itself with a top-level `render(...)` call, a
//!    call rendering the component with every field as a same-named prop is
//!    appended.

use deck_core::FieldValues;

/// Name used when no component name can be extracted.
pub const DEFAULT_COMPONENT: &str = "Component";

/// Scope variable holding every resolved field value.
pub const FIELDS_BINDING: &str = "__fields";

const SHIMS: &[(&str, &str)] = &[
    ("window.FramerMotion", "FramerMotion"),
    ("window.framerMotion", "FramerMotion"),
    ("window.LucideReact", "LucideReact"),
    ("window.lucideReact", "LucideReact"),
    ("window.React", "React"),
    ("window.motion", "motion"),
];

/// Transformed code ready for the interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    pub source: String,
    pub component: String,
    /// Whether the render call was appended rather than written by the code.
    pub synthesized_render: bool,
}

/// Run every transform step over `code`.
pub fn prepare(code: &str, fields: &FieldValues) -> Prepared {
    let stripped = strip_modules(code);
    let source = apply_shims(&stripped.source);
    let component = stripped
        .default_export
        .or_else(|| extract_component_name(&source))
        .unwrap_or_else(|| DEFAULT_COMPONENT.to_string());

    if calls_render(&source) {
        return Prepared {
            source,
            component,
            synthesized_render: false,
        };
    }
    let invocation = render_invocation(&component, fields);
    Prepared {
        source: format!("{}\n;{invocation}\n", source.trim_end()),
        component,
        synthesized_render: true,
    }
}

struct Stripped {
    source: String,
    default_export: Option<String>,
}

/// Leading whitespace and stray semicolons before a statement.
fn statement_start(line: &str) -> &str {
    line.trim_start_matches(|c: char| c.is_whitespace() || c == ';')
}

fn ident_prefix(s: &str) -> &str {
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(s.len());
    &s[..end]
}

fn is_import_start(stmt: &str) -> bool {
    stmt.strip_prefix("import")
        .is_some_and(|rest| rest.starts_with([' ', '{', '"', '\'', '*']))
}

/// An import ends with its module specifier string.
fn import_complete(stmt: &str) -> bool {
    let end = stmt.trim_end().trim_end_matches(';').trim_end();
    end.ends_with('"') || end.ends_with('\'')
}

fn strip_modules(code: &str) -> Stripped {
    let mut out = Vec::new();
    let mut default_export = None;
    let mut lines = code.lines();

    while let Some(line) = lines.next() {
        let stmt = statement_start(line);
        let indent = &line[..line.len() - line.trim_start().len()];

        if is_import_start(stmt) {
            let mut text = stmt.to_string();
            while !import_complete(&text) {
                match lines.next() {
                    Some(next) => text.push_str(next),
                    None => break,
                }
            }
            continue;
        }

        let Some(rest) = stmt.strip_prefix("export ") else {
            out.push(line.to_string());
            continue;
        };
        let rest = rest.trim_start();

        if rest.starts_with('{') || rest.starts_with('*') {
            let mut text = rest.to_string();
            while !text.contains('}') && !text.contains(" from ") {
                match lines.next() {
                    Some(next) => text.push_str(next),
                    None => break,
                }
            }
            if let Some(name) = aliased_default(&text) {
                default_export = Some(name);
            }
            continue;
        }

        let Some(target) = rest.strip_prefix("default ") else {
            // `export const`, `export function`, ...
            out.push(format!("{indent}{rest}"));
            continue;
        };
        let target = target.trim_start();

        if let Some(after) = target.strip_prefix("function") {
            let name = ident_prefix(after.trim_start());
            if !name.is_empty() && after.starts_with(char::is_whitespace) {
                default_export = Some(name.to_string());
                out.push(format!("{indent}{target}"));
            } else {
                default_export = Some(DEFAULT_COMPONENT.to_string());
                out.push(format!("{indent}const {DEFAULT_COMPONENT} = {target}"));
            }
            continue;
        }

        let name = ident_prefix(target);
        let tail = target[name.len()..].trim().trim_end_matches(';').trim();
        if !name.is_empty() && tail.is_empty() {
            default_export = Some(name.to_string());
            continue;
        }
        default_export = Some(DEFAULT_COMPONENT.to_string());
        out.push(format!("{indent}const {DEFAULT_COMPONENT} = {target}"));
    }

    Stripped {
        source: out.join("\n"),
        default_export,
    }
}

/// `export { Hero as default }` names `Hero`.
fn aliased_default(text: &str) -> Option<String> {
    let inner = text.split('{').nth(1)?.split('}').next()?;
    inner.split(',').find_map(|item| {
        let mut parts = item.split_whitespace();
        let name = parts.next()?;
        (parts.next() == Some("as") && parts.next() == Some("default")).then(|| name.to_string())
    })
}

fn apply_shims(source: &str) -> String {
    let mut out = source.to_string();
    for (from, to) in SHIMS {
        out = out.replace(from, to);
    }
    out.lines()
        .filter(|line| {
            let directive = statement_start(line).trim_end().trim_end_matches(';');
            directive != "\"use client\"" && directive != "'use client'"
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// First capitalised `function X` or `const|let|var X =`.
pub fn extract_component_name(source: &str) -> Option<String> {
    source.lines().find_map(|line| {
        let stmt = statement_start(line);
        let rest = stmt
            .strip_prefix("function ")
            .map(|rest| (rest, false))
            .or_else(|| {
                ["const ", "let ", "var "]
                    .iter()
                    .find_map(|kw| stmt.strip_prefix(kw))
                    .map(|rest| (rest, true))
            });
        let (rest, needs_eq) = rest?;
        let rest = rest.trim_start();
        let name = ident_prefix(rest);
        let capitalised = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());
        let assigned = !needs_eq || rest[name.len()..].trim_start().starts_with('=');
        (capitalised && assigned).then(|| name.to_string())
    })
}

/// Whether the code mounts itself with a statement-level `render(` call.
fn calls_render(source: &str) -> bool {
    source
        .lines()
        .any(|line| statement_start(line).starts_with("render("))
}

fn is_prop_name(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'))
}

/// `render(<Name a={__fields["a"]} />);` over every prop-safe field key.
pub fn render_invocation(component: &str, fields: &FieldValues) -> String {
    let mut call = format!("render(<{component}");
    for key in fields.keys().filter(|k| is_prop_name(k)) {
        let literal = serde_json::Value::String(key.clone()).to_string();
        call.push_str(&format!(" {key}={{{FIELDS_BINDING}[{literal}]}}"));
    }
    call.push_str(" />);");
    call
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(keys: &[&str]) -> FieldValues {
        keys.iter().map(|k| (k.to_string(), json!("v"))).collect()
    }

    #[test]
    fn strips_imports_including_multiline() {
        let code = "import React from 'react';\nimport {\n  motion,\n  AnimatePresence\n} from \"framer-motion\";\nfunction Hero() { return <div/>; }";
        let prepared = prepare(code, &FieldValues::new());
        assert!(!prepared.source.contains("import"));
        assert!(!prepared.source.contains("AnimatePresence"));
        assert_eq!(prepared.component, "Hero");
    }

    #[test]
    fn default_function_export_names_the_component() {
        let prepared = prepare(
            "export default function HeroSection({ title }) {\n  return <h1>{title}</h1>;\n}",
            &fields(&["title"]),
        );
        assert!(prepared.source.starts_with("function HeroSection"));
        assert_eq!(prepared.component, "HeroSection");
        assert!(prepared
            .source
            .contains(r#"render(<HeroSection title={__fields["title"]} />);"#));
    }

    #[test]
    fn default_export_of_identifier_is_dropped() {
        let prepared = prepare(
            "const Card = () => <div/>;\nexport default Card;",
            &FieldValues::new(),
        );
        assert!(!prepared.source.contains("export"));
        assert_eq!(prepared.component, "Card");
    }

    #[test]
    fn anonymous_default_export_becomes_component() {
        let prepared = prepare("export default ({ a }) => <p>{a}</p>;", &fields(&["a"]));
        assert!(prepared.source.starts_with("const Component = ({ a })"));
        assert_eq!(prepared.component, DEFAULT_COMPONENT);
    }

    #[test]
    fn named_exports_lose_their_prefix() {
        let prepared = prepare(
            "export const Badge = () => <b/>;\nexport { Badge as default };",
            &FieldValues::new(),
        );
        assert!(prepared.source.starts_with("const Badge"));
        assert_eq!(prepared.component, "Badge");
    }

    #[test]
    fn window_shims_are_rewritten() {
        let prepared = prepare(
            "\"use client\";\nconst { motion } = window.FramerMotion;\nconst Slide = () => <motion.div/>;",
            &FieldValues::new(),
        );
        assert!(prepared.source.contains("= FramerMotion;"));
        assert!(!prepared.source.contains("use client"));
    }

    #[test]
    fn stray_semicolons_and_whitespace_do_not_break_extraction() {
        let prepared = prepare(
            "\n\n   ;;export default function  Closing() { return null; };;\n\n",
            &FieldValues::new(),
        );
        assert_eq!(prepared.component, "Closing");
    }

    #[test]
    fn falls_back_to_generic_name() {
        assert_eq!(extract_component_name("const x = 1;"), None);
        let prepared = prepare("const x = 1;", &FieldValues::new());
        assert_eq!(prepared.component, DEFAULT_COMPONENT);
    }

    #[test]
    fn explicit_render_call_is_respected() {
        let prepared = prepare(
            "const A = () => <i/>;\nrender(<A />);",
            &fields(&["title"]),
        );
        assert!(!prepared.synthesized_render);
        assert_eq!(prepared.source.matches("render(").count(), 1);
    }

    #[test]
    fn unsafe_field_keys_are_not_props() {
        let call = render_invocation("Hero", &fields(&["ok", "bad key", "1st"]));
        assert_eq!(call, r#"render(<Hero ok={__fields["ok"]} />);"#);
    }
}
