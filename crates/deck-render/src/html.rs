//! # HTML Serializer
//!
//! Turns a [`UiNode`] tree into an HTML fragment. Text and attribute
//! values are escaped; `style` objects become CSS declarations. Event
//! handler attributes and `javascript:` URLs never reach the output.

use std::fmt::Write;

use serde_json::Value;

use crate::ui::UiNode;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// CSS properties whose numeric values take no `px` unit.
const UNITLESS: &[&str] = &[
    "opacity",
    "zIndex",
    "fontWeight",
    "lineHeight",
    "flex",
    "flexGrow",
    "flexShrink",
    "order",
    "zoom",
    "scale",
    "aspectRatio",
    "gridRow",
    "gridColumn",
    "columnCount",
];

const URL_ATTRS: &[&str] = &["href", "src", "action", "formAction", "xlinkHref", "poster"];

/// Serialize `nodes` to an HTML fragment.
pub fn to_html(nodes: &[UiNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

fn write_node(out: &mut String, node: &UiNode) {
    match node {
        UiNode::Text { text } => out.push_str(&escape_text(text)),
        UiNode::Element {
            tag,
            attrs,
            children,
        } => {
            if !is_valid_name(tag) {
                return;
            }
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                write_attr(out, name, value);
            }
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                out.push_str(" />");
                return;
            }
            out.push('>');
            for child in children {
                write_node(out, child);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

fn write_attr(out: &mut String, name: &str, value: &Value) {
    if !is_valid_name(name) || is_event_handler(name) || name == "dangerouslySetInnerHTML" {
        return;
    }
    let html_name = match name {
        "className" => "class",
        "htmlFor" => "for",
        "xlinkHref" => "xlink:href",
        other => other,
    };
    let text = match value {
        Value::Bool(true) => {
            let _ = write!(out, " {html_name}");
            return;
        }
        Value::Bool(false) | Value::Null => return,
        Value::Object(_) if name == "style" => {
            let css = style_to_css(value);
            if css.is_empty() {
                return;
            }
            css
        }
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => return,
    };
    if URL_ATTRS.contains(&name) && is_script_url(&text) {
        return;
    }
    let _ = write!(out, " {html_name}=\"{}\"", escape_attr(&text));
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
}

pub(crate) fn is_event_handler(name: &str) -> bool {
    name.len() > 2
        && name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("on"))
        && !name.eq_ignore_ascii_case("open")
}

fn is_script_url(url: &str) -> bool {
    let compact: String = url
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    compact.starts_with("javascript:") || compact.starts_with("vbscript:")
}

/// Render a `style` object as CSS declarations.
pub fn style_to_css(style: &Value) -> String {
    let Value::Object(props) = style else {
        return String::new();
    };
    let mut css = Vec::new();
    for (prop, value) in props {
        let value = match value {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => {
                let unitless = UNITLESS.contains(&prop.as_str()) || prop.starts_with("--");
                match n.as_f64() {
                    Some(v) if v != 0.0 && !unitless => format!("{n}px"),
                    _ => n.to_string(),
                }
            }
            _ => continue,
        };
        let value = value.replace(['<', '>', '{', '}', ';'], "");
        css.push(format!("{}:{}", kebab_case(prop), value.trim()));
    }
    css.join(";")
}

/// `backgroundColor` → `background-color`; `WebkitTransition` →
/// `-webkit-transition`; custom properties are kept as written.
fn kebab_case(prop: &str) -> String {
    if prop.starts_with("--") {
        return prop.to_string();
    }
    let mut out = String::with_capacity(prop.len() + 4);
    for (i, c) in prop.chars().enumerate() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else if i == 0 && prop.starts_with("ms") && prop[2..].starts_with(char::is_uppercase) {
            out.push('-');
            out.push(c);
        } else {
            out.push(c);
        }
    }
    out
}

pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn el(tag: &str, attrs: Value, children: Vec<UiNode>) -> UiNode {
        let attrs: BTreeMap<String, Value> = attrs
            .as_object()
            .map(|m| m.clone().into_iter().collect())
            .unwrap_or_default();
        UiNode::element(tag, attrs, children)
    }

    #[test]
    fn escapes_text_and_attributes() {
        let node = el(
            "p",
            json!({"title": "a \"quoted\" <b>"}),
            vec![UiNode::text("1 < 2 & 3")],
        );
        assert_eq!(
            to_html(&[node]),
            "<p title=\"a &quot;quoted&quot; &lt;b&gt;\">1 &lt; 2 &amp; 3</p>"
        );
    }

    #[test]
    fn maps_react_attribute_names() {
        let node = el("label", json!({"className": "x", "htmlFor": "f"}), vec![]);
        assert_eq!(to_html(&[node]), "<label class=\"x\" for=\"f\"></label>");
    }

    #[test]
    fn style_objects_become_css() {
        let node = el(
            "div",
            json!({"style": {"backgroundColor": "#fff", "marginTop": 8, "opacity": 0.5, "zIndex": 2}}),
            vec![],
        );
        assert_eq!(
            to_html(&[node]),
            "<div style=\"background-color:#fff;margin-top:8px;opacity:0.5;z-index:2\"></div>"
        );
    }

    #[test]
    fn void_elements_self_close() {
        let node = el("img", json!({"src": "/a.png", "alt": ""}), vec![]);
        assert_eq!(to_html(&[node]), "<img alt=\"\" src=\"/a.png\" />");
    }

    #[test]
    fn boolean_attributes() {
        let node = el("input", json!({"disabled": true, "checked": false}), vec![]);
        assert_eq!(to_html(&[node]), "<input disabled />");
    }

    #[test]
    fn drops_handlers_and_script_urls() {
        let node = el(
            "a",
            json!({"href": " JavaScript:alert(1)", "onclick": "x()", "onClick": "y()"}),
            vec![UiNode::text("x")],
        );
        assert_eq!(to_html(&[node]), "<a>x</a>");
    }

    #[test]
    fn invalid_names_are_skipped() {
        let node = el("p", json!({"a b=\"x\"": "1", "data-ok": "2"}), vec![]);
        assert_eq!(to_html(&[node]), "<p data-ok=\"2\"></p>");
        let bad = el("p onload=x", json!({}), vec![UiNode::text("t")]);
        assert_eq!(to_html(&[bad]), "");
    }

    #[test]
    fn kebab_case_handles_vendor_prefixes() {
        assert_eq!(kebab_case("WebkitTransition"), "-webkit-transition");
        assert_eq!(kebab_case("msTransform"), "-ms-transform");
        assert_eq!(kebab_case("--accent"), "--accent");
    }
}
