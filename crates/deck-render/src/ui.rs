//! Rendered UI tree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node of a rendered section.
///
/// Attribute values are JSON scalars, except `style` which may be an
/// object of CSS properties in camelCase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiNode {
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<String, Value>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<UiNode>,
    },
    Text {
        text: String,
    },
}

impl UiNode {
    pub fn element(
        tag: impl Into<String>,
        attrs: BTreeMap<String, Value>,
        children: Vec<UiNode>,
    ) -> Self {
        Self::Element {
            tag: tag.into(),
            attrs,
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Element { tag, .. } => Some(tag),
            Self::Text { .. } => None,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Element { attrs, .. } => attrs.get(name),
            Self::Text { .. } => None,
        }
    }

    pub fn children(&self) -> &[UiNode] {
        match self {
            Self::Element { children, .. } => children,
            Self::Text { .. } => &[],
        }
    }

    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Element { children, .. } => children.iter().map(UiNode::text_content).collect(),
        }
    }

    /// First element with `tag` in document order, including `self`.
    pub fn find(&self, tag: &str) -> Option<&UiNode> {
        if self.tag() == Some(tag) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(tag))
    }

    /// Node count and approximate in-memory size of this subtree. Every node
    /// is charged at least [`NODE_OVERHEAD`] bytes.
    pub fn measure(&self) -> (usize, usize) {
        match self {
            Self::Text { text } => (1, NODE_OVERHEAD + text.len()),
            Self::Element {
                tag,
                attrs,
                children,
            } => {
                let attr_bytes: usize = attrs.iter().map(|(k, v)| k.len() + json_size(v)).sum();
                children.iter().map(UiNode::measure).fold(
                    (1, NODE_OVERHEAD + tag.len() + attr_bytes),
                    |(count, bytes), (c, b)| (count + c, bytes.saturating_add(b)),
                )
            }
        }
    }

    /// Every element with `tag` in document order.
    pub fn find_all<'a>(&'a self, tag: &str, out: &mut Vec<&'a UiNode>) {
        if self.tag() == Some(tag) {
            out.push(self);
        }
        for child in self.children() {
            child.find_all(tag, out);
        }
    }
}

/// Bytes charged per node on top of its text and attributes.
pub const NODE_OVERHEAD: usize = 64;

fn json_size(value: &Value) -> usize {
    match value {
        Value::String(s) => s.len() + 2,
        Value::Array(items) => items.iter().map(json_size).sum::<usize>() + 2,
        Value::Object(map) => map.iter().map(|(k, v)| k.len() + json_size(v)).sum::<usize>() + 2,
        _ => 8,
    }
}

/// Merge adjacent text nodes, as a DOM would when rendering them.
pub fn merge_text(nodes: Vec<UiNode>) -> Vec<UiNode> {
    let mut out: Vec<UiNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (Some(UiNode::Text { text }), UiNode::Text { text: next }) = (out.last_mut(), &node)
        {
            text.push_str(next);
            continue;
        }
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_type_tag() {
        let node = UiNode::element("p", BTreeMap::new(), vec![UiNode::text("hi")]);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "element", "tag": "p", "children": [{"type": "text", "text": "hi"}]})
        );
    }

    #[test]
    fn measure_counts_nodes_and_text() {
        let tree = UiNode::element(
            "p",
            BTreeMap::from([("title".to_string(), json!("hey"))]),
            vec![UiNode::text("hello"), UiNode::element("br", BTreeMap::new(), vec![])],
        );
        let (count, bytes) = tree.measure();
        assert_eq!(count, 3);
        assert_eq!(bytes, 3 * NODE_OVERHEAD + "p".len() + "title".len() + 5 + "hello".len() + "br".len());
    }

    #[test]
    fn adjacent_text_merges() {
        let merged = merge_text(vec![
            UiNode::text("a"),
            UiNode::text("b"),
            UiNode::element("br", BTreeMap::new(), vec![]),
            UiNode::text("c"),
        ]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], UiNode::text("ab"));
    }

    #[test]
    fn find_walks_document_order() {
        let tree = UiNode::element(
            "div",
            BTreeMap::new(),
            vec![
                UiNode::element("p", BTreeMap::new(), vec![UiNode::text("one")]),
                UiNode::element("p", BTreeMap::new(), vec![UiNode::text("two")]),
            ],
        );
        assert_eq!(tree.find("p").map(UiNode::text_content), Some("one".into()));
        let mut all = Vec::new();
        tree.find_all("p", &mut all);
        assert_eq!(all.len(), 2);
        assert_eq!(tree.text_content(), "onetwo");
    }
}
