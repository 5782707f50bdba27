//! Runtime values and lexical environments of the component interpreter.
//!
//! Values follow JavaScript semantics where section code can observe them
//! (truthiness, string conversion, equality). Rendered markup travels as
//! [`Value::Nodes`] so JSX results can be passed around as props.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use serde_json::Value as Json;

use crate::ast::FunctionDef;
use crate::ui::UiNode;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<Vec<Value>>),
    Object(Rc<BTreeMap<String, Value>>),
    Function(Rc<Closure>),
    Builtin(Builtin),
    Primitive(Primitive),
    Nodes(Rc<Vec<UiNode>>),
}

/// A user-defined function and the scope it closes over.
pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: Env,
}

/// Host functions available in the render scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Render,
    UseState,
    UseRef,
    UseMemo,
    UseCallback,
    Noop,
    MathMax,
    MathMin,
    MathRound,
    MathFloor,
    MathCeil,
    MathAbs,
    ObjectKeys,
    ObjectValues,
    ObjectEntries,
    ArrayIsArray,
    JsonStringify,
    StringCtor,
    NumberCtor,
    BooleanCtor,
    ParseInt,
    ParseFloat,
    ErrorCtor,
}

/// UI primitives that JSX tags may resolve to besides user components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    /// `motion`; members resolve to [`Primitive::Motion`].
    MotionNamespace,
    /// An animated intrinsic element such as `motion.div`.
    Motion(String),
    /// `LucideReact`; capitalised members resolve to icons.
    IconNamespace,
    Icon(String),
    Fragment,
    /// Renders its children unchanged (`AnimatePresence`).
    Passthrough,
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(c) => write!(f, "Function({:?})", c.def.name),
            Self::Builtin(b) => write!(f, "Builtin({b:?})"),
            Self::Primitive(p) => write!(f, "Primitive({p:?})"),
            Self::Nodes(n) => write!(f, "Nodes({n:?})"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Value {
    pub fn str(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Rc::new(items))
    }

    pub fn object(props: BTreeMap<String, Value>) -> Self {
        Self::Object(Rc::new(props))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_) | Self::Builtin(_))
    }

    pub fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Function(_) | Self::Builtin(_) => "function",
            Self::Primitive(Primitive::MotionNamespace | Primitive::IconNamespace) => "object",
            Self::Primitive(_) => "function",
            Self::Null | Self::Array(_) | Self::Object(_) | Self::Nodes(_) => "object",
        }
    }

    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Undefined => "undefined".into(),
            Self::Null => "null".into(),
            Self::Str(s) => format!("string {:?}", truncate(s, 24)),
            Self::Number(n) => format!("number {}", number_to_string(*n)),
            other => other.type_of().into(),
        }
    }

    /// JavaScript `String(value)`.
    pub fn to_display(&self) -> String {
        match self {
            Self::Undefined => "undefined".into(),
            Self::Null => "null".into(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::Str(s) => s.to_string(),
            Self::Array(items) => items
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_display()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Function(_) | Self::Builtin(_) | Self::Primitive(_) => "function".into(),
            Self::Object(_) | Self::Nodes(_) => "[object Object]".into(),
        }
    }

    /// JavaScript `Number(value)`.
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Str(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            _ => f64::NAN,
        }
    }

    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Nodes(a), Self::Nodes(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Primitive(a), Self::Primitive(b)) => a == b,
            _ => false,
        }
    }

    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Self::Number(_), Self::Str(_) | Self::Bool(_))
            | (Self::Str(_) | Self::Bool(_), Self::Number(_))
            | (Self::Bool(_), Self::Str(_))
            | (Self::Str(_), Self::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_equals(other),
        }
    }

    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Self::str(s),
            Json::Array(items) => Self::array(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Approximate bytes this value occupies once materialized by
    /// [`Value::to_display`], [`Value::to_json`] or the HTML serializer.
    /// Shared parts count once per occurrence. Counting stops once the total
    /// passes `cap`, and nesting deeper than [`MAX_NESTING`] counts as past it.
    pub fn footprint(&self, cap: usize) -> usize {
        let mut total = 0;
        self.add_footprint(&mut total, cap, 0);
        total
    }

    fn add_footprint(&self, total: &mut usize, cap: usize, depth: usize) {
        if depth > MAX_NESTING {
            *total = cap.saturating_add(1);
            return;
        }
        match self {
            Self::Str(s) => *total = total.saturating_add(s.len() + 2),
            Self::Array(items) => {
                *total += 2;
                for item in items.iter() {
                    if *total > cap {
                        return;
                    }
                    item.add_footprint(total, cap, depth + 1);
                    *total = total.saturating_add(1);
                }
            }
            Self::Object(props) => {
                *total += 2;
                for (key, value) in props.iter() {
                    if *total > cap {
                        return;
                    }
                    *total = total.saturating_add(key.len() + 4);
                    value.add_footprint(total, cap, depth + 1);
                }
            }
            Self::Nodes(nodes) => {
                for node in nodes.iter() {
                    *total = total.saturating_add(node.measure().1);
                }
            }
            _ => *total = total.saturating_add(8),
        }
    }

    /// JSON projection; callables and markup become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Undefined | Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => Json::from(*n as i64),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Self::Str(s) => Json::String(s.to_string()),
            Self::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(props) => Json::Object(
                props
                    .iter()
                    .filter(|(_, v)| !matches!(v, Self::Undefined) && !v.is_callable())
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Function(_) | Self::Builtin(_) | Self::Primitive(_) | Self::Nodes(_) => {
                Json::Null
            }
        }
    }
}

/// Deepest array/object nesting a value may have.
pub const MAX_NESTING: usize = 256;

/// JavaScript number formatting for the common cases.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        let name = if n > 0.0 { "Infinity" } else { "-Infinity" };
        name.into()
    } else if n == 0.0 {
        "0".into()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max).collect();
        out.push('…');
        out
    }
}

// ── Environments ───────────────────────────────────────────────────

/// A lexical scope. Cloning shares the scope.
#[derive(Clone)]
pub struct Env(Rc<Scope>);

struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

impl Env {
    pub fn root() -> Self {
        Self(Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(&self) -> Self {
        Self(Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn define(&self, name: &str, value: Value) {
        self.0.vars.borrow_mut().insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(value) = env.0.vars.borrow().get(name) {
                return Some(value.clone());
            }
            scope = env.0.parent.as_ref();
        }
        None
    }

    /// Rebind an existing variable in the nearest scope that declares it.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut scope = Some(self);
        while let Some(env) = scope {
            if let Some(slot) = env.0.vars.borrow_mut().get_mut(name) {
                *slot = value;
                return true;
            }
            scope = env.0.parent.as_ref();
        }
        false
    }

    /// Drop every binding in this scope. Closures stored in a scope they
    /// also capture form reference cycles; clearing breaks them.
    pub fn clear(&self) {
        let vars = std::mem::take(&mut *self.0.vars.borrow_mut());
        drop(vars);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn footprint_counts_shared_parts_per_occurrence() {
        let s = Value::str("abcd");
        let pair = Value::array(vec![s.clone(), s]);
        assert_eq!(pair.footprint(usize::MAX), 2 + 2 * (4 + 2 + 1));

        let mut nested = pair;
        for _ in 0..40 {
            nested = Value::array(vec![nested.clone(), nested]);
        }
        let total = nested.footprint(1000);
        assert!(total > 1000 && total < 2000);
    }

    #[test]
    fn footprint_rejects_deep_nesting() {
        let mut nested = Value::Null;
        for _ in 0..=MAX_NESTING + 1 {
            nested = Value::array(vec![nested]);
        }
        assert!(nested.footprint(10_000) > 10_000);
    }

    #[test]
    fn truthiness_follows_javascript() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::str("").truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(Value::str("0").truthy());
        assert!(Value::array(vec![]).truthy());
    }

    #[test]
    fn numbers_print_like_javascript() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(2.5), "2.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
    }

    #[test]
    fn loose_equality_coerces() {
        assert!(Value::Null.loose_equals(&Value::Undefined));
        assert!(Value::Number(1.0).loose_equals(&Value::str("1")));
        assert!(!Value::Number(1.0).strict_equals(&Value::str("1")));
        assert!(!Value::Null.loose_equals(&Value::Number(0.0)));
    }

    #[test]
    fn json_round_trip_drops_undefined_members() {
        let value = Value::from_json(&json!({"a": [1, "x", null], "b": true}));
        assert_eq!(value.to_json(), json!({"a": [1, "x", null], "b": true}));
        let mut props = BTreeMap::new();
        props.insert("gone".to_string(), Value::Undefined);
        assert_eq!(Value::object(props).to_json(), json!({}));
    }

    #[test]
    fn array_display_joins_with_commas() {
        let value = Value::array(vec![Value::Number(1.0), Value::Null, Value::str("b")]);
        assert_eq!(value.to_display(), "1,,b");
    }

    #[test]
    fn env_assign_updates_declaring_scope() {
        let root = Env::root();
        root.define("x", Value::Number(1.0));
        let child = root.child();
        assert!(child.assign("x", Value::Number(2.0)));
        assert!(!child.assign("y", Value::Null));
        assert_eq!(root.lookup("x").map(|v| v.to_number()), Some(2.0));
    }
}
