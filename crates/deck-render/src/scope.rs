//! # Render Scope
//!
//! The global namespace a section evaluates in. Only what is installed
//! here is reachable: UI primitives, animation helpers, the icon set, a few
//! standard objects and the section's own field values. Host capabilities
//! (DOM, network, storage, timers, dynamic code) are named explicitly so
//! that reaching for one fails with [`RenderError::CapabilityDenied`]
//! instead of silently resolving to `undefined`.
//!
//! [`RenderError::CapabilityDenied`]: crate::error::RenderError::CapabilityDenied

use std::collections::BTreeMap;

use deck_core::FieldValues;

use crate::transform::FIELDS_BINDING;
use crate::value::{Builtin, Env, Primitive, Value};

/// Globals a section may never resolve.
pub const DENIED_GLOBALS: &[&str] = &[
    "window",
    "document",
    "globalThis",
    "global",
    "self",
    "parent",
    "top",
    "frames",
    "fetch",
    "XMLHttpRequest",
    "WebSocket",
    "EventSource",
    "navigator",
    "location",
    "history",
    "localStorage",
    "sessionStorage",
    "indexedDB",
    "caches",
    "cookieStore",
    "eval",
    "Function",
    "require",
    "process",
    "module",
    "exports",
    "importScripts",
    "Worker",
    "SharedWorker",
    "postMessage",
    "setTimeout",
    "setInterval",
    "requestAnimationFrame",
    "queueMicrotask",
    "alert",
    "confirm",
    "prompt",
    "open",
    "Deno",
    "Bun",
];

/// Icons available as bare identifiers; `LucideReact.<Name>` reaches any.
pub const ICONS: &[&str] = &[
    "ArrowRight",
    "ArrowLeft",
    "ArrowUpRight",
    "Award",
    "BarChart",
    "BarChart3",
    "Calendar",
    "Check",
    "CheckCircle",
    "ChevronDown",
    "ChevronRight",
    "Clock",
    "Cloud",
    "Code",
    "Database",
    "Globe",
    "Heart",
    "Lightbulb",
    "Lock",
    "Mail",
    "MessageSquare",
    "Phone",
    "Play",
    "Quote",
    "Rocket",
    "Search",
    "Settings",
    "Shield",
    "Sparkles",
    "Star",
    "Target",
    "TrendingUp",
    "Users",
    "X",
    "Zap",
];

pub fn is_denied(name: &str) -> bool {
    DENIED_GLOBALS.contains(&name)
}

fn object(entries: &[(&str, Value)]) -> Value {
    Value::object(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    )
}

/// Install the render scope into `env`.
///
/// Field values are bound first so a field can never shadow a primitive.
/// A field may share a name with a denied global: it binds plain data, and
/// the denial only applies to names nothing in scope defines.
pub fn install(env: &Env, fields: &FieldValues) {
    let mut all = BTreeMap::new();
    for (name, value) in fields {
        let value = Value::from_json(value);
        env.define(name, value.clone());
        all.insert(name.clone(), value);
    }
    env.define(FIELDS_BINDING, Value::object(all));

    let hooks = [
        ("useState", Value::Builtin(Builtin::UseState)),
        ("useEffect", Value::Builtin(Builtin::Noop)),
        ("useLayoutEffect", Value::Builtin(Builtin::Noop)),
        ("useRef", Value::Builtin(Builtin::UseRef)),
        ("useMemo", Value::Builtin(Builtin::UseMemo)),
        ("useCallback", Value::Builtin(Builtin::UseCallback)),
    ];
    let fragment = Value::Primitive(Primitive::Fragment);
    let motion = Value::Primitive(Primitive::MotionNamespace);
    let presence = Value::Primitive(Primitive::Passthrough);

    let mut react = hooks.to_vec();
    react.push(("Fragment", fragment.clone()));
    env.define("React", object(&react));
    for (name, hook) in hooks {
        env.define(name, hook);
    }
    env.define("Fragment", fragment);

    env.define("motion", motion.clone());
    env.define("AnimatePresence", presence.clone());
    env.define(
        "FramerMotion",
        object(&[("motion", motion), ("AnimatePresence", presence)]),
    );

    env.define("LucideReact", Value::Primitive(Primitive::IconNamespace));
    for icon in ICONS {
        env.define(icon, Value::Primitive(Primitive::Icon(icon.to_string())));
    }

    env.define("render", Value::Builtin(Builtin::Render));
    env.define(
        "Math",
        object(&[
            ("max", Value::Builtin(Builtin::MathMax)),
            ("min", Value::Builtin(Builtin::MathMin)),
            ("round", Value::Builtin(Builtin::MathRound)),
            ("floor", Value::Builtin(Builtin::MathFloor)),
            ("ceil", Value::Builtin(Builtin::MathCeil)),
            ("abs", Value::Builtin(Builtin::MathAbs)),
            ("PI", Value::Number(std::f64::consts::PI)),
            ("E", Value::Number(std::f64::consts::E)),
        ]),
    );
    env.define(
        "Object",
        object(&[
            ("keys", Value::Builtin(Builtin::ObjectKeys)),
            ("values", Value::Builtin(Builtin::ObjectValues)),
            ("entries", Value::Builtin(Builtin::ObjectEntries)),
        ]),
    );
    env.define(
        "Array",
        object(&[("isArray", Value::Builtin(Builtin::ArrayIsArray))]),
    );
    env.define(
        "JSON",
        object(&[("stringify", Value::Builtin(Builtin::JsonStringify))]),
    );
    env.define("String", Value::Builtin(Builtin::StringCtor));
    env.define("Number", Value::Builtin(Builtin::NumberCtor));
    env.define("Boolean", Value::Builtin(Builtin::BooleanCtor));
    env.define("parseInt", Value::Builtin(Builtin::ParseInt));
    env.define("parseFloat", Value::Builtin(Builtin::ParseFloat));
    env.define("Error", Value::Builtin(Builtin::ErrorCtor));
    env.define("NaN", Value::Number(f64::NAN));
    env.define("Infinity", Value::Number(f64::INFINITY));
    let noop = Value::Builtin(Builtin::Noop);
    env.define(
        "console",
        object(&[
            ("log", noop.clone()),
            ("info", noop.clone()),
            ("warn", noop.clone()),
            ("error", noop),
        ]),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_are_bound_but_cannot_shadow_primitives() {
        let env = Env::root();
        let mut fields = FieldValues::new();
        fields.insert("title".into(), json!("Hi"));
        fields.insert("render".into(), json!("nope"));
        fields.insert("window".into(), json!("x"));
        install(&env, &fields);

        assert_eq!(env.lookup("title").map(|v| v.to_display()), Some("Hi".into()));
        assert!(matches!(env.lookup("render"), Some(Value::Builtin(Builtin::Render))));
        assert_eq!(env.lookup("window").map(|v| v.to_display()), Some("x".into()));
        let all = env.lookup(FIELDS_BINDING).map(|v| v.to_json());
        assert_eq!(all, Some(json!({"title": "Hi", "render": "nope", "window": "x"})));
    }

    #[test]
    fn host_capabilities_are_denied() {
        for name in ["window", "document", "fetch", "eval", "localStorage"] {
            assert!(is_denied(name), "{name}");
        }
        assert!(!is_denied("title"));
    }
}
