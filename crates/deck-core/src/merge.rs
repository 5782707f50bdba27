//! # Deep Merge
//!
//! Reconciles a partially specified override against a base value.
//!
//! - Two plain objects merge key by key, recursively.
//! - Keys present only in the override are added; keys absent from the
//!   override are kept from the base. The override never deletes keys.
//! - Arrays are atomic: an override array replaces the base array.
//! - Any other override value (scalar, `null`, array, or a type mismatch)
//!   replaces the base value.

use serde_json::Value;

/// Merge `overlay` onto `base`, returning a new value.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    let mut merged = base.clone();
    merge_into(&mut merged, overlay.clone());
    merged
}

/// Merge `overlay` into `target` in place.
pub fn merge_into(target: &mut Value, overlay: Value) {
    match (target, overlay) {
        (Value::Object(base), Value::Object(over)) => {
            for (key, value) in over {
                match base.get_mut(&key) {
                    Some(existing) => merge_into(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, other) => *slot = other,
    }
}
