// src/manifest/canonical.rs

//! Canonical form of manifest values
//!
//! Structural equality between two values is decided on a stable textual
//! form: map keys are sorted, so two maps holding the same fields in a
//! different order compare equal.

use super::value::Value;

/// Depth used for list and map comparisons
pub const CANONICAL_DEPTH: usize = 10;

/// Serialize a value into its canonical form, descending at most `depth`
/// levels into lists and maps
pub fn canonical_form(value: &Value, depth: usize) -> String {
    let mut out = String::new();
    write_canonical(value, depth, &mut out);
    out
}

fn write_canonical(value: &Value, depth: usize, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(&quote(s)),
        Value::Integer(i) => out.push_str(&i.to_string()),
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::List(_) | Value::Map(_) if depth == 0 => {
            // Too deep to descend; fall back to the variant name
            out.push_str(&quote(value.type_name()));
        }
        Value::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, depth - 1, out);
            }
            out.push(']');
        }
        Value::Map(map) => {
            let mut fields: Vec<(&str, &Value)> = map.iter().collect();
            fields.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in fields.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&quote(key));
                out.push(':');
                write_canonical(item, depth - 1, out);
            }
            out.push('}');
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// Structural equality: ordinal comparison for scalars, canonical form
/// comparison for lists and maps
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a.scalar_text(), b.scalar_text()) {
        (Some(a), Some(b)) => a == b,
        (None, None) => {
            canonical_form(a, CANONICAL_DEPTH) == canonical_form(b, CANONICAL_DEPTH)
        }
        _ => false,
    }
}

/// True when every value in the iterator is structurally equal to the first
pub fn all_equal<'a>(mut values: impl Iterator<Item = &'a Value>) -> bool {
    match values.next() {
        Some(first) => values.all(|value| structurally_equal(first, value)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::FieldMap;

    #[test]
    fn test_map_order_does_not_matter() {
        let mut a = FieldMap::new();
        a.insert("Silent", "/S");
        a.insert("Custom", "/norestart");
        let mut b = FieldMap::new();
        b.insert("Custom", "/norestart");
        b.insert("Silent", "/S");

        assert!(structurally_equal(&Value::Map(a), &Value::Map(b)));
    }

    #[test]
    fn test_list_order_matters() {
        let a = Value::List(vec!["a".into(), "b".into()]);
        let b = Value::List(vec!["b".into(), "a".into()]);
        assert!(!structurally_equal(&a, &b));
    }

    #[test]
    fn test_scalars_compare_ordinally() {
        assert!(structurally_equal(&Value::from("x64"), &Value::from("x64")));
        assert!(!structurally_equal(&Value::from("x64"), &Value::from("X64")));
        assert!(!structurally_equal(&Value::from("x64"), &Value::List(vec![])));
    }

    #[test]
    fn test_canonical_form_is_stable() {
        let mut map = FieldMap::new();
        map.insert("b", 1i64);
        map.insert("a", Value::List(vec![true.into()]));
        assert_eq!(canonical_form(&Value::Map(map), CANONICAL_DEPTH), r#"{"a":[true],"b":1}"#);
    }
}
