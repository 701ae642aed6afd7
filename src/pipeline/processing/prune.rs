use serde_json::Value;

use crate::domain::Entity;

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Drops map entries whose value is null, `""`, `[]` or `{}`. Children are
/// pruned before their parent is checked, so a map that only held empty
/// values disappears too and a second pass changes nothing. `false` and
/// list items are always kept.
pub fn remove_key_with_null_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                remove_key_with_null_value(child);
            }
            map.retain(|_, child| !is_empty_value(child));
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                remove_key_with_null_value(item);
            }
        }
        _ => {}
    }
}

/// One output line for the entity's sink
pub fn to_pruned_json_line(entity: &Entity) -> serde_json::Result<String> {
    let mut value = entity.to_json_value()?;
    remove_key_with_null_value(&mut value);
    serde_json::to_string(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_removes_empty_values_and_keeps_false() {
        let mut value = json!({
            "a": null,
            "b": "",
            "c": [],
            "d": {},
            "e": false,
            "f": 0,
            "g": "x"
        });
        remove_key_with_null_value(&mut value);
        assert_eq!(value, json!({"e": false, "f": 0, "g": "x"}));
    }

    #[test]
    fn test_nested_values_are_pruned_first() {
        let mut value = json!({
            "outer": {"inner": null},
            "list": [{"a": null, "b": 1}, {"a": ""}],
            "keep": {"x": true}
        });
        remove_key_with_null_value(&mut value);
        assert_eq!(
            value,
            json!({"list": [{"b": 1}, {}], "keep": {"x": true}})
        );
    }

    #[test]
    fn test_idempotent() {
        let mut value = json!({
            "outer": {"inner": {"deep": ""}},
            "list": [{"a": null}],
            "name": "n"
        });
        remove_key_with_null_value(&mut value);
        let once = value.clone();
        remove_key_with_null_value(&mut value);
        assert_eq!(value, once);
    }

    #[test]
    fn test_preserves_key_order() {
        let mut value = json!({"z": 1, "a": null, "m": 2});
        remove_key_with_null_value(&mut value);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"z":1,"m":2}"#);
    }
}
