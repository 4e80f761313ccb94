use serde_json::Value;
use std::collections::BTreeMap;

/// Reserved attribute names and their non-colliding replacements.
///
/// The left column enumerates every name [`LogRecord`] serializes for
/// itself plus the compat names (`asctime`, `filename`, `levelname`,
/// `lineno`) older record formats reserve. A caller-supplied extra
/// field with one of these names is renamed to the right column before
/// it is attached to a record.
///
/// The table is process-wide, read-only configuration data; it is
/// never mutated at runtime and needs no synchronization.
///
/// [`LogRecord`]: crate::record::LogRecord
pub const RESERVED_FIELDS: &[(&str, &str)] = &[
    ("message", "log_message"),
    ("asctime", "log_asctime"),
    ("timestamp", "log_timestamp"),
    ("level", "log_level"),
    ("levelname", "log_levelname"),
    ("name", "log_name"),
    ("target", "log_target"),
    ("module", "log_module"),
    ("module_path", "log_module_path"),
    ("file", "log_file"),
    ("filename", "log_filename"),
    ("line", "log_line"),
    ("lineno", "log_lineno"),
    ("fields", "log_fields"),
    ("service_name", "log_service_name"),
];

/// Look up the replacement name for a reserved key, if any.
pub fn sanitize_key(key: &str) -> Option<&'static str> {
    RESERVED_FIELDS
        .iter()
        .find(|(reserved, _)| *reserved == key)
        .map(|(_, replacement)| *replacement)
}

/// Rewrite a caller-supplied extra value so none of its keys collide
/// with reserved record attributes.
///
/// **Behavior**
/// - Non-object input (string, array, number, bool, null) is returned
///   unchanged; protecting dictionary-shaped input is the only job of
///   this layer, and the record constructor reports its own error for
///   anything it cannot merge.
/// - An empty object is returned unchanged.
/// - A non-empty object is rebuilt with reserved top-level keys
///   replaced by their sanitized names. Values are carried over
///   untouched, including `null`, `0`, `false`, the empty string, and
///   nested objects or arrays; sanitization never recurses into
///   nested values.
///
/// When two input keys sanitize to the same output key (the caller
/// supplied both `message` and `log_message`), the later key in the
/// object's iteration order wins.
///
/// The caller's value is never mutated.
pub fn sanitize_extra(extra: &Value) -> Value {
    match extra {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                match sanitize_key(key) {
                    Some(replacement) => out.insert(replacement.to_string(), value.clone()),
                    None => out.insert(key.clone(), value.clone()),
                };
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

/// Sanitize an already-typed field map.
///
/// Same rules as [`sanitize_extra`], used on the `tracing` bridge path
/// where event fields arrive as a `BTreeMap` straight from the visitor.
pub fn sanitize_fields(fields: BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| match sanitize_key(&key) {
            Some(replacement) => (replacement.to_string(), value),
            None => (key, value),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_object_values_pass_through() {
        for value in [
            json!("not a dict"),
            json!([1, 2, 3]),
            json!(42),
            json!(true),
            json!(3.14),
            Value::Null,
        ] {
            assert_eq!(sanitize_extra(&value), value);
        }
    }

    #[test]
    fn empty_object_passes_through() {
        let empty = json!({});
        assert_eq!(sanitize_extra(&empty), empty);
    }

    #[test]
    fn reserved_keys_are_renamed() {
        let extra = json!({"message": "x", "bucket": "b"});
        let sanitized = sanitize_extra(&extra);
        assert_eq!(sanitized, json!({"log_message": "x", "bucket": "b"}));
    }

    #[test]
    fn both_reserved_keys_renamed_together() {
        let extra = json!({"message": "m", "asctime": "2024-01-01", "custom": "value"});
        let sanitized = sanitize_extra(&extra);
        assert_eq!(
            sanitized,
            json!({"log_message": "m", "log_asctime": "2024-01-01", "custom": "value"})
        );
    }

    #[test]
    fn falsy_values_are_preserved_exactly() {
        let extra = json!({
            "message": null,
            "asctime": "",
            "count": 0,
            "flag": false
        });
        let sanitized = sanitize_extra(&extra);
        assert_eq!(sanitized["log_message"], Value::Null);
        assert_eq!(sanitized["log_asctime"], json!(""));
        assert_eq!(sanitized["count"], json!(0));
        assert_eq!(sanitized["flag"], json!(false));
    }

    #[test]
    fn sanitization_is_shallow() {
        let extra = json!({"nested": {"asctime": "inner", "message": "inner"}});
        let sanitized = sanitize_extra(&extra);
        // Nested keys are values, not record attributes.
        assert_eq!(sanitized["nested"]["asctime"], json!("inner"));
        assert_eq!(sanitized["nested"]["message"], json!("inner"));
    }

    #[test]
    fn caller_value_is_not_mutated() {
        let extra = json!({"message": "x", "filename": "f"});
        let before = extra.clone();
        let _ = sanitize_extra(&extra);
        assert_eq!(extra, before);
    }

    #[test]
    fn colliding_keys_resolve_to_last_in_order() {
        // "log_message" sorts before "message" in the map, so the
        // renamed "message" lands second and wins.
        let extra = json!({"log_message": "already", "message": "renamed"});
        let sanitized = sanitize_extra(&extra);
        assert_eq!(sanitized, json!({"log_message": "renamed"}));
    }

    #[test]
    fn unreserved_keys_survive_untouched() {
        let extra = json!({"user_id": 123, "action": "login", "测试": "unicode"});
        assert_eq!(sanitize_extra(&extra), extra);
    }

    #[test]
    fn typed_field_maps_are_sanitized() {
        let mut fields = BTreeMap::new();
        fields.insert("filename".to_string(), json!("data.csv"));
        fields.insert("size".to_string(), json!(1024));

        let sanitized = sanitize_fields(fields);
        assert_eq!(sanitized.get("log_filename"), Some(&json!("data.csv")));
        assert_eq!(sanitized.get("size"), Some(&json!(1024)));
        assert!(!sanitized.contains_key("filename"));
    }

    #[test]
    fn sanitized_names_are_not_themselves_reserved() {
        // A second pass over already-sanitized output is a no-op.
        for (_, replacement) in RESERVED_FIELDS {
            assert!(sanitize_key(replacement).is_none());
        }
    }
}
