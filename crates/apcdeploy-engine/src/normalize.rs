//! Content Normalizer - canonical forms for configuration payloads
//!
//! Two payloads that differ only in formatting must normalize to the same
//! string, so a deployment is never triggered by key order, indentation or
//! line endings. For feature flag profiles the service-managed timestamps in
//! `values` are dropped as well.
//!
//! Normalization is idempotent: `normalize(normalize(x)) == normalize(x)`.

use crate::error::{EngineError, Result};
use apcdeploy_types::{ContentFormat, ProfileKind};

/// Keys the service maintains on each feature flag value
pub const FEATURE_FLAG_METADATA_KEYS: &[&str] = &["_createdAt", "_updatedAt"];

const BOM: char = '\u{feff}';

/// Canonicalize `content` for comparison.
pub fn normalize(content: &[u8], format: ContentFormat, kind: ProfileKind) -> Result<String> {
    let text = std::str::from_utf8(content).map_err(|e| EngineError::Parse {
        format,
        detail: format!("invalid UTF-8 at byte {}", e.valid_up_to()),
    })?;
    let text = text.strip_prefix(BOM).unwrap_or(text);

    match format {
        ContentFormat::Json => normalize_json(text, kind),
        ContentFormat::Yaml => normalize_yaml(text),
        ContentFormat::Text => Ok(normalize_line_endings(text)),
    }
}

fn normalize_json(text: &str, kind: ProfileKind) -> Result<String> {
    let mut value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| EngineError::Parse {
            format: ContentFormat::Json,
            detail: e.to_string(),
        })?;

    if kind == ProfileKind::FeatureFlags {
        strip_flag_metadata(&mut value);
    }

    let mut out = serde_json::to_string_pretty(&sort_json(value)).map_err(|e| {
        EngineError::Parse {
            format: ContentFormat::Json,
            detail: e.to_string(),
        }
    })?;
    out.push('\n');
    Ok(out)
}

/// Remove service-managed timestamps from each entry of `values`.
///
/// Flag definitions under `flags` keep every key.
fn strip_flag_metadata(value: &mut serde_json::Value) {
    let Some(serde_json::Value::Object(values)) = value.get_mut("values") else {
        return;
    };

    for entry in values.values_mut() {
        if let serde_json::Value::Object(fields) = entry {
            for key in FEATURE_FLAG_METADATA_KEYS {
                fields.remove(*key);
            }
        }
    }
}

/// Rebuild objects with keys inserted in lexicographic order.
///
/// Independent of whether `serde_json` preserves insertion order.
fn sort_json(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_json(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_json).collect()),
        other => other,
    }
}

fn normalize_yaml(text: &str) -> Result<String> {
    let text = normalize_line_endings(text);
    let value: serde_yaml::Value = serde_yaml::from_str(&text).map_err(|e| EngineError::Parse {
        format: ContentFormat::Yaml,
        detail: e.to_string(),
    })?;

    let out = serde_yaml::to_string(&sort_yaml(value)).map_err(|e| EngineError::Parse {
        format: ContentFormat::Yaml,
        detail: e.to_string(),
    })?;

    let mut out = normalize_line_endings(&out);
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn yaml_key(key: &serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other).unwrap_or_default(),
    }
}

fn sort_yaml(value: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::Value;

    match value {
        Value::Mapping(mapping) => {
            let mut entries: Vec<(Value, Value)> = mapping.into_iter().collect();
            entries.sort_by_cached_key(|(k, _)| yaml_key(k));
            Value::Mapping(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_yaml(v)))
                    .collect(),
            )
        }
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(sort_yaml).collect()),
        Value::Tagged(mut tagged) => {
            let inner = std::mem::replace(&mut tagged.value, Value::Null);
            tagged.value = sort_yaml(inner);
            Value::Tagged(tagged)
        }
        other => other,
    }
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn json(s: &str, kind: ProfileKind) -> String {
        normalize(s.as_bytes(), ContentFormat::Json, kind).unwrap()
    }

    fn yaml(s: &str) -> String {
        normalize(s.as_bytes(), ContentFormat::Yaml, ProfileKind::Freeform).unwrap()
    }

    #[test]
    fn test_json_sorted_and_indented() {
        let out = json(r#"{"b":1,"a":{"d":true,"c":[3,2]}}"#, ProfileKind::Freeform);
        assert_eq!(
            out,
            "{\n  \"a\": {\n    \"c\": [\n      3,\n      2\n    ],\n    \"d\": true\n  },\n  \"b\": 1\n}\n"
        );
    }

    #[test]
    fn test_json_key_order_insensitive() {
        let a = json(r#"{"x": 1, "y": {"p": "q", "r": "s"}}"#, ProfileKind::Freeform);
        let b = json("{\r\n  \"y\": {\"r\": \"s\", \"p\": \"q\"},\r\n  \"x\": 1\r\n}", ProfileKind::Freeform);
        assert_eq!(a, b);
    }

    #[test]
    fn test_feature_flag_timestamps_stripped_from_values_only() {
        let with_meta = r#"{
            "flags": {"beta": {"name": "beta", "_createdAt": "keep-me"}},
            "values": {"beta": {"enabled": true, "_createdAt": "2024-01-01T00:00:00Z", "_updatedAt": "2024-02-01T00:00:00Z"}},
            "version": "1"
        }"#;
        let without_meta = r#"{
            "version": "1",
            "values": {"beta": {"enabled": true}},
            "flags": {"beta": {"_createdAt": "keep-me", "name": "beta"}}
        }"#;

        let a = json(with_meta, ProfileKind::FeatureFlags);
        let b = json(without_meta, ProfileKind::FeatureFlags);
        assert_eq!(a, b);
        assert!(a.contains("keep-me"));
        assert!(!a.contains("_updatedAt"));
    }

    #[test]
    fn test_freeform_keeps_timestamps() {
        let out = json(
            r#"{"values": {"beta": {"_createdAt": "2024-01-01"}}}"#,
            ProfileKind::Freeform,
        );
        assert!(out.contains("_createdAt"));
    }

    #[test]
    fn test_json_parse_error_has_position() {
        let err = normalize(b"{\n  \"a\": 1,\n  oops\n}", ContentFormat::Json, ProfileKind::Freeform)
            .unwrap_err();
        match err {
            EngineError::Parse { format, detail } => {
                assert_eq!(format, ContentFormat::Json);
                assert!(detail.contains("line 3"), "detail was {detail}");
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_yaml_sorted() {
        let a = yaml("b: 1\na:\n  z: [1, 2]\n  y: text\n");
        let b = yaml("a:\n  y: text\n  z:\n    - 1\n    - 2\nb: 1\n");
        assert_eq!(a, b);
        assert!(a.starts_with("a:"));
        assert!(a.ends_with('\n'));
    }

    #[test]
    fn test_yaml_crlf() {
        assert_eq!(yaml("a: 1\r\nb: 2\r\n"), yaml("b: 2\na: 1\n"));
    }

    #[test]
    fn test_yaml_parse_error() {
        let err = normalize(b"a: [1, 2\nb: 3", ContentFormat::Yaml, ProfileKind::Freeform)
            .unwrap_err();
        assert!(matches!(err, EngineError::Parse { format: ContentFormat::Yaml, .. }));
    }

    #[test]
    fn test_text_line_endings_only() {
        let out = normalize(b"b=2\r\na=1\r\n", ContentFormat::Text, ProfileKind::Freeform).unwrap();
        assert_eq!(out, "b=2\na=1\n");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = normalize(&[0x61, 0xff, 0x62], ContentFormat::Text, ProfileKind::Freeform)
            .unwrap_err();
        assert!(matches!(err, EngineError::Parse { ref detail, .. } if detail.contains("byte 1")));
    }

    #[test]
    fn test_bom_ignored() {
        let with_bom = "\u{feff}{\"a\": 1}";
        assert_eq!(json(with_bom, ProfileKind::Freeform), json("{\"a\":1}", ProfileKind::Freeform));
    }

    fn json_value() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            "[a-z][a-z0-9_]{0,10}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(4, 32, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(serde_json::Value::Array),
                prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    /// Serialize an object with its keys in reverse order
    fn reversed_json(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                keys.reverse();
                let body: Vec<String> = keys
                    .into_iter()
                    .map(|k| format!("{}:{}", serde_json::to_string(k).unwrap(), reversed_json(&map[k])))
                    .collect();
                format!("{{{}}}", body.join(","))
            }
            serde_json::Value::Array(items) => {
                let body: Vec<String> = items.iter().map(reversed_json).collect();
                format!("[{}]", body.join(","))
            }
            other => other.to_string(),
        }
    }

    proptest! {
        #[test]
        fn prop_json_idempotent(value in json_value(), kind in prop_oneof![Just(ProfileKind::Freeform), Just(ProfileKind::FeatureFlags)]) {
            let once = normalize(value.to_string().as_bytes(), ContentFormat::Json, kind).unwrap();
            let twice = normalize(once.as_bytes(), ContentFormat::Json, kind).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_json_key_order_insensitive(value in json_value()) {
            let a = normalize(value.to_string().as_bytes(), ContentFormat::Json, ProfileKind::Freeform).unwrap();
            let b = normalize(reversed_json(&value).as_bytes(), ContentFormat::Json, ProfileKind::Freeform).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_yaml_idempotent(value in json_value()) {
            let source = serde_yaml::to_string(&value).unwrap();
            let once = normalize(source.as_bytes(), ContentFormat::Yaml, ProfileKind::Freeform).unwrap();
            let twice = normalize(once.as_bytes(), ContentFormat::Yaml, ProfileKind::Freeform).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_feature_flag_timestamps_ignored(
            flags in prop::collection::btree_map("[a-z]{1,6}", any::<bool>(), 1..5),
            stamp in "[0-9TZ:-]{10,20}",
        ) {
            let plain: serde_json::Map<String, serde_json::Value> = flags
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!({ "enabled": v })))
                .collect();
            let stamped: serde_json::Map<String, serde_json::Value> = flags
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::json!({ "enabled": v, "_createdAt": &stamp, "_updatedAt": &stamp })))
                .collect();
            let a = serde_json::json!({ "values": plain, "version": "1" }).to_string();
            let b = serde_json::json!({ "values": stamped, "version": "1" }).to_string();
            prop_assert_eq!(
                normalize(a.as_bytes(), ContentFormat::Json, ProfileKind::FeatureFlags).unwrap(),
                normalize(b.as_bytes(), ContentFormat::Json, ProfileKind::FeatureFlags).unwrap()
            );
        }
    }
}
