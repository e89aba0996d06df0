//! Mapping - Translate models to and from stored field-maps.
//!
//! Encoding serializes a model through serde_json and requires the result to
//! be map-shaped. Decoding injects the store-assigned primary identifier
//! under `"id"` when the stored fields lack that key, then deserializes with
//! the same date rules used on the way in.

use serde_json::Value;

use crate::document::{FieldMap, ID_KEY};
use crate::model::Model;
use crate::repository::RepositoryError;

/// Encode a model as a field-map.
///
/// A null `id` entry (a model with `id: None` that does not skip serializing
/// it) is stripped, so "the payload carries an identifier" always means a
/// concrete value.
pub fn encode<M: Model>(model: &M) -> Result<FieldMap, RepositoryError> {
    let value = serde_json::to_value(model).map_err(|e| RepositoryError::Encode {
        collection: M::COLLECTION.to_string(),
        message: e.to_string(),
    })?;

    let mut fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(RepositoryError::Encode {
                collection: M::COLLECTION.to_string(),
                message: format!("model serialized to {} instead of a field-map", kind(&other)),
            })
        }
    };

    if fields.get(ID_KEY) == Some(&Value::Null) {
        fields.remove(ID_KEY);
    }

    Ok(fields)
}

/// Decode a stored document into a model.
///
/// The store-assigned identifier is injected under `"id"` only when the
/// stored fields lack that key; an `id` field already present in the
/// document wins.
pub fn decode<M: Model>(id: &str, mut fields: FieldMap) -> Result<M, RepositoryError> {
    fields
        .entry(ID_KEY)
        .or_insert_with(|| Value::String(id.to_string()));

    serde_json::from_value(Value::Object(fields)).map_err(|e| RepositoryError::Decode {
        collection: M::COLLECTION.to_string(),
        id: id.to_string(),
        message: e.to_string(),
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a field-map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        sensor: String,
        value: f64,
        #[serde(with = "crate::document::datetime")]
        taken_at: DateTime<Utc>,
    }

    impl Model for Reading {
        const COLLECTION: &'static str = "readings";
        const SECONDARY_ID_KEY: &'static str = "sensor";
    }

    // Serializes to a bare string, not a map.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(transparent)]
    struct Opaque(String);

    impl Model for Opaque {
        const COLLECTION: &'static str = "opaques";
        const SECONDARY_ID_KEY: &'static str = "name";
    }

    fn reading() -> Reading {
        Reading {
            id: None,
            sensor: "s-1".into(),
            value: 21.5,
            taken_at: Utc.with_ymd_and_hms(2024, 3, 9, 17, 30, 5).unwrap()
                + chrono::Duration::milliseconds(123),
        }
    }

    #[test]
    fn encode_then_decode_preserves_fields() {
        let original = reading();
        let fields = encode(&original).unwrap();
        let decoded: Reading = decode("doc-1", fields).unwrap();

        assert_eq!(decoded.id.as_deref(), Some("doc-1"));
        assert_eq!(decoded.sensor, original.sensor);
        assert_eq!(decoded.value, original.value);
        assert_eq!(decoded.taken_at, original.taken_at);
    }

    #[test]
    fn encode_keeps_dates_in_wire_format() {
        let fields = encode(&reading()).unwrap();
        assert_eq!(fields["taken_at"], json!("2024-03-09T17:30:05.123Z"));
    }

    #[test]
    fn encode_strips_null_id() {
        #[derive(Clone, Serialize, Deserialize)]
        struct Sparse {
            id: Option<String>,
            name: String,
        }

        impl Model for Sparse {
            const COLLECTION: &'static str = "sparse";
            const SECONDARY_ID_KEY: &'static str = "name";
        }

        let fields = encode(&Sparse {
            id: None,
            name: "a".into(),
        })
        .unwrap();
        assert!(!fields.contains_key(ID_KEY));
    }

    #[test]
    fn encode_rejects_non_map_models() {
        let err = encode(&Opaque("nope".into())).unwrap_err();
        assert!(matches!(err, RepositoryError::Encode { .. }));
    }

    #[test]
    fn decode_injects_store_id() {
        let mut fields = FieldMap::new();
        fields.insert("sensor".into(), json!("s-1"));
        fields.insert("value".into(), json!(1.0));
        fields.insert("taken_at".into(), json!("2024-03-09T17:30:05.123Z"));

        let decoded: Reading = decode("doc-9", fields).unwrap();
        assert_eq!(decoded.id.as_deref(), Some("doc-9"));
    }

    #[test]
    fn decode_keeps_explicit_stored_id() {
        let mut fields = FieldMap::new();
        fields.insert(ID_KEY.into(), json!("explicit"));
        fields.insert("sensor".into(), json!("s-1"));
        fields.insert("value".into(), json!(1.0));
        fields.insert("taken_at".into(), json!("2024-03-09T17:30:05.123Z"));

        let decoded: Reading = decode("doc-9", fields).unwrap();
        assert_eq!(decoded.id.as_deref(), Some("explicit"));
    }

    #[test]
    fn decode_fails_on_missing_required_field() {
        let mut fields = FieldMap::new();
        fields.insert("sensor".into(), json!("s-1"));

        let err = decode::<Reading>("doc-1", fields).unwrap_err();
        assert!(matches!(err, RepositoryError::Decode { .. }));
    }

    #[test]
    fn decode_fails_on_mistyped_field() {
        let mut fields = FieldMap::new();
        fields.insert("sensor".into(), json!("s-1"));
        fields.insert("value".into(), json!("not a number"));
        fields.insert("taken_at".into(), json!("2024-03-09T17:30:05.123Z"));

        let err = decode::<Reading>("doc-1", fields).unwrap_err();
        assert!(matches!(err, RepositoryError::Decode { .. }));
    }
}
