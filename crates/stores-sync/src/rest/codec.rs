//! # Document REST Wire Codec
//!
//! Typed field values as the document REST API encodes them.
//!
//! ## Mapping
//! ```text
//! JSON value        wire value
//! ───────────────   ─────────────────────────────────────
//! null              { "nullValue": null }
//! true / false      { "booleanValue": true }
//! 12                { "integerValue": "12" }     (string!)
//! 1.5               { "doubleValue": 1.5 }
//! "abc"             { "stringValue": "abc" }
//! [..]              { "arrayValue": { "values": [..] } }
//! {..}              { "mapValue": { "fields": {..} } }
//!
//! decode also accepts { "timestampValue": "..." } → string
//! ```
//!
//! A document on the wire is `{ "name": ".../documents/<collection>/<id>",
//! "fields": { ... } }`; the id is the last path segment of `name`.

use serde_json::{json, Map, Number, Value};

use stores_db::JsonMap;

use crate::document::Document;
use crate::error::{AccessError, AccessResult};

// =============================================================================
// Encoding
// =============================================================================

/// Encodes one JSON value as a wire value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                json!({ "integerValue": u.to_string() })
            } else {
                let f = n.as_f64().unwrap_or(0.0);
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    json!({ "integerValue": (f as i64).to_string() })
                } else {
                    json!({ "doubleValue": f })
                }
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encodes a document body as a wire `fields` object.
pub fn encode_fields(fields: &JsonMap) -> Value {
    let encoded: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect();
    Value::Object(encoded)
}

/// Request body for create / set / update.
pub fn encode_body(fields: &JsonMap) -> Value {
    json!({ "fields": encode_fields(fields) })
}

// =============================================================================
// Decoding
// =============================================================================

/// Decodes one wire value. Unknown tags decode to null.
pub fn decode_value(wire: &Value) -> Value {
    let Some(tagged) = wire.as_object() else {
        return Value::Null;
    };

    if let Some(s) = tagged.get("stringValue") {
        return s.clone();
    }
    if let Some(i) = tagged.get("integerValue") {
        return match i {
            Value::String(s) => s
                .parse::<i64>()
                .map(|n| Value::Number(n.into()))
                .unwrap_or(Value::Null),
            Value::Number(_) => i.clone(),
            _ => Value::Null,
        };
    }
    if let Some(d) = tagged.get("doubleValue") {
        return d
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Some(b) = tagged.get("booleanValue") {
        return b.clone();
    }
    if let Some(t) = tagged.get("timestampValue") {
        return t.clone();
    }
    if tagged.contains_key("nullValue") {
        return Value::Null;
    }
    if let Some(array) = tagged.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|vs| vs.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(map) = tagged.get("mapValue") {
        return Value::Object(decode_fields(map.get("fields")));
    }
    Value::Null
}

/// Decodes a wire `fields` object. Missing fields decode to an empty body.
pub fn decode_fields(fields: Option<&Value>) -> JsonMap {
    fields
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Decodes a wire document.
pub fn decode_document(wire: &Value) -> AccessResult<Document> {
    let name = wire
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| AccessError::Decode("document without a name".to_string()))?;

    let id = name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AccessError::Decode(format!("bad document name: {}", name)))?;

    Ok(Document::new(id, decode_fields(wire.get("fields"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_encoding_is_stringly() {
        assert_eq!(encode_value(&json!(12)), json!({"integerValue": "12"}));
        assert_eq!(encode_value(&json!(12.0)), json!({"integerValue": "12"}));
        assert_eq!(encode_value(&json!(1.5)), json!({"doubleValue": 1.5}));
    }

    #[test]
    fn test_decode_document_takes_id_from_name() {
        let wire = json!({
            "name": "projects/p/databases/(default)/documents/items/abc123",
            "fields": {
                "name": {"stringValue": "Claw Hammer 16oz"},
                "stock": {"integerValue": "5"},
                "createdAt": {"timestampValue": "2024-05-01T09:30:00Z"},
                "tags": {"arrayValue": {}},
                "dims": {"mapValue": {"fields": {"w": {"doubleValue": 2.5}}}},
                "gone": {"nullValue": null},
                "where": {"geoPointValue": {"latitude": 1.0}}
            }
        });

        let doc = decode_document(&wire).unwrap();
        assert_eq!(doc.id, "abc123");
        assert_eq!(doc.fields["stock"], json!(5));
        assert_eq!(doc.fields["createdAt"], json!("2024-05-01T09:30:00Z"));
        assert_eq!(doc.fields["tags"], json!([]));
        assert_eq!(doc.fields["dims"], json!({"w": 2.5}));
        assert_eq!(doc.fields["gone"], Value::Null);
        assert_eq!(doc.fields["where"], Value::Null);
    }

    #[test]
    fn test_decode_document_without_fields() {
        let doc = decode_document(&json!({"name": "x/documents/categories/C1"})).unwrap();
        assert_eq!(doc.id, "C1");
        assert!(doc.fields.is_empty());

        assert!(decode_document(&json!({"fields": {}})).is_err());
    }

    #[test]
    fn test_nested_values_survive_the_wire() {
        let body = match json!({"type": "OUT", "quantity": 3, "meta": {"notes": [true, null]}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let wire = encode_body(&body);
        assert_eq!(decode_fields(wire.get("fields")), body);
    }
}
