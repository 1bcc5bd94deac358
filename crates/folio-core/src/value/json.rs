//! JSON conversions for values and documents.
//!
//! `to_json` produces the response shape handed to transport layers;
//! `from_json` is schema-agnostic and never produces references (the
//! lifecycle data validator coerces text ids into references).

use crate::{
    model::DOCUMENT_ID,
    value::{Document, Value},
};
use serde_json::{Map, Number, Value as JsonValue};

/// Key carrying the variant tag of a dynamic-zone instance.
pub const COMPONENT_KEY: &str = "__component";

/// Key carrying the variant tag of a polymorphic relation instance.
pub const MORPH_TYPE_KEY: &str = "__type";

impl Value {
    /// Convert a JSON value into a schema-agnostic `Value`.
    #[must_use]
    pub fn from_json(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or(Self::Null),
            JsonValue::String(s) => Self::Text(s.clone()),
            JsonValue::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            JsonValue::Object(_) => Self::Json(json.clone()),
        }
    }

    /// Render this value in response shape.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::Number(Number::from(*i)),
            Self::Float(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
            Self::Text(s) => JsonValue::String(s.clone()),
            Self::Json(json) => json.clone(),
            Self::List(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
            Self::Ref(id) => {
                let mut map = Map::new();
                map.insert(DOCUMENT_ID.to_string(), JsonValue::String(id.to_string()));
                JsonValue::Object(map)
            }
            Self::Doc(document) => document.to_json(),
            Self::Variant(variant) => {
                let mut rendered = match variant.value.to_json() {
                    JsonValue::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("value".to_string(), other);
                        map
                    }
                };
                let key = match variant.value {
                    Self::Doc(_) => COMPONENT_KEY,
                    _ => MORPH_TYPE_KEY,
                };
                rendered.insert(key.to_string(), JsonValue::String(variant.tag.clone()));
                JsonValue::Object(rendered)
            }
        }
    }
}

impl Document {
    /// Render the document as a JSON object with `documentId` and `status`.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        map.insert(
            DOCUMENT_ID.to_string(),
            JsonValue::String(self.id().to_string()),
        );
        if let Some(status) = self.status() {
            map.insert(
                "status".to_string(),
                JsonValue::String(status.as_str().to_string()),
            );
        }
        for (name, value) in self.fields() {
            map.insert(name.clone(), value.to_json());
        }

        JsonValue::Object(map)
    }
}
