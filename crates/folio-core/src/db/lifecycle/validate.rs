//! Coerce mutation input into schema-shaped fields.
//!
//! Input usually arrives through `Value::from_json`, which knows nothing
//! about relations: ids are text and nested objects are `Json`. This pass
//! turns them into references, morph variants, and embedded components.

use crate::{
    model::{
        AttributeKind, CREATED_AT, DOCUMENT_ID, DocumentType, PUBLISHED_AT, SchemaError,
        SchemaRegistry, ScalarKind, UPDATED_AT,
    },
    value::{
        COMPONENT_KEY, Document, DocumentId, Fields, MORPH_TYPE_KEY, Value, Variant, datetime,
    },
};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;
use ulid::Ulid;

const SYSTEM_ATTRIBUTES: [&str; 4] = [DOCUMENT_ID, CREATED_AT, UPDATED_AT, PUBLISHED_AT];

///
/// DataValidator
///

pub(crate) struct DataValidator<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> DataValidator<'a> {
    pub(crate) const fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Validate `data` for `doc_type`. `creating` enables required checks.
    pub(crate) fn validate(
        &self,
        doc_type: &DocumentType,
        data: Fields,
        creating: bool,
    ) -> Result<Fields, SchemaError> {
        let mut out = Fields::new();

        for (name, value) in data {
            if SYSTEM_ATTRIBUTES.contains(&name.as_str()) {
                continue;
            }
            let attribute = doc_type.try_attribute(&name)?;
            let value = self.coerce(doc_type, &name, &attribute.kind, value)?;
            out.insert(name, value);
        }

        if creating {
            for attribute in doc_type.attributes().iter().filter(|attr| attr.required) {
                if out.get(&attribute.name).is_none_or(Value::is_null) {
                    return Err(SchemaError::MissingField {
                        doc_type: doc_type.name().to_string(),
                        field: attribute.name.clone(),
                    });
                }
            }
        }

        Ok(out)
    }

    fn coerce(
        &self,
        doc_type: &DocumentType,
        field: &str,
        kind: &AttributeKind,
        value: Value,
    ) -> Result<Value, SchemaError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let invalid = |expected: &str, value: &Value| SchemaError::InvalidValue {
            doc_type: doc_type.name().to_string(),
            field: field.to_string(),
            expected: expected.to_string(),
            found: value.kind_label(),
        };

        match kind {
            AttributeKind::Scalar(scalar) => coerce_scalar(*scalar, value, invalid),

            AttributeKind::RelationOne { .. } => {
                reference(&value).map(Value::Ref).ok_or_else(|| invalid("document id", &value))
            }

            AttributeKind::RelationMany { .. } => {
                let Value::List(items) = value else {
                    return Err(invalid("list of document ids", &value));
                };
                items
                    .iter()
                    .map(|item| reference(item).map(Value::Ref).ok_or_else(|| invalid("document id", item)))
                    .collect::<Result<_, _>>()
                    .map(Value::List)
            }

            AttributeKind::Polymorphic { variants } => {
                each(value, &invalid, |item| {
                    let variant = morph_variant(&item).ok_or_else(|| {
                        invalid(&format!("object with '{MORPH_TYPE_KEY}' and '{DOCUMENT_ID}'"), &item)
                    })?;
                    check_tag(variants, &variant.tag, &invalid)?;

                    Ok(Value::variant(variant))
                })
            }

            AttributeKind::DynamicZone { variants } => {
                each(value, &invalid, |item| {
                    let component = self.component(variants, item, &invalid)?;

                    Ok(Value::variant(Variant::embedded(component)))
                })
            }
        }
    }

    // Component instances get a fresh id; their fields validate recursively.
    fn component(
        &self,
        variants: &BTreeSet<String>,
        item: Value,
        invalid: &impl Fn(&str, &Value) -> SchemaError,
    ) -> Result<Document, SchemaError> {
        let (tag, fields) = match item {
            Value::Variant(variant) => match *variant {
                Variant {
                    tag,
                    value: Value::Doc(document),
                } => (tag, document.into_fields()),
                other => return Err(invalid("component", &other.value)),
            },
            Value::Json(JsonValue::Object(ref map)) => {
                let Some(tag) = map.get(COMPONENT_KEY).and_then(JsonValue::as_str) else {
                    return Err(invalid(&format!("object with '{COMPONENT_KEY}'"), &item));
                };
                (tag.to_string(), component_fields(map))
            }
            other => return Err(invalid("component", &other)),
        };
        check_tag(variants, &tag, invalid)?;

        let component_type = self.registry.try_get(&tag)?;
        let fields = self.validate(component_type, fields, true)?;
        let mut document = Document::new(tag, DocumentId::from_ulid(Ulid::new()));
        *document.fields_mut() = fields;

        Ok(document)
    }
}

fn each(
    value: Value,
    invalid: &impl Fn(&str, &Value) -> SchemaError,
    f: impl FnMut(Value) -> Result<Value, SchemaError>,
) -> Result<Value, SchemaError> {
    let Value::List(items) = value else {
        return Err(invalid("list", &value));
    };

    items.into_iter().map(f).collect::<Result<_, _>>().map(Value::List)
}

#[expect(clippy::cast_precision_loss)]
fn coerce_scalar(
    kind: ScalarKind,
    value: Value,
    invalid: impl Fn(&str, &Value) -> SchemaError,
) -> Result<Value, SchemaError> {
    match (kind, value) {
        (ScalarKind::Json, value) => Ok(match value {
            Value::Json(json) => Value::Json(json),
            other => Value::Json(other.to_json()),
        }),
        (ScalarKind::Text, value @ Value::Text(_))
        | (ScalarKind::Integer, value @ Value::Int(_))
        | (ScalarKind::Float, value @ Value::Float(_))
        | (ScalarKind::Boolean, value @ Value::Bool(_)) => Ok(value),
        (ScalarKind::Float, Value::Int(int)) => Ok(Value::Float(int as f64)),
        (ScalarKind::DateTime, Value::Text(text)) if datetime::parse_millis(&text).is_some() => {
            Ok(Value::Text(text))
        }
        (kind, value) => Err(invalid(kind.label(), &value)),
    }
}

fn check_tag(
    variants: &BTreeSet<String>,
    tag: &str,
    invalid: &impl Fn(&str, &Value) -> SchemaError,
) -> Result<(), SchemaError> {
    if variants.contains(tag) {
        return Ok(());
    }
    let allowed: Vec<&str> = variants.iter().map(String::as_str).collect();

    Err(invalid(&format!("one of [{}]", allowed.join(", ")), &Value::text(tag)))
}

// Text ids, `{ "documentId": .. }` objects, bare refs, and populated docs.
fn reference(value: &Value) -> Option<DocumentId> {
    match value {
        Value::Text(id) => Some(DocumentId::new(id.clone())),
        Value::Ref(id) => Some(id.clone()),
        Value::Doc(document) => Some(document.id().clone()),
        Value::Json(JsonValue::Object(map)) => map
            .get(DOCUMENT_ID)
            .and_then(JsonValue::as_str)
            .map(DocumentId::from),
        _ => None,
    }
}

fn morph_variant(value: &Value) -> Option<Variant> {
    match value {
        Value::Variant(variant) => Some(Variant {
            tag: variant.tag.clone(),
            value: Value::Ref(reference(&variant.value)?),
        }),
        Value::Json(JsonValue::Object(map)) => {
            let tag = map.get(MORPH_TYPE_KEY).and_then(JsonValue::as_str)?;
            let id = map.get(DOCUMENT_ID).and_then(JsonValue::as_str)?;

            Some(Variant::reference(tag, id))
        }
        _ => None,
    }
}

fn component_fields(map: &Map<String, JsonValue>) -> Fields {
    map.iter()
        .filter(|(key, _)| key.as_str() != COMPONENT_KEY && key.as_str() != "id")
        .map(|(key, value)| (key.clone(), Value::from_json(value)))
        .collect()
}
