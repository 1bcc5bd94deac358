//! Serialized schema definitions.
//!
//! Accepts a JSON document shaped like content-type schema files:
//! attribute `type` names (`string`, `relation`, `dynamiczone`, ...) and
//! relation kinds (`manyToOne`, `morphToMany`, ...). Morph relations must
//! list their permissible `targets`.

use crate::model::{
    AttributeDefinition, AttributeKind, DocumentType, SchemaError, SchemaRegistry, ScalarKind,
    TypeKind,
};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDef {
    types: Vec<TypeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TypeDef {
    name: String,
    #[serde(default)]
    kind: KindDef,
    #[serde(default)]
    draft_and_publish: bool,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeDef>,
    #[serde(default)]
    default_populate: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
enum KindDef {
    #[default]
    CollectionType,
    Component,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum AttributeDef {
    #[serde(alias = "text", alias = "richtext", alias = "email", alias = "uid")]
    #[serde(alias = "enumeration", alias = "password")]
    String {
        #[serde(default)]
        required: bool,
    },
    #[serde(alias = "biginteger")]
    Integer {
        #[serde(default)]
        required: bool,
    },
    #[serde(alias = "decimal")]
    Float {
        #[serde(default)]
        required: bool,
    },
    Boolean {
        #[serde(default)]
        required: bool,
    },
    #[serde(alias = "date", alias = "time", alias = "timestamp")]
    Datetime {
        #[serde(default)]
        required: bool,
    },
    Json {
        #[serde(default)]
        required: bool,
    },
    Relation {
        relation: RelationDef,
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        targets: Vec<String>,
        #[serde(default)]
        required: bool,
    },
    Dynamiczone {
        components: Vec<String>,
        #[serde(default)]
        required: bool,
    },
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
enum RelationDef {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
    MorphToOne,
    MorphToMany,
}

impl SchemaRegistry {
    /// Build a registry from a JSON schema document.
    pub fn from_json_str(input: &str) -> Result<Self, SchemaError> {
        let def: SchemaDef =
            serde_json::from_str(input).map_err(|err| SchemaError::Definition(err.to_string()))?;

        let mut builder = Self::builder();
        for type_def in def.types {
            builder = builder.register(type_def.into_document_type()?);
        }

        builder.build()
    }
}

impl TypeDef {
    fn into_document_type(self) -> Result<DocumentType, SchemaError> {
        let mut doc_type = match self.kind {
            KindDef::CollectionType => DocumentType::collection(&self.name),
            KindDef::Component => DocumentType::component(&self.name),
        };
        if self.draft_and_publish {
            if doc_type.kind() == TypeKind::Component {
                return Err(SchemaError::Definition(format!(
                    "component '{}' cannot enable draft and publish",
                    self.name
                )));
            }
            doc_type = doc_type.draft_and_publish();
        }

        for (name, attr) in self.attributes {
            let (kind, required) = attr.into_kind(&self.name, &name)?;
            let mut definition = AttributeDefinition::new(name, kind);
            definition.required = required;
            doc_type.attributes.push(definition);
        }

        Ok(doc_type.default_populate(self.default_populate))
    }
}

impl AttributeDef {
    fn into_kind(self, doc_type: &str, field: &str) -> Result<(AttributeKind, bool), SchemaError> {
        let scalar = |kind: ScalarKind, required: bool| -> Result<(AttributeKind, bool), SchemaError> {
            Ok((AttributeKind::Scalar(kind), required))
        };

        match self {
            Self::String { required } => scalar(ScalarKind::Text, required),
            Self::Integer { required } => scalar(ScalarKind::Integer, required),
            Self::Float { required } => scalar(ScalarKind::Float, required),
            Self::Boolean { required } => scalar(ScalarKind::Boolean, required),
            Self::Datetime { required } => scalar(ScalarKind::DateTime, required),
            Self::Json { required } => scalar(ScalarKind::Json, required),
            Self::Dynamiczone {
                components,
                required,
            } => Ok((AttributeKind::dynamic_zone(components), required)),
            Self::Relation {
                relation,
                target,
                targets,
                required,
            } => {
                let kind = match relation {
                    RelationDef::MorphToOne | RelationDef::MorphToMany => {
                        if targets.is_empty() {
                            return Err(missing(doc_type, field, "targets"));
                        }
                        AttributeKind::polymorphic(targets)
                    }
                    RelationDef::OneToOne | RelationDef::ManyToOne => {
                        AttributeKind::relation_one(target.ok_or_else(|| missing(doc_type, field, "target"))?)
                    }
                    RelationDef::OneToMany | RelationDef::ManyToMany => {
                        AttributeKind::relation_many(target.ok_or_else(|| missing(doc_type, field, "target"))?)
                    }
                };

                Ok((kind, required))
            }
        }
    }
}

fn missing(doc_type: &str, field: &str, key: &str) -> SchemaError {
    SchemaError::Definition(format!("relation '{doc_type}.{field}' is missing '{key}'"))
}
