use crate::{
    model::{AttributeKind, DocumentType, SchemaError, TypeKind},
    value::Status,
};
use std::collections::{BTreeMap, BTreeSet};

///
/// SchemaRegistry
///
/// Read-only registry of every document and component type.
/// Built once at startup and shared behind an `Arc`.
///

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<String, DocumentType>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DocumentType> {
        self.types.get(name)
    }

    pub fn try_get(&self, name: &str) -> Result<&DocumentType, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    /// Resolve a collection type; components cannot be queried directly.
    pub fn try_collection(&self, name: &str) -> Result<&DocumentType, SchemaError> {
        let doc_type = self.try_get(name)?;
        if doc_type.kind() != TypeKind::Collection {
            return Err(SchemaError::UnknownType(name.to_string()));
        }

        Ok(doc_type)
    }

    /// Iterate registered types in name order.
    pub fn iter(&self) -> impl Iterator<Item = &DocumentType> {
        self.types.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl DocumentType {
    /// Normalize a requested status against this type's draft/publish support.
    ///
    /// Draft/publish types default to `Published`. Other types accept no
    /// status or `Published` (normalized to none); `Draft` is rejected.
    pub fn resolve_status(&self, status: Option<Status>) -> Result<Option<Status>, SchemaError> {
        if self.has_draft_and_publish() {
            return Ok(Some(status.unwrap_or(Status::Published)));
        }

        match status {
            None | Some(Status::Published) => Ok(None),
            Some(status) => Err(SchemaError::UnsupportedStatus {
                doc_type: self.name().to_string(),
                status: status.to_string(),
            }),
        }
    }
}

///
/// SchemaRegistryBuilder
///

#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    types: Vec<DocumentType>,
}

impl SchemaRegistryBuilder {
    #[must_use]
    pub fn register(mut self, doc_type: DocumentType) -> Self {
        self.types.push(doc_type);
        self
    }

    /// Validate cross-type references and freeze the registry.
    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut types = BTreeMap::new();
        for doc_type in self.types {
            let doc_type = doc_type.with_system_attributes();
            let name = doc_type.name().to_string();
            if types.contains_key(&name) {
                return Err(SchemaError::DuplicateType(name));
            }
            types.insert(name, doc_type);
        }

        for doc_type in types.values() {
            validate_type(&types, doc_type)?;
        }

        Ok(SchemaRegistry { types })
    }
}

fn validate_type(
    types: &BTreeMap<String, DocumentType>,
    doc_type: &DocumentType,
) -> Result<(), SchemaError> {
    let mut seen = BTreeSet::new();

    for attr in doc_type.attributes() {
        if !seen.insert(attr.name.as_str()) {
            return Err(SchemaError::DuplicateAttribute {
                doc_type: doc_type.name().to_string(),
                field: attr.name.clone(),
            });
        }

        let (targets, expected) = match &attr.kind {
            AttributeKind::Scalar(_) => continue,
            AttributeKind::RelationOne { target } | AttributeKind::RelationMany { target } => {
                (vec![target], TypeKind::Collection)
            }
            AttributeKind::Polymorphic { variants } => {
                (variants.iter().collect(), TypeKind::Collection)
            }
            AttributeKind::DynamicZone { variants } => {
                (variants.iter().collect(), TypeKind::Component)
            }
        };

        for target in targets {
            let found = types.get(target).map(DocumentType::kind);
            if found != Some(expected) {
                return Err(SchemaError::UnknownTarget {
                    doc_type: doc_type.name().to_string(),
                    field: attr.name.clone(),
                    target: target.clone(),
                    expected: match expected {
                        TypeKind::Collection => "collection",
                        TypeKind::Component => "component",
                    },
                });
            }
        }
    }

    for name in doc_type.variant_default_populate() {
        let attr = doc_type.try_attribute(name)?;
        if !attr.kind.is_populatable() {
            return Err(SchemaError::Definition(format!(
                "default populate entry '{name}' on '{}' is not a relation",
                doc_type.name()
            )));
        }
    }

    Ok(())
}
