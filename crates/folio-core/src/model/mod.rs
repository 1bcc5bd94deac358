//! Module: model
//! Responsibility: document-type and attribute metadata (the schema registry).
//! Does not own: document values, predicate compilation, or storage.
//! Boundary: every other component reads schema through `SchemaRegistry`.

mod def;
mod registry;


use std::{collections::BTreeSet, fmt};
use thiserror::Error as ThisError;

pub use registry::{SchemaRegistry, SchemaRegistryBuilder};

///
/// CONSTANTS
///

/// System attribute carrying the document identifier.
pub const DOCUMENT_ID: &str = "documentId";

/// System attribute set when a document is created.
pub const CREATED_AT: &str = "createdAt";

/// System attribute set on every write.
pub const UPDATED_AT: &str = "updatedAt";

/// System attribute set on draft/publish types when a document is published.
pub const PUBLISHED_AT: &str = "publishedAt";

///
/// SchemaError
///
/// Unknown type, field, or attribute; malformed schema definitions.
/// Always a caller (or deployment) bug; never retried.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum SchemaError {
    #[error("unknown document type '{0}'")]
    UnknownType(String),

    #[error("unknown field '{field}' on '{doc_type}'")]
    UnknownField { doc_type: String, field: String },

    #[error("field '{field}' on '{doc_type}' is {kind} and cannot be traversed")]
    NotTraversable {
        doc_type: String,
        field: String,
        kind: &'static str,
    },

    #[error("field '{field}' on '{doc_type}' is {kind} and cannot be sorted on")]
    NotSortable {
        doc_type: String,
        field: String,
        kind: &'static str,
    },

    #[error("'{doc_type}' does not support status '{status}'")]
    UnsupportedStatus { doc_type: String, status: String },

    #[error("'{doc_type}' does not support draft and publish")]
    DraftPublishDisabled { doc_type: String },

    #[error("invalid value for '{doc_type}.{field}': expected {expected}, found {found}")]
    InvalidValue {
        doc_type: String,
        field: String,
        expected: String,
        found: &'static str,
    },

    #[error("missing required field '{field}' on '{doc_type}'")]
    MissingField { doc_type: String, field: String },

    #[error("document type '{0}' registered twice")]
    DuplicateType(String),

    #[error("attribute '{field}' declared twice on '{doc_type}'")]
    DuplicateAttribute { doc_type: String, field: String },

    #[error("'{doc_type}.{field}' targets unknown {expected} '{target}'")]
    UnknownTarget {
        doc_type: String,
        field: String,
        target: String,
        expected: &'static str,
    },

    #[error("invalid schema definition: {0}")]
    Definition(String),
}

///
/// ScalarKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ScalarKind {
    Text,
    Integer,
    Float,
    Boolean,
    DateTime,
    Json,
}

impl ScalarKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::DateTime => "datetime",
            Self::Json => "json",
        }
    }

    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Float)
    }

    #[must_use]
    pub const fn is_orderable(self) -> bool {
        matches!(self, Self::Text | Self::Integer | Self::Float | Self::DateTime)
    }
}

///
/// Cardinality
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Cardinality {
    One,
    Many,
}

///
/// AttributeKind
///
/// Polymorphic and dynamic-zone kinds carry a closed variant set instead of
/// a target type.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttributeKind {
    Scalar(ScalarKind),
    RelationOne { target: String },
    RelationMany { target: String },
    Polymorphic { variants: BTreeSet<String> },
    DynamicZone { variants: BTreeSet<String> },
}

impl AttributeKind {
    #[must_use]
    pub const fn text() -> Self {
        Self::Scalar(ScalarKind::Text)
    }

    #[must_use]
    pub const fn integer() -> Self {
        Self::Scalar(ScalarKind::Integer)
    }

    #[must_use]
    pub const fn float() -> Self {
        Self::Scalar(ScalarKind::Float)
    }

    #[must_use]
    pub const fn boolean() -> Self {
        Self::Scalar(ScalarKind::Boolean)
    }

    #[must_use]
    pub const fn datetime() -> Self {
        Self::Scalar(ScalarKind::DateTime)
    }

    #[must_use]
    pub const fn json() -> Self {
        Self::Scalar(ScalarKind::Json)
    }

    #[must_use]
    pub fn relation_one(target: impl Into<String>) -> Self {
        Self::RelationOne {
            target: target.into(),
        }
    }

    #[must_use]
    pub fn relation_many(target: impl Into<String>) -> Self {
        Self::RelationMany {
            target: target.into(),
        }
    }

    #[must_use]
    pub fn polymorphic<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Polymorphic {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn dynamic_zone<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::DynamicZone {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Scalar(kind) => kind.label(),
            Self::RelationOne { .. } => "relation-one",
            Self::RelationMany { .. } => "relation-many",
            Self::Polymorphic { .. } => "polymorphic-relation",
            Self::DynamicZone { .. } => "dynamic-zone",
        }
    }

    #[must_use]
    pub const fn scalar(&self) -> Option<ScalarKind> {
        match self {
            Self::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// True for every kind the population resolver can expand.
    #[must_use]
    pub const fn is_populatable(&self) -> bool {
        !matches!(self, Self::Scalar(_))
    }

    /// Fixed target type for monomorphic relations.
    #[must_use]
    pub fn relation_target(&self) -> Option<&str> {
        match self {
            Self::RelationOne { target } | Self::RelationMany { target } => Some(target),
            _ => None,
        }
    }

    /// Permissible variants for polymorphic kinds.
    #[must_use]
    pub const fn variants(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Polymorphic { variants } | Self::DynamicZone { variants } => Some(variants),
            _ => None,
        }
    }

    #[must_use]
    pub const fn cardinality(&self) -> Option<Cardinality> {
        match self {
            Self::Scalar(_) => None,
            Self::RelationOne { .. } => Some(Cardinality::One),
            Self::RelationMany { .. } | Self::Polymorphic { .. } | Self::DynamicZone { .. } => {
                Some(Cardinality::Many)
            }
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// AttributeDefinition
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeDefinition {
    pub name: String,
    pub kind: AttributeKind,
    pub required: bool,
}

impl AttributeDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }
}

///
/// TypeKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TypeKind {
    /// Top-level document type stored by the adapter.
    Collection,
    /// Embedded shape used as a dynamic-zone variant.
    Component,
}

///
/// DocumentType
///
/// Immutable once the registry is built.
///

#[derive(Clone, Debug)]
pub struct DocumentType {
    name: String,
    kind: TypeKind,
    draft_and_publish: bool,
    attributes: Vec<AttributeDefinition>,
    default_populate: Vec<String>,
}

impl DocumentType {
    /// Start a collection type; system attributes are appended on build.
    #[must_use]
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Collection,
            draft_and_publish: false,
            attributes: Vec::new(),
            default_populate: Vec::new(),
        }
    }

    #[must_use]
    pub fn component(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Component,
            ..Self::collection(name)
        }
    }

    #[must_use]
    pub const fn draft_and_publish(mut self) -> Self {
        self.draft_and_publish = true;
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        self.attributes.push(AttributeDefinition::new(name, kind));
        self
    }

    #[must_use]
    pub fn required(mut self, name: impl Into<String>, kind: AttributeKind) -> Self {
        let mut attribute = AttributeDefinition::new(name, kind);
        attribute.required = true;
        self.attributes.push(attribute);
        self
    }

    /// Relations this type populates when selected as a variant with `true`.
    #[must_use]
    pub fn default_populate<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_populate = attributes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    #[must_use]
    pub const fn has_draft_and_publish(&self) -> bool {
        self.draft_and_publish
    }

    #[must_use]
    pub fn attributes(&self) -> &[AttributeDefinition] {
        &self.attributes
    }

    #[must_use]
    pub fn variant_default_populate(&self) -> &[String] {
        &self.default_populate
    }

    #[must_use]
    pub fn attribute_def(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    /// Resolve one attribute or fail with `SchemaError::UnknownField`.
    pub fn try_attribute(&self, name: &str) -> Result<&AttributeDefinition, SchemaError> {
        self.attribute_def(name)
            .ok_or_else(|| SchemaError::UnknownField {
                doc_type: self.name.clone(),
                field: name.to_string(),
            })
    }

    /// Attributes the population resolver can expand.
    pub fn relation_attributes(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes
            .iter()
            .filter(|attr| attr.kind.is_populatable())
    }

    // Append system attributes for collection types.
    fn with_system_attributes(mut self) -> Self {
        if self.kind == TypeKind::Component {
            return self;
        }

        let mut system = vec![
            AttributeDefinition::new(DOCUMENT_ID, AttributeKind::text()),
            AttributeDefinition::new(CREATED_AT, AttributeKind::datetime()),
            AttributeDefinition::new(UPDATED_AT, AttributeKind::datetime()),
        ];
        if self.draft_and_publish {
            system.push(AttributeDefinition::new(PUBLISHED_AT, AttributeKind::datetime()));
        }
        system.retain(|sys| self.attribute_def(&sys.name).is_none());
        self.attributes.extend(system);

        self
    }
}
