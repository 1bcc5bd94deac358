use crate::value::Value;
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use ulid::Ulid;

/// Attribute name to value mapping carried by every document.
pub type Fields = BTreeMap<String, Value>;

///
/// DocumentId
///
/// Stable document identifier. Independent of any adapter row key.
///

#[derive(Clone, Debug, Deref, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid.to_string().to_ascii_lowercase())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&DocumentId> for DocumentId {
    fn from(value: &DocumentId) -> Self {
        value.clone()
    }
}

///
/// Status
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Published,
}

impl Status {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// Document
///
/// One logical record of a document type (or one embedded component
/// instance inside a dynamic zone).
///

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    id: DocumentId,
    doc_type: String,
    status: Option<Status>,
    fields: Fields,
}

impl Document {
    #[must_use]
    pub fn new(doc_type: impl Into<String>, id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            doc_type: doc_type.into(),
            status: None,
            fields: Fields::new(),
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub const fn id(&self) -> &DocumentId {
        &self.id
    }

    #[must_use]
    pub fn doc_type(&self) -> &str {
        &self.doc_type
    }

    #[must_use]
    pub const fn status(&self) -> Option<Status> {
        self.status
    }

    pub const fn set_status(&mut self, status: Option<Status>) {
        self.status = status;
    }

    #[must_use]
    pub const fn fields(&self) -> &Fields {
        &self.fields
    }

    pub const fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Read one stored attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Read one attribute as an owned value, including `documentId`.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<Value> {
        if name == crate::model::DOCUMENT_ID {
            return Some(Value::Text(self.id.to_string()));
        }

        self.fields.get(name).cloned()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields.get_mut(name)
    }

    /// Keep only the named attributes.
    pub fn retain_fields(&mut self, keep: impl Fn(&str) -> bool) {
        self.fields.retain(|name, _| keep(name));
    }

    #[must_use]
    pub fn into_fields(self) -> Fields {
        self.fields
    }
}
