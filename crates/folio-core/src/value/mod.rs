pub mod datetime;
mod document;
mod json;


use std::{cmp::Ordering, fmt};

// re-exports
pub use document::{Document, DocumentId, Fields, Status};
pub use json::{COMPONENT_KEY, MORPH_TYPE_KEY};

///
/// TextMode
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextMode {
    Cs, // case-sensitive
    Ci, // case-insensitive
}

///
/// Variant
///
/// One instance of a polymorphic relation or dynamic zone.
/// `tag` names the concrete shape; `value` is a `Ref` until populated for
/// polymorphic relations and always an embedded `Doc` for dynamic zones.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    pub tag: String,
    pub value: Value,
}

impl Variant {
    #[must_use]
    pub fn reference(tag: impl Into<String>, id: impl Into<DocumentId>) -> Self {
        Self {
            tag: tag.into(),
            value: Value::Ref(id.into()),
        }
    }

    #[must_use]
    pub fn embedded(document: Document) -> Self {
        Self {
            tag: document.doc_type().to_string(),
            value: Value::Doc(Box::new(document)),
        }
    }
}

///
/// Value
///
/// Runtime value stored in a document field.
///
/// Relations are never owned: `Ref` carries the target identifier and the
/// adapter is the lookup capability. `Doc` only appears after population.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Json(serde_json::Value),
    List(Vec<Self>),
    Ref(DocumentId),
    Doc(Box<Document>),
    Variant(Box<Variant>),
}

impl Value {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn reference(id: impl Into<DocumentId>) -> Self {
        Self::Ref(id.into())
    }

    #[must_use]
    pub fn references<I, T>(ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<DocumentId>,
    {
        Self::List(ids.into_iter().map(|id| Self::Ref(id.into())).collect())
    }

    #[must_use]
    pub fn variant(variant: Variant) -> Self {
        Self::Variant(Box::new(variant))
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_list(&self) -> Option<&Vec<Self>> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Doc(document) => Some(document),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_variant(&self) -> Option<&Variant> {
        match self {
            Self::Variant(variant) => Some(variant),
            _ => None,
        }
    }

    /// Short label used in diagnostics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
            Self::List(_) => "list",
            Self::Ref(_) => "ref",
            Self::Doc(_) => "doc",
            Self::Variant(_) => "variant",
        }
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Numeric ordering across `Int` and `Float`.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn cmp_numeric(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            _ => None,
        }
    }

    /// Substring test; `None` when either side is not text.
    #[must_use]
    pub fn text_contains(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |hay, needle| hay.contains(needle))
    }

    #[must_use]
    pub fn text_starts_with(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |hay, needle| hay.starts_with(needle))
    }

    #[must_use]
    pub fn text_ends_with(&self, needle: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(needle, mode, |hay, needle| hay.ends_with(needle))
    }

    #[must_use]
    pub fn text_eq(&self, other: &Self, mode: TextMode) -> Option<bool> {
        self.text_op(other, mode, |left, right| left == right)
    }

    fn text_op(&self, other: &Self, mode: TextMode, f: impl Fn(&str, &str) -> bool) -> Option<bool> {
        let (Self::Text(left), Self::Text(right)) = (self, other) else {
            return None;
        };

        Some(match mode {
            TextMode::Cs => f(left, right),
            TextMode::Ci => f(&casefold(left), &casefold(right)),
        })
    }

    /// Collect every document identifier referenced by this value.
    ///
    /// Populated documents contribute their own identifier; dynamic-zone
    /// components contribute nothing.
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a DocumentId>) {
        match self {
            Self::Ref(id) => out.push(id),
            Self::Doc(document) => out.push(document.id()),
            Self::List(items) => {
                for item in items {
                    item.collect_refs(out);
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn casefold(input: &str) -> String {
    if input.is_ascii() {
        return input.to_ascii_lowercase();
    }

    input.to_lowercase()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Document> for Value {
    fn from(value: Document) -> Self {
        Self::Doc(Box::new(value))
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
