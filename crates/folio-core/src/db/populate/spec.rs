use crate::db::{populate::PopulateError, predicate::FilterNode};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet, btree_map::Entry};

const WILDCARD: &str = "*";

///
/// PopulateSpec
///
/// Attribute name to population node. `wildcard` stands for every
/// populatable attribute of the type, one level deep.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopulateSpec {
    pub(crate) wildcard: bool,
    pub(crate) entries: BTreeMap<String, PopulateNode>,
}

///
/// PopulateNode
///

#[derive(Clone, Debug, PartialEq)]
pub enum PopulateNode {
    /// Populate with the default shape.
    All,
    Shape(PopulateShape),
    /// Per-variant nodes for polymorphic and dynamic-zone attributes.
    Variants(BTreeMap<String, PopulateNode>),
}

///
/// PopulateShape
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PopulateShape {
    pub fields: Option<BTreeSet<String>>,
    pub filters: Option<FilterNode>,
    pub populate: PopulateSpec,
}

impl PopulateSpec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `"*"`: every populatable attribute with the default shape.
    #[must_use]
    pub fn wildcard() -> Self {
        Self {
            wildcard: true,
            entries: BTreeMap::new(),
        }
    }

    /// Array form: each path populates with the default shape; dotted paths nest.
    #[must_use]
    pub fn paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut spec = Self::new();
        for path in paths {
            spec.insert_path(path.as_ref());
        }

        spec
    }

    #[must_use]
    pub fn with(mut self, attribute: impl Into<String>, node: PopulateNode) -> Self {
        self.entries.insert(attribute.into(), node);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.wildcard && self.entries.is_empty()
    }

    #[must_use]
    pub const fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &PopulateNode)> {
        self.entries.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Parse the request syntax: `"*"`, `"a"`, `["a", "b.c"]`, or an object
    /// mapping attributes to `true` or `{fields, filters, populate, on}`.
    pub fn from_json(json: &JsonValue) -> Result<Self, PopulateError> {
        match json {
            JsonValue::Null | JsonValue::Bool(false) => Ok(Self::new()),
            JsonValue::Bool(true) => Ok(Self::wildcard()),
            JsonValue::String(path) => Ok(Self::from_path_str(path)),
            JsonValue::Array(items) => {
                let mut spec = Self::new();
                for item in items {
                    let JsonValue::String(path) = item else {
                        return Err(PopulateError::malformed("populate arrays hold attribute paths"));
                    };
                    spec.merge(Self::from_path_str(path));
                }

                Ok(spec)
            }
            JsonValue::Object(map) => Self::from_object(map),
            JsonValue::Number(_) => Err(PopulateError::malformed("populate cannot be a number")),
        }
    }

    fn from_path_str(path: &str) -> Self {
        let mut spec = Self::new();
        for path in path.split(',').map(str::trim).filter(|path| !path.is_empty()) {
            spec.insert_path(path);
        }

        spec
    }

    fn from_object(map: &Map<String, JsonValue>) -> Result<Self, PopulateError> {
        let mut spec = Self::new();
        for (attribute, value) in map {
            if attribute == WILDCARD {
                spec.wildcard |= !matches!(value, JsonValue::Bool(false));
                continue;
            }
            if let Some(node) = PopulateNode::from_json(value)? {
                spec.entries.insert(attribute.clone(), node);
            }
        }

        Ok(spec)
    }

    fn insert_path(&mut self, path: &str) {
        if path == WILDCARD {
            self.wildcard = true;
            return;
        }

        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let node = self
            .entries
            .entry(head.to_string())
            .or_insert(PopulateNode::All);
        if let Some(rest) = rest {
            node.insert_nested_path(rest);
        }
    }

    // Later entries extend earlier ones; nested specs merge recursively.
    fn merge(&mut self, other: Self) {
        self.wildcard |= other.wildcard;
        for (attribute, node) in other.entries {
            match self.entries.entry(attribute) {
                Entry::Vacant(slot) => {
                    slot.insert(node);
                }
                Entry::Occupied(mut slot) => slot.get_mut().merge(node),
            }
        }
    }
}

impl PopulateNode {
    /// Shape with only a nested populate.
    #[must_use]
    pub fn nested(populate: PopulateSpec) -> Self {
        Self::Shape(PopulateShape {
            populate,
            ..PopulateShape::default()
        })
    }

    #[must_use]
    pub fn on_variant<I, S>(variants: I) -> Self
    where
        I: IntoIterator<Item = (S, Self)>,
        S: Into<String>,
    {
        Self::Variants(
            variants
                .into_iter()
                .map(|(tag, node)| (tag.into(), node))
                .collect(),
        )
    }

    /// `Ok(None)` for `false`, which leaves the attribute unpopulated.
    fn from_json(json: &JsonValue) -> Result<Option<Self>, PopulateError> {
        let map = match json {
            JsonValue::Bool(true) => return Ok(Some(Self::All)),
            JsonValue::Bool(false) | JsonValue::Null => return Ok(None),
            JsonValue::Object(map) => map,
            other => {
                return Err(PopulateError::malformed(format!(
                    "populate node must be true or an object, found {other}"
                )));
            }
        };

        let variants = map.get("onVariant").or_else(|| map.get("on"));
        if let Some(variants) = variants {
            if map.len() > 1 {
                return Err(PopulateError::malformed(
                    "'onVariant' cannot be combined with other populate keys",
                ));
            }
            let JsonValue::Object(variants) = variants else {
                return Err(PopulateError::malformed("'onVariant' expects an object"));
            };

            let mut out = BTreeMap::new();
            for (tag, value) in variants {
                if let Some(node) = Self::from_json(value)? {
                    out.insert(tag.clone(), node);
                }
            }

            return Ok(Some(Self::Variants(out)));
        }

        let mut shape = PopulateShape::default();
        for (key, value) in map {
            match key.as_str() {
                "fields" => shape.fields = Some(parse_fields(value)?),
                "filters" => {
                    shape.filters = FilterNode::from_json(value)?;
                }
                "populate" => shape.populate = PopulateSpec::from_json(value)?,
                other => {
                    return Err(PopulateError::malformed(format!(
                        "unknown populate key '{other}'"
                    )));
                }
            }
        }

        Ok(Some(Self::Shape(shape)))
    }

    fn insert_nested_path(&mut self, path: &str) {
        if let Self::Shape(shape) = self {
            shape.populate.insert_path(path);
            return;
        }

        let mut populate = PopulateSpec::new();
        populate.insert_path(path);
        *self = Self::nested(populate);
    }

    fn merge(&mut self, other: Self) {
        match other {
            Self::All => {}
            Self::Shape(other) => match self {
                Self::Shape(this) => {
                    this.populate.merge(other.populate);
                    if other.fields.is_some() {
                        this.fields = other.fields;
                    }
                    if other.filters.is_some() {
                        this.filters = other.filters;
                    }
                }
                Self::All | Self::Variants(_) => *self = Self::Shape(other),
            },
            Self::Variants(_) => *self = other,
        }
    }
}

fn parse_fields(json: &JsonValue) -> Result<BTreeSet<String>, PopulateError> {
    match json {
        JsonValue::String(field) => Ok(field
            .split(',')
            .map(str::trim)
            .filter(|field| !field.is_empty())
            .map(str::to_string)
            .collect()),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| PopulateError::malformed("'fields' entries must be strings"))
            })
            .collect(),
        _ => Err(PopulateError::malformed("'fields' expects a list of attribute names")),
    }
}
