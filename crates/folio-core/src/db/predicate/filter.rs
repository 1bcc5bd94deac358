//! Module: predicate::filter
//! Responsibility: caller-facing filter expression tree and its JSON syntax.
//! Does not own: schema validation or evaluation; see `compile` and `runtime`.
//! Boundary: `FilterNode` is the only input accepted by `compile`.

use crate::{
    db::predicate::{FilterError, OperatorError},
    value::Value,
};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

///
/// FilterOp
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FilterOp {
    Eq,
    Eqi,
    Ne,
    Nei,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    NotIn,
    Contains,
    Containsi,
    NotContains,
    NotContainsi,
    StartsWith,
    StartsWithi,
    EndsWith,
    EndsWithi,
    Null,
    NotNull,
    Between,
}

impl FilterOp {
    pub const ALL: [Self; 21] = [
        Self::Eq,
        Self::Eqi,
        Self::Ne,
        Self::Nei,
        Self::Lt,
        Self::Lte,
        Self::Gt,
        Self::Gte,
        Self::In,
        Self::NotIn,
        Self::Contains,
        Self::Containsi,
        Self::NotContains,
        Self::NotContainsi,
        Self::StartsWith,
        Self::StartsWithi,
        Self::EndsWith,
        Self::EndsWithi,
        Self::Null,
        Self::NotNull,
        Self::Between,
    ];

    /// Wire key, e.g. `$containsi`.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Eqi => "$eqi",
            Self::Ne => "$ne",
            Self::Nei => "$nei",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::In => "$in",
            Self::NotIn => "$notIn",
            Self::Contains => "$contains",
            Self::Containsi => "$containsi",
            Self::NotContains => "$notContains",
            Self::NotContainsi => "$notContainsi",
            Self::StartsWith => "$startsWith",
            Self::StartsWithi => "$startsWithi",
            Self::EndsWith => "$endsWith",
            Self::EndsWithi => "$endsWithi",
            Self::Null => "$null",
            Self::NotNull => "$notNull",
            Self::Between => "$between",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.key() == key)
    }

    /// Stable tag byte used by the predicate fingerprint.
    #[must_use]
    pub(crate) const fn tag(self) -> u8 {
        match self {
            Self::Eq => 0x01,
            Self::Eqi => 0x02,
            Self::Ne => 0x03,
            Self::Nei => 0x04,
            Self::Lt => 0x05,
            Self::Lte => 0x06,
            Self::Gt => 0x07,
            Self::Gte => 0x08,
            Self::In => 0x09,
            Self::NotIn => 0x0a,
            Self::Contains => 0x0b,
            Self::Containsi => 0x0c,
            Self::NotContains => 0x0d,
            Self::NotContainsi => 0x0e,
            Self::StartsWith => 0x0f,
            Self::StartsWithi => 0x10,
            Self::EndsWith => 0x11,
            Self::EndsWithi => 0x12,
            Self::Null => 0x13,
            Self::NotNull => 0x14,
            Self::Between => 0x15,
        }
    }

    /// Operators restricted to text attributes.
    #[must_use]
    pub const fn is_text_only(self) -> bool {
        matches!(
            self,
            Self::Eqi
                | Self::Nei
                | Self::Contains
                | Self::Containsi
                | Self::NotContains
                | Self::NotContainsi
                | Self::StartsWith
                | Self::StartsWithi
                | Self::EndsWith
                | Self::EndsWithi
        )
    }

    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::Lt | Self::Lte | Self::Gt | Self::Gte | Self::Between
        )
    }

    #[must_use]
    pub const fn is_presence(self) -> bool {
        matches!(self, Self::Null | Self::NotNull)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

///
/// FilterNode
///
/// Leaf paths are dot-separated and may traverse relation attributes.
/// `Not` carries exactly one child by construction; `And`/`Or` arity is
/// checked at compile time.
///

#[derive(Clone, Debug, PartialEq)]
pub enum FilterNode {
    Leaf {
        path: String,
        op: FilterOp,
        operand: Value,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
}

impl FilterNode {
    #[must_use]
    pub fn leaf(path: impl Into<String>, op: FilterOp, operand: impl Into<Value>) -> Self {
        Self::Leaf {
            path: path.into(),
            op,
            operand: operand.into(),
        }
    }

    #[must_use]
    pub fn eq(path: impl Into<String>, operand: impl Into<Value>) -> Self {
        Self::leaf(path, FilterOp::Eq, operand)
    }

    #[must_use]
    pub fn and(children: impl IntoIterator<Item = Self>) -> Self {
        Self::And(children.into_iter().collect())
    }

    #[must_use]
    pub fn or(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Or(children.into_iter().collect())
    }

    #[must_use]
    pub fn not(child: Self) -> Self {
        Self::Not(Box::new(child))
    }

    /// Parse the JSON filter syntax. `{}` means "no filter".
    ///
    /// Field keys hold either an operator object (`{"$eq": 1}`), a nested
    /// relation object, a bare scalar (implicit `$eq`), or an array
    /// (implicit `$in`). Sibling keys are combined with AND.
    pub fn from_json(json: &JsonValue) -> Result<Option<Self>, FilterError> {
        let JsonValue::Object(map) = json else {
            return Err(malformed("filter root must be an object"));
        };

        parse_object(map, None)
    }
}

fn parse_object(
    map: &Map<String, JsonValue>,
    prefix: Option<&str>,
) -> Result<Option<FilterNode>, FilterError> {
    let mut nodes = Vec::new();

    for (key, value) in map {
        match key.as_str() {
            "$and" | "$or" => {
                let JsonValue::Array(items) = value else {
                    return Err(malformed(format!("'{key}' expects an array")));
                };
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    let JsonValue::Object(child) = item else {
                        return Err(malformed(format!("'{key}' children must be objects")));
                    };
                    if let Some(node) = parse_object(child, prefix)? {
                        children.push(node);
                    }
                }
                nodes.push(if key == "$and" {
                    FilterNode::And(children)
                } else {
                    FilterNode::Or(children)
                });
            }
            "$not" => {
                let JsonValue::Object(child) = value else {
                    return Err(malformed("'$not' expects an object"));
                };
                let Some(node) = parse_object(child, prefix)? else {
                    return Err(malformed("'$not' requires a condition"));
                };
                nodes.push(FilterNode::not(node));
            }
            op if op.starts_with('$') => {
                let Some(path) = prefix else {
                    return Err(malformed(format!("operator '{op}' needs a field")));
                };
                let op = FilterOp::from_key(op)
                    .ok_or_else(|| OperatorError::UnknownOperator(op.to_string()))?;
                nodes.push(FilterNode::leaf(path, op, Value::from_json(value)));
            }
            field => {
                let path = prefix.map_or_else(|| field.to_string(), |p| format!("{p}.{field}"));
                match value {
                    JsonValue::Object(inner) => {
                        if let Some(node) = parse_object(inner, Some(&path))? {
                            nodes.push(node);
                        }
                    }
                    JsonValue::Array(_) => {
                        nodes.push(FilterNode::leaf(path, FilterOp::In, Value::from_json(value)));
                    }
                    _ => nodes.push(FilterNode::eq(path, Value::from_json(value))),
                }
            }
        }
    }

    Ok(match nodes.len() {
        0 => None,
        1 => nodes.pop(),
        _ => Some(FilterNode::And(nodes)),
    })
}

fn malformed(message: impl Into<String>) -> FilterError {
    OperatorError::Malformed(message.into()).into()
}
