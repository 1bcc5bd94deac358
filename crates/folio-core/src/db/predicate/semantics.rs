//! Module: predicate::semantics
//! Responsibility: value comparison semantics for compiled predicates and sorting.
//! Does not own: operator legality; `compile` rejects invalid pairs up front.
//! Boundary: runtime evaluation and adapter sorting delegate compare behavior here.

use crate::{
    model::ScalarKind,
    value::{TextMode, Value, datetime},
};
use std::cmp::Ordering;

/// Normalize a stored or caller-supplied value into its comparison family.
///
/// Datetimes are compared as unix milliseconds; every other kind compares
/// as stored. Returns `None` for values outside the family.
#[must_use]
pub(crate) fn normalize(kind: ScalarKind, value: &Value) -> Option<Value> {
    match (kind, value) {
        (ScalarKind::Text, Value::Text(_))
        | (ScalarKind::Integer | ScalarKind::Float, Value::Int(_) | Value::Float(_))
        | (ScalarKind::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ScalarKind::DateTime, Value::Text(text)) => datetime::parse_millis(text).map(Value::Int),
        _ => None,
    }
}

/// Equality under the given text mode; `None` when the pair is not comparable.
#[must_use]
pub(crate) fn compare_eq(left: &Value, right: &Value, mode: TextMode) -> Option<bool> {
    match (left, right) {
        (Value::Text(_), Value::Text(_)) => left.text_eq(right, mode),
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        _ if left.is_numeric() && right.is_numeric() => {
            left.cmp_numeric(right).map(Ordering::is_eq)
        }
        _ => None,
    }
}

/// Ordering for orderable families; `None` when the pair is not comparable.
#[must_use]
pub(crate) fn compare_order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        _ if left.is_numeric() && right.is_numeric() => left.cmp_numeric(right),
        _ => None,
    }
}

/// Total order used for sorting: nulls and absent values first, then
/// comparable values, then a stable fallback on the value kind.
#[must_use]
pub(crate) fn canonical_cmp(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    let left = left.filter(|value| !value.is_null());
    let right = right.filter(|value| !value.is_null());

    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => compare_order(a, b)
            .or_else(|| match (a, b) {
                (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
                _ => None,
            })
            .unwrap_or_else(|| a.kind_label().cmp(b.kind_label())),
    }
}

///
/// TextOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

#[must_use]
pub(crate) fn compare_text(left: &Value, right: &Value, op: TextOp, mode: TextMode) -> Option<bool> {
    match op {
        TextOp::Contains => left.text_contains(right, mode),
        TextOp::StartsWith => left.text_starts_with(right, mode),
        TextOp::EndsWith => left.text_ends_with(right, mode),
    }
}
