//! Module: predicate::compile
//! Responsibility: schema-aware validation and lowering of `FilterNode` trees.
//! Does not own: evaluation semantics or caching.
//! Boundary: the only constructor of `Predicate` values from caller input.

use crate::{
    db::predicate::{
        ComparePredicate, FieldKind, FieldPath, FilterError, FilterNode, FilterOp, Operand,
        OperatorError, PathHop, Predicate, semantics,
    },
    model::{AttributeKind, DocumentType, ScalarKind, SchemaError, SchemaRegistry},
    value::Value,
};
use std::cmp::Ordering;

/// Compile a filter tree against `doc_type`.
///
/// Pure: the same tree and schema always produce the same predicate.
pub fn compile(
    registry: &SchemaRegistry,
    doc_type: &DocumentType,
    node: &FilterNode,
) -> Result<Predicate, FilterError> {
    match node {
        FilterNode::And(children) => {
            compile_children(registry, doc_type, children, "$and").map(Predicate::And)
        }
        FilterNode::Or(children) => {
            compile_children(registry, doc_type, children, "$or").map(Predicate::Or)
        }
        FilterNode::Not(child) => Ok(Predicate::Not(Box::new(compile(
            registry, doc_type, child,
        )?))),
        FilterNode::Leaf { path, op, operand } => {
            let path = resolve_path(registry, doc_type, path)?;
            let compare = compile_leaf(path, *op, operand)?;

            Ok(Predicate::Compare(compare))
        }
    }
}

fn compile_children(
    registry: &SchemaRegistry,
    doc_type: &DocumentType,
    children: &[FilterNode],
    op: &'static str,
) -> Result<Vec<Predicate>, FilterError> {
    if children.is_empty() {
        return Err(OperatorError::EmptyCombinator { op }.into());
    }

    children
        .iter()
        .map(|child| compile(registry, doc_type, child))
        .collect()
}

/// Resolve a dotted path; every segment but the last must be a relation.
fn resolve_path(
    registry: &SchemaRegistry,
    root: &DocumentType,
    path: &str,
) -> Result<FieldPath, SchemaError> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((field, relations)) = segments.split_last() else {
        return Err(SchemaError::UnknownField {
            doc_type: root.name().to_string(),
            field: path.to_string(),
        });
    };

    let mut current = root;
    let mut hops = Vec::with_capacity(relations.len());
    for segment in relations {
        let attr = current.try_attribute(segment)?;
        let target = match &attr.kind {
            AttributeKind::RelationOne { target } | AttributeKind::RelationMany { target } => {
                target
            }
            other => {
                return Err(SchemaError::NotTraversable {
                    doc_type: current.name().to_string(),
                    field: (*segment).to_string(),
                    kind: other.label(),
                });
            }
        };
        hops.push(PathHop {
            attribute: attr.name.clone(),
            target: target.clone(),
        });
        current = registry.try_get(target)?;
    }

    let attr = current.try_attribute(field)?;
    let kind = attr
        .kind
        .scalar()
        .map_or(FieldKind::Relation, FieldKind::Scalar);

    Ok(FieldPath {
        hops,
        field: attr.name.clone(),
        kind,
    })
}

fn compile_leaf(
    path: FieldPath,
    op: FilterOp,
    operand: &Value,
) -> Result<ComparePredicate, OperatorError> {
    if op.is_presence() {
        return Ok(ComparePredicate {
            path,
            op,
            operand: Operand::None,
        });
    }

    let field = path.dotted();
    let kind = match path.kind {
        FieldKind::Scalar(kind) if kind != ScalarKind::Json => kind,
        FieldKind::Scalar(kind) => return Err(not_supported(op, field, kind.label())),
        FieldKind::Relation => return Err(not_supported(op, field, "relation")),
    };
    if op.is_text_only() && kind != ScalarKind::Text {
        return Err(not_supported(op, field, kind.label()));
    }
    if op.is_ordering() && !kind.is_orderable() {
        return Err(not_supported(op, field, kind.label()));
    }

    let operand = match op {
        FilterOp::In | FilterOp::NotIn => {
            let items = match operand {
                Value::List(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            let items = items
                .iter()
                .map(|item| coerce(kind, op, &field, item))
                .collect::<Result<Vec<_>, _>>()?;

            Operand::Many(items)
        }
        FilterOp::Between => {
            let Some([low, high]) = operand.as_list().map(Vec::as_slice).and_then(|items| {
                <&[Value; 2]>::try_from(items).ok()
            }) else {
                return Err(OperatorError::OperandKind {
                    op,
                    field,
                    expected: "a [low, high] pair",
                    found: operand.kind_label(),
                });
            };
            let low = coerce(kind, op, &field, low)?;
            let high = coerce(kind, op, &field, high)?;
            if semantics::compare_order(&low, &high) == Some(Ordering::Greater) {
                return Err(OperatorError::InvalidRange { field });
            }

            Operand::Range(low, high)
        }
        _ => Operand::One(coerce(kind, op, &field, operand)?),
    };

    Ok(ComparePredicate { path, op, operand })
}

// Operands must match the attribute's family; no implicit cross-kind coercion.
fn coerce(
    kind: ScalarKind,
    op: FilterOp,
    field: &str,
    operand: &Value,
) -> Result<Value, OperatorError> {
    semantics::normalize(kind, operand).ok_or_else(|| OperatorError::OperandKind {
        op,
        field: field.to_string(),
        expected: match kind {
            ScalarKind::Text => "text",
            ScalarKind::Integer | ScalarKind::Float => "a number",
            ScalarKind::Boolean => "a boolean",
            ScalarKind::DateTime => "an RFC 3339 or YYYY-MM-DD date",
            ScalarKind::Json => "json",
        },
        found: operand.kind_label(),
    })
}

fn not_supported(op: FilterOp, field: String, kind: &'static str) -> OperatorError {
    OperatorError::NotSupported { op, field, kind }
}
