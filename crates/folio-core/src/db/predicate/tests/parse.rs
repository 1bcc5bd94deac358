use crate::{
    db::predicate::{FilterError, FilterNode, FilterOp, OperatorError},
    value::Value,
};
use serde_json::json;

#[test]
fn empty_object_means_no_filter() {
    assert_eq!(FilterNode::from_json(&json!({})).unwrap(), None);
}

#[test]
fn operator_objects_and_bare_values() {
    let node = FilterNode::from_json(&json!({
        "title": { "$containsi": "strapi" },
        "views": 10,
    }))
    .unwrap()
    .unwrap();

    assert_eq!(
        node,
        FilterNode::And(vec![
            FilterNode::leaf("title", FilterOp::Containsi, "strapi"),
            FilterNode::eq("views", 10),
        ])
    );
}

#[test]
fn nested_relation_objects_build_dotted_paths() {
    let node = FilterNode::from_json(&json!({
        "author": { "name": { "$eq": "Ada" } }
    }))
    .unwrap()
    .unwrap();

    assert_eq!(node, FilterNode::eq("author.name", "Ada"));
}

#[test]
fn combinators_and_arrays() {
    let node = FilterNode::from_json(&json!({
        "$or": [
            { "views": [1, 2] },
            { "$not": { "title": { "$null": true } } }
        ]
    }))
    .unwrap()
    .unwrap();

    assert_eq!(
        node,
        FilterNode::or([
            FilterNode::leaf("views", FilterOp::In, vec![1, 2]),
            FilterNode::not(FilterNode::leaf("title", FilterOp::Null, true)),
        ])
    );
}

#[test]
fn field_scoped_combinators_keep_the_prefix() {
    let node = FilterNode::from_json(&json!({
        "author": { "$or": [{ "name": "Ada" }, { "name": "Grace" }] }
    }))
    .unwrap()
    .unwrap();

    assert_eq!(
        node,
        FilterNode::or([
            FilterNode::eq("author.name", "Ada"),
            FilterNode::eq("author.name", "Grace"),
        ])
    );
}

#[test]
fn unknown_operator_is_an_operator_error() {
    let err = FilterNode::from_json(&json!({ "title": { "$like": "x" } })).unwrap_err();

    assert_eq!(
        err,
        FilterError::Operator(OperatorError::UnknownOperator("$like".to_string()))
    );
    assert_eq!(err.kind(), crate::error::ErrorKind::Operator);
}

#[test]
fn malformed_shapes_are_rejected() {
    for bad in [
        json!([]),
        json!({ "$and": {} }),
        json!({ "$eq": 1 }),
        json!({ "$not": {} }),
    ] {
        let err = FilterNode::from_json(&bad).unwrap_err();
        assert!(
            matches!(err, FilterError::Operator(OperatorError::Malformed(_))),
            "{bad} -> {err:?}"
        );
    }
}

#[test]
fn operator_keys_round_trip() {
    for op in FilterOp::ALL {
        assert_eq!(FilterOp::from_key(op.key()), Some(op));
    }
    assert_eq!(Value::from_json(&json!(null)), Value::Null);
}
