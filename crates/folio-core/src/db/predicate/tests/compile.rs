use super::compile_article;
use crate::{
    db::predicate::{
        FieldKind, FilterError, FilterNode, FilterOp, Operand, OperatorError, Predicate, compile,
    },
    model::{ScalarKind, SchemaError},
    test_support::blog_registry,
    value::Value,
};

fn compile_err(node: &FilterNode) -> FilterError {
    let registry = blog_registry();
    let article = registry.try_get("article").unwrap();

    compile(&registry, article, node).expect_err("filter should be rejected")
}

#[test]
fn unknown_field_is_schema_error() {
    let err = compile_err(&FilterNode::eq("nope", 1));

    assert!(matches!(
        err,
        FilterError::Schema(SchemaError::UnknownField { ref field, .. }) if field == "nope"
    ));
}

#[test]
fn unknown_field_on_relation_target_is_schema_error() {
    let err = compile_err(&FilterNode::eq("author.title", "x"));

    assert!(matches!(
        err,
        FilterError::Schema(SchemaError::UnknownField { ref doc_type, .. }) if doc_type == "author"
    ));
}

#[test]
fn traversing_scalars_and_polymorphic_attributes_is_schema_error() {
    for path in ["title.length", "mentions.name", "blocks.heading"] {
        let err = compile_err(&FilterNode::eq(path, "x"));
        assert!(
            matches!(err, FilterError::Schema(SchemaError::NotTraversable { .. })),
            "{path}: {err:?}"
        );
    }
}

#[test]
fn text_operators_reject_numeric_fields() {
    let err = compile_err(&FilterNode::leaf("views", FilterOp::Contains, "1"));

    assert!(matches!(
        err,
        FilterError::Operator(OperatorError::NotSupported {
            op: FilterOp::Contains,
            kind: "integer",
            ..
        })
    ));
}

#[test]
fn ordering_rejects_booleans_and_json() {
    for path in ["featured", "meta"] {
        let err = compile_err(&FilterNode::leaf(path, FilterOp::Gt, 1));
        assert!(matches!(
            err,
            FilterError::Operator(OperatorError::NotSupported { .. })
        ));
    }
}

#[test]
fn operand_kind_must_match_attribute() {
    let err = compile_err(&FilterNode::eq("views", "10"));
    assert!(matches!(
        err,
        FilterError::Operator(OperatorError::OperandKind {
            found: "text",
            ..
        })
    ));

    let err = compile_err(&FilterNode::eq("releasedOn", "last tuesday"));
    assert!(matches!(
        err,
        FilterError::Operator(OperatorError::OperandKind { .. })
    ));
}

#[test]
fn integer_and_float_share_the_numeric_family() {
    let predicate = compile_article(&FilterNode::leaf("views", FilterOp::Gte, 2.5));

    assert!(matches!(
        predicate,
        Predicate::Compare(ref cmp) if cmp.operand == Operand::One(Value::Float(2.5))
    ));
}

#[test]
fn relations_only_accept_presence_operators() {
    let predicate = compile_article(&FilterNode::leaf("author", FilterOp::NotNull, true));
    assert!(matches!(
        predicate,
        Predicate::Compare(ref cmp)
            if cmp.path.kind == FieldKind::Relation && cmp.operand == Operand::None
    ));

    let err = compile_err(&FilterNode::eq("author", "au1"));
    assert!(matches!(
        err,
        FilterError::Operator(OperatorError::NotSupported {
            kind: "relation",
            ..
        })
    ));

    compile_article(&FilterNode::leaf("blocks", FilterOp::Null, true));
    compile_article(&FilterNode::leaf("mentions", FilterOp::NotNull, true));
}

#[test]
fn between_low_above_high_is_operator_error() {
    let err = compile_err(&FilterNode::leaf("views", FilterOp::Between, vec![10, 1]));
    assert_eq!(
        err,
        FilterError::Operator(OperatorError::InvalidRange {
            field: "views".to_string()
        })
    );

    let err = compile_err(&FilterNode::leaf(
        "releasedOn",
        FilterOp::Between,
        vec!["2024-02-01", "2024-01-01"],
    ));
    assert!(matches!(
        err,
        FilterError::Operator(OperatorError::InvalidRange { .. })
    ));
}

#[test]
fn between_requires_a_pair() {
    for operand in [Value::Int(1), Value::from(vec![1, 2, 3])] {
        let err = compile_err(&FilterNode::leaf("views", FilterOp::Between, operand));
        assert!(matches!(
            err,
            FilterError::Operator(OperatorError::OperandKind { .. })
        ));
    }
}

#[test]
fn empty_combinators_are_operator_errors() {
    assert!(matches!(
        compile_err(&FilterNode::And(Vec::new())),
        FilterError::Operator(OperatorError::EmptyCombinator { op: "$and" })
    ));
    assert!(matches!(
        compile_err(&FilterNode::Or(Vec::new())),
        FilterError::Operator(OperatorError::EmptyCombinator { op: "$or" })
    ));
}

#[test]
fn relation_paths_record_hops_and_leaf_kind() {
    let predicate = compile_article(&FilterNode::eq("author.avatar.url", "/m1.png"));
    let Predicate::Compare(cmp) = predicate else {
        panic!("expected a comparison");
    };

    let hops: Vec<_> = cmp.path.hops.iter().map(|hop| hop.target.as_str()).collect();
    assert_eq!(hops, ["author", "media"]);
    assert_eq!(cmp.path.kind, FieldKind::Scalar(ScalarKind::Text));
    assert_eq!(cmp.path.dotted(), "author.avatar.url");
}

#[test]
fn scalar_in_operand_is_wrapped() {
    let predicate = compile_article(&FilterNode::leaf("views", FilterOp::In, 3));

    assert!(matches!(
        predicate,
        Predicate::Compare(ref cmp) if cmp.operand == Operand::Many(vec![Value::Int(3)])
    ));
}

#[test]
fn document_id_is_filterable() {
    compile_article(&FilterNode::leaf("documentId", FilterOp::In, vec!["a1", "a2"]));
}
