use crate::{
    db::predicate::{
        ComparePredicate, FieldKind, FilterOp, Operand, Predicate,
        semantics::{self, TextOp},
    },
    value::{Document, DocumentId, TextMode, Value},
};
use std::cmp::Ordering;

///
/// ReferenceLookup
///
/// Lookup capability used to follow relation hops during evaluation.
/// Adapters implement it over whatever they hold while filtering.
///

pub trait ReferenceLookup {
    fn lookup(&self, doc_type: &str, id: &DocumentId) -> Option<&Document>;
}

///
/// NoLookup
///
/// Resolves nothing; relation paths only see already-populated documents.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct NoLookup;

impl ReferenceLookup for NoLookup {
    fn lookup(&self, _: &str, _: &DocumentId) -> Option<&Document> {
        None
    }
}

impl Predicate {
    /// Evaluate against one document. Children are visited in declaration order.
    #[must_use]
    pub fn matches(&self, document: &Document, lookup: &dyn ReferenceLookup) -> bool {
        match self {
            Self::True => true,
            Self::And(children) => children.iter().all(|child| child.matches(document, lookup)),
            Self::Or(children) => children.iter().any(|child| child.matches(document, lookup)),
            Self::Not(inner) => !inner.matches(document, lookup),
            Self::Compare(cmp) => eval_compare(cmp, document, lookup),
        }
    }
}

// Relation hops are existential: any reached document satisfying the leaf matches.
fn eval_compare(cmp: &ComparePredicate, document: &Document, lookup: &dyn ReferenceLookup) -> bool {
    // Empty membership sets decide the leaf before any hop is walked.
    if let Some(matches) = empty_membership(cmp) {
        return matches;
    }
    if cmp.path.hops.is_empty() {
        return eval_leaf(cmp, document.value_of(&cmp.path.field).as_ref());
    }

    let mut frontier: Vec<&Document> = vec![document];
    for hop in &cmp.path.hops {
        let mut next = Vec::new();
        for doc in frontier {
            if let Some(value) = doc.get(&hop.attribute) {
                related(value, &hop.target, lookup, &mut next);
            }
        }
        frontier = next;
    }

    frontier
        .into_iter()
        .any(|doc| eval_leaf(cmp, doc.value_of(&cmp.path.field).as_ref()))
}

// Populated documents are used in place; bare references go through the lookup.
fn related<'a>(
    value: &'a Value,
    target: &str,
    lookup: &'a dyn ReferenceLookup,
    out: &mut Vec<&'a Document>,
) {
    match value {
        Value::Ref(id) => out.extend(lookup.lookup(target, id)),
        Value::Doc(document) => out.push(document),
        Value::List(items) => {
            for item in items {
                related(item, target, lookup, out);
            }
        }
        _ => {}
    }
}

fn empty_membership(cmp: &ComparePredicate) -> Option<bool> {
    match &cmp.operand {
        Operand::Many(items) if items.is_empty() && matches!(cmp.op, FilterOp::In | FilterOp::NotIn) => {
            Some(cmp.op == FilterOp::NotIn)
        }
        _ => None,
    }
}

fn eval_leaf(cmp: &ComparePredicate, actual: Option<&Value>) -> bool {
    let present = actual.filter(|value| !is_absent(value));

    match cmp.op {
        FilterOp::Null => return present.is_none(),
        FilterOp::NotNull => return present.is_some(),
        _ => {}
    }

    let FieldKind::Scalar(kind) = cmp.path.kind else {
        return false;
    };
    let Some(actual) = present.and_then(|value| semantics::normalize(kind, value)) else {
        return false;
    };

    // NOTE: invalid comparisons yield None; eval treats that as false for
    // positive and negative operators alike.
    match (cmp.op, &cmp.operand) {
        (FilterOp::Eq, Operand::One(v)) => eq(&actual, v, TextMode::Cs).unwrap_or(false),
        (FilterOp::Eqi, Operand::One(v)) => eq(&actual, v, TextMode::Ci).unwrap_or(false),
        (FilterOp::Ne, Operand::One(v)) => eq(&actual, v, TextMode::Cs).is_some_and(|m| !m),
        (FilterOp::Nei, Operand::One(v)) => eq(&actual, v, TextMode::Ci).is_some_and(|m| !m),

        (FilterOp::Lt, Operand::One(v)) => order(&actual, v).is_some_and(Ordering::is_lt),
        (FilterOp::Lte, Operand::One(v)) => order(&actual, v).is_some_and(Ordering::is_le),
        (FilterOp::Gt, Operand::One(v)) => order(&actual, v).is_some_and(Ordering::is_gt),
        (FilterOp::Gte, Operand::One(v)) => order(&actual, v).is_some_and(Ordering::is_ge),
        (FilterOp::Between, Operand::Range(low, high)) => {
            order(&actual, low).is_some_and(Ordering::is_ge)
                && order(&actual, high).is_some_and(Ordering::is_le)
        }

        (FilterOp::In, Operand::Many(items)) => in_list(&actual, items).unwrap_or(false),
        (FilterOp::NotIn, Operand::Many(items)) => in_list(&actual, items).is_some_and(|m| !m),

        (FilterOp::Contains, Operand::One(v)) => text(&actual, v, TextOp::Contains, TextMode::Cs),
        (FilterOp::Containsi, Operand::One(v)) => text(&actual, v, TextOp::Contains, TextMode::Ci),
        (FilterOp::NotContains, Operand::One(v)) => {
            semantics::compare_text(&actual, v, TextOp::Contains, TextMode::Cs)
                .is_some_and(|m| !m)
        }
        (FilterOp::NotContainsi, Operand::One(v)) => {
            semantics::compare_text(&actual, v, TextOp::Contains, TextMode::Ci)
                .is_some_and(|m| !m)
        }
        (FilterOp::StartsWith, Operand::One(v)) => {
            text(&actual, v, TextOp::StartsWith, TextMode::Cs)
        }
        (FilterOp::StartsWithi, Operand::One(v)) => {
            text(&actual, v, TextOp::StartsWith, TextMode::Ci)
        }
        (FilterOp::EndsWith, Operand::One(v)) => text(&actual, v, TextOp::EndsWith, TextMode::Cs),
        (FilterOp::EndsWithi, Operand::One(v)) => {
            text(&actual, v, TextOp::EndsWith, TextMode::Ci)
        }

        _ => false,
    }
}

// Null, and relation lists with no reference, count as absent.
const fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::List(items) => items.is_empty(),
        _ => false,
    }
}

fn eq(actual: &Value, operand: &Value, mode: TextMode) -> Option<bool> {
    semantics::compare_eq(actual, operand, mode)
}

fn order(actual: &Value, operand: &Value) -> Option<Ordering> {
    semantics::compare_order(actual, operand)
}

fn text(actual: &Value, operand: &Value, op: TextOp, mode: TextMode) -> bool {
    semantics::compare_text(actual, operand, op, mode).unwrap_or(false)
}

fn in_list(actual: &Value, items: &[Value]) -> Option<bool> {
    let mut saw_valid = false;
    for item in items {
        match semantics::compare_eq(actual, item, TextMode::Cs) {
            Some(true) => return Some(true),
            Some(false) => saw_valid = true,
            None => {}
        }
    }

    saw_valid.then_some(false)
}
