use crate::{db::predicate::FilterOp, model::ScalarKind, value::Value};

///
/// Predicate
///
/// Schema-resolved filter consumed by storage adapters.
/// Paths are resolved to relation hops and operands are normalized to the
/// attribute's comparison family (datetimes become unix milliseconds).
///

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    True,
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    Compare(ComparePredicate),
}

impl Predicate {
    #[must_use]
    pub const fn is_true(&self) -> bool {
        matches!(self, Self::True)
    }
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, PartialEq)]
pub struct ComparePredicate {
    pub path: FieldPath,
    pub op: FilterOp,
    pub operand: Operand,
}

///
/// FieldPath
///
/// `hops` walk relation attributes from the root type; `field` is read on
/// every document reached by the last hop.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldPath {
    pub hops: Vec<PathHop>,
    pub field: String,
    pub kind: FieldKind,
}

impl FieldPath {
    /// Dotted form, as written by the caller.
    #[must_use]
    pub fn dotted(&self) -> String {
        let mut out = String::new();
        for hop in &self.hops {
            out.push_str(&hop.attribute);
            out.push('.');
        }
        out.push_str(&self.field);

        out
    }
}

///
/// PathHop
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathHop {
    pub attribute: String,
    pub target: String,
}

///
/// FieldKind
///
/// Comparison family of the leaf attribute.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Relation, polymorphic relation, or dynamic zone; presence only.
    Relation,
}

///
/// Operand
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// Presence operators ignore their operand.
    None,
    One(Value),
    Many(Vec<Value>),
    Range(Value, Value),
}
