//! Module: populate::plan
//! Responsibility: validate a `PopulateSpec` against the schema and freeze it.
//! Does not own: fetching; the resolver only walks finished plans.
//! Boundary: every request error surfaces here, before the first adapter call.

use crate::{
    db::{
        populate::{PopulateError, PopulateNode, PopulateShape, PopulateSpec},
        predicate::{Predicate, PredicateCache},
        store::Projection,
    },
    model::{AttributeKind, DocumentType, SchemaRegistry},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

static DEFAULT_NODE: PopulateNode = PopulateNode::All;

///
/// PopulatePlan
///
/// Validated population tree for one document type.
///

#[derive(Clone, Debug, Default)]
pub struct PopulatePlan {
    pub(crate) branches: Vec<Branch>,
}

impl PopulatePlan {
    /// Validate `spec` against `doc_type`. Branch filters are compiled
    /// through `cache`.
    pub fn build(
        registry: &SchemaRegistry,
        doc_type: &DocumentType,
        spec: &PopulateSpec,
        cache: &PredicateCache,
    ) -> Result<Self, PopulateError> {
        Planner { registry, cache }.plan(doc_type, spec, &mut Vec::new())
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Attributes this plan expands, in plan order.
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.branches.iter().map(|branch| branch.attribute.as_str())
    }
}

///
/// Branch
///

#[derive(Clone, Debug)]
pub(crate) struct Branch {
    pub(crate) owner: String,
    pub(crate) attribute: String,
    pub(crate) kind: BranchKind,
}

///
/// BranchKind
///

#[derive(Clone, Debug)]
pub(crate) enum BranchKind {
    Relation {
        target: String,
        one: bool,
        plan: TargetPlan,
    },
    /// Keyed by variant tag (the target collection). Missing tags stay unresolved.
    Polymorphic { variants: BTreeMap<String, TargetPlan> },
    /// Keyed by component name. Missing tags stay unresolved.
    DynamicZone {
        variants: BTreeMap<String, ComponentPlan>,
    },
}

///
/// TargetPlan
///
/// How one batch of related documents is fetched and expanded.
///

#[derive(Clone, Debug)]
pub(crate) struct TargetPlan {
    pub(crate) filter: Option<Arc<Predicate>>,
    pub(crate) projection: Projection,
    pub(crate) populate: PopulatePlan,
    pub(crate) versioned: bool,
}

///
/// ComponentPlan
///

#[derive(Clone, Debug)]
pub(crate) struct ComponentPlan {
    pub(crate) projection: Projection,
    pub(crate) populate: PopulatePlan,
}

struct Planner<'a> {
    registry: &'a SchemaRegistry,
    cache: &'a PredicateCache,
}

impl Planner<'_> {
    // `defaults` holds the types whose variant default populate is being
    // expanded; a repeat yields an empty plan instead of looping.
    fn plan(
        &self,
        doc_type: &DocumentType,
        spec: &PopulateSpec,
        defaults: &mut Vec<String>,
    ) -> Result<PopulatePlan, PopulateError> {
        let mut entries: BTreeMap<&str, &PopulateNode> = spec
            .entries
            .iter()
            .map(|(name, node)| (name.as_str(), node))
            .collect();
        if spec.wildcard {
            for attr in doc_type.relation_attributes() {
                entries.entry(attr.name.as_str()).or_insert(&DEFAULT_NODE);
            }
        }

        let mut branches = Vec::with_capacity(entries.len());
        for (attribute, node) in entries {
            branches.push(self.branch(doc_type, attribute, node, defaults)?);
        }

        Ok(PopulatePlan { branches })
    }

    fn branch(
        &self,
        doc_type: &DocumentType,
        attribute: &str,
        node: &PopulateNode,
        defaults: &mut Vec<String>,
    ) -> Result<Branch, PopulateError> {
        let unknown = || PopulateError::UnknownAttribute {
            doc_type: doc_type.name().to_string(),
            attribute: attribute.to_string(),
        };
        let attr = doc_type.attribute_def(attribute).ok_or_else(unknown)?;

        let kind = match &attr.kind {
            AttributeKind::Scalar(_) => return Err(unknown()),

            AttributeKind::RelationOne { target } | AttributeKind::RelationMany { target } => {
                if matches!(node, PopulateNode::Variants(_)) {
                    return Err(PopulateError::VariantsNotSupported {
                        doc_type: doc_type.name().to_string(),
                        attribute: attribute.to_string(),
                    });
                }
                let target_type = self.registry.try_get(target)?;

                BranchKind::Relation {
                    target: target.clone(),
                    one: matches!(attr.kind, AttributeKind::RelationOne { .. }),
                    plan: self.target(target_type, node, defaults)?,
                }
            }

            AttributeKind::Polymorphic { variants } => {
                let selected = select_variants(doc_type, attribute, variants, node)?;
                let mut plans = BTreeMap::new();
                for (tag, node) in selected {
                    let target_type = self.registry.try_get(tag)?;
                    let plan = match node {
                        PopulateNode::All => TargetPlan {
                            filter: None,
                            projection: Projection::All,
                            populate: self.variant_defaults(target_type, defaults)?,
                            versioned: target_type.has_draft_and_publish(),
                        },
                        node => self.target(target_type, node, defaults)?,
                    };
                    plans.insert(tag.to_string(), plan);
                }

                BranchKind::Polymorphic { variants: plans }
            }

            AttributeKind::DynamicZone { variants } => {
                let selected = select_variants(doc_type, attribute, variants, node)?;
                let mut plans = BTreeMap::new();
                for (tag, node) in selected {
                    let component = self.registry.try_get(tag)?;
                    plans.insert(tag.to_string(), self.component(component, node, defaults)?);
                }

                BranchKind::DynamicZone { variants: plans }
            }
        };

        Ok(Branch {
            owner: doc_type.name().to_string(),
            attribute: attr.name.clone(),
            kind,
        })
    }

    fn target(
        &self,
        target: &DocumentType,
        node: &PopulateNode,
        defaults: &mut Vec<String>,
    ) -> Result<TargetPlan, PopulateError> {
        let versioned = target.has_draft_and_publish();

        match node {
            PopulateNode::All => Ok(TargetPlan {
                filter: None,
                projection: Projection::All,
                populate: PopulatePlan::default(),
                versioned,
            }),
            PopulateNode::Shape(shape) => {
                let populate = self.plan(target, &shape.populate, defaults)?;
                let projection = projection(target, shape, &populate)?;
                let filter = match &shape.filters {
                    Some(filters) => Some(self.cache.get_or_compile(self.registry, target, filters)?.0),
                    None => None,
                };

                Ok(TargetPlan {
                    filter,
                    projection,
                    populate,
                    versioned,
                })
            }
            PopulateNode::Variants(_) => Err(PopulateError::malformed(format!(
                "nested 'onVariant' is not valid inside '{}'",
                target.name()
            ))),
        }
    }

    fn component(
        &self,
        component: &DocumentType,
        node: &PopulateNode,
        defaults: &mut Vec<String>,
    ) -> Result<ComponentPlan, PopulateError> {
        match node {
            PopulateNode::All => Ok(ComponentPlan {
                projection: Projection::All,
                populate: self.variant_defaults(component, defaults)?,
            }),
            PopulateNode::Shape(shape) => {
                if shape.filters.is_some() {
                    return Err(PopulateError::malformed(format!(
                        "'filters' is not supported on component '{}'",
                        component.name()
                    )));
                }
                let populate = self.plan(component, &shape.populate, defaults)?;

                Ok(ComponentPlan {
                    projection: projection(component, shape, &populate)?,
                    populate,
                })
            }
            PopulateNode::Variants(_) => Err(PopulateError::malformed(format!(
                "nested 'onVariant' is not valid inside '{}'",
                component.name()
            ))),
        }
    }

    fn variant_defaults(
        &self,
        doc_type: &DocumentType,
        defaults: &mut Vec<String>,
    ) -> Result<PopulatePlan, PopulateError> {
        if defaults.iter().any(|name| name == doc_type.name()) {
            return Ok(PopulatePlan::default());
        }

        defaults.push(doc_type.name().to_string());
        let spec = PopulateSpec::paths(doc_type.variant_default_populate());
        let plan = self.plan(doc_type, &spec, defaults);
        defaults.pop();

        plan
    }
}

// Bare `true` selects every variant; `onVariant` must stay within the
// permissible set.
fn select_variants<'n>(
    doc_type: &DocumentType,
    attribute: &str,
    variants: &'n BTreeSet<String>,
    node: &'n PopulateNode,
) -> Result<Vec<(&'n str, &'n PopulateNode)>, PopulateError> {
    match node {
        PopulateNode::All => Ok(variants
            .iter()
            .map(|tag| (tag.as_str(), &DEFAULT_NODE))
            .collect()),
        PopulateNode::Variants(map) => map
            .iter()
            .map(|(tag, node)| {
                if variants.contains(tag) {
                    Ok((tag.as_str(), node))
                } else {
                    Err(PopulateError::UnknownVariant {
                        doc_type: doc_type.name().to_string(),
                        attribute: attribute.to_string(),
                        variant: tag.clone(),
                    })
                }
            })
            .collect(),
        PopulateNode::Shape(_) => Err(PopulateError::malformed(format!(
            "'{}.{attribute}' has several shapes; use 'onVariant' or true",
            doc_type.name()
        ))),
    }
}

// Populated attributes always survive a field selection.
fn projection(
    doc_type: &DocumentType,
    shape: &PopulateShape,
    populate: &PopulatePlan,
) -> Result<Projection, PopulateError> {
    let Some(fields) = &shape.fields else {
        return Ok(Projection::All);
    };
    for field in fields {
        doc_type.try_attribute(field)?;
    }

    let mut projection = Projection::only(fields.iter().cloned());
    projection.extend(populate.attributes());

    Ok(projection)
}
