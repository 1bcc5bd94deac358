//! Module: populate::resolve
//! Responsibility: walk a `PopulatePlan` level by level over a document set.
//! Does not own: validation; plans arrive fully checked.
//! Boundary: one adapter fetch per (target, attribute, branch) per level.

use crate::{
    db::{
        cancel::CancelToken,
        populate::plan::{Branch, BranchKind, ComponentPlan, PopulatePlan, TargetPlan},
        store::DocumentStore,
    },
    error::Error,
    obs::{MetricsEvent, MetricsSink},
    value::{Document, DocumentId, Status, Value, Variant},
};
use futures::future::{self, BoxFuture};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};
use tracing::debug;

type Resolved = Vec<(usize, Value)>;

///
/// Link
///
/// One `(documentId, attribute)` step on the current call chain.
///

#[derive(Debug)]
struct Link {
    id: DocumentId,
    attribute: String,
    parent: Chain,
}

type Chain = Option<Arc<Link>>;

fn on_chain(chain: &Chain, id: &DocumentId, attribute: &str) -> bool {
    let mut cursor = chain.as_deref();
    while let Some(link) = cursor {
        if link.id == *id && link.attribute == attribute {
            return true;
        }
        cursor = link.parent.as_deref();
    }

    false
}

fn push(chain: &Chain, id: &DocumentId, attribute: &str) -> Chain {
    Some(Arc::new(Link {
        id: id.clone(),
        attribute: attribute.to_string(),
        parent: chain.clone(),
    }))
}

///
/// Slot
///
/// A document being populated plus the chain that led to it.
///

struct Slot<'d> {
    doc: &'d mut Document,
    chain: Chain,
}

///
/// Item
///
/// One detached attribute value awaiting resolution.
///

struct Item {
    index: usize,
    parent: DocumentId,
    chain: Chain,
    value: Value,
}

///
/// Resolver
///

pub(crate) struct Resolver<'a> {
    store: &'a dyn DocumentStore,
    status: Option<Status>,
    cancel: &'a CancelToken,
    sink: &'a dyn MetricsSink,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        store: &'a dyn DocumentStore,
        status: Option<Status>,
        cancel: &'a CancelToken,
        sink: &'a dyn MetricsSink,
    ) -> Self {
        Self {
            store,
            status,
            cancel,
            sink,
        }
    }

    /// Populate `roots` in place. Order and length are preserved.
    pub(crate) async fn resolve(&self, roots: &mut [Document], plan: &PopulatePlan) -> Result<(), Error> {
        if plan.is_empty() || roots.is_empty() {
            return Ok(());
        }

        let slots = roots
            .iter_mut()
            .map(|doc| Slot { doc, chain: None })
            .collect();

        self.populate(slots, plan).await
    }

    // Branch values are detached first so sibling branches own disjoint data
    // and can run concurrently.
    fn populate<'f>(&'f self, mut slots: Vec<Slot<'f>>, plan: &'f PopulatePlan) -> BoxFuture<'f, Result<(), Error>> {
        Box::pin(async move {
            if slots.is_empty() || plan.is_empty() {
                return Ok(());
            }

            let mut work = Vec::with_capacity(plan.branches.len());
            for branch in &plan.branches {
                let items: Vec<Item> = slots
                    .iter_mut()
                    .enumerate()
                    .filter_map(|(index, slot)| {
                        let value = slot.doc.fields_mut().remove(&branch.attribute)?;
                        Some(Item {
                            index,
                            parent: slot.doc.id().clone(),
                            chain: slot.chain.clone(),
                            value,
                        })
                    })
                    .collect();
                work.push((branch, items));
            }

            let resolved =
                future::try_join_all(work.into_iter().map(|(branch, items)| self.branch(branch, items)))
                    .await?;

            for (branch, values) in plan.branches.iter().zip(resolved) {
                for (index, value) in values {
                    slots[index].doc.set(branch.attribute.clone(), value);
                }
            }

            Ok(())
        })
    }

    async fn branch(&self, branch: &Branch, items: Vec<Item>) -> Result<Resolved, Error> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        match &branch.kind {
            BranchKind::Relation { target, one, plan } => {
                self.relation(branch, target, *one, plan, items).await
            }
            BranchKind::Polymorphic { variants } => self.polymorphic(branch, variants, items).await,
            BranchKind::DynamicZone { variants } => self.dynamic_zone(variants, items).await,
        }
    }

    async fn relation(
        &self,
        branch: &Branch,
        target: &str,
        one: bool,
        plan: &TargetPlan,
        items: Vec<Item>,
    ) -> Result<Resolved, Error> {
        let (live, mut out) = self.split_cycles(branch, items);

        let ids = unique_refs(live.iter().map(|item| &item.value));
        let rows = self.fetch(target, &branch.attribute, &ids, plan).await?;
        let by_id: BTreeMap<&DocumentId, &Document> = rows.iter().map(|doc| (doc.id(), doc)).collect();

        // Missing or filtered-out targets are dropped.
        let mut children: Vec<(Item, Vec<Document>)> = live
            .into_iter()
            .map(|item| {
                let mut refs = Vec::new();
                item.value.collect_refs(&mut refs);
                let docs = refs
                    .into_iter()
                    .filter_map(|id| by_id.get(id).map(|doc| (*doc).clone()))
                    .collect();
                (item, docs)
            })
            .collect();

        let slots = children
            .iter_mut()
            .flat_map(|(item, docs)| {
                let chain = push(&item.chain, &item.parent, &branch.attribute);
                docs.iter_mut().map(move |doc| Slot {
                    doc,
                    chain: chain.clone(),
                })
            })
            .collect();
        self.populate(slots, &plan.populate).await?;

        for (item, docs) in children {
            let value = if one {
                docs.into_iter().next().map_or(Value::Null, Value::from)
            } else {
                Value::List(docs.into_iter().map(Value::from).collect())
            };
            out.push((item.index, value));
        }

        Ok(out)
    }

    async fn polymorphic(
        &self,
        branch: &Branch,
        plans: &BTreeMap<String, TargetPlan>,
        items: Vec<Item>,
    ) -> Result<Resolved, Error> {
        let (mut live, mut out) = self.split_cycles(branch, items);

        // One fetch per selected variant tag, all tags concurrently.
        let fetches = plans.iter().map(|(tag, plan)| {
            let ids = unique_refs(
                live.iter()
                    .flat_map(|item| variants(&item.value))
                    .filter(|variant| variant.tag == *tag)
                    .map(|variant| &variant.value),
            );
            async move {
                let rows = self.fetch(tag, &branch.attribute, &ids, plan).await?;
                let rows: BTreeMap<DocumentId, Document> =
                    rows.into_iter().map(|doc| (doc.id().clone(), doc)).collect();

                Ok::<_, Error>((tag.as_str(), rows))
            }
        });
        let fetched: BTreeMap<&str, BTreeMap<DocumentId, Document>> =
            future::try_join_all(fetches).await?.into_iter().collect();

        for item in &mut live {
            attach_variants(&mut item.value, &fetched);
        }

        let mut groups: BTreeMap<&str, Vec<Slot<'_>>> = BTreeMap::new();
        for item in &mut live {
            let chain = push(&item.chain, &item.parent, &branch.attribute);
            for variant in variants_mut(&mut item.value) {
                let Some((tag, _)) = fetched.get_key_value(variant.tag.as_str()) else {
                    continue;
                };
                if let Value::Doc(doc) = &mut variant.value {
                    groups.entry(*tag).or_default().push(Slot {
                        doc: &mut **doc,
                        chain: chain.clone(),
                    });
                }
            }
        }
        future::try_join_all(groups.into_iter().filter_map(|(tag, slots)| {
            plans
                .get(tag)
                .map(|plan| self.populate(slots, &plan.populate))
        }))
        .await?;

        out.extend(live.into_iter().map(|item| (item.index, item.value)));

        Ok(out)
    }

    // Components are embedded: no fetch, no chain step.
    async fn dynamic_zone(
        &self,
        plans: &BTreeMap<String, ComponentPlan>,
        mut items: Vec<Item>,
    ) -> Result<Resolved, Error> {
        let mut groups: BTreeMap<&str, Vec<Slot<'_>>> = BTreeMap::new();
        for item in &mut items {
            for variant in variants_mut(&mut item.value) {
                let Some((tag, plan)) = plans.get_key_value(variant.tag.as_str()) else {
                    continue;
                };
                if let Value::Doc(doc) = &mut variant.value {
                    plan.projection.retain(doc);
                    groups.entry(tag.as_str()).or_default().push(Slot {
                        doc: &mut **doc,
                        chain: item.chain.clone(),
                    });
                }
            }
        }

        future::try_join_all(groups.into_iter().filter_map(|(tag, slots)| {
            plans
                .get(tag)
                .map(|plan| self.populate(slots, &plan.populate))
        }))
        .await?;

        Ok(items.into_iter().map(|item| (item.index, item.value)).collect())
    }

    // Revisits of a (documentId, attribute) pair keep their bare references.
    fn split_cycles(&self, branch: &Branch, items: Vec<Item>) -> (Vec<Item>, Resolved) {
        let mut live = Vec::with_capacity(items.len());
        let mut skipped = Vec::new();

        for item in items {
            if on_chain(&item.chain, &item.parent, &branch.attribute) {
                debug!(doc_type = %branch.owner, attribute = %branch.attribute, id = %item.parent, "populate cycle skipped");
                self.sink.record(MetricsEvent::CycleSkip {
                    doc_type: &branch.owner,
                });
                skipped.push((item.index, item.value));
            } else {
                live.push(item);
            }
        }

        (live, skipped)
    }

    async fn fetch(
        &self,
        target: &str,
        attribute: &str,
        ids: &[DocumentId],
        plan: &TargetPlan,
    ) -> Result<Vec<Document>, Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let status = plan
            .versioned
            .then(|| self.status.unwrap_or(Status::Published));
        let rows = self
            .cancel
            .run(async {
                self.store
                    .fetch_by_references(target, ids, plan.filter.as_deref(), &plan.projection, status)
                    .await
                    .map_err(Error::from)
            })
            .await?;

        let requested = u64::try_from(ids.len()).unwrap_or(u64::MAX);
        let fetched = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        debug!(doc_type = target, attribute, requested, fetched, "populate batch");
        self.sink.record(MetricsEvent::PopulateBatch {
            doc_type: target,
            attribute,
            requested,
            fetched,
        });

        Ok(rows)
    }
}

fn unique_refs<'v>(values: impl Iterator<Item = &'v Value>) -> Vec<DocumentId> {
    let mut refs = Vec::new();
    for value in values {
        value.collect_refs(&mut refs);
    }

    let mut seen = BTreeSet::new();
    refs.into_iter()
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

fn variants(value: &Value) -> Vec<&Variant> {
    match value {
        Value::Variant(variant) => vec![&**variant],
        Value::List(items) => items.iter().filter_map(Value::as_variant).collect(),
        _ => Vec::new(),
    }
}

fn variants_mut(value: &mut Value) -> Vec<&mut Variant> {
    match value {
        Value::Variant(variant) => vec![&mut **variant],
        Value::List(items) => items
            .iter_mut()
            .filter_map(|item| match item {
                Value::Variant(variant) => Some(&mut **variant),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

// Swap fetched targets in for their references. Instances of a fetched tag
// whose target is gone are dropped; other tags are left as they are.
fn attach_variants(value: &mut Value, fetched: &BTreeMap<&str, BTreeMap<DocumentId, Document>>) {
    match value {
        Value::List(items) => items.retain_mut(|item| attach_one(item, fetched)),
        Value::Variant(_) => {
            if !attach_one(value, fetched) {
                *value = Value::Null;
            }
        }
        _ => {}
    }
}

fn attach_one(item: &mut Value, fetched: &BTreeMap<&str, BTreeMap<DocumentId, Document>>) -> bool {
    let Value::Variant(variant) = item else {
        return true;
    };
    let Some(rows) = fetched.get(variant.tag.as_str()) else {
        return true;
    };
    let Value::Ref(id) = &variant.value else {
        return true;
    };

    match rows.get(id) {
        Some(doc) => {
            variant.value = Value::Doc(Box::new(doc.clone()));
            true
        }
        None => false,
    }
}
