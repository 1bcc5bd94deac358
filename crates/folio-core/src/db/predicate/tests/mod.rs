mod compile;
mod parse;

use crate::{
    db::predicate::{FilterNode, Predicate, ReferenceLookup, compile as compile_filter},
    test_support::blog_registry,
    value::{Document, DocumentId},
};
use std::collections::BTreeMap;

///
/// Docs
///
/// Minimal lookup over an in-test document set.
///

#[derive(Default)]
struct Docs {
    by_key: BTreeMap<(String, DocumentId), Document>,
}

impl Docs {
    fn with(mut self, document: Document) -> Self {
        self.by_key.insert(
            (document.doc_type().to_string(), document.id().clone()),
            document,
        );
        self
    }
}

impl ReferenceLookup for Docs {
    fn lookup(&self, doc_type: &str, id: &DocumentId) -> Option<&Document> {
        self.by_key.get(&(doc_type.to_string(), id.clone()))
    }
}

fn compile_article(node: &FilterNode) -> Predicate {
    let registry = blog_registry();
    let article = registry.try_get("article").unwrap();

    compile_filter(&registry, article, node).expect("filter should compile")
}
