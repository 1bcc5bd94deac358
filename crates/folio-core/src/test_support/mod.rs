//! Shared fixtures for core tests: a small blog schema and seeded documents.

use crate::{
    db::store::MemoryStore,
    model::{AttributeKind, DocumentType, SchemaRegistry},
    value::{Document, Status, Value, Variant},
};
use std::sync::Arc;

/// Blog schema used across module tests.
///
/// `article.related` and `author.articles` form relation cycles on purpose.
#[must_use]
pub fn blog_registry() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistry::builder()
        .register(
            DocumentType::collection("article")
                .draft_and_publish()
                .required("title", AttributeKind::text())
                .attribute("slug", AttributeKind::text())
                .attribute("views", AttributeKind::integer())
                .attribute("rating", AttributeKind::float())
                .attribute("featured", AttributeKind::boolean())
                .attribute("releasedOn", AttributeKind::datetime())
                .attribute("meta", AttributeKind::json())
                .attribute("author", AttributeKind::relation_one("author"))
                .attribute("tags", AttributeKind::relation_many("tag"))
                .attribute("related", AttributeKind::relation_many("article"))
                .attribute("mentions", AttributeKind::polymorphic(["author", "tag"]))
                .attribute(
                    "blocks",
                    AttributeKind::dynamic_zone(["blocks.hero", "blocks.cta"]),
                ),
        )
        .register(
            DocumentType::collection("author")
                .required("name", AttributeKind::text())
                .attribute("email", AttributeKind::text())
                .attribute("avatar", AttributeKind::relation_one("media"))
                .attribute("articles", AttributeKind::relation_many("article"))
                .default_populate(["avatar"]),
        )
        .register(DocumentType::collection("tag").required("label", AttributeKind::text()))
        .register(
            DocumentType::collection("media")
                .attribute("url", AttributeKind::text())
                .attribute("alt", AttributeKind::text()),
        )
        .register(
            DocumentType::component("blocks.hero")
                .attribute("heading", AttributeKind::text())
                .attribute("image", AttributeKind::relation_one("media"))
                .default_populate(["image"]),
        )
        .register(
            DocumentType::component("blocks.cta")
                .attribute("label", AttributeKind::text())
                .attribute("link", AttributeKind::relation_one("article")),
        )
        .build();

    match registry {
        Ok(registry) => Arc::new(registry),
        Err(err) => panic!("blog schema must build: {err}"),
    }
}

/// Published article fixture with the given id and title.
#[must_use]
pub fn article(id: &str, title: &str) -> Document {
    Document::new("article", id)
        .with_status(Status::Published)
        .with("title", title)
}

/// Seeded store:
///
/// - `a1` "Strapi Guide" (views 10, author `au1`, tags `t1,t2`, related `a2`,
///   mentions author `au2` and tag `t1`, blocks hero + cta)
/// - `a2` "Other" (views 3, author `au2`, related `a1`, no publish date)
/// - `a3` "Rust in Production" (views 42, author `au1`, tags `t2`)
#[must_use]
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new(blog_registry());

    let hero = Document::new("blocks.hero", "c1")
        .with("heading", "Welcome")
        .with("image", Value::reference("m2"));
    let cta = Document::new("blocks.cta", "c2")
        .with("label", "Read more")
        .with("link", Value::reference("a2"));

    store.insert(Document::new("media", "m1").with("url", "/m1.png"));
    store.insert(Document::new("media", "m2").with("url", "/m2.png").with("alt", "hero"));
    store.insert(
        Document::new("author", "au1")
            .with("name", "Ada")
            .with("email", "ada@example.com")
            .with("avatar", Value::reference("m1"))
            .with("articles", Value::references(["a1", "a3"])),
    );
    store.insert(
        Document::new("author", "au2")
            .with("name", "Grace")
            .with("articles", Value::references(["a2"])),
    );
    store.insert(Document::new("tag", "t1").with("label", "cms"));
    store.insert(Document::new("tag", "t2").with("label", "rust"));

    store.insert(
        article("a1", "Strapi Guide")
            .with("slug", "strapi-guide")
            .with("views", 10)
            .with("rating", 4.5)
            .with("featured", true)
            .with("releasedOn", "2024-01-01")
            .with("author", Value::reference("au1"))
            .with("tags", Value::references(["t1", "t2"]))
            .with("related", Value::references(["a2"]))
            .with(
                "mentions",
                Value::List(vec![
                    Value::variant(Variant::reference("author", "au2")),
                    Value::variant(Variant::reference("tag", "t1")),
                ]),
            )
            .with(
                "blocks",
                Value::List(vec![
                    Value::variant(Variant::embedded(hero)),
                    Value::variant(Variant::embedded(cta)),
                ]),
            ),
    );
    store.insert(
        article("a2", "Other")
            .with("views", 3)
            .with("releasedOn", Value::Null)
            .with("author", Value::reference("au2"))
            .with("related", Value::references(["a1"])),
    );
    store.insert(
        article("a3", "Rust in Production")
            .with("views", 42)
            .with("rating", 3.0)
            .with("releasedOn", "2024-03-15T12:00:00Z")
            .with("author", Value::reference("au1"))
            .with("tags", Value::references(["t2"])),
    );

    store
}
