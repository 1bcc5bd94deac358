//! End-to-end behavior through the public engine surface.

use folio_core::{
    db::store::MemoryStore,
    error::ErrorKind,
    model::PUBLISHED_AT,
    prelude::*,
    value::Fields,
};
use serde_json::json;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

fn registry() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistry::builder()
        .register(
            DocumentType::collection("article")
                .draft_and_publish()
                .required("title", AttributeKind::text())
                .attribute("slug", AttributeKind::text())
                .attribute("views", AttributeKind::integer())
                .attribute("author", AttributeKind::relation_one("author"))
                .attribute("mentions", AttributeKind::polymorphic(["author", "tag"]))
                .attribute(
                    "blocks",
                    AttributeKind::dynamic_zone(["blocks.hero", "blocks.cta"]),
                ),
        )
        .register(
            DocumentType::collection("author")
                .required("name", AttributeKind::text())
                .attribute("email", AttributeKind::text()),
        )
        .register(DocumentType::collection("tag").required("label", AttributeKind::text()))
        .register(DocumentType::collection("media").attribute("url", AttributeKind::text()))
        .register(
            DocumentType::component("blocks.hero")
                .attribute("heading", AttributeKind::text())
                .attribute("image", AttributeKind::relation_one("media")),
        )
        .register(
            DocumentType::component("blocks.cta")
                .attribute("label", AttributeKind::text())
                .attribute("link", AttributeKind::relation_one("article")),
        )
        .build()
        .unwrap();

    Arc::new(registry)
}

fn published(id: &str, title: &str) -> Document {
    Document::new("article", id)
        .with_status(Status::Published)
        .with("title", title)
}

fn store() -> Arc<MemoryStore> {
    let store = MemoryStore::new(registry());

    store.insert(Document::new("media", "m1").with("url", "/hero.png"));
    store.insert(
        Document::new("author", "au1")
            .with("name", "Ada")
            .with("email", "ada@example.com"),
    );
    store.insert(Document::new("tag", "t1").with("label", "cms"));

    let hero = Document::new("blocks.hero", "c1")
        .with("heading", "Welcome")
        .with("image", Value::reference("m1"));
    let cta = Document::new("blocks.cta", "c2")
        .with("label", "Read more")
        .with("link", Value::reference("a2"));

    store.insert(
        published("a1", "Strapi Guide")
            .with(PUBLISHED_AT, "2024-01-01")
            .with("views", 10)
            .with("author", Value::reference("au1"))
            .with(
                "mentions",
                Value::List(vec![
                    Value::variant(Variant::reference("author", "au1")),
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
        published("a2", "Other")
            .with(PUBLISHED_AT, Value::Null)
            .with("views", 3),
    );

    Arc::new(store)
}

fn engine(store: Arc<MemoryStore>) -> Engine {
    Engine::builder(registry(), store).build().unwrap()
}

fn request(json: serde_json::Value) -> QueryRequest {
    QueryRequest::from_json(&json).unwrap()
}

fn ids(page: &PageResult<Document>) -> Vec<&str> {
    page.data.iter().map(|doc| doc.id().as_str()).collect()
}

#[tokio::test]
async fn empty_collection_returns_empty_page_metadata() {
    let engine = engine(Arc::new(MemoryStore::new(registry())));

    let page = engine
        .documents("article")
        .find_many(&request(json!({ "filters": {}, "pagination": { "page": 1, "pageSize": 10 } })))
        .await
        .unwrap();

    assert!(page.data.is_empty());
    assert_eq!(
        serde_json::to_value(page.meta).unwrap(),
        json!({ "page": 1, "pageSize": 10, "pageCount": 0, "total": 0 })
    );
}

#[tokio::test]
async fn conjunction_of_presence_and_case_insensitive_contains() {
    let engine = engine(store());

    let page = engine
        .documents("article")
        .find_many(&request(json!({
            "filters": {
                "$and": [
                    { "publishedAt": { "$notNull": true } },
                    { "title": { "$containsi": "strapi" } },
                ]
            }
        })))
        .await
        .unwrap();

    assert_eq!(ids(&page), ["a1"]);
}

#[tokio::test]
async fn dynamic_zone_populates_only_the_mapped_component() {
    let engine = engine(store());

    let article = engine
        .documents("article")
        .find_one(
            "a1",
            &request(json!({
                "populate": { "blocks": { "onVariant": { "blocks.hero": { "populate": ["image"] } } } }
            })),
        )
        .await
        .unwrap()
        .unwrap();

    let blocks = article.get("blocks").and_then(Value::as_list).unwrap();
    assert_eq!(blocks.len(), 2);

    let hero = blocks[0].as_variant().unwrap().value.as_document().unwrap();
    let image = hero.get("image").and_then(Value::as_document).unwrap();
    assert_eq!(image.get("url"), Some(&Value::text("/hero.png")));

    let cta = blocks[1].as_variant().unwrap().value.as_document().unwrap();
    assert_eq!(cta.get("link"), Some(&Value::reference("a2")));
}

#[tokio::test]
async fn unmapped_polymorphic_variants_stay_unresolved() {
    let engine = engine(store());

    let article = engine
        .documents("article")
        .find_one(
            "a1",
            &request(json!({ "populate": { "mentions": { "on": { "author": true } } } })),
        )
        .await
        .unwrap()
        .unwrap();

    let mentions = article.get("mentions").and_then(Value::as_list).unwrap();
    let author = mentions[0].as_variant().unwrap();
    assert!(author.value.as_document().is_some());

    let tag = mentions[1].as_variant().unwrap();
    assert_eq!(tag.tag, "tag");
    assert_eq!(tag.value, Value::reference("t1"));
}

#[tokio::test]
async fn before_create_derives_slug_seen_by_after_create() {
    let observed = Arc::new(std::sync::Mutex::new(None));
    let seen = observed.clone();
    let hooks = LifecycleRegistry::builder()
        .before("article", Action::Create, |event: &mut MutationEvent| {
            if event.data("slug").is_none() {
                let slug = event
                    .data("title")
                    .and_then(Value::as_text)
                    .map(|title| title.to_lowercase().replace(' ', "-"));
                if let Some(slug) = slug {
                    event.set_data("slug", slug);
                }
            }
            Ok(())
        })
        .after("article", Action::Create, move |event: &MutationEvent| {
            let slug = event
                .result()
                .and_then(|doc| doc.get("slug"))
                .cloned();
            *seen.lock().unwrap() = slug;
            Ok(())
        })
        .build()
        .unwrap();
    let engine = Engine::builder(registry(), store())
        .lifecycle(hooks)
        .build()
        .unwrap();

    let mut data = Fields::new();
    data.insert("title".to_string(), Value::text("Hello World"));
    let created = engine.documents("article").create(data, None).await.unwrap();

    assert_eq!(created.get("slug"), Some(&Value::text("hello-world")));
    assert_eq!(
        observed.lock().unwrap().clone(),
        Some(Value::text("hello-world"))
    );
}

#[tokio::test]
async fn before_hook_abort_leaves_storage_untouched() {
    let after_calls = Arc::new(AtomicBool::new(false));
    let flag = after_calls.clone();
    let hooks = LifecycleRegistry::builder()
        .before("article", Action::Create, |_: &mut MutationEvent| {
            Err(HookAbort::new("creation is closed"))
        })
        .after("article", Action::Create, move |_: &MutationEvent| {
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .build()
        .unwrap();
    let store = store();
    let engine = Engine::builder(registry(), store.clone())
        .lifecycle(hooks)
        .build()
        .unwrap();

    let mut data = Fields::new();
    data.insert("title".to_string(), Value::text("Blocked"));
    let err = engine
        .documents("article")
        .create(data, None)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HookAbort);
    assert_eq!(store.writes(), 0);
    assert!(!after_calls.load(Ordering::SeqCst));
}

#[tokio::test]
async fn after_hooks_run_in_registration_order() {
    let order = Arc::new(AtomicUsize::new(0));
    let (first, second) = (order.clone(), order.clone());
    let hooks = LifecycleRegistry::builder()
        .after("tag", Action::Update, move |_: &MutationEvent| {
            first
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .map(|_| ())
                .map_err(|_| HookFailure::new("ran out of order"))
        })
        .after("tag", Action::Update, move |_: &MutationEvent| {
            second
                .compare_exchange(1, 2, Ordering::SeqCst, Ordering::SeqCst)
                .map(|_| ())
                .map_err(|_| HookFailure::new("ran out of order"))
        })
        .build()
        .unwrap();
    let engine = Engine::builder(registry(), store())
        .lifecycle(hooks)
        .build()
        .unwrap();

    let mut data = Fields::new();
    data.insert("label".to_string(), Value::text("headless"));
    let updated = engine
        .documents("tag")
        .update("t1", data, None)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.get("label"), Some(&Value::text("headless")));
    assert_eq!(order.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn pages_past_the_last_keep_correct_metadata() {
    let engine = engine(store());
    let articles = engine.documents("article");

    for (page_size, page_count) in [(1, 2), (2, 1), (5, 1)] {
        let page = articles
            .find_many(&QueryRequest::new().page(PageRequest::page(3, page_size)))
            .await
            .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.meta.total, 2);
        assert_eq!(page.meta.page_count, page_count);
        assert_eq!(page.meta.page, 3);
    }
}

#[tokio::test]
async fn empty_membership_sets() {
    let engine = engine(store());
    let articles = engine.documents("article");

    let none = articles
        .find_many(&request(json!({ "filters": { "views": { "$in": [] } } })))
        .await
        .unwrap();
    assert!(none.data.is_empty());

    let all = articles
        .find_many(&request(json!({ "filters": { "views": { "$notIn": [] } } })))
        .await
        .unwrap();
    assert_eq!(all.meta.total, 2);
}

#[tokio::test]
async fn inverted_between_bounds_are_rejected() {
    let engine = engine(store());

    let err = engine
        .documents("article")
        .find_many(&request(json!({ "filters": { "views": { "$between": [10, 1] } } })))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Operator);
}

#[tokio::test]
async fn restricted_fields_are_a_subset_of_the_full_result() {
    let engine = engine(store());
    let articles = engine.documents("article");

    let restricted = articles
        .find_one(
            "a1",
            &request(json!({ "populate": { "author": { "fields": ["name"] } } })),
        )
        .await
        .unwrap()
        .unwrap();
    let full = articles
        .find_one("a1", &request(json!({ "populate": ["author"] })))
        .await
        .unwrap()
        .unwrap();

    let narrow = restricted.get("author").and_then(Value::as_document).unwrap();
    let wide = full.get("author").and_then(Value::as_document).unwrap();
    assert_eq!(narrow.fields().len(), 1);
    for (name, value) in narrow.fields() {
        assert_eq!(wide.get(name), Some(value));
    }
    assert!(wide.get("email").is_some());
}
