use crate::{
    db::{
        cancel::CancelToken,
        lifecycle::{
            Action, Hook, HookAbort, HookFailure, HookPhase, LifecycleRegistry, MutationEvent,
            MutationParams, MutationState, Pipeline,
        },
        store::MemoryStore,
    },
    error::{Error, ErrorKind},
    model::SchemaError,
    obs::GlobalMetricsSink,
    test_support::{blog_registry, seeded_store},
    value::{Document, DocumentId, Status, Value},
};
use serde_json::json;
use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU32, Ordering},
};

async fn run_with(
    store: &MemoryStore,
    hooks: &LifecycleRegistry,
    cancel: &CancelToken,
    doc_type: &str,
    action: Action,
    params: MutationParams,
) -> Result<Option<Document>, Error> {
    let registry = blog_registry();

    Pipeline::new(&registry, hooks, store, cancel, &GlobalMetricsSink)
        .run(doc_type, action, params)
        .await
}

async fn run(
    store: &MemoryStore,
    hooks: &LifecycleRegistry,
    doc_type: &str,
    action: Action,
    params: MutationParams,
) -> Result<Option<Document>, Error> {
    run_with(store, hooks, &CancelToken::never(), doc_type, action, params).await
}

fn data(json: serde_json::Value) -> MutationParams {
    let serde_json::Value::Object(map) = json else {
        panic!("data must be an object");
    };

    MutationParams {
        data: map
            .iter()
            .map(|(key, value)| (key.clone(), Value::from_json(value)))
            .collect(),
        ..MutationParams::default()
    }
}

fn target(id: &str) -> MutationParams {
    MutationParams {
        document_id: Some(DocumentId::new(id)),
        ..MutationParams::default()
    }
}

fn slugify(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

#[tokio::test]
async fn before_abort_skips_the_write_and_after_hooks() {
    let store = seeded_store();
    let later_before = Arc::new(AtomicU32::new(0));
    let after = Arc::new(AtomicU32::new(0));

    let hooks = {
        let later_before = Arc::clone(&later_before);
        let after = Arc::clone(&after);
        LifecycleRegistry::builder()
            .before("article", Action::Create, |_| Err(HookAbort::new("closed for edits")))
            .before("article", Action::Create, move |_| {
                later_before.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .after("article", Action::Create, move |_| {
                after.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap()
    };

    let err = run(&store, &hooks, "article", Action::Create, data(json!({ "title": "New" })))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::HookAbort);
    assert!(matches!(err, Error::HookAbort(ref abort) if abort.message() == "closed for edits"));
    assert_eq!(store.writes(), 0);
    assert_eq!(later_before.load(Ordering::SeqCst), 0);
    assert_eq!(after.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn before_create_derives_a_slug_seen_by_after_create() {
    let store = seeded_store();
    let observed = Arc::new(Mutex::new(None::<Value>));

    let hooks = {
        let observed = Arc::clone(&observed);
        LifecycleRegistry::builder()
            .before("article", Action::Create, |event| {
                if event.data("slug").is_none() {
                    let slug = event.data("title").and_then(Value::as_text).map(slugify);
                    event.set_data("slug", slug);
                }
                Ok(())
            })
            .after("article", Action::Create, move |event| {
                let slug = event.result().and_then(|doc| doc.value_of("slug"));
                *observed.lock().unwrap_or_else(PoisonError::into_inner) = slug;
                Ok(())
            })
            .build()
            .unwrap()
    };

    let created = run(
        &store,
        &hooks,
        "article",
        Action::Create,
        data(json!({ "title": "Hello World" })),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(created.get("slug"), Some(&Value::text("hello-world")));
    let stored = store.get("article", created.id(), Some(Status::Draft)).unwrap();
    assert_eq!(stored.get("slug"), Some(&Value::text("hello-world")));
    assert_eq!(
        *observed.lock().unwrap_or_else(PoisonError::into_inner),
        Some(Value::text("hello-world"))
    );
}

#[tokio::test]
async fn hooks_run_in_registration_order_with_shared_context() {
    let store = seeded_store();
    let trace = Arc::new(Mutex::new(Vec::new()));

    let push = |label: &'static str| {
        let trace = Arc::clone(&trace);
        move || trace.lock().unwrap_or_else(PoisonError::into_inner).push(label)
    };
    let (b1, b2, a1, a2) = (push("b1"), push("b2"), push("a1"), push("a2"));

    let hooks = LifecycleRegistry::builder()
        .before("tag", Action::Update, move |event: &mut MutationEvent| {
            b1();
            event.context.insert("actor".to_string(), json!("editor"));
            Ok(())
        })
        .before("tag", Action::Update, move |event: &mut MutationEvent| {
            b2();
            assert_eq!(event.context.get("actor"), Some(&json!("editor")));
            assert_eq!(event.state(), MutationState::BeforeHooksRunning);
            assert!(event.result().is_none());
            Ok(())
        })
        .after("tag", Action::Update, move |event: &MutationEvent| {
            a1();
            assert_eq!(event.state(), MutationState::AfterHooksRunning);
            assert_eq!(event.context.get("actor"), Some(&json!("editor")));
            Ok(())
        })
        .after("tag", Action::Update, move |_: &MutationEvent| {
            a2();
            Ok(())
        })
        .build()
        .unwrap();

    let mut params = target("t1");
    params.data.insert("label".to_string(), Value::text("headless"));
    let updated = run(&store, &hooks, "tag", Action::Update, params)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.get("label"), Some(&Value::text("headless")));
    assert_eq!(
        *trace.lock().unwrap_or_else(PoisonError::into_inner),
        ["b1", "b2", "a1", "a2"]
    );
}

#[tokio::test]
async fn after_hook_failures_keep_the_committed_write() {
    let store = seeded_store();
    let ran = Arc::new(AtomicU32::new(0));

    let hooks = {
        let ran = Arc::clone(&ran);
        LifecycleRegistry::builder()
            .after("tag", Action::Create, |_| Err(HookFailure::new("webhook down")))
            .after("tag", Action::Create, move |_| {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .after("tag", Action::Create, |_| Err(HookFailure::new("audit down")))
            .build()
            .unwrap()
    };

    let err = run(&store, &hooks, "tag", Action::Create, data(json!({ "label": "new" })))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AfterHook);
    let Error::AfterHook(err) = err else {
        panic!("expected an after-hook error");
    };
    assert_eq!(err.action(), Action::Create);
    let messages: Vec<&str> = err.failures().iter().map(HookFailure::message).collect();
    assert_eq!(messages, ["webhook down", "audit down"]);
    assert_eq!(ran.load(Ordering::SeqCst), 1);

    let committed = err.into_result().unwrap();
    assert!(store.get("tag", committed.id(), None).is_some());
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn input_is_validated_after_before_hooks() {
    let store = seeded_store();
    let hooks = LifecycleRegistry::default();

    let cases = [
        json!({ "title": "T", "nope": 1 }),
        json!({ "title": "T", "views": "many" }),
        json!({ "title": "T", "releasedOn": "yesterday" }),
        json!({ "title": "T", "blocks": [{ "__component": "blocks.nope" }] }),
        json!({ "slug": "no-title" }),
    ];
    for case in cases {
        let err = run(&store, &hooks, "article", Action::Create, data(case.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema, "{case}");
    }

    let err = run(&store, &hooks, "article", Action::Create, data(json!({ "slug": "x" })))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Schema(SchemaError::MissingField { ref field, .. }) if field == "title"
    ));
    assert_eq!(store.writes(), 0);

    // A hook can repair input before validation sees it.
    let hooks = LifecycleRegistry::builder()
        .before("article", Action::Create, |event| {
            event.params.data.remove("nope");
            Ok(())
        })
        .build()
        .unwrap();
    run(&store, &hooks, "article", Action::Create, data(json!({ "title": "T", "nope": 1 })))
        .await
        .unwrap();
}

#[tokio::test]
async fn input_relations_and_components_are_coerced() {
    let store = seeded_store();
    let params = data(json!({
        "title": "Shapes",
        "views": 1,
        "rating": 4,
        "documentId": "ignored",
        "author": "au1",
        "tags": ["t1", { "documentId": "t2" }],
        "mentions": [{ "__type": "tag", "documentId": "t1" }],
        "blocks": [{ "__component": "blocks.hero", "heading": "Hi", "image": "m1" }],
        "meta": { "seo": true }
    }));

    let created = run(&store, &LifecycleRegistry::default(), "article", Action::Create, params)
        .await
        .unwrap()
        .unwrap();

    assert_ne!(created.id().as_str(), "ignored");
    assert_eq!(created.get("rating"), Some(&Value::Float(4.0)));
    assert_eq!(created.get("author"), Some(&Value::reference("au1")));
    assert_eq!(created.get("tags"), Some(&Value::references(["t1", "t2"])));
    assert_eq!(created.get("meta"), Some(&Value::Json(json!({ "seo": true }))));

    let mention = created.get("mentions").and_then(Value::as_list).unwrap()[0]
        .as_variant()
        .unwrap();
    assert_eq!(mention.tag, "tag");
    assert_eq!(mention.value, Value::reference("t1"));

    let block = created.get("blocks").and_then(Value::as_list).unwrap()[0]
        .as_variant()
        .unwrap();
    assert_eq!(block.tag, "blocks.hero");
    let hero = block.value.as_document().unwrap();
    assert_eq!(hero.get("image"), Some(&Value::reference("m1")));
    assert_eq!(hero.get("heading"), Some(&Value::text("Hi")));
}

#[tokio::test]
async fn publish_requires_draft_and_publish() {
    let store = seeded_store();
    let called = Arc::new(AtomicU32::new(0));
    let hooks = {
        let called = Arc::clone(&called);
        LifecycleRegistry::builder()
            .before("tag", Action::Publish, move |_| {
                called.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap()
    };

    let err = run(&store, &hooks, "tag", Action::Publish, target("t1"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Schema(SchemaError::DraftPublishDisabled { .. })));
    assert_eq!(called.load(Ordering::SeqCst), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn status_rewritten_by_a_hook_is_checked_before_the_write() {
    let after = Arc::new(AtomicU32::new(0));
    let after_count = after.clone();
    let store = seeded_store();
    let hooks = LifecycleRegistry::builder()
        .before("tag", Action::Create, |event| {
            event.params.status = Some(Status::Draft);
            Ok(())
        })
        .after("tag", Action::Create, move |_| {
            after_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .build()
        .unwrap();

    let err = run(&store, &hooks, "tag", Action::Create, data(json!({ "label": "new" })))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Schema(SchemaError::UnsupportedStatus { .. })));
    assert_eq!(store.writes(), 0);
    assert_eq!(after.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn publish_and_unpublish_move_the_published_copy() {
    let store = seeded_store();
    let hooks = LifecycleRegistry::default();

    let created = run(&store, &hooks, "article", Action::Create, data(json!({ "title": "Draft" })))
        .await
        .unwrap()
        .unwrap();
    assert!(store.get("article", created.id(), Some(Status::Published)).is_none());

    let published = run(&store, &hooks, "article", Action::Publish, target(created.id()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(published.status(), Some(Status::Published));
    assert!(store.get("article", created.id(), Some(Status::Published)).is_some());

    run(&store, &hooks, "article", Action::Unpublish, target(created.id()))
        .await
        .unwrap();
    assert!(store.get("article", created.id(), Some(Status::Published)).is_none());
}

#[tokio::test]
async fn missing_targets_still_run_after_hooks() {
    let store = seeded_store();
    let saw_none = Arc::new(AtomicU32::new(0));
    let hooks = {
        let saw_none = Arc::clone(&saw_none);
        LifecycleRegistry::builder()
            .after("article", Action::Delete, move |event| {
                if event.result().is_none() {
                    saw_none.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            })
            .build()
            .unwrap()
    };

    let out = run(&store, &hooks, "article", Action::Delete, target("ghost"))
        .await
        .unwrap();

    assert!(out.is_none());
    assert_eq!(saw_none.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_create_actions_need_a_document_id() {
    let store = seeded_store();
    let err = run(
        &store,
        &LifecycleRegistry::default(),
        "article",
        Action::Delete,
        MutationParams::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::Schema(SchemaError::MissingField { .. })));
}

#[tokio::test]
async fn cancelled_mutations_never_start() {
    let store = seeded_store();
    let (handle, token) = CancelToken::new();
    handle.cancel();

    let err = run_with(
        &store,
        &LifecycleRegistry::default(),
        &token,
        "tag",
        Action::Create,
        data(json!({ "label": "late" })),
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn adapter_failures_propagate_without_after_hooks() {
    let store = seeded_store();
    store.fail_type("tag");
    let after = Arc::new(AtomicU32::new(0));
    let hooks = {
        let after = Arc::clone(&after);
        LifecycleRegistry::builder()
            .after("tag", Action::Create, move |_| {
                after.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .build()
            .unwrap()
    };

    let err = run(&store, &hooks, "tag", Action::Create, data(json!({ "label": "x" })))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Adapter);
    assert_eq!(after.load(Ordering::SeqCst), 0);
}

#[test]
fn state_machine_only_aborts_from_before_hooks() {
    use MutationState::*;

    assert!(Pending.can_transition_to(BeforeHooksRunning));
    assert!(BeforeHooksRunning.can_transition_to(Aborted));
    assert!(!Writing.can_transition_to(Aborted));
    assert!(!AfterHooksRunning.can_transition_to(Aborted));
    assert!(!Done.can_transition_to(Pending));
    assert!(Done.is_terminal() && Aborted.is_terminal());
}

#[test]
fn phases_pair_with_actions() {
    for action in Action::ALL {
        let before = HookPhase::before(action);
        let after = HookPhase::after(action);

        assert!(before.is_before() && !after.is_before());
        assert_eq!(before.action(), action);
        assert_eq!(HookPhase::from_name(after.name()), Some(after));
    }
    assert_eq!(HookPhase::BeforeCreate.name(), "beforeCreate");
    assert_eq!(HookPhase::from_name("beforeDestroy"), None);
}

#[test]
fn builder_rejects_hooks_under_the_wrong_phase() {
    let err = LifecycleRegistry::builder()
        .register(
            "article",
            HookPhase::BeforeCreate,
            Hook::After(Arc::new(|_: &MutationEvent| Ok(()))),
        )
        .build()
        .unwrap_err();

    assert!(err.to_string().contains("beforeCreate"));
}

#[test]
fn registry_counts_hooks_per_type() {
    let hooks = LifecycleRegistry::builder()
        .before("article", Action::Create, |_| Ok(()))
        .before("article", Action::Create, |_| Ok(()))
        .after("tag", Action::Delete, |_| Ok(()))
        .build()
        .unwrap();

    assert_eq!(hooks.len(), 3);
    assert_eq!(hooks.before_hooks("article", Action::Create).len(), 2);
    assert!(hooks.after_hooks("article", Action::Create).is_empty());
    assert_eq!(hooks.doc_types().collect::<Vec<_>>(), ["article", "tag"]);
    assert!(LifecycleRegistry::default().is_empty());
}
