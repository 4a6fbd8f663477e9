use std::sync::Arc;

use services::{
    AuthService, Backend, CatalogService, CatalogView, InMemoryBackend, LearningService,
    SessionContext, SessionError,
};
use storage::repository::InMemorySessionStore;
use tutorial_core::catalog::{CatalogQuery, SortKey};
use tutorial_core::model::{Category, Credentials, Difficulty, ProgressStatus, TutorialId};
use tutorial_core::time::fixed_clock;

struct Harness {
    backend: InMemoryBackend,
    context: SessionContext,
    auth: AuthService,
    catalog: CatalogService,
    learning: LearningService,
}

fn harness() -> Harness {
    let backend = InMemoryBackend::demo(fixed_clock()).unwrap();
    let shared: Arc<dyn Backend> = Arc::new(backend.clone());
    let context = SessionContext::new();
    Harness {
        auth: AuthService::new(
            Arc::clone(&shared),
            Arc::new(InMemorySessionStore::new()),
            context.clone(),
        ),
        catalog: CatalogService::new(Arc::clone(&shared), context.clone()),
        learning: LearningService::new(shared, context.clone()),
        backend,
        context,
    }
}

fn ids(view: &CatalogView) -> Vec<&str> {
    view.tutorials().iter().map(|t| t.id.as_str()).collect()
}

/// Finish the faucet tutorial and start the fence one.
async fn make_some_progress(h: &Harness) {
    h.auth
        .login(Credentials::new("budi@example.com", "rahasia"))
        .await
        .unwrap();
    let token = h.context.token().unwrap();
    for step in 1..=3 {
        h.backend
            .record_step_progress(&token, &TutorialId::new("keran-bocor"), step, true)
            .await
            .unwrap();
    }
    h.backend
        .record_step_progress(&token, &TutorialId::new("cat-pagar"), 1, true)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_fetch_is_not_an_empty_catalog() {
    let h = harness();
    h.backend.fail_next("list_tutorials", 1).unwrap();
    let failed = h.catalog.load(&CatalogQuery::new()).await;
    assert!(failed.is_failed());
    assert!(!failed.is_empty());

    let empty = h
        .catalog
        .load(&CatalogQuery::new().with_search("tidak ada yang cocok"))
        .await;
    assert!(!empty.is_failed());
    assert!(empty.is_empty());
}

#[tokio::test]
async fn server_and_local_filters_combine() {
    let h = harness();
    let query = CatalogQuery::new()
        .with_category(Some(Category::new("Plambing")))
        .with_difficulty(Some(Difficulty::Pemula));
    let view = h.catalog.load(&query).await;
    assert_eq!(ids(&view), vec!["keran-bocor"]);

    let by_search = h.catalog.load(&CatalogQuery::new().with_search("PAGAR")).await;
    assert_eq!(ids(&by_search), vec!["cat-pagar"]);
}

#[tokio::test]
async fn duration_sort_orders_whole_catalog() {
    let h = harness();
    let asc = h
        .catalog
        .load(&CatalogQuery::new().with_sort(SortKey::DurationAsc))
        .await;
    assert_eq!(ids(&asc), vec!["keran-bocor", "stop-kontak", "cat-pagar"]);

    let desc = h
        .catalog
        .load(&CatalogQuery::new().with_sort(SortKey::DurationDesc))
        .await;
    assert_eq!(ids(&desc), vec!["cat-pagar", "stop-kontak", "keran-bocor"]);
}

#[tokio::test]
async fn status_filter_needs_a_session() {
    let h = harness();
    let completed = CatalogQuery::new().with_status(Some(ProgressStatus::Completed));

    let anonymous = h.catalog.load(&completed).await;
    assert_eq!(ids(&anonymous).len(), 3);

    make_some_progress(&h).await;
    let signed_in = h.catalog.load(&completed).await;
    assert_eq!(ids(&signed_in), vec!["keran-bocor"]);

    let started = h
        .catalog
        .load(&CatalogQuery::new().with_status(Some(ProgressStatus::InProgress)))
        .await;
    assert_eq!(ids(&started), vec!["cat-pagar"]);
}

#[tokio::test]
async fn progress_failure_only_disables_status_filter() {
    let h = harness();
    make_some_progress(&h).await;
    h.backend.fail_next("list_user_progress", 1).unwrap();

    let view = h
        .catalog
        .fetch(&CatalogQuery::new().with_status(Some(ProgressStatus::Completed)))
        .await
        .unwrap();
    assert!(view.progress.is_none());
    assert_eq!(view.tutorials.len(), 3);
    assert_eq!(view.fetched, 3);
}

#[tokio::test]
async fn learning_overview_splits_by_completion() {
    let h = harness();
    assert!(matches!(
        h.learning.overview().await.unwrap_err(),
        SessionError::SignedOut
    ));

    make_some_progress(&h).await;
    let overview = h.learning.overview().await.unwrap();

    assert_eq!(overview.total(), 2);
    assert_eq!(overview.completed.len(), 1);
    assert_eq!(overview.completed[0].tutorial_id.as_str(), "keran-bocor");
    let fence = &overview.in_progress[0];
    assert_eq!(fence.tutorial_id.as_str(), "cat-pagar");
    assert_eq!((fence.completed_steps, fence.total_steps), (1, 2));
    assert!((fence.percent - 50.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn deleted_tutorial_progress_is_skipped() {
    let h = harness();
    h.backend.keep_orphaned_progress(true).unwrap();
    make_some_progress(&h).await;

    let admin = h
        .backend
        .login(&Credentials::new("admin@example.com", "admin123"))
        .await
        .unwrap();
    h.backend
        .delete_tutorial(&admin.token, &TutorialId::new("keran-bocor"))
        .await
        .unwrap();

    let records = h
        .backend
        .list_user_progress(&h.context.token().unwrap())
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(records.iter().any(|r| r.tutorial.is_missing()));

    let overview = h.learning.overview().await.unwrap();
    assert_eq!(overview.total(), 1);
    assert_eq!(overview.in_progress[0].tutorial_id.as_str(), "cat-pagar");

    let started = h
        .catalog
        .fetch(&CatalogQuery::new().with_status(Some(ProgressStatus::InProgress)))
        .await
        .unwrap();
    assert_eq!(started.progress.map(|p| p.len()), Some(1));
    assert_eq!(started.tutorials.len(), 1);
    assert_eq!(started.tutorials[0].id.as_str(), "cat-pagar");
}
