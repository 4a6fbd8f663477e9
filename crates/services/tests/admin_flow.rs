use std::sync::Arc;

use services::{
    AdminError, AdminService, ApiError, AuthService, Backend, InMemoryBackend, MediaService,
    SessionContext,
};
use storage::repository::InMemorySessionStore;
use tutorial_core::catalog::SortKey;
use tutorial_core::media::{MediaError, MediaHost, MediaKind};
use tutorial_core::model::{
    Credentials, RegistrationForm, Role, SkillLevel, TutorialDraft, TutorialId, UserId, UserPatch,
};
use tutorial_core::steps::StepDraft;
use tutorial_core::user_query::UserQuery;
use tutorial_core::time::fixed_clock;

struct Harness {
    backend: InMemoryBackend,
    auth: AuthService,
    admin: AdminService,
    media: MediaService,
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
        admin: AdminService::new(Arc::clone(&shared), context.clone()),
        media: MediaService::new(shared, context, Some(MediaHost::new("demo").unwrap())),
        backend,
    }
}

async fn as_admin() -> Harness {
    let h = harness();
    h.auth
        .admin_login(Credentials::new("admin@example.com", "admin123"))
        .await
        .unwrap();
    h
}

fn draft(title: &str, duration: &str) -> TutorialDraft {
    TutorialDraft {
        title: title.into(),
        category: "Pertukangan Kayu".into(),
        difficulty: "Pemula".into(),
        duration: duration.into(),
        ..TutorialDraft::default()
    }
}

#[tokio::test]
async fn members_are_forbidden() {
    let h = harness();
    assert!(matches!(
        h.admin.dashboard_stats().await.unwrap_err(),
        AdminError::Forbidden
    ));

    h.auth
        .login(Credentials::new("budi@example.com", "rahasia"))
        .await
        .unwrap();
    assert!(matches!(
        h.admin.users(&UserQuery::new()).await.unwrap_err(),
        AdminError::Forbidden
    ));
}

#[tokio::test]
async fn dashboard_counts_and_degrades_progress() {
    let h = as_admin().await;
    let stats = h.admin.dashboard_stats().await.unwrap();
    assert_eq!((stats.total_users, stats.total_tutorials), (2, 3));
    assert_eq!(stats.total_progress, 0);

    h.backend.fail_next("list_user_progress", 1).unwrap();
    let degraded = h.admin.dashboard_stats().await.unwrap();
    assert_eq!(degraded.total_progress, 0);
    assert_eq!(degraded.total_tutorials, 3);
}

#[tokio::test]
async fn tutorial_lifecycle() {
    let h = as_admin().await;

    let created = h.admin.create_tutorial(draft("Membuat Rak", "90")).await.unwrap();
    assert_eq!(created.description, TutorialDraft::DEFAULT_DESCRIPTION);
    assert_eq!(created.author, TutorialDraft::DEFAULT_AUTHOR);
    assert!(created.steps.is_empty());

    let invalid = h.admin.create_tutorial(draft("", "0")).await.unwrap_err();
    let AdminError::Api(ApiError::Validation(errors)) = invalid else {
        panic!("expected field errors, got {invalid:?}");
    };
    assert!(errors.contains("title"));
    assert!(errors.contains("duration"));

    let updated = h
        .admin
        .update_tutorial(&created.id, draft("Membuat Rak Dinding", "120"))
        .await
        .unwrap();
    assert_eq!(updated.title, "Membuat Rak Dinding");
    assert_eq!(updated.duration, 120);

    let hidden = h.admin.toggle_active(&updated).await.unwrap();
    assert!(!hidden.is_active);
    let shown = h.admin.toggle_active(&hidden).await.unwrap();
    assert!(shown.is_active);

    let by_duration = h.admin.tutorials(SortKey::DurationDesc).await.unwrap();
    assert_eq!(by_duration[0].id, created.id);

    h.admin.delete_tutorial(&created.id).await.unwrap();
    assert_eq!(h.admin.tutorials(SortKey::None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn step_edits_save_and_rebase() {
    let h = as_admin().await;
    let id = TutorialId::new("cat-pagar");
    let mut steps = h.admin.open_steps(&id).await.unwrap();

    steps
        .add(StepDraft::new("Keringkan", "Biarkan semalaman."))
        .unwrap();
    steps.move_up(2).unwrap();
    let before = steps.version();

    let saved = h.admin.save_steps(&mut steps).await.unwrap();
    let titles: Vec<_> = saved.steps.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Amplas permukaan", "Keringkan", "Cat dua lapis"]);
    let numbers: Vec<_> = saved.steps.iter().map(|s| s.step_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(steps.version(), before + 1);
    assert!(!steps.is_dirty());

    // A second save from the rebased list goes through.
    steps.remove(1).unwrap();
    h.admin.save_steps(&mut steps).await.unwrap();
}

#[tokio::test]
async fn stale_step_list_conflicts() {
    let h = as_admin().await;
    let id = TutorialId::new("keran-bocor");
    let mut mine = h.admin.open_steps(&id).await.unwrap();
    let mut theirs = h.admin.open_steps(&id).await.unwrap();

    theirs.remove(0).unwrap();
    h.admin.save_steps(&mut theirs).await.unwrap();

    mine.move_down(0).unwrap();
    let err = h.admin.save_steps(&mut mine).await.unwrap_err();
    assert!(matches!(err, AdminError::Api(ApiError::Conflict { .. })));
    assert!(mine.is_dirty());
    assert_eq!(mine.len(), 3);
}

#[tokio::test]
async fn user_management_filters_and_patches() {
    let h = as_admin().await;
    h.admin
        .create_user(RegistrationForm {
            name: "Sari Wulandari".into(),
            username: "sari".into(),
            email: "sari@example.com".into(),
            password: "rahasia1".into(),
            confirm_password: "rahasia1".into(),
            karang_taruna_name: "KT Melati".into(),
            provinsi: "Jawa Tengah".into(),
            kabupaten_kota: "Klaten".into(),
            kecamatan: "Prambanan".into(),
            jalan: "Jl. Candi".into(),
            skill_level: "Mahir".into(),
            ..RegistrationForm::default()
        })
        .await
        .unwrap();

    let melati = h
        .admin
        .users(&UserQuery::new().with_search("melati"))
        .await
        .unwrap();
    assert_eq!(melati.len(), 1);
    let sari = melati[0].clone();

    let experts = h
        .admin
        .users(&UserQuery::new().with_skill_level(Some(SkillLevel::Mahir)))
        .await
        .unwrap();
    assert_eq!(experts, vec![sari.clone()]);

    let promoted = h
        .admin
        .update_user(&sari.id, &UserPatch::role(Role::Admin))
        .await
        .unwrap();
    assert!(promoted.is_admin());

    h.admin.delete_user(&UserId::new("budi")).await.unwrap();
    assert_eq!(h.admin.users(&UserQuery::new()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn media_is_checked_locally_then_uploaded() {
    let h = as_admin().await;

    let err = h
        .media
        .upload(MediaKind::Image, "dokumen.pdf", vec![0; 16])
        .await
        .unwrap_err();
    assert!(matches!(err, AdminError::Media(MediaError::UnsupportedType { .. })));

    let uploaded = h
        .media
        .upload(MediaKind::Image, "keran.jpg", vec![0; 16])
        .await
        .unwrap();
    assert!(uploaded.public_id.starts_with("tutorials/keran-"));

    h.media
        .delete(&uploaded.public_id, MediaKind::Image)
        .await
        .unwrap();
    let again = h
        .media
        .delete(&uploaded.public_id, MediaKind::Image)
        .await
        .unwrap_err();
    assert!(matches!(again, AdminError::Api(ApiError::NotFound)));
}

#[tokio::test]
async fn media_urls_resolve_through_host() {
    let h = harness();
    assert_eq!(
        h.media.url_for(MediaKind::Video, "tutorials/pipa"),
        "https://res.cloudinary.com/demo/video/upload/tutorials/pipa"
    );
    assert_eq!(
        h.media
            .url_for(MediaKind::Image, "https://cdn.example.com/a.png"),
        "https://cdn.example.com/a.png"
    );
}
