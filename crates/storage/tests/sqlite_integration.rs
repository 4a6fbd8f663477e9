use storage::repository::{SessionStore, Storage, TOKEN_KEY};
use storage::sqlite::SqliteRepository;
use tutorial_core::model::{AuthToken, Role, Session, User, UserId, UserProfile};

fn build_session(token: &str) -> Session {
    let user = User {
        id: UserId::new("u1"),
        name: "Budi".into(),
        username: "budi".into(),
        email: "budi@example.com".into(),
        role: Role::User,
        profile: UserProfile {
            karang_taruna_name: "KT Mawar".into(),
            ..UserProfile::default()
        },
        created_at: None,
    };
    Session::new(user, AuthToken::new(token))
}

#[tokio::test]
async fn sqlite_session_survives_reconnect() {
    let url = "sqlite:file:memdb_session_roundtrip?mode=memory&cache=shared";
    let repo = SqliteRepository::connect(url).await.expect("connect");
    repo.migrate().await.expect("migrate");

    repo.save(&build_session("tok-1")).await.unwrap();

    let reopened = Storage::sqlite(url).await.expect("reopen");
    let loaded = reopened.session.load().await.unwrap().expect("session");
    assert_eq!(loaded.token.as_str(), "tok-1");
    assert_eq!(loaded.user.username, "budi");
    drop(repo);
}

#[tokio::test]
async fn sqlite_save_overwrites_previous_session() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_session_overwrite?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.save(&build_session("old")).await.unwrap();
    repo.save(&build_session("new")).await.unwrap();

    let loaded = repo.load().await.unwrap().unwrap();
    assert_eq!(loaded.token.as_str(), "new");
}

#[tokio::test]
async fn sqlite_clear_and_half_written_pair() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_session_clear?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    repo.save(&build_session("tok")).await.unwrap();
    repo.clear().await.unwrap();
    assert!(repo.load().await.unwrap().is_none());

    sqlx::query("INSERT INTO client_state (key, value, updated_at) VALUES (?1, ?2, ?3)")
        .bind(TOKEN_KEY)
        .bind("orphan")
        .bind(chrono::Utc::now())
        .execute(repo.pool())
        .await
        .unwrap();

    assert!(repo.load().await.unwrap().is_none());
    assert!(repo.read_entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_session_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first");
    repo.migrate().await.expect("second");
}
