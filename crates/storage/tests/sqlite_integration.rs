use elimu_core::model::{
    Badge, Identity, ProgressRecord, QuizScore, RewardPolicy, Role, TopicId, UserId,
};
use elimu_core::time::fixed_today;
use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteRepository;

#[tokio::test]
async fn sqlite_kv_round_trips_values() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_kv?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("missing").await.unwrap(), None);

    repo.put("elimu/test", "one").await.unwrap();
    assert_eq!(repo.get("elimu/test").await.unwrap().as_deref(), Some("one"));

    repo.put("elimu/test", "two").await.unwrap();
    assert_eq!(repo.get("elimu/test").await.unwrap().as_deref(), Some("two"));

    repo.remove("elimu/test").await.unwrap();
    assert_eq!(repo.get("elimu/test").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");

    repo.put("k", "v").await.unwrap();
    assert_eq!(repo.get("k").await.unwrap().as_deref(), Some("v"));
}

#[tokio::test]
async fn sqlite_storage_persists_session_and_progress() {
    let storage = Storage::sqlite("sqlite:file:memdb_stores?mode=memory&cache=shared")
        .await
        .expect("storage");

    let identity = Identity::new(
        UserId::new("u-1"),
        "Asha",
        "asha@example.com",
        Role::Learner,
        Some(7),
    )
    .unwrap();
    storage.sessions.save(&identity).await.unwrap();
    let loaded = storage.sessions.load().await.unwrap().unwrap();
    assert_eq!(loaded, identity);

    let policy = RewardPolicy::standard();
    let mut record = ProgressRecord::new(fixed_today());
    record.complete(TopicId::new("cells"), &policy);
    record.record_score(TopicId::new("cells"), QuizScore::new(100.0).unwrap(), &policy);

    storage.progress.save(identity.id(), &record).await.unwrap();
    let loaded = storage.progress.load(identity.id()).await.unwrap().unwrap();
    assert_eq!(loaded, record);
    assert!(loaded.has_badge(Badge::PerfectScore));

    storage.sessions.clear().await.unwrap();
    assert!(storage.sessions.load().await.unwrap().is_none());
    assert!(storage.progress.load(identity.id()).await.unwrap().is_some());
}
