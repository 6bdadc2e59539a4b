//! End-to-end session lifecycle tests.
//!
//! These drive sessions through several simulated requests against a shared
//! [`MemoryStore`], including restarts from a snapshot file.

use std::sync::Arc;
use std::time::Duration;

use keepsake_session::{
    Error, FlushStatus, IdTransport, MemoryStore, MemoryStoreConfig, Result, Session,
    SessionManager, SessionOptions, Store,
};
use tempfile::TempDir;

/// A cookie jar holding one session id, shared across requests.
#[derive(Default)]
struct CookieJar {
    id: Option<String>,
}

impl IdTransport for CookieJar {
    fn extract_id(&self) -> Result<Option<String>> {
        Ok(self.id.clone())
    }

    fn publish_id(&mut self, id: &str) -> Result<()> {
        self.id = Some(id.to_string());
        Ok(())
    }
}

fn manager(store: Arc<MemoryStore>) -> SessionManager {
    SessionManager::new(store, SessionOptions::new(Duration::from_secs(3600))).unwrap()
}

/// One request to a page that counts views.
async fn visit(manager: &SessionManager, jar: &mut CookieJar) -> i64 {
    let mut session = manager.begin(&*jar).await.unwrap();
    let views = session.get_int("views");
    session.set("views", views + 1).await.unwrap();
    manager.finish(&mut session, jar).await.unwrap();
    views
}

#[tokio::test]
async fn test_view_counter_across_requests() {
    let store = Arc::new(MemoryStore::new(10).unwrap());
    let manager = manager(store.clone());
    let mut jar = CookieJar::default();

    assert_eq!(visit(&manager, &mut jar).await, 0);
    let id = jar.id.clone().expect("id published on first write");

    assert_eq!(visit(&manager, &mut jar).await, 1);
    assert_eq!(visit(&manager, &mut jar).await, 2);

    // The id is assigned once and reused afterwards
    assert_eq!(jar.id.as_deref(), Some(id.as_str()));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_clients_are_isolated() {
    let store = Arc::new(MemoryStore::new(10).unwrap());
    let manager = manager(store.clone());
    let mut alice = CookieJar::default();
    let mut bob = CookieJar::default();

    visit(&manager, &mut alice).await;
    visit(&manager, &mut alice).await;
    assert_eq!(visit(&manager, &mut bob).await, 0);
    assert_eq!(visit(&manager, &mut alice).await, 2);
    assert_ne!(alice.id, bob.id);
}

#[tokio::test]
async fn test_read_only_request_does_not_write() {
    let store = Arc::new(MemoryStore::new(10).unwrap());
    let manager = manager(store.clone());
    let mut jar = CookieJar::default();

    let mut session = manager.begin(&jar).await.unwrap();
    session.enable_readonly();
    assert!(matches!(session.set("k", "v").await, Err(Error::Readonly)));
    assert!(!manager.finish(&mut session, &mut jar).await.unwrap());

    assert!(jar.id.is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_lazy_fetch_loads_on_first_write() {
    let store = Arc::new(MemoryStore::new(10).unwrap());
    store
        .set("abc", br#"{"views": 4}"#, Duration::from_secs(60))
        .await
        .unwrap();

    let manager = SessionManager::new(
        store.clone(),
        SessionOptions::new(Duration::from_secs(60)).with_lazy_fetch(true),
    )
    .unwrap();
    let mut jar = CookieJar {
        id: Some("abc".into()),
    };

    let mut session = manager.begin(&jar).await.unwrap();
    assert_eq!(session.get_int("views"), 0);

    session.set("seen", true).await.unwrap();
    assert_eq!(session.get_int("views"), 4);
    manager.finish(&mut session, &mut jar).await.unwrap();

    let mut reread = Session::new(store, "abc");
    reread.fetch().await.unwrap();
    assert!(reread.get_bool("seen"));
    assert_eq!(reread.get_int("views"), 4);
}

#[tokio::test]
async fn test_expired_session_starts_over() {
    let store = Arc::new(MemoryStore::new(10).unwrap());
    let manager = SessionManager::new(
        store.clone(),
        SessionOptions::new(Duration::from_millis(50)),
    )
    .unwrap();
    let mut jar = CookieJar::default();

    visit(&manager, &mut jar).await;
    assert_eq!(visit(&manager, &mut jar).await, 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(visit(&manager, &mut jar).await, 0);
}

#[tokio::test]
async fn test_destroy_then_write_assigns_new_id() {
    let store = Arc::new(MemoryStore::new(10).unwrap());
    let manager = manager(store.clone());
    let mut jar = CookieJar::default();

    visit(&manager, &mut jar).await;
    let first = jar.id.clone().unwrap();

    let mut session = manager.begin(&jar).await.unwrap();
    session.destroy().await.unwrap();
    session.set("fresh", true).await.unwrap();
    manager.finish(&mut session, &mut jar).await.unwrap();

    let second = jar.id.clone().unwrap();
    assert_ne!(first, second);
    assert_eq!(store.get(&first).await.unwrap(), None);
    assert!(store.get(&second).await.unwrap().is_some());
}

#[tokio::test]
async fn test_sessions_survive_restart_via_snapshot() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sessions.json");

    let config = MemoryStoreConfig::new(10)
        .with_snapshot_path(&path)
        .with_snapshot_interval(Duration::from_secs(1));

    let store = Arc::new(MemoryStore::from_config(config.clone()).await.unwrap());
    let manager = manager(store.clone());
    let mut jar = CookieJar::default();
    visit(&manager, &mut jar).await;
    visit(&manager, &mut jar).await;

    // An already expired entry is not carried over
    store.set("stale", b"{}", Duration::ZERO).await.unwrap();

    store.persist(&path).await.unwrap();
    store.close().await;
    assert_eq!(store.flush_status(), FlushStatus::Stopped);

    let restarted = Arc::new(MemoryStore::from_config(config).await.unwrap());
    let manager = self::manager(restarted.clone());
    assert_eq!(visit(&manager, &mut jar).await, 2);
    assert_eq!(restarted.get("stale").await.unwrap(), None);

    restarted.stop_flush();
}
