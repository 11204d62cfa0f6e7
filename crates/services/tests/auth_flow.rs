//! End-to-end auth flows over in-memory collaborators: login, registration,
//! restore, logout, and the fault policies around storage and tracking.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use elimu_core::model::Role;
use services::{
    Account, AccountError, AccountService, AuthError, AuthEvent, AuthEventKind, AuthState,
    Credentials, DEMO_LEARNER_EMAIL, DEMO_SECRET, EventSink, InMemoryAccountService,
    MIN_SECRET_LEN, NewAccount, RegisterRole, RegistrationForm, SessionManager, TrackingError,
    ValidationError,
};
use storage::repository::{InMemoryKv, KeyValueStore, StorageError};
use storage::session_store::{SESSION_KEY, SessionStore};

//
// ─── TEST DOUBLES ──────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AuthEvent>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<AuthEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn record(&self, event: AuthEvent) -> Result<(), TrackingError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl EventSink for FailingSink {
    async fn record(&self, _event: AuthEvent) -> Result<(), TrackingError> {
        Err(TrackingError::Disabled)
    }
}

struct FailingKv;

#[async_trait]
impl KeyValueStore for FailingKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Connection("kv offline".to_owned()))
    }

    async fn put(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("kv offline".to_owned()))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Connection("kv offline".to_owned()))
    }
}

/// Counts backend calls so tests can assert validation short-circuits
/// before the account service is consulted.
struct CountingAccounts {
    inner: InMemoryAccountService,
    calls: AtomicUsize,
}

impl CountingAccounts {
    fn with_demo_accounts() -> Self {
        Self {
            inner: InMemoryAccountService::with_demo_accounts(),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountService for CountingAccounts {
    async fn find_account(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Option<Account>, AccountError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_account(email, secret).await
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account, AccountError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_account(new_account).await
    }

    async fn sign_out(&self) -> Result<(), AccountError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_out().await
    }
}

/// Yields once before answering, so a test can observe the manager
/// mid-operation on a current-thread runtime.
struct YieldingAccounts {
    inner: InMemoryAccountService,
}

#[async_trait]
impl AccountService for YieldingAccounts {
    async fn find_account(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Option<Account>, AccountError> {
        tokio::task::yield_now().await;
        self.inner.find_account(email, secret).await
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account, AccountError> {
        tokio::task::yield_now().await;
        self.inner.create_account(new_account).await
    }

    async fn sign_out(&self) -> Result<(), AccountError> {
        tokio::task::yield_now().await;
        self.inner.sign_out().await
    }
}

//
// ─── HELPERS ───────────────────────────────────────────────────────────────────
//

struct Harness {
    kv: Arc<InMemoryKv>,
    accounts: InMemoryAccountService,
    sink: Arc<RecordingSink>,
    manager: SessionManager,
}

fn harness() -> Harness {
    let kv = Arc::new(InMemoryKv::new());
    let accounts = InMemoryAccountService::with_demo_accounts();
    let sink = Arc::new(RecordingSink::default());
    let manager = SessionManager::new(
        Arc::new(accounts.clone()),
        SessionStore::new(kv.clone()),
        sink.clone(),
    );
    Harness {
        kv,
        accounts,
        sink,
        manager,
    }
}

fn demo_credentials() -> Credentials {
    Credentials::new(DEMO_LEARNER_EMAIL, DEMO_SECRET)
}

fn registration_form() -> RegistrationForm {
    RegistrationForm {
        name: "Amina Odhiambo".to_owned(),
        email: "amina@example.com".to_owned(),
        secret: "correct-horse".to_owned(),
        confirm_secret: "correct-horse".to_owned(),
        role: RegisterRole::Learner,
    }
}

/// Let fire-and-forget tracking tasks run to completion.
async fn drain_dispatched_events() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

//
// ─── LOGIN ─────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn login_with_demo_credentials_authenticates() {
    let h = harness();

    let identity = h.manager.login(demo_credentials()).await.unwrap();

    assert_eq!(identity.name(), "Student Demo");
    assert_eq!(identity.email(), DEMO_LEARNER_EMAIL);
    assert_eq!(identity.role(), Role::Learner);
    assert_eq!(identity.grade(), Some(7));

    assert!(h.manager.is_authenticated());
    assert_eq!(h.manager.auth_state(), AuthState::Authenticated(identity));
    assert!(!h.manager.is_busy());
}

#[tokio::test]
async fn login_persists_session_without_secret() {
    let h = harness();
    h.manager.login(demo_credentials()).await.unwrap();

    let raw = h.kv.get(SESSION_KEY).await.unwrap().unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();

    assert_eq!(doc["email"], DEMO_LEARNER_EMAIL);
    assert_eq!(doc["role"], "learner");
    assert!(doc.get("secret").is_none());
    assert!(!raw.contains(DEMO_SECRET));
}

#[tokio::test]
async fn login_with_wrong_secret_is_rejected() {
    let h = harness();
    assert!(h.manager.restore().await.is_none());

    let err = h
        .manager
        .login(Credentials::new(DEMO_LEARNER_EMAIL, "not-the-secret"))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials));
    assert_eq!(h.manager.auth_state(), AuthState::Anonymous);
    assert_eq!(h.kv.get(SESSION_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn login_with_unknown_email_is_rejected() {
    let h = harness();

    let err = h
        .manager
        .login(Credentials::new("nobody@example.com", DEMO_SECRET))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::InvalidCredentials));
    assert!(!h.manager.is_authenticated());
}

#[tokio::test]
async fn login_validates_before_consulting_backend() {
    let accounts = Arc::new(CountingAccounts::with_demo_accounts());
    let manager = SessionManager::new(
        accounts.clone(),
        SessionStore::new(Arc::new(InMemoryKv::new())),
        Arc::new(RecordingSink::default()),
    );

    let err = manager
        .login(Credentials::new("  ", DEMO_SECRET))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Validation(ValidationError::EmptyEmail)
    ));

    let err = manager
        .login(Credentials::new(DEMO_LEARNER_EMAIL, ""))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AuthError::Validation(ValidationError::EmptySecret)
    ));

    assert_eq!(accounts.calls(), 0);
}

#[tokio::test]
async fn login_dispatches_password_event() {
    let h = harness();
    h.manager.login(demo_credentials()).await.unwrap();
    drain_dispatched_events().await;

    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AuthEventKind::Login);
    assert_eq!(events[0].user_id.as_str(), "1");
    assert_eq!(events[0].metadata["method"], "password");
}

//
// ─── RESTORE ───────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn restore_reuses_stored_identity() {
    let h = harness();
    let signed_in = h.manager.login(demo_credentials()).await.unwrap();

    // A fresh manager over the same store, as on the next app start.
    let sink = Arc::new(RecordingSink::default());
    let restored_manager = SessionManager::new(
        Arc::new(h.accounts.clone()),
        SessionStore::new(h.kv.clone()),
        sink.clone(),
    );

    let restored = restored_manager.restore().await.unwrap();
    assert_eq!(restored, signed_in);
    assert!(restored_manager.is_authenticated());

    drain_dispatched_events().await;
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AuthEventKind::Login);
    assert_eq!(events[0].metadata["method"], "auto");
}

#[tokio::test]
async fn restore_without_session_is_anonymous() {
    let h = harness();

    assert_eq!(h.manager.auth_state(), AuthState::Unknown);
    assert!(h.manager.restore().await.is_none());
    assert_eq!(h.manager.auth_state(), AuthState::Anonymous);

    drain_dispatched_events().await;
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn restore_drops_corrupt_session() {
    let h = harness();
    h.kv.put(SESSION_KEY, "definitely not json").await.unwrap();

    assert!(h.manager.restore().await.is_none());
    assert_eq!(h.manager.auth_state(), AuthState::Anonymous);
    // The broken entry is gone, so the next start is clean.
    assert_eq!(h.kv.get(SESSION_KEY).await.unwrap(), None);
}

//
// ─── REGISTRATION ──────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn register_creates_account_and_signs_in() {
    let h = harness();

    let identity = h.manager.register(registration_form()).await.unwrap();

    assert_eq!(identity.name(), "Amina Odhiambo");
    assert_eq!(identity.role(), Role::Learner);
    assert_eq!(identity.grade(), Some(7));
    assert!(h.manager.is_authenticated());
    assert_eq!(h.accounts.len(), 3);

    let raw = h.kv.get(SESSION_KEY).await.unwrap().unwrap();
    assert!(raw.contains("amina@example.com"));

    drain_dispatched_events().await;
    let events = h.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, AuthEventKind::Signup);
    assert_eq!(events[0].metadata["role"], "learner");
}

#[tokio::test]
async fn register_duplicate_email_is_rejected() {
    let h = harness();

    let mut form = registration_form();
    // Same demo address, different case; the backend matches it anyway.
    form.email = DEMO_LEARNER_EMAIL.to_uppercase();

    let err = h.manager.register(form).await.unwrap_err();
    assert!(matches!(err, AuthError::AccountExists));

    assert_eq!(h.accounts.len(), 2);
    assert_eq!(h.manager.auth_state(), AuthState::Unknown);
    assert_eq!(h.kv.get(SESSION_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn register_validates_before_consulting_backend() {
    let accounts = Arc::new(CountingAccounts::with_demo_accounts());
    let manager = SessionManager::new(
        accounts.clone(),
        SessionStore::new(Arc::new(InMemoryKv::new())),
        Arc::new(RecordingSink::default()),
    );

    let mut form = registration_form();
    form.secret = "short".to_owned();
    form.confirm_secret = "short".to_owned();
    let err = manager.register(form).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Validation(ValidationError::SecretTooShort {
            min: MIN_SECRET_LEN
        })
    ));

    let mut form = registration_form();
    form.confirm_secret = "something-else".to_owned();
    let err = manager.register(form).await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Validation(ValidationError::SecretMismatch)
    ));

    assert_eq!(accounts.calls(), 0);
}

//
// ─── LOGOUT ────────────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn logout_twice_equals_logout_once() {
    let h = harness();
    h.manager.login(demo_credentials()).await.unwrap();

    h.manager.logout().await;
    assert_eq!(h.manager.auth_state(), AuthState::Anonymous);
    assert_eq!(h.kv.get(SESSION_KEY).await.unwrap(), None);

    h.manager.logout().await;
    assert_eq!(h.manager.auth_state(), AuthState::Anonymous);
    assert_eq!(h.kv.get(SESSION_KEY).await.unwrap(), None);
    assert!(!h.manager.is_busy());
}

//
// ─── FAULT POLICY ──────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn tracking_failure_never_blocks_auth() {
    let manager = SessionManager::new(
        Arc::new(InMemoryAccountService::with_demo_accounts()),
        SessionStore::new(Arc::new(InMemoryKv::new())),
        Arc::new(FailingSink),
    );

    let identity = manager.login(demo_credentials()).await.unwrap();
    drain_dispatched_events().await;

    assert_eq!(identity.email(), DEMO_LEARNER_EMAIL);
    assert!(manager.is_authenticated());
}

#[tokio::test]
async fn storage_failure_keeps_session_in_memory() {
    let manager = SessionManager::new(
        Arc::new(InMemoryAccountService::with_demo_accounts()),
        SessionStore::new(Arc::new(FailingKv)),
        Arc::new(RecordingSink::default()),
    );

    // Restore cannot read the store; the session simply starts signed out.
    assert!(manager.restore().await.is_none());
    assert_eq!(manager.auth_state(), AuthState::Anonymous);

    // Login succeeds even though the session cannot be persisted.
    let identity = manager.login(demo_credentials()).await.unwrap();
    assert_eq!(identity.name(), "Student Demo");
    assert!(manager.is_authenticated());

    // Logout clears the in-memory state despite the broken store.
    manager.logout().await;
    assert_eq!(manager.auth_state(), AuthState::Anonymous);
}

#[tokio::test]
async fn busy_while_an_operation_is_in_flight() {
    let manager = Arc::new(SessionManager::new(
        Arc::new(YieldingAccounts {
            inner: InMemoryAccountService::with_demo_accounts(),
        }),
        SessionStore::new(Arc::new(InMemoryKv::new())),
        Arc::new(RecordingSink::default()),
    ));
    assert!(!manager.is_busy());

    let task = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.login(demo_credentials()).await })
    };

    // On the current-thread runtime the spawned login runs up to its first
    // yield, leaving the busy flag observable here.
    tokio::task::yield_now().await;
    assert!(manager.is_busy());

    task.await.unwrap().unwrap();
    assert!(!manager.is_busy());
    assert!(manager.is_authenticated());
}
