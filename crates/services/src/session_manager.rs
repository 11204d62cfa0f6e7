use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use elimu_core::model::{Identity, Role};
use storage::session_store::SessionStore;

use crate::accounts::{AccountService, NewAccount};
use crate::error::{AccountError, AuthError, ValidationError};
use crate::tracking::{AuthEvent, EventSink};

/// Shortest secret the registration form accepts.
pub const MIN_SECRET_LEN: usize = 6;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Where the session stands.
///
/// `Unknown` only exists between process start and the first
/// [`SessionManager::restore`] call; every later transition lands on one of
/// the other two states.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unknown,
    Anonymous,
    Authenticated(Identity),
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthState::Authenticated(identity) => Some(identity),
            AuthState::Unknown | AuthState::Anonymous => None,
        }
    }
}

//
// ─── FORM INPUT ────────────────────────────────────────────────────────────────
//

/// Raw login input.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub secret: String,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            secret: secret.into(),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if self.secret.is_empty() {
            return Err(ValidationError::EmptySecret);
        }
        Ok(())
    }
}

/// Roles an account can be registered with.
///
/// Administrators are provisioned out of band, so the form cannot produce
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterRole {
    Learner,
    Instructor,
}

impl RegisterRole {
    #[must_use]
    pub fn role(self) -> Role {
        match self {
            RegisterRole::Learner => Role::Learner,
            RegisterRole::Instructor => Role::Instructor,
        }
    }
}

/// Raw registration input, validated as a whole before the account backend
/// is consulted.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub secret: String,
    pub confirm_secret: String,
    pub role: RegisterRole,
}

impl RegistrationForm {
    fn validate(&self) -> Result<NewAccount, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if self.secret.is_empty() {
            return Err(ValidationError::EmptySecret);
        }
        if self.secret.chars().count() < MIN_SECRET_LEN {
            return Err(ValidationError::SecretTooShort {
                min: MIN_SECRET_LEN,
            });
        }
        if self.secret != self.confirm_secret {
            return Err(ValidationError::SecretMismatch);
        }

        let role = self.role.role();
        Ok(NewAccount {
            name: self.name.trim().to_owned(),
            email: self.email.trim().to_owned(),
            secret: self.secret.clone(),
            role,
            grade: role.default_grade(),
        })
    }
}

//
// ─── SESSION MANAGER ───────────────────────────────────────────────────────────
//

/// Owns the signed-in identity and the flows around it: restore on start,
/// login, registration, and logout.
///
/// Auth events are dispatched fire-and-forget after the primary operation
/// succeeds; a slow or broken sink can never fail or delay a login. Storage
/// faults while persisting the session are logged and contained, so the
/// in-memory session survives a broken local store.
pub struct SessionManager {
    accounts: Arc<dyn AccountService>,
    sessions: SessionStore,
    events: Arc<dyn EventSink>,
    state: Mutex<AuthState>,
    in_flight: AtomicUsize,
}

// Decrements on drop so every exit path, including `?`, releases the
// busy count.
struct BusyGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> BusyGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SessionManager {
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountService>,
        sessions: SessionStore,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            accounts,
            sessions,
            events,
            state: Mutex::new(AuthState::Unknown),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Resolve the boot-time `Unknown` state from local storage.
    ///
    /// A well-formed stored identity is trusted as-is, without re-checking
    /// credentials. A missing, unreadable, or invalid one leaves the session
    /// `Anonymous`; the broken entry is dropped so the next start is clean.
    /// Restore itself never fails.
    pub async fn restore(&self) -> Option<Identity> {
        let _busy = BusyGuard::new(&self.in_flight);

        match self.sessions.load().await {
            Ok(Some(identity)) => {
                self.set_state(AuthState::Authenticated(identity.clone()));
                self.dispatch(AuthEvent::auto_login(identity.id().clone()));
                Some(identity)
            }
            Ok(None) => {
                self.set_state(AuthState::Anonymous);
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "dropping unreadable stored session");
                if let Err(err) = self.sessions.clear().await {
                    tracing::warn!(error = %err, "failed to clear stored session");
                }
                self.set_state(AuthState::Anonymous);
                None
            }
        }
    }

    /// Sign in with email and secret.
    ///
    /// On success the identity (secret already stripped) becomes the current
    /// state, is persisted under the fixed session key, and a `login` event
    /// is dispatched. Concurrent calls are not deduplicated; the last
    /// storage write wins.
    ///
    /// # Errors
    ///
    /// `Validation` when a field is empty, `InvalidCredentials` when no
    /// account matches, `Account` when the backend is unreachable. The state
    /// is untouched on every error path.
    pub async fn login(&self, credentials: Credentials) -> Result<Identity, AuthError> {
        let _busy = BusyGuard::new(&self.in_flight);
        credentials.validate()?;

        let account = self
            .accounts
            .find_account(&credentials.email, &credentials.secret)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let identity = account
            .into_identity()
            .map_err(|err| AccountError::Unavailable(err.to_string()))?;

        self.persist_session(&identity).await;
        self.set_state(AuthState::Authenticated(identity.clone()));
        self.dispatch(AuthEvent::password_login(identity.id().clone()));
        Ok(identity)
    }

    /// Create an account and sign in as it.
    ///
    /// The form is validated before the backend is consulted, so a bad form
    /// never reaches it. On success this behaves like a login, except a
    /// `signup` event is dispatched instead.
    ///
    /// # Errors
    ///
    /// `Validation` for form problems, `AccountExists` for duplicate email
    /// (the backend is left unchanged), `Account` when it is unreachable.
    pub async fn register(&self, form: RegistrationForm) -> Result<Identity, AuthError> {
        let _busy = BusyGuard::new(&self.in_flight);
        let new_account = form.validate()?;

        let account = match self.accounts.create_account(new_account).await {
            Ok(account) => account,
            Err(AccountError::AlreadyExists) => return Err(AuthError::AccountExists),
            Err(err) => return Err(err.into()),
        };
        let identity = account
            .into_identity()
            .map_err(|err| AccountError::Unavailable(err.to_string()))?;

        self.persist_session(&identity).await;
        self.set_state(AuthState::Authenticated(identity.clone()));
        self.dispatch(AuthEvent::signup(identity.id().clone(), identity.role()));
        Ok(identity)
    }

    /// Sign out: drop the in-memory identity, remove the persisted session,
    /// and notify the account backend best-effort.
    ///
    /// Idempotent; calling it while already signed out changes nothing.
    pub async fn logout(&self) {
        let _busy = BusyGuard::new(&self.in_flight);

        self.set_state(AuthState::Anonymous);
        if let Err(err) = self.sessions.clear().await {
            tracing::warn!(error = %err, "failed to clear stored session");
        }
        if let Err(err) = self.accounts.sign_out().await {
            tracing::warn!(error = %err, "remote sign-out failed");
        }
    }

    // Observers
    #[must_use]
    pub fn auth_state(&self) -> AuthState {
        self.lock_state().clone()
    }

    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.lock_state().identity().cloned()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock_state().is_authenticated()
    }

    /// Whether any session operation is currently in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    fn set_state(&self, next: AuthState) {
        *self.lock_state() = next;
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist_session(&self, identity: &Identity) {
        if let Err(err) = self.sessions.save(identity).await {
            tracing::warn!(error = %err, "failed to persist session, continuing in memory");
        }
    }

    fn dispatch(&self, event: AuthEvent) {
        let sink = Arc::clone(&self.events);
        tokio::spawn(async move {
            if let Err(err) = sink.record(event).await {
                tracing::debug!(error = %err, "auth event dropped");
            }
        });
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
