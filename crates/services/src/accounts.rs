use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use elimu_core::model::{DEFAULT_LEARNER_GRADE, Identity, IdentityError, Role, UserId};

use crate::error::AccountError;

/// Email of the seeded demo learner.
pub const DEMO_LEARNER_EMAIL: &str = "student@example.com";
/// Email of the seeded demo instructor.
pub const DEMO_INSTRUCTOR_EMAIL: &str = "teacher@example.com";
/// Secret shared by the seeded demo accounts.
pub const DEMO_SECRET: &str = "password";

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// An account as held by the backend, secret included.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub secret: String,
    pub role: Role,
    pub grade: Option<u8>,
}

impl Account {
    /// Build the session-facing identity for this account.
    ///
    /// The secret does not cross this boundary; `Identity` has no field
    /// for it.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if the stored name or email fails validation.
    pub fn into_identity(self) -> Result<Identity, IdentityError> {
        Identity::new(self.id, self.name, self.email, self.role, self.grade)
    }
}

/// Input for account creation, already validated by the caller.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub secret: String,
    pub role: Role,
    pub grade: Option<u8>,
}

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

/// Contract for the account backend.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Look up the account matching both email and secret.
    ///
    /// No match is a normal outcome, not an error; the caller decides how to
    /// report it.
    ///
    /// # Errors
    ///
    /// Returns `AccountError` if the backend cannot be reached.
    async fn find_account(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Option<Account>, AccountError>;

    /// Create a new account with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::AlreadyExists` when the email is taken, leaving
    /// the backend unchanged.
    async fn create_account(&self, new_account: NewAccount) -> Result<Account, AccountError>;

    /// Best-effort remote sign-out notification.
    ///
    /// # Errors
    ///
    /// Returns `AccountError` if the backend cannot be reached.
    async fn sign_out(&self) -> Result<(), AccountError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Simple in-memory account backend for demos and tests.
///
/// Email comparison is case-insensitive, both on lookup and on the
/// duplicate check during creation.
#[derive(Clone, Default)]
pub struct InMemoryAccountService {
    accounts: Arc<Mutex<Vec<Account>>>,
}

impl InMemoryAccountService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A backend pre-seeded with one demo learner and one demo instructor,
    /// both using [`DEMO_SECRET`].
    #[must_use]
    pub fn with_demo_accounts() -> Self {
        let accounts = vec![
            Account {
                id: UserId::new("1"),
                name: "Student Demo".to_owned(),
                email: DEMO_LEARNER_EMAIL.to_owned(),
                secret: DEMO_SECRET.to_owned(),
                role: Role::Learner,
                grade: Some(DEFAULT_LEARNER_GRADE),
            },
            Account {
                id: UserId::new("2"),
                name: "Teacher Demo".to_owned(),
                email: DEMO_INSTRUCTOR_EMAIL.to_owned(),
                secret: DEMO_SECRET.to_owned(),
                role: Role::Instructor,
                grade: None,
            },
        ];
        Self {
            accounts: Arc::new(Mutex::new(accounts)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts
            .lock()
            .map(|guard| guard.len())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccountService for InMemoryAccountService {
    async fn find_account(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<Option<Account>, AccountError> {
        let guard = self
            .accounts
            .lock()
            .map_err(|e| AccountError::Unavailable(e.to_string()))?;
        Ok(guard
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.secret == secret)
            .cloned())
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account, AccountError> {
        let mut guard = self
            .accounts
            .lock()
            .map_err(|e| AccountError::Unavailable(e.to_string()))?;
        if guard
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(&new_account.email))
        {
            return Err(AccountError::AlreadyExists);
        }

        let account = Account {
            id: UserId::generate(),
            name: new_account.name,
            email: new_account.email,
            secret: new_account.secret,
            role: new_account.role,
            grade: new_account.grade,
        };
        guard.push(account.clone());
        Ok(account)
    }

    async fn sign_out(&self) -> Result<(), AccountError> {
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_learner_can_be_found_with_the_right_secret() {
        let backend = InMemoryAccountService::with_demo_accounts();

        let found = backend
            .find_account(DEMO_LEARNER_EMAIL, DEMO_SECRET)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.role, Role::Learner);
        assert_eq!(found.grade, Some(DEFAULT_LEARNER_GRADE));
    }

    #[tokio::test]
    async fn wrong_secret_finds_nothing() {
        let backend = InMemoryAccountService::with_demo_accounts();

        let found = backend
            .find_account(DEMO_LEARNER_EMAIL, "wrong")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn email_lookup_ignores_case() {
        let backend = InMemoryAccountService::with_demo_accounts();

        let found = backend
            .find_account("Student@Example.COM", DEMO_SECRET)
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_and_nothing_is_added() {
        let backend = InMemoryAccountService::with_demo_accounts();
        let before = backend.len();

        let err = backend
            .create_account(NewAccount {
                name: "Someone".to_owned(),
                email: "STUDENT@example.com".to_owned(),
                secret: "hunter22".to_owned(),
                role: Role::Learner,
                grade: Some(7),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AccountError::AlreadyExists));
        assert_eq!(backend.len(), before);
    }

    #[tokio::test]
    async fn created_accounts_can_log_in_later() {
        let backend = InMemoryAccountService::new();

        let created = backend
            .create_account(NewAccount {
                name: "Asha".to_owned(),
                email: "asha@example.com".to_owned(),
                secret: "hunter22".to_owned(),
                role: Role::Learner,
                grade: Some(8),
            })
            .await
            .unwrap();

        let found = backend
            .find_account("asha@example.com", "hunter22")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn identity_built_from_an_account_keeps_profile_fields() {
        let backend = InMemoryAccountService::with_demo_accounts();
        let account = backend
            .find_account(DEMO_INSTRUCTOR_EMAIL, DEMO_SECRET)
            .await
            .unwrap()
            .unwrap();

        let identity = account.into_identity().unwrap();
        assert_eq!(identity.name(), "Teacher Demo");
        assert_eq!(identity.role(), Role::Instructor);
        assert_eq!(identity.grade(), None);
    }
}
