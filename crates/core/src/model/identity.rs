use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::UserId;

/// Grade level assigned to learners who register without choosing one.
pub const DEFAULT_LEARNER_GRADE: u8 = 7;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("unknown role: {raw}")]
    UnknownRole { raw: String },
}

//
// ─── ROLE ──────────────────────────────────────────────────────────────────────
//

/// Closed set of actor roles.
///
/// The role is fixed at account creation; nothing in this crate mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Learner,
    Instructor,
    Administrator,
}

impl Role {
    /// Grade assigned by default when an account with this role is created.
    ///
    /// Only learners carry a grade level.
    #[must_use]
    pub fn default_grade(self) -> Option<u8> {
        match self {
            Role::Learner => Some(DEFAULT_LEARNER_GRADE),
            Role::Instructor | Role::Administrator => None,
        }
    }

    /// Stable wire name for this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Learner => "learner",
            Role::Instructor => "instructor",
            Role::Administrator => "administrator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learner" => Ok(Role::Learner),
            "instructor" => Ok(Role::Instructor),
            "administrator" => Ok(Role::Administrator),
            other => Err(IdentityError::UnknownRole {
                raw: other.to_string(),
            }),
        }
    }
}

//
// ─── IDENTITY ──────────────────────────────────────────────────────────────────
//

/// The signed-in actor's profile, as held by the session.
///
/// Deliberately carries no secret: it is constructed from an account record
/// after the secret has been stripped, and it is what gets persisted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    id: UserId,
    name: String,
    email: String,
    role: Role,
    grade: Option<u8>,
}

impl Identity {
    /// Creates an identity, trimming name/email and normalizing the grade.
    ///
    /// A grade is only meaningful for learners; for any other role it is
    /// dropped here so downstream code never has to re-check.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError` if name or email is empty or whitespace-only.
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        email: impl Into<String>,
        role: Role,
        grade: Option<u8>,
    ) -> Result<Self, IdentityError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(IdentityError::EmptyName);
        }
        let email = email.into();
        if email.trim().is_empty() {
            return Err(IdentityError::EmptyEmail);
        }

        let grade = match role {
            Role::Learner => grade,
            Role::Instructor | Role::Administrator => None,
        };

        Ok(Self {
            id,
            name: name.trim().to_owned(),
            email: email.trim().to_owned(),
            role,
            grade,
        })
    }

    // Accessors
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn grade(&self) -> Option<u8> {
        self.grade
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
