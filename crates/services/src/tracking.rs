use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use elimu_core::model::{Role, UserId};

use crate::error::TrackingError;

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// The two auth events the tracking endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    Login,
    Signup,
}

impl AuthEventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthEventKind::Login => "login",
            AuthEventKind::Signup => "signup",
        }
    }
}

/// A fire-and-forget auth event.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub user_id: UserId,
    pub kind: AuthEventKind,
    pub metadata: Value,
}

impl AuthEvent {
    /// A login performed with typed-in credentials.
    #[must_use]
    pub fn password_login(user_id: UserId) -> Self {
        Self {
            user_id,
            kind: AuthEventKind::Login,
            metadata: json!({ "method": "password" }),
        }
    }

    /// A login restored from the locally stored session.
    #[must_use]
    pub fn auto_login(user_id: UserId) -> Self {
        Self {
            user_id,
            kind: AuthEventKind::Login,
            metadata: json!({ "method": "auto" }),
        }
    }

    /// A freshly registered account.
    #[must_use]
    pub fn signup(user_id: UserId, role: Role) -> Self {
        Self {
            user_id,
            kind: AuthEventKind::Signup,
            metadata: json!({ "role": role.as_str() }),
        }
    }
}

/// Contract for the event tracking backend.
///
/// Delivery is best effort: callers dispatch without awaiting and log
/// failures, they never propagate them.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Returns `TrackingError` when the event could not be delivered.
    async fn record(&self, event: AuthEvent) -> Result<(), TrackingError>;
}

//
// ─── HTTP SINK ─────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct TrackingConfig {
    pub base_url: String,
    pub token: String,
}

impl TrackingConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let base_url = env::var("ELIMU_TRACKING_URL").ok()?;
        if base_url.trim().is_empty() {
            return None;
        }
        if Url::parse(base_url.trim()).is_err() {
            tracing::warn!(%base_url, "ignoring malformed tracking base url");
            return None;
        }
        let token = env::var("ELIMU_TRACKING_TOKEN").ok()?;
        if token.trim().is_empty() {
            return None;
        }
        Some(Self { base_url, token })
    }
}

/// Posts auth events to the hosted tracking function.
#[derive(Clone)]
pub struct HttpEventSink {
    client: Client,
    config: Option<TrackingConfig>,
}

impl HttpEventSink {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(TrackingConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<TrackingConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn record(&self, event: AuthEvent) -> Result<(), TrackingError> {
        let config = self.config.as_ref().ok_or(TrackingError::Disabled)?;

        let url = format!(
            "{}/functions/v1/auth-tracking",
            config.base_url.trim_end_matches('/')
        );
        let payload = TrackEventRequest {
            user_id: event.user_id.as_str().to_owned(),
            event_type: event.kind.as_str(),
            metadata: event.metadata,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TrackingError::HttpStatus(response.status()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TrackEventRequest {
    user_id: String,
    event_type: &'static str,
    metadata: Value,
}

//
// ─── NULL SINK ─────────────────────────────────────────────────────────────────
//

/// Sink that drops every event. Used when tracking is not configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn record(&self, _event: AuthEvent) -> Result<(), TrackingError> {
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
