#![forbid(unsafe_code)]

pub mod accounts;
pub mod app_services;
pub mod error;
pub mod progress_tracker;
pub mod session_manager;
pub mod tracking;

pub use elimu_core::Clock;

pub use accounts::{
    Account, AccountService, DEMO_INSTRUCTOR_EMAIL, DEMO_LEARNER_EMAIL, DEMO_SECRET,
    InMemoryAccountService, NewAccount,
};
pub use app_services::AppServices;
pub use error::{AccountError, AppServicesError, AuthError, TrackingError, ValidationError};
pub use progress_tracker::{LoadedProgress, ProgressTracker};
pub use session_manager::{
    AuthState, Credentials, MIN_SECRET_LEN, RegisterRole, RegistrationForm, SessionManager,
};
pub use tracking::{
    AuthEvent, AuthEventKind, EventSink, HttpEventSink, NullEventSink, TrackingConfig,
};
