use std::sync::Arc;

use elimu_core::model::RewardPolicy;
use storage::repository::Storage;

use crate::Clock;
use crate::accounts::{AccountService, InMemoryAccountService};
use crate::error::AppServicesError;
use crate::progress_tracker::ProgressTracker;
use crate::session_manager::SessionManager;
use crate::tracking::{EventSink, HttpEventSink, NullEventSink};

/// Assembles the session manager and progress tracker over shared storage.
///
/// The tracking sink comes from the environment: HTTP when configured, a
/// null sink otherwise, so an offline run never trips over tracking.
#[derive(Clone)]
pub struct AppServices {
    session_manager: Arc<SessionManager>,
    progress_tracker: Arc<ProgressTracker>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::assemble(storage, clock))
    }

    /// Build services over in-memory storage, for demos and tests.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::assemble(Storage::in_memory(), clock)
    }

    fn assemble(storage: Storage, clock: Clock) -> Self {
        let accounts: Arc<dyn AccountService> =
            Arc::new(InMemoryAccountService::with_demo_accounts());
        let events = tracking_sink_from_env();

        let session_manager = Arc::new(SessionManager::new(
            accounts,
            storage.sessions.clone(),
            events,
        ));
        let progress_tracker = Arc::new(ProgressTracker::new(
            clock,
            RewardPolicy::standard(),
            storage.progress.clone(),
        ));

        Self {
            session_manager,
            progress_tracker,
        }
    }

    #[must_use]
    pub fn session_manager(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session_manager)
    }

    #[must_use]
    pub fn progress_tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.progress_tracker)
    }
}

fn tracking_sink_from_env() -> Arc<dyn EventSink> {
    let sink = HttpEventSink::from_env();
    if sink.enabled() {
        Arc::new(sink)
    } else {
        Arc::new(NullEventSink)
    }
}
