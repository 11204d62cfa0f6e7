use std::sync::{Mutex, MutexGuard, PoisonError};

use elimu_core::Clock;
use elimu_core::model::{
    CompletionOutcome, Identity, ProgressRecord, QuizScore, RewardPolicy, ScoreOutcome,
    StreakUpdate, TopicId, UserId,
};
use storage::progress_store::ProgressStore;

/// The record and streak movement produced by a load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedProgress {
    pub record: ProgressRecord,
    pub streak: StreakUpdate,
}

struct TrackerState {
    user: Option<UserId>,
    record: ProgressRecord,
}

/// Owns one learner's in-memory progress snapshot and its persistence.
///
/// Exactly one mutable record lives behind the lock; every operation mutates
/// that instance under the lock, then persists a clone of it after the lock
/// is released. The lock is never held across an await. Overlapping
/// operations therefore serialize their in-memory effect, and the last
/// storage write wins.
///
/// Storage faults are logged and contained: a failed read falls back to a
/// fresh record, and a failed write leaves the in-memory state standing
/// until the next successful persist. No operation here hard-fails.
pub struct ProgressTracker {
    clock: Clock,
    policy: RewardPolicy,
    store: ProgressStore,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(clock: Clock, policy: RewardPolicy, store: ProgressStore) -> Self {
        let record = ProgressRecord::new(clock.today());
        Self {
            clock,
            policy,
            store,
            state: Mutex::new(TrackerState { user: None, record }),
        }
    }

    /// Load (or initialize) progress for the given identity and roll the
    /// daily streak for today.
    ///
    /// Signed out, this resets to an in-memory default record and touches no
    /// storage. Signed in, it reads the stored record (faults fall back to
    /// defaults), applies the streak roll, and writes the result back; the
    /// record is re-persisted even when the roll changed nothing, so the
    /// stored last-login always moves to today.
    pub async fn load(&self, identity: Option<&Identity>) -> LoadedProgress {
        let today = self.clock.today();

        let Some(identity) = identity else {
            let mut record = ProgressRecord::new(today);
            let streak = record.roll_daily_streak(today, &self.policy);
            let mut guard = self.lock_state();
            guard.user = None;
            guard.record = record.clone();
            drop(guard);
            return LoadedProgress { record, streak };
        };

        let user = identity.id().clone();
        let mut record = match self.store.load(&user).await {
            Ok(Some(record)) => record,
            Ok(None) => ProgressRecord::new(today),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load progress, starting from defaults");
                ProgressRecord::new(today)
            }
        };
        let streak = record.roll_daily_streak(today, &self.policy);

        {
            let mut guard = self.lock_state();
            guard.user = Some(user.clone());
            guard.record = record.clone();
        }
        self.persist(&user, &record).await;
        LoadedProgress { record, streak }
    }

    /// Mark a topic complete, paying the completion bonus at most once.
    ///
    /// Returns `None` when nobody is signed in; the in-memory record is not
    /// touched in that case.
    pub async fn complete(&self, topic: TopicId) -> Option<CompletionOutcome> {
        let (user, record, outcome) = {
            let mut guard = self.lock_state();
            let user = guard.user.clone()?;
            let outcome = guard.record.complete(topic, &self.policy);
            (user, guard.record.clone(), outcome)
        };
        self.persist(&user, &record).await;
        Some(outcome)
    }

    /// Record a quiz score, replacing any earlier score for the topic and
    /// paying the score-based bonus on every call.
    ///
    /// Returns `None` when nobody is signed in.
    pub async fn record_score(
        &self,
        topic: TopicId,
        score: QuizScore,
    ) -> Option<ScoreOutcome> {
        let (user, record, outcome) = {
            let mut guard = self.lock_state();
            let user = guard.user.clone()?;
            let outcome = guard.record.record_score(topic, score, &self.policy);
            (user, guard.record.clone(), outcome)
        };
        self.persist(&user, &record).await;
        Some(outcome)
    }

    /// Adjust the point balance by an arbitrary delta and return the new
    /// balance.
    ///
    /// Returns `None` when nobody is signed in.
    pub async fn add_points(&self, delta: i64) -> Option<i64> {
        let (user, record, balance) = {
            let mut guard = self.lock_state();
            let user = guard.user.clone()?;
            let balance = guard.record.add_points(delta, &self.policy);
            (user, guard.record.clone(), balance)
        };
        self.persist(&user, &record).await;
        Some(balance)
    }

    // Observers
    #[must_use]
    pub fn snapshot(&self) -> ProgressRecord {
        self.lock_state().record.clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.lock_state().user.clone()
    }

    #[must_use]
    pub fn policy(&self) -> &RewardPolicy {
        &self.policy
    }

    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn persist(&self, user: &UserId, record: &ProgressRecord) {
        if let Err(err) = self.store.save(user, record).await {
            tracing::warn!(error = %err, "failed to persist progress, keeping in-memory state");
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
