use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use elimu_core::model::{Badge, ProgressRecord, QuizScore, TopicId, UserId};

use crate::repository::{KeyValueStore, StorageError};

/// Key a learner's progress document lives under.
#[must_use]
pub fn progress_key(user: &UserId) -> String {
    format!("elimu/progress/{user}")
}

/// Persisted shape for a progress record.
///
/// Scores and badges are stored as raw primitives and re-validated on the way
/// back in, so a hand-edited or out-of-date document cannot smuggle invalid
/// state into the domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressDoc {
    pub completed_topics: Vec<String>,
    pub quiz_scores: BTreeMap<String, f64>,
    pub streak_days: u32,
    pub last_login: NaiveDate,
    pub points: i64,
    pub badges: Vec<String>,
}

impl ProgressDoc {
    #[must_use]
    pub fn from_record(record: &ProgressRecord) -> Self {
        Self {
            completed_topics: record
                .completed_topics()
                .iter()
                .map(|t| t.as_str().to_owned())
                .collect(),
            quiz_scores: record
                .quiz_scores()
                .iter()
                .map(|(t, s)| (t.as_str().to_owned(), s.value()))
                .collect(),
            streak_days: record.streak_days(),
            last_login: record.last_login(),
            points: record.points(),
            badges: record.badges().iter().map(|b| b.as_str().to_owned()).collect(),
        }
    }

    /// Convert the document back into a domain `ProgressRecord`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if a score is out of range or a
    /// badge name is not recognized.
    pub fn into_record(self) -> Result<ProgressRecord, StorageError> {
        let completed_topics: BTreeSet<TopicId> =
            self.completed_topics.into_iter().map(TopicId::new).collect();

        let mut quiz_scores = BTreeMap::new();
        for (topic, value) in self.quiz_scores {
            let score = QuizScore::new(value)
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            quiz_scores.insert(TopicId::new(topic), score);
        }

        let mut badges = BTreeSet::new();
        for raw in self.badges {
            let badge: Badge = raw
                .parse()
                .map_err(|err: elimu_core::model::ProgressError| {
                    StorageError::Serialization(err.to_string())
                })?;
            badges.insert(badge);
        }

        Ok(ProgressRecord::from_parts(
            completed_topics,
            quiz_scores,
            self.streak_days,
            self.last_login,
            self.points,
            badges,
        ))
    }
}

/// Reads and writes per-learner progress documents.
#[derive(Clone)]
pub struct ProgressStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Fetch the stored progress for one learner, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures or undecodable documents.
    pub async fn load(&self, user: &UserId) -> Result<Option<ProgressRecord>, StorageError> {
        let Some(raw) = self.kv.get(&progress_key(user)).await? else {
            return Ok(None);
        };
        let doc: ProgressDoc = serde_json::from_str(&raw)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        doc.into_record().map(Some)
    }

    /// Persist the progress for one learner, replacing the previous document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if encoding or the write fails.
    pub async fn save(&self, user: &UserId, record: &ProgressRecord) -> Result<(), StorageError> {
        let doc = ProgressDoc::from_record(record);
        let raw = serde_json::to_string(&doc)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.kv.put(&progress_key(user), &raw).await
    }
}
