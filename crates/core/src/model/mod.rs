mod catalog;
mod identity;
mod ids;
mod library;
mod progress;
mod quiz;

pub use catalog::{CatalogTopic, GRADES, Subject, topics_for};
pub use identity::{DEFAULT_LEARNER_GRADE, Identity, IdentityError, Role};
pub use ids::{TopicId, UserId};
pub use library::{DownloadState, LibraryError, LibraryItem};
pub use progress::{
    Badge, CompletionOutcome, ProgressError, ProgressRecord, QuizScore, RewardPolicy,
    ScoreOutcome, StreakUpdate,
};
pub use quiz::{Quiz, QuizError, QuizQuestion};
