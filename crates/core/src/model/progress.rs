use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::TopicId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("quiz score must be a finite value between 0 and 100, got {value}")]
    InvalidScore { value: f64 },

    #[error("completion bonus cannot be negative, got {bonus}")]
    NegativeBonus { bonus: i64 },

    #[error("score ratio must be a finite non-negative value, got {ratio}")]
    InvalidRatio { ratio: f64 },

    #[error("unknown badge: {raw}")]
    UnknownBadge { raw: String },
}

//
// ─── BADGE ─────────────────────────────────────────────────────────────────────
//

/// Closed set of badges a learner can earn.
///
/// The wire names are stable identifiers shared with persisted progress
/// documents; changing them orphans previously earned badges.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Badge {
    #[serde(rename = "3-day-streak")]
    ThreeDayStreak,
    #[serde(rename = "7-day-streak")]
    SevenDayStreak,
    #[serde(rename = "perfect-score")]
    PerfectScore,
}

impl Badge {
    /// Stable wire name for this badge.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Badge::ThreeDayStreak => "3-day-streak",
            Badge::SevenDayStreak => "7-day-streak",
            Badge::PerfectScore => "perfect-score",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "3-day-streak" => Ok(Badge::ThreeDayStreak),
            "7-day-streak" => Ok(Badge::SevenDayStreak),
            "perfect-score" => Ok(Badge::PerfectScore),
            other => Err(ProgressError::UnknownBadge {
                raw: other.to_string(),
            }),
        }
    }
}

//
// ─── QUIZ SCORE ────────────────────────────────────────────────────────────────
//

/// A quiz result as a percentage in `[0, 100]`.
///
/// Fractional values are kept as-is (a 2-of-3 quiz scores 66.66…), so the
/// inner value is a float rather than an integer percent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct QuizScore(f64);

impl QuizScore {
    /// Validates a raw percentage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidScore` when the value is not finite or
    /// falls outside `[0, 100]`.
    pub fn new(value: f64) -> Result<Self, ProgressError> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(ProgressError::InvalidScore { value });
        }
        Ok(Self(value))
    }

    /// Builds a score by clamping the raw value into range.
    ///
    /// Non-finite input becomes zero. Useful where the value was just
    /// computed from counts and cannot meaningfully fail.
    #[must_use]
    pub fn clamped(value: f64) -> Self {
        if !value.is_finite() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 100.0))
    }

    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether this score earns the perfect-score badge.
    #[must_use]
    pub fn is_perfect(self) -> bool {
        self.0 >= 100.0
    }
}

impl fmt::Display for QuizScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── REWARD POLICY ─────────────────────────────────────────────────────────────
//

/// Tunable point values for progress rewards.
///
/// All mutating operations on [`ProgressRecord`] take a policy so callers can
/// run with the standard rewards or an adjusted set without touching the
/// record logic itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardPolicy {
    completion_bonus: i64,
    score_ratio: f64,
    clamp_at_zero: bool,
}

impl RewardPolicy {
    /// Points granted the first time a topic is completed.
    pub const DEFAULT_COMPLETION_BONUS: i64 = 20;
    /// Fraction of a quiz score converted to points.
    pub const DEFAULT_SCORE_RATIO: f64 = 0.5;
    /// Points granted on reaching a three-day streak.
    pub const THREE_DAY_BONUS: i64 = 50;
    /// Points granted on reaching a seven-day streak.
    pub const SEVEN_DAY_BONUS: i64 = 100;

    /// The standard reward set: 20 points per completion, half the quiz score
    /// as points, and no lower bound on the balance.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            completion_bonus: Self::DEFAULT_COMPLETION_BONUS,
            score_ratio: Self::DEFAULT_SCORE_RATIO,
            clamp_at_zero: false,
        }
    }

    /// Creates a custom policy.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` when the bonus is negative or the ratio is not
    /// a finite non-negative value.
    pub fn new(completion_bonus: i64, score_ratio: f64) -> Result<Self, ProgressError> {
        if completion_bonus < 0 {
            return Err(ProgressError::NegativeBonus {
                bonus: completion_bonus,
            });
        }
        if !score_ratio.is_finite() || score_ratio < 0.0 {
            return Err(ProgressError::InvalidRatio { ratio: score_ratio });
        }
        Ok(Self {
            completion_bonus,
            score_ratio,
            clamp_at_zero: false,
        })
    }

    /// Returns the same policy with the balance floor toggled.
    ///
    /// When set, every point mutation clamps the resulting balance at zero
    /// instead of letting it go negative.
    #[must_use]
    pub fn with_clamp_at_zero(mut self, clamp: bool) -> Self {
        self.clamp_at_zero = clamp;
        self
    }

    #[must_use]
    pub fn completion_bonus(&self) -> i64 {
        self.completion_bonus
    }

    #[must_use]
    pub fn score_ratio(&self) -> f64 {
        self.score_ratio
    }

    #[must_use]
    pub fn clamps_at_zero(&self) -> bool {
        self.clamp_at_zero
    }

    /// Points earned for a recorded quiz score, rounded down.
    #[must_use]
    pub fn points_for_score(&self, score: QuizScore) -> i64 {
        (score.value() * self.score_ratio).floor() as i64
    }

    /// Badge and bonus unlocked when a streak reaches this exact length.
    #[must_use]
    pub fn streak_milestone(&self, streak_days: u32) -> Option<(Badge, i64)> {
        match streak_days {
            3 => Some((Badge::ThreeDayStreak, Self::THREE_DAY_BONUS)),
            7 => Some((Badge::SevenDayStreak, Self::SEVEN_DAY_BONUS)),
            _ => None,
        }
    }
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of rolling the daily streak on load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreakUpdate {
    /// Streak length before the roll.
    pub previous_days: u32,
    /// Streak length after the roll.
    pub days: u32,
    /// True when a gap of more than one day restarted the streak.
    pub reset: bool,
    /// Milestone badge earned by this roll, if any.
    pub badge: Option<Badge>,
    /// Points awarded by this roll.
    pub points: i64,
}

impl StreakUpdate {
    /// Whether the streak grew by one day.
    #[must_use]
    pub fn is_extended(&self) -> bool {
        !self.reset && self.days == self.previous_days + 1
    }

    /// Whether the roll left the streak untouched (same-day load).
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        !self.reset && self.days == self.previous_days
    }
}

/// Result of marking a topic complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOutcome {
    /// False when the topic had already been completed.
    pub newly_completed: bool,
    /// Points awarded by this call (zero on repeat completions).
    pub points: i64,
}

/// Result of recording a quiz score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreOutcome {
    /// Points awarded by this call.
    pub points: i64,
    /// Perfect-score badge, on the first perfect result only.
    pub badge: Option<Badge>,
    /// Score this one replaced, when the topic had been attempted before.
    pub replaced: Option<QuizScore>,
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// One learner's accumulated progress.
///
/// This is a plain value type; persistence and session wiring live elsewhere.
/// Every mutation returns an outcome describing what changed so callers can
/// surface rewards without diffing snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    completed_topics: BTreeSet<TopicId>,
    quiz_scores: BTreeMap<TopicId, QuizScore>,
    streak_days: u32,
    last_login: NaiveDate,
    points: i64,
    badges: BTreeSet<Badge>,
}

impl ProgressRecord {
    /// Fresh progress for a learner seen today for the first time.
    #[must_use]
    pub fn new(today: NaiveDate) -> Self {
        Self {
            completed_topics: BTreeSet::new(),
            quiz_scores: BTreeMap::new(),
            streak_days: 1,
            last_login: today,
            points: 0,
            badges: BTreeSet::new(),
        }
    }

    /// Rebuilds a record from previously persisted parts.
    #[must_use]
    pub fn from_parts(
        completed_topics: BTreeSet<TopicId>,
        quiz_scores: BTreeMap<TopicId, QuizScore>,
        streak_days: u32,
        last_login: NaiveDate,
        points: i64,
        badges: BTreeSet<Badge>,
    ) -> Self {
        Self {
            completed_topics,
            quiz_scores,
            streak_days,
            last_login,
            points,
            badges,
        }
    }

    // Accessors
    #[must_use]
    pub fn completed_topics(&self) -> &BTreeSet<TopicId> {
        &self.completed_topics
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<TopicId, QuizScore> {
        &self.quiz_scores
    }

    #[must_use]
    pub fn streak_days(&self) -> u32 {
        self.streak_days
    }

    #[must_use]
    pub fn last_login(&self) -> NaiveDate {
        self.last_login
    }

    #[must_use]
    pub fn points(&self) -> i64 {
        self.points
    }

    #[must_use]
    pub fn badges(&self) -> &BTreeSet<Badge> {
        &self.badges
    }

    #[must_use]
    pub fn has_badge(&self, badge: Badge) -> bool {
        self.badges.contains(&badge)
    }

    #[must_use]
    pub fn is_completed(&self, topic: &TopicId) -> bool {
        self.completed_topics.contains(topic)
    }

    #[must_use]
    pub fn score_for(&self, topic: &TopicId) -> Option<QuizScore> {
        self.quiz_scores.get(topic).copied()
    }

    /// Share of `total_topics` completed, as a whole percentage.
    ///
    /// Zero topics yields zero rather than a division error.
    #[must_use]
    pub fn completion_percent(&self, total_topics: usize) -> f64 {
        if total_topics == 0 {
            return 0.0;
        }
        (self.completed_topics.len() as f64 / total_topics as f64 * 100.0).round()
    }

    /// Advances the streak for a load happening on `today`.
    ///
    /// A gap of exactly one day extends the streak; a longer gap restarts it
    /// at one; a same-day load changes nothing. Either way the last-login
    /// date moves to `today`. Hitting day 3 or day 7 for the first time
    /// awards the matching badge plus its bonus; a badge already on the
    /// record is never re-awarded.
    pub fn roll_daily_streak(&mut self, today: NaiveDate, policy: &RewardPolicy) -> StreakUpdate {
        let previous_days = self.streak_days;
        let gap_days = (today - self.last_login).num_days().unsigned_abs();

        let mut reset = false;
        let mut badge = None;
        let mut points = 0;

        match gap_days {
            0 => {}
            1 => {
                self.streak_days += 1;
                if let Some((milestone, bonus)) = policy.streak_milestone(self.streak_days) {
                    if self.badges.insert(milestone) {
                        badge = Some(milestone);
                        points = bonus;
                        self.apply_points(bonus, policy);
                    }
                }
            }
            _ => {
                self.streak_days = 1;
                reset = true;
            }
        }
        self.last_login = today;

        StreakUpdate {
            previous_days,
            days: self.streak_days,
            reset,
            badge,
            points,
        }
    }

    /// Marks a topic complete, awarding the completion bonus exactly once.
    pub fn complete(&mut self, topic: TopicId, policy: &RewardPolicy) -> CompletionOutcome {
        if !self.completed_topics.insert(topic) {
            return CompletionOutcome {
                newly_completed: false,
                points: 0,
            };
        }
        let bonus = policy.completion_bonus();
        self.apply_points(bonus, policy);
        CompletionOutcome {
            newly_completed: true,
            points: bonus,
        }
    }

    /// Records a quiz score, replacing any earlier result for the topic.
    ///
    /// Points are awarded on every call, including retakes. The
    /// perfect-score badge is granted at most once.
    pub fn record_score(
        &mut self,
        topic: TopicId,
        score: QuizScore,
        policy: &RewardPolicy,
    ) -> ScoreOutcome {
        let replaced = self.quiz_scores.insert(topic, score);
        let points = policy.points_for_score(score);
        self.apply_points(points, policy);

        let badge = if score.is_perfect() && self.badges.insert(Badge::PerfectScore) {
            Some(Badge::PerfectScore)
        } else {
            None
        };

        ScoreOutcome {
            points,
            badge,
            replaced,
        }
    }

    /// Adjusts the point balance by an arbitrary delta and returns the new
    /// balance. Negative deltas are allowed; the policy decides whether the
    /// balance may drop below zero.
    pub fn add_points(&mut self, delta: i64, policy: &RewardPolicy) -> i64 {
        self.apply_points(delta, policy);
        self.points
    }

    fn apply_points(&mut self, delta: i64, policy: &RewardPolicy) {
        self.points = self.points.saturating_add(delta);
        if policy.clamps_at_zero() && self.points < 0 {
            self.points = 0;
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
