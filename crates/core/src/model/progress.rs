use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, ModuleId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Validation failures for progress events and persisted progress records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("course id must be positive")]
    InvalidCourseId,

    #[error("lesson id must be positive")]
    InvalidLessonId,

    #[error("module id must be positive")]
    InvalidModuleId,

    #[error("quiz id must be positive")]
    InvalidQuizId,

    #[error("quiz score must be between 0 and 100, got {score}")]
    ScoreOutOfRange { score: i64 },

    #[error("lesson {lesson_id} is recorded more than once")]
    DuplicateLesson { lesson_id: LessonId },

    #[error("completion date precedes start date")]
    StartedAfterCompletion,
}

pub(crate) fn ensure_course(id: CourseId) -> Result<(), ProgressError> {
    if id.is_positive() {
        Ok(())
    } else {
        Err(ProgressError::InvalidCourseId)
    }
}

pub(crate) fn ensure_lesson(id: LessonId) -> Result<(), ProgressError> {
    if id.is_positive() {
        Ok(())
    } else {
        Err(ProgressError::InvalidLessonId)
    }
}

pub(crate) fn ensure_module(id: ModuleId) -> Result<(), ProgressError> {
    if id.is_positive() {
        Ok(())
    } else {
        Err(ProgressError::InvalidModuleId)
    }
}

pub(crate) fn ensure_quiz(id: QuizId) -> Result<(), ProgressError> {
    if id.is_positive() {
        Ok(())
    } else {
        Err(ProgressError::InvalidQuizId)
    }
}

//
// ─── QUIZ SCORE ────────────────────────────────────────────────────────────────
//

/// Percentage score for a quiz attempt, always within `0..=100`.
///
/// Deserialization goes through [`QuizScore::new`], so an out-of-range value in a
/// stored document is rejected instead of silently clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct QuizScore(u8);

impl QuizScore {
    pub const MAX: u8 = 100;

    /// Validates a raw score.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ScoreOutOfRange` if `score` is outside `0..=100`.
    pub fn new(score: i64) -> Result<Self, ProgressError> {
        u8::try_from(score)
            .ok()
            .filter(|value| *value <= Self::MAX)
            .map(Self)
            .ok_or(ProgressError::ScoreOutOfRange { score })
    }

    pub(crate) fn from_percent(percent: u8) -> Self {
        Self(percent.min(Self::MAX))
    }

    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// True when the score meets or exceeds the quiz's passing threshold.
    #[must_use]
    pub fn passes(&self, passing_score: u8) -> bool {
        self.0 >= passing_score
    }
}

impl TryFrom<i64> for QuizScore {
    type Error = ProgressError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<QuizScore> for u8 {
    fn from(score: QuizScore) -> Self {
        score.0
    }
}

//
// ─── COURSE PROGRESS ───────────────────────────────────────────────────────────
//

/// The most recent lesson-completion event for a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastAccessed {
    pub lesson_id: LessonId,
    pub timestamp: DateTime<Utc>,
}

/// Progress for a single course.
///
/// `completed_lessons` keeps insertion order so the last entry is the most recently
/// finished lesson. `completion_date` is write-once: it is set on the first
/// transition to complete and never cleared.
///
/// Stored records may carry a legacy per-course `bookmarks` array; it is ignored on
/// load and never written back, the global bookmark list is the only source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    #[serde(default)]
    completed_lessons: Vec<LessonId>,
    #[serde(default)]
    quiz_scores: BTreeMap<QuizId, QuizScore>,
    #[serde(default)]
    last_accessed: Option<LastAccessed>,
    started_date: DateTime<Utc>,
    #[serde(default)]
    completion_date: Option<DateTime<Utc>>,
}

impl CourseProgress {
    /// Fresh record with nothing completed.
    #[must_use]
    pub fn new(started_date: DateTime<Utc>) -> Self {
        Self {
            completed_lessons: Vec::new(),
            quiz_scores: BTreeMap::new(),
            last_accessed: None,
            started_date,
            completion_date: None,
        }
    }

    /// Check the invariants a stored record must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a `ProgressError`.
    pub fn validate(&self) -> Result<(), ProgressError> {
        let mut seen = HashSet::with_capacity(self.completed_lessons.len());
        for lesson_id in &self.completed_lessons {
            ensure_lesson(*lesson_id)?;
            if !seen.insert(*lesson_id) {
                return Err(ProgressError::DuplicateLesson {
                    lesson_id: *lesson_id,
                });
            }
        }
        for quiz_id in self.quiz_scores.keys() {
            ensure_quiz(*quiz_id)?;
        }
        if let Some(last) = &self.last_accessed {
            ensure_lesson(last.lesson_id)?;
        }
        if let Some(done) = self.completion_date {
            if done < self.started_date {
                return Err(ProgressError::StartedAfterCompletion);
            }
        }
        Ok(())
    }

    /// Record a lesson as completed and refresh `last_accessed`.
    ///
    /// Returns `true` if the lesson was not already completed. Re-completing a
    /// lesson leaves the set untouched but still moves `last_accessed`.
    pub fn mark_lesson_complete(&mut self, lesson_id: LessonId, at: DateTime<Utc>) -> bool {
        let newly_added = !self.completed_lessons.contains(&lesson_id);
        if newly_added {
            self.completed_lessons.push(lesson_id);
        }
        self.last_accessed = Some(LastAccessed {
            lesson_id,
            timestamp: at,
        });
        newly_added
    }

    /// Overwrite the score for a quiz, returning the previous one.
    pub fn record_quiz_score(&mut self, quiz_id: QuizId, score: QuizScore) -> Option<QuizScore> {
        self.quiz_scores.insert(quiz_id, score)
    }

    /// Stamp the completion date if it is not already set.
    ///
    /// The stamp never precedes `started_date`; a clock that stepped backwards
    /// stamps the start instead. Returns `true` only for the call that performed
    /// the stamp.
    pub fn stamp_completion(&mut self, at: DateTime<Utc>) -> bool {
        if self.completion_date.is_some() {
            return false;
        }
        self.completion_date = Some(at.max(self.started_date));
        true
    }

    #[must_use]
    pub fn completed_lessons(&self) -> &[LessonId] {
        &self.completed_lessons
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed_lessons.len()
    }

    #[must_use]
    pub fn is_lesson_completed(&self, lesson_id: LessonId) -> bool {
        self.completed_lessons.contains(&lesson_id)
    }

    #[must_use]
    pub fn last_completed_lesson(&self) -> Option<LessonId> {
        self.completed_lessons.last().copied()
    }

    #[must_use]
    pub fn quiz_scores(&self) -> &BTreeMap<QuizId, QuizScore> {
        &self.quiz_scores
    }

    #[must_use]
    pub fn quiz_score(&self, quiz_id: QuizId) -> Option<QuizScore> {
        self.quiz_scores.get(&quiz_id).copied()
    }

    #[must_use]
    pub fn last_accessed(&self) -> Option<LastAccessed> {
        self.last_accessed
    }

    #[must_use]
    pub fn started_date(&self) -> DateTime<Utc> {
        self.started_date
    }

    #[must_use]
    pub fn completion_date(&self) -> Option<DateTime<Utc>> {
        self.completion_date
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion_date.is_some()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    #[test]
    fn score_bounds_are_inclusive() {
        assert_eq!(QuizScore::new(0).unwrap().value(), 0);
        assert_eq!(QuizScore::new(100).unwrap().value(), 100);
        assert_eq!(
            QuizScore::new(150),
            Err(ProgressError::ScoreOutOfRange { score: 150 })
        );
        assert_eq!(
            QuizScore::new(-1),
            Err(ProgressError::ScoreOutOfRange { score: -1 })
        );
    }

    #[test]
    fn score_rejected_when_deserializing_out_of_range() {
        assert!(serde_json::from_str::<QuizScore>("101").is_err());
        let ok: QuizScore = serde_json::from_str("87").unwrap();
        assert!(ok.passes(70));
        assert!(!ok.passes(90));
    }

    #[test]
    fn re_marking_lesson_only_moves_last_accessed() {
        let now = fixed_now();
        let mut progress = CourseProgress::new(now);

        assert!(progress.mark_lesson_complete(LessonId::new(1), now));
        assert!(progress.mark_lesson_complete(LessonId::new(2), now));
        let later = now + Duration::minutes(5);
        assert!(!progress.mark_lesson_complete(LessonId::new(1), later));

        assert_eq!(
            progress.completed_lessons(),
            &[LessonId::new(1), LessonId::new(2)]
        );
        assert_eq!(progress.last_completed_lesson(), Some(LessonId::new(2)));
        let last = progress.last_accessed().unwrap();
        assert_eq!(last.lesson_id, LessonId::new(1));
        assert_eq!(last.timestamp, later);
    }

    #[test]
    fn completion_stamp_is_write_once() {
        let now = fixed_now();
        let mut progress = CourseProgress::new(now);
        assert!(progress.stamp_completion(now));
        assert!(!progress.stamp_completion(now + Duration::days(1)));
        assert_eq!(progress.completion_date(), Some(now));
    }

    #[test]
    fn completion_stamp_never_precedes_start() {
        let now = fixed_now();
        let mut progress = CourseProgress::new(now);
        assert!(progress.stamp_completion(now - Duration::seconds(1)));
        assert_eq!(progress.completion_date(), Some(now));
        progress.validate().unwrap();

        let reloaded: CourseProgress =
            serde_json::from_str(&serde_json::to_string(&progress).unwrap()).unwrap();
        assert_eq!(reloaded.validate(), Ok(()));
    }

    #[test]
    fn validate_flags_duplicate_lessons() {
        let json = r#"{
            "completedLessons": [3, 4, 3],
            "quizScores": {},
            "lastAccessed": null,
            "startedDate": "2023-11-14T22:13:20Z"
        }"#;
        let progress: CourseProgress = serde_json::from_str(json).unwrap();
        assert_eq!(
            progress.validate(),
            Err(ProgressError::DuplicateLesson {
                lesson_id: LessonId::new(3)
            })
        );
    }

    #[test]
    fn legacy_record_loads_without_completion_date() {
        let json = r#"{
            "completedLessons": [1],
            "quizScores": {"7": 80},
            "bookmarks": [{"lessonId": 1}],
            "lastAccessed": {"lessonId": 1, "timestamp": "2023-11-14T22:13:20Z"},
            "startedDate": "2023-11-14T22:13:20Z"
        }"#;
        let progress: CourseProgress = serde_json::from_str(json).unwrap();
        progress.validate().unwrap();
        assert_eq!(progress.completion_date(), None);
        assert_eq!(
            progress.quiz_score(QuizId::new(7)),
            Some(QuizScore::new(80).unwrap())
        );

        let written = serde_json::to_value(&progress).unwrap();
        assert!(written.get("bookmarks").is_none());
        assert!(written.get("completionDate").unwrap().is_null());
    }
}
