use std::collections::BTreeMap;

use codepath_core::ledger::ProgressEvent;
use codepath_core::model::{CourseId, CourseProgress, LessonId, ProgressError, QuizId, QuizScore};
use storage::repository::StorageError;
use tracing::debug;

use crate::Clock;
use crate::error::LedgerError;
use crate::progress_store::ProgressStore;

/// Owns every course's progress record.
///
/// Lessons are recorded through `CompletionEvaluator::complete_lesson`, which
/// checks the course total in the same write.
#[derive(Clone)]
pub struct ProgressLedger {
    clock: Clock,
    store: ProgressStore,
}

impl ProgressLedger {
    #[must_use]
    pub fn new(clock: Clock, store: ProgressStore) -> Self {
        Self { clock, store }
    }

    /// Full snapshot of the ledger keyed by course.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the document cannot be read.
    pub async fn get_all_progress(
        &self,
    ) -> Result<BTreeMap<CourseId, CourseProgress>, LedgerError> {
        Ok(self.store.progress().await?.into_courses())
    }

    /// The stored record, or a fresh unsaved record started now.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` for a zero course id.
    /// Returns `LedgerError::Storage` if the document cannot be read.
    pub async fn get_progress(&self, course_id: CourseId) -> Result<CourseProgress, LedgerError> {
        if !course_id.is_positive() {
            return Err(ProgressError::InvalidCourseId.into());
        }
        let doc = self.store.progress().await?;
        Ok(doc.get_or_default(course_id, self.clock.now()))
    }

    /// Store `score` for the quiz, replacing any earlier score.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the score is outside 0..=100 or an id is
    /// zero; the stored score is left as it was.
    /// Returns `LedgerError::Storage` if the document cannot be read or saved.
    pub async fn record_quiz_score(
        &self,
        course_id: CourseId,
        quiz_id: QuizId,
        score: i64,
    ) -> Result<CourseProgress, LedgerError> {
        let score = QuizScore::new(score)?;
        let event = ProgressEvent::QuizScored {
            course_id,
            quiz_id,
            score,
            at: self.clock.now(),
        };
        let progress = self.apply(event).await?;
        debug!(
            course_id = course_id.value(),
            quiz_id = quiz_id.value(),
            score = score.value(),
            "quiz score recorded"
        );
        Ok(progress)
    }

    /// Delete the course's record. Returns whether a record existed.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the document cannot be read or saved.
    pub async fn clear_progress(&self, course_id: CourseId) -> Result<bool, LedgerError> {
        let removed = self
            .store
            .update_progress(move |doc| {
                if doc.get(course_id).is_none() {
                    return Ok::<_, LedgerError>((None, false));
                }
                let next = doc.apply(ProgressEvent::ProgressCleared { course_id })?;
                Ok((Some(next), true))
            })
            .await?;
        debug!(course_id = course_id.value(), removed, "course progress cleared");
        Ok(removed)
    }

    /// Empty the ledger and the bookmark index together.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the reset cannot be written.
    pub async fn clear_all_progress(&self) -> Result<(), LedgerError> {
        self.store.reset().await?;
        debug!("all progress and bookmarks cleared");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the document cannot be read.
    pub async fn is_lesson_completed(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<bool, LedgerError> {
        let doc = self.store.progress().await?;
        Ok(doc
            .get(course_id)
            .is_some_and(|p| p.is_lesson_completed(lesson_id)))
    }

    async fn apply(&self, event: ProgressEvent) -> Result<CourseProgress, LedgerError> {
        let course_id = event.course_id();
        self.store
            .update_progress(move |doc| {
                let next = doc.apply(event)?;
                let progress = next
                    .get(course_id)
                    .cloned()
                    .ok_or(StorageError::NotFound)?;
                Ok::<_, LedgerError>((Some(next), progress))
            })
            .await
    }
}
