//! Whole-document state and the pure transitions applied to it.
//!
//! Every logical event is a function from the current document to the next one.
//! Validation happens before any mutation, so a rejected event never yields a
//! partially updated document and there is nothing to roll back.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::progress::{ensure_course, ensure_lesson, ensure_quiz};
use crate::model::{
    Bookmark, BookmarkDraft, BookmarkToggle, CourseId, CourseProgress, LessonId, ProgressError,
    QuizId, QuizScore,
};

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// A single mutation of the progress document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    LessonCompleted {
        course_id: CourseId,
        lesson_id: LessonId,
        at: DateTime<Utc>,
    },
    QuizScored {
        course_id: CourseId,
        quiz_id: QuizId,
        score: QuizScore,
        at: DateTime<Utc>,
    },
    CompletionReached {
        course_id: CourseId,
        at: DateTime<Utc>,
    },
    ProgressCleared {
        course_id: CourseId,
    },
}

impl ProgressEvent {
    #[must_use]
    pub fn course_id(&self) -> CourseId {
        match self {
            ProgressEvent::LessonCompleted { course_id, .. }
            | ProgressEvent::QuizScored { course_id, .. }
            | ProgressEvent::CompletionReached { course_id, .. }
            | ProgressEvent::ProgressCleared { course_id } => *course_id,
        }
    }

    fn validate(&self) -> Result<(), ProgressError> {
        ensure_course(self.course_id())?;
        match self {
            ProgressEvent::LessonCompleted { lesson_id, .. } => ensure_lesson(*lesson_id),
            ProgressEvent::QuizScored { quiz_id, .. } => ensure_quiz(*quiz_id),
            ProgressEvent::CompletionReached { .. } | ProgressEvent::ProgressCleared { .. } => {
                Ok(())
            }
        }
    }
}

//
// ─── PROGRESS DOCUMENT ─────────────────────────────────────────────────────────
//

/// Every course's progress, keyed by course id.
///
/// Serialized as a JSON object whose keys are the stringified course ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressDocument {
    courses: BTreeMap<CourseId, CourseProgress>,
}

impl ProgressDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every record; used when a document is read back from storage.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ProgressError> {
        for (course_id, progress) in &self.courses {
            ensure_course(*course_id)?;
            progress.validate()?;
        }
        Ok(())
    }

    /// Apply one event and return the resulting document.
    ///
    /// Records are created lazily by lesson and quiz events, with `started_date`
    /// taken from the event time. `CompletionReached` on a course that already has a
    /// completion date, or on a course with no record, leaves the document unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the event carries an invalid identifier; the
    /// input document is consumed but no changed document is produced.
    pub fn apply(mut self, event: ProgressEvent) -> Result<Self, ProgressError> {
        event.validate()?;
        match event {
            ProgressEvent::LessonCompleted {
                course_id,
                lesson_id,
                at,
            } => {
                self.entry(course_id, at).mark_lesson_complete(lesson_id, at);
            }
            ProgressEvent::QuizScored {
                course_id,
                quiz_id,
                score,
                at,
            } => {
                self.entry(course_id, at).record_quiz_score(quiz_id, score);
            }
            ProgressEvent::CompletionReached { course_id, at } => {
                if let Some(progress) = self.courses.get_mut(&course_id) {
                    progress.stamp_completion(at);
                }
            }
            ProgressEvent::ProgressCleared { course_id } => {
                self.courses.remove(&course_id);
            }
        }
        Ok(self)
    }

    fn entry(&mut self, course_id: CourseId, at: DateTime<Utc>) -> &mut CourseProgress {
        self.courses
            .entry(course_id)
            .or_insert_with(|| CourseProgress::new(at))
    }

    #[must_use]
    pub fn get(&self, course_id: CourseId) -> Option<&CourseProgress> {
        self.courses.get(&course_id)
    }

    /// The stored record, or a fresh default started at `now` (not inserted).
    #[must_use]
    pub fn get_or_default(&self, course_id: CourseId, now: DateTime<Utc>) -> CourseProgress {
        self.courses
            .get(&course_id)
            .cloned()
            .unwrap_or_else(|| CourseProgress::new(now))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CourseId, &CourseProgress)> {
        self.courses.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    #[must_use]
    pub fn into_courses(self) -> BTreeMap<CourseId, CourseProgress> {
        self.courses
    }
}

//
// ─── BOOKMARK DOCUMENT ─────────────────────────────────────────────────────────
//

/// The global bookmark list in insertion order, at most one entry per lesson.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkDocument {
    bookmarks: Vec<Bookmark>,
}

impl BookmarkDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Returns `ProgressError::DuplicateLesson` if two entries share a lesson, or an
    /// id error for zero identifiers.
    pub fn validate(&self) -> Result<(), ProgressError> {
        let mut seen = std::collections::HashSet::with_capacity(self.bookmarks.len());
        for bookmark in &self.bookmarks {
            ensure_course(bookmark.course_id)?;
            ensure_lesson(bookmark.lesson_id)?;
            if !seen.insert(bookmark.lesson_id) {
                return Err(ProgressError::DuplicateLesson {
                    lesson_id: bookmark.lesson_id,
                });
            }
        }
        Ok(())
    }

    /// Remove the bookmark for the draft's lesson if present, otherwise append it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the draft carries a zero identifier.
    pub fn toggle(
        mut self,
        draft: BookmarkDraft,
        now: DateTime<Utc>,
    ) -> Result<(Self, BookmarkToggle), ProgressError> {
        let bookmark = draft.validate(now)?;
        if let Some(index) = self
            .bookmarks
            .iter()
            .position(|b| b.lesson_id == bookmark.lesson_id)
        {
            self.bookmarks.remove(index);
            return Ok((self, BookmarkToggle::Removed));
        }
        self.bookmarks.push(bookmark);
        Ok((self, BookmarkToggle::Added))
    }

    #[must_use]
    pub fn contains(&self, lesson_id: LessonId) -> bool {
        self.bookmarks.iter().any(|b| b.lesson_id == lesson_id)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Bookmark> {
        self.bookmarks
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModuleId;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn lesson_done(course: u64, lesson: u64, at: DateTime<Utc>) -> ProgressEvent {
        ProgressEvent::LessonCompleted {
            course_id: CourseId::new(course),
            lesson_id: LessonId::new(lesson),
            at,
        }
    }

    fn draft(lesson: u64) -> BookmarkDraft {
        BookmarkDraft {
            course_id: CourseId::new(1),
            module_id: ModuleId::new(1),
            lesson_id: LessonId::new(lesson),
            title: format!("Lesson {lesson}"),
            course_title: "Rust".into(),
        }
    }

    #[test]
    fn lesson_event_creates_record_lazily() {
        let now = fixed_now();
        let doc = ProgressDocument::new().apply(lesson_done(4, 1, now)).unwrap();

        let progress = doc.get(CourseId::new(4)).unwrap();
        assert_eq!(progress.started_date(), now);
        assert_eq!(progress.completed_lessons(), &[LessonId::new(1)]);
        assert_eq!(progress.completion_date(), None);
    }

    #[test]
    fn marking_twice_is_idempotent() {
        let now = fixed_now();
        let once = ProgressDocument::new().apply(lesson_done(1, 9, now)).unwrap();
        let twice = once
            .clone()
            .apply(lesson_done(1, 9, now + Duration::seconds(30)))
            .unwrap();

        let a = once.get(CourseId::new(1)).unwrap();
        let b = twice.get(CourseId::new(1)).unwrap();
        assert_eq!(a.completed_lessons(), b.completed_lessons());
        assert_eq!(
            b.last_accessed().unwrap().timestamp,
            now + Duration::seconds(30)
        );
    }

    #[test]
    fn later_score_overwrites_earlier() {
        let now = fixed_now();
        let scored = |score| ProgressEvent::QuizScored {
            course_id: CourseId::new(1),
            quiz_id: QuizId::new(2),
            score: QuizScore::new(score).unwrap(),
            at: now,
        };
        let doc = ProgressDocument::new()
            .apply(scored(70))
            .unwrap()
            .apply(scored(90))
            .unwrap();

        let progress = doc.get(CourseId::new(1)).unwrap();
        assert_eq!(progress.quiz_score(QuizId::new(2)).unwrap().value(), 90);
        assert_eq!(progress.quiz_scores().len(), 1);
    }

    #[test]
    fn zero_ids_are_rejected_before_mutation() {
        let now = fixed_now();
        assert_eq!(
            ProgressDocument::new().apply(lesson_done(0, 1, now)),
            Err(ProgressError::InvalidCourseId)
        );
        assert_eq!(
            ProgressDocument::new().apply(lesson_done(1, 0, now)),
            Err(ProgressError::InvalidLessonId)
        );
    }

    #[test]
    fn completion_reached_never_moves_the_date() {
        let now = fixed_now();
        let doc = ProgressDocument::new()
            .apply(lesson_done(1, 1, now))
            .unwrap()
            .apply(ProgressEvent::CompletionReached {
                course_id: CourseId::new(1),
                at: now,
            })
            .unwrap()
            .apply(ProgressEvent::CompletionReached {
                course_id: CourseId::new(1),
                at: now + Duration::days(2),
            })
            .unwrap()
            .apply(lesson_done(1, 1, now + Duration::days(3)))
            .unwrap();

        assert_eq!(doc.get(CourseId::new(1)).unwrap().completion_date(), Some(now));
    }

    #[test]
    fn completion_with_a_lagging_clock_still_validates() {
        let now = fixed_now();
        let doc = ProgressDocument::new()
            .apply(lesson_done(1, 1, now))
            .unwrap()
            .apply(ProgressEvent::CompletionReached {
                course_id: CourseId::new(1),
                at: now - Duration::seconds(1),
            })
            .unwrap();

        assert_eq!(doc.get(CourseId::new(1)).unwrap().completion_date(), Some(now));
        let back: ProgressDocument =
            serde_json::from_value(serde_json::to_value(&doc).unwrap()).unwrap();
        assert_eq!(back.validate(), Ok(()));
    }

    #[test]
    fn clearing_removes_the_whole_record() {
        let now = fixed_now();
        let doc = ProgressDocument::new()
            .apply(lesson_done(1, 1, now))
            .unwrap()
            .apply(lesson_done(2, 1, now))
            .unwrap()
            .apply(ProgressEvent::ProgressCleared {
                course_id: CourseId::new(1),
            })
            .unwrap();

        assert!(doc.get(CourseId::new(1)).is_none());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn document_serializes_with_string_keys() {
        let now = fixed_now();
        let doc = ProgressDocument::new().apply(lesson_done(12, 3, now)).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("12").is_some());

        let back: ProgressDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let now = fixed_now();
        let (doc, first) = BookmarkDocument::new().toggle(draft(5), now).unwrap();
        assert_eq!(first, BookmarkToggle::Added);
        assert!(doc.contains(LessonId::new(5)));
        assert_eq!(doc.as_slice()[0].date_added, now);

        let (doc, second) = doc.toggle(draft(5), now).unwrap();
        assert_eq!(second, BookmarkToggle::Removed);
        assert!(doc.is_empty());

        let (doc, third) = doc.toggle(draft(5), now).unwrap();
        assert_eq!(third, BookmarkToggle::Added);
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn toggle_preserves_insertion_order() {
        let now = fixed_now();
        let (doc, _) = BookmarkDocument::new().toggle(draft(3), now).unwrap();
        let (doc, _) = doc.toggle(draft(1), now).unwrap();
        let (doc, _) = doc.toggle(draft(2), now).unwrap();
        let (doc, _) = doc.toggle(draft(1), now).unwrap();

        let lessons: Vec<u64> = doc.as_slice().iter().map(|b| b.lesson_id.value()).collect();
        assert_eq!(lessons, vec![3, 2]);
    }
}
