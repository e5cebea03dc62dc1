use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LessonId, ModuleId};
use crate::model::progress::{ProgressError, ensure_course, ensure_lesson, ensure_module};

/// Caller-supplied data for a bookmark; the index stamps `date_added`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookmarkDraft {
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub lesson_id: LessonId,
    pub title: String,
    pub course_title: String,
}

impl BookmarkDraft {
    /// Check identifiers and stamp the bookmark.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if any identifier is zero.
    pub fn validate(self, date_added: DateTime<Utc>) -> Result<Bookmark, ProgressError> {
        ensure_course(self.course_id)?;
        ensure_module(self.module_id)?;
        ensure_lesson(self.lesson_id)?;
        Ok(Bookmark {
            course_id: self.course_id,
            module_id: self.module_id,
            lesson_id: self.lesson_id,
            title: self.title,
            course_title: self.course_title,
            date_added,
        })
    }
}

/// A bookmarked lesson. Identity is the `lesson_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub lesson_id: LessonId,
    pub title: String,
    pub course_title: String,
    pub date_added: DateTime<Utc>,
}

/// Which branch a bookmark toggle took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkToggle {
    Added,
    Removed,
}

impl BookmarkToggle {
    #[must_use]
    pub fn is_bookmarked(self) -> bool {
        matches!(self, Self::Added)
    }
}
