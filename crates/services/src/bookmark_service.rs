use codepath_core::model::{Bookmark, BookmarkDraft, BookmarkToggle, LessonId};
use tracing::debug;

use crate::Clock;
use crate::error::LedgerError;
use crate::progress_store::ProgressStore;

/// Outcome of a toggle: which branch ran, and the list as saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleResult {
    pub toggle: BookmarkToggle,
    pub bookmarks: Vec<Bookmark>,
}

/// The global bookmark list, one entry per lesson.
#[derive(Clone)]
pub struct BookmarkIndex {
    clock: Clock,
    store: ProgressStore,
}

impl BookmarkIndex {
    #[must_use]
    pub fn new(clock: Clock, store: ProgressStore) -> Self {
        Self { clock, store }
    }

    /// All bookmarks in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the document cannot be read.
    pub async fn get_bookmarks(&self) -> Result<Vec<Bookmark>, LedgerError> {
        Ok(self.store.bookmarks().await?.into_vec())
    }

    /// Remove the lesson's bookmark if present, otherwise add it stamped now.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the draft has a zero id.
    /// Returns `LedgerError::Storage` if the document cannot be read or saved.
    pub async fn toggle_bookmark(&self, draft: BookmarkDraft) -> Result<ToggleResult, LedgerError> {
        let now = self.clock.now();
        let lesson_id = draft.lesson_id;
        let result = self
            .store
            .update_bookmarks(move |doc| {
                let (next, toggle) = doc.toggle(draft, now)?;
                let bookmarks = next.as_slice().to_vec();
                Ok::<_, LedgerError>((next, ToggleResult { toggle, bookmarks }))
            })
            .await?;
        debug!(
            lesson_id = lesson_id.value(),
            bookmarked = result.toggle.is_bookmarked(),
            "bookmark toggled"
        );
        Ok(result)
    }

    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the document cannot be read.
    pub async fn is_bookmarked(&self, lesson_id: LessonId) -> Result<bool, LedgerError> {
        Ok(self.store.bookmarks().await?.contains(lesson_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepath_core::model::{CourseId, ModuleId, ProgressError};
    use codepath_core::time::{fixed_clock, fixed_now};
    use std::sync::Arc;
    use storage::repository::InMemoryRepository;

    fn draft(lesson: u64) -> BookmarkDraft {
        BookmarkDraft {
            course_id: CourseId::new(1),
            module_id: ModuleId::new(2),
            lesson_id: LessonId::new(lesson),
            title: format!("Lesson {lesson}"),
            course_title: "Intro to Go".into(),
        }
    }

    fn index() -> BookmarkIndex {
        let store = ProgressStore::new(Arc::new(InMemoryRepository::new()));
        BookmarkIndex::new(fixed_clock(), store)
    }

    #[tokio::test]
    async fn toggle_twice_then_three_times() {
        let index = index();

        let first = index.toggle_bookmark(draft(5)).await.unwrap();
        assert_eq!(first.toggle, BookmarkToggle::Added);
        assert_eq!(first.bookmarks[0].date_added, fixed_now());

        let second = index.toggle_bookmark(draft(5)).await.unwrap();
        assert_eq!(second.toggle, BookmarkToggle::Removed);
        assert!(second.bookmarks.is_empty());
        assert!(!index.is_bookmarked(LessonId::new(5)).await.unwrap());

        let third = index.toggle_bookmark(draft(5)).await.unwrap();
        assert!(third.toggle.is_bookmarked());
        assert!(index.is_bookmarked(LessonId::new(5)).await.unwrap());
        assert_eq!(index.get_bookmarks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_lesson_id_is_rejected_without_writing() {
        let index = index();
        let err = index.toggle_bookmark(draft(0)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ProgressError::InvalidLessonId)
        ));
        assert!(index.get_bookmarks().await.unwrap().is_empty());
    }
}
