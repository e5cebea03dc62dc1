use std::sync::Arc;

use codepath_core::completion::course_percentage;
use codepath_core::model::CourseId;
use codepath_core::stats::{DashboardSummary, LearningStats};
use storage::catalog::CourseCatalog;

use crate::error::StatsError;
use crate::progress_store::ProgressStore;

/// Read-only summaries over the ledger, bookmarks, and catalog.
#[derive(Clone)]
pub struct StatsService {
    store: ProgressStore,
    catalog: Arc<dyn CourseCatalog>,
}

impl StatsService {
    #[must_use]
    pub fn new(store: ProgressStore, catalog: Arc<dyn CourseCatalog>) -> Self {
        Self { store, catalog }
    }

    /// # Errors
    ///
    /// Returns `StatsError::Storage` if either document cannot be read.
    pub async fn get_stats(&self) -> Result<LearningStats, StatsError> {
        let (progress, bookmarks) = self.store.snapshot().await?;
        Ok(LearningStats::compute(&progress, &bookmarks))
    }

    /// # Errors
    ///
    /// Returns `StatsError::Storage` if the catalog or ledger cannot be read.
    pub async fn dashboard(&self) -> Result<DashboardSummary, StatsError> {
        let courses = self.catalog.get_all().await?;
        let progress = self.store.progress().await?;
        Ok(DashboardSummary::compute(&courses, &progress))
    }

    /// Whole-percent progress through one course.
    ///
    /// # Errors
    ///
    /// Returns `StatsError::CourseNotFound` if the catalog has no such course.
    /// Returns `StatsError::Storage` if the catalog or ledger cannot be read.
    pub async fn course_percentage(&self, course_id: CourseId) -> Result<u8, StatsError> {
        let course = self
            .catalog
            .get_by_id(course_id)
            .await?
            .ok_or(StatsError::CourseNotFound(course_id))?;
        let progress = self.store.progress().await?;
        let completed = progress
            .get(course_id)
            .map_or(0, |p| p.completed_count());
        Ok(course_percentage(completed, course.total_lessons))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use codepath_core::ledger::ProgressEvent;
    use codepath_core::model::{Course, Difficulty, LessonId};
    use codepath_core::time::fixed_now;
    use storage::catalog::FixtureCatalog;
    use storage::repository::InMemoryRepository;

    fn course(id: u64, total_lessons: u32) -> Course {
        Course {
            id: CourseId::new(id),
            title: format!("Course {id}"),
            description: String::new(),
            instructor: "Linus".into(),
            language: "C".into(),
            difficulty: Difficulty::Beginner,
            estimated_hours: 2.0,
            total_lessons,
        }
    }

    fn services() -> (ProgressStore, StatsService) {
        let store = ProgressStore::new(Arc::new(InMemoryRepository::new()));
        let catalog = FixtureCatalog::new(vec![course(1, 3), course(2, 0)]).unwrap();
        (store.clone(), StatsService::new(store, Arc::new(catalog)))
    }

    async fn record_lesson(store: &ProgressStore, course: u64, lesson: u64) {
        store
            .update_progress(move |doc| {
                let next = doc.apply(ProgressEvent::LessonCompleted {
                    course_id: CourseId::new(course),
                    lesson_id: LessonId::new(lesson),
                    at: fixed_now(),
                })?;
                Ok::<_, LedgerError>((Some(next), ()))
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn percentage_rounds_and_handles_empty_courses() {
        let (store, stats) = services();
        record_lesson(&store, 1, 1).await;
        record_lesson(&store, 1, 2).await;

        assert_eq!(stats.course_percentage(CourseId::new(1)).await.unwrap(), 67);
        assert_eq!(stats.course_percentage(CourseId::new(2)).await.unwrap(), 0);
        assert!(matches!(
            stats.course_percentage(CourseId::new(9)).await,
            Err(StatsError::CourseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn empty_store_yields_zero_stats() {
        let (_, stats) = services();
        assert_eq!(stats.get_stats().await.unwrap(), LearningStats::default());

        let summary = stats.dashboard().await.unwrap();
        assert_eq!(summary.total_courses, 2);
        assert_eq!(summary.total_lessons, 3);
        assert_eq!(summary.completed_courses, 0);
    }
}
