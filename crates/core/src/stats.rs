//! Read-only projections over the progress and bookmark documents.

use serde::Serialize;

use crate::completion::lessons_satisfy;
use crate::ledger::{BookmarkDocument, ProgressDocument};
use crate::model::Course;

/// Learner-wide counters shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub courses_started: usize,
    pub total_lessons_completed: usize,
    pub total_quizzes_taken: usize,
    pub average_quiz_score: u32,
    pub bookmarks_count: usize,
}

impl LearningStats {
    #[must_use]
    pub fn compute(progress: &ProgressDocument, bookmarks: &BookmarkDocument) -> Self {
        let mut total_lessons_completed = 0_usize;
        let mut total_quizzes_taken = 0_usize;
        let mut score_sum = 0_u64;

        for (_, course) in progress.iter() {
            total_lessons_completed += course.completed_count();
            total_quizzes_taken += course.quiz_scores().len();
            score_sum += course
                .quiz_scores()
                .values()
                .map(|score| u64::from(score.value()))
                .sum::<u64>();
        }

        Self {
            courses_started: progress.len(),
            total_lessons_completed,
            total_quizzes_taken,
            average_quiz_score: rounded_mean(score_sum, total_quizzes_taken as u64),
            bookmarks_count: bookmarks.len(),
        }
    }
}

/// Catalog-wide progress summary.
///
/// Unlike [`LearningStats`], totals here are driven by the catalog: courses with no
/// progress still contribute their lesson count, and progress for courses missing
/// from the catalog is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_courses: usize,
    pub completed_courses: usize,
    pub total_lessons: u64,
    pub completed_lessons: usize,
    pub average_score: u32,
}

impl DashboardSummary {
    #[must_use]
    pub fn compute(courses: &[Course], progress: &ProgressDocument) -> Self {
        let mut summary = Self {
            total_courses: courses.len(),
            ..Self::default()
        };
        let mut score_sum = 0_u64;
        let mut quiz_count = 0_u64;

        for course in courses {
            summary.total_lessons += u64::from(course.total_lessons);
            let Some(record) = progress.get(course.id) else {
                continue;
            };
            summary.completed_lessons += record.completed_count();
            if record.is_complete() || lessons_satisfy(record.completed_count(), course.total_lessons)
            {
                summary.completed_courses += 1;
            }
            for score in record.quiz_scores().values() {
                score_sum += u64::from(score.value());
                quiz_count += 1;
            }
        }

        summary.average_score = rounded_mean(score_sum, quiz_count);
        summary
    }
}

/// `round(sum / count)` with halves rounded up; 0 for an empty set.
fn rounded_mean(sum: u64, count: u64) -> u32 {
    if count == 0 {
        return 0;
    }
    u32::try_from((sum * 2 + count) / (count * 2)).unwrap_or(u32::MAX)
}
