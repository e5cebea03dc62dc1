use serde::{Deserialize, Serialize};

use crate::model::CourseProgress;
use crate::model::quiz::rounded_percent;

/// Per-course completion state. `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CompletionState {
    InProgress,
    Complete,
}

impl CompletionState {
    /// State as recorded in the ledger: complete once a completion date exists.
    #[must_use]
    pub fn of(progress: &CourseProgress) -> Self {
        if progress.is_complete() {
            Self::Complete
        } else {
            Self::InProgress
        }
    }
}

/// Whether `completed` lessons satisfy a course of `total_lessons`.
///
/// A course with zero lessons counts as satisfied only once at least one explicit
/// completion has been recorded, so an empty course never completes on its own.
#[must_use]
pub fn lessons_satisfy(completed: usize, total_lessons: u32) -> bool {
    completed > 0 && completed as u64 >= u64::from(total_lessons)
}

/// Decide whether the record should transition to `Complete` right now.
///
/// True only while the record is still in progress and the lesson count has
/// reached the course total; a stamped record never transitions again.
#[must_use]
pub fn should_transition(progress: &CourseProgress, total_lessons: u32) -> bool {
    !progress.is_complete() && lessons_satisfy(progress.completed_count(), total_lessons)
}

/// Course progress as a whole percent, rounded half up and clamped to 100.
///
/// Returns 0 for a course with no lessons.
#[must_use]
pub fn course_percentage(completed: usize, total_lessons: u32) -> u8 {
    rounded_percent(completed as u64, u64::from(total_lessons))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LessonId;
    use crate::time::fixed_now;

    #[test]
    fn transitions_when_all_lessons_done() {
        let now = fixed_now();
        let mut progress = CourseProgress::new(now);
        progress.mark_lesson_complete(LessonId::new(1), now);
        progress.mark_lesson_complete(LessonId::new(2), now);
        assert!(!should_transition(&progress, 3));

        progress.mark_lesson_complete(LessonId::new(3), now);
        assert!(should_transition(&progress, 3));

        progress.stamp_completion(now);
        assert!(!should_transition(&progress, 3));
        assert_eq!(CompletionState::of(&progress), CompletionState::Complete);
    }

    #[test]
    fn zero_lesson_course_needs_an_explicit_event() {
        assert!(!lessons_satisfy(0, 0));
        assert!(lessons_satisfy(1, 0));
    }

    #[test]
    fn percentage_guards_zero_and_clamps() {
        assert_eq!(course_percentage(0, 0), 0);
        assert_eq!(course_percentage(1, 3), 33);
        assert_eq!(course_percentage(2, 3), 67);
        assert_eq!(course_percentage(5, 4), 100);
    }
}
