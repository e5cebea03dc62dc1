use thiserror::Error;

use crate::model::progress::QuizScore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizGradeError {
    #[error("quiz has no questions")]
    NoQuestions,

    #[error("expected {expected} answers, got {actual}")]
    AnswerCountMismatch { expected: usize, actual: usize },
}

/// Grade a submitted quiz.
///
/// `selected[i]` is the option picked for question `i` (`None` if skipped) and
/// `correct[i]` is its right option. The score is the share of correct answers,
/// rounded half up to a whole percent.
///
/// # Errors
///
/// Returns `QuizGradeError::NoQuestions` for an empty quiz and
/// `QuizGradeError::AnswerCountMismatch` if the slices differ in length.
pub fn grade_quiz(selected: &[Option<usize>], correct: &[usize]) -> Result<QuizScore, QuizGradeError> {
    if correct.is_empty() {
        return Err(QuizGradeError::NoQuestions);
    }
    if selected.len() != correct.len() {
        return Err(QuizGradeError::AnswerCountMismatch {
            expected: correct.len(),
            actual: selected.len(),
        });
    }

    let right = selected
        .iter()
        .zip(correct)
        .filter(|(picked, answer)| **picked == Some(**answer))
        .count();

    let percent = rounded_percent(right as u64, correct.len() as u64);
    Ok(QuizScore::from_percent(percent))
}

/// `round(part / whole * 100)` with halves rounded up; 0 when `whole` is 0.
#[must_use]
pub fn rounded_percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let scaled = (part.saturating_mul(200) + whole) / (whole * 2);
    u8::try_from(scaled.min(100)).unwrap_or(100)
}
