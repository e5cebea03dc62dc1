mod bookmark;
mod certificate;
mod course;
mod ids;
pub(crate) mod progress;
pub mod quiz;

pub use bookmark::{Bookmark, BookmarkDraft, BookmarkToggle};
pub use certificate::{CertificateDraft, CertificateRecord, certificate_number};
pub use course::{CatalogError, Course, Difficulty};
pub use ids::{
    CertificateId, CourseId, LOCAL_USER, LessonId, ModuleId, ParseIdError, QuizId, UserId,
};
pub use progress::{CourseProgress, LastAccessed, ProgressError, QuizScore};
pub use quiz::{QuizGradeError, grade_quiz};
