use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::course::{Course, Difficulty};
use crate::model::ids::{CertificateId, CourseId, UserId};

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// A certificate that has not been persisted yet.
///
/// Course metadata is copied at issuance so the certificate stays valid even if the
/// catalog entry later changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateDraft {
    pub course_id: CourseId,
    pub user_id: UserId,
    pub course_name: String,
    pub course_description: String,
    pub instructor: String,
    pub completion_date: DateTime<Utc>,
    pub issue_date: DateTime<Utc>,
    pub certificate_number: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub duration_hours: f32,
}

impl CertificateDraft {
    /// Snapshot `course` into a certificate for `user_id`.
    #[must_use]
    pub fn snapshot(
        course: &Course,
        user_id: UserId,
        completion_date: DateTime<Utc>,
        issue_date: DateTime<Utc>,
    ) -> Self {
        Self {
            course_id: course.id,
            user_id,
            course_name: course.title.clone(),
            course_description: course.description.clone(),
            instructor: course.instructor.clone(),
            completion_date,
            issue_date,
            certificate_number: certificate_number(course.id, issue_date),
            language: course.language.clone(),
            difficulty: course.difficulty,
            duration_hours: course.estimated_hours,
        }
    }

    #[must_use]
    pub fn assign_id(self, id: CertificateId) -> CertificateRecord {
        CertificateRecord {
            id,
            course_id: self.course_id,
            user_id: self.user_id,
            course_name: self.course_name,
            course_description: self.course_description,
            instructor: self.instructor,
            completion_date: self.completion_date,
            issue_date: self.issue_date,
            certificate_number: self.certificate_number,
            language: self.language,
            difficulty: self.difficulty,
            duration_hours: self.duration_hours,
        }
    }
}

/// `CERT-<issue millis>-<course id>`; unique because a (course, user) pair holds at most
/// one certificate.
#[must_use]
pub fn certificate_number(course_id: CourseId, issued_at: DateTime<Utc>) -> String {
    format!("CERT-{}-{}", issued_at.timestamp_millis(), course_id)
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// An issued certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateRecord {
    #[serde(rename = "Id")]
    pub id: CertificateId,
    pub course_id: CourseId,
    pub user_id: UserId,
    pub course_name: String,
    pub course_description: String,
    pub instructor: String,
    pub completion_date: DateTime<Utc>,
    pub issue_date: DateTime<Utc>,
    pub certificate_number: String,
    pub language: String,
    pub difficulty: Difficulty,
    #[serde(rename = "duration")]
    pub duration_hours: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::LOCAL_USER;
    use crate::time::fixed_now;

    #[test]
    fn snapshot_copies_course_metadata() {
        let course = Course {
            id: CourseId::new(3),
            title: "Rust Basics".into(),
            description: "Ownership and borrowing".into(),
            instructor: "Ferris".into(),
            language: "Rust".into(),
            difficulty: Difficulty::Beginner,
            estimated_hours: 12.5,
            total_lessons: 8,
        };
        let now = fixed_now();

        let record = CertificateDraft::snapshot(&course, LOCAL_USER, now, now)
            .assign_id(CertificateId::new(1));

        assert_eq!(record.course_name, "Rust Basics");
        assert_eq!(record.instructor, "Ferris");
        assert_eq!(record.certificate_number, "CERT-1700000000000-3");
        assert!((record.duration_hours - 12.5).abs() < f32::EPSILON);
    }
}
