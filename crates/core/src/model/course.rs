use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::CourseId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course {0} has an empty title")]
    EmptyTitle(CourseId),

    #[error("course id must be positive")]
    InvalidCourseId,

    #[error("course {0} appears more than once in the catalog")]
    DuplicateCourse(CourseId),
}

/// Difficulty tier shown on catalog cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }

    /// Case-insensitive lookup used by catalog filters.
    #[must_use]
    pub fn parse_loose(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog metadata for a course, as read from the course fixture.
///
/// Field names follow the fixture (`Id`, `estimatedHours`, `totalLessons`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "Id")]
    pub id: CourseId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub instructor: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub estimated_hours: f32,
    pub total_lessons: u32,
}

impl Course {
    /// # Errors
    ///
    /// Returns `CatalogError` if the id is zero or the title is blank.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if !self.id.is_positive() {
            return Err(CatalogError::InvalidCourseId);
        }
        if self.title.trim().is_empty() {
            return Err(CatalogError::EmptyTitle(self.id));
        }
        Ok(())
    }
}
