//! Course catalog backed by a static JSON fixture.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use codepath_core::model::{CatalogError, Course, CourseId, Difficulty};
use thiserror::Error;

use crate::repository::StorageError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogLoadError {
    #[error("failed to read catalog fixture: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse catalog fixture: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] CatalogError),
}

/// Read access to course metadata.
#[async_trait]
pub trait CourseCatalog: Send + Sync {
    /// All courses in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog backend is unavailable.
    async fn get_all(&self) -> Result<Vec<Course>, StorageError>;

    /// Look up one course. Unknown ids are `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog backend is unavailable.
    async fn get_by_id(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// Courses whose language matches, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog backend is unavailable.
    async fn get_by_language(&self, language: &str) -> Result<Vec<Course>, StorageError> {
        let mut courses = self.get_all().await?;
        courses.retain(|c| c.language.eq_ignore_ascii_case(language.trim()));
        Ok(courses)
    }

    /// Courses at the given difficulty, ignoring case. Unknown tiers match nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog backend is unavailable.
    async fn get_by_difficulty(&self, difficulty: &str) -> Result<Vec<Course>, StorageError> {
        let Some(wanted) = Difficulty::parse_loose(difficulty) else {
            return Ok(Vec::new());
        };
        let mut courses = self.get_all().await?;
        courses.retain(|c| c.difficulty == wanted);
        Ok(courses)
    }
}

/// Immutable catalog loaded once from a fixture.
#[derive(Debug, Clone, Default)]
pub struct FixtureCatalog {
    courses: Vec<Course>,
}

impl FixtureCatalog {
    /// Build a catalog from already-parsed courses.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a course is invalid or an id repeats.
    pub fn new(courses: Vec<Course>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(courses.len());
        for course in &courses {
            course.validate()?;
            if !seen.insert(course.id) {
                return Err(CatalogError::DuplicateCourse(course.id));
            }
        }
        Ok(Self { courses })
    }

    /// Parse a JSON array of courses.
    ///
    /// # Errors
    ///
    /// Returns `CatalogLoadError` if the JSON is malformed or a course is invalid.
    pub fn from_json_str(json: &str) -> Result<Self, CatalogLoadError> {
        let courses: Vec<Course> = serde_json::from_str(json)?;
        Ok(Self::new(courses)?)
    }

    /// Read and parse a fixture file.
    ///
    /// # Errors
    ///
    /// Returns `CatalogLoadError` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogLoadError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }
}

#[async_trait]
impl CourseCatalog for FixtureCatalog {
    async fn get_all(&self) -> Result<Vec<Course>, StorageError> {
        Ok(self.courses.clone())
    }

    async fn get_by_id(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        Ok(self.courses.iter().find(|c| c.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"[
        {"Id": 1, "title": "Python Foundations", "description": "Start here", "instructor": "Guido",
         "language": "Python", "difficulty": "Beginner", "estimatedHours": 10, "totalLessons": 12},
        {"Id": 2, "title": "Async Rust", "instructor": "Ferris",
         "language": "Rust", "difficulty": "Advanced", "estimatedHours": 7.5, "totalLessons": 3}
    ]"#;

    #[tokio::test]
    async fn loads_fixture_and_filters() {
        let catalog = FixtureCatalog::from_json_str(FIXTURE).unwrap();
        assert_eq!(catalog.len(), 2);

        let rust = catalog.get_by_language("rust").await.unwrap();
        assert_eq!(rust.len(), 1);
        assert_eq!(rust[0].total_lessons, 3);
        assert!(rust[0].description.is_empty());

        let beginners = catalog.get_by_difficulty("BEGINNER").await.unwrap();
        assert_eq!(beginners[0].id, CourseId::new(1));
        assert!(catalog.get_by_difficulty("expert").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_id_is_none() {
        let catalog = FixtureCatalog::from_json_str(FIXTURE).unwrap();
        assert!(catalog.get_by_id(CourseId::new(99)).await.unwrap().is_none());
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r#"[
            {"Id": 1, "title": "A", "instructor": "x", "language": "Go", "difficulty": "Beginner", "estimatedHours": 1, "totalLessons": 1},
            {"Id": 1, "title": "B", "instructor": "y", "language": "Go", "difficulty": "Beginner", "estimatedHours": 1, "totalLessons": 1}
        ]"#;
        let err = FixtureCatalog::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            CatalogLoadError::Invalid(CatalogError::DuplicateCourse(_))
        ));
    }
}
