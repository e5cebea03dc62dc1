use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a numeric identifier newtype.
///
/// Identifiers are plain `u64`s on the wire (`Serialize` as a bare number, and as
/// a stringified key when used in a JSON map). Zero is representable but never a
/// valid identity; operations reject it through `is_positive`.
macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }

            /// Returns true for every identifier except zero.
            #[must_use]
            pub fn is_positive(&self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<u64>().map(Self::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

numeric_id!(
    /// Catalog identity of a course.
    CourseId
);
numeric_id!(
    /// Identity of a module inside a course.
    ModuleId
);
numeric_id!(
    /// Identity of a single lesson.
    LessonId
);
numeric_id!(
    /// Identity of a quiz (one quiz per module).
    QuizId
);
numeric_id!(
    /// Identity of an issued certificate.
    CertificateId
);
numeric_id!(
    /// Owner of progress and certificates.
    UserId
);

/// The application is single-user; every certificate is issued to this id.
pub const LOCAL_USER: UserId = UserId::new(1);

/// Error type for parsing an identifier from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_id_display_and_parse() {
        let id: CourseId = " 42 ".parse().unwrap();
        assert_eq!(id, CourseId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{id:?}"), "CourseId(42)");
    }

    #[test]
    fn lesson_id_rejects_garbage() {
        let err = "lesson-7".parse::<LessonId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse LessonId from string");
    }

    #[test]
    fn zero_is_not_positive() {
        assert!(!QuizId::new(0).is_positive());
        assert!(ModuleId::new(3).is_positive());
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let json = serde_json::to_string(&LessonId::new(5)).unwrap();
        assert_eq!(json, "5");
        let back: LessonId = serde_json::from_str("5").unwrap();
        assert_eq!(back, LessonId::new(5));
    }
}
