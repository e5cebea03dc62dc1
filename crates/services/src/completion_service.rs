//! Course completion and the certificate issued on it.
//!
//! The completion date is written in the same save as the lesson that reaches the
//! course total, before any certificate is requested. Issuance then runs outside the
//! write gate with a deadline; its failure is reported next to the completion and
//! never rolls it back.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use codepath_core::completion::should_transition;
use codepath_core::ledger::{ProgressDocument, ProgressEvent};
use codepath_core::model::{CertificateRecord, CourseId, CourseProgress, LessonId};
use storage::catalog::CourseCatalog;
use storage::repository::StorageError;
use tracing::{debug, info, warn};

use crate::Clock;
use crate::certificate_service::CertificateIssuer;
use crate::error::{CompletionError, IssuanceError, LedgerError};
use crate::progress_store::ProgressStore;

/// Deadline applied to every certificate request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuancePolicy {
    pub timeout: Duration,
}

impl IssuancePolicy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// What a completion check found.
#[derive(Debug)]
pub enum CompletionOutcome {
    /// The course still has lessons left.
    InProgress { completed: usize, total: u32 },
    /// The course was already complete; nothing was issued.
    AlreadyComplete { completion_date: DateTime<Utc> },
    /// This call completed the course. `certificate` carries the issuance result; an
    /// error here is a warning, the completion itself is saved.
    JustCompleted {
        completion_date: DateTime<Utc>,
        certificate: Result<CertificateRecord, IssuanceError>,
    },
}

impl CompletionOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !matches!(self, Self::InProgress { .. })
    }
}

#[derive(Debug)]
pub struct CompletionReport {
    pub progress: CourseProgress,
    pub outcome: CompletionOutcome,
}

/// Drives the IN_PROGRESS -> COMPLETE transition for each course.
#[derive(Clone)]
pub struct CompletionEvaluator {
    clock: Clock,
    policy: IssuancePolicy,
    store: ProgressStore,
    catalog: Arc<dyn CourseCatalog>,
    issuer: Arc<dyn CertificateIssuer>,
}

// Result of one gated cycle, before issuance.
enum Transition {
    Pending { completed: usize, total: u32 },
    Already(DateTime<Utc>),
    Stamped(DateTime<Utc>),
}

impl CompletionEvaluator {
    #[must_use]
    pub fn new(
        clock: Clock,
        policy: IssuancePolicy,
        store: ProgressStore,
        catalog: Arc<dyn CourseCatalog>,
        issuer: Arc<dyn CertificateIssuer>,
    ) -> Self {
        Self {
            clock,
            policy,
            store,
            catalog,
            issuer,
        }
    }

    /// Mark a lesson complete and, if that finishes the course, stamp the
    /// completion and request its certificate.
    ///
    /// The course is looked up before anything is written, so an unknown course
    /// leaves the ledger untouched.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::CourseNotFound` if the catalog has no such course.
    /// Returns `CompletionError::Ledger` for invalid ids or storage failures.
    pub async fn complete_lesson(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<CompletionReport, CompletionError> {
        let total = self.total_lessons(course_id).await?;
        let at = self.clock.now();
        let (progress, transition) = self
            .store
            .update_progress(move |doc| {
                let doc = doc.apply(ProgressEvent::LessonCompleted {
                    course_id,
                    lesson_id,
                    at,
                })?;
                let (doc, progress, transition) = stamp_if_due(doc, course_id, total, at)?;
                Ok::<_, LedgerError>((Some(doc), (progress, transition)))
            })
            .await?;
        debug!(
            course_id = course_id.value(),
            lesson_id = lesson_id.value(),
            completed = progress.completed_count(),
            total,
            "lesson marked complete"
        );
        self.finish(course_id, progress, transition).await
    }

    /// Re-check a course against the catalog without recording a lesson.
    ///
    /// Storage is written only when this call stamps the completion.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::CourseNotFound` if the catalog has no such course.
    /// Returns `CompletionError::Ledger` if the ledger cannot be read or saved.
    pub async fn evaluate(&self, course_id: CourseId) -> Result<CompletionReport, CompletionError> {
        let total = self.total_lessons(course_id).await?;
        let at = self.clock.now();
        let (progress, transition) = self
            .store
            .update_progress(move |doc| {
                if doc.get(course_id).is_none() {
                    let fresh = doc.get_or_default(course_id, at);
                    return Ok((
                        None,
                        (fresh, Transition::Pending { completed: 0, total }),
                    ));
                }
                let (doc, progress, transition) = stamp_if_due(doc, course_id, total, at)?;
                let write = matches!(transition, Transition::Stamped(_)).then_some(doc);
                Ok::<_, LedgerError>((write, (progress, transition)))
            })
            .await?;
        self.finish(course_id, progress, transition).await
    }

    /// Request the certificate again for a course that is already complete.
    ///
    /// Returns the existing certificate when one was issued before.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::NotComplete` if the course has no completion date.
    /// Returns `CompletionError::Issuance` if issuance fails or times out.
    pub async fn regenerate_certificate(
        &self,
        course_id: CourseId,
    ) -> Result<CertificateRecord, CompletionError> {
        let doc = self.store.progress().await?;
        let completion_date = doc
            .get(course_id)
            .and_then(CourseProgress::completion_date)
            .ok_or(CompletionError::NotComplete(course_id))?;
        let record = self.issue(course_id, completion_date).await?;
        Ok(record)
    }

    async fn total_lessons(&self, course_id: CourseId) -> Result<u32, CompletionError> {
        let course = self
            .catalog
            .get_by_id(course_id)
            .await?
            .ok_or(CompletionError::CourseNotFound(course_id))?;
        Ok(course.total_lessons)
    }

    async fn finish(
        &self,
        course_id: CourseId,
        progress: CourseProgress,
        transition: Transition,
    ) -> Result<CompletionReport, CompletionError> {
        let outcome = match transition {
            Transition::Pending { completed, total } => {
                CompletionOutcome::InProgress { completed, total }
            }
            Transition::Already(completion_date) => {
                CompletionOutcome::AlreadyComplete { completion_date }
            }
            Transition::Stamped(completion_date) => {
                info!(
                    course_id = course_id.value(),
                    completion_date = %completion_date,
                    "course completed"
                );
                let certificate = self.issue(course_id, completion_date).await;
                if let Err(err) = &certificate {
                    warn!(
                        course_id = course_id.value(),
                        error = %err,
                        "certificate issuance failed; completion kept"
                    );
                }
                CompletionOutcome::JustCompleted {
                    completion_date,
                    certificate,
                }
            }
        };
        Ok(CompletionReport { progress, outcome })
    }

    /// Issue on a separate task so a missed deadline does not abort an insert that
    /// is already under way.
    async fn issue(
        &self,
        course_id: CourseId,
        completion_date: DateTime<Utc>,
    ) -> Result<CertificateRecord, IssuanceError> {
        let issuer = Arc::clone(&self.issuer);
        let task = tokio::spawn(async move { issuer.issue(course_id, completion_date).await });
        match tokio::time::timeout(self.policy.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(IssuanceError::Failed(join.to_string())),
            Err(_) => Err(IssuanceError::Timeout(self.policy.timeout)),
        }
    }
}

/// The document, the course record, and whether this call stamped the completion.
/// The reported completion date is the stored one, which may differ from `at`.
fn stamp_if_due(
    doc: ProgressDocument,
    course_id: CourseId,
    total: u32,
    at: DateTime<Utc>,
) -> Result<(ProgressDocument, CourseProgress, Transition), LedgerError> {
    let current = doc
        .get(course_id)
        .cloned()
        .ok_or(StorageError::NotFound)?;
    if let Some(date) = current.completion_date() {
        return Ok((doc, current, Transition::Already(date)));
    }
    if !should_transition(&current, total) {
        let pending = Transition::Pending {
            completed: current.completed_count(),
            total,
        };
        return Ok((doc, current, pending));
    }
    let doc = doc.apply(ProgressEvent::CompletionReached { course_id, at })?;
    let stamped = doc
        .get(course_id)
        .cloned()
        .ok_or(StorageError::NotFound)?;
    let date = stamped.completion_date().unwrap_or(at);
    Ok((doc, stamped, Transition::Stamped(date)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codepath_core::model::{CertificateDraft, CertificateId, Course, Difficulty, LOCAL_USER};
    use codepath_core::time::{fixed_clock, fixed_now};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::catalog::FixtureCatalog;
    use storage::repository::{DocumentKey, DocumentStore, InMemoryRepository};

    struct CountingIssuer {
        calls: AtomicUsize,
        course: Course,
    }

    #[async_trait]
    impl CertificateIssuer for CountingIssuer {
        async fn issue(
            &self,
            _course_id: CourseId,
            completion_date: DateTime<Utc>,
        ) -> Result<CertificateRecord, IssuanceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as u64;
            Ok(
                CertificateDraft::snapshot(&self.course, LOCAL_USER, completion_date, fixed_now())
                    .assign_id(CertificateId::new(n + 1)),
            )
        }
    }

    fn course(total_lessons: u32) -> Course {
        Course {
            id: CourseId::new(1),
            title: "Haskell Types".into(),
            description: String::new(),
            instructor: "Simon".into(),
            language: "Haskell".into(),
            difficulty: Difficulty::Advanced,
            estimated_hours: 9.0,
            total_lessons,
        }
    }

    /// Counts document writes on top of the in-memory store.
    #[derive(Default)]
    struct CountingWrites {
        inner: InMemoryRepository,
        writes: AtomicUsize,
    }

    impl CountingWrites {
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for CountingWrites {
        async fn read_document(&self, key: DocumentKey) -> Result<Option<String>, StorageError> {
            self.inner.read_document(key).await
        }

        async fn write_document(&self, key: DocumentKey, body: &str) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write_document(key, body).await
        }

        async fn write_documents(
            &self,
            docs: &[(DocumentKey, String)],
        ) -> Result<(), StorageError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write_documents(docs).await
        }
    }

    fn evaluator_over(
        total_lessons: u32,
        documents: Arc<dyn DocumentStore>,
    ) -> (CompletionEvaluator, Arc<CountingIssuer>) {
        let issuer = Arc::new(CountingIssuer {
            calls: AtomicUsize::new(0),
            course: course(total_lessons),
        });
        let catalog = FixtureCatalog::new(vec![course(total_lessons)]).unwrap();
        let evaluator = CompletionEvaluator::new(
            fixed_clock(),
            IssuancePolicy::default(),
            ProgressStore::new(documents),
            Arc::new(catalog),
            issuer.clone(),
        );
        (evaluator, issuer)
    }

    fn evaluator(total_lessons: u32) -> (CompletionEvaluator, Arc<CountingIssuer>) {
        evaluator_over(total_lessons, Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn last_lesson_stamps_and_issues_once() {
        let (evaluator, issuer) = evaluator(2);
        let first = evaluator
            .complete_lesson(CourseId::new(1), LessonId::new(1))
            .await
            .unwrap();
        assert!(matches!(
            first.outcome,
            CompletionOutcome::InProgress {
                completed: 1,
                total: 2
            }
        ));

        let second = evaluator
            .complete_lesson(CourseId::new(1), LessonId::new(2))
            .await
            .unwrap();
        assert_eq!(second.progress.completion_date(), Some(fixed_now()));
        assert!(matches!(
            second.outcome,
            CompletionOutcome::JustCompleted {
                certificate: Ok(_),
                ..
            }
        ));

        let again = evaluator
            .complete_lesson(CourseId::new(1), LessonId::new(1))
            .await
            .unwrap();
        assert!(matches!(again.outcome, CompletionOutcome::AlreadyComplete { .. }));
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_course_writes_nothing() {
        let (evaluator, _) = evaluator(2);
        let err = evaluator
            .complete_lesson(CourseId::new(8), LessonId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::CourseNotFound(_)));
        assert!(evaluator.store.progress().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_course_never_completes_without_a_lesson() {
        let (evaluator, issuer) = evaluator(0);
        let report = evaluator.evaluate(CourseId::new(1)).await.unwrap();
        assert!(!report.outcome.is_complete());
        assert!(evaluator.store.progress().await.unwrap().is_empty());

        let report = evaluator
            .complete_lesson(CourseId::new(1), LessonId::new(1))
            .await
            .unwrap();
        assert!(report.outcome.is_complete());
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn evaluate_writes_only_when_it_stamps() {
        let documents = Arc::new(CountingWrites::default());
        let (evaluator, issuer) = evaluator_over(2, documents.clone());
        let course_id = CourseId::new(1);

        evaluator
            .complete_lesson(course_id, LessonId::new(1))
            .await
            .unwrap();
        assert_eq!(documents.writes(), 1);

        let pending = evaluator.evaluate(course_id).await.unwrap();
        assert!(!pending.outcome.is_complete());
        assert_eq!(documents.writes(), 1);

        // second lesson recorded behind the evaluator's back
        evaluator
            .store
            .update_progress(move |doc| {
                let next = doc.apply(ProgressEvent::LessonCompleted {
                    course_id,
                    lesson_id: LessonId::new(2),
                    at: fixed_now(),
                })?;
                Ok::<_, LedgerError>((Some(next), ()))
            })
            .await
            .unwrap();
        assert_eq!(documents.writes(), 2);

        let stamped = evaluator.evaluate(course_id).await.unwrap();
        assert!(matches!(
            stamped.outcome,
            CompletionOutcome::JustCompleted { .. }
        ));
        assert_eq!(documents.writes(), 3);

        let already = evaluator.evaluate(course_id).await.unwrap();
        assert!(matches!(
            already.outcome,
            CompletionOutcome::AlreadyComplete { .. }
        ));
        assert_eq!(documents.writes(), 3);
        assert_eq!(issuer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn regenerate_requires_completion() {
        let (evaluator, _) = evaluator(3);
        let err = evaluator
            .regenerate_certificate(CourseId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::NotComplete(_)));
    }
}
