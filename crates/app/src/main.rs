use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use codepath_core::completion::CompletionState;
use codepath_core::model::{
    BookmarkDraft, CertificateId, CourseId, LessonId, ModuleId, QuizId, grade_quiz,
};
use serde_json::{Value, json};
use services::{AppServices, Clock, CompletionOutcome, IssuancePolicy};
use storage::catalog::{CourseCatalog, FixtureCatalog};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Value of `--db` that selects the in-memory store.
const MEMORY_DB: &str = "memory";

#[derive(Parser)]
#[command(name = "codepath")]
#[command(about = "Track course progress, bookmarks, and certificates")]
struct Cli {
    /// SQLite database URL, or `memory` for a throwaway store
    #[arg(long, env = "CODEPATH_DB_URL", default_value = "sqlite://codepath.sqlite3")]
    db: String,

    /// Course catalog fixture (JSON array of courses)
    #[arg(long, env = "CODEPATH_CATALOG", default_value = "fixtures/courses.json")]
    catalog: PathBuf,

    /// Deadline for certificate issuance, in milliseconds
    #[arg(long, env = "CODEPATH_ISSUE_TIMEOUT_MS", default_value_t = 5000)]
    issue_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List catalog courses, optionally filtered
    Courses {
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        difficulty: Option<String>,
    },
    /// Show progress for one course, or for every course
    Progress {
        #[arg(long)]
        course: Option<CourseId>,
    },
    /// Mark a lesson complete and issue the certificate if the course is finished
    Complete {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        lesson: LessonId,
    },
    /// Record a quiz score, given directly or graded from answers
    Quiz {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        quiz: QuizId,
        #[arg(long, allow_hyphen_values = true, conflicts_with = "answers")]
        score: Option<i64>,
        /// Picked option per question, `-` for a skipped question
        #[arg(long, value_delimiter = ',', requires = "key")]
        answers: Vec<String>,
        /// Correct option per question
        #[arg(long, value_delimiter = ',')]
        key: Vec<usize>,
    },
    /// Toggle the bookmark on a lesson
    Bookmark {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        module: ModuleId,
        #[arg(long)]
        lesson: LessonId,
        #[arg(long)]
        title: String,
        #[arg(long)]
        course_title: String,
    },
    /// List bookmarks in the order they were added
    Bookmarks,
    /// Learner-wide counters
    Stats,
    /// Catalog-wide summary
    Dashboard,
    /// List certificates, optionally for one course
    Certificates {
        #[arg(long)]
        course: Option<CourseId>,
    },
    /// Re-request the certificate for a completed course
    Regenerate {
        #[arg(long)]
        course: CourseId,
    },
    /// Delete a certificate by id
    Revoke {
        #[arg(long)]
        id: CertificateId,
    },
    /// Clear one course's progress, or everything (progress and bookmarks)
    Clear {
        #[arg(long)]
        course: Option<CourseId>,
    },
}

#[derive(Debug)]
enum ArgsError {
    InvalidDbUrl { raw: String },
    InvalidAnswer { raw: String },
}

impl std::fmt::Display for ArgsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidAnswer { raw } => write!(f, "invalid --answers entry: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:"
        || trimmed.starts_with("sqlite://")
        || trimmed.contains("mode=memory")
    {
        return trimmed.to_owned();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), ArgsError> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_owned(),
        });
    }

    let path = Path::new(path);
    let invalid = |_| ArgsError::InvalidDbUrl {
        raw: db_url.to_owned(),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(invalid)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(invalid)?;
    }
    Ok(())
}

fn parse_answers(raw: &[String]) -> Result<Vec<Option<usize>>, ArgsError> {
    raw.iter()
        .map(|entry| match entry.trim() {
            "-" | "" => Ok(None),
            value => value.parse().map(Some).map_err(|_| ArgsError::InvalidAnswer {
                raw: entry.clone(),
            }),
        })
        .collect()
}

async fn open_services(cli: &Cli) -> Result<AppServices, Box<dyn std::error::Error>> {
    let catalog: Arc<dyn CourseCatalog> = Arc::new(FixtureCatalog::from_path(&cli.catalog)?);
    let policy = IssuancePolicy::with_timeout(Duration::from_millis(cli.issue_timeout_ms));
    let clock = Clock::system();

    if cli.db.trim() == MEMORY_DB {
        info!("using in-memory store");
        return Ok(AppServices::in_memory(clock, policy, catalog).await?);
    }

    let db_url = normalize_sqlite_url(&cli.db);
    prepare_sqlite_file(&db_url)?;
    info!(db = %db_url, "opening sqlite store");
    Ok(AppServices::new_sqlite(&db_url, clock, policy, catalog).await?)
}

fn completion_json(outcome: CompletionOutcome) -> Value {
    match outcome {
        CompletionOutcome::InProgress { completed, total } => json!({
            "state": CompletionState::InProgress,
            "completed": completed,
            "total": total,
        }),
        CompletionOutcome::AlreadyComplete { completion_date } => json!({
            "state": CompletionState::Complete,
            "completionDate": completion_date,
        }),
        CompletionOutcome::JustCompleted {
            completion_date,
            certificate,
        } => match certificate {
            Ok(record) => json!({
                "state": CompletionState::Complete,
                "completionDate": completion_date,
                "certificate": record,
            }),
            Err(err) => json!({
                "state": CompletionState::Complete,
                "completionDate": completion_date,
                "warning": err.to_string(),
            }),
        },
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let services = open_services(&cli).await?;

    let output = match cli.command {
        Command::Courses {
            language,
            difficulty,
        } => {
            let catalog = services.catalog();
            let mut courses = match &language {
                Some(language) => catalog.get_by_language(language).await?,
                None => catalog.get_all().await?,
            };
            if let Some(difficulty) = &difficulty {
                let allowed = catalog.get_by_difficulty(difficulty).await?;
                courses.retain(|c| allowed.iter().any(|a| a.id == c.id));
            }
            json!(courses)
        }
        Command::Progress { course: Some(id) } => {
            let progress = services.ledger().get_progress(id).await?;
            json!({
                "progress": progress,
                "state": CompletionState::of(&progress),
                "percent": services.stats().course_percentage(id).await.ok(),
            })
        }
        Command::Progress { course: None } => json!(services.ledger().get_all_progress().await?),
        Command::Complete { course, lesson } => {
            let report = services.completion().complete_lesson(course, lesson).await?;
            json!({
                "progress": report.progress,
                "completion": completion_json(report.outcome),
            })
        }
        Command::Quiz {
            course,
            quiz,
            score,
            answers,
            key,
        } => {
            let score = match score {
                Some(score) => score,
                None => {
                    let graded = grade_quiz(&parse_answers(&answers)?, &key)
                        .map_err(codepath_core::Error::from)?;
                    i64::from(graded.value())
                }
            };
            json!(services.ledger().record_quiz_score(course, quiz, score).await?)
        }
        Command::Bookmark {
            course,
            module,
            lesson,
            title,
            course_title,
        } => {
            let result = services
                .bookmarks()
                .toggle_bookmark(BookmarkDraft {
                    course_id: course,
                    module_id: module,
                    lesson_id: lesson,
                    title,
                    course_title,
                })
                .await?;
            json!({
                "bookmarked": result.toggle.is_bookmarked(),
                "bookmarks": result.bookmarks,
            })
        }
        Command::Bookmarks => json!(services.bookmarks().get_bookmarks().await?),
        Command::Stats => json!(services.stats().get_stats().await?),
        Command::Dashboard => json!(services.stats().dashboard().await?),
        Command::Certificates { course: Some(id) } => {
            json!(services.certificates().list_by_course(id).await?)
        }
        Command::Certificates { course: None } => json!(services.certificates().list().await?),
        Command::Regenerate { course } => {
            json!(services.completion().regenerate_certificate(course).await?)
        }
        Command::Revoke { id } => {
            services.certificates().delete(id).await?;
            json!({ "deleted": id })
        }
        Command::Clear { course: Some(id) } => {
            json!({ "cleared": services.ledger().clear_progress(id).await? })
        }
        Command::Clear { course: None } => {
            services.ledger().clear_all_progress().await?;
            json!({ "cleared": true })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
