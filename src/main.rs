use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;

mod curriculum;
mod db;
mod game;
mod level;
mod models;
mod progress;
mod report;
mod store;
mod tracker;

use crate::db::PgEventStore;
use crate::models::{AssignmentEvent, AssignmentStatus, LessonEvent};
use crate::tracker::ProgressTracker;

#[derive(Parser)]
#[command(name = "edumath-progress")]
#[command(about = "Student progress, streaks and levels for EduMath GH", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportKind {
    Lessons,
    Assignments,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import lesson or assignment events from a CSV file
    Import {
        #[arg(long, value_enum)]
        kind: ImportKind,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print the progress summary for a student
    Summary {
        #[arg(long)]
        email: String,
        /// Evaluate as of this UTC date instead of today
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown progress report
    Report {
        #[arg(long)]
        email: String,
        #[arg(long)]
        today: Option<NaiveDate>,
        #[arg(long, default_value = "progress-report.md")]
        out: PathBuf,
    },
    /// Record a lesson attempt
    RecordLesson {
        #[arg(long)]
        email: String,
        #[arg(long)]
        lesson_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        score: Option<u8>,
        #[arg(long, default_value_t = 0)]
        minutes: u32,
        #[arg(long)]
        completed: bool,
    },
    /// Record an assignment status change
    RecordAssignment {
        #[arg(long)]
        email: String,
        #[arg(long)]
        assignment_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        status: AssignmentStatus,
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        score: Option<u8>,
        #[arg(long, default_value_t = 0)]
        minutes: u32,
    },
    /// Play a primary lesson game with a list of answers and record the result
    Play {
        #[arg(long)]
        email: String,
        #[arg(long)]
        game: String,
        #[arg(long, value_delimiter = ',', required = true)]
        answers: Vec<String>,
        #[arg(long, default_value_t = 5)]
        minutes: u32,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_now(today: Option<NaiveDate>) -> anyhow::Result<DateTime<Utc>> {
    match today {
        Some(date) => Ok(date
            .and_hms_opt(12, 0, 0)
            .context("invalid evaluation date")?
            .and_utc()),
        None => Ok(Utc::now()),
    }
}

async fn load_tracker(
    pool: &sqlx::PgPool,
    email: &str,
) -> anyhow::Result<(models::StudentRecord, ProgressTracker<PgEventStore>)> {
    let student = db::find_student(pool, email).await?;
    let mut tracker = ProgressTracker::new(
        PgEventStore::new(pool.clone()),
        student.id,
        student.grade.clone(),
    );
    tracker.refresh().await?;
    Ok((student, tracker))
}

fn next_attempt(tracker: &ProgressTracker<PgEventStore>, lesson_id: &str) -> u32 {
    tracker
        .lessons()
        .iter()
        .find(|lesson| lesson.lesson_id == lesson_id)
        .map(|lesson| lesson.attempts + 1)
        .unwrap_or(1)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;
    let max_connections = match std::env::var("DATABASE_MAX_CONNECTIONS") {
        Ok(value) => value
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
        Err(_) => 5,
    };

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool, Utc::now()).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { kind, csv } => {
            let (inserted, label) = match kind {
                ImportKind::Lessons => (db::import_lessons_csv(&pool, &csv).await?, "lesson"),
                ImportKind::Assignments => {
                    (db::import_assignments_csv(&pool, &csv).await?, "assignment")
                }
            };
            println!("Imported {inserted} {label} events from {}.", csv.display());
        }
        Commands::Summary { email, today, json } => {
            let now = resolve_now(today)?;
            let (student, tracker) = load_tracker(&pool, &email).await?;
            let summary = tracker.summary(now);

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }

            println!("{} ({}, {})", student.full_name, student.email, student.grade);
            println!(
                "- {} of {} lessons completed, average score {:.0}",
                summary.completed_lessons, summary.total_lessons, summary.average_score
            );
            println!(
                "- {} ({} points, {} at {})",
                summary.current_level,
                summary.current_points,
                summary.next_level,
                summary.points_to_next_level
            );
            println!(
                "- streak {} days, {} minutes studied",
                summary.study_streak_days, summary.total_study_time_minutes
            );
            for subject in summary.subject_progress.iter() {
                println!(
                    "- {}: {}% ({}/{})",
                    subject.name, subject.progress, subject.completed, subject.lessons
                );
            }
        }
        Commands::Report { email, today, out } => {
            let now = resolve_now(today)?;
            let (student, tracker) = load_tracker(&pool, &email).await?;
            let summary = tracker.summary(now);
            let report =
                report::build_report(&student, now.date_naive(), &summary, tracker.assignments());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::RecordLesson {
            email,
            lesson_id,
            title,
            subject,
            score,
            minutes,
            completed,
        } => {
            let now = Utc::now();
            let (_, mut tracker) = load_tracker(&pool, &email).await?;
            let attempts = next_attempt(&tracker, &lesson_id);
            tracker
                .record_lesson(LessonEvent {
                    lesson_id,
                    lesson_title: title,
                    subject,
                    completed,
                    score,
                    time_spent_minutes: minutes,
                    completed_at: completed.then_some(now),
                    attempts,
                })
                .await?;

            let summary = tracker.summary(now);
            println!(
                "Lesson recorded. {} with {} points, streak {} days.",
                summary.current_level, summary.current_points, summary.study_streak_days
            );
        }
        Commands::RecordAssignment {
            email,
            assignment_id,
            title,
            subject,
            status,
            score,
            minutes,
        } => {
            let now = Utc::now();
            let (_, mut tracker) = load_tracker(&pool, &email).await?;
            let previous = tracker
                .assignments()
                .iter()
                .find(|assignment| assignment.assignment_id == assignment_id)
                .cloned();
            let submitted_at = match status {
                AssignmentStatus::Submitted | AssignmentStatus::Graded => previous
                    .as_ref()
                    .and_then(|assignment| assignment.submitted_at)
                    .or(Some(now)),
                AssignmentStatus::Pending | AssignmentStatus::Overdue => None,
            };
            let graded = status == AssignmentStatus::Graded;

            tracker
                .record_assignment(AssignmentEvent {
                    assignment_id,
                    title,
                    subject,
                    status,
                    score: score.filter(|_| graded),
                    submitted_at,
                    graded_at: graded.then_some(now),
                    time_spent_minutes: minutes,
                })
                .await?;
            println!("Assignment recorded as {status}.");
        }
        Commands::Play {
            email,
            game: game_id,
            answers,
            minutes,
        } => {
            let game =
                game::find_game(&game_id).with_context(|| format!("unknown game '{game_id}'"))?;
            let (_, mut tracker) = load_tracker(&pool, &email).await?;

            let mut session = game::GameSession::new(game);
            session.start();
            println!("{}", game.title);

            for answer in answers.iter() {
                let Some(round) = session.current_round() else {
                    break;
                };
                println!("{}", round.prompt());
                let feedback = session.answer(answer)?;
                println!(
                    "  {answer}: {} (score {}, lives {})",
                    if feedback.correct { "correct" } else { "wrong" },
                    feedback.score,
                    feedback.lives
                );
                if feedback.state != game::GameState::Playing {
                    break;
                }
            }

            let now = Utc::now();
            let attempts = next_attempt(&tracker, game.lesson_id);
            let Some(event) = session.lesson_event(now, minutes, attempts) else {
                anyhow::bail!(
                    "not enough answers to finish '{}' ({} rounds)",
                    game.lesson_id,
                    game.rounds.len()
                );
            };
            tracker.record_lesson(event).await?;

            match session.state() {
                game::GameState::OutOfLives => {
                    println!("Out of lives with {} points. Try again!", session.score())
                }
                _ => println!(
                    "Finished with {} points and {} stars.",
                    session.score(),
                    session.stars()
                ),
            }
        }
    }

    Ok(())
}
