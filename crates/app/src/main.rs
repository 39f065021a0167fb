use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use quest_core::model::{ChallengeId, CourseId, UserId};
use services::{AppServices, ChallengeOutcome, Clock, HeartsOutcome, ProgressRequest};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quest")]
#[command(about = "Course progress for the AWS learning app", long_about = None)]
struct Cli {
    /// `SQLite` database URL or file path
    #[arg(long, env = "QUEST_DB_URL", default_value = "sqlite:dev.sqlite3", global = true)]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    Init,
    /// Write the sample AWS course
    Seed,
    /// Make a course the learner's active course
    Select {
        #[arg(long, env = "QUEST_USER_ID")]
        user: UserId,
        #[arg(long)]
        course: CourseId,
        #[arg(long, default_value = "Learner")]
        name: String,
    },
    /// Submit an answer to a challenge
    Answer {
        #[arg(long, env = "QUEST_USER_ID")]
        user: UserId,
        #[arg(long)]
        challenge: ChallengeId,
        /// Record a wrong answer instead of a correct one
        #[arg(long)]
        wrong: bool,
    },
    /// Spend XP to refill hearts
    Refill {
        #[arg(long, env = "QUEST_USER_ID")]
        user: UserId,
    },
    /// Show the learner's course tree, active lesson and stats
    Report {
        #[arg(long, env = "QUEST_USER_ID")]
        user: UserId,
    },
    /// Show the top ten learners by XP
    Leaderboard,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
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

/// The driver creates the database file but not its directory.
fn ensure_db_dir(db_url: &str) -> Result<()> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = Path::new(path.split('?').next().unwrap_or(path));
    if path.as_os_str().is_empty() {
        bail!("invalid --db value: {db_url}");
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

async fn print_report(request: &ProgressRequest) -> Result<()> {
    let Some(user) = request.user_progress().await? else {
        println!("{} has not started a course yet.", request.user_id());
        return Ok(());
    };
    println!(
        "{} | hearts {} | XP {}",
        user.user_name(),
        user.hearts(),
        user.points()
    );

    let Some(progress) = request.course_progress().await? else {
        println!("No active course.");
        return Ok(());
    };
    println!("Course: {}", progress.course.title());

    let active_id = progress.active_lesson_id;
    for unit in request.units().await? {
        let mark = if unit.is_complete() { "✓" } else { " " };
        println!("[{mark}] {}", unit.unit.title);
        for lesson in &unit.lessons {
            let mark = if lesson.completed { "✓" } else { " " };
            let pointer = if Some(lesson.id()) == active_id { "  <- continue here" } else { "" };
            println!("    [{mark}] {}{pointer}", lesson.lesson.title);
        }
    }

    match request.lesson(None).await? {
        Some(lesson) => {
            println!(
                "Active lesson: {} ({}%)",
                lesson.title,
                request.lesson_percentage().await?
            );
            for challenge in &lesson.challenges {
                let mark = if challenge.completed { "✓" } else { " " };
                println!(
                    "    [{mark}] #{} {}",
                    challenge.challenge.id, challenge.challenge.question
                );
            }
        }
        None => println!("Course complete."),
    }

    for quest in request.quests().await? {
        let mark = if quest.completed { "✓" } else { " " };
        println!("[{mark}] {} ({}%)", quest.title, quest.percentage);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let db_url = normalize_sqlite_url(&cli.db);
    ensure_db_dir(&db_url)?;
    let app = AppServices::new_sqlite(&db_url, Clock::default())
        .await
        .with_context(|| format!("opening {db_url}"))?;

    match cli.command {
        Commands::Init => {
            tracing::info!(db = %db_url, "schema ready");
        }
        Commands::Seed => {
            let report = app.seed_sample_course().await?;
            println!(
                "Seeded {} units, {} lessons, {} challenges.",
                report.units, report.lessons, report.challenges
            );
        }
        Commands::Select { user, course, name } => {
            let progress = app
                .challenges()
                .select_course(&user, course, &name, "/mascot.svg")
                .await?;
            println!(
                "{} is now learning course {course}.",
                progress.user_name()
            );
        }
        Commands::Answer {
            user,
            challenge,
            wrong: false,
        } => match app.challenges().complete_challenge(&user, challenge).await? {
            ChallengeOutcome::Completed {
                practice, progress, ..
            } => {
                let label = if practice { "Practice" } else { "Correct" };
                println!(
                    "{label}! XP {} | hearts {}",
                    progress.points(),
                    progress.hearts()
                );
            }
            ChallengeOutcome::OutOfHearts => println!("Out of hearts. Refill to continue."),
        },
        Commands::Answer {
            user,
            challenge,
            wrong: true,
        } => match app.challenges().reduce_hearts(&user, challenge).await? {
            HeartsOutcome::Reduced(progress) => {
                println!("Wrong answer. Hearts left: {}", progress.hearts());
            }
            HeartsOutcome::Practice => println!("Wrong answer. Practice costs no hearts."),
            HeartsOutcome::Subscribed => println!("Wrong answer. Pro keeps your hearts."),
            HeartsOutcome::OutOfHearts => println!("Out of hearts. Refill to continue."),
        },
        Commands::Refill { user } => {
            let progress = app.challenges().refill_hearts(&user).await?;
            println!(
                "Hearts refilled to {}. XP left: {}",
                progress.hearts(),
                progress.points()
            );
        }
        Commands::Report { user } => {
            let request = app.progress().request(user);
            print_report(&request).await?;
        }
        Commands::Leaderboard => {
            let board = app.leaderboard().top_ten().await?;
            if board.is_empty() {
                println!("No learners yet.");
            }
            for entry in board {
                println!(
                    "{:>2}. {:<20} {:>6} XP",
                    entry.rank, entry.user_name, entry.points
                );
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn report_parses_user_id() {
        let cli = Cli::try_parse_from(["quest", "report", "--user", "user_1"]).unwrap();
        match cli.command {
            Commands::Report { user } => assert_eq!(user.as_str(), "user_1"),
            _ => panic!("expected report"),
        }
        assert!(Cli::try_parse_from(["quest", "report", "--user", "  "]).is_err());
    }

    #[test]
    fn bare_paths_become_sqlite_urls() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(normalize_sqlite_url("sqlite:///tmp/q.db"), "sqlite:///tmp/q.db");
        assert_eq!(normalize_sqlite_url("/tmp/q.db"), "sqlite:///tmp/q.db");
        assert!(normalize_sqlite_url("sqlite:dev.sqlite3").ends_with("/dev.sqlite3"));
    }
}
