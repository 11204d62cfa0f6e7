use std::fmt;

use elimu_core::model::{
    Identity, ProgressRecord, Quiz, QuizError, QuizQuestion, Subject, TopicId, topics_for,
};
use services::{AppServices, Clock, Credentials, DEMO_LEARNER_EMAIL, DEMO_SECRET};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- status [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- demo   [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  status  restore the stored session and print the current progress (default)");
    eprintln!("  demo    sign in as the demo learner and walk one topic end to end");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:elimu.sqlite3");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  ELIMU_DB_URL, ELIMU_TRACKING_URL, ELIMU_TRACKING_TOKEN, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "status" => Some(Self::Status),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("ELIMU_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://elimu.sqlite3".into(), normalize_sqlite_url);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: report session and progress status when no
    // subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Status,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Status,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if matches!(cmd, Command::Status | Command::Demo)
        && !argv.is_empty()
        && !argv[0].starts_with("--")
    {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::default_clock()).await?;

    match cmd {
        Command::Status => {
            run_status(&app).await;
            Ok(())
        }
        Command::Demo => run_demo(&app).await,
    }
}

/// Restore whatever session the last run left behind and report on it.
async fn run_status(app: &AppServices) {
    let sessions = app.session_manager();
    let progress = app.progress_tracker();

    match sessions.restore().await {
        Some(identity) => {
            println!(
                "signed in as {} <{}> ({})",
                identity.name(),
                identity.email(),
                identity.role()
            );
            let loaded = progress.load(Some(&identity)).await;
            if let Some(badge) = loaded.streak.badge {
                println!("new badge unlocked: {badge}");
            }
            print_progress_summary(&identity, &loaded.record);
        }
        None => println!("signed out; run the demo subcommand to sign in"),
    }
}

/// Sign in as the demo learner and walk one catalog topic end to end:
/// complete it, take its quiz, and collect the rewards.
async fn run_demo(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = app.session_manager();
    let progress = app.progress_tracker();

    let identity = sessions
        .login(Credentials::new(DEMO_LEARNER_EMAIL, DEMO_SECRET))
        .await?;
    println!("signed in as {} <{}>", identity.name(), identity.email());

    let loaded = progress.load(Some(&identity)).await;
    if loaded.streak.is_extended() {
        println!("streak extended to {} day(s)", loaded.streak.days);
    }
    if let Some(badge) = loaded.streak.badge {
        println!("new badge unlocked: {badge}");
    }

    let topic = topics_for(Subject::IntegratedScience, 7)
        .iter()
        .find(|topic| topic.slug() == "energy")
        .copied()
        .ok_or("energy topic missing from catalog")?;
    println!("topic: {} ({})", topic.title(), Subject::IntegratedScience.display_name());

    let completed = progress
        .complete(topic.topic_id())
        .await
        .ok_or("nobody is signed in")?;
    if completed.newly_completed {
        println!("completed, +{} points", completed.points);
    } else {
        println!("already completed on an earlier run");
    }

    let quiz = demo_quiz(topic.topic_id())?;
    // The demo student answers everything correctly.
    let answers: Vec<usize> = quiz.questions().iter().map(QuizQuestion::answer_index).collect();
    let score = quiz.grade(&answers);
    println!("quiz score: {:.0}%", score.value());

    let scored = progress
        .record_score(topic.topic_id(), score)
        .await
        .ok_or("nobody is signed in")?;
    println!("quiz reward: +{} points", scored.points);
    if let Some(badge) = scored.badge {
        println!("new badge unlocked: {badge}");
    }
    if scored.replaced.is_some() {
        println!("(replaced the score from an earlier run)");
    }

    let balance = progress.add_points(5).await.ok_or("nobody is signed in")?;
    println!("demo bonus: +5 points, balance is now {balance}");

    println!();
    print_progress_summary(&identity, &progress.snapshot());
    println!();
    println!("the session is stored; `cargo run -p app -- status` picks it back up");
    Ok(())
}

fn print_progress_summary(identity: &Identity, record: &ProgressRecord) {
    println!("streak: {} day(s)", record.streak_days());
    println!("points: {}", record.points());
    if !record.badges().is_empty() {
        let names: Vec<String> = record.badges().iter().map(ToString::to_string).collect();
        println!("badges: {}", names.join(", "));
    }
    if let Some(grade) = identity.grade() {
        let total: usize = Subject::ALL
            .into_iter()
            .map(|subject| topics_for(subject, grade).len())
            .sum();
        println!(
            "completed: {}/{} grade {} topics ({:.0}%)",
            record.completed_topics().len(),
            total,
            grade,
            record.completion_percent(total)
        );
    }
}

fn demo_quiz(topic: TopicId) -> Result<Quiz, QuizError> {
    let questions = vec![
        QuizQuestion::new(
            "Which force pulls objects toward the ground?",
            vec![
                "Friction".to_owned(),
                "Gravity".to_owned(),
                "Magnetism".to_owned(),
            ],
            1,
        )?,
        QuizQuestion::new(
            "What kind of energy does a stretched rubber band store?",
            vec![
                "Kinetic energy".to_owned(),
                "Elastic potential energy".to_owned(),
                "Heat energy".to_owned(),
            ],
            1,
        )?,
        QuizQuestion::new(
            "Which unit is force measured in?",
            vec!["Joules".to_owned(), "Watts".to_owned(), "Newtons".to_owned()],
            2,
        )?,
    ];
    Quiz::new(topic, questions)
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
