use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod api;
mod db;
mod error;
mod models;
mod progress;
mod report;
mod sentiment;
mod store;
#[cfg(test)]
mod testing;

use progress::{ProgressAggregator, DEFAULT_MOOD_WINDOW};

#[derive(Parser)]
#[command(name = "smarttutor")]
#[command(about = "SmartTutor learning backend", long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Maximum pooled Postgres connections
    #[arg(long, default_value_t = 5, global = true)]
    max_connections: u32,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load demo subjects, lessons, quizzes and a demo learner
    Seed,
    /// Import quiz results from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "SMARTTUTOR_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,
        #[arg(
            long,
            env = "SMARTTUTOR_MOOD_WINDOW",
            default_value_t = DEFAULT_MOOD_WINDOW,
            value_parser = parse_window
        )]
        mood_window: usize,
    },
    /// Compute a learner's progress summary
    Progress {
        #[arg(long)]
        user_id: i64,
        #[arg(
            long,
            env = "SMARTTUTOR_MOOD_WINDOW",
            default_value_t = DEFAULT_MOOD_WINDOW,
            value_parser = parse_window
        )]
        mood_window: usize,
        /// Write a markdown report here instead of printing JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn parse_window(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("mood window must be at least 1".to_string()),
        Ok(window) => Ok(window),
        Err(err) => Err(err.to_string()),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} quiz results from {}.", csv.display());
        }
        Commands::Serve { bind, mood_window } => {
            let state = api::AppState::new(
                Arc::new(db::PgStore::new(pool)),
                sentiment::SentimentClassifier::default(),
                ProgressAggregator::new(mood_window),
            );
            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("failed to bind {bind}"))?;
            info!(%bind, mood_window, "SmartTutor API listening");

            axum::serve(listener, api::router(state).into_make_service())
                .await
                .context("HTTP server error")?;
        }
        Commands::Progress {
            user_id,
            mood_window,
            out,
        } => {
            let store = db::PgStore::new(pool);
            let aggregator = ProgressAggregator::new(mood_window);
            let summary = aggregator.summarize(&store, user_id).await?;

            match out {
                Some(path) => {
                    let report = report::build_report(user_id, aggregator.mood_window(), &summary);
                    std::fs::write(&path, report)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&summary)?),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mood_window_must_be_positive() {
        assert_eq!(parse_window("5"), Ok(5));
        assert!(parse_window("0").is_err());
        assert!(parse_window("many").is_err());
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["smarttutor", "progress", "--user-id", "3"]).unwrap();
        match cli.command {
            Commands::Progress {
                user_id,
                mood_window,
                out,
            } => {
                assert_eq!(user_id, 3);
                assert_eq!(mood_window, DEFAULT_MOOD_WINDOW);
                assert!(out.is_none());
            }
            _ => panic!("expected progress command"),
        }
        assert_eq!(cli.max_connections, 5);
    }
}
