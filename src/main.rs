use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use claude_insights::analyzer::{ChangeSource, Command, InsightsAnalyzer, RunOptions};
use claude_insights::config::get_config;
use claude_insights::logging::init_logging;
use claude_insights::timestamp_parser::TimestampParser;

#[derive(Parser)]
#[command(name = "claude-insights")]
#[command(about = "Friction, confidence and change-impact analytics for Claude Code sessions")]
#[command(version)]
struct Cli {
    /// Session records, JSON array or JSONL (default: <data_dir>/sessions.jsonl)
    #[arg(long, global = true)]
    sessions: Option<PathBuf>,
    /// Facet records: a JSON/JSONL file or a directory of *.json (default: <data_dir>/facets)
    #[arg(long, global = true)]
    facets: Option<PathBuf>,
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Friction tags over time, stale patterns first
    Persistence,
    /// Per-project confidence, lowest score first
    Confidence,
    /// Before/after impact of a change, or of every change in a timeline
    Effectiveness {
        /// Project whose sessions are compared
        #[arg(long, required_unless_present = "changes")]
        project: Option<String>,
        /// Change instant (RFC3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_instant, conflicts_with_all = ["config_file", "changes"])]
        changed_at: Option<DateTime<Utc>>,
        /// Use this file's modification time as the change instant
        /// (default: <project>/CLAUDE.md)
        #[arg(long, conflicts_with = "changes")]
        config_file: Option<PathBuf>,
        /// JSON/JSONL list of {projectPath, changedAt} change events
        #[arg(long)]
        changes: Option<PathBuf>,
    },
    /// Persistence, confidence and (with --changes) the effectiveness timeline
    Report {
        /// JSON/JSONL list of change events to score
        #[arg(long)]
        changes: Option<PathBuf>,
    },
}

fn parse_instant(value: &str) -> Result<DateTime<Utc>, String> {
    TimestampParser::parse(value).map_err(|e| e.to_string())
}

impl Commands {
    fn into_command(self) -> Command {
        match self {
            Commands::Persistence => Command::Persistence,
            Commands::Confidence => Command::Confidence,
            Commands::Effectiveness {
                changes: Some(changes_path),
                ..
            } => Command::Timeline { changes_path },
            Commands::Effectiveness {
                project,
                changed_at,
                config_file,
                changes: None,
            } => {
                // clap guarantees a project when no changes file is given
                let project = project.unwrap_or_default();
                let change = match (changed_at, config_file) {
                    (Some(instant), _) => ChangeSource::At(instant),
                    (None, Some(path)) => ChangeSource::FileModified(path),
                    (None, None) => ChangeSource::FileModified(PathBuf::from(&project).join("CLAUDE.md")),
                };
                Command::Effectiveness { project, change }
            }
            Commands::Report { changes } => Command::Report {
                changes_path: changes,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = cli.json;

    let config = get_config();
    // Held until exit so buffered file logs are flushed
    let _guard = init_logging(&config.logging, &config.paths);

    let options = RunOptions {
        sessions_path: cli
            .sessions
            .unwrap_or_else(|| config.paths.data_dir.join("sessions.jsonl")),
        facets_path: cli
            .facets
            .unwrap_or_else(|| config.paths.data_dir.join("facets")),
        json_output: json,
    };

    let analyzer = InsightsAnalyzer::new(config.clone());
    match analyzer.run_command(&cli.command.into_command(), &options).await {
        Ok(()) => Ok(()),
        Err(e) => handle_error(e, json),
    }
}

fn handle_error(e: anyhow::Error, json: bool) -> ! {
    if json {
        println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
    } else {
        eprintln!("Error: {:#}", e);
    }
    process::exit(1);
}
