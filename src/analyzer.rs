//! Insights Analysis Engine
//!
//! [`InsightsAnalyzer`] is the orchestration layer around the scorers: it loads
//! the collaborator records once, hands the same immutable slices to each
//! scorer, and renders the results.
//!
//! ## Pipeline
//!
//! 1. **Load**: sessions and facets are read concurrently (see [`crate::loader`])
//! 2. **Score**: each requested analysis runs independently over the shared inputs
//! 3. **Render**: terminal report or JSON (see [`crate::display`])
//!
//! ## Commands
//!
//! - **persistence**: friction tags over time, stale patterns first
//! - **confidence**: per-project confidence, lowest score first
//! - **effectiveness**: before/after impact of one change, or a timeline of changes
//! - **report**: persistence, confidence and (when changes are given) the timeline
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use claude_insights::analyzer::{Command, InsightsAnalyzer, RunOptions};
//! use claude_insights::config::Config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let analyzer = InsightsAnalyzer::new(Config::default());
//! let options = RunOptions {
//!     sessions_path: "sessions.jsonl".into(),
//!     facets_path: "facets".into(),
//!     json_output: true,
//! };
//! analyzer.run_command(&Command::Confidence, &options).await?;
//! # Ok(())
//! # }
//! ```

use crate::confidence::{analyze_confidence, ToolTaxonomy};
use crate::config::Config;
use crate::display::DisplayManager;
use crate::effectiveness::{compute_effectiveness, compute_timeline};
use crate::loader;
use crate::logging::run_span;
use crate::models::*;
use crate::persistence::analyze_persistence;
use crate::pricing::PricingTable;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{info, warn, Instrument};

/// Where the change instant for an effectiveness run comes from.
#[derive(Debug, Clone)]
pub enum ChangeSource {
    At(DateTime<Utc>),
    /// Modification time of a tracked file such as the project's CLAUDE.md.
    FileModified(PathBuf),
}

#[derive(Debug, Clone)]
pub enum Command {
    Persistence,
    Confidence,
    Effectiveness { project: String, change: ChangeSource },
    Timeline { changes_path: PathBuf },
    Report { changes_path: Option<PathBuf> },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Persistence => "persistence",
            Command::Confidence => "confidence",
            Command::Effectiveness { .. } => "effectiveness",
            Command::Timeline { .. } => "timeline",
            Command::Report { .. } => "report",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub sessions_path: PathBuf,
    pub facets_path: PathBuf,
    pub json_output: bool,
}

pub struct InsightsAnalyzer {
    taxonomy: ToolTaxonomy,
    pricing: PricingTable,
    display_manager: DisplayManager,
}

impl Default for InsightsAnalyzer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl InsightsAnalyzer {
    pub fn new(config: Config) -> Self {
        Self {
            taxonomy: ToolTaxonomy::from_config(&config.analysis),
            pricing: PricingTable::from_config(&config.pricing),
            display_manager: DisplayManager::new(config.output.json_pretty),
        }
    }

    pub fn persistence(&self, sessions: &[SessionRecord], facets: &[FrictionFacet]) -> PersistenceAnalysis {
        analyze_persistence(sessions, facets)
    }

    pub fn confidence(&self, sessions: &[SessionRecord]) -> ConfidenceAnalysis {
        analyze_confidence(sessions, &self.taxonomy)
    }

    /// Score one change using only the sessions recorded for `project`.
    pub fn effectiveness(
        &self,
        sessions: &[SessionRecord],
        facets: &[FrictionFacet],
        project: &str,
        changed_at: Option<DateTime<Utc>>,
    ) -> EffectivenessResult {
        let project_sessions: Vec<SessionRecord> = sessions
            .iter()
            .filter(|s| s.project_path == project)
            .cloned()
            .collect();
        compute_effectiveness(project, changed_at, &project_sessions, facets, &self.pricing)
    }

    pub fn timeline(
        &self,
        sessions: &[SessionRecord],
        facets: &[FrictionFacet],
        changes: &[ChangeEvent],
    ) -> Vec<EffectivenessResult> {
        compute_timeline(sessions, facets, changes, &self.pricing)
    }

    pub async fn run_command(&self, command: &Command, options: &RunOptions) -> Result<()> {
        self.execute(command, options)
            .instrument(run_span(command.name()))
            .await
    }

    async fn execute(&self, command: &Command, options: &RunOptions) -> Result<()> {
        let (sessions, facets) =
            loader::load_inputs(&options.sessions_path, &options.facets_path).await?;

        // Scorers degrade to empty or insufficient results on their own.
        if sessions.is_empty() {
            warn!(path = %options.sessions_path.display(), "No sessions found");
        }

        info!(
            command = command.name(),
            sessions = sessions.len(),
            facets = facets.len(),
            "Running analysis"
        );

        let json = options.json_output;
        match command {
            Command::Persistence => {
                let analysis = self.persistence(&sessions, &facets);
                self.display_manager.display_persistence(&analysis, json)
            }
            Command::Confidence => {
                let analysis = self.confidence(&sessions);
                self.display_manager.display_confidence(&analysis, json)
            }
            Command::Effectiveness { project, change } => {
                let changed_at = match change {
                    ChangeSource::At(instant) => *instant,
                    ChangeSource::FileModified(path) => loader::change_instant_from_file(path)?,
                };
                let result = self.effectiveness(&sessions, &facets, project, Some(changed_at));
                self.display_manager
                    .display_effectiveness(std::slice::from_ref(&result), json)
            }
            Command::Timeline { changes_path } => {
                let changes = loader::load_changes(changes_path).await?;
                let results = self.timeline(&sessions, &facets, &changes);
                self.display_manager.display_effectiveness(&results, json)
            }
            Command::Report { changes_path } => {
                let persistence = self.persistence(&sessions, &facets);
                let confidence = self.confidence(&sessions);
                let timeline = match changes_path {
                    Some(path) => {
                        let changes = loader::load_changes(path).await?;
                        Some(self.timeline(&sessions, &facets, &changes))
                    }
                    None => None,
                };

                self.display_manager.display_report(
                    &persistence,
                    &confidence,
                    timeline.as_deref(),
                    json,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn session(id: &str, project: &str, start: &str, errors: u32) -> SessionRecord {
        SessionRecord {
            session_id: id.to_string(),
            project_path: project.to_string(),
            start_time: start.to_string(),
            tool_errors: errors,
            tool_counts: HashMap::from([("Edit".to_string(), 4), ("Read".to_string(), 1)]),
            git_commits: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_effectiveness_only_uses_project_sessions() {
        let sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 5),
            session("b2", "/p", "2025-01-11T00:00:00Z", 5),
            session("x1", "/other", "2025-01-12T00:00:00Z", 0),
            session("a1", "/p", "2025-02-10T00:00:00Z", 1),
            session("a2", "/p", "2025-02-11T00:00:00Z", 1),
            session("x2", "/other", "2025-02-12T00:00:00Z", 50),
        ];
        let changed_at = DateTime::parse_from_rfc3339("2025-02-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let analyzer = InsightsAnalyzer::default();
        let result = analyzer.effectiveness(&sessions, &[], "/p", Some(changed_at));
        assert_eq!(result.before.sessions, 2);
        assert_eq!(result.after.sessions, 2);
        assert_eq!(result.verdict, Verdict::Effective);
    }

    #[test]
    fn test_confidence_uses_configured_taxonomy() {
        let mut config = Config::default();
        config.analysis.write_tools = vec!["Bash".to_string()];
        let analyzer = InsightsAnalyzer::new(config);
        let sessions = vec![
            session("s1", "/p", "2025-01-10T00:00:00Z", 0),
            session("s2", "/p", "2025-01-11T00:00:00Z", 0),
        ];
        let analysis = analyzer.confidence(&sessions);
        // Edit no longer counts as writing.
        assert_eq!(analysis.projects[0].avg_write_ratio, 0.0);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(Command::Persistence.name(), "persistence");
        assert_eq!(
            Command::Report { changes_path: None }.name(),
            "report"
        );
    }
}
