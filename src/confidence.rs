//! Project Confidence Scoring
//!
//! Measures how decisively the assistant acts in each project. Every session's
//! tool calls are split into read-oriented and write-oriented calls using an
//! injected [`ToolTaxonomy`]; the resulting ratios classify the session's
//! [`Intent`], and per-project averages feed a bounded 0-100 score.
//!
//! ## Score
//!
//! - **Write score** (max 40): average write ratio relative to the 0.6 intent threshold
//! - **Commit density** (max 40): average commits per session relative to 3
//! - **Exploration penalty** (max 20): applied when most sessions only explore and
//!   those sessions rarely commit
//!
//! Sessions with no tool calls carry no signal and are skipped. A project needs at
//! least [`MIN_PROJECT_SESSIONS`] qualifying sessions to be scored.

use crate::config::AnalysisConfig;
use crate::models::{ConfidenceAnalysis, Intent, ProjectConfidence, SessionRecord};
use crate::stats::{ratio, round_to};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub const DEFAULT_READ_TOOLS: &[&str] = &[
    "Read",
    "Grep",
    "Glob",
    "LS",
    "WebFetch",
    "WebSearch",
    "NotebookRead",
];

pub const DEFAULT_WRITE_TOOLS: &[&str] = &["Edit", "Write", "MultiEdit", "NotebookEdit"];

/// Ratio above which a session is labelled exploration or implementation.
const INTENT_THRESHOLD: f64 = 0.6;

pub const MIN_PROJECT_SESSIONS: usize = 2;

/// Projects scoring below this are counted as low confidence.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 40.0;

const HIGH_CONFIDENCE_THRESHOLD: f64 = 70.0;

const WRITE_SCORE_MAX: f64 = 40.0;
const COMMIT_DENSITY_MAX: f64 = 40.0;
const TARGET_COMMITS_PER_SESSION: f64 = 3.0;
const EXPLORATION_PENALTY_MAX: f64 = 20.0;

/// Which tools count as reading and which as writing.
///
/// Tools outside both sets still count toward a session's total.
#[derive(Debug, Clone)]
pub struct ToolTaxonomy {
    read: HashSet<String>,
    write: HashSet<String>,
}

impl Default for ToolTaxonomy {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TOOLS.iter().copied(), DEFAULT_WRITE_TOOLS.iter().copied())
    }
}

impl ToolTaxonomy {
    pub fn new<R, W, S>(read: R, write: W) -> Self
    where
        R: IntoIterator<Item = S>,
        W: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            read: read.into_iter().map(Into::into).collect(),
            write: write.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(
            config.read_tools.iter().cloned(),
            config.write_tools.iter().cloned(),
        )
    }

    pub fn is_read(&self, tool: &str) -> bool {
        self.read.contains(tool)
    }

    pub fn is_write(&self, tool: &str) -> bool {
        self.write.contains(tool)
    }
}

/// Tool-usage profile of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProfile {
    pub read_ratio: f64,
    pub write_ratio: f64,
    pub intent: Intent,
    pub commits: u32,
}

/// `None` when the session made no tool calls.
pub fn classify_session(session: &SessionRecord, taxonomy: &ToolTaxonomy) -> Option<SessionProfile> {
    let total = session.total_tool_calls();
    if total == 0 {
        return None;
    }

    let mut reads = 0u64;
    let mut writes = 0u64;
    for (tool, &count) in &session.tool_counts {
        if taxonomy.is_read(tool) {
            reads += u64::from(count);
        } else if taxonomy.is_write(tool) {
            writes += u64::from(count);
        }
    }

    let read_ratio = reads as f64 / total as f64;
    let write_ratio = writes as f64 / total as f64;
    let intent = if read_ratio > INTENT_THRESHOLD {
        Intent::Exploration
    } else if write_ratio > INTENT_THRESHOLD {
        Intent::Implementation
    } else {
        Intent::Mixed
    };

    Some(SessionProfile {
        read_ratio,
        write_ratio,
        intent,
        commits: session.git_commits,
    })
}

/// Combine project aggregates into a score in `[0, 100]`.
pub fn confidence_score(
    avg_write_ratio: f64,
    avg_commits_per_session: f64,
    exploration_rate: f64,
    exploration_commit_rate: f64,
) -> f64 {
    let write_score = (avg_write_ratio / INTENT_THRESHOLD * WRITE_SCORE_MAX).min(WRITE_SCORE_MAX);
    let commit_density = (avg_commits_per_session / TARGET_COMMITS_PER_SESSION * COMMIT_DENSITY_MAX)
        .min(COMMIT_DENSITY_MAX);

    let exploration_penalty = if exploration_rate > 0.5 && exploration_commit_rate < 1.0 {
        let rate_penalty = (exploration_rate - 0.5) / 0.5 * 10.0;
        let commit_penalty = (1.0 - exploration_commit_rate) * 10.0;
        (rate_penalty + commit_penalty).min(EXPLORATION_PENALTY_MAX)
    } else {
        0.0
    };

    (write_score + commit_density - exploration_penalty).clamp(0.0, 100.0)
}

pub fn analyze_confidence(sessions: &[SessionRecord], taxonomy: &ToolTaxonomy) -> ConfidenceAnalysis {
    let mut by_project: BTreeMap<&str, Vec<SessionProfile>> = BTreeMap::new();
    let mut read_sum = 0.0;
    let mut write_sum = 0.0;
    let mut qualifying = 0usize;

    for session in sessions {
        let Some(profile) = classify_session(session, taxonomy) else {
            continue;
        };
        read_sum += profile.read_ratio;
        write_sum += profile.write_ratio;
        qualifying += 1;
        by_project
            .entry(session.project_path.as_str())
            .or_default()
            .push(profile);
    }

    let mut projects: Vec<ProjectConfidence> = by_project
        .into_iter()
        .filter(|(_, profiles)| profiles.len() >= MIN_PROJECT_SESSIONS)
        .map(|(project, profiles)| score_project(project, &profiles))
        .collect();

    projects.sort_by(|a, b| {
        a.confidence_score
            .partial_cmp(&b.confidence_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.project_path.cmp(&b.project_path))
    });

    let low_confidence_count = projects
        .iter()
        .filter(|p| p.confidence_score < LOW_CONFIDENCE_THRESHOLD)
        .count();

    debug!(
        sessions = sessions.len(),
        qualifying,
        projects = projects.len(),
        low_confidence_count,
        "Project confidence computed"
    );

    ConfidenceAnalysis {
        projects,
        global_avg_read_ratio: round_to(ratio(read_sum, qualifying as f64), 3),
        global_avg_write_ratio: round_to(ratio(write_sum, qualifying as f64), 3),
        low_confidence_count,
    }
}

fn score_project(project: &str, profiles: &[SessionProfile]) -> ProjectConfidence {
    let n = profiles.len() as f64;
    let avg_read_ratio = profiles.iter().map(|p| p.read_ratio).sum::<f64>() / n;
    let avg_write_ratio = profiles.iter().map(|p| p.write_ratio).sum::<f64>() / n;
    let avg_commits = profiles.iter().map(|p| f64::from(p.commits)).sum::<f64>() / n;

    let (exploration_count, exploration_commits) = intent_totals(profiles, Intent::Exploration);
    let (implementation_count, implementation_commits) =
        intent_totals(profiles, Intent::Implementation);

    let exploration_rate = exploration_count as f64 / n;
    let implementation_rate = implementation_count as f64 / n;
    let exploration_commit_rate = ratio(exploration_commits, exploration_count as f64);
    let implementation_commit_rate = ratio(implementation_commits, implementation_count as f64);

    let score = round_to(
        confidence_score(
            avg_write_ratio,
            avg_commits,
            exploration_rate,
            exploration_commit_rate,
        ),
        1,
    );

    ProjectConfidence {
        project_path: project.to_string(),
        session_count: profiles.len(),
        avg_read_ratio: round_to(avg_read_ratio, 3),
        avg_write_ratio: round_to(avg_write_ratio, 3),
        exploration_rate: round_to(exploration_rate, 3),
        implementation_rate: round_to(implementation_rate, 3),
        exploration_commit_rate: round_to(exploration_commit_rate, 3),
        implementation_commit_rate: round_to(implementation_commit_rate, 3),
        confidence_score: score,
        signal: signal_text(score, implementation_rate, exploration_rate, avg_commits),
    }
}

fn intent_totals(profiles: &[SessionProfile], intent: Intent) -> (usize, f64) {
    profiles
        .iter()
        .filter(|p| p.intent == intent)
        .fold((0, 0.0), |(count, commits), p| {
            (count + 1, commits + f64::from(p.commits))
        })
}

fn signal_text(score: f64, implementation_rate: f64, exploration_rate: f64, avg_commits: f64) -> String {
    let level = if score >= HIGH_CONFIDENCE_THRESHOLD {
        "high"
    } else if score >= LOW_CONFIDENCE_THRESHOLD {
        "moderate"
    } else {
        "low"
    };
    format!(
        "{} confidence: {:.0}% implementation, {:.0}% exploration, {:.1} commits/session",
        level,
        implementation_rate * 100.0,
        exploration_rate * 100.0,
        avg_commits
    )
}
