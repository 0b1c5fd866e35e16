//! Core Data Models
//!
//! This module defines the records consumed by the analytics engine and the
//! derived reports it produces.
//!
//! ## Data Flow
//!
//! 1. **Inputs**: [`SessionRecord`] and [`FrictionFacet`], produced by an external log scanner
//!    and loaded once per run. They are never mutated by any scorer.
//! 2. **Change points**: [`ChangeEvent`] - the instant a tracked project artifact changed
//! 3. **Reports**: [`PersistenceAnalysis`], [`ConfidenceAnalysis`], [`EffectivenessResult`]
//!
//! ## Classification Types
//!
//! Labels that drive verdicts are closed enums rather than strings, so every
//! consumer matches them exhaustively:
//! - [`Trend`] - improving / stable / worsening
//! - [`Intent`] - exploration / implementation / mixed
//! - [`Verdict`] - effective / neutral / regression / insufficient_data
//! - [`Outcome`] - the facet's goal-achievement label
//!
//! ## Features
//!
//! - **Serde Integration**: inputs accept snake_case and camelCase keys, outputs serialize
//!   as camelCase JSON
//! - **Optional Fields**: missing counters default to zero, missing timestamps to empty

use crate::timestamp_parser::TimestampParser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(alias = "sessionId")]
    pub session_id: String,
    #[serde(default, alias = "projectPath")]
    pub project_path: String,
    /// ISO-8601 / RFC3339 start time. May be empty or unparseable.
    #[serde(default, alias = "startTime")]
    pub start_time: String,
    #[serde(default, alias = "durationMinutes")]
    pub duration_minutes: f64,
    #[serde(default, alias = "userMessageCount")]
    pub user_message_count: u32,
    #[serde(default, alias = "assistantMessageCount")]
    pub assistant_message_count: u32,
    #[serde(default, alias = "toolCounts")]
    pub tool_counts: HashMap<String, u32>,
    #[serde(default, alias = "gitCommits")]
    pub git_commits: u32,
    #[serde(default, alias = "toolErrors")]
    pub tool_errors: u32,
    #[serde(default, alias = "userInterruptions")]
    pub user_interruptions: u32,
    #[serde(default, alias = "inputTokens")]
    pub input_tokens: u64,
    #[serde(default, alias = "outputTokens")]
    pub output_tokens: u64,
    /// Model that served most of the session, used for pricing lookups.
    #[serde(default)]
    pub model: Option<String>,
}

impl SessionRecord {
    /// Parsed start time, `None` when absent or unparseable.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        TimestampParser::parse_lenient(&self.start_time)
    }

    pub fn total_tool_calls(&self) -> u64 {
        self.tool_counts.values().map(|&c| u64::from(c)).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrictionFacet {
    #[serde(alias = "sessionId")]
    pub session_id: String,
    #[serde(default, alias = "frictionCounts")]
    pub friction_counts: HashMap<String, u32>,
    #[serde(default)]
    pub outcome: String,
    #[serde(default)]
    pub satisfaction: Option<String>,
    #[serde(default)]
    pub helpfulness: Option<String>,
}

impl FrictionFacet {
    /// Raw friction event count across every tag.
    pub fn friction_events(&self) -> u64 {
        self.friction_counts.values().map(|&c| u64::from(c)).sum()
    }

    /// Tags observed at least once in this session.
    pub fn present_tags(&self) -> impl Iterator<Item = &str> {
        self.friction_counts
            .iter()
            .filter(|&(_, &count)| count > 0)
            .map(|(tag, _)| tag.as_str())
    }

    pub fn outcome(&self) -> Option<Outcome> {
        Outcome::from_label(&self.outcome)
    }
}

/// Goal-achievement label attached to a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Achieved,
    MostlyAchieved,
    NotAchieved,
    /// A non-empty label outside the known set.
    Unrecognized,
}

impl Outcome {
    /// `None` for an empty label, which means "unknown".
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "" => None,
            "achieved" | "fully_achieved" => Some(Outcome::Achieved),
            "mostly_achieved" => Some(Outcome::MostlyAchieved),
            "not_achieved" => Some(Outcome::NotAchieved),
            _ => Some(Outcome::Unrecognized),
        }
    }

    pub fn is_goal_met(self) -> bool {
        matches!(self, Outcome::Achieved | Outcome::MostlyAchieved)
    }
}

/// The instant a tracked artifact (e.g. a project's CLAUDE.md) changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(alias = "projectPath")]
    pub project_path: String,
    #[serde(alias = "changedAt")]
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trend::Improving => "improving",
            Trend::Stable => "stable",
            Trend::Worsening => "worsening",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Exploration,
    Implementation,
    Mixed,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Intent::Exploration => "exploration",
            Intent::Implementation => "implementation",
            Intent::Mixed => "mixed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Effective,
    Neutral,
    Regression,
    InsufficientData,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Effective => "effective",
            Verdict::Neutral => "neutral",
            Verdict::Regression => "regression",
            Verdict::InsufficientData => "insufficient_data",
        })
    }
}

/// How one friction tag behaves over the analysed weeks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrictionPersistence {
    pub tag: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Sessions in which the tag appeared at least once.
    pub occurrences: usize,
    pub total_sessions: usize,
    pub frequency: f64,
    pub trend: Trend,
    pub consecutive_weeks: usize,
    pub stale: bool,
    /// Sessions carrying the tag, one entry per week of the axis.
    pub weekly_counts: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceAnalysis {
    pub patterns: Vec<FrictionPersistence>,
    pub stale_count: usize,
    pub improving_count: usize,
    pub worsening_count: usize,
    pub total_sessions: usize,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfidence {
    pub project_path: String,
    pub session_count: usize,
    pub avg_read_ratio: f64,
    pub avg_write_ratio: f64,
    pub exploration_rate: f64,
    pub implementation_rate: f64,
    /// Average commits per exploration session.
    pub exploration_commit_rate: f64,
    /// Average commits per implementation session.
    pub implementation_commit_rate: f64,
    pub confidence_score: f64,
    pub signal: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceAnalysis {
    /// Sorted by ascending score, lowest confidence first.
    pub projects: Vec<ProjectConfidence>,
    pub global_avg_read_ratio: f64,
    pub global_avg_write_ratio: f64,
    pub low_confidence_count: usize,
}

/// Aggregates for one side of a change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub sessions: usize,
    pub friction_rate: f64,
    pub tool_error_rate: f64,
    pub interruption_rate: f64,
    pub goal_achievement_rate: f64,
    pub cost_per_commit: f64,
}

/// `after - before` for every metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDelta {
    pub friction_rate: f64,
    pub tool_error_rate: f64,
    pub interruption_rate: f64,
    pub goal_achievement_rate: f64,
    pub cost_per_commit: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectivenessResult {
    pub project_path: String,
    pub changed_at: Option<DateTime<Utc>>,
    pub before: MetricSnapshot,
    pub after: MetricSnapshot,
    pub delta: MetricDelta,
    pub score: f64,
    pub verdict: Verdict,
}

impl EffectivenessResult {
    pub fn insufficient(project_path: &str, changed_at: Option<DateTime<Utc>>) -> Self {
        Self {
            project_path: project_path.to_string(),
            changed_at,
            before: MetricSnapshot::default(),
            after: MetricSnapshot::default(),
            delta: MetricDelta::default(),
            score: 0.0,
            verdict: Verdict::InsufficientData,
        }
    }
}
