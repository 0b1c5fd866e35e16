//! Output Formatting and Display Management
//!
//! Renders the three analyses either as colored terminal reports or as JSON
//! for programmatic consumption.
//!
//! ## JSON Output
//!
//! Each report is wrapped in a single top-level key:
//! ```json
//! {
//!   "persistence": { "patterns": [ ... ], "staleCount": 1, ... }
//! }
//! ```
//! Keys are `persistence`, `confidence` and `effectiveness` (a list, sorted by
//! change instant). The combined report carries all three keys in one object.

use crate::models::*;
use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

pub struct DisplayManager {
    json_pretty: bool,
}

impl Default for DisplayManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl DisplayManager {
    pub fn new(json_pretty: bool) -> Self {
        Self { json_pretty }
    }

    pub fn display_persistence(&self, analysis: &PersistenceAnalysis, json_output: bool) -> Result<()> {
        if json_output {
            println!("{}", self.to_json("persistence", analysis)?);
        } else {
            print!("{}", self.render_persistence(analysis));
        }
        Ok(())
    }

    pub fn display_confidence(&self, analysis: &ConfidenceAnalysis, json_output: bool) -> Result<()> {
        if json_output {
            println!("{}", self.to_json("confidence", analysis)?);
        } else {
            print!("{}", self.render_confidence(analysis));
        }
        Ok(())
    }

    pub fn display_effectiveness(&self, results: &[EffectivenessResult], json_output: bool) -> Result<()> {
        if json_output {
            println!("{}", self.to_json("effectiveness", results)?);
        } else {
            print!("{}", self.render_effectiveness(results));
        }
        Ok(())
    }

    /// All three reports. JSON output is one object with every key;
    /// `effectiveness` is an empty list when no changes were scored.
    pub fn display_report(
        &self,
        persistence: &PersistenceAnalysis,
        confidence: &ConfidenceAnalysis,
        effectiveness: Option<&[EffectivenessResult]>,
        json_output: bool,
    ) -> Result<()> {
        if json_output {
            println!("{}", self.report_json(persistence, confidence, effectiveness)?);
            return Ok(());
        }

        print!("{}", self.render_persistence(persistence));
        print!("{}", self.render_confidence(confidence));
        if let Some(results) = effectiveness {
            print!("{}", self.render_effectiveness(results));
        }
        Ok(())
    }

    pub fn report_json(
        &self,
        persistence: &PersistenceAnalysis,
        confidence: &ConfidenceAnalysis,
        effectiveness: Option<&[EffectivenessResult]>,
    ) -> Result<String> {
        let report = serde_json::json!({
            "persistence": persistence,
            "confidence": confidence,
            "effectiveness": effectiveness.unwrap_or_default(),
        });
        self.render_json(&report, "combined")
    }

    pub fn to_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<String> {
        let mut output = serde_json::Map::new();
        output.insert(
            key.to_string(),
            serde_json::to_value(value)
                .with_context(|| format!("Error serializing {} report to JSON", key))?,
        );
        self.render_json(&serde_json::Value::Object(output), key)
    }

    fn render_json(&self, value: &serde_json::Value, key: &str) -> Result<String> {
        let rendered = if self.json_pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.with_context(|| format!("Error serializing {} report to JSON", key))
    }

    pub fn render_persistence(&self, analysis: &PersistenceAnalysis) -> String {
        let mut out = header("Friction Persistence");

        if analysis.patterns.is_empty() {
            out.push_str("No friction observed in sessions with a known start time.\n");
            return out;
        }

        let window = match (analysis.window_start, analysis.window_end) {
            (Some(start), Some(end)) => format!(
                "{} → {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ),
            _ => "-".to_string(),
        };
        out.push_str(&format!(
            "\n{} sessions • {} • {} stale • {} worsening • {} improving\n\n",
            analysis.total_sessions.to_string().bright_white().bold(),
            window,
            analysis.stale_count.to_string().bright_red().bold(),
            analysis.worsening_count.to_string().bright_yellow(),
            analysis.improving_count.to_string().bright_green(),
        ));

        for pattern in &analysis.patterns {
            let marker = if pattern.stale {
                "STALE".bright_red().bold().to_string()
            } else {
                "     ".to_string()
            };
            out.push_str(&format!(
                "{} {:<32} {:>6} {:<10} {} wk  ({} of {} sessions)\n",
                marker,
                pattern.tag.bright_cyan(),
                format!("{:.1}%", pattern.frequency * 100.0),
                trend_label(pattern.trend),
                pattern.consecutive_weeks,
                pattern.occurrences,
                pattern.total_sessions,
            ));
        }

        out
    }

    pub fn render_confidence(&self, analysis: &ConfidenceAnalysis) -> String {
        let mut out = header("Project Confidence");

        if analysis.projects.is_empty() {
            out.push_str("No project has enough sessions with tool activity to score.\n");
            return out;
        }

        out.push_str(&format!(
            "\n{} projects • {} below 40 • global read {:.0}% / write {:.0}%\n\n",
            analysis.projects.len().to_string().bright_white().bold(),
            analysis.low_confidence_count.to_string().bright_red().bold(),
            analysis.global_avg_read_ratio * 100.0,
            analysis.global_avg_write_ratio * 100.0,
        ));

        for project in &analysis.projects {
            let score = format!("{:>5.1}", project.confidence_score);
            let score = if project.confidence_score >= 70.0 {
                score.bright_green()
            } else if project.confidence_score >= 40.0 {
                score.bright_yellow()
            } else {
                score.bright_red()
            };
            out.push_str(&format!(
                "{} {} ({} sessions)\n      {}\n",
                score.bold(),
                project.project_path.bright_cyan(),
                project.session_count,
                project.signal,
            ));
        }

        out
    }

    pub fn render_effectiveness(&self, results: &[EffectivenessResult]) -> String {
        let mut out = header("Change Effectiveness");

        if results.is_empty() {
            out.push_str("No changes to evaluate.\n");
            return out;
        }

        for result in results {
            let changed = result
                .changed_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            out.push_str(&format!(
                "\n{} {} @ {} — {} ({:+.1})\n",
                "📄".bright_blue(),
                result.project_path.bright_cyan(),
                changed,
                verdict_label(result.verdict),
                result.score,
            ));
            out.push_str(&format!(
                "   sessions {} → {}\n",
                result.before.sessions, result.after.sessions
            ));
            if result.verdict == Verdict::InsufficientData {
                continue;
            }
            let rows = [
                ("friction/session", result.before.friction_rate, result.after.friction_rate),
                ("tool errors/session", result.before.tool_error_rate, result.after.tool_error_rate),
                (
                    "interruptions/session",
                    result.before.interruption_rate,
                    result.after.interruption_rate,
                ),
                (
                    "goal achievement",
                    result.before.goal_achievement_rate,
                    result.after.goal_achievement_rate,
                ),
                ("cost/commit ($)", result.before.cost_per_commit, result.after.cost_per_commit),
            ];
            for (label, before, after) in rows {
                out.push_str(&format!(
                    "   {:<22} {:>8.3} → {:>8.3}  ({:+.3})\n",
                    label,
                    before,
                    after,
                    after - before
                ));
            }
        }

        out
    }
}

fn header(title: &str) -> String {
    format!(
        "\n{}\n{}\n{}\n",
        "=".repeat(80).bright_cyan(),
        title.bright_white().bold(),
        "=".repeat(80).bright_cyan()
    )
}

fn trend_label(trend: Trend) -> String {
    let text = format!("{:<10}", trend.to_string());
    match trend {
        Trend::Improving => text.bright_green().to_string(),
        Trend::Stable => text.normal().to_string(),
        Trend::Worsening => text.bright_red().to_string(),
    }
}

fn verdict_label(verdict: Verdict) -> String {
    let text = verdict.to_string();
    match verdict {
        Verdict::Effective => text.bright_green().bold().to_string(),
        Verdict::Neutral => text.bright_yellow().to_string(),
        Verdict::Regression => text.bright_red().bold().to_string(),
        Verdict::InsufficientData => text.dimmed().to_string(),
    }
}
