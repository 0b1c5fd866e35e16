//! Claude Insights Library
//!
//! Temporal analytics over Claude Code session records and friction facets.
//! The records are produced elsewhere by a log scanner; this library reads
//! them and answers three questions:
//!
//! - **Which friction keeps coming back?** Per-tag week-over-week trends, with
//!   tags seen in three or more trailing weeks without improvement flagged stale
//! - **How confident is work in each project?** A 0–100 score from the balance
//!   of reading and writing tools and how often exploration ends in a commit
//! - **Did a change help?** Before/after comparison of five session metrics
//!   around a change instant, with a weighted impact score and verdict
//!
//! ## Architecture Overview
//!
//! - [`models`] - Input records and the serializable analysis results
//! - [`weeks`], [`trend`], [`stats`] - ISO-week bucketing, trend classification, ratios
//! - [`persistence`] - Friction persistence scorer
//! - [`confidence`] - Tool taxonomy and project confidence scorer
//! - [`effectiveness`] - Change impact scorer and timeline
//! - [`pricing`] - Token cost model used for cost per commit
//! - [`loader`] - JSON / JSONL input loading
//! - [`analyzer`] - Orchestration used by the CLI
//! - [`display`] - Terminal and JSON rendering
//! - [`config`] - Configuration management with environment variable support
//! - [`logging`] - Structured logging with JSON and pretty-print formats
//!
//! The scorers are pure functions of their inputs: no I/O, no clock, no globals.
//!
//! ```rust
//! use claude_insights::{analyze_confidence, SessionRecord, ToolTaxonomy};
//! use std::collections::HashMap;
//!
//! let sessions: Vec<SessionRecord> = (0..2)
//!     .map(|i| SessionRecord {
//!         session_id: format!("s{i}"),
//!         project_path: "/work/app".to_string(),
//!         tool_counts: HashMap::from([("Edit".to_string(), 8), ("Read".to_string(), 2)]),
//!         git_commits: 3,
//!         ..Default::default()
//!     })
//!     .collect();
//!
//! let analysis = analyze_confidence(&sessions, &ToolTaxonomy::default());
//! assert_eq!(analysis.projects.len(), 1);
//! assert!(analysis.projects[0].confidence_score > 70.0);
//! ```

pub mod analyzer;
pub mod confidence;
pub mod config;
pub mod display;
pub mod effectiveness;
pub mod loader;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod pricing;
pub mod stats;
pub mod timestamp_parser;
pub mod trend;
pub mod weeks;

pub use analyzer::InsightsAnalyzer;
pub use confidence::{analyze_confidence, ToolTaxonomy};
pub use effectiveness::{compute_effectiveness, compute_timeline};
pub use models::*;
pub use persistence::analyze_persistence;
pub use pricing::{CostModel, PricingTable};
