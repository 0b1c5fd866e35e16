//! Friction Persistence Tracking
//!
//! Follows each friction tag across the weeks covered by the loaded facets and
//! answers two questions: is the tag getting better or worse, and has it been
//! hanging around long enough to count as stale?
//!
//! ## Pipeline
//!
//! 1. **Join**: facets are matched to session start times by session id. Facets
//!    without a resolvable timestamp are dropped and never enter a denominator.
//! 2. **Axis**: a gap-free weekly axis from the earliest to the latest joined session
//! 3. **Alignment**: per tag, the number of sessions carrying it in each week
//! 4. **Classification**: [`compute_trend`] over the aligned series, plus the run of
//!    trailing weeks in which the tag was present
//!
//! A tag is **stale** when it was present in at least [`STALE_MIN_WEEKS`] trailing
//! weeks and its trend is not improving. Stale tags are listed first.

use crate::models::{FrictionFacet, FrictionPersistence, PersistenceAnalysis, SessionRecord, Trend};
use crate::stats::{ratio, round_to};
use crate::trend::compute_trend;
use crate::weeks::{week_key, weeks_between, WeekKey};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Trailing weeks of presence before a non-improving tag is stale.
pub const STALE_MIN_WEEKS: usize = 3;

struct TagAccumulator {
    weekly_counts: Vec<usize>,
    first_seen: DateTime<Utc>,
    last_seen: DateTime<Utc>,
    occurrences: usize,
}

impl TagAccumulator {
    fn new(weeks: usize, seen: DateTime<Utc>) -> Self {
        Self {
            weekly_counts: vec![0; weeks],
            first_seen: seen,
            last_seen: seen,
            occurrences: 0,
        }
    }

    fn record(&mut self, week_index: usize, seen: DateTime<Utc>) {
        self.weekly_counts[week_index] += 1;
        self.occurrences += 1;
        self.first_seen = self.first_seen.min(seen);
        self.last_seen = self.last_seen.max(seen);
    }
}

pub fn analyze_persistence(
    sessions: &[SessionRecord],
    facets: &[FrictionFacet],
) -> PersistenceAnalysis {
    let mut started_at: HashMap<&str, DateTime<Utc>> = HashMap::with_capacity(sessions.len());
    for session in sessions {
        if let Some(start) = session.start() {
            started_at.entry(session.session_id.as_str()).or_insert(start);
        }
    }

    // First facet wins when a session id repeats.
    let mut seen: HashSet<&str> = HashSet::with_capacity(facets.len());
    let joined: Vec<(DateTime<Utc>, &FrictionFacet)> = facets
        .iter()
        .filter(|facet| seen.insert(facet.session_id.as_str()))
        .filter_map(|facet| {
            started_at
                .get(facet.session_id.as_str())
                .map(|&start| (start, facet))
        })
        .collect();

    debug!(
        facets = facets.len(),
        joined = joined.len(),
        dropped = facets.len() - joined.len(),
        "Joined facets to session start times"
    );

    let (Some(earliest), Some(latest)) = (
        joined.iter().map(|(start, _)| *start).min(),
        joined.iter().map(|(start, _)| *start).max(),
    ) else {
        return PersistenceAnalysis::default();
    };

    let axis = weeks_between(earliest, latest);
    let week_index: HashMap<WeekKey, usize> =
        axis.iter().enumerate().map(|(i, &week)| (week, i)).collect();

    let mut accumulators: BTreeMap<&str, TagAccumulator> = BTreeMap::new();
    for &(start, facet) in &joined {
        let Some(&index) = week_index.get(&week_key(start)) else {
            continue;
        };
        for tag in facet.present_tags() {
            accumulators
                .entry(tag)
                .or_insert_with(|| TagAccumulator::new(axis.len(), start))
                .record(index, start);
        }
    }

    let total_sessions = joined.len();
    let tags: Vec<(&str, TagAccumulator)> = accumulators.into_iter().collect();

    #[cfg(feature = "parallel")]
    let mut patterns: Vec<FrictionPersistence> = tags
        .into_par_iter()
        .map(|(tag, acc)| finish_tag(tag, acc, total_sessions))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let mut patterns: Vec<FrictionPersistence> = tags
        .into_iter()
        .map(|(tag, acc)| finish_tag(tag, acc, total_sessions))
        .collect();

    patterns.sort_by(compare_patterns);

    let mut analysis = PersistenceAnalysis {
        total_sessions,
        window_start: Some(earliest),
        window_end: Some(latest),
        ..Default::default()
    };
    for pattern in &patterns {
        if pattern.stale {
            analysis.stale_count += 1;
        } else if pattern.trend == Trend::Improving {
            analysis.improving_count += 1;
        } else if pattern.trend == Trend::Worsening {
            analysis.worsening_count += 1;
        }
    }
    analysis.patterns = patterns;

    debug!(
        weeks = axis.len(),
        tags = analysis.patterns.len(),
        stale = analysis.stale_count,
        "Friction persistence computed"
    );

    analysis
}

fn finish_tag(tag: &str, acc: TagAccumulator, total_sessions: usize) -> FrictionPersistence {
    let trend = compute_trend(&acc.weekly_counts);
    let consecutive_weeks = acc
        .weekly_counts
        .iter()
        .rev()
        .take_while(|&&count| count > 0)
        .count();
    let stale = consecutive_weeks >= STALE_MIN_WEEKS && trend != Trend::Improving;

    FrictionPersistence {
        tag: tag.to_string(),
        first_seen: acc.first_seen,
        last_seen: acc.last_seen,
        occurrences: acc.occurrences,
        total_sessions,
        frequency: round_to(ratio(acc.occurrences as f64, total_sessions as f64), 3),
        trend,
        consecutive_weeks,
        stale,
        weekly_counts: acc.weekly_counts,
    }
}

fn compare_patterns(a: &FrictionPersistence, b: &FrictionPersistence) -> Ordering {
    b.stale
        .cmp(&a.stale)
        .then_with(|| b.frequency.partial_cmp(&a.frequency).unwrap_or(Ordering::Equal))
        .then_with(|| a.tag.cmp(&b.tag))
}
