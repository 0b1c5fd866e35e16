//! Change Effectiveness Scoring
//!
//! Did a project change (typically an edit to its CLAUDE.md) actually help?
//! Sessions are split at the change instant and five metrics are compared
//! across the split:
//!
//! | Metric | Weight | Better when |
//! |---|---|---|
//! | friction events / session | 30 | lower |
//! | tool errors / session | 20 | lower |
//! | interruptions / session | 20 | lower |
//! | goal-achievement rate | 20 | higher |
//! | cost per commit | 10 | lower |
//!
//! Each metric contributes its weighted percent change, clamped to
//! `[-100, 100]`; the sum is clamped again. A metric whose "before" value is
//! zero has no relative change and contributes nothing.
//!
//! Both sides need at least [`MIN_SESSIONS_PER_SIDE`] sessions, otherwise the
//! verdict is [`Verdict::InsufficientData`].

use crate::models::{
    ChangeEvent, EffectivenessResult, FrictionFacet, MetricDelta, MetricSnapshot, SessionRecord,
    Verdict,
};
use crate::pricing::CostModel;
use crate::stats::{ratio, round_to};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub const MIN_SESSIONS_PER_SIDE: usize = 2;

const FRICTION_WEIGHT: f64 = 30.0;
const TOOL_ERROR_WEIGHT: f64 = 20.0;
const INTERRUPTION_WEIGHT: f64 = 20.0;
const GOAL_WEIGHT: f64 = 20.0;
const COST_PER_COMMIT_WEIGHT: f64 = 10.0;

const SCORE_BOUND: f64 = 100.0;
const EFFECTIVE_THRESHOLD: f64 = 20.0;

type FacetIndex<'a> = HashMap<&'a str, &'a FrictionFacet>;
type OrderedSessions<'a> = Vec<(DateTime<Utc>, &'a SessionRecord)>;

#[derive(Clone, Copy)]
enum Better {
    Lower,
    Higher,
}

/// Score one change instant against a project's sessions.
pub fn compute_effectiveness<C>(
    project: &str,
    changed_at: Option<DateTime<Utc>>,
    sessions: &[SessionRecord],
    facets: &[FrictionFacet],
    cost: &C,
) -> EffectivenessResult
where
    C: CostModel + ?Sized,
{
    let Some(change) = changed_at.filter(|t| t.timestamp() != 0) else {
        return EffectivenessResult::insufficient(project, None);
    };
    if sessions.is_empty() {
        return EffectivenessResult::insufficient(project, Some(change));
    }

    let facet_index = index_facets(facets);
    let ordered = order_by_start(sessions.iter());
    score_change(project, change, &ordered, &facet_index, cost)
}

/// Score every change event, ordering each project's sessions only once.
///
/// Results are sorted by change instant, then project path.
pub fn compute_timeline<C>(
    sessions: &[SessionRecord],
    facets: &[FrictionFacet],
    changes: &[ChangeEvent],
    cost: &C,
) -> Vec<EffectivenessResult>
where
    C: CostModel + Sync + ?Sized,
{
    let facet_index = index_facets(facets);

    let mut by_project: HashMap<&str, Vec<&SessionRecord>> = HashMap::new();
    for session in sessions {
        by_project
            .entry(session.project_path.as_str())
            .or_default()
            .push(session);
    }
    let ordered: HashMap<&str, OrderedSessions> = by_project
        .into_iter()
        .map(|(project, group)| (project, order_by_start(group.into_iter())))
        .collect();

    let evaluate = |change: &ChangeEvent| {
        let project = change.project_path.as_str();
        match ordered.get(project) {
            Some(group) if change.changed_at.timestamp() != 0 => {
                score_change(project, change.changed_at, group, &facet_index, cost)
            }
            _ => EffectivenessResult::insufficient(project, Some(change.changed_at)),
        }
    };

    #[cfg(feature = "parallel")]
    let mut results: Vec<EffectivenessResult> = changes.par_iter().map(evaluate).collect();
    #[cfg(not(feature = "parallel"))]
    let mut results: Vec<EffectivenessResult> = changes.iter().map(evaluate).collect();

    results.sort_by(|a, b| {
        a.changed_at
            .cmp(&b.changed_at)
            .then_with(|| a.project_path.cmp(&b.project_path))
    });
    results
}

fn index_facets(facets: &[FrictionFacet]) -> FacetIndex<'_> {
    let mut index = HashMap::with_capacity(facets.len());
    for facet in facets {
        index.entry(facet.session_id.as_str()).or_insert(facet);
    }
    index
}

/// Sessions with a parseable start time, oldest first. Others are dropped.
fn order_by_start<'a>(sessions: impl Iterator<Item = &'a SessionRecord>) -> OrderedSessions<'a> {
    let mut ordered: OrderedSessions<'a> = sessions
        .filter_map(|session| session.start().map(|start| (start, session)))
        .collect();
    ordered.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.session_id.cmp(&b.1.session_id)));
    ordered
}

fn score_change<C>(
    project: &str,
    change: DateTime<Utc>,
    ordered: &[(DateTime<Utc>, &SessionRecord)],
    facets: &FacetIndex<'_>,
    cost: &C,
) -> EffectivenessResult
where
    C: CostModel + ?Sized,
{
    let split = ordered.partition_point(|(start, _)| *start < change);
    let (before, after) = ordered.split_at(split);

    debug!(
        project,
        changed_at = %change,
        before = before.len(),
        after = after.len(),
        "Splitting sessions at change"
    );

    if before.len() < MIN_SESSIONS_PER_SIDE || after.len() < MIN_SESSIONS_PER_SIDE {
        let mut result = EffectivenessResult::insufficient(project, Some(change));
        result.before.sessions = before.len();
        result.after.sessions = after.len();
        return result;
    }

    let before = snapshot(before, facets, cost);
    let after = snapshot(after, facets, cost);
    // The verdict reads the same rounded value that is reported.
    let score = round_to(impact_score(&before, &after), 1);
    let delta = MetricDelta {
        friction_rate: round_to(after.friction_rate - before.friction_rate, 3),
        tool_error_rate: round_to(after.tool_error_rate - before.tool_error_rate, 3),
        interruption_rate: round_to(after.interruption_rate - before.interruption_rate, 3),
        goal_achievement_rate: round_to(
            after.goal_achievement_rate - before.goal_achievement_rate,
            3,
        ),
        cost_per_commit: round_to(after.cost_per_commit - before.cost_per_commit, 3),
    };

    EffectivenessResult {
        project_path: project.to_string(),
        changed_at: Some(change),
        before: rounded(before),
        after: rounded(after),
        delta,
        score,
        verdict: verdict_for(score),
    }
}

fn snapshot<C>(
    group: &[(DateTime<Utc>, &SessionRecord)],
    facets: &FacetIndex<'_>,
    cost: &C,
) -> MetricSnapshot
where
    C: CostModel + ?Sized,
{
    let mut friction_events = 0.0;
    let mut with_facet = 0usize;
    let mut goal_met = 0usize;
    let mut with_outcome = 0usize;
    let mut tool_errors = 0.0;
    let mut interruptions = 0.0;
    let mut total_cost = 0.0;
    let mut commits = 0.0;

    for (_, session) in group {
        tool_errors += f64::from(session.tool_errors);
        interruptions += f64::from(session.user_interruptions);
        total_cost += cost.cost(session);
        commits += f64::from(session.git_commits);

        if let Some(facet) = facets.get(session.session_id.as_str()) {
            with_facet += 1;
            friction_events += facet.friction_events() as f64;
            if let Some(outcome) = facet.outcome() {
                with_outcome += 1;
                if outcome.is_goal_met() {
                    goal_met += 1;
                }
            }
        }
    }

    let sessions = group.len() as f64;
    MetricSnapshot {
        sessions: group.len(),
        friction_rate: ratio(friction_events, with_facet as f64),
        tool_error_rate: ratio(tool_errors, sessions),
        interruption_rate: ratio(interruptions, sessions),
        goal_achievement_rate: ratio(goal_met as f64, with_outcome as f64),
        cost_per_commit: ratio(total_cost, commits),
    }
}

/// Signed impact in `[-100, 100]`; positive means the change helped.
pub fn impact_score(before: &MetricSnapshot, after: &MetricSnapshot) -> f64 {
    let terms = [
        (before.friction_rate, after.friction_rate, FRICTION_WEIGHT, Better::Lower),
        (before.tool_error_rate, after.tool_error_rate, TOOL_ERROR_WEIGHT, Better::Lower),
        (
            before.interruption_rate,
            after.interruption_rate,
            INTERRUPTION_WEIGHT,
            Better::Lower,
        ),
        (
            before.goal_achievement_rate,
            after.goal_achievement_rate,
            GOAL_WEIGHT,
            Better::Higher,
        ),
        (
            before.cost_per_commit,
            after.cost_per_commit,
            COST_PER_COMMIT_WEIGHT,
            Better::Lower,
        ),
    ];

    terms
        .iter()
        .map(|&(before, after, weight, better)| weighted_term(before, after, weight, better))
        .sum::<f64>()
        .clamp(-SCORE_BOUND, SCORE_BOUND)
}

fn weighted_term(before: f64, after: f64, weight: f64, better: Better) -> f64 {
    // No baseline, no relative change.
    if before == 0.0 {
        return 0.0;
    }
    let percent_change = (after - before) / before * 100.0;
    let signed = match better {
        Better::Lower => -percent_change,
        Better::Higher => percent_change,
    };
    (signed * weight).clamp(-SCORE_BOUND, SCORE_BOUND)
}

pub fn verdict_for(score: f64) -> Verdict {
    if score >= EFFECTIVE_THRESHOLD {
        Verdict::Effective
    } else if score >= 0.0 {
        Verdict::Neutral
    } else {
        Verdict::Regression
    }
}

fn rounded(snapshot: MetricSnapshot) -> MetricSnapshot {
    MetricSnapshot {
        sessions: snapshot.sessions,
        friction_rate: round_to(snapshot.friction_rate, 3),
        tool_error_rate: round_to(snapshot.tool_error_rate, 3),
        interruption_rate: round_to(snapshot.interruption_rate, 3),
        goal_achievement_rate: round_to(snapshot.goal_achievement_rate, 3),
        cost_per_commit: round_to(snapshot.cost_per_commit, 3),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session(id: &str, project: &str, start: &str, errors: u32) -> SessionRecord {
        SessionRecord {
            session_id: id.to_string(),
            project_path: project.to_string(),
            start_time: start.to_string(),
            tool_errors: errors,
            ..Default::default()
        }
    }

    fn change() -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap())
    }

    fn no_cost(_: &SessionRecord) -> f64 {
        0.0
    }

    #[test]
    fn test_unset_change_is_insufficient() {
        let sessions = vec![session("s1", "/p", "2025-01-01T00:00:00Z", 1)];
        let result = compute_effectiveness("/p", None, &sessions, &[], &no_cost);
        assert_eq!(result.verdict, Verdict::InsufficientData);

        let epoch = Some(Utc.timestamp_opt(0, 0).unwrap());
        let result = compute_effectiveness("/p", epoch, &sessions, &[], &no_cost);
        assert_eq!(result.verdict, Verdict::InsufficientData);
    }

    #[test]
    fn test_one_session_before_is_insufficient() {
        let sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 9),
            session("a1", "/p", "2025-02-10T00:00:00Z", 0),
            session("a2", "/p", "2025-02-11T00:00:00Z", 0),
            session("a3", "/p", "2025-02-12T00:00:00Z", 0),
        ];
        let result = compute_effectiveness("/p", change(), &sessions, &[], &no_cost);
        assert_eq!(result.verdict, Verdict::InsufficientData);
        assert_eq!(result.before.sessions, 1);
        assert_eq!(result.after.sessions, 3);
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn test_unparseable_sessions_are_dropped() {
        let sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 5),
            session("b2", "/p", "garbage", 5),
            session("a1", "/p", "2025-02-10T00:00:00Z", 1),
            session("a2", "/p", "2025-02-11T00:00:00Z", 1),
        ];
        let result = compute_effectiveness("/p", change(), &sessions, &[], &no_cost);
        assert_eq!(result.verdict, Verdict::InsufficientData);
    }

    #[test]
    fn test_fewer_tool_errors_is_effective() {
        let sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 5),
            session("b2", "/p", "2025-01-11T00:00:00Z", 5),
            session("a1", "/p", "2025-02-10T00:00:00Z", 1),
            session("a2", "/p", "2025-02-11T00:00:00Z", 1),
        ];
        let result = compute_effectiveness("/p", change(), &sessions, &[], &no_cost);
        assert!(result.score > 0.0);
        assert_eq!(result.verdict, Verdict::Effective);
        assert_eq!(result.before.tool_error_rate, 5.0);
        assert_eq!(result.after.tool_error_rate, 1.0);
        assert_eq!(result.delta.tool_error_rate, -4.0);
    }

    #[test]
    fn test_more_friction_is_regression() {
        let sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 0),
            session("b2", "/p", "2025-01-11T00:00:00Z", 0),
            session("a1", "/p", "2025-02-10T00:00:00Z", 0),
            session("a2", "/p", "2025-02-11T00:00:00Z", 0),
        ];
        let facet = |id: &str, events: u32| FrictionFacet {
            session_id: id.to_string(),
            friction_counts: HashMap::from([("wrong_approach".to_string(), events)]),
            ..Default::default()
        };
        let facets = vec![facet("b1", 1), facet("b2", 1), facet("a1", 3), facet("a2", 3)];

        let result = compute_effectiveness("/p", change(), &sessions, &facets, &no_cost);
        assert_eq!(result.verdict, Verdict::Regression);
        assert_eq!(result.score, -100.0);
    }

    #[test]
    fn test_friction_rate_ignores_sessions_without_facets() {
        let sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 0),
            session("b2", "/p", "2025-01-11T00:00:00Z", 0),
            session("a1", "/p", "2025-02-10T00:00:00Z", 0),
            session("a2", "/p", "2025-02-11T00:00:00Z", 0),
        ];
        let facets = vec![FrictionFacet {
            session_id: "b1".to_string(),
            friction_counts: HashMap::from([("slow".to_string(), 4)]),
            outcome: "achieved".to_string(),
            ..Default::default()
        }];
        let result = compute_effectiveness("/p", change(), &sessions, &facets, &no_cost);
        assert_eq!(result.before.friction_rate, 4.0);
        assert_eq!(result.before.goal_achievement_rate, 1.0);
        assert_eq!(result.before.sessions, 2);
        assert_eq!(result.after.friction_rate, 0.0);
    }

    #[test]
    fn test_cost_per_commit_uses_injected_cost() {
        let mut sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 0),
            session("b2", "/p", "2025-01-11T00:00:00Z", 0),
            session("a1", "/p", "2025-02-10T00:00:00Z", 0),
            session("a2", "/p", "2025-02-11T00:00:00Z", 0),
        ];
        for s in &mut sessions {
            s.git_commits = 2;
        }
        let cost = |s: &SessionRecord| if s.session_id.starts_with('b') { 4.0 } else { 1.0 };
        let result = compute_effectiveness("/p", change(), &sessions, &[], &cost);
        assert_eq!(result.before.cost_per_commit, 2.0);
        assert_eq!(result.after.cost_per_commit, 0.5);
        assert_eq!(result.verdict, Verdict::Effective);
    }

    fn commit_sessions() -> Vec<SessionRecord> {
        let mut sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 0),
            session("b2", "/p", "2025-01-11T00:00:00Z", 0),
            session("a1", "/p", "2025-02-10T00:00:00Z", 0),
            session("a2", "/p", "2025-02-11T00:00:00Z", 0),
        ];
        for s in &mut sessions {
            s.git_commits = 1;
        }
        sessions
    }

    #[test]
    fn test_verdict_follows_reported_score_at_threshold() {
        // Cost per commit 1.0 -> 0.98004 is a 19.96 point improvement.
        let cost = |s: &SessionRecord| if s.session_id.starts_with('b') { 1.0 } else { 0.98004 };
        let result = compute_effectiveness("/p", change(), &commit_sessions(), &[], &cost);
        assert_eq!(result.score, 20.0);
        assert_eq!(result.verdict, Verdict::Effective);
    }

    #[test]
    fn test_tiny_regression_reports_zero_and_neutral() {
        let cost = |s: &SessionRecord| if s.session_id.starts_with('b') { 1.0 } else { 1.00004 };
        let result = compute_effectiveness("/p", change(), &commit_sessions(), &[], &cost);
        assert_eq!(result.score, 0.0);
        assert!(result.score.is_sign_positive());
        assert_eq!(result.verdict, Verdict::Neutral);
    }

    #[test]
    fn test_zero_baseline_contributes_nothing() {
        let before = MetricSnapshot {
            sessions: 2,
            ..Default::default()
        };
        let after = MetricSnapshot {
            sessions: 2,
            friction_rate: 5.0,
            tool_error_rate: 3.0,
            ..Default::default()
        };
        assert_eq!(impact_score(&before, &after), 0.0);
    }

    #[test]
    fn test_verdict_thresholds() {
        assert_eq!(verdict_for(20.0), Verdict::Effective);
        assert_eq!(verdict_for(19.9), Verdict::Neutral);
        assert_eq!(verdict_for(0.0), Verdict::Neutral);
        assert_eq!(verdict_for(-0.1), Verdict::Regression);
    }

    #[test]
    fn test_timeline_sorted_by_change_instant() {
        let sessions = vec![
            session("b1", "/p", "2025-01-10T00:00:00Z", 5),
            session("b2", "/p", "2025-01-11T00:00:00Z", 5),
            session("a1", "/p", "2025-02-10T00:00:00Z", 1),
            session("a2", "/p", "2025-02-11T00:00:00Z", 1),
        ];
        let changes = vec![
            ChangeEvent {
                project_path: "/p".to_string(),
                changed_at: Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap(),
            },
            ChangeEvent {
                project_path: "/unknown".to_string(),
                changed_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            },
        ];
        let timeline = compute_timeline(&sessions, &[], &changes, &no_cost);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].project_path, "/unknown");
        assert_eq!(timeline[0].verdict, Verdict::InsufficientData);
        assert_eq!(timeline[1].project_path, "/p");
        assert_eq!(timeline[1].verdict, Verdict::Effective);
    }
}
