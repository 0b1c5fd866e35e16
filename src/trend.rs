use crate::models::Trend;

/// Relative change between halves that still counts as flat.
const STABLE_BAND: f64 = 0.10;

/// Points always assigned to the "later" half once the series is long enough.
const RECENT_WINDOW: usize = 2;

/// Classify a chronological series of weekly counts.
///
/// The later half is pinned to the last two weeks so one bad recent week is
/// not diluted by a long quiet history. Shorter series split at
/// `max(1, n - 2)`.
pub fn compute_trend(counts: &[usize]) -> Trend {
    let n = counts.len();
    if n < 2 {
        return Trend::Stable;
    }

    let split = n.saturating_sub(RECENT_WINDOW).max(1);
    let (earlier, later) = counts.split_at(split);
    let earlier_mean = mean(earlier);
    let later_mean = mean(later);

    if earlier_mean == 0.0 && later_mean == 0.0 {
        return Trend::Stable;
    }
    if earlier_mean == 0.0 {
        return Trend::Worsening;
    }

    let change = (later_mean - earlier_mean) / earlier_mean;
    if change < -STABLE_BAND {
        Trend::Improving
    } else if change > STABLE_BAND {
        Trend::Worsening
    } else {
        Trend::Stable
    }
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<usize>() as f64 / values.len() as f64
}
