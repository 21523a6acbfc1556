use serde::Serialize;

const LOW_PERCENTILE: f64 = 0.05;
const HIGH_PERCENTILE: f64 = 0.95;

/// Anything that carries a volume and a weighted duration and can be ranked.
pub trait Ranked {
    fn size(&self) -> f64;
    fn hours(&self) -> f64;
    fn set_rank(&mut self, cumulative: f64, percent_rank: f64);
}

/// Duration values at the 5th and 95th volume-weighted percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileBounds {
    pub p5_hours: f64,
    pub p95_hours: f64,
}

impl PercentileBounds {
    pub fn midpoint(&self) -> f64 {
        (self.p5_hours + self.p95_hours) / 2.0
    }

    /// True when the bounds collapse to a single value.
    pub fn is_degenerate(&self) -> bool {
        (self.p95_hours - self.p5_hours).abs() < f64::EPSILON
    }
}

/// Rank items by ascending `hours` without reordering them.
///
/// Each item gets its cumulative size share and `percent_rank = pos / (n - 1)`
/// (0 for a single item). Returns the duration bounds, or `None` when there
/// is nothing to rank. When total size is 0 every cumulative share is 0 and
/// the bounds are the min and max durations.
pub fn rank_by_hours<T: Ranked>(items: &mut [T]) -> Option<PercentileBounds> {
    let n = items.len();
    if n == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| items[a].hours().total_cmp(&items[b].hours()));

    let total: f64 = items.iter().map(|i| i.size().max(0.0)).sum();
    let mut cumulative = 0.0;
    let mut p5: Option<f64> = None;
    let mut p95: Option<f64> = None;

    for (pos, &idx) in order.iter().enumerate() {
        if total > 0.0 {
            cumulative += items[idx].size().max(0.0) / total;
        }
        let percent_rank = if n > 1 {
            pos as f64 / (n - 1) as f64
        } else {
            0.0
        };
        items[idx].set_rank(cumulative, percent_rank);

        let hours = items[idx].hours();
        if p5.is_none() && cumulative >= LOW_PERCENTILE {
            p5 = Some(hours);
        }
        if cumulative <= HIGH_PERCENTILE {
            p95 = Some(hours);
        }
    }

    let min_hours = items[order[0]].hours();
    let max_hours = items[order[n - 1]].hours();
    let bounds = PercentileBounds {
        p5_hours: p5.unwrap_or(min_hours),
        p95_hours: if total > 0.0 {
            p95.unwrap_or(min_hours)
        } else {
            max_hours
        },
    };
    tracing::debug!(
        items = n,
        p5 = bounds.p5_hours,
        p95 = bounds.p95_hours,
        "百分位排名完成"
    );
    Some(bounds)
}
