use serde::Serialize;

use crate::types::{Dimension, IncidentRecord};

/// Running Count-weighted totals for one bucket of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WeightedStats {
    /// Σ Count
    pub size: f64,
    /// Σ Hours·Count
    pub total_hours: f64,
}

impl WeightedStats {
    pub fn add(&mut self, record: &IncidentRecord) {
        self.size += record.count;
        self.total_hours += record.weighted_hours();
    }

    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a IncidentRecord>,
    {
        let mut stats = Self::default();
        for row in rows {
            stats.add(row);
        }
        stats
    }

    /// Count-weighted mean duration. 0 for an empty or zero-count bucket.
    pub fn hours(&self) -> f64 {
        weighted_mean(self.total_hours, self.size)
    }
}

/// `total / size`, or 0 when `size` is not positive.
pub fn weighted_mean(total: f64, size: f64) -> f64 {
    if size > 0.0 {
        total / size
    } else {
        0.0
    }
}

/// Per-key incident statistics, the unit the narrative prompts are built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyStats {
    pub key: String,
    pub count: f64,
    pub avg_hours: f64,
}

/// Group rows by an arbitrary key and compute Count and weighted average Hours.
///
/// Keys keep first-appearance order so that later stable sorts break ties
/// the same way every run.
pub fn compute_stats_by<'a, I, F>(rows: I, key: F) -> Vec<KeyStats>
where
    I: IntoIterator<Item = &'a IncidentRecord>,
    F: Fn(&IncidentRecord) -> &str,
{
    let mut order: Vec<String> = Vec::new();
    let mut buckets: std::collections::HashMap<String, WeightedStats> =
        std::collections::HashMap::new();
    for row in rows {
        let k = key(row);
        let entry = buckets.entry(k.to_string()).or_insert_with(|| {
            order.push(k.to_string());
            WeightedStats::default()
        });
        entry.add(row);
    }

    order
        .into_iter()
        .map(|k| {
            let stats = buckets.get(&k).copied().unwrap_or_default();
            KeyStats {
                key: k,
                count: stats.size,
                avg_hours: stats.hours(),
            }
        })
        .collect()
}

pub fn compute_stats<'a, I>(rows: I, dimension: Dimension) -> Vec<KeyStats>
where
    I: IntoIterator<Item = &'a IncidentRecord>,
{
    compute_stats_by(rows, |r| r.value(dimension))
}

/// The `k` buckets with the largest Count, ties in input order.
pub fn top_by_count(mut stats: Vec<KeyStats>, k: usize) -> Vec<KeyStats> {
    stats.sort_by(|a, b| b.count.total_cmp(&a.count));
    stats.truncate(k);
    stats
}

/// The `k` buckets with the longest weighted duration, ties in input order.
pub fn top_by_hours(mut stats: Vec<KeyStats>, k: usize) -> Vec<KeyStats> {
    stats.sort_by(|a, b| b.avg_hours.total_cmp(&a.avg_hours));
    stats.truncate(k);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(service: &str, count: f64, hours: f64) -> IncidentRecord {
        IncidentRecord {
            service: service.to_string(),
            count,
            hours,
            ..Default::default()
        }
    }

    #[test]
    fn test_weighted_mean_guard() {
        assert_eq!(weighted_mean(10.0, 0.0), 0.0);
        assert_eq!(WeightedStats::default().hours(), 0.0);
    }

    #[test]
    fn test_weighted_not_simple_average() {
        let rows = [row("X", 10.0, 2.0), row("X", 5.0, 8.0)];
        let stats = WeightedStats::from_rows(&rows);
        assert_eq!(stats.size, 15.0);
        assert!((stats.hours() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_compute_stats_groups_and_orders() {
        let rows = [
            row("B", 1.0, 1.0),
            row("A", 2.0, 3.0),
            row("B", 3.0, 5.0),
        ];
        let stats = compute_stats(&rows, Dimension::Service);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].key, "B");
        assert_eq!(stats[0].count, 4.0);
        assert!((stats[0].avg_hours - 4.0).abs() < 1e-12);
        assert_eq!(stats[1].key, "A");
    }

    #[test]
    fn test_zero_count_bucket_has_zero_hours() {
        let rows = [row("Z", 0.0, 7.0)];
        let stats = compute_stats(&rows, Dimension::Service);
        assert_eq!(stats[0].avg_hours, 0.0);
        assert!(!stats[0].avg_hours.is_nan());
    }

    #[test]
    fn test_top_by_count_and_hours() {
        let stats = vec![
            KeyStats {
                key: "a".into(),
                count: 1.0,
                avg_hours: 9.0,
            },
            KeyStats {
                key: "b".into(),
                count: 5.0,
                avg_hours: 1.0,
            },
            KeyStats {
                key: "c".into(),
                count: 5.0,
                avg_hours: 2.0,
            },
        ];
        let by_count = top_by_count(stats.clone(), 2);
        assert_eq!(
            by_count.iter().map(|s| s.key.as_str()).collect::<Vec<_>>(),
            ["b", "c"]
        );
        let by_hours = top_by_hours(stats, 1);
        assert_eq!(by_hours[0].key, "a");
    }
}
