use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::{Dimension, IncidentRecord};

/// For every selected primary value, pick its `per_primary` secondary values
/// with the largest summed Count, and return the union.
///
/// Ties keep first-appearance order in `rows`. The whole derivation is
/// recomputed from scratch on every call.
pub fn select_top_related(
    rows: &[IncidentRecord],
    primary: Dimension,
    secondary: Dimension,
    selected_primary: &HashSet<&str>,
    per_primary: usize,
) -> BTreeSet<String> {
    let mut result = BTreeSet::new();
    if selected_primary.is_empty() || per_primary == 0 {
        return result;
    }

    // primary -> [(secondary, Σ Count)] in first-appearance order
    let mut grouped: HashMap<&str, Vec<(&str, f64)>> = HashMap::new();
    for row in rows {
        let p = row.value(primary);
        if !selected_primary.contains(p) {
            continue;
        }
        let entries = grouped.entry(p).or_default();
        let s = row.value(secondary);
        match entries.iter_mut().find(|(name, _)| *name == s) {
            Some((_, total)) => *total += row.count,
            None => entries.push((s, row.count)),
        }
    }

    for (_, mut entries) in grouped {
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        result.extend(entries.into_iter().take(per_primary).map(|(s, _)| s.to_string()));
    }
    result
}

/// Top teams per selected service.
pub fn select_top_teams(
    rows: &[IncidentRecord],
    selected_services: &HashSet<&str>,
    per_service: usize,
) -> BTreeSet<String> {
    select_top_related(
        rows,
        Dimension::Service,
        Dimension::Team,
        selected_services,
        per_service,
    )
}
