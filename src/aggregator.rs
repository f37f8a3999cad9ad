//! Result Aggregator (C6, §4.6).
//!
//! Consumes the executor's arrival-order outcome list, restores registry
//! order, deduplicates hits by normalised `final_url`, groups by
//! category, and tallies the stats counters.

use crate::classifier::ProbeState;
use crate::executor::ProbeOutcome;
use crate::registry::{Probe, ProbeRegistry};
use serde::Serialize;
use std::collections::BTreeMap;

/// One `present` outcome as it appears in the final report (§3
/// `ScanReport.hits`).
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub probe_id: String,
    pub display_name: String,
    pub category: String,
    pub final_url: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Stats {
    pub attempted: usize,
    pub present: usize,
    pub absent: usize,
    pub indeterminate: usize,
    pub error: usize,
}

pub struct AggregatedResult {
    pub hits: Vec<Hit>,
    pub by_category: BTreeMap<String, Vec<Hit>>,
    pub stats: Stats,
}

/// `final_url`, case-folded and with a trailing slash stripped, as the
/// dedup key (§4.6).
fn normalize_url(url: &str) -> String {
    url.trim_end_matches('/').to_ascii_lowercase()
}

pub fn aggregate(registry: &ProbeRegistry, outcomes: Vec<ProbeOutcome>) -> AggregatedResult {
    let mut stats = Stats::default();
    let mut positioned: Vec<(usize, ProbeOutcome, &Probe)> = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        stats.attempted += 1;
        match outcome.state {
            ProbeState::Present => stats.present += 1,
            ProbeState::Absent => stats.absent += 1,
            ProbeState::Indeterminate => stats.indeterminate += 1,
            ProbeState::Error => stats.error += 1,
        }
        if let Ok(probe) = registry.lookup(&outcome.probe_id) {
            let position = registry.position(&outcome.probe_id).unwrap_or(usize::MAX);
            positioned.push((position, outcome, probe));
        }
    }

    positioned.sort_by_key(|(position, _, _)| *position);

    let mut hits = Vec::new();
    let mut seen_urls = std::collections::HashSet::new();
    for (_, outcome, probe) in &positioned {
        if outcome.state != ProbeState::Present {
            continue;
        }
        let key = normalize_url(&outcome.final_url);
        if !seen_urls.insert(key) {
            continue;
        }
        hits.push(Hit {
            probe_id: probe.id.to_string(),
            display_name: probe.display_name.to_string(),
            category: probe.category.to_string(),
            final_url: outcome.final_url.clone(),
        });
    }

    let mut by_category: BTreeMap<String, Vec<Hit>> = BTreeMap::new();
    for hit in &hits {
        by_category
            .entry(hit.category.clone())
            .or_default()
            .push(hit.clone());
    }

    AggregatedResult {
        hits,
        by_category,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::IdentifierKind;
    use crate::registry::{ProbeRegistry, SelectFilter};

    fn outcome(probe_id: &str, state: ProbeState, final_url: &str) -> ProbeOutcome {
        ProbeOutcome {
            probe_id: probe_id.to_string(),
            state,
            final_url: final_url.to_string(),
            latency_ms: 1,
            diagnostic: None,
        }
    }

    #[test]
    fn restores_registry_order_regardless_of_arrival_order() {
        let registry = ProbeRegistry::build().unwrap();
        let subset = registry.select(IdentifierKind::Username, crate::registry::ScanMode::Deep, &SelectFilter::default());
        assert!(subset.len() >= 2);
        let first = subset[0].id.to_string();
        let second = subset[1].id.to_string();

        // Arrival order: second completes before first.
        let outcomes = vec![
            outcome(&second, ProbeState::Present, "https://x.example/second"),
            outcome(&first, ProbeState::Present, "https://x.example/first"),
        ];
        let result = aggregate(&registry, outcomes);
        assert_eq!(result.hits[0].probe_id, first);
        assert_eq!(result.hits[1].probe_id, second);
    }

    #[test]
    fn dedups_trailing_slash_and_case() {
        let registry = ProbeRegistry::build().unwrap();
        let subset = registry.select(IdentifierKind::Username, crate::registry::ScanMode::Deep, &SelectFilter::default());
        let first = subset[0].id.to_string();
        let second = subset[1].id.to_string();

        let outcomes = vec![
            outcome(&first, ProbeState::Present, "https://A.example/alice/"),
            outcome(&second, ProbeState::Present, "https://a.example/alice"),
        ];
        let result = aggregate(&registry, outcomes);
        assert_eq!(result.hits.len(), 1);
        assert_eq!(result.hits[0].probe_id, first);
    }

    #[test]
    fn stats_counters_match_outcome_states() {
        let registry = ProbeRegistry::build().unwrap();
        let subset = registry.select(IdentifierKind::Username, crate::registry::ScanMode::Deep, &SelectFilter::default());
        let outcomes = vec![
            outcome(subset[0].id, ProbeState::Present, "https://x.example/a"),
            outcome(subset[1].id, ProbeState::Absent, "https://x.example/b"),
            outcome(subset[2].id, ProbeState::Error, "https://x.example/c"),
        ];
        let result = aggregate(&registry, outcomes);
        assert_eq!(result.stats.attempted, 3);
        assert_eq!(result.stats.present, 1);
        assert_eq!(result.stats.absent, 1);
        assert_eq!(result.stats.error, 1);
    }

    #[test]
    fn by_category_groups_hits() {
        let registry = ProbeRegistry::build().unwrap();
        let subset = registry.select(IdentifierKind::Username, crate::registry::ScanMode::Deep, &SelectFilter::default());
        let outcomes: Vec<_> = subset
            .iter()
            .map(|p| outcome(p.id, ProbeState::Present, &format!("https://x.example/{}", p.id)))
            .collect();
        let result = aggregate(&registry, outcomes);
        let total_in_categories: usize = result.by_category.values().map(|v| v.len()).sum();
        assert_eq!(total_in_categories, result.hits.len());
    }
}
