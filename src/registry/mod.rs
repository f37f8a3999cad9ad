//! The Probe Registry (C1, §4.1).
//!
//! Built once at process start from the native tables in `registry::data`,
//! validated at construction, and shared read-only for the rest of the
//! process. See §9 "duplicate module files with divergent logic" — this
//! is deliberately the single source of truth; there is no second probe
//! list anywhere else in the crate.

mod data;

use crate::classifier::DecisionRule;
use crate::error::RegistryError;
use crate::identifier::IdentifierKind;
use serde::Serialize;

/// Subset selector governing how many probes a scan runs (§5 deadlines,
/// §4.1 selection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    Quick,
    Deep,
}

impl std::str::FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(ScanMode::Quick),
            "deep" => Ok(ScanMode::Deep),
            other => Err(format!("unknown scan mode: {other}")),
        }
    }
}

/// Whether a probe belongs to the curated `quick` subset. `Deep` is not a
/// tier in itself — the deep subset is simply every probe for a kind,
/// regardless of tier (resolved Open Question, §9: quick is a curated
/// subset authored at ingest time, deep is the full union).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Quick,
    Deep,
}

/// One reachable endpoint descriptor (§3 `Probe`).
#[derive(Debug, Clone)]
pub struct Probe {
    pub id: &'static str,
    pub display_name: &'static str,
    pub identifier_kind: IdentifierKind,
    pub category: &'static str,
    pub url_template: &'static str,
    pub method: Method,
    pub body_template: Option<&'static str>,
    pub headers: &'static [(&'static str, &'static str)],
    pub decision: DecisionRule,
    pub tier: Tier,
    pub nsfw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Filters applied on top of `(kind, mode)` when selecting a subset
/// (§4.1 `select`).
#[derive(Debug, Clone, Default)]
pub struct SelectFilter<'a> {
    pub include_categories: Option<&'a [String]>,
    pub exclude_categories: &'a [String],
    pub include_nsfw: bool,
}

/// The built, validated catalogue. Read-only after construction; safe to
/// share across every worker without synchronisation (§5).
pub struct ProbeRegistry {
    probes: Vec<Probe>,
}

impl ProbeRegistry {
    /// Build the canonical registry from the native probe tables,
    /// validating every invariant up front. Process start should treat a
    /// failure here as fatal — there is no partially-valid registry.
    pub fn build() -> Result<Self, RegistryError> {
        let mut probes = Vec::new();
        probes.extend(data::username::probes());
        probes.extend(data::email::probes());
        probes.extend(data::phone::probes());
        probes.extend(data::domain::probes());
        Self::validate(&probes)?;
        Ok(Self { probes })
    }

    fn validate(probes: &[Probe]) -> Result<(), RegistryError> {
        use std::collections::HashSet;

        let mut seen_ids = HashSet::new();
        for probe in probes {
            if !seen_ids.insert(probe.id) {
                return Err(RegistryError::DuplicateId(probe.id.to_string()));
            }
            // The identifier must be substituted at least once: into the
            // URL (the common case), into a fixed-URL POST probe's body
            // (e.g. `email-discord-register`), or both (e.g. Deezer's
            // validation endpoint, which repeats the email in its query
            // string and its form body). Requiring it in `url_template`
            // unconditionally would reject every probe whose endpoint URL
            // never changes.
            let url_count = probe.url_template.matches("{}").count();
            let body_count = probe.body_template.map(|b| b.matches("{}").count()).unwrap_or(0);
            if url_count + body_count == 0 || url_count > 1 || body_count > 1 {
                return Err(RegistryError::BadPlaceholderCount(
                    probe.id.to_string(),
                    url_count + body_count,
                ));
            }
        }

        for kind in [
            IdentifierKind::Username,
            IdentifierKind::Email,
            IdentifierKind::Phone,
            IdentifierKind::Domain,
        ] {
            if !probes.iter().any(|p| p.identifier_kind == kind) {
                return Err(RegistryError::EmptyKind(kind.to_string()));
            }
        }

        Ok(())
    }

    /// Return the ordered probe subset for `(kind, mode)`, further
    /// narrowed by `filter`. The order is the registry's declared order
    /// (§4.1) — callers that need a different dispatch order must re-sort
    /// explicitly.
    pub fn select(&self, kind: IdentifierKind, mode: ScanMode, filter: &SelectFilter<'_>) -> Vec<&Probe> {
        self.probes
            .iter()
            .filter(|p| p.identifier_kind == kind)
            .filter(|p| matches!(mode, ScanMode::Deep) || matches!(p.tier, Tier::Quick))
            .filter(|p| !p.nsfw || filter.include_nsfw)
            .filter(|p| !filter.exclude_categories.iter().any(|c| c == p.category))
            .filter(|p| match filter.include_categories {
                None => true,
                Some(allow) => allow.iter().any(|c| c == p.category),
            })
            .collect()
    }

    /// Full lookup by probe id, e.g. for re-associating a `ProbeOutcome`
    /// with its registry metadata.
    pub fn lookup(&self, probe_id: &str) -> Result<&Probe, RegistryError> {
        self.probes
            .iter()
            .find(|p| p.id == probe_id)
            .ok_or_else(|| RegistryError::UnknownProbeId(probe_id.to_string()))
    }

    /// The registry position of a probe, used by the Aggregator to
    /// restore registry order regardless of completion order (§4.6).
    pub fn position(&self, probe_id: &str) -> Option<usize> {
        self.probes.iter().position(|p| p.id == probe_id)
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_succeeds_and_covers_all_kinds() {
        let registry = ProbeRegistry::build().expect("registry builds");
        assert!(!registry.is_empty());
        for kind in [
            IdentifierKind::Username,
            IdentifierKind::Email,
            IdentifierKind::Phone,
            IdentifierKind::Domain,
        ] {
            let subset = registry.select(kind, ScanMode::Deep, &SelectFilter::default());
            assert!(!subset.is_empty(), "{kind} has no probes");
        }
    }

    #[test]
    fn quick_is_subset_of_deep() {
        let registry = ProbeRegistry::build().unwrap();
        let quick = registry.select(IdentifierKind::Username, ScanMode::Quick, &SelectFilter::default());
        let deep = registry.select(IdentifierKind::Username, ScanMode::Deep, &SelectFilter::default());
        assert!(quick.len() <= deep.len());
        for p in &quick {
            assert!(deep.iter().any(|d| d.id == p.id));
        }
    }

    #[test]
    fn no_duplicate_ids_across_kinds() {
        let registry = ProbeRegistry::build().unwrap();
        let mut ids = std::collections::HashSet::new();
        for p in &registry.probes {
            assert!(ids.insert(p.id), "duplicate id {}", p.id);
        }
    }

    #[test]
    fn lookup_finds_known_probe_and_rejects_unknown() {
        let registry = ProbeRegistry::build().unwrap();
        let first_id = registry.probes[0].id;
        assert!(registry.lookup(first_id).is_ok());
        assert!(registry.lookup("not-a-real-probe-id").is_err());
    }

    #[test]
    fn nsfw_excluded_by_default() {
        let registry = ProbeRegistry::build().unwrap();
        let filtered = registry.select(IdentifierKind::Username, ScanMode::Deep, &SelectFilter::default());
        assert!(filtered.iter().all(|p| !p.nsfw));
    }

    #[test]
    fn exclude_category_filters_subset() {
        let registry = ProbeRegistry::build().unwrap();
        let all = registry.select(IdentifierKind::Username, ScanMode::Deep, &SelectFilter::default());
        let category = all[0].category.to_string();
        let excluded = vec![category.clone()];
        let filtered = registry.select(
            IdentifierKind::Username,
            ScanMode::Deep,
            &SelectFilter {
                exclude_categories: &excluded,
                ..Default::default()
            },
        );
        assert!(filtered.iter().all(|p| p.category != category));
    }
}
