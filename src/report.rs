//! `ScanReport` (§3, §6 stable JSON shape).

use crate::aggregator::{Hit, Stats};
use crate::identifier::Identifier;
use crate::registry::ScanMode;
use crate::section::SectionResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// How a scan ended (§7: `Cancelled`/`DeadlineExceeded` are not errors —
/// the report is still returned, with `stats.error` reflecting whatever
/// probes didn't finish in time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target: Identifier,
    pub mode: ScanMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub termination: Termination,
    pub stats: Stats,
    pub hits: Vec<Hit>,
    pub by_category: BTreeMap<String, Vec<Hit>>,
    pub sections: BTreeMap<String, SectionResult>,
}

impl ScanReport {
    /// §3 invariant: the count of `present` hits equals `stats.present`.
    pub fn is_internally_consistent(&self) -> bool {
        self.hits.len() == self.stats.present
            && self.stats.attempted
                == self.stats.present + self.stats.absent + self.stats.indeterminate + self.stats.error
    }
}
