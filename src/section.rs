//! The `sections` map attached to a `ScanReport` (§4.8, §6).
//!
//! Every adapter's outcome folds into one of these two shapes; a failing
//! adapter degrades to `Error` without ever aborting the scan (§7
//! `AdapterError` policy, §8 testable property #9).

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SectionResult {
    Ok(serde_json::Value),
    Error { error: String },
}

impl SectionResult {
    pub fn from_result(result: Result<serde_json::Value, crate::error::SectionError>) -> Self {
        match result {
            Ok(value) => SectionResult::Ok(value),
            Err(err) => SectionResult::Error {
                error: err.to_string(),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, SectionResult::Ok(_))
    }
}
