//! External Adapter Set (C8, §4.8).
//!
//! Adapters are deliberately thin: one `lookup` call each, their own
//! deadline, their own rate limit, never part of the probe fan-out.
//! A failing adapter degrades its own `sections` entry and never aborts
//! the scan (§7 `AdapterError` policy).

pub mod breach;
pub mod carrier;
pub mod dns;
pub mod geoip;
pub mod headers;
pub mod tls;
pub mod whois;

use crate::cancellation::CancellationToken;
use crate::error::SectionError;
use async_trait::async_trait;
use std::time::Duration;

/// Shared adapter contract (§4.8).
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The key this adapter's result is attached under in
    /// `ScanReport.sections`.
    fn section_name(&self) -> &'static str;

    async fn lookup(
        &self,
        identifier_value: &str,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<serde_json::Value, SectionError>;
}

/// Resolves an adapter's API key from the environment, following the
/// teacher's `CredentialManager` env-first lookup: presence alone
/// decides configuration; a missing variable degrades the section
/// rather than failing the scan.
pub fn env_api_key(var: &str) -> Result<String, SectionError> {
    std::env::var(var).map_err(|_| SectionError::NotConfigured)
}
