//! Scan Orchestrator (C7, §4.7).
//!
//! Owns one scan end-to-end: validate identifier, select the probe
//! subset, fan out through the executor, run the configured adapters
//! concurrently, aggregate, and finalise the report. Grounded in the
//! teacher's top-level `run_one_check`/session-assembly pattern: a single
//! entry point per call shape that wires together otherwise-independent
//! components rather than letting them reach for each other directly.

use crate::adapters::{breach::BreachLookup, carrier::CarrierLookup, dns::DnsLookup, geoip::GeoIpLookup, headers::HttpHeaderInspect, tls::TlsCertLookup, whois::WhoisLookup, Adapter};
use crate::aggregator::aggregate;
use crate::cancellation::CancellationToken;
use crate::config::ScanConfig;
use crate::error::AppError;
use crate::executor::{ExecutorConfig, FanOutExecutor};
use crate::identifier::{Identifier, IdentifierKind};
use crate::logging::ScanLogger;
use crate::pacer::HostPacer;
use crate::registry::{ProbeRegistry, ScanMode, SelectFilter};
use crate::report::{ScanReport, Termination};
use crate::section::SectionResult;
use crate::transport::Transport;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const ADAPTER_DEADLINE: Duration = Duration::from_secs(10);

/// Seam for the external, persistent license gateway (§6, §9). The real
/// gateway and its store are out of scope for this crate; callers inject
/// their own implementation, or accept `AllowAllGate` as the default.
#[async_trait]
pub trait LicenseGate: Send + Sync {
    /// Whether the given scan is permitted to run at all.
    async fn permit(&self, kind: IdentifierKind, mode: ScanMode) -> bool;
    /// Called unconditionally at scan end, success or failure.
    async fn record(&self, kind: IdentifierKind, mode: ScanMode);
}

/// Default gate used when no real gateway is configured: permits every
/// scan and records nothing.
pub struct AllowAllGate;

#[async_trait]
impl LicenseGate for AllowAllGate {
    async fn permit(&self, _kind: IdentifierKind, _mode: ScanMode) -> bool {
        true
    }

    async fn record(&self, _kind: IdentifierKind, _mode: ScanMode) {}
}

pub struct ScanOrchestrator<T: Transport> {
    registry: Arc<ProbeRegistry>,
    transport: Arc<T>,
    config: ScanConfig,
    gate: Arc<dyn LicenseGate>,
    logger: Arc<ScanLogger>,
}

impl<T: Transport + 'static> ScanOrchestrator<T> {
    pub fn new(
        registry: Arc<ProbeRegistry>,
        transport: Arc<T>,
        config: ScanConfig,
        gate: Arc<dyn LicenseGate>,
        logger: Arc<ScanLogger>,
    ) -> Self {
        Self {
            registry,
            transport,
            config,
            gate,
            logger,
        }
    }

    pub async fn scan_username(&self, username: &str, mode: ScanMode) -> Result<ScanReport, AppError> {
        let identifier = Identifier::parse_username(username)?;
        self.run_scan(identifier, mode).await
    }

    pub async fn scan_email(&self, email: &str, mode: ScanMode) -> Result<ScanReport, AppError> {
        let identifier = Identifier::parse_email(email)?;
        self.run_scan(identifier, mode).await
    }

    pub async fn scan_phone(&self, e164: &str, mode: ScanMode) -> Result<ScanReport, AppError> {
        let identifier = Identifier::parse_phone(e164)?;
        self.run_scan(identifier, mode).await
    }

    pub async fn scan_domain(&self, domain: &str, mode: ScanMode) -> Result<ScanReport, AppError> {
        let identifier = Identifier::parse_domain(domain)?;
        self.run_scan(identifier, mode).await
    }

    async fn run_scan(&self, identifier: Identifier, mode: ScanMode) -> Result<ScanReport, AppError> {
        let kind = identifier.kind();
        if !self.gate.permit(kind, mode).await {
            return Err(AppError::Internal(format!(
                "scan of kind {kind} not permitted by license gate"
            )));
        }

        let started_at = Utc::now();
        // Short, non-PII tag that ties this scan's log events together.
        // Teacher precedent is a truncated uuid `session_id`; `rand`
        // replaces `uuid` here for the same purpose (DESIGN.md).
        let correlation_id = format!("{kind}-{:08x}", rand::random::<u32>());
        let cancellation = CancellationToken::new();
        let scan_deadline = self.config.scan_deadline(mode);
        let deadline_fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let deadline_guard = {
            let cancellation = cancellation.clone();
            let deadline_fired = deadline_fired.clone();
            tokio::spawn(async move {
                tokio::time::sleep(scan_deadline).await;
                deadline_fired.store(true, std::sync::atomic::Ordering::SeqCst);
                cancellation.cancel();
            })
        };
        let signal_guard = {
            let cancellation = cancellation.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancellation.cancel();
                }
            })
        };

        let filter = SelectFilter {
            include_categories: None,
            exclude_categories: &self.config.exclude_categories,
            include_nsfw: !self.config.exclude_nsfw,
        };
        let probes: Vec<_> = self.registry.select(kind, mode, &filter).into_iter().cloned().collect();

        let pacer = Arc::new(HostPacer::new(
            self.config.default_host_interval,
            self.config.host_interval_overrides.clone(),
        ));
        let executor = FanOutExecutor::new(
            self.transport.clone(),
            pacer,
            ExecutorConfig {
                global_concurrency: self.config.global_concurrency,
                request_timeout: self.config.request_timeout,
                max_retries: self.config.max_retries,
                backoff_base: self.config.backoff_base,
                backoff_max: self.config.backoff_max,
            },
            self.logger.clone(),
        );

        let identifier = Arc::new(identifier);
        let fan_out = executor.run(probes, identifier.clone(), cancellation.clone(), &correlation_id);
        let sections_fut = self.run_adapters(&identifier, &cancellation, &correlation_id);

        let (outcomes, sections) = tokio::join!(fan_out, sections_fut);
        deadline_guard.abort();
        signal_guard.abort();

        self.gate.record(kind, mode).await;

        // Cancellation and deadline expiry are not failures (§7): whatever
        // outcomes the fan-out collected (including the synthetic
        // "cancelled" errors `FanOutExecutor` emits for probes that never
        // finished) are aggregated and returned as usual. Only the
        // `termination` field distinguishes this from a normal completion.
        let termination = if deadline_fired.load(std::sync::atomic::Ordering::SeqCst) {
            Termination::DeadlineExceeded
        } else if cancellation.is_cancelled() {
            Termination::Cancelled
        } else {
            Termination::Completed
        };

        let aggregated = aggregate(&self.registry, outcomes);
        let finished_at = Utc::now();

        Ok(ScanReport {
            target: identifier.as_ref().clone(),
            mode,
            started_at,
            finished_at,
            termination,
            stats: aggregated.stats,
            hits: aggregated.hits,
            by_category: aggregated.by_category,
            sections,
        })
    }

    /// Runs every adapter relevant to this identifier's kind concurrently
    /// with the probe fan-out (§4.7 step 5). A failing adapter degrades
    /// only its own section; it never aborts the scan. Each section is
    /// also logged under `correlation_id` (§9 ambient observability).
    async fn run_adapters(
        &self,
        identifier: &Identifier,
        cancellation: &CancellationToken,
        correlation_id: &str,
    ) -> BTreeMap<String, SectionResult> {
        let value = identifier.value().to_string();
        let mut sections = BTreeMap::new();
        let mut record = |sections: &mut BTreeMap<String, SectionResult>, name: String, section: SectionResult| {
            self.logger.adapter_outcome(&name, section.is_ok(), correlation_id);
            sections.insert(name, section);
        };

        match identifier {
            Identifier::Email(_) => {
                let breach = BreachLookup::new(self.transport.clone());
                let result = breach.lookup(&value, ADAPTER_DEADLINE, cancellation).await;
                record(&mut sections, breach.section_name().to_string(), SectionResult::from_result(result));
            }
            Identifier::Phone(_) => {
                let carrier = CarrierLookup::new(self.transport.clone());
                let result = carrier.lookup(&value, ADAPTER_DEADLINE, cancellation).await;
                record(&mut sections, carrier.section_name().to_string(), SectionResult::from_result(result));
            }
            Identifier::Domain(_) => {
                let headers = HttpHeaderInspect::new(self.transport.clone());
                let headers_result = headers.lookup(&value, ADAPTER_DEADLINE, cancellation).await;
                record(
                    &mut sections,
                    headers.section_name().to_string(),
                    SectionResult::from_result(headers_result),
                );

                let geoip = GeoIpLookup::new(self.transport.clone());
                let geoip_result = geoip.lookup(&value, ADAPTER_DEADLINE, cancellation).await;
                record(
                    &mut sections,
                    geoip.section_name().to_string(),
                    SectionResult::from_result(geoip_result),
                );

                let dns_section = match DnsLookup::new() {
                    Ok(dns) => SectionResult::from_result(dns.lookup(&value, ADAPTER_DEADLINE, cancellation).await),
                    Err(e) => SectionResult::from_result(Err(e)),
                };
                record(&mut sections, "dns".to_string(), dns_section);

                let tls = TlsCertLookup::new();
                let tls_result = tls.lookup(&value, ADAPTER_DEADLINE, cancellation).await;
                record(&mut sections, tls.section_name().to_string(), SectionResult::from_result(tls_result));

                let whois = WhoisLookup::new();
                let whois_result = whois.lookup(&value, ADAPTER_DEADLINE, cancellation).await;
                record(&mut sections, whois.section_name().to_string(), SectionResult::from_result(whois_result));
            }
            Identifier::Username(_) => {}
        }

        sections
    }
}
