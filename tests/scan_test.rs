//! End-to-end scan scenarios against the real probe registry, driven
//! through a scripted `MockTransport` so no real network traffic occurs.

use reconprobe::config::ScanConfig;
use reconprobe::identifier::IdentifierKind;
use reconprobe::logging::ScanLogger;
use reconprobe::orchestrator::{AllowAllGate, LicenseGate, ScanOrchestrator};
use reconprobe::registry::ProbeRegistry;
use reconprobe::report::Termination;
use reconprobe::transport::{HttpMethod, MockStep, MockTransport, Response};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn test_logger() -> Arc<ScanLogger> {
    Arc::new(ScanLogger::new(Some(std::env::temp_dir().join("reconprobe-scan-test.jsonl"))))
}

fn ok(url: &str, body: &str) -> Response {
    Response {
        status: 200,
        final_url: url.to_string(),
        headers: HashMap::new(),
        body: body.as_bytes().to_vec(),
    }
}

fn fast_config() -> ScanConfig {
    ScanConfig {
        global_concurrency: 16,
        request_timeout: Duration::from_secs(2),
        max_retries: 0,
        scan_deadline_quick: Duration::from_secs(5),
        scan_deadline_deep: Duration::from_secs(5),
        default_host_interval: Duration::from_millis(0),
        ..ScanConfig::default()
    }
}

#[tokio::test]
async fn quick_username_scan_finds_github_and_telegram_hits() {
    let registry = Arc::new(ProbeRegistry::build().unwrap());
    let transport = Arc::new(MockTransport::new());

    transport.script(
        HttpMethod::Get,
        "https://api.github.com/users/carmenta",
        vec![MockStep::Reply(ok("https://api.github.com/users/carmenta", "{}"))],
    );
    transport.script(
        HttpMethod::Get,
        "https://www.reddit.com/user/carmenta/about.json",
        vec![MockStep::Err(reconprobe::error::TransportError::Connect(
            "not found".to_string(),
        ))],
    );
    transport.script(
        HttpMethod::Get,
        "https://t.me/carmenta",
        vec![MockStep::Reply(ok(
            "https://t.me/carmenta",
            "<div class=\"tgme_page_title\">Carmenta</div>",
        ))],
    );
    transport.script(
        HttpMethod::Get,
        "https://steamcommunity.com/id/carmenta",
        vec![MockStep::Reply(ok(
            "https://steamcommunity.com/id/carmenta",
            "The specified profile could not be found",
        ))],
    );

    let orchestrator = ScanOrchestrator::new(registry, transport, fast_config(), Arc::new(AllowAllGate), test_logger());
    let report = orchestrator
        .scan_username("carmenta", reconprobe::registry::ScanMode::Quick)
        .await
        .expect("scan succeeds");

    assert!(report.is_internally_consistent());
    assert_eq!(report.stats.attempted, 4);
    assert_eq!(report.stats.present, 2);
    assert_eq!(report.stats.absent, 1);
    assert!(report.hits.iter().any(|h| h.probe_id == "username-github-users-api"));
    assert!(report.hits.iter().any(|h| h.probe_id == "username-telegram-public-profile"));
    assert!(report.sections.is_empty());
}

#[tokio::test]
async fn email_scan_attaches_breach_section() {
    let registry = Arc::new(ProbeRegistry::build().unwrap());
    let transport = Arc::new(MockTransport::new());

    for probe in registry.select(
        IdentifierKind::Email,
        reconprobe::registry::ScanMode::Quick,
        &reconprobe::registry::SelectFilter::default(),
    ) {
        let url = probe.url_template.replacen("{}", "jane%40example.com", 1);
        transport.script(
            match probe.method {
                reconprobe::registry::Method::Get => HttpMethod::Get,
                reconprobe::registry::Method::Post => HttpMethod::Post,
            },
            &url,
            vec![MockStep::Err(reconprobe::error::TransportError::Connect(
                "unreachable in test".to_string(),
            ))],
        );
    }
    transport.script(
        HttpMethod::Get,
        "https://api.xposedornot.com/v1/check-email/jane@example.com",
        vec![MockStep::Reply(ok(
            "https://api.xposedornot.com/v1/check-email/jane@example.com",
            r#"{"breaches": [["AdobeBreach"]]}"#,
        ))],
    );

    let orchestrator = ScanOrchestrator::new(registry, transport, fast_config(), Arc::new(AllowAllGate), test_logger());
    let report = orchestrator
        .scan_email("jane@example.com", reconprobe::registry::ScanMode::Quick)
        .await
        .expect("scan succeeds");

    assert!(report.is_internally_consistent());
    assert!(report.sections.contains_key("breach"));
}

#[tokio::test]
#[serial_test::serial]
async fn deep_phone_scan_covers_the_full_table_and_degrades_carrier_without_a_key() {
    std::env::remove_var("OSINT_CARRIER_API_KEY");

    let registry = Arc::new(ProbeRegistry::build().unwrap());
    let transport = Arc::new(MockTransport::new());

    transport.script(
        HttpMethod::Get,
        "https://t.me/+14155551234",
        vec![MockStep::Reply(ok(
            "https://t.me/+14155551234",
            "<div class=\"tgme_page_title\">Carmenta</div>",
        ))],
    );
    transport.script(
        HttpMethod::Post,
        "https://accounts.snapchat.com/accounts/get_username_suggestions",
        vec![MockStep::Reply(ok(
            "https://accounts.snapchat.com/accounts/get_username_suggestions",
            r#"{"suggestions": ["carmenta99"]}"#,
        ))],
    );

    let orchestrator = ScanOrchestrator::new(registry, transport, fast_config(), Arc::new(AllowAllGate), test_logger());
    let report = orchestrator
        .scan_phone("14155551234", reconprobe::registry::ScanMode::Deep)
        .await
        .expect("scan succeeds");

    assert!(report.is_internally_consistent());
    assert_eq!(report.stats.attempted, 2);
    assert_eq!(report.stats.present, 2);
    assert!(report.hits.iter().any(|h| h.probe_id == "phone-telegram-public-profile"));
    assert!(report.hits.iter().any(|h| h.probe_id == "phone-snapchat-username-suggestions"));

    match report.sections.get("carrier") {
        Some(reconprobe::section::SectionResult::Error { error }) => {
            assert!(error.contains("not configured"));
        }
        other => panic!("expected a degraded carrier section, got {other:?}"),
    }
}

struct DenyAllGate;

#[async_trait::async_trait]
impl LicenseGate for DenyAllGate {
    async fn permit(&self, _kind: IdentifierKind, _mode: reconprobe::registry::ScanMode) -> bool {
        false
    }
    async fn record(&self, _kind: IdentifierKind, _mode: reconprobe::registry::ScanMode) {}
}

#[tokio::test]
async fn license_gate_refusal_prevents_any_http_call() {
    let registry = Arc::new(ProbeRegistry::build().unwrap());
    let transport = Arc::new(MockTransport::new());
    let orchestrator = ScanOrchestrator::new(registry, transport.clone(), fast_config(), Arc::new(DenyAllGate), test_logger());

    let result = orchestrator
        .scan_username("carmenta", reconprobe::registry::ScanMode::Quick)
        .await;

    assert!(result.is_err());
    assert!(transport.call_log().is_empty());
}

#[tokio::test]
async fn invalid_phone_is_rejected_before_any_probe_runs() {
    let registry = Arc::new(ProbeRegistry::build().unwrap());
    let transport = Arc::new(MockTransport::new());
    let orchestrator = ScanOrchestrator::new(registry, transport.clone(), fast_config(), Arc::new(AllowAllGate), test_logger());

    let result = orchestrator
        .scan_phone("not-a-phone-number", reconprobe::registry::ScanMode::Quick)
        .await;

    assert!(result.is_err());
    assert!(transport.call_log().is_empty());
}

#[tokio::test]
async fn scan_deadline_expiry_still_returns_a_partial_report() {
    let registry = Arc::new(ProbeRegistry::build().unwrap());
    let transport = Arc::new(MockTransport::new());

    // github and reddit answer immediately; telegram and steam stall far
    // past the scan deadline, so the deadline must fire while they are
    // still in flight (§7, review: zero end-to-end cancellation coverage).
    transport.script(
        HttpMethod::Get,
        "https://api.github.com/users/carmenta",
        vec![MockStep::Reply(ok("https://api.github.com/users/carmenta", "{}"))],
    );
    transport.script(
        HttpMethod::Get,
        "https://www.reddit.com/user/carmenta/about.json",
        vec![MockStep::Err(reconprobe::error::TransportError::Connect(
            "not found".to_string(),
        ))],
    );
    transport.script(
        HttpMethod::Get,
        "https://t.me/carmenta",
        vec![MockStep::Stall(Duration::from_secs(2))],
    );
    transport.script(
        HttpMethod::Get,
        "https://steamcommunity.com/id/carmenta",
        vec![MockStep::Stall(Duration::from_secs(2))],
    );

    let config = ScanConfig {
        global_concurrency: 16,
        request_timeout: Duration::from_secs(2),
        max_retries: 0,
        scan_deadline_quick: Duration::from_millis(50),
        scan_deadline_deep: Duration::from_millis(50),
        default_host_interval: Duration::from_millis(0),
        ..ScanConfig::default()
    };

    let orchestrator = ScanOrchestrator::new(registry, transport, config, Arc::new(AllowAllGate), test_logger());
    let report = orchestrator
        .scan_username("carmenta", reconprobe::registry::ScanMode::Quick)
        .await
        .expect("a deadline expiry is reported, not raised as an error");

    assert_eq!(report.termination, Termination::DeadlineExceeded);
    assert!(report.stats.error >= 1, "the two stalled probes should surface as errors");
    assert!(report.is_internally_consistent());
    // The fast probes still completed and contributed to the report.
    assert!(report.hits.iter().any(|h| h.probe_id == "username-github-users-api"));
}
