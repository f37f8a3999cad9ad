//! Fan-Out Executor (C5, §4.5).
//!
//! One `tokio::spawn`ed task per dispatched probe, each progressing
//! through the state machine in §4.5: acquire host pacer, acquire the
//! global semaphore, substitute the identifier, call the transport,
//! classify, emit, release in reverse order on every exit path
//! (including panic and cancellation). Grounded in the teacher's
//! per-task owned-permit `tokio::spawn` pattern, combined with the
//! `buffer_unordered`-style global cap this spec additionally requires.

use crate::cancellation::CancellationToken;
use crate::classifier::{classify, ClassifierInput, ProbeState};
use crate::error::TransportError;
use crate::identifier::Identifier;
use crate::logging::ScanLogger;
use crate::pacer::HostPacer;
use crate::registry::{Method, Probe};
use crate::transport::{HttpMethod, Request, Transport};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Per-probe classification result (§3 `ProbeOutcome`).
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    pub probe_id: String,
    pub state: ProbeState,
    pub final_url: String,
    pub latency_ms: u64,
    pub diagnostic: Option<String>,
}

impl ProbeOutcome {
    fn error(probe_id: &str, final_url: String, latency_ms: u64, diagnostic: impl Into<String>) -> Self {
        Self {
            probe_id: probe_id.to_string(),
            state: ProbeState::Error,
            final_url,
            latency_ms,
            diagnostic: Some(diagnostic.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub global_concurrency: usize,
    pub request_timeout: Duration,
    pub max_retries: u8,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

pub struct FanOutExecutor<T: Transport> {
    transport: Arc<T>,
    pacer: Arc<HostPacer>,
    semaphore: Arc<Semaphore>,
    config: ExecutorConfig,
    logger: Arc<ScanLogger>,
}

impl<T: Transport + 'static> FanOutExecutor<T> {
    pub fn new(transport: Arc<T>, pacer: Arc<HostPacer>, config: ExecutorConfig, logger: Arc<ScanLogger>) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.global_concurrency.max(1)));
        Self {
            transport,
            pacer,
            semaphore,
            config,
            logger,
        }
    }

    /// Runs every probe in `probes` against `identifier`, honouring
    /// `cancellation`. Returns exactly one outcome per probe (§3
    /// invariant); a panicked worker is folded into a synthetic `error`
    /// outcome rather than propagated. Each outcome is also logged
    /// (§9 ambient observability) under `correlation_id`, which callers
    /// set to something that ties every probe of one scan together.
    pub async fn run(
        &self,
        probes: Vec<Probe>,
        identifier: Arc<Identifier>,
        cancellation: CancellationToken,
        correlation_id: &str,
    ) -> Vec<ProbeOutcome> {
        let mut handles = Vec::with_capacity(probes.len());
        for probe in probes {
            let probe_id = probe.id.to_string();
            let transport = self.transport.clone();
            let pacer = self.pacer.clone();
            let semaphore = self.semaphore.clone();
            let cancellation = cancellation.clone();
            let identifier = identifier.clone();
            let config = self.config.clone();
            let logger = self.logger.clone();
            let correlation_id = correlation_id.to_string();

            handles.push((
                probe_id,
                tokio::spawn(async move {
                    let outcome =
                        run_one_probe(probe, identifier, transport, pacer, semaphore, config, cancellation).await;
                    logger.probe_outcome(&outcome.probe_id, outcome.state.as_str(), outcome.latency_ms, &correlation_id);
                    outcome
                }),
            ));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (probe_id, handle) in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(_join_err) => outcomes.push(ProbeOutcome::error(&probe_id, String::new(), 0, "worker panicked")),
            }
        }
        outcomes
    }
}

async fn run_one_probe<T: Transport>(
    probe: Probe,
    identifier: Arc<Identifier>,
    transport: Arc<T>,
    pacer: Arc<HostPacer>,
    semaphore: Arc<Semaphore>,
    config: ExecutorConfig,
    cancellation: CancellationToken,
) -> ProbeOutcome {
    let url = match build_url(probe.url_template, identifier.value()) {
        Ok(u) => u,
        Err(e) => return ProbeOutcome::error(probe.id, String::new(), 0, e),
    };
    let host = match url::Url::parse(&url).ok().and_then(|u| u.host_str().map(str::to_string)) {
        Some(h) => h,
        None => return ProbeOutcome::error(probe.id, url, 0, "could not determine host from url"),
    };
    let body = probe
        .body_template
        .map(|t| build_body(t, identifier.value()));

    let mut attempt = 0u8;
    let started = Instant::now();

    loop {
        if cancellation.is_cancelled() {
            return ProbeOutcome::error(probe.id, url, started.elapsed().as_millis() as u64, "cancelled");
        }

        let host_permit = match pacer.acquire(&host, &cancellation).await {
            Ok(permit) => permit,
            Err(()) => return ProbeOutcome::error(probe.id, url, started.elapsed().as_millis() as u64, "cancelled"),
        };

        let sem_permit = {
            let acquired = semaphore.acquire();
            let cancelled = cancellation.cancelled();
            tokio::pin!(acquired);
            tokio::pin!(cancelled);
            tokio::select! {
                res = &mut acquired => res.ok(),
                _ = &mut cancelled => None,
            }
        };
        let Some(sem_permit) = sem_permit else {
            pacer.release(host_permit);
            return ProbeOutcome::error(probe.id, url, started.elapsed().as_millis() as u64, "cancelled");
        };

        let attempt_start = Instant::now();
        let request = Request {
            method: match probe.method {
                Method::Get => HttpMethod::Get,
                Method::Post => HttpMethod::Post,
            },
            url: url.clone(),
            headers: probe
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: body.clone().unwrap_or_default().into_bytes(),
        };

        let result = transport.fetch(request, config.request_timeout, &cancellation).await;
        drop(sem_permit);
        pacer.release(host_permit);

        let latency_ms = attempt_start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                let (state, diagnostic) = classify(
                    &probe.decision,
                    &ClassifierInput {
                        status: response.status,
                        final_url: &response.final_url,
                        body: &response.body,
                    },
                );
                return ProbeOutcome {
                    probe_id: probe.id.to_string(),
                    state,
                    final_url: response.final_url,
                    latency_ms: started.elapsed().as_millis() as u64,
                    diagnostic,
                };
            }
            Err(TransportError::Cancelled) => {
                return ProbeOutcome::error(probe.id, url, started.elapsed().as_millis() as u64, "cancelled");
            }
            Err(err) if err.is_transient() && attempt < config.max_retries => {
                attempt += 1;
                let backoff = backoff_for(attempt, config.backoff_base, config.backoff_max);
                let sleep = tokio::time::sleep(backoff);
                let cancelled = cancellation.cancelled();
                tokio::pin!(sleep);
                tokio::pin!(cancelled);
                tokio::select! {
                    _ = &mut sleep => {}
                    _ = &mut cancelled => {
                        return ProbeOutcome::error(probe.id, url, started.elapsed().as_millis() as u64, "cancelled");
                    }
                }
                continue;
            }
            Err(err) => {
                return ProbeOutcome::error(
                    probe.id,
                    url,
                    started.elapsed().as_millis() as u64,
                    format!("{} (after {} attempt(s), {}ms)", err, attempt + 1, latency_ms),
                );
            }
        }
    }
}

fn backoff_for(attempt: u8, base: Duration, max: Duration) -> Duration {
    let scaled = base.saturating_mul(1u32 << attempt.saturating_sub(1).min(16));
    scaled.min(max)
}

/// Percent-encodes the identifier into the single `{}` placeholder. Path
/// and query characters both tolerate percent-encoding, which is the
/// simplest transform that is safe everywhere the template may place it.
/// Substitutes the identifier into a probe's `url_template`. A probe whose
/// identifier substitution lives entirely in its `body_template` (fixed-URL
/// POST endpoints) carries zero placeholders here, which is not an error;
/// the registry's validation guarantees exactly one placeholder across the
/// `url_template`/`body_template` pair as a whole.
fn build_url(template: &str, value: &str) -> Result<String, String> {
    match template.matches("{}").count() {
        0 => Ok(template.to_string()),
        1 => {
            let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
            Ok(template.replacen("{}", &encoded, 1))
        }
        _ => Err("probe template does not have exactly one placeholder".to_string()),
    }
}

/// JSON-escapes the identifier for substitution into a `body_template`
/// that is itself a JSON literal.
fn build_body(template: &str, value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    template.replacen("{}", &escaped, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DecisionRule;
    use crate::identifier::Identifier;
    use crate::registry::Tier;
    use crate::transport::{MockStep, MockTransport};
    use std::collections::HashMap;

    fn probe(id: &'static str, url: &'static str, decision: DecisionRule) -> Probe {
        Probe {
            id,
            display_name: id,
            identifier_kind: crate::identifier::IdentifierKind::Username,
            category: "Test",
            url_template: url,
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision,
            tier: Tier::Quick,
            nsfw: false,
        }
    }

    fn response(status: u16, url: &str, body: &str) -> crate::transport::Response {
        crate::transport::Response {
            status,
            final_url: url.to_string(),
            headers: HashMap::new(),
            body: body.as_bytes().to_vec(),
        }
    }

    fn executor(transport: Arc<MockTransport>) -> FanOutExecutor<MockTransport> {
        FanOutExecutor::new(
            transport,
            Arc::new(HostPacer::new(Duration::from_millis(0), HashMap::new())),
            ExecutorConfig {
                global_concurrency: 10,
                request_timeout: Duration::from_secs(1),
                max_retries: 2,
                backoff_base: Duration::from_millis(1),
                backoff_max: Duration::from_millis(4),
            },
            Arc::new(ScanLogger::new(Some(std::env::temp_dir().join("reconprobe-executor-test.jsonl")))),
        )
    }

    #[tokio::test]
    async fn single_present_outcome() {
        let transport = Arc::new(MockTransport::new());
        transport.script(
            crate::transport::HttpMethod::Get,
            "https://a.example/alice",
            vec![MockStep::Reply(response(200, "https://a.example/alice", "ok"))],
        );
        let exec = executor(transport);
        let probes = vec![probe(
            "siteA",
            "https://a.example/{}",
            DecisionRule::StatusExists { expected: 200 },
        )];
        let outcomes = exec
            .run(
                probes,
                Arc::new(Identifier::parse_username("alice").unwrap()),
                CancellationToken::new(),
                "test",
            )
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].state, ProbeState::Present);
    }

    #[tokio::test]
    async fn retries_transient_errors_then_succeeds() {
        let transport = Arc::new(MockTransport::new());
        transport.script(
            crate::transport::HttpMethod::Get,
            "https://a.example/bob",
            vec![
                MockStep::Err(TransportError::Timeout),
                MockStep::Err(TransportError::Timeout),
                MockStep::Reply(response(200, "https://a.example/bob", "Public Playlists")),
            ],
        );
        let exec = executor(transport.clone());
        let probes = vec![probe(
            "siteD",
            "https://a.example/{}",
            DecisionRule::ContentPresent {
                markers: vec!["Public Playlists".to_string()],
                expected_status: 200,
            },
        )];
        let outcomes = exec
            .run(
                probes,
                Arc::new(Identifier::parse_username("bob").unwrap()),
                CancellationToken::new(),
                "test",
            )
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].state, ProbeState::Present);
        assert_eq!(
            transport.call_count(crate::transport::HttpMethod::Get, "https://a.example/bob"),
            3
        );
    }

    #[tokio::test]
    async fn exactly_one_outcome_per_probe() {
        let transport = Arc::new(MockTransport::new());
        transport.script(
            crate::transport::HttpMethod::Get,
            "https://a.example/carol",
            vec![MockStep::Reply(response(200, "https://a.example/carol", "ok"))],
        );
        transport.script(
            crate::transport::HttpMethod::Get,
            "https://b.example/carol",
            vec![MockStep::Err(TransportError::Connect("refused".to_string()))],
        );
        let exec = executor(transport);
        let probes = vec![
            probe(
                "siteA",
                "https://a.example/{}",
                DecisionRule::StatusExists { expected: 200 },
            ),
            probe(
                "siteB",
                "https://b.example/{}",
                DecisionRule::StatusExists { expected: 200 },
            ),
        ];
        let outcomes = exec
            .run(
                probes,
                Arc::new(Identifier::parse_username("carol").unwrap()),
                CancellationToken::new(),
                "test",
            )
            .await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().any(|o| o.probe_id == "siteA" && o.state == ProbeState::Present));
        assert!(outcomes.iter().any(|o| o.probe_id == "siteB" && o.state == ProbeState::Error));
    }

    #[tokio::test]
    async fn cancellation_synthesises_error_outcomes() {
        let transport = Arc::new(MockTransport::new());
        let exec = executor(transport);
        let probes = vec![probe(
            "siteA",
            "https://a.example/{}",
            DecisionRule::StatusExists { expected: 200 },
        )];
        let token = CancellationToken::new();
        token.cancel();
        let outcomes = exec
            .run(
                probes,
                Arc::new(Identifier::parse_username("dana").unwrap()),
                token,
                "test",
            )
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].state, ProbeState::Error);
        assert_eq!(outcomes[0].diagnostic.as_deref(), Some("cancelled"));
    }

    #[test]
    fn build_url_percent_encodes_identifier() {
        let url = build_url("https://x.example/{}", "a b@c.com").unwrap();
        assert_eq!(url, "https://x.example/a+b%40c.com");
    }

    #[test]
    fn build_body_escapes_quotes() {
        let body = build_body(r#"{"email":"{}"}"#, r#"a"b"#);
        assert_eq!(body, r#"{"email":"a\"b"}"#);
    }
}
