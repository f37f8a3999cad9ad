//! HTTP Transport (C2, §4.2).
//!
//! Mirrors the teacher's `HttpClientTrait`/`HealthCheckClient` split: a
//! thin async trait at the seam, a production `isahc`-backed
//! implementation, and a routed mock used by every test in this crate.
//! Owned by the Orchestrator for the lifetime of one scan — there is no
//! process-wide client (§9 "global HTTP client / process-wide state").

use crate::cancellation::CancellationToken;
use crate::error::TransportError;
use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A realistic desktop/mobile user-agent pool (§4.2). Ported from the
/// source's `USER_AGENTS` list.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub struct Request {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub final_url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Picks one user-agent per request with a reproducible-per-scan
/// pseudo-random sequence (§4.2). Seeded once at orchestrator start.
pub struct UaRotation {
    rng: Mutex<SmallRng>,
}

impl UaRotation {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }

    pub fn next(&self) -> &'static str {
        let mut rng = self.rng.lock().expect("ua rotation mutex poisoned");
        let idx = rng.gen_range(0..USER_AGENTS.len());
        USER_AGENTS[idx]
    }
}

/// The transport contract (§4.2): one request, one deadline, one
/// cancellation signal, one response or typed error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        request: Request,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<Response, TransportError>;
}

/// Production transport: a pooled `isahc::HttpClient` plus UA rotation
/// and redirect-following up to `max_redirects` (§4.2).
pub struct IsahcTransport {
    client: isahc::HttpClient,
    ua: UaRotation,
}

impl IsahcTransport {
    pub fn new(pool_capacity: usize, max_redirects: u8, ua_seed: u64) -> Result<Self, TransportError> {
        use isahc::config::Configurable;

        let client = isahc::HttpClient::builder()
            .max_connections(pool_capacity)
            .redirect_policy(isahc::config::RedirectPolicy::Limit(max_redirects as u32))
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Self {
            client,
            ua: UaRotation::new(ua_seed),
        })
    }
}

#[async_trait]
impl Transport for IsahcTransport {
    async fn fetch(
        &self,
        request: Request,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<Response, TransportError> {
        use isahc::config::Configurable;
        use isahc::AsyncReadResponseExt;

        let mut builder = match request.method {
            HttpMethod::Get => isahc::Request::get(&request.url),
            HttpMethod::Post => isahc::Request::post(&request.url),
        };
        builder = builder
            .timeout(deadline)
            .header("User-Agent", self.ua.next());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let built = builder
            .body(request.body.clone())
            .map_err(|e| TransportError::MalformedUrl(e.to_string()))?;

        let send = self.client.send_async(built);
        let cancelled = cancellation.cancelled();
        tokio::pin!(send);
        tokio::pin!(cancelled);

        let mut response = tokio::select! {
            res = &mut send => res.map_err(classify_isahc_error)?,
            _ = &mut cancelled => return Err(TransportError::Cancelled),
        };

        let final_url = response
            .effective_uri()
            .map(|u| u.to_string())
            .unwrap_or_else(|| request.url.clone());

        let status = response.status().as_u16();
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.to_string().to_lowercase(), v.to_string());
            }
        }

        let body_future = response.bytes();
        tokio::pin!(body_future);
        let cancelled = cancellation.cancelled();
        tokio::pin!(cancelled);
        let body = tokio::select! {
            res = &mut body_future => res.map_err(|e| TransportError::Protocol(e.to_string()))?,
            _ = &mut cancelled => return Err(TransportError::Cancelled),
        };

        Ok(Response {
            status,
            final_url,
            headers,
            body: body.to_vec(),
        })
    }
}

fn classify_isahc_error(err: isahc::Error) -> TransportError {
    use isahc::error::ErrorKind;
    match err.kind() {
        ErrorKind::Timeout => TransportError::Timeout,
        ErrorKind::ConnectionFailed | ErrorKind::NameResolution => {
            TransportError::Connect(err.to_string())
        }
        ErrorKind::TlsEngine | ErrorKind::BadServerCertificate | ErrorKind::ClientCertificate => {
            TransportError::Tls(err.to_string())
        }
        ErrorKind::TooManyRedirects => TransportError::TooManyRedirects,
        ErrorKind::InvalidRequest => TransportError::MalformedUrl(err.to_string()),
        _ => TransportError::Protocol(err.to_string()),
    }
}

/// A canned response keyed by `(method, url)`, used by `MockTransport`.
#[derive(Debug)]
pub enum MockStep {
    Reply(Response),
    Err(TransportError),
    /// Sleeps for the given duration before replying 200, honouring
    /// cancellation exactly like `IsahcTransport`. Used to simulate a
    /// probe that is still in flight when a scan deadline fires.
    Stall(Duration),
}

/// Routes requests to a scripted sequence of responses by `(method, url)`.
/// Grounded in the teacher's `TestHttpClient` pattern: a map from request
/// identity to a queue of canned outcomes, consumed in order so a single
/// probe id can script a retry sequence (§8 testable property #7).
pub struct MockTransport {
    routes: Mutex<HashMap<(HttpMethod, String), std::collections::VecDeque<MockStep>>>,
    calls: Mutex<Vec<(HttpMethod, String, Instant)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, method: HttpMethod, url: &str, steps: Vec<MockStep>) {
        self.routes
            .lock()
            .unwrap()
            .insert((method, url.to_string()), steps.into());
    }

    /// The number of times a given `(method, url)` was actually invoked.
    pub fn call_count(&self, method: HttpMethod, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, u, _)| *m == method && u == url)
            .count()
    }

    pub fn call_log(&self) -> Vec<(HttpMethod, String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch(
        &self,
        request: Request,
        _deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<Response, TransportError> {
        if cancellation.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        self.calls
            .lock()
            .unwrap()
            .push((request.method, request.url.clone(), Instant::now()));

        let key = (request.method, request.url.clone());
        let mut routes = self.routes.lock().unwrap();
        let step = routes
            .get_mut(&key)
            .and_then(|q| if q.len() > 1 { q.pop_front() } else { q.front().cloned() });

        drop(routes);

        match step {
            Some(MockStep::Reply(resp)) => Ok(resp),
            Some(MockStep::Err(err)) => Err(err),
            Some(MockStep::Stall(duration)) => {
                let sleep = tokio::time::sleep(duration);
                let cancelled = cancellation.cancelled();
                tokio::pin!(sleep);
                tokio::pin!(cancelled);
                tokio::select! {
                    _ = &mut sleep => Ok(Response {
                        status: 200,
                        final_url: request.url.clone(),
                        headers: HashMap::new(),
                        body: Vec::new(),
                    }),
                    _ = &mut cancelled => Err(TransportError::Cancelled),
                }
            }
            None => Err(TransportError::Connect(format!(
                "no mock route scripted for {:?} {}",
                request.method, request.url
            ))),
        }
    }
}

impl Clone for MockStep {
    fn clone(&self) -> Self {
        match self {
            MockStep::Reply(r) => MockStep::Reply(r.clone()),
            MockStep::Err(e) => MockStep::Err(e.clone()),
            MockStep::Stall(d) => MockStep::Stall(*d),
        }
    }
}
