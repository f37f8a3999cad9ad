//! Central error taxonomy for the probe engine (§7 of the design).
//!
//! Mirrors the teacher's `ProxyHealthError` / `NetworkError` shape: one
//! `thiserror`-derived enum per concern, composed into a top-level
//! `AppError` that every public entry point returns.

use thiserror::Error;

/// Errors raised while parsing or validating an `Identifier`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("username must be at least 2 characters")]
    UsernameTooShort,
    #[error("email does not look like a valid address: {0}")]
    InvalidEmailShape(String),
    #[error("phone number is not in E.164 form: {0}")]
    InvalidPhoneShape(String),
    #[error("domain has an invalid label: {0}")]
    InvalidDomainShape(String),
}

/// Errors raised while building or querying the probe registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate probe id: {0}")]
    DuplicateId(String),
    #[error("probe {0} must substitute its identifier at least once across url_template/body_template, found {1}")]
    BadPlaceholderCount(String, usize),
    #[error("probe id not found: {0}")]
    UnknownProbeId(String),
    #[error("registry for identifier kind {0:?} has no probes")]
    EmptyKind(String),
}

/// Errors surfaced by the HTTP transport. These are always either retried
/// (transient) by the executor or turned into `ProbeOutcome::error`
/// (permanent) — they never reach a caller directly except wrapped in
/// `AppError::Internal` for truly unexpected conditions.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("request was cancelled")]
    Cancelled,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("TLS error: {0}")]
    Tls(String),
    #[error("malformed url: {0}")]
    MalformedUrl(String),
    #[error("too many redirects")]
    TooManyRedirects,
    #[error("http protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Whether this transport failure is worth retrying under the same
    /// host pacer slot (§4.5 retry policy).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout | TransportError::Connect(_) | TransportError::Protocol(_)
        )
    }
}

/// Errors scoped to a single external adapter (§4.8). An adapter error
/// never aborts the scan — it degrades that adapter's report section.
#[derive(Debug, Error, Clone)]
pub enum SectionError {
    #[error("adapter not configured (missing API key or prerequisite)")]
    NotConfigured,
    #[error("adapter timed out")]
    Timeout,
    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Top-level error type returned by the orchestrator's public entry points.
///
/// Cancellation and deadline expiry are deliberately not represented here
/// (§7): they never abort a scan, so they never produce an `Err`. A
/// cancelled or deadline-exceeded scan still returns `Ok(ScanReport)`,
/// distinguished by `ScanReport::termination`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(#[from] IdentifierError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("internal invariant violated: {0}")]
    Internal(String),
}
