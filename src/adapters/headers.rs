//! `HttpHeaderInspect(domain)` — security header posture (§4.8).
//!
//! Grounded in the source's `_check_security_headers`; reuses the same
//! `Transport` seam as the probe engine instead of a second HTTP stack.

use super::Adapter;
use crate::cancellation::CancellationToken;
use crate::error::SectionError;
use crate::transport::{HttpMethod, Request, Transport};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const INSPECTED_HEADERS: &[&str] = &[
    "strict-transport-security",
    "content-security-policy",
    "x-frame-options",
    "x-content-type-options",
    "referrer-policy",
];

pub struct HttpHeaderInspect<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> HttpHeaderInspect<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport> Adapter for HttpHeaderInspect<T> {
    fn section_name(&self) -> &'static str {
        "headers"
    }

    async fn lookup(
        &self,
        domain: &str,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<serde_json::Value, SectionError> {
        let request = Request {
            method: HttpMethod::Get,
            url: format!("https://{domain}/"),
            headers: vec![],
            body: vec![],
        };

        let response = self
            .transport
            .fetch(request, deadline, cancellation)
            .await
            .map_err(|e| SectionError::Upstream(e.to_string()))?;

        let present: Vec<&str> = INSPECTED_HEADERS
            .iter()
            .filter(|h| response.headers.contains_key(**h))
            .copied()
            .collect();
        let missing: Vec<&str> = INSPECTED_HEADERS
            .iter()
            .filter(|h| !response.headers.contains_key(**h))
            .copied()
            .collect();

        Ok(json!({
            "status": response.status,
            "present": present,
            "missing": missing,
        }))
    }
}
