//! `BreachLookup(email)` — XposedOrNot-backed breach check (§4.8).
//!
//! Grounded in the source's `XposedOrNotClient` (`api.xposedornot.com`,
//! free tier, no API key required — the one adapter in this set that
//! never degrades to `NotConfigured`).

use super::Adapter;
use crate::cancellation::CancellationToken;
use crate::error::SectionError;
use crate::transport::{HttpMethod, Request, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub struct BreachLookup<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> BreachLookup<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport> Adapter for BreachLookup<T> {
    fn section_name(&self) -> &'static str {
        "breach"
    }

    async fn lookup(
        &self,
        email: &str,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<serde_json::Value, SectionError> {
        let request = Request {
            method: HttpMethod::Get,
            url: format!("https://api.xposedornot.com/v1/check-email/{email}"),
            headers: vec![],
            body: vec![],
        };

        let response = self
            .transport
            .fetch(request, deadline, cancellation)
            .await
            .map_err(|e| SectionError::Upstream(e.to_string()))?;

        if response.status == 404 {
            return Ok(serde_json::json!({ "found": false, "breaches": [] }));
        }
        if response.status >= 400 {
            return Err(SectionError::Upstream(format!(
                "xposedornot responded with status {}",
                response.status
            )));
        }

        let body: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| SectionError::Upstream(format!("malformed xposedornot response: {e}")))?;

        let breaches = body
            .pointer("/breaches")
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![]));
        let found = breaches
            .as_array()
            .map(|arr| !arr.is_empty())
            .unwrap_or(false);

        Ok(serde_json::json!({ "found": found, "breaches": breaches }))
    }
}
