//! `CarrierLookup(phone)` — Numverify-backed carrier/line-type lookup
//! (§4.8).
//!
//! Grounded in the source's `NumverifyClient` (`apilayer.net/api/validate`).
//! Degrades to `NotConfigured` without aborting the scan when
//! `OSINT_CARRIER_API_KEY` is unset (§7 `AdapterError` policy).

use super::{env_api_key, Adapter};
use crate::cancellation::CancellationToken;
use crate::error::SectionError;
use crate::transport::{HttpMethod, Request, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const API_KEY_VAR: &str = "OSINT_CARRIER_API_KEY";

pub struct CarrierLookup<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> CarrierLookup<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport> Adapter for CarrierLookup<T> {
    fn section_name(&self) -> &'static str {
        "carrier"
    }

    async fn lookup(
        &self,
        phone_e164: &str,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<serde_json::Value, SectionError> {
        let access_key = env_api_key(API_KEY_VAR)?;
        let number = phone_e164.trim_start_matches('+');
        let request = Request {
            method: HttpMethod::Get,
            url: format!(
                "http://apilayer.net/api/validate?access_key={access_key}&number={number}&format=1"
            ),
            headers: vec![],
            body: vec![],
        };

        let response = self
            .transport
            .fetch(request, deadline, cancellation)
            .await
            .map_err(|e| SectionError::Upstream(e.to_string()))?;

        if response.status >= 400 {
            return Err(SectionError::Upstream(format!(
                "numverify responded with status {}",
                response.status
            )));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| SectionError::Upstream(format!("malformed numverify response: {e}")))
    }
}
