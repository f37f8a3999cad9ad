//! `GeoIpLookup(ip_or_domain)` — IPInfo-backed geolocation (§4.8).
//!
//! Grounded in the source's `IPInfoClient` (`ipinfo.io/{ip}/json?token=`).
//! Degrades to `NotConfigured` without aborting the scan when
//! `OSINT_GEOIP_API_KEY` is unset (§7 `AdapterError` policy).

use super::{env_api_key, Adapter};
use crate::cancellation::CancellationToken;
use crate::error::SectionError;
use crate::transport::{HttpMethod, Request, Transport};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const API_KEY_VAR: &str = "OSINT_GEOIP_API_KEY";

pub struct GeoIpLookup<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> GeoIpLookup<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: Transport> Adapter for GeoIpLookup<T> {
    fn section_name(&self) -> &'static str {
        "geoip"
    }

    async fn lookup(
        &self,
        ip_or_host: &str,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<serde_json::Value, SectionError> {
        let token = env_api_key(API_KEY_VAR)?;
        let request = Request {
            method: HttpMethod::Get,
            url: format!("https://ipinfo.io/{ip_or_host}/json?token={token}"),
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
                "ipinfo responded with status {}",
                response.status
            )));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| SectionError::Upstream(format!("malformed ipinfo response: {e}")))
    }
}
