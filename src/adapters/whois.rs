//! `WhoisLookup(domain)` (§4.8) — hand-rolled RFC 3912 client.
//!
//! No crate in this workspace's stack speaks WHOIS, and fabricating a
//! dependency is out of bounds, so this implements the protocol
//! directly: it is a trivial line-oriented request over a raw TCP
//! socket (query the IANA root, then follow one referral if present).
//! Supplements the source's `_get_whois` (`python-whois`-backed) with
//! the same signal, without shelling out or vendoring a library.

use super::Adapter;
use crate::cancellation::CancellationToken;
use crate::error::SectionError;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const IANA_WHOIS_HOST: &str = "whois.iana.org";
const WHOIS_PORT: u16 = 43;

pub struct WhoisLookup;

impl WhoisLookup {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WhoisLookup {
    fn default() -> Self {
        Self::new()
    }
}

async fn query(host: &str, query: &str) -> Result<String, SectionError> {
    let mut stream = TcpStream::connect((host, WHOIS_PORT))
        .await
        .map_err(|e| SectionError::Upstream(format!("connect to {host} failed: {e}")))?;
    stream
        .write_all(format!("{query}\r\n").as_bytes())
        .await
        .map_err(|e| SectionError::Upstream(e.to_string()))?;
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .await
        .map_err(|e| SectionError::Upstream(e.to_string()))?;
    Ok(String::from_utf8_lossy(&buf).to_string())
}

fn find_referral(body: &str) -> Option<String> {
    body.lines().find_map(|line| {
        let lower = line.to_ascii_lowercase();
        lower
            .strip_prefix("refer:")
            .or_else(|| lower.strip_prefix("whois:"))
            .map(|rest| rest.trim().to_string())
    })
}

fn extract_field<'a>(body: &'a str, labels: &[&str]) -> Option<&'a str> {
    body.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        let key = key.trim().to_ascii_lowercase();
        if labels.iter().any(|l| l.eq_ignore_ascii_case(&key)) {
            Some(value.trim())
        } else {
            None
        }
    })
}

#[async_trait]
impl Adapter for WhoisLookup {
    fn section_name(&self) -> &'static str {
        "whois"
    }

    async fn lookup(
        &self,
        domain: &str,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<serde_json::Value, SectionError> {
        let work = async {
            let root_response = query(IANA_WHOIS_HOST, domain).await?;
            let body = match find_referral(&root_response) {
                Some(referral_host) if referral_host != IANA_WHOIS_HOST => {
                    query(&referral_host, domain).await?
                }
                _ => root_response,
            };

            let registrar = extract_field(&body, &["registrar", "sponsoring registrar"]);
            let created = extract_field(&body, &["creation date", "created", "domain registration date"]);
            let expires = extract_field(&body, &["registry expiry date", "expiration date", "expiry date"]);
            let name_servers: Vec<&str> = body
                .lines()
                .filter_map(|line| line.split_once(':'))
                .filter(|(k, _)| k.trim().eq_ignore_ascii_case("name server"))
                .map(|(_, v)| v.trim())
                .collect();

            Ok(json!({
                "registrar": registrar,
                "created": created,
                "expires": expires,
                "name_servers": name_servers,
                "raw_available": true,
            }))
        };

        let timeout = tokio::time::sleep(deadline);
        let cancelled = cancellation.cancelled();
        tokio::pin!(work);
        tokio::pin!(timeout);
        tokio::pin!(cancelled);

        tokio::select! {
            result = &mut work => result,
            _ = &mut timeout => Err(SectionError::Timeout),
            _ = &mut cancelled => Err(SectionError::Timeout),
        }
    }
}
