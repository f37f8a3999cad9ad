//! `DnsLookup(domain)` — A/AAAA/MX/NS/TXT records (§4.8).
//!
//! Grounded in the source's `_get_dns_records` (resolver-based record
//! enumeration); re-expressed here over `hickory-resolver` instead of a
//! shelled-out `dig`/`nslookup` call.

use super::Adapter;
use crate::cancellation::CancellationToken;
use crate::error::SectionError;
use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde_json::json;
use std::time::Duration;

pub struct DnsLookup {
    resolver: TokioAsyncResolver,
}

impl DnsLookup {
    pub fn new() -> Result<Self, SectionError> {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        Ok(Self { resolver })
    }
}

#[async_trait]
impl Adapter for DnsLookup {
    fn section_name(&self) -> &'static str {
        "dns"
    }

    async fn lookup(
        &self,
        domain: &str,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<serde_json::Value, SectionError> {
        let work = async {
            let a: Vec<String> = self
                .resolver
                .ipv4_lookup(domain)
                .await
                .map(|r| r.iter().map(|ip| ip.to_string()).collect())
                .unwrap_or_default();
            let aaaa: Vec<String> = self
                .resolver
                .ipv6_lookup(domain)
                .await
                .map(|r| r.iter().map(|ip| ip.to_string()).collect())
                .unwrap_or_default();
            let mx: Vec<String> = self
                .resolver
                .mx_lookup(domain)
                .await
                .map(|r| r.iter().map(|m| m.exchange().to_string()).collect())
                .unwrap_or_default();
            let ns: Vec<String> = self
                .resolver
                .ns_lookup(domain)
                .await
                .map(|r| r.iter().map(|n| n.to_string()).collect())
                .unwrap_or_default();
            let txt: Vec<String> = self
                .resolver
                .txt_lookup(domain)
                .await
                .map(|r| r.iter().map(|t| t.to_string()).collect())
                .unwrap_or_default();

            if a.is_empty() && aaaa.is_empty() && mx.is_empty() && ns.is_empty() && txt.is_empty() {
                return Err(SectionError::Upstream("no DNS records found".to_string()));
            }

            Ok(json!({ "a": a, "aaaa": aaaa, "mx": mx, "ns": ns, "txt": txt }))
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
