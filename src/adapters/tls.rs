//! `TlsCertLookup(domain)` — leaf certificate inspection (§4.8).
//!
//! Grounded in the source's `_get_ssl_info` (`ssl`-module handshake +
//! certificate parsing); re-expressed over `tokio-rustls` for the
//! handshake and `x509-parser` for the DER fields, both already part of
//! this stack's adapter set.

use super::Adapter;
use crate::cancellation::CancellationToken;
use crate::error::SectionError;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::rustls::{self, OwnedTrustAnchor, ServerName};
use tokio_rustls::TlsConnector;
use x509_parser::prelude::*;

const TLS_PORT: u16 = 443;

pub struct TlsCertLookup {
    connector: TlsConnector,
}

impl TlsCertLookup {
    pub fn new() -> Self {
        let mut roots = rustls::RootCertStore::empty();
        roots.add_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.iter().map(|ta| {
            OwnedTrustAnchor::from_subject_spki_name_constraints(
                ta.subject,
                ta.spki,
                ta.name_constraints,
            )
        }));
        let config = rustls::ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Self {
            connector: TlsConnector::from(Arc::new(config)),
        }
    }
}

impl Default for TlsCertLookup {
    fn default() -> Self {
        Self::new()
    }
}

fn format_name(name: &x509_parser::x509::X509Name<'_>) -> String {
    name.to_string()
}

#[async_trait]
impl Adapter for TlsCertLookup {
    fn section_name(&self) -> &'static str {
        "tls"
    }

    async fn lookup(
        &self,
        domain: &str,
        deadline: Duration,
        cancellation: &CancellationToken,
    ) -> Result<serde_json::Value, SectionError> {
        let work = async {
            let tcp = TcpStream::connect((domain, TLS_PORT))
                .await
                .map_err(|e| SectionError::Upstream(format!("connect failed: {e}")))?;
            let server_name = ServerName::try_from(domain)
                .map_err(|_| SectionError::Upstream(format!("invalid DNS name: {domain}")))?;
            let tls_stream = self
                .connector
                .connect(server_name, tcp)
                .await
                .map_err(|e| SectionError::Upstream(format!("handshake failed: {e}")))?;

            let (_, session) = tls_stream.get_ref();
            let der_chain = session
                .peer_certificates()
                .ok_or_else(|| SectionError::Upstream("no peer certificate presented".to_string()))?;
            let leaf_der = der_chain
                .first()
                .ok_or_else(|| SectionError::Upstream("empty certificate chain".to_string()))?;

            let (_, cert) = X509Certificate::from_der(leaf_der.as_ref())
                .map_err(|e| SectionError::Upstream(format!("certificate parse failed: {e}")))?;

            let subject = format_name(cert.subject());
            let issuer = format_name(cert.issuer());
            let not_before = cert.validity().not_before.to_rfc2822();
            let not_after = cert.validity().not_after.to_rfc2822();
            let is_expired = cert.validity().time_to_expiration().is_none();
            let san: Vec<String> = cert
                .subject_alternative_name()
                .ok()
                .flatten()
                .map(|ext| {
                    ext.value
                        .general_names
                        .iter()
                        .map(|n| n.to_string())
                        .collect()
                })
                .unwrap_or_default();

            Ok(json!({
                "subject": subject,
                "issuer": issuer,
                "not_before": not_before,
                "not_after": not_after,
                "is_expired": is_expired,
                "subject_alternative_names": san,
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
