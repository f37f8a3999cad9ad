//! Domain probe table.
//!
//! The source's domain module (`modules/domain_intel.py`) is mostly
//! adapter territory (WHOIS, DNS, SSL, security headers — see
//! `adapters::*`). The two entries below are the parts of that module
//! that fit the probe model: a single request whose response directly
//! answers "is there a trace of this domain somewhere public".

use crate::classifier::DecisionRule;
use crate::identifier::IdentifierKind;
use crate::registry::{Method, Probe, Tier};

pub fn probes() -> Vec<Probe> {
    vec![
        Probe {
            id: "domain-crtsh-certificate-transparency",
            display_name: "crt.sh Certificate Transparency",
            identifier_kind: IdentifierKind::Domain,
            category: "Tech",
            url_template: "https://crt.sh/?q=%.{}&output=json",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::ContentAbsent {
                markers: vec!["[]".to_string()],
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "domain-wayback-availability",
            display_name: "Wayback Machine",
            identifier_kind: IdentifierKind::Domain,
            category: "Other",
            url_template: "https://archive.org/wayback/available?url={}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/archived_snapshots/closest".to_string(),
                expected_status: 200,
            },
            tier: Tier::Quick,
            nsfw: false,
        },
    ]
}
