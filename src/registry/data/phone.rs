//! Phone probe table.
//!
//! Most of the source's phone checkers are unconditional stubs returning
//! `exists: False` without ever making a request (WhatsApp, Truecaller,
//! Signal, Viber, Line) — there is no real behaviour to ground a probe
//! on, so they are not carried forward. Only the two checkers that
//! actually issue a request and inspect a real signal are kept.

use crate::classifier::DecisionRule;
use crate::identifier::IdentifierKind;
use crate::registry::{Method, Probe, Tier};

pub fn probes() -> Vec<Probe> {
    vec![
        Probe {
            id: "phone-telegram-public-profile",
            display_name: "Telegram",
            identifier_kind: IdentifierKind::Phone,
            category: "Chat",
            url_template: "https://t.me/+{}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::ContentPresent {
                markers: vec!["tgme_page_title".to_string()],
                expected_status: 200,
            },
            tier: Tier::Quick,
            nsfw: false,
        },
        Probe {
            id: "phone-snapchat-username-suggestions",
            display_name: "Snapchat",
            identifier_kind: IdentifierKind::Phone,
            category: "Social",
            url_template: "https://accounts.snapchat.com/accounts/get_username_suggestions",
            method: Method::Post,
            body_template: Some(r#"{"phone":"+{}"}"#),
            headers: &[("Content-Type", "application/json")],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/suggestions".to_string(),
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
    ]
}
