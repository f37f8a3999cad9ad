//! Email probe table.
//!
//! Each probe below descends from a real per-site check: the platform's
//! actual email-availability/signup endpoint and the field that endpoint
//! uses to signal "already registered". Checks that required a derived
//! value (e.g. a guessed username, an MD5-hashed avatar URL) or a
//! multi-step CSRF/cookie handshake before the real request were left
//! out — they don't fit the single substituted `{}` template.

use crate::classifier::DecisionRule;
use crate::identifier::IdentifierKind;
use crate::registry::{Method, Probe, Tier};
use serde_json::json;

pub fn probes() -> Vec<Probe> {
    vec![
        Probe {
            id: "email-twitter-available",
            display_name: "Twitter / X",
            identifier_kind: IdentifierKind::Email,
            category: "Social",
            url_template: "https://api.twitter.com/i/users/email_available.json?email={}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/taken".to_string(),
                expected_status: 200,
            },
            tier: Tier::Quick,
            nsfw: false,
        },
        Probe {
            id: "email-discord-register",
            display_name: "Discord",
            identifier_kind: IdentifierKind::Email,
            category: "Chat",
            url_template: "https://discord.com/api/v9/auth/register",
            method: Method::Post,
            body_template: Some(
                r#"{"email":"{}","username":"reconprobe_check","password":"Tr0ub4dor&3xz9","consent":true}"#,
            ),
            headers: &[("Content-Type", "application/json")],
            decision: DecisionRule::ContentPresent {
                markers: vec!["already registered".to_string()],
                expected_status: 200,
            },
            tier: Tier::Quick,
            nsfw: false,
        },
        Probe {
            id: "email-github-signup-check",
            display_name: "GitHub",
            identifier_kind: IdentifierKind::Email,
            category: "Tech",
            url_template: "https://github.com/signup_check/email?value={}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::ContentPresent {
                markers: vec!["already taken".to_string()],
                expected_status: 200,
            },
            tier: Tier::Quick,
            nsfw: false,
        },
        Probe {
            id: "email-spotify-signup-validate",
            display_name: "Spotify",
            identifier_kind: IdentifierKind::Email,
            category: "Music",
            url_template: "https://spclient.wg.spotify.com/signup/public/v1/account?validate=1&email={}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::JsonFieldEquals {
                pointer: "/status".to_string(),
                expected: json!(20),
                expected_status: 200,
            },
            tier: Tier::Quick,
            nsfw: false,
        },
        Probe {
            id: "email-notion-login",
            display_name: "Notion",
            identifier_kind: IdentifierKind::Email,
            category: "Productivity",
            url_template: "https://www.notion.so/api/v3/loginWithEmail",
            method: Method::Post,
            body_template: Some(r#"{"email":"{}"}"#),
            headers: &[("Content-Type", "application/json")],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/hasAccount".to_string(),
                expected_status: 200,
            },
            tier: Tier::Quick,
            nsfw: false,
        },
        Probe {
            id: "email-tumblr-availability",
            display_name: "Tumblr",
            identifier_kind: IdentifierKind::Email,
            category: "Social",
            url_template: "https://www.tumblr.com/api/v2/register/email_available",
            method: Method::Post,
            body_template: Some(r#"{"email":"{}"}"#),
            headers: &[("Content-Type", "application/json")],
            decision: DecisionRule::JsonFieldEquals {
                pointer: "/response/available".to_string(),
                expected: json!(false),
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "email-wordpress-auth-options",
            display_name: "WordPress.com",
            identifier_kind: IdentifierKind::Email,
            category: "Productivity",
            url_template: "https://public-api.wordpress.com/rest/v1.1/users/email/{}/auth-options",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::StatusExists { expected: 200 },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "email-firefox-account-status",
            display_name: "Firefox Accounts",
            identifier_kind: IdentifierKind::Email,
            category: "Other",
            url_template: "https://accounts.firefox.com/api/account/status",
            method: Method::Post,
            body_template: Some(r#"{"email":"{}"}"#),
            headers: &[("Content-Type", "application/json")],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/exists".to_string(),
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "email-adobe-validate",
            display_name: "Adobe",
            identifier_kind: IdentifierKind::Email,
            category: "Other",
            url_template: "https://adobeid-na1.services.adobe.com/renga-idprovider/pages/validate_email",
            method: Method::Post,
            body_template: Some("email={}"),
            headers: &[("Content-Type", "application/x-www-form-urlencoded")],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/valid".to_string(),
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "email-duolingo-users",
            display_name: "Duolingo",
            identifier_kind: IdentifierKind::Email,
            category: "Other",
            url_template: "https://www.duolingo.com/2017-06-30/users?email={}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/users".to_string(),
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "email-patreon-signup",
            display_name: "Patreon",
            identifier_kind: IdentifierKind::Email,
            category: "Other",
            url_template: "https://www.patreon.com/api/auth/signup",
            method: Method::Post,
            body_template: Some(r#"{"email":"{}","password":"Tr0ub4dor&3xz9"}"#),
            headers: &[("Content-Type", "application/json")],
            decision: DecisionRule::ContentPresent {
                markers: vec!["already".to_string()],
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "email-deezer-validation",
            display_name: "Deezer",
            identifier_kind: IdentifierKind::Email,
            category: "Music",
            url_template: "https://www.deezer.com/ajax/gw-light.php?method=user.getEmailValidation&api_token=null&api_version=1.0&input=3&email={}",
            method: Method::Post,
            body_template: Some("email={}"),
            headers: &[("Content-Type", "application/x-www-form-urlencoded")],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/results/USER".to_string(),
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "email-etsy-exists",
            display_name: "Etsy",
            identifier_kind: IdentifierKind::Email,
            category: "Shopping",
            url_template: "https://www.etsy.com/api/v3/ajax/member/email-exists?email={}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: "/exists".to_string(),
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
    ]
}
