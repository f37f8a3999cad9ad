//! Username probe table.
//!
//! The source code enumerates usernames by shelling out to third-party
//! CLI tools (maigret/holehe) and parsing their stdout or a temp JSON
//! report (§9 "shelling out to external CLIs" and "duplicate module
//! files"). That process-launch + temp-file pattern is exactly what the
//! rewrite forbids; these entries re-express the same profile-existence
//! signal as native single-request probes instead.

use crate::classifier::DecisionRule;
use crate::identifier::IdentifierKind;
use crate::registry::{Method, Probe, Tier};

pub fn probes() -> Vec<Probe> {
    vec![
        Probe {
            id: "username-github-users-api",
            display_name: "GitHub",
            identifier_kind: IdentifierKind::Username,
            category: "Tech",
            url_template: "https://api.github.com/users/{}",
            method: Method::Get,
            body_template: None,
            headers: &[("Accept", "application/vnd.github+json")],
            decision: DecisionRule::StatusExists { expected: 200 },
            tier: Tier::Quick,
            nsfw: false,
        },
        Probe {
            id: "username-gitlab-users-api",
            display_name: "GitLab",
            identifier_kind: IdentifierKind::Username,
            category: "Tech",
            url_template: "https://gitlab.com/api/v4/users?username={}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::JsonFieldTruthy {
                pointer: String::new(),
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "username-reddit-about",
            display_name: "Reddit",
            identifier_kind: IdentifierKind::Username,
            category: "Social",
            url_template: "https://www.reddit.com/user/{}/about.json",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::StatusExists { expected: 200 },
            tier: Tier::Quick,
            nsfw: false,
        },
        Probe {
            id: "username-hackernews-user",
            display_name: "Hacker News",
            identifier_kind: IdentifierKind::Username,
            category: "Tech",
            url_template: "https://hacker-news.firebaseio.com/v0/user/{}.json",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::ContentAbsent {
                markers: vec!["null".to_string()],
                expected_status: 200,
            },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "username-dockerhub-users-api",
            display_name: "Docker Hub",
            identifier_kind: IdentifierKind::Username,
            category: "Tech",
            url_template: "https://hub.docker.com/v2/users/{}/",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::StatusExists { expected: 200 },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "username-pypi-user-page",
            display_name: "PyPI",
            identifier_kind: IdentifierKind::Username,
            category: "Tech",
            url_template: "https://pypi.org/user/{}/",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::StatusExists { expected: 200 },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "username-npm-profile",
            display_name: "npm",
            identifier_kind: IdentifierKind::Username,
            category: "Tech",
            url_template: "https://registry.npmjs.org/-/user/org.couchdb.user:{}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::StatusExists { expected: 200 },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "username-mastodon-social-profile",
            display_name: "Mastodon (mastodon.social)",
            identifier_kind: IdentifierKind::Username,
            category: "Social",
            url_template: "https://mastodon.social/@{}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::StatusExists { expected: 200 },
            tier: Tier::Deep,
            nsfw: false,
        },
        Probe {
            id: "username-telegram-public-profile",
            display_name: "Telegram",
            identifier_kind: IdentifierKind::Username,
            category: "Chat",
            url_template: "https://t.me/{}",
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
            id: "username-steamcommunity-profile",
            display_name: "Steam Community",
            identifier_kind: IdentifierKind::Username,
            category: "Gaming",
            url_template: "https://steamcommunity.com/id/{}",
            method: Method::Get,
            body_template: None,
            headers: &[],
            decision: DecisionRule::ContentAbsent {
                markers: vec!["The specified profile could not be found".to_string()],
                expected_status: 200,
            },
            tier: Tier::Quick,
            nsfw: false,
        },
    ]
}
