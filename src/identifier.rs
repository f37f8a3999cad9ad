//! The `Identifier` data model (§3).
//!
//! An `Identifier` is immutable for the lifetime of one scan and is
//! validated once, at orchestrator entry, before any probe is dispatched.

use crate::error::IdentifierError;
use serde::Serialize;
use std::fmt;

/// Which kind of identifier a probe or registry selection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Username,
    Email,
    Phone,
    Domain,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IdentifierKind::Username => "username",
            IdentifierKind::Email => "email",
            IdentifierKind::Phone => "phone",
            IdentifierKind::Domain => "domain",
        };
        write!(f, "{s}")
    }
}

/// The target of a scan. Each variant carries its own validation
/// constraints (§3). Construct via the `parse_*` associated functions, not
/// the tuple constructors directly, so invalid values cannot exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Identifier {
    Username(String),
    Email(String),
    Phone(String),
    Domain(String),
}

impl Identifier {
    pub fn kind(&self) -> IdentifierKind {
        match self {
            Identifier::Username(_) => IdentifierKind::Username,
            Identifier::Email(_) => IdentifierKind::Email,
            Identifier::Phone(_) => IdentifierKind::Phone,
            Identifier::Domain(_) => IdentifierKind::Domain,
        }
    }

    /// The raw value, used to substitute into a probe's `url_template`.
    pub fn value(&self) -> &str {
        match self {
            Identifier::Username(v)
            | Identifier::Email(v)
            | Identifier::Phone(v)
            | Identifier::Domain(v) => v,
        }
    }

    pub fn parse_username(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if trimmed.chars().count() < 2 {
            return Err(IdentifierError::UsernameTooShort);
        }
        Ok(Identifier::Username(trimmed.to_string()))
    }

    pub fn parse_email(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if !looks_like_email(trimmed) {
            return Err(IdentifierError::InvalidEmailShape(trimmed.to_string()));
        }
        Ok(Identifier::Email(trimmed.to_lowercase()))
    }

    pub fn parse_phone(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim();
        if !looks_like_e164(trimmed) {
            return Err(IdentifierError::InvalidPhoneShape(trimmed.to_string()));
        }
        Ok(Identifier::Phone(trimmed.to_string()))
    }

    pub fn parse_domain(raw: &str) -> Result<Self, IdentifierError> {
        let trimmed = raw.trim().trim_end_matches('.');
        if !looks_like_domain(trimmed) {
            return Err(IdentifierError::InvalidDomainShape(trimmed.to_string()));
        }
        Ok(Identifier::Domain(trimmed.to_lowercase()))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Deliberately loose RFC-5322-shaped check: one `@`, a non-empty local
/// part, a domain part with at least one dot and no whitespace.
fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !s.chars().any(char::is_whitespace)
        && s.matches('@').count() == 1
}

/// E.164: optional leading '+', 8-15 digits, first digit non-zero.
fn looks_like_e164(s: &str) -> bool {
    let digits = s.strip_prefix('+').unwrap_or(s);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let len = digits.chars().count();
    (8..=15).contains(&len) && !digits.starts_with('0')
}

/// Domain labels: 1-63 chars each, alphanumeric plus hyphen, no leading or
/// trailing hyphen, at least one dot.
fn looks_like_domain(s: &str) -> bool {
    if s.is_empty() || !s.contains('.') {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rejects_single_char() {
        assert_eq!(
            Identifier::parse_username("a"),
            Err(IdentifierError::UsernameTooShort)
        );
        assert!(Identifier::parse_username("ab").is_ok());
    }

    #[test]
    fn email_requires_at_and_dot() {
        assert!(Identifier::parse_email("alice@example.com").is_ok());
        assert!(Identifier::parse_email("alice@example").is_err());
        assert!(Identifier::parse_email("not-an-email").is_err());
        assert!(Identifier::parse_email("a b@example.com").is_err());
    }

    #[test]
    fn email_lowercases() {
        let id = Identifier::parse_email("Alice@Example.COM").unwrap();
        assert_eq!(id.value(), "alice@example.com");
    }

    #[test]
    fn phone_requires_e164_shape() {
        assert!(Identifier::parse_phone("+14155551234").is_ok());
        assert!(Identifier::parse_phone("14155551234").is_ok());
        assert!(Identifier::parse_phone("0123").is_err());
        assert!(Identifier::parse_phone("+1-415-555-1234").is_err());
        assert!(Identifier::parse_phone("abc").is_err());
    }

    #[test]
    fn domain_requires_labels() {
        assert!(Identifier::parse_domain("example.com").is_ok());
        assert!(Identifier::parse_domain("sub.example.com").is_ok());
        assert!(Identifier::parse_domain("-bad.com").is_err());
        assert!(Identifier::parse_domain("nodot").is_err());
        assert!(Identifier::parse_domain("example.com.").unwrap().value() == "example.com");
    }
}
