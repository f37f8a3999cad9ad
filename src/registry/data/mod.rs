//! The native probe tables, one module per identifier kind. Each entry
//! here was ingested from a single-request check a real service exposes;
//! multi-step token/cookie flows and checks that need a derived value
//! (not the raw identifier itself) were left out rather than forced into
//! the single-`{}` template model.

pub mod domain;
pub mod email;
pub mod phone;
pub mod username;
