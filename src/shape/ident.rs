//! Identifier extraction from catalog resource URLs
//!
//! Every catalog resource is addressed by a canonical URL whose last path
//! segment is its numeric id, e.g. `https://swapi.dev/api/people/1/`.
//! That integer is what the relational tables use as primary and foreign keys.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

// scheme://host/<prefix segments>/<resource>/<id>/
static RESOURCE_URL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^/\s]+/(?:[^/\s]+/)*?([A-Za-z_-]+)/([0-9]+)/$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("malformed resource url {url:?}: {reason}")]
    Malformed { url: String, reason: &'static str },
}

impl IdentifierError {
    fn malformed(url: &str, reason: &'static str) -> Self {
        IdentifierError::Malformed {
            url: url.to_string(),
            reason,
        }
    }
}

/// A parsed resource URL: which collection, and which member of it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRef {
    pub resource: String,
    pub id: i64,
}

/// Parse a canonical resource URL into its collection name and id
pub fn parse_ref(url: &str) -> Result<ResourceRef, IdentifierError> {
    if !url.ends_with('/') {
        return Err(IdentifierError::malformed(url, "missing trailing slash"));
    }

    let caps = RESOURCE_URL_REGEX
        .captures(url)
        .ok_or_else(|| IdentifierError::malformed(url, "expected .../<resource>/<id>/"))?;

    let id = caps[2]
        .parse::<i64>()
        .map_err(|_| IdentifierError::malformed(url, "id out of range"))?;

    Ok(ResourceRef {
        resource: caps[1].to_string(),
        id,
    })
}

/// Extract the integer id from a canonical resource URL
pub fn extract_id(url: &str) -> Result<i64, IdentifierError> {
    parse_ref(url).map(|r| r.id)
}
