//! URL canonicalization used for deduplication and cache keys.
//!
//! The rule:
//! - surrounding whitespace is trimmed, inner whitespace is rejected
//! - a missing scheme is taken from a URL-prefix property, else `https`
//! - only `http`/`https` URLs with a host are accepted
//! - scheme and host are lower-cased, default ports and fragments dropped
//! - the dedup key also lower-cases the path
//! - the query string is kept verbatim and trailing slashes are significant

use std::fmt;

use serde::Serialize;
use url::Url;

use crate::error::InspectError;

// == Normalized Url ==
/// A validated input URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    /// Case-folded form used for identity
    pub key: String,
    /// Form sent to the remote API
    pub target: String,
}

// == Fingerprint ==
/// Identity of an inspection: property plus normalized URL key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fingerprint {
    pub property: String,
    pub key: String,
}

impl Fingerprint {
    pub fn new(property: &str, url: &NormalizedUrl) -> Self {
        Self {
            property: property.trim().to_string(),
            key: url.key.clone(),
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.property, self.key)
    }
}

/// Canonicalizes `raw` for inspection against `property`.
pub fn normalize(raw: &str, property: &str) -> Result<NormalizedUrl, InspectError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InspectError::InvalidUrl("empty URL".to_string()));
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(InspectError::InvalidUrl(format!("{trimmed}: contains whitespace")));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{}://{}", default_scheme(property), trimmed)
    };

    let mut parsed = Url::parse(&candidate)
        .map_err(|e| InspectError::InvalidUrl(format!("{trimmed}: {e}")))?;

    let scheme = parsed.scheme().to_string();
    if scheme != "http" && scheme != "https" {
        return Err(InspectError::InvalidUrl(format!(
            "{trimmed}: unsupported scheme '{scheme}'"
        )));
    }
    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err(InspectError::InvalidUrl(format!("{trimmed}: missing host"))),
    };

    parsed.set_fragment(None);

    let mut key = format!("{scheme}://{host}");
    if let Some(port) = parsed.port() {
        key.push_str(&format!(":{port}"));
    }
    key.push_str(&parsed.path().to_lowercase());
    if let Some(query) = parsed.query() {
        key.push('?');
        key.push_str(query);
    }

    Ok(NormalizedUrl {
        key,
        target: parsed.to_string(),
    })
}

fn default_scheme(property: &str) -> &'static str {
    match Url::parse(property.trim()) {
        Ok(url) if url.scheme() == "http" => "http",
        _ => "https",
    }
}
