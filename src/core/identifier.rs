use std::fmt;

use http::HeaderMap;

use crate::core::headers::{X_API_KEY, X_FORWARDED_FOR};

/// Rate-limit partition key, namespaced by where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn api_key(key: &str) -> Self {
        Self(format!("apikey:{key}"))
    }

    pub fn ip(address: &str) -> Self {
        Self(format!("ip:{address}"))
    }

    /// Wrap an already namespaced key, as supplied to the admin endpoints.
    pub fn raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the identifier for a request: API key header, else the first
    /// forwarded-for address, else the direct peer address.
    pub fn resolve(headers: &HeaderMap, peer_addr: &str) -> Self {
        if let Some(key) = header_str(headers, X_API_KEY) {
            return Self::api_key(key);
        }

        if let Some(first) = header_str(headers, X_FORWARDED_FOR)
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
        {
            return Self::ip(first);
        }

        Self::ip(peer_addr)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
