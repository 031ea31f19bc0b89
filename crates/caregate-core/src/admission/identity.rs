//! Client identity resolution.
//!
//! Turns request metadata into the stable key quotas are counted against.
//! Tokens are hashed, never validated; authentication happens elsewhere.

use http::HeaderMap;
use http::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Header carrying the original client address chain.
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Key used when neither a token nor an address is available.
pub const UNKNOWN_CLIENT: &str = "ip:unknown";

/// Hex characters of the token digest kept in the key.
const TOKEN_DIGEST_LEN: usize = 16;

/// Opaque key identifying a caller for quota purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientKey(String);

impl ClientKey {
    /// Wraps an already-derived key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a quota keys its callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStrategy {
    /// Bearer token first, then forwarded address.
    #[default]
    Identity,
    /// Forwarded address only, even for authenticated callers.
    Address,
}

impl KeyStrategy {
    /// Resolves a key from request headers.
    pub fn resolve(self, headers: &HeaderMap) -> ClientKey {
        match self {
            KeyStrategy::Identity => resolve(headers),
            KeyStrategy::Address => resolve_address(headers),
        }
    }
}

/// Resolves the caller key: `user:<digest>` for bearer tokens, otherwise
/// `ip:<first forwarded address>`, otherwise `ip:unknown`.
pub fn resolve(headers: &HeaderMap) -> ClientKey {
    match bearer_token(headers) {
        Some(token) => ClientKey(format!("user:{}", token_digest(token))),
        None => resolve_address(headers),
    }
}

/// Resolves the caller key from the forwarded address alone.
pub fn resolve_address(headers: &HeaderMap) -> ClientKey {
    headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map_or_else(|| ClientKey(UNKNOWN_CLIENT.to_string()), |addr| ClientKey(format!("ip:{}", addr)))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut hex = String::with_capacity(TOKEN_DIGEST_LEN);
    for byte in digest.iter().take(TOKEN_DIGEST_LEN / 2) {
        hex.push_str(&format!("{:02x}", byte));
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_bearer_token_yields_user_key() {
        let key = resolve(&headers(&[("authorization", "Bearer abc.def.ghi")]));
        assert!(key.as_str().starts_with("user:"));
        assert_eq!(key.as_str().len(), "user:".len() + TOKEN_DIGEST_LEN);
        assert!(key.as_str()["user:".len()..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_same_token_same_key() {
        let a = resolve(&headers(&[("authorization", "Bearer token-1")]));
        let b = resolve(&headers(&[("authorization", "Bearer token-1"), ("x-forwarded-for", "10.0.0.1")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_tokens_distinct_keys() {
        let a = resolve(&headers(&[("authorization", "Bearer token-1")]));
        let b = resolve(&headers(&[("authorization", "Bearer token-2")]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_digest_is_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea...
        let key = resolve(&headers(&[("authorization", "Bearer abc")]));
        assert_eq!(key.as_str(), "user:ba7816bf8f01cfea");
    }

    #[test]
    fn test_forwarded_for_first_entry_trimmed() {
        let key = resolve(&headers(&[("x-forwarded-for", "  203.0.113.7 , 10.0.0.1, 10.0.0.2")]));
        assert_eq!(key.as_str(), "ip:203.0.113.7");
    }

    #[test]
    fn test_no_headers_is_unknown() {
        assert_eq!(resolve(&HeaderMap::new()).as_str(), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_non_bearer_authorization_falls_back_to_address() {
        let key = resolve(&headers(&[("authorization", "Basic dXNlcjpwYXNz"), ("x-forwarded-for", "198.51.100.2")]));
        assert_eq!(key.as_str(), "ip:198.51.100.2");
        let empty = resolve(&headers(&[("authorization", "Bearer   ")]));
        assert_eq!(empty.as_str(), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_address_strategy_ignores_token() {
        let map = headers(&[("authorization", "Bearer abc"), ("x-forwarded-for", "198.51.100.2")]);
        assert_eq!(KeyStrategy::Address.resolve(&map).as_str(), "ip:198.51.100.2");
        assert!(KeyStrategy::Identity.resolve(&map).as_str().starts_with("user:"));
    }
}
