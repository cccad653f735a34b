// Cache key derivation
// Author: kelexine (https://github.com/kelexine)

use axum::http::Uri;
use std::fmt;

/// Canonical identity of a proxied request: the path below the API prefix,
/// a `?`, and the raw query string exactly as received.
///
/// The same key names the cached body and both telemetry rows, so the
/// derivation must stay stable: no decoding, no parameter reordering, and the
/// `?` is kept even when the query is empty (`/route?`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(forwarded_path: &str, query: Option<&str>) -> Self {
        Self(format!("{}?{}", forwarded_path, query.unwrap_or("")))
    }

    /// Build the key for a request URI routed under `api_prefix`.
    pub fn from_uri(api_prefix: &str, uri: &Uri) -> Self {
        let path = uri.path();
        let forwarded = path.strip_prefix(api_prefix).unwrap_or(path);
        Self::new(forwarded, uri.query())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_key_strips_prefix_and_keeps_query() {
        let key = CacheKey::from_uri("/api/v1", &uri("/api/v1/route?x=1"));
        assert_eq!(key.as_str(), "/route?x=1");
    }

    #[test]
    fn test_key_without_query_keeps_separator() {
        let key = CacheKey::from_uri("/api/v1", &uri("/api/v1/route"));
        assert_eq!(key.as_str(), "/route?");
    }

    #[test]
    fn test_key_preserves_parameter_order_and_encoding() {
        let a = CacheKey::from_uri("/api/v1", &uri("/api/v1/?command=routeList&a=N%20Judah"));
        let b = CacheKey::from_uri("/api/v1", &uri("/api/v1/?a=N%20Judah&command=routeList"));
        assert_eq!(a.as_str(), "/?command=routeList&a=N%20Judah");
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_key_is_suffix_then_raw_query(
            path in "(/[a-zA-Z0-9_.-]{1,12}){1,4}",
            query in "[a-zA-Z0-9]{1,8}=[a-zA-Z0-9]{0,8}(&[a-zA-Z0-9]{1,8}=[a-zA-Z0-9]{0,8}){0,3}",
        ) {
            let request = uri(&format!("/api/v1{}?{}", path, query));
            let first = CacheKey::from_uri("/api/v1", &request);
            let second = CacheKey::from_uri("/api/v1", &request);

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.as_str(), format!("{}?{}", path, query));
        }
    }
}
