use std::time::Duration;

use url::Url;

/// Registry queried when the caller does not supply one.
pub const DEFAULT_REGISTRY_URL: &str = "https://pypi.org";

/// Default age, in minutes, after which a cached package entry is stale.
pub const DEFAULT_CACHE_TTL_MINUTES: u64 = 60;

/// Maximum number of registry requests in flight at once.
pub const MAX_CONCURRENT_REQUESTS: usize = 5;

/// Per-request timeout for registry calls.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Quiet period after the last cache write before the snapshot is persisted.
pub const FLUSH_DEBOUNCE: Duration = Duration::from_millis(1000);

pub const USER_AGENT: &str = concat!("py-deps-hint/", env!("CARGO_PKG_VERSION"));

/// Validate a registry base URL.
///
/// Anything that does not parse as a plain http(s) URL falls back to the
/// default registry rather than producing a broken request URL later.
pub fn validate_registry_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => url.to_string(),
        _ => DEFAULT_REGISTRY_URL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https_urls() {
        assert_eq!(
            validate_registry_url("https://pypi.org"),
            "https://pypi.org"
        );
        assert_eq!(
            validate_registry_url("http://mirror.internal:8080"),
            "http://mirror.internal:8080"
        );
    }

    #[test]
    fn rejects_other_schemes_and_garbage() {
        assert_eq!(validate_registry_url("ftp://pypi.org"), DEFAULT_REGISTRY_URL);
        assert_eq!(validate_registry_url("file:///etc/passwd"), DEFAULT_REGISTRY_URL);
        assert_eq!(validate_registry_url("not a url"), DEFAULT_REGISTRY_URL);
        assert_eq!(validate_registry_url(""), DEFAULT_REGISTRY_URL);
    }
}
