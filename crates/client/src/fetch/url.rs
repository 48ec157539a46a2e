//! URL helpers for routing decisions and cache keys.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty path")]
    Empty,

    #[error("expected an absolute path, got: {0}")]
    RelativePath(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Cache key for a request URL.
///
/// Only the path is kept: origin, query string and fragment are discarded,
/// so `/page?x=1` and `/page?x=2` share one entry.
pub fn cache_key(url: &Url) -> String {
    url.path().to_string()
}

/// Resolve a manifest path against the worker origin.
pub fn resolve(origin: &Url, path: &str) -> Result<Url, UrlError> {
    let trimmed = path.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    if !trimmed.starts_with('/') {
        return Err(UrlError::RelativePath(trimmed.to_string()));
    }

    origin.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_same_origin() {
        assert!(same_origin(&url("https://example.com/a"), &url("https://example.com/b?q=1")));
        assert!(same_origin(&url("https://example.com:443/"), &url("https://example.com/")));
    }

    #[test]
    fn test_cross_origin() {
        assert!(!same_origin(&url("https://example.com/"), &url("http://example.com/")));
        assert!(!same_origin(&url("https://example.com/"), &url("https://cdn.example.com/")));
        assert!(!same_origin(&url("http://localhost:8000/"), &url("http://localhost:8001/")));
    }

    #[test]
    fn test_cache_key_drops_query_and_fragment() {
        assert_eq!(cache_key(&url("https://example.com/static/app.css?v=3#x")), "/static/app.css");
        assert_eq!(cache_key(&url("https://example.com")), "/");
    }

    #[test]
    fn test_resolve_manifest_path() {
        let origin = url("http://localhost:8000");
        assert_eq!(resolve(&origin, "/static/script.js").unwrap().as_str(), "http://localhost:8000/static/script.js");
        assert_eq!(resolve(&origin, "/").unwrap().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_resolve_rejects_relative_and_empty() {
        let origin = url("http://localhost:8000");
        assert!(matches!(resolve(&origin, "static/app.css"), Err(UrlError::RelativePath(_))));
        assert!(matches!(resolve(&origin, "  "), Err(UrlError::Empty)));
    }
}
