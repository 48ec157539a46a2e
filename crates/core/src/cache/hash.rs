//! Body digests for cached responses.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of a response body, stored alongside each entry so
/// refreshed content can be told apart from an unchanged re-store.
pub fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_stability() {
        assert_eq!(body_digest(b"body { color: red }"), body_digest(b"body { color: red }"));
    }

    #[test]
    fn test_digest_differs_by_content() {
        assert_ne!(body_digest(b"v1"), body_digest(b"v2"));
    }

    #[test]
    fn test_digest_of_empty_body() {
        assert_eq!(body_digest(b""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn test_digest_format() {
        let digest = body_digest(b"<html></html>");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
