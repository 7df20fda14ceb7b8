use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation key for token tag computation.
const TOKEN_TAG_KEY: &[u8] = b"glowdesk-admin-token-v1";

fn token_tag(token: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(TOKEN_TAG_KEY).expect("hmac accepts any key length");
    mac.update(token.as_bytes());
    mac
}

/// Compare a presented admin token against the configured one. Both sides
/// are reduced to HMAC-SHA256 tags and compared via `verify_slice`, which
/// is constant-time. An unconfigured (empty) token rejects everything.
pub fn verify_token(presented: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    let presented_tag = token_tag(presented).finalize().into_bytes();
    token_tag(expected).verify_slice(&presented_tag).is_ok()
}

/// Validate an Authorization header value ("Bearer <token>", or the bare
/// token for older admin clients).
pub fn verify_admin_header(header: &str, expected: &str) -> bool {
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    verify_token(token, expected)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_token_passes() {
        assert!(verify_token("s3cret", "s3cret"));
    }

    #[test]
    fn wrong_token_fails() {
        assert!(!verify_token("guess", "s3cret"));
        assert!(!verify_token("", "s3cret"));
    }

    #[test]
    fn empty_expected_rejects_everything() {
        assert!(!verify_token("anything", ""));
        assert!(!verify_token("", ""));
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert!(verify_admin_header("Bearer s3cret", "s3cret"));
        assert!(verify_admin_header("s3cret", "s3cret"));
        assert!(!verify_admin_header("Bearer nope", "s3cret"));
    }
}
