// Identifier and access-token generators.
// Ids keep the `<kind>_<hex12>` shape clients already rely on in URLs.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use uuid::Uuid;

pub fn generate_client_id() -> String {
    prefixed_id("client", 12)
}

pub fn generate_user_id() -> String {
    prefixed_id("user", 12)
}

pub fn generate_trial_id() -> String {
    prefixed_id("trial", 12)
}

pub fn generate_session_id() -> String {
    prefixed_id("session", 16)
}

pub fn generate_task_id() -> String {
    prefixed_id("task", 12)
}

pub fn generate_notification_id(kind: &str) -> String {
    prefixed_id(kind, 8)
}

pub fn generate_transaction_id() -> String {
    prefixed_id("txn", 12)
}

pub fn generate_subscription_id() -> String {
    prefixed_id("sub", 12)
}

pub fn generate_visitor_id() -> String {
    prefixed_id("visitor", 12)
}

/// Opaque bearer token: 32 random bytes, URL-safe base64 without padding,
/// so it can live in a path segment.
pub fn generate_access_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn prefixed_id(prefix: &str, hex_len: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}_{}", prefix, &hex[..hex_len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_carry_prefix_and_length() {
        let id = generate_client_id();
        assert!(id.starts_with("client_"));
        assert_eq!(id.len(), "client_".len() + 12);

        let sid = generate_session_id();
        assert!(sid.starts_with("session_"));
        assert_eq!(sid.len(), "session_".len() + 16);
    }

    #[test]
    fn access_tokens_are_url_safe_and_unique() {
        let mut seen = HashSet::new();
        for _ in 0..100 {
            let token = generate_access_token();
            assert!(token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
            // 32 bytes -> 43 base64 chars without padding
            assert_eq!(token.len(), 43);
            assert!(seen.insert(token));
        }
    }
}
