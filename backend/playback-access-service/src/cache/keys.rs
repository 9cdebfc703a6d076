//! Key schema for the key-value tier
//!
//! Formats are shared with other writers of the same Redis instance and must
//! not change:
//! - `token:{tokenId}` video metadata (JSON, no expiry)
//! - `nonce:{nonce}` consumed delegated-action nonce
//! - `access:{videoTokenId}:{address}` access grant, address lowercased

pub struct CacheKey;

impl CacheKey {
    pub fn token(token_id: &str) -> String {
        format!("token:{}", token_id)
    }

    pub fn nonce(nonce: &str) -> String {
        format!("nonce:{}", nonce)
    }

    pub fn access(video_token_id: &str, address: &str) -> String {
        format!("access:{}:{}", video_token_id, address.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_helpers() {
        assert_eq!(CacheKey::token("tok1"), "token:tok1");
        assert_eq!(CacheKey::nonce("n1"), "nonce:n1");
        assert_eq!(CacheKey::access("tok1", "0xABC"), "access:tok1:0xabc");
    }
}
