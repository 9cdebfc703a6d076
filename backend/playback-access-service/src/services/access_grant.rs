/// Time-bounded access grants
///
/// A grant is the marker `access:{videoTokenId}:{address}` with a TTL equal
/// to the remaining life of the delegated proof that minted it. Grants are
/// read but never extended, and there is no revocation path.
use crate::cache::{CacheKey, KeyValueStore};
use crate::clock::{remaining_until, Clock};
use crate::error::{AccessError, DenyReason, Result};
use std::sync::Arc;
use tracing::debug;

const GRANT_MARKER: &str = "t";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantStatus {
    Granted,
    NotGranted,
}

#[derive(Clone)]
pub struct AccessGrantStore {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl AccessGrantStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    pub async fn grant(
        &self,
        video_token_id: &str,
        user_address: &str,
        expires_at_millis: i64,
    ) -> Result<()> {
        let ttl = remaining_until(self.clock.as_ref(), expires_at_millis)
            .ok_or(AccessError::Unauthorized(DenyReason::Expired))?;

        self.kv
            .set(
                &CacheKey::access(video_token_id, user_address),
                GRANT_MARKER,
                Some(ttl),
            )
            .await?;

        debug!(
            video_token_id = %video_token_id,
            ttl_ms = ttl.as_millis() as u64,
            "Access grant recorded"
        );
        Ok(())
    }

    pub async fn check(&self, video_token_id: &str, user_address: &str) -> Result<GrantStatus> {
        let marker = self
            .kv
            .get(&CacheKey::access(video_token_id, user_address))
            .await?;

        Ok(match marker {
            Some(_) => GrantStatus::Granted,
            None => GrantStatus::NotGranted,
        })
    }
}
