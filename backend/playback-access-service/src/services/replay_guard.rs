/// One-time use of delegated-action nonces
///
/// Consumption is a single `SET nonce:{nonce} .. PX ttl NX`. Two requests
/// carrying the same nonce race on that one write and at most one wins; there
/// is no separate existence check. The key expires at the payload's own
/// expiry, after which the payload itself is rejected as expired.
use crate::cache::{CacheKey, KeyValueStore};
use crate::clock::{remaining_until, Clock};
use crate::error::{AccessError, DenyReason, Result};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceOutcome {
    /// This call consumed the nonce
    Consumed,
    AlreadyUsed,
}

#[derive(Clone)]
pub struct ReplayGuard {
    kv: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl ReplayGuard {
    pub fn new(kv: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { kv, clock }
    }

    pub async fn check_and_consume(
        &self,
        nonce: &str,
        expires_at_millis: i64,
    ) -> Result<NonceOutcome> {
        let ttl = remaining_until(self.clock.as_ref(), expires_at_millis)
            .ok_or(AccessError::Unauthorized(DenyReason::Expired))?;

        let created = self
            .kv
            .set_if_absent(
                &CacheKey::nonce(nonce),
                &expires_at_millis.to_string(),
                ttl,
            )
            .await?;

        Ok(if created {
            NonceOutcome::Consumed
        } else {
            NonceOutcome::AlreadyUsed
        })
    }
}
