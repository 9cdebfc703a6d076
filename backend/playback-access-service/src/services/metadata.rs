/// Cache-aside video metadata lookup
///
/// 1. `GET token:{tokenId}` from the key-value tier.
/// 2. Hit: deserialize. A payload that does not parse is an error; it is not
///    bypassed by falling through to the database.
/// 3. Miss (key absent): query the relational tier for a ready video.
/// 4. Write the record back with no expiry. Failure to write is logged only.
///
/// Entries are never invalidated here; they live until the store evicts or
/// another writer overwrites them.
use crate::cache::{CacheKey, KeyValueStore};
use crate::db::VideoRepository;
use crate::error::{AccessError, Result};
use crate::metrics;
use crate::models::VideoRecord;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct MetadataResolver {
    kv: Arc<dyn KeyValueStore>,
    videos: Arc<dyn VideoRepository>,
}

impl MetadataResolver {
    pub fn new(kv: Arc<dyn KeyValueStore>, videos: Arc<dyn VideoRepository>) -> Self {
        Self { kv, videos }
    }

    pub async fn resolve(&self, token_id: &str) -> Result<VideoRecord> {
        let key = CacheKey::token(token_id);

        if let Some(cached) = self.kv.get(&key).await? {
            let record = serde_json::from_str::<VideoRecord>(&cached).map_err(|e| {
                AccessError::Cache(format!("error parsing cached video metadata: {e}"))
            })?;
            debug!(token_id = %token_id, "Video metadata cache hit");
            metrics::observe_metadata_lookup("cache_hit");
            return Ok(record);
        }

        let record = match self.videos.find_ready_video_by_token(token_id).await? {
            Some(record) => record,
            None => {
                metrics::observe_metadata_lookup("not_found");
                return Err(AccessError::NotFound(format!(
                    "no ready video for token {token_id}"
                )));
            }
        };
        metrics::observe_metadata_lookup("cache_miss");

        self.populate(&key, &record).await;
        Ok(record)
    }

    async fn populate(&self, key: &str, record: &VideoRecord) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to serialize video metadata for cache");
                return;
            }
        };

        if let Err(e) = self.kv.set(key, &payload, None).await {
            warn!(key = %key, error = %e, "Failed to cache video metadata");
        }
    }
}
