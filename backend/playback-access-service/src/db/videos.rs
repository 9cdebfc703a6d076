/// Video metadata repository
///
/// Metadata lives in the `videos.metadata` JSONB column written by the
/// ingestion pipeline. Only rows whose `status` is `ready` are ever returned.
use crate::error::{AccessError, Result};
use crate::models::{AccessPolicy, VideoRecord, Visibility};
use sqlx::types::Json;
use sqlx::PgPool;

#[async_trait::async_trait]
pub trait VideoRepository: Send + Sync {
    /// `Ok(None)` when no ready video is indexed by `token_id`
    async fn find_ready_video_by_token(&self, token_id: &str) -> Result<Option<VideoRecord>>;

    /// Liveness probe for readiness checks
    async fn ping(&self) -> Result<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    id: Option<String>,
    visibility: Option<String>,
    is_downloadable: Option<String>,
    creator: Option<String>,
    playback_access: Option<Json<serde_json::Value>>,
}

impl VideoRow {
    fn into_record(self, token_id: &str) -> Result<VideoRecord> {
        let id = self.id.filter(|id| !id.is_empty()).ok_or_else(|| {
            AccessError::Database(format!("ready video for token {token_id} has no metadata id"))
        })?;

        Ok(VideoRecord {
            id,
            visibility: Visibility::parse(self.visibility.as_deref().unwrap_or_default()),
            creator: self.creator.unwrap_or_default(),
            downloadable: self
                .is_downloadable
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            access_policy: self
                .playback_access
                .map(|Json(raw)| raw)
                .filter(|raw| !raw.is_null())
                .map(AccessPolicy::new),
        })
    }
}

#[derive(Clone)]
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl VideoRepository for PgVideoRepository {
    async fn find_ready_video_by_token(&self, token_id: &str) -> Result<Option<VideoRecord>> {
        let row = sqlx::query_as::<_, VideoRow>(
            r#"
            SELECT
                v.metadata->>'id' AS id,
                v.metadata->>'visibility' AS visibility,
                v.metadata->>'isDownloadable' AS is_downloadable,
                v.metadata->>'creator' AS creator,
                v.metadata->'playbackAccess' AS playback_access
            FROM videos v
            WHERE v.token_id = $1 AND v.status = 'ready'
            "#,
        )
        .bind(token_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AccessError::Database(e.to_string()))?;

        row.map(|row| row.into_record(token_id)).transpose()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| AccessError::Database(e.to_string()))
    }
}
