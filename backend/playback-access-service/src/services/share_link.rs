// Share-link issuance - HMAC-SHA256 signed, prefix-scoped gateway links

use crate::clock::Clock;
use crate::error::{AccessError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

/// Only download permission is ever granted.
const PERMISSION: &str = "download";

/// External link issuer: mints a public URL scoped to one object prefix.
#[async_trait::async_trait]
pub trait ShareLinkIssuer: Send + Sync {
    async fn issue_public_link(
        &self,
        bucket: &str,
        object_prefix: &str,
        valid_for: Duration,
    ) -> Result<String>;
}

/// `{base}/raw/{bucket}/{prefix...}` with each path piece percent-encoded.
fn raw_link(base_url: &str, bucket: &str, object_prefix: &str) -> Result<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| AccessError::LinkIssuer(format!("invalid link base url: {e}")))?;

    url.path_segments_mut()
        .map_err(|_| AccessError::LinkIssuer("link base url cannot be a base".into()))?
        .pop_if_empty()
        .push("raw")
        .push(bucket)
        .extend(object_prefix.split('/'));

    Ok(url)
}

/// Signed link issuer
///
/// Format: `{base}/raw/{bucket}/{prefix}?exp={unix_secs}&perm=download&sig={hmac_hex}`
/// where the HMAC covers `{path}:{perm}:{exp}`. The gateway holding the same
/// secret serves any object under the prefix until `exp`.
#[derive(Clone)]
pub struct SignedLinkIssuer {
    base_url: String,
    secret_key: String,
    clock: Arc<dyn Clock>,
}

impl SignedLinkIssuer {
    pub fn new(base_url: String, secret_key: String, clock: Arc<dyn Clock>) -> Self {
        Self {
            base_url,
            secret_key,
            clock,
        }
    }

    pub fn sign_link(&self, bucket: &str, object_prefix: &str, valid_for: Duration) -> Result<String> {
        let expiration = self.clock.now_millis() / 1000 + valid_for.as_secs() as i64;

        let mut url = raw_link(&self.base_url, bucket, object_prefix)?;
        let signature = self.compute_signature(&Self::payload(url.path(), expiration))?;

        url.query_pairs_mut()
            .append_pair("exp", &expiration.to_string())
            .append_pair("perm", PERMISSION)
            .append_pair("sig", &signature);

        Ok(url.into())
    }

    /// Verify signature and expiration of a link produced by [`Self::sign_link`]
    pub fn verify_link(&self, link: &str) -> Result<()> {
        let parsed =
            Url::parse(link).map_err(|e| AccessError::BadRequest(format!("Invalid URL: {e}")))?;

        let param = |name: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .ok_or_else(|| AccessError::BadRequest(format!("Missing {name} parameter")))
        };

        let exp = param("exp")?
            .parse::<i64>()
            .map_err(|_| AccessError::BadRequest("Invalid exp format".into()))?;
        let perm = param("perm")?;
        let provided_sig = hex::decode(param("sig")?)
            .map_err(|_| AccessError::BadRequest("Invalid sig format".into()))?;

        if perm != PERMISSION {
            return Err(AccessError::BadRequest("Unsupported permission".into()));
        }

        // Check expiration first (fail fast)
        if self.clock.now_millis() / 1000 > exp {
            return Err(AccessError::BadRequest("Link expired".into()));
        }

        let mut mac = self.mac()?;
        mac.update(Self::payload(parsed.path(), exp).as_bytes());
        mac.verify_slice(&provided_sig)
            .map_err(|_| AccessError::BadRequest("Invalid signature".into()))
    }

    fn payload(path: &str, expiration: i64) -> String {
        format!("{}:{}:{}", path, PERMISSION, expiration)
    }

    fn mac(&self) -> Result<HmacSha256> {
        HmacSha256::new_from_slice(self.secret_key.as_bytes())
            .map_err(|e| AccessError::LinkIssuer(format!("HMAC error: {}", e)))
    }

    fn compute_signature(&self, payload: &str) -> Result<String> {
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

#[async_trait::async_trait]
impl ShareLinkIssuer for SignedLinkIssuer {
    async fn issue_public_link(
        &self,
        bucket: &str,
        object_prefix: &str,
        valid_for: Duration,
    ) -> Result<String> {
        let link = self.sign_link(bucket, object_prefix, valid_for)?;
        info!(bucket = %bucket, prefix = %object_prefix, "Public shared link created");
        Ok(link)
    }
}

/// Unsigned links for local development against an open gateway
#[derive(Clone)]
pub struct StaticLinkIssuer {
    base_url: String,
}

impl StaticLinkIssuer {
    pub fn new(base_url: String) -> Self {
        Self { base_url }
    }
}

#[async_trait::async_trait]
impl ShareLinkIssuer for StaticLinkIssuer {
    async fn issue_public_link(
        &self,
        bucket: &str,
        object_prefix: &str,
        _valid_for: Duration,
    ) -> Result<String> {
        raw_link(&self.base_url, bucket, object_prefix).map(String::from)
    }
}
