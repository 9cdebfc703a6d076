/// Data models for playback-access-service
///
/// This module defines structures for:
/// - VideoRecord: cached / stored metadata for a ready video
/// - AccessRequest: the inbound authorization bundle
/// - SignedPayload: the delegated-action message body
use serde::{Deserialize, Serialize};

// ========================================
// Video Models
// ========================================

/// Video visibility level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
        }
    }

    /// Anything other than `public` is treated as protected.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("public") {
            Self::Public
        } else {
            Self::Protected
        }
    }
}

/// Opaque access-control descriptor (ACL type, encryption metadata).
///
/// Passed through unmodified; nothing in this service interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessPolicy(serde_json::Value);

impl AccessPolicy {
    pub fn new(raw: serde_json::Value) -> Self {
        Self(raw)
    }

    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Metadata for a video whose ingestion status is `ready`.
///
/// The JSON form is what lives under `token:{tokenId}` in the key-value tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: String,
    pub visibility: Visibility,
    #[serde(default)]
    pub creator: String,
    #[serde(default, rename = "isDownloadable")]
    pub downloadable: bool,
    #[serde(
        default,
        rename = "playbackAccess",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_policy: Option<AccessPolicy>,
}

// ========================================
// Request Models
// ========================================

/// Caller-supplied evidence bundle (`authSig` on the wire)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthProof {
    #[serde(default)]
    pub sig: String,
    #[serde(default)]
    pub derived_via: String,
    #[serde(default)]
    pub signed_message: String,
    #[serde(default)]
    pub address: String,
}

impl AuthProof {
    pub fn derivation_method(&self) -> DerivationMethod {
        DerivationMethod::parse(&self.derived_via)
    }
}

/// Inbound request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    #[serde(default)]
    pub token_id: Option<String>,
    #[serde(default)]
    pub auth_sig: AuthProof,
}

impl AccessRequest {
    /// Token id, with an empty string treated as absent.
    pub fn token_id(&self) -> Option<&str> {
        self.token_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Scheme by which the caller claims its authorization was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivationMethod {
    /// A freshly signed payload that mints a grant
    DelegatedAction,
    /// Reuse of a grant minted earlier
    ExistingGrant,
    Unsupported(String),
}

impl DerivationMethod {
    pub const DELEGATED_ACTION: &'static str = "delegated-action";
    pub const EXISTING_GRANT: &'static str = "existing-grant";

    // Wire values emitted by the existing web client.
    const LEGACY_DELEGATED_ACTION: &'static str = "lit.action";
    const LEGACY_EXISTING_GRANT: &'static str = "loop.web3.auth";

    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            Self::DELEGATED_ACTION | Self::LEGACY_DELEGATED_ACTION => Self::DelegatedAction,
            Self::EXISTING_GRANT | Self::LEGACY_EXISTING_GRANT => Self::ExistingGrant,
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// Body of `signedMessage` on the delegated-action path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedPayload {
    pub user_address: String,
    #[serde(default)]
    pub video_id: String,
    pub video_token_id: String,
    pub nonce: String,
    #[serde(alias = "exp")]
    pub expires_at_millis: i64,
}

impl SignedPayload {
    /// Decode and sanity-check a payload; returns a human readable reason on failure.
    pub fn decode(signed_message: &str) -> Result<Self, String> {
        let payload: SignedPayload = serde_json::from_str(signed_message)
            .map_err(|e| format!("failed to parse signed message: {e}"))?;

        if payload.nonce.trim().is_empty() {
            return Err("signed message is missing a nonce".to_string());
        }
        if payload.video_token_id.trim().is_empty() {
            return Err("signed message is missing videoTokenId".to_string());
        }
        if payload.user_address.trim().is_empty() {
            return Err("signed message is missing userAddress".to_string());
        }

        Ok(payload)
    }
}

// ========================================
// Response Models
// ========================================

/// Successful response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareLinkResponse {
    pub data: String,
}
