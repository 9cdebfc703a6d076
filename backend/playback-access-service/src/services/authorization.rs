/// Authorization decision engine
///
/// Per request:
///
/// ```text
/// Start ─► VisibilityChecked ─┬─► public ─────────────────────────────┐
///                             └─► SignatureChecked ─┬─► Delegated ─┐  │
///                                                   └─► Direct ────┴──┴─► Authorized ─► share link
///                                                                  └────► Denied
/// ```
///
/// Public videos skip signature checks entirely. `Denied` is uniform to the
/// caller; the specific [`DenyReason`] is only logged.
use crate::cache::KeyValueStore;
use crate::clock::Clock;
use crate::db::VideoRepository;
use crate::error::{AccessError, DenyReason, Result};
use crate::metrics;
use crate::models::{AccessRequest, DerivationMethod, SignedPayload, Visibility};
use crate::security::verify_signature;
use crate::services::access_grant::{AccessGrantStore, GrantStatus};
use crate::services::metadata::MetadataResolver;
use crate::services::replay_guard::{NonceOutcome, ReplayGuard};
use crate::services::share_link::ShareLinkIssuer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where share links point and for how long they stay valid
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub bucket: String,
    pub valid_for: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Public content; no signature was checked
    Public { video_id: String },
    Authorized { video_id: String },
    Denied(DenyReason),
}

/// Link returned to an authorized caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub video_id: String,
    pub object_prefix: String,
    pub url: String,
    /// Issued without a signature check
    pub public: bool,
}

/// What the token lookup established before any signature check
struct ResolvedToken<'a> {
    token_id: Option<&'a str>,
    video_id: String,
    visibility: Visibility,
}

#[derive(Clone)]
pub struct AccessEngine {
    resolver: MetadataResolver,
    replay_guard: ReplayGuard,
    grants: AccessGrantStore,
    links: Arc<dyn ShareLinkIssuer>,
    clock: Arc<dyn Clock>,
    link_settings: LinkSettings,
}

impl AccessEngine {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        videos: Arc<dyn VideoRepository>,
        links: Arc<dyn ShareLinkIssuer>,
        clock: Arc<dyn Clock>,
        link_settings: LinkSettings,
    ) -> Self {
        Self {
            resolver: MetadataResolver::new(kv.clone(), videos),
            replay_guard: ReplayGuard::new(kv.clone(), clock.clone()),
            grants: AccessGrantStore::new(kv, clock.clone()),
            links,
            clock,
            link_settings,
        }
    }

    /// Object prefix a share link is scoped to
    pub fn object_prefix(video_id: &str) -> String {
        format!("{}/data/", video_id)
    }

    /// Authorize and, on success, issue a share link.
    ///
    /// `Denied` becomes `AccessError::Unauthorized`.
    pub async fn request_access(&self, request: &AccessRequest) -> Result<ShareLink> {
        let result = self.issue(request).await;
        metrics::observe_decision(match &result {
            Ok(link) if link.public => "public",
            Ok(_) => "authorized",
            Err(AccessError::Unauthorized(_)) => "denied",
            Err(AccessError::NotFound(_)) => "not_found",
            Err(AccessError::BadRequest(_)) => "bad_request",
            Err(_) => "error",
        });
        result
    }

    async fn issue(&self, request: &AccessRequest) -> Result<ShareLink> {
        let (video_id, public) = match self.authorize(request).await? {
            Decision::Public { video_id } => (video_id, true),
            Decision::Authorized { video_id } => (video_id, false),
            Decision::Denied(reason) => return Err(AccessError::Unauthorized(reason)),
        };

        if video_id.is_empty() {
            return Err(AccessError::BadRequest(
                "request does not identify a video".to_string(),
            ));
        }

        let object_prefix = Self::object_prefix(&video_id);
        let url = self
            .links
            .issue_public_link(
                &self.link_settings.bucket,
                &object_prefix,
                self.link_settings.valid_for,
            )
            .await?;

        Ok(ShareLink {
            video_id,
            object_prefix,
            url,
            public,
        })
    }

    /// Run the decision state machine without issuing a link.
    ///
    /// Errors are reserved for bad input, unknown tokens and dependency
    /// failures; every authorization failure is a `Decision::Denied`.
    pub async fn authorize(&self, request: &AccessRequest) -> Result<Decision> {
        let resolved = self.resolve_token(request).await?;

        if resolved.visibility == Visibility::Public {
            debug!(video_id = %resolved.video_id, "Public video, skipping signature check");
            return Ok(Decision::Public {
                video_id: resolved.video_id,
            });
        }

        let proof = &request.auth_sig;
        let claimed_address = proof.address.trim().to_lowercase();

        if !verify_signature(&proof.signed_message, &proof.sig, &claimed_address) {
            return Ok(Self::deny(DenyReason::InvalidSignature, &resolved));
        }

        let outcome = match proof.derivation_method() {
            DerivationMethod::DelegatedAction => {
                self.delegated_action(&proof.signed_message, resolved.video_id.as_str())
                    .await
            }
            DerivationMethod::ExistingGrant => {
                self.existing_grant(resolved.token_id, &claimed_address, &resolved.video_id)
                    .await
            }
            DerivationMethod::Unsupported(method) => {
                debug!(derived_via = %method, "Unsupported derivation method");
                Err(AccessError::Unauthorized(DenyReason::UnsupportedDerivation))
            }
        };

        match outcome {
            Ok(video_id) => {
                info!(
                    token_id = resolved.token_id.unwrap_or_default(),
                    video_id = %video_id,
                    address = %claimed_address,
                    "Access authorized"
                );
                Ok(Decision::Authorized { video_id })
            }
            Err(AccessError::Unauthorized(reason)) => Ok(Self::deny(reason, &resolved)),
            Err(other) => Err(other),
        }
    }

    async fn resolve_token<'a>(&self, request: &'a AccessRequest) -> Result<ResolvedToken<'a>> {
        let token_id = request.token_id();

        let Some(token_id) = token_id else {
            return Ok(ResolvedToken {
                token_id: None,
                video_id: String::new(),
                visibility: Visibility::Protected,
            });
        };

        let record = self.resolver.resolve(token_id).await?;
        Ok(ResolvedToken {
            token_id: Some(token_id),
            video_id: record.id,
            visibility: record.visibility,
        })
    }

    /// First-time proof: consume the nonce, then mint a grant.
    async fn delegated_action(&self, signed_message: &str, token_video_id: &str) -> Result<String> {
        let mut payload = SignedPayload::decode(signed_message).map_err(AccessError::BadRequest)?;
        payload.user_address = payload.user_address.trim().to_lowercase();

        if payload.expires_at_millis <= self.clock.now_millis() {
            return Err(AccessError::Unauthorized(DenyReason::Expired));
        }

        match self
            .replay_guard
            .check_and_consume(&payload.nonce, payload.expires_at_millis)
            .await?
        {
            NonceOutcome::Consumed => {}
            NonceOutcome::AlreadyUsed => {
                return Err(AccessError::Unauthorized(DenyReason::NonceReused))
            }
        }

        self.grants
            .grant(
                &payload.video_token_id,
                &payload.user_address,
                payload.expires_at_millis,
            )
            .await?;

        // The signed payload is authoritative for the video on this path.
        Ok(if payload.video_id.trim().is_empty() {
            token_video_id.to_string()
        } else {
            payload.video_id
        })
    }

    /// Subsequent proof: reuse a grant minted earlier for this token.
    async fn existing_grant(
        &self,
        token_id: Option<&str>,
        claimed_address: &str,
        token_video_id: &str,
    ) -> Result<String> {
        let Some(token_id) = token_id else {
            return Err(AccessError::Unauthorized(DenyReason::NoGrant));
        };

        match self.grants.check(token_id, claimed_address).await? {
            GrantStatus::Granted => Ok(token_video_id.to_string()),
            GrantStatus::NotGranted => Err(AccessError::Unauthorized(DenyReason::NoGrant)),
        }
    }

    fn deny(reason: DenyReason, resolved: &ResolvedToken<'_>) -> Decision {
        warn!(
            token_id = resolved.token_id.unwrap_or_default(),
            reason = %reason,
            "Access denied"
        );
        Decision::Denied(reason)
    }
}
