//! Shared fixtures for integration tests: in-memory tiers, a recording link
//! issuer and a wallet that signs delegated payloads.

#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use k256::ecdsa::SigningKey;
use playback_access_service::cache::{CacheError, CacheResult, KeyValueStore, MemoryKeyValueStore};
use playback_access_service::clock::ManualClock;
use playback_access_service::db::VideoRepository;
use playback_access_service::error::{AccessError, Result};
use playback_access_service::models::{AccessRequest, AuthProof, VideoRecord, Visibility};
use playback_access_service::security::signature::{address_of, sign_personal_message};
use playback_access_service::services::{AccessEngine, LinkSettings, ShareLinkIssuer};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const NOW: i64 = 1_700_000_000_000;
pub const BUCKET: &str = "videos";

/// Video repository backed by a map, counting every lookup.
#[derive(Default)]
pub struct InMemoryVideoRepository {
    videos: DashMap<String, VideoRecord>,
    lookups: AtomicUsize,
}

impl InMemoryVideoRepository {
    pub fn insert(&self, token_id: &str, record: VideoRecord) {
        self.videos.insert(token_id.to_string(), record);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn find_ready_video_by_token(&self, token_id: &str) -> Result<Option<VideoRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.videos.get(token_id).map(|entry| entry.value().clone()))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Repository whose every call fails
pub struct UnavailableVideoRepository;

#[async_trait]
impl VideoRepository for UnavailableVideoRepository {
    async fn find_ready_video_by_token(&self, _token_id: &str) -> Result<Option<VideoRecord>> {
        Err(AccessError::Database("connection refused".into()))
    }

    async fn ping(&self) -> Result<()> {
        Err(AccessError::Database("connection refused".into()))
    }
}

/// Wraps the in-memory store; writes can be switched to fail.
pub struct FlakyKeyValueStore {
    inner: MemoryKeyValueStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyKeyValueStore {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            inner: MemoryKeyValueStore::new(clock),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check(&self, flag: &AtomicBool) -> CacheResult<()> {
        if flag.load(Ordering::SeqCst) {
            Err(CacheError::Timeout(Duration::from_millis(1)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl KeyValueStore for FlakyKeyValueStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check(&self.fail_reads)?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()> {
        self.check(&self.fail_writes)?;
        self.inner.set(key, value, ttl).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool> {
        self.check(&self.fail_writes)?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn ping(&self) -> CacheResult<()> {
        self.check(&self.fail_reads)
    }
}

/// Link issuer that records every prefix it was asked for.
#[derive(Default)]
pub struct RecordingLinkIssuer {
    issued: Mutex<Vec<(String, String, Duration)>>,
}

impl RecordingLinkIssuer {
    pub fn issued(&self) -> Vec<(String, String, Duration)> {
        self.issued.lock().unwrap().clone()
    }
}

#[async_trait]
impl ShareLinkIssuer for RecordingLinkIssuer {
    async fn issue_public_link(
        &self,
        bucket: &str,
        object_prefix: &str,
        valid_for: Duration,
    ) -> Result<String> {
        self.issued
            .lock()
            .unwrap()
            .push((bucket.to_string(), object_prefix.to_string(), valid_for));
        Ok(format!("https://gw.test/raw/{bucket}/{object_prefix}"))
    }
}

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub kv: Arc<FlakyKeyValueStore>,
    pub videos: Arc<InMemoryVideoRepository>,
    pub links: Arc<RecordingLinkIssuer>,
    pub engine: AccessEngine,
}

impl Harness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(NOW));
        let kv = Arc::new(FlakyKeyValueStore::new(clock.clone()));
        let videos = Arc::new(InMemoryVideoRepository::default());
        let links = Arc::new(RecordingLinkIssuer::default());

        let engine = AccessEngine::new(
            kv.clone(),
            videos.clone(),
            links.clone(),
            clock.clone(),
            LinkSettings {
                bucket: BUCKET.to_string(),
                valid_for: Duration::from_secs(4 * 60 * 60),
            },
        );

        Self {
            clock,
            kv,
            videos,
            links,
            engine,
        }
    }

    pub fn with_video(self, token_id: &str, video_id: &str, visibility: Visibility) -> Self {
        self.videos.insert(token_id, video(video_id, visibility));
        self
    }
}

pub fn video(id: &str, visibility: Visibility) -> VideoRecord {
    VideoRecord {
        id: id.to_string(),
        visibility,
        creator: "0xcreator".to_string(),
        downloadable: false,
        access_policy: None,
    }
}

/// A signing wallet for building proofs
pub struct Wallet {
    key: SigningKey,
}

impl Wallet {
    pub fn from_seed(seed: u8) -> Self {
        let mut bytes = [0u8; 32];
        bytes[31] = seed;
        bytes[0] = 0x11;
        Self {
            key: SigningKey::from_slice(&bytes).unwrap(),
        }
    }

    /// Lowercase `0x` address
    pub fn address(&self) -> String {
        address_of(self.key.verifying_key())
    }

    pub fn sign(&self, message: &str) -> String {
        sign_personal_message(&self.key, message).unwrap()
    }

    pub fn delegated_message(&self, video_id: &str, token_id: &str, nonce: &str, exp: i64) -> String {
        json!({
            "userAddress": self.address(),
            "videoId": video_id,
            "videoTokenId": token_id,
            "nonce": nonce,
            "expiresAtMillis": exp,
        })
        .to_string()
    }

    pub fn request(&self, token_id: Option<&str>, derived_via: &str, message: &str) -> AccessRequest {
        AccessRequest {
            token_id: token_id.map(str::to_string),
            auth_sig: AuthProof {
                sig: self.sign(message),
                derived_via: derived_via.to_string(),
                signed_message: message.to_string(),
                address: self.address(),
            },
        }
    }

    pub fn delegated_request(&self, token_id: &str, video_id: &str, nonce: &str, exp: i64) -> AccessRequest {
        let message = self.delegated_message(video_id, token_id, nonce, exp);
        self.request(Some(token_id), "delegated-action", &message)
    }

    pub fn existing_grant_request(&self, token_id: &str) -> AccessRequest {
        self.request(Some(token_id), "existing-grant", "playback session")
    }
}
