/// HTTP handlers for playback-access-service
///
/// - access: the authorization endpoint
/// - health: liveness, readiness and Prometheus scrape
pub mod access;
pub mod health;

pub use access::request_access;
pub use health::{health, ready};

use crate::cache::KeyValueStore;
use crate::db::VideoRepository;
use crate::metrics;
use crate::services::AccessEngine;
use actix_web::web;
use std::sync::Arc;

/// Shared per-process state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AccessEngine>,
    pub kv: Arc<dyn KeyValueStore>,
    pub videos: Arc<dyn VideoRepository>,
    /// Attach internal error text to failure bodies (non-production only)
    pub expose_error_details: bool,
}

/// Register all routes. `AppState` must be registered as app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::post().to(request_access))
        .route("/api/v1/playback/access", web::post().to(request_access))
        .route("/health", web::get().to(health))
        .route("/health/ready", web::get().to(ready))
        .route("/metrics", web::get().to(metrics::serve_metrics));
}
