use crate::error::AccessError;
use crate::handlers::AppState;
use crate::metrics;
use crate::models::{AccessRequest, ShareLinkResponse};
use actix_web::{web, HttpResponse};
use std::time::Instant;
use tracing::{error, info};

/// Authorize a playback request and return a share link
///
/// The body is parsed here rather than through `web::Json` so malformed
/// input gets the same failure shape as every other error.
pub async fn request_access(state: web::Data<AppState>, body: web::Bytes) -> HttpResponse {
    let started = Instant::now();

    let response = match serde_json::from_slice::<AccessRequest>(&body) {
        Ok(request) => match state.engine.request_access(&request).await {
            Ok(link) => {
                info!(
                    video_id = %link.video_id,
                    prefix = %link.object_prefix,
                    public = link.public,
                    "Share link issued"
                );
                HttpResponse::Ok().json(ShareLinkResponse { data: link.url })
            }
            Err(e) => {
                if e.is_transient() {
                    error!(error = %e, "Access request failed");
                }
                e.to_response(state.expose_error_details)
            }
        },
        Err(e) => AccessError::BadRequest(format!("invalid request body: {e}"))
            .to_response(state.expose_error_details),
    };

    metrics::observe_request(response.status().as_u16(), started.elapsed());
    response
}
