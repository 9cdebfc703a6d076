use crate::handlers::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::warn;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "ok"}))
}

/// Ready once both the key-value and relational tiers answer
pub async fn ready(state: web::Data<AppState>) -> HttpResponse {
    let (kv, db) = tokio::join!(state.kv.ping(), state.videos.ping());

    if let Err(e) = &kv {
        warn!(error = %e, "Readiness: key-value store unavailable");
    }
    if let Err(e) = &db {
        warn!(error = %e, "Readiness: database unavailable");
    }

    let body = json!({
        "status": if kv.is_ok() && db.is_ok() { "ready" } else { "unavailable" },
        "redis": kv.is_ok(),
        "database": db.is_ok(),
    });

    if kv.is_ok() && db.is_ok() {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
