/// Playback Access Service - HTTP Server
///
/// Authorizes video playback requests and issues prefix-scoped share links.
use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use playback_access_service::cache::{KeyValueStore, RedisKeyValueStore};
use playback_access_service::clock::{Clock, SystemClock};
use playback_access_service::config::{CorsConfig, LinkConfig, LinkMode};
use playback_access_service::db::{create_pool, PgVideoRepository, VideoRepository};
use playback_access_service::handlers::{self, AppState};
use playback_access_service::services::{
    AccessEngine, LinkSettings, ShareLinkIssuer, SignedLinkIssuer, StaticLinkIssuer,
};
use playback_access_service::Config;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[actix_web::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.app.json_logs);

    info!(
        env = %config.app.env,
        host = %config.app.host,
        port = config.app.port,
        "Starting playback-access-service"
    );

    let pool = create_pool(&config.database)
        .await
        .context("Failed to connect to database")?;
    let videos: Arc<dyn VideoRepository> = Arc::new(PgVideoRepository::new(pool));

    let kv: Arc<dyn KeyValueStore> = Arc::new(
        RedisKeyValueStore::connect(&config.cache.redis_url, Some(config.cache.op_timeout))
            .await
            .context("Failed to connect to Redis")?,
    );
    info!("Connected to Redis");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let links = build_link_issuer(&config.link, clock.clone())?;

    let engine = Arc::new(AccessEngine::new(
        kv.clone(),
        videos.clone(),
        links,
        clock,
        LinkSettings {
            bucket: config.link.bucket.clone(),
            valid_for: config.link.valid_for,
        },
    ));

    let state = AppState {
        engine,
        kv,
        videos,
        expose_error_details: !config.app.is_production(),
    };

    let bind_address = (config.app.host.clone(), config.app.port);
    let cors_config = config.cors.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(build_cors(&cors_config))
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
    })
    .bind(bind_address)
    .context("Failed to bind HTTP listener")?
    .run()
    .await
    .context("HTTP server terminated")?;

    info!("playback-access-service stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn build_link_issuer(config: &LinkConfig, clock: Arc<dyn Clock>) -> Result<Arc<dyn ShareLinkIssuer>> {
    Ok(match config.mode {
        LinkMode::Signed => {
            let secret = config
                .secret
                .clone()
                .context("LINK_SHARE_SECRET must be set for signed links")?;
            Arc::new(SignedLinkIssuer::new(config.base_url.clone(), secret, clock))
        }
        LinkMode::Static => {
            warn!(base_url = %config.base_url, "Issuing unsigned share links");
            Arc::new(StaticLinkIssuer::new(config.base_url.clone()))
        }
    })
}

fn build_cors(config: &CorsConfig) -> Cors {
    let mut cors = Cors::default();
    for origin in &config.allowed_origins {
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }

    cors.allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_any_header()
        .max_age(3600)
}
