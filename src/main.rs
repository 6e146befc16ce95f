use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod analytics;
mod api;
mod auth;
mod config;
mod db;
mod docs;
mod geo;
mod model;
mod models;
mod repository;
mod routes;
mod seed;
mod utils;

use config::Config;
use db::init_store;

use crate::auth::session::SessionStore;
use crate::docs::ApiDoc;
use crate::geo::CheckInRegistry;
use crate::routes::Limiters;
use crate::utils::checkin_cache::CheckInCache;
use crate::utils::username_filter;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Geo Hazri HRM is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let store = init_store(config.seed_password.as_deref())?;

    if let Err(e) = username_filter::warmup_username_filter(&*store.users, 100) {
        warn!(error = %e, "Failed to warmup username filter");
    }

    let registry = Data::new(CheckInRegistry::new(
        config.compliance_radius_m,
        config.position_options(),
    ));
    let latest_checkins = Data::new(CheckInCache::new());
    let sessions = Data::new(SessionStore::new(config.refresh_token_ttl));
    let limiters = Limiters::from_config(&config)?;
    info!(
        radius_m = registry.radius_m(),
        timeout_ms = config.location_timeout_ms,
        "Geo check-in configured"
    );

    let server_addr = config.server_addr.clone();
    let store = Data::new(store);
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(store.clone())
            .app_data(config.clone())
            .app_data(registry.clone())
            .app_data(latest_checkins.clone())
            .app_data(sessions.clone())
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
