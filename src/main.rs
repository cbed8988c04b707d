//! PDF-Gate
//!
//! HTML to PDF conversion API using Rust + Actix-Web.
//! Regular API keys are rate limited per key over sliding minute and hour
//! windows; a super user key administers the key set at runtime.

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

mod admin;
mod api;
mod config;
mod gate;
mod keys;
mod render;
mod version;

use crate::admin::KeyAdmin;
use crate::config::Settings;
use crate::gate::Gatekeeper;
use crate::keys::{JsonFileRepository, KeyStore};
use crate::render::{CommandRenderer, Renderer};
use crate::version::VersionInfo;

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub gate: Arc<Gatekeeper>,
    pub admin: KeyAdmin,
    pub renderer: Arc<dyn Renderer>,
    pub version: VersionInfo,
    pub started_at: Instant,
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("pdf_gate={}", level).parse()?)
        .add_directive("actix_web=info".parse()?);

    if debug {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    init_tracing(settings.server.debug)?;

    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!(
        "Starting PDF-Gate v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    );

    // A corrupt key document stops startup; a missing one means open access
    let repo = JsonFileRepository::new(&settings.keys.path);
    info!(path = %repo.path().display(), "Loading API keys");
    let store = Arc::new(KeyStore::new(Box::new(repo), settings.rate_limit));
    let snapshot = store
        .load()
        .with_context(|| format!("Failed to load API keys from {}", settings.keys.path.display()))?;
    let gate = Arc::new(Gatekeeper::new(snapshot));
    let admin = KeyAdmin::new(store, gate.clone());

    let renderer: Arc<dyn Renderer> = Arc::new(CommandRenderer::from_settings(&settings.render));
    info!(
        renderer = renderer.name(),
        timeout_secs = settings.render.timeout_secs,
        "Renderer configured"
    );

    let version = VersionInfo::load(&settings.version.path);
    let workers = settings.server.workers.unwrap_or_else(|| num_cpus::get() * 2);
    let max_body_bytes = settings.server.max_body_bytes;

    // Create shared application state
    let app_state = web::Data::new(AppState {
        settings,
        gate,
        admin,
        renderer,
        version,
        started_at: Instant::now(),
    });

    // Configure and start HTTP server
    HttpServer::new(move || {
        let gate = app_state.gate.clone();
        App::new()
            .app_data(app_state.clone())
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "pdf-gate"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
            )
            .configure(move |cfg| api::configure_routes(cfg, gate, max_body_bytes))
    })
    .workers(workers)
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
