//! API module - HTTP routes and handlers

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;

use actix_web::web;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::middleware::GateMiddleware;
use crate::api::openapi::ApiDoc;
use crate::gate::Gatekeeper;

/// JSON extractor limits with `{error, message}` failures
pub fn json_config(max_body_bytes: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(max_body_bytes)
        .error_handler(error::json_error_handler)
}

/// Configure all API routes
///
/// `/convert` sits behind the regular key tier and `/admin/keys` behind the
/// super user tier; metadata and docs are public.
pub fn configure_routes(cfg: &mut web::ServiceConfig, gate: Arc<Gatekeeper>, max_body_bytes: usize) {
    cfg.app_data(json_config(max_body_bytes))
        .route("/", web::get().to(handlers::health::home))
        .route("/health", web::get().to(handlers::health::health_check))
        .route("/version", web::get().to(handlers::health::version))
        .service(
            web::resource("/convert")
                .wrap(GateMiddleware::api_key(gate.clone()))
                .route(web::post().to(handlers::convert::convert_html)),
        )
        // Gated per resource so unknown /admin paths still reach the 404 fallback
        .service(
            web::resource("/admin/keys")
                .wrap(GateMiddleware::super_user(gate.clone()))
                .route(web::get().to(handlers::keys::list_keys))
                .route(web::post().to(handlers::keys::create_key)),
        )
        .service(
            web::resource("/admin/keys/{prefix}")
                .wrap(GateMiddleware::super_user(gate))
                .route(web::patch().to(handlers::keys::update_key))
                .route(web::delete().to(handlers::keys::delete_key)),
        )
        // Swagger UI and OpenAPI spec
        .service(
            SwaggerUi::new("/swagger-ui/{_:.*}")
                .url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .default_service(web::to(error::not_found));
}

#[cfg(test)]
pub(crate) mod test_support {
    use actix_web::web;
    use std::sync::Arc;
    use std::time::Instant;

    use crate::admin::KeyAdmin;
    use crate::config::Settings;
    use crate::gate::Gatekeeper;
    use crate::keys::store::tests::memory_store;
    use crate::keys::models::KeyDocument;
    use crate::render::tests::StaticRenderer;
    use crate::render::Renderer;
    use crate::version::VersionInfo;
    use crate::AppState;

    #[derive(Default)]
    pub struct TestStateOptions {
        pub document: Option<KeyDocument>,
        pub renderer: Option<Arc<dyn Renderer>>,
        pub render_timeout_secs: Option<u64>,
        pub max_body_bytes: Option<usize>,
    }

    /// Application state over an in-memory key store
    pub fn test_app_state(options: TestStateOptions) -> web::Data<AppState> {
        let mut settings = Settings::default();
        if let Some(secs) = options.render_timeout_secs {
            settings.render.timeout_secs = secs;
        }
        if let Some(max) = options.max_body_bytes {
            settings.server.max_body_bytes = max;
        }

        let (store, _repo) = memory_store(options.document);
        let store = Arc::new(store);
        let gate = Arc::new(Gatekeeper::new(store.load().unwrap()));

        web::Data::new(AppState {
            admin: KeyAdmin::new(store, gate.clone()),
            gate,
            renderer: options
                .renderer
                .unwrap_or_else(|| Arc::new(StaticRenderer::pdf())),
            version: VersionInfo::default(),
            started_at: Instant::now(),
            settings,
        })
    }
}
