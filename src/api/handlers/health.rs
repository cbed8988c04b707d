//! Service metadata endpoints: home, health and version

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::version::VersionInfo;
use crate::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    /// RFC 3339 UTC timestamp
    pub timestamp: String,
}

#[derive(Serialize, ToSchema)]
pub struct VersionResponse {
    #[serde(flatten)]
    pub info: VersionInfo,
    pub timestamp: String,
}

/// GET / - Service metadata and usage
#[utoipa::path(
    get,
    path = "/",
    tag = "system",
    responses(
        (status = 200, description = "Service metadata, endpoint map and usage")
    )
)]
pub async fn home(state: web::Data<AppState>) -> HttpResponse {
    let info = &state.version;

    HttpResponse::Ok().json(json!({
        "name": info.name,
        "version": info.version,
        "updated_at": info.updated_at,
        "endpoints": {
            "/": "GET - Service metadata",
            "/health": "GET - Health check",
            "/version": "GET - Version and changelog",
            "/convert": "POST - Convert HTML to PDF (requires X-API-Key when keys are configured)",
            "/admin/keys": "GET, POST - List or create API keys (requires X-Super-User-Key)",
            "/admin/keys/{prefix}": "PATCH, DELETE - Update or delete API keys (requires X-Super-User-Key)",
        },
        "usage": {
            "method": "POST",
            "url": "/convert",
            "headers": {
                "Content-Type": "application/json",
                "X-API-Key": "<your key>",
            },
            "body": {
                "html": "<html><body><h1>Hello</h1></body></html>",
                "css": "h1 { color: navy; }",
                "filename": "hello.pdf",
                "page_size": "A4",
                "margin": "10mm",
            },
        },
    }))
}

/// GET /health - Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let response = HealthResponse {
        status: "healthy",
        version: state.version.version.clone(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
    };

    HttpResponse::Ok().json(response)
}

/// GET /version - Version and changelog
#[utoipa::path(
    get,
    path = "/version",
    tag = "system",
    responses(
        (status = 200, description = "Version information", body = VersionResponse)
    )
)]
pub async fn version(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(VersionResponse {
        info: state.version.clone(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
