//! OpenAPI 3.0 specification definition

use utoipa::OpenApi;

use crate::api::error::ErrorBody;
use crate::api::handlers::{
    convert::ConvertRequest,
    health::{HealthResponse, VersionResponse},
    keys::{
        CreateKeyRequest, CreateKeyResponse, KeyActionResponse, ListKeysResponse,
        UpdateKeyRequest,
    },
};
use crate::keys::{MaskedKey, RateLimitConfig};
use crate::version::VersionInfo;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PDF-Gate API",
        version = "2.0.0",
        description = "HTML to PDF conversion with API key authentication and per-key rate limiting"
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "Service metadata and health"),
        (name = "conversion", description = "HTML to PDF conversion"),
        (name = "admin", description = "API key administration (super user only)")
    ),
    paths(
        crate::api::handlers::health::home,
        crate::api::handlers::health::health_check,
        crate::api::handlers::health::version,
        crate::api::handlers::convert::convert_html,
        crate::api::handlers::keys::list_keys,
        crate::api::handlers::keys::create_key,
        crate::api::handlers::keys::update_key,
        crate::api::handlers::keys::delete_key,
    ),
    components(
        schemas(
            ErrorBody,
            HealthResponse,
            VersionResponse,
            VersionInfo,
            ConvertRequest,
            CreateKeyRequest,
            CreateKeyResponse,
            UpdateKeyRequest,
            KeyActionResponse,
            ListKeysResponse,
            MaskedKey,
            RateLimitConfig,
        )
    )
)]
pub struct ApiDoc;
