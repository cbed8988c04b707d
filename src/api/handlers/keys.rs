//! API Key Management Handlers
//!
//! Super user endpoints for listing, creating, updating and deleting regular
//! API keys. Every mutation is persisted and reloaded into the auth gate before
//! the response is sent. Store I/O runs on the blocking pool.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorBody};
use crate::keys::{KeyUpdate, MaskedKey, RateLimitConfig};
use crate::AppState;

/// Request to create a new API key
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateKeyRequest {
    pub name: Option<String>,
    /// Defaults to `true`
    pub active: Option<bool>,
}

/// Partial update; at least one field must be set
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateKeyRequest {
    pub active: Option<bool>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListKeysResponse {
    pub success: bool,
    pub keys: Vec<MaskedKey>,
    pub total: usize,
    pub rate_limit: RateLimitConfig,
}

/// Response after creating a key; the only time the key is shown
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateKeyResponse {
    pub success: bool,
    pub message: String,
    pub key: String,
    pub name: String,
    pub active: bool,
    pub warning: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KeyActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
}

/// GET /admin/keys - List all keys, masked
#[utoipa::path(
    get,
    path = "/admin/keys",
    tag = "admin",
    params(
        ("X-Super-User-Key" = String, Header, description = "Super user key")
    ),
    responses(
        (status = 200, description = "Masked key listing", body = ListKeysResponse),
        (status = 401, description = "No super user key supplied", body = ErrorBody),
        (status = 403, description = "Wrong super user key", body = ErrorBody),
        (status = 500, description = "Super user not configured or store failure", body = ErrorBody)
    )
)]
pub async fn list_keys(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let admin = state.admin.clone();
    let listing = web::block(move || admin.list()).await??;

    Ok(HttpResponse::Ok().json(ListKeysResponse {
        success: true,
        total: listing.keys.len(),
        keys: listing.keys,
        rate_limit: listing.rate_limit,
    }))
}

/// POST /admin/keys - Create a new key
#[utoipa::path(
    post,
    path = "/admin/keys",
    tag = "admin",
    request_body = CreateKeyRequest,
    params(
        ("X-Super-User-Key" = String, Header, description = "Super user key")
    ),
    responses(
        (status = 201, description = "Key created", body = CreateKeyResponse),
        (status = 400, description = "Missing name", body = ErrorBody),
        (status = 401, description = "No super user key supplied", body = ErrorBody),
        (status = 403, description = "Wrong super user key", body = ErrorBody),
        (status = 500, description = "Super user not configured or store failure", body = ErrorBody)
    )
)]
pub async fn create_key(
    state: web::Data<AppState>,
    body: web::Json<CreateKeyRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    let admin = state.admin.clone();
    let active = request.active.unwrap_or(true);
    let created = web::block(move || admin.create(request.name.as_deref(), active)).await??;

    Ok(HttpResponse::Created().json(CreateKeyResponse {
        success: true,
        message: format!("API key created for '{}'", created.name),
        key: created.key,
        name: created.name,
        active: created.active,
        warning: "Save this key now. It will not be shown again.".to_string(),
    }))
}

/// PATCH /admin/keys/{prefix} - Update the first key starting with `prefix`
#[utoipa::path(
    patch,
    path = "/admin/keys/{prefix}",
    tag = "admin",
    request_body = UpdateKeyRequest,
    params(
        ("prefix" = String, Path, description = "Leading characters of the key"),
        ("X-Super-User-Key" = String, Header, description = "Super user key")
    ),
    responses(
        (status = 200, description = "Key updated", body = KeyActionResponse),
        (status = 400, description = "Nothing to update", body = ErrorBody),
        (status = 404, description = "No key with that prefix", body = ErrorBody),
        (status = 401, description = "No super user key supplied", body = ErrorBody),
        (status = 403, description = "Wrong super user key", body = ErrorBody)
    )
)]
pub async fn update_key(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateKeyRequest>,
) -> Result<HttpResponse, ApiError> {
    let prefix = path.into_inner();
    let request = body.into_inner();
    let update = KeyUpdate {
        active: request.active,
        name: request.name,
    };

    let admin = state.admin.clone();
    let target = prefix.clone();
    web::block(move || admin.update(&target, update)).await??;

    Ok(HttpResponse::Ok().json(KeyActionResponse {
        success: true,
        message: format!("API key {}... updated", prefix),
        removed: None,
    }))
}

/// DELETE /admin/keys/{prefix} - Delete every key starting with `prefix`
#[utoipa::path(
    delete,
    path = "/admin/keys/{prefix}",
    tag = "admin",
    params(
        ("prefix" = String, Path, description = "Leading characters of the key"),
        ("X-Super-User-Key" = String, Header, description = "Super user key")
    ),
    responses(
        (status = 200, description = "Keys deleted", body = KeyActionResponse),
        (status = 404, description = "No key with that prefix", body = ErrorBody),
        (status = 401, description = "No super user key supplied", body = ErrorBody),
        (status = 403, description = "Wrong super user key", body = ErrorBody)
    )
)]
pub async fn delete_key(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let prefix = path.into_inner();
    let admin = state.admin.clone();
    let target = prefix.clone();
    let removed = web::block(move || admin.delete(&target)).await??;

    Ok(HttpResponse::Ok().json(KeyActionResponse {
        success: true,
        message: format!("Deleted {} API key(s) matching {}...", removed, prefix),
        removed: Some(removed),
    }))
}
