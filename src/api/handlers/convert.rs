//! HTML to PDF conversion handler

use actix_web::{
    http::header::{ContentDisposition, DispositionParam, DispositionType},
    web, HttpRequest, HttpResponse,
};
use serde::{Deserialize, Deserializer};
use std::time::{Duration, Instant};
use tracing::{error, info};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorBody};
use crate::api::middleware::ApiKeyExt;
use crate::render::{document, render_with_timeout, LayoutOptions, RenderJob};
use crate::AppState;

/// Request body for `POST /convert`
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConvertRequest {
    /// Document to render
    #[serde(default)]
    pub html: String,
    /// Stylesheet injected into the document head
    #[serde(default)]
    pub css: Option<String>,
    /// Download name; `.pdf` is appended when missing
    #[serde(default)]
    pub filename: Option<String>,
    /// Base URL for resolving relative links
    #[serde(default)]
    pub base_url: Option<String>,
    /// Paper size such as `A4` or `Letter`; `auto` sizes the page to the content
    #[serde(default = "default_page_size")]
    pub page_size: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub width: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub height: Option<String>,
    /// Margin for all sides, e.g. `10mm`; bare numbers are pixels
    #[serde(default = "default_margin", deserialize_with = "margin_value")]
    pub margin: String,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
}

fn default_page_size() -> String {
    "A4".to_string()
}

fn default_margin() -> String {
    "0".to_string()
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

/// Dimensions arrive as `"600px"` or as a bare number
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(serde_json::Value::Number(n)) => Some(format!("{}px", n)),
        _ => None,
    })
}

fn margin_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(string_or_number(deserializer)?.unwrap_or_else(default_margin))
}

impl ConvertRequest {
    fn into_job(self) -> (RenderJob, String) {
        let page_size = match self.page_size.trim() {
            s if s.is_empty() || s.eq_ignore_ascii_case("auto") => None,
            s => Some(s.to_string()),
        };

        let job = RenderJob {
            html: self.html,
            css: self.css,
            base_url: self.base_url,
            layout: LayoutOptions {
                page_size,
                width: self.width,
                height: self.height,
                margin: document::normalize_margin(&self.margin),
                viewport_width: self.viewport_width,
                viewport_height: self.viewport_height,
            },
        };
        (job, document::normalize_filename(self.filename.as_deref()))
    }
}

/// POST /convert - Render HTML into a PDF download
#[utoipa::path(
    post,
    path = "/convert",
    tag = "conversion",
    request_body = ConvertRequest,
    params(
        ("X-API-Key" = Option<String>, Header, description = "API key; required once any key is configured")
    ),
    responses(
        (status = 200, description = "PDF document", body = Vec<u8>, content_type = "application/pdf"),
        (status = 400, description = "Missing or invalid body", body = ErrorBody),
        (status = 401, description = "No API key supplied", body = ErrorBody),
        (status = 403, description = "Unknown or inactive API key", body = ErrorBody),
        (status = 413, description = "Body over the size limit", body = ErrorBody),
        (status = 429, description = "Rate limit exceeded", body = ErrorBody),
        (status = 500, description = "Rendering failed or timed out", body = ErrorBody)
    )
)]
pub async fn convert_html(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<ConvertRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    if request.html.trim().is_empty() {
        return Err(ApiError::BadRequest("HTML content is required".to_string()));
    }

    let key_id = req
        .api_key()
        .map(|k| k.key_id)
        .unwrap_or_else(|| "anonymous".to_string());
    let (job, filename) = request.into_job();
    let timeout = Duration::from_secs(state.settings.render.timeout_secs);

    let start = Instant::now();
    let pdf = render_with_timeout(state.renderer.as_ref(), &job, timeout)
        .await
        .map_err(|e| {
            error!(key = %key_id, renderer = state.renderer.name(), error = %e, "Conversion failed");
            ApiError::from(e)
        })?;

    info!(
        key = %key_id,
        filename = %filename,
        bytes = pdf.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Converted HTML to PDF"
    );

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(pdf))
}
