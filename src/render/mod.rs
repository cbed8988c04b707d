//! PDF rendering
//!
//! The rendering engine is an external collaborator behind the [`Renderer`]
//! trait. [`CommandRenderer`] drives a converter binary as a child process;
//! [`render_with_timeout`] bounds any renderer with a deadline.

mod command;
pub mod document;

pub use command::CommandRenderer;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Rendering failures
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to start renderer: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Renderer IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Renderer exited with status {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("Renderer produced no output")]
    EmptyOutput,
    #[error("Rendering timed out after {0:?}")]
    Timeout(Duration),
}

/// Page and viewport parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// `None` lets the content decide the page size
    pub page_size: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    /// Normalized margin applied to all four sides
    pub margin: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            page_size: Some("A4".to_string()),
            width: None,
            height: None,
            margin: "0px".to_string(),
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

/// Everything a renderer needs for one document
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub html: String,
    pub css: Option<String>,
    pub base_url: Option<String>,
    pub layout: LayoutOptions,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render the job into PDF bytes
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError>;

    /// Short engine name for logs and service metadata
    fn name(&self) -> &str;
}

/// Run `renderer` with an upper bound on wall-clock time
pub async fn render_with_timeout(
    renderer: &dyn Renderer,
    job: &RenderJob,
    timeout: Duration,
) -> Result<Vec<u8>, RenderError> {
    match tokio::time::timeout(timeout, renderer.render(job)).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout(timeout)),
    }
}
