//! Converter binary driven over stdin/stdout

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{document, LayoutOptions, RenderError, RenderJob, Renderer};
use crate::config::RenderSettings;

/// Longest stderr excerpt carried in a [`RenderError::Failed`]
const STDERR_EXCERPT: usize = 512;

/// Renders through a wkhtmltopdf-compatible command line tool
pub struct CommandRenderer {
    command: String,
    args: Vec<String>,
}

impl CommandRenderer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self::new(settings.command.clone(), settings.args.clone())
    }

    /// Full argument list: configured args, layout flags, then stdin/stdout
    fn build_args(&self, layout: &LayoutOptions) -> Vec<String> {
        let mut args = self.args.clone();

        if let Some(page_size) = &layout.page_size {
            args.extend(["--page-size".to_string(), page_size.clone()]);
        }
        if let Some(width) = &layout.width {
            args.extend(["--page-width".to_string(), width.clone()]);
        }
        if let Some(height) = &layout.height {
            args.extend(["--page-height".to_string(), height.clone()]);
        }
        for side in ["top", "right", "bottom", "left"] {
            args.push(format!("--margin-{}", side));
            args.push(layout.margin.clone());
        }
        args.push("--viewport-size".to_string());
        args.push(format!("{}x{}", layout.viewport_width, layout.viewport_height));

        args.push("-".to_string());
        args.push("-".to_string());
        args
    }
}

#[async_trait]
impl Renderer for CommandRenderer {
    async fn render(&self, job: &RenderJob) -> Result<Vec<u8>, RenderError> {
        let html = document::compose(job);
        let args = self.build_args(&job.layout);
        debug!(command = %self.command, ?args, bytes = html.len(), "Spawning renderer");

        let mut child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // a timed-out render drops this future; the child must not outlive it
            .kill_on_drop(true)
            .spawn()
            .map_err(RenderError::Spawn)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::Io(std::io::Error::other("renderer stdin unavailable")))?;

        let write = async move {
            let result = stdin.write_all(html.as_bytes()).await;
            drop(stdin);
            result
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr: String = stderr.trim().chars().take(STDERR_EXCERPT).collect();
            warn!(status = %output.status, stderr = %stderr, "Renderer failed");
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }
        written?;

        if output.stdout.is_empty() {
            return Err(RenderError::EmptyOutput);
        }
        Ok(output.stdout)
    }

    fn name(&self) -> &str {
        &self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> RenderJob {
        RenderJob {
            html: "<p>hello</p>".to_string(),
            css: Some("p{}".to_string()),
            base_url: None,
            layout: LayoutOptions::default(),
        }
    }

    #[test]
    fn test_args_for_default_layout() {
        let renderer = CommandRenderer::new("wkhtmltopdf", vec!["--quiet".to_string()]);
        let args = renderer.build_args(&LayoutOptions::default());

        assert_eq!(args[0], "--quiet");
        assert_eq!(&args[1..3], ["--page-size", "A4"]);
        assert!(args.windows(2).any(|w| w == ["--margin-left", "0px"]));
        assert!(args.windows(2).any(|w| w == ["--viewport-size", "1920x1080"]));
        assert_eq!(&args[args.len() - 2..], ["-", "-"]);
    }

    #[test]
    fn test_auto_page_size_omits_flag() {
        let renderer = CommandRenderer::new("wkhtmltopdf", Vec::new());
        let layout = LayoutOptions {
            page_size: None,
            width: Some("1200px".to_string()),
            ..LayoutOptions::default()
        };
        let args = renderer.build_args(&layout);
        assert!(!args.iter().any(|a| a == "--page-size"));
        assert!(args.windows(2).any(|w| w == ["--page-width", "1200px"]));
    }

    #[cfg(unix)]
    #[actix_rt::test]
    async fn test_stdout_is_returned() {
        // `sh -c 'cat' sh <args...>` echoes the composed document back
        let renderer = CommandRenderer::new("sh", vec!["-c".to_string(), "cat".to_string(), "sh".to_string()]);
        let out = renderer.render(&job()).await.unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("<style>p{}</style>"));
        assert!(out.contains("<p>hello</p>"));
    }

    #[cfg(unix)]
    #[actix_rt::test]
    async fn test_nonzero_exit_is_failure() {
        let renderer = CommandRenderer::new(
            "sh",
            vec!["-c".to_string(), "echo boom >&2; exit 3".to_string(), "sh".to_string()],
        );
        match renderer.render(&job()).await {
            Err(RenderError::Failed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected failure, got {:?}", other.map(|b| b.len())),
        }
    }

    #[actix_rt::test]
    async fn test_missing_binary_is_spawn_error() {
        let renderer = CommandRenderer::new("definitely-not-a-real-renderer-binary", Vec::new());
        assert!(matches!(renderer.render(&job()).await, Err(RenderError::Spawn(_))));
    }
}
