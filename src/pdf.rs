use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::error::ToolError;

/// Rasterizes an HTML file into PDF bytes
#[async_trait]
pub trait PdfGenerator: Send + Sync {
    async fn html_to_pdf(&self, html_path: &Path) -> Result<Vec<u8>, ToolError>;
}

/// Extracts plain text from a PDF file
#[async_trait]
pub trait PdfTextExtractor: Send + Sync {
    async fn extract_text(&self, path: &Path) -> Result<String, ToolError>;
}

/// Runs an external converter such as headless Chromium.
///
/// `argv` is a template; `{input}` and `{output}` are replaced by the HTML
/// source and a PDF path inside a scratch directory removed after every run.
pub struct CommandPdfGenerator {
    argv: Vec<String>,
    timeout: Duration,
    scratch_root: Option<PathBuf>,
}

impl CommandPdfGenerator {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self {
            argv,
            timeout,
            scratch_root: None,
        }
    }

    /// Parent of the scratch directories (default: the system temp dir)
    pub fn scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    fn scratch_dir(&self) -> Result<TempDir, ToolError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("worklooking-pdf-");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| ToolError::PdfFailed(format!("Failed to create scratch directory: {}", e)))
    }

    fn command_line(&self, input: &Path, output: &Path) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input.display().to_string())
                    .replace("{output}", &output.display().to_string())
            })
            .collect()
    }
}

#[async_trait]
impl PdfGenerator for CommandPdfGenerator {
    async fn html_to_pdf(&self, html_path: &Path) -> Result<Vec<u8>, ToolError> {
        let scratch = self.scratch_dir()?;
        let output_path = scratch.path().join("output.pdf");
        let parts = self.command_line(html_path, &output_path);
        let Some((program, args)) = parts.split_first() else {
            return Err(ToolError::PdfFailed("No PDF command configured".into()));
        };
        debug!("Running PDF command: {:?}", parts);

        let child = Command::new(program)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::PdfFailed(format!("Failed to run {}: {}", program, e)))?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ToolError::PdfFailed(e.to_string()))?,
            Err(_) => {
                return Err(ToolError::PdfFailed(format!(
                    "{} timed out after {} seconds",
                    program,
                    self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            return Err(ToolError::PdfFailed(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tokio::fs::read(&output_path)
            .await
            .map_err(|e| ToolError::PdfFailed(format!("No PDF produced: {}", e)))
    }
}

/// `pdf-extract` backed text extraction
#[derive(Debug, Default)]
pub struct PdfExtractText;

#[async_trait]
impl PdfTextExtractor for PdfExtractText {
    async fn extract_text(&self, path: &Path) -> Result<String, ToolError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text(&path).map_err(|e| ToolError::ReadFailed {
                path: path.clone(),
                source: std::io::Error::other(e.to_string()),
            })
        })
        .await
        .map_err(|e| ToolError::PdfFailed(format!("Task join error: {}", e)))?
    }
}
