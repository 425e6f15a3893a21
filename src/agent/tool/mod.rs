pub mod fs;
pub mod utils;
pub mod web;

use std::sync::Arc;

use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use self::fs::Sandbox;
use self::web::{FetchOptions, PageFetcher};
use crate::agent::types::{Tool, ToolFunction};
use crate::error::ToolError;
use crate::pdf::{PdfGenerator, PdfTextExtractor};
use crate::render::ResumeRenderer;
use crate::types::{CandidatureConfig, ResumeDocument};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadFileArgs {
    /// Relative (to the data directory) or absolute path, e.g. resume.json
    pub file_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WriteFileArgs {
    /// Path relative to the data directory, e.g. candidatures/acme/offer.md
    pub file_path: String,
    pub content: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderResumeArgs {
    /// Resume in JSON Resume format (default: the current source resume)
    #[serde(default)]
    pub resume_json: Option<ResumeDocument>,
    /// Theme name, e.g. modern-sidebar
    #[serde(default)]
    pub theme_name: Option<String>,
    /// Optional path, relative to the data directory, to save the HTML to
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratePdfArgs {
    /// Path of the source HTML, relative to the data directory
    pub html_path: String,
    /// Path of the PDF to create, relative to the data directory
    pub pdf_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchUrlArgs {
    /// URL to fetch
    pub url: String,
    /// Optional CSS selector to wait for before reading the page
    #[serde(default)]
    pub wait_for_selector: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadPdfArgs {
    /// Relative or absolute path of the PDF
    pub file_path: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveSourceResumeArgs {
    /// The complete updated source resume in JSON Resume format
    pub resume_json: ResumeDocument,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SaveCandidatureConfigArgs {
    /// The complete updated candidature configuration
    pub config: CandidatureConfig,
}

/// The fixed tool catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    ReadFile,
    WriteFile,
    RenderResume,
    GeneratePdf,
    FetchUrl,
    ReadPdf,
    SaveSourceResume,
    SaveCandidatureConfig,
}

impl ToolName {
    pub const ALL: [ToolName; 8] = [
        ToolName::ReadFile,
        ToolName::WriteFile,
        ToolName::RenderResume,
        ToolName::GeneratePdf,
        ToolName::FetchUrl,
        ToolName::ReadPdf,
        ToolName::SaveSourceResume,
        ToolName::SaveCandidatureConfig,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::ReadFile => "read_file",
            ToolName::WriteFile => "write_file",
            ToolName::RenderResume => "render_resume",
            ToolName::GeneratePdf => "generate_pdf",
            ToolName::FetchUrl => "fetch_url",
            ToolName::ReadPdf => "read_pdf",
            ToolName::SaveSourceResume => "save_source_resume",
            ToolName::SaveCandidatureConfig => "save_candidature_config",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    fn description(self) -> &'static str {
        match self {
            ToolName::ReadFile => "Read a file (e.g. resume.json, candidature_config.json).",
            ToolName::WriteFile => {
                "Create or update a file in the user data directory. Parent directories are created automatically."
            }
            ToolName::RenderResume => {
                "Render a resume to HTML with a theme. Personal information is restored from the source resume."
            }
            ToolName::GeneratePdf => "Generate a PDF from an HTML file in the user data directory.",
            ToolName::FetchUrl => {
                "Fetch the text content of a URL (job offer, company website)."
            }
            ToolName::ReadPdf => "Extract the text of a PDF file (e.g. an existing resume).",
            ToolName::SaveSourceResume => {
                "Replace the main source resume. Use ONLY for the source resume, never for tailored versions."
            }
            ToolName::SaveCandidatureConfig => {
                "Replace the candidature configuration (profile, goals, target companies, applications)."
            }
        }
    }

    fn parameters(self) -> Value {
        match self {
            ToolName::ReadFile => parameters::<ReadFileArgs>(),
            ToolName::WriteFile => parameters::<WriteFileArgs>(),
            ToolName::RenderResume => parameters::<RenderResumeArgs>(),
            ToolName::GeneratePdf => parameters::<GeneratePdfArgs>(),
            ToolName::FetchUrl => parameters::<FetchUrlArgs>(),
            ToolName::ReadPdf => parameters::<ReadPdfArgs>(),
            ToolName::SaveSourceResume => parameters::<SaveSourceResumeArgs>(),
            ToolName::SaveCandidatureConfig => parameters::<SaveCandidatureConfigArgs>(),
        }
    }

    pub fn definition(self) -> Tool {
        Tool {
            tool_type: "function".to_string(),
            function: ToolFunction {
                name: self.as_str().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters(),
            },
        }
    }
}

/// JSON schema of an argument struct, self-contained and without metadata keys
fn parameters<T: JsonSchema>() -> Value {
    let generator = SchemaSettings::draft07()
        .with(|s| s.inline_subschemas = true)
        .into_generator();
    let mut schema = serde_json::to_value(generator.into_root_schema_for::<T>())
        .unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

/// Definitions of every tool, in catalog order
pub fn definitions() -> Vec<Tool> {
    ToolName::ALL.into_iter().map(ToolName::definition).collect()
}

/// Replacement documents produced by a tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMutation {
    pub resume: Option<ResumeDocument>,
    pub config: Option<CandidatureConfig>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolExecutionResult {
    pub result: Value,
    pub mutation: Option<DocumentMutation>,
}

impl ToolExecutionResult {
    fn data(result: Value) -> Self {
        Self {
            result,
            mutation: None,
        }
    }

    pub(crate) fn error(error: &ToolError) -> Self {
        Self::data(json!({ "error": error.to_string() }))
    }
}

/// Latest turn state visible to a tool: the résumé whose basics are preserved
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolContext<'a> {
    pub resume: Option<&'a ResumeDocument>,
}

/// Executes catalog tools against the sandbox and external collaborators
pub struct ToolExecutor {
    sandbox: Sandbox,
    renderer: Arc<dyn ResumeRenderer>,
    pdf: Arc<dyn PdfGenerator>,
    pdf_text: Arc<dyn PdfTextExtractor>,
    fetcher: Arc<dyn PageFetcher>,
    default_theme: String,
    max_fetch_chars: usize,
}

impl ToolExecutor {
    pub fn new(
        sandbox: Sandbox,
        renderer: Arc<dyn ResumeRenderer>,
        pdf: Arc<dyn PdfGenerator>,
        pdf_text: Arc<dyn PdfTextExtractor>,
        fetcher: Arc<dyn PageFetcher>,
    ) -> Self {
        Self {
            sandbox,
            renderer,
            pdf,
            pdf_text,
            fetcher,
            default_theme: crate::render::DEFAULT_THEME.to_string(),
            max_fetch_chars: 50_000,
        }
    }

    pub fn default_theme(mut self, theme: impl Into<String>) -> Self {
        self.default_theme = theme.into();
        self
    }

    pub fn max_fetch_chars(mut self, max_chars: usize) -> Self {
        self.max_fetch_chars = max_chars;
        self
    }

    /// Run one tool. Never fails: errors become an `{ "error": ... }` result.
    pub async fn execute(&self, name: &str, args: Value, ctx: ToolContext<'_>) -> ToolExecutionResult {
        let outcome = match ToolName::parse(name) {
            Some(tool) => self.dispatch(tool, args, ctx).await,
            None => Err(ToolError::UnknownTool(name.to_string())),
        };
        outcome.unwrap_or_else(|e| {
            warn!("Tool {} failed: {}", name, e);
            ToolExecutionResult::error(&e)
        })
    }

    async fn dispatch(
        &self,
        tool: ToolName,
        args: Value,
        ctx: ToolContext<'_>,
    ) -> Result<ToolExecutionResult, ToolError> {
        debug!("Dispatching tool {}", tool.as_str());
        match tool {
            ToolName::ReadFile => {
                let args: ReadFileArgs = parse(args)?;
                let content = self.sandbox.read(&args.file_path).await?;
                Ok(ToolExecutionResult::data(json!({ "content": content })))
            }
            ToolName::WriteFile => {
                let args: WriteFileArgs = parse(args)?;
                let path = self.sandbox.write(&args.file_path, args.content).await?;
                Ok(ToolExecutionResult::data(
                    json!({ "success": true, "path": path.display().to_string() }),
                ))
            }
            ToolName::RenderResume => {
                let args: RenderResumeArgs = parse(args)?;
                let mut resume = args
                    .resume_json
                    .or_else(|| ctx.resume.cloned())
                    .ok_or_else(|| ToolError::RenderFailed("No resume to render".into()))?;
                resume.preserve_basics_from(ctx.resume);
                let theme = args.theme_name.as_deref().unwrap_or(&self.default_theme);
                let html = self.renderer.render(&resume, theme).await?;
                match args.output_path {
                    Some(path) => {
                        let path = self.sandbox.write(&path, html).await?;
                        Ok(ToolExecutionResult::data(
                            json!({ "success": true, "path": path.display().to_string() }),
                        ))
                    }
                    None => Ok(ToolExecutionResult::data(json!({ "html": html }))),
                }
            }
            ToolName::GeneratePdf => {
                let args: GeneratePdfArgs = parse(args)?;
                let html_path = self.sandbox.existing(&args.html_path)?;
                self.sandbox.resolve(&args.pdf_path)?;
                let bytes = self.pdf.html_to_pdf(&html_path).await?;
                let path = self.sandbox.write(&args.pdf_path, bytes).await?;
                Ok(ToolExecutionResult::data(
                    json!({ "success": true, "path": path.display().to_string() }),
                ))
            }
            ToolName::FetchUrl => {
                let args: FetchUrlArgs = parse(args)?;
                let options = FetchOptions {
                    wait_for_selector: args.wait_for_selector,
                };
                let outcome =
                    web::fetch_url(self.fetcher.as_ref(), &args.url, options, self.max_fetch_chars)
                        .await;
                Ok(ToolExecutionResult::data(serde_json::to_value(outcome)?))
            }
            ToolName::ReadPdf => {
                let args: ReadPdfArgs = parse(args)?;
                let path = self.sandbox.existing(&args.file_path)?;
                let text = self.pdf_text.extract_text(&path).await?;
                Ok(ToolExecutionResult::data(json!({ "success": true, "text": text })))
            }
            ToolName::SaveSourceResume => {
                let args: SaveSourceResumeArgs = parse(args)?;
                let mut resume = args.resume_json;
                resume.preserve_basics_from(ctx.resume);
                Ok(ToolExecutionResult {
                    result: json!({
                        "success": true,
                        "message": "Source resume updated in memory. It will be persisted by the application."
                    }),
                    mutation: Some(DocumentMutation {
                        resume: Some(resume),
                        config: None,
                    }),
                })
            }
            ToolName::SaveCandidatureConfig => {
                let args: SaveCandidatureConfigArgs = parse(args)?;
                Ok(ToolExecutionResult {
                    result: json!({
                        "success": true,
                        "message": "Configuration updated in memory. It will be persisted by the application."
                    }),
                    mutation: Some(DocumentMutation {
                        resume: None,
                        config: Some(args.config),
                    }),
                })
            }
        }
    }
}

fn parse<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    Ok(serde_json::from_value(args)?)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::agent::tool::web::FetchedPage;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    /// Renderer that records what it was asked to render
    #[derive(Default)]
    pub struct RecordingRenderer {
        pub rendered: Mutex<Vec<ResumeDocument>>,
    }

    #[async_trait]
    impl ResumeRenderer for RecordingRenderer {
        async fn render(&self, resume: &ResumeDocument, theme: &str) -> Result<String, ToolError> {
            self.rendered.lock().unwrap().push(resume.clone());
            let name = resume
                .basics
                .as_ref()
                .and_then(|b| b.name.clone())
                .unwrap_or_default();
            Ok(format!("<html data-theme=\"{}\">{}</html>", theme, name))
        }
    }

    pub struct FakePdf;

    #[async_trait]
    impl PdfGenerator for FakePdf {
        async fn html_to_pdf(&self, html_path: &Path) -> Result<Vec<u8>, ToolError> {
            Ok(format!("%PDF {}", html_path.display()).into_bytes())
        }
    }

    #[async_trait]
    impl PdfTextExtractor for FakePdf {
        async fn extract_text(&self, _path: &Path) -> Result<String, ToolError> {
            Ok("extracted text".into())
        }
    }

    pub struct FakeFetcher;

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str, _options: &FetchOptions) -> Result<FetchedPage, ToolError> {
            Ok(FetchedPage {
                text: "Senior Rust Engineer".into(),
                final_url: url.into(),
                page_title: "Job".into(),
            })
        }
    }

    pub fn executor(root: &Path, renderer: Arc<RecordingRenderer>) -> ToolExecutor {
        ToolExecutor::new(
            Sandbox::open(root).unwrap(),
            renderer,
            Arc::new(FakePdf),
            Arc::new(FakePdf),
            Arc::new(FakeFetcher),
        )
    }

    pub fn alice() -> ResumeDocument {
        serde_json::from_value(json!({
            "basics": {"name": "Alice", "email": "alice@example.com", "image": "data:image/png;base64,AAAA"},
            "work": [{"name": "Acme"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_catalog_is_complete_and_unique() {
        let names: Vec<String> = definitions().into_iter().map(|t| t.function.name).collect();
        assert_eq!(
            names,
            vec![
                "read_file",
                "write_file",
                "render_resume",
                "generate_pdf",
                "fetch_url",
                "read_pdf",
                "save_source_resume",
                "save_candidature_config"
            ]
        );
        for name in &names {
            assert_eq!(ToolName::parse(name).map(ToolName::as_str), Some(name.as_str()));
        }
    }

    #[test]
    fn test_parameters_are_plain_objects() {
        let params = ToolName::WriteFile.definition().function.parameters;
        assert_eq!(params["type"], "object");
        assert!(params.get("$schema").is_none());
        assert!(params["properties"].get("filePath").is_some());
        let required = params["required"].as_array().unwrap();
        assert!(required.contains(&json!("filePath")));
        assert!(required.contains(&json!("content")));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let outcome = exec
            .execute("create_directory", json!({}), ToolContext::default())
            .await;
        assert_eq!(outcome.result, json!({"error": "Unknown tool: create_directory"}));
        assert_eq!(outcome.mutation, None);
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let outcome = exec
            .execute("write_file", json!({"filePath": "a.md"}), ToolContext::default())
            .await;
        assert!(outcome.result["error"].as_str().unwrap().starts_with("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let written = exec
            .execute(
                "write_file",
                json!({"filePath": "candidatures/acme/offer.md", "content": "# Offer"}),
                ToolContext::default(),
            )
            .await;
        assert_eq!(written.result["success"], true);

        let read = exec
            .execute(
                "read_file",
                json!({"filePath": "candidatures/acme/offer.md"}),
                ToolContext::default(),
            )
            .await;
        assert_eq!(read.result, json!({"content": "# Offer"}));
    }

    #[tokio::test]
    async fn test_write_file_traversal_is_error_result() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let outcome = exec
            .execute(
                "write_file",
                json!({"filePath": "../../etc/passwd", "content": "x"}),
                ToolContext::default(),
            )
            .await;
        assert!(outcome.result["error"].as_str().unwrap().contains("traversal"));
    }

    #[tokio::test]
    async fn test_render_resume_preserves_basics() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Arc::new(RecordingRenderer::default());
        let exec = executor(dir.path(), renderer.clone());
        let source = alice();

        let outcome = exec
            .execute(
                "render_resume",
                json!({
                    "resumeJson": {"basics": {"name": "Bob"}, "work": [{"name": "Initech"}]},
                    "themeName": "modern-sidebar"
                }),
                ToolContext {
                    resume: Some(&source),
                },
            )
            .await;

        assert_eq!(
            outcome.result["html"],
            "<html data-theme=\"modern-sidebar\">Alice</html>"
        );
        let rendered = renderer.rendered.lock().unwrap();
        assert_eq!(rendered[0].basics, source.basics);
        assert_eq!(rendered[0].sections["work"][0]["name"], "Initech");
    }

    #[tokio::test]
    async fn test_render_resume_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let source = alice();
        let outcome = exec
            .execute(
                "render_resume",
                json!({"outputPath": "candidatures/acme/resume.html"}),
                ToolContext {
                    resume: Some(&source),
                },
            )
            .await;
        assert_eq!(outcome.result["success"], true);
        let html = std::fs::read_to_string(dir.path().join("candidatures/acme/resume.html")).unwrap();
        assert!(html.contains("Alice"));
    }

    #[tokio::test]
    async fn test_render_without_any_resume_fails() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let outcome = exec
            .execute("render_resume", json!({}), ToolContext::default())
            .await;
        assert!(outcome.result["error"].as_str().unwrap().contains("No resume to render"));
    }

    #[tokio::test]
    async fn test_generate_pdf_missing_html() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let outcome = exec
            .execute(
                "generate_pdf",
                json!({"htmlPath": "missing.html", "pdfPath": "out/resume.pdf"}),
                ToolContext::default(),
            )
            .await;
        assert!(outcome.result["error"].as_str().unwrap().starts_with("File not found"));
        assert!(!dir.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_generate_pdf_writes_nested_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("resume.html"), "<html></html>").unwrap();
        let exec = executor(dir.path(), Arc::default());
        let outcome = exec
            .execute(
                "generate_pdf",
                json!({"htmlPath": "resume.html", "pdfPath": "candidatures/acme/resume.pdf"}),
                ToolContext::default(),
            )
            .await;
        assert_eq!(outcome.result["success"], true);
        let bytes = std::fs::read(dir.path().join("candidatures/acme/resume.pdf")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_read_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let missing = exec
            .execute("read_pdf", json!({"filePath": "cv.pdf"}), ToolContext::default())
            .await;
        assert!(missing.result["error"].as_str().unwrap().starts_with("File not found"));

        std::fs::write(dir.path().join("cv.pdf"), b"%PDF").unwrap();
        let found = exec
            .execute("read_pdf", json!({"filePath": "cv.pdf"}), ToolContext::default())
            .await;
        assert_eq!(found.result, json!({"success": true, "text": "extracted text"}));
    }

    #[tokio::test]
    async fn test_fetch_url_returns_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let outcome = exec
            .execute(
                "fetch_url",
                json!({"url": "https://jobs.example.com/42"}),
                ToolContext::default(),
            )
            .await;
        assert_eq!(
            outcome.result,
            json!({
                "success": true,
                "content": "Senior Rust Engineer",
                "finalUrl": "https://jobs.example.com/42"
            })
        );
    }

    #[tokio::test]
    async fn test_save_source_resume_registers_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let source = alice();
        let outcome = exec
            .execute(
                "save_source_resume",
                json!({"resumeJson": {"basics": {"name": "Bob"}, "skills": [{"name": "Rust"}]}}),
                ToolContext {
                    resume: Some(&source),
                },
            )
            .await;
        assert_eq!(outcome.result["success"], true);
        let saved = outcome.mutation.unwrap().resume.unwrap();
        assert_eq!(saved.basics, source.basics);
        assert_eq!(saved.sections["skills"][0]["name"], "Rust");
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_save_candidature_config_registers_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path(), Arc::default());
        let outcome = exec
            .execute(
                "save_candidature_config",
                json!({"config": {"goals": {"remote_policy": "full remote"}}}),
                ToolContext::default(),
            )
            .await;
        let mutation = outcome.mutation.unwrap();
        assert_eq!(mutation.resume, None);
        assert_eq!(mutation.config.unwrap().goals.remote_policy, "full remote");
    }
}
