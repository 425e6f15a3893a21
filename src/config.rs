use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use toml_scaffold::TomlScaffold;
use tracing::{debug, info};

pub const DEFAULT_CONFIG_PATH: &str = "worklooking.toml";

#[derive(Deserialize, Serialize, Debug, Default, JsonSchema, TomlScaffold)]
pub struct Config {
    /// OpenAI-compatible chat completions endpoint.
    /// The API key is never stored here: pass --api-key or set WORKLOOKING_API_KEY.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Agent loop limits
    #[serde(default)]
    pub agent: AgentConfig,
    /// User data directory
    #[serde(default)]
    pub data: DataConfig,
    /// Resume rendering and PDF export
    #[serde(default)]
    pub render: RenderConfig,
    /// Web page fetching
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Deserialize, Serialize, Debug, JsonSchema, TomlScaffold)]
pub struct LlmConfig {
    /// Base URL of the chat completions API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature (optional, provider default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Completion token limit (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Extra HTTP headers sent with every completion request
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: None,
            max_tokens: None,
            headers: HashMap::new(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai/".to_string()
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

#[derive(Deserialize, Serialize, Debug, JsonSchema, TomlScaffold)]
pub struct AgentConfig {
    /// Tool rounds allowed in a single turn
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: default_max_rounds(),
        }
    }
}

fn default_max_rounds() -> usize {
    crate::agent::r#loop::DEFAULT_MAX_ROUNDS
}

#[derive(Deserialize, Serialize, Debug, JsonSchema, TomlScaffold)]
pub struct DataConfig {
    /// Every file the assistant reads or writes lives under this directory
    #[serde(default = "default_data_root")]
    pub root: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: default_data_root(),
        }
    }
}

fn default_data_root() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Deserialize, Serialize, Debug, JsonSchema, TomlScaffold)]
pub struct RenderConfig {
    /// Theme used when the assistant does not name one
    #[serde(default = "default_theme")]
    pub theme: String,
    /// HTML to PDF command; {input} and {output} are replaced with file paths
    #[serde(default = "default_pdf_command")]
    pub pdf_command: Vec<String>,
    #[serde(default = "default_pdf_timeout_secs")]
    pub pdf_timeout_secs: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            pdf_command: default_pdf_command(),
            pdf_timeout_secs: default_pdf_timeout_secs(),
        }
    }
}

fn default_theme() -> String {
    crate::render::DEFAULT_THEME.to_string()
}

fn default_pdf_command() -> Vec<String> {
    [
        "chromium",
        "--headless",
        "--disable-gpu",
        "--no-pdf-header-footer",
        "--print-to-pdf={output}",
        "{input}",
    ]
    .map(String::from)
    .to_vec()
}

fn default_pdf_timeout_secs() -> u64 {
    60
}

#[derive(Deserialize, Serialize, Debug, JsonSchema, TomlScaffold)]
pub struct FetchConfig {
    /// Fetched page text is truncated to this many characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Seconds before a page awaited for a CSS selector is read anyway
    #[serde(default = "default_selector_timeout_secs")]
    pub selector_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            selector_timeout_secs: default_selector_timeout_secs(),
        }
    }
}

fn default_max_chars() -> usize {
    50_000
}

fn default_selector_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Commented default config written by `worklooking init`
    pub fn scaffold() -> anyhow::Result<String> {
        Config::default()
            .to_scaffold()
            .map_err(|e| anyhow!("Failed to generate config template: {}", e))
    }

    /// Load the config file, apply `key.path=value` overrides, then make the
    /// data root absolute. A missing file falls back to defaults.
    pub fn load(path: &str, overrides: &[String]) -> anyhow::Result<Self> {
        let mut table = if Path::new(path).exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path))?;
            toml::from_str::<toml::Table>(&content)
                .with_context(|| format!("Failed to parse config file {}", path))?
        } else {
            info!("Config file {} not found, using defaults", path);
            toml::Table::new()
        };

        for entry in overrides {
            apply_override(&mut table, entry)?;
        }

        let mut config: Config = toml::Value::Table(table)
            .try_into()
            .with_context(|| format!("Invalid config in {}", path))?;
        config.data.root = std::path::absolute(&config.data.root)
            .with_context(|| format!("Invalid data root {}", config.data.root.display()))?;
        debug!("Loaded config: {:?}", config);
        Ok(config)
    }
}

/// Patch `table` with one `key.path=value` override. Values are parsed as TOML
/// and fall back to plain strings.
fn apply_override(table: &mut toml::Table, entry: &str) -> anyhow::Result<()> {
    let Some((key_path, raw)) = entry.split_once('=') else {
        bail!("Invalid config override '{}', expected key.path=value", entry);
    };
    let keys: Vec<&str> = key_path.trim().split('.').map(str::trim).collect();
    if keys.iter().any(|k| k.is_empty()) {
        bail!("Invalid config override key '{}'", key_path);
    }

    let value = parse_override_value(raw.trim());
    let (last, parents) = keys.split_last().context("Empty config override key")?;

    let mut current = table;
    for key in parents {
        let entry = current
            .entry(key.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        current = match entry {
            toml::Value::Table(t) => t,
            _ => bail!("Config key '{}' in '{}' is not a table", key, key_path),
        };
    }
    debug!("Config override {} = {}", key_path, value);
    current.insert(last.to_string(), value);
    Ok(())
}

fn parse_override_value(raw: &str) -> toml::Value {
    toml::from_str::<toml::Table>(&format!("v = {}", raw))
        .ok()
        .and_then(|mut t| t.remove("v"))
        .unwrap_or_else(|| toml::Value::String(raw.to_string()))
}
