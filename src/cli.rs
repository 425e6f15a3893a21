use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

// Display order for API key option (placed at top of help text)
const API_KEY_DISPLAY_ORDER: usize = 0;
// Display order for log level option (placed at end of help text)
const LOG_LEVEL_DISPLAY_ORDER: usize = 100;

/// CLI arguments
#[derive(Parser)]
#[command(name = "worklooking", version, about = "AI assistant for resumes and job applications", long_about = None)]
pub struct Cli {
    /// Log level (see https://docs.rs/tracing-subscriber/latest/tracing_subscriber/filter/struct.EnvFilter.html)
    /// [env: WORKLOOKING_LOG=] [default: info]
    #[arg(
        long,
        env = "WORKLOOKING_LOG",
        default_value = "info",
        global = true,
        hide_default_value = true,
        hide_env = true,
        display_order = LOG_LEVEL_DISPLAY_ORDER,
        verbatim_doc_comment
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a default worklooking.toml config file and the data directory
    Init(InitArgs),
    /// Send one message to the assistant
    Chat(ChatArgs),
    /// Print the tool catalog sent to the model as JSON
    Tools,
}

/// Arguments for the init command
#[derive(Parser)]
pub struct InitArgs {
    /// Path to config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override existing config file
    #[arg(long)]
    pub r#override: bool,
}

/// Arguments for the chat command
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Message for the assistant
    pub message: String,

    /// Path to config file (initialize with `worklooking init`)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override config values using dot notation (e.g. llm.model=gpt-4o)
    #[arg(long = "config-override")]
    pub config_overrides: Vec<String>,

    /// LLM API key
    #[arg(long, env = "WORKLOOKING_API_KEY", display_order = API_KEY_DISPLAY_ORDER)]
    pub api_key: String,

    /// Data directory holding resume.json, candidature_config.json and
    /// generated files [default: data.root from the config file]
    #[arg(long, verbatim_doc_comment)]
    pub data_dir: Option<String>,

    /// File to mention as an attachment of the message
    #[arg(long)]
    pub attachment: Option<String>,

    /// Trace file path to record the full turn transcript (.md or .json)
    #[arg(long)]
    pub trace: Option<String>,

    /// Forget the stored conversation before sending the message
    #[arg(long)]
    pub reset: bool,
}
