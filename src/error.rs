use std::path::PathBuf;
use thiserror::Error;

/// Failure inside a single tool execution.
///
/// These never abort a turn: the executor turns them into an `{ "error": ... }`
/// tool result so the model can see the failure and recover.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Theme rendering failed: {0}")]
    RenderFailed(String),

    #[error("PDF generation failed: {0}")]
    PdfFailed(String),

    #[error("Network error: {0}")]
    FetchNetworkError(String),

    #[error(
        "Authentication required. {final_url} requires login. Please fetch it from a browser or paste the content directly."
    )]
    FetchNeedsAuth { final_url: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),
}

impl ToolError {
    /// Stable machine-readable code, surfaced to the model in fetch outcomes
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::InvalidPath(_) => "INVALID_PATH",
            ToolError::FileNotFound(_) => "FILE_NOT_FOUND",
            ToolError::ReadFailed { .. } => "READ_FAILED",
            ToolError::WriteFailed { .. } => "WRITE_FAILED",
            ToolError::RenderFailed(_) => "RENDER_FAILED",
            ToolError::PdfFailed(_) => "PDF_FAILED",
            ToolError::FetchNetworkError(_) => "FETCH_NETWORK_ERROR",
            ToolError::FetchNeedsAuth { .. } => "FETCH_NEEDS_AUTH",
            ToolError::UnknownTool(_) => "UNKNOWN_TOOL",
            ToolError::InvalidArguments(_) => "INVALID_ARGUMENTS",
        }
    }
}

/// Failure that ends a whole conversation turn.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("No response from AI agent")]
    NoResponseFromAgent,

    #[error("LLM provider error: {0:#}")]
    Provider(#[from] anyhow::Error),

    #[error("Agent exceeded the limit of {0} tool rounds")]
    RoundLimitExceeded(usize),

    #[error("Turn cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_tool_message() {
        let err = ToolError::UnknownTool("create_directory".into());
        assert_eq!(err.to_string(), "Unknown tool: create_directory");
        assert_eq!(err.code(), "UNKNOWN_TOOL");
    }

    #[test]
    fn test_file_not_found_message() {
        let err = ToolError::FileNotFound(PathBuf::from("/data/cv.pdf"));
        assert_eq!(err.to_string(), "File not found: /data/cv.pdf");
    }
}
