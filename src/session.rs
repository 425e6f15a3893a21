use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::agent::tool::fs::Sandbox;
use crate::agent::types::{Message, Role};
use crate::error::{ToolError, TurnError};
use crate::types::{CandidatureConfig, ResumeDocument};

pub const RESUME_FILE: &str = "resume.json";
pub const CONFIG_FILE: &str = "candidature_config.json";
pub const HISTORY_FILE: &str = "chat_history.json";

/// Documents and conversation persisted in the data root between turns
pub struct Session<'a> {
    sandbox: &'a Sandbox,
}

impl<'a> Session<'a> {
    pub fn new(sandbox: &'a Sandbox) -> Self {
        Self { sandbox }
    }

    pub async fn load_resume(&self) -> Option<ResumeDocument> {
        self.load(RESUME_FILE).await
    }

    pub async fn load_config(&self) -> Option<CandidatureConfig> {
        self.load(CONFIG_FILE).await
    }

    pub async fn load_history(&self) -> Vec<Message> {
        self.load(HISTORY_FILE).await.unwrap_or_default()
    }

    pub async fn save_resume(&self, resume: &ResumeDocument) -> Result<(), ToolError> {
        self.save(RESUME_FILE, resume).await
    }

    pub async fn save_config(&self, config: &CandidatureConfig) -> Result<(), ToolError> {
        self.save(CONFIG_FILE, config).await
    }

    /// Only user and assistant messages are kept: tool traffic belongs to a
    /// single turn.
    pub async fn save_history(&self, history: &[Message]) -> Result<(), ToolError> {
        let visible: Vec<&Message> = history
            .iter()
            .filter(|m| matches!(m.role, Role::User | Role::Assistant) && m.tool_calls.is_none())
            .collect();
        self.save(HISTORY_FILE, &visible).await
    }

    /// Missing files are absent documents; unreadable ones are too, with a warning.
    async fn load<T: DeserializeOwned>(&self, file: &str) -> Option<T> {
        let content = match self.sandbox.read(file).await {
            Ok(content) => content,
            Err(ToolError::FileNotFound(_)) => {
                debug!("No {} in data directory", file);
                return None;
            }
            Err(e) => {
                warn!("Ignoring {}: {}", file, e);
                return None;
            }
        };
        serde_json::from_str(&content)
            .inspect_err(|e| warn!("Ignoring unparseable {}: {}", file, e))
            .ok()
    }

    async fn save<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), ToolError> {
        let json = serde_json::to_string_pretty(value)?;
        let path = self.sandbox.write(file, json).await?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}

/// User message as typed, with the attachment path appended
pub fn user_message(text: &str, attachment: Option<&str>) -> Message {
    match attachment {
        Some(path) => Message::user(format!("{}\n\n[Attachment: {}]", text, path)),
        None => Message::user(text),
    }
}

/// Assistant message standing in for the reply of a failed turn
pub fn error_message(error: &TurnError) -> Message {
    Message::assistant(format!("Error: {}.", error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::types::ToolCall;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_and_broken_documents_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        let sandbox = Sandbox::open(dir.path()).unwrap();
        let session = Session::new(&sandbox);

        assert_eq!(session.load_resume().await, None);
        assert_eq!(session.load_config().await, None);
        assert!(session.load_history().await.is_empty());
    }

    #[tokio::test]
    async fn test_documents_round_trip_as_pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::open(dir.path()).unwrap();
        let session = Session::new(&sandbox);
        let resume: ResumeDocument =
            serde_json::from_value(json!({"basics": {"name": "Alice"}, "work": []})).unwrap();

        session.save_resume(&resume).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(RESUME_FILE)).unwrap();
        assert!(raw.contains("\n  \"basics\""));
        assert_eq!(session.load_resume().await, Some(resume));
    }

    #[tokio::test]
    async fn test_history_keeps_visible_messages_only() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::open(dir.path()).unwrap();
        let session = Session::new(&sandbox);
        let mut calling = Message::assistant("Reading.");
        calling.tool_calls = Some(vec![ToolCall::function("c1", "read_file", json!({}))]);

        session
            .save_history(&[
                Message::system("prompt"),
                Message::user("hi"),
                calling,
                Message::tool("c1", "{}"),
                Message::assistant("hello"),
            ])
            .await
            .unwrap();

        assert_eq!(
            session.load_history().await,
            vec![Message::user("hi"), Message::assistant("hello")]
        );
    }

    #[test]
    fn test_user_and_error_messages() {
        assert_eq!(
            user_message("Look at this offer", Some("offers/acme.pdf")).content.as_deref(),
            Some("Look at this offer\n\n[Attachment: offers/acme.pdf]")
        );
        assert_eq!(user_message("hi", None), Message::user("hi"));
        assert_eq!(
            error_message(&TurnError::NoResponseFromAgent).content.as_deref(),
            Some("Error: No response from AI agent.")
        );
    }
}
