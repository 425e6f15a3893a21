use super::tool::{DocumentMutation, ToolContext};
use crate::types::{CandidatureConfig, ResumeDocument};

/// In-flight résumé and candidature config for one turn.
///
/// Starts from the caller's snapshots; each mutation replaces the whole
/// document, and tools always see the latest version.
#[derive(Debug, Default)]
pub struct DocumentState {
    resume: Option<ResumeDocument>,
    config: Option<CandidatureConfig>,
    updated_resume: Option<ResumeDocument>,
    updated_config: Option<CandidatureConfig>,
}

impl DocumentState {
    pub fn new(resume: Option<ResumeDocument>, config: Option<CandidatureConfig>) -> Self {
        Self {
            resume,
            config,
            updated_resume: None,
            updated_config: None,
        }
    }

    pub fn resume(&self) -> Option<&ResumeDocument> {
        self.updated_resume.as_ref().or(self.resume.as_ref())
    }

    pub fn config(&self) -> Option<&CandidatureConfig> {
        self.updated_config.as_ref().or(self.config.as_ref())
    }

    pub fn context(&self) -> ToolContext<'_> {
        ToolContext {
            resume: self.resume(),
        }
    }

    pub fn apply(&mut self, mutation: DocumentMutation) {
        if let Some(resume) = mutation.resume {
            self.updated_resume = Some(resume);
        }
        if let Some(config) = mutation.config {
            self.updated_config = Some(config);
        }
    }

    /// Documents mutated during the turn; `None` for untouched ones
    pub fn into_updates(self) -> (Option<ResumeDocument>, Option<CandidatureConfig>) {
        (self.updated_resume, self.updated_config)
    }
}
