use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source résumé in JSON Resume layout.
///
/// Only `basics` is typed; every other section (work, education, skills, ...)
/// is kept verbatim so documents round-trip without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResumeDocument {
    /// Personal information (name, contact, photo). Never taken from the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basics: Option<Basics>,
    /// Remaining JSON Resume sections: work, education, skills, languages, projects, ...
    #[serde(flatten)]
    pub sections: Map<String, Value>,
}

/// The personal-identifying part of a résumé
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Basics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Job title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Photo, usually a data URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Professional summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResumeDocument {
    /// Copy of the résumé safe to send to the LLM provider: `basics` keeps
    /// only `summary` and `label`.
    pub fn sanitized(&self) -> Self {
        let basics = self.basics.as_ref();
        Self {
            basics: Some(Basics {
                summary: basics.and_then(|b| b.summary.clone()),
                label: basics.and_then(|b| b.label.clone()),
                ..Basics::default()
            }),
            sections: self.sections.clone(),
        }
    }

    /// Replace `basics` with the one from `source`, if `source` has any.
    pub fn preserve_basics_from(&mut self, source: Option<&ResumeDocument>) {
        if let Some(basics) = source.and_then(|s| s.basics.clone()) {
            self.basics = Some(basics);
        }
    }
}

/// Candidate profile, search goals, target companies and application tracking
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CandidatureConfig {
    pub candidate: Candidate,
    pub goals: Goals,
    pub target_companies: Vec<TargetCompany>,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Candidate {
    pub name: String,
    pub position: String,
    pub location: String,
    /// Years or level of experience, free text
    pub experience: String,
    pub languages: Vec<String>,
    pub skills: Vec<SkillGroup>,
    pub strengths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SkillGroup {
    pub category: String,
    /// Comma separated technologies
    pub technologies: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Goals {
    pub salary_target: String,
    pub contract_type: String,
    pub remote_policy: String,
    pub criteria: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TargetCompany {
    pub name: String,
    pub sector: String,
    pub reason: String,
    pub stack: String,
}

/// One tracked job application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Application {
    pub company: String,
    pub position: String,
    pub date: String,
    pub status: String,
    pub follow_up: String,
    /// Path of the application notes, relative to the data directory
    pub notes_path: String,
}
