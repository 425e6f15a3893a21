use tracing::warn;

use crate::types::{CandidatureConfig, ResumeDocument};

const NO_CONFIG: &str = "No config found. Perform initialization.";
const NO_RESUME: &str = "No source resume JSON provided.";

const AGENT_INSTRUCTIONS: &str = "\
You are an expert recruitment assistant helping a job seeker manage their resume, \
track applications and tailor resumes to job offers.

Rules:
- Be concise and professional.
- CRITICAL: before every tool call, write one short, friendly sentence in your reply \
explaining what you are about to do and why.
- Use \"save_source_resume\" ONLY to update the main source resume.
- Use \"save_candidature_config\" to update the candidate profile, goals, target companies \
and application tracking.
- Use \"write_file\" for every other file (tailored resumes, notes, markdown). It creates \
missing parent directories itself; there is no directory creation tool.
- Use only the provided tools for filesystem actions. All files belong in the user data directory.

Workflow for a job offer:
1. Get the job description: call \"fetch_url\" when given a URL, otherwise use the text provided.
2. Analyze the offer before doing anything else.
3. Build the tailored resume JSON from the SOURCE RESUME.
4. Save intermediate notes or JSON with \"write_file\".
5. Render the resume with \"render_resume\" (use outputPath to save the HTML), then call \
\"generate_pdf\" on the saved HTML.

Grounding:
- The SOURCE RESUME is the only basis for any tailored resume. Never invent experiences, \
diplomas or skills. You may reorder, highlight or translate existing information only.
- If the offer asks for a skill missing from the SOURCE RESUME, do not add it.
- You must have the job description (pasted text or a tool result) before writing a tailored resume.";

/// Build the system prompt for a turn.
///
/// The résumé is sanitized first: personal information never reaches the
/// provider, tools restore it from the source when rendering.
pub fn system_prompt(resume: Option<&ResumeDocument>, config: Option<&CandidatureConfig>) -> String {
    let config_json = config
        .and_then(pretty)
        .unwrap_or_else(|| NO_CONFIG.to_string());
    let resume_json = resume
        .and_then(|r| pretty(&r.sanitized()))
        .unwrap_or_else(|| NO_RESUME.to_string());

    format!(
        "{AGENT_INSTRUCTIONS}

Current candidature config:
{config_json}

SOURCE RESUME (resume.json):
{resume_json}

NOTE: Personal information (name, email, phone, photo, address, social profiles) has been \
removed from the resume above. Only the professional summary and job title are shown. \
It is restored automatically when you render or save a resume, so do not worry about it being missing."
    )
}

fn pretty<T: serde::Serialize>(value: &T) -> Option<String> {
    serde_json::to_string_pretty(value)
        .inspect_err(|e| warn!("Failed to serialize prompt context: {}", e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prompt_contains_sanitized_resume_only() {
        let resume: ResumeDocument = serde_json::from_value(json!({
            "basics": {
                "name": "Alice Martin",
                "email": "alice@example.com",
                "phone": "+33 6 00 00 00 00",
                "label": "Data Engineer",
                "summary": "Pipelines at scale"
            },
            "work": [{"name": "Acme"}]
        }))
        .unwrap();
        let prompt = system_prompt(Some(&resume), None);

        assert!(!prompt.contains("Alice Martin"));
        assert!(!prompt.contains("alice@example.com"));
        assert!(!prompt.contains("+33 6"));
        assert!(prompt.contains("Data Engineer"));
        assert!(prompt.contains("Pipelines at scale"));
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains(NO_CONFIG));
    }

    #[test]
    fn test_prompt_embeds_config() {
        let mut config = CandidatureConfig::default();
        config.goals.salary_target = "70k".into();
        let prompt = system_prompt(None, Some(&config));
        assert!(prompt.contains("\"salary_target\": \"70k\""));
        assert!(prompt.contains(NO_RESUME));
    }
}
