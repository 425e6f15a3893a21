use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use crate::error::ToolError;
use crate::types::ResumeDocument;

pub const DEFAULT_THEME: &str = "modern-sidebar";

/// Turns a résumé into a standalone HTML page
#[async_trait]
pub trait ResumeRenderer: Send + Sync {
    async fn render(&self, resume: &ResumeDocument, theme: &str) -> Result<String, ToolError>;
}

/// Built-in renderer for the `modern-sidebar` theme
#[derive(Debug, Default)]
pub struct HtmlResumeRenderer;

const MODERN_SIDEBAR_CSS: &str = "\
body{margin:0;font-family:Helvetica,Arial,sans-serif;color:#222;display:flex;min-height:100vh}\
aside{width:32%;background:#2b3a4a;color:#fff;padding:28px 20px}\
aside img{width:120px;height:120px;border-radius:50%;object-fit:cover}\
main{flex:1;padding:28px 32px}\
h1{margin:8px 0 0;font-size:24px}h2{border-bottom:2px solid #2b3a4a;font-size:16px;text-transform:uppercase}\
.label{opacity:.8}.period{color:#777;font-size:12px}\
@page{size:A4;margin:0}";

#[async_trait]
impl ResumeRenderer for HtmlResumeRenderer {
    async fn render(&self, resume: &ResumeDocument, theme: &str) -> Result<String, ToolError> {
        if theme != DEFAULT_THEME {
            return Err(ToolError::RenderFailed(format!("Unknown theme: {}", theme)));
        }
        debug!("Rendering resume with theme {}", theme);
        Ok(render_modern_sidebar(resume))
    }
}

fn render_modern_sidebar(resume: &ResumeDocument) -> String {
    let basics = resume.basics.clone().unwrap_or_default();
    let mut sidebar = String::new();
    if let Some(image) = &basics.image {
        // Data URLs must not be HTML-escaped
        sidebar.push_str(&format!("<img src=\"{}\" alt=\"\">", image.replace('"', "%22")));
    }
    sidebar.push_str(&format!("<h1>{}</h1>", escape(basics.name.as_deref().unwrap_or_default())));
    if let Some(label) = &basics.label {
        sidebar.push_str(&format!("<p class=\"label\">{}</p>", escape(label)));
    }
    for contact in [&basics.email, &basics.phone, &basics.url].into_iter().flatten() {
        sidebar.push_str(&format!("<p>{}</p>", escape(contact)));
    }
    for (title, key) in [("Skills", "skills"), ("Languages", "languages")] {
        if let Some(items) = resume.sections.get(key).and_then(Value::as_array) {
            sidebar.push_str(&format!("<h2>{}</h2><ul>", title));
            for item in items {
                let name = str_field(item, "name").or_else(|| str_field(item, "language"));
                if let Some(name) = name {
                    sidebar.push_str(&format!("<li>{}</li>", escape(name)));
                }
            }
            sidebar.push_str("</ul>");
        }
    }

    let mut body = String::new();
    if let Some(summary) = &basics.summary {
        body.push_str(&format!("<h2>Profile</h2>{}", paragraphs(summary)));
    }
    for (title, key, heading, place) in [
        ("Experience", "work", "position", "name"),
        ("Projects", "projects", "name", "description"),
        ("Education", "education", "studyType", "institution"),
    ] {
        let Some(items) = resume.sections.get(key).and_then(Value::as_array) else {
            continue;
        };
        body.push_str(&format!("<h2>{}</h2>", title));
        for item in items {
            body.push_str("<section>");
            body.push_str(&format!(
                "<h3>{} <small>{}</small></h3>",
                escape(str_field(item, heading).unwrap_or_default()),
                escape(str_field(item, place).unwrap_or_default())
            ));
            let period = [str_field(item, "startDate"), str_field(item, "endDate")]
                .into_iter()
                .flatten()
                .map(month_year)
                .collect::<Vec<_>>()
                .join(" - ");
            if !period.is_empty() {
                body.push_str(&format!("<p class=\"period\">{}</p>", escape(&period)));
            }
            if let Some(summary) = str_field(item, "summary") {
                body.push_str(&paragraphs(summary));
            }
            if let Some(highlights) = item.get("highlights").and_then(Value::as_array) {
                body.push_str("<ul>");
                for h in highlights.iter().filter_map(Value::as_str) {
                    body.push_str(&format!("<li>{}</li>", escape(h)));
                }
                body.push_str("</ul>");
            }
            body.push_str("</section>");
        }
    }

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head>\
         <body><aside>{}</aside><main>{}</main></body></html>",
        escape(basics.name.as_deref().unwrap_or("Resume")),
        MODERN_SIDEBAR_CSS,
        sidebar,
        body
    )
}

fn str_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// One `<p>` per non-empty line
fn paragraphs(text: &str) -> String {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| format!("<p>{}</p>", escape(l)))
        .collect()
}

/// "2021-03" or "2021-03-15" as "March 2021"; anything else is shown as-is
fn month_year(date: &str) -> String {
    let full = if date.len() == 7 {
        format!("{}-01", date)
    } else {
        date.to_string()
    };
    NaiveDate::parse_from_str(&full, "%Y-%m-%d")
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
