use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, warn};

use super::utils::truncate_text_by_chars;
use crate::error::ToolError;

/// URL fragments that only appear on login pages
const AUTH_PATHS: [&str; 5] = ["/login", "/signin", "/sign-in", "/auth", "/authenticate"];
const AUTH_TITLES: [&str; 3] = ["sign in", "log in", "login"];

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// CSS selector the page should contain before its text is read
    pub wait_for_selector: Option<String>,
}

/// Text of a fetched page, after redirects
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub text: String,
    pub final_url: String,
    pub page_title: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage, ToolError>;
}

/// Static HTTP fetcher converting HTML to Markdown
pub struct HttpPageFetcher {
    client: reqwest::Client,
    selector_timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(selector_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            selector_timeout,
        }
    }

    async fn get(&self, url: &str) -> Result<FetchedPage, ToolError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::FetchNetworkError(format!("Error fetching URL: {}", e)))?;
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| ToolError::FetchNetworkError(format!("Error reading response: {}", e)))?;

        Ok(FetchedPage {
            page_title: html_title(&html).unwrap_or_default(),
            text: html2md::parse_html(&html),
            final_url,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchedPage, ToolError> {
        let Some(selector) = &options.wait_for_selector else {
            return self.get(url).await;
        };

        debug!("Fetching {} with selector '{}'", url, selector);
        past_selector_timeout(self.get(url), self.selector_timeout, selector).await
    }
}

/// Await `page`, warning once when it outlives the selector timeout. A static
/// fetch has no DOM to watch, so a slow page is still read in full.
async fn past_selector_timeout<T>(
    page: impl Future<Output = T>,
    timeout: Duration,
    selector: &str,
) -> T {
    tokio::pin!(page);
    match tokio::time::timeout(timeout, &mut page).await {
        Ok(page) => page,
        Err(_) => {
            warn!(
                "Selector '{}' not confirmed within {}s, reading the page anyway",
                selector,
                timeout.as_secs()
            );
            page.await
        }
    }
}

/// Content of the first `<title>` element
fn html_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;
    Some(html[start..end].trim().to_string())
}

/// Whether a fetch landed on a login wall.
///
/// Only flags pages it is confident about; an unrecognised login page is
/// returned as normal content.
pub fn detects_auth_required(initial_url: &str, final_url: &str, page_title: &str) -> bool {
    let final_lower = final_url.to_lowercase();
    let title_lower = page_title.to_lowercase();

    // Whole URL: hash routes (`/#/login`) and `?next=/login` count too
    if AUTH_PATHS.iter().any(|p| final_lower.contains(p)) {
        return true;
    }

    let initial_host = Url::parse(initial_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    let final_host = Url::parse(final_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    if let (Some(initial), Some(last)) = (initial_host, final_host) {
        if initial != last && (final_lower.contains("login") || final_lower.contains("signin")) {
            return true;
        }
    }

    AUTH_TITLES.iter().any(|t| title_lower.contains(t))
}

/// Structured result of `fetch_url`, always returned to the model as data
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs_auth: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

impl FetchOutcome {
    fn failed(error: ToolError, final_url: Option<String>) -> Self {
        Self {
            success: false,
            content: None,
            needs_auth: matches!(error, ToolError::FetchNeedsAuth { .. }).then_some(true),
            final_url,
            error_code: Some(error.code()),
            error: Some(error.to_string()),
        }
    }
}

/// Fetch a page and classify it as content, login wall or network failure
pub async fn fetch_url(
    fetcher: &dyn PageFetcher,
    url: &str,
    options: FetchOptions,
    max_chars: usize,
) -> FetchOutcome {
    debug!("Fetching URL: {}", url);
    let page = match fetcher.fetch(url, &options).await {
        Ok(page) => page,
        Err(e) => {
            warn!("Fetch of {} failed: {}", url, e);
            let error = match e {
                ToolError::FetchNeedsAuth { .. } | ToolError::FetchNetworkError(_) => e,
                other => ToolError::FetchNetworkError(other.to_string()),
            };
            return FetchOutcome::failed(error, None);
        }
    };

    if detects_auth_required(url, &page.final_url, &page.page_title) {
        warn!("{} redirected to a login page: {}", url, page.final_url);
        let error = ToolError::FetchNeedsAuth {
            final_url: page.final_url.clone(),
        };
        return FetchOutcome::failed(error, Some(page.final_url));
    }

    FetchOutcome {
        success: true,
        content: Some(truncate_text_by_chars(page.text, max_chars).content),
        final_url: Some(page.final_url),
        needs_auth: None,
        error: None,
        error_code: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher {
        page: Result<FetchedPage, String>,
    }

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str, _options: &FetchOptions) -> Result<FetchedPage, ToolError> {
            self.page.clone().map_err(ToolError::FetchNetworkError)
        }
    }

    fn page(final_url: &str, title: &str, text: &str) -> StaticFetcher {
        StaticFetcher {
            page: Ok(FetchedPage {
                text: text.into(),
                final_url: final_url.into(),
                page_title: title.into(),
            }),
        }
    }

    #[test]
    fn test_login_path_always_needs_auth() {
        assert!(detects_auth_required(
            "https://jobs.example.com/offer/42",
            "https://jobs.example.com/login?next=/offer/42",
            "Senior Rust Engineer"
        ));
        assert!(detects_auth_required(
            "https://jobs.example.com/offer/42",
            "https://jobs.example.com/login",
            ""
        ));
    }

    #[test]
    fn test_login_marker_outside_path_needs_auth() {
        assert!(detects_auth_required(
            "https://jobs.example.com/offer/42",
            "https://jobs.example.com/#/login",
            "Careers"
        ));
        assert!(detects_auth_required(
            "https://jobs.example.com/offer/42",
            "https://jobs.example.com/?next=/login",
            "Careers"
        ));
        assert!(!detects_auth_required(
            "https://jobs.example.com/offer/42",
            "https://jobs.example.com/#/offers/42",
            "Careers"
        ));
    }

    #[tokio::test]
    async fn test_fetch_url_hash_route_login() {
        let fetcher = page("https://jobs.example.com/#/login", "Careers", "Welcome back");
        let outcome = fetch_url(
            &fetcher,
            "https://jobs.example.com/offer/42",
            FetchOptions::default(),
            50_000,
        )
        .await;
        assert!(!outcome.success);
        assert_eq!(outcome.needs_auth, Some(true));
        assert_eq!(outcome.error_code, Some("FETCH_NEEDS_AUTH"));
    }

    #[test]
    fn test_cross_domain_login_redirect() {
        assert!(detects_auth_required(
            "https://jobs.example.com/offer/42",
            "https://accounts.example.org/?flow=login",
            "Welcome"
        ));
        assert!(!detects_auth_required(
            "https://jobs.example.com/offer/42",
            "https://careers.example.org/offer/42",
            "Welcome"
        ));
    }

    #[test]
    fn test_login_title() {
        assert!(detects_auth_required(
            "https://a.com/x",
            "https://a.com/x",
            "Sign In | LinkedIn"
        ));
        assert!(detects_auth_required("https://a.com/x", "https://a.com/x", "LOGIN"));
        assert!(!detects_auth_required(
            "https://a.com/x",
            "https://a.com/x",
            "Backend Engineer - Acme"
        ));
    }

    #[tokio::test]
    async fn test_slow_page_is_still_read_after_selector_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            "late page"
        };
        let page = past_selector_timeout(slow, Duration::from_millis(5), ".job-description").await;
        assert_eq!(page, "late page");
    }

    #[test]
    fn test_html_title() {
        let html = "<html><head><TITLE> Rust Developer </TITLE></head></html>";
        assert_eq!(html_title(html).as_deref(), Some("Rust Developer"));
        assert_eq!(html_title("<p>no title</p>"), None);
    }

    #[tokio::test]
    async fn test_fetch_url_success_is_capped() {
        let fetcher = page("https://a.com/job", "Job", &"x".repeat(100));
        let outcome = fetch_url(&fetcher, "https://a.com/job", FetchOptions::default(), 10).await;
        assert!(outcome.success);
        assert!(outcome.content.unwrap().starts_with("xxxxxxxxxx\n\n---\ntruncated"));
        assert_eq!(outcome.final_url.as_deref(), Some("https://a.com/job"));
    }

    #[tokio::test]
    async fn test_fetch_url_needs_auth() {
        let fetcher = page("https://a.com/login", "Careers", "please log in");
        let outcome = fetch_url(&fetcher, "https://a.com/job", FetchOptions::default(), 100).await;
        assert!(!outcome.success);
        assert_eq!(outcome.needs_auth, Some(true));
        assert_eq!(outcome.error_code, Some("FETCH_NEEDS_AUTH"));
        assert_eq!(outcome.content, None);
    }

    #[tokio::test]
    async fn test_fetch_url_network_error() {
        let fetcher = StaticFetcher {
            page: Err("connection refused".into()),
        };
        let outcome = fetch_url(&fetcher, "https://a.com/job", FetchOptions::default(), 100).await;
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["errorCode"], "FETCH_NETWORK_ERROR");
        assert!(value.get("needsAuth").is_none());
    }
}
