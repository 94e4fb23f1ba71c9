//! HTTP fetcher
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the shared client with the configured user agent
//! - GET requests, following redirects
//! - Deciding whether a response is an HTML page worth reading
//! - Classifying transport errors

use crate::config::UserAgentConfig;
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Redirect hops followed before giving up
const MAX_REDIRECTS: usize = 10;

/// Transport-level failure; no usable response was received
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(e.to_string())
        }
    }
}

/// A response that arrived, whatever its status
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status: u16,

    /// Content-Type header value (empty if absent)
    pub content_type: String,

    /// Body, read only for 200 responses with an HTML content type
    pub body: Option<String>,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout_secs` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::UserAgentConfig;
/// use sumi_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), 30).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout_secs: u64,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_secs(timeout_secs.max(1));

    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Returns true if `content_type` names an HTML document
///
/// Parameters such as `charset` are ignored and the comparison is
/// case-insensitive.
pub fn is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}

/// Fetches `url` with a single GET
///
/// Any response is `Ok`; the body is only read when the status is 200 and
/// the content type is HTML. `Err` means no response arrived or the body
/// could not be read.
pub async fn fetch_url(client: &Client, url: &str) -> Result<FetchedPage, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = if status == StatusCode::OK && is_html(&content_type) {
        Some(response.text().await?)
    } else {
        None
    };

    Ok(FetchedPage {
        status: status.as_u16(),
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_http_client(&UserAgentConfig::default(), 5).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&UserAgentConfig::default(), 30).is_ok());
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("Text/HTML;charset=ISO-8859-1"));
        assert!(!is_html("application/json"));
        assert!(!is_html("text/htmlx"));
        assert!(!is_html(""));
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><title>Hi</title></html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let page = fetch_url(&client(), &format!("{}/", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert!(page.body.is_some());
        assert!(page.body.unwrap().contains("Hi"));
    }

    #[tokio::test]
    async fn test_non_html_body_not_read() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
            .mount(&server)
            .await;

        let page = fetch_url(&client(), &format!("{}/data.json", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.content_type, "application/json");
        assert!(page.body.is_none());
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_raw("gone", "text/html"))
            .mount(&server)
            .await;

        let page = fetch_url(&client(), &format!("{}/missing", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.status, 404);
        assert!(page.body.is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_error() {
        let result = fetch_url(&client(), "http://127.0.0.1:1/").await;
        assert!(result.is_err());
    }
}
