//! Transports that turn editor content into rendered HTML

use async_trait::async_trait;
use lectern_core::{media, CsrfToken, LecternError, Result};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

/// One preview round trip worth of input
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub content: String,
    pub csrf: Option<CsrfToken>,
}

/// Wire body of a preview request
#[derive(Debug, Serialize, Deserialize)]
pub struct PreviewBody<'a> {
    pub content: &'a str,
}

/// Rendering service answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub success: bool,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PreviewResponse {
    /// Successful response carrying `html`
    pub fn rendered(html: impl Into<String>) -> Self {
        Self {
            success: true,
            html: Some(html.into()),
            error: None,
        }
    }

    /// Failed response carrying `error`
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            html: None,
            error: Some(error.into()),
        }
    }

    /// Turn the payload into the HTML to display or the failure to report
    pub fn into_html(self) -> Result<String> {
        match (self.success, self.html, self.error) {
            (true, Some(html), _) => Ok(html),
            (true, None, _) => Err(LecternError::malformed(
                "successful response without html",
            )),
            (false, _, Some(error)) if !error.trim().is_empty() => Err(LecternError::Server(error)),
            (false, _, _) => Err(LecternError::server("preview failed without an error message")),
        }
    }
}

/// Something that can render preview content.
///
/// Dropping the returned future must abort the underlying call; the pipeline
/// relies on that to cancel superseded requests.
#[async_trait]
pub trait RenderTransport: Send + Sync {
    async fn render(&self, request: &PreviewRequest) -> Result<PreviewResponse>;
}

/// Posts `{ "content": ... }` to the rendering endpoint
#[derive(Debug, Clone)]
pub struct HttpRenderTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpRenderTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RenderTransport for HttpRenderTransport {
    async fn render(&self, request: &PreviewRequest) -> Result<PreviewResponse> {
        let mut builder = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json")
            .json(&PreviewBody {
                content: &request.content,
            });

        if let Some(token) = &request.csrf {
            builder = builder.header(token.header.as_str(), token.value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LecternError::transport(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !media::is_json(&content_type) {
            if !status.is_success() {
                return Err(LecternError::transport(http_status_message(status)));
            }
            return Err(LecternError::malformed(format!(
                "expected a JSON response, got '{}'",
                content_type
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LecternError::transport(e.to_string()))?;
        let parsed: PreviewResponse =
            serde_json::from_slice(&body).map_err(|e| LecternError::malformed(e.to_string()))?;

        // A JSON error body keeps its own message; anything else reports the status.
        if !status.is_success() && parsed.success {
            return Err(LecternError::transport(http_status_message(status)));
        }

        tracing::debug!(status = status.as_u16(), success = parsed.success, "preview response");
        Ok(parsed)
    }
}

pub(crate) fn http_status_message(status: reqwest::StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown status")
    )
}

/// Renders Markdown in-process, for working without a backend.
/// Math delimiters are left untouched for the typesetter.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalRenderTransport;

impl LocalRenderTransport {
    pub fn new() -> Self {
        Self
    }

    fn options() -> markdown::Options {
        let mut options = markdown::Options::gfm();
        options.compile.allow_dangerous_html = true;
        options
    }
}

#[async_trait]
impl RenderTransport for LocalRenderTransport {
    async fn render(&self, request: &PreviewRequest) -> Result<PreviewResponse> {
        // Options hold non-Send extension hooks, so they never cross an await.
        let rendered = markdown::to_html_with_options(&request.content, &Self::options())
            .map_err(|message| message.to_string());
        match rendered {
            Ok(html) => Ok(PreviewResponse::rendered(html)),
            Err(message) => Ok(PreviewResponse::failed(message)),
        }
    }
}
