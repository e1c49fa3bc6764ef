//! Mermaid rendering through a Kroki server.
//!
//! [`KrokiSource`] acquires a [`KrokiRenderer`] by probing the server's health
//! endpoint. The renderer POSTs each mount point's source to
//! `{server}/mermaid/svg` and writes the returned SVG into the mount point.
//! HTTP calls are blocking (`ureq`) and run on tokio's blocking pool.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mdr_document::{Document, DocumentError, NodeId};
use ureq::Agent;

use crate::acquire::{AcquisitionError, RendererSource};
use crate::consts::DEFAULT_TIMEOUT;
use crate::renderer::{RenderOptions, RendererFailure, RendererHandle};

/// Kroki endpoint for Mermaid diagrams.
const MERMAID_ENDPOINT: &str = "mermaid";

/// Kroki rendering error.
#[derive(Debug, thiserror::Error)]
pub enum KrokiError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("mount point {0} has no diagram source")]
    MissingSource(NodeId),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Create HTTP agent with the specified timeout.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Send a diagram to Kroki and return the SVG body.
///
/// Handles HTTP errors by reading the response body for error details.
fn send_diagram_request(
    agent: &Agent,
    server_url: &str,
    source: &str,
    options: &RenderOptions,
) -> Result<String, KrokiError> {
    let url = format!("{server_url}/{MERMAID_ENDPOINT}/svg");

    let response = agent
        .post(&url)
        .header("Content-Type", "text/plain")
        .header("Kroki-Diagram-Options-theme", &options.theme)
        .header(
            "Kroki-Diagram-Options-security-level",
            options.security_level.as_str(),
        )
        .send(source.as_bytes())
        .map_err(|e| KrokiError::Http(e.to_string()))?;

    let status = response.status().as_u16();
    let mut body = response.into_body();

    if status >= 400 {
        let error_body = body
            .read_to_string()
            .unwrap_or_else(|_| String::from("(unable to read error body)"));
        return Err(KrokiError::Http(format!("HTTP {status}: {error_body}")));
    }

    body.read_to_string()
        .map_err(|e| KrokiError::Io(e.to_string()))
}

/// Check that the server answers its health endpoint.
fn probe(agent: &Agent, server_url: &str) -> Result<(), AcquisitionError> {
    let url = format!("{server_url}/health");
    let response = agent
        .get(&url)
        .call()
        .map_err(|e| AcquisitionError::Unavailable(format!("{url}: {e}")))?;

    let status = response.status().as_u16();
    if status >= 400 {
        return Err(AcquisitionError::Unavailable(format!(
            "{url}: HTTP {status}"
        )));
    }
    Ok(())
}

/// Acquires [`KrokiRenderer`] handles.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mdr_render::KrokiSource;
///
/// let source = KrokiSource::new("https://kroki.io/").timeout(Duration::from_secs(10));
/// assert_eq!(source.server_url(), "https://kroki.io");
/// ```
#[derive(Debug, Clone)]
pub struct KrokiSource {
    server_url: String,
    timeout: Duration,
}

impl KrokiSource {
    /// Create a source for the given Kroki server.
    #[must_use]
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set HTTP timeout for Kroki requests.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server URL without trailing slash.
    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait::async_trait]
impl RendererSource for KrokiSource {
    async fn acquire(&self) -> Result<Arc<dyn RendererHandle>, AcquisitionError> {
        let agent = create_agent(self.timeout);
        let server_url = self.server_url.clone();

        let probe_agent = agent.clone();
        let probe_url = server_url.clone();
        tokio::task::spawn_blocking(move || probe(&probe_agent, &probe_url))
            .await
            .map_err(|e| AcquisitionError::Unavailable(e.to_string()))??;

        tracing::info!(server = %server_url, "Connected to Kroki");
        Ok(Arc::new(KrokiRenderer {
            agent,
            server_url,
            options: Mutex::new(RenderOptions::default()),
        }))
    }
}

/// Renders Mermaid mount points through Kroki.
pub struct KrokiRenderer {
    agent: Agent,
    server_url: String,
    options: Mutex<RenderOptions>,
}

impl fmt::Debug for KrokiRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KrokiRenderer")
            .field("server_url", &self.server_url)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl RendererHandle for KrokiRenderer {
    fn initialize(&self, options: &RenderOptions) -> Result<(), RendererFailure> {
        *self.options.lock().unwrap() = options.clone();
        Ok(())
    }

    async fn run(&self, document: Arc<dyn Document>, nodes: Vec<NodeId>) -> Result<(), RendererFailure> {
        let options = self.options.lock().unwrap().clone();

        for node in nodes {
            let source = document
                .text_content(node)
                .filter(|s| !s.trim().is_empty())
                .ok_or(KrokiError::MissingSource(node))?;

            let agent = self.agent.clone();
            let server_url = self.server_url.clone();
            let request_options = options.clone();
            let svg = tokio::task::spawn_blocking(move || {
                send_diagram_request(&agent, &server_url, &source, &request_options)
            })
            .await??;

            document
                .set_inner_markup(node, &svg)
                .map_err(KrokiError::from)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::SecurityLevel;
    use mdr_document::{ElementSpec, MemoryDocument};

    // Nothing listens on port 1, so connections are refused immediately.
    const UNREACHABLE: &str = "http://127.0.0.1:1";

    #[test]
    fn test_source_trims_trailing_slash() {
        let source = KrokiSource::new("http://localhost:8000///");
        assert_eq!(source.server_url(), "http://localhost:8000");
        assert_eq!(source.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_source_timeout() {
        let source = KrokiSource::new("https://kroki.io").timeout(Duration::from_millis(100));
        assert_eq!(source.timeout, Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_acquire_unreachable_server() {
        let source = KrokiSource::new(UNREACHABLE).timeout(Duration::from_secs(2));
        let err = source.acquire().await.err().unwrap();
        assert!(matches!(err, AcquisitionError::Unavailable(ref m) if m.contains("/health")));
    }

    fn renderer(server_url: &str) -> KrokiRenderer {
        KrokiRenderer {
            agent: create_agent(Duration::from_secs(2)),
            server_url: server_url.to_owned(),
            options: Mutex::new(RenderOptions::default()),
        }
    }

    #[test]
    fn test_initialize_stores_options() {
        let renderer = renderer(UNREACHABLE);
        let options = RenderOptions {
            theme: "dark".to_owned(),
            security_level: SecurityLevel::Sandbox,
            ..RenderOptions::default()
        };
        renderer.initialize(&options).unwrap();
        assert_eq!(*renderer.options.lock().unwrap(), options);
    }

    #[tokio::test]
    async fn test_run_rejects_empty_mount() {
        let doc = Arc::new(MemoryDocument::new());
        let mount = doc
            .append_element(doc.body(), ElementSpec::new("div").with_text("  "))
            .unwrap();

        let err = renderer(UNREACHABLE)
            .run(doc, vec![mount])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("mount point {mount} has no diagram source"));
    }

    #[tokio::test]
    async fn test_run_reports_http_failure() {
        let doc = Arc::new(MemoryDocument::new());
        let mount = doc
            .append_element(doc.body(), ElementSpec::new("div").with_text("graph TD\nA-->B"))
            .unwrap();

        let err = renderer(UNREACHABLE)
            .run(Arc::clone(&doc) as Arc<dyn Document>, vec![mount])
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("HTTP error"));
        assert_eq!(doc.inner_markup(mount), None);
    }
}
