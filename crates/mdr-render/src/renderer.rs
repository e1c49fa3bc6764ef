//! Rendering library boundary.
//!
//! The diagram rendering library is an external collaborator reached through
//! [`RendererHandle`]. [`RendererAdapter`] wraps a handle so that any failure,
//! including a panic inside the render task, becomes a [`RenderError`] for the
//! one block being rendered.

use std::fmt;
use std::sync::Arc;

use mdr_document::{Document, DocumentError, ElementSpec, NodeId};
use uuid::Uuid;

use crate::consts::{DEFAULT_FONT_FAMILY, DEFAULT_THEME, MOUNT_CLASS, MOUNT_ID_PREFIX};
use crate::scanner::Block;

/// Error type produced by rendering library implementations.
pub type RendererFailure = Box<dyn std::error::Error + Send + Sync>;

/// Trust level the rendering library applies to diagram sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecurityLevel {
    Strict,
    #[default]
    Loose,
    Antiscript,
    Sandbox,
}

impl SecurityLevel {
    /// All levels.
    pub const ALL: [Self; 4] = [Self::Strict, Self::Loose, Self::Antiscript, Self::Sandbox];

    /// Parse a security level name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "strict" => Some(Self::Strict),
            "loose" => Some(Self::Loose),
            "antiscript" => Some(Self::Antiscript),
            "sandbox" => Some(Self::Sandbox),
            _ => None,
        }
    }

    /// Name understood by the rendering library.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Loose => "loose",
            Self::Antiscript => "antiscript",
            Self::Sandbox => "sandbox",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options passed to the rendering library once after acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether the library renders on its own when loaded. The pipeline
    /// drives rendering, so this is normally off.
    pub start_on_load: bool,
    /// Theme identifier.
    pub theme: String,
    pub security_level: SecurityLevel,
    pub font_family: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            start_on_load: false,
            theme: DEFAULT_THEME.to_owned(),
            security_level: SecurityLevel::Loose,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
        }
    }
}

/// Handle to an initialized rendering library.
#[async_trait::async_trait]
pub trait RendererHandle: Send + Sync {
    /// Apply global options. Called once, right after acquisition.
    fn initialize(&self, options: &RenderOptions) -> Result<(), RendererFailure>;

    /// Render the diagram source held by each mount node, replacing it with
    /// the rendered markup.
    async fn run(&self, document: Arc<dyn Document>, nodes: Vec<NodeId>) -> Result<(), RendererFailure>;
}

/// Single block rendering failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The rendering library rejected the diagram.
    #[error("{message}")]
    Failed { message: String },
    /// The render task panicked or was cancelled.
    #[error("renderer crashed: {message}")]
    Panicked { message: String },
    /// The document refused a mutation needed to render.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Renders one block at a time through a [`RendererHandle`].
#[derive(Clone)]
pub struct RendererAdapter {
    handle: Arc<dyn RendererHandle>,
}

impl fmt::Debug for RendererAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererAdapter").finish_non_exhaustive()
    }
}

impl RendererAdapter {
    /// Wrap a rendering library handle.
    #[must_use]
    pub fn new(handle: Arc<dyn RendererHandle>) -> Self {
        Self { handle }
    }

    /// Render `block` into a fresh mount point appended to `wrapper`.
    ///
    /// Returns the mount point on success. The render runs on its own task so
    /// a panicking library only fails this block.
    pub async fn render(
        &self,
        document: &Arc<dyn Document>,
        block: &Block,
        wrapper: NodeId,
    ) -> Result<NodeId, RenderError> {
        let mount_id = format!("{MOUNT_ID_PREFIX}{}", Uuid::new_v4().simple());
        let mount = document.create_element(
            ElementSpec::new("div")
                .with_id(&mount_id)
                .with_class(MOUNT_CLASS)
                .with_text(&block.source),
        );
        document.append_child(wrapper, mount)?;

        let handle = Arc::clone(&self.handle);
        let task_document = Arc::clone(document);
        let task = tokio::spawn(async move { handle.run(task_document, vec![mount]).await });

        match task.await {
            Ok(Ok(())) => {
                tracing::debug!(mount = %mount_id, kind = %block.kind, "Rendered diagram");
                Ok(mount)
            }
            Ok(Err(e)) => Err(RenderError::Failed {
                message: e.to_string(),
            }),
            Err(e) => Err(RenderError::Panicked {
                message: join_error_message(e),
            }),
        }
    }
}

fn join_error_message(error: tokio::task::JoinError) -> String {
    if error.is_cancelled() {
        return "render task cancelled".to_owned();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DiagramKind;
    use crate::mock::MockRenderer;
    use mdr_document::MemoryDocument;
    use pretty_assertions::assert_eq;

    fn setup(source: &str) -> (Arc<MemoryDocument>, Block, NodeId) {
        let doc = Arc::new(MemoryDocument::new());
        let container = doc
            .append_element(doc.body(), ElementSpec::new("pre"))
            .unwrap();
        let code = doc
            .append_element(container, ElementSpec::new("code").with_text(source))
            .unwrap();
        let wrapper = doc
            .append_element(doc.body(), ElementSpec::new("div"))
            .unwrap();
        let block = Block {
            container,
            code,
            source: source.to_owned(),
            kind: DiagramKind::Graph,
        };
        (doc, block, wrapper)
    }

    #[test]
    fn test_security_level_parse() {
        assert_eq!(SecurityLevel::parse("loose"), Some(SecurityLevel::Loose));
        assert_eq!(SecurityLevel::parse("sandbox"), Some(SecurityLevel::Sandbox));
        assert_eq!(SecurityLevel::parse("Loose"), None);
        for level in SecurityLevel::ALL {
            assert_eq!(SecurityLevel::parse(level.as_str()), Some(level));
        }
        assert_eq!(SecurityLevel::Antiscript.to_string(), "antiscript");
    }

    #[test]
    fn test_default_render_options() {
        let options = RenderOptions::default();
        assert!(!options.start_on_load);
        assert_eq!(options.theme, "default");
        assert_eq!(options.security_level, SecurityLevel::Loose);
        assert!(options.font_family.starts_with("ui-sans-serif"));
    }

    #[tokio::test]
    async fn test_render_success_fills_mount() {
        let (doc, block, wrapper) = setup("graph TD\nA-->B");
        let renderer = Arc::new(MockRenderer::new());
        let adapter = RendererAdapter::new(Arc::clone(&renderer) as Arc<dyn RendererHandle>);
        let document = Arc::clone(&doc) as Arc<dyn Document>;

        let mount = adapter.render(&document, &block, wrapper).await.unwrap();

        let info = doc.element(mount).unwrap();
        assert!(info.has_class(MOUNT_CLASS));
        let id = info.id().unwrap();
        assert!(id.starts_with("mermaid-"));
        assert_eq!(id.len(), "mermaid-".len() + 32);
        assert_eq!(doc.parent(mount), Some(wrapper));
        assert!(doc.inner_markup(mount).unwrap().starts_with("<svg"));
        assert_eq!(renderer.rendered_sources(), vec!["graph TD\nA-->B".to_owned()]);
    }

    #[tokio::test]
    async fn test_mount_ids_are_unique() {
        let (doc, block, wrapper) = setup("graph TD\nA-->B");
        let adapter = RendererAdapter::new(Arc::new(MockRenderer::new()));
        let document = Arc::clone(&doc) as Arc<dyn Document>;

        let first = adapter.render(&document, &block, wrapper).await.unwrap();
        let second = adapter.render(&document, &block, wrapper).await.unwrap();
        assert_ne!(
            doc.element(first).unwrap().id().map(str::to_owned),
            doc.element(second).unwrap().id().map(str::to_owned)
        );
    }

    #[tokio::test]
    async fn test_render_failure_carries_message() {
        let (doc, block, wrapper) = setup("graph TD\nA-->!!");
        let adapter = RendererAdapter::new(Arc::new(MockRenderer::new().failing_on("!!")));
        let document: Arc<dyn Document> = doc;

        let err = adapter.render(&document, &block, wrapper).await.unwrap_err();
        assert_eq!(
            err,
            RenderError::Failed {
                message: "Parse error on line 2: graph TD\nA-->!!".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn test_render_panic_is_contained() {
        let (doc, block, wrapper) = setup("graph TD\nboom");
        let adapter = RendererAdapter::new(Arc::new(MockRenderer::new().panicking_on("boom")));
        let document: Arc<dyn Document> = doc;

        let err = adapter.render(&document, &block, wrapper).await.unwrap_err();
        assert_eq!(
            err,
            RenderError::Panicked {
                message: "renderer exploded on boom".to_owned()
            }
        );
        assert_eq!(err.to_string(), "renderer crashed: renderer exploded on boom");
    }

    #[tokio::test]
    async fn test_render_into_missing_wrapper() {
        let (doc, block, _) = setup("graph TD\nA-->B");
        let adapter = RendererAdapter::new(Arc::new(MockRenderer::new()));
        let document: Arc<dyn Document> = doc;
        let missing = NodeId::from_raw(10_000);

        let err = adapter.render(&document, &block, missing).await.unwrap_err();
        assert_eq!(err, RenderError::Document(DocumentError::NotFound(missing)));
    }
}
