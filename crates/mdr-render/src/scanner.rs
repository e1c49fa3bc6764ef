//! Block discovery.
//!
//! [`BlockScanner`] walks the code elements of a document subtree, keeps the
//! ones whose text declares a diagram, and resolves each to the container that
//! will be hidden behind the rendered card.

use std::collections::HashSet;
use std::sync::LazyLock;

use mdr_document::{Document, DocumentError, NodeId, Selector, SelectorError};

use crate::classifier::{DiagramKind, detect_kind};
use crate::consts::{DEFAULT_CODE_SELECTORS, DEFAULT_CONTAINER_SELECTORS};
use crate::state::{RenderLedger, RenderState};

static DEFAULT_CODE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&DEFAULT_CODE_SELECTORS.join(", ")).expect("invalid default code selector")
});

static DEFAULT_CONTAINERS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    DEFAULT_CONTAINER_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("invalid default container selector"))
        .collect()
});

/// A diagram candidate found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Element hidden and replaced by the rendered card.
    pub container: NodeId,
    /// Code element the source was read from.
    pub code: NodeId,
    /// Trimmed diagram source.
    pub source: String,
    /// Construct declared by the source.
    pub kind: DiagramKind,
}

/// Structural failure while walking the document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// A code element has no parent to act as container.
    #[error("code element {0} has no parent element")]
    Orphan(NodeId),
    /// Document operation failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Selectors used to discover blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Code elements that may hold diagram source.
    pub code_selector: Selector,
    /// Container selectors in priority order.
    pub container_selectors: Vec<Selector>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            code_selector: DEFAULT_CODE_SELECTOR.clone(),
            container_selectors: DEFAULT_CONTAINERS.clone(),
        }
    }
}

impl ScanOptions {
    /// Build options from selector source strings.
    ///
    /// Code selectors are combined into one list; container selectors keep
    /// their priority order.
    pub fn from_sources<S: AsRef<str>>(
        code_selectors: &[S],
        container_selectors: &[S],
    ) -> Result<Self, SelectorError> {
        let code_selector = code_selectors
            .iter()
            .map(|s| Selector::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let container_selectors = container_selectors
            .iter()
            .map(|s| Selector::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            code_selector: Selector::any(code_selector),
            container_selectors,
        })
    }
}

/// Finds unhandled diagram blocks.
#[derive(Debug, Clone, Default)]
pub struct BlockScanner {
    options: ScanOptions,
}

impl BlockScanner {
    /// Create a scanner with the given selectors.
    #[must_use]
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Selectors in use.
    #[must_use]
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Collect diagram blocks under `root` whose container is still unmarked.
    ///
    /// Blocks are returned in document order, at most one per container. The
    /// result is a snapshot; later document changes do not affect it.
    pub fn scan(
        &self,
        document: &dyn Document,
        root: NodeId,
        ledger: &RenderLedger,
    ) -> Result<Vec<Block>, ScanError> {
        let mut blocks = Vec::new();
        let mut selected = HashSet::new();

        for code in document.query_all(root, &self.options.code_selector) {
            let Some(text) = document.text_content(code) else {
                continue;
            };
            let source = text.trim();
            let Some(kind) = detect_kind(source) else {
                continue;
            };

            let container = self.resolve_container(document, code)?;
            let state = ledger.state(container);
            if state != RenderState::Unmarked {
                tracing::debug!(%container, ?state, "Skipping handled container");
                continue;
            }
            if !selected.insert(container) {
                tracing::debug!(%container, %code, "Container already selected in this pass");
                continue;
            }

            tracing::debug!(%container, %code, %kind, "Found diagram block");
            blocks.push(Block {
                container,
                code,
                source: source.to_owned(),
                kind,
            });
        }

        Ok(blocks)
    }

    /// Nearest ancestor matching the first container selector that matches,
    /// falling back to the immediate parent.
    fn resolve_container(&self, document: &dyn Document, code: NodeId) -> Result<NodeId, ScanError> {
        for selector in &self.options.container_selectors {
            if let Some(container) = document.closest(code, selector) {
                return Ok(container);
            }
        }
        document.parent(code).ok_or(ScanError::Orphan(code))
    }
}
