//! Per-pass block processing.
//!
//! [`RenderOrchestrator`] takes the blocks of one scan and, strictly in order,
//! claims each container, builds the rendered card in front of it, renders,
//! and settles the container as rendered or failed. A failing block never
//! stops the blocks after it.

use std::fmt;
use std::sync::Arc;

use mdr_document::{DisplayMode, Document, ElementSpec, NodeId};

use crate::classifier::DiagramKind;
use crate::consts::{
    ERROR_NOTICE_CLASS, ERROR_NOTICE_PREFIX, ERROR_NOTICE_STYLE, WRAPPER_CLASS, WRAPPER_STYLE,
};
use crate::renderer::{RenderError, RendererAdapter};
use crate::scanner::Block;
use crate::state::{RenderLedger, RenderState, mirror_state};
use crate::toggle::ToggleController;

/// A block that rendered successfully.
#[derive(Debug)]
pub struct RenderedBlock {
    pub container: NodeId,
    /// Card inserted before the container.
    pub wrapper: NodeId,
    /// Mount point holding the rendered markup.
    pub mount: NodeId,
    pub kind: DiagramKind,
    /// Show/hide source control for this block.
    pub toggle: ToggleController,
}

/// A block that failed to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedBlock {
    pub container: NodeId,
    /// Inline notice inserted before the container, if it could be placed.
    pub notice: Option<NodeId>,
    pub error: RenderError,
}

/// Outcome of processing one batch of blocks.
#[derive(Debug, Default)]
pub struct PassReport {
    pub rendered: Vec<RenderedBlock>,
    pub failed: Vec<FailedBlock>,
    /// Blocks whose container was claimed by another pass first.
    pub skipped: usize,
}

impl PassReport {
    /// Number of blocks that were claimed and processed.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.rendered.len() + self.failed.len()
    }
}

/// Drives rendering for the blocks of a pass.
pub struct RenderOrchestrator {
    document: Arc<dyn Document>,
    ledger: Arc<RenderLedger>,
    adapter: RendererAdapter,
}

impl fmt::Debug for RenderOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOrchestrator")
            .field("ledger", &self.ledger)
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

impl RenderOrchestrator {
    #[must_use]
    pub fn new(
        document: Arc<dyn Document>,
        ledger: Arc<RenderLedger>,
        adapter: RendererAdapter,
    ) -> Self {
        Self {
            document,
            ledger,
            adapter,
        }
    }

    /// Process `blocks` one after another.
    pub async fn process_all(&self, blocks: Vec<Block>) -> PassReport {
        let mut report = PassReport::default();

        for block in blocks {
            // Claim before the first suspension point so an overlapping pass
            // cannot take the same container.
            if !self.ledger.try_claim(block.container) {
                tracing::debug!(container = %block.container, "Container claimed elsewhere, skipping");
                report.skipped += 1;
                continue;
            }

            match self.process(&block).await {
                Ok(rendered) => report.rendered.push(rendered),
                Err(failed) => report.failed.push(failed),
            }
        }

        report
    }

    async fn process(&self, block: &Block) -> Result<RenderedBlock, FailedBlock> {
        let original_display = self.document.display(block.container).unwrap_or_default();
        let wrapper = self.document.create_element(
            ElementSpec::new("div")
                .with_class(WRAPPER_CLASS)
                .with_style(WRAPPER_STYLE),
        );

        match self.build_and_render(block, wrapper).await {
            Ok(rendered) => {
                self.settle(block.container, RenderState::Rendered);
                tracing::debug!(
                    container = %block.container,
                    kind = %block.kind,
                    "Diagram block rendered"
                );
                Ok(rendered)
            }
            Err(error) => Err(self.fail(block, wrapper, original_display, error)),
        }
    }

    async fn build_and_render(
        &self,
        block: &Block,
        wrapper: NodeId,
    ) -> Result<RenderedBlock, RenderError> {
        let document = &self.document;
        mirror_state(document.as_ref(), block.container, RenderState::Processing)?;
        document.insert_before(wrapper, block.container)?;
        document.set_display(block.container, DisplayMode::None)?;
        let toggle = ToggleController::attach(Arc::clone(document), block.container, wrapper)?;

        let mount = self.adapter.render(document, block, wrapper).await?;

        Ok(RenderedBlock {
            container: block.container,
            wrapper,
            mount,
            kind: block.kind,
            toggle,
        })
    }

    /// Settle a failed block: drop the card, restore the original and show a notice.
    fn fail(
        &self,
        block: &Block,
        wrapper: NodeId,
        original_display: DisplayMode,
        error: RenderError,
    ) -> FailedBlock {
        tracing::warn!(
            container = %block.container,
            kind = %block.kind,
            error = %error,
            "Failed to render diagram block"
        );
        self.settle(block.container, RenderState::Error);

        let document = &self.document;
        if document.contains(wrapper)
            && let Err(e) = document.remove(wrapper)
        {
            tracing::debug!(error = %e, "Failed to remove wrapper of failed block");
        }
        if let Err(e) = document.set_display(block.container, original_display) {
            tracing::debug!(error = %e, "Failed to restore container display");
        }

        let notice = document.create_element(
            ElementSpec::new("div")
                .with_class(ERROR_NOTICE_CLASS)
                .with_style(ERROR_NOTICE_STYLE)
                .with_text(format!("{ERROR_NOTICE_PREFIX}{error}")),
        );
        let notice = match document.insert_before(notice, block.container) {
            Ok(()) => Some(notice),
            Err(e) => {
                tracing::debug!(error = %e, "Failed to place error notice");
                if let Err(e) = document.remove(notice) {
                    tracing::debug!(error = %e, "Failed to discard unplaced error notice");
                }
                None
            }
        };

        FailedBlock {
            container: block.container,
            notice,
            error,
        }
    }

    fn settle(&self, container: NodeId, state: RenderState) {
        self.ledger.set(container, state);
        if let Err(e) = mirror_state(self.document.as_ref(), container, state) {
            tracing::debug!(%container, error = %e, "Failed to mirror render state");
        }
    }
}
