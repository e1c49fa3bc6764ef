//! Top-level render engine.
//!
//! [`Engine`] owns the state shared between passes: the render ledger, the
//! memoized rendering library and the toggle registry. A pass acquires the
//! library, scans the document and hands the blocks to the orchestrator.
//! Passes are serialized, so the initial pass, watcher passes and reset never
//! interleave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mdr_config::Config;
use mdr_document::{DisplayMode, Document, DocumentError, NodeId, Selector};
use mdr_render::consts::{ERROR_NOTICE_CLASS, RENDER_STATE_ATTRIBUTE, WRAPPER_CLASS};
use mdr_render::{
    AcquisitionError, BlockScanner, LibraryAcquirer, RenderLedger, RenderOrchestrator,
    RenderState, RendererAdapter, RendererSource, ScanError, ToggleController, mirror_state,
};

use crate::options::{EngineError, EngineOptions};
use crate::watcher::{ChangeWatcher, WatcherHandle};

/// Class of the containers the original pages wrap code in.
const CODE_BLOCK_CLASS: &str = "code-block";

/// Counts for a completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Blocks selected by the scan.
    pub found: usize,
    pub rendered: usize,
    pub failed: usize,
    /// Blocks claimed by another pass between scan and processing.
    pub skipped: usize,
}

/// Result of [`Engine::run_pass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// Blocks were scanned and processed.
    Completed(PassSummary),
    /// The rendering library could not be obtained; nothing was marked.
    AcquisitionFailed(AcquisitionError),
    /// The document could not be walked; nothing was marked.
    ScanFailed(ScanError),
}

impl PassOutcome {
    /// Summary of a completed pass.
    #[must_use]
    pub fn summary(&self) -> Option<&PassSummary> {
        match self {
            Self::Completed(summary) => Some(summary),
            _ => None,
        }
    }
}

/// What [`Engine::reset`] removed or restored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub wrappers_removed: usize,
    pub notices_removed: usize,
    /// Tracked containers whose marker and display were restored.
    pub containers_restored: usize,
    pub toggles_cleared: usize,
}

/// Result of [`Engine::start`].
#[derive(Debug)]
pub struct Started {
    pub initial: PassOutcome,
    /// Running watcher, `None` when disabled.
    pub watcher: Option<WatcherHandle>,
}

/// Diagram rendering engine for one document.
///
/// Cloning is cheap and yields a handle to the same engine.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    document: Arc<dyn Document>,
    options: EngineOptions,
    scanner: BlockScanner,
    ledger: Arc<RenderLedger>,
    acquirer: LibraryAcquirer,
    toggles: Mutex<HashMap<NodeId, ToggleController>>,
    pass_lock: tokio::sync::Mutex<()>,
    passes: AtomicUsize,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.inner.options)
            .field("ledger", &self.inner.ledger)
            .field("acquirer", &self.inner.acquirer)
            .field("passes", &self.passes())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine for `document`, rendering through `source`.
    #[must_use]
    pub fn new(
        document: Arc<dyn Document>,
        source: Arc<dyn RendererSource>,
        options: EngineOptions,
    ) -> Self {
        let scanner = BlockScanner::new(options.scan.clone());
        let acquirer = LibraryAcquirer::new(source, options.render.clone());
        Self {
            inner: Arc::new(EngineInner {
                document,
                options,
                scanner,
                ledger: Arc::new(RenderLedger::new()),
                acquirer,
                toggles: Mutex::new(HashMap::new()),
                pass_lock: tokio::sync::Mutex::new(()),
                passes: AtomicUsize::new(0),
            }),
        }
    }

    /// Create an engine with options taken from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be turned into options.
    pub fn from_config(
        document: Arc<dyn Document>,
        source: Arc<dyn RendererSource>,
        config: &Config,
    ) -> Result<Self, EngineError> {
        Ok(Self::new(document, source, EngineOptions::from_config(config)?))
    }

    #[must_use]
    pub fn document(&self) -> &Arc<dyn Document> {
        &self.inner.document
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    /// Render states of the containers seen so far.
    #[must_use]
    pub fn ledger(&self) -> &RenderLedger {
        &self.inner.ledger
    }

    /// Number of passes started, aborted ones included.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.inner.passes.load(Ordering::SeqCst)
    }

    /// Number of registered toggle controls.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn toggle_count(&self) -> usize {
        self.inner.toggles.lock().unwrap().len()
    }

    /// Run one acquire, scan and render pass over the document body.
    ///
    /// Waits for any pass or reset already running. Never fails: problems are
    /// logged and reported in the outcome.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub async fn run_pass(&self) -> PassOutcome {
        let _guard = self.inner.pass_lock.lock().await;
        let pass = self.inner.passes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(pass, "Render pass started");

        let handle = match self.inner.acquirer.acquire().await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(pass, error = %e, "Rendering library unavailable, pass aborted");
                return PassOutcome::AcquisitionFailed(e);
            }
        };

        let document = &self.inner.document;
        let blocks = match self
            .inner
            .scanner
            .scan(document.as_ref(), document.body(), &self.inner.ledger)
        {
            Ok(blocks) => blocks,
            Err(e) => {
                tracing::warn!(pass, error = %e, "Document scan failed, pass aborted");
                return PassOutcome::ScanFailed(e);
            }
        };

        let found = blocks.len();
        if found == 0 {
            tracing::info!(pass, "No new diagram blocks");
            return PassOutcome::Completed(PassSummary::default());
        }

        let orchestrator = RenderOrchestrator::new(
            Arc::clone(document),
            Arc::clone(&self.inner.ledger),
            RendererAdapter::new(handle),
        );
        let report = orchestrator.process_all(blocks).await;

        let summary = PassSummary {
            found,
            rendered: report.rendered.len(),
            failed: report.failed.len(),
            skipped: report.skipped,
        };

        {
            let mut toggles = self.inner.toggles.lock().unwrap();
            for rendered in report.rendered {
                toggles.insert(rendered.toggle.button(), rendered.toggle);
            }
        }

        tracing::info!(
            pass,
            found = summary.found,
            rendered = summary.rendered,
            failed = summary.failed,
            skipped = summary.skipped,
            "Render pass complete"
        );
        PassOutcome::Completed(summary)
    }

    /// Undo every render: remove cards and notices, clear render markers and
    /// make original content visible again.
    ///
    /// Waits for any running pass to finish first.
    ///
    /// # Errors
    ///
    /// Returns the first document error; the ledger and toggle registry are
    /// cleared regardless.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub async fn reset(&self) -> Result<ResetReport, DocumentError> {
        let _guard = self.inner.pass_lock.lock().await;
        let document = self.inner.document.as_ref();
        let body = document.body();
        let mut report = ResetReport::default();

        report.toggles_cleared = {
            let mut toggles = self.inner.toggles.lock().unwrap();
            let count = toggles.len();
            toggles.clear();
            count
        };
        let tracked = self.inner.ledger.clear();

        for wrapper in document.query_all(body, &Selector::class(WRAPPER_CLASS)) {
            if document.contains(wrapper) {
                document.remove(wrapper)?;
                report.wrappers_removed += 1;
            }
        }
        for notice in document.query_all(body, &Selector::class(ERROR_NOTICE_CLASS)) {
            if document.contains(notice) {
                document.remove(notice)?;
                report.notices_removed += 1;
            }
        }

        for container in tracked {
            if !document.contains(container) {
                continue;
            }
            mirror_state(document, container, RenderState::Unmarked)?;
            document.set_display(container, DisplayMode::Default)?;
            report.containers_restored += 1;
        }

        // Markers and hidden blocks the ledger never saw, e.g. from an earlier
        // engine on the same document.
        for marked in document.query_all(body, &Selector::attribute(RENDER_STATE_ATTRIBUTE)) {
            document.remove_attribute(marked, RENDER_STATE_ATTRIBUTE)?;
        }
        for block in document.query_all(body, &Selector::class(CODE_BLOCK_CLASS)) {
            document.set_display(block, DisplayMode::Default)?;
        }

        tracing::info!(
            wrappers = report.wrappers_removed,
            notices = report.notices_removed,
            containers = report.containers_restored,
            "Rendered diagrams reset"
        );
        Ok(report)
    }

    /// Reset, then render again.
    ///
    /// # Errors
    ///
    /// Returns an error if the reset fails; the pass is not run then.
    pub async fn refresh(&self) -> Result<PassOutcome, DocumentError> {
        self.reset().await?;
        Ok(self.run_pass().await)
    }

    /// Activate the toggle control `button`.
    ///
    /// Returns whether the source is now visible, or `None` if `button` is not
    /// a registered toggle or the document rejected the change.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn activate_toggle(&self, button: NodeId) -> Option<bool> {
        let mut toggles = self.inner.toggles.lock().unwrap();
        let toggle = toggles.get_mut(&button)?;
        match toggle.activate() {
            Ok(visible) => {
                tracing::debug!(%button, source_visible = visible, "Toggle activated");
                Some(visible)
            }
            Err(e) => {
                tracing::warn!(%button, error = %e, "Toggle activation failed");
                None
            }
        }
    }

    /// Run the initial pass and start the change watcher if enabled.
    ///
    /// The watcher subscribes before the initial pass, so content added while
    /// that pass runs still triggers a re-scan.
    pub async fn start(&self) -> Started {
        let watcher_options = &self.inner.options.watcher;
        let mutations = watcher_options
            .enabled
            .then(|| self.inner.document.subscribe());

        let initial = self.run_pass().await;

        let watcher = mutations.map(|mutations| {
            let engine = self.clone();
            ChangeWatcher::new(watcher_options).spawn(
                Arc::clone(&self.inner.document),
                mutations,
                move || {
                    let engine = engine.clone();
                    async move {
                        engine.run_pass().await;
                    }
                },
            )
        });
        if watcher.is_some() {
            tracing::info!(
                debounce = ?watcher_options.debounce,
                "Change watcher started"
            );
        }

        Started { initial, watcher }
    }
}
