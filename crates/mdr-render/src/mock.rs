//! Scripted rendering library for testing.
//!
//! [`MockRenderer`] records every source it renders, fails or panics on
//! configured markers, and can be gated to hold renders in flight.
//! [`MockSource`] hands it out and can be told to fail the first acquisitions.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use mdr_document::{Document, NodeId};
use tokio::sync::Semaphore;

use crate::acquire::{AcquisitionError, RendererSource};
use crate::renderer::{RenderOptions, RendererFailure, RendererHandle};

/// Rendering library double.
#[derive(Debug, Default)]
pub struct MockRenderer {
    fail_marker: Option<String>,
    panic_marker: Option<String>,
    reject_options: bool,
    gate: Option<Arc<Semaphore>>,
    rendered: Mutex<Vec<String>>,
    runs: AtomicUsize,
    initialized: Mutex<Vec<RenderOptions>>,
}

impl MockRenderer {
    /// Create a renderer that renders every source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail sources containing `marker` with a parse error.
    #[must_use]
    pub fn failing_on(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Panic on sources containing `marker`.
    #[must_use]
    pub fn panicking_on(mut self, marker: impl Into<String>) -> Self {
        self.panic_marker = Some(marker.into());
        self
    }

    /// Reject [`RendererHandle::initialize`].
    #[must_use]
    pub fn rejecting_options(mut self) -> Self {
        self.reject_options = true;
        self
    }

    /// Hold each render until a permit is added to `gate`.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sources rendered successfully, in order.
    pub fn rendered_sources(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }

    /// Number of `run` calls, failed ones included.
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Options received by `initialize`.
    pub fn initialized_with(&self) -> Vec<RenderOptions> {
        self.initialized.lock().unwrap().clone()
    }

    fn render_source(&self, source: &str) -> Result<String, RendererFailure> {
        if let Some(marker) = &self.panic_marker
            && source.contains(marker.as_str())
        {
            panic!("renderer exploded on {marker}");
        }
        if let Some(marker) = &self.fail_marker
            && let Some(line) = source.lines().position(|l| l.contains(marker.as_str()))
        {
            return Err(format!("Parse error on line {}: {source}", line + 1).into());
        }
        Ok(format!(r#"<svg class="mock" data-length="{}"></svg>"#, source.len()))
    }
}

#[async_trait::async_trait]
impl RendererHandle for MockRenderer {
    fn initialize(&self, options: &RenderOptions) -> Result<(), RendererFailure> {
        if self.reject_options {
            return Err("unsupported options".into());
        }
        self.initialized.lock().unwrap().push(options.clone());
        Ok(())
    }

    async fn run(&self, document: Arc<dyn Document>, nodes: Vec<NodeId>) -> Result<(), RendererFailure> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }
        for node in nodes {
            let source = document.text_content(node).unwrap_or_default();
            let markup = self.render_source(&source)?;
            document.set_inner_markup(node, &markup)?;
            self.rendered.lock().unwrap().push(source);
        }
        Ok(())
    }
}

/// Rendering library source double.
#[derive(Debug)]
pub struct MockSource {
    renderer: Arc<MockRenderer>,
    failures_remaining: AtomicUsize,
    acquisitions: AtomicUsize,
}

impl MockSource {
    /// Create a source that always hands out `renderer`.
    #[must_use]
    pub fn new(renderer: Arc<MockRenderer>) -> Self {
        Self {
            renderer,
            failures_remaining: AtomicUsize::new(0),
            acquisitions: AtomicUsize::new(0),
        }
    }

    /// Fail the first `count` acquisitions.
    #[must_use]
    pub fn failing(self, count: usize) -> Self {
        self.failures_remaining.store(count, Ordering::SeqCst);
        self
    }

    /// Number of acquisition attempts.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RendererSource for MockSource {
    async fn acquire(&self) -> Result<Arc<dyn RendererHandle>, AcquisitionError> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AcquisitionError::Unavailable(
                "mock library unreachable".to_owned(),
            ));
        }
        Ok(Arc::clone(&self.renderer) as Arc<dyn RendererHandle>)
    }
}
