//! Mermaid block detection and idempotent rendering.
//!
//! This crate turns diagram source found in a [`Document`](mdr_document::Document)
//! into rendered cards, each block exactly once:
//!
//! - [`BlockScanner`] finds code elements whose text [`is_diagram`] and resolves
//!   their containers, skipping containers the [`RenderLedger`] already tracks
//! - [`RenderOrchestrator`] claims each container, inserts the card, renders
//!   through a [`RendererAdapter`] and settles the block as rendered or failed
//! - [`ToggleController`] shows or hides the original source next to the card
//! - [`LibraryAcquirer`] obtains and initializes the rendering library once
//!
//! The rendering library itself is external, reached through [`RendererHandle`]
//! and [`RendererSource`]. [`KrokiSource`] is an implementation backed by a
//! Kroki server. [`MockRenderer`] and [`MockSource`] are available for testing
//! behind the `mock` feature flag.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mdr_render::{
//!     BlockScanner, KrokiSource, LibraryAcquirer, RenderLedger, RenderOptions,
//!     RenderOrchestrator, RendererAdapter,
//! };
//!
//! let acquirer = LibraryAcquirer::new(Arc::new(KrokiSource::new("https://kroki.io")), RenderOptions::default());
//! let ledger = Arc::new(RenderLedger::new());
//!
//! let handle = acquirer.acquire().await?;
//! let blocks = BlockScanner::default().scan(document.as_ref(), document.body(), &ledger)?;
//! let orchestrator = RenderOrchestrator::new(document, ledger, RendererAdapter::new(handle));
//! let report = orchestrator.process_all(blocks).await;
//! println!("rendered {} diagrams", report.rendered.len());
//! ```

mod acquire;
mod classifier;
pub mod consts;
mod kroki;
mod orchestrator;
mod renderer;
mod scanner;
mod state;
mod toggle;

#[cfg(any(test, feature = "mock"))]
mod mock;

pub use acquire::{AcquisitionError, LibraryAcquirer, RendererSource};
pub use classifier::{DiagramKind, detect_kind, is_diagram};
pub use kroki::{KrokiError, KrokiRenderer, KrokiSource};
pub use orchestrator::{FailedBlock, PassReport, RenderOrchestrator, RenderedBlock};
pub use renderer::{
    RenderError, RenderOptions, RendererAdapter, RendererFailure, RendererHandle, SecurityLevel,
};
pub use scanner::{Block, BlockScanner, ScanError, ScanOptions};
pub use state::{RenderLedger, RenderState, mirror_state};
pub use toggle::ToggleController;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockRenderer, MockSource};
