//! Render passes, reset and change watching for MDR.
//!
//! [`Engine`] ties the pieces of `mdr-render` together for one document:
//!
//! - [`Engine::run_pass`] acquires the rendering library, scans for new
//!   diagram blocks and renders them
//! - [`Engine::reset`] and [`Engine::refresh`] undo every render
//! - [`Engine::activate_toggle`] dispatches show/hide source clicks
//! - [`Engine::start`] runs the initial pass and spawns a [`ChangeWatcher`]
//!   that re-scans once added content settles
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mdr_config::Config;
//! use mdr_document::MemoryDocument;
//! use mdr_engine::{Engine, kroki_source};
//!
//! let config = Config::load(None, None)?;
//! let source = kroki_source(&config).expect("renderer.kroki_url is set");
//! let document = Arc::new(MemoryDocument::new());
//!
//! let engine = Engine::from_config(document, Arc::new(source), &config)?;
//! let started = engine.start().await;
//! println!("{:?}", started.initial);
//! ```

mod engine;
mod options;
mod watcher;

pub use engine::{Engine, PassOutcome, PassSummary, ResetReport, Started};
pub use options::{EngineError, EngineOptions, kroki_source};
pub use watcher::{ChangeWatcher, WatcherHandle, WatcherOptions};
