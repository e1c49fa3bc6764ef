//! Document abstraction for MDR.
//!
//! The rendering pipeline never touches a concrete DOM. It works against the
//! [`Document`] trait, which exposes exactly what diagram detection needs:
//!
//! - **Queries**: [`Selector`]-based lookup, ancestor resolution, text extraction
//! - **Mutations**: element creation, insertion, removal, display and attributes
//! - **Observation**: [`MutationBatch`]es delivered through a [`MutationReceiver`]
//!
//! [`MemoryDocument`] is the in-process implementation used by embedders and tests.
//!
//! # Example
//!
//! ```
//! use mdr_document::{Document, ElementSpec, MemoryDocument, Selector};
//!
//! let doc = MemoryDocument::new();
//! let block = doc.append_element(doc.body(), ElementSpec::new("div").with_class("code-block"))?;
//! let pre = doc.append_element(block, ElementSpec::new("pre"))?;
//! let code = doc.append_element(pre, ElementSpec::new("code").with_class("language-text"))?;
//!
//! let container = Selector::parse(".code-block").unwrap();
//! assert_eq!(doc.closest(code, &container), Some(block));
//! # Ok::<(), mdr_document::DocumentError>(())
//! ```

mod document;
mod memory;
mod mutation;
mod node;
mod selector;

pub use document::{Document, DocumentError};
pub use memory::MemoryDocument;
pub use mutation::{MutationBatch, MutationReceiver, MutationRecord};
pub use node::{DisplayMode, ElementInfo, ElementSpec, NodeId};
pub use selector::{Selector, SelectorError};
