//! Show/hide source toggle for rendered blocks.

use std::fmt;
use std::sync::Arc;

use mdr_document::{DisplayMode, Document, DocumentError, ElementSpec, NodeId};

use crate::consts::{HIDE_CODE_LABEL, SHOW_CODE_LABEL, TOGGLE_CLASS, TOGGLE_STYLE};

/// Switches a rendered block between "diagram only" and "diagram plus source".
///
/// The rendered card stays visible in both states; only the original
/// container is shown or hidden.
pub struct ToggleController {
    document: Arc<dyn Document>,
    original: NodeId,
    wrapper: NodeId,
    button: NodeId,
    source_visible: bool,
}

impl fmt::Debug for ToggleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToggleController")
            .field("original", &self.original)
            .field("wrapper", &self.wrapper)
            .field("button", &self.button)
            .field("source_visible", &self.source_visible)
            .finish_non_exhaustive()
    }
}

impl ToggleController {
    /// Insert the toggle button as the first child of `wrapper`.
    pub fn attach(
        document: Arc<dyn Document>,
        original: NodeId,
        wrapper: NodeId,
    ) -> Result<Self, DocumentError> {
        let button = document.create_element(
            ElementSpec::new("button")
                .with_class(TOGGLE_CLASS)
                .with_attribute("type", "button")
                .with_style(TOGGLE_STYLE)
                .with_text(SHOW_CODE_LABEL),
        );
        match document.children(wrapper).first() {
            Some(&first) => document.insert_before(button, first)?,
            None => document.append_child(wrapper, button)?,
        }

        Ok(Self {
            document,
            original,
            wrapper,
            button,
            source_visible: false,
        })
    }

    /// Flip source visibility, returning the new state.
    ///
    /// The document is left untouched if any of the three nodes is gone.
    pub fn activate(&mut self) -> Result<bool, DocumentError> {
        for node in [self.original, self.wrapper, self.button] {
            if !self.document.contains(node) {
                return Err(DocumentError::NotFound(node));
            }
        }

        let visible = !self.source_visible;
        let (display, label) = if visible {
            (DisplayMode::Block, HIDE_CODE_LABEL)
        } else {
            (DisplayMode::None, SHOW_CODE_LABEL)
        };

        let previous = self.document.display(self.original);
        self.document.set_display(self.original, display)?;
        if let Err(e) = self.apply_card(label) {
            if let Some(previous) = previous
                && let Err(restore) = self.document.set_display(self.original, previous)
            {
                tracing::debug!(error = %restore, "Failed to restore source display");
            }
            return Err(e);
        }

        self.source_visible = visible;
        Ok(visible)
    }

    fn apply_card(&self, label: &str) -> Result<(), DocumentError> {
        self.document.set_display(self.wrapper, DisplayMode::Block)?;
        self.document.set_text(self.button, label)
    }

    /// Whether the original source is currently shown.
    #[must_use]
    pub fn source_visible(&self) -> bool {
        self.source_visible
    }

    /// The toggle button element.
    #[must_use]
    pub fn button(&self) -> NodeId {
        self.button
    }

    #[must_use]
    pub fn original(&self) -> NodeId {
        self.original
    }

    #[must_use]
    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }
}
