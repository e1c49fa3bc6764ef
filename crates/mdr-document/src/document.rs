//! Document trait and error types.
//!
//! [`Document`] is the capability surface the rendering pipeline needs from a
//! host document: structural queries, text extraction, a handful of mutations,
//! and a subscription to mutation batches. Query helpers are provided methods
//! built on the primitive accessors, so backends only implement navigation and
//! mutation.

use crate::mutation::MutationReceiver;
use crate::node::{DisplayMode, ElementInfo, ElementSpec, NodeId};
use crate::selector::Selector;

/// Document operation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// Node does not exist (never created or already removed).
    #[error("node {0} not found")]
    NotFound(NodeId),
    /// Operation requires an element but the node is a text node.
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    /// Operation requires a parent but the node is detached.
    #[error("node {0} has no parent")]
    Detached(NodeId),
    /// Insertion would make a node its own ancestor, or move the body.
    #[error("node {0} cannot be inserted at this position")]
    HierarchyRequest(NodeId),
}

/// Host document capabilities.
///
/// Implementations use interior mutability: every method takes `&self` so a
/// document can be shared as `Arc<dyn Document>` between the scan pass, the
/// renderer and the change watcher.
pub trait Document: Send + Sync {
    /// Root under which content lives and mutations are observed.
    fn body(&self) -> NodeId;

    /// Whether the node exists.
    fn contains(&self, node: NodeId) -> bool;

    /// Parent of a node, `None` for the body and detached nodes.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Children in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Tag and attributes, `None` for text nodes and unknown ids.
    fn element(&self, node: NodeId) -> Option<ElementInfo>;

    /// Concatenated text of the node and its descendants.
    ///
    /// Opaque inner markup (see [`set_inner_markup`](Self::set_inner_markup))
    /// contributes no text.
    fn text_content(&self, node: NodeId) -> Option<String>;

    /// Inline display state of an element.
    fn display(&self, node: NodeId) -> Option<DisplayMode>;

    /// Set the inline display state of an element.
    fn set_display(&self, node: NodeId, display: DisplayMode) -> Result<(), DocumentError>;

    /// Set an attribute on an element.
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DocumentError>;

    /// Remove an attribute from an element. Removing a missing attribute is not an error.
    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DocumentError>;

    /// Create a detached element.
    fn create_element(&self, spec: ElementSpec) -> NodeId;

    /// Append `child` as the last child of `parent`, detaching it first if needed.
    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DocumentError>;

    /// Insert `node` as the preceding sibling of `reference`.
    fn insert_before(&self, node: NodeId, reference: NodeId) -> Result<(), DocumentError>;

    /// Detach and drop a node with its subtree.
    fn remove(&self, node: NodeId) -> Result<(), DocumentError>;

    /// Replace the children of an element with a single text node.
    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DocumentError>;

    /// Opaque markup previously written with [`set_inner_markup`](Self::set_inner_markup).
    fn inner_markup(&self, node: NodeId) -> Option<String>;

    /// Replace the children of an element with opaque markup.
    fn set_inner_markup(&self, node: NodeId, markup: &str) -> Result<(), DocumentError>;

    /// Subscribe to mutation batches for nodes connected to the body.
    fn subscribe(&self) -> MutationReceiver;

    /// Whether `node` matches `selector`.
    fn matches(&self, node: NodeId, selector: &Selector) -> bool {
        selector.matches(self, node)
    }

    /// Nearest inclusive ancestor matching `selector`.
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if selector.matches(self, candidate) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Descendants of `root` (excluding `root`) matching `selector`, in document order.
    fn query_all(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if selector.matches(self, node) {
                found.push(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        found
    }

    /// First descendant of `root` matching `selector`.
    fn query_first(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut stack: Vec<NodeId> = self.children(root).into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            if selector.matches(self, node) {
                return Some(node);
            }
            stack.extend(self.children(node).into_iter().rev());
        }
        None
    }

    /// Whether the node is an element.
    fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    /// Whether the node is attached under the body (the body itself included).
    fn is_connected(&self, node: NodeId) -> bool {
        let body = self.body();
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == body {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }
}
