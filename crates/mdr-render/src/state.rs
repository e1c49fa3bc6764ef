//! Render state tracking.
//!
//! [`RenderLedger`] is the single source of truth for which containers have
//! been handled. Each state is also mirrored onto the container as the
//! `data-mermaid-rendered` attribute so hosts can see it in the document.

use std::collections::HashMap;
use std::sync::Mutex;

use mdr_document::{Document, DocumentError, NodeId};

use crate::consts::RENDER_STATE_ATTRIBUTE;

/// Lifecycle position of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    /// Never seen, or reset.
    #[default]
    Unmarked,
    /// Claimed by a pass; rendering in flight.
    Processing,
    /// Diagram rendered successfully.
    Rendered,
    /// Rendering failed; not retried until reset.
    Error,
}

impl RenderState {
    /// Attribute value mirrored onto the container, `None` when unmarked.
    #[must_use]
    pub fn marker(self) -> Option<&'static str> {
        match self {
            Self::Unmarked => None,
            Self::Processing => Some("processing"),
            Self::Rendered => Some("true"),
            Self::Error => Some("error"),
        }
    }

    /// Parse a mirrored attribute value.
    #[must_use]
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "processing" => Some(Self::Processing),
            "true" => Some(Self::Rendered),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// Write `state` onto the container's marker attribute.
pub fn mirror_state(
    document: &dyn Document,
    container: NodeId,
    state: RenderState,
) -> Result<(), DocumentError> {
    match state.marker() {
        Some(marker) => document.set_attribute(container, RENDER_STATE_ATTRIBUTE, marker),
        None => document.remove_attribute(container, RENDER_STATE_ATTRIBUTE),
    }
}

/// Side table of container render states.
///
/// Shared between the scanner (read), the orchestrator (claim and settle) and
/// reset (clear). Claiming is an atomic check-and-set under one lock, so two
/// overlapping passes can never both take the same container.
#[derive(Debug, Default)]
pub struct RenderLedger {
    states: Mutex<HashMap<NodeId, RenderState>>,
}

impl RenderLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a container.
    pub fn state(&self, container: NodeId) -> RenderState {
        self.states
            .lock()
            .unwrap()
            .get(&container)
            .copied()
            .unwrap_or_default()
    }

    /// Move an unmarked container to [`RenderState::Processing`].
    ///
    /// Returns `false` if the container was already claimed.
    pub fn try_claim(&self, container: NodeId) -> bool {
        let mut states = self.states.lock().unwrap();
        if states.contains_key(&container) {
            return false;
        }
        states.insert(container, RenderState::Processing);
        true
    }

    /// Record a state. [`RenderState::Unmarked`] forgets the container.
    pub fn set(&self, container: NodeId, state: RenderState) {
        let mut states = self.states.lock().unwrap();
        if state == RenderState::Unmarked {
            states.remove(&container);
        } else {
            states.insert(container, state);
        }
    }

    /// Containers with a state, in id order.
    pub fn tracked(&self) -> Vec<NodeId> {
        let mut nodes: Vec<_> = self.states.lock().unwrap().keys().copied().collect();
        nodes.sort_unstable();
        nodes
    }

    /// Number of containers in `state`.
    pub fn count(&self, state: RenderState) -> usize {
        self.states
            .lock()
            .unwrap()
            .values()
            .filter(|s| **s == state)
            .count()
    }

    /// Forget every container, returning the ones that were tracked.
    pub fn clear(&self) -> Vec<NodeId> {
        let mut nodes: Vec<_> = self
            .states
            .lock()
            .unwrap()
            .drain()
            .map(|(node, _)| node)
            .collect();
        nodes.sort_unstable();
        nodes
    }

    /// Number of tracked containers.
    pub fn len(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    /// Whether no container is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdr_document::{ElementSpec, MemoryDocument};
    use pretty_assertions::assert_eq;

    fn id(raw: u64) -> NodeId {
        NodeId::from_raw(raw)
    }

    #[test]
    fn test_unknown_container_is_unmarked() {
        let ledger = RenderLedger::new();
        assert_eq!(ledger.state(id(3)), RenderState::Unmarked);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_claim_is_exclusive() {
        let ledger = RenderLedger::new();
        assert!(ledger.try_claim(id(1)));
        assert!(!ledger.try_claim(id(1)));
        assert_eq!(ledger.state(id(1)), RenderState::Processing);
    }

    #[test]
    fn test_settled_states_block_claims() {
        let ledger = RenderLedger::new();
        ledger.set(id(1), RenderState::Rendered);
        ledger.set(id(2), RenderState::Error);
        assert!(!ledger.try_claim(id(1)));
        assert!(!ledger.try_claim(id(2)));
        assert_eq!(ledger.count(RenderState::Rendered), 1);
        assert_eq!(ledger.count(RenderState::Error), 1);
    }

    #[test]
    fn test_set_unmarked_forgets() {
        let ledger = RenderLedger::new();
        ledger.set(id(1), RenderState::Rendered);
        ledger.set(id(1), RenderState::Unmarked);
        assert!(ledger.is_empty());
        assert!(ledger.try_claim(id(1)));
    }

    #[test]
    fn test_clear_returns_tracked_in_order() {
        let ledger = RenderLedger::new();
        ledger.set(id(9), RenderState::Error);
        assert!(ledger.try_claim(id(4)));
        ledger.set(id(2), RenderState::Rendered);

        assert_eq!(ledger.tracked(), vec![id(2), id(4), id(9)]);
        assert_eq!(ledger.clear(), vec![id(2), id(4), id(9)]);
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let ledger = std::sync::Arc::new(RenderLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = std::sync::Arc::clone(&ledger);
                std::thread::spawn(move || ledger.try_claim(id(7)))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_marker_round_trip() {
        for state in [
            RenderState::Processing,
            RenderState::Rendered,
            RenderState::Error,
        ] {
            let marker = state.marker().unwrap();
            assert_eq!(RenderState::from_marker(marker), Some(state));
        }
        assert_eq!(RenderState::Unmarked.marker(), None);
        assert_eq!(RenderState::from_marker("yes"), None);
    }

    #[test]
    fn test_mirror_state_sets_and_removes_attribute() {
        let doc = MemoryDocument::new();
        let block = doc
            .append_element(doc.body(), ElementSpec::new("div").with_class("code-block"))
            .unwrap();

        mirror_state(&doc, block, RenderState::Processing).unwrap();
        assert_eq!(
            doc.element(block).unwrap().attribute(RENDER_STATE_ATTRIBUTE),
            Some("processing")
        );

        mirror_state(&doc, block, RenderState::Rendered).unwrap();
        assert_eq!(
            doc.element(block).unwrap().attribute(RENDER_STATE_ATTRIBUTE),
            Some("true")
        );

        mirror_state(&doc, block, RenderState::Unmarked).unwrap();
        assert_eq!(
            doc.element(block).unwrap().attribute(RENDER_STATE_ATTRIBUTE),
            None
        );
    }

    #[test]
    fn test_mirror_state_on_missing_node() {
        let doc = MemoryDocument::new();
        let result = mirror_state(&doc, id(999), RenderState::Error);
        assert_eq!(result, Err(DocumentError::NotFound(id(999))));
    }
}
