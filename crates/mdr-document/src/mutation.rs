//! Mutation notification types.
//!
//! Mirrors the shape of DOM mutation observation: each notification is a
//! [`MutationBatch`] of [`MutationRecord`]s, delivered asynchronously through a
//! [`MutationReceiver`] obtained from [`Document::subscribe`](crate::Document::subscribe).

use tokio::sync::mpsc;

use crate::node::NodeId;

/// A single observed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    /// Children of `target` were added and/or removed.
    ChildList {
        /// Parent whose child list changed.
        target: NodeId,
        /// Inserted nodes (subtree roots).
        added: Vec<NodeId>,
        /// Removed nodes (subtree roots).
        removed: Vec<NodeId>,
    },
    /// An attribute of `target` changed.
    Attributes {
        /// Element whose attribute changed.
        target: NodeId,
        /// Attribute name (`style` for display changes).
        name: String,
    },
}

/// Records delivered together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    /// Records in the order the changes happened.
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    /// Create a batch from records.
    #[must_use]
    pub fn new(records: Vec<MutationRecord>) -> Self {
        Self { records }
    }

    /// Nodes added by child-list records; removals and attribute changes are skipped.
    pub fn added_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.records
            .iter()
            .flat_map(|record| match record {
                MutationRecord::ChildList { added, .. } => added.as_slice(),
                MutationRecord::Attributes { .. } => &[] as &[NodeId],
            })
            .copied()
    }

    /// Whether the batch has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Receiver for mutation batches.
///
/// Wraps a tokio unbounded channel so a burst of mutations never blocks the
/// document that produces them.
#[derive(Debug)]
pub struct MutationReceiver {
    rx: mpsc::UnboundedReceiver<MutationBatch>,
}

impl MutationReceiver {
    /// Create a receiver from a channel receiver.
    ///
    /// Intended for [`Document`](crate::Document) implementations.
    #[must_use]
    pub fn new(rx: mpsc::UnboundedReceiver<MutationBatch>) -> Self {
        Self { rx }
    }

    /// Wait for the next batch.
    ///
    /// Returns `None` when the document stops publishing.
    pub async fn recv(&mut self) -> Option<MutationBatch> {
        self.rx.recv().await
    }

    /// Take a batch if one is ready.
    pub fn try_recv(&mut self) -> Option<MutationBatch> {
        self.rx.try_recv().ok()
    }

    /// Create a receiver that never yields batches.
    ///
    /// For backends that cannot observe mutations.
    #[must_use]
    pub fn no_op() -> Self {
        let (_tx, rx) = mpsc::unbounded_channel();
        Self { rx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn id(raw: u64) -> NodeId {
        NodeId::from_raw(raw)
    }

    #[test]
    fn test_added_nodes_skips_removals_and_attributes() {
        let batch = MutationBatch::new(vec![
            MutationRecord::ChildList {
                target: id(1),
                added: vec![id(2), id(3)],
                removed: vec![id(9)],
            },
            MutationRecord::Attributes {
                target: id(4),
                name: "style".to_owned(),
            },
            MutationRecord::ChildList {
                target: id(1),
                added: Vec::new(),
                removed: vec![id(5)],
            },
            MutationRecord::ChildList {
                target: id(6),
                added: vec![id(7)],
                removed: Vec::new(),
            },
        ]);

        assert_eq!(batch.added_nodes().collect::<Vec<_>>(), vec![id(2), id(3), id(7)]);
    }

    #[test]
    fn test_empty_batch() {
        let batch = MutationBatch::default();
        assert!(batch.is_empty());
        assert_eq!(batch.added_nodes().count(), 0);
    }

    #[tokio::test]
    async fn test_receiver_recv_and_close() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut receiver = MutationReceiver::new(rx);

        let batch = MutationBatch::new(vec![MutationRecord::Attributes {
            target: id(1),
            name: "class".to_owned(),
        }]);
        tx.send(batch.clone()).unwrap();
        drop(tx);

        assert_eq!(receiver.recv().await, Some(batch));
        assert_eq!(receiver.recv().await, None);
    }

    #[test]
    fn test_receiver_no_op() {
        let mut receiver = MutationReceiver::no_op();
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_receiver_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MutationReceiver>();
    }
}
