//! In-memory document.
//!
//! Provides [`MemoryDocument`], an arena-backed element tree implementing
//! [`Document`]. It is the host representation for embedders that assemble
//! content themselves, and the document used throughout the test suites.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use tokio::sync::mpsc;

use crate::document::{Document, DocumentError};
use crate::mutation::{MutationBatch, MutationReceiver, MutationRecord};
use crate::node::{DisplayMode, ElementInfo, ElementSpec, NodeId};

enum Content {
    Element {
        info: ElementInfo,
        display: DisplayMode,
        markup: Option<String>,
    },
    Text(String),
}

struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    content: Content,
}

struct Tree {
    nodes: HashMap<NodeId, NodeData>,
    next_id: u64,
    body: NodeId,
}

impl Tree {
    fn new() -> Self {
        let mut tree = Self {
            nodes: HashMap::new(),
            next_id: 0,
            body: NodeId::from_raw(0),
        };
        tree.body = tree.alloc(Content::Element {
            info: ElementSpec::new("body").into_parts().0,
            display: DisplayMode::Default,
            markup: None,
        });
        tree
    }

    fn alloc(&mut self, content: Content) -> NodeId {
        self.next_id += 1;
        let id = NodeId::from_raw(self.next_id);
        self.nodes.insert(
            id,
            NodeData {
                parent: None,
                children: Vec::new(),
                content,
            },
        );
        id
    }

    fn alloc_element(&mut self, spec: ElementSpec) -> NodeId {
        let (info, text) = spec.into_parts();
        let id = self.alloc(Content::Element {
            info,
            display: DisplayMode::Default,
            markup: None,
        });
        if let Some(text) = text {
            let text_id = self.alloc(Content::Text(text));
            self.link(id, text_id, None);
        }
        id
    }

    fn get(&self, id: NodeId) -> Result<&NodeData, DocumentError> {
        self.nodes.get(&id).ok_or(DocumentError::NotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DocumentError> {
        self.nodes.get_mut(&id).ok_or(DocumentError::NotFound(id))
    }

    fn require_element(&self, id: NodeId) -> Result<(), DocumentError> {
        match self.get(id)?.content {
            Content::Element { .. } => Ok(()),
            Content::Text(_) => Err(DocumentError::NotAnElement(id)),
        }
    }

    fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(candidate) = current {
            if candidate == self.body {
                return true;
            }
            current = self.nodes.get(&candidate).and_then(|n| n.parent);
        }
        false
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.nodes.get(&candidate).and_then(|n| n.parent);
        }
        false
    }

    /// Check that `node` may become a child of `parent`.
    fn check_insertion(&self, node: NodeId, parent: NodeId) -> Result<(), DocumentError> {
        self.get(node)?;
        self.require_element(parent)?;
        if node == self.body || self.is_inclusive_ancestor(node, parent) {
            return Err(DocumentError::HierarchyRequest(node));
        }
        Ok(())
    }

    /// Detach a node from its parent, recording the removal when observable.
    fn detach(&mut self, id: NodeId, records: &mut Vec<MutationRecord>) {
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return;
        };
        if self.is_connected(parent) {
            records.push(MutationRecord::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![id],
            });
        }
        if let Some(parent_data) = self.nodes.get_mut(&parent) {
            parent_data.children.retain(|child| *child != id);
        }
        if let Some(data) = self.nodes.get_mut(&id) {
            data.parent = None;
        }
    }

    /// Attach a detached node under `parent` at `index` (or last).
    fn link(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Some(parent_data) = self.nodes.get_mut(&parent) {
            match index {
                Some(index) => parent_data.children.insert(index, child),
                None => parent_data.children.push(child),
            }
        }
        if let Some(data) = self.nodes.get_mut(&child) {
            data.parent = Some(parent);
        }
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(data) = self.nodes.remove(&current) {
                stack.extend(data.children);
            }
        }
    }

    /// Drop all children of an element, returning the removed ids.
    fn clear_children(&mut self, id: NodeId) -> Result<Vec<NodeId>, DocumentError> {
        let children = std::mem::take(&mut self.get_mut(id)?.children);
        for child in &children {
            self.drop_subtree(*child);
        }
        Ok(children)
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(data) = self.nodes.get(&id) else {
            return;
        };
        if let Content::Text(text) = &data.content {
            out.push_str(text);
        }
        for child in &data.children {
            self.collect_text(*child, out);
        }
    }

    fn element_parts_mut(
        &mut self,
        id: NodeId,
    ) -> Result<(&mut ElementInfo, &mut DisplayMode, &mut Option<String>), DocumentError> {
        match &mut self.get_mut(id)?.content {
            Content::Element {
                info,
                display,
                markup,
            } => Ok((info, display, markup)),
            Content::Text(_) => Err(DocumentError::NotAnElement(id)),
        }
    }
}

/// In-memory document.
///
/// Every mutation that touches a node connected to the body is published to
/// subscribers as its own [`MutationBatch`], unless it happens inside
/// [`batch`](Self::batch), which delivers all records of the closure together.
///
/// # Example
///
/// ```
/// use mdr_document::{Document, ElementSpec, MemoryDocument, Selector};
///
/// let doc = MemoryDocument::new();
/// let pre = doc.append_element(doc.body(), ElementSpec::new("pre"))?;
/// doc.append_element(pre, ElementSpec::new("code").with_text("graph TD\nA-->B"))?;
///
/// let code = Selector::parse("pre code").unwrap();
/// let found = doc.query_all(doc.body(), &code);
/// assert_eq!(found.len(), 1);
/// assert_eq!(doc.text_content(found[0]).as_deref(), Some("graph TD\nA-->B"));
/// # Ok::<(), mdr_document::DocumentError>(())
/// ```
pub struct MemoryDocument {
    tree: RwLock<Tree>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<MutationBatch>>>,
    pending: Mutex<Option<Vec<MutationRecord>>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self {
            tree: RwLock::new(Tree::new()),
            subscribers: Mutex::new(Vec::new()),
            pending: Mutex::new(None),
        }
    }
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = self.tree.read().unwrap();
        f.debug_struct("MemoryDocument")
            .field("body", &tree.body)
            .field("nodes", &tree.nodes.len())
            .finish_non_exhaustive()
    }
}

impl MemoryDocument {
    /// Create a document containing only an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an element and append it to `parent`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn append_element(&self, parent: NodeId, spec: ElementSpec) -> Result<NodeId, DocumentError> {
        let id = self.create_element(spec);
        if let Err(err) = self.append_child(parent, id) {
            self.tree.write().unwrap().drop_subtree(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Create a text node and append it to `parent`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn append_text(&self, parent: NodeId, text: impl Into<String>) -> Result<NodeId, DocumentError> {
        let mut records = Vec::new();
        let id = {
            let mut tree = self.tree.write().unwrap();
            tree.require_element(parent)?;
            let id = tree.alloc(Content::Text(text.into()));
            tree.link(parent, id, None);
            if tree.is_connected(parent) {
                records.push(MutationRecord::ChildList {
                    target: parent,
                    added: vec![id],
                    removed: Vec::new(),
                });
            }
            id
        };
        self.emit(records);
        Ok(id)
    }

    /// Run `f` and deliver all mutation records it produces as one batch.
    ///
    /// Nested calls join the outermost batch.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn batch<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let outermost = {
            let mut pending = self.pending.lock().unwrap();
            if pending.is_some() {
                false
            } else {
                *pending = Some(Vec::new());
                true
            }
        };

        let result = f(self);

        if outermost {
            let records = self.pending.lock().unwrap().take().unwrap_or_default();
            self.publish(records);
        }
        result
    }

    /// Number of live nodes, the body included.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.tree.read().unwrap().nodes.len()
    }

    fn emit(&self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }
        {
            let mut pending = self.pending.lock().unwrap();
            if let Some(buffer) = pending.as_mut() {
                buffer.extend(records);
                return;
            }
        }
        self.publish(records);
    }

    fn publish(&self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }
        let batch = MutationBatch::new(records);
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(batch.clone()).is_ok());
    }

    fn attribute_record(tree: &Tree, target: NodeId, name: &str) -> Option<MutationRecord> {
        tree.is_connected(target)
            .then(|| MutationRecord::Attributes {
                target,
                name: name.to_owned(),
            })
    }
}

impl Document for MemoryDocument {
    fn body(&self) -> NodeId {
        self.tree.read().unwrap().body
    }

    fn contains(&self, node: NodeId) -> bool {
        self.tree.read().unwrap().nodes.contains_key(&node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.tree.read().unwrap().nodes.get(&node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree
            .read()
            .unwrap()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn element(&self, node: NodeId) -> Option<ElementInfo> {
        match &self.tree.read().unwrap().nodes.get(&node)?.content {
            Content::Element { info, .. } => Some(info.clone()),
            Content::Text(_) => None,
        }
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        let tree = self.tree.read().unwrap();
        tree.nodes.get(&node)?;
        let mut text = String::new();
        tree.collect_text(node, &mut text);
        Some(text)
    }

    fn display(&self, node: NodeId) -> Option<DisplayMode> {
        match &self.tree.read().unwrap().nodes.get(&node)?.content {
            Content::Element { display, .. } => Some(*display),
            Content::Text(_) => None,
        }
    }

    fn set_display(&self, node: NodeId, display: DisplayMode) -> Result<(), DocumentError> {
        let record = {
            let mut tree = self.tree.write().unwrap();
            let (_, current, _) = tree.element_parts_mut(node)?;
            *current = display;
            Self::attribute_record(&tree, node, "style")
        };
        self.emit(record.into_iter().collect());
        Ok(())
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), DocumentError> {
        let record = {
            let mut tree = self.tree.write().unwrap();
            let (info, _, _) = tree.element_parts_mut(node)?;
            info.attributes.insert(name.to_owned(), value.to_owned());
            Self::attribute_record(&tree, node, name)
        };
        self.emit(record.into_iter().collect());
        Ok(())
    }

    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), DocumentError> {
        let record = {
            let mut tree = self.tree.write().unwrap();
            let (info, _, _) = tree.element_parts_mut(node)?;
            if info.attributes.remove(name).is_some() {
                Self::attribute_record(&tree, node, name)
            } else {
                None
            }
        };
        self.emit(record.into_iter().collect());
        Ok(())
    }

    fn create_element(&self, spec: ElementSpec) -> NodeId {
        self.tree.write().unwrap().alloc_element(spec)
    }

    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<(), DocumentError> {
        let mut records = Vec::new();
        {
            let mut tree = self.tree.write().unwrap();
            tree.check_insertion(child, parent)?;
            tree.detach(child, &mut records);
            tree.link(parent, child, None);
            if tree.is_connected(parent) {
                records.push(MutationRecord::ChildList {
                    target: parent,
                    added: vec![child],
                    removed: Vec::new(),
                });
            }
        }
        self.emit(records);
        Ok(())
    }

    fn insert_before(&self, node: NodeId, reference: NodeId) -> Result<(), DocumentError> {
        let mut records = Vec::new();
        {
            let mut tree = self.tree.write().unwrap();
            let parent = tree
                .get(reference)?
                .parent
                .ok_or(DocumentError::Detached(reference))?;
            if node == reference {
                return Err(DocumentError::HierarchyRequest(node));
            }
            tree.check_insertion(node, parent)?;
            tree.detach(node, &mut records);
            let index = tree
                .get(parent)?
                .children
                .iter()
                .position(|child| *child == reference);
            tree.link(parent, node, index);
            if tree.is_connected(parent) {
                records.push(MutationRecord::ChildList {
                    target: parent,
                    added: vec![node],
                    removed: Vec::new(),
                });
            }
        }
        self.emit(records);
        Ok(())
    }

    fn remove(&self, node: NodeId) -> Result<(), DocumentError> {
        let mut records = Vec::new();
        {
            let mut tree = self.tree.write().unwrap();
            tree.get(node)?;
            if node == tree.body {
                return Err(DocumentError::HierarchyRequest(node));
            }
            tree.detach(node, &mut records);
            tree.drop_subtree(node);
        }
        self.emit(records);
        Ok(())
    }

    fn set_text(&self, node: NodeId, text: &str) -> Result<(), DocumentError> {
        let record = {
            let mut tree = self.tree.write().unwrap();
            tree.require_element(node)?;
            let removed = tree.clear_children(node)?;
            let (_, _, markup) = tree.element_parts_mut(node)?;
            *markup = None;
            let text_id = tree.alloc(Content::Text(text.to_owned()));
            tree.link(node, text_id, None);
            tree.is_connected(node).then(|| MutationRecord::ChildList {
                target: node,
                added: vec![text_id],
                removed,
            })
        };
        self.emit(record.into_iter().collect());
        Ok(())
    }

    fn inner_markup(&self, node: NodeId) -> Option<String> {
        match &self.tree.read().unwrap().nodes.get(&node)?.content {
            Content::Element { markup, .. } => markup.clone(),
            Content::Text(_) => None,
        }
    }

    fn set_inner_markup(&self, node: NodeId, new_markup: &str) -> Result<(), DocumentError> {
        let record = {
            let mut tree = self.tree.write().unwrap();
            tree.require_element(node)?;
            let removed = tree.clear_children(node)?;
            let (_, _, markup) = tree.element_parts_mut(node)?;
            *markup = Some(new_markup.to_owned());
            tree.is_connected(node).then(|| MutationRecord::ChildList {
                target: node,
                added: Vec::new(),
                removed,
            })
        };
        self.emit(record.into_iter().collect());
        Ok(())
    }

    fn subscribe(&self) -> MutationReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        MutationReceiver::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Selector;
    use pretty_assertions::assert_eq;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_memory_document_is_send_sync() {
        assert_send_sync::<MemoryDocument>();
    }

    #[test]
    fn test_new_has_body_only() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.element(body).unwrap().tag, "body");
        assert!(doc.children(body).is_empty());
        assert!(doc.is_connected(body));
    }

    #[test]
    fn test_append_and_text_content() {
        let doc = MemoryDocument::new();
        let pre = doc.append_element(doc.body(), ElementSpec::new("pre")).unwrap();
        let code = doc
            .append_element(pre, ElementSpec::new("code").with_text("graph TD\n"))
            .unwrap();
        doc.append_text(code, "A-->B").unwrap();

        assert_eq!(doc.parent(code), Some(pre));
        assert_eq!(doc.text_content(code).as_deref(), Some("graph TD\nA-->B"));
        assert_eq!(doc.text_content(pre).as_deref(), Some("graph TD\nA-->B"));
        assert!(doc.is_connected(code));
    }

    #[test]
    fn test_insert_before_orders_siblings() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let first = doc.append_element(body, ElementSpec::new("p")).unwrap();
        let second = doc.append_element(body, ElementSpec::new("pre")).unwrap();

        let card = doc.create_element(ElementSpec::new("div"));
        assert!(!doc.is_connected(card));
        doc.insert_before(card, second).unwrap();

        assert_eq!(doc.children(body), vec![first, card, second]);
        assert_eq!(doc.parent(card), Some(body));
    }

    #[test]
    fn test_insert_before_detached_reference() {
        let doc = MemoryDocument::new();
        let loose = doc.create_element(ElementSpec::new("pre"));
        let card = doc.create_element(ElementSpec::new("div"));
        assert_eq!(
            doc.insert_before(card, loose),
            Err(DocumentError::Detached(loose))
        );
    }

    #[test]
    fn test_hierarchy_errors() {
        let doc = MemoryDocument::new();
        let outer = doc.append_element(doc.body(), ElementSpec::new("div")).unwrap();
        let inner = doc.append_element(outer, ElementSpec::new("div")).unwrap();

        assert_eq!(
            doc.append_child(inner, outer),
            Err(DocumentError::HierarchyRequest(outer))
        );
        assert_eq!(
            doc.append_child(inner, doc.body()),
            Err(DocumentError::HierarchyRequest(doc.body()))
        );
        assert_eq!(doc.remove(doc.body()), Err(DocumentError::HierarchyRequest(doc.body())));

        let text = doc.append_text(inner, "x").unwrap();
        let orphan = doc.create_element(ElementSpec::new("span"));
        assert_eq!(
            doc.append_child(text, orphan),
            Err(DocumentError::NotAnElement(text))
        );
    }

    #[test]
    fn test_remove_drops_subtree() {
        let doc = MemoryDocument::new();
        let pre = doc.append_element(doc.body(), ElementSpec::new("pre")).unwrap();
        let code = doc
            .append_element(pre, ElementSpec::new("code").with_text("x"))
            .unwrap();

        doc.remove(pre).unwrap();

        assert!(!doc.contains(pre));
        assert!(!doc.contains(code));
        assert_eq!(doc.node_count(), 1);
        assert_eq!(doc.remove(pre), Err(DocumentError::NotFound(pre)));
    }

    #[test]
    fn test_display_and_attributes() {
        let doc = MemoryDocument::new();
        let pre = doc.append_element(doc.body(), ElementSpec::new("pre")).unwrap();

        assert_eq!(doc.display(pre), Some(DisplayMode::Default));
        doc.set_display(pre, DisplayMode::None).unwrap();
        assert_eq!(doc.display(pre), Some(DisplayMode::None));

        doc.set_attribute(pre, "data-mermaid-rendered", "true").unwrap();
        assert_eq!(
            doc.element(pre).unwrap().attribute("data-mermaid-rendered"),
            Some("true")
        );
        doc.remove_attribute(pre, "data-mermaid-rendered").unwrap();
        doc.remove_attribute(pre, "data-mermaid-rendered").unwrap();
        assert_eq!(doc.element(pre).unwrap().attribute("data-mermaid-rendered"), None);
    }

    #[test]
    fn test_set_text_and_markup() {
        let doc = MemoryDocument::new();
        let mount = doc
            .append_element(doc.body(), ElementSpec::new("div").with_text("graph TD"))
            .unwrap();

        doc.set_inner_markup(mount, "<svg></svg>").unwrap();
        assert_eq!(doc.inner_markup(mount).as_deref(), Some("<svg></svg>"));
        assert!(doc.children(mount).is_empty());
        assert_eq!(doc.text_content(mount).as_deref(), Some(""));

        doc.set_text(mount, "Hide Code").unwrap();
        assert_eq!(doc.inner_markup(mount), None);
        assert_eq!(doc.text_content(mount).as_deref(), Some("Hide Code"));
    }

    #[test]
    fn test_query_all_document_order() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let a = doc.append_element(body, ElementSpec::new("pre")).unwrap();
        let a_code = doc.append_element(a, ElementSpec::new("code")).unwrap();
        let b = doc.append_element(body, ElementSpec::new("div")).unwrap();
        let b_pre = doc.append_element(b, ElementSpec::new("pre")).unwrap();
        let b_code = doc.append_element(b_pre, ElementSpec::new("code")).unwrap();

        let code = Selector::parse("code").unwrap();
        assert_eq!(doc.query_all(body, &code), vec![a_code, b_code]);
        assert_eq!(doc.query_first(body, &code), Some(a_code));
        assert_eq!(doc.query_all(b, &code), vec![b_code]);
        assert!(doc.query_all(b_code, &code).is_empty());

        let pre = Selector::parse("pre").unwrap();
        assert_eq!(doc.closest(b_code, &pre), Some(b_pre));
        assert_eq!(doc.closest(b_pre, &pre), Some(b_pre));
        assert_eq!(doc.closest(b, &pre), None);
    }

    #[test]
    fn test_subscribe_receives_connected_additions() {
        let doc = MemoryDocument::new();
        let mut rx = doc.subscribe();

        let detached = doc.create_element(ElementSpec::new("div"));
        let child = doc.append_element(detached, ElementSpec::new("code")).unwrap();
        assert!(rx.try_recv().is_none(), "detached subtrees are not observed");

        doc.append_child(doc.body(), detached).unwrap();
        let batch = rx.try_recv().unwrap();
        assert_eq!(
            batch.records,
            vec![MutationRecord::ChildList {
                target: doc.body(),
                added: vec![detached],
                removed: Vec::new(),
            }]
        );
        assert_eq!(batch.added_nodes().collect::<Vec<_>>(), vec![detached]);

        doc.set_display(child, DisplayMode::None).unwrap();
        let batch = rx.try_recv().unwrap();
        assert_eq!(
            batch.records,
            vec![MutationRecord::Attributes {
                target: child,
                name: "style".to_owned(),
            }]
        );

        doc.remove(detached).unwrap();
        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.added_nodes().count(), 0);
    }

    #[test]
    fn test_move_records_removal_and_addition() {
        let doc = MemoryDocument::new();
        let body = doc.body();
        let left = doc.append_element(body, ElementSpec::new("div")).unwrap();
        let right = doc.append_element(body, ElementSpec::new("div")).unwrap();
        let item = doc.append_element(left, ElementSpec::new("pre")).unwrap();
        let mut rx = doc.subscribe();

        doc.append_child(right, item).unwrap();

        let batch = rx.try_recv().unwrap();
        assert_eq!(
            batch.records,
            vec![
                MutationRecord::ChildList {
                    target: left,
                    added: Vec::new(),
                    removed: vec![item],
                },
                MutationRecord::ChildList {
                    target: right,
                    added: vec![item],
                    removed: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn test_batch_delivers_once() {
        let doc = MemoryDocument::new();
        let mut rx = doc.subscribe();

        let ids = doc.batch(|doc| {
            let a = doc.append_element(doc.body(), ElementSpec::new("pre")).unwrap();
            let b = doc.batch(|doc| doc.append_element(doc.body(), ElementSpec::new("pre")).unwrap());
            vec![a, b]
        });

        let batch = rx.try_recv().unwrap();
        assert_eq!(batch.added_nodes().collect::<Vec<_>>(), ids);
        assert!(rx.try_recv().is_none());
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let doc = MemoryDocument::new();
        let rx = doc.subscribe();
        drop(rx);

        doc.append_element(doc.body(), ElementSpec::new("pre")).unwrap();
        assert!(doc.subscribers.lock().unwrap().is_empty());
    }
}
