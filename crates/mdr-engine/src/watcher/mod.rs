//! Mutation-driven re-scans.
//!
//! The watcher is a two-stage pipeline:
//!
//! 1. A debounce task reads [`MutationBatch`]es from the document, keeps the
//!    ones that add diagram-bearing content, and fires a trigger once no
//!    qualifying batch has arrived for the quiet period.
//! 2. A runner task consumes triggers one at a time and runs a pass.
//!
//! The trigger channel holds a single slot, so while a pass is running at most
//! one further pass is queued; later triggers fold into it.

mod debouncer;

use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use mdr_document::{Document, MutationBatch, MutationReceiver, Selector};
use mdr_render::consts::{DEFAULT_DEBOUNCE, DEFAULT_WATCH_SELECTORS};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use self::debouncer::TriggerDebouncer;

static DEFAULT_WATCH_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&DEFAULT_WATCH_SELECTORS.join(", ")).expect("invalid default watch selector")
});

/// Change watcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Whether the watcher is started at all.
    pub enabled: bool,
    /// Quiet period after the last qualifying batch.
    pub debounce: Duration,
    /// Selector tested against added elements and their descendants.
    pub watch_selector: Selector,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce: DEFAULT_DEBOUNCE,
            watch_selector: DEFAULT_WATCH_SELECTOR.clone(),
        }
    }
}

/// Decides which mutations warrant a re-scan and debounces them.
#[derive(Debug, Clone)]
pub struct ChangeWatcher {
    watch_selector: Selector,
    debounce: Duration,
}

impl ChangeWatcher {
    #[must_use]
    pub fn new(options: &WatcherOptions) -> Self {
        Self {
            watch_selector: options.watch_selector.clone(),
            debounce: options.debounce,
        }
    }

    /// Whether `batch` adds an element that matches, or contains a match for,
    /// the watch selector. Removals and attribute changes never qualify.
    pub fn is_relevant(&self, document: &dyn Document, batch: &MutationBatch) -> bool {
        batch.added_nodes().any(|node| {
            document.is_element(node)
                && (document.matches(node, &self.watch_selector)
                    || document.query_first(node, &self.watch_selector).is_some())
        })
    }

    /// Start watching `mutations`, calling `on_trigger` for each debounced trigger.
    ///
    /// Watching stops when the returned handle is dropped or the document
    /// stops publishing. A pass already running is allowed to finish.
    pub fn spawn<F, Fut>(
        self,
        document: Arc<dyn Document>,
        mutations: MutationReceiver,
        on_trigger: F,
    ) -> WatcherHandle
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);

        let runner = tokio::spawn(async move {
            while trigger_rx.recv().await.is_some() {
                on_trigger().await;
            }
        });
        let debounce = tokio::spawn(self.debounce_loop(document, mutations, trigger_tx));

        WatcherHandle { debounce, runner }
    }

    async fn debounce_loop(
        self,
        document: Arc<dyn Document>,
        mut mutations: MutationReceiver,
        triggers: mpsc::Sender<()>,
    ) {
        let mut debouncer = TriggerDebouncer::new(self.debounce);

        loop {
            let deadline = debouncer.deadline();
            let timer = async move {
                match deadline {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                batch = mutations.recv() => {
                    let Some(batch) = batch else {
                        tracing::debug!("Mutation channel closed, stopping watcher");
                        break;
                    };
                    if self.is_relevant(document.as_ref(), &batch) {
                        tracing::debug!(records = batch.records.len(), "Relevant mutation, scheduling re-scan");
                        debouncer.record(Instant::now());
                    }
                }
                () = timer => {
                    if !debouncer.take_ready(Instant::now()) {
                        continue;
                    }
                    match triggers.try_send(()) {
                        Ok(()) => tracing::debug!("Quiet period elapsed, triggering re-scan"),
                        Err(TrySendError::Full(())) => tracing::debug!("Re-scan already queued"),
                        Err(TrySendError::Closed(())) => break,
                    }
                }
            }
        }
    }
}

/// Running change watcher.
///
/// Dropping the handle stops mutation processing; a pass in flight completes.
#[derive(Debug)]
pub struct WatcherHandle {
    debounce: JoinHandle<()>,
    runner: JoinHandle<()>,
}

impl WatcherHandle {
    /// Whether both watcher tasks have exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.debounce.is_finished() && self.runner.is_finished()
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        // The runner exits on its own once the trigger sender is gone.
        self.debounce.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use mdr_document::{ElementSpec, MemoryDocument, MutationRecord, NodeId};
    use pretty_assertions::assert_eq;

    fn watcher() -> ChangeWatcher {
        ChangeWatcher::new(&WatcherOptions::default())
    }

    fn added(target: NodeId, node: NodeId) -> MutationBatch {
        MutationBatch::new(vec![MutationRecord::ChildList {
            target,
            added: vec![node],
            removed: Vec::new(),
        }])
    }

    #[test]
    fn test_added_matching_element_is_relevant() {
        let doc = MemoryDocument::new();
        let block = doc
            .append_element(doc.body(), ElementSpec::new("div").with_class("code-block"))
            .unwrap();

        assert!(watcher().is_relevant(&doc, &added(doc.body(), block)));
    }

    #[test]
    fn test_added_subtree_with_match_is_relevant() {
        let doc = MemoryDocument::new();
        let section = doc
            .append_element(doc.body(), ElementSpec::new("section"))
            .unwrap();
        let pre = doc.append_element(section, ElementSpec::new("pre")).unwrap();
        doc.append_element(pre, ElementSpec::new("code").with_class("language-text"))
            .unwrap();

        assert!(watcher().is_relevant(&doc, &added(doc.body(), section)));
    }

    #[test]
    fn test_added_plain_pre_code_is_relevant() {
        let doc = MemoryDocument::new();
        let pre = doc.create_element(ElementSpec::new("pre"));
        doc.append_child(pre, doc.create_element(ElementSpec::new("code").with_text("graph TD")))
            .unwrap();
        doc.append_child(doc.body(), pre).unwrap();

        assert!(watcher().is_relevant(&doc, &added(doc.body(), pre)));
    }

    #[test]
    fn test_unrelated_additions_are_ignored() {
        let doc = MemoryDocument::new();
        let para = doc
            .append_element(doc.body(), ElementSpec::new("p").with_text("hello"))
            .unwrap();
        let text = doc.children(para)[0];

        assert!(!watcher().is_relevant(&doc, &added(doc.body(), para)));
        assert!(!watcher().is_relevant(&doc, &added(para, text)));
    }

    #[test]
    fn test_removals_and_attributes_are_ignored() {
        let doc = MemoryDocument::new();
        let block = doc
            .append_element(doc.body(), ElementSpec::new("div").with_class("code-block"))
            .unwrap();
        let batch = MutationBatch::new(vec![
            MutationRecord::ChildList {
                target: doc.body(),
                added: Vec::new(),
                removed: vec![block],
            },
            MutationRecord::Attributes {
                target: block,
                name: "class".to_owned(),
            },
        ]);

        assert!(!watcher().is_relevant(&doc, &batch));
    }

    #[test]
    fn test_default_options() {
        let options = WatcherOptions::default();
        assert!(options.enabled);
        assert_eq!(options.debounce, Duration::from_millis(500));
        assert_eq!(
            options.watch_selector.as_str(),
            r#"code.language-text, code[class*="language-"], pre code, .code-block, pre"#
        );
    }

    fn counting_watcher(doc: &Arc<MemoryDocument>) -> (WatcherHandle, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let handle = watcher().spawn(
            Arc::clone(doc) as Arc<dyn Document>,
            doc.subscribe(),
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            },
        );
        (handle, count)
    }

    fn add_code_block(doc: &MemoryDocument) {
        doc.append_element(doc.body(), ElementSpec::new("div").with_class("code-block"))
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_trigger() {
        let doc = Arc::new(MemoryDocument::new());
        let (_handle, count) = counting_watcher(&doc);

        for _ in 0..5 {
            add_code_block(&doc);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // Last batch at 400ms, trigger due at 900ms.
        tokio::time::sleep(Duration::from_millis(399)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_trigger_separately() {
        let doc = Arc::new(MemoryDocument::new());
        let (_handle, count) = counting_watcher(&doc);

        add_code_block(&doc);
        tokio::time::sleep(Duration::from_millis(600)).await;
        add_code_block(&doc);
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrelevant_batches_never_trigger() {
        let doc = Arc::new(MemoryDocument::new());
        let (_handle, count) = counting_watcher(&doc);

        doc.append_element(doc.body(), ElementSpec::new("p"))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_watching() {
        let doc = Arc::new(MemoryDocument::new());
        let (handle, count) = counting_watcher(&doc);
        drop(handle);

        add_code_block(&doc);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_channel_finishes_watcher() {
        let doc = Arc::new(MemoryDocument::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = watcher().spawn(
            Arc::clone(&doc) as Arc<dyn Document>,
            MutationReceiver::new(rx),
            || async {},
        );
        drop(tx);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(handle.is_finished());
    }
}
