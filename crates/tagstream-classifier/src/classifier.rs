//! Streaming think/content classifier with coalesced notifications

use crate::analyze::{Analysis, Analyzer};
use crate::markers::MarkerConfig;
use crate::scheduler::FlushScheduler;
use crate::state::{ClassifierCore, ClassifierState, ClassifierUpdate};
use crate::subscription::{SubscriberRegistry, SubscriptionId};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tagstream_core::Result;

/// Splits a live fragment stream into think and content.
///
/// Cloning is cheap and every clone drives the same session. Fragments are
/// buffered by [`input_stream`](Self::input_stream); resolution and
/// notification happen in [`output_stream`](Self::output_stream). Scheduling
/// a flush supersedes any flush this instance scheduled earlier that has not
/// run yet, so a burst costs one flush even on a shared scheduler.
#[derive(Clone)]
pub struct TaggedStreamClassifier {
    shared: Arc<Shared>,
}

struct Shared {
    markers: MarkerConfig,
    analyzer: Analyzer,
    core: Mutex<ClassifierCore>,
    subscribers: Mutex<SubscriberRegistry>,
    flushing: AtomicBool,
    // Only the task carrying the latest value may flush
    generation: AtomicU64,
    scheduler: Arc<dyn FlushScheduler>,
}

/// Clears the re-entrant flag even if a subscriber panics
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TaggedStreamClassifier {
    /// Create a classifier for a marker set and a flush scheduler
    pub fn new(markers: MarkerConfig, scheduler: Arc<dyn FlushScheduler>) -> Result<Self> {
        let analyzer = Analyzer::new(&markers)?;
        Ok(Self {
            shared: Arc::new(Shared {
                markers,
                analyzer,
                core: Mutex::new(ClassifierCore::new()),
                subscribers: Mutex::new(SubscriberRegistry::new()),
                flushing: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                scheduler,
            }),
        })
    }

    /// Marker set in use
    pub fn markers(&self) -> &MarkerConfig {
        &self.shared.markers
    }

    /// Buffer a fragment and schedule a flush.
    ///
    /// Nothing is scheduled while there are no subscribers or a flush is
    /// running; the buffer is drained by the next flush either way.
    pub fn input_stream(&self, fragment: &str) {
        self.shared.core.lock().push(fragment);

        if self.shared.subscribers.lock().is_empty() || self.is_flushing() {
            return;
        }
        self.schedule_flush();
    }

    /// Declare the fragment stream finished.
    ///
    /// A partial marker still held back is released as plain text on the
    /// next flush, which is scheduled if anyone is listening.
    pub fn end_input(&self) {
        self.shared.core.lock().close_input();

        if self.shared.subscribers.lock().is_empty() || self.is_flushing() {
            return;
        }
        self.schedule_flush();
    }

    /// Declare the stream finished and return the final payload.
    ///
    /// The remaining buffer is resolved under the state lock, so the result
    /// is complete even while a scheduled flush runs on another thread.
    /// Subscribers receive the same payload from a scheduled flush.
    pub fn close(&self) -> ClassifierUpdate {
        let update = {
            let mut core = self.shared.core.lock();
            core.close_input();
            core.drain(&self.shared.markers);
            core.snapshot()
        };

        if !self.shared.subscribers.lock().is_empty() {
            self.schedule_flush();
        }
        update
    }

    /// Drain the buffer and notify every subscriber.
    ///
    /// Returns immediately if a flush is already running further up the
    /// stack.
    pub fn output_stream(&self) {
        if self
            .shared
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let _guard = FlushGuard(&self.shared.flushing);

        let update = {
            let mut core = self.shared.core.lock();
            core.drain(&self.shared.markers);
            core.snapshot()
        };
        let subscribers = self.shared.subscribers.lock().snapshot();

        metrics::counter!("tagstream_flushes_total").increment(1);
        tracing::trace!(
            done = update.done,
            think_len = update.think.len(),
            content_len = update.content.len(),
            subscribers = subscribers.len(),
            "flushing classifier"
        );

        for subscriber in subscribers {
            subscriber(&update);
        }
    }

    /// Register a callback for every flush
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ClassifierUpdate) + Send + Sync + 'static,
    {
        self.shared.subscribers.lock().insert(Arc::new(callback))
    }

    /// Remove a callback; false if the handle was unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.subscribers.lock().remove(id)
    }

    /// Number of registered callbacks
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Current payload, without draining or notifying
    pub fn snapshot(&self) -> ClassifierUpdate {
        self.shared.core.lock().snapshot()
    }

    /// Current state
    pub fn state(&self) -> ClassifierState {
        self.shared.core.lock().state()
    }

    /// Start a new session; subscribers are kept
    pub fn reset(&self) {
        self.shared.core.lock().reset();
    }

    /// One-shot split of complete text.
    ///
    /// With `None`, analyzes the text still sitting in the buffer. Never
    /// touches the streaming state.
    pub fn analyze(&self, text: Option<&str>) -> Analysis {
        match text {
            Some(text) => self.shared.analyzer.analyze(text),
            None => {
                let buffered = self.shared.core.lock().buffer().to_string();
                self.shared.analyzer.analyze(&buffered)
            }
        }
    }

    fn is_flushing(&self) -> bool {
        self.shared.flushing.load(Ordering::Acquire)
    }

    fn schedule_flush(&self) {
        let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        self.shared.scheduler.schedule(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if shared.generation.load(Ordering::Acquire) != generation {
                tracing::trace!(generation, "skipping superseded flush");
                return;
            }
            TaggedStreamClassifier { shared }.output_stream();
        }));
    }
}

impl fmt::Debug for TaggedStreamClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedStreamClassifier")
            .field("markers", &self.shared.markers)
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .field("flushing", &self.is_flushing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{ImmediateScheduler, ManualScheduler, TokioScheduler};

    fn manual() -> (TaggedStreamClassifier, Arc<ManualScheduler>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let classifier =
            TaggedStreamClassifier::new(MarkerConfig::default(), scheduler.clone()).unwrap();
        (classifier, scheduler)
    }

    fn recorder(classifier: &TaggedStreamClassifier) -> Arc<Mutex<Vec<ClassifierUpdate>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        classifier.subscribe(move |update: &ClassifierUpdate| sink.lock().push(update.clone()));
        seen
    }

    #[test]
    fn test_burst_coalesces_into_one_flush() {
        let (classifier, scheduler) = manual();
        let seen = recorder(&classifier);

        for fragment in ["<thi", "nk>hello", "</think>", "world"] {
            classifier.input_stream(fragment);
        }
        assert_eq!(scheduler.scheduled_count(), 4);
        assert!(seen.lock().is_empty());

        assert!(scheduler.run_pending());
        let updates = seen.lock();
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0],
            ClassifierUpdate {
                done: true,
                think: "hello".to_string(),
                content: "world".to_string(),
            }
        );
    }

    #[test]
    fn test_no_subscribers_means_no_schedule() {
        let (classifier, scheduler) = manual();
        classifier.input_stream("<think>a");
        assert_eq!(scheduler.scheduled_count(), 0);

        // Buffer is kept for the next flush
        let seen = recorder(&classifier);
        classifier.input_stream("</think>b");
        scheduler.run_pending();
        assert_eq!(seen.lock()[0].think, "a");
        assert_eq!(seen.lock()[0].content, "b");
    }

    #[test]
    fn test_terminal_flush_is_idempotent() {
        let (classifier, _scheduler) = manual();
        let seen = recorder(&classifier);

        classifier.input_stream("plain");
        classifier.output_stream();
        classifier.output_stream();

        let updates = seen.lock();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].done);
        assert_eq!(updates[0], updates[1]);
    }

    #[test]
    fn test_reentrant_flush_is_ignored() {
        let classifier =
            TaggedStreamClassifier::new(MarkerConfig::default(), Arc::new(ImmediateScheduler))
                .unwrap();
        let calls = Arc::new(Mutex::new(0usize));

        let inner = classifier.clone();
        let counter = Arc::clone(&calls);
        classifier.subscribe(move |_: &ClassifierUpdate| {
            *counter.lock() += 1;
            // Both of these run while the flush is still on the stack
            inner.output_stream();
            inner.input_stream(" more");
        });

        classifier.input_stream("text");
        assert_eq!(*calls.lock(), 1);

        let snapshot = classifier.snapshot();
        assert_eq!(snapshot.content, "text");
        assert!(!snapshot.done, "fragment fed mid-flush waits in the buffer");

        classifier.output_stream();
        assert_eq!(classifier.snapshot().content, "text more");
    }

    #[test]
    fn test_panicking_subscriber_releases_guard() {
        let (classifier, _scheduler) = manual();
        classifier.subscribe(|_: &ClassifierUpdate| panic!("subscriber failure"));

        classifier.input_stream("<think>x</think>y");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            classifier.output_stream();
        }));
        assert!(result.is_err());
        assert!(!classifier.is_flushing());

        let snapshot = classifier.snapshot();
        assert_eq!(snapshot.think, "x");
        assert_eq!(snapshot.content, "y");
    }

    #[test]
    fn test_unsubscribe_inside_callback() {
        let (classifier, scheduler) = manual();
        let id_slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let inner = classifier.clone();
        let slot = Arc::clone(&id_slot);
        let id = classifier.subscribe(move |_: &ClassifierUpdate| {
            if let Some(id) = slot.lock().take() {
                inner.unsubscribe(id);
            }
        });
        *id_slot.lock() = Some(id);

        classifier.input_stream("a");
        scheduler.run_pending();
        assert_eq!(classifier.subscriber_count(), 0);
    }

    #[test]
    fn test_end_input_releases_held_marker() {
        let (classifier, scheduler) = manual();
        let seen = recorder(&classifier);

        classifier.input_stream("cost < 5 and <");
        scheduler.run_pending();
        assert!(!seen.lock().last().unwrap().done);

        classifier.end_input();
        scheduler.run_pending();
        let last = seen.lock().last().cloned().unwrap();
        assert!(last.done);
        assert_eq!(last.content, "cost < 5 and <");
    }

    #[test]
    fn test_reset_keeps_subscribers() {
        let (classifier, scheduler) = manual();
        let seen = recorder(&classifier);

        classifier.input_stream("<think>first");
        scheduler.run_pending();
        classifier.reset();
        assert_eq!(classifier.state(), ClassifierState::Free);

        classifier.input_stream("second");
        scheduler.run_pending();
        let last = seen.lock().last().cloned().unwrap();
        assert_eq!(last.think, "");
        assert_eq!(last.content, "second");
    }

    #[test]
    fn test_analyze_does_not_touch_stream_state() {
        let (classifier, _scheduler) = manual();
        classifier.input_stream("<think>a</think>b");

        let analysis = classifier.analyze(None);
        assert_eq!(analysis.think, "a");
        assert_eq!(analysis.content, "b");

        let other = classifier.analyze(Some("x</think>y"));
        assert_eq!(other.think, "x");

        assert_eq!(classifier.snapshot().think, "");
        assert_eq!(classifier.state(), ClassifierState::Free);
    }

    #[test]
    fn test_dropped_classifier_skips_pending_flush() {
        let (classifier, scheduler) = manual();
        let seen = recorder(&classifier);
        classifier.input_stream("x");
        drop(classifier);

        assert!(scheduler.run_pending());
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_shared_scheduler_flushes_each_instance() {
        let scheduler = Arc::new(ManualScheduler::new());
        let first =
            TaggedStreamClassifier::new(MarkerConfig::default(), scheduler.clone()).unwrap();
        let second =
            TaggedStreamClassifier::new(MarkerConfig::default(), scheduler.clone()).unwrap();
        let first_seen = recorder(&first);
        let second_seen = recorder(&second);

        first.input_stream("hel");
        second.input_stream("world");
        first.input_stream("lo");
        assert_eq!(scheduler.pending_count(), 3);
        assert!(scheduler.run_pending());

        let first_updates = first_seen.lock();
        assert_eq!(first_updates.len(), 1);
        assert_eq!(first_updates[0].content, "hello");
        assert!(first_updates[0].done);

        let second_updates = second_seen.lock();
        assert_eq!(second_updates.len(), 1);
        assert_eq!(second_updates[0].content, "world");
    }

    #[tokio::test]
    async fn test_tokio_burst_coalesces_per_instance() {
        let scheduler = Arc::new(TokioScheduler::current().unwrap());
        let first =
            TaggedStreamClassifier::new(MarkerConfig::default(), scheduler.clone()).unwrap();
        let second = TaggedStreamClassifier::new(MarkerConfig::default(), scheduler).unwrap();
        let first_seen = recorder(&first);
        let second_seen = recorder(&second);

        for fragment in ["<think>a", "b</think>", "c"] {
            first.input_stream(fragment);
            second.input_stream(fragment);
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        for seen in [first_seen, second_seen] {
            let updates = seen.lock();
            assert_eq!(updates.len(), 1);
            assert_eq!(updates[0].think, "ab");
            assert_eq!(updates[0].content, "c");
        }
    }

    #[test]
    fn test_close_returns_final_payload_during_flush() {
        let (classifier, scheduler) = manual();
        let inner = classifier.clone();
        let closed = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&closed);
        classifier.subscribe(move |_: &ClassifierUpdate| {
            // Another feeder finishing while this flush is on the stack
            inner.input_stream(" tail <");
            *slot.lock() = Some(inner.close());
        });

        classifier.input_stream("<think>x</think>body");
        scheduler.run_pending();

        let update = closed.lock().take().unwrap();
        assert!(update.done);
        assert_eq!(update.think, "x");
        assert_eq!(update.content, "body tail <");
        assert_eq!(classifier.snapshot(), update);
    }

    #[test]
    fn test_close_schedules_final_notification() {
        let (classifier, scheduler) = manual();
        let seen = recorder(&classifier);

        classifier.input_stream("answer <");
        scheduler.run_pending();
        assert!(!seen.lock().last().unwrap().done);

        let update = classifier.close();
        assert_eq!(update.content, "answer <");
        scheduler.run_pending();
        assert_eq!(seen.lock().last().cloned().unwrap(), update);
    }
}
