//! TagStream Classifier
//!
//! Separates streamed LLM output into reasoning ("think") and deliverable
//! ("content") text.
//!
//! - [`ClassifierCore`]: the owned state machine and its step function
//! - [`TaggedStreamClassifier`]: shared handle that buffers fragments,
//!   coalesces flushes through a [`FlushScheduler`] and notifies subscribers
//! - [`Analyzer`]: one-shot extraction when the whole text is known
//!
//! ```
//! use std::sync::Arc;
//! use tagstream_classifier::{ImmediateScheduler, MarkerConfig, TaggedStreamClassifier};
//!
//! let classifier =
//!     TaggedStreamClassifier::new(MarkerConfig::default(), Arc::new(ImmediateScheduler)).unwrap();
//! classifier.subscribe(|update| println!("think={} content={}", update.think, update.content));
//! for fragment in ["<thi", "nk>hello", "</think>", "world"] {
//!     classifier.input_stream(fragment);
//! }
//! assert_eq!(classifier.snapshot().content, "world");
//! ```

pub mod analyze;
pub mod classifier;
pub mod markers;
pub mod scheduler;
pub mod state;
pub mod subscription;

pub use analyze::{Analysis, Analyzer};
pub use classifier::TaggedStreamClassifier;
pub use markers::MarkerConfig;
pub use scheduler::{FlushScheduler, FlushTask, ImmediateScheduler, ManualScheduler, TokioScheduler};
pub use state::{ClassifierCore, ClassifierState, ClassifierUpdate};
pub use subscription::{SubscriberRegistry, Subscriber, SubscriptionId};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::classifier::TaggedStreamClassifier;
    pub use crate::markers::MarkerConfig;
    pub use crate::scheduler::FlushScheduler;
    pub use crate::state::{ClassifierState, ClassifierUpdate};
}
