//! Decoder → classifier pipeline for one recorded stream

use crate::config::StreamConfig;
use anyhow::Result;
use futures::Stream;
use serde::Serialize;
use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tagstream_classifier::{Analysis, ClassifierUpdate, TaggedStreamClassifier, TokioScheduler};
use tagstream_core::{FrameDecoder, FrameMetadata};
use tracing::{debug, info};

/// What one run produced
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Concatenated fragments as decoded
    pub text: String,
    /// Final streaming classification
    pub stream: ClassifierUpdate,
    /// One-shot classification of the same text
    pub one_shot: Analysis,
    /// Last finish reason seen on the wire
    pub finish_reason: Option<String>,
    /// Subscriber notifications delivered before the result was taken
    pub notifications: usize,
}

/// Decode `source`, classify it as it streams, and report the result
pub async fn run<S, B, E>(source: S, config: &StreamConfig) -> Result<Outcome>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    let scheduler = Arc::new(TokioScheduler::current()?);
    let classifier = TaggedStreamClassifier::new(config.markers.clone(), scheduler)?;

    let notifications = Arc::new(AtomicUsize::new(0));
    {
        let notifications = Arc::clone(&notifications);
        classifier.subscribe(move |update: &ClassifierUpdate| {
            notifications.fetch_add(1, Ordering::Relaxed);
            debug!(
                done = update.done,
                think_chars = update.think.chars().count(),
                content_chars = update.content.chars().count(),
                "classifier update"
            );
        });
    }

    let mut finish_reason = None;
    let feed = classifier.clone();
    let decoder = FrameDecoder::new(config.decoder.clone())?;
    let text = decoder
        .read(source, |fragment: &str, metadata: Option<&FrameMetadata>| {
            if let Some(reason) = metadata.and_then(FrameMetadata::finish_reason) {
                finish_reason = Some(reason.to_string());
            }
            if !fragment.is_empty() {
                feed.input_stream(fragment);
            }
        })
        .await?;

    // Resolved under the classifier's lock; a flush may still be running on a worker
    let stream = classifier.close();

    info!(
        chars = text.chars().count(),
        done = stream.done,
        finish_reason = finish_reason.as_deref().unwrap_or("none"),
        "stream classified"
    );

    Ok(Outcome {
        one_shot: classifier.analyze(Some(text.as_str())),
        text,
        stream,
        finish_reason,
        notifications: notifications.load(Ordering::Relaxed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn frame(content: &str) -> String {
        format!(
            "data: {}\n\n",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    #[tokio::test]
    async fn test_run_splits_think_and_content() {
        let body = [
            frame("<think>viewer wants"),
            frame(" a recap</think>"),
            frame("```markdown\n# Recap\n"),
            "data: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n".to_string(),
            "data: [DONE]\n\n".to_string(),
        ]
        .concat();
        let reads: Vec<std::result::Result<Vec<u8>, std::io::Error>> =
            vec![Ok(body.into_bytes())];

        let outcome = run(stream::iter(reads), &StreamConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.finish_reason.as_deref(), Some("stop"));
        assert_eq!(outcome.stream.think, "viewer wants a recap");
        assert_eq!(outcome.stream.content, "\n# Recap\n");
        assert!(!outcome.stream.done, "fence never closed");
        assert_eq!(outcome.one_shot.think, "viewer wants a recap");
        assert_eq!(outcome.one_shot.content, "# Recap");
    }

    #[tokio::test]
    async fn test_run_keeps_text_before_read_error() {
        let reads: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(frame("<think>plan</think>so far").into_bytes()),
            Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "body cut")),
        ];

        let outcome = run(stream::iter(reads), &StreamConfig::default())
            .await
            .unwrap();

        assert_eq!(outcome.text, "<think>plan</think>so far");
        assert_eq!(outcome.stream.think, "plan");
        assert_eq!(outcome.stream.content, "so far");
        assert!(outcome.finish_reason.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_final_result_is_complete_on_worker_threads() {
        let mut fragments = vec!["<think>".to_string()];
        fragments.extend((0..40).map(|n| format!("step {n} ")));
        fragments.push("</think>".to_string());
        fragments.extend((0..40).map(|n| format!("line {n} ")));
        // Ends on a partial marker that only the final resolution releases
        fragments.push("end <".to_string());

        let think: String = (0..40).map(|n| format!("step {n} ")).collect();
        let mut content: String = (0..40).map(|n| format!("line {n} ")).collect();
        content.push_str("end <");

        for _ in 0..20 {
            let reads: Vec<std::result::Result<Vec<u8>, std::io::Error>> = fragments
                .iter()
                .map(|f| Ok(frame(f).into_bytes()))
                .collect();

            let outcome = run(stream::iter(reads), &StreamConfig::default())
                .await
                .unwrap();

            assert!(outcome.stream.done);
            assert_eq!(outcome.stream.think, think);
            assert_eq!(outcome.stream.content, content);
        }
    }
}
