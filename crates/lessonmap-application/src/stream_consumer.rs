//! Reads a lesson stream into an accumulated diagram text.

use futures::StreamExt;
use lessonmap_core::api::{DiagramSink, LessonApi};
use lessonmap_core::lesson::LessonRequest;
use lessonmap_core::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a consumed stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamOutcome {
    /// The server closed the stream. `text` is every chunk in arrival order.
    Completed { text: String },
    /// The token fired first. Nothing further was published.
    Cancelled,
}

impl StreamOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Completed { text } => Some(text),
            Self::Cancelled => None,
        }
    }
}

/// Drives one `POST /lesson/stream` read loop.
///
/// After each chunk the accumulated text is published with `streaming = true`.
/// On normal completion it is published once more with `streaming = false`,
/// which is the only call that asks the renderer to parse.
pub struct StreamConsumer {
    api: Arc<dyn LessonApi>,
}

impl StreamConsumer {
    pub fn new(api: Arc<dyn LessonApi>) -> Self {
        Self { api }
    }

    /// Consumes the stream for `request` until it ends or `cancel` fires.
    ///
    /// # Errors
    ///
    /// `GenerationUnavailable` when the stream cannot be opened, or the
    /// read error that interrupted it. In both cases the partial text is
    /// dropped and no final publish happens.
    pub async fn consume(
        &self,
        request: &LessonRequest,
        sink: &dyn DiagramSink,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome> {
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("[StreamConsumer] Cancelled before '{}' started", request.lesson_name);
                return Ok(StreamOutcome::Cancelled);
            }
            opened = self.api.stream_lesson(request) => opened?,
        };

        let mut text = String::new();
        let mut chunks = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(
                        "[StreamConsumer] Cancelled '{}' after {} chunks",
                        request.lesson_name,
                        chunks
                    );
                    return Ok(StreamOutcome::Cancelled);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    chunks += 1;
                    text.push_str(&chunk);
                    sink.publish(&text, true);
                }
                Some(Err(err)) => {
                    tracing::warn!(
                        "[StreamConsumer] Stream for '{}' failed after {} chunks: {}",
                        request.lesson_name,
                        chunks,
                        err
                    );
                    return Err(err);
                }
                None => break,
            }
        }

        tracing::debug!(
            "[StreamConsumer] '{}' finished: {} chunks, {} bytes",
            request.lesson_name,
            chunks,
            text.len()
        );
        sink.publish(&text, false);
        Ok(StreamOutcome::Completed { text })
    }
}
