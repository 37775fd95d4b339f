//! Saves a finished diagram against its lesson.

use lessonmap_core::api::{LessonApi, Notification, Notifier};
use lessonmap_core::lesson::{LessonRequest, SaveLessonRequest, SavedLesson};
use std::sync::Arc;

pub const SAVE_SUCCESS_MESSAGE: &str = "Lesson flowchart created successfully!";
pub const SAVE_FAILURE_MESSAGE: &str = "Failed to create lesson flowchart.";

/// Sends the accumulated diagram text to `POST /lesson`.
///
/// The outcome is reported through the [`Notifier`] only; failures never
/// reach the caller.
pub struct PersistenceSave {
    api: Arc<dyn LessonApi>,
    notifier: Arc<dyn Notifier>,
}

impl PersistenceSave {
    pub fn new(api: Arc<dyn LessonApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Saves `text` for the lesson described by `request`.
    ///
    /// Returns `None` without any request when the lesson name is blank.
    pub async fn save(&self, request: &LessonRequest, text: &str) -> Option<SavedLesson> {
        if request.lesson_name.trim().is_empty() {
            tracing::debug!("[PersistenceSave] Blank lesson name, not saving");
            return None;
        }

        let body = SaveLessonRequest::from_stream_request(request, text);
        match self.api.save_lesson(&body).await {
            Ok(saved) => {
                tracing::info!(
                    "[PersistenceSave] Saved '{}' ({})",
                    request.lesson_name,
                    saved.id.as_deref().unwrap_or("no id")
                );
                if !saved.mermaid_code.is_empty() {
                    self.notifier.notify(Notification::success(SAVE_SUCCESS_MESSAGE));
                }
                Some(saved)
            }
            Err(err) => {
                tracing::error!("[PersistenceSave] Failed to save '{}': {}", request.lesson_name, err);
                self.notifier.notify(Notification::error(SAVE_FAILURE_MESSAGE));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockLessonApi, RecordingNotifier, lesson_request};
    use lessonmap_core::api::NotificationLevel;

    #[tokio::test]
    async fn test_save_sends_text_and_notifies() {
        let api = Arc::new(MockLessonApi::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let save = PersistenceSave::new(api.clone(), notifier.clone());

        let saved = save
            .save(&lesson_request("Photosynthesis"), "graph TD\nA-->B;\n")
            .await
            .unwrap();

        assert_eq!(saved.mermaid_code, "graph TD\nA-->B;\n");
        let requests = api.saved_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].lesson_name, "Photosynthesis");
        assert_eq!(requests[0].mermaid_code, "graph TD\nA-->B;\n");
        assert_eq!(
            notifier.messages(),
            vec![(NotificationLevel::Success, SAVE_SUCCESS_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_blank_name_is_not_saved() {
        let api = Arc::new(MockLessonApi::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let save = PersistenceSave::new(api.clone(), notifier.clone());

        assert!(save.save(&lesson_request("   "), "graph TD\n").await.is_none());
        assert!(api.saved_requests().is_empty());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_notified_not_returned() {
        let api = Arc::new(MockLessonApi::new().with_save_failure());
        let notifier = Arc::new(RecordingNotifier::default());
        let save = PersistenceSave::new(api, notifier.clone());

        assert!(save.save(&lesson_request("Cells"), "graph TD\n").await.is_none());
        assert_eq!(
            notifier.messages(),
            vec![(NotificationLevel::Error, SAVE_FAILURE_MESSAGE.to_string())]
        );
    }
}
