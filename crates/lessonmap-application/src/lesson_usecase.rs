//! Lesson view state and the operations a user performs on it.

use crate::node_content::NodeContentCache;
use crate::persistence_save::PersistenceSave;
use crate::stream_consumer::{StreamConsumer, StreamOutcome};
use lessonmap_core::api::{DiagramSink, LessonApi, Notification, Notifier};
use lessonmap_core::diagram::{DiagramRenderer, NodeRef, RenderOutcome, extract_node_labels};
use lessonmap_core::generation::{GenerationEvent, GenerationState};
use lessonmap_core::lesson::{Grade, Lesson, LessonRequest, Model};
use lessonmap_core::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;

pub const GENERATION_FAILURE_MESSAGE: &str = "Failed to generate lesson flowchart. Please try again.";
pub const GENERATION_CANCELLED_MESSAGE: &str = "Lesson generation cancelled.";
pub const LESSON_LOAD_FAILURE_MESSAGE: &str = "Failed to load lesson.";
pub const DELETE_FAILURE_MESSAGE: &str = "Failed to delete lesson.";
pub const CLEAR_HISTORY_FAILURE_MESSAGE: &str = "Failed to clear history.";

/// Everything one lesson screen shows.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonView {
    /// Topic typed by the user; doubles as the lesson name.
    pub prompt: String,
    pub model: Option<String>,
    pub grade: String,
    /// Accumulated diagram text.
    pub diagram: String,
    /// Latest render of `diagram`.
    pub render: Option<RenderOutcome>,
    pub state: GenerationState,
    pub selected_node: Option<NodeRef>,
    pub subtopic_content: Option<String>,
    pub loading_content: bool,
    /// Saved lessons, oldest first.
    pub history: Vec<Lesson>,
}

impl Default for LessonView {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            model: None,
            grade: Grade::default().to_string(),
            diagram: String::new(),
            render: None,
            state: GenerationState::default(),
            selected_node: None,
            subtopic_content: None,
            loading_content: false,
            history: Vec::new(),
        }
    }
}

impl LessonView {
    fn clear_diagram(&mut self) {
        self.diagram.clear();
        self.render = None;
        self.selected_node = None;
        self.subtopic_content = None;
    }

    /// Shows a saved lesson. Blank fields keep their current value.
    fn restore(&mut self, lesson: &Lesson, renderer: &DiagramRenderer) {
        if !lesson.title.is_empty() {
            self.prompt = lesson.title.clone();
        }
        if !lesson.diagram.is_empty() {
            self.diagram = lesson.diagram.clone();
            self.render = Some(renderer.render(&self.diagram, false));
            self.model = lesson.model_used.clone().filter(|m| !m.trim().is_empty());
            self.grade = Grade::or_default(lesson.grade.as_deref());
        }
        self.selected_node = None;
        self.subtopic_content = None;
    }

    /// Looks `node_id` up in the rendered diagram, or scans the raw text when
    /// nothing was rendered.
    fn find_node(&self, node_id: &str) -> Option<NodeRef> {
        match &self.render {
            Some(RenderOutcome::Rendered(diagram)) => diagram.click(node_id),
            _ => extract_node_labels(&self.diagram)
                .into_iter()
                .find(|node| node.id == node_id),
        }
    }
}

/// The generation currently allowed to write into the view.
///
/// `cancel` is a child of the caller's token. Opening, deleting or starting
/// a new lesson cancels it and drops the entry, so a stream that is still
/// running can tell it no longer owns the view.
#[derive(Debug, Clone)]
struct ActiveGeneration {
    id: u64,
    cancel: CancellationToken,
}

/// Keeps the view's diagram in step with the stream and forwards to the UI.
struct ViewSink<'a> {
    view: &'a RwLock<LessonView>,
    renderer: &'a DiagramRenderer,
    outer: &'a dyn DiagramSink,
    cancel: &'a CancellationToken,
}

impl DiagramSink for ViewSink<'_> {
    fn publish(&self, text: &str, streaming: bool) {
        let outcome = self.renderer.render(text, streaming);
        {
            let mut view = self.view.write().unwrap_or_else(|e| e.into_inner());
            // checked under the view lock; interrupting cancels before resetting the view
            if self.cancel.is_cancelled() {
                return;
            }
            view.diagram = text.to_string();
            view.render = Some(outcome);
        }
        self.outer.publish(text, streaming);
    }
}

/// Use case for the lesson screen.
///
/// Owns the [`LessonView`] and drives generation, node drill-down and the
/// lesson history. Failures are turned into notifications; only misuse of
/// the generation lifecycle is returned as an error.
pub struct LessonUseCase {
    user_id: String,
    api: Arc<dyn LessonApi>,
    consumer: StreamConsumer,
    saver: PersistenceSave,
    content: Arc<NodeContentCache>,
    renderer: DiagramRenderer,
    notifier: Arc<dyn Notifier>,
    view: RwLock<LessonView>,
    active: Mutex<Option<ActiveGeneration>>,
    next_generation: AtomicU64,
}

impl LessonUseCase {
    pub fn new(
        user_id: impl Into<String>,
        api: Arc<dyn LessonApi>,
        content: Arc<NodeContentCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            consumer: StreamConsumer::new(api.clone()),
            saver: PersistenceSave::new(api.clone(), notifier.clone()),
            api,
            content,
            renderer: DiagramRenderer::new(),
            notifier,
            view: RwLock::new(LessonView::default()),
            active: Mutex::new(None),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn content_cache(&self) -> &Arc<NodeContentCache> {
        &self.content
    }

    /// A snapshot of the current view.
    pub fn view(&self) -> LessonView {
        self.read_view().clone()
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.write_view().prompt = prompt.into();
    }

    pub fn set_model(&self, model: Option<String>) {
        self.write_view().model = model.filter(|m| !m.trim().is_empty());
    }

    pub fn set_grade(&self, grade: impl Into<String>) {
        let grade = grade.into();
        self.write_view().grade = Grade::or_default(Some(grade.as_str()));
    }

    /// Streams a new diagram for the current prompt.
    ///
    /// Returns the state the lesson ended in: `rendered` or `parse_failed`
    /// (or `saved` when `save` is set and the save went through), or `idle`
    /// after a connection failure or cancellation. A generation interrupted
    /// by opening, deleting or starting another lesson stops quietly and
    /// returns the state that lesson left behind.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` when a generation is already streaming.
    pub async fn generate(
        &self,
        sink: &dyn DiagramSink,
        cancel: &CancellationToken,
        save: bool,
    ) -> Result<GenerationState> {
        let (request, generation) = {
            let mut view = self.write_view();
            view.state = view.state.transition(GenerationEvent::Start)?;
            view.clear_diagram();
            let request = LessonRequest {
                lesson_name: view.prompt.clone(),
                model: view
                    .model
                    .clone()
                    .unwrap_or_else(|| Model::default().to_string()),
                user_id: self.user_id.clone(),
                grade: view.grade.clone(),
            };
            (request, self.begin_generation(cancel))
        };

        tracing::info!(
            "[LessonUseCase] Generating '{}' with {} (grade {})",
            request.lesson_name,
            request.model,
            request.grade
        );

        let result = self.run_generation(&request, &generation, sink, save).await;
        self.end_generation(generation.id);
        result
    }

    async fn run_generation(
        &self,
        request: &LessonRequest,
        generation: &ActiveGeneration,
        sink: &dyn DiagramSink,
        save: bool,
    ) -> Result<GenerationState> {
        let view_sink = ViewSink {
            view: &self.view,
            renderer: &self.renderer,
            outer: sink,
            cancel: &generation.cancel,
        };

        let outcome = self
            .consumer
            .consume(request, &view_sink, &generation.cancel)
            .await;

        if !self.is_current(generation.id) {
            tracing::info!(
                "[LessonUseCase] Generation of '{}' interrupted by a lesson change",
                request.lesson_name
            );
            return Ok(self.read_view().state);
        }

        let text = match outcome {
            Ok(StreamOutcome::Completed { text }) => text,
            Ok(StreamOutcome::Cancelled) => {
                self.notifier.notify(Notification::info(GENERATION_CANCELLED_MESSAGE));
                return self.abandon(generation.id, GenerationEvent::Cancelled);
            }
            Err(err) => {
                tracing::error!("[LessonUseCase] Generation failed: {}", err);
                self.notifier.notify(Notification::error(GENERATION_FAILURE_MESSAGE));
                return self.abandon(generation.id, GenerationEvent::ConnectionFailed);
            }
        };

        let parse_error = {
            let mut view = self.write_view();
            if !self.is_current(generation.id) {
                return Ok(view.state);
            }
            let parse_error = match &view.render {
                Some(RenderOutcome::Failed { message }) => Some(message.clone()),
                _ => None,
            };
            let parsed = parse_error.is_none();
            view.state = view
                .state
                .transition(GenerationEvent::StreamFinished { parsed })?;
            parse_error
        };

        if let Some(message) = parse_error {
            self.notifier
                .notify(Notification::error(format!("Could not render diagram: {message}")));
        }

        if save && self.saver.save(request, &text).await.is_some() {
            let mut view = self.write_view();
            if self.is_current(generation.id) {
                view.state = view.state.transition(GenerationEvent::Saved)?;
            }
        }

        Ok(self.read_view().state)
    }

    /// Drops whatever was streamed and returns to idle.
    fn abandon(&self, id: u64, event: GenerationEvent) -> Result<GenerationState> {
        let mut view = self.write_view();
        if !self.is_current(id) {
            return Ok(view.state);
        }
        view.clear_diagram();
        view.state = view.state.transition(event)?;
        Ok(view.state)
    }

    fn begin_generation(&self, cancel: &CancellationToken) -> ActiveGeneration {
        let generation = ActiveGeneration {
            id: self.next_generation.fetch_add(1, Ordering::Relaxed),
            cancel: cancel.child_token(),
        };
        *self.lock_active() = Some(generation.clone());
        generation
    }

    fn end_generation(&self, id: u64) {
        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|current| current.id == id) {
            *active = None;
        }
    }

    fn is_current(&self, id: u64) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|current| current.id == id)
    }

    /// Stops a running generation before the view is taken over by another
    /// lesson. Must run before the view is reset.
    fn interrupt_generation(&self) {
        if let Some(generation) = self.lock_active().take() {
            tracing::debug!("[LessonUseCase] Interrupting generation {}", generation.id);
            generation.cancel.cancel();
        }
    }

    /// Handles a click on `node_id`, returning the content shown for it.
    ///
    /// `None` when the diagram has no such node.
    pub async fn select_node(&self, node_id: &str) -> Option<String> {
        let (node, lesson_name, model, grade) = {
            let mut view = self.write_view();
            let Some(node) = view.find_node(node_id) else {
                tracing::debug!("[LessonUseCase] No node '{}' in the current diagram", node_id);
                return None;
            };
            view.selected_node = Some(node.clone());
            view.loading_content = true;
            (node, view.prompt.clone(), view.model.clone(), view.grade.clone())
        };

        let content = self
            .content
            .resolve(&lesson_name, &node, model.as_deref(), Some(grade.as_str()))
            .await;

        let mut view = self.write_view();
        // a later click may have replaced the selection while this one loaded
        if view.selected_node.as_ref() == Some(&node) {
            view.loading_content = false;
            view.subtopic_content = Some(content.clone());
        }
        Some(content)
    }

    /// Loads a saved lesson into the view.
    pub async fn open_lesson(&self, lesson_id: &str) -> Option<Lesson> {
        match self.api.get_lesson(lesson_id, &self.user_id).await {
            Ok(lesson) => {
                self.interrupt_generation();
                let mut view = self.write_view();
                view.restore(&lesson, &self.renderer);
                view.state = view.state.transition(GenerationEvent::Reset).unwrap_or_default();
                tracing::info!("[LessonUseCase] Opened lesson '{}' ({})", lesson.title, lesson.id);
                Some(lesson)
            }
            Err(err) => {
                tracing::error!("[LessonUseCase] Failed to load lesson {}: {}", lesson_id, err);
                self.notifier.notify(Notification::error(LESSON_LOAD_FAILURE_MESSAGE));
                None
            }
        }
    }

    /// Clears the prompt, diagram and selection for a fresh lesson.
    pub fn new_lesson(&self) {
        self.interrupt_generation();
        let mut view = self.write_view();
        view.prompt.clear();
        view.model = None;
        view.clear_diagram();
        view.state = GenerationState::Idle;
    }

    /// Deletes one saved lesson. The diagram on screen is cleared.
    pub async fn delete_lesson(&self, lesson_id: &str) -> bool {
        match self.api.delete_lesson(lesson_id, &self.user_id).await {
            Ok(()) => {
                self.interrupt_generation();
                let mut view = self.write_view();
                view.history.retain(|lesson| lesson.id != lesson_id);
                view.clear_diagram();
                view.state = GenerationState::Idle;
                tracing::info!("[LessonUseCase] Deleted lesson {}", lesson_id);
                true
            }
            Err(err) => {
                tracing::error!("[LessonUseCase] Failed to delete lesson {}: {}", lesson_id, err);
                self.notifier.notify(Notification::error(DELETE_FAILURE_MESSAGE));
                false
            }
        }
    }

    /// Deletes every saved lesson of the user.
    ///
    /// Only the history goes; cached subtopic content is left alone.
    pub async fn clear_history(&self) -> bool {
        match self.api.clear_history(&self.user_id).await {
            Ok(()) => {
                self.write_view().history.clear();
                tracing::info!("[LessonUseCase] Cleared lesson history");
                true
            }
            Err(err) => {
                tracing::error!("[LessonUseCase] Failed to clear history: {}", err);
                self.notifier.notify(Notification::error(CLEAR_HISTORY_FAILURE_MESSAGE));
                false
            }
        }
    }

    /// Reloads the history and shows the most recent lesson.
    pub async fn refresh_history(&self) -> Option<Vec<Lesson>> {
        match self.api.list_lessons(&self.user_id).await {
            Ok(lessons) => {
                let mut view = self.write_view();
                match lessons.last() {
                    Some(last) => {
                        view.prompt = last.title.clone();
                        view.diagram = last.diagram.clone();
                        view.render = (!last.diagram.is_empty())
                            .then(|| self.renderer.render(&last.diagram, false));
                        view.model = last.model_used.clone().filter(|m| !m.trim().is_empty());
                        view.grade = Grade::or_default(last.grade.as_deref());
                    }
                    None => {
                        view.prompt.clear();
                        view.model = None;
                        view.grade = Grade::default().to_string();
                        view.clear_diagram();
                    }
                }
                view.history = lessons.clone();
                tracing::debug!("[LessonUseCase] Loaded {} lessons", lessons.len());
                Some(lessons)
            }
            Err(err) => {
                tracing::error!("[LessonUseCase] Failed to load history: {}", err);
                None
            }
        }
    }

    fn read_view(&self) -> RwLockReadGuard<'_, LessonView> {
        self.view.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_view(&self) -> RwLockWriteGuard<'_, LessonView> {
        self.view.write().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveGeneration>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}
