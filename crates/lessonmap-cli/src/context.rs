use crate::notifier::ConsoleNotifier;
use anyhow::Result;
use lessonmap_application::{AuthUseCase, LessonUseCase, NodeContentCache};
use lessonmap_core::api::Notifier;
use lessonmap_core::config::{ClientConfig, ConfigOverrides};
use lessonmap_infrastructure::{
    ConfigService, ContentStore, LessonMapPaths, SessionStorage,
};
use lessonmap_interaction::HttpLessonApi;
use std::sync::Arc;

/// Everything a server command needs, wired from the resolved configuration.
pub struct AppContext {
    pub paths: LessonMapPaths,
    pub config: ClientConfig,
    pub api: Arc<HttpLessonApi>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppContext {
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let paths = LessonMapPaths::resolve()?;
        let config = ConfigService::new(&paths).resolve(overrides)?;
        tracing::debug!("[Config] Using lesson server at {}", config.base_url());

        Ok(Self {
            api: Arc::new(HttpLessonApi::new(config.base_url())),
            notifier: Arc::new(ConsoleNotifier),
            paths,
            config,
        })
    }

    pub fn auth(&self) -> AuthUseCase {
        AuthUseCase::new(
            self.api.clone(),
            SessionStorage::new(&self.paths),
            self.notifier.clone(),
            self.config.base_url(),
        )
    }

    pub fn content_store(&self) -> ContentStore {
        let dir = self
            .config
            .store_dir
            .clone()
            .unwrap_or_else(|| self.paths.content_store_dir());
        ContentStore::new(dir)
    }

    pub fn node_content(&self) -> NodeContentCache {
        NodeContentCache::new(self.api.clone(), self.notifier.clone())
            .with_persistent(Arc::new(self.content_store()))
    }

    /// A lesson use case for the signed-in user, seeded with the configured
    /// model and grade.
    pub fn lessons(&self) -> Result<LessonUseCase> {
        let session = self.auth().require_session()?;
        let usecase = LessonUseCase::new(
            session.user_id,
            self.api.clone(),
            Arc::new(self.node_content()),
            self.notifier.clone(),
        );
        usecase.set_model(Some(self.config.default_model.clone()));
        usecase.set_grade(self.config.default_grade.clone());
        Ok(usecase)
    }
}
