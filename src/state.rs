//! Application state shared by all handlers.

use std::sync::Arc;

use crate::ai::{AvatarVideo, LanguageModel};
use crate::config::Config;
use crate::db::DbPool;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Shared database (single connection behind a mutex)
    pub db: DbPool,

    /// Immutable configuration resolved at startup
    pub config: Arc<Config>,

    /// Text and speech generation
    pub model: Arc<dyn LanguageModel>,

    /// Talking-avatar video rendering
    pub video: Arc<dyn AvatarVideo>,
}

impl AppState {
    pub fn new(
        db: DbPool,
        config: Config,
        model: Arc<dyn LanguageModel>,
        video: Arc<dyn AvatarVideo>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            model,
            video,
        }
    }

    /// Build state with the providers named in the configuration
    pub fn from_config(db: DbPool, config: Config) -> Self {
        let model = crate::ai::language_model_from_config(&config.ai);
        let video = crate::ai::avatar_video_from_config(&config.video);
        Self::new(db, config, model, video)
    }
}
