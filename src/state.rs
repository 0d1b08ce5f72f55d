//! Shared application state for all routes. The model registry is immutable once built.

use crate::config::{Model, ModelRegistry};
use crate::error::AppError;
use crate::fields::{FileStore, LocalFileStore, Renderer, TeraRenderer};
use crate::settings::Settings;
use crate::sql::Dialect;
use sqlx::AnyPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: AnyPool,
    pub dialect: Dialect,
    pub models: Arc<ModelRegistry>,
    pub renderer: Arc<dyn Renderer>,
    pub files: Arc<dyn FileStore>,
    pub title: String,
}

impl AppState {
    /// State with the Tera renderer and a local file store rooted at the configured upload directory.
    pub fn new(pool: AnyPool, models: ModelRegistry, settings: &Settings) -> Result<Self, AppError> {
        Ok(AppState {
            pool,
            dialect: settings.dialect(),
            models: Arc::new(models),
            renderer: Arc::new(TeraRenderer::new()?),
            files: Arc::new(LocalFileStore::new(settings.upload_root.clone())),
            title: settings.title.clone(),
        })
    }

    pub fn model(&self, slug: &str) -> Result<&Model, AppError> {
        self.models
            .get(slug)
            .ok_or_else(|| AppError::NotFound(format!("model {}", slug)))
    }
}
