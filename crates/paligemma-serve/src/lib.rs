//! HTTP serving of the PaliGemma vision-language model.
//!
//! The router exposes three inference routes backed by a single shared model:
//!
//! - `POST /predict?task=..&image=<url>`
//! - `POST /generate?task=..` with a multipart `image` upload
//! - `POST /capcha` with a multipart `image` upload
//!
//! Every successful call answers `{"output": ..}`, failures answer `{"detail": ..}`.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
pub mod upload;

use std::sync::{Arc, Mutex};

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use paligemma_vlm::{DynamicImage, ImageFetcher, ImageSource, VisionLanguageModel, VlmError};

use crate::{error::ServeError, upload::UploadStore};

/// The model shared by all requests. Calls are serialized by the lock.
pub type SharedModel = Arc<Mutex<Box<dyn VisionLanguageModel>>>;

/// State shared by the handlers.
#[derive(Clone)]
pub struct AppState {
    pub model: SharedModel,
    pub fetcher: ImageFetcher,
    pub uploads: UploadStore,
    pub api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        model: impl VisionLanguageModel + 'static,
        fetcher: ImageFetcher,
        uploads: UploadStore,
        api_key: Option<String>,
    ) -> Self {
        let model: Box<dyn VisionLanguageModel> = Box::new(model);
        Self {
            model: Arc::new(Mutex::new(model)),
            fetcher,
            uploads,
            api_key: api_key.map(Arc::from),
        }
    }

    /// Load `source`, then run `f` against the model on the blocking thread pool.
    ///
    /// The image is fetched before the model is locked, so a slow download
    /// does not hold up other requests. A panic inside `f` fails its own
    /// request only; the next caller takes the lock over.
    pub async fn infer<F>(&self, source: ImageSource, f: F) -> Result<String, ServeError>
    where
        F: FnOnce(&mut dyn VisionLanguageModel, &DynamicImage) -> Result<String, VlmError>
            + Send
            + 'static,
    {
        let model = self.model.clone();
        let fetcher = self.fetcher.clone();

        tokio::task::spawn_blocking(move || -> Result<String, ServeError> {
            let image = source.load(&fetcher)?;

            let mut guard = model.lock().unwrap_or_else(|poisoned| {
                log::warn!("a previous inference panicked, reusing the model");
                model.clear_poison();
                poisoned.into_inner()
            });
            Ok(f(&mut **guard, &image)?)
        })
        .await?
    }
}

/// Build the application router.
pub fn router(state: AppState, body_limit: usize) -> Router {
    let inference = Router::new()
        .route("/predict", post(routes::predict))
        .route("/generate", post(routes::generate))
        .route("/capcha", post(routes::captcha))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(routes::index))
        .route("/healthz", get(routes::health))
        .merge(inference)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
