use std::path::PathBuf;

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use paligemma_vlm::ImageSource;
use serde::{Deserialize, Serialize};

use crate::{error::ServeError, upload::UploadStore, AppState};

/// Prompts sent in order for a captcha image.
pub const CAPTCHA_PROMPTS: [&str; 2] = [
    "ocr",
    "answer en what are the characters in this captcha?",
];

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    task: String,
    image: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    task: String,
}

/// Body of every successful inference response.
#[derive(Debug, Serialize)]
pub struct Output {
    pub output: String,
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
}

pub async fn index() -> &'static str {
    "Welcome to PaliGemma serve!"
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

/// `POST /predict?task=..&image=<url>`
pub async fn predict(
    State(state): State<AppState>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<Output>, ServeError> {
    log::info!("predict task={:?} image={}", query.task, query.image);

    let output = state
        .infer(ImageSource::Url(query.image), move |model, image| {
            model.answer(&query.task, image)
        })
        .await?;

    log::info!("predict output={output:?}");
    Ok(Json(Output { output }))
}

/// `POST /generate?task=..` with a multipart `image` upload.
pub async fn generate(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
    multipart: Multipart,
) -> Result<Json<Output>, ServeError> {
    let path = save_image(&state.uploads, multipart).await?;
    log::info!("generate task={:?} image={}", query.task, path.display());

    let output = state
        .infer(ImageSource::Path(path), move |model, image| {
            model.answer(&query.task, image)
        })
        .await?;

    log::info!("generate output={output:?}");
    Ok(Json(Output { output }))
}

/// `POST /capcha` with a multipart `image` upload.
///
/// Reads the characters with the `ocr` task first, then asks for them
/// explicitly; the second answer wins unless it is empty.
pub async fn captcha(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Output>, ServeError> {
    let path = save_image(&state.uploads, multipart).await?;
    log::info!("capcha image={}", path.display());

    let output = state
        .infer(ImageSource::Path(path), |model, image| {
            let read = model.answer(CAPTCHA_PROMPTS[0], image)?;
            let answer = model.answer(CAPTCHA_PROMPTS[1], image)?;
            log::debug!("capcha ocr={read:?} answer={answer:?}");

            Ok(if answer.trim().is_empty() { read } else { answer })
        })
        .await?;

    log::info!("capcha output={output:?}");
    Ok(Json(Output { output }))
}

// store the `image` field, or the first file field, of the form
async fn save_image(store: &UploadStore, mut multipart: Multipart) -> Result<PathBuf, ServeError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") && field.file_name().is_none() {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(store.save(file_name.as_deref(), &bytes).await?);
    }

    Err(ServeError::MissingImage)
}
