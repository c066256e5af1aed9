/// An error type for the vision-language model wrapper.
#[derive(thiserror::Error, Debug)]
pub enum VlmError {
    /// Error when downloading files from the Hugging Face hub.
    #[error(transparent)]
    FailedToLoadModel(#[from] hf_hub::api::sync::ApiError),

    /// Error raised by the tensor backend.
    #[error(transparent)]
    CandleError(#[from] candle_core::Error),

    /// Error raised by the tokenizer.
    #[error(transparent)]
    TokenizerError(#[from] tokenizers::Error),

    /// Error to decode the image.
    #[error("Failed to decode the image. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// Error to manipulate a file.
    #[error("Failed to manipulate the file. {0}")]
    IoError(#[from] std::io::Error),

    /// Error when fetching a remote image.
    #[error("Failed to fetch the image. {0}")]
    FetchError(#[from] reqwest::Error),

    /// Error when the remote server answers with a non-success status.
    #[error("Image request to {url} failed with status {status}")]
    FetchStatus {
        /// The requested url.
        url: String,
        /// The status code returned by the server.
        status: u16,
    },

    /// Error when the image url cannot be parsed.
    #[error("Invalid image url: {0}")]
    InvalidUrl(String),

    /// Error when the image file does not exist.
    #[error("Image file does not exist: {0}")]
    ImageNotFound(std::path::PathBuf),

    /// Error when the safetensors index cannot be read.
    #[error("Invalid safetensors index: {0}")]
    InvalidWeightIndex(String),

    /// Error when the tokenizer has no end of sequence token.
    #[error("Cannot find the <eos> token")]
    EosTokenNotFound,
}
