#![deny(missing_docs)]
//! # PaliGemma vision-language model wrapper
//!
//! Loads Google's PaliGemma checkpoints with `candle` and answers a text prompt
//! about an image given by url or by local path.
//!
//! The [`VisionLanguageModel`] trait is the seam used by the serving layer: it
//! only requires [`VisionLanguageModel::generate`], and provides
//! [`VisionLanguageModel::answer`] plus the `run_*` operations which load the
//! image and uppercase the answer.

/// Error types for the model wrapper.
pub mod error;

/// Image loading from local files, memory buffers and urls.
pub mod io;

/// PaliGemma model integration.
pub mod paligemma;

mod utils;

use std::path::Path;

pub use error::VlmError;
pub use image::DynamicImage;
pub use io::{load_image_bytes, load_image_path, ImageFetcher, ImageSource};
pub use paligemma::{Paligemma, PaligemmaConfig};

/// A model generating text from an image and a prompt.
pub trait VisionLanguageModel: Send {
    /// Generate the raw continuation for `prompt` about `image`.
    fn generate(&mut self, prompt: &str, image: &DynamicImage) -> Result<String, VlmError>;

    /// Answer `prompt` about an already loaded image, uppercased.
    fn answer(&mut self, prompt: &str, image: &DynamicImage) -> Result<String, VlmError> {
        Ok(self.generate(prompt, image)?.to_uppercase())
    }

    /// Fetch the image at `url` and answer `prompt` about it, uppercased.
    fn run_url(
        &mut self,
        prompt: &str,
        url: &str,
        fetcher: &ImageFetcher,
    ) -> Result<String, VlmError> {
        let image = fetcher.fetch(url)?;
        self.answer(prompt, &image)
    }

    /// Read the image at `path` and answer `prompt` about it, uppercased.
    fn run_path(&mut self, prompt: &str, path: &Path) -> Result<String, VlmError> {
        let image = load_image_path(path)?;
        self.answer(prompt, &image)
    }

    /// Dispatch on the image source.
    fn run(
        &mut self,
        prompt: &str,
        source: &ImageSource,
        fetcher: &ImageFetcher,
    ) -> Result<String, VlmError> {
        match source {
            ImageSource::Url(url) => self.run_url(prompt, url, fetcher),
            ImageSource::Path(path) => self.run_path(prompt, path),
        }
    }
}

impl<M: VisionLanguageModel + ?Sized> VisionLanguageModel for Box<M> {
    fn generate(&mut self, prompt: &str, image: &DynamicImage) -> Result<String, VlmError> {
        (**self).generate(prompt, image)
    }
}
