mod generation;
mod preprocessor;

pub use preprocessor::{Preprocessor, IMAGE_SIZE};

use std::path::PathBuf;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::paligemma::{Config, Model};
use generation::TextGeneration;
use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
use image::DynamicImage;
use tokenizers::Tokenizer;

use crate::{error::VlmError, utils::hub_load_safetensors, VisionLanguageModel};

/// Configuration for the Paligemma model
#[derive(Clone, Debug)]
pub struct PaligemmaConfig {
    /// Hugging Face repository of a 224 PaliGemma checkpoint.
    pub model_id: String,
    /// Revision of the repository to download.
    pub revision: String,
    /// Upper bound on generated tokens per call.
    pub max_new_tokens: usize,
    /// Seed of the logits processor.
    pub seed: u64,
    /// Access token for gated repositories.
    pub hf_token: Option<String>,
    /// Overrides the default hub cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl Default for PaligemmaConfig {
    fn default() -> Self {
        Self {
            model_id: "google/paligemma-3b-mix-224".to_string(),
            revision: "main".to_string(),
            max_new_tokens: 50,
            seed: 299792458,
            hf_token: None,
            cache_dir: None,
        }
    }
}

/// The Paligemma model
///
/// This struct contains the Google Paligemma model for text generation from an image
/// and a given text prompt.
///
/// NOTE: to run the model with Cuda, you need to pass the `--features cuda` flag to the `cargo run` command.
pub struct Paligemma {
    pipeline: TextGeneration,
    preprocessor: Preprocessor,
    dtype: DType,
    max_new_tokens: usize,
}

impl Paligemma {
    /// Create a new Paligemma model
    ///
    /// Downloads the tokenizer and the weights from the hub on first use.
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the Paligemma model
    pub fn new(config: PaligemmaConfig) -> Result<Self, VlmError> {
        #[cfg(feature = "cuda")]
        let (device, dtype) = match Device::cuda_if_available(0) {
            Ok(device) if device.is_cuda() => (device, DType::BF16),
            Ok(device) => (device, DType::F32),
            Err(e) => {
                log::warn!("CUDA not available, defaulting to CPU: {e}");
                (Device::Cpu, DType::F32)
            }
        };

        #[cfg(not(feature = "cuda"))]
        let (device, dtype) = (Device::Cpu, DType::F32);

        log::info!(
            "Loading {} (revision {}) on {:?} as {:?}",
            config.model_id,
            config.revision,
            device,
            dtype
        );

        let (model, tokenizer) = Self::load_model(&config, dtype, &device)?;
        let pipeline = TextGeneration::new(model, tokenizer, device, config.seed)?;

        Ok(Self {
            pipeline,
            preprocessor: Preprocessor::default(),
            dtype,
            max_new_tokens: config.max_new_tokens,
        })
    }

    /// Run the inference of the Paligemma model
    ///
    /// # Arguments
    ///
    /// * `image` - The image to describe, any color type
    /// * `prompt` - The task prompt, e.g. `caption en` or `answer en <question>`
    ///
    /// # Returns
    ///
    /// * The generated continuation, without the prompt
    pub fn inference(&mut self, image: &DynamicImage, prompt: &str) -> Result<String, VlmError> {
        let pixels = self
            .preprocessor
            .preprocess(image, self.pipeline.device(), self.dtype)?;

        self.pipeline.run(&pixels, prompt, self.max_new_tokens)
    }

    // utility function to load the model
    fn load_model(
        config: &PaligemmaConfig,
        dtype: DType,
        device: &Device,
    ) -> Result<(Model, Tokenizer), VlmError> {
        let mut builder = ApiBuilder::new().with_token(config.hf_token.clone());
        if let Some(cache_dir) = &config.cache_dir {
            builder = builder.with_cache_dir(cache_dir.clone());
        }
        let api = builder.build()?;

        let repo = api.repo(Repo::with_revision(
            config.model_id.clone(),
            RepoType::Model,
            config.revision.clone(),
        ));

        let tokenizer_filename = repo.get("tokenizer.json")?;
        let filenames = hub_load_safetensors(&repo, "model.safetensors.index.json")?;

        let tokenizer = Tokenizer::from_file(tokenizer_filename)?;

        let model_config = Config::paligemma_3b_224();
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&filenames, dtype, device)? };

        let model = Model::new(&model_config, vb)?;

        Ok((model, tokenizer))
    }
}

impl VisionLanguageModel for Paligemma {
    fn generate(&mut self, prompt: &str, image: &DynamicImage) -> Result<String, VlmError> {
        self.inference(image, prompt)
    }
}
