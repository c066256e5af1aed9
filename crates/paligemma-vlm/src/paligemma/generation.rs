use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::{LogitsProcessor, Sampling};
use candle_transformers::models::paligemma::Model;
use tokenizers::Tokenizer;

use crate::error::VlmError;

/// Greedy text generation on top of the PaliGemma backbone.
pub struct TextGeneration {
    model: Model,
    tokenizer: Tokenizer,
    device: Device,
    logits_processor: LogitsProcessor,
    eos_token: u32,
}

impl TextGeneration {
    pub fn new(
        model: Model,
        tokenizer: Tokenizer,
        device: Device,
        seed: u64,
    ) -> Result<Self, VlmError> {
        let eos_token = tokenizer
            .token_to_id("<eos>")
            .ok_or(VlmError::EosTokenNotFound)?;

        Ok(Self {
            model,
            tokenizer,
            device,
            logits_processor: LogitsProcessor::from_sampling(seed, Sampling::ArgMax),
            eos_token,
        })
    }

    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Generate at most `max_new_tokens` tokens for the image prefix and the prompt.
    ///
    /// Only the continuation is returned, decoded with the special tokens removed.
    pub fn run(
        &mut self,
        image: &Tensor,
        prompt: &str,
        max_new_tokens: usize,
    ) -> Result<String, VlmError> {
        // the image prefix is recomputed for every request
        self.model.clear_kv_cache();

        let mut tokens = self
            .tokenizer
            .encode(format!("{prompt}\n"), true)?
            .get_ids()
            .to_vec();
        let prompt_len = tokens.len();

        let start_gen = std::time::Instant::now();
        for index in 0..max_new_tokens {
            let context_size = if index > 0 { 1 } else { tokens.len() };
            let start_pos = tokens.len().saturating_sub(context_size);
            let input = Tensor::new(&tokens[start_pos..], &self.device)?.unsqueeze(0)?;
            let logits = if index > 0 {
                self.model.forward(&input)?
            } else {
                self.model.setup(image, &input)?
            };
            let logits = logits.squeeze(0)?.squeeze(0)?.to_dtype(DType::F32)?;

            let next_token = self.logits_processor.sample(&logits)?;
            if next_token == self.eos_token {
                break;
            }
            tokens.push(next_token);
        }

        let generated = &tokens[prompt_len..];
        let dt = start_gen.elapsed();
        log::debug!(
            "{} tokens generated ({:.2} token/s)",
            generated.len(),
            generated.len() as f64 / dt.as_secs_f64(),
        );

        Ok(self.tokenizer.decode(generated, true)?)
    }
}
