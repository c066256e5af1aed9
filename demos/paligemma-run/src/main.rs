use argh::FromArgs;
use std::path::PathBuf;

use paligemma_vlm::{ImageFetcher, ImageSource, Paligemma, PaligemmaConfig, VisionLanguageModel};

#[derive(FromArgs)]
/// Answer a prompt about an image using Google Paligemma
struct Args {
    /// url of the input image
    #[argh(option, short = 'u')]
    image_url: Option<String>,

    /// path to an input image
    #[argh(option, short = 'i')]
    image_path: Option<PathBuf>,

    /// prompt to ask the model
    #[argh(option, short = 'p', default = "String::from(\"caption en\")")]
    prompt: String,

    /// the maximum number of generated tokens
    #[argh(option, default = "50")]
    max_new_tokens: usize,
}

// a blank token counts as no token
fn non_blank(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.trim().is_empty())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let args: Args = argh::from_env();

    let source = match (args.image_url, args.image_path) {
        (Some(url), None) => ImageSource::Url(url),
        (None, Some(path)) => ImageSource::Path(path),
        _ => return Err("pass exactly one of --image-url or --image-path".into()),
    };

    let config = PaligemmaConfig {
        max_new_tokens: args.max_new_tokens,
        hf_token: non_blank(std::env::var("HF_TOKEN").ok()),
        ..Default::default()
    };
    let mut paligemma = Paligemma::new(config)?;

    log::info!("Running {:?} on {source}", args.prompt);
    let output = paligemma.run(&args.prompt, &source, &ImageFetcher::default())?;

    println!("DEBUG:{output}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_flag() {
        let args = Args::from_args(&["paligemma-run"], &["-i", "dog.png", "--prompt", "ocr"])
            .expect("failed to parse args");
        assert_eq!(args.prompt, "ocr");

        let args = Args::from_args(&["paligemma-run"], &["-i", "dog.png"])
            .expect("failed to parse args");
        assert_eq!(args.prompt, "caption en");
    }

    #[test]
    fn blank_hf_token_is_dropped() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(String::new())), None);
        assert_eq!(non_blank(Some(" \t".into())), None);
        assert_eq!(non_blank(Some("hf_x".into())).as_deref(), Some("hf_x"));
    }
}
