use std::{net::SocketAddr, path::PathBuf, time::Duration};

use argh::FromArgs;
use paligemma_vlm::PaligemmaConfig;

/// Environment variable holding the static API key.
pub const API_KEY_ENV: &str = "API_KEY";

/// Environment variable holding the Hugging Face access token.
pub const HF_TOKEN_ENV: &str = "HF_TOKEN";

#[derive(FromArgs, Debug)]
/// Serve the Google PaliGemma model over HTTP
pub struct Args {
    /// address to bind
    #[argh(option, default = "String::from(\"0.0.0.0\")")]
    pub host: String,

    /// port to listen on
    #[argh(option, default = "8000")]
    pub port: u16,

    /// directory where uploaded images are stored
    #[argh(option, default = "PathBuf::from(\"uploads\")")]
    pub upload_dir: PathBuf,

    /// directory of the rotating log files
    #[argh(option, default = "PathBuf::from(\"logs\")")]
    pub log_dir: PathBuf,

    /// log level filter, overridden by RUST_LOG
    #[argh(option, default = "String::from(\"debug\")")]
    pub log_level: String,

    /// hugging face repository of the model
    #[argh(option, default = "String::from(\"google/paligemma-3b-mix-224\")")]
    pub model_id: String,

    /// maximum number of generated tokens per call
    #[argh(option, default = "50")]
    pub max_new_tokens: usize,

    /// timeout in seconds when downloading an image url
    #[argh(option, default = "30")]
    pub fetch_timeout_secs: u64,

    /// maximum request body size in megabytes
    #[argh(option, default = "25")]
    pub body_limit_mb: usize,
}

/// Runtime configuration of the service.
#[derive(Clone, Debug)]
pub struct ServeConfig {
    pub addr: SocketAddr,
    pub upload_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub fetch_timeout: Duration,
    pub body_limit: usize,
    /// When set, inference routes require a matching `X-API-Key` header.
    pub api_key: Option<String>,
    pub model: PaligemmaConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid bind address {0}")]
    InvalidAddress(String),
}

impl ServeConfig {
    /// Build the configuration from the command line and the process environment.
    pub fn from_env(args: Args) -> Result<Self, ConfigError> {
        Self::new(
            args,
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(HF_TOKEN_ENV).ok(),
        )
    }

    pub fn new(
        args: Args,
        api_key: Option<String>,
        hf_token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bind = format!("{}:{}", args.host, args.port);
        let addr = bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidAddress(bind))?;

        let model = PaligemmaConfig {
            model_id: args.model_id,
            max_new_tokens: args.max_new_tokens,
            hf_token: non_empty(hf_token),
            ..Default::default()
        };

        Ok(Self {
            addr,
            upload_dir: args.upload_dir,
            log_dir: args.log_dir,
            log_level: args.log_level,
            fetch_timeout: Duration::from_secs(args.fetch_timeout_secs),
            body_limit: args.body_limit_mb * 1024 * 1024,
            api_key: non_empty(api_key),
            model,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["paligemma-serve"], args).expect("failed to parse args")
    }

    #[test]
    fn defaults() -> Result<(), ConfigError> {
        let config = ServeConfig::new(parse(&[]), None, None)?;
        assert_eq!(config.addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.log_dir, PathBuf::from("logs"));
        assert_eq!(config.body_limit, 25 * 1024 * 1024);
        assert_eq!(config.model.model_id, "google/paligemma-3b-mix-224");
        assert_eq!(config.model.max_new_tokens, 50);
        assert!(config.api_key.is_none());
        Ok(())
    }

    #[test]
    fn flags_and_secrets() -> Result<(), ConfigError> {
        let args = parse(&[
            "--port",
            "9000",
            "--host",
            "127.0.0.1",
            "--max-new-tokens",
            "12",
            "--upload-dir",
            "/tmp/up",
        ]);
        let config = ServeConfig::new(args, Some("s3cret".into()), Some("hf_x".into()))?;
        assert_eq!(config.addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/up"));
        assert_eq!(config.model.max_new_tokens, 12);
        assert_eq!(config.api_key.as_deref(), Some("s3cret"));
        assert_eq!(config.model.hf_token.as_deref(), Some("hf_x"));
        Ok(())
    }

    #[test]
    fn blank_api_key_disables_auth() -> Result<(), ConfigError> {
        let config = ServeConfig::new(parse(&[]), Some("  ".into()), Some(String::new()))?;
        assert!(config.api_key.is_none());
        assert!(config.model.hf_token.is_none());
        Ok(())
    }

    #[test]
    fn invalid_host() {
        let res = ServeConfig::new(parse(&["--host", "not a host"]), None, None);
        assert!(matches!(res, Err(ConfigError::InvalidAddress(_))));
    }
}
