//! Command-line and environment configuration.
//!
//! Every flag falls back to an environment variable (a `.env` file is loaded
//! first, see `main`), then to a default. [`Config::from_cli`] validates the
//! result before the terminal is taken over.

use std::path::PathBuf;

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no identity provider API key; pass --api-key or set FEEDBOARD_API_KEY")]
    MissingApiKey,

    #[error("invalid {flag} {value:?}: {source}")]
    InvalidUrl {
        flag: &'static str,
        value: String,
        source: url::ParseError,
    },

    #[error("{flag} must be an http(s) URL, got {value:?}")]
    UnsupportedScheme { flag: &'static str, value: String },
}

/// A terminal dashboard for an RSS backend
#[derive(Debug, Clone, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the feed backend
    #[clap(long, env = "FEEDBOARD_BACKEND_URL", default_value = "http://localhost:8080")]
    pub backend_url: String,

    /// Web API key of the identity provider project
    #[clap(long, env = "FEEDBOARD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Identity provider account endpoint
    #[clap(
        long,
        env = "FEEDBOARD_IDENTITY_URL",
        default_value = "https://identitytoolkit.googleapis.com/v1"
    )]
    pub identity_url: String,

    /// Identity provider token refresh endpoint
    #[clap(
        long,
        env = "FEEDBOARD_TOKEN_URL",
        default_value = "https://securetoken.googleapis.com/v1"
    )]
    pub token_url: String,

    /// Log filter, in `RUST_LOG` syntax
    #[clap(long, env = "FEEDBOARD_LOG", default_value = "info")]
    pub log_level: String,

    /// File the log is appended to
    #[clap(long, default_value = "feedboard.log")]
    pub log_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: Url,
    pub api_key: String,
    pub identity_url: Url,
    pub token_url: Url,
    pub log_level: String,
    pub log_file: PathBuf,
}

fn http_url(flag: &'static str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
        flag,
        value: value.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme {
            flag,
            value: value.to_string(),
        }),
    }
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let api_key = cli
            .api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            backend_url: http_url("--backend-url", &cli.backend_url)?,
            api_key,
            identity_url: http_url("--identity-url", &cli.identity_url)?,
            token_url: http_url("--token-url", &cli.token_url)?,
            log_level: cli.log_level,
            log_file: cli.log_file,
        })
    }
}
