use anyhow::{Context, Result};
use serde::Deserialize;

use crate::session::SessionConfig;

/// Default token endpoint (client-credentials exchange)
const DEFAULT_TOKEN_URL: &str = "https://openapi.vito.ai/v1/authenticate";

/// Default streaming endpoint
const DEFAULT_STREAM_URL: &str = "wss://openapi.vito.ai/v1/transcribe:streaming";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub stt: SessionConfig,
}

#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// HTTP endpoint for the token exchange
    pub token_url: String,
    /// WebSocket endpoint for the transcription stream
    pub stream_url: String,
}

/// API application credentials, read from the environment
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    /// Load configuration: built-in defaults, overridden by an optional
    /// TOML file
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("api.token_url", DEFAULT_TOKEN_URL)?
            .set_default("api.stream_url", DEFAULT_STREAM_URL)?
            .set_default("stt.sample_rate", 16000)?
            .set_default("stt.channels", 1)?
            .set_default("stt.model_name", "sommers_ko")?
            .set_default("stt.use_itn", true)?
            .set_default("stt.use_disfluency_filter", false)?
            .set_default("stt.use_profanity_filter", false)?
            .set_default("stt.keywords", Vec::<String>::new())?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        Ok(builder.build()?.try_deserialize()?)
    }
}

impl Credentials {
    /// Read `CLIENT_ID` and `CLIENT_SECRET` from the environment
    pub fn from_env() -> Result<Self> {
        let client_id =
            std::env::var("CLIENT_ID").context("CLIENT_ID is not set in the environment")?;
        let client_secret = std::env::var("CLIENT_SECRET")
            .context("CLIENT_SECRET is not set in the environment")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }
}
