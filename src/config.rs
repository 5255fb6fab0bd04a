use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub live: LiveConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LiveConfig {
    /// WebSocket endpoint of the live conversation service
    pub url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub input_sample_rate: u32,
    pub output_sample_rate: u32,
    pub frame_samples: usize,
}

impl Config {
    /// Load configuration from an optional file layered over the defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "parla-live")?
            .set_default("live.url", "wss://live.parla.dev/v1/session")?
            .set_default("live.api_key_env", "PARLA_API_KEY")?
            .set_default("audio.input_sample_rate", 16000_i64)?
            .set_default("audio.output_sample_rate", 24000_i64)?
            .set_default("audio.frame_samples", 4096_i64)?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
