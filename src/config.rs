use std::{fmt, path::Path, time::Duration};

use serde::Deserialize;

use crate::{
    discord::{application_command::ApplicationCommand, DiscordHttpClient, DiscordHttpClientBuilder, API_BASE},
    error::Error,
    executor::WorkerPool,
};

const DEFAULT_PATH: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file - {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config - {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub discord: DiscordConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub embed: EmbedConfig,
    #[serde(default)]
    pub commands: Vec<ApplicationCommand>,
}

#[derive(Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    pub application_id: u64,
    // commands go global when unset
    #[serde(default)]
    pub guild_id: Option<u64>,
    // delete registered commands missing from `commands`
    #[serde(default)]
    pub prune_commands: bool,
}

impl fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"<redacted>")
            .field("application_id", &self.application_id)
            .field("guild_id", &self.guild_id)
            .field("prune_commands", &self.prune_commands)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub base_url: String,
    pub workers: usize,
    pub timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE.to_string(),
            workers: 1,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmbedConfig {
    #[serde(default)]
    pub color: Option<u32>,
}

impl Config {
    /// Reads `CONFIG_PATH` (default `config.toml`). `DISCORD_BOT_TOKEN` wins over the file's token.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::load(path)?;
        if let Ok(token) = std::env::var("DISCORD_BOT_TOKEN") {
            config.discord.token = token;
        }

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Client builder with transport and worker settings applied. Needs a running tokio runtime
    /// when more than one worker is configured.
    pub fn client_builder(&self) -> Result<DiscordHttpClientBuilder, Error> {
        let mut http = reqwest::Client::builder();
        if let Some(timeout) = self.http.timeout_secs {
            http = http.timeout(Duration::from_secs(timeout));
        }

        let builder = DiscordHttpClient::builder(&self.discord.token, self.discord.application_id)
            .base_url(&self.http.base_url)
            .http_client(http.build().map_err(Error::InvalidRequest)?);

        Ok(if self.http.workers > 1 {
            builder.queue(WorkerPool::new(self.http.workers)?)
        } else {
            builder
        })
    }
}
