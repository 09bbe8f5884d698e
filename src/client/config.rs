use std::time::Duration;

use secrecy::SecretString;

use crate::client::consts::{AVATAR_WS_TOKEN, AVATAR_WS_URL, DEFAULT_RETRY_DELAY_MS, DEFAULT_URL};

#[derive(Debug)]
pub struct Config {
    url: String,
    token: Option<SecretString>,
    retry_delay: Duration,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.config.url = url.to_string();
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.config.token = Some(SecretString::from(token.to_string()));
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.config.retry_delay = retry_delay;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Defaults, overridden by `AVATAR_WS_URL` and `AVATAR_WS_TOKEN` when set.
    pub fn new() -> Self {
        Self {
            url: std::env::var(AVATAR_WS_URL).unwrap_or_else(|_| DEFAULT_URL.to_string()),
            token: std::env::var(AVATAR_WS_TOKEN)
                .ok()
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
