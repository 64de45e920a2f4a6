use std::num::NonZeroU32;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub node: NodeConfig,
    pub notifier: NotifierConfig,
    pub storage: StorageConfig,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding every summary's backing file
    pub content_root: String,
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Externally reachable base URL, used for links in notifications
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub password_hash_iterations: u32,
    /// Seeded as the first author when the catalog has none
    pub bootstrap_email: Option<String>,
    pub bootstrap_password: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            content_root: "./uploads".to_string(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            telegram_chat_id: None,
            public_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password_hash_iterations: 100_000,
            bootstrap_email: None,
            bootstrap_password: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let content_root =
            std::env::var("CONTENT_ROOT").unwrap_or_else(|_| "./uploads".to_string());

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let public_url =
            std::env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());

        let password_hash_iterations = std::env::var("PASSWORD_HASH_ITERATIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100_000);

        let config = Config {
            auth: AuthConfig {
                password_hash_iterations,
                bootstrap_email: non_empty_var("BOOTSTRAP_EMAIL"),
                bootstrap_password: non_empty_var("BOOTSTRAP_PASSWORD"),
            },
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            notifier: NotifierConfig {
                telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
                telegram_chat_id: non_empty_var("TELEGRAM_CHAT_ID"),
                public_url,
            },
            storage: StorageConfig { content_root },
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.content_root.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "CONTENT_ROOT cannot be empty".to_string(),
            ));
        }

        if self.auth.password_hash_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "PASSWORD_HASH_ITERATIONS must be greater than 0".to_string(),
            ));
        }

        if self.notifier.telegram_bot_token.is_some() != self.notifier.telegram_chat_id.is_some() {
            return Err(ConfigError::ValidationError(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID must be set together".to_string(),
            ));
        }

        if self.auth.bootstrap_email.is_some() != self.auth.bootstrap_password.is_some() {
            return Err(ConfigError::ValidationError(
                "BOOTSTRAP_EMAIL and BOOTSTRAP_PASSWORD must be set together".to_string(),
            ));
        }

        if self.test_mode {
            tracing::warn!("TEST_MODE is enabled. Never run this configuration in production.");
        }

        Ok(())
    }

    pub fn password_hash_iterations(&self) -> NonZeroU32 {
        NonZeroU32::new(self.auth.password_hash_iterations).unwrap_or(NonZeroU32::MIN)
    }

    /// Bot token and chat id, when chat notifications are configured.
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (
            self.notifier.telegram_bot_token.as_deref(),
            self.notifier.telegram_chat_id.as_deref(),
        ) {
            (Some(token), Some(chat_id)) => Some((token, chat_id)),
            _ => None,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
