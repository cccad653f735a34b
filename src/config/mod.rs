// Configuration module
// Author: kelexine (https://github.com/kelexine)

mod models;

pub use models::*;

use crate::error::{ProxyError, Result};
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Plain environment variables kept for compatibility with existing
/// deployments, mapped onto their configuration keys.
const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("APP_PORT", "server.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_NAME", "database.name"),
    ("REDIS_HOST", "cache.redis_host"),
    ("REDIS_PORT", "cache.redis_port"),
    ("REDIS_PASSWORD", "cache.redis_password"),
    ("CACHE_EXPIRATION", "cache.expiration"),
    ("RESPONSE_TIME_THRESHOLD", "stats.response_time_threshold"),
];

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Legacy plain env vars (`APP_PORT`, `DB_HOST`, ...) (highest)
    /// 2. Prefixed env vars (`NBRP_CACHE__BACKEND=memory`)
    /// 3. Config file
    /// 4. Defaults (lowest)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(config_path, std::env::vars().collect())
    }

    /// Same as [`AppConfig::load`] but reads variables from `env` instead of
    /// the process environment.
    pub fn load_with_env(config_path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let file = match config_path {
            Some(path) => File::from(path.to_path_buf()).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let mut builder = Config::builder()
            // Start with defaults
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("NBRP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.clone())),
            );

        // Empty values fall back to the lower layers
        for (var, key) in LEGACY_ENV_VARS {
            let value = env.get(*var).filter(|v| !v.is_empty()).cloned();
            builder = builder.set_override_option(*key, value)?;
        }

        let config: AppConfig = builder
            .build()
            .map_err(|e| ProxyError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ProxyError::Config(e.to_string()))?;

        config.validate()
    }

    fn validate(mut self) -> Result<Self> {
        let prefix = self.server.api_prefix.trim_end_matches('/');
        if !prefix.starts_with('/') {
            return Err(ProxyError::Config(format!(
                "server.api_prefix must start with '/', got {:?}",
                self.server.api_prefix
            )));
        }
        self.server.api_prefix = prefix.to_string();

        if self.upstream.base_url.trim().is_empty() {
            return Err(ProxyError::Config("upstream.base_url is empty".to_string()));
        }
        if self.workers.count == 0 {
            return Err(ProxyError::Config("workers.count must be at least 1".to_string()));
        }
        if self.workers.queue_capacity == 0 {
            return Err(ProxyError::Config(
                "workers.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.cache.memory_capacity == 0 {
            return Err(ProxyError::Config(
                "cache.memory_capacity must be at least 1".to_string(),
            ));
        }

        Ok(self)
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".nbrp")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
