use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};

use crate::utils::limits::{
    DEFAULT_MAX_INFLIGHT, DEFAULT_READ_BACKOFF_MS, DEFAULT_READ_RETRIES, MAX_CHUNK_SIZE,
};

pub const DEFAULT_FILE: &str = "data.txt";
pub const DEFAULT_SERVER: &str = "127.0.0.1:9001";
pub const DEFAULT_CONFIG_FILE: &str = "filesnd.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    pub file: PathBuf,
    pub chunk_size: usize,
    pub server: String,
    pub max_inflight: usize,
    pub read_retries: u32,
    pub read_backoff_ms: u64,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_FILE),
            chunk_size: 1,
            server: DEFAULT_SERVER.to_string(),
            max_inflight: DEFAULT_MAX_INFLIGHT,
            read_retries: DEFAULT_READ_RETRIES,
            read_backoff_ms: DEFAULT_READ_BACKOFF_MS,
        }
    }
}

impl SendConfig {
    /// Reads `config_path` when given, otherwise starts from defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                let config: SendConfig = toml::from_str(&content)
                    .with_context(|| format!("parsing config {}", path.display()))?;
                tracing::debug!("Loaded config from {:?}", path);
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk size must be at least 1 byte");
        }
        if self.chunk_size > MAX_CHUNK_SIZE {
            bail!("chunk size {} exceeds limit {}", self.chunk_size, MAX_CHUNK_SIZE);
        }
        if self.server.trim().is_empty() {
            bail!("server address is empty");
        }
        Ok(())
    }
}
