use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_LISTEN: &str = "127.0.0.1:8080";
const DEFAULT_POOL_CAPACITY: usize = 256;
const DEFAULT_MAX_HEADER_BYTES: usize = 64 * 1024;

/// Top-level configuration, usually read from YAML.
///
/// ```yaml
/// server:
///   listen_addr: "0.0.0.0:8080"
/// parser:
///   pool_capacity: 512
///   max_header_bytes: 16384
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub parser: ParserConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Most parsers a group keeps for reuse.
    pub pool_capacity: usize,
    /// Longest header block or line buffered while waiting for its terminator.
    pub max_header_bytes: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            pool_capacity: DEFAULT_POOL_CAPACITY,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid configuration")
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
    }

    /// Loads the file named by `TRICKLE_CONFIG`, or defaults when unset.
    ///
    /// `LISTEN` overrides the listen address either way.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("TRICKLE_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(listen_addr) = std::env::var("LISTEN") {
            cfg.server.listen_addr = listen_addr;
        }

        Ok(cfg)
    }
}
