//! Application configuration, persisted as JSON.

use std::path::{Path, PathBuf};

use danbot_core::manifest::PINNED_REVISION;
use danbot_core::{DecodingConfig, Mode};
use serde::{Deserialize, Serialize};

/// Global configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding `model.json` and the files it names.
    #[serde(default)]
    pub model_dir: Option<PathBuf>,
    #[serde(default)]
    pub mode: Mode,
    /// Step cap for generative decoding.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// Model revision the deployment is pinned to.
    #[serde(default = "default_revision")]
    pub revision: String,
    #[serde(default)]
    pub decoding: DecodingConfig,
    /// Intra-op threads per inference session (unset = runtime default).
    #[serde(default)]
    pub intra_threads: Option<usize>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_max_steps() -> usize {
    danbot_core::generate::DEFAULT_MAX_STEPS
}
fn default_revision() -> String {
    PINNED_REVISION.into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            model_dir: None,
            mode: Mode::default(),
            max_steps: default_max_steps(),
            revision: default_revision(),
            decoding: DecodingConfig::default(),
            intra_threads: None,
        }
    }
}

impl AppConfig {
    /// Platform config directory: `~/.config/danbot-server/`
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("danbot-server")
    }

    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Load from disk, or return defaults if the file doesn't exist.
    pub fn load_or_default() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_file())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Update one key from its string form (`config set`).
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "host" => self.host = value.into(),
            "port" => self.port = value.parse()?,
            "model_dir" => {
                self.model_dir = (!value.is_empty()).then(|| PathBuf::from(value));
            }
            "mode" => self.mode = value.parse()?,
            "max_steps" => {
                let steps: usize = value.parse()?;
                anyhow::ensure!(steps > 0, "max_steps must be at least 1");
                self.max_steps = steps;
            }
            "revision" => self.revision = value.into(),
            "intra_threads" => {
                self.intra_threads = if value.is_empty() {
                    None
                } else {
                    Some(value.parse()?)
                };
            }
            "decoding.aspect_ratio" => self.decoding.aspect_ratio = value.parse()?,
            "decoding.rating" => self.decoding.rating = value.parse()?,
            "decoding.length" => self.decoding.length = value.parse()?,
            "decoding.translate_mode" => self.decoding.translate_mode = value.parse()?,
            _ => anyhow::bail!("Unknown config key: {key}"),
        }
        Ok(())
    }
}
