use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KvittoConfig {
    /// Base URL of the Rowbase project, e.g. "https://acme.rowbase.co"
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Publishable anon key sent as `apikey` on every request.
    #[serde(default)]
    pub anon_key: String,
}

fn default_backend_url() -> String {
    "http://localhost:54321".to_string()
}

impl Default for KvittoConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            anon_key: String::new(),
        }
    }
}

impl KvittoConfig {
    pub fn config_path() -> Result<PathBuf> {
        Ok(dirs::config_dir()
            .context("Cannot determine config directory")?
            .join("kvitto")
            .join("config.toml"))
    }

    /// Load config from disk, letting `KVITTO_URL` / `KVITTO_ANON_KEY`
    /// override for development. Returns defaults if no file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config at {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };
        if let Ok(url) = std::env::var("KVITTO_URL") {
            config.backend_url = url;
        }
        if let Ok(key) = std::env::var("KVITTO_ANON_KEY") {
            config.anon_key = key;
        }
        Ok(config)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(&path, raw)?;
        Ok(())
    }
}
