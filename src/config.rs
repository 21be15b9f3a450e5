use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const DEFAULT_ENDPOINT_NAME: &str = "arkdrop";
const DEFAULT_HIGHLIGHT_MS: u64 = 1500;

/// Settings shared by every component of a drop session, persisted as TOML.
///
/// ```toml
/// local_endpoint_name = "Phone A"
/// highlight_duration_ms = 1500
/// download_dir = "/sdcard/Download"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    /// Name stamped as `sender` on every packet built here.
    pub local_endpoint_name: String,
    /// How long a packet stays highlighted after it arrives or changes.
    pub highlight_duration_ms: u64,
    /// Where downloads land when a file has no destination yet.
    pub download_dir: Option<PathBuf>,
}

impl Default for DropConfig {
    fn default() -> Self {
        Self {
            local_endpoint_name: DEFAULT_ENDPOINT_NAME.to_owned(),
            highlight_duration_ms: DEFAULT_HIGHLIGHT_MS,
            download_dir: None,
        }
    }
}

impl DropConfig {
    pub fn new(local_endpoint_name: impl Into<String>) -> Self {
        Self {
            local_endpoint_name: local_endpoint_name.into(),
            ..Self::default()
        }
    }

    pub fn highlight_duration(&self) -> Duration {
        Duration::from_millis(self.highlight_duration_ms)
    }

    pub fn download_dir(&self) -> PathBuf {
        match &self.download_dir {
            Some(dir) => dir.clone(),
            None => std::env::temp_dir().join("drop-packets"),
        }
    }

    /// Loads the configuration from `path`, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!(
                "config: {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).with_context(|| {
            format!("Failed to read config file: {}", path.display())
        })?;

        toml::from_str(&content).with_context(|| {
            format!("Failed to parse config file: {}", path.display())
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).with_context(|| {
                    format!(
                        "Failed to create config directory: {}",
                        dir.display()
                    )
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .with_context(|| "Failed to serialize config")?;

        fs::write(path, content).with_context(|| {
            format!("Failed to write config file: {}", path.display())
        })
    }
}
