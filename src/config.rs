use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the exif-cleaner tools.
///
/// Controls which metadata categories are stripped by default and how
/// output files are named and written.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_cleaner::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.output.in_place = true;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Which metadata categories to strip.
    pub strip: StripConfig,
    /// Output behavior (naming, in-place rewrites, backups).
    pub output: OutputConfig,
}

/// Metadata selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripConfig {
    /// Category names resolved via
    /// [`MetadataKind::from_name`](crate::jpeg::MetadataKind::from_name);
    /// used when the caller does not pick categories explicitly.
    pub categories: Vec<String>,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Name tag inserted before the extension for stripped copies
    /// (`photo.jpg` → `photo.cleaned.jpg`).
    pub suffix: String,
    /// If `true`, rewrite inputs in place instead of writing a suffixed copy.
    pub in_place: bool,
    /// If `true`, create a `.bak` copy of the original before an in-place
    /// rewrite.
    pub backup_originals: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strip: StripConfig {
                categories: vec![
                    "exif".to_string(),
                    "xmp".to_string(),
                    "icc".to_string(),
                    "comment".to_string(),
                ],
            },
            output: OutputConfig {
                suffix: "cleaned".to_string(),
                in_place: false,
                backup_originals: true,
            },
        }
    }
}

impl Config {
    /// Resolve the config file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
