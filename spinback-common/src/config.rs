//! Configuration loading and root folder resolution
//!
//! Every setting resolves in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: it is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Config file name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "spinback.toml";

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "SPINBACK_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "SPINBACK_ROOT_FOLDER";

/// Parsed `spinback.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the leaderboard database and the persisted token
    pub root_folder: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub recommendations: RecommendationConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[catalog]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

/// `[preview]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Preview-search proxy base URL
    pub base_url: Option<String>,
    /// Lookups issued concurrently per throttled batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between throttled batches
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
    /// External command used to play previews; the URL is appended as last argument
    pub player_command: Option<String>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            player_command: None,
        }
    }
}

fn default_batch_size() -> usize {
    3
}

fn default_batch_delay_ms() -> u64 {
    250
}

/// `[game]` section
///
/// Penalties are positive point values subtracted from the score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub player_name: Option<String>,
    /// `easy`, `medium` or `hard`
    pub difficulty: Option<String>,
    pub give_up_penalty: Option<u32>,
    pub time_up_penalty: Option<u32>,
    pub wrong_guess_penalty: Option<u32>,
    pub hint_penalty: Option<u32>,
}

/// `[recommendations]` section
///
/// Each weight overrides the matching entry of the scoring table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub deck_size: Option<usize>,
    pub base_score: Option<f64>,
    pub same_artist: Option<f64>,
    pub popularity: Option<f64>,
    pub genre: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub danceability: Option<f64>,
    pub dual_preview: Option<f64>,
    pub descriptor_similarity: Option<f64>,
    pub popularity_sweet_spot: Option<f64>,
}

/// Locate the config file
///
/// `SPINBACK_CONFIG` wins; otherwise `~/.config/spinback/spinback.toml`, then
/// `/etc/spinback/spinback.toml` on Linux. Returns `None` when nothing exists.
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }

    let user_config = dirs::config_dir().map(|d| d.join("spinback").join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/spinback").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration with graceful degradation
///
/// `explicit` (from the command line) takes priority over [`config_file_path`].
/// Any failure yields [`TomlConfig::default`] after a warning.
pub fn load_config(explicit: Option<&Path>) -> TomlConfig {
    let path = match explicit.map(Path::to_path_buf).or_else(config_file_path) {
        Some(path) => path,
        None => {
            info!("No config file found, using defaults");
            return TomlConfig::default();
        }
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{}; using defaults", e);
            TomlConfig::default()
        }
    }
}

/// Write a config file, creating parent directories
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve the root folder: CLI → `SPINBACK_ROOT_FOLDER` → TOML → platform default
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        debug!("Root folder from command line");
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            debug!("Root folder from {}", ROOT_FOLDER_ENV_VAR);
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml.root_folder.as_deref() {
        debug!("Root folder from TOML config");
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("spinback"))
        .unwrap_or_else(|| PathBuf::from("./spinback_data"))
}

/// Create the root folder if missing
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    if !root.exists() {
        std::fs::create_dir_all(root)?;
        info!("Created root folder {}", root.display());
    }
    Ok(())
}
