//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default target video height.
pub const DEFAULT_HEIGHT: i32 = 720;

/// Default target video bitrate.
pub const DEFAULT_BITRATE: &str = "1371k";

/// Default number of raw progress updates folded into one summary line.
pub const DEFAULT_PROGRESS_STRIDE: usize = 4;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BurnerConfig {
    /// Directory scanned for input files.
    pub input_dir: PathBuf,

    /// Directory receiving the encoded output.
    pub output_dir: PathBuf,

    /// Video shaping parameters.
    pub video: VideoDefaults,

    /// Let font substitution and missing glyph diagnostics pass through
    /// instead of aborting the encode.
    pub tolerate_font_errors: bool,

    /// Emit one progress summary every `progress_stride` updates of the
    /// wrapped tool. Zero turns the progress reducer off.
    pub progress_stride: usize,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Video shaping parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoDefaults {
    /// Target height; the width follows the aspect ratio.
    pub height: i32,

    /// Target video bitrate in `<int>k` or `<int>M` notation.
    pub bitrate: String,

    /// Allow the scale filter to enlarge the source.
    pub upscaling: bool,

    /// Skip the adaptive bitrate advisory.
    pub keep_bitrate: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "burner=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for BurnerConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./in"),
            output_dir: PathBuf::from("./out"),
            video: VideoDefaults::default(),
            tolerate_font_errors: false,
            progress_stride: DEFAULT_PROGRESS_STRIDE,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for VideoDefaults {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            bitrate: DEFAULT_BITRATE.to_string(),
            upscaling: false,
            keep_bitrate: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl BurnerConfig {
    /// Load config from `path`, falling back to defaults when the file is
    /// absent or unreadable.
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("burner").join("config.json")
}
