//! Discovery of the external encoder and prober.

use std::path::{Path, PathBuf};
use std::process::Command;

use burner_common::{BurnerError, BurnerResult};
use serde::Serialize;

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

/// Located executables. ffprobe is optional; without it the bitrate
/// advisory is skipped.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub ffmpeg: PathBuf,
    pub ffprobe: Option<PathBuf>,
}

/// Availability of one tool, as reported by `burner check`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    pub required: bool,
    /// First line of `-version` output.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

impl Toolchain {
    /// Find the tools on `PATH`.
    pub fn discover() -> BurnerResult<Self> {
        Self::from_lookup(|name| which::which(name).ok())
    }

    /// Resolve tools through `lookup`; a missing ffmpeg is a setup error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<PathBuf>) -> BurnerResult<Self> {
        let ffmpeg = lookup(FFMPEG).ok_or_else(|| {
            BurnerError::setup(format!("{FFMPEG} not found; is it installed and in PATH?"))
        })?;
        let ffprobe = lookup(FFPROBE);
        if ffprobe.is_none() {
            tracing::warn!("{FFPROBE} not found, bitrate will not be adjusted to the source");
        }
        Ok(Self { ffmpeg, ffprobe })
    }
}

/// Check every known tool and report what was found.
pub fn check_all() -> Vec<ToolInfo> {
    [(FFMPEG, true), (FFPROBE, false)]
        .into_iter()
        .map(|(name, required)| {
            let path = which::which(name).ok();
            ToolInfo {
                name: name.to_string(),
                available: path.is_some(),
                required,
                version: path.as_deref().and_then(detect_version),
                path,
            }
        })
        .collect()
}

fn detect_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("-version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
}
