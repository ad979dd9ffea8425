//! Source duration probing.

use std::path::{Path, PathBuf};
use std::process::Command;

use burner_common::{BurnerError, BurnerResult};
use serde::Deserialize;

/// Anything that can tell how long a media file plays.
pub trait DurationProbe {
    /// Duration of `input` in seconds.
    fn duration(&self, input: &Path) -> BurnerResult<f64>;
}

/// Probe backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeDuration {
    ffprobe_path: PathBuf,
}

impl FfprobeDuration {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Arguments asking for the container duration as JSON.
    pub fn args(input: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            "-show_entries".to_string(),
            "format=duration".to_string(),
            "-v".to_string(),
            "quiet".to_string(),
            "-of".to_string(),
            "json".to_string(),
        ]
    }
}

impl DurationProbe for FfprobeDuration {
    fn duration(&self, input: &Path) -> BurnerResult<f64> {
        let output = Command::new(&self.ffprobe_path)
            .args(Self::args(input))
            .output()
            .map_err(|e| BurnerError::probe(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(BurnerError::probe(format!(
                "ffprobe exited with {} for {}",
                output.status,
                input.display()
            )));
        }
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Extract `format.duration` from ffprobe's JSON output.
pub fn parse_duration(json: &str) -> BurnerResult<f64> {
    let parsed: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| BurnerError::probe(format!("ffprobe JSON parse error: {e}")))?;
    let text = parsed
        .format
        .duration
        .ok_or_else(|| BurnerError::probe("ffprobe reported no duration"))?;
    text.trim()
        .parse::<f64>()
        .map_err(|e| BurnerError::probe(format!("invalid duration `{text}`: {e}")))
}
