//! Filter graph rendering for subtitle burn-in and scaling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structural description of the video filter graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Source file for the subtitle burn-in, if any.
    pub subtitle: Option<String>,

    /// Width of the scale filter. Negative values keep the aspect ratio.
    pub width: i32,

    /// Height of the scale filter.
    pub height: i32,

    /// Allow the output to be larger than the source.
    pub upscaling: bool,
}

impl FilterSpec {
    /// Render the comma separated filter graph.
    ///
    /// Subtitle burn-in comes first, then scaling. The scale term is left out
    /// when both width and height are zero.
    pub fn render(&self) -> String {
        let mut filters = Vec::new();
        if let Some(subtitle) = self.subtitle.as_deref().filter(|s| !s.is_empty()) {
            filters.push(format!("subtitles='{}'", escape_filter_path(subtitle)));
        }
        if self.width != 0 || self.height != 0 {
            if self.upscaling {
                filters.push(format!("scale={}:{}", self.width, self.height));
            } else {
                filters.push(format!(
                    "scale='min({},iw)':'min({},ih)'",
                    self.width, self.height
                ));
            }
        }
        filters.join(", ")
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Escape a path for use inside a filter graph option value.
///
/// Backslashes must be doubled before colons are escaped, otherwise the
/// backslash introduced for a colon would itself be doubled.
pub fn escape_filter_path(path: &str) -> String {
    path.replace('\\', r"\\").replace(':', r"\:")
}
