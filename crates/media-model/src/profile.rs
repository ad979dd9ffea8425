//! Output profiles.
//!
//! A profile is a fixed preset of encode options plus an output naming rule.
//! It is picked once per run and never changes afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output profile selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Profile {
    /// One minute sample with burned-in subtitles.
    #[serde(rename = "smp4")]
    Sample,
    /// Fragmented MP4 HLS playlist with burned-in subtitles.
    #[serde(rename = "fmp4")]
    FragmentedHls,
    /// Single MP4 file with burned-in subtitles.
    #[serde(rename = "mp4")]
    Mux,
    /// Re-encode keeping the original streams, subtitles stay soft.
    #[serde(rename = "transcode")]
    Transcode,
}

/// Order in which profiles are offered in the interactive menu.
pub const MENU: [Profile; 4] = [
    Profile::FragmentedHls,
    Profile::Mux,
    Profile::Transcode,
    Profile::Sample,
];

/// Returned when a token does not name a profile.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode `{0}`, expected one of: smp4, fmp4, mp4, transcode")]
pub struct UnknownProfile(pub String);

impl Profile {
    /// Short selection token used on the command line.
    pub fn token(self) -> &'static str {
        match self {
            Self::Sample => "smp4",
            Self::FragmentedHls => "fmp4",
            Self::Mux => "mp4",
            Self::Transcode => "transcode",
        }
    }

    /// User friendly representation.
    pub fn label(self) -> &'static str {
        match self {
            Self::Sample => "Sample MP4 (mux)",
            Self::FragmentedHls => "Fragmented MP4 (HLS)",
            Self::Mux => "MP4 (mux)",
            Self::Transcode => "Transcode (softsub)",
        }
    }

    /// Stable number shown next to the profile in the menu.
    pub fn menu_index(self) -> usize {
        match self {
            Self::Sample => 0,
            Self::FragmentedHls => 1,
            Self::Mux => 2,
            Self::Transcode => 3,
        }
    }

    /// Inverse of [`Profile::menu_index`].
    pub fn from_menu_index(index: usize) -> Option<Self> {
        MENU.into_iter().find(|p| p.menu_index() == index)
    }

    /// Reads a menu choice typed by the user. Only the first character counts.
    pub fn from_menu_input(input: &str) -> Option<Self> {
        let digit = input.trim_start().chars().next()?.to_digit(10)?;
        Self::from_menu_index(digit as usize)
    }

    /// Whether subtitles are burned into the picture.
    pub fn burns_subtitles(self) -> bool {
        !matches!(self, Self::Transcode)
    }
}

impl FromStr for Profile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MENU.into_iter()
            .find(|p| p.token() == s)
            .ok_or_else(|| UnknownProfile(s.to_string()))
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}
