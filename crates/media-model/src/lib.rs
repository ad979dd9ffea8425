//! Burner Media Model
//!
//! Defines the data contracts shared by the command builder and the CLI:
//! - **Profile:** the four output presets and their selection tokens
//! - **Filter:** scale and subtitle burn-in filter graphs
//! - **Bitrate:** `1371k` / `1M` notation and the adaptive bitrate advisory

pub mod bitrate;
pub mod filter;
pub mod profile;

pub use bitrate::*;
pub use filter::*;
pub use profile::*;
