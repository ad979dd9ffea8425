//! Burner Transcode Engine
//!
//! Drives ffmpeg through two-pass encodes, one input file at a time.
//!
//! # Pass Pipeline
//!
//! ```text
//! input.mkv ── probe ── bitrate advisory
//!                              │
//!                              ▼
//!                     ProfileCommand ── pass 1 ── pass 2
//!                                          │
//!                          ┌───────────────┴───────────────┐
//!                        stderr                          stdout
//!                          │                               │
//!                   LineTokenizer                    LineTokenizer
//!                          │                               │
//!                  ClassifierChain ── kill         ProgressReducer
//!                          │                               │
//!                          └───────────► RedrawWriter ◄────┘
//! ```

pub mod burn;
pub mod classify;
pub mod command;
pub mod probe;
pub mod progress;
pub mod redraw;
pub mod supervise;
pub mod tokenizer;
pub mod tools;

pub use burn::*;
pub use classify::{Classification, ClassifierChain, LineClassifier, ProcessControl};
pub use command::{EncodeOption, Invocation, ProfileCommand};
pub use probe::{DurationProbe, FfprobeDuration};
pub use supervise::{console, Console, ProcessOutcome, Supervisor};
pub use tools::Toolchain;
