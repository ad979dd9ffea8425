//! Throttling of `-progress` key/value output.
//!
//! With `-progress pipe:1` the encoder writes a block of `key=value` lines
//! roughly twice a second, each block closed by `progress=continue` (or
//! `progress=end` for the last one). The reducer folds the blocks and
//! produces one summary line every `stride` blocks.

/// Latest values of the fields shown in a summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ProgressState {
    frame: Option<String>,
    fps: Option<String>,
    total_size: Option<String>,
    out_time: Option<String>,
    bitrate: Option<String>,
    speed: Option<String>,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        let slot = match key {
            "frame" => &mut self.frame,
            "fps" => &mut self.fps,
            "total_size" => &mut self.total_size,
            "out_time" => &mut self.out_time,
            "bitrate" => &mut self.bitrate,
            "speed" => &mut self.speed,
            _ => return,
        };
        *slot = Some(value.to_string());
    }

    fn summary(&self) -> String {
        let out_time = self.out_time.as_deref().map(trim_fraction);
        let size = self
            .total_size
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|bytes| format!("{}kB", bytes / 1024));

        [
            ("frame", self.frame.clone()),
            ("fps", self.fps.clone()),
            ("size", size),
            ("time", out_time),
            ("bitrate", self.bitrate.clone()),
            ("speed", self.speed.clone()),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.map(|v| format!("{label}={v}")))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// `00:00:10.000000` -> `00:00:10.00`
fn trim_fraction(time: &str) -> String {
    match time.split_once('.') {
        Some((whole, fraction)) => {
            let cut = fraction.char_indices().nth(2).map_or(fraction.len(), |(i, _)| i);
            format!("{whole}.{}", &fraction[..cut])
        }
        None => time.to_string(),
    }
}

/// Folds progress blocks into periodic summary lines.
#[derive(Debug, Clone)]
pub struct ProgressReducer {
    stride: usize,
    updates: usize,
    state: ProgressState,
}

impl ProgressReducer {
    /// Summarize every `stride`-th block. A stride of zero only reports the
    /// final block.
    pub fn new(stride: usize) -> Self {
        Self {
            stride,
            updates: 0,
            state: ProgressState::default(),
        }
    }

    /// Feed one line. Returns a summary when one is due.
    pub fn push(&mut self, line: &str) -> Option<String> {
        let (key, value) = line.trim().split_once('=')?;
        let (key, value) = (key.trim(), value.trim());
        if key != "progress" {
            self.state.update(key, value);
            return None;
        }

        self.updates += 1;
        let due = value == "end" || (self.stride > 0 && self.updates % self.stride == 0);
        due.then(|| self.state.summary())
    }

    /// Number of blocks seen so far.
    pub fn updates(&self) -> usize {
        self.updates
    }
}
