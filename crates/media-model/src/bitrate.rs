//! Bitrate notation and the adaptive bitrate advisory.
//!
//! Bitrates travel as text (`1371k`, `1M`) on the command line and as whole
//! kilobits in computations. The advisory lowers a requested bitrate when the
//! source file itself cannot sustain it.

/// Kilobits added on top of the video bitrate for the audio track.
pub const AUDIO_OVERHEAD_KBIT: i64 = 128;

/// Parse `<int>k` or `<int>M` into kilobits.
///
/// Any other suffix, a value that is not an integer, or one too large to
/// hold in kilobits yields `0`. Callers treat `0` as "leave the bitrate
/// unchanged".
pub fn parse_bitrate(text: &str) -> i64 {
    let text = text.trim();
    if let Some(value) = text.strip_suffix('k') {
        value.parse().unwrap_or(0)
    } else if let Some(value) = text.strip_suffix('M') {
        value
            .parse::<i64>()
            .ok()
            .and_then(|v| v.checked_mul(1024))
            .unwrap_or(0)
    } else {
        0
    }
}

/// Render kilobits as `<kilobit>k`.
pub fn format_bitrate(kilobit: i64) -> String {
    format!("{kilobit}k")
}

/// Size in bytes an encode of `duration_secs` at `target_kbit` (plus audio)
/// is expected to reach.
pub fn expected_encoded_bytes(duration_secs: f64, target_kbit: i64) -> f64 {
    (target_kbit as f64 + AUDIO_OVERHEAD_KBIT as f64) * duration_secs / 8.0 * 1024.0
}

/// Pick the bitrate to encode with.
///
/// When the source is at least as large as the expected output the target
/// is kept. Otherwise the bitrate implied by the source size, minus the
/// audio overhead, is returned, truncated toward zero. The result may be
/// zero or negative for very small sources; see [`BitrateAdvice`].
pub fn advise_bitrate(duration_secs: f64, target_kbit: i64, source_bytes: u64) -> i64 {
    if target_kbit <= 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
        return target_kbit;
    }
    let source = source_bytes as f64;
    if source >= expected_encoded_bytes(duration_secs, target_kbit) {
        return target_kbit;
    }
    let implied_kbit = source * 8.0 / 1024.0 / duration_secs;
    (implied_kbit - AUDIO_OVERHEAD_KBIT as f64) as i64
}

/// Outcome of the advisory, as seen by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitrateAdvice {
    /// The source sustains the requested bitrate.
    Keep,
    /// The bitrate should be lowered to the given kilobits.
    Reduce(i64),
    /// The source implies a bitrate at or below the audio overhead alone.
    Unusable(i64),
}

impl BitrateAdvice {
    /// Classify [`advise_bitrate`] for a target.
    pub fn evaluate(duration_secs: f64, target_kbit: i64, source_bytes: u64) -> Self {
        let advised = advise_bitrate(duration_secs, target_kbit, source_bytes);
        if advised == target_kbit {
            Self::Keep
        } else if advised <= 0 {
            Self::Unusable(advised)
        } else {
            Self::Reduce(advised)
        }
    }
}
