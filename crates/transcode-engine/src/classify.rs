//! Classification of encoder diagnostics.
//!
//! Each stderr line is offered to an ordered list of classifiers. A
//! classifier either handles the line, which ends the chain, or passes it
//! on. Detectors for known fatal diagnostics terminate the encoder and
//! replace the line with a short message; a printer at the end forwards
//! whatever is left, either every line or only the stats line.

use std::sync::LazyLock;

use regex::Regex;

/// What a classifier may do to the process whose output it is reading.
pub trait ProcessControl {
    /// Kill the process. Not a request the process can refuse.
    fn terminate(&self);

    /// Write a line to the user-facing console.
    fn emit(&self, line: &str);
}

/// Result of offering a line to a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The line was consumed; later classifiers do not see it.
    Handled,
    /// The line is forwarded unchanged to the next classifier.
    Pass,
}

pub trait LineClassifier: Send + Sync {
    fn classify(&self, control: &dyn ProcessControl, line: &str) -> Classification;
}

/// Prefix of every message the tool itself writes to the console.
pub const MESSAGE_PREFIX: &str = "burner: ";

/// Prefix of the encoder's own stats line.
const STATUS_PREFIX: &str = "frame=";

static GLYPH_NOT_FOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[Parsed_subtitles_\d+ @ \w+\] Glyph 0x(\w+) not found")
        .expect("glyph pattern is valid")
});

/// `(family key, pattern)` for the fallback fonts libass picks when the
/// requested one is missing: Arial on Windows, DejaVuSans on Linux,
/// Helvetica on macOS.
static FONT_FALLBACKS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Arial", "ArialMT|Arial-BoldMT|Arial-ItalicMT"),
        ("DejaVuSans", "DejaVuSans"),
        ("Helvetica", "Helvetica"),
    ]
    .into_iter()
    .map(|(family, resolved)| {
        let pattern = format!(
            r"\[Parsed_subtitles_\d+ @ \w+\] fontselect: \((.*?), \d+, \d+\) -> .*?, -?\d+, (?:{resolved})$"
        );
        let regex = Regex::new(&pattern).expect("font fallback pattern is valid");
        (family, regex)
    })
    .collect()
});

/// The subtitle renderer has no glyph for a character.
#[derive(Debug, Default)]
pub struct GlyphNotFound;

impl LineClassifier for GlyphNotFound {
    fn classify(&self, control: &dyn ProcessControl, line: &str) -> Classification {
        let Some(caps) = GLYPH_NOT_FOUND.captures(line) else {
            return Classification::Pass;
        };
        let code = &caps[1];
        let character = u32::from_str_radix(code, 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| format!("0x{code}"));

        tracing::debug!(code, "missing glyph");
        control.terminate();
        control.emit(&format!(
            "{MESSAGE_PREFIX}was not able to find font for `{character}` char"
        ));
        Classification::Handled
    }
}

/// The subtitle renderer silently replaced a requested font with a
/// platform fallback.
#[derive(Debug, Default)]
pub struct FontSubstitution;

impl LineClassifier for FontSubstitution {
    fn classify(&self, control: &dyn ProcessControl, line: &str) -> Classification {
        for (family, pattern) in FONT_FALLBACKS.iter() {
            let Some(caps) = pattern.captures(line) else {
                continue;
            };
            let requested = &caps[1];
            if family.starts_with(requested) {
                continue;
            }
            tracing::debug!(requested, fallback = *family, "font substituted");
            control.terminate();
            control.emit(&format!("{MESSAGE_PREFIX}missing `{requested}` font"));
            return Classification::Handled;
        }
        Classification::Pass
    }
}

/// The encoder found an existing output file and refused to touch it.
#[derive(Debug, Default)]
pub struct RefuseOverwrite;

impl RefuseOverwrite {
    const SUFFIX: &'static str = "Not overwriting - exiting";
}

impl LineClassifier for RefuseOverwrite {
    fn classify(&self, control: &dyn ProcessControl, line: &str) -> Classification {
        if !line.ends_with(Self::SUFFIX) {
            return Classification::Pass;
        }
        // "File 'a.mp4' already exists. Overwrite ? [y/N] Not overwriting - exiting"
        let end = line.rfind('.').map_or(0, |i| i + 1);
        control.terminate();
        control.emit(&format!("{MESSAGE_PREFIX}{}", &line[..end]));
        Classification::Handled
    }
}

/// Forwards only the encoder's stats line, as an in-place update.
#[derive(Debug, Default)]
pub struct StatusPrinter;

impl LineClassifier for StatusPrinter {
    fn classify(&self, control: &dyn ProcessControl, line: &str) -> Classification {
        if line.starts_with(STATUS_PREFIX) {
            control.emit(&format!("{line}\r"));
        }
        Classification::Handled
    }
}

/// Forwards every line. The encoder's stats line is written as an
/// in-place update.
#[derive(Debug, Default)]
pub struct DefaultPrinter;

impl LineClassifier for DefaultPrinter {
    fn classify(&self, control: &dyn ProcessControl, line: &str) -> Classification {
        if line.starts_with(STATUS_PREFIX) {
            control.emit(&format!("{line}\r"));
        } else {
            control.emit(line);
        }
        Classification::Handled
    }
}

/// Ordered list of classifiers, evaluated front to back.
pub struct ClassifierChain {
    classifiers: Vec<Box<dyn LineClassifier>>,
}

impl ClassifierChain {
    pub fn new(classifiers: Vec<Box<dyn LineClassifier>>) -> Self {
        Self { classifiers }
    }

    /// The detectors followed by a printer: [`DefaultPrinter`] when
    /// `verbose`, [`StatusPrinter`] otherwise.
    ///
    /// With `tolerate_font_errors` the glyph and font detectors are left
    /// out, so those lines reach the printer.
    pub fn standard(tolerate_font_errors: bool, verbose: bool) -> Self {
        let mut classifiers: Vec<Box<dyn LineClassifier>> = Vec::new();
        if !tolerate_font_errors {
            classifiers.push(Box::new(GlyphNotFound));
            classifiers.push(Box::new(FontSubstitution));
        }
        classifiers.push(Box::new(RefuseOverwrite));
        if verbose {
            classifiers.push(Box::new(DefaultPrinter));
        } else {
            classifiers.push(Box::new(StatusPrinter));
        }
        Self::new(classifiers)
    }

    /// Offer `line` to each classifier until one handles it.
    pub fn dispatch(&self, control: &dyn ProcessControl, line: &str) -> Classification {
        for classifier in &self.classifiers {
            if classifier.classify(control, line) == Classification::Handled {
                return Classification::Handled;
            }
        }
        Classification::Pass
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}

impl std::fmt::Debug for ClassifierChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierChain")
            .field("len", &self.classifiers.len())
            .finish()
    }
}
