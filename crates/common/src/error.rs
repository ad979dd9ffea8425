//! Error types shared across Burner crates.

/// Top-level error type for Burner operations.
#[derive(Debug, thiserror::Error)]
pub enum BurnerError {
    /// Fatal to the whole run: missing directories or executables.
    #[error("Setup error: {message}")]
    Setup { message: String },

    #[error("Probe error: {message}")]
    Probe { message: String },

    #[error("Link error: {message}")]
    Link { message: String },

    /// A pass failed, either on its own or because a classifier killed it.
    #[error("Process error: {message}")]
    Process { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using BurnerError.
pub type BurnerResult<T> = Result<T, BurnerError>;

impl BurnerError {
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup {
            message: msg.into(),
        }
    }

    pub fn probe(msg: impl Into<String>) -> Self {
        Self::Probe {
            message: msg.into(),
        }
    }

    pub fn link(msg: impl Into<String>) -> Self {
        Self::Link {
            message: msg.into(),
        }
    }

    pub fn process(msg: impl Into<String>) -> Self {
        Self::Process {
            message: msg.into(),
        }
    }

    /// Whether the error should end the whole run rather than a single file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Setup { .. })
    }
}
