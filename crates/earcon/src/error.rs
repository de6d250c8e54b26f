//! Error types for the earcon crate.

use std::path::PathBuf;

/// Stable classification of [`EarconError`]s.
///
/// Both variants describe the same recoverable condition: one configured
/// instrument pair could not be launched. The remaining pairs still play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A named instrument reference could not be resolved.
    UnresolvedInstrument,
    /// The pair carries no play options.
    MissingPlayOptions,
}

impl ErrorKind {
    /// Diagnostic code reported to hosts.
    pub fn code(self) -> &'static str {
        match self {
            Self::UnresolvedInstrument => "earcon.instrument.unresolved",
            Self::MissingPlayOptions => "earcon.instrument.missing-play-options",
        }
    }
}

/// A configured instrument pair that could not be launched by `sonify`.
///
/// These errors are reported, never propagated: `sonify` logs them, emits
/// them on the earcon's `error` signal and lists them in its report.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EarconError {
    /// No instrument is registered under the referenced name.
    #[error("Earcon '{earcon}': instrument #{index} '{name}' is not registered")]
    UnresolvedInstrument {
        earcon: String,
        index: usize,
        name: String,
    },

    /// The pair has no play options.
    #[error("Earcon '{earcon}': instrument #{index} has no play options")]
    MissingPlayOptions { earcon: String, index: usize },
}

impl EarconError {
    /// Create an unresolved instrument error.
    pub fn unresolved(earcon: impl Into<String>, index: usize, name: impl Into<String>) -> Self {
        Self::UnresolvedInstrument {
            earcon: earcon.into(),
            index,
            name: name.into(),
        }
    }

    /// Create a missing play options error.
    pub fn missing_play_options(earcon: impl Into<String>, index: usize) -> Self {
        Self::MissingPlayOptions {
            earcon: earcon.into(),
            index,
        }
    }

    /// The error classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnresolvedInstrument { .. } => ErrorKind::UnresolvedInstrument,
            Self::MissingPlayOptions { .. } => ErrorKind::MissingPlayOptions,
        }
    }

    /// Diagnostic code, shorthand for `self.kind().code()`.
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// Position of the offending pair in the instrument list.
    pub fn index(&self) -> usize {
        match self {
            Self::UnresolvedInstrument { index, .. } | Self::MissingPlayOptions { index, .. } => {
                *index
            }
        }
    }
}

/// Audio output errors raised by the synthesized instruments.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// No audio output device could be opened.
    #[error("Audio device error: {0}")]
    Device(#[from] rodio::StreamError),
}

/// Errors raised while loading or validating earcon definitions.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// The definition file could not be read or written.
    #[error("Failed to access earcon definition '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parse error.
    #[error("Invalid earcon definition: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("Failed to serialize earcon definition: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A field holds a value outside its accepted range.
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl DefinitionError {
    /// Create an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a value error.
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for audio output operations.
pub type Result<T> = std::result::Result<T, AudioError>;

/// Result type alias for definition operations.
pub type DefinitionResult<T> = std::result::Result<T, DefinitionError>;
