//! Error taxonomy for the dictation player.

use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure categories, ordered roughly by severity.
///
/// Only [`Error::DataSource`] is fatal, and only at session start. Everything
/// else is absorbed at the track or repeat level: the affected clip is
/// skipped and the session advances.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or whitespace-only text. A skip, not a failure — never
    /// forwarded to the synthesis backend.
    #[error("no content to synthesize")]
    NoContent,

    /// The TTS backend rejected or failed the request.
    #[error("synthesis failed: {0}")]
    Generation(String),

    /// The audio output device or clip data could not be played.
    #[error("playback failed: {0}")]
    Playback(String),

    /// The sentence sheet could not be read. Fatal to session start.
    #[error("sentence source error: {0}")]
    DataSource(String),

    /// Settings or study-time write error. Logged, never blocks progress.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl Error {
    /// True for failures that must abort entry into a session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DataSource(_))
    }
}
