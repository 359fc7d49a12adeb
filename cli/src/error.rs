use thiserror::Error;

/// User-facing failures. Each one is recovered locally and shown as an error message;
/// none of them leave the controller in a broken state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoryError {
    #[error("Please enter a prompt before generating.")]
    EmptyPrompt,

    #[error("No scene text to play.")]
    NoContent,

    #[error("On-device speech synthesis not available.")]
    UnsupportedCapability,

    #[error("No download available. Try generating a story first.")]
    NoArtifact,

    #[error("Failed to save download: {0}")]
    Download(String),
}

pub type StoryResult<T> = std::result::Result<T, StoryError>;
