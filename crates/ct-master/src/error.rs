use thiserror::Error;

/// Errors from the controller.
#[derive(Debug, Error)]
pub enum MasterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("song has no sections to play")]
    NoSections,

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("failed to load song: {0}")]
    Load(#[source] Box<dyn std::error::Error + Send + Sync>),
}
