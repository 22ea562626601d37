use thiserror::Error;

/// Main error type for the library.
#[derive(Debug, Error)]
pub enum Error {
    /// Used when the user pass a logical invalid parameter to a function.
    #[error("Parameter error: {0}")]
    InvalidParameter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    /// Malformed calibration, oxts, timestamp or intrinsics content.
    #[error("Parser error: {0}")]
    Parser(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),
    #[cfg(feature = "viz")]
    #[error("Viewer error: {0}")]
    Viz(#[from] rerun::RecordingStreamError),
}

impl Error {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        Error::InvalidParameter(msg.to_string())
    }

    /// Create a error with the kind `Parser`.
    pub fn parser<T: ToString>(msg: T) -> Self {
        Error::Parser(msg.to_string())
    }
}

impl From<glob::GlobError> for Error {
    fn from(err: glob::GlobError) -> Self {
        Error::Io(err.into())
    }
}
