use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Size too small")]
    SizeTooSmall,

    #[error("You need to be authenticated to perform this action")]
    NotLoggedIn,

    #[error("Too many tries for operation {operation}")]
    TooManyTries { operation: String },

    #[error("Login failed")]
    LoginFailed,

    #[error("Logout failed")]
    LogoutFailed,

    #[error("{0}")]
    ParseResponse(String),

    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Subtitles not found for file: {}", path.display())]
    SubtitlesNotFound { path: PathBuf },

    #[error("Unknown result: {0}")]
    UnknownResult(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Malformed XML response: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid rar archive: {0}")]
    Rar(#[from] unrar::error::UnrarError),
}

/// What the per-file loop should do after a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log it and move on to the next file.
    Skip,
    /// The provider session is unusable; stop processing its worklist.
    AbortSession,
}

impl Error {
    pub fn subtitles_not_found(path: impl Into<PathBuf>) -> Self {
        Error::SubtitlesNotFound { path: path.into() }
    }

    pub fn too_many_tries(operation: &str) -> Self {
        Error::TooManyTries {
            operation: operation.to_string(),
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            Error::NotLoggedIn => Disposition::AbortSession,
            _ => Disposition::Skip,
        }
    }
}
