use thiserror::Error as ThisError;

/// Convenient alias, which defaults to [`Error`] as [`Err`]-Variant.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error variants returned by this crate.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("{0}")]
    Unique(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Program error: {0}")]
    Program(#[from] program::Error),

    #[error("Variant error: {0}")]
    Variant(#[from] variant::Error),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Unique(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Unique(s)
    }
}
