use thiserror::Error as ThisError;

use program::ast::StatementId;

/// Convenient alias, which defaults to [`Error`] as [`Err`]-Variant.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error variants returned by this crate.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("{0}")]
    Unique(String),

    #[error("Program error: {0}")]
    Program(#[from] program::Error),

    #[error("Edit references unknown statement {0}")]
    UnknownEditTarget(StatementId),

    #[error("Unknown template `{0}`")]
    UnknownTemplate(String),

    #[error("Template `{template}` is missing the `{hole}` binding")]
    MissingTemplateBinding { template: String, hole: String },
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
