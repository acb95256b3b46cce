use std::path::PathBuf;

use thiserror::Error as ThisError;

use crate::ast::StatementId;

/// Convenient alias, which defaults to [`Error`] as [`Err`]-Variant.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error variants returned by this crate.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("{0}")]
    Unique(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown input extension: {0}")]
    UnknownExtension(PathBuf),

    #[error("{file}:{line}: parse error: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}:{line}: unknown variable `{name}`")]
    UnknownVariable {
        file: String,
        line: usize,
        name: String,
    },

    #[error("Statement {0} is not in the code bank")]
    UnknownStatement(StatementId),

    #[error("Missing scope information for statement {0}")]
    MissingScopeInfo(StatementId),

    #[error("Statement {0} was numbered twice")]
    DuplicateStatementId(StatementId),

    #[error("Subatom index {index} is out of range for statement {id} ({len} subatoms)")]
    SubatomIndex {
        id: StatementId,
        index: usize,
        len: usize,
    },
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
