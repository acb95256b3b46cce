use thiserror::Error as ThisError;

/// Convenient alias, which defaults to [`Error`] as [`Err`]-Variant.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error variants returned by this crate.
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("{0}")]
    Unique(String),

    #[error("Variant error: {0}")]
    Variant(#[from] variant::Error),

    #[error("Search error: {0}")]
    Search(#[from] search_control::Error),

    #[error("Deme {comp_id} panicked or was cancelled: {message}")]
    DemeJoin { comp_id: usize, message: String },

    #[error(
        "Cannot exchange {variants_exchanged} variants out of a population of {pop_size}"
    )]
    ExchangeTooLarge {
        variants_exchanged: usize,
        pop_size: usize,
    },

    #[error("The distributed mode needs {expected} evaluators, got {got}")]
    EvaluatorCount { expected: usize, got: usize },
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
