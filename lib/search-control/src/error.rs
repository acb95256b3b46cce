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

    #[error("Seed population of {len} does not fit a population of {pop_size} plus the original")]
    SeedPopulationTooLarge { len: usize, pop_size: usize },

    #[error("Evaluator failure: {0}")]
    Evaluator(String),
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
