//! # Search engines over candidate variants
//!
//! Two ways to walk the space of edits: [`BruteForceEngine`] enumerates
//! every distance-one edit in priority order and stops at the first
//! solution, [`GeneticEngine`] runs the weighted micro-mutation genetic
//! algorithm with tournament selection and one-point crossover.
//!
//! Both consume the same three things: a [`variant::Representation`] of
//! the original, the localization attached to it, and a
//! [`FitnessEvaluator`]. A variant whose fitness reaches the evaluator's
//! solution threshold is a repair.
//!
//! Every random draw inside an engine comes from one seeded generator
//! owned by that engine; the same seed over the same inputs replays the
//! same search.

mod brute;
mod error;
mod fitness;
mod ga;
mod mutate;
mod select;

pub use self::{
    brute::{BruteForceEngine, BruteForceSettings},
    error::{Error, Result},
    fitness::{CachingEvaluator, FitnessEvaluator, FitnessRecord, SENTINEL_FITNESS},
    ga::{GaOutcome, GaParams, GeneticEngine},
    mutate::{MutationSettings, SearchSplit},
};
