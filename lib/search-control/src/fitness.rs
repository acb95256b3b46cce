//! The fitness contract between the search engines and whatever compiles
//! and tests variants.

use std::collections::HashMap;

use variant::Representation;

use crate::Result;

/// Fitness assigned to a variant whose evaluation failed outright
/// (compile error, harness failure). Such variants stay in the population
/// and are selected against.
pub const SENTINEL_FITNESS: f64 = 0.0;

/// Scores variants. Higher is better; a variant reaching
/// [`solution_threshold`] passes every test.
///
/// [`solution_threshold`]: FitnessEvaluator::solution_threshold
pub trait FitnessEvaluator<R: Representation> {
    fn evaluate(&mut self, variant: &mut R) -> Result<f64>;

    /// The fitness of a full repair: the positive-test count.
    fn solution_threshold(&self) -> f64;
}

/// A variant paired with its evaluated fitness.
#[derive(Debug, Clone)]
pub struct FitnessRecord<R> {
    pub variant: R,
    pub fitness: f64,
}

impl<R> FitnessRecord<R> {
    pub fn new(variant: R, fitness: f64) -> Self {
        Self { variant, fitness }
    }

    pub fn is_solution(&self, threshold: f64) -> bool {
        self.fitness >= threshold
    }
}

/// Memoizes fitness on the serialized edit history, so identical histories
/// are compiled and run once per deme.
pub struct CachingEvaluator<E> {
    inner: E,
    cache: HashMap<String, f64>,
    hits: u64,
}

impl<E> CachingEvaluator<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: HashMap::new(),
            hits: 0,
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<R: Representation, E: FitnessEvaluator<R>> FitnessEvaluator<R> for CachingEvaluator<E> {
    fn evaluate(&mut self, variant: &mut R) -> Result<f64> {
        let fingerprint = variant.fingerprint();
        if let Some(fitness) = self.cache.get(&fingerprint) {
            self.hits += 1;
            variant.mark_clean();
            return Ok(*fitness);
        }
        let fitness = self.inner.evaluate(variant)?;
        self.cache.insert(fingerprint, fitness);
        variant.mark_clean();
        Ok(fitness)
    }

    fn solution_threshold(&self) -> f64 {
        self.inner.solution_threshold()
    }
}

/// Evaluate, turning evaluator failures into the sentinel fitness.
pub(crate) fn score<R, E>(evaluator: &mut E, variant: &mut R) -> f64
where
    R: Representation,
    E: FitnessEvaluator<R>,
{
    match evaluator.evaluate(variant) {
        Ok(fitness) => fitness,
        Err(err) => {
            tracing::warn!("Evaluation failed, assigning sentinel fitness: {err}");
            SENTINEL_FITNESS
        }
    }
}
