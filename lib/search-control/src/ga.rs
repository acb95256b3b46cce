//! The weighted micro-mutation genetic algorithm.

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use variant::Representation;

use crate::{
    fitness::{score, FitnessEvaluator, FitnessRecord},
    mutate::{self, MutationSettings, SearchSplit},
    select,
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaParams {
    pub generations: usize,
    pub pop_size: usize,
    pub mut_rate: f64,
    pub subatom_mut_rate: f64,
    pub subatom_const_rate: f64,
    pub cross_rate: f64,
    pub pro_mut: usize,
    pub tournament_k: usize,
    pub tournament_p: f64,
    #[serde(skip)]
    pub split: Option<SearchSplit>,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            generations: 10,
            pop_size: 40,
            mut_rate: 0.06,
            subatom_mut_rate: 0.0,
            subatom_const_rate: 0.5,
            cross_rate: 1.0,
            pro_mut: 1,
            tournament_k: 2,
            tournament_p: 1.0,
            split: None,
        }
    }
}

impl GaParams {
    fn mutation_settings(&self) -> MutationSettings {
        MutationSettings {
            mut_rate: self.mut_rate,
            subatom_mut_rate: self.subatom_mut_rate,
            subatom_const_rate: self.subatom_const_rate,
            pro_mut: self.pro_mut,
            split: self.split,
        }
    }
}

/// What a finished (or solved) run hands back.
pub struct GaOutcome<R> {
    /// The repair, if one was found.
    pub solution: Option<FitnessRecord<R>>,
    /// The final evaluated population.
    pub population: Vec<FitnessRecord<R>>,
    /// Generations actually bred before returning.
    pub generations_run: usize,
}

/// One deme's sequential evolve loop: evaluate, select, cross, mutate.
pub struct GeneticEngine<R, E> {
    original: R,
    params: GaParams,
    evaluator: E,
    rng: StdRng,
}

impl<R, E> GeneticEngine<R, E>
where
    R: Representation,
    E: FitnessEvaluator<R>,
{
    pub fn new(original: R, params: GaParams, evaluator: E, seed: u64) -> Self {
        Self {
            original,
            params,
            evaluator,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn params(&self) -> &GaParams {
        &self.params
    }

    /// Start a fresh run from external seed variants.
    ///
    /// At most `pop_size - 1` seeds are accepted; one copy of the original
    /// joins them and mutated originals fill the remainder.
    pub fn run(&mut self, seeds: Vec<R>) -> Result<GaOutcome<R>> {
        if seeds.len() > self.params.pop_size.saturating_sub(1) {
            return Err(Error::SeedPopulationTooLarge {
                len: seeds.len(),
                pop_size: self.params.pop_size,
            });
        }
        let mut population = seeds;
        population.push(self.original.clone());
        self.fill_population(&mut population)?;
        let generations = self.params.generations;
        self.run_span(population, generations)
    }

    /// Run `generations` generations over an already-assembled population,
    /// as the exchange rounds of the distributed mode do. Short
    /// populations are topped up with mutated originals; long ones are
    /// truncated.
    pub fn run_span(&mut self, mut population: Vec<R>, generations: usize) -> Result<GaOutcome<R>> {
        population.truncate(self.params.pop_size);
        self.fill_population(&mut population)?;

        let threshold = self.evaluator.solution_threshold();
        let mut records = self.evaluate_all(population);
        let mut generations_run = 0;

        loop {
            let best = records
                .iter()
                .map(|record| record.fitness)
                .fold(f64::MIN, f64::max);
            tracing::debug!(
                "Generation {generations_run}: best fitness {best:.3} of {threshold:.3}"
            );
            if let Some(solution) = find_solution(&records, threshold) {
                tracing::info!(
                    "Repair found at generation {generations_run} with fitness {:.3}",
                    solution.fitness
                );
                return Ok(GaOutcome {
                    solution: Some(solution),
                    population: records,
                    generations_run,
                });
            }
            if generations_run >= generations {
                return Ok(GaOutcome {
                    solution: None,
                    population: records,
                    generations_run,
                });
            }

            let parents = self.select_parents(&records);
            let crossed = self.crossover(parents)?;
            let next = self.mutate_all(crossed)?;
            records = self.evaluate_all(next);
            generations_run += 1;
        }
    }

    fn fill_population(&mut self, population: &mut Vec<R>) -> Result<()> {
        let settings = self.params.mutation_settings();
        while population.len() < self.params.pop_size {
            let mut filler = self.original.clone();
            mutate::mutate(&mut filler, &settings, &mut self.rng)?;
            population.push(filler);
        }
        Ok(())
    }

    fn evaluate_all(&mut self, population: Vec<R>) -> Vec<FitnessRecord<R>> {
        population
            .into_iter()
            .map(|mut individual| {
                let fitness = score(&mut self.evaluator, &mut individual);
                FitnessRecord::new(individual, fitness)
            })
            .collect()
    }

    fn select_parents(&mut self, records: &[FitnessRecord<R>]) -> Vec<R> {
        (0..self.params.pop_size)
            .map(|_| {
                let index = select::tournament_select(
                    records,
                    self.params.tournament_k,
                    self.params.tournament_p,
                    &mut self.rng,
                );
                records[index].variant.clone()
            })
            .collect()
    }

    fn crossover(&mut self, mut parents: Vec<R>) -> Result<Vec<R>> {
        let fault_len = self.original.fault_localization().len();
        if fault_len == 0 {
            return Ok(parents);
        }
        for couple in parents.chunks_exact_mut(2) {
            if self.rng.gen::<f64>() < self.params.cross_rate {
                let cut = self.rng.gen_range(0..fault_len);
                let (first, second) = couple.split_at_mut(1);
                first[0].one_point_crossover(&mut second[0], cut)?;
            }
        }
        Ok(parents)
    }

    fn mutate_all(&mut self, mut population: Vec<R>) -> Result<Vec<R>> {
        let settings = self.params.mutation_settings();
        for individual in &mut population {
            mutate::mutate(individual, &settings, &mut self.rng)?;
        }
        Ok(population)
    }
}

fn find_solution<R: Clone>(
    records: &[FitnessRecord<R>],
    threshold: f64,
) -> Option<FitnessRecord<R>> {
    records
        .iter()
        .filter(|record| record.is_solution(threshold))
        .max_by(|a, b| {
            a.fitness
                .partial_cmp(&b.fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use program::{ast::StatementId, store::AtomStore};
    use variant::{CoreContext, Edit, Localization, PatchProgram};

    use super::*;

    const BROKEN_MAX: &str = r#"
        int max(int a, int b) {
            int best = a;
            best = b;
            return best;
        }
    "#;

    fn ctx() -> Arc<CoreContext> {
        let store = AtomStore::from_sources(&[("max.c", BROKEN_MAX)]).unwrap();
        let localization = Localization::uniform(&store);
        Arc::new(CoreContext::new(store, localization))
    }

    /// Scores a variant by its history: deleting the clobbering write
    /// (atom 2) is the repair.
    struct HistoryEvaluator;

    impl FitnessEvaluator<PatchProgram> for HistoryEvaluator {
        fn evaluate(&mut self, variant: &mut PatchProgram) -> crate::Result<f64> {
            let repaired = variant
                .history()
                .iter()
                .any(|edit| *edit == Edit::Delete(StatementId::new(2)));
            Ok(if repaired { 5.0 } else { 1.0 })
        }

        fn solution_threshold(&self) -> f64 {
            5.0
        }
    }

    #[test]
    fn a_seeded_exact_fix_survives_one_generation() {
        let ctx = ctx();
        let original = PatchProgram::new(Arc::clone(&ctx));
        let mut fix = original.clone();
        fix.delete(StatementId::new(2)).unwrap();

        let params = GaParams {
            generations: 1,
            pop_size: 4,
            ..GaParams::default()
        };
        let mut engine = GeneticEngine::new(original.clone(), params, HistoryEvaluator, 42);
        let population = vec![original.clone(), original.clone(), original, fix];
        let outcome = engine.run_span(population, 1).unwrap();

        let solution = outcome.solution.expect("the seeded fix must survive");
        assert_eq!(solution.fitness, 5.0);
        assert_eq!(outcome.generations_run, 0);
    }

    #[test]
    fn the_search_finds_a_single_deletion_repair() {
        let ctx = ctx();
        let original = PatchProgram::new(Arc::clone(&ctx));
        let params = GaParams {
            generations: 30,
            pop_size: 10,
            mut_rate: 1.0,
            ..GaParams::default()
        };
        let mut engine = GeneticEngine::new(original, params, HistoryEvaluator, 7);
        let outcome = engine.run(Vec::new()).unwrap();
        assert!(outcome.solution.is_some(), "deletion of atom 2 never found");
    }

    #[test]
    fn oversized_seed_populations_abort() {
        let ctx = ctx();
        let original = PatchProgram::new(Arc::clone(&ctx));
        let params = GaParams {
            pop_size: 2,
            ..GaParams::default()
        };
        let seeds = vec![original.clone(), original.clone()];
        let mut engine = GeneticEngine::new(original, params, HistoryEvaluator, 0);
        assert!(matches!(
            engine.run(seeds),
            Err(Error::SeedPopulationTooLarge { .. })
        ));
    }
}
