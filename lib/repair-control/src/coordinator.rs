use search_control::{FitnessEvaluator, FitnessRecord, GaParams, GeneticEngine, SearchSplit};
use variant::{codec, Representation};

use crate::{
    exchange::{select_outgoing, ExchangePolicy},
    Error, Result,
};

/// Shape of a distributed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributedConfig {
    /// Number of demes.
    pub num_comps: usize,
    /// Variants each deme sends per exchange.
    pub variants_exchanged: usize,
    /// Generations between exchanges.
    pub gen_per_exchange: usize,
    /// Pick travelers by edit coverage instead of raw fitness.
    pub diversity_selection: bool,
    /// Partition the statement-id space across demes.
    pub split_search: bool,
    /// Total generations per deme over the whole run.
    pub total_generations: usize,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            num_comps: num_cpus::get().max(1),
            variants_exchanged: 5,
            gen_per_exchange: 5,
            diversity_selection: false,
            split_search: false,
            total_generations: 10,
        }
    }
}

pub struct DistributedOutcome<R> {
    pub solution: Option<FitnessRecord<R>>,
    /// Exchange rounds completed before returning.
    pub rounds_run: usize,
}

struct Deme<R, E> {
    comp_id: usize,
    engine: GeneticEngine<R, E>,
    population: Vec<R>,
}

/// Runs the demes round by round: every deme evolves for
/// `gen_per_exchange` generations in its own blocking task, then the
/// coordinator rotates each deme's outgoing message to the next deme in
/// the ring. Nothing but the messages crosses a deme boundary.
pub struct DistributedCoordinator<R, E> {
    config: DistributedConfig,
    original: R,
    threshold: f64,
    demes: Vec<Deme<R, E>>,
}

impl<R, E> DistributedCoordinator<R, E>
where
    R: Representation,
    E: FitnessEvaluator<R> + Send + 'static,
{
    /// One evaluator per deme; deme `i` is seeded with `seed + i`.
    pub fn new(
        original: R,
        ga: GaParams,
        config: DistributedConfig,
        evaluators: Vec<E>,
        seed: u64,
    ) -> Result<Self> {
        if evaluators.len() != config.num_comps {
            return Err(Error::EvaluatorCount {
                expected: config.num_comps,
                got: evaluators.len(),
            });
        }
        if config.variants_exchanged > ga.pop_size {
            return Err(Error::ExchangeTooLarge {
                variants_exchanged: config.variants_exchanged,
                pop_size: ga.pop_size,
            });
        }
        let threshold = evaluators
            .first()
            .map(|evaluator| evaluator.solution_threshold())
            .unwrap_or(0.0);

        let demes = evaluators
            .into_iter()
            .enumerate()
            .map(|(index, evaluator)| {
                let comp_id = index + 1;
                let mut params = ga;
                if config.split_search {
                    params.split = Some(SearchSplit {
                        num_comps: config.num_comps as u32,
                        comp_id: comp_id as u32,
                    });
                }
                Deme {
                    comp_id,
                    engine: GeneticEngine::new(
                        original.clone(),
                        params,
                        evaluator,
                        seed.wrapping_add(index as u64),
                    ),
                    // The first span grows this into a full population
                    // around the original.
                    population: vec![original.clone()],
                }
            })
            .collect();

        Ok(Self {
            config,
            original,
            threshold,
            demes,
        })
    }

    pub async fn run(mut self) -> Result<DistributedOutcome<R>> {
        let policy = ExchangePolicy {
            pop_size: ga_pop_size(&self.demes),
            variants_exchanged: self.config.variants_exchanged,
            diversity_selection: self.config.diversity_selection,
        };

        let mut remaining = self.config.total_generations;
        let mut rounds_run = 0;
        while remaining > 0 {
            let span = self.config.gen_per_exchange.min(remaining).max(1);
            remaining -= span;

            let handles: Vec<_> = self
                .demes
                .drain(..)
                .map(|mut deme| {
                    tokio::task::spawn_blocking(move || {
                        let population = std::mem::take(&mut deme.population);
                        let _span =
                            tracing::debug_span!("deme", comp_id = deme.comp_id).entered();
                        let outcome = deme.engine.run_span(population, span)?;
                        Ok::<_, Error>((deme, outcome))
                    })
                })
                .collect();

            let mut solutions = Vec::new();
            let mut survivors = Vec::new();
            let mut messages = Vec::new();
            for (index, handle) in futures::future::join_all(handles).await.into_iter().enumerate()
            {
                let (deme, outcome) = handle.map_err(|err| Error::DemeJoin {
                    comp_id: index + 1,
                    message: err.to_string(),
                })??;
                if let Some(solution) = outcome.solution {
                    tracing::info!("Deme {} found a repair", deme.comp_id);
                    solutions.push(solution);
                }
                let (outgoing, retained) = select_outgoing(
                    outcome.population,
                    &policy,
                    &self.original,
                    self.threshold,
                );
                let histories: Vec<Vec<variant::Edit>> = outgoing
                    .iter()
                    .map(|record| record.variant.history().to_vec())
                    .collect();
                messages.push(codec::encode_variants(&histories));
                survivors.push((deme, retained));
            }
            rounds_run += 1;

            if let Some(solution) = best_record(solutions) {
                return Ok(DistributedOutcome {
                    solution: Some(solution),
                    rounds_run,
                });
            }

            // Ring delivery: deme i receives the message deme i-1 sent.
            let count = survivors.len();
            for (index, (mut deme, retained)) in survivors.into_iter().enumerate() {
                let incoming = &messages[(index + count - 1) % count];
                let mut population = self.decode_population(incoming);
                tracing::debug!(
                    "Deme {} resumes with {} incoming and {} retained variants",
                    deme.comp_id,
                    population.len(),
                    retained.len()
                );
                population.extend(retained.into_iter().map(|record| record.variant));
                deme.population = population;
                self.demes.push(deme);
            }
        }

        Ok(DistributedOutcome {
            solution: None,
            rounds_run,
        })
    }

    /// Rebuild incoming variants by replaying each decoded history onto a
    /// clone of the original. Histories that fail to replay are dropped.
    fn decode_population(&self, message: &str) -> Vec<R> {
        codec::decode_variants(message)
            .into_iter()
            .filter_map(|history| {
                let mut variant = self.original.clone();
                for edit in history {
                    if let Err(err) = variant.apply(edit) {
                        tracing::warn!("Dropping undecodable incoming variant: {err}");
                        return None;
                    }
                }
                Some(variant)
            })
            .collect()
    }
}

fn ga_pop_size<R, E>(demes: &[Deme<R, E>]) -> usize
where
    R: Representation,
    E: FitnessEvaluator<R>,
{
    demes
        .first()
        .map(|deme| deme.engine.params().pop_size)
        .unwrap_or(0)
}

fn best_record<R>(records: Vec<FitnessRecord<R>>) -> Option<FitnessRecord<R>> {
    records.into_iter().reduce(|best, record| {
        if record.fitness > best.fitness {
            record
        } else {
            best
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use program::{ast::StatementId, store::AtomStore};
    use variant::{CoreContext, Edit, Localization, PatchProgram};

    use super::*;

    const SOURCE: &str = r#"
        int f(int a) {
            a = a + 1;
            a = 0;
            return a;
        }
    "#;

    struct HistoryEvaluator;

    impl FitnessEvaluator<PatchProgram> for HistoryEvaluator {
        fn evaluate(&mut self, variant: &mut PatchProgram) -> search_control::Result<f64> {
            let repaired = variant
                .history()
                .iter()
                .any(|edit| *edit == Edit::Delete(StatementId::new(2)));
            Ok(if repaired { 3.0 } else { 1.0 })
        }

        fn solution_threshold(&self) -> f64 {
            3.0
        }
    }

    #[tokio::test]
    async fn two_demes_find_a_deletion_repair() {
        let store = AtomStore::from_sources(&[("t.c", SOURCE)]).unwrap();
        let localization = Localization::uniform(&store);
        let original = PatchProgram::new(Arc::new(CoreContext::new(store, localization)));

        let ga = GaParams {
            pop_size: 8,
            mut_rate: 1.0,
            ..GaParams::default()
        };
        let config = DistributedConfig {
            num_comps: 2,
            variants_exchanged: 2,
            gen_per_exchange: 2,
            diversity_selection: true,
            split_search: false,
            total_generations: 30,
        };
        let coordinator = DistributedCoordinator::new(
            original,
            ga,
            config,
            vec![HistoryEvaluator, HistoryEvaluator],
            99,
        )
        .unwrap();
        let outcome = coordinator.run().await.unwrap();
        assert!(outcome.solution.is_some());
        assert!(outcome.rounds_run >= 1);
    }

    #[tokio::test]
    async fn evaluator_count_must_match_deme_count() {
        let store = AtomStore::from_sources(&[("t.c", SOURCE)]).unwrap();
        let localization = Localization::uniform(&store);
        let original = PatchProgram::new(Arc::new(CoreContext::new(store, localization)));

        let config = DistributedConfig {
            num_comps: 3,
            ..DistributedConfig::default()
        };
        let result = DistributedCoordinator::new(
            original,
            GaParams::default(),
            config,
            vec![HistoryEvaluator],
            0,
        );
        assert!(matches!(result, Err(Error::EvaluatorCount { .. })));
    }
}
