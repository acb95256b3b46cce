//! Exhaustive search over distance-one edits.
//!
//! Every edit the operators allow gets a priority weight from the
//! localization. The worklist is sorted by weight descending (ties broken
//! by the edit's stable token, so the order is deterministic), variants
//! are built one at a time, and the scan stops at the first one whose
//! fitness reaches the solution threshold.

use std::cmp::Ordering;

use program::ast::Expr;
use variant::{Edit, Representation};

use crate::{
    fitness::{score, FitnessEvaluator, FitnessRecord},
    Result,
};

const APPEND_FACTOR: f64 = 0.9;
const SWAP_FACTOR: f64 = 0.8;
const SUBATOM_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceSettings {
    /// Also enumerate expression-level candidates (constant substitution
    /// and donor subatom copies).
    pub use_subatoms: bool,
}

pub(crate) struct Candidate {
    pub(crate) weight: f64,
    pub(crate) edit: Edit,
}

pub struct BruteForceEngine<E> {
    evaluator: E,
    settings: BruteForceSettings,
}

impl<E> BruteForceEngine<E> {
    pub fn new(evaluator: E, settings: BruteForceSettings) -> Self {
        Self {
            evaluator,
            settings,
        }
    }

    /// Scan the weighted worklist, returning the first repair.
    pub fn run<R>(&mut self, original: &R) -> Result<Option<FitnessRecord<R>>>
    where
        R: Representation,
        E: FitnessEvaluator<R>,
    {
        let candidates = build_candidates(original, &self.settings)?;
        if candidates.is_empty() {
            tracing::warn!("Localization offers no candidate edits, nothing to search");
            return Ok(None);
        }
        tracing::info!("Brute force over {} candidate edits", candidates.len());

        let threshold = self.evaluator.solution_threshold();
        for (position, candidate) in candidates.iter().enumerate() {
            // Variants materialize here, one at a time; the worklist
            // itself holds only edits.
            let mut variant = original.clone();
            variant.apply(candidate.edit.clone())?;
            let fitness = score(&mut self.evaluator, &mut variant);
            tracing::trace!(
                "Candidate {position}: {} (weight {:.4}) scored {fitness:.3}",
                candidate.edit,
                candidate.weight
            );
            if fitness >= threshold {
                tracing::info!(
                    "Repair found after {} evaluations: {}",
                    position + 1,
                    candidate.edit
                );
                return Ok(Some(FitnessRecord::new(variant, fitness)));
            }
        }
        tracing::info!("Worklist exhausted without a repair");
        Ok(None)
    }
}

/// Enumerate every distance-one edit with its priority weight, best first.
pub(crate) fn build_candidates<R: Representation>(
    original: &R,
    settings: &BruteForceSettings,
) -> Result<Vec<Candidate>> {
    let mut candidates = Vec::new();
    let fault = original.fault_localization().to_vec();

    for atom in &fault {
        candidates.push(Candidate {
            weight: atom.weight,
            edit: Edit::Delete(atom.id),
        });
        for donor in original.append_sources(atom.id)? {
            candidates.push(Candidate {
                weight: atom.weight * donor.weight * APPEND_FACTOR,
                edit: Edit::Append(atom.id, donor.id),
            });
        }
        for donor in original.swap_sources(atom.id)? {
            // The listing is symmetric; enumerate each exchange once.
            if atom.id < donor.id {
                candidates.push(Candidate {
                    weight: atom.weight * donor.weight * SWAP_FACTOR,
                    edit: Edit::Swap(atom.id, donor.id),
                });
            }
        }
        if settings.use_subatoms {
            let slots = original.subatom_count(atom.id)?;
            for index in 0..slots {
                candidates.push(Candidate {
                    weight: atom.weight * SUBATOM_FACTOR,
                    edit: Edit::ReplaceSubatom {
                        dest: atom.id,
                        index,
                        expr: Expr::zero(),
                    },
                });
            }
            for donor in original.append_sources(atom.id)? {
                for expr in original.subatoms_of(donor.id)? {
                    for index in 0..slots {
                        candidates.push(Candidate {
                            weight: atom.weight * SUBATOM_FACTOR,
                            edit: Edit::ReplaceSubatom {
                                dest: atom.id,
                                index,
                                expr: expr.clone(),
                            },
                        });
                    }
                }
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.edit.fingerprint_token().cmp(&b.edit.fingerprint_token()))
    });
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use program::{ast::StatementId, store::AtomStore};
    use variant::{CoreContext, Localization, PatchProgram, WeightedAtom};

    use super::*;

    const BROKEN: &str = r#"
        int f(int a) {
            a = a + 1;
            a = 0;
            return a;
        }
    "#;

    fn sid(id: u32) -> StatementId {
        StatementId::new(id)
    }

    fn original(fault: Vec<WeightedAtom>, fix: Vec<WeightedAtom>) -> PatchProgram {
        let store = AtomStore::from_sources(&[("b.c", BROKEN)]).unwrap();
        let ctx = Arc::new(CoreContext::new(store, Localization::new(fault, fix)));
        PatchProgram::new(ctx)
    }

    /// A repair is any variant whose printed form lost the zeroing write.
    struct PrintedEvaluator;

    impl FitnessEvaluator<PatchProgram> for PrintedEvaluator {
        fn evaluate(&mut self, variant: &mut PatchProgram) -> crate::Result<f64> {
            let printed = variant
                .printed()
                .map_err(|err| crate::Error::Evaluator(err.to_string()))?;
            let source = &printed["b.c"];
            Ok(if source.contains("a = 0;") { 0.0 } else { 2.0 })
        }

        fn solution_threshold(&self) -> f64 {
            2.0
        }
    }

    #[test]
    fn worklist_is_ordered_by_weight_then_token() {
        let fault = vec![
            WeightedAtom::new(sid(1), 0.4),
            WeightedAtom::new(sid(2), 1.0),
        ];
        let variant = original(fault, Vec::new());
        let candidates =
            build_candidates(&variant, &BruteForceSettings::default()).unwrap();
        let weights: Vec<f64> = candidates.iter().map(|c| c.weight).collect();
        let mut sorted = weights.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(weights, sorted);
        // Rebuilding produces the identical order.
        let again = build_candidates(&variant, &BruteForceSettings::default()).unwrap();
        let tokens: Vec<String> = candidates
            .iter()
            .map(|c| c.edit.fingerprint_token())
            .collect();
        let tokens_again: Vec<String> =
            again.iter().map(|c| c.edit.fingerprint_token()).collect();
        assert_eq!(tokens, tokens_again);
    }

    #[test]
    fn the_scan_stops_at_the_first_repair() {
        let fault = vec![
            WeightedAtom::new(sid(1), 0.5),
            WeightedAtom::new(sid(2), 1.0),
        ];
        let variant = original(fault, Vec::new());
        let mut engine = BruteForceEngine::new(PrintedEvaluator, BruteForceSettings::default());
        let repair = engine.run(&variant).unwrap().expect("a deletion repairs this");
        assert!(repair
            .variant
            .history()
            .iter()
            .any(|edit| *edit == Edit::Delete(sid(2))));
    }

    #[test]
    fn an_empty_worklist_is_not_an_error() {
        let variant = original(Vec::new(), Vec::new());
        let mut engine = BruteForceEngine::new(PrintedEvaluator, BruteForceSettings::default());
        assert!(engine.run(&variant).unwrap().is_none());
    }
}
