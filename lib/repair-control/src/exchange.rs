//! Which variants a deme sends at an exchange point, and which it keeps.

use std::collections::HashSet;

use search_control::FitnessRecord;
use variant::{Edit, Representation};

/// Per-exchange shape: how many travel, how many stay, and whether the
/// travelers are picked for coverage of distinct edits instead of raw
/// fitness.
#[derive(Debug, Clone, Copy)]
pub struct ExchangePolicy {
    pub pop_size: usize,
    pub variants_exchanged: usize,
    pub diversity_selection: bool,
}

/// Split an evaluated population into `(outgoing, retained)`.
///
/// Outgoing: everything when the whole population travels; otherwise the
/// top `variants_exchanged` by fitness, or a diversity pick over either
/// the full population (when more than half travels) or the top
/// `2 * variants_exchanged`. Retained: the incumbents minus the worst
/// `variants_exchanged`.
pub fn select_outgoing<R: Representation>(
    mut records: Vec<FitnessRecord<R>>,
    policy: &ExchangePolicy,
    original: &R,
    threshold: f64,
) -> (Vec<FitnessRecord<R>>, Vec<FitnessRecord<R>>) {
    records.sort_by(|a, b| {
        b.fitness
            .partial_cmp(&a.fitness)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let exchanged = policy.variants_exchanged.min(records.len());

    if policy.pop_size == policy.variants_exchanged {
        return (records, Vec::new());
    }

    let retained: Vec<FitnessRecord<R>> = records
        .iter()
        .take(policy.pop_size.saturating_sub(exchanged))
        .cloned()
        .collect();

    let outgoing = if !policy.diversity_selection {
        records.truncate(exchanged);
        records
    } else {
        let pool = if policy.pop_size / 2 < policy.variants_exchanged {
            records
        } else {
            records.truncate(2 * exchanged);
            records
        };
        diversity_select(&pool, exchanged, original, threshold)
    };
    (outgoing, retained)
}

/// Greedy cover over edit tokens: repeatedly take the variant whose
/// history covers the most still-uncovered edits; when nobody covers
/// anything new, pad with neutral copies of the original carrying the
/// solution-threshold fitness.
pub fn diversity_select<R: Representation>(
    pool: &[FitnessRecord<R>],
    count: usize,
    original: &R,
    threshold: f64,
) -> Vec<FitnessRecord<R>> {
    let token_sets: Vec<HashSet<String>> = pool
        .iter()
        .map(|record| {
            record
                .variant
                .history()
                .iter()
                .map(Edit::fingerprint_token)
                .collect()
        })
        .collect();
    let mut uncovered: HashSet<String> = token_sets.iter().flatten().cloned().collect();

    let mut chosen: HashSet<usize> = HashSet::new();
    let mut selected = Vec::with_capacity(count);
    while selected.len() < count {
        let mut best: Option<(usize, usize)> = None;
        for (index, tokens) in token_sets.iter().enumerate() {
            if chosen.contains(&index) {
                continue;
            }
            let coverage = tokens.intersection(&uncovered).count();
            // Strictly-greater keeps the first (fittest) of equals.
            if coverage > 0 && best.map_or(true, |(_, best_cov)| coverage > best_cov) {
                best = Some((index, coverage));
            }
        }
        match best {
            Some((index, _)) => {
                chosen.insert(index);
                for token in &token_sets[index] {
                    uncovered.remove(token);
                }
                selected.push(pool[index].clone());
            }
            None => break,
        }
    }
    while selected.len() < count {
        tracing::debug!("Padding exchange with a neutral copy of the original");
        selected.push(FitnessRecord::new(original.clone(), threshold));
    }
    selected
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use program::{ast::StatementId, store::AtomStore};
    use variant::{CoreContext, Localization, PatchProgram};

    use super::*;

    const SOURCE: &str = r#"
        int f(int a) {
            a = 1;
            a = 2;
            a = 3;
            a = 4;
            a = 5;
            return a;
        }
    "#;

    fn sid(id: u32) -> StatementId {
        StatementId::new(id)
    }

    fn original() -> PatchProgram {
        let store = AtomStore::from_sources(&[("t.c", SOURCE)]).unwrap();
        let localization = Localization::uniform(&store);
        PatchProgram::new(Arc::new(CoreContext::new(store, localization)))
    }

    fn with_edits(original: &PatchProgram, edits: &[Edit]) -> PatchProgram {
        let mut variant = original.clone();
        for edit in edits {
            variant.apply(edit.clone()).unwrap();
        }
        variant
    }

    #[test]
    fn diversity_prefers_distinct_histories() {
        let original = original();
        let pool = vec![
            FitnessRecord::new(with_edits(&original, &[Edit::Delete(sid(1))]), 3.0),
            FitnessRecord::new(with_edits(&original, &[Edit::Delete(sid(1))]), 2.5),
            FitnessRecord::new(with_edits(&original, &[Edit::Append(sid(2), sid(3))]), 2.0),
            FitnessRecord::new(with_edits(&original, &[Edit::Swap(sid(4), sid(5))]), 1.0),
        ];
        let selected = diversity_select(&pool, 3, &original, 9.0);
        assert_eq!(selected.len(), 3);
        let histories: Vec<_> = selected
            .iter()
            .map(|record| record.variant.fingerprint())
            .collect();
        assert!(histories.contains(&"d(1)".to_string()));
        assert!(histories.contains(&"a(2,3)".to_string()));
        assert!(histories.contains(&"s(4,5)".to_string()));
    }

    #[test]
    fn diversity_pads_with_neutral_originals() {
        let original = original();
        let pool = vec![FitnessRecord::new(
            with_edits(&original, &[Edit::Delete(sid(1))]),
            2.0,
        )];
        let selected = diversity_select(&pool, 3, &original, 6.0);
        assert_eq!(selected.len(), 3);
        assert!(selected[1].variant.history().is_empty());
        assert_eq!(selected[1].fitness, 6.0);
        assert_eq!(selected[2].fitness, 6.0);
    }

    #[test]
    fn full_population_exchanges_retain_nothing() {
        let original = original();
        let records = vec![
            FitnessRecord::new(with_edits(&original, &[Edit::Delete(sid(1))]), 1.0),
            FitnessRecord::new(with_edits(&original, &[Edit::Delete(sid(2))]), 2.0),
        ];
        let policy = ExchangePolicy {
            pop_size: 2,
            variants_exchanged: 2,
            diversity_selection: false,
        };
        let (outgoing, retained) = select_outgoing(records, &policy, &original, 9.0);
        assert_eq!(outgoing.len(), 2);
        assert!(retained.is_empty());
    }

    #[test]
    fn fitness_exchange_sends_the_top_and_keeps_the_best_incumbents() {
        let original = original();
        let records: Vec<FitnessRecord<PatchProgram>> = (1..=4)
            .map(|id| {
                FitnessRecord::new(
                    with_edits(&original, &[Edit::Delete(sid(id))]),
                    f64::from(id),
                )
            })
            .collect();
        let policy = ExchangePolicy {
            pop_size: 4,
            variants_exchanged: 1,
            diversity_selection: false,
        };
        let (outgoing, retained) = select_outgoing(records, &policy, &original, 9.0);
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].fitness, 4.0);
        assert_eq!(retained.len(), 3);
        assert!(retained.iter().all(|record| record.fitness >= 2.0));
    }
}
