//! Tournament selection.

use rand::Rng;

use crate::fitness::FitnessRecord;

/// Pick one index by tournament: draw `k` contestants uniformly with
/// replacement, sort by fitness descending, then walk the ranking
/// accepting rank `i` with probability `p * (1 - p)^i`. With `p >= 1` the
/// top rank always wins; falling off the end restarts the draw.
pub(crate) fn tournament_select<R>(
    records: &[FitnessRecord<R>],
    k: usize,
    p: f64,
    rng: &mut impl Rng,
) -> usize {
    debug_assert!(!records.is_empty());
    let k = k.max(1);
    loop {
        let mut sample: Vec<usize> = (0..k).map(|_| rng.gen_range(0..records.len())).collect();
        sample.sort_by(|a, b| {
            records[*b]
                .fitness
                .partial_cmp(&records[*a].fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        for index in sample {
            if p >= 1.0 || rng.gen::<f64>() < p {
                return index;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn records(fitness: &[f64]) -> Vec<FitnessRecord<()>> {
        fitness
            .iter()
            .map(|fitness| FitnessRecord::new((), *fitness))
            .collect()
    }

    #[test]
    fn deterministic_tournaments_take_the_sampled_argmax() {
        let records = records(&[1.0, 5.0, 3.0]);
        let mut rng = StdRng::seed_from_u64(7);
        // With k far above the population size every sample contains the
        // best individual, and p = 1 always accepts the top rank.
        for _ in 0..20 {
            let winner = tournament_select(&records, 64, 1.0, &mut rng);
            assert_eq!(winner, 1);
        }
    }

    #[test]
    fn singleton_populations_always_win() {
        let records = records(&[2.0]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(tournament_select(&records, 2, 0.5, &mut rng), 0);
    }
}
