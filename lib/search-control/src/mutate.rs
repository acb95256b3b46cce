//! The weighted micro-mutation applied to every individual each
//! generation.

use std::collections::HashSet;

use rand::Rng;

use program::ast::{Expr, StatementId};
use variant::{Representation, WeightedAtom};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationSettings {
    /// Base probability scale; each fault atom fires at `mut_rate * w`.
    pub mut_rate: f64,
    /// Probability that a firing atom mutates at the expression level
    /// instead of the statement level.
    pub subatom_mut_rate: f64,
    /// Within an expression-level mutation, probability of substituting
    /// the language constant instead of a donor subatom.
    pub subatom_const_rate: f64,
    /// Force at least this many weight-sampled atoms to mutate per call.
    /// Zero disables the floor.
    pub pro_mut: usize,
    /// Restrict mutation sites to this deme's share of the id space.
    pub split: Option<SearchSplit>,
}

impl Default for MutationSettings {
    fn default() -> Self {
        Self {
            mut_rate: 0.06,
            subatom_mut_rate: 0.0,
            subatom_const_rate: 0.5,
            pro_mut: 1,
            split: None,
        }
    }
}

/// Partition of the statement-id space across demes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSplit {
    pub num_comps: u32,
    /// 1-based deme number; the deme numbered `num_comps` owns residue 0.
    pub comp_id: u32,
}

impl SearchSplit {
    pub fn admits(&self, id: StatementId) -> bool {
        if self.num_comps <= 1 {
            return true;
        }
        id.as_u32() % self.num_comps == self.comp_id % self.num_comps
    }
}

/// One micro-mutation pass over the variant's fault localization.
pub(crate) fn mutate<R: Representation>(
    variant: &mut R,
    settings: &MutationSettings,
    rng: &mut impl Rng,
) -> variant::Result<()> {
    let pool: Vec<WeightedAtom> = variant
        .fault_localization()
        .iter()
        .copied()
        .filter(|atom| settings.split.map_or(true, |split| split.admits(atom.id)))
        .collect();

    let mut forced: HashSet<StatementId> = HashSet::new();
    if settings.pro_mut > 0 {
        let mut deduped: Vec<WeightedAtom> = Vec::with_capacity(pool.len());
        let mut seen: HashSet<StatementId> = HashSet::new();
        for atom in &pool {
            if seen.insert(atom.id) {
                deduped.push(*atom);
            }
        }
        for _ in 0..settings.pro_mut {
            if let Some(id) = roulette(&deduped, rng) {
                forced.insert(id);
            }
        }
    }

    for atom in &pool {
        let fires =
            forced.contains(&atom.id) || rng.gen::<f64>() <= settings.mut_rate * atom.weight;
        if fires {
            mutate_at(variant, atom.id, settings, rng)?;
        }
    }
    Ok(())
}

fn mutate_at<R: Representation>(
    variant: &mut R,
    id: StatementId,
    settings: &MutationSettings,
    rng: &mut impl Rng,
) -> variant::Result<()> {
    let subatom_count = variant.subatom_count(id)?;
    if settings.subatom_mut_rate > 0.0
        && subatom_count > 0
        && rng.gen::<f64>() < settings.subatom_mut_rate
    {
        if rng.gen::<f64>() < settings.subatom_const_rate {
            let index = rng.gen_range(0..subatom_count);
            return variant.replace_subatom(id, index, Expr::zero());
        }
        let donors: Vec<WeightedAtom> = variant
            .append_sources(id)?
            .into_iter()
            .filter(|donor| {
                variant
                    .subatom_count(donor.id)
                    .map(|count| count > 0)
                    .unwrap_or(false)
            })
            .collect();
        if let Some(donor) = roulette(&donors, rng) {
            let atoms = variant.subatoms_of(donor)?;
            let expr = atoms[rng.gen_range(0..atoms.len())].clone();
            let index = rng.gen_range(0..subatom_count);
            return variant.replace_subatom(id, index, expr);
        }
        // No donor carries an expression; fall back to a statement-level
        // mutation.
    }
    statement_mutation(variant, id, rng)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StatementOp {
    Delete,
    Append,
    Swap,
}

fn statement_mutation<R: Representation>(
    variant: &mut R,
    id: StatementId,
    rng: &mut impl Rng,
) -> variant::Result<()> {
    let mut options = vec![StatementOp::Delete, StatementOp::Append, StatementOp::Swap];
    loop {
        let choice = options[rng.gen_range(0..options.len())];
        match choice {
            StatementOp::Delete => return variant.delete(id),
            StatementOp::Append => {
                let donors = variant.append_sources(id)?;
                match roulette(&donors, rng) {
                    Some(src) => return variant.append(id, src),
                    None => options.retain(|op| *op != StatementOp::Append),
                }
            }
            StatementOp::Swap => {
                let donors = variant.swap_sources(id)?;
                match roulette(&donors, rng) {
                    Some(src) => return variant.swap(id, src),
                    None => options.retain(|op| *op != StatementOp::Swap),
                }
            }
        }
    }
}

/// Roulette over a weighted set: `r = Uniform(0, Σw)`, accumulate in list
/// order, return the first element whose running total reaches `r`.
pub(crate) fn roulette(atoms: &[WeightedAtom], rng: &mut impl Rng) -> Option<StatementId> {
    if atoms.is_empty() {
        return None;
    }
    let total: f64 = atoms.iter().map(|atom| atom.weight).sum();
    if total <= 0.0 {
        return atoms.first().map(|atom| atom.id);
    }
    let r = rng.gen::<f64>() * total;
    let mut running = 0.0;
    for atom in atoms {
        running += atom.weight;
        if running >= r {
            return Some(atom.id);
        }
    }
    atoms.last().map(|atom| atom.id)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn atom(id: u32, weight: f64) -> WeightedAtom {
        WeightedAtom::new(StatementId::new(id), weight)
    }

    #[test]
    fn roulette_ignores_zero_weight_entries() {
        let atoms = vec![atom(1, 0.0), atom(2, 0.0), atom(3, 5.0)];
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            assert_eq!(roulette(&atoms, &mut rng), Some(StatementId::new(3)));
        }
    }

    #[test]
    fn roulette_with_no_usable_weight_takes_the_first() {
        let atoms = vec![atom(4, 0.0), atom(5, 0.0)];
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(roulette(&atoms, &mut rng), Some(StatementId::new(4)));
        assert_eq!(roulette(&[], &mut rng), None);
    }

    #[test]
    fn split_assigns_every_id_to_exactly_one_deme() {
        let demes: Vec<SearchSplit> = (1..=3)
            .map(|comp_id| SearchSplit {
                num_comps: 3,
                comp_id,
            })
            .collect();
        for id in 1..100 {
            let id = StatementId::new(id);
            let owners = demes.iter().filter(|split| split.admits(id)).count();
            assert_eq!(owners, 1, "id {id} should have exactly one owner");
        }
    }
}
