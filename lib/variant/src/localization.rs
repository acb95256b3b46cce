//! Fault and fix localization.
//!
//! Both halves are weighted lists of statement ids: the fault list ranks
//! candidate modification sites by suspiciousness, the fix list ranks
//! donor sites by expected usefulness. The fix list is collapsed through
//! the store's canonical ids so textually identical donors appear once;
//! the fault list never is.

use std::{collections::BTreeSet, fs, path::Path};

use serde::{Deserialize, Serialize};

use program::{ast::StatementId, store::AtomStore};

use crate::{Error, Result};

/// A statement id with its localization weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedAtom {
    pub id: StatementId,
    pub weight: f64,
}

impl WeightedAtom {
    pub fn new(id: StatementId, weight: f64) -> Self {
        Self { id, weight }
    }
}

/// Weight given to statements that appear on both the failing and some
/// passing execution path, relative to failing-only statements.
pub const DEFAULT_POSITIVE_PATH_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Localization {
    pub fault: Vec<WeightedAtom>,
    pub fix: Vec<WeightedAtom>,
}

impl Localization {
    pub fn new(fault: Vec<WeightedAtom>, fix: Vec<WeightedAtom>) -> Self {
        Self { fault, fix }
    }

    /// Every numbered statement, at full weight, in both lists. The
    /// degenerate localization used when no coverage is available.
    pub fn uniform(store: &AtomStore) -> Self {
        let all = store
            .numbered_ids()
            .map(|id| WeightedAtom::new(id, 1.0))
            .collect::<Vec<_>>();
        Self {
            fault: all.clone(),
            fix: all,
        }
    }

    /// Load localization from path files.
    ///
    /// Each line names one statement, either as a bare id (weight `1.0`)
    /// or as `id,weight`. Without a fix file every numbered statement
    /// becomes a donor at full weight.
    pub fn from_path_files(
        store: &AtomStore,
        fault_path: &Path,
        fix_path: Option<&Path>,
    ) -> Result<Self> {
        let fault = parse_path_file(&fs::read_to_string(fault_path).map_err(program::Error::Io)?)?;
        let fix = match fix_path {
            Some(path) => parse_path_file(&fs::read_to_string(path).map_err(program::Error::Io)?)?,
            None => store
                .numbered_ids()
                .map(|id| WeightedAtom::new(id, 1.0))
                .collect(),
        };
        Ok(Self { fault, fix })
    }

    /// The classic weighted path: statements visited by the failing run
    /// carry weight `1.0`, downgraded by `positive_path_factor` when some
    /// passing run visits them too. Donors are everything either kind of
    /// run visited, at full weight.
    pub fn from_coverage(
        pos_visited: &BTreeSet<StatementId>,
        neg_visited: &BTreeSet<StatementId>,
        positive_path_factor: f64,
    ) -> Self {
        let fault = neg_visited
            .iter()
            .map(|id| {
                let weight = if pos_visited.contains(id) {
                    positive_path_factor
                } else {
                    1.0
                };
                WeightedAtom::new(*id, weight)
            })
            .collect();
        let fix = neg_visited
            .union(pos_visited)
            .map(|id| WeightedAtom::new(*id, 1.0))
            .collect();
        Self { fault, fix }
    }

    /// Collapse the fix list onto canonical representative ids, keeping
    /// first-seen order and the highest weight per representative.
    pub fn canonicalize_fix(&mut self, store: &AtomStore) {
        let mut canonical: Vec<WeightedAtom> = Vec::with_capacity(self.fix.len());
        for atom in &self.fix {
            let id = store.canonical_id(atom.id);
            match canonical.iter_mut().find(|existing| existing.id == id) {
                Some(existing) => existing.weight = existing.weight.max(atom.weight),
                None => canonical.push(WeightedAtom::new(id, atom.weight)),
            }
        }
        self.fix = canonical;
    }

    pub fn is_empty(&self) -> bool {
        self.fault.is_empty()
    }
}

/// Parse one id-per-line trace output into the set of visited statements.
/// Unparsable lines are skipped.
pub fn parse_trace(text: &str) -> BTreeSet<StatementId> {
    text.lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .filter(|id| *id != 0)
        .map(StatementId::new)
        .collect()
}

fn parse_path_file(text: &str) -> Result<Vec<WeightedAtom>> {
    let mut atoms = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (id, weight) = match line.split_once(',') {
            Some((id, weight)) => (id.trim(), weight.trim().parse::<f64>().ok()),
            None => (line, Some(1.0)),
        };
        let parsed = id.parse::<u32>().ok().zip(weight);
        match parsed {
            Some((id, weight)) if id != 0 => {
                atoms.push(WeightedAtom::new(StatementId::new(id), weight));
            }
            _ => {
                return Err(Error::Unique(format!(
                    "Malformed path file line {}: `{line}`",
                    number + 1
                )));
            }
        }
    }
    Ok(atoms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(id: u32) -> StatementId {
        StatementId::new(id)
    }

    #[test]
    fn coverage_weights_shared_statements_down() {
        let pos = BTreeSet::from([sid(1), sid(2), sid(3)]);
        let neg = BTreeSet::from([sid(2), sid(4)]);
        let loc = Localization::from_coverage(&pos, &neg, 0.1);
        assert_eq!(loc.fault, vec![
            WeightedAtom::new(sid(2), 0.1),
            WeightedAtom::new(sid(4), 1.0),
        ]);
        assert_eq!(loc.fix.len(), 4);
    }

    #[test]
    fn path_lines_accept_optional_weights() {
        let atoms = parse_path_file("3\n5,0.5\n\n7,1.0\n").unwrap();
        assert_eq!(atoms, vec![
            WeightedAtom::new(sid(3), 1.0),
            WeightedAtom::new(sid(5), 0.5),
            WeightedAtom::new(sid(7), 1.0),
        ]);
        assert!(parse_path_file("zero").is_err());
    }

    #[test]
    fn trace_lines_ignore_garbage() {
        let visited = parse_trace("1\n2\nnot-an-id\n2\n0\n");
        assert_eq!(visited, BTreeSet::from([sid(1), sid(2)]));
    }
}
