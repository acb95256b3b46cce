use core::fmt;
use std::collections::BTreeMap;

use program::ast::{Expr, StatementId};

/// One syntactic edit against the original program.
///
/// Edits are pure values; constructing one never touches a tree. Applying
/// one mutates only the representation it is applied to.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Replace the statement with an empty block.
    Delete(StatementId),
    /// After the first statement, inline a fresh clone of the second.
    Append(StatementId, StatementId),
    /// Exchange the bodies of the two statements.
    Swap(StatementId, StatementId),
    /// Replace the first statement with a fresh clone of the second.
    Replace(StatementId, StatementId),
    /// Replace the `index`-th expression subatom of `dest` with `expr`.
    ReplaceSubatom {
        dest: StatementId,
        index: usize,
        expr: Expr,
    },
    /// Apply a named code template with hole-to-atom bindings.
    Template {
        name: String,
        bindings: BTreeMap<String, StatementId>,
    },
}

/// The binding hole every template must fill: the statement it lands on.
pub(crate) const TEMPLATE_DEST_HOLE: &str = "dest";

impl Edit {
    /// The statement this edit lands on.
    pub fn destination(&self) -> StatementId {
        match self {
            Edit::Delete(dest)
            | Edit::Append(dest, _)
            | Edit::Swap(dest, _)
            | Edit::Replace(dest, _)
            | Edit::ReplaceSubatom { dest, .. } => *dest,
            Edit::Template { bindings, .. } => bindings
                .get(TEMPLATE_DEST_HOLE)
                .copied()
                .unwrap_or(StatementId::UNNUMBERED),
        }
    }

    /// Every statement id the edit names.
    pub fn referenced_ids(&self) -> Vec<StatementId> {
        match self {
            Edit::Delete(dest) | Edit::ReplaceSubatom { dest, .. } => vec![*dest],
            Edit::Append(dest, src) | Edit::Swap(dest, src) | Edit::Replace(dest, src) => {
                vec![*dest, *src]
            }
            Edit::Template { bindings, .. } => bindings.values().copied().collect(),
        }
    }

    /// Stable token for cache fingerprints and diversity bookkeeping.
    ///
    /// Unlike the wire format this covers every edit kind, including the
    /// replacement expression of a subatom edit.
    pub fn fingerprint_token(&self) -> String {
        match self {
            Edit::ReplaceSubatom { dest, index, expr } => {
                format!("e({dest},{index},{expr:?})")
            }
            Edit::Template { name, bindings } => {
                let bindings = bindings
                    .iter()
                    .map(|(hole, id)| format!("{hole}={id}"))
                    .collect::<Vec<_>>()
                    .join(",");
                format!("t({name},{bindings})")
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edit::Delete(dest) => write!(fmt, "d({dest})"),
            Edit::Append(dest, src) => write!(fmt, "a({dest},{src})"),
            Edit::Swap(dest, src) => write!(fmt, "s({dest},{src})"),
            Edit::Replace(dest, src) => write!(fmt, "r({dest},{src})"),
            Edit::ReplaceSubatom { dest, index, .. } => write!(fmt, "e({dest},{index})"),
            Edit::Template { name, .. } => write!(fmt, "t({name})"),
        }
    }
}

/// An ordered edit script. Order is semantic: edits apply in list order at
/// materialization time, and later edits see the result of earlier ones on
/// the same statement.
pub type EditHistory = Vec<Edit>;
