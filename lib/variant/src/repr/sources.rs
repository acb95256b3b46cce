//! Donor queries: which statements the localization offers for appends,
//! swaps and replacements at a given destination, after the semantic
//! filter.

use program::ast::StatementId;

use crate::{
    context::{CoreContext, SemanticCheck},
    localization::WeightedAtom,
    Result,
};

/// The fix-localization donors whose variables are all visible at `dest`.
/// With the scope check off, the whole fix list. Weights pass through
/// unchanged.
pub(crate) fn append_sources(
    ctx: &CoreContext,
    dest: StatementId,
) -> Result<Vec<WeightedAtom>> {
    let mut out = Vec::new();
    for atom in &ctx.localization.fix {
        let eligible = match ctx.semantic_check {
            SemanticCheck::None => true,
            SemanticCheck::Scope => ctx.store.in_scope_at(dest, atom.id)?,
        };
        if eligible {
            out.push(*atom);
        }
    }
    Ok(out)
}

/// The fault-localization statements that could trade places with `dest`:
/// scope-compatible in both directions and not `dest` itself.
///
/// The listing is symmetric; callers enumerating all pairs keep only
/// `dest < src` to avoid counting an exchange twice.
pub(crate) fn swap_sources(ctx: &CoreContext, dest: StatementId) -> Result<Vec<WeightedAtom>> {
    let mut out = Vec::new();
    for atom in &ctx.localization.fault {
        if atom.id == dest {
            continue;
        }
        let eligible = match ctx.semantic_check {
            SemanticCheck::None => true,
            SemanticCheck::Scope => {
                ctx.store.in_scope_at(dest, atom.id)? && ctx.store.in_scope_at(atom.id, dest)?
            }
        };
        if eligible {
            out.push(*atom);
        }
    }
    Ok(out)
}

/// The fix-localization donors that could stand in for `dest`.
pub(crate) fn replace_sources(
    ctx: &CoreContext,
    dest: StatementId,
) -> Result<Vec<WeightedAtom>> {
    let mut out = Vec::new();
    for atom in &ctx.localization.fix {
        if atom.id == dest {
            continue;
        }
        let eligible = match ctx.semantic_check {
            SemanticCheck::None => true,
            SemanticCheck::Scope => ctx.store.in_scope_at(dest, atom.id)?,
        };
        if eligible {
            out.push(*atom);
        }
    }
    Ok(out)
}
