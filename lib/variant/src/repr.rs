mod apply;
mod patch;
mod sources;
mod tree;


use std::{collections::BTreeMap, sync::Arc};

use program::{
    ast::{print, Expr, FileAst, StatementId},
    instrument::{self, InstrumentOptions},
};

pub use self::{patch::PatchProgram, tree::TreeProgram};
use crate::{
    context::CoreContext,
    edit::Edit,
    localization::WeightedAtom,
    Error, Result,
};

/// One candidate variant.
///
/// The two implementations differ only in when the edit history
/// materializes into a tree: [`PatchProgram`] at print time,
/// [`TreeProgram`] at mutation time. Everything the search layer does goes
/// through this trait.
pub trait Representation: Clone + Send + 'static {
    fn context(&self) -> &Arc<CoreContext>;

    /// The ordered edit script of this variant.
    fn history(&self) -> &[Edit];

    /// Record and (for the eager flavor) apply one edit.
    fn apply(&mut self, edit: Edit) -> Result<()>;

    /// The mutated trees, one per file.
    fn materialize(&self) -> Result<BTreeMap<String, FileAst>>;

    /// Exchange material along the fault-localization prefix `[0, cut]`
    /// with `other`.
    fn one_point_crossover(&mut self, other: &mut Self, cut: usize) -> Result<()>;

    /// Whether the variant mutated since the last [`mark_clean`].
    ///
    /// [`mark_clean`]: Representation::mark_clean
    fn is_dirty(&self) -> bool;

    /// Called by evaluators once cached results for the current history
    /// exist.
    fn mark_clean(&mut self);

    fn fault_localization(&self) -> &[WeightedAtom] {
        &self.context().localization.fault
    }

    /// The serialized history; what fitness caches key on.
    fn fingerprint(&self) -> String {
        self.history()
            .iter()
            .map(Edit::fingerprint_token)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn delete(&mut self, dest: StatementId) -> Result<()> {
        self.apply(Edit::Delete(dest))
    }

    fn append(&mut self, dest: StatementId, src: StatementId) -> Result<()> {
        self.apply(Edit::Append(dest, src))
    }

    fn swap(&mut self, dest: StatementId, src: StatementId) -> Result<()> {
        self.apply(Edit::Swap(dest, src))
    }

    fn replace(&mut self, dest: StatementId, src: StatementId) -> Result<()> {
        self.apply(Edit::Replace(dest, src))
    }

    fn replace_subatom(&mut self, dest: StatementId, index: usize, expr: Expr) -> Result<()> {
        self.apply(Edit::ReplaceSubatom { dest, index, expr })
    }

    /// Number of expression subatoms of the statement, as parsed.
    fn subatom_count(&self, id: StatementId) -> Result<usize> {
        Ok(self.context().store.statement(id)?.kind.subatom_count())
    }

    /// The subatom values of the statement, as parsed.
    fn subatoms_of(&self, id: StatementId) -> Result<Vec<Expr>> {
        Ok(self
            .context()
            .store
            .statement(id)?
            .kind
            .subatoms()
            .into_iter()
            .cloned()
            .collect())
    }

    /// Donors eligible to be appended after `dest`, with their fix
    /// weights.
    fn append_sources(&self, dest: StatementId) -> Result<Vec<WeightedAtom>> {
        sources::append_sources(self.context(), dest)
    }

    /// Statements eligible to trade places with `dest`, with their fault
    /// weights.
    fn swap_sources(&self, dest: StatementId) -> Result<Vec<WeightedAtom>> {
        sources::swap_sources(self.context(), dest)
    }

    /// Donors eligible to replace `dest`, with their fix weights.
    fn replace_sources(&self, dest: StatementId) -> Result<Vec<WeightedAtom>> {
        sources::replace_sources(self.context(), dest)
    }

    /// The mutated program rendered back to source, one entry per file.
    fn printed(&self) -> Result<BTreeMap<String, String>> {
        let symbols = self.context().store.symbols();
        Ok(self
            .materialize()?
            .into_iter()
            .map(|(name, file)| (name, print::pretty_print_file(&file, symbols)))
            .collect())
    }

    /// The mutated program rendered with coverage instrumentation.
    fn instrumented(
        &self,
        trace_path: &str,
        options: &InstrumentOptions,
    ) -> Result<BTreeMap<String, String>> {
        let store = &self.context().store;
        Ok(self
            .materialize()?
            .into_iter()
            .map(|(name, file)| {
                let rendered = instrument::instrumented_file(
                    &file,
                    store.symbols(),
                    store.max_atom(),
                    trace_path,
                    options,
                );
                (name, rendered)
            })
            .collect())
    }
}

/// Edits naming statements the store has never seen are a programming
/// error; histories produced by the operators themselves cannot get here.
pub(crate) fn validate_edit(ctx: &CoreContext, edit: &Edit) -> Result<()> {
    for id in edit.referenced_ids() {
        if ctx.store.statement(id).is_err() {
            return Err(Error::UnknownEditTarget(id));
        }
    }
    if let Edit::ReplaceSubatom { dest, index, .. } = edit {
        let len = ctx.store.statement(*dest)?.kind.subatom_count();
        if *index >= len {
            return Err(Error::Program(program::Error::SubatomIndex {
                id: *dest,
                index: *index,
                len,
            }));
        }
    }
    Ok(())
}
