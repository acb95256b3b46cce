use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use program::ast::{FileAst, StatementId};

use crate::{
    context::CoreContext,
    edit::Edit,
    repr::{apply, validate_edit, Representation},
    Result,
};

/// The deferred representation: a shared read-only store plus an edit
/// history. Nothing materializes until [`Representation::materialize`]
/// runs; cloning a variant is cloning its history.
#[derive(Debug, Clone)]
pub struct PatchProgram {
    ctx: Arc<CoreContext>,
    history: Vec<Edit>,
    dirty: bool,
}

impl PatchProgram {
    pub fn new(ctx: Arc<CoreContext>) -> Self {
        Self {
            ctx,
            history: Vec::new(),
            dirty: false,
        }
    }

    /// Rebuild a variant from a decoded history, validating every edit
    /// against the store.
    pub fn with_history(ctx: Arc<CoreContext>, history: Vec<Edit>) -> Result<Self> {
        for edit in &history {
            validate_edit(&ctx, edit)?;
        }
        Ok(Self {
            ctx,
            history,
            dirty: true,
        })
    }
}

impl Representation for PatchProgram {
    fn context(&self) -> &Arc<CoreContext> {
        &self.ctx
    }

    fn history(&self) -> &[Edit] {
        &self.history
    }

    fn apply(&mut self, edit: Edit) -> Result<()> {
        validate_edit(&self.ctx, &edit)?;
        self.history.push(edit);
        self.dirty = true;
        Ok(())
    }

    fn materialize(&self) -> Result<BTreeMap<String, FileAst>> {
        apply::apply_history(&self.ctx, &self.history)
    }

    /// Exchange the edits landing on the fault prefix `[0, cut]`: each
    /// child keeps its edits outside the prefix and adopts the other
    /// parent's edits inside it. The prefix bodies of the materialized
    /// children are thereby exchanged, which is what the whole-tree flavor
    /// does directly.
    fn one_point_crossover(&mut self, other: &mut Self, cut: usize) -> Result<()> {
        let fault = &self.ctx.localization.fault;
        if fault.is_empty() {
            return Ok(());
        }
        let prefix: HashSet<StatementId> = fault
            .iter()
            .take(cut.saturating_add(1).min(fault.len()))
            .map(|atom| atom.id)
            .collect();

        let (mine_in, mine_out): (Vec<Edit>, Vec<Edit>) = self
            .history
            .drain(..)
            .partition(|edit| prefix.contains(&edit.destination()));
        let (theirs_in, theirs_out): (Vec<Edit>, Vec<Edit>) = other
            .history
            .drain(..)
            .partition(|edit| prefix.contains(&edit.destination()));

        self.history = mine_out;
        self.history.extend(theirs_in);
        other.history = theirs_out;
        other.history.extend(mine_in);
        self.dirty = true;
        other.dirty = true;
        Ok(())
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
