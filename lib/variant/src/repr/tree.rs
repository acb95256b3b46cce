use std::{collections::BTreeMap, mem, sync::Arc};

use program::ast::{self, Block, FileAst, Statement, StatementId, StatementKind};

use crate::{
    context::CoreContext,
    edit::Edit,
    repr::{validate_edit, Representation},
    Result,
};

/// The eager representation: a private deep copy of the trees, mutated in
/// place as edits arrive. The history is kept as provenance.
#[derive(Debug, Clone)]
pub struct TreeProgram {
    ctx: Arc<CoreContext>,
    files: BTreeMap<String, FileAst>,
    history: Vec<Edit>,
    dirty: bool,
}

impl TreeProgram {
    pub fn new(ctx: Arc<CoreContext>) -> Self {
        let files = ctx
            .store
            .files()
            .map(|file| (file.name.clone(), file.clone()))
            .collect();
        Self {
            ctx,
            files,
            history: Vec::new(),
            dirty: false,
        }
    }

    fn apply_eagerly(&mut self, edit: &Edit) -> Result<()> {
        match edit {
            Edit::Delete(dest) => {
                self.with_statement(*dest, |stmt| {
                    stmt.kind = StatementKind::Compound(Block::default());
                });
            }
            Edit::Append(dest, src) => {
                let donor = self.ctx.store.statement(*src)?.clone_zeroed();
                self.with_statement(*dest, |stmt| {
                    let current = mem::replace(&mut stmt.kind, StatementKind::Skip);
                    stmt.kind = StatementKind::Compound(Block {
                        statements: vec![Statement::unnumbered(current), donor],
                    });
                });
            }
            Edit::Replace(dest, src) => {
                let donor = self.ctx.store.statement(*src)?.clone_zeroed();
                self.with_statement(*dest, |stmt| {
                    stmt.kind = StatementKind::Compound(Block {
                        statements: vec![donor],
                    });
                });
            }
            Edit::Swap(first, second) => {
                if self.ctx.swap_bug {
                    let lower = (*first).min(*second);
                    let higher = (*first).max(*second);
                    self.apply_eagerly(&Edit::Delete(lower))?;
                    self.apply_eagerly(&Edit::Append(lower, higher))?;
                } else {
                    self.swap_in_tree(*first, *second);
                }
            }
            Edit::ReplaceSubatom { dest, index, expr } => {
                let index = *index;
                let expr = expr.clone();
                self.with_statement(*dest, |stmt| {
                    if let Err(err) = ast::replace_subatom(stmt, index, expr) {
                        tracing::warn!("Skipping stale subatom edit: {err}");
                    }
                });
            }
            Edit::Template { name, bindings } => {
                let kind = self
                    .ctx
                    .templates
                    .instantiate(name, bindings, &self.ctx.store)?;
                self.with_statement(edit.destination(), |stmt| {
                    stmt.kind = kind;
                });
            }
        }
        Ok(())
    }

    /// Run `f` on the statement if it still exists in the mutated tree.
    /// Statements swallowed by earlier edits (for example inside a deleted
    /// subtree) make the edit a no-op.
    fn with_statement(&mut self, id: StatementId, f: impl FnOnce(&mut Statement)) {
        match find_statement_mut(&mut self.files, id) {
            Some(stmt) => f(stmt),
            None => {
                tracing::warn!(
                    "Statement {id} is no longer present in the mutated tree, edit skipped"
                );
            }
        }
    }

    fn swap_in_tree(&mut self, first: StatementId, second: StatementId) {
        if first == second {
            return;
        }
        let Some(stmt) = find_statement_mut(&mut self.files, first) else {
            tracing::warn!(
                "Statement {first} is no longer present in the mutated tree, swap skipped"
            );
            return;
        };
        let first_kind = mem::replace(&mut stmt.kind, StatementKind::Skip);
        match find_statement_mut(&mut self.files, second) {
            Some(stmt) => {
                let second_kind = mem::replace(&mut stmt.kind, first_kind);
                find_statement_mut(&mut self.files, first)
                    .expect("statement located above")
                    .kind = second_kind;
            }
            None => {
                tracing::warn!(
                    "Statement {second} is no longer present in the mutated tree, swap skipped"
                );
                find_statement_mut(&mut self.files, first)
                    .expect("statement located above")
                    .kind = first_kind;
            }
        }
    }
}

impl Representation for TreeProgram {
    fn context(&self) -> &Arc<CoreContext> {
        &self.ctx
    }

    fn history(&self) -> &[Edit] {
        &self.history
    }

    fn apply(&mut self, edit: Edit) -> Result<()> {
        validate_edit(&self.ctx, &edit)?;
        self.apply_eagerly(&edit)?;
        self.history.push(edit);
        self.dirty = true;
        Ok(())
    }

    fn materialize(&self) -> Result<BTreeMap<String, FileAst>> {
        Ok(self.files.clone())
    }

    /// Exchange the statement bodies along the fault prefix `[0, cut]`
    /// between the two trees. Ids missing from either tree are skipped.
    fn one_point_crossover(&mut self, other: &mut Self, cut: usize) -> Result<()> {
        let fault = self.ctx.localization.fault.clone();
        for atom in fault.iter().take(cut.saturating_add(1).min(fault.len())) {
            let mine = find_statement_mut(&mut self.files, atom.id);
            let theirs = find_statement_mut(&mut other.files, atom.id);
            if let (Some(mine), Some(theirs)) = (mine, theirs) {
                mem::swap(&mut mine.kind, &mut theirs.kind);
            }
        }
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

fn find_statement_mut(
    files: &mut BTreeMap<String, FileAst>,
    id: StatementId,
) -> Option<&mut Statement> {
    fn find_in_block(block: &mut Block, id: StatementId) -> Option<&mut Statement> {
        for stmt in &mut block.statements {
            if stmt.id == id {
                return Some(stmt);
            }
            for nested in stmt.kind.blocks_mut() {
                if let Some(found) = find_in_block(nested, id) {
                    return Some(found);
                }
            }
        }
        None
    }

    for file in files.values_mut() {
        for function in &mut file.functions {
            if let Some(found) = find_in_block(&mut function.body, id) {
                return Some(found);
            }
        }
    }
    None
}
