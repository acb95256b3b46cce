//! Materialization of an edit history against the original trees.
//!
//! The history is folded into a per-statement body map first: for every
//! touched original id, the map holds the statement subtree that should
//! stand at that position. A single rebuild pass then walks clones of the
//! original files, substituting mapped bodies and descending into whatever
//! was substituted so edits on nested statements still fire. A final
//! fix-up pass zeroes any non-zero id that appears twice in the result.

use std::collections::{BTreeMap, HashMap, HashSet};

use program::ast::{
    self, visit, Block, FileAst, Statement, StatementId, StatementKind,
};

use crate::{context::CoreContext, edit::Edit, Result};

/// Folds edits, in history order, into the bodies of the statements they
/// touch. Later edits see the result of earlier ones on the same
/// statement.
pub(crate) struct EditFold<'a> {
    ctx: &'a CoreContext,
    bodies: HashMap<StatementId, Statement>,
}

impl<'a> EditFold<'a> {
    pub(crate) fn new(ctx: &'a CoreContext) -> Self {
        Self {
            ctx,
            bodies: HashMap::new(),
        }
    }

    pub(crate) fn push(&mut self, edit: &Edit) -> Result<()> {
        match edit {
            Edit::Delete(dest) => {
                self.body_mut(*dest)?.kind = StatementKind::Compound(Block::default());
            }
            Edit::Append(dest, src) => {
                let donor = self.ctx.store.statement(*src)?.clone_zeroed();
                let body = self.body_mut(*dest)?;
                let current = std::mem::replace(&mut body.kind, StatementKind::Skip);
                body.kind = StatementKind::Compound(Block {
                    statements: vec![Statement::unnumbered(current), donor],
                });
            }
            Edit::Replace(dest, src) => {
                let donor = self.ctx.store.statement(*src)?.clone_zeroed();
                self.body_mut(*dest)?.kind = StatementKind::Compound(Block {
                    statements: vec![donor],
                });
            }
            Edit::Swap(first, second) => {
                if self.ctx.swap_bug {
                    // Historical behavior: the lower statement is deleted
                    // and the higher statement's body appended in its
                    // place; the higher statement keeps its own copy.
                    let lower = (*first).min(*second);
                    let higher = (*first).max(*second);
                    self.push(&Edit::Delete(lower))?;
                    self.push(&Edit::Append(lower, higher))?;
                } else {
                    // A true exchange of the current bodies, firing at
                    // both endpoints.
                    self.seed(*first)?;
                    self.seed(*second)?;
                    if first != second {
                        let kind = std::mem::replace(
                            &mut self
                                .bodies
                                .get_mut(first)
                                .expect("seeded above")
                                .kind,
                            StatementKind::Skip,
                        );
                        let other_kind = std::mem::replace(
                            &mut self
                                .bodies
                                .get_mut(second)
                                .expect("seeded above")
                                .kind,
                            kind,
                        );
                        self.bodies.get_mut(first).expect("seeded above").kind = other_kind;
                    }
                }
            }
            Edit::ReplaceSubatom { dest, index, expr } => {
                let body = self.body_mut(*dest)?;
                if let Err(err) = ast::replace_subatom(body, *index, expr.clone()) {
                    // Earlier structural edits can shrink the slot list;
                    // the edit is skipped rather than failing the whole
                    // materialization.
                    tracing::warn!("Skipping stale subatom edit: {err}");
                }
            }
            Edit::Template { name, bindings } => {
                let kind = self
                    .ctx
                    .templates
                    .instantiate(name, bindings, &self.ctx.store)?;
                self.body_mut(edit.destination())?.kind = kind;
            }
        }
        Ok(())
    }

    fn seed(&mut self, id: StatementId) -> Result<()> {
        if !self.bodies.contains_key(&id) {
            let original = self.ctx.store.statement(id)?.clone();
            self.bodies.insert(id, original);
        }
        Ok(())
    }

    fn body_mut(&mut self, id: StatementId) -> Result<&mut Statement> {
        self.seed(id)?;
        Ok(self.bodies.get_mut(&id).expect("seeded above"))
    }

    pub(crate) fn into_bodies(self) -> HashMap<StatementId, Statement> {
        self.bodies
    }
}

/// Materialize `history` against clones of the original files.
pub(crate) fn apply_history(
    ctx: &CoreContext,
    history: &[Edit],
) -> Result<BTreeMap<String, FileAst>> {
    let mut fold = EditFold::new(ctx);
    for edit in history {
        fold.push(edit)?;
    }
    let bodies = fold.into_bodies();

    let mut files = BTreeMap::new();
    // Each touched id is substituted at most once per rebuild; a body that
    // somehow contains its own ancestor cannot recurse forever.
    let mut applied: HashSet<StatementId> = HashSet::new();
    for file in ctx.store.files() {
        let mut file = file.clone();
        for function in &mut file.functions {
            visit::map_statements(&mut function.body, &mut |stmt| {
                if stmt.id.is_numbered() && bodies.contains_key(&stmt.id) && applied.insert(stmt.id)
                {
                    bodies[&stmt.id].clone()
                } else {
                    stmt
                }
            });
        }
        files.insert(file.name.clone(), file);
    }
    zero_duplicate_ids(&mut files);
    Ok(files)
}

/// Guarantee that no non-zero id appears twice across the materialized
/// trees; the second occurrence in pre-order is zeroed.
pub(crate) fn zero_duplicate_ids(files: &mut BTreeMap<String, FileAst>) {
    let mut seen: HashSet<StatementId> = HashSet::new();
    for file in files.values_mut() {
        for function in &mut file.functions {
            visit::for_each_statement_mut(&mut function.body, &mut |stmt| {
                if stmt.id.is_numbered() && !seen.insert(stmt.id) {
                    stmt.id = StatementId::UNNUMBERED;
                }
            });
        }
    }
}
