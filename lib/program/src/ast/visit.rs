//! One walk function over the tree, driven by a dispatch object.

use crate::ast::{Block, Expr, FileAst, GlobalDecl, Statement, StatementKind, VarId};

/// Dispatch object for an AST walk. Implementors override the node kinds
/// they care about; every method defaults to doing nothing.
pub trait AstVisitor {
    fn on_global(&mut self, _decl: &GlobalDecl) {}
    fn on_vardecl(&mut self, _var: VarId, _init: Option<&Expr>) {}
    fn on_stmt(&mut self, _stmt: &Statement) {}
    fn on_block(&mut self, _block: &Block) {}
    fn on_expr(&mut self, _expr: &Expr) {}
    fn on_lval(&mut self, _var: VarId) {}
}

pub fn walk_file<V: AstVisitor>(file: &FileAst, visitor: &mut V) {
    for decl in &file.globals {
        visitor.on_global(decl);
    }
    for function in &file.functions {
        walk_block(&function.body, visitor);
    }
}

pub fn walk_block<V: AstVisitor>(block: &Block, visitor: &mut V) {
    visitor.on_block(block);
    for stmt in &block.statements {
        walk_statement(stmt, visitor);
    }
}

pub fn walk_statement<V: AstVisitor>(stmt: &Statement, visitor: &mut V) {
    visitor.on_stmt(stmt);
    match &stmt.kind {
        StatementKind::Declare { var, init } => {
            visitor.on_vardecl(*var, init.as_ref());
            if let Some(init) = init {
                walk_expr(init, visitor);
            }
        }
        StatementKind::Assign { target, value } => {
            visitor.on_lval(*target);
            walk_expr(value, visitor);
        }
        StatementKind::Expr(expr) => walk_expr(expr, visitor),
        StatementKind::Return(value) => {
            if let Some(value) = value {
                walk_expr(value, visitor);
            }
        }
        StatementKind::If {
            cond,
            then_block,
            else_block,
        } => {
            walk_expr(cond, visitor);
            walk_block(then_block, visitor);
            if let Some(else_block) = else_block {
                walk_block(else_block, visitor);
            }
        }
        StatementKind::While { cond, body } => {
            walk_expr(cond, visitor);
            walk_block(body, visitor);
        }
        StatementKind::Compound(block) => walk_block(block, visitor),
        StatementKind::Skip | StatementKind::Break | StatementKind::Continue => {}
    }
}

pub fn walk_expr<V: AstVisitor>(expr: &Expr, visitor: &mut V) {
    visitor.on_expr(expr);
    match expr {
        Expr::Unary { operand, .. } => walk_expr(operand, visitor),
        Expr::Binary { lhs, rhs, .. } => {
            walk_expr(lhs, visitor);
            walk_expr(rhs, visitor);
        }
        Expr::Call { args, .. } => {
            for arg in args {
                walk_expr(arg, visitor);
            }
        }
        Expr::Int(_) | Expr::Var(_) => {}
    }
}

/// Visit every statement in pre-order.
pub fn for_each_statement(block: &Block, f: &mut dyn FnMut(&Statement)) {
    for stmt in &block.statements {
        f(stmt);
        for nested in stmt.kind.blocks() {
            for_each_statement(nested, f);
        }
    }
}

/// Visit every statement in pre-order, mutably. The callback runs on a
/// statement before its children are descended into.
pub fn for_each_statement_mut(block: &mut Block, f: &mut dyn FnMut(&mut Statement)) {
    for stmt in &mut block.statements {
        f(stmt);
        for nested in stmt.kind.blocks_mut() {
            for_each_statement_mut(nested, f);
        }
    }
}

/// Rebuild a block by mapping every statement through `f`, descending into
/// the children of whatever `f` returned. The map runs outer statements
/// before the statements nested inside their replacement.
pub fn map_statements(block: &mut Block, f: &mut dyn FnMut(Statement) -> Statement) {
    for slot in &mut block.statements {
        let original = std::mem::replace(
            slot,
            Statement::unnumbered(StatementKind::Skip),
        );
        let mut mapped = f(original);
        for nested in mapped.kind.blocks_mut() {
            map_statements(nested, f);
        }
        *slot = mapped;
    }
}
