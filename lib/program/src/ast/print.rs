//! Deterministic rendering of the tree back to source text.
//!
//! The printed form doubles as the canonical identity of a statement: two
//! donor statements whose printed forms match are treated as the same fix
//! site.

use crate::{
    ast::{Block, Expr, FileAst, Statement, StatementId, StatementKind},
    store::SymbolTable,
};

const INDENT: &str = "    ";

/// Render a whole file.
pub fn pretty_print_file(file: &FileAst, symbols: &SymbolTable) -> String {
    let mut writer = CWriter::new(symbols);
    writer.write_file(file);
    writer.finish()
}

/// Render one statement subtree as a single whitespace-normalized line.
pub fn print_statement(stmt: &Statement, symbols: &SymbolTable) -> String {
    let mut writer = CWriter::new(symbols);
    writer.write_statement(stmt);
    let raw = writer.finish();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render one expression.
pub fn print_expr(expr: &Expr, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr, 0, symbols);
    out
}

/// Source writer with an optional per-statement prelude hook, used by the
/// coverage instrumentation to inject trace calls ahead of numbered
/// statements.
pub(crate) struct CWriter<'a> {
    symbols: &'a SymbolTable,
    prelude: Option<&'a dyn Fn(StatementId) -> Option<String>>,
    out: String,
    indent: usize,
}

impl<'a> CWriter<'a> {
    pub(crate) fn new(symbols: &'a SymbolTable) -> Self {
        Self {
            symbols,
            prelude: None,
            out: String::new(),
            indent: 0,
        }
    }

    pub(crate) fn with_prelude(
        symbols: &'a SymbolTable,
        prelude: &'a dyn Fn(StatementId) -> Option<String>,
    ) -> Self {
        Self {
            symbols,
            prelude: Some(prelude),
            out: String::new(),
            indent: 0,
        }
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    pub(crate) fn write_file(&mut self, file: &FileAst) {
        for decl in &file.globals {
            let info = self.symbols.info(decl.var);
            match decl.init {
                Some(value) => self.line(&format!("{} {} = {};", info.ty, info.name, value)),
                None => self.line(&format!("{} {};", info.ty, info.name)),
            }
        }
        if !file.globals.is_empty() {
            self.out.push('\n');
        }
        for (index, function) in file.functions.iter().enumerate() {
            if index > 0 {
                self.out.push('\n');
            }
            let params = function
                .params
                .iter()
                .map(|param| {
                    let info = self.symbols.info(*param);
                    format!("{} {}", info.ty, info.name)
                })
                .collect::<Vec<_>>()
                .join(", ");
            self.line(&format!("int {}({}) {{", function.name, params));
            self.indent += 1;
            self.write_block(&function.body);
            self.indent -= 1;
            self.line("}");
        }
    }

    pub(crate) fn write_block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.write_statement(stmt);
        }
    }

    pub(crate) fn write_statement(&mut self, stmt: &Statement) {
        if stmt.id.is_numbered() {
            if let Some(prelude) = self.prelude {
                if let Some(text) = prelude(stmt.id) {
                    self.line(&text);
                }
            }
        }
        match &stmt.kind {
            StatementKind::Skip => self.line(";"),
            StatementKind::Expr(expr) => {
                let expr = self.expr(expr);
                self.line(&format!("{expr};"));
            }
            StatementKind::Declare { var, init } => {
                let info = self.symbols.info(*var);
                match init {
                    Some(init) => {
                        let init = self.expr(init);
                        self.line(&format!("{} {} = {};", info.ty, info.name, init));
                    }
                    None => self.line(&format!("{} {};", info.ty, info.name)),
                }
            }
            StatementKind::Assign { target, value } => {
                let name = self.symbols.name_of(*target).to_string();
                let value = self.expr(value);
                self.line(&format!("{name} = {value};"));
            }
            StatementKind::Return(value) => match value {
                Some(value) => {
                    let value = self.expr(value);
                    self.line(&format!("return {value};"));
                }
                None => self.line("return;"),
            },
            StatementKind::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond = self.expr(cond);
                self.line(&format!("if ({cond}) {{"));
                self.indent += 1;
                self.write_block(then_block);
                self.indent -= 1;
                match else_block {
                    Some(else_block) => {
                        self.line("} else {");
                        self.indent += 1;
                        self.write_block(else_block);
                        self.indent -= 1;
                        self.line("}");
                    }
                    None => self.line("}"),
                }
            }
            StatementKind::While { cond, body } => {
                let cond = self.expr(cond);
                self.line(&format!("while ({cond}) {{"));
                self.indent += 1;
                self.write_block(body);
                self.indent -= 1;
                self.line("}");
            }
            StatementKind::Break => self.line("break;"),
            StatementKind::Continue => self.line("continue;"),
            StatementKind::Compound(block) => {
                self.line("{");
                self.indent += 1;
                self.write_block(block);
                self.indent -= 1;
                self.line("}");
            }
        }
    }

    fn expr(&self, expr: &Expr) -> String {
        let mut out = String::new();
        write_expr(&mut out, expr, 0, self.symbols);
        out
    }
}

fn write_expr(out: &mut String, expr: &Expr, parent_prec: u8, symbols: &SymbolTable) {
    match expr {
        Expr::Int(value) => out.push_str(&value.to_string()),
        Expr::Var(var) => out.push_str(symbols.name_of(*var)),
        Expr::Unary { op, operand } => {
            out.push_str(op.symbol());
            write_expr(out, operand, 7, symbols);
        }
        Expr::Binary { op, lhs, rhs } => {
            let prec = op.precedence();
            let parens = prec < parent_prec;
            if parens {
                out.push('(');
            }
            write_expr(out, lhs, prec, symbols);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            // Right operand binds one step tighter so equal-precedence
            // chains stay left-associative when reparsed.
            write_expr(out, rhs, prec + 1, symbols);
            if parens {
                out.push(')');
            }
        }
        Expr::Call { callee, args } => {
            out.push_str(callee);
            out.push('(');
            for (index, arg) in args.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg, 0, symbols);
            }
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::parse::parse_source, store::SymbolTable};

    #[test]
    fn printing_is_stable_under_reparse() {
        let source = r#"
            int limit = 10;

            int clamp(int value) {
                if (value > limit || value < -limit) {
                    value = limit * (value / value);
                }
                while (value >= limit) {
                    value = value - 1;
                }
                return value;
            }
        "#;
        let mut symbols = SymbolTable::new();
        let file = parse_source("clamp.c", source, &mut symbols).unwrap();
        let first = pretty_print_file(&file, &symbols);

        let mut symbols_again = SymbolTable::new();
        let reparsed = parse_source("clamp.c", &first, &mut symbols_again).unwrap();
        let second = pretty_print_file(&reparsed, &symbols_again);
        assert_eq!(first, second);
    }

    #[test]
    fn statement_form_is_one_normalized_line() {
        let source = r#"
            int f(int a) {
                if (a > 0) {
                    a = a - 1;
                }
                return a;
            }
        "#;
        let mut symbols = SymbolTable::new();
        let file = parse_source("f.c", source, &mut symbols).unwrap();
        let if_stmt = &file.functions[0].body.statements[0];
        assert_eq!(
            print_statement(if_stmt, &symbols),
            "if (a > 0) { a = a - 1; }"
        );
    }
}

