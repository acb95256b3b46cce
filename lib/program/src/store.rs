//! The frozen view of the parsed base program.
//!
//! [`AtomStore::build`] runs the numbering pass over freshly parsed files,
//! records where every statement lives, computes the per-statement scope
//! tables, and keeps a clone of every numbered statement as the donor code
//! bank. After construction the store never changes; every candidate
//! variant in a search shares one store.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::{
    ast::{
        parse,
        print,
        visit::{self, AstVisitor},
        Block, Expr, FileAst, Statement, StatementId, StatementKind, VarId,
    },
    Error, Result,
};

/// Name and type of one interned variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarInfo {
    pub name: String,
    pub ty: String,
}

/// Interning table for every variable the parsed program mentions.
///
/// Locals get a fresh id per declaration (shadowing included); globals are
/// shared by name across files so a later file sees the globals of an
/// earlier one.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    vars: Vec<VarInfo>,
    globals: BTreeSet<VarId>,
    global_names: HashMap<String, VarId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str, ty: &str) -> VarId {
        let var = VarId::new(self.vars.len() as u32);
        self.vars.push(VarInfo {
            name: name.to_string(),
            ty: ty.to_string(),
        });
        var
    }

    pub fn intern_global(&mut self, name: &str, ty: &str) -> VarId {
        if let Some(var) = self.global_names.get(name) {
            return *var;
        }
        let var = self.intern(name, ty);
        self.globals.insert(var);
        self.global_names.insert(name.to_string(), var);
        var
    }

    pub fn lookup_global(&self, name: &str) -> Option<VarId> {
        self.global_names.get(name).copied()
    }

    pub fn is_global(&self, var: VarId) -> bool {
        self.globals.contains(&var)
    }

    pub fn globals(&self) -> &BTreeSet<VarId> {
        &self.globals
    }

    pub fn info(&self, var: VarId) -> &VarInfo {
        &self.vars[var.as_usize()]
    }

    pub fn name_of(&self, var: VarId) -> &str {
        &self.vars[var.as_usize()].name
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Where a numbered statement lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementSite {
    pub function: String,
    pub file: String,
}

/// The parsed base program: files, statement identities, scope tables and
/// the donor code bank.
#[derive(Debug, Clone)]
pub struct AtomStore {
    files: BTreeMap<String, FileAst>,
    file_order: Vec<String>,
    symbols: SymbolTable,
    sites: HashMap<StatementId, StatementSite>,
    code_bank: HashMap<StatementId, Statement>,
    locals_have: HashMap<StatementId, BTreeSet<VarId>>,
    locals_used: HashMap<StatementId, BTreeSet<VarId>>,
    canonical: HashMap<StatementId, StatementId>,
    max_atom: u32,
}

impl AtomStore {
    /// Parse the given `(name, source)` pairs and build a store from them.
    pub fn from_sources(sources: &[(&str, &str)]) -> Result<AtomStore> {
        let mut symbols = SymbolTable::new();
        let mut files = Vec::with_capacity(sources.len());
        for (name, source) in sources {
            files.push(parse::parse_source(name, source, &mut symbols)?);
        }
        Self::build(files, symbols)
    }

    /// Number the parsed files and freeze them into a store.
    ///
    /// Files are numbered in the order given; ids are dense and start at 1.
    pub fn build(mut files: Vec<FileAst>, symbols: SymbolTable) -> Result<AtomStore> {
        let mut store = AtomStore {
            files: BTreeMap::new(),
            file_order: Vec::new(),
            symbols,
            sites: HashMap::new(),
            code_bank: HashMap::new(),
            locals_have: HashMap::new(),
            locals_used: HashMap::new(),
            canonical: HashMap::new(),
            max_atom: 0,
        };

        for file in &mut files {
            insert_block_handles(file);
            store.number_file(file)?;
        }
        for file in &files {
            store.record_scopes(file);
        }
        for file in &files {
            store.record_bank(file)?;
        }
        store.build_canonical_map();

        for file in files {
            store.file_order.push(file.name.clone());
            store.files.insert(file.name.clone(), file);
        }

        store.check_invariants()?;
        tracing::debug!(
            "Built atom store: {} statements across {} file(s), {} variables",
            store.max_atom,
            store.files.len(),
            store.symbols.len()
        );
        Ok(store)
    }

    fn number_file(&mut self, file: &mut FileAst) -> Result<()> {
        for function in &mut file.functions {
            let site = StatementSite {
                function: function.name.clone(),
                file: file.name.clone(),
            };
            let mut next = self.max_atom;
            visit::for_each_statement_mut(&mut function.body, &mut |stmt| {
                if stmt.kind.is_mutatable() {
                    next += 1;
                    stmt.id = StatementId::new(next);
                }
            });
            for id in (self.max_atom + 1)..=next {
                self.sites.insert(StatementId::new(id), site.clone());
            }
            self.max_atom = next;
        }
        Ok(())
    }

    fn record_scopes(&mut self, file: &FileAst) {
        for function in &file.functions {
            let mut frames = vec![function.params.iter().copied().collect::<BTreeSet<_>>()];
            self.scope_block(&function.body, &mut frames);
        }
    }

    fn scope_block(&mut self, block: &Block, frames: &mut Vec<BTreeSet<VarId>>) {
        for stmt in &block.statements {
            if let StatementKind::Declare { var, .. } = &stmt.kind {
                frames
                    .last_mut()
                    .expect("scope walk always has an open frame")
                    .insert(*var);
            }
            if stmt.id.is_numbered() {
                let visible = frames
                    .iter()
                    .flat_map(|frame| frame.iter().copied())
                    .collect::<BTreeSet<_>>();
                let used = self.subtree_uses(stmt);
                self.locals_have.insert(stmt.id, visible);
                self.locals_used.insert(stmt.id, used);
            }
            for nested in stmt.kind.blocks() {
                frames.push(BTreeSet::new());
                self.scope_block(nested, frames);
                frames.pop();
            }
        }
    }

    /// Non-global variables the subtree reads or writes, excluding those it
    /// declares itself (a transplanted subtree brings those along).
    fn subtree_uses(&self, stmt: &Statement) -> BTreeSet<VarId> {
        struct Collector {
            used: BTreeSet<VarId>,
            declared: BTreeSet<VarId>,
        }
        impl AstVisitor for Collector {
            fn on_expr(&mut self, expr: &Expr) {
                if let Expr::Var(var) = expr {
                    self.used.insert(*var);
                }
            }

            fn on_lval(&mut self, var: VarId) {
                self.used.insert(var);
            }

            fn on_vardecl(&mut self, var: VarId, _init: Option<&Expr>) {
                self.declared.insert(var);
            }
        }

        let mut collector = Collector {
            used: BTreeSet::new(),
            declared: BTreeSet::new(),
        };
        visit::walk_statement(stmt, &mut collector);
        collector
            .used
            .into_iter()
            .filter(|var| !collector.declared.contains(var) && !self.symbols.is_global(*var))
            .collect()
    }

    fn record_bank(&mut self, file: &FileAst) -> Result<()> {
        let mut duplicate = None;
        for function in &file.functions {
            visit::for_each_statement(&function.body, &mut |stmt| {
                if stmt.id.is_numbered()
                    && self.code_bank.insert(stmt.id, stmt.clone()).is_some()
                    && duplicate.is_none()
                {
                    duplicate = Some(stmt.id);
                }
            });
        }
        match duplicate {
            Some(id) => Err(Error::DuplicateStatementId(id)),
            None => Ok(()),
        }
    }

    fn build_canonical_map(&mut self) {
        let mut by_text: HashMap<String, StatementId> = HashMap::new();
        for id in 1..=self.max_atom {
            let id = StatementId::new(id);
            let Some(stmt) = self.code_bank.get(&id) else {
                continue;
            };
            let text = print::print_statement(stmt, &self.symbols);
            let representative = *by_text.entry(text).or_insert(id);
            self.canonical.insert(id, representative);
        }
    }

    fn check_invariants(&self) -> Result<()> {
        for id in self.numbered_ids() {
            if !self.sites.contains_key(&id) || !self.code_bank.contains_key(&id) {
                return Err(Error::Unique(format!(
                    "Numbering invariant violation: statement {id} was never recorded"
                )));
            }
            let used = self
                .locals_used
                .get(&id)
                .ok_or(Error::MissingScopeInfo(id))?;
            let have = self
                .locals_have
                .get(&id)
                .ok_or(Error::MissingScopeInfo(id))?;
            if !used.is_subset(have) {
                return Err(Error::Unique(format!(
                    "Scope invariant violation at statement {id}: a used variable is not in scope"
                )));
            }
        }
        Ok(())
    }

    pub fn max_atom(&self) -> u32 {
        self.max_atom
    }

    pub fn numbered_ids(&self) -> impl Iterator<Item = StatementId> {
        (1..=self.max_atom).map(StatementId::new)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Files in load order.
    pub fn files(&self) -> impl Iterator<Item = &FileAst> {
        self.file_order
            .iter()
            .filter_map(|name| self.files.get(name))
    }

    pub fn file(&self, name: &str) -> Option<&FileAst> {
        self.files.get(name)
    }

    pub fn site(&self, id: StatementId) -> Option<&StatementSite> {
        self.sites.get(&id)
    }

    /// The original form of a numbered statement, from the code bank.
    pub fn statement(&self, id: StatementId) -> Result<&Statement> {
        self.code_bank.get(&id).ok_or(Error::UnknownStatement(id))
    }

    /// The representative id for fix-site purposes: statements whose
    /// printed forms are identical share one representative.
    pub fn canonical_id(&self, id: StatementId) -> StatementId {
        self.canonical.get(&id).copied().unwrap_or(id)
    }

    pub fn locals_have(&self, id: StatementId) -> Result<&BTreeSet<VarId>> {
        self.locals_have.get(&id).ok_or(Error::MissingScopeInfo(id))
    }

    pub fn locals_used(&self, id: StatementId) -> Result<&BTreeSet<VarId>> {
        self.locals_used.get(&id).ok_or(Error::MissingScopeInfo(id))
    }

    pub fn globals(&self) -> &BTreeSet<VarId> {
        self.symbols.globals()
    }

    /// Whether code that `src` needs is visible at `dest`, i.e. whether a
    /// clone of `src` would still resolve if inlined at `dest`.
    pub fn in_scope_at(&self, dest: StatementId, src: StatementId) -> Result<bool> {
        let used = self.locals_used(src)?;
        let have = self.locals_have(dest)?;
        Ok(used.is_subset(have))
    }
}

/// Give every empty block body a no-op statement so later edits have a
/// handle inside it.
fn insert_block_handles(file: &mut FileAst) {
    fn fill(block: &mut Block) {
        if block.statements.is_empty() {
            block
                .statements
                .push(Statement::unnumbered(StatementKind::Skip));
        }
        for stmt in &mut block.statements {
            for nested in stmt.kind.blocks_mut() {
                fill(nested);
            }
        }
    }
    for function in &mut file.functions {
        fill(&mut function.body);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: &str = r#"
        int counter;

        int bump(int by) {
            int total = 0;
            total = total + by;
            counter = counter + 1;
            return total;
        }
    "#;

    #[test]
    fn numbering_is_dense_and_preorder() {
        let store = AtomStore::from_sources(&[("counter.c", COUNTER)]).unwrap();
        assert_eq!(store.max_atom(), 4);
        let site = store.site(StatementId::new(1)).unwrap();
        assert_eq!(site.function, "bump");
        assert_eq!(site.file, "counter.c");
        let printed = print::print_statement(
            store.statement(StatementId::new(4)).unwrap(),
            store.symbols(),
        );
        assert_eq!(printed, "return total;");
    }

    #[test]
    fn scope_tables_cover_every_numbered_statement() {
        let store = AtomStore::from_sources(&[("counter.c", COUNTER)]).unwrap();
        for id in store.numbered_ids() {
            let used = store.locals_used(id).unwrap();
            let have = store.locals_have(id).unwrap();
            assert!(used.is_subset(have), "statement {id} uses out-of-scope vars");
        }
    }

    #[test]
    fn globals_do_not_count_as_local_uses() {
        let store = AtomStore::from_sources(&[("counter.c", COUNTER)]).unwrap();
        // `counter = counter + 1;` touches only the global.
        assert!(store.locals_used(StatementId::new(3)).unwrap().is_empty());
    }

    #[test]
    fn scope_predicate_blocks_inner_locals() {
        let source = r#"
            int f(int a) {
                a = 1;
                if (a > 0) {
                    int y = 2;
                    y = y + a;
                }
                return a;
            }
        "#;
        let store = AtomStore::from_sources(&[("scoped.c", source)]).unwrap();
        // 1: a=1; 2: if; 3: int y=2; 4: y=y+a; 5: return a;
        let outer = StatementId::new(1);
        let inner_use = StatementId::new(4);
        assert!(!store.in_scope_at(outer, inner_use).unwrap());
        assert!(store.in_scope_at(inner_use, outer).unwrap());
    }

    #[test]
    fn identical_statements_share_a_canonical_id() {
        let source = r#"
            int f(int a) {
                a = 0;
                a = 1;
                a = 0;
                return a;
            }
        "#;
        let store = AtomStore::from_sources(&[("dup.c", source)]).unwrap();
        assert_eq!(
            store.canonical_id(StatementId::new(3)),
            StatementId::new(1)
        );
        assert_eq!(
            store.canonical_id(StatementId::new(2)),
            StatementId::new(2)
        );
    }

    #[test]
    fn empty_blocks_receive_a_numbered_handle() {
        let source = r#"
            int f(int a) {
                while (a > 0) {
                }
                return a;
            }
        "#;
        let store = AtomStore::from_sources(&[("empty.c", source)]).unwrap();
        // 1: while; 2: the inserted handle; 3: return.
        assert_eq!(store.max_atom(), 3);
        let handle = store.statement(StatementId::new(2)).unwrap();
        assert_eq!(handle.kind, StatementKind::Skip);
    }
}
