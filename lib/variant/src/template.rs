//! Named code templates.
//!
//! A template turns hole-to-atom bindings into a replacement statement
//! body at apply time. The catalog is part of the session context;
//! applying an edit that names an unknown template is fatal.

use core::fmt;
use std::{collections::BTreeMap, sync::Arc};

use program::ast::{BinaryOp, Block, Expr, StatementId, StatementKind};
use program::store::AtomStore;

use crate::{edit::TEMPLATE_DEST_HOLE, Error, Result};

pub trait Template: Send + Sync {
    fn name(&self) -> &str;

    /// Build the replacement body for the destination statement.
    fn instantiate(
        &self,
        bindings: &BTreeMap<String, StatementId>,
        store: &AtomStore,
    ) -> Result<StatementKind>;
}

#[derive(Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, Arc<dyn Template>>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: Arc<dyn Template>) {
        self.templates.insert(template.name().to_string(), template);
    }

    pub fn instantiate(
        &self,
        name: &str,
        bindings: &BTreeMap<String, StatementId>,
        store: &AtomStore,
    ) -> Result<StatementKind> {
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| Error::UnknownTemplate(name.to_string()))?;
        template.instantiate(bindings, store)
    }
}

impl fmt::Debug for TemplateCatalog {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("TemplateCatalog")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Wraps the destination statement in a guard: the first subatom of the
/// `guard` atom must be non-zero for the statement to run.
pub struct GuardTemplate;

impl GuardTemplate {
    pub const NAME: &'static str = "guard";
    pub const GUARD_HOLE: &'static str = "guard";
}

impl Template for GuardTemplate {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn instantiate(
        &self,
        bindings: &BTreeMap<String, StatementId>,
        store: &AtomStore,
    ) -> Result<StatementKind> {
        let hole = |name: &str| {
            bindings
                .get(name)
                .copied()
                .ok_or_else(|| Error::MissingTemplateBinding {
                    template: Self::NAME.to_string(),
                    hole: name.to_string(),
                })
        };
        let dest = hole(TEMPLATE_DEST_HOLE)?;
        let guard = hole(Self::GUARD_HOLE)?;

        let guarded = store.statement(dest)?.clone_zeroed();
        let guard_stmt = store.statement(guard)?;
        let condition = guard_stmt
            .kind
            .subatoms()
            .first()
            .map(|expr| (*expr).clone())
            .ok_or_else(|| {
                Error::Unique(format!("Guard atom {guard} carries no expression"))
            })?;

        Ok(StatementKind::If {
            cond: Expr::Binary {
                op: BinaryOp::Ne,
                lhs: Box::new(condition),
                rhs: Box::new(Expr::zero()),
            },
            then_block: Block {
                statements: vec![guarded],
            },
            else_block: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_template_wraps_the_destination() {
        let source = r#"
            int f(int a) {
                a = a + 1;
                if (a > 3) {
                    a = 0;
                }
                return a;
            }
        "#;
        let store = AtomStore::from_sources(&[("f.c", source)]).unwrap();
        let mut catalog = TemplateCatalog::new();
        catalog.register(Arc::new(GuardTemplate));

        // Guard `a = a + 1;` (atom 1) with the condition of the `if` (atom 2).
        let bindings = BTreeMap::from([
            ("dest".to_string(), StatementId::new(1)),
            ("guard".to_string(), StatementId::new(2)),
        ]);
        let kind = catalog
            .instantiate(GuardTemplate::NAME, &bindings, &store)
            .unwrap();
        match kind {
            StatementKind::If { then_block, .. } => {
                assert_eq!(then_block.statements.len(), 1);
                assert_eq!(
                    then_block.statements[0].id,
                    StatementId::UNNUMBERED
                );
            }
            other => panic!("expected a guard, got {other:?}"),
        }
    }

    #[test]
    fn unknown_templates_are_fatal() {
        let store = AtomStore::from_sources(&[("f.c", "int f(int a) { return a; }")]).unwrap();
        let catalog = TemplateCatalog::new();
        let err = catalog
            .instantiate("nonesuch", &BTreeMap::new(), &store)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTemplate(_)));
    }
}
