use serde::{Deserialize, Serialize};

use program::store::AtomStore;

use crate::{localization::Localization, template::TemplateCatalog};

/// Which donor filter runs before an edit is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SemanticCheck {
    /// Offer every donor the localization names.
    None,
    /// Only offer donors whose used variables are in scope at the
    /// destination.
    #[default]
    Scope,
}

/// Everything a repair session shares between its variants: the frozen
/// store, the localization, and the knobs that change how edits apply.
///
/// There is no process-level state anywhere; one session owns exactly one
/// context and threads it into every representation it creates.
#[derive(Debug)]
pub struct CoreContext {
    pub store: AtomStore,
    pub localization: Localization,
    pub semantic_check: SemanticCheck,
    /// Reproduce the historical swap behavior (delete at the lower id,
    /// append the higher id's body there) instead of a true exchange.
    pub swap_bug: bool,
    pub templates: TemplateCatalog,
}

impl CoreContext {
    pub fn new(store: AtomStore, mut localization: Localization) -> Self {
        localization.canonicalize_fix(&store);
        Self {
            store,
            localization,
            semantic_check: SemanticCheck::default(),
            swap_bug: false,
            templates: TemplateCatalog::new(),
        }
    }

    pub fn with_semantic_check(mut self, semantic_check: SemanticCheck) -> Self {
        self.semantic_check = semantic_check;
        self
    }

    pub fn with_swap_bug(mut self, swap_bug: bool) -> Self {
        self.swap_bug = swap_bug;
        self
    }

    pub fn with_templates(mut self, templates: TemplateCatalog) -> Self {
        self.templates = templates;
        self
    }
}
