use std::sync::Arc;

use uuid::Uuid;

use program::{
    provider::{AstProvider, CSubsetProvider},
    store::{AtomStore, SymbolTable},
};
use variant::{CoreContext, Localization, PatchProgram};

use crate::{config::RepairConfig, manifest::RepairManifest, Result};

/// One repair attempt: a manifest, a config, and an identity for logs and
/// artifacts.
#[derive(Debug, Clone)]
pub struct RepairRun {
    pub id: Uuid,
    pub manifest: RepairManifest,
    pub config: RepairConfig,
}

impl RepairRun {
    pub fn new(manifest: RepairManifest, config: RepairConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            manifest,
            config,
        }
    }

    /// Preprocess, parse and number every source the manifest names.
    pub fn load_store(&self) -> Result<AtomStore> {
        let provider = CSubsetProvider;
        let staging = std::env::temp_dir().join(format!("mend-pre-{}", self.id));
        std::fs::create_dir_all(&staging)?;

        let mut symbols = SymbolTable::new();
        let mut files = Vec::with_capacity(self.manifest.program.len());
        for (index, path) in self.manifest.program.iter().enumerate() {
            let staged = staging.join(format!("pre-{index}.c"));
            let parse_from = if provider.preprocess(path, &staged)? {
                staged.as_path()
            } else {
                path.as_path()
            };
            tracing::debug!("Parsing {}", path.display());
            let mut file = provider.parse(parse_from, &mut symbols)?;
            // Sites keep the user-facing name even when the preprocessed
            // copy was parsed.
            file.name = path.to_string_lossy().into_owned();
            files.push(file);
        }
        std::fs::remove_dir_all(&staging).ok();
        Ok(AtomStore::build(files, symbols)?)
    }

    /// Freeze the session context around a store and a localization.
    pub fn build_context(&self, store: AtomStore, localization: Localization) -> Arc<CoreContext> {
        Arc::new(
            CoreContext::new(store, localization)
                .with_semantic_check(self.config.semantic_check)
                .with_swap_bug(self.config.swap_bug),
        )
    }

    /// The pristine variant every search starts from.
    pub fn original(&self, ctx: &Arc<CoreContext>) -> PatchProgram {
        PatchProgram::new(Arc::clone(ctx))
    }
}

#[cfg(test)]
mod tests {
    use variant::Representation;

    use super::*;
    use crate::RepairConfig;

    #[test]
    fn a_run_loads_and_numbers_its_program() {
        let dir = std::env::temp_dir().join(format!("mend-run-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let source = dir.join("buggy.c");
        std::fs::write(&source, "int f(int a) {\n    a = a + 1;\n    return a;\n}\n").unwrap();

        let run = RepairRun::new(
            RepairManifest::for_single_file(&source),
            RepairConfig::default(),
        );
        let store = run.load_store().unwrap();
        assert_eq!(store.max_atom(), 2);

        let ctx = run.build_context(store.clone(), Localization::uniform(&store));
        let original = run.original(&ctx);
        let printed = original.printed().unwrap();
        assert!(printed
            .get(&source.to_string_lossy().into_owned())
            .unwrap()
            .contains("return a;"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
