//! End-to-end scenarios across the workspace crates: load a buggy
//! program, search for a repair, ship histories between demes, and check
//! that what comes out the other side still prints the same program.

use std::sync::Arc;

use program::{ast::StatementId, store::AtomStore};
use repair_control::{DistributedConfig, DistributedCoordinator};
use repair_structure::{RepairConfig, RepairManifest, RepairRun};
use search_control::{
    BruteForceEngine, BruteForceSettings, FitnessEvaluator, GaParams, GeneticEngine,
};
use variant::{codec, CoreContext, Localization, PatchProgram, Representation, TreeProgram};

/// `max` clobbers its running best unconditionally; the repair the judge
/// accepts is any variant whose printed form lost the clobbering write.
const BROKEN_MAX: &str = r#"
    int max(int a, int b) {
        int best = a;
        best = b;
        return best;
    }
"#;

const CLOBBER: &str = "best = b;";

fn context() -> Arc<CoreContext> {
    let store = AtomStore::from_sources(&[("max.c", BROKEN_MAX)]).unwrap();
    let localization = Localization::uniform(&store);
    Arc::new(CoreContext::new(store, localization))
}

/// Stands in for a two-test suite: fitness is the positive-test count
/// when the clobbering write is gone, a token amount otherwise.
#[derive(Clone)]
struct SourceJudge;

impl<R: Representation> FitnessEvaluator<R> for SourceJudge {
    fn evaluate(&mut self, variant: &mut R) -> search_control::Result<f64> {
        let printed = variant
            .printed()
            .map_err(|err| search_control::Error::Evaluator(err.to_string()))?;
        let source: String = printed.into_values().collect();
        Ok(if source.contains(CLOBBER) { 0.5 } else { 2.0 })
    }

    fn solution_threshold(&self) -> f64 {
        2.0
    }
}

#[test]
fn brute_force_finds_the_single_edit_repair() {
    let ctx = context();
    let original = PatchProgram::new(Arc::clone(&ctx));
    let mut engine = BruteForceEngine::new(SourceJudge, BruteForceSettings::default());
    let repair = engine
        .run(&original)
        .unwrap()
        .expect("one deletion fixes this program");
    assert_eq!(repair.fitness, 2.0);
    let printed = repair.variant.printed().unwrap();
    assert!(!printed["max.c"].contains(CLOBBER));
}

#[test]
fn the_genetic_search_repairs_both_representation_flavors() {
    let params = GaParams {
        generations: 25,
        pop_size: 10,
        mut_rate: 1.0,
        ..GaParams::default()
    };

    let ctx = context();
    let patch = PatchProgram::new(Arc::clone(&ctx));
    let mut engine = GeneticEngine::new(patch, params, SourceJudge, 5);
    let outcome = engine.run(Vec::new()).unwrap();
    assert!(outcome.solution.is_some(), "patch flavor found no repair");

    let tree = TreeProgram::new(Arc::clone(&ctx));
    let mut engine = GeneticEngine::new(tree, params, SourceJudge, 5);
    let outcome = engine.run(Vec::new()).unwrap();
    assert!(outcome.solution.is_some(), "tree flavor found no repair");
}

#[test]
fn a_shipped_history_rebuilds_the_same_program() {
    let ctx = context();
    let mut variant = PatchProgram::new(Arc::clone(&ctx));
    variant.delete(StatementId::new(2)).unwrap();
    variant
        .append(StatementId::new(1), StatementId::new(3))
        .unwrap();

    let message = codec::encode_history(variant.history());
    let replayed = codec::decode_history(&message);
    assert_eq!(replayed, variant.history());

    let rebuilt = PatchProgram::with_history(Arc::clone(&ctx), replayed).unwrap();
    assert_eq!(rebuilt.printed().unwrap(), variant.printed().unwrap());
}

#[test]
fn a_repair_run_wires_manifest_paths_and_localization_together() {
    let dir = std::env::temp_dir().join(format!("mend-units-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let source = dir.join("max.c");
    std::fs::write(&source, BROKEN_MAX).unwrap();
    let fault_path = dir.join("fault.path");
    // Only the clobbering write is suspicious.
    std::fs::write(&fault_path, "2,1.0\n").unwrap();

    let run = RepairRun::new(
        RepairManifest::for_single_file(&source),
        RepairConfig::default(),
    );
    let store = run.load_store().unwrap();
    let localization = Localization::from_path_files(&store, &fault_path, None).unwrap();
    assert_eq!(localization.fault.len(), 1);

    let ctx = run.build_context(store, localization);
    let original = run.original(&ctx);
    let mut engine = BruteForceEngine::new(SourceJudge, BruteForceSettings::default());
    let repair = engine.run(&original).unwrap().expect("repairable");
    let printed = repair.variant.printed().unwrap();
    let source_name = source.to_string_lossy().into_owned();
    assert!(!printed[&source_name].contains(CLOBBER));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn distributed_demes_converge_on_a_repair() {
    let ctx = context();
    let original = PatchProgram::new(Arc::clone(&ctx));
    let ga = GaParams {
        pop_size: 8,
        mut_rate: 1.0,
        ..GaParams::default()
    };
    let config = DistributedConfig {
        num_comps: 2,
        variants_exchanged: 2,
        gen_per_exchange: 2,
        diversity_selection: true,
        split_search: false,
        total_generations: 24,
    };
    let coordinator =
        DistributedCoordinator::new(original, ga, config, vec![SourceJudge, SourceJudge], 17)
            .unwrap();
    let outcome = coordinator.run().await.unwrap();
    let solution = outcome.solution.expect("the demes should converge");
    assert!(!solution.variant.printed().unwrap()["max.c"].contains(CLOBBER));
}
