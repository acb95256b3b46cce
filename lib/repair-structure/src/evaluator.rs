//! The bundled fitness evaluator: compile the variant in a sandbox, run
//! the suites, score.

use std::{fs, path::PathBuf, process::Command};

use uuid::Uuid;

use search_control::{FitnessEvaluator, SENTINEL_FITNESS};
use variant::Representation;

use crate::manifest::RepairManifest;

/// How the two suites contribute to partial fitness. A variant passing
/// everything always scores exactly the solution threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TestWeights {
    /// Share of the score carried by the positive suite; the negative
    /// suite carries the rest.
    pub positive_share: f64,
}

impl Default for TestWeights {
    fn default() -> Self {
        Self {
            positive_share: 0.5,
        }
    }
}

/// Compiles each variant into a uniquely named sandbox directory, runs
/// both suites against the binary, and scores the outcome on a scale
/// whose maximum is the positive-test count.
#[derive(Debug, Clone)]
pub struct TestSuiteEvaluator {
    manifest: RepairManifest,
    sandbox_root: PathBuf,
    weights: TestWeights,
    evaluations: u64,
}

impl TestSuiteEvaluator {
    pub fn new(manifest: RepairManifest) -> Self {
        Self {
            manifest,
            sandbox_root: std::env::temp_dir().join("mend-sandbox"),
            weights: TestWeights::default(),
            evaluations: 0,
        }
    }

    pub fn with_sandbox_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.sandbox_root = root.into();
        self
    }

    pub fn with_weights(mut self, weights: TestWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    fn score(&self, passed_pos: usize, passed_neg: usize) -> f64 {
        let pos_total = self.manifest.positive_tests.len();
        let neg_total = self.manifest.negative_tests.len();
        let threshold = pos_total as f64;
        if passed_pos == pos_total && passed_neg == neg_total {
            return threshold;
        }
        let pos_fraction = if pos_total == 0 {
            1.0
        } else {
            passed_pos as f64 / pos_total as f64
        };
        let neg_fraction = if neg_total == 0 {
            1.0
        } else {
            passed_neg as f64 / neg_total as f64
        };
        let positive_share = self.weights.positive_share.clamp(0.0, 1.0);
        threshold * (positive_share * pos_fraction + (1.0 - positive_share) * neg_fraction)
    }

    fn evaluate_variant<R: Representation>(
        &mut self,
        variant: &mut R,
    ) -> search_control::Result<f64> {
        self.evaluations += 1;
        let printed = variant
            .printed()
            .map_err(|err| search_control::Error::Evaluator(err.to_string()))?;

        let sandbox = self.sandbox_root.join(format!("mend-{}", Uuid::new_v4()));
        fs::create_dir_all(&sandbox)
            .map_err(|err| search_control::Error::Evaluator(err.to_string()))?;

        let result = self.compile_and_test(&sandbox, printed);
        fs::remove_dir_all(&sandbox).ok();
        result
    }

    fn compile_and_test(
        &self,
        sandbox: &std::path::Path,
        printed: std::collections::BTreeMap<String, String>,
    ) -> search_control::Result<f64> {
        let mut sources = Vec::new();
        for (name, contents) in &printed {
            let file_name = std::path::Path::new(name)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "variant.c".to_string());
            let path = sandbox.join(file_name);
            fs::write(&path, contents)
                .map_err(|err| search_control::Error::Evaluator(err.to_string()))?;
            sources.push(path.to_string_lossy().into_owned());
        }
        let out = sandbox.join("variant.bin").to_string_lossy().into_owned();

        let compile = self
            .manifest
            .compile_command
            .replace("{src}", &sources.join(" "))
            .replace("{out}", &out);
        if !run_shell(&compile) {
            tracing::debug!("Variant failed to compile, sentinel fitness");
            return Ok(SENTINEL_FITNESS);
        }

        let passed_pos = self.run_suite(&self.manifest.positive_tests, &out);
        let passed_neg = self.run_suite(&self.manifest.negative_tests, &out);
        let fitness = self.score(passed_pos, passed_neg);
        tracing::debug!(
            "Variant passed {passed_pos}/{} positive and {passed_neg}/{} negative tests: {fitness:.3}",
            self.manifest.positive_tests.len(),
            self.manifest.negative_tests.len()
        );
        Ok(fitness)
    }

    fn run_suite(&self, tests: &[String], out: &str) -> usize {
        tests
            .iter()
            .filter(|test| run_shell(&test.replace("{out}", out)))
            .count()
    }
}

/// Run a command line through the shell; success is exit status zero.
pub(crate) fn run_shell(command: &str) -> bool {
    match Command::new("sh").arg("-c").arg(command).status() {
        Ok(status) => status.success(),
        Err(err) => {
            tracing::warn!("Could not spawn `{command}`: {err}");
            false
        }
    }
}

impl<R: Representation> FitnessEvaluator<R> for TestSuiteEvaluator {
    fn evaluate(&mut self, variant: &mut R) -> search_control::Result<f64> {
        self.evaluate_variant(variant)
    }

    fn solution_threshold(&self) -> f64 {
        self.manifest.positive_tests.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use program::store::AtomStore;
    use variant::{CoreContext, Localization, PatchProgram};

    use super::*;

    fn manifest(pos: &[&str], neg: &[&str]) -> RepairManifest {
        RepairManifest {
            program: vec!["t.c".into()],
            compile_command: "true".to_string(),
            positive_tests: pos.iter().map(|t| t.to_string()).collect(),
            negative_tests: neg.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn variant() -> PatchProgram {
        let store = AtomStore::from_sources(&[("t.c", "int f(int a) { return a; }")]).unwrap();
        let localization = Localization::uniform(&store);
        PatchProgram::new(Arc::new(CoreContext::new(store, localization)))
    }

    #[test]
    fn a_full_pass_scores_exactly_the_positive_test_count() {
        let mut evaluator = TestSuiteEvaluator::new(manifest(&["true", "true"], &["true"]));
        let fitness = evaluator.evaluate_variant(&mut variant()).unwrap();
        assert_eq!(fitness, 2.0);
        assert_eq!(
            <TestSuiteEvaluator as FitnessEvaluator<PatchProgram>>::solution_threshold(&evaluator),
            2.0
        );
    }

    #[test]
    fn failing_negative_tests_keep_the_score_below_threshold() {
        let mut evaluator = TestSuiteEvaluator::new(manifest(&["true", "true"], &["false"]));
        let fitness = evaluator.evaluate_variant(&mut variant()).unwrap();
        assert!(fitness < 2.0);
        assert!(fitness > 0.0);
    }

    #[test]
    fn compile_failures_earn_the_sentinel() {
        let mut evaluator = TestSuiteEvaluator::new(RepairManifest {
            compile_command: "false".to_string(),
            ..manifest(&["true"], &[])
        });
        let fitness = evaluator.evaluate_variant(&mut variant()).unwrap();
        assert_eq!(fitness, SENTINEL_FITNESS);
    }
}
