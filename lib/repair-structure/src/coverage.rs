//! Turning instrumented test runs into a localization.
//!
//! The original program is rendered with trace instrumentation, compiled
//! once, and every test is run with a fresh trace file. The union of
//! statements visited by the positive suite and by the negative suite
//! feed the classic weighted path.

use std::{collections::BTreeSet, fs, path::Path};

use program::{ast::StatementId, instrument::InstrumentOptions};
use uuid::Uuid;
use variant::{
    localization::{self, Localization},
    Representation,
};

use crate::{evaluator::run_shell, manifest::RepairManifest, Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct CoverageOptions {
    pub instrument: InstrumentOptions,
    pub positive_path_factor: f64,
}

impl Default for CoverageOptions {
    fn default() -> Self {
        Self {
            instrument: InstrumentOptions::default(),
            positive_path_factor: localization::DEFAULT_POSITIVE_PATH_FACTOR,
        }
    }
}

/// Instrument and compile the original, run both suites, and build the
/// weighted path from what each suite visited.
pub fn collect_localization<R: Representation>(
    original: &R,
    manifest: &RepairManifest,
    options: &CoverageOptions,
) -> Result<Localization> {
    let sandbox = std::env::temp_dir().join(format!("mend-coverage-{}", Uuid::new_v4()));
    fs::create_dir_all(&sandbox)?;
    let result = collect_in(&sandbox, original, manifest, options);
    fs::remove_dir_all(&sandbox).ok();
    result
}

fn collect_in<R: Representation>(
    sandbox: &Path,
    original: &R,
    manifest: &RepairManifest,
    options: &CoverageOptions,
) -> Result<Localization> {
    let trace_path = sandbox.join("trace.txt");
    let trace_str = trace_path.to_string_lossy().into_owned();

    let rendered = original.instrumented(&trace_str, &options.instrument)?;
    let mut sources = Vec::new();
    for (name, contents) in &rendered {
        let file_name = Path::new(name)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "instrumented.c".to_string());
        let path = sandbox.join(file_name);
        fs::write(&path, contents)?;
        sources.push(path.to_string_lossy().into_owned());
    }
    let out = sandbox.join("instrumented.bin").to_string_lossy().into_owned();

    let compile = manifest
        .compile_command
        .replace("{src}", &sources.join(" "))
        .replace("{out}", &out);
    if !run_shell(&compile) {
        return Err(Error::Unique(
            "The instrumented program failed to compile".to_string(),
        ));
    }

    let pos_visited = run_suite_traced(&manifest.positive_tests, &out, &trace_path);
    let neg_visited = run_suite_traced(&manifest.negative_tests, &out, &trace_path);
    tracing::info!(
        "Coverage: {} statements on the positive paths, {} on the negative paths",
        pos_visited.len(),
        neg_visited.len()
    );
    Ok(Localization::from_coverage(
        &pos_visited,
        &neg_visited,
        options.positive_path_factor,
    ))
}

fn run_suite_traced(tests: &[String], out: &str, trace_path: &Path) -> BTreeSet<StatementId> {
    let mut visited = BTreeSet::new();
    for test in tests {
        fs::remove_file(trace_path).ok();
        run_shell(&test.replace("{out}", out));
        if let Ok(contents) = fs::read_to_string(trace_path) {
            visited.extend(localization::parse_trace(&contents));
        }
    }
    visited
}
