//! The `mend` command line: load a project, build a localization, run one
//! of the search engines, and write the repair back out.

use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;

use repair_control::{
    environment::{init_logger, LogFormat, LogLevel, OutputLocation},
    DistributedConfig, DistributedCoordinator,
};
use repair_structure::{
    coverage::{self, CoverageOptions},
    RepairConfig, RepairManifest, RepairRun, TestSuiteEvaluator,
};
use search_control::{
    BruteForceEngine, BruteForceSettings, CachingEvaluator, FitnessRecord, GeneticEngine,
};
use variant::{codec, Localization, PatchProgram, Representation};

#[derive(Debug, Parser)]
#[clap(name = "mend", version, about = "Search-based program repair")]
struct Args {
    /// The buggy program (.c) or a project manifest (.json).
    manifest: PathBuf,

    /// Engine configuration file (JSON, comments allowed).
    #[clap(long)]
    config: Option<PathBuf>,

    /// Seed for every random draw; overrides the config.
    #[clap(long)]
    seed: Option<u64>,

    /// Precomputed fault path file, one `id` or `id,weight` per line.
    /// Without it the fault path is measured from instrumented test runs.
    #[clap(long)]
    fault_path: Option<PathBuf>,

    /// Precomputed fix path file; defaults to every statement.
    #[clap(long, requires = "fault_path")]
    fix_path: Option<PathBuf>,

    /// Folder the repaired sources are written into.
    #[clap(long, default_value = "./repair", env = "MEND_OUTPUT")]
    output_folder: PathBuf,

    /// Logging output format to be emitted.
    #[clap(long, default_value = "pretty", arg_enum, env = "MEND_LOG_FORMAT")]
    log_format: LogFormat,

    /// Logging verbosity. If not set `RUST_LOG` is used.
    #[clap(long, arg_enum)]
    log_level: Option<LogLevel>,

    /// Log output location: `stdout`, `stderr` or a file name.
    #[clap(long, default_value = "stderr")]
    output_location: OutputLocation,

    /// Logging output folder.
    #[clap(long, default_value = "./log")]
    log_folder: PathBuf,

    #[clap(subcommand)]
    mode: Mode,
}

#[derive(Debug, clap::Subcommand)]
enum Mode {
    /// Try every distance-one edit, best weight first.
    Brute,
    /// Run the genetic search in a single deme.
    Ga,
    /// Run demes in parallel with periodic variant exchange.
    Distributed {
        /// Number of demes; defaults to the logical CPU count.
        #[clap(long, default_value_t = num_cpus::get())]
        num_comps: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let _log_guard = match init_logger(
        args.log_format,
        &args.output_location,
        &args.log_folder,
        args.log_level,
        "mend",
    ) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Could not initialize logging: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(found_repair) => {
            if found_repair {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(message) => {
            tracing::error!("{message}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool, String> {
    let mut config = match &args.config {
        Some(path) => RepairConfig::from_file(path).map_err(|err| err.to_string())?,
        None => RepairConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let manifest = RepairManifest::from_file(&args.manifest)
        .map_err(|report| format!("{report:?}"))?;
    let repair_run = RepairRun::new(manifest, config);
    tracing::info!("Repair run {}", repair_run.id);

    let store = repair_run.load_store().map_err(|err| err.to_string())?;
    tracing::info!(
        "Loaded {} statements from {} file(s)",
        store.max_atom(),
        repair_run.manifest.program.len()
    );

    let localization = match &args.fault_path {
        Some(fault_path) => Localization::from_path_files(
            &store,
            fault_path,
            args.fix_path.as_deref(),
        )
        .map_err(|err| err.to_string())?,
        None => {
            // Measuring coverage needs a printable original, so a
            // throwaway context with the degenerate localization is built
            // around a copy of the store first.
            let probe_ctx = repair_run
                .build_context(store.clone(), Localization::uniform(&store));
            let probe = repair_run.original(&probe_ctx);
            let options = CoverageOptions {
                instrument: repair_run.config.instrument_options(),
                positive_path_factor: repair_run.config.positive_path_factor,
            };
            coverage::collect_localization(&probe, &repair_run.manifest, &options)
                .map_err(|err| err.to_string())?
        }
    };
    if localization.is_empty() {
        tracing::warn!("The fault localization is empty; the engines have nothing to mutate");
    }

    let ctx = repair_run.build_context(store, localization);
    let original = repair_run.original(&ctx);
    let seed = repair_run.config.seed;
    let evaluator = || {
        CachingEvaluator::new(TestSuiteEvaluator::new(repair_run.manifest.clone()))
    };

    let solution: Option<FitnessRecord<PatchProgram>> = match args.mode {
        Mode::Brute => {
            let settings = BruteForceSettings {
                use_subatoms: repair_run.config.use_subatoms,
            };
            let mut engine = BruteForceEngine::new(evaluator(), settings);
            engine.run(&original).map_err(|err| err.to_string())?
        }
        Mode::Ga => {
            let mut engine = GeneticEngine::new(
                original.clone(),
                repair_run.config.ga_params(),
                evaluator(),
                seed,
            );
            let outcome = engine.run(Vec::new()).map_err(|err| err.to_string())?;
            outcome.solution
        }
        Mode::Distributed { num_comps } => {
            let num_comps = num_comps.max(1);
            let distributed = DistributedConfig {
                num_comps,
                variants_exchanged: repair_run.config.variants_exchanged,
                gen_per_exchange: repair_run.config.gen_per_exchange,
                diversity_selection: repair_run.config.diversity_selection,
                split_search: repair_run.config.split_search,
                total_generations: repair_run.config.generations,
            };
            let evaluators = (0..num_comps).map(|_| evaluator()).collect();
            let coordinator = DistributedCoordinator::new(
                original.clone(),
                repair_run.config.ga_params(),
                distributed,
                evaluators,
                seed,
            )
            .map_err(|err| err.to_string())?;
            let outcome = coordinator.run().await.map_err(|err| err.to_string())?;
            outcome.solution
        }
    };

    match solution {
        Some(record) => {
            tracing::info!(
                "Repair found with fitness {:.3}: {}",
                record.fitness,
                codec::encode_history(record.variant.history())
            );
            write_repair(&args.output_folder, &record.variant)?;
            Ok(true)
        }
        None => {
            tracing::info!("No repair found");
            Ok(false)
        }
    }
}

fn write_repair(folder: &PathBuf, variant: &PatchProgram) -> Result<(), String> {
    fs::create_dir_all(folder).map_err(|err| err.to_string())?;
    let printed = variant.printed().map_err(|err| err.to_string())?;
    for (name, source) in printed {
        let file_name = std::path::Path::new(&name)
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "repaired.c".into());
        let path = folder.join(file_name);
        fs::write(&path, source).map_err(|err| err.to_string())?;
        tracing::info!("Wrote {}", path.display());
    }
    Ok(())
}
