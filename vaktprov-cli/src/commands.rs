use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use vaktprov_config::HarnessConfig;
use vaktprov_core::PredicateRegistry;
use vaktprov_engine::{
    compile_scenario_file, inspect_scenario_file, run_scenario_file, ScenarioRunner,
};
use vaktprov_telemetry::{EventLogger, MetricsRecorder};

use crate::processors;

#[derive(Parser)]
#[command(name = "vaktprov", version, about)]
pub struct Cli {
    /// Configuration file; defaults to `config/vaktprov.yaml` plus `VAKTPROV_*` overrides
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a reference processor against one or more scenario files
    Run(RunArgs),
    /// Write the checksummed compiled form of a scenario file
    Compile(CompileArgs),
    /// Describe a scenario file without running anything
    Inspect(InspectArgs),
    /// List the bundled reference processors
    Processors,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Scenario files, plain or compiled
    #[arg(short, long = "scenario", required = true, num_args = 1..)]
    pub scenarios: Vec<PathBuf>,
    #[arg(short, long)]
    pub processor: String,
    /// Print Prometheus metrics after the runs
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    pub input: PathBuf,
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    pub input: PathBuf,
}

/// Executes one command. `Ok(false)` means it ran but something failed.
pub async fn run_command(cli: Cli) -> anyhow::Result<bool> {
    let config = match &cli.config {
        Some(path) => HarnessConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => HarnessConfig::load().context("loading configuration")?,
    };
    EventLogger::init(&config.telemetry.log_level);

    match cli.command {
        Commands::Run(args) => run(config, args).await,
        Commands::Compile(args) => {
            let written = compile_scenario_file(
                &args.input,
                args.output.as_deref(),
                &processors::predicates(),
            )?;
            println!("{}", written.display());
            Ok(true)
        }
        Commands::Inspect(args) => {
            print!("{}", inspect_scenario_file(&args.input)?);
            Ok(true)
        }
        Commands::Processors => {
            for processor in processors::all() {
                println!("{:<16}{}", processor.name(), processors::describe(processor.name()));
            }
            Ok(true)
        }
    }
}

async fn run(config: HarnessConfig, args: RunArgs) -> anyhow::Result<bool> {
    let Some(processor) = processors::by_name(&args.processor) else {
        bail!(
            "unknown processor `{}` (see `vaktprov processors`)",
            args.processor
        );
    };

    let want_metrics = args.metrics || config.telemetry.metrics;
    let report_config = config.report.clone();
    let mut runner = ScenarioRunner::new(config);
    let metrics = if want_metrics {
        let recorder = Arc::new(MetricsRecorder::new()?);
        runner = runner.with_metrics(recorder.clone());
        Some(recorder)
    } else {
        None
    };

    let registry: PredicateRegistry = processors::predicates();
    let mut all_passed = true;
    for path in &args.scenarios {
        let report = run_scenario_file(&runner, path, &registry, processor.clone())
            .await
            .with_context(|| format!("running {}", path.display()))?;
        print!("{}", report.render(&report_config));
        if !report.all_passed {
            warn!(scenario = %path.display(), "run failed");
            all_passed = false;
        }
    }

    for written in runner.bug_reports() {
        info!(path = %written.display(), "bug report written");
    }
    if let Some(metrics) = metrics {
        println!("\n{}", metrics.gather_metrics()?);
    }
    Ok(all_passed)
}
