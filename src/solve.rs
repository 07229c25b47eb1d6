//! The `run` subcommand: load, build, solve, write

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use crate::AppError;
use crate::config::Config;
use crate::hydro::{self, HeadIterationReport};
use crate::lp_solver::{LPSolution, Solver};
use crate::model::{Model, Planning, create_model};
use crate::output::{self, RunResults};
use crate::params::{InputParameters, ScenarioOverride};

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file with the general and solver parameters
    #[clap(long)]
    pub config: PathBuf,

    /// Input parameter file
    #[clap(long)]
    pub input: PathBuf,

    /// Result bundle to write; scenario suffixes are appended to its stem
    #[clap(long)]
    pub output: PathBuf,

    /// Replace input table KEY with `<input dir>/KEY_VALUE.json`
    #[clap(long = "scenario", value_name = "KEY=VALUE")]
    pub scenarios: Vec<ScenarioOverride>,

    /// Also write human-readable summary tables to this file
    #[clap(long)]
    pub report: Option<PathBuf>,
}

/// Run `f`, logging how long `step` took
pub fn timed<T>(step: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    tracing::info!("{step}...");
    let start = Instant::now();
    let result = f();
    let elapsed = start.elapsed();
    match &result {
        Ok(_) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{step} done"),
        Err(_) => tracing::warn!(elapsed_ms = elapsed.as_millis() as u64, "{step} failed"),
    }
    result
}

/// How a model was solved
#[derive(Debug)]
pub enum Solved {
    Linear(LPSolution<Planning>),
    HeadIterated(HeadIterationReport),
}

impl Solved {
    pub fn solution(&self) -> &LPSolution<Planning> {
        match self {
            Solved::Linear(solution) => solution,
            Solved::HeadIterated(report) => &report.solution,
        }
    }

    pub fn head_report(&self) -> Option<&HeadIterationReport> {
        match self {
            Solved::Linear(_) => None,
            Solved::HeadIterated(report) => Some(report),
        }
    }
}

/// Solve `model`, iterating on the hydropower head when hydrology is enabled
pub fn solve_model<S: Solver>(model: &mut Model, solver: &S, config: &Config) -> Result<Solved> {
    if model.settings.hydrology {
        let report = hydro::head::run(model, solver, config.head_iteration())?;
        return Ok(Solved::HeadIterated(report));
    }

    let solution = model.builder.solve_with(solver)?;
    if !solution.is_optimal() {
        return Err(AppError::NonOptimal(solution.status).into());
    }
    Ok(Solved::Linear(solution))
}

/// `base` with `_key_value` appended to its stem for every override
pub fn output_path(base: &Path, scenarios: &[ScenarioOverride]) -> PathBuf {
    if scenarios.is_empty() {
        return base.to_path_buf();
    }
    let mut name = base
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    for scenario in scenarios {
        name.push_str(&scenario.suffix());
    }
    if let Some(extension) = base.extension() {
        name.push('.');
        name.push_str(&extension.to_string_lossy());
    }
    base.with_file_name(name)
}

pub fn run_main(args: RunArgs) -> Result<()> {
    let config = Config::from_path(&args.config)?;
    let backend = config.solver_parameters.backend()?;
    backend.validate_parameters(&config.solver_parameters.raw_parameters()?)?;

    let input = timed("Loading input parameters", || {
        InputParameters::from_path(&args.input, &args.scenarios)
    })?;

    let mut model = timed("Building model", || create_model(&input, &config))?;
    let solved = timed("Solving model", || solve_model(&mut model, &backend, &config))?;

    if let Some(report) = solved.head_report() {
        tracing::info!(
            outcome = ?report.outcome,
            iterations = report.iterations,
            "Head iteration finished"
        );
    }
    tracing::info!(objective = solved.solution().objective_value, "Optimal solution found");

    let results = RunResults::extract(&model, &solved)?;
    let output = output_path(&args.output, &args.scenarios);
    output::write_json(&results, &output)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;
    tracing::info!(path = %output.display(), "Results written");

    if let Some(report) = &args.report {
        let report = output_path(report, &args.scenarios);
        output::write_report(&results, &report)
            .with_context(|| format!("Failed to write report to {}", report.display()))?;
        tracing::info!(path = %report.display(), "Report written");
    }

    Ok(())
}
