//! Multi-year, multi-zone electricity capacity-expansion planning
//!
//! The library builds a linear program that jointly decides technology and
//! transmission investment and hourly dispatch over a planning horizon, and
//! solves it with one of several LP backends. With hydrology enabled, plant
//! level hydropower is modelled explicitly and the head of every station is
//! refined by repeated re-optimisation.
//!
//! # Workflow
//!
//! 1. **Input** ([`params`], [`config`]): JSON documents with the input tables
//!    and the general and solver parameters, optionally with scenario tables
//!    swapped in.
//! 2. **Model** ([`model`]): index sets ([`sets`]), variables, constraint
//!    families and the cost objective.
//! 3. **Solve** ([`solve`], [`hydro`]): a single solve, or the head iteration
//!    when hydrology is enabled.
//! 4. **Output** ([`output`]): a JSON result bundle and an optional text report.
//!
//! # Usage Example
//!
//! ```no_run
//! # fn main() -> anyhow::Result<()> {
//! use std::path::Path;
//!
//! use gridplan::config::Config;
//! use gridplan::model::create_model;
//! use gridplan::params::InputParameters;
//!
//! let config = Config::from_path(Path::new("config.json"))?;
//! let input = InputParameters::from_path(Path::new("input.json"), &[])?;
//! let model = create_model(&input, &config)?;
//! let solution = model.builder.solve_with(&config.solver_parameters.backend()?)?;
//! println!("total cost: {}", solution.objective_value);
//! # Ok(())
//! # }
//! ```

use clap::Parser;
use thiserror::Error;

pub mod config;
pub mod hydro;
pub mod inspect;
pub mod lp_solver;
pub mod model;
pub mod output;
pub mod params;
pub mod sets;
pub mod solve;

#[cfg(test)]
mod test_helpers;

pub use inspect::{InspectArgs, inspect_main};
pub use solve::{RunArgs, run_main};

/// Errors callers may want to tell apart
///
/// Everything else travels as plain [`anyhow::Error`] context.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unsupported solver backend: {0}")]
    UnsupportedSolver(String),
    #[error("Solver backend not enabled in this build: enable the `{0}` feature")]
    SolverUnavailable(&'static str),
    #[error("Missing entry {key} in table {table}")]
    MissingParameter { table: &'static str, key: String },
    #[error("Missing input table {0}")]
    MissingTable(&'static str),
    #[error("Unknown {kind} `{name}`")]
    UnknownName { kind: &'static str, name: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("No variable {0} in the model")]
    MissingVariable(String),
    #[error("No constraint with index {0} in the model")]
    UnknownConstraint(usize),
    #[error("Solver finished without an optimal solution: {0:?}")]
    NonOptimal(lp_solver::OptimizationStatus),
}

/// Command-line interface of the planning tool
#[derive(Debug, Parser)]
#[clap(
    name = "gridplan",
    about = "Electricity capacity-expansion planning with hydropower head iteration"
)]
pub enum CLIArguments {
    /// Build and solve the model, writing the result bundle.
    Run(RunArgs),
    /// Build the model and summarise its size without solving it.
    Inspect(InspectArgs),
}
