//! Run configuration
//!
//! A configuration file is a JSON document with two sections:
//!
//! ```json
//! {
//!   "general_parameters": {
//!     "hour": 24, "month": 12, "dt": 1, "hours_in_year": 8760,
//!     "price": 0.1, "isinflow": true, "fixed_head": false,
//!     "error_threshold": 0.001, "iteration_number": 5
//!   },
//!   "solver_parameters": { "solver": "highs", "time_limit": 600.0 }
//! }
//! ```
//!
//! Every key of `solver_parameters` other than `solver`, `verbose` and
//! `solver_path` is handed to the backend untouched.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::AppError;
use crate::hydro::head::HeadIterationSettings;
use crate::lp_solver::{SolverBackend, SolverParameter};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general_parameters: GeneralParameters,
    #[serde(default)]
    pub solver_parameters: SolverParameters,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralParameters {
    /// Number of modelled hours per representative day
    pub hour: u32,
    /// Number of modelled months per year
    pub month: u32,
    /// Length of one operational period, in hours
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_hours_in_year")]
    pub hours_in_year: f64,
    /// Price paid for withdrawn water
    #[serde(default)]
    pub price: f64,
    /// Enables the plant-level hydropower model
    #[serde(default)]
    pub isinflow: bool,
    /// Solve once with the initial head instead of iterating
    #[serde(default)]
    pub fixed_head: bool,
    #[serde(default = "default_error_threshold")]
    pub error_threshold: f64,
    #[serde(default = "default_iteration_number")]
    pub iteration_number: u32,
}

fn default_dt() -> f64 {
    1.0
}

fn default_hours_in_year() -> f64 {
    8760.0
}

fn default_error_threshold() -> f64 {
    1e-3
}

fn default_iteration_number() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverParameters {
    #[serde(default = "default_solver")]
    pub solver: String,
    #[serde(default)]
    pub verbose: bool,
    #[serde(flatten)]
    pub raw: IndexMap<String, serde_json::Value>,
}

fn default_solver() -> String {
    "highs".to_string()
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            solver: default_solver(),
            verbose: false,
            raw: IndexMap::new(),
        }
    }
}

impl SolverParameters {
    /// Backend named by `GRIDPLAN_LP_SOLVER` or, failing that, by `solver`
    pub fn backend(&self) -> Result<SolverBackend> {
        SolverBackend::from_env_or(&self.solver)
    }

    /// Raw key/value pairs for the backend, in file order
    pub fn raw_parameters(&self) -> Result<Vec<(String, SolverParameter)>> {
        self.raw
            .iter()
            .filter(|(key, _)| key.as_str() != "solver_path")
            .map(|(key, value)| {
                let parameter = match value {
                    serde_json::Value::Bool(flag) => SolverParameter::Bool(*flag),
                    serde_json::Value::Number(number) => match number.as_i64() {
                        Some(int) => SolverParameter::Int(int),
                        None => SolverParameter::Float(number.as_f64().unwrap_or(f64::NAN)),
                    },
                    serde_json::Value::String(text) => SolverParameter::Text(text.clone()),
                    other => {
                        return Err(AppError::InvalidConfig(format!(
                            "solver parameter `{key}` must be a scalar, found {other}"
                        ))
                        .into());
                    }
                };
                Ok((key.clone(), parameter))
            })
            .collect()
    }
}

/// Scalars the model builders need from the configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
    pub dt: f64,
    /// Share of a full year covered by the modelled months and hours
    pub weight: f64,
    pub price: f64,
    pub hydrology: bool,
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let general = &self.general_parameters;
        let invalid = |message: String| Err(AppError::InvalidConfig(message).into());

        if !(general.dt.is_finite() && general.dt > 0.0) {
            return invalid(format!("dt must be positive, got {}", general.dt));
        }
        if !(general.hours_in_year.is_finite() && general.hours_in_year > 0.0) {
            return invalid(format!(
                "hours_in_year must be positive, got {}",
                general.hours_in_year
            ));
        }
        if general.hour == 0 || general.month == 0 {
            return invalid("hour and month counts must be at least 1".to_string());
        }
        if !(general.error_threshold > 0.0) {
            return invalid(format!(
                "error_threshold must be positive, got {}",
                general.error_threshold
            ));
        }
        Ok(())
    }

    /// Representative-period weight, `month * hour * dt / hours_in_year`
    pub fn weight(&self) -> f64 {
        let general = &self.general_parameters;
        f64::from(general.month) * f64::from(general.hour) * general.dt / general.hours_in_year
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            dt: self.general_parameters.dt,
            weight: self.weight(),
            price: self.general_parameters.price,
            hydrology: self.general_parameters.isinflow,
        }
    }

    pub fn head_iteration(&self) -> HeadIterationSettings {
        HeadIterationSettings {
            max_iterations: self.general_parameters.iteration_number,
            error_threshold: self.general_parameters.error_threshold,
            fixed_head: self.general_parameters.fixed_head,
        }
    }
}
