use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;

use crate::AppError;
use crate::lp_solver::{LPSolution, Solver};
use crate::model::constraints::hydro::genflow_coefficient;
use crate::model::{Model, Planning};
use crate::sets::tuples::StationHour;

/// Limits of the head iteration, taken from the general parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadIterationSettings {
    pub max_iterations: u32,
    pub error_threshold: f64,
    /// Solve once with the design head
    pub fixed_head: bool,
}

impl HeadIterationSettings {
    /// Iteration budget actually used; a fixed head allows a single solve
    pub fn budget(&self) -> u32 {
        if self.fixed_head && self.max_iterations > 1 {
            tracing::warn!(
                iterations = self.max_iterations,
                "fixed_head is set, solving once instead of iterating"
            );
            return 1;
        }
        self.max_iterations.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Convergence {
    Converged,
    NotConverged,
}

/// Head in metres for every station and period
pub type HeadField = IndexMap<StationHour, f64>;

/// Outcome of [`run`]
#[derive(Debug, Clone)]
pub struct HeadIterationReport {
    pub outcome: Convergence,
    pub iterations: u32,
    /// Relative head change after each solve
    pub errors: Vec<f64>,
    /// Head used by the final solve
    pub head: HeadField,
    pub solution: LPSolution<Planning>,
}

enum State {
    Solve,
    Evaluate(LPSolution<Planning>),
    Done(Convergence, LPSolution<Planning>),
}

/// Solve `model`, refining the head of every station until it settles
///
/// Each pass writes the current head into the `output_calc` rows, solves, and
/// re-derives the head from the forebay and tailrace levels of the solution.
/// Updates are damped by the iteration count. A non-optimal solve aborts; an
/// exhausted budget is reported as [`Convergence::NotConverged`].
pub fn run<S: Solver>(
    model: &mut Model,
    solver: &S,
    settings: HeadIterationSettings,
) -> Result<HeadIterationReport> {
    let budget = settings.budget();
    let mut head = design_head(model)?;
    let mut errors = Vec::new();
    let mut iteration = 1;
    let mut state = State::Solve;

    let (outcome, solution) = loop {
        state = match state {
            State::Solve => {
                apply_head(model, &head)?;
                let solution = model.builder.solve_with(solver)?;
                if !solution.is_optimal() {
                    return Err(AppError::NonOptimal(solution.status).into());
                }
                State::Evaluate(solution)
            }
            State::Evaluate(solution) if budget <= 1 => {
                errors.push(0.0);
                State::Done(Convergence::Converged, solution)
            }
            State::Evaluate(solution) => {
                let estimate = estimate_head(model, &solution)?;
                let error = relative_error(&head, &estimate);
                errors.push(error);
                tracing::info!(iteration, error, "Head iteration");

                if error < settings.error_threshold {
                    State::Done(Convergence::Converged, solution)
                } else if iteration < budget {
                    let step = 1.0 / f64::from(iteration);
                    for (key, value) in head.iter_mut() {
                        *value += step * (estimate[key] - *value);
                    }
                    iteration += 1;
                    State::Solve
                } else {
                    tracing::warn!(
                        iterations = iteration,
                        error,
                        threshold = settings.error_threshold,
                        "Head iteration did not converge, keeping the last solution"
                    );
                    State::Done(Convergence::NotConverged, solution)
                }
            }
            State::Done(outcome, solution) => break (outcome, solution),
        };
    };

    Ok(HeadIterationReport {
        outcome,
        iterations: iteration,
        errors,
        head,
        solution,
    })
}

/// Every station's characteristic head, replicated over its periods
fn design_head(model: &Model) -> Result<HeadField> {
    let hydro = model
        .params
        .hydro
        .as_ref()
        .ok_or(AppError::MissingTable("reservoir_characteristics"))?;
    Ok(model
        .constraints
        .hydro
        .station
        .output_calc
        .iter()
        .map(|(key, _)| (key, hydro.station(key.0).head))
        .collect())
}

/// Write the genflow coefficient of every `output_calc` row in one batch
fn apply_head(model: &mut Model, head: &HeadField) -> Result<()> {
    let hydro = model
        .params
        .hydro
        .as_ref()
        .ok_or(AppError::MissingTable("reservoir_characteristics"))?;
    let vars = model.vars.hydro()?;

    let mut updates = Vec::with_capacity(head.len());
    for (key, row) in model.constraints.hydro.station.output_calc.iter() {
        let genflow = vars.genflow.get(&key)?;
        let level = head
            .get(&key)
            .copied()
            .ok_or_else(|| AppError::MissingVariable(format!("head{key:?}")))?;
        updates.push((row, genflow, genflow_coefficient(hydro.station(key.0), level)));
    }
    model.builder.update_coefficients(&updates)
}

/// Head implied by the reservoir levels and releases of `solution`
///
/// The forebay level is averaged over the start and end of the period.
fn estimate_head(model: &Model, solution: &LPSolution<Planning>) -> Result<HeadField> {
    let hydro = model
        .params
        .hydro
        .as_ref()
        .ok_or(AppError::MissingTable("reservoir_characteristics"))?;
    let vars = model.vars.hydro()?;

    let mut estimate = HeadField::with_capacity(model.constraints.hydro.station.output_calc.len());
    for (key, _) in model.constraints.hydro.station.output_calc.iter() {
        let (s, h, m, y) = key;
        let forebay = &hydro.forebay[s.index()];
        let tailrace = &hydro.tailrace[s.index()];

        let start = solution.value(vars.storage_reservoir.get(&(s, h.previous(), m, y))?);
        let end = solution.value(vars.storage_reservoir.get(&key)?);
        let fore = (forebay.level(start) + forebay.level(end)) / 2.0;
        let tail = tailrace.level(solution.value(vars.outflow.get(&key)?));

        estimate.insert(key, (fore - tail).max(0.0));
    }
    Ok(estimate)
}

/// Mean of `|new - old| / new` over all entries, measured against 1 where the
/// new head is not positive
fn relative_error(old: &HeadField, new: &HeadField) -> f64 {
    if new.is_empty() {
        return 0.0;
    }
    let total: f64 = new
        .iter()
        .map(|(key, &value)| {
            let previous = old.get(key).copied().unwrap_or(0.0);
            let scale = if value > 0.0 { value } else { 1.0 };
            (value - previous).abs() / scale
        })
        .sum();
    total / new.len() as f64
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use float_cmp::assert_approx_eq;

    use super::*;
    use crate::lp_solver::{ConstraintId, LPModelBuilder, OptimizationStatus};
    use crate::test_helpers::{hydro_settings, hydro_system};

    /// Plays the part of the solver: every station delivers a fixed output,
    /// so its flow is whatever the current head coefficient requires.
    struct FixedOutputSolver {
        status: OptimizationStatus,
        output: f64,
        storage_level: f64,
        /// `(output_calc row, genflow column, outflow column)`
        plants: Vec<(ConstraintId, usize, usize)>,
        storage: Vec<usize>,
    }

    impl FixedOutputSolver {
        fn new(model: &Model) -> Self {
            let vars = model.vars.hydro().unwrap();
            let plants = model
                .constraints
                .hydro
                .station
                .output_calc
                .iter()
                .map(|(key, row)| {
                    (
                        row,
                        vars.genflow.get(&key).unwrap().index(),
                        vars.outflow.get(&key).unwrap().index(),
                    )
                })
                .collect();
            Self {
                status: OptimizationStatus::Optimal,
                output: 10.0,
                storage_level: 1e6,
                plants,
                storage: vars.storage_reservoir.iter().map(|(_, var)| var.index()).collect(),
            }
        }
    }

    impl Solver for FixedOutputSolver {
        fn solve<Brand>(&self, builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
            let mut values = vec![0.0; builder.num_variables()];
            for &column in &self.storage {
                values[column] = self.storage_level;
            }
            for &(row, genflow, outflow) in &self.plants {
                let coefficient = builder
                    .constraint(row)
                    .unwrap()
                    .expression()
                    .terms
                    .iter()
                    .find(|term| term.variable.index() == genflow)
                    .map(|term| term.coefficient)
                    .unwrap();
                let flow = self.output / -coefficient;
                values[genflow] = flow;
                values[outflow] = flow;
            }
            Ok(LPSolution::new(self.status, 0.0, values))
        }
    }

    fn settings(max_iterations: u32) -> HeadIterationSettings {
        HeadIterationSettings {
            max_iterations,
            error_threshold: 1e-4,
            fixed_head: false,
        }
    }

    #[test]
    fn test_single_iteration_reports_zero_error() {
        let mut model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let solver = FixedOutputSolver::new(&model);
        let report = run(&mut model, &solver, settings(1)).unwrap();

        assert_eq!(report.outcome, Convergence::Converged);
        assert_eq!(report.iterations, 1);
        assert_eq!(report.errors, vec![0.0]);
        let upper = model.sets.stations.id("upper").unwrap();
        for (key, head) in &report.head {
            if key.0 == upper {
                assert_eq!(*head, 50.0);
            }
        }
    }

    #[test]
    fn test_fixed_head_clamps_budget() {
        let mut model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let solver = FixedOutputSolver::new(&model);
        let fixed = HeadIterationSettings {
            fixed_head: true,
            ..settings(5)
        };
        let report = run(&mut model, &solver, fixed).unwrap();
        assert_eq!(report.iterations, 1);
        assert_eq!(report.errors, vec![0.0]);
    }

    #[test]
    fn test_converges_for_flow_sensitive_tailrace() {
        let mut model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let solver = FixedOutputSolver::new(&model);
        let report = run(&mut model, &solver, settings(10)).unwrap();

        assert_eq!(report.outcome, Convergence::Converged);
        assert_eq!(report.iterations, 2);
        assert!(report.errors[0] >= 1e-4, "errors {:?}", report.errors);
        assert!(report.errors[1] < 1e-4, "errors {:?}", report.errors);

        // the last solve ran with the reported head
        let hydro = model.params.hydro.as_ref().unwrap();
        let vars = model.vars.hydro().unwrap();
        for (key, row) in model.constraints.hydro.station.output_calc.iter() {
            let head = report.head[&key];
            assert!(head > hydro.station(key.0).head);
            let genflow = vars.genflow.get(&key).unwrap();
            assert_approx_eq!(
                f64,
                model.builder.coefficient(row, genflow).unwrap(),
                genflow_coefficient(hydro.station(key.0), head),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_budget_exhaustion_is_not_an_error() {
        let mut model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let solver = FixedOutputSolver::new(&model);
        let strict = HeadIterationSettings {
            error_threshold: 1e-12,
            ..settings(2)
        };
        let report = run(&mut model, &solver, strict).unwrap();

        assert_eq!(report.outcome, Convergence::NotConverged);
        assert_eq!(report.iterations, 2);
        assert_eq!(report.errors.len(), 2);
    }

    #[test]
    fn test_non_optimal_solve_aborts() {
        let mut model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let mut solver = FixedOutputSolver::new(&model);
        solver.status = OptimizationStatus::Infeasible;

        let err = run(&mut model, &solver, settings(3)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::NonOptimal(OptimizationStatus::Infeasible))
        ));
    }

    #[test]
    fn test_relative_error_guards_non_positive_heads() {
        let key = (
            crate::sets::StationId(0),
            crate::sets::Hour(1),
            crate::sets::MonthId(0),
            crate::sets::YearId(0),
        );
        let old: HeadField = [(key, 2.0)].into_iter().collect();
        let new: HeadField = [(key, 0.0)].into_iter().collect();
        assert_eq!(relative_error(&old, &new), 2.0);
    }
}
