use std::panic::{self, AssertUnwindSafe};

use ::highs::{HighsModelStatus, Model, RowProblem as Problem, Sense};

use crate::AppError;
use crate::lp_solver::output_suppression::QuietSolve;
use crate::lp_solver::*;

/// Check raw options against a scratch HiGHS instance
///
/// Unknown names and values of the wrong type are reported as
/// [`AppError::InvalidConfig`] without building the real model.
pub fn validate_options(parameters: &[(String, SolverParameter)]) -> Result<()> {
    let mut scratch = Problem::default().optimise(Sense::Minimise);
    apply_option(&mut scratch, "output_flag", &SolverParameter::Bool(false))?;
    for (key, value) in parameters {
        apply_option(&mut scratch, key, value)?;
    }
    Ok(())
}

// The bindings panic when HiGHS refuses an option
fn apply_option(model: &mut Model, key: &str, value: &SolverParameter) -> Result<()> {
    let rejected = |reason: &str| AppError::InvalidConfig(format!("HiGHS option `{key}` = {value}: {reason}"));
    let accepted = match value {
        SolverParameter::Bool(flag) => guarded(|| model.set_option(key, *flag)),
        SolverParameter::Int(int) => {
            let int = i32::try_from(*int).map_err(|_| rejected("out of range"))?;
            guarded(|| model.set_option(key, int))
        }
        SolverParameter::Float(float) => guarded(|| model.set_option(key, *float)),
        SolverParameter::Text(text) => guarded(|| model.set_option(key, text.as_str())),
    };
    if !accepted {
        return Err(rejected("unknown option or wrong value type").into());
    }
    Ok(())
}

fn guarded(apply: impl FnOnce()) -> bool {
    panic::catch_unwind(AssertUnwindSafe(apply)).is_ok()
}

/// Solve an LP model using HiGHS
pub fn solve_highs<Brand>(builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
    validate_options(&builder.parameters)?;

    let mut costs = vec![0.0; builder.variables.len()];
    if let Some(objective) = &builder.objective {
        for term in &objective.expression.terms {
            costs[term.variable.id] += term.coefficient;
        }
    }

    let mut problem = Problem::default();
    let columns: Vec<_> = builder
        .variables
        .iter()
        .zip(&costs)
        .map(|(info, &cost)| match info.var_type {
            VariableType::Continuous => {
                problem.add_column(cost, info.lower_bound..=info.upper_bound)
            }
            VariableType::Integer => {
                problem.add_integer_column(cost, info.lower_bound..=info.upper_bound)
            }
            VariableType::Binary => problem.add_integer_column(cost, 0.0..=1.0),
        })
        .collect();

    let mut factors = Vec::new();
    for constraint in &builder.constraints {
        factors.clear();
        factors.extend(
            constraint
                .expression
                .merged_terms()
                .into_iter()
                .map(|(column, coefficient)| (columns[column], coefficient)),
        );

        // HiGHS rows have no constant, move it to the bound
        let rhs = constraint.rhs - constraint.expression.constant;
        match constraint.sense {
            ConstraintSense::LessEqual => {
                problem.add_row(..=rhs, &factors);
            }
            ConstraintSense::Equal => {
                problem.add_row(rhs..=rhs, &factors);
            }
            ConstraintSense::GreaterEqual => {
                problem.add_row(rhs.., &factors);
            }
        }
    }

    let sense = match builder.objective.as_ref().map(|objective| objective.sense) {
        Some(OptimizationSense::Maximize) => Sense::Maximise,
        _ => Sense::Minimise,
    };
    let mut model = problem.optimise(sense);

    if !builder.verbose {
        apply_option(&mut model, "output_flag", &SolverParameter::Bool(false))?;
    }
    for (key, value) in &builder.parameters {
        apply_option(&mut model, key, value)?;
    }

    let solved = {
        let _quiet = QuietSolve::new(builder.verbose);
        model
            .try_solve()
            .map_err(|status| anyhow::anyhow!("HiGHS rejected the model: {status:?}"))?
    };

    let status = match solved.status() {
        HighsModelStatus::Optimal => OptimizationStatus::Optimal,
        HighsModelStatus::Infeasible => OptimizationStatus::Infeasible,
        HighsModelStatus::Unbounded => OptimizationStatus::Unbounded,
        HighsModelStatus::UnboundedOrInfeasible => OptimizationStatus::InfeasibleOrUnbounded,
        HighsModelStatus::ReachedTimeLimit => OptimizationStatus::Other("time limit reached"),
        HighsModelStatus::ReachedIterationLimit => {
            OptimizationStatus::Other("iteration limit reached")
        }
        _ => OptimizationStatus::Other("unknown HiGHS status"),
    };

    let (variable_values, objective_value) = if status == OptimizationStatus::Optimal {
        let constant = builder
            .objective
            .as_ref()
            .map_or(0.0, |objective| objective.expression.constant);
        (
            solved.get_solution().columns().to_vec(),
            solved.objective_value() + constant,
        )
    } else {
        (vec![0.0; builder.variables.len()], 0.0)
    };

    Ok(LPSolution::new(status, objective_value, variable_values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constraint, lp_model_builder};

    fn invalid_config_message(err: &anyhow::Error) -> Option<&str> {
        match err.downcast_ref::<AppError>() {
            Some(AppError::InvalidConfig(message)) => Some(message),
            _ => None,
        }
    }

    #[test]
    fn test_known_options_are_accepted() {
        let parameters = vec![
            ("time_limit".to_string(), SolverParameter::Float(30.0)),
            ("threads".to_string(), SolverParameter::Int(1)),
            ("presolve".to_string(), SolverParameter::Text("off".to_string())),
            ("log_to_console".to_string(), SolverParameter::Bool(false)),
        ];
        assert!(validate_options(&parameters).is_ok());
    }

    #[test]
    fn test_unknown_option_is_invalid_config() {
        let parameters = vec![("TimeLimit".to_string(), SolverParameter::Float(30.0))];
        let err = validate_options(&parameters).unwrap_err();
        let message = invalid_config_message(&err).unwrap();
        assert!(message.contains("TimeLimit"));
    }

    #[test]
    fn test_mistyped_option_is_invalid_config() {
        let parameters = vec![("presolve".to_string(), SolverParameter::Float(1.5))];
        let err = validate_options(&parameters).unwrap_err();
        assert!(invalid_config_message(&err).unwrap().contains("presolve"));
    }

    #[test]
    fn test_solve_rejects_unknown_option_without_panicking() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        builder.add_constraint(constraint!((x) >= 1.0));
        builder.set_objective(x.into(), OptimizationSense::Minimize);
        builder.set_raw_parameter("no_such_option", SolverParameter::Int(3));

        let err = solve_highs(&builder).unwrap_err();
        assert!(invalid_config_message(&err).unwrap().contains("no_such_option"));
    }
}
