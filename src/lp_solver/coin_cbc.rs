use crate::lp_solver::output_suppression::QuietSolve;
use crate::lp_solver::*;
use ::coin_cbc::{Col, Model, Sense};

/// Solve an LP model using Coin CBC
pub fn solve_coin_cbc<Brand>(builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
    let mut model = Model::default();

    let columns: Vec<Col> = builder
        .variables
        .iter()
        .map(|info| {
            let col = match info.var_type {
                VariableType::Continuous => model.add_col(),
                VariableType::Integer => model.add_integer(),
                VariableType::Binary => return model.add_binary(),
            };
            model.set_col_lower(col, info.lower_bound);
            model.set_col_upper(col, info.upper_bound);
            col
        })
        .collect();

    for constraint in &builder.constraints {
        let row = model.add_row();
        for (column, coefficient) in constraint.expression.merged_terms() {
            model.set_weight(row, columns[column], coefficient);
        }

        let rhs = constraint.rhs - constraint.expression.constant;
        match constraint.sense {
            ConstraintSense::LessEqual => model.set_row_upper(row, rhs),
            ConstraintSense::Equal => model.set_row_equal(row, rhs),
            ConstraintSense::GreaterEqual => model.set_row_lower(row, rhs),
            // CBC has no strict inequalities, use >= with a small epsilon
        }
    }

    if let Some(objective) = &builder.objective {
        let mut costs = vec![0.0; columns.len()];
        for term in &objective.expression.terms {
            costs[term.variable.id] += term.coefficient;
        }
        for (&col, cost) in columns.iter().zip(costs) {
            model.set_obj_coeff(col, cost);
        }

        model.set_obj_sense(match objective.sense {
            OptimizationSense::Minimize => Sense::Minimize,
            OptimizationSense::Maximize => Sense::Maximize,
        });
    }

    if !builder.verbose {
        model.set_parameter("log", "0");
    }
    for (key, value) in &builder.parameters {
        model.set_parameter(key, &value.to_string());
    }

    let solution = {
        let _quiet = QuietSolve::new(builder.verbose);
        model.solve()
    };

    let status = if solution.raw().is_proven_optimal() {
        OptimizationStatus::Optimal
    } else if solution.raw().is_proven_infeasible() {
        OptimizationStatus::Infeasible
    } else if solution.raw().is_continuous_unbounded() {
        OptimizationStatus::Unbounded
    } else if solution.raw().is_seconds_limit_reached() {
        OptimizationStatus::Other("time limit reached")
    } else {
        OptimizationStatus::Other("unknown CBC status")
    };

    let variable_values: Vec<f64> = columns.iter().map(|&col| solution.col(col)).collect();
    let objective_value = builder.objective_at(&variable_values);

    Ok(LPSolution::new(status, objective_value, variable_values))
}
