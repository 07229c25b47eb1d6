use ::gurobi::{ConstrSense, Env, LinExpr, Model, ModelSense, Status, Var, VarType, attr, param};

use crate::lp_solver::*;

/// Copy the recognised raw parameters onto the Gurobi environment
///
/// Gurobi parameters are typed, so only names with a known type are passed
/// through; anything else is reported and ignored.
fn apply_parameters(env: &mut Env, parameters: &[(String, SolverParameter)], verbose: bool) -> Result<()> {
    env.set(param::OutputFlag, i32::from(verbose))?;

    for (key, value) in parameters {
        match (key.to_lowercase().as_str(), value) {
            ("timelimit" | "time_limit", SolverParameter::Float(seconds)) => {
                env.set(param::TimeLimit, *seconds)?
            }
            ("timelimit" | "time_limit", SolverParameter::Int(seconds)) => {
                env.set(param::TimeLimit, *seconds as f64)?
            }
            ("mipgap" | "mip_gap", SolverParameter::Float(gap)) => env.set(param::MIPGap, *gap)?,
            ("threads", SolverParameter::Int(threads)) => env.set(param::Threads, *threads as i32)?,
            ("method", SolverParameter::Int(method)) => env.set(param::Method, *method as i32)?,
            _ => tracing::warn!("Ignoring unsupported Gurobi parameter `{key}` = {value}"),
        }
    }
    Ok(())
}

/// Solve an LP model using Gurobi
pub fn solve_gurobi<Brand>(builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
    let mut env = Env::new("")?;
    apply_parameters(&mut env, &builder.parameters, builder.verbose)?;
    let mut model = Model::new("gridplan", &env)?;

    let mut vars: Vec<Var> = Vec::with_capacity(builder.variables.len());
    for (idx, info) in builder.variables.iter().enumerate() {
        let vtype = match info.var_type {
            VariableType::Continuous => VarType::Continuous,
            VariableType::Integer => VarType::Integer,
            VariableType::Binary => VarType::Binary,
        };
        let var = model.add_var(
            &format!("x{idx}"),
            vtype,
            0.0,
            info.lower_bound,
            info.upper_bound,
            &[],
            &[],
        )?;
        vars.push(var);
    }
    model.update()?;

    let linear = |expression: &LinearExpression<Brand>| {
        expression
            .terms
            .iter()
            .fold(LinExpr::new(), |expr, term| {
                expr.add_term(term.coefficient, vars[term.variable.id].clone())
            })
    };

    for (idx, constraint) in builder.constraints.iter().enumerate() {
        let (sense, rhs) = match constraint.sense {
            ConstraintSense::LessEqual => (ConstrSense::Less, constraint.rhs),
            ConstraintSense::Equal => (ConstrSense::Equal, constraint.rhs),
            ConstraintSense::GreaterEqual => (ConstrSense::Greater, constraint.rhs),
        };
        let expr = linear(&constraint.expression).add_constant(constraint.expression.constant);
        model.add_constr(&format!("c{idx}"), expr, sense, rhs)?;
    }

    if let Some(objective) = &builder.objective {
        let expr = linear(&objective.expression).add_constant(objective.expression.constant);
        let sense = match objective.sense {
            OptimizationSense::Minimize => ModelSense::Minimize,
            OptimizationSense::Maximize => ModelSense::Maximize,
        };
        model.update()?;
        model.set_objective(expr, sense)?;
    }

    model.optimize()?;

    let status = match model.status()? {
        Status::Optimal => OptimizationStatus::Optimal,
        Status::SubOptimal => OptimizationStatus::Feasible,
        Status::Infeasible => OptimizationStatus::Infeasible,
        Status::Unbounded => OptimizationStatus::Unbounded,
        Status::InfOrUnbd => OptimizationStatus::InfeasibleOrUnbounded,
        Status::TimeLimit => OptimizationStatus::Other("time limit reached"),
        _ => OptimizationStatus::Other("unknown Gurobi status"),
    };

    if status != OptimizationStatus::Optimal {
        return Ok(LPSolution::new(status, 0.0, vec![0.0; vars.len()]));
    }

    let variable_values = vars
        .iter()
        .map(|var| var.get(&model, attr::X))
        .collect::<std::result::Result<Vec<f64>, _>>()?;
    let objective_value = model.get(attr::ObjVal)?;

    Ok(LPSolution::new(status, objective_value, variable_values))
}
