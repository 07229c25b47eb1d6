//! Linear Programming (LP) solver abstraction layer
//!
//! The planning model is written once against [`LPModelBuilder`] and solved by
//! whichever backend was compiled in: HiGHS (default), COIN-OR CBC or Gurobi.
//!
//! # Branded Types
//!
//! `VariableId`, `LinearExpression`, `Constraint` and `LPModelBuilder` carry a
//! zero-sized `Brand` parameter, so a variable allocated by one builder cannot
//! be used in a constraint of another:
//!
//! ```rust
//! use gridplan::constraint;
//! use gridplan::lp_model_builder;
//! use gridplan::lp_solver::VariableType;
//!
//! let mut dispatch = lp_model_builder!(Dispatch);
//! let mut expansion = lp_model_builder!(Expansion);
//!
//! let generation = dispatch.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
//! let _cap = expansion.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
//!
//! dispatch.add_constraint(constraint!((generation) <= 100.0));
//! // dispatch.add_constraint(constraint!((_cap) <= 100.0)); // does not compile
//! ```
//!
//! # Re-linearisation
//!
//! Constraints keep their expression after being added, so a single coefficient
//! can be rewritten between solves with [`LPModelBuilder::update_coefficient`],
//! or a whole batch with [`LPModelBuilder::update_coefficients`]. A batch is
//! validated before any coefficient is touched, so a failed update leaves the
//! model exactly as it was.
//!
//! ```rust
//! use gridplan::constraint;
//! use gridplan::lp_model_builder;
//! use gridplan::lp_solver::VariableType;
//!
//! let mut builder = lp_model_builder!();
//! let flow = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
//! let power = builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
//! let row = builder.add_constraint(constraint!((power - 0.8 * flow) == 0.0));
//!
//! builder.update_coefficient(row, flow, -0.9).unwrap();
//! assert_eq!(builder.coefficient(row, flow), Some(-0.9));
//! ```
//!
//! # Solver Selection
//!
//! [`SolverBackend::from_name`] maps a configured name onto a backend:
//! - `"highs"` - HiGHS (requires the `highs` feature)
//! - `"coin_cbc"`, `"coin-cbc"` or `"cbc"` - COIN-OR CBC (requires `coin_cbc`)
//! - `"gurobi"` - Gurobi (requires `gurobi`)
//!
//! The `GRIDPLAN_LP_SOLVER` environment variable overrides the configured name.

use anyhow::Result;
use std::env;
use std::fmt;
use std::marker::PhantomData;

use crate::AppError;

/// Environment variable overriding the configured solver backend
pub const SOLVER_ENV_VAR: &str = "GRIDPLAN_LP_SOLVER";

/// Variable types supported by LP solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum VariableType {
    /// Continuous variable (can take any real value)
    Continuous,
    /// Integer variable (can only take integer values)
    Integer,
    /// Binary variable (can only take values 0 or 1)
    Binary,
}

/// Constraint sense for linear constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// Less than or equal to (≤)
    LessEqual,
    /// Equal to (=)
    Equal,
    /// Greater than or equal to (≥)
    GreaterEqual,
}

/// Optimization direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationSense {
    /// Minimize the objective function
    Minimize,
    /// Maximize the objective function
    Maximize,
}

/// Status of the optimization process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Optimal solution found
    Optimal,
    /// Feasible solution found, but not necessarily optimal
    Feasible,
    /// Problem is infeasible (no solution exists)
    Infeasible,
    /// Problem is unbounded
    Unbounded,
    /// Problem is infeasible or unbounded
    InfeasibleOrUnbounded,
    /// Other status (solver-specific)
    Other(&'static str),
}

/// Available LP solver backends
///
/// Every variant exists regardless of enabled features, so that a configured
/// name can be recognised and reported as unavailable rather than unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverBackend {
    /// HiGHS open-source solver
    Highs,
    /// Coin CBC open-source solver
    CoinCbc,
    /// Gurobi commercial solver
    Gurobi,
}

impl SolverBackend {
    /// Parse a backend name, failing if it is unknown or not compiled in
    pub fn from_name(name: &str) -> Result<Self> {
        let backend = match name.trim().to_lowercase().as_str() {
            "highs" => SolverBackend::Highs,
            "coin_cbc" | "coin-cbc" | "cbc" => SolverBackend::CoinCbc,
            "gurobi" => SolverBackend::Gurobi,
            _ => return Err(AppError::UnsupportedSolver(name.to_string()).into()),
        };

        if !backend.is_available() {
            return Err(AppError::SolverUnavailable(backend.feature_name()).into());
        }
        Ok(backend)
    }

    /// Resolve the backend from `GRIDPLAN_LP_SOLVER`, falling back to `configured`
    pub fn from_env_or(configured: &str) -> Result<Self> {
        match env::var(SOLVER_ENV_VAR) {
            Ok(name) if !name.trim().is_empty() => Self::from_name(&name),
            _ => Self::from_name(configured),
        }
    }

    /// First compiled-in backend, preferring HiGHS, then Gurobi, then CBC
    pub fn default_available() -> Result<Self> {
        [
            SolverBackend::Highs,
            SolverBackend::Gurobi,
            SolverBackend::CoinCbc,
        ]
        .into_iter()
        .find(|backend| backend.is_available())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No LP solver backend available. Please enable a solver feature (e.g., 'highs' or 'coin_cbc')"
            )
        })
    }

    /// Whether the backend's cargo feature was enabled at build time
    pub fn is_available(self) -> bool {
        match self {
            SolverBackend::Highs => cfg!(feature = "highs"),
            SolverBackend::CoinCbc => cfg!(feature = "coin_cbc"),
            SolverBackend::Gurobi => cfg!(feature = "gurobi"),
        }
    }

    /// Reject raw parameters the backend would refuse, before the model is built
    ///
    /// Only HiGHS can be queried up front; other backends report bad
    /// parameters when solving.
    #[allow(unused_variables)]
    pub fn validate_parameters(self, parameters: &[(String, SolverParameter)]) -> Result<()> {
        match self {
            #[cfg(feature = "highs")]
            SolverBackend::Highs => highs::validate_options(parameters),
            _ => Ok(()),
        }
    }

    /// Cargo feature that enables the backend
    pub fn feature_name(self) -> &'static str {
        match self {
            SolverBackend::Highs => "highs",
            SolverBackend::CoinCbc => "coin_cbc",
            SolverBackend::Gurobi => "gurobi",
        }
    }
}

impl fmt::Display for SolverBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.feature_name())
    }
}

/// Anything able to optimise an [`LPModelBuilder`]
///
/// [`SolverBackend`] is the production implementation; the seam lets the
/// head iteration be driven by scripted solutions in tests.
pub trait Solver {
    fn solve<Brand>(&self, builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>>;
}

impl Solver for SolverBackend {
    #[allow(unreachable_code, unused_variables)]
    fn solve<Brand>(&self, builder: &LPModelBuilder<Brand>) -> Result<LPSolution<Brand>> {
        match self {
            SolverBackend::Highs => {
                #[cfg(feature = "highs")]
                return highs::solve_highs(builder);
            }
            SolverBackend::CoinCbc => {
                #[cfg(feature = "coin_cbc")]
                return coin_cbc::solve_coin_cbc(builder);
            }
            SolverBackend::Gurobi => {
                #[cfg(feature = "gurobi")]
                return gurobi::solve_gurobi(builder);
            }
        }
        Err(AppError::SolverUnavailable(self.feature_name()).into())
    }
}

/// Raw solver parameter value passed through to the backend untouched
#[derive(Debug, Clone, PartialEq)]
pub enum SolverParameter {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for SolverParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverParameter::Bool(value) => write!(f, "{value}"),
            SolverParameter::Int(value) => write!(f, "{value}"),
            SolverParameter::Float(value) => write!(f, "{value}"),
            SolverParameter::Text(value) => f.write_str(value),
        }
    }
}

/// A linear expression term: coefficient * variable
#[derive(Debug)]
pub struct LinearTerm<Brand> {
    pub coefficient: f64,
    pub variable: VariableId<Brand>,
}

/// A linear expression: sum of terms plus constant
#[derive(Debug)]
pub struct LinearExpression<Brand> {
    pub terms: Vec<LinearTerm<Brand>>,
    pub constant: f64,
}

impl<Brand> LinearExpression<Brand> {
    /// Create a new linear expression with a constant term
    pub fn new(constant: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant,
        }
    }

    /// Add a term to the expression
    pub fn add_term(&mut self, coefficient: f64, variable: VariableId<Brand>) {
        self.terms.push(LinearTerm {
            coefficient,
            variable,
        });
    }

    /// Create a linear expression from a single variable
    pub fn from_variable(variable: VariableId<Brand>) -> Self {
        Self {
            terms: vec![LinearTerm {
                coefficient: 1.0,
                variable,
            }],
            constant: 0.0,
        }
    }

    /// Sum of `coefficient * variable` pairs
    pub fn from_terms(terms: impl IntoIterator<Item = (f64, VariableId<Brand>)>) -> Self {
        let mut expression = Self::new(0.0);
        for (coefficient, variable) in terms {
            expression.add_term(coefficient, variable);
        }
        expression
    }

    /// Evaluate the expression for the given variable values
    pub fn evaluate(&self, value_of: impl Fn(VariableId<Brand>) -> f64) -> f64 {
        self.terms
            .iter()
            .map(|term| term.coefficient * value_of(term.variable))
            .sum::<f64>()
            + self.constant
    }

    /// Total coefficient of `variable` across all of its terms
    pub fn coefficient_of(&self, variable: VariableId<Brand>) -> Option<f64> {
        self.terms
            .iter()
            .filter(|term| term.variable == variable)
            .map(|term| term.coefficient)
            .reduce(|a, b| a + b)
    }

    /// Terms with one entry per column, coefficients of repeated columns summed
    ///
    /// Row-oriented backends reject or overwrite duplicate columns in a row.
    pub fn merged_terms(&self) -> Vec<(usize, f64)> {
        let mut merged: Vec<(usize, f64)> = self
            .terms
            .iter()
            .map(|term| (term.variable.id, term.coefficient))
            .collect();
        merged.sort_unstable_by_key(|&(column, _)| column);
        merged.dedup_by(|next, kept| {
            if next.0 == kept.0 {
                kept.1 += next.1;
                true
            } else {
                false
            }
        });
        merged
    }

    /// Replace every term of `variable` by a single term with `coefficient`
    fn set_coefficient(&mut self, variable: VariableId<Brand>, coefficient: f64) {
        self.terms.retain(|term| term.variable != variable);
        self.add_term(coefficient, variable);
    }
}

impl<Brand> From<VariableId<Brand>> for LinearExpression<Brand> {
    fn from(variable: VariableId<Brand>) -> Self {
        Self::from_variable(variable)
    }
}

impl<Brand> std::iter::Sum for LinearExpression<Brand> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(LinearExpression::new(0.0), |acc, expr| acc + expr)
    }
}

/// Unique identifier for a variable in the LP model
///
/// The `Brand` type parameter ensures that variables can only be used with the
/// builder that created them. This is enforced at compile time.
pub struct VariableId<Brand> {
    id: usize,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> VariableId<Brand> {
    fn new(id: usize) -> Self {
        Self {
            id,
            _brand: PhantomData,
        }
    }

    /// Column position of the variable in its builder
    pub fn index(self) -> usize {
        self.id
    }
}

// Manual trait implementations that don't require Brand to implement anything
impl<Brand> std::fmt::Debug for VariableId<Brand> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableId").field("id", &self.id).finish()
    }
}

impl<Brand> Clone for VariableId<Brand> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Brand> Copy for VariableId<Brand> {}

// Branded containers are cloneable whatever the brand is
impl<Brand> Clone for LinearTerm<Brand> {
    fn clone(&self) -> Self {
        Self {
            coefficient: self.coefficient,
            variable: self.variable,
        }
    }
}

impl<Brand> Clone for LinearExpression<Brand> {
    fn clone(&self) -> Self {
        Self {
            terms: self.terms.clone(),
            constant: self.constant,
        }
    }
}

impl<Brand> Clone for Constraint<Brand> {
    fn clone(&self) -> Self {
        Self {
            expression: self.expression.clone(),
            sense: self.sense,
            rhs: self.rhs,
        }
    }
}

impl<Brand> Clone for ObjectiveInfo<Brand> {
    fn clone(&self) -> Self {
        Self {
            expression: self.expression.clone(),
            sense: self.sense,
        }
    }
}

impl<Brand> Clone for LPSolution<Brand> {
    fn clone(&self) -> Self {
        Self {
            status: self.status,
            objective_value: self.objective_value,
            variable_values: self.variable_values.clone(),
            _brand: PhantomData,
        }
    }
}

impl<Brand> PartialEq for VariableId<Brand> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<Brand> Eq for VariableId<Brand> {}

impl<Brand> std::hash::Hash for VariableId<Brand> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Unique identifier for a constraint in the LP model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(usize);

impl ConstraintId {
    /// Row position of the constraint in its builder
    pub fn index(self) -> usize {
        self.0
    }
}

/// A linear constraint: `expression <sense> rhs`
#[derive(Debug)]
pub struct Constraint<Brand> {
    expression: LinearExpression<Brand>,
    sense: ConstraintSense,
    rhs: f64,
}

impl<Brand> Constraint<Brand> {
    /// Create a new constraint
    pub fn new(
        expression: impl Into<LinearExpression<Brand>>,
        sense: ConstraintSense,
        rhs: f64,
    ) -> Self {
        Self {
            expression: expression.into(),
            sense,
            rhs,
        }
    }

    /// Create an equality constraint: expression == rhs
    pub fn eq(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, ConstraintSense::Equal, rhs)
    }

    /// Create a less-than-or-equal constraint: expression <= rhs
    pub fn le(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, ConstraintSense::LessEqual, rhs)
    }

    /// Create a greater-than-or-equal constraint: expression >= rhs
    pub fn ge(expression: impl Into<LinearExpression<Brand>>, rhs: f64) -> Self {
        Self::new(expression, ConstraintSense::GreaterEqual, rhs)
    }

    pub fn expression(&self) -> &LinearExpression<Brand> {
        &self.expression
    }

    pub fn sense(&self) -> ConstraintSense {
        self.sense
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }

    /// `lhs - rhs` for the given variable values
    pub fn residual(&self, value_of: impl Fn(VariableId<Brand>) -> f64) -> f64 {
        self.expression.evaluate(value_of) - self.rhs
    }
}

/// Variable information stored in the model
#[derive(Debug, Clone)]
struct VariableInfo {
    var_type: VariableType,
    lower_bound: f64,
    upper_bound: f64,
}

/// Objective function information
#[derive(Debug)]
struct ObjectiveInfo<Brand> {
    expression: LinearExpression<Brand>,
    sense: OptimizationSense,
}

/// Result of solving an LP model
#[derive(Debug)]
pub struct LPSolution<Brand> {
    pub status: OptimizationStatus,
    pub objective_value: f64,
    variable_values: Vec<f64>,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPSolution<Brand> {
    /// Assemble a solution from column values in variable order
    pub fn new(status: OptimizationStatus, objective_value: f64, variable_values: Vec<f64>) -> Self {
        Self {
            status,
            objective_value,
            variable_values,
            _brand: PhantomData,
        }
    }

    /// Get the value of a variable from the solution
    pub fn get_value(&self, var_id: VariableId<Brand>) -> Option<f64> {
        self.variable_values.get(var_id.id).copied()
    }

    /// Value of a variable, zero if the solution carries no column for it
    pub fn value(&self, var_id: VariableId<Brand>) -> f64 {
        self.get_value(var_id).unwrap_or(0.0)
    }

    /// Value of a linear expression at this solution
    pub fn evaluate(&self, expression: &LinearExpression<Brand>) -> f64 {
        expression.evaluate(|var| self.value(var))
    }

    pub fn is_optimal(&self) -> bool {
        self.status == OptimizationStatus::Optimal
    }
}

/// Builder for LP models that can work with different backends
///
/// The `Brand` type parameter ensures type safety - variables from one builder
/// cannot be accidentally used with another builder.
pub struct LPModelBuilder<Brand> {
    variables: Vec<VariableInfo>,
    constraints: Vec<Constraint<Brand>>,
    objective: Option<ObjectiveInfo<Brand>>,
    parameters: Vec<(String, SolverParameter)>,
    verbose: bool,
    _brand: PhantomData<fn() -> Brand>,
}

impl<Brand> LPModelBuilder<Brand> {
    /// Create a new LP model builder
    pub fn new() -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: None,
            parameters: Vec::new(),
            verbose: false,
            _brand: PhantomData,
        }
    }

    /// Add a variable to the model
    pub fn add_variable(
        &mut self,
        var_type: VariableType,
        lower_bound: f64,
        upper_bound: f64,
    ) -> VariableId<Brand> {
        let var_id = VariableId::new(self.variables.len());
        self.variables.push(VariableInfo {
            var_type,
            lower_bound,
            upper_bound,
        });
        var_id
    }

    /// Add a constraint to the model
    pub fn add_constraint(&mut self, constraint: Constraint<Brand>) -> ConstraintId {
        let constr_id = ConstraintId(self.constraints.len());
        self.constraints.push(constraint);
        constr_id
    }

    /// Set the objective function
    pub fn set_objective(&mut self, expression: LinearExpression<Brand>, sense: OptimizationSense) {
        self.objective = Some(ObjectiveInfo { expression, sense });
    }

    /// Record a backend-specific parameter, replacing an earlier value for `key`
    pub fn set_raw_parameter(&mut self, key: impl Into<String>, value: SolverParameter) {
        let key = key.into();
        self.parameters.retain(|(existing, _)| *existing != key);
        self.parameters.push((key, value));
    }

    pub fn raw_parameters(&self) -> &[(String, SolverParameter)] {
        &self.parameters
    }

    /// Let the backend print its own progress instead of silencing it
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint<Brand>> {
        self.constraints.get(id.0)
    }

    /// Current coefficient of `variable` in constraint `id`
    pub fn coefficient(&self, id: ConstraintId, variable: VariableId<Brand>) -> Option<f64> {
        self.constraint(id)?.expression.coefficient_of(variable)
    }

    /// Set the coefficient of `variable` in constraint `id`
    pub fn update_coefficient(
        &mut self,
        id: ConstraintId,
        variable: VariableId<Brand>,
        value: f64,
    ) -> Result<()> {
        self.update_coefficients(&[(id, variable, value)])
    }

    /// Set a batch of coefficients; nothing is written unless every update is valid
    pub fn update_coefficients(&mut self, updates: &[(ConstraintId, VariableId<Brand>, f64)]) -> Result<()> {
        for &(id, variable, value) in updates {
            if id.0 >= self.constraints.len() {
                return Err(AppError::UnknownConstraint(id.0).into());
            }
            if variable.id >= self.variables.len() {
                return Err(AppError::MissingVariable(format!("column {}", variable.id)).into());
            }
            if !value.is_finite() {
                return Err(anyhow::anyhow!(
                    "Coefficient for column {} in row {} is not finite: {value}",
                    variable.id,
                    id.0
                ));
            }
        }

        for &(id, variable, value) in updates {
            self.constraints[id.0]
                .expression
                .set_coefficient(variable, value);
        }
        Ok(())
    }

    /// Solve the model with the given solver
    pub fn solve_with(&self, solver: &impl Solver) -> Result<LPSolution<Brand>> {
        solver.solve(self)
    }

    /// Solve with the backend named in `GRIDPLAN_LP_SOLVER`, or the default one
    pub fn solve(&self) -> Result<LPSolution<Brand>> {
        let backend = match env::var(SOLVER_ENV_VAR) {
            Ok(name) => SolverBackend::from_name(&name)?,
            Err(_) => SolverBackend::default_available()?,
        };
        self.solve_with(&backend)
    }

    /// Objective value implied by `values`, used by backends that don't report one
    #[cfg_attr(not(feature = "coin_cbc"), allow(dead_code))]
    fn objective_at(&self, values: &[f64]) -> f64 {
        self.objective.as_ref().map_or(0.0, |objective| {
            objective
                .expression
                .evaluate(|var| values.get(var.id).copied().unwrap_or(0.0))
        })
    }
}

impl<Brand> Default for LPModelBuilder<Brand> {
    fn default() -> Self {
        Self::new()
    }
}

// Macros for convenient syntax
pub mod macros;

// Operator overloading for linear expressions
pub mod ops;

pub mod output_suppression;

#[cfg(feature = "highs")]
pub mod highs;

#[cfg(feature = "gurobi")]
pub mod gurobi;

#[cfg(feature = "coin_cbc")]
pub mod coin_cbc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constraint, lp_model_builder};

    #[test]
    fn test_constraint_macro() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable(VariableType::Continuous, 0.0, 10.0);

        let c = constraint!((x + y) == 10.0);
        assert_eq!(c.sense, ConstraintSense::Equal);
        assert_eq!(c.rhs, 10.0);

        let c = constraint!((2.0 * x) <= 5.0);
        assert_eq!(c.sense, ConstraintSense::LessEqual);

        let c = constraint!((x - y) >= 0.0);
        assert_eq!(c.sense, ConstraintSense::GreaterEqual);
        assert_eq!(c.rhs, 0.0);
    }

    #[test]
    fn test_clone_does_not_require_brand_clone() {
        // the brand declared by the macro implements no traits at all
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable(VariableType::Continuous, 0.0, 10.0);

        let expression = 2.0 * x + y;
        let copy = expression.clone();
        assert_eq!(copy.coefficient_of(x), Some(2.0));
        assert_eq!(copy.terms.len(), expression.terms.len());

        let row = constraint!((expression) <= 4.0);
        let row_copy = row.clone();
        assert_eq!(row_copy.rhs(), 4.0);
        assert_eq!(row_copy.sense(), ConstraintSense::LessEqual);

        let solution: LPSolution<_> = LPSolution::new(OptimizationStatus::Optimal, 3.0, vec![1.0, 1.0]);
        let solution_copy = solution.clone();
        assert_eq!(solution_copy.value(y), 1.0);
        assert_eq!(solution_copy.objective_value, 3.0);
    }

    #[test]
    fn test_update_coefficient_merges_duplicate_terms() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let row = builder.add_constraint(constraint!((x + y + 2.0 * x) <= 4.0));

        assert_eq!(builder.coefficient(row, x), Some(3.0));
        builder
            .update_coefficient(row, x, -1.5)
            .expect("row and column exist");
        assert_eq!(builder.coefficient(row, x), Some(-1.5));
        assert_eq!(builder.coefficient(row, y), Some(1.0));

        let terms = &builder.constraint(row).unwrap().expression().terms;
        assert_eq!(terms.len(), 2, "duplicate terms should collapse into one");
    }

    #[test]
    fn test_update_coefficients_is_all_or_nothing() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let first = builder.add_constraint(constraint!((2.0 * x) <= 4.0));
        let second = builder.add_constraint(constraint!((3.0 * x) <= 4.0));

        let result = builder.update_coefficients(&[
            (first, x, 7.0),
            (second, x, f64::NAN),
        ]);
        assert!(result.is_err());
        assert_eq!(builder.coefficient(first, x), Some(2.0));
        assert_eq!(builder.coefficient(second, x), Some(3.0));

        let result = builder.update_coefficients(&[(first, x, 7.0), (ConstraintId(99), x, 1.0)]);
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::UnknownConstraint(99))
        ));
        assert_eq!(builder.coefficient(first, x), Some(2.0));
    }

    #[test]
    fn test_residual_and_evaluate() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let c = constraint!((2.0 * x - y + 1.0) == 5.0);

        let residual = c.residual(|var| if var == x { 3.0 } else { 2.0 });
        assert_eq!(residual, 0.0);

        let solution: LPSolution<_> =
            LPSolution::new(OptimizationStatus::Optimal, 0.0, vec![3.0, 2.0]);
        assert_eq!(solution.evaluate(c.expression()), 5.0);
        assert_eq!(solution.value(y), 2.0);
    }

    #[test]
    fn test_merged_terms_sum_repeated_columns() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let expression = 0.5 * y + x + 2.0 * y;

        assert_eq!(expression.merged_terms(), vec![(x.index(), 1.0), (y.index(), 2.5)]);
    }

    #[test]
    fn test_raw_parameters_replace_previous_value() {
        let mut builder: LPModelBuilder<()> = LPModelBuilder::new();
        builder.set_raw_parameter("time_limit", SolverParameter::Float(10.0));
        builder.set_raw_parameter("threads", SolverParameter::Int(2));
        builder.set_raw_parameter("time_limit", SolverParameter::Float(60.0));

        assert_eq!(
            builder.raw_parameters(),
            &[
                ("threads".to_string(), SolverParameter::Int(2)),
                ("time_limit".to_string(), SolverParameter::Float(60.0)),
            ]
        );
    }

    #[test]
    fn test_backend_names() {
        let err = SolverBackend::from_name("mosek").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::UnsupportedSolver(name)) if name == "mosek"
        ));

        for name in ["cbc", "coin_cbc", "Coin-CBC"] {
            match SolverBackend::from_name(name) {
                Ok(backend) => assert_eq!(backend, SolverBackend::CoinCbc),
                Err(err) => assert!(matches!(
                    err.downcast_ref::<AppError>(),
                    Some(AppError::SolverUnavailable("coin_cbc"))
                )),
            }
        }
    }

    #[cfg(feature = "highs")]
    #[test]
    fn test_solve_small_lp() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
        let y = builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
        builder.add_constraint(constraint!((x + y) >= 4.0));
        builder.add_constraint(constraint!((x - y) <= 1.0));
        builder.set_objective(2.0 * x + 3.0 * y, OptimizationSense::Minimize);

        let solution = builder
            .solve_with(&SolverBackend::Highs)
            .expect("HiGHS should solve a bounded LP");
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.value(x) - 2.5).abs() < 1e-6);
        assert!((solution.value(y) - 1.5).abs() < 1e-6);
        assert!((solution.objective_value - 9.5).abs() < 1e-6);
    }
}
