//! Macros for building branded models and constraints

/// Create a new LP model builder with a unique brand
///
/// ```rust
/// use gridplan::lp_model_builder;
/// use gridplan::lp_solver::VariableType;
///
/// // Anonymous brand, unique to this call site
/// let mut builder = lp_model_builder!();
/// let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
///
/// // Named brand, easier to read in compiler errors
/// let mut investment = lp_model_builder!(Investment);
/// let cap = investment.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
/// ```
#[macro_export]
macro_rules! lp_model_builder {
    ($brand_name:ident) => {{
        struct $brand_name;
        $crate::lp_solver::LPModelBuilder::<$brand_name>::new()
    }};

    // `UniqueBrand` lives in the block scope, so each expansion is a distinct type
    () => {{
        struct UniqueBrand;
        $crate::lp_solver::LPModelBuilder::<UniqueBrand>::new()
    }};
}

/// Create constraints using comparison syntax
///
/// The left-hand side must be parenthesised; the right-hand side is cast to `f64`.
///
/// ```rust
/// use gridplan::constraint;
/// use gridplan::lp_model_builder;
/// use gridplan::lp_solver::VariableType;
///
/// let mut builder = lp_model_builder!(Balance);
/// let generation = builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
/// let import = builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY);
///
/// builder.add_constraint(constraint!((generation + import) == 120.0));
/// builder.add_constraint(constraint!((generation) <= 100));
/// builder.add_constraint(constraint!((import - 0.5 * generation) >= 0.0));
/// ```
#[macro_export]
macro_rules! constraint {
    (($lhs:expr) == $rhs:expr) => {
        $crate::constraint!(@sense $lhs, Equal, $rhs)
    };
    (($lhs:expr) <= $rhs:expr) => {
        $crate::constraint!(@sense $lhs, LessEqual, $rhs)
    };
    (($lhs:expr) >= $rhs:expr) => {
        $crate::constraint!(@sense $lhs, GreaterEqual, $rhs)
    };
    (@sense $lhs:expr, $sense:ident, $rhs:expr) => {
        $crate::lp_solver::Constraint::new(
            $lhs,
            $crate::lp_solver::ConstraintSense::$sense,
            $rhs as f64,
        )
    };
}
