//! Operator overloading for linear expressions
//!
//! Variables, expressions and `f64` constants combine with `+`, `-`, unary `-`
//! and scalar `*`, always producing a [`LinearExpression`] with the same brand.
//! Expressions can also be accumulated in place with `+=` and `-=`, which is how
//! the constraint builders sum over index sets.

use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use super::{LinearExpression, LinearTerm, VariableId};

impl<Brand> Add<LinearExpression<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn add(mut self, other: LinearExpression<Brand>) -> Self::Output {
        self += other;
        self
    }
}

impl<Brand> Sub<LinearExpression<Brand>> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn sub(mut self, other: LinearExpression<Brand>) -> Self::Output {
        self -= other;
        self
    }
}

impl<Brand> AddAssign<LinearExpression<Brand>> for LinearExpression<Brand> {
    fn add_assign(&mut self, other: LinearExpression<Brand>) {
        self.terms.extend(other.terms);
        self.constant += other.constant;
    }
}

impl<Brand> SubAssign<LinearExpression<Brand>> for LinearExpression<Brand> {
    fn sub_assign(&mut self, other: LinearExpression<Brand>) {
        *self += -other;
    }
}

impl<Brand> AddAssign<VariableId<Brand>> for LinearExpression<Brand> {
    fn add_assign(&mut self, variable: VariableId<Brand>) {
        self.add_term(1.0, variable);
    }
}

impl<Brand> SubAssign<VariableId<Brand>> for LinearExpression<Brand> {
    fn sub_assign(&mut self, variable: VariableId<Brand>) {
        self.add_term(-1.0, variable);
    }
}

impl<Brand> AddAssign<f64> for LinearExpression<Brand> {
    fn add_assign(&mut self, constant: f64) {
        self.constant += constant;
    }
}

impl<Brand> SubAssign<f64> for LinearExpression<Brand> {
    fn sub_assign(&mut self, constant: f64) {
        self.constant -= constant;
    }
}

impl<Brand> Neg for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

impl<Brand> Neg for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn neg(self) -> Self::Output {
        LinearExpression::from_terms([(-1.0, self)])
    }
}

impl<Brand> Mul<f64> for LinearExpression<Brand> {
    type Output = LinearExpression<Brand>;

    fn mul(self, factor: f64) -> Self::Output {
        LinearExpression {
            terms: self
                .terms
                .into_iter()
                .map(|term| LinearTerm {
                    coefficient: term.coefficient * factor,
                    variable: term.variable,
                })
                .collect(),
            constant: self.constant * factor,
        }
    }
}

impl<Brand> Mul<LinearExpression<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn mul(self, expression: LinearExpression<Brand>) -> Self::Output {
        expression * self
    }
}

impl<Brand> Mul<f64> for VariableId<Brand> {
    type Output = LinearExpression<Brand>;

    fn mul(self, factor: f64) -> Self::Output {
        LinearExpression::from_terms([(factor, self)])
    }
}

impl<Brand> Mul<VariableId<Brand>> for f64 {
    type Output = LinearExpression<Brand>;

    fn mul(self, variable: VariableId<Brand>) -> Self::Output {
        variable * self
    }
}

// Every remaining `+`/`-` combination promotes both sides to an expression and
// defers to the expression-expression impls above.
macro_rules! promote_binary_ops {
    ($(impl $op:ident::$method:ident for $lhs:ty, $rhs:ty;)*) => {$(
        impl<Brand> $op<$rhs> for $lhs {
            type Output = LinearExpression<Brand>;

            fn $method(self, other: $rhs) -> Self::Output {
                $op::$method(
                    <$lhs as IntoExpression<Brand>>::into_expression(self),
                    <$rhs as IntoExpression<Brand>>::into_expression(other),
                )
            }
        }
    )*};
}

promote_binary_ops! {
    impl Add::add for LinearExpression<Brand>, VariableId<Brand>;
    impl Add::add for LinearExpression<Brand>, f64;
    impl Add::add for VariableId<Brand>, LinearExpression<Brand>;
    impl Add::add for VariableId<Brand>, VariableId<Brand>;
    impl Add::add for VariableId<Brand>, f64;
    impl Add::add for f64, VariableId<Brand>;
    impl Add::add for f64, LinearExpression<Brand>;
    impl Sub::sub for LinearExpression<Brand>, VariableId<Brand>;
    impl Sub::sub for LinearExpression<Brand>, f64;
    impl Sub::sub for VariableId<Brand>, LinearExpression<Brand>;
    impl Sub::sub for VariableId<Brand>, VariableId<Brand>;
    impl Sub::sub for VariableId<Brand>, f64;
    impl Sub::sub for f64, VariableId<Brand>;
    impl Sub::sub for f64, LinearExpression<Brand>;
}

/// Anything that can stand on one side of a linear operator
trait IntoExpression<Brand> {
    fn into_expression(self) -> LinearExpression<Brand>;
}

impl<Brand> IntoExpression<Brand> for LinearExpression<Brand> {
    fn into_expression(self) -> LinearExpression<Brand> {
        self
    }
}

impl<Brand> IntoExpression<Brand> for VariableId<Brand> {
    fn into_expression(self) -> LinearExpression<Brand> {
        LinearExpression::from_variable(self)
    }
}

impl<Brand> IntoExpression<Brand> for f64 {
    fn into_expression(self) -> LinearExpression<Brand> {
        LinearExpression::new(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::lp_model_builder;
    use crate::lp_solver::{LinearExpression, VariableType};

    #[test]
    fn test_constant_on_the_left() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);

        let expr = 10.0 - x;
        assert_eq!(expr.constant, 10.0);
        assert_eq!(expr.terms.len(), 1);
        assert_eq!(expr.terms[0].coefficient, -1.0);

        let expr = 3.0 + 2.0 * x;
        assert_eq!(expr.constant, 3.0);
        assert_eq!(expr.terms[0].coefficient, 2.0);
    }

    #[test]
    fn test_expression_operations() {
        let mut builder = lp_model_builder!();
        let x = builder.add_variable(VariableType::Continuous, 0.0, 10.0);
        let y = builder.add_variable(VariableType::Continuous, 0.0, 10.0);

        let expr = (x + 2.0 * y - 4.0) * 0.5;
        assert_eq!(expr.constant, -2.0);
        assert_eq!(expr.coefficient_of(x), Some(0.5));
        assert_eq!(expr.coefficient_of(y), Some(1.0));

        let expr = x - (y - 1.0);
        assert_eq!(expr.constant, 1.0);
        assert_eq!(expr.coefficient_of(y), Some(-1.0));

        let expr = -(x + y);
        assert_eq!(expr.coefficient_of(x), Some(-1.0));
    }

    #[test]
    fn test_accumulate_in_place() {
        let mut builder = lp_model_builder!();
        let vars: Vec<_> = (0..4)
            .map(|_| builder.add_variable(VariableType::Continuous, 0.0, 1.0))
            .collect();

        let mut total = LinearExpression::new(0.0);
        for (i, &var) in vars.iter().enumerate() {
            total += (i as f64 + 1.0) * var;
        }
        total -= vars[0];
        total += 2.5;

        assert_eq!(total.coefficient_of(vars[0]), Some(0.0));
        assert_eq!(total.coefficient_of(vars[3]), Some(4.0));
        assert_eq!(total.constant, 2.5);
        assert_eq!(total.evaluate(|_| 1.0), 1.0 + 2.0 + 3.0 + 4.0 - 1.0 + 2.5);

        let summed: LinearExpression<_> = vars.iter().map(|&v| v * 2.0).sum();
        assert_eq!(summed.terms.len(), 4);
    }
}
