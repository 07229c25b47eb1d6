//! The discounted system cost objective
//!
//! Operational terms are scaled up from the representative periods to a full
//! year by dividing by the period weight. Line terms carry a factor of one half
//! because every corridor appears once per direction.

use anyhow::Result;
use serde::Serialize;

use crate::constraint;
use crate::lp_solver::{LPModelBuilder, LPSolution, OptimizationSense};
use crate::model::{ConstraintFamily, Expr, ModelContext, Planning, Row};
use crate::sets::tuples;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Cost components as linear expressions over the model variables
pub struct CostTerms {
    pub var_tech: Expr,
    pub fuel: Expr,
    pub var_line: Expr,
    pub fix_tech: Expr,
    pub fix_line: Expr,
    pub newtech: Expr,
    pub newline: Expr,
    /// Revenue from water withdrawals, zero without hydrology
    pub income: Expr,
    pub cost_definition: ConstraintFamily<()>,
}

/// Evaluated cost components of a solution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub var_tech: f64,
    pub fuel: f64,
    pub var_line: f64,
    pub fix_tech: f64,
    pub fix_line: f64,
    pub newtech: f64,
    pub newline: f64,
    pub income: f64,
    pub total: f64,
}

impl CostTerms {
    /// Assemble every component, tie them to the `cost` variable and minimise it
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        let mut terms = Self {
            var_tech: variable_tech_cost(ctx)?,
            fuel: fuel_cost(ctx)?,
            var_line: variable_line_cost(ctx)?,
            fix_tech: fixed_tech_cost(ctx)?,
            fix_line: fixed_line_cost(ctx)?,
            newtech: new_tech_cost(ctx)?,
            newline: new_line_cost(ctx)?,
            income: income(ctx)?,
            cost_definition: ConstraintFamily::empty("cost_definition"),
        };

        let definition = terms.definition_row(ctx);
        terms.cost_definition =
            ConstraintFamily::build(builder, "cost_definition", [()], |()| Ok(Some(definition.clone())))?;
        builder.set_objective(Expr::from(ctx.vars.cost), OptimizationSense::Minimize);
        Ok(terms)
    }

    /// `cost - (components - income) = 0`
    fn definition_row(&self, ctx: &ModelContext) -> Row {
        let mut definition = Expr::from(ctx.vars.cost);
        for component in [
            &self.var_tech,
            &self.fuel,
            &self.var_line,
            &self.fix_tech,
            &self.fix_line,
            &self.newtech,
            &self.newline,
        ] {
            definition -= component.clone();
        }
        definition += self.income.clone();
        constraint!((definition) == 0.0)
    }

    pub fn breakdown(&self, solution: &LPSolution<Planning>) -> CostBreakdown {
        let var_tech = solution.evaluate(&self.var_tech);
        let fuel = solution.evaluate(&self.fuel);
        let var_line = solution.evaluate(&self.var_line);
        let fix_tech = solution.evaluate(&self.fix_tech);
        let fix_line = solution.evaluate(&self.fix_line);
        let newtech = solution.evaluate(&self.newtech);
        let newline = solution.evaluate(&self.newline);
        let income = solution.evaluate(&self.income);
        CostBreakdown {
            var_tech,
            fuel,
            var_line,
            fix_tech,
            fix_line,
            newtech,
            newline,
            income,
            total: var_tech + fuel + var_line + fix_tech + fix_line + newtech + newline - income,
        }
    }
}

fn variable_tech_cost(ctx: &ModelContext) -> Result<Expr> {
    let mut cost = Expr::new(0.0);
    for ((_, _, y, _, te), generation) in ctx.vars.generation.iter() {
        let price = ctx.params.variable_om_cost.get(&(te, y))?;
        cost.add_term(price * ctx.factors.var_factor(y) / ctx.settings.weight, generation);
    }
    Ok(cost)
}

fn fuel_cost(ctx: &ModelContext) -> Result<Expr> {
    let mut cost = Expr::new(0.0);
    for ((_, _, y, _, te), generation) in ctx.vars.generation.iter() {
        let price = ctx.params.fuel_price.get(&(te, y))?;
        cost.add_term(price * ctx.factors.var_factor(y) / ctx.settings.weight, generation);
    }
    Ok(cost)
}

fn variable_line_cost(ctx: &ModelContext) -> Result<Expr> {
    let mut cost = Expr::new(0.0);
    for ((_, _, y, z, z1), export) in ctx.vars.trans_export.iter() {
        let price = ctx.params.line_variable_om_cost.get(&(z, z1))?;
        cost.add_term(0.5 * price * ctx.factors.var_factor(y) / ctx.settings.weight, export);
    }
    Ok(cost)
}

fn fixed_tech_cost(ctx: &ModelContext) -> Result<Expr> {
    let mut cost = Expr::new(0.0);
    for ((y, _, te), cap) in ctx.vars.cap_existing.iter() {
        let price = ctx.params.fixed_om_cost.get(&(te, y))?;
        cost.add_term(price * ctx.factors.fix_factor(y), cap);
    }
    Ok(cost)
}

fn fixed_line_cost(ctx: &ModelContext) -> Result<Expr> {
    let mut cost = Expr::new(0.0);
    for ((y, z, z1), cap) in ctx.vars.cap_lines_existing.iter() {
        let price = ctx.params.line_fixed_om_cost.get(&(z, z1))?;
        cost.add_term(0.5 * price * ctx.factors.fix_factor(y), cap);
    }
    Ok(cost)
}

fn new_tech_cost(ctx: &ModelContext) -> Result<Expr> {
    let mut cost = Expr::new(0.0);
    for (y, z, te) in tuples::year_zone_tech(ctx.sets) {
        let price = ctx.params.investment_cost.get(&(te, y))?;
        let factor = ctx.factors.inv_factor(te, y)?;
        cost.add_term(price * factor, ctx.vars.cap_newtech.get(&(y, z, te))?);
    }
    Ok(cost)
}

fn new_line_cost(ctx: &ModelContext) -> Result<Expr> {
    let mut cost = Expr::new(0.0);
    for ((y, z, z1), cap) in ctx.vars.cap_newline.iter() {
        let price = ctx.params.line_investment_cost.get(&(z, z1))?;
        let distance = ctx.params.distance.get(&(z, z1))?;
        cost.add_term(0.5 * price * distance * ctx.factors.trans_inv_factor(y), cap);
    }
    Ok(cost)
}

fn income(ctx: &ModelContext) -> Result<Expr> {
    let mut income = Expr::new(0.0);
    let Some(hydro) = &ctx.vars.hydro else {
        return Ok(income);
    };
    let volume = SECONDS_PER_HOUR * ctx.settings.dt;
    for ((_, _, _, y), withdraw) in hydro.withdraw.iter() {
        income.add_term(
            volume * ctx.settings.price * ctx.factors.var_factor(y) / ctx.settings.weight,
            withdraw,
        );
    }
    Ok(income)
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use crate::lp_solver::{LPSolution, OptimizationStatus};
    use crate::model::Model;
    use crate::sets::{MonthId, TechId, YearId, ZoneId};
    use crate::test_helpers::{hydro_settings, hydro_system, thermal_settings, thermal_system};

    #[test]
    fn test_generation_cost_scaled_by_weight() {
        let model = Model::build(&thermal_system(), thermal_settings()).unwrap();
        let (y, te) = (YearId(0), TechId(0));
        let generation = model
            .vars
            .generation
            .get(&(model.sets.first_hour(), MonthId(0), y, ZoneId(0), te))
            .unwrap();

        let var_factor = model.factors.var_factor(y);
        let weight = model.settings.weight;
        let vom = model.params.variable_om_cost.get(&(te, y)).unwrap();
        let fuel = model.params.fuel_price.get(&(te, y)).unwrap();

        assert_approx_eq!(
            f64,
            model.cost.var_tech.coefficient_of(generation).unwrap(),
            vom * var_factor / weight,
            epsilon = 1e-9
        );
        assert_approx_eq!(
            f64,
            model.cost.fuel.coefficient_of(generation).unwrap(),
            fuel * var_factor / weight,
            epsilon = 1e-9
        );
        assert!(model.cost.income.merged_terms().is_empty());
    }

    #[test]
    fn test_breakdown_matches_definition() {
        let model = Model::build(&thermal_system(), thermal_settings()).unwrap();
        let values = (0..model.builder.num_variables()).map(|i| (i % 7) as f64).collect();
        let solution = LPSolution::new(OptimizationStatus::Optimal, 0.0, values);
        let breakdown = model.cost.breakdown(&solution);

        let row = model.cost.cost_definition.get(&()).unwrap();
        let residual = model
            .builder
            .constraint(row)
            .unwrap()
            .residual(|var| solution.value(var));
        // cost variable value minus the breakdown total
        assert_approx_eq!(
            f64,
            residual,
            solution.value(model.vars.cost) - breakdown.total,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_withdrawals_earn_income_with_hydrology() {
        let model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let hydro = model.vars.hydro().unwrap();
        assert_eq!(model.cost.income.merged_terms().len(), hydro.withdraw.len());
    }
}
