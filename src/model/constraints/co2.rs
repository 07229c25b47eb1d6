//! Carbon accounting and caps

use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, Expr, ModelContext, Planning, Row};
use crate::sets::tuples;
use crate::sets::{YearId, ZoneId};

pub struct Co2Constraints {
    pub emission_calc_by_zone: ConstraintFamily<(YearId, ZoneId)>,
    pub emission_calc: ConstraintFamily<YearId>,
    pub emission_limit: ConstraintFamily<YearId>,
    pub zone_emission_limit: ConstraintFamily<(YearId, ZoneId)>,
}

impl Co2Constraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        Ok(Self {
            emission_calc_by_zone: ConstraintFamily::build(
                builder,
                "emission_calc_by_zone",
                tuples::year_zone(ctx.sets),
                |key| emission_by_zone(ctx, key),
            )?,
            emission_calc: ConstraintFamily::build(builder, "emission_calc", ctx.sets.year_ids(), |y| {
                emission_total(ctx, y)
            })?,
            emission_limit: ConstraintFamily::build(builder, "emission_limit", ctx.sets.year_ids(), |y| {
                emission_limit(ctx, y)
            })?,
            zone_emission_limit: ConstraintFamily::build(
                builder,
                "zone_emission_limit",
                tuples::year_zone(ctx.sets),
                |key| zone_emission_limit(ctx, key),
            )?,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        sizes.push((self.emission_calc_by_zone.name(), self.emission_calc_by_zone.len()));
        sizes.push((self.emission_calc.name(), self.emission_calc.len()));
        sizes.push((self.emission_limit.name(), self.emission_limit.len()));
        sizes.push((self.zone_emission_limit.name(), self.zone_emission_limit.len()));
    }
}

fn emission_by_zone(ctx: &ModelContext, (y, z): (YearId, ZoneId)) -> Result<Option<Row>> {
    let mut emissions = Expr::from(ctx.vars.carbon_capacity.get(&(y, z))?);
    for te in ctx.sets.techs.ids() {
        let factor = ctx.params.emission_factor.get(&(te, y))?;
        if factor == 0.0 {
            continue;
        }
        for (h, m) in itertools::iproduct!(ctx.sets.hours(), ctx.sets.month_ids()) {
            let generation = ctx.vars.generation.get(&(h, m, y, z, te))?;
            emissions.add_term(-factor * ctx.settings.dt, generation);
        }
    }
    Ok(Some(constraint!((emissions) == 0.0)))
}

fn emission_total(ctx: &ModelContext, y: YearId) -> Result<Option<Row>> {
    let mut total = Expr::from(ctx.vars.carbon.get(&y)?);
    total -= ctx.vars.carbon_capacity.sum(ctx.sets.zones.ids().map(|z| (y, z)))?;
    Ok(Some(constraint!((total) == 0.0)))
}

fn emission_limit(ctx: &ModelContext, y: YearId) -> Result<Option<Row>> {
    let Some(limit) = ctx.params.carbon_emission_limit.get(&y)?.value() else {
        return Ok(None);
    };
    let carbon = ctx.vars.carbon.get(&y)?;
    Ok(Some(constraint!((carbon) <= limit)))
}

/// Optional per-zone cap; zones without an entry are unconstrained
fn zone_emission_limit(ctx: &ModelContext, (y, z): (YearId, ZoneId)) -> Result<Option<Row>> {
    let Some(limit) = ctx
        .params
        .zone_carbon_emission_limit
        .find(&(z, y))
        .and_then(|bound| bound.value())
    else {
        return Ok(None);
    };
    let carbon = ctx.vars.carbon_capacity.get(&(y, z))?;
    Ok(Some(constraint!((carbon) <= limit)))
}

#[cfg(test)]
mod tests {
    use crate::AppError;
    use crate::model::Model;
    use crate::params::Bound;
    use crate::sets::{TechId, YearId, ZoneId};
    use crate::test_helpers::{thermal_settings, thermal_system};

    #[test]
    fn test_zone_emissions_weight_generation() {
        let model = Model::build(&thermal_system(), thermal_settings()).unwrap();
        let (y, z) = (YearId(0), ZoneId(0));
        let row = model
            .constraints
            .co2
            .emission_calc_by_zone
            .get(&(y, z))
            .unwrap();
        let expression = model.builder.constraint(row).unwrap().expression();

        let generation = model
            .vars
            .generation
            .get(&(model.sets.first_hour(), crate::sets::MonthId(0), y, z, TechId(0)))
            .unwrap();
        assert_eq!(expression.coefficient_of(generation), Some(-0.8));
    }

    #[test]
    fn test_infinite_limit_is_omitted() {
        let mut input = thermal_system();
        input.carbon_emission_limit.insert(2020, Bound::finite(100.0));
        input.carbon_emission_limit.insert(2030, Bound::INFINITE);
        let model = Model::build(&input, thermal_settings()).unwrap();

        let family = &model.constraints.co2.emission_limit;
        assert_eq!(family.len(), 1);
        assert!(family.contains(&YearId(0)));
        assert!(model.constraints.co2.zone_emission_limit.is_empty());
    }

    #[test]
    fn test_missing_year_limit_is_fatal() {
        let mut input = thermal_system();
        input.carbon_emission_limit.remove(&2030);
        let err = Model::build(&input, thermal_settings()).err().expect("build must fail");
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::MissingParameter { table: "carbon_emission_limit", .. })
        ));
    }
}
