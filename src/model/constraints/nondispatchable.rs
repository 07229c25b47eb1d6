use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, ModelContext, Planning, Row};
use crate::sets::tuples::{self, HourlyTech};

pub struct NondispatchableConstraints {
    pub renew_gen: ConstraintFamily<HourlyTech>,
}

impl NondispatchableConstraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        Ok(Self {
            renew_gen: ConstraintFamily::build(
                builder,
                "renew_gen",
                tuples::hourly_tech(ctx.sets, ctx.sets.nondispatchable_tech()),
                |key| renew_gen(ctx, key),
            )?,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        sizes.push((self.renew_gen.name(), self.renew_gen.len()));
    }
}

/// Output follows the hourly resource availability
fn renew_gen(ctx: &ModelContext, (h, m, y, z, te): HourlyTech) -> Result<Option<Row>> {
    let factor = ctx.params.capacity_factor.get(&(te, z, y, m, h))?;
    let generation = ctx.vars.generation.get(&(h, m, y, z, te))?;
    let cap = ctx.vars.cap_existing.get(&(y, z, te))?;
    Ok(Some(constraint!((generation - factor * ctx.settings.dt * cap) <= 0.0)))
}

#[cfg(test)]
mod tests {
    use crate::model::Model;
    use crate::sets::{MonthId, TechType, YearId};
    use crate::test_helpers::{fill_tech_tables, storage_system, thermal_settings};

    #[test]
    fn test_capacity_factor_scales_capacity() {
        let mut input = storage_system();
        input
            .technology_type
            .insert("wind".to_string(), TechType::Nondispatchable);
        fill_tech_tables(&mut input, "wind");
        for (zone, y, m, h, _) in input.demand.clone() {
            input.capacity_factor.push(("wind".to_string(), zone, y, m, h, 0.4));
        }

        let model = Model::build(&input, thermal_settings()).unwrap();
        let wind = model.sets.techs.id("wind").unwrap();
        let north = model.sets.zones.id("north").unwrap();
        let family = &model.constraints.nondispatchable.renew_gen;
        assert_eq!(
            family.len(),
            model.sets.num_hours() * model.sets.num_months() * model.sets.num_years() * 2
        );

        let key = (model.sets.first_hour(), MonthId(0), YearId(0), north, wind);
        let row = model.builder.constraint(family.get(&key).unwrap()).unwrap();
        let cap = model.vars.cap_existing.get(&(YearId(0), north, wind)).unwrap();
        assert_eq!(row.expression().coefficient_of(cap), Some(-0.4));
    }
}
