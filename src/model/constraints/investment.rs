//! Capacity bounds and vintage accounting

use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, Expr, ModelContext, Planning, Row};
use crate::sets::tuples::{self, YearZoneTech};

pub struct InvestmentConstraints {
    pub tech_up_bound: ConstraintFamily<YearZoneTech>,
    pub new_tech_up_bound: ConstraintFamily<YearZoneTech>,
    pub new_tech_low_bound: ConstraintFamily<YearZoneTech>,
    pub remaining_capacity: ConstraintFamily<YearZoneTech>,
    pub tech_lifetime: ConstraintFamily<YearZoneTech>,
}

impl InvestmentConstraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        let keys = || tuples::year_zone_tech(ctx.sets);
        Ok(Self {
            tech_up_bound: ConstraintFamily::build(builder, "tech_up_bound", keys(), |key| {
                tech_up_bound(ctx, key)
            })?,
            new_tech_up_bound: ConstraintFamily::build(builder, "new_tech_up_bound", keys(), |key| {
                new_tech_up_bound(ctx, key)
            })?,
            new_tech_low_bound: ConstraintFamily::build(builder, "new_tech_low_bound", keys(), |key| {
                new_tech_low_bound(ctx, key)
            })?,
            remaining_capacity: ConstraintFamily::build(builder, "remaining_capacity", keys(), |key| {
                remaining_capacity(ctx, key)
            })?,
            tech_lifetime: ConstraintFamily::build(builder, "tech_lifetime", keys(), |key| {
                tech_lifetime(ctx, key)
            })?,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        for family in [
            &self.tech_up_bound,
            &self.new_tech_up_bound,
            &self.new_tech_low_bound,
            &self.remaining_capacity,
            &self.tech_lifetime,
        ] {
            sizes.push((family.name(), family.len()));
        }
    }
}

/// Installed capacity stays under the zone's potential
fn tech_up_bound(ctx: &ModelContext, (y, z, te): YearZoneTech) -> Result<Option<Row>> {
    let Some(bound) = ctx.params.technology_upper_bound.get(&(te, z))?.value() else {
        return Ok(None);
    };
    let cap = ctx.vars.cap_existing.get(&(y, z, te))?;
    Ok(Some(constraint!((cap) <= bound)))
}

fn new_tech_up_bound(ctx: &ModelContext, (y, z, te): YearZoneTech) -> Result<Option<Row>> {
    let Some(bound) = ctx.params.new_technology_upper_bound.get(&(te, z))?.value() else {
        return Ok(None);
    };
    let new = ctx.vars.cap_newtech.get(&(y, z, te))?;
    Ok(Some(constraint!((new) <= bound)))
}

fn new_tech_low_bound(ctx: &ModelContext, (y, z, te): YearZoneTech) -> Result<Option<Row>> {
    let bound = ctx.params.new_technology_lower_bound.get(&(te, z))?;
    let new = ctx.vars.cap_newtech.get(&(y, z, te))?;
    Ok(Some(constraint!((new) >= bound)))
}

/// Existing capacity is what survives from before the horizon plus every
/// build of an earlier modelled year still inside its lifetime
fn remaining_capacity(ctx: &ModelContext, (y, z, te): YearZoneTech) -> Result<Option<Row>> {
    let lifetime = ctx.params.lifetime.get(&(te, y))?;
    let year = ctx.sets.year(y);

    let mut capacity = Expr::from(ctx.vars.remaining_technology.get(&(y, z, te))?);
    for yy in ctx.sets.year_ids().take(y.index() + 1) {
        if f64::from(year - ctx.sets.year(yy)) < lifetime {
            capacity += ctx.vars.cap_newtech.get(&(yy, z, te))?;
        }
    }
    capacity -= ctx.vars.cap_existing.get(&(y, z, te))?;
    Ok(Some(constraint!((capacity) == 0.0)))
}

/// Pins the surviving pre-horizon capacity
fn tech_lifetime(ctx: &ModelContext, (y, z, te): YearZoneTech) -> Result<Option<Row>> {
    let lifetime = ctx.params.lifetime.get(&(te, y))?;
    let service_time = f64::from(ctx.sets.year(y) - ctx.sets.first_year());
    let remaining_years = (lifetime - service_time).trunc();

    let remaining = ctx.vars.remaining_technology.get(&(y, z, te))?;
    let surviving = if remaining_years <= 0.0 {
        0.0
    } else {
        ctx.params.surviving_historical_capacity(z, te, remaining_years)
    };
    Ok(Some(constraint!((remaining) == surviving)))
}
