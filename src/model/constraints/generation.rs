//! Dispatch limits and ramping

use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, ModelContext, Planning, Row};
use crate::sets::tuples::{self, HourlyTech};

pub struct GenerationConstraints {
    pub gen_up_bound: ConstraintFamily<HourlyTech>,
    pub ramping_up: ConstraintFamily<HourlyTech>,
    pub ramping_down: ConstraintFamily<HourlyTech>,
}

impl GenerationConstraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        let keys = || tuples::hourly_all_tech(ctx.sets);
        Ok(Self {
            gen_up_bound: ConstraintFamily::build(builder, "gen_up_bound", keys(), |key| {
                gen_up_bound(ctx, key)
            })?,
            ramping_up: ConstraintFamily::build(builder, "ramping_up", keys(), |key| {
                ramping(ctx, key, Ramp::Up)
            })?,
            ramping_down: ConstraintFamily::build(builder, "ramping_down", keys(), |key| {
                ramping(ctx, key, Ramp::Down)
            })?,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        for family in [&self.gen_up_bound, &self.ramping_up, &self.ramping_down] {
            sizes.push((family.name(), family.len()));
        }
    }
}

fn gen_up_bound(ctx: &ModelContext, (h, m, y, z, te): HourlyTech) -> Result<Option<Row>> {
    let generation = ctx.vars.generation.get(&(h, m, y, z, te))?;
    let cap = ctx.vars.cap_existing.get(&(y, z, te))?;
    Ok(Some(constraint!((generation - ctx.settings.dt * cap) <= 0.0)))
}

#[derive(Clone, Copy)]
enum Ramp {
    Up,
    Down,
}

/// Hour-to-hour change limited to a share of installed capacity
///
/// No row when the limit can never bind (`rate * dt >= 1`) or in the first
/// hour, which has no predecessor.
fn ramping(ctx: &ModelContext, (h, m, y, z, te): HourlyTech, direction: Ramp) -> Result<Option<Row>> {
    if h == ctx.sets.first_hour() {
        return Ok(None);
    }
    let rate = match direction {
        Ramp::Up => ctx.params.ramp_up.get(&te)?,
        Ramp::Down => ctx.params.ramp_down.get(&te)?,
    } * ctx.settings.dt;
    if rate >= 1.0 {
        return Ok(None);
    }

    let current = ctx.vars.generation.get(&(h, m, y, z, te))?;
    let previous = ctx.vars.generation.get(&(h.previous(), m, y, z, te))?;
    let cap = ctx.vars.cap_existing.get(&(y, z, te))?;
    let change = match direction {
        Ramp::Up => current - previous,
        Ramp::Down => previous - current,
    };
    Ok(Some(constraint!((change - rate * cap) <= 0.0)))
}
