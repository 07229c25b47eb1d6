use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, Expr, ModelContext, Planning, Row};
use crate::sets::tuples::{self, HourlyZone};

pub struct DemandConstraints {
    pub power_balance: ConstraintFamily<HourlyZone>,
}

impl DemandConstraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        Ok(Self {
            power_balance: ConstraintFamily::build(
                builder,
                "power_balance",
                tuples::hourly_zone(ctx.sets),
                |key| power_balance(ctx, key),
            )?,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        sizes.push((self.power_balance.name(), self.power_balance.len()));
    }
}

/// Imports minus exports plus generation minus charging meets demand
fn power_balance(ctx: &ModelContext, (h, m, y, z): HourlyZone) -> Result<Option<Row>> {
    let demand = ctx.params.demand.get(&(z, y, m, h))?;
    let vars = ctx.vars;

    let mut supply = Expr::new(0.0);
    for &(from, to) in ctx.sets.transmission_pairs() {
        if to == z {
            supply += vars.trans_import.get(&(h, m, y, from, to))?;
        }
        if from == z {
            supply -= vars.trans_export.get(&(h, m, y, from, to))?;
        }
    }
    for te in ctx.sets.techs.ids() {
        supply += vars.generation.get(&(h, m, y, z, te))?;
    }
    for &te in ctx.sets.storage_tech() {
        supply -= vars.charge.get(&(h, m, y, z, te))?;
    }

    Ok(Some(constraint!((supply) == demand)))
}
