//! Public debt caps on new investment
//!
//! The publicly financed share of a technology's discounted investment cost
//! counts as debt. Technologies without a debt ratio are fully private.

use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, Expr, ModelContext, Planning, Row};
use crate::sets::tuples;
use crate::sets::{YearId, ZoneId};

pub struct FinanceConstraints {
    pub public_debt_system: ConstraintFamily<YearId>,
    pub public_debt_zone: ConstraintFamily<(YearId, ZoneId)>,
}

impl FinanceConstraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        Ok(Self {
            public_debt_system: ConstraintFamily::build(
                builder,
                "public_debt_system",
                ctx.sets.year_ids(),
                |y| system_debt(ctx, y),
            )?,
            public_debt_zone: ConstraintFamily::build(
                builder,
                "public_debt_zone",
                tuples::year_zone(ctx.sets),
                |key| zone_debt(ctx, key),
            )?,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        sizes.push((self.public_debt_system.name(), self.public_debt_system.len()));
        sizes.push((self.public_debt_zone.name(), self.public_debt_zone.len()));
    }
}

/// Debt taken on in zone `z` for the builds of year `y`
fn public_debt(ctx: &ModelContext, y: YearId, z: ZoneId) -> Result<Expr> {
    let mut debt = Expr::new(0.0);
    for te in ctx.sets.techs.ids() {
        let ratio = ctx.params.public_debt_ratio.find(&te).unwrap_or(0.0);
        if ratio == 0.0 {
            continue;
        }
        let cost = ctx.params.investment_cost.get(&(te, y))?;
        let factor = ctx.factors.inv_factor(te, y)?;
        debt.add_term(cost * factor * ratio, ctx.vars.cap_newtech.get(&(y, z, te))?);
    }
    Ok(debt)
}

fn system_debt(ctx: &ModelContext, y: YearId) -> Result<Option<Row>> {
    let Some(bound) = ctx
        .params
        .public_debt_upper_bound_system
        .find(&y)
        .and_then(|bound| bound.value())
    else {
        return Ok(None);
    };
    let mut debt = Expr::new(0.0);
    for z in ctx.sets.zones.ids() {
        debt += public_debt(ctx, y, z)?;
    }
    Ok(Some(constraint!((debt) <= bound)))
}

fn zone_debt(ctx: &ModelContext, (y, z): (YearId, ZoneId)) -> Result<Option<Row>> {
    let Some(bound) = ctx
        .params
        .public_debt_upper_bound_zone
        .find(&(z, y))
        .and_then(|bound| bound.value())
    else {
        return Ok(None);
    };
    Ok(Some(constraint!((public_debt(ctx, y, z)?) <= bound)))
}
