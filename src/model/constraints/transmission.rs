//! Transmission corridors
//!
//! Each ordered zone pair with an existing-capacity entry is one corridor.
//! Losses are applied on the receiving side: what leaves `z` as export
//! arrives in `z1` as `efficiency * export`.

use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, Expr, ModelContext, Planning, Row};
use crate::sets::tuples::{self, HourlyPair, YearPair};

pub struct TransmissionConstraints {
    pub trans_physical: ConstraintFamily<YearPair>,
    pub trans_capacity: ConstraintFamily<YearPair>,
    pub trans_balance: ConstraintFamily<HourlyPair>,
    pub trans_up_bound: ConstraintFamily<HourlyPair>,
}

impl TransmissionConstraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        Ok(Self {
            trans_physical: ConstraintFamily::build(
                builder,
                "trans_physical",
                tuples::year_pairs(ctx.sets),
                |key| trans_physical(ctx, key),
            )?,
            trans_capacity: ConstraintFamily::build(
                builder,
                "trans_capacity",
                tuples::year_pairs(ctx.sets),
                |key| trans_capacity(ctx, key),
            )?,
            trans_balance: ConstraintFamily::build(
                builder,
                "trans_balance",
                tuples::hourly_pairs(ctx.sets),
                |key| trans_balance(ctx, key),
            )?,
            trans_up_bound: ConstraintFamily::build(
                builder,
                "trans_up_bound",
                tuples::hourly_pairs(ctx.sets),
                |key| trans_up_bound(ctx, key),
            )?,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        sizes.push((self.trans_physical.name(), self.trans_physical.len()));
        sizes.push((self.trans_capacity.name(), self.trans_capacity.len()));
        sizes.push((self.trans_balance.name(), self.trans_balance.len()));
        sizes.push((self.trans_up_bound.name(), self.trans_up_bound.len()));
    }
}

/// Both directions of a corridor are built together
///
/// One row per unordered pair; a one-way corridor has none.
fn trans_physical(ctx: &ModelContext, (y, z, z1): YearPair) -> Result<Option<Row>> {
    if z >= z1 || !ctx.sets.has_corridor(z1, z) {
        return Ok(None);
    }
    let forward = ctx.vars.cap_newline.get(&(y, z, z1))?;
    let backward = ctx.vars.cap_newline.get(&(y, z1, z))?;
    Ok(Some(constraint!((forward - backward) == 0.0)))
}

/// Line capacity is the legacy capacity plus every build up to `y`
fn trans_capacity(ctx: &ModelContext, (y, z, z1): YearPair) -> Result<Option<Row>> {
    let legacy = ctx.params.line_existing_capacity.get(&(z, z1))?;
    let mut capacity = Expr::from(ctx.vars.cap_lines_existing.get(&(y, z, z1))?);
    capacity -= ctx
        .vars
        .cap_newline
        .sum(ctx.sets.year_ids().take(y.index() + 1).map(|yy| (yy, z, z1)))?;
    Ok(Some(constraint!((capacity) == legacy)))
}

fn trans_balance(ctx: &ModelContext, (h, m, y, z, z1): HourlyPair) -> Result<Option<Row>> {
    let efficiency = ctx.params.line_efficiency.get(&(z, z1))?;
    let import = ctx.vars.trans_import.get(&(h, m, y, z, z1))?;
    let export = ctx.vars.trans_export.get(&(h, m, y, z, z1))?;
    Ok(Some(constraint!((import - efficiency * export) == 0.0)))
}

fn trans_up_bound(ctx: &ModelContext, (h, m, y, z, z1): HourlyPair) -> Result<Option<Row>> {
    let export = ctx.vars.trans_export.get(&(h, m, y, z, z1))?;
    let capacity = ctx.vars.cap_lines_existing.get(&(y, z, z1))?;
    Ok(Some(constraint!((export - capacity) <= 0.0)))
}

#[cfg(test)]
mod tests {
    use crate::model::Model;
    use crate::sets::YearId;
    use crate::test_helpers::{storage_system, thermal_settings};

    #[test]
    fn test_one_symmetry_row_per_unordered_pair() {
        let model = Model::build(&storage_system(), thermal_settings()).unwrap();
        let family = &model.constraints.transmission.trans_physical;
        let north = model.sets.zones.id("north").unwrap();
        let south = model.sets.zones.id("south").unwrap();

        assert_eq!(family.len(), model.sets.num_years());
        let (low, high) = if north < south { (north, south) } else { (south, north) };
        assert!(family.contains(&(YearId(0), low, high)));
        assert!(!family.contains(&(YearId(0), high, low)));
    }

    #[test]
    fn test_one_way_corridor_has_no_symmetry_row() {
        let mut input = storage_system();
        input
            .transmission_line_existing_capacity
            .retain(|(from, _, _)| from == "north");
        let model = Model::build(&input, thermal_settings()).unwrap();

        assert!(model.constraints.transmission.trans_physical.is_empty());
        assert_eq!(
            model.constraints.transmission.trans_capacity.len(),
            model.sets.num_years()
        );
    }

    #[test]
    fn test_line_capacity_accumulates_builds() {
        let model = Model::build(&storage_system(), thermal_settings()).unwrap();
        let north = model.sets.zones.id("north").unwrap();
        let south = model.sets.zones.id("south").unwrap();

        let row = model
            .constraints
            .transmission
            .trans_capacity
            .get(&(YearId(1), north, south))
            .unwrap();
        let row = model.builder.constraint(row).unwrap();
        for y in 0..2 {
            let new = model.vars.cap_newline.get(&(YearId(y), north, south)).unwrap();
            assert_eq!(row.expression().coefficient_of(new), Some(-1.0));
        }
        assert_eq!(row.rhs(), 5.0);
    }
}
