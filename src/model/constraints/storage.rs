//! Energy storage
//!
//! Storage levels carry a boundary period in front of the first hour. The
//! boundary level is pinned by the initial level and must be restored by the
//! last hour of every month.

use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, ModelContext, Planning, Row};
use crate::sets::Hour;
use crate::sets::tuples::{self, HourlyTech, MonthlyTech};

pub struct StorageConstraints {
    pub energy_storage_balance: ConstraintFamily<HourlyTech>,
    pub init_energy_storage: ConstraintFamily<MonthlyTech>,
    pub end_energy_storage: ConstraintFamily<MonthlyTech>,
    pub energy_storage_up_bound: ConstraintFamily<HourlyTech>,
    pub energy_storage_gen: ConstraintFamily<HourlyTech>,
    pub charge_up_bound: ConstraintFamily<HourlyTech>,
}

impl StorageConstraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        let storage = ctx.sets.storage_tech();
        let hourly = || tuples::hourly_tech(ctx.sets, storage);
        let monthly = || tuples::monthly_tech(ctx.sets, storage);
        Ok(Self {
            energy_storage_balance: ConstraintFamily::build(
                builder,
                "energy_storage_balance",
                hourly(),
                |key| balance(ctx, key),
            )?,
            init_energy_storage: ConstraintFamily::build(
                builder,
                "init_energy_storage",
                monthly(),
                |key| init_level(ctx, key),
            )?,
            end_energy_storage: ConstraintFamily::build(
                builder,
                "end_energy_storage",
                monthly(),
                |key| end_level(ctx, key),
            )?,
            energy_storage_up_bound: ConstraintFamily::build(
                builder,
                "energy_storage_up_bound",
                hourly(),
                |key| level_up_bound(ctx, key),
            )?,
            energy_storage_gen: ConstraintFamily::build(
                builder,
                "energy_storage_gen",
                hourly(),
                |key| discharge_limit(ctx, key),
            )?,
            charge_up_bound: ConstraintFamily::build(builder, "charge_up_bound", hourly(), |key| {
                charge_up_bound(ctx, key)
            })?,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        sizes.push((self.energy_storage_balance.name(), self.energy_storage_balance.len()));
        sizes.push((self.init_energy_storage.name(), self.init_energy_storage.len()));
        sizes.push((self.end_energy_storage.name(), self.end_energy_storage.len()));
        sizes.push((self.energy_storage_up_bound.name(), self.energy_storage_up_bound.len()));
        sizes.push((self.energy_storage_gen.name(), self.energy_storage_gen.len()));
        sizes.push((self.charge_up_bound.name(), self.charge_up_bound.len()));
    }
}

/// `storage[h] = storage[h-1] - generation / de + charge * ce`
fn balance(ctx: &ModelContext, (h, m, y, z, te): HourlyTech) -> Result<Option<Row>> {
    let discharge_efficiency = ctx.params.discharge_efficiency.get(&(te, y))?;
    let charge_efficiency = ctx.params.charge_efficiency.get(&(te, y))?;
    let vars = ctx.vars;

    let current = vars.storage.get(&(h, m, y, z, te))?;
    let previous = vars.storage.get(&(h.previous(), m, y, z, te))?;
    let generation = vars.generation.get(&(h, m, y, z, te))?;
    let charge = vars.charge.get(&(h, m, y, z, te))?;

    Ok(Some(constraint!(
        (current - previous + (1.0 / discharge_efficiency) * generation - charge_efficiency * charge) == 0.0
    )))
}

fn init_level(ctx: &ModelContext, (m, y, z, te): MonthlyTech) -> Result<Option<Row>> {
    let level = ctx.params.initial_energy_storage_level.get(&(te, z))?;
    let ratio = ctx.params.energy_to_power_ratio.get(&te)?;
    let boundary = ctx.vars.storage.get(&(Hour::BOUNDARY, m, y, z, te))?;
    let cap = ctx.vars.cap_existing.get(&(y, z, te))?;
    Ok(Some(constraint!((boundary - level * ratio * ctx.settings.dt * cap) == 0.0)))
}

fn end_level(ctx: &ModelContext, (m, y, z, te): MonthlyTech) -> Result<Option<Row>> {
    let last = ctx.vars.storage.get(&(ctx.sets.last_hour(), m, y, z, te))?;
    let boundary = ctx.vars.storage.get(&(Hour::BOUNDARY, m, y, z, te))?;
    Ok(Some(constraint!((last - boundary) == 0.0)))
}

fn level_up_bound(ctx: &ModelContext, (h, m, y, z, te): HourlyTech) -> Result<Option<Row>> {
    let ratio = ctx.params.energy_to_power_ratio.get(&te)?;
    let level = ctx.vars.storage.get(&(h, m, y, z, te))?;
    let cap = ctx.vars.cap_existing.get(&(y, z, te))?;
    Ok(Some(constraint!((level - ratio * ctx.settings.dt * cap) <= 0.0)))
}

/// Discharge cannot exceed what was stored at the end of the previous hour
fn discharge_limit(ctx: &ModelContext, (h, m, y, z, te): HourlyTech) -> Result<Option<Row>> {
    let discharge_efficiency = ctx.params.discharge_efficiency.get(&(te, y))?;
    let generation = ctx.vars.generation.get(&(h, m, y, z, te))?;
    let previous = ctx.vars.storage.get(&(h.previous(), m, y, z, te))?;
    Ok(Some(constraint!(((1.0 / discharge_efficiency) * generation - previous) <= 0.0)))
}

fn charge_up_bound(ctx: &ModelContext, (h, m, y, z, te): HourlyTech) -> Result<Option<Row>> {
    let charge = ctx.vars.charge.get(&(h, m, y, z, te))?;
    let cap = ctx.vars.cap_existing.get(&(y, z, te))?;
    Ok(Some(constraint!((charge - ctx.settings.dt * cap) <= 0.0)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::model::{Model, Var};
    use crate::sets::{Hour, MonthId, YearId};
    use crate::test_helpers::{storage_system, thermal_settings};

    #[test]
    fn test_families_cover_storage_only() {
        let model = Model::build(&storage_system(), thermal_settings()).unwrap();
        let sets = &model.sets;
        let storage = &model.constraints.storage;
        let hourly = sets.num_hours() * sets.num_months() * sets.num_years() * sets.zones.len();
        let monthly = sets.num_months() * sets.num_years() * sets.zones.len();

        assert_eq!(storage.energy_storage_balance.len(), hourly);
        assert_eq!(storage.energy_storage_gen.len(), hourly);
        assert_eq!(storage.charge_up_bound.len(), hourly);
        assert_eq!(storage.init_energy_storage.len(), monthly);
        assert_eq!(storage.end_energy_storage.len(), monthly);
    }

    #[test]
    fn test_first_hour_links_to_boundary_level() {
        let model = Model::build(&storage_system(), thermal_settings()).unwrap();
        let sets = &model.sets;
        let vars = &model.vars;
        let battery = sets.techs.id("battery").unwrap();
        let north = sets.zones.id("north").unwrap();
        let (m, y) = (MonthId(0), YearId(0));
        let first = sets.first_hour();

        // charge 2 MWh at 90% efficiency into a 5 MWh boundary level
        let mut values: HashMap<Var, f64> = HashMap::new();
        values.insert(vars.storage.get(&(Hour::BOUNDARY, m, y, north, battery)).unwrap(), 5.0);
        values.insert(vars.charge.get(&(first, m, y, north, battery)).unwrap(), 2.0);
        values.insert(vars.storage.get(&(first, m, y, north, battery)).unwrap(), 6.8);

        let row = model
            .constraints
            .storage
            .energy_storage_balance
            .get(&(first, m, y, north, battery))
            .unwrap();
        let residual = model
            .builder
            .constraint(row)
            .unwrap()
            .residual(|var| values.get(&var).copied().unwrap_or(0.0));
        assert!(residual.abs() < 1e-12, "residual {residual}");
    }
}
