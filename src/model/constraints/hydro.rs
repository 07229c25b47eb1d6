//! Hydropower
//!
//! The zone-level `hydro_output` row ties the hydro technologies' dispatch
//! either to plant output (with hydrology) or to a predefined profile. The
//! station families model reservoirs hour by hour and exist only when
//! hydrology is enabled.

use anyhow::Result;

use crate::constraint;
use crate::lp_solver::LPModelBuilder;
use crate::model::{ConstraintFamily, Expr, HydroVariables, ModelContext, Planning, Row};
use crate::params::{HydroParameters, Station};
use crate::sets::Hour;
use crate::sets::tuples::{self, HourlyZone, StationHour, StationMonth};

/// Seconds per hour, converting m3/s flows into reservoir volume
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Output in MW per (m3/s * m) of head, before the plant coefficient
const OUTPUT_SCALE: f64 = 1e-3;

/// Coefficient of `genflow` in its `output_calc` row for the given head
pub fn genflow_coefficient(station: &Station, head: f64) -> f64 {
    -station.coeff * OUTPUT_SCALE * head
}

pub struct HydroConstraints {
    pub hydro_output: ConstraintFamily<HourlyZone>,
    pub station: StationConstraints,
}

impl HydroConstraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        let hydro_output = if ctx.sets.hydro_tech().is_empty() {
            ConstraintFamily::empty("hydro_output")
        } else {
            ConstraintFamily::build(builder, "hydro_output", tuples::hourly_zone(ctx.sets), |key| {
                hydro_output(ctx, key)
            })?
        };

        let station = match (&ctx.params.hydro, &ctx.vars.hydro) {
            (Some(params), Some(vars)) => {
                let station_ctx = StationContext {
                    ctx: *ctx,
                    params,
                    vars,
                };
                StationConstraints::build(&station_ctx, builder)?
            }
            _ => StationConstraints::empty(),
        };

        Ok(Self {
            hydro_output,
            station,
        })
    }

    pub fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        sizes.push((self.hydro_output.name(), self.hydro_output.len()));
        self.station.family_sizes(sizes);
    }
}

fn hydro_output(ctx: &ModelContext, (h, m, y, z): HourlyZone) -> Result<Option<Row>> {
    let mut dispatch = Expr::new(0.0);
    for &te in ctx.sets.hydro_tech() {
        dispatch += ctx.vars.generation.get(&(h, m, y, z, te))?;
    }

    match (&ctx.params.hydro, &ctx.vars.hydro) {
        (Some(params), Some(vars)) => {
            let mut balance = -dispatch;
            for s in ctx.sets.stations.ids() {
                if params.station(s).zone == z {
                    balance.add_term(ctx.settings.dt, vars.output.get(&(s, h, m, y))?);
                }
            }
            Ok(Some(constraint!((balance) == 0.0)))
        }
        _ => {
            let predefined = ctx.params.predefined_hydropower.get(&(z, y, m, h))?;
            Ok(Some(constraint!((dispatch) == predefined * ctx.settings.dt)))
        }
    }
}

/// Rule context for station families
#[derive(Clone, Copy)]
struct StationContext<'a> {
    ctx: ModelContext<'a>,
    params: &'a HydroParameters,
    vars: &'a HydroVariables,
}

pub struct StationConstraints {
    pub outflow_calc: ConstraintFamily<StationHour>,
    pub inflow_calc: ConstraintFamily<StationHour>,
    pub water_balance: ConstraintFamily<StationHour>,
    pub init_reservoir_storage: ConstraintFamily<StationMonth>,
    pub end_reservoir_storage: ConstraintFamily<StationMonth>,
    pub outflow_low_bound: ConstraintFamily<StationHour>,
    pub outflow_up_bound: ConstraintFamily<StationHour>,
    pub genflow_up_bound: ConstraintFamily<StationHour>,
    pub storage_low_bound: ConstraintFamily<StationHour>,
    pub storage_up_bound: ConstraintFamily<StationHour>,
    pub output_low_bound: ConstraintFamily<StationHour>,
    pub output_up_bound: ConstraintFamily<StationHour>,
    /// Carries the head-dependent `genflow` coefficient
    pub output_calc: ConstraintFamily<StationHour>,
}

impl StationConstraints {
    fn build(sc: &StationContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        let sets = sc.ctx.sets;
        let hourly = || tuples::station_hour(sets);
        let monthly = || tuples::station_month(sets);
        Ok(Self {
            outflow_calc: ConstraintFamily::build(builder, "outflow_calc", hourly(), |key| {
                outflow_calc(sc, key)
            })?,
            inflow_calc: ConstraintFamily::build(builder, "inflow_calc", hourly(), |key| {
                inflow_calc(sc, key)
            })?,
            water_balance: ConstraintFamily::build(builder, "water_balance", hourly(), |key| {
                water_balance(sc, key)
            })?,
            init_reservoir_storage: ConstraintFamily::build(
                builder,
                "init_reservoir_storage",
                monthly(),
                |key| boundary_storage(sc, key, Boundary::Initial),
            )?,
            end_reservoir_storage: ConstraintFamily::build(
                builder,
                "end_reservoir_storage",
                monthly(),
                |key| boundary_storage(sc, key, Boundary::Final),
            )?,
            outflow_low_bound: ConstraintFamily::build(builder, "outflow_low_bound", hourly(), |key| {
                let station = sc.params.station(key.0);
                Ok(Some(constraint!((sc.vars.outflow.get(&key)?) >= station.outflow_min)))
            })?,
            outflow_up_bound: ConstraintFamily::build(builder, "outflow_up_bound", hourly(), |key| {
                let station = sc.params.station(key.0);
                let Some(max) = station.outflow_max.value() else { return Ok(None) };
                Ok(Some(constraint!((sc.vars.outflow.get(&key)?) <= max)))
            })?,
            genflow_up_bound: ConstraintFamily::build(builder, "genflow_up_bound", hourly(), |key| {
                let station = sc.params.station(key.0);
                let Some(max) = station.genflow_max.value() else { return Ok(None) };
                Ok(Some(constraint!((sc.vars.genflow.get(&key)?) <= max)))
            })?,
            storage_low_bound: ConstraintFamily::build(builder, "storage_low_bound", hourly(), |key| {
                let (s, h, m, _) = key;
                let bound = sc.params.storage_lower_bound.get(&(s, m, h))?;
                Ok(Some(constraint!((sc.vars.storage_reservoir.get(&key)?) >= bound)))
            })?,
            storage_up_bound: ConstraintFamily::build(builder, "storage_up_bound", hourly(), |key| {
                let (s, h, m, _) = key;
                let Some(bound) = sc.params.storage_upper_bound.get(&(s, m, h))?.value() else {
                    return Ok(None);
                };
                Ok(Some(constraint!((sc.vars.storage_reservoir.get(&key)?) <= bound)))
            })?,
            output_low_bound: ConstraintFamily::build(builder, "output_low_bound", hourly(), |key| {
                let station = sc.params.station(key.0);
                Ok(Some(constraint!((sc.vars.output.get(&key)?) >= station.output_min)))
            })?,
            output_up_bound: ConstraintFamily::build(builder, "output_up_bound", hourly(), |key| {
                let station = sc.params.station(key.0);
                let Some(max) = station.output_max.value() else { return Ok(None) };
                Ok(Some(constraint!((sc.vars.output.get(&key)?) <= max)))
            })?,
            output_calc: ConstraintFamily::build(builder, "output_calc", hourly(), |key| {
                output_calc(sc, key)
            })?,
        })
    }

    fn empty() -> Self {
        Self {
            outflow_calc: ConstraintFamily::empty("outflow_calc"),
            inflow_calc: ConstraintFamily::empty("inflow_calc"),
            water_balance: ConstraintFamily::empty("water_balance"),
            init_reservoir_storage: ConstraintFamily::empty("init_reservoir_storage"),
            end_reservoir_storage: ConstraintFamily::empty("end_reservoir_storage"),
            outflow_low_bound: ConstraintFamily::empty("outflow_low_bound"),
            outflow_up_bound: ConstraintFamily::empty("outflow_up_bound"),
            genflow_up_bound: ConstraintFamily::empty("genflow_up_bound"),
            storage_low_bound: ConstraintFamily::empty("storage_low_bound"),
            storage_up_bound: ConstraintFamily::empty("storage_up_bound"),
            output_low_bound: ConstraintFamily::empty("output_low_bound"),
            output_up_bound: ConstraintFamily::empty("output_up_bound"),
            output_calc: ConstraintFamily::empty("output_calc"),
        }
    }

    fn family_sizes(&self, sizes: &mut Vec<(&'static str, usize)>) {
        let hourly = [
            &self.outflow_calc,
            &self.inflow_calc,
            &self.water_balance,
            &self.outflow_low_bound,
            &self.outflow_up_bound,
            &self.genflow_up_bound,
            &self.storage_low_bound,
            &self.storage_up_bound,
            &self.output_low_bound,
            &self.output_up_bound,
            &self.output_calc,
        ];
        for family in hourly {
            sizes.push((family.name(), family.len()));
        }
        sizes.push((self.init_reservoir_storage.name(), self.init_reservoir_storage.len()));
        sizes.push((self.end_reservoir_storage.name(), self.end_reservoir_storage.len()));
    }
}

fn outflow_calc(sc: &StationContext, key: StationHour) -> Result<Option<Row>> {
    let outflow = sc.vars.outflow.get(&key)?;
    let genflow = sc.vars.genflow.get(&key)?;
    let spillflow = sc.vars.spillflow.get(&key)?;
    Ok(Some(constraint!((outflow - genflow - spillflow) == 0.0)))
}

/// Natural inflow plus upstream releases, shifted by the travel time
///
/// Delays are rounded down to whole periods and wrap around the horizon.
fn inflow_calc(sc: &StationContext, (s, h, m, y): StationHour) -> Result<Option<Row>> {
    let natural = sc.params.inflow.get(&(s, y, m, h))?;
    let horizon = sc.ctx.sets.num_hours();

    let mut inflow = Expr::from(sc.vars.inflow.get(&(s, h, m, y))?);
    for &(upstream, delay_hours) in &sc.params.upstream[s.index()] {
        let released = tuples::delayed_hour(h, delay_hours, sc.ctx.settings.dt, horizon);
        inflow -= sc.vars.outflow.get(&(upstream, released, m, y))?;
    }
    Ok(Some(constraint!((inflow) == natural)))
}

fn water_balance(sc: &StationContext, (s, h, m, y): StationHour) -> Result<Option<Row>> {
    let vars = sc.vars;
    let volume = SECONDS_PER_HOUR * sc.ctx.settings.dt;

    let current = vars.storage_reservoir.get(&(s, h, m, y))?;
    let previous = vars.storage_reservoir.get(&(s, h.previous(), m, y))?;

    let mut balance = current - previous;
    balance.add_term(-volume, vars.inflow.get(&(s, h, m, y))?);
    balance.add_term(volume, vars.outflow.get(&(s, h, m, y))?);
    balance.add_term(volume, vars.withdraw.get(&(s, h, m, y))?);
    Ok(Some(constraint!((balance) == 0.0)))
}

#[derive(Clone, Copy)]
enum Boundary {
    Initial,
    Final,
}

fn boundary_storage(sc: &StationContext, (s, m, y): StationMonth, boundary: Boundary) -> Result<Option<Row>> {
    let (hour, level) = match boundary {
        Boundary::Initial => (Hour::BOUNDARY, sc.params.initial_storage.get(&(s, m))?),
        Boundary::Final => (sc.ctx.sets.last_hour(), sc.params.final_storage.get(&(s, m))?),
    };
    let storage = sc.vars.storage_reservoir.get(&(s, hour, m, y))?;
    Ok(Some(constraint!((storage) == level)))
}

/// Linearised plant output at the station's design head
fn output_calc(sc: &StationContext, key: StationHour) -> Result<Option<Row>> {
    let station = sc.params.station(key.0);
    let mut expression = Expr::from(sc.vars.output.get(&key)?);
    expression.add_term(genflow_coefficient(station, station.head), sc.vars.genflow.get(&key)?);
    Ok(Some(constraint!((expression) == 0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::params::Bound;
    use crate::sets::{MonthId, YearId};
    use crate::test_helpers::{hydro_settings, hydro_system, thermal_settings};

    #[test]
    fn test_predefined_profile_without_hydrology() {
        let model = Model::build(&hydro_system(), thermal_settings()).unwrap();
        let hydro = &model.constraints.hydro;

        assert_eq!(hydro.hydro_output.len(), 2 * 2 * 3);
        assert!(hydro.station.output_calc.is_empty());
        assert!(model.vars.hydro.is_none());

        let north = model.sets.zones.id("north").unwrap();
        let key = (model.sets.first_hour(), MonthId(0), YearId(0), north);
        let row = model.builder.constraint(hydro.hydro_output.get(&key).unwrap()).unwrap();
        assert_eq!(row.rhs(), 2.0);
    }

    #[test]
    fn test_station_families_with_hydrology() {
        let model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let sets = &model.sets;
        let station = &model.constraints.hydro.station;
        let per_station = sets.num_hours() * sets.num_months() * sets.num_years();

        assert_eq!(station.output_calc.len(), 2 * per_station);
        assert_eq!(station.water_balance.len(), 2 * per_station);
        assert_eq!(
            station.init_reservoir_storage.len(),
            2 * sets.num_months() * sets.num_years()
        );
    }

    #[test]
    fn test_upstream_release_wraps_around_horizon() {
        // the 2 hour travel time reaches back from the first hour to the second
        let model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let sets = &model.sets;
        let vars = model.vars.hydro().unwrap();
        let upper = sets.stations.id("upper").unwrap();
        let lower = sets.stations.id("lower").unwrap();
        let (m, y) = (MonthId(0), YearId(0));

        let row = model
            .constraints
            .hydro
            .station
            .inflow_calc
            .get(&(lower, sets.first_hour(), m, y))
            .unwrap();
        let expression = model.builder.constraint(row).unwrap().expression();
        let released = vars.outflow.get(&(upper, Hour(2), m, y)).unwrap();
        assert_eq!(expression.coefficient_of(released), Some(-1.0));
        let same_hour = vars.outflow.get(&(upper, sets.first_hour(), m, y)).unwrap();
        assert_eq!(expression.coefficient_of(same_hour), None);
    }

    #[test]
    fn test_output_coefficient_uses_design_head() {
        let model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let upper = model.sets.stations.id("upper").unwrap();
        let key = (upper, model.sets.first_hour(), MonthId(0), YearId(0));
        let row = model.constraints.hydro.station.output_calc.get(&key).unwrap();
        let genflow = model.vars.hydro().unwrap().genflow.get(&key).unwrap();

        let station = model.params.hydro.as_ref().unwrap().station(upper);
        assert_eq!(
            model.builder.coefficient(row, genflow),
            Some(-station.coeff * 1e-3 * station.head)
        );
    }

    #[test]
    fn test_unbounded_station_limits_omit_rows() {
        let mut input = hydro_system();
        let upper = &mut input.reservoir_characteristics["upper"];
        upper.outflow_max = Bound::INFINITE;
        upper.genflow_max = Bound::INFINITE;
        upper.output_max = Bound::INFINITE;
        for row in input.reservoir_storage_upper_bound.iter_mut().filter(|row| row.0 == "upper") {
            row.3 = Bound::INFINITE;
        }

        let model = Model::build(&input, hydro_settings()).unwrap();
        let sets = &model.sets;
        let station = &model.constraints.hydro.station;
        let per_station = sets.num_hours() * sets.num_months() * sets.num_years();
        let upper = sets.stations.id("upper").unwrap();
        let lower = sets.stations.id("lower").unwrap();
        let (m, y) = (MonthId(0), YearId(0));

        for family in [
            &station.outflow_up_bound,
            &station.genflow_up_bound,
            &station.storage_up_bound,
            &station.output_up_bound,
        ] {
            assert_eq!(family.len(), per_station);
            assert!(family.get(&(upper, sets.first_hour(), m, y)).is_none());
            assert!(family.get(&(lower, sets.first_hour(), m, y)).is_some());
        }
        assert_eq!(station.outflow_low_bound.len(), 2 * per_station);
    }
}
