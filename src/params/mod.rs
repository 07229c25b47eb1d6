//! Input parameters
//!
//! [`InputParameters`] is the JSON document as written by users: every table
//! is keyed by names and labels. [`Parameters`] is the same data resolved onto
//! the dense ids of [`Sets`], which is what the constraint rules read.
//!
//! Multi-key tables are arrays of `[key..., value]` rows:
//!
//! ```json
//! {
//!   "discount_factor": {"2020": 0.05, "2030": 0.05},
//!   "technology_type": {"coal": "dispatchable", "battery": "storage"},
//!   "demand": [["north", 2020, 1, 1, 120.0], ["north", 2020, 1, 2, 95.0]],
//!   "technology_upper_bound": [["coal", "north", "inf"]]
//! }
//! ```
//!
//! Rows for years, months or hours outside the modelled sets are ignored, so
//! one input file can serve several horizons. Unknown zone, technology or
//! station names are errors.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::AppError;
use crate::hydro::rating_curve::RatingCurve;
use crate::sets::{Hour, MonthId, Sets, StationId, TechId, TechType, YearId, ZoneId};

pub mod finance;
mod table;

pub use finance::CostFactors;
pub use table::{Bound, Table};

type TechYearRows = Vec<(String, u32, f64)>;
type TechZoneRows<V> = Vec<(String, String, V)>;
type ZonePairRows = Vec<(String, String, f64)>;
type ZoneYearRows<V> = Vec<(String, u32, V)>;
type HourlyRows = Vec<(String, u32, u32, u32, f64)>;

/// Static characteristics of one hydropower station
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReservoirCharacteristics {
    pub zone: String,
    /// Output efficiency coefficient, kW per (m3/s) per m of head
    pub coeff: f64,
    pub outflow_min: f64,
    pub outflow_max: Bound,
    #[serde(alias = "GQ_max", alias = "gq_max")]
    pub genflow_max: Bound,
    #[serde(alias = "N_min", alias = "n_min")]
    pub output_min: f64,
    #[serde(alias = "N_max", alias = "n_max")]
    pub output_max: Bound,
    /// Initial head estimate, in metres
    pub head: f64,
}

/// The input document, keyed by names
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct InputParameters {
    pub technology_type: IndexMap<String, TechType>,
    /// Discount rate per modelled year; its keys define the year set
    pub discount_factor: BTreeMap<u32, f64>,
    /// `[zone, year, month, hour, MW]`
    pub demand: HourlyRows,

    /// `[zone, tech, age, MW]`
    pub historical_capacity: Vec<(String, String, u32, f64)>,
    pub lifetime: TechYearRows,
    pub technology_upper_bound: TechZoneRows<Bound>,
    pub new_technology_upper_bound: TechZoneRows<Bound>,
    pub new_technology_lower_bound: TechZoneRows<f64>,

    pub technology_investment_cost: TechYearRows,
    pub technology_fixed_om_cost: TechYearRows,
    pub technology_variable_om_cost: TechYearRows,
    pub fuel_price: TechYearRows,
    pub emission_factor: TechYearRows,

    pub ramp_up: IndexMap<String, f64>,
    pub ramp_down: IndexMap<String, f64>,
    /// `[tech, zone, year, month, hour, share]`
    pub capacity_factor: Vec<(String, String, u32, u32, u32, f64)>,

    pub charge_efficiency: TechYearRows,
    pub discharge_efficiency: TechYearRows,
    pub energy_to_power_ratio: IndexMap<String, f64>,
    pub initial_energy_storage_level: TechZoneRows<f64>,

    pub transmission_line_existing_capacity: ZonePairRows,
    pub transmission_line_efficiency: ZonePairRows,
    pub transmission_line_investment_cost: ZonePairRows,
    pub transmission_line_fixed_om_cost: ZonePairRows,
    pub transmission_line_variable_om_cost: ZonePairRows,
    pub transmission_line_lifetime: ZonePairRows,
    pub distance: ZonePairRows,

    pub carbon_emission_limit: BTreeMap<u32, Bound>,
    pub zone_carbon_emission_limit: ZoneYearRows<Bound>,

    /// `[zone, year, month, hour, MW]`, used when hydrology is disabled
    pub predefined_hydropower: HourlyRows,

    pub public_debt_ratio: IndexMap<String, f64>,
    pub public_debt_upper_bound_system: BTreeMap<u32, Bound>,
    pub public_debt_upper_bound_zone: ZoneYearRows<Bound>,

    pub reservoir_characteristics: IndexMap<String, ReservoirCharacteristics>,
    /// `[station, year, month, hour, m3/s]`
    pub inflow: HourlyRows,
    /// `[upstream, downstream, hours]`
    pub water_delay_time: Vec<(String, String, f64)>,
    /// `[station, month, hour, m3]`
    pub reservoir_storage_lower_bound: Vec<(String, u32, u32, f64)>,
    pub reservoir_storage_upper_bound: Vec<(String, u32, u32, Bound)>,
    /// `[station, month, m3]`
    pub initial_reservoir_storage_level: Vec<(String, u32, f64)>,
    pub final_reservoir_storage_level: Vec<(String, u32, f64)>,
    /// Outflow (m3/s) to tailrace level (m) points per station
    pub reservoir_tailrace_level_discharge_function: IndexMap<String, Vec<(f64, f64)>>,
    /// Storage (m3) to forebay level (m) points per station
    pub reservoir_forebay_level_volume_function: IndexMap<String, Vec<(f64, f64)>>,
}

/// Names of the tables an input document may contain
pub const TABLE_NAMES: &[&str] = &[
    "technology_type",
    "discount_factor",
    "demand",
    "historical_capacity",
    "lifetime",
    "technology_upper_bound",
    "new_technology_upper_bound",
    "new_technology_lower_bound",
    "technology_investment_cost",
    "technology_fixed_om_cost",
    "technology_variable_om_cost",
    "fuel_price",
    "emission_factor",
    "ramp_up",
    "ramp_down",
    "capacity_factor",
    "charge_efficiency",
    "discharge_efficiency",
    "energy_to_power_ratio",
    "initial_energy_storage_level",
    "transmission_line_existing_capacity",
    "transmission_line_efficiency",
    "transmission_line_investment_cost",
    "transmission_line_fixed_om_cost",
    "transmission_line_variable_om_cost",
    "transmission_line_lifetime",
    "distance",
    "carbon_emission_limit",
    "zone_carbon_emission_limit",
    "predefined_hydropower",
    "public_debt_ratio",
    "public_debt_upper_bound_system",
    "public_debt_upper_bound_zone",
    "reservoir_characteristics",
    "inflow",
    "water_delay_time",
    "reservoir_storage_lower_bound",
    "reservoir_storage_upper_bound",
    "initial_reservoir_storage_level",
    "final_reservoir_storage_level",
    "reservoir_tailrace_level_discharge_function",
    "reservoir_forebay_level_volume_function",
];

/// One `--scenario key=value` replacement of an input table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOverride {
    pub table: String,
    pub value: String,
}

impl ScenarioOverride {
    /// `<input_dir>/<table>_<value>.json`
    pub fn source(&self, input_dir: &Path) -> PathBuf {
        input_dir.join(format!("{}_{}.json", self.table, self.value))
    }

    /// Suffix appended to output file stems, `_<table>_<value>`
    pub fn suffix(&self) -> String {
        format!("_{}_{}", self.table, self.value)
    }
}

impl std::str::FromStr for ScenarioOverride {
    type Err = AppError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::InvalidConfig(format!("scenario `{text}` is not of the form key=value"));
        let (table, value) = text.split_once('=').ok_or_else(invalid)?;
        let (table, value) = (table.trim(), value.trim());
        if table.is_empty() || value.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            table: table.to_string(),
            value: value.to_string(),
        })
    }
}

impl InputParameters {
    /// Load the input document, swapping in scenario tables first
    pub fn from_path(path: &Path, overrides: &[ScenarioOverride]) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input parameters {}", path.display()))?;
        let mut document: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse input parameters {}", path.display()))?;

        let input_dir = path.parent().unwrap_or_else(|| Path::new("."));
        for scenario in overrides {
            if !TABLE_NAMES.contains(&scenario.table.as_str()) {
                return Err(AppError::InvalidConfig(format!(
                    "scenario refers to unknown input table `{}`",
                    scenario.table
                ))
                .into());
            }
            let source = scenario.source(input_dir);
            let text = fs::read_to_string(&source)
                .with_context(|| format!("Failed to read scenario table {}", source.display()))?;
            let table: serde_json::Value = serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse scenario table {}", source.display()))?;
            tracing::info!("Scenario {}={} from {}", scenario.table, scenario.value, source.display());
            document.insert(scenario.table.clone(), table);
        }

        serde_json::from_value(serde_json::Value::Object(document))
            .with_context(|| format!("Invalid input parameters in {}", path.display()))
    }
}

/// Static characteristics of a station, resolved onto dense ids
#[derive(Debug, Clone, Copy)]
pub struct Station {
    pub zone: ZoneId,
    pub coeff: f64,
    pub outflow_min: f64,
    pub outflow_max: Bound,
    pub genflow_max: Bound,
    pub output_min: f64,
    pub output_max: Bound,
    pub head: f64,
}

/// Station-level tables, present only when hydrology is enabled
#[derive(Debug, Clone)]
pub struct HydroParameters {
    pub stations: Vec<Station>,
    pub inflow: Table<(StationId, YearId, MonthId, Hour), f64>,
    /// Upstream stations and their delay in hours, per downstream station
    pub upstream: Vec<Vec<(StationId, f64)>>,
    pub storage_lower_bound: Table<(StationId, MonthId, Hour), f64>,
    pub storage_upper_bound: Table<(StationId, MonthId, Hour), Bound>,
    pub initial_storage: Table<(StationId, MonthId), f64>,
    pub final_storage: Table<(StationId, MonthId), f64>,
    pub tailrace: Vec<RatingCurve>,
    pub forebay: Vec<RatingCurve>,
}

impl HydroParameters {
    pub fn station(&self, s: StationId) -> &Station {
        &self.stations[s.index()]
    }
}

/// Every table of the model, keyed by dense ids
#[derive(Debug, Clone)]
pub struct Parameters {
    pub discount_rate: Table<YearId, f64>,
    pub demand: Table<(ZoneId, YearId, MonthId, Hour), f64>,

    pub historical_capacity: Table<(ZoneId, TechId, u32), f64>,
    pub lifetime: Table<(TechId, YearId), f64>,
    pub technology_upper_bound: Table<(TechId, ZoneId), Bound>,
    pub new_technology_upper_bound: Table<(TechId, ZoneId), Bound>,
    pub new_technology_lower_bound: Table<(TechId, ZoneId), f64>,

    pub investment_cost: Table<(TechId, YearId), f64>,
    pub fixed_om_cost: Table<(TechId, YearId), f64>,
    pub variable_om_cost: Table<(TechId, YearId), f64>,
    pub fuel_price: Table<(TechId, YearId), f64>,
    pub emission_factor: Table<(TechId, YearId), f64>,

    pub ramp_up: Table<TechId, f64>,
    pub ramp_down: Table<TechId, f64>,
    pub capacity_factor: Table<(TechId, ZoneId, YearId, MonthId, Hour), f64>,

    pub charge_efficiency: Table<(TechId, YearId), f64>,
    pub discharge_efficiency: Table<(TechId, YearId), f64>,
    pub energy_to_power_ratio: Table<TechId, f64>,
    pub initial_energy_storage_level: Table<(TechId, ZoneId), f64>,

    pub line_existing_capacity: Table<(ZoneId, ZoneId), f64>,
    pub line_efficiency: Table<(ZoneId, ZoneId), f64>,
    pub line_investment_cost: Table<(ZoneId, ZoneId), f64>,
    pub line_fixed_om_cost: Table<(ZoneId, ZoneId), f64>,
    pub line_variable_om_cost: Table<(ZoneId, ZoneId), f64>,
    pub line_lifetime: Table<(ZoneId, ZoneId), f64>,
    pub distance: Table<(ZoneId, ZoneId), f64>,

    pub carbon_emission_limit: Table<YearId, Bound>,
    pub zone_carbon_emission_limit: Table<(ZoneId, YearId), Bound>,
    pub predefined_hydropower: Table<(ZoneId, YearId, MonthId, Hour), f64>,

    pub public_debt_ratio: Table<TechId, f64>,
    pub public_debt_upper_bound_system: Table<YearId, Bound>,
    pub public_debt_upper_bound_zone: Table<(ZoneId, YearId), Bound>,

    pub hydro: Option<HydroParameters>,
}

/// Name and label resolution against the built sets
struct Resolver<'a> {
    sets: &'a Sets,
}

impl Resolver<'_> {
    fn per_year<V: Copy>(&self, name: &'static str, map: &BTreeMap<u32, V>) -> Table<YearId, V> {
        let mut table = Table::new(name);
        for (&year, &value) in map {
            if let Some(y) = self.sets.year_id(year) {
                table.insert(y, value);
            }
        }
        table
    }

    fn per_tech(&self, name: &'static str, map: &IndexMap<String, f64>) -> Result<Table<TechId, f64>> {
        let mut table = Table::new(name);
        for (tech, &value) in map {
            table.insert(self.sets.techs.id(tech)?, value);
        }
        Ok(table)
    }

    fn tech_year(&self, name: &'static str, rows: &[(String, u32, f64)]) -> Result<Table<(TechId, YearId), f64>> {
        let mut table = Table::new(name);
        for (tech, year, value) in rows {
            let te = self.sets.techs.id(tech)?;
            if let Some(y) = self.sets.year_id(*year) {
                table.insert((te, y), *value);
            }
        }
        Ok(table)
    }

    fn tech_zone<V: Copy>(
        &self,
        name: &'static str,
        rows: &[(String, String, V)],
    ) -> Result<Table<(TechId, ZoneId), V>> {
        let mut table = Table::new(name);
        for (tech, zone, value) in rows {
            table.insert((self.sets.techs.id(tech)?, self.sets.zones.id(zone)?), *value);
        }
        Ok(table)
    }

    fn zone_pair(&self, name: &'static str, rows: &[(String, String, f64)]) -> Result<Table<(ZoneId, ZoneId), f64>> {
        let mut table = Table::new(name);
        for (from, to, value) in rows {
            table.insert((self.sets.zones.id(from)?, self.sets.zones.id(to)?), *value);
        }
        Ok(table)
    }

    fn zone_year<V: Copy>(
        &self,
        name: &'static str,
        rows: &[(String, u32, V)],
    ) -> Result<Table<(ZoneId, YearId), V>> {
        let mut table = Table::new(name);
        for (zone, year, value) in rows {
            let z = self.sets.zones.id(zone)?;
            if let Some(y) = self.sets.year_id(*year) {
                table.insert((z, y), *value);
            }
        }
        Ok(table)
    }

    fn zone_hourly(
        &self,
        name: &'static str,
        rows: &[(String, u32, u32, u32, f64)],
    ) -> Result<Table<(ZoneId, YearId, MonthId, Hour), f64>> {
        let mut table = Table::new(name);
        for (zone, year, month, hour, value) in rows {
            let z = self.sets.zones.id(zone)?;
            if let Some(key) = self.time(*year, *month, *hour) {
                table.insert((z, key.0, key.1, key.2), *value);
            }
        }
        Ok(table)
    }

    fn storage_bound<V: Copy>(
        &self,
        name: &'static str,
        rows: &[(String, u32, u32, V)],
    ) -> Result<Table<(StationId, MonthId, Hour), V>> {
        let mut table = Table::new(name);
        for (station, month, hour, value) in rows {
            let s = self.sets.stations.id(station)?;
            if let (Some(m), Some(h)) = (self.sets.month_id(*month), self.sets.hour_id(*hour)) {
                table.insert((s, m, h), *value);
            }
        }
        Ok(table)
    }

    fn time(&self, year: u32, month: u32, hour: u32) -> Option<(YearId, MonthId, Hour)> {
        Some((
            self.sets.year_id(year)?,
            self.sets.month_id(month)?,
            self.sets.hour_id(hour)?,
        ))
    }

    fn hydro(&self, input: &InputParameters) -> Result<HydroParameters> {
        let sets = self.sets;
        let stations = input
            .reservoir_characteristics
            .values()
            .map(|station| {
                Ok(Station {
                    zone: sets.zones.id(&station.zone)?,
                    coeff: station.coeff,
                    outflow_min: station.outflow_min,
                    outflow_max: station.outflow_max,
                    genflow_max: station.genflow_max,
                    output_min: station.output_min,
                    output_max: station.output_max,
                    head: station.head,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut inflow = Table::new("inflow");
        for (station, year, month, hour, value) in &input.inflow {
            let s = sets.stations.id(station)?;
            if let Some((y, m, h)) = self.time(*year, *month, *hour) {
                inflow.insert((s, y, m, h), *value);
            }
        }

        let monthly_level = |name: &'static str, rows: &[(String, u32, f64)]| -> Result<_> {
            let mut table = Table::new(name);
            for (station, month, value) in rows {
                let s = sets.stations.id(station)?;
                if let Some(m) = sets.month_id(*month) {
                    table.insert((s, m), *value);
                }
            }
            Ok(table)
        };

        let mut upstream = vec![Vec::new(); stations.len()];
        let mut topology: DiGraph<StationId, f64> = DiGraph::new();
        let nodes: Vec<NodeIndex> = sets.stations.ids().map(|s| topology.add_node(s)).collect();
        for (up, down, delay) in &input.water_delay_time {
            let (up, down) = (sets.stations.id(up)?, sets.stations.id(down)?);
            if !(delay.is_finite() && *delay >= 0.0) {
                return Err(AppError::InvalidConfig(format!(
                    "water delay from {} to {} must be non-negative, got {delay}",
                    sets.stations.name(up),
                    sets.stations.name(down)
                ))
                .into());
            }
            upstream[down.index()].push((up, *delay));
            topology.add_edge(nodes[up.index()], nodes[down.index()], *delay);
        }
        if let Err(cycle) = petgraph::algo::toposort(&topology, None) {
            let station = topology[cycle.node_id()];
            return Err(AppError::InvalidConfig(format!(
                "river topology has a cycle through station {}",
                sets.stations.name(station)
            ))
            .into());
        }

        let curves = |name: &'static str, map: &IndexMap<String, Vec<(f64, f64)>>| -> Result<Vec<RatingCurve>> {
            sets.stations
                .ids()
                .map(|s| {
                    let station = sets.stations.name(s);
                    let points = map.get(station).ok_or_else(|| AppError::MissingParameter {
                        table: name,
                        key: station.to_string(),
                    })?;
                    RatingCurve::new(points).with_context(|| format!("Invalid {name} for station {station}"))
                })
                .collect()
        };

        Ok(HydroParameters {
            stations,
            inflow,
            upstream,
            storage_lower_bound: self.storage_bound(
                "reservoir_storage_lower_bound",
                &input.reservoir_storage_lower_bound,
            )?,
            storage_upper_bound: self.storage_bound(
                "reservoir_storage_upper_bound",
                &input.reservoir_storage_upper_bound,
            )?,
            initial_storage: monthly_level(
                "initial_reservoir_storage_level",
                &input.initial_reservoir_storage_level,
            )?,
            final_storage: monthly_level(
                "final_reservoir_storage_level",
                &input.final_reservoir_storage_level,
            )?,
            tailrace: curves(
                "reservoir_tailrace_level_discharge_function",
                &input.reservoir_tailrace_level_discharge_function,
            )?,
            forebay: curves(
                "reservoir_forebay_level_volume_function",
                &input.reservoir_forebay_level_volume_function,
            )?,
        })
    }
}

impl Parameters {
    /// Resolve the input document onto `sets`
    ///
    /// Station tables are only read when `hydrology` is set.
    pub fn resolve(input: &InputParameters, sets: &Sets, hydrology: bool) -> Result<Self> {
        let r = Resolver { sets };

        let mut historical_capacity = Table::new("historical_capacity");
        for (zone, tech, age, value) in &input.historical_capacity {
            historical_capacity.insert((sets.zones.id(zone)?, sets.techs.id(tech)?, *age), *value);
        }

        let mut capacity_factor = Table::new("capacity_factor");
        for (tech, zone, year, month, hour, value) in &input.capacity_factor {
            let (te, z) = (sets.techs.id(tech)?, sets.zones.id(zone)?);
            if let Some((y, m, h)) = r.time(*year, *month, *hour) {
                capacity_factor.insert((te, z, y, m, h), *value);
            }
        }

        let hydro = if hydrology {
            if sets.stations.is_empty() {
                return Err(AppError::MissingTable("reservoir_characteristics").into());
            }
            Some(r.hydro(input)?)
        } else {
            None
        };

        Ok(Self {
            discount_rate: r.per_year("discount_factor", &input.discount_factor),
            demand: r.zone_hourly("demand", &input.demand)?,
            historical_capacity,
            lifetime: r.tech_year("lifetime", &input.lifetime)?,
            technology_upper_bound: r.tech_zone("technology_upper_bound", &input.technology_upper_bound)?,
            new_technology_upper_bound: r.tech_zone(
                "new_technology_upper_bound",
                &input.new_technology_upper_bound,
            )?,
            new_technology_lower_bound: r.tech_zone(
                "new_technology_lower_bound",
                &input.new_technology_lower_bound,
            )?,
            investment_cost: r.tech_year("technology_investment_cost", &input.technology_investment_cost)?,
            fixed_om_cost: r.tech_year("technology_fixed_om_cost", &input.technology_fixed_om_cost)?,
            variable_om_cost: r.tech_year("technology_variable_om_cost", &input.technology_variable_om_cost)?,
            fuel_price: r.tech_year("fuel_price", &input.fuel_price)?,
            emission_factor: r.tech_year("emission_factor", &input.emission_factor)?,
            ramp_up: r.per_tech("ramp_up", &input.ramp_up)?,
            ramp_down: r.per_tech("ramp_down", &input.ramp_down)?,
            capacity_factor,
            charge_efficiency: r.tech_year("charge_efficiency", &input.charge_efficiency)?,
            discharge_efficiency: r.tech_year("discharge_efficiency", &input.discharge_efficiency)?,
            energy_to_power_ratio: r.per_tech("energy_to_power_ratio", &input.energy_to_power_ratio)?,
            initial_energy_storage_level: r.tech_zone(
                "initial_energy_storage_level",
                &input.initial_energy_storage_level,
            )?,
            line_existing_capacity: r.zone_pair(
                "transmission_line_existing_capacity",
                &input.transmission_line_existing_capacity,
            )?,
            line_efficiency: r.zone_pair("transmission_line_efficiency", &input.transmission_line_efficiency)?,
            line_investment_cost: r.zone_pair(
                "transmission_line_investment_cost",
                &input.transmission_line_investment_cost,
            )?,
            line_fixed_om_cost: r.zone_pair(
                "transmission_line_fixed_om_cost",
                &input.transmission_line_fixed_om_cost,
            )?,
            line_variable_om_cost: r.zone_pair(
                "transmission_line_variable_om_cost",
                &input.transmission_line_variable_om_cost,
            )?,
            line_lifetime: r.zone_pair("transmission_line_lifetime", &input.transmission_line_lifetime)?,
            distance: r.zone_pair("distance", &input.distance)?,
            carbon_emission_limit: r.per_year("carbon_emission_limit", &input.carbon_emission_limit),
            zone_carbon_emission_limit: r.zone_year(
                "zone_carbon_emission_limit",
                &input.zone_carbon_emission_limit,
            )?,
            predefined_hydropower: r.zone_hourly("predefined_hydropower", &input.predefined_hydropower)?,
            public_debt_ratio: r.per_tech("public_debt_ratio", &input.public_debt_ratio)?,
            public_debt_upper_bound_system: r.per_year(
                "public_debt_upper_bound_system",
                &input.public_debt_upper_bound_system,
            ),
            public_debt_upper_bound_zone: r.zone_year(
                "public_debt_upper_bound_zone",
                &input.public_debt_upper_bound_zone,
            )?,
            hydro,
        })
    }
}

impl Parameters {
    /// Pre-horizon capacity of `(z, te)` younger than `remaining_years`
    ///
    /// Cohorts are keyed by age in years; absent cohorts count as zero.
    pub fn surviving_historical_capacity(&self, z: ZoneId, te: TechId, remaining_years: f64) -> f64 {
        self.historical_capacity
            .iter()
            .filter(|((zone, tech, age), _)| *zone == z && *tech == te && f64::from(*age) < remaining_years)
            .map(|(_, capacity)| capacity)
            .sum()
    }
}
