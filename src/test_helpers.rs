//! Small input systems shared by the unit tests.
//!
//! Every fixture is complete: it builds into a model without missing
//! parameters. Tests mutate the returned document to exercise edge cases.
//!
//! - [`thermal_system`]: zones `north` and `south`, years 2020 and 2030, one
//!   month of three hours and a single `coal` technology.
//! - [`storage_system`]: the thermal system plus a `battery` and a
//!   transmission corridor in both directions.
//! - [`hydro_system`]: the thermal system plus a `hydro` technology and two
//!   stations, `upper` draining into `lower` with a 2 hour delay.
//! - [`three_year_system`]: one zone over 2020, 2025 and 2030 with a 10 year
//!   lifetime and twelve 1 MW historical cohorts aged 0 to 11.

use indexmap::IndexMap;

use crate::config::ModelSettings;
use crate::params::{Bound, InputParameters, ReservoirCharacteristics};
use crate::sets::TechType;

const HOURS: [u32; 3] = [1, 2, 3];
const MONTH: u32 = 1;

pub fn thermal_settings() -> ModelSettings {
    ModelSettings {
        dt: 1.0,
        weight: f64::from(MONTH) * HOURS.len() as f64 / 8760.0,
        price: 0.0,
        hydrology: false,
    }
}

pub fn hydro_settings() -> ModelSettings {
    ModelSettings {
        price: 0.1,
        hydrology: true,
        ..thermal_settings()
    }
}

fn demand_rows(zones: &[(&str, [f64; 3])], years: &[u32]) -> Vec<(String, u32, u32, u32, f64)> {
    let mut rows = Vec::new();
    for &(zone, profile) in zones {
        for &year in years {
            for (hour, demand) in HOURS.iter().zip(profile) {
                rows.push((zone.to_string(), year, MONTH, *hour, demand));
            }
        }
    }
    rows
}

fn zones(input: &InputParameters) -> Vec<String> {
    let mut zones: Vec<String> = Vec::new();
    for (zone, ..) in &input.demand {
        if !zones.contains(zone) {
            zones.push(zone.clone());
        }
    }
    zones
}

/// Add unbounded, cheap, emission-free entries for `tech` to every
/// per-technology table the model reads
pub fn fill_tech_tables(input: &mut InputParameters, tech: &str) {
    let years: Vec<u32> = input.discount_factor.keys().copied().collect();
    for year in years {
        input.lifetime.push((tech.to_string(), year, 20.0));
        input.technology_investment_cost.push((tech.to_string(), year, 500.0));
        input.technology_fixed_om_cost.push((tech.to_string(), year, 10.0));
        input.technology_variable_om_cost.push((tech.to_string(), year, 1.0));
        input.fuel_price.push((tech.to_string(), year, 0.0));
        input.emission_factor.push((tech.to_string(), year, 0.0));
    }
    for zone in zones(input) {
        input
            .technology_upper_bound
            .push((tech.to_string(), zone.clone(), Bound::INFINITE));
        input
            .new_technology_upper_bound
            .push((tech.to_string(), zone.clone(), Bound::INFINITE));
        input.new_technology_lower_bound.push((tech.to_string(), zone, 0.0));
    }
    input.ramp_up.insert(tech.to_string(), 1.0);
    input.ramp_down.insert(tech.to_string(), 1.0);
}

pub fn thermal_system() -> InputParameters {
    let years = [2020, 2030];
    let mut input = InputParameters {
        technology_type: IndexMap::from([("coal".to_string(), TechType::Dispatchable)]),
        discount_factor: years.iter().map(|&year| (year, 0.05)).collect(),
        demand: demand_rows(&[("north", [8.0, 10.0, 12.0]), ("south", [5.0, 6.0, 7.0])], &years),
        historical_capacity: vec![
            ("north".to_string(), "coal".to_string(), 5, 20.0),
            ("south".to_string(), "coal".to_string(), 10, 10.0),
        ],
        carbon_emission_limit: years.iter().map(|&year| (year, Bound::INFINITE)).collect(),
        ..InputParameters::default()
    };

    fill_tech_tables(&mut input, "coal");
    for row in &mut input.lifetime {
        row.2 = 30.0;
    }
    for row in &mut input.technology_investment_cost {
        row.2 = 1000.0;
    }
    for row in &mut input.technology_fixed_om_cost {
        row.2 = 20.0;
    }
    for row in &mut input.technology_variable_om_cost {
        row.2 = 2.0;
    }
    for row in &mut input.fuel_price {
        row.2 = 30.0;
    }
    for row in &mut input.emission_factor {
        row.2 = 0.8;
    }
    input
}

pub fn storage_system() -> InputParameters {
    let mut input = thermal_system();
    input
        .technology_type
        .insert("battery".to_string(), TechType::Storage);
    fill_tech_tables(&mut input, "battery");

    for year in [2020, 2030] {
        input.charge_efficiency.push(("battery".to_string(), year, 0.9));
        input.discharge_efficiency.push(("battery".to_string(), year, 0.9));
    }
    input.energy_to_power_ratio.insert("battery".to_string(), 4.0);
    for zone in ["north", "south"] {
        input
            .initial_energy_storage_level
            .push(("battery".to_string(), zone.to_string(), 0.5));
    }

    for (from, to) in [("north", "south"), ("south", "north")] {
        let pair = |value: f64| (from.to_string(), to.to_string(), value);
        input.transmission_line_existing_capacity.push(pair(5.0));
        input.transmission_line_efficiency.push(pair(0.9));
        input.transmission_line_investment_cost.push(pair(100.0));
        input.transmission_line_fixed_om_cost.push(pair(1.0));
        input.transmission_line_variable_om_cost.push(pair(0.1));
        input.transmission_line_lifetime.push(pair(40.0));
        input.distance.push(pair(100.0));
    }
    input
}

pub fn hydro_system() -> InputParameters {
    let mut input = thermal_system();
    input.technology_type.insert("hydro".to_string(), TechType::Hydro);
    fill_tech_tables(&mut input, "hydro");
    input.predefined_hydropower = input
        .demand
        .iter()
        .map(|(zone, year, month, hour, _)| (zone.clone(), *year, *month, *hour, 2.0))
        .collect();

    let station = |head: f64| ReservoirCharacteristics {
        zone: "north".to_string(),
        coeff: 8.5,
        outflow_min: 0.0,
        outflow_max: Bound::finite(1000.0),
        genflow_max: Bound::finite(500.0),
        output_min: 0.0,
        output_max: Bound::finite(100.0),
        head,
    };
    input.reservoir_characteristics = IndexMap::from([
        ("upper".to_string(), station(50.0)),
        ("lower".to_string(), station(30.0)),
    ]);

    for (name, natural) in [("upper", 100.0), ("lower", 20.0)] {
        for year in [2020, 2030] {
            for hour in HOURS {
                input.inflow.push((name.to_string(), year, MONTH, hour, natural));
            }
        }
        for hour in HOURS {
            input
                .reservoir_storage_lower_bound
                .push((name.to_string(), MONTH, hour, 0.0));
            input
                .reservoir_storage_upper_bound
                .push((name.to_string(), MONTH, hour, Bound::finite(1e8)));
        }
        input
            .initial_reservoir_storage_level
            .push((name.to_string(), MONTH, 1e6));
        input
            .final_reservoir_storage_level
            .push((name.to_string(), MONTH, 1e6));
    }
    input
        .water_delay_time
        .push(("upper".to_string(), "lower".to_string(), 2.0));

    input.reservoir_tailrace_level_discharge_function = IndexMap::from([
        ("upper".to_string(), vec![(0.0, 100.0), (1000.0, 102.0)]),
        ("lower".to_string(), vec![(0.0, 50.0), (1000.0, 51.0)]),
    ]);
    input.reservoir_forebay_level_volume_function = IndexMap::from([
        ("upper".to_string(), vec![(0.0, 150.0), (1e8, 160.0)]),
        ("lower".to_string(), vec![(0.0, 80.0), (1e8, 85.0)]),
    ]);
    input
}

pub fn three_year_system() -> InputParameters {
    let years = [2020, 2025, 2030];
    let mut input = InputParameters {
        technology_type: IndexMap::from([("coal".to_string(), TechType::Dispatchable)]),
        discount_factor: years.iter().map(|&year| (year, 0.05)).collect(),
        demand: demand_rows(&[("north", [8.0, 10.0, 12.0])], &years),
        historical_capacity: (0..=11)
            .map(|age| ("north".to_string(), "coal".to_string(), age, 1.0))
            .collect(),
        carbon_emission_limit: years.iter().map(|&year| (year, Bound::INFINITE)).collect(),
        ..InputParameters::default()
    };
    fill_tech_tables(&mut input, "coal");
    for row in &mut input.lifetime {
        row.2 = 10.0;
    }
    input
}
