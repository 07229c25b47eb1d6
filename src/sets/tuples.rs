//! Compound index tuples
//!
//! Every constraint family iterates one of these domains. Tuples are plain
//! Cartesian products of the primitive sets, except the zone-pair domains
//! which only contain declared transmission corridors.

use itertools::iproduct;

use super::{Hour, MonthId, Sets, StationId, TechId, YearId, ZoneId};

pub type YearZoneTech = (YearId, ZoneId, TechId);
pub type YearPair = (YearId, ZoneId, ZoneId);
pub type HourlyZone = (Hour, MonthId, YearId, ZoneId);
pub type HourlyTech = (Hour, MonthId, YearId, ZoneId, TechId);
pub type HourlyPair = (Hour, MonthId, YearId, ZoneId, ZoneId);
pub type MonthlyTech = (MonthId, YearId, ZoneId, TechId);
pub type StationHour = (StationId, Hour, MonthId, YearId);
pub type StationMonth = (StationId, MonthId, YearId);

pub fn year_zone(sets: &Sets) -> impl Iterator<Item = (YearId, ZoneId)> + '_ {
    iproduct!(sets.year_ids(), sets.zones.ids())
}

pub fn year_zone_tech(sets: &Sets) -> impl Iterator<Item = YearZoneTech> + '_ {
    iproduct!(sets.year_ids(), sets.zones.ids(), sets.techs.ids())
}

/// Years crossed with existing corridors only
pub fn year_pairs(sets: &Sets) -> impl Iterator<Item = YearPair> + '_ {
    iproduct!(sets.year_ids(), sets.transmission_pairs().iter().copied())
        .map(|(y, (z, z1))| (y, z, z1))
}

pub fn hourly_zone(sets: &Sets) -> impl Iterator<Item = HourlyZone> + '_ {
    iproduct!(sets.hours(), sets.month_ids(), sets.year_ids(), sets.zones.ids())
}

/// Hourly tuples restricted to `techs`
pub fn hourly_tech<'a>(sets: &'a Sets, techs: &'a [TechId]) -> impl Iterator<Item = HourlyTech> + 'a {
    iproduct!(
        sets.hours(),
        sets.month_ids(),
        sets.year_ids(),
        sets.zones.ids(),
        techs.iter().copied()
    )
}

/// Hourly tuples over every technology
pub fn hourly_all_tech(sets: &Sets) -> impl Iterator<Item = HourlyTech> + '_ {
    iproduct!(
        sets.hours(),
        sets.month_ids(),
        sets.year_ids(),
        sets.zones.ids(),
        sets.techs.ids()
    )
}

/// Like [`hourly_tech`] but including the boundary period
pub fn hourly_p_tech<'a>(sets: &'a Sets, techs: &'a [TechId]) -> impl Iterator<Item = HourlyTech> + 'a {
    iproduct!(
        sets.hour_p(),
        sets.month_ids(),
        sets.year_ids(),
        sets.zones.ids(),
        techs.iter().copied()
    )
}

pub fn monthly_tech<'a>(sets: &'a Sets, techs: &'a [TechId]) -> impl Iterator<Item = MonthlyTech> + 'a {
    iproduct!(
        sets.month_ids(),
        sets.year_ids(),
        sets.zones.ids(),
        techs.iter().copied()
    )
}

pub fn hourly_pairs(sets: &Sets) -> impl Iterator<Item = HourlyPair> + '_ {
    iproduct!(
        sets.hours(),
        sets.month_ids(),
        sets.year_ids(),
        sets.transmission_pairs().iter().copied()
    )
    .map(|(h, m, y, (z, z1))| (h, m, y, z, z1))
}

pub fn station_hour(sets: &Sets) -> impl Iterator<Item = StationHour> + '_ {
    iproduct!(sets.stations.ids(), sets.hours(), sets.month_ids(), sets.year_ids())
}

pub fn station_hour_p(sets: &Sets) -> impl Iterator<Item = StationHour> + '_ {
    iproduct!(sets.stations.ids(), sets.hour_p(), sets.month_ids(), sets.year_ids())
}

pub fn station_month(sets: &Sets) -> impl Iterator<Item = StationMonth> + '_ {
    iproduct!(sets.stations.ids(), sets.month_ids(), sets.year_ids())
}

/// Hour that lies `delay_hours` before `hour`, wrapping around the horizon
///
/// The delay is rounded down to whole periods of `dt` hours and reduced
/// modulo `horizon` while still a float, so any finite delay maps back into
/// `Hour(1)..=Hour(horizon)`.
pub fn delayed_hour(hour: Hour, delay_hours: f64, dt: f64, horizon: usize) -> Hour {
    debug_assert!(hour.0 >= 1 && hour.0 <= horizon);
    let periods = (delay_hours / dt).floor().rem_euclid(horizon as f64) as usize % horizon;
    Hour((hour.0 - 1 + horizon - periods) % horizon + 1)
}
