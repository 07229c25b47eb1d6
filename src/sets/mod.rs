//! Index sets of the planning model
//!
//! Every entity gets a dense integer id at set-up time. Names only survive in
//! the [`NameTable`]s, which are consulted when reading inputs and writing
//! results; everything in between works with the ids.
//!
//! Hours are the one irregular dimension: the model needs a boundary period in
//! front of each month for storage continuity. [`Hour`] therefore indexes the
//! extended sequence `hour_p`, where `Hour(0)` is the boundary and
//! `Hour(1)..=Hour(H)` are the modelled hours in ascending label order.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use anyhow::Result;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use string_cache::DefaultAtom;

use crate::AppError;
use crate::params::InputParameters;

pub mod tuples;

/// Interned entity name
pub type Name = DefaultAtom;

macro_rules! dense_id {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {$(
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl From<usize> for $name {
            fn from(index: usize) -> Self {
                $name(index)
            }
        }

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    )*};
}

dense_id! {
    /// Position of a modelled year
    YearId,
    /// Position of a modelled month
    MonthId,
    /// Position in `hour_p`; `Hour(0)` is the boundary period
    Hour,
    ZoneId,
    TechId,
    StationId,
}

impl Hour {
    /// The boundary period in front of the first modelled hour
    pub const BOUNDARY: Hour = Hour(0);

    pub fn previous(self) -> Hour {
        Hour(self.0.saturating_sub(1))
    }
}

/// Technology classification driving which constraint families apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TechType {
    Dispatchable,
    Nondispatchable,
    Storage,
    Hydro,
}

impl fmt::Display for TechType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TechType::Dispatchable => "dispatchable",
            TechType::Nondispatchable => "nondispatchable",
            TechType::Storage => "storage",
            TechType::Hydro => "hydro",
        };
        f.write_str(name)
    }
}

/// Bidirectional map between names and dense ids
#[derive(Debug, Clone)]
pub struct NameTable<Id> {
    kind: &'static str,
    names: Vec<Name>,
    ids: HashMap<Name, Id>,
}

impl<Id: Copy + From<usize> + Into<usize>> NameTable<Id> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            names: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Id of `name`, allocating the next one if it is new
    pub fn intern(&mut self, name: &str) -> Id {
        let name = Name::from(name);
        if let Some(&id) = self.ids.get(&name) {
            return id;
        }
        let id = Id::from(self.names.len());
        self.names.push(name.clone());
        self.ids.insert(name, id);
        id
    }

    /// Id of a name that must already be known
    pub fn id(&self, name: &str) -> Result<Id> {
        self.ids.get(&Name::from(name)).copied().ok_or_else(|| {
            AppError::UnknownName {
                kind: self.kind,
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn name(&self, id: Id) -> &str {
        &self.names[id.into()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + Clone + '_ {
        (0..self.names.len()).map(Id::from)
    }
}

macro_rules! into_usize {
    ($($name:ident),*) => {$(
        impl From<$name> for usize {
            fn from(id: $name) -> usize {
                id.0
            }
        }
    )*};
}

into_usize!(YearId, MonthId, Hour, ZoneId, TechId, StationId);

/// All index sets of one model instance
#[derive(Debug, Clone)]
pub struct Sets {
    years: Vec<u32>,
    months: Vec<u32>,
    hours: Vec<u32>,
    pub zones: NameTable<ZoneId>,
    pub techs: NameTable<TechId>,
    pub stations: NameTable<StationId>,
    tech_types: Vec<TechType>,
    storage_tech: Vec<TechId>,
    nondispatchable_tech: Vec<TechId>,
    dispatchable_tech: Vec<TechId>,
    hydro_tech: Vec<TechId>,
    transmission_pairs: Vec<(ZoneId, ZoneId)>,
    pair_lookup: HashSet<(ZoneId, ZoneId)>,
}

impl Sets {
    /// Derive every index set from the loaded parameters
    ///
    /// Stations are only registered when `hydrology` is enabled, so a model
    /// without hydrology never sees station-level families.
    pub fn build(input: &InputParameters, hydrology: bool) -> Result<Self> {
        let years: Vec<u32> = input.discount_factor.keys().copied().collect();

        let mut zones = NameTable::new("zone");
        let mut months = IndexSet::new();
        let mut hours = IndexSet::new();
        for (zone, _year, month, hour, _value) in &input.demand {
            zones.intern(zone);
            months.insert(*month);
            hours.insert(*hour);
        }
        let mut months: Vec<u32> = months.into_iter().collect();
        let mut hours: Vec<u32> = hours.into_iter().collect();
        months.sort_unstable();
        hours.sort_unstable();

        let mut techs = NameTable::new("technology");
        let mut tech_types = Vec::with_capacity(input.technology_type.len());
        for (tech, &tech_type) in &input.technology_type {
            techs.intern(tech);
            tech_types.push(tech_type);
        }

        let mut stations = NameTable::new("station");
        if hydrology {
            for station in input.reservoir_characteristics.keys() {
                stations.intern(station);
            }
        }

        for (kind, empty) in [
            ("year", years.is_empty()),
            ("zone", zones.is_empty()),
            ("month", months.is_empty()),
            ("hour", hours.is_empty()),
            ("technology", techs.is_empty()),
        ] {
            if empty {
                return Err(AppError::InvalidConfig(format!("the {kind} set is empty")).into());
            }
        }

        let of_type = |wanted: TechType| -> Vec<TechId> {
            tech_types
                .iter()
                .enumerate()
                .filter(|(_, tech_type)| **tech_type == wanted)
                .map(|(index, _)| TechId(index))
                .collect()
        };
        let storage_tech = of_type(TechType::Storage);
        let nondispatchable_tech = of_type(TechType::Nondispatchable);
        let dispatchable_tech = of_type(TechType::Dispatchable);
        let hydro_tech = of_type(TechType::Hydro);

        let mut transmission_pairs = Vec::new();
        let mut pair_lookup = HashSet::new();
        for (from, to, _capacity) in &input.transmission_line_existing_capacity {
            let pair = (zones.id(from)?, zones.id(to)?);
            if pair.0 != pair.1 && pair_lookup.insert(pair) {
                transmission_pairs.push(pair);
            }
        }

        Ok(Self {
            years,
            months,
            hours,
            zones,
            techs,
            stations,
            tech_types,
            storage_tech,
            nondispatchable_tech,
            dispatchable_tech,
            hydro_tech,
            transmission_pairs,
            pair_lookup,
        })
    }

    pub fn year_ids(&self) -> impl Iterator<Item = YearId> + Clone + '_ {
        (0..self.years.len()).map(YearId)
    }

    pub fn month_ids(&self) -> impl Iterator<Item = MonthId> + Clone + '_ {
        (0..self.months.len()).map(MonthId)
    }

    /// The modelled hours, `Hour(1)..=Hour(H)`
    pub fn hours(&self) -> impl Iterator<Item = Hour> + Clone + '_ {
        (1..=self.hours.len()).map(Hour)
    }

    /// The modelled hours preceded by the boundary period
    pub fn hour_p(&self) -> impl Iterator<Item = Hour> + Clone + '_ {
        (0..=self.hours.len()).map(Hour)
    }

    pub fn first_hour(&self) -> Hour {
        Hour(1)
    }

    pub fn last_hour(&self) -> Hour {
        Hour(self.hours.len())
    }

    pub fn num_hours(&self) -> usize {
        self.hours.len()
    }

    pub fn num_years(&self) -> usize {
        self.years.len()
    }

    pub fn num_months(&self) -> usize {
        self.months.len()
    }

    pub fn year(&self, id: YearId) -> u32 {
        self.years[id.0]
    }

    pub fn first_year(&self) -> u32 {
        self.years[0]
    }

    pub fn last_year(&self) -> u32 {
        self.years[self.years.len() - 1]
    }

    pub fn year_id(&self, year: u32) -> Option<YearId> {
        self.years.binary_search(&year).ok().map(YearId)
    }

    pub fn month(&self, id: MonthId) -> u32 {
        self.months[id.0]
    }

    pub fn month_id(&self, month: u32) -> Option<MonthId> {
        self.months.binary_search(&month).ok().map(MonthId)
    }

    /// Label of an hour; the boundary period reports 0
    pub fn hour_label(&self, hour: Hour) -> u32 {
        match hour.0 {
            0 => 0,
            position => self.hours[position - 1],
        }
    }

    pub fn hour_id(&self, label: u32) -> Option<Hour> {
        self.hours
            .binary_search(&label)
            .ok()
            .map(|position| Hour(position + 1))
    }

    pub fn tech_type(&self, tech: TechId) -> TechType {
        self.tech_types[tech.0]
    }

    pub fn storage_tech(&self) -> &[TechId] {
        &self.storage_tech
    }

    pub fn nondispatchable_tech(&self) -> &[TechId] {
        &self.nondispatchable_tech
    }

    pub fn dispatchable_tech(&self) -> &[TechId] {
        &self.dispatchable_tech
    }

    pub fn hydro_tech(&self) -> &[TechId] {
        &self.hydro_tech
    }

    pub fn transmission_pairs(&self) -> &[(ZoneId, ZoneId)] {
        &self.transmission_pairs
    }

    pub fn has_corridor(&self, from: ZoneId, to: ZoneId) -> bool {
        self.pair_lookup.contains(&(from, to))
    }
}
