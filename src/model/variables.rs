//! Decision variables
//!
//! Every variable family is a [`VarMap`] from its index tuple to a column of
//! the planning model. All columns are non-negative except the station
//! inflow, which can be negative when evaporation or losses exceed the
//! natural inflow.

use std::fmt::Debug;
use std::hash::Hash;

use anyhow::Result;
use indexmap::IndexMap;

use super::{Expr, Planning, Var};
use crate::AppError;
use crate::lp_solver::{LPModelBuilder, VariableType};
use crate::sets::tuples::{self, HourlyPair, HourlyTech, StationHour, YearPair, YearZoneTech};
use crate::sets::{Sets, YearId, ZoneId};

/// Variables of one family, keyed by index tuple
#[derive(Debug, Clone)]
pub struct VarMap<K> {
    name: &'static str,
    vars: IndexMap<K, Var>,
}

impl<K: Copy + Eq + Hash + Debug> VarMap<K> {
    fn allocate(
        builder: &mut LPModelBuilder<Planning>,
        name: &'static str,
        keys: impl IntoIterator<Item = K>,
        lower_bound: f64,
    ) -> Self {
        let vars: IndexMap<K, Var> = keys
            .into_iter()
            .map(|key| {
                (
                    key,
                    builder.add_variable(VariableType::Continuous, lower_bound, f64::INFINITY),
                )
            })
            .collect();
        tracing::trace!(family = name, columns = vars.len(), "Allocated variables");
        Self { name, vars }
    }

    /// Allocate a non-negative variable per key
    pub fn non_negative(
        builder: &mut LPModelBuilder<Planning>,
        name: &'static str,
        keys: impl IntoIterator<Item = K>,
    ) -> Self {
        Self::allocate(builder, name, keys, 0.0)
    }

    /// Allocate an unbounded variable per key
    pub fn free(
        builder: &mut LPModelBuilder<Planning>,
        name: &'static str,
        keys: impl IntoIterator<Item = K>,
    ) -> Self {
        Self::allocate(builder, name, keys, f64::NEG_INFINITY)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &K) -> Result<Var> {
        self.vars
            .get(key)
            .copied()
            .ok_or_else(|| AppError::MissingVariable(format!("{}{key:?}", self.name)).into())
    }

    pub fn find(&self, key: &K) -> Option<Var> {
        self.vars.get(key).copied()
    }

    /// Sum of the variables at `keys`; every key must exist
    pub fn sum(&self, keys: impl IntoIterator<Item = K>) -> Result<Expr> {
        let mut expression = Expr::new(0.0);
        for key in keys {
            expression.add_term(1.0, self.get(&key)?);
        }
        Ok(expression)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, Var)> + '_ {
        self.vars.iter().map(|(key, var)| (*key, *var))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Plant-level hydropower variables, allocated only with hydrology enabled
#[derive(Debug, Clone)]
pub struct HydroVariables {
    pub genflow: VarMap<StationHour>,
    pub spillflow: VarMap<StationHour>,
    pub withdraw: VarMap<StationHour>,
    pub inflow: VarMap<StationHour>,
    pub outflow: VarMap<StationHour>,
    pub output: VarMap<StationHour>,
    /// Includes the boundary period
    pub storage_reservoir: VarMap<StationHour>,
}

#[derive(Debug, Clone)]
pub struct Variables {
    pub cap_existing: VarMap<YearZoneTech>,
    pub cap_newtech: VarMap<YearZoneTech>,
    pub remaining_technology: VarMap<YearZoneTech>,
    pub cap_newline: VarMap<YearPair>,
    pub cap_lines_existing: VarMap<YearPair>,

    pub generation: VarMap<HourlyTech>,
    /// Storage technologies only
    pub charge: VarMap<HourlyTech>,
    /// Storage technologies only, includes the boundary period
    pub storage: VarMap<HourlyTech>,
    pub trans_export: VarMap<HourlyPair>,
    pub trans_import: VarMap<HourlyPair>,

    pub carbon: VarMap<YearId>,
    pub carbon_capacity: VarMap<(YearId, ZoneId)>,

    pub cost: Var,
    pub hydro: Option<HydroVariables>,
}

impl Variables {
    pub fn allocate(sets: &Sets, builder: &mut LPModelBuilder<Planning>, hydrology: bool) -> Self {
        let hydro = hydrology.then(|| HydroVariables {
            genflow: VarMap::non_negative(builder, "genflow", tuples::station_hour(sets)),
            spillflow: VarMap::non_negative(builder, "spillflow", tuples::station_hour(sets)),
            withdraw: VarMap::non_negative(builder, "withdraw", tuples::station_hour(sets)),
            inflow: VarMap::free(builder, "inflow", tuples::station_hour(sets)),
            outflow: VarMap::non_negative(builder, "outflow", tuples::station_hour(sets)),
            output: VarMap::non_negative(builder, "output", tuples::station_hour(sets)),
            storage_reservoir: VarMap::non_negative(
                builder,
                "storage_reservoir",
                tuples::station_hour_p(sets),
            ),
        });

        Self {
            cap_existing: VarMap::non_negative(builder, "cap_existing", tuples::year_zone_tech(sets)),
            cap_newtech: VarMap::non_negative(builder, "cap_newtech", tuples::year_zone_tech(sets)),
            remaining_technology: VarMap::non_negative(
                builder,
                "remaining_technology",
                tuples::year_zone_tech(sets),
            ),
            cap_newline: VarMap::non_negative(builder, "cap_newline", tuples::year_pairs(sets)),
            cap_lines_existing: VarMap::non_negative(builder, "cap_lines_existing", tuples::year_pairs(sets)),
            generation: VarMap::non_negative(builder, "gen", tuples::hourly_all_tech(sets)),
            charge: VarMap::non_negative(builder, "charge", tuples::hourly_tech(sets, sets.storage_tech())),
            storage: VarMap::non_negative(builder, "storage", tuples::hourly_p_tech(sets, sets.storage_tech())),
            trans_export: VarMap::non_negative(builder, "trans_export", tuples::hourly_pairs(sets)),
            trans_import: VarMap::non_negative(builder, "trans_import", tuples::hourly_pairs(sets)),
            carbon: VarMap::non_negative(builder, "carbon", sets.year_ids()),
            carbon_capacity: VarMap::non_negative(builder, "carbon_capacity", tuples::year_zone(sets)),
            cost: builder.add_variable(VariableType::Continuous, 0.0, f64::INFINITY),
            hydro,
        }
    }

    pub fn hydro(&self) -> Result<&HydroVariables> {
        self.hydro
            .as_ref()
            .ok_or_else(|| AppError::MissingVariable("hydropower variables".to_string()).into())
    }
}
