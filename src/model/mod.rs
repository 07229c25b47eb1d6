//! The capacity-expansion linear program
//!
//! [`Model::build`] runs the whole construction pipeline: index sets,
//! parameter resolution, cost factors, variables, every constraint family and
//! finally the cost objective. The result owns the [`LPModelBuilder`] together
//! with the handles needed to re-linearise and read it back.

use std::fmt::Debug;
use std::hash::Hash;

use anyhow::{Context, Result};
use indexmap::IndexMap;

use crate::AppError;
use crate::config::{Config, ModelSettings};
use crate::lp_solver::{Constraint, ConstraintId, LPModelBuilder, LinearExpression, VariableId};
use crate::params::{CostFactors, InputParameters, Parameters};
use crate::sets::Sets;

pub mod constraints;
pub mod cost;
pub mod variables;

pub use constraints::Constraints;
pub use cost::{CostBreakdown, CostTerms};
pub use variables::{HydroVariables, VarMap, Variables};

/// Brand of the planning model's variables
#[derive(Debug)]
pub struct Planning;

pub type Var = VariableId<Planning>;
pub type Expr = LinearExpression<Planning>;
pub type Row = Constraint<Planning>;

/// Rows of one named constraint family, keyed by index tuple
///
/// Tuples for which the rule returned `None` have no entry.
#[derive(Debug, Clone)]
pub struct ConstraintFamily<K> {
    name: &'static str,
    rows: IndexMap<K, ConstraintId>,
}

impl<K: Copy + Eq + Hash + Debug> ConstraintFamily<K> {
    /// Apply `rule` to every key, adding the rows it produces
    pub fn build(
        builder: &mut LPModelBuilder<Planning>,
        name: &'static str,
        keys: impl IntoIterator<Item = K>,
        mut rule: impl FnMut(K) -> Result<Option<Row>>,
    ) -> Result<Self> {
        let mut rows = IndexMap::new();
        for key in keys {
            let row = rule(key).with_context(|| format!("Failed to build {name} at {key:?}"))?;
            if let Some(row) = row {
                rows.insert(key, builder.add_constraint(row));
            }
        }
        tracing::debug!(family = name, rows = rows.len(), "Built constraint family");
        Ok(Self { name, rows })
    }

    /// A family that does not apply to this model
    pub fn empty(name: &'static str) -> Self {
        Self {
            name,
            rows: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: &K) -> Option<ConstraintId> {
        self.rows.get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.rows.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, ConstraintId)> + '_ {
        self.rows.iter().map(|(key, id)| (*key, *id))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read-only view handed to every constraint rule
#[derive(Clone, Copy)]
pub struct ModelContext<'a> {
    pub sets: &'a Sets,
    pub params: &'a Parameters,
    pub factors: &'a CostFactors,
    pub settings: ModelSettings,
    pub vars: &'a Variables,
}

/// A fully built planning model
pub struct Model {
    pub sets: Sets,
    pub params: Parameters,
    pub factors: CostFactors,
    pub settings: ModelSettings,
    pub builder: LPModelBuilder<Planning>,
    pub vars: Variables,
    pub constraints: Constraints,
    pub cost: CostTerms,
}

impl Model {
    /// Build the model for `input` under `settings`
    pub fn build(input: &InputParameters, settings: ModelSettings) -> Result<Self> {
        let sets = Sets::build(input, settings.hydrology)?;
        tracing::debug!(
            years = sets.num_years(),
            zones = sets.zones.len(),
            techs = sets.techs.len(),
            months = sets.num_months(),
            hours = sets.num_hours(),
            stations = sets.stations.len(),
            "Index sets ready"
        );

        let params = Parameters::resolve(input, &sets, settings.hydrology)?;
        let factors = CostFactors::compute(&sets, &params)?;

        let mut builder = LPModelBuilder::new();
        let vars = Variables::allocate(&sets, &mut builder, settings.hydrology);

        let ctx = ModelContext {
            sets: &sets,
            params: &params,
            factors: &factors,
            settings,
            vars: &vars,
        };
        let constraints = Constraints::build(&ctx, &mut builder)?;
        let cost = CostTerms::build(&ctx, &mut builder)?;

        tracing::info!(
            variables = builder.num_variables(),
            constraints = builder.num_constraints(),
            "Model built"
        );

        Ok(Self {
            sets,
            params,
            factors,
            settings,
            builder,
            vars,
            constraints,
            cost,
        })
    }

    /// Row count of every constraint family, in build order
    pub fn family_sizes(&self) -> Vec<(&'static str, usize)> {
        let mut sizes = self.constraints.family_sizes();
        sizes.push((self.cost.cost_definition.name(), self.cost.cost_definition.len()));
        sizes
    }
}

/// Build the model and carry the configured solver parameters onto it
pub fn create_model(input: &InputParameters, config: &Config) -> Result<Model> {
    let mut model = Model::build(input, config.model_settings())?;
    check_period_counts(config, &model.sets)?;
    for (key, value) in config.solver_parameters.raw_parameters()? {
        model.builder.set_raw_parameter(key, value);
    }
    model.builder.set_verbose(config.solver_parameters.verbose);
    Ok(model)
}

/// The configured hour and month counts weight every period, so they must
/// match what the demand table defines
fn check_period_counts(config: &Config, sets: &Sets) -> Result<()> {
    let general = &config.general_parameters;
    for (field, configured, found) in [
        ("hour", general.hour, sets.num_hours()),
        ("month", general.month, sets.num_months()),
    ] {
        if configured as usize != found {
            return Err(AppError::InvalidConfig(format!(
                "general_parameters.{field} is {configured} but the demand table defines {found}"
            ))
            .into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{storage_system, thermal_settings, thermal_system};

    #[test]
    fn test_family_skips_none_rows() {
        let mut builder: LPModelBuilder<Planning> = LPModelBuilder::new();
        let x = builder.add_variable(crate::lp_solver::VariableType::Continuous, 0.0, 1.0);

        let family = ConstraintFamily::build(&mut builder, "even_only", 0..6, |k: i32| {
            Ok((k % 2 == 0).then(|| crate::constraint!((x) <= k)))
        })
        .unwrap();

        assert_eq!(family.len(), 3);
        assert!(family.contains(&4));
        assert!(!family.contains(&3));
        assert_eq!(builder.num_constraints(), 3);
    }

    #[test]
    fn test_family_error_aborts_and_names_family() {
        let mut builder: LPModelBuilder<Planning> = LPModelBuilder::new();
        let err = ConstraintFamily::build(&mut builder, "broken", 0..3, |k: i32| {
            if k == 1 {
                Err(AppError::MissingTable("lifetime").into())
            } else {
                Ok(None)
            }
        })
        .unwrap_err();

        assert!(format!("{err:#}").contains("broken"));
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::MissingTable("lifetime"))
        ));
    }

    #[test]
    fn test_build_thermal_model() {
        let model = Model::build(&thermal_system(), thermal_settings()).unwrap();
        let sizes: IndexMap<_, _> = model.family_sizes().into_iter().collect();

        assert_eq!(sizes["power_balance"], 2 * 2 * 3);
        assert_eq!(sizes["energy_storage_balance"], 0);
        assert_eq!(sizes["hydro_output"], 0);
        assert_eq!(sizes["cost_definition"], 1);
        assert!(model.vars.hydro.is_none());
    }

    #[test]
    fn test_period_counts_must_match_demand() {
        let config = |hour: u32, month: u32| -> Config {
            serde_json::from_value(serde_json::json!({
                "general_parameters": {"hour": hour, "month": month}
            }))
            .unwrap()
        };

        assert!(create_model(&thermal_system(), &config(3, 1)).is_ok());

        let err = create_model(&thermal_system(), &config(24, 1)).err().expect("hour mismatch");
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::InvalidConfig(message)) if message.contains("hour is 24")
        ));

        let err = create_model(&thermal_system(), &config(3, 12)).err().expect("month mismatch");
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::InvalidConfig(message)) if message.contains("month is 12")
        ));
    }

    #[test]
    fn test_missing_required_entry_is_fatal() {
        let mut input = storage_system();
        input.discharge_efficiency.clear();
        let err = Model::build(&input, thermal_settings()).err().expect("build must fail");
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::MissingParameter { table: "discharge_efficiency", .. })
        ));
    }
}
