//! Constraint families, grouped by concern
//!
//! Every group exposes its families as public fields so that callers can
//! find individual rows by index tuple after the model is built.

use anyhow::Result;

use crate::lp_solver::LPModelBuilder;
use crate::model::{ModelContext, Planning};

pub mod co2;
pub mod demand;
pub mod finance;
pub mod generation;
pub mod hydro;
pub mod investment;
pub mod nondispatchable;
pub mod storage;
pub mod transmission;

pub use co2::Co2Constraints;
pub use demand::DemandConstraints;
pub use finance::FinanceConstraints;
pub use generation::GenerationConstraints;
pub use hydro::{HydroConstraints, StationConstraints};
pub use investment::InvestmentConstraints;
pub use nondispatchable::NondispatchableConstraints;
pub use storage::StorageConstraints;
pub use transmission::TransmissionConstraints;

pub struct Constraints {
    pub investment: InvestmentConstraints,
    pub generation: GenerationConstraints,
    pub transmission: TransmissionConstraints,
    pub demand: DemandConstraints,
    pub nondispatchable: NondispatchableConstraints,
    pub storage: StorageConstraints,
    pub co2: Co2Constraints,
    pub hydro: HydroConstraints,
    pub finance: FinanceConstraints,
}

impl Constraints {
    pub fn build(ctx: &ModelContext, builder: &mut LPModelBuilder<Planning>) -> Result<Self> {
        Ok(Self {
            investment: InvestmentConstraints::build(ctx, builder)?,
            generation: GenerationConstraints::build(ctx, builder)?,
            transmission: TransmissionConstraints::build(ctx, builder)?,
            demand: DemandConstraints::build(ctx, builder)?,
            nondispatchable: NondispatchableConstraints::build(ctx, builder)?,
            storage: StorageConstraints::build(ctx, builder)?,
            co2: Co2Constraints::build(ctx, builder)?,
            hydro: HydroConstraints::build(ctx, builder)?,
            finance: FinanceConstraints::build(ctx, builder)?,
        })
    }

    pub fn family_sizes(&self) -> Vec<(&'static str, usize)> {
        let mut sizes = Vec::new();
        self.investment.family_sizes(&mut sizes);
        self.generation.family_sizes(&mut sizes);
        self.transmission.family_sizes(&mut sizes);
        self.demand.family_sizes(&mut sizes);
        self.nondispatchable.family_sizes(&mut sizes);
        self.storage.family_sizes(&mut sizes);
        self.co2.family_sizes(&mut sizes);
        self.hydro.family_sizes(&mut sizes);
        self.finance.family_sizes(&mut sizes);
        sizes
    }
}
