//! Discounting factors for the cost objective
//!
//! All factors are computed once, after parameter resolution, and read by
//! [`crate::model::cost`] through cheap indexed lookups.

use anyhow::Result;

use crate::AppError;
use crate::params::{Parameters, Table};
use crate::sets::{Sets, TechId, YearId};

/// Annuitised, discounted share of an investment made in `year_built`
///
/// `dep_period` is the depreciation period in years. Only the annuities that
/// fall inside the modelled horizon (`year_min..=year_max`) are counted.
pub fn inv_cost_factor(
    dep_period: f64,
    rate: f64,
    year_built: u32,
    year_min: u32,
    year_max: u32,
) -> Result<f64> {
    check_positive("depreciation period", dep_period)?;
    check_positive("discount rate", rate)?;
    if year_max < year_min || year_built < year_min || year_built > year_max {
        return Err(AppError::InvalidConfig(format!(
            "investment year {year_built} outside the horizon {year_min}..={year_max}"
        ))
        .into());
    }

    let years_since_min = f64::from(year_built - year_min);
    let years_to_max = f64::from(year_max - year_built + 1);
    let annuity = rate / (1.0 - (1.0 + rate).powf(-dep_period));
    let paid = (1.0 - (1.0 + rate).powf(-dep_period.min(years_to_max)))
        / (rate * (1.0 + rate).powf(years_since_min));
    Ok(annuity * paid)
}

/// Present value of a recurring cost over `modelled_year..next_modelled_year`
pub fn cost_factor(rate: f64, modelled_year: u32, year_min: u32, next_modelled_year: u32) -> Result<f64> {
    check_positive("discount rate", rate)?;
    if next_modelled_year < modelled_year || modelled_year < year_min {
        return Err(AppError::InvalidConfig(format!(
            "modelled year {modelled_year} is not followed by {next_modelled_year}"
        ))
        .into());
    }

    let years_since_min = f64::from(modelled_year) - f64::from(year_min);
    let years_to_next = f64::from(next_modelled_year - modelled_year);
    Ok((1.0 - (1.0 + rate).powf(-years_to_next)) / (rate * (1.0 + rate).powf(years_since_min - 1.0)))
}

fn check_positive(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::InvalidConfig(format!("{what} must be positive, got {value}")).into())
    }
}

/// Precomputed discounting factors
#[derive(Debug, Clone)]
pub struct CostFactors {
    inv_factor: Table<(TechId, YearId), f64>,
    trans_inv_factor: Vec<f64>,
    fix_factor: Vec<f64>,
    var_factor: Vec<f64>,
}

impl CostFactors {
    pub fn compute(sets: &Sets, params: &Parameters) -> Result<Self> {
        let year_min = sets.first_year();
        let year_max = sets.last_year();

        let line_lifetime = params
            .line_lifetime
            .values()
            .fold(None, |longest: Option<f64>, lifetime| {
                Some(longest.map_or(lifetime, |longest| longest.max(lifetime)))
            });
        if line_lifetime.is_none() && !sets.transmission_pairs().is_empty() {
            return Err(AppError::MissingTable("transmission_line_lifetime").into());
        }

        let mut inv_factor = Table::new("inv_factor");
        let mut trans_inv_factor = Vec::with_capacity(sets.num_years());
        let mut fix_factor = Vec::with_capacity(sets.num_years());

        for y in sets.year_ids() {
            let year = sets.year(y);
            let rate = params.discount_rate.get(&y)?;
            let next_year = if y.index() + 1 < sets.num_years() {
                sets.year(YearId(y.index() + 1))
            } else {
                year + 1
            };

            for te in sets.techs.ids() {
                let lifetime = params.lifetime.get(&(te, y))?;
                inv_factor.insert((te, y), inv_cost_factor(lifetime, rate, year, year_min, year_max)?);
            }

            trans_inv_factor.push(match line_lifetime {
                Some(lifetime) => inv_cost_factor(lifetime, rate, year, year_min, year_max)?,
                None => 0.0,
            });
            fix_factor.push(cost_factor(rate, year, year_min, next_year)?);
        }

        tracing::debug!(?fix_factor, ?trans_inv_factor, "Computed cost factors");

        Ok(Self {
            inv_factor,
            trans_inv_factor,
            var_factor: fix_factor.clone(),
            fix_factor,
        })
    }

    pub fn inv_factor(&self, te: TechId, y: YearId) -> Result<f64> {
        self.inv_factor.get(&(te, y))
    }

    pub fn trans_inv_factor(&self, y: YearId) -> f64 {
        self.trans_inv_factor[y.index()]
    }

    pub fn fix_factor(&self, y: YearId) -> f64 {
        self.fix_factor[y.index()]
    }

    pub fn var_factor(&self, y: YearId) -> f64 {
        self.var_factor[y.index()]
    }
}
