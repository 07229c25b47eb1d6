//! Result extraction and writing
//!
//! [`RunResults`] is the serialisable bundle read back from a solved model.
//! Entity ids are translated back to names and labels, so the bundle can be
//! consumed without the input document at hand.

use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::Result;
use prettytable::*;
use serde::Serialize;

use crate::hydro::Convergence;
use crate::model::{CostBreakdown, Model};
use crate::solve::Solved;

#[derive(Debug, Clone, Serialize)]
pub struct CapacityRow {
    pub year: u32,
    pub zone: String,
    pub tech: String,
    pub installed: f64,
    pub new: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineRow {
    pub year: u32,
    pub from: String,
    pub to: String,
    pub existing: f64,
    pub new: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchRow {
    pub year: u32,
    pub month: u32,
    pub hour: u32,
    pub zone: String,
    pub tech: String,
    pub generation: f64,
    /// Storage technologies only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowRow {
    pub year: u32,
    pub month: u32,
    pub hour: u32,
    pub from: String,
    pub to: String,
    pub export: f64,
    pub import: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmissionRow {
    pub year: u32,
    pub emission: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TechEmissionRow {
    pub year: u32,
    pub zone: String,
    pub tech: String,
    pub emission: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationRow {
    pub station: String,
    pub year: u32,
    pub month: u32,
    pub hour: u32,
    pub genflow: f64,
    pub spillflow: f64,
    pub outflow: f64,
    pub output: f64,
    /// End-of-period reservoir storage
    pub storage: f64,
    /// Head used by the final solve, absent for a plain solve
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeadDiagnostics {
    pub outcome: Convergence,
    pub iterations: u32,
    pub errors: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HydroResults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_iteration: Option<HeadDiagnostics>,
    pub stations: Vec<StationRow>,
}

/// Everything a run writes out
#[derive(Debug, Clone, Serialize)]
pub struct RunResults {
    pub status: String,
    pub objective: f64,
    pub cost: CostBreakdown,
    pub capacity: Vec<CapacityRow>,
    pub lines: Vec<LineRow>,
    pub dispatch: Vec<DispatchRow>,
    pub transmission: Vec<FlowRow>,
    pub emissions: Vec<EmissionRow>,
    pub emissions_by_tech: Vec<TechEmissionRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hydro: Option<HydroResults>,
}

impl RunResults {
    pub fn extract(model: &Model, solved: &Solved) -> Result<Self> {
        let solution = solved.solution();
        let sets = &model.sets;
        let vars = &model.vars;

        let mut capacity = Vec::with_capacity(vars.cap_existing.len());
        for ((y, z, te), installed) in vars.cap_existing.iter() {
            capacity.push(CapacityRow {
                year: sets.year(y),
                zone: sets.zones.name(z).to_string(),
                tech: sets.techs.name(te).to_string(),
                installed: solution.value(installed),
                new: solution.value(vars.cap_newtech.get(&(y, z, te))?),
            });
        }

        let mut lines = Vec::with_capacity(vars.cap_lines_existing.len());
        for ((y, z, z1), existing) in vars.cap_lines_existing.iter() {
            lines.push(LineRow {
                year: sets.year(y),
                from: sets.zones.name(z).to_string(),
                to: sets.zones.name(z1).to_string(),
                existing: solution.value(existing),
                new: solution.value(vars.cap_newline.get(&(y, z, z1))?),
            });
        }

        let dispatch = vars
            .generation
            .iter()
            .map(|(key @ (h, m, y, z, te), generation)| DispatchRow {
                year: sets.year(y),
                month: sets.month(m),
                hour: sets.hour_label(h),
                zone: sets.zones.name(z).to_string(),
                tech: sets.techs.name(te).to_string(),
                generation: solution.value(generation),
                charge: vars.charge.find(&key).map(|charge| solution.value(charge)),
            })
            .collect();

        let mut transmission = Vec::with_capacity(vars.trans_export.len());
        for (key @ (h, m, y, z, z1), export) in vars.trans_export.iter() {
            transmission.push(FlowRow {
                year: sets.year(y),
                month: sets.month(m),
                hour: sets.hour_label(h),
                from: sets.zones.name(z).to_string(),
                to: sets.zones.name(z1).to_string(),
                export: solution.value(export),
                import: solution.value(vars.trans_import.get(&key)?),
            });
        }

        let emissions = vars
            .carbon
            .iter()
            .map(|(y, carbon)| EmissionRow {
                year: sets.year(y),
                emission: solution.value(carbon),
            })
            .collect();

        let mut emissions_by_tech = Vec::new();
        for (y, z, te) in crate::sets::tuples::year_zone_tech(sets) {
            let factor = model.params.emission_factor.get(&(te, y))?;
            if factor == 0.0 {
                continue;
            }
            let mut generation = 0.0;
            for (h, m) in itertools::iproduct!(sets.hours(), sets.month_ids()) {
                generation += solution.value(vars.generation.get(&(h, m, y, z, te))?);
            }
            emissions_by_tech.push(TechEmissionRow {
                year: sets.year(y),
                zone: sets.zones.name(z).to_string(),
                tech: sets.techs.name(te).to_string(),
                emission: factor * generation * model.settings.dt,
            });
        }

        let hydro = match &vars.hydro {
            None => None,
            Some(hydro) => {
                let report = solved.head_report();
                let mut stations = Vec::with_capacity(hydro.output.len());
                for (key @ (s, h, m, y), output) in hydro.output.iter() {
                    stations.push(StationRow {
                        station: sets.stations.name(s).to_string(),
                        year: sets.year(y),
                        month: sets.month(m),
                        hour: sets.hour_label(h),
                        genflow: solution.value(hydro.genflow.get(&key)?),
                        spillflow: solution.value(hydro.spillflow.get(&key)?),
                        outflow: solution.value(hydro.outflow.get(&key)?),
                        output: solution.value(output),
                        storage: solution.value(hydro.storage_reservoir.get(&key)?),
                        head: report.and_then(|report| report.head.get(&key).copied()),
                    });
                }
                Some(HydroResults {
                    head_iteration: report.map(|report| HeadDiagnostics {
                        outcome: report.outcome,
                        iterations: report.iterations,
                        errors: report.errors.clone(),
                    }),
                    stations,
                })
            }
        };

        Ok(Self {
            status: format!("{:?}", solution.status),
            objective: solution.objective_value,
            cost: model.cost.breakdown(solution),
            capacity,
            lines,
            dispatch,
            transmission,
            emissions,
            emissions_by_tech,
            hydro,
        })
    }
}

pub fn write_json(results: &RunResults, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.flush()?;
    Ok(())
}

pub fn write_report(results: &RunResults, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    render_report(results, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Summary tables: cost, capacity, emissions and head convergence
pub fn render_report(results: &RunResults, mut writer: impl Write) -> Result<()> {
    writeln!(writer, "Status: {}", results.status)?;
    writeln!(writer, "Total cost: {:.4}", results.objective)?;

    let cost = &results.cost;
    let mut table = Table::new();
    table.set_titles(row!["Component", r->"Value"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for (name, value) in [
        ("variable O&M", cost.var_tech),
        ("fuel", cost.fuel),
        ("line variable O&M", cost.var_line),
        ("fixed O&M", cost.fix_tech),
        ("line fixed O&M", cost.fix_line),
        ("new technology", cost.newtech),
        ("new lines", cost.newline),
        ("water income", -cost.income),
    ] {
        table.add_row(row![name, r->format!("{value:.4}")]);
    }
    writeln!(writer, "\nCost breakdown:")?;
    table.print(&mut writer)?;

    let mut table = Table::new();
    table.set_titles(row!["Year", "Zone", "Tech", r->"Installed", r->"New"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for row in results
        .capacity
        .iter()
        .filter(|row| row.installed > 0.0 || row.new > 0.0)
    {
        table.add_row(row![
            row.year,
            row.zone,
            row.tech,
            r->format!("{:.4}", row.installed),
            r->format!("{:.4}", row.new),
        ]);
    }
    writeln!(writer, "\nCapacity:")?;
    table.print(&mut writer)?;

    let mut table = Table::new();
    table.set_titles(row!["Year", r->"Emission"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for row in &results.emissions {
        table.add_row(row![row.year, r->format!("{:.4}", row.emission)]);
    }
    writeln!(writer, "\nEmissions:")?;
    table.print(&mut writer)?;

    if let Some(head) = results
        .hydro
        .as_ref()
        .and_then(|hydro| hydro.head_iteration.as_ref())
    {
        let mut table = Table::new();
        table.set_titles(row!["Iteration", r->"Relative error"]);
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        for (i, error) in head.errors.iter().enumerate() {
            table.add_row(row![i + 1, r->format!("{error:.6}")]);
        }
        writeln!(
            writer,
            "\nHead iteration: {:?} after {} {}",
            head.outcome,
            head.iterations,
            if head.iterations == 1 { "iteration" } else { "iterations" }
        )?;
        table.print(&mut writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydro::HeadIterationReport;
    use crate::lp_solver::{LPSolution, OptimizationStatus};
    use crate::test_helpers::{hydro_settings, hydro_system, storage_system, thermal_settings};

    fn uniform_solution(model: &Model, value: f64) -> LPSolution<crate::model::Planning> {
        LPSolution::new(
            OptimizationStatus::Optimal,
            42.0,
            vec![value; model.builder.num_variables()],
        )
    }

    #[test]
    fn test_extract_names_and_shapes() {
        let model = Model::build(&storage_system(), thermal_settings()).unwrap();
        let solved = Solved::Linear(uniform_solution(&model, 1.0));
        let results = RunResults::extract(&model, &solved).unwrap();

        assert_eq!(results.status, "Optimal");
        assert_eq!(results.objective, 42.0);
        // 2 years x 2 zones x 2 techs
        assert_eq!(results.capacity.len(), 8);
        assert_eq!(results.lines.len(), 2 * 2);
        assert_eq!(results.dispatch.len(), 3 * 2 * 2 * 2);
        assert!(
            results
                .dispatch
                .iter()
                .all(|row| row.charge.is_some() == (row.tech == "battery"))
        );
        assert!(results.hydro.is_none());

        // coal is the only emitting technology: 0.8 per unit over 3 hours
        assert_eq!(results.emissions_by_tech.len(), 2 * 2);
        for row in &results.emissions_by_tech {
            assert_eq!(row.tech, "coal");
            assert!((row.emission - 2.4).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hydro_rows_carry_head_diagnostics() {
        let model = Model::build(&hydro_system(), hydro_settings()).unwrap();
        let solution = uniform_solution(&model, 1.0);
        let head = model
            .constraints
            .hydro
            .station
            .output_calc
            .iter()
            .map(|(key, _)| (key, 55.0))
            .collect();
        let solved = Solved::HeadIterated(HeadIterationReport {
            outcome: Convergence::Converged,
            iterations: 2,
            errors: vec![0.5, 0.0],
            head,
            solution,
        });

        let results = RunResults::extract(&model, &solved).unwrap();
        let hydro = results.hydro.as_ref().unwrap();
        assert_eq!(hydro.stations.len(), 2 * 3 * 2);
        assert!(hydro.stations.iter().all(|row| row.head == Some(55.0)));
        assert_eq!(hydro.head_iteration.as_ref().unwrap().iterations, 2);

        let json = serde_json::to_value(&results).unwrap();
        assert_eq!(json["hydro"]["head_iteration"]["outcome"], "converged");

        let mut report = Vec::new();
        render_report(&results, &mut report).unwrap();
        let report = String::from_utf8(report).unwrap();
        assert!(report.contains("Head iteration: Converged after 2 iterations"));
        assert!(report.contains("Cost breakdown"));
    }
}
