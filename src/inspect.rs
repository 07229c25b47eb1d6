//! The `inspect` subcommand
//!
//! Builds the model exactly as `run` would and prints its dimensions and the
//! row count of every constraint family, without invoking a solver.

use std::{fs, io::Write, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use prettytable::*;

use crate::config::Config;
use crate::model::{Model, create_model};
use crate::params::{InputParameters, ScenarioOverride};

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Configuration file with the general and solver parameters
    #[clap(long)]
    pub config: PathBuf,

    /// Input parameter file
    #[clap(long)]
    pub input: PathBuf,

    /// Replace input table KEY with `<input dir>/KEY_VALUE.json`
    #[clap(long = "scenario", value_name = "KEY=VALUE")]
    pub scenarios: Vec<ScenarioOverride>,

    /// Report file (default: stdout)
    #[clap(long, short)]
    pub report: Option<PathBuf>,
}

pub fn inspect_main(args: InspectArgs) -> Result<()> {
    let InspectArgs {
        config,
        input,
        scenarios,
        report,
    } = args;

    let mut writer: Box<dyn Write> = match report {
        Some(path) => Box::new(fs::File::create(path)?),
        None => Box::new(std::io::stdout()),
    };

    let config = Config::from_path(&config)?;
    let input = InputParameters::from_path(&input, &scenarios)?;
    let model = create_model(&input, &config)?;

    write_summary(&model, &mut writer)
}

/// Model dimensions followed by one row per constraint family
pub fn write_summary(model: &Model, mut writer: impl Write) -> Result<()> {
    let sets = &model.sets;
    writeln!(
        writer,
        "Years {}-{} ({}), {} zones, {} technologies, {} months x {} hours, {} stations",
        sets.first_year(),
        sets.last_year(),
        sets.num_years(),
        sets.zones.len(),
        sets.techs.len(),
        sets.num_months(),
        sets.num_hours(),
        sets.stations.len(),
    )?;
    writeln!(
        writer,
        "{} variables, {} constraints",
        model.builder.num_variables(),
        model.builder.num_constraints()
    )?;

    let mut table = Table::new();
    table.set_titles(row!["Family", r->"Rows"]);
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
    for (name, rows) in model.family_sizes() {
        if rows > 0 {
            table.add_row(row![name, r->rows]);
        }
    }
    table.print(&mut writer)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{storage_system, thermal_settings};

    #[test]
    fn test_summary_lists_non_empty_families() {
        let model = Model::build(&storage_system(), thermal_settings()).unwrap();
        let mut buffer = Vec::new();
        write_summary(&model, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("Years 2020-2030 (2), 2 zones, 2 technologies"));
        assert!(text.contains("power_balance"));
        assert!(text.contains("energy_storage_balance"));
        assert!(!text.contains("hydro_output"));
    }
}
