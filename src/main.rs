use anyhow::Result;
use clap::Parser;
use gridplan::{CLIArguments, inspect_main, run_main};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = CLIArguments::parse();

    match args {
        CLIArguments::Run(args) => run_main(args),
        CLIArguments::Inspect(args) => inspect_main(args),
    }
}
