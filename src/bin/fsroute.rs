use std::sync::Arc;

use clap::Parser;
use fsroute::cli::{run_cli, Cli};
use fsroute::logging::{init_logging, LogConfig};
use fsroute::ModuleRegistry;

fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;
    run_cli(Cli::parse(), Arc::new(ModuleRegistry::new()))
}
