mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::Result;
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        error!("{}", e);
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    info!("beamenv CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Parsed CLI arguments: {:?}", cli);

    match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.quiet),
        Commands::Parse(args) => commands::parse::run(args),
        Commands::Convert(args) => commands::convert::run(args),
    }
}
