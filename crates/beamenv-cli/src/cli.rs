use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "beamenv - beam envelope (moment matrix) simulation of accelerator lattices written in GLPS.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Propagate a beam envelope through a GLPS lattice and print the final state.
    Run(RunArgs),
    /// Parse a GLPS lattice and print the flattened configuration.
    Parse(ParseArgs),
    /// Convert a TLM flat file into a GLPS lattice.
    Convert(ConvertArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the GLPS lattice file.
    #[arg(required = true, value_name = "LATTICE")]
    pub lattice: PathBuf,

    /// Path to a run configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Index of the first element to apply.
    #[arg(long, value_name = "INDEX")]
    pub start: Option<usize>,

    /// Index one past the last element to apply.
    #[arg(long, value_name = "INDEX")]
    pub end: Option<usize>,

    /// Print the state after every element.
    #[arg(long)]
    pub trace: bool,

    // --- Beam Overrides ---
    /// Override the charge-to-mass ratio Q/A of both tracks.
    #[arg(long, value_name = "FLOAT")]
    pub ion_z: Option<f64>,

    /// Override the rest energy [eV/u] of both tracks.
    #[arg(long, value_name = "FLOAT")]
    pub ion_es: Option<f64>,

    /// Override the kinetic energy [eV/u] of both tracks.
    #[arg(long, value_name = "FLOAT")]
    pub ion_ek: Option<f64>,

    /// Write the result to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Glps,
    Toml,
}

/// Arguments for the `parse` subcommand.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Path to the GLPS lattice file.
    #[arg(required = true, value_name = "LATTICE")]
    pub lattice: PathBuf,

    /// Output format of the flattened configuration.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Glps)]
    pub format: OutputFormat,

    /// Write the result to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the TLM flat file.
    #[arg(required = true, value_name = "INPUT")]
    pub input: PathBuf,

    /// Path of the GLPS file to write. Defaults to INPUT with a `.lat` extension.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_arguments_and_global_flags_parse() {
        let cli = Cli::try_parse_from([
            "beamenv", "-vv", "run", "lattice.lat", "--start", "1", "--end", "5", "--trace",
            "--ion-ek", "1e6",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };
        assert_eq!(args.lattice, PathBuf::from("lattice.lat"));
        assert_eq!((args.start, args.end), (Some(1), Some(5)));
        assert!(args.trace);
        assert_eq!(args.ion_ek, Some(1e6));
    }

    #[test]
    fn parse_format_defaults_to_glps() {
        let cli = Cli::try_parse_from(["beamenv", "parse", "a.lat"]).unwrap();
        let Commands::Parse(args) = cli.command else {
            panic!("expected parse command");
        };
        assert_eq!(args.format, OutputFormat::Glps);
        let cli = Cli::try_parse_from(["beamenv", "parse", "a.lat", "--format", "toml"]).unwrap();
        let Commands::Parse(args) = cli.command else {
            panic!("expected parse command");
        };
        assert_eq!(args.format, OutputFormat::Toml);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["beamenv", "-q", "-v", "convert", "x.tlm"]).is_err());
    }
}
