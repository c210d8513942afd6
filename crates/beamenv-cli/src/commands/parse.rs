use super::emit;
use crate::cli::{OutputFormat, ParseArgs};
use crate::error::{CliError, Result};
use anyhow::Context;
use beamenv::core::glps::{self, printer};
use tracing::info;

pub fn run(args: ParseArgs) -> Result<()> {
    let source = std::fs::read(&args.lattice)?;
    let config = glps::parse(&source).map_err(|e| CliError::FileParsing {
        path: args.lattice.clone(),
        source: e.into(),
    })?;
    info!(
        beamline = %config.name,
        elements = config.elements.len(),
        "Parsed lattice."
    );

    let text = match args.format {
        OutputFormat::Glps => printer::print(&config).context("Failed to print GLPS")?,
        OutputFormat::Toml => config
            .to_toml_string()
            .context("Failed to serialize the lattice to TOML")?,
    };
    emit(args.output.as_deref(), &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamenv::core::config::Config;

    const LATTICE: &str = "IonEk = 500e3;\nd: drift, L = 0.1;\nq: quadrupole, L = 0.2, K = 2*3;\ncell: LINE = (2*d, q);\n";

    fn parse_to(format: OutputFormat) -> String {
        let dir = tempfile::tempdir().unwrap();
        let lattice = dir.path().join("cell.lat");
        let output = dir.path().join("out");
        std::fs::write(&lattice, LATTICE).unwrap();
        run(ParseArgs {
            lattice,
            format,
            output: Some(output.clone()),
        })
        .unwrap();
        std::fs::read_to_string(output).unwrap()
    }

    #[test]
    fn glps_output_reparses_to_the_same_config() {
        let printed = parse_to(OutputFormat::Glps);
        assert_eq!(glps::parse(&printed).unwrap(), glps::parse(LATTICE).unwrap());
    }

    #[test]
    fn toml_output_holds_the_flattened_line() {
        let config = Config::from_toml_str(&parse_to(OutputFormat::Toml)).unwrap();
        assert_eq!(config.name, "cell");
        assert_eq!(config.elements.len(), 3);
        assert_eq!(config.elements[2].get("K").and_then(|v| v.as_scalar()), Some(6.0));
    }

    #[test]
    fn syntax_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let lattice = dir.path().join("broken.lat");
        std::fs::write(&lattice, "d: drift, L = 0.1").unwrap();
        let result = run(ParseArgs {
            lattice: lattice.clone(),
            format: OutputFormat::Glps,
            output: None,
        });
        match result {
            Err(CliError::FileParsing { path, .. }) => assert_eq!(path, lattice),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
