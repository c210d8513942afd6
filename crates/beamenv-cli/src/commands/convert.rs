use crate::cli::ConvertArgs;
use crate::error::{CliError, Result};
use beamenv::core::io::tlm::{ConvertError, TlmConverter};
use beamenv::core::io::traits::LatticeTranslator;
use std::path::PathBuf;
use tracing::info;

const GLPS_EXTENSION: &str = "lat";

pub fn run(args: ConvertArgs) -> Result<()> {
    let output = output_path(&args)?;
    let mut converter = TlmConverter::new();
    converter
        .translate_path(&args.input, &output)
        .map_err(|e| match e {
            ConvertError::Io(io) => CliError::Io(io),
            other => CliError::FileParsing {
                path: args.input.clone(),
                source: other.into(),
            },
        })?;

    info!(
        input = %args.input.display(),
        output = %output.display(),
        elements = converter.beamline().len(),
        "Converted TLM file."
    );
    Ok(())
}

fn output_path(args: &ConvertArgs) -> Result<PathBuf> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension(GLPS_EXTENSION));
    if output == args.input {
        return Err(CliError::Argument(format!(
            "output would overwrite the input file '{}'",
            args.input.display()
        )));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamenv::core::glps;

    const TLM: &str = "\
drift      d1   0.100000   0.020000
quadpole   q1   0.200000   0.025000   5.000000
mark       m1   0.000000   0.000000
";

    #[test]
    fn default_output_swaps_the_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("flat.tlm");
        std::fs::write(&input, TLM).unwrap();
        run(ConvertArgs {
            input: input.clone(),
            output: None,
        })
        .unwrap();

        let text = std::fs::read_to_string(dir.path().join("flat.lat")).unwrap();
        let config = glps::parse(&text).unwrap();
        assert_eq!(config.name, "cell");
        assert_eq!(config.elements.len(), 3);
    }

    #[test]
    fn refuses_to_overwrite_the_input() {
        let args = ConvertArgs {
            input: PathBuf::from("cell.lat"),
            output: None,
        };
        assert!(matches!(output_path(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn malformed_records_name_the_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bad.tlm");
        std::fs::write(&input, "warp 1 2 3\n").unwrap();
        let result = run(ConvertArgs {
            input: input.clone(),
            output: Some(dir.path().join("bad.lat")),
        });
        match result {
            Err(CliError::FileParsing { path, .. }) => assert_eq!(path, input),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
