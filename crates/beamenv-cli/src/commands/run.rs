use super::emit;
use crate::cli::RunArgs;
use crate::config::PartialRunConfig;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use beamenv::engine::error::MachineError;
use beamenv::engine::machine::Machine;
use beamenv::engine::progress::ProgressReporter;
use beamenv::workflows::simulate::{self, SimulationResult, WorkflowError};
use tracing::{debug, info};

pub fn run(args: RunArgs, quiet: bool) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => {
            debug!(path = %path.display(), "Loading run configuration.");
            PartialRunConfig::from_file(path)?
        }
        None => PartialRunConfig::default(),
    };
    let config = file_config.merge_with_cli(&args)?;

    let lattice = std::fs::read(&args.lattice)?;
    let handler = if quiet {
        CliProgressHandler::hidden()
    } else {
        CliProgressHandler::new()
    };
    let reporter = ProgressReporter::with_callback(handler.get_callback());

    let (machine, result) =
        simulate::run(&lattice, &config.simulation, &reporter).map_err(|e| match e {
            WorkflowError::Machine(MachineError::Parse(source)) => CliError::FileParsing {
                path: args.lattice.clone(),
                source: source.into(),
            },
            other => other.into(),
        })?;
    info!(
        beamline = machine.name(),
        elements = machine.len(),
        "Simulation finished."
    );

    emit(config.output.as_deref(), &render(&machine, &result))
}

fn render(machine: &Machine, result: &SimulationResult) -> String {
    let mut out = String::new();
    for (index, state) in &result.trace {
        if let Some(element) = machine.get(*index) {
            out.push_str(&format!("After {}\n{}\n\n", element, state));
        }
    }
    out.push_str(&format!(
        "Beamline '{}', elements {}..{} of {}\n{}\n",
        machine.name(),
        result.start,
        result.end,
        machine.len(),
        result.state
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const LATTICE: &str = r#"
        sim_type = "MomentMatrix";
        IonEs = 931494320; IonEk = 500e3; IonZ = 33/238;
        S: source;
        d: drift, L = 0.1;
        cell: LINE = (S, d, d);
    "#;

    fn args(dir: &Path, lattice: &str) -> RunArgs {
        let lattice_path = dir.join("cell.lat");
        std::fs::write(&lattice_path, lattice).unwrap();
        RunArgs {
            lattice: lattice_path,
            config: None,
            start: None,
            end: None,
            trace: false,
            ion_z: None,
            ion_es: None,
            ion_ek: None,
            output: Some(dir.join("state.txt")),
        }
    }

    #[test]
    fn writes_the_final_state() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), LATTICE);
        let output = args.output.clone().unwrap();
        run(args, true).unwrap();

        let text = std::fs::read_to_string(output).unwrap();
        assert!(text.contains("Beamline 'cell', elements 0..3 of 3"));
        assert!(text.contains("State: pos=0.200000 m"));
        assert!(!text.contains("After "));
    }

    #[test]
    fn trace_lists_every_element_from_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), LATTICE);
        let config_path = dir.path().join("run.toml");
        std::fs::write(&config_path, "[output]\ntrace = true\n").unwrap();
        args.config = Some(config_path);
        let output = args.output.clone().unwrap();
        run(args, true).unwrap();

        let text = std::fs::read_to_string(output).unwrap();
        assert_eq!(text.matches("After Element").count(), 3);
        assert!(text.contains("After Element 1: d (drift)"));
    }

    #[test]
    fn syntax_errors_name_the_lattice_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path(), "d: drift, L = ;");
        let lattice = args.lattice.clone();
        match run(args, true) {
            Err(CliError::FileParsing { path, .. }) => assert_eq!(path, lattice),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn missing_lattice_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), LATTICE);
        args.lattice = dir.path().join("absent.lat");
        assert!(matches!(run(args, true), Err(CliError::Io(_))));
    }

    #[test]
    fn out_of_range_end_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path(), LATTICE);
        args.end = Some(10);
        assert!(matches!(
            run(args, true),
            Err(CliError::Simulation(WorkflowError::InvalidRange { .. }))
        ));
    }
}
