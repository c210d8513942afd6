use crate::core::lattice::{Element, ElementType};
use crate::engine::error::MachineError;
use crate::engine::machine::Machine;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::{State, StateOverrides};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Machine(#[from] MachineError),

    #[error("Invalid element range {start}..{end} for a machine of {len} elements")]
    InvalidRange { start: usize, end: usize, len: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationConfig {
    pub overrides: StateOverrides,
    /// First element to apply. Defaults to 0, or to the element after the first
    /// `source` when overrides are given, so that they are not reseeded away.
    pub start: Option<usize>,
    /// One past the last element to apply. Defaults to the machine length.
    pub end: Option<usize>,
    /// Keep a copy of the state after every element.
    pub trace: bool,
}

#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub start: usize,
    pub end: usize,
    pub state: State,
    pub trace: Vec<(usize, State)>,
}

/// Parses `lattice` as GLPS, builds the machine and runs [`simulate`] on it.
#[instrument(skip_all, name = "simulation_workflow")]
pub fn run(
    lattice: impl AsRef<[u8]>,
    config: &SimulationConfig,
    reporter: &ProgressReporter,
) -> Result<(Machine, SimulationResult), WorkflowError> {
    reporter.report(Progress::PhaseStart {
        name: "Building machine",
    });
    let machine = Machine::from_glps(lattice)?;
    reporter.report(Progress::PhaseFinish);

    let result = simulate(&machine, config, reporter)?;
    Ok((machine, result))
}

/// Allocates a state on `machine` and propagates it over the configured range.
pub fn simulate(
    machine: &Machine,
    config: &SimulationConfig,
    reporter: &ProgressReporter,
) -> Result<SimulationResult, WorkflowError> {
    let len = machine.len();
    let start = match config.start {
        Some(start) => start,
        None => {
            let start = default_start(machine, &config.overrides);
            if start > 0 {
                reporter.report(Progress::Message(format!(
                    "Starting at element {} so that overrides are not reseeded by the source.",
                    start
                )));
            }
            start
        }
    };
    let end = config.end.unwrap_or(len);
    if start > end || end > len {
        return Err(WorkflowError::InvalidRange { start, end, len });
    }

    let mut state = machine.alloc_state(&config.overrides);
    let mut trace = Vec::new();

    info!(start, end, "Propagating beam envelope.");
    reporter.report(Progress::PropagationStart {
        total_elements: (end - start) as u64,
    });
    machine.propagate_observed(
        &mut state,
        start..end,
        &mut |element: &Element, state: &State| {
            if config.trace {
                trace.push((element.index, state.clone()));
            }
            reporter.report(Progress::ElementAdvanced {
                index: element.index,
            });
        },
    );
    reporter.report(Progress::PropagationFinish);
    info!(position = state.position, "Propagation complete.");

    Ok(SimulationResult {
        start,
        end,
        state,
        trace,
    })
}

fn default_start(machine: &Machine, overrides: &StateOverrides) -> usize {
    if overrides.is_empty() {
        return 0;
    }
    machine
        .find_by_type(ElementType::Source)
        .next()
        .map_or(0, |source| source.index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::MachineErrorKind;
    use std::sync::Mutex;

    const LATTICE: &str = r#"
        sim_type = "MomentMatrix";
        IonEs = 931494320; IonEk = 500e3; IonZ = 33/238;
        S: source;
        d: drift, L = 0.1;
        q: quadrupole, L = 0.25, B2 = 3.4598;
        cell: LINE = (S, d, q, d);
    "#;

    #[test]
    fn runs_whole_lattice_and_reports_each_element() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        let (machine, result) = run(LATTICE, &SimulationConfig::default(), &reporter).unwrap();
        drop(reporter);

        assert_eq!((result.start, result.end), (0, machine.len()));
        assert!((result.state.position - 0.45).abs() < 1e-12);
        assert!(result.trace.is_empty());

        let events = events.into_inner().unwrap();
        let advanced = events
            .iter()
            .filter(|e| matches!(e, Progress::ElementAdvanced { .. }))
            .count();
        assert_eq!(advanced, 4);
        assert!(matches!(events[0], Progress::PhaseStart { .. }));
        assert!(matches!(events.last(), Some(Progress::PropagationFinish)));
    }

    #[test]
    fn overrides_skip_the_reseeding_source() {
        let config = SimulationConfig {
            overrides: StateOverrides::new().with_ion_ek(1e6),
            ..Default::default()
        };
        let (_, result) = run(LATTICE, &config, &ProgressReporter::new()).unwrap();
        assert_eq!(result.start, 1);
        assert_eq!(result.state.reference.ion_ek, 1e6);
    }

    #[test]
    fn skipped_source_is_announced() {
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));
        let config = SimulationConfig {
            overrides: StateOverrides::new().with_ion_z(0.5),
            ..Default::default()
        };
        run(LATTICE, &config, &reporter).unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert!(events.iter().any(|e| matches!(e, Progress::Message(m) if m.contains("element 1"))));
        let first_element = events
            .iter()
            .find_map(|e| match e {
                Progress::ElementAdvanced { index } => Some(*index),
                _ => None,
            });
        assert_eq!(first_element, Some(1));
    }

    #[test]
    fn trace_records_every_applied_element() {
        let config = SimulationConfig {
            start: Some(1),
            end: Some(3),
            trace: true,
            ..Default::default()
        };
        let (_, result) = run(LATTICE, &config, &ProgressReporter::new()).unwrap();
        let indices: Vec<usize> = result.trace.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, [1, 2]);
        assert_eq!(result.trace[1].1, result.state);
    }

    #[test]
    fn rejects_ranges_outside_the_machine() {
        let config = SimulationConfig {
            end: Some(9),
            ..Default::default()
        };
        assert!(matches!(
            run(LATTICE, &config, &ProgressReporter::new()),
            Err(WorkflowError::InvalidRange { end: 9, len: 4, .. })
        ));
    }

    #[test]
    fn machine_errors_pass_through() {
        let err = run("d: drift; l: LINE = (d);", &SimulationConfig::default(), &ProgressReporter::new())
            .unwrap_err();
        match err {
            WorkflowError::Machine(e) => assert_eq!(e.kind(), MachineErrorKind::MissingSimType),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
