use crate::cli::RunArgs;
use crate::error::{CliError, Result};
use beamenv::core::physics::{Matrix7, Vector7};
use beamenv::engine::state::StateOverrides;
use beamenv::workflows::simulate::SimulationConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MATRIX_LEN: usize = 49;

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    pub beam: Option<PartialBeamConfig>,
    pub range: Option<PartialRangeConfig>,
    pub output: Option<PartialOutputConfig>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PartialBeamConfig {
    #[serde(rename = "ion-z")]
    pub ion_z: Option<f64>,
    #[serde(rename = "ion-es")]
    pub ion_es: Option<f64>,
    #[serde(rename = "ion-ek")]
    pub ion_ek: Option<f64>,
    /// Six or seven first moments; the constant coordinate is pinned to 1.
    #[serde(rename = "moment-vector")]
    pub moment_vector: Option<Vec<f64>>,
    /// 49 second moments in row-major order.
    #[serde(rename = "moment-matrix")]
    pub moment_matrix: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PartialRangeConfig {
    pub start: Option<usize>,
    pub end: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PartialOutputConfig {
    pub trace: Option<bool>,
    pub path: Option<PathBuf>,
}

/// Fully resolved settings for the `run` command.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub output: Option<PathBuf>,
}

impl PartialRunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Command line values win over the file.
    pub fn merge_with_cli(self, args: &RunArgs) -> Result<RunConfig> {
        let beam = self.beam.unwrap_or_default();
        let range = self.range.unwrap_or_default();
        let output = self.output.unwrap_or_default();

        let mut overrides = StateOverrides::new();
        if let Some(ion_z) = args.ion_z.or(beam.ion_z) {
            overrides = overrides.with_ion_z(ion_z);
        }
        if let Some(ion_es) = args.ion_es.or(beam.ion_es) {
            overrides = overrides.with_ion_es(ion_es);
        }
        if let Some(ion_ek) = args.ion_ek.or(beam.ion_ek) {
            overrides = overrides.with_ion_ek(ion_ek);
        }
        if let Some(values) = beam.moment_vector {
            overrides = overrides.with_moment_vector(moment_vector(&values)?);
        }
        if let Some(values) = beam.moment_matrix {
            if values.len() != MATRIX_LEN {
                return Err(CliError::Config(format!(
                    "'moment-matrix' must have {} values, found {}",
                    MATRIX_LEN,
                    values.len()
                )));
            }
            overrides = overrides.with_moment_matrix(Matrix7::from_row_slice(&values));
        }

        Ok(RunConfig {
            simulation: SimulationConfig {
                overrides,
                start: args.start.or(range.start),
                end: args.end.or(range.end),
                trace: args.trace || output.trace.unwrap_or(false),
            },
            output: args.output.clone().or(output.path),
        })
    }
}

fn moment_vector(values: &[f64]) -> Result<Vector7> {
    match values.len() {
        6 | 7 => {
            let mut vector = Vector7::zeros();
            vector.rows_mut(0, values.len()).copy_from_slice(values);
            vector[6] = 1.0;
            Ok(vector)
        }
        n => Err(CliError::Config(format!(
            "'moment-vector' must have 6 or 7 values, found {}",
            n
        ))),
    }
}
