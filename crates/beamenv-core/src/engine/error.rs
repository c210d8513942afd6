use crate::core::glps::error::GlpsError;
use crate::core::lattice::ElementError;
use thiserror::Error;

/// Coarse classification of [`MachineError`] for callers that branch on the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineErrorKind {
    Parse,
    MissingSimType,
    UnsupportedSimType,
    UnknownElement,
    InvalidElement,
    MissingParameter,
}

#[derive(Debug, Error)]
pub enum MachineError {
    #[error(transparent)]
    Parse(#[from] GlpsError),

    #[error("Configuration does not declare 'sim_type'")]
    MissingSimType,

    #[error("Unsupported sim_type '{0}'")]
    UnsupportedSimType(String),

    #[error("Error while initializing element {index} '{name}': {source}")]
    Element {
        index: usize,
        name: String,
        #[source]
        source: ElementError,
    },
}

impl MachineError {
    pub fn kind(&self) -> MachineErrorKind {
        match self {
            MachineError::Parse(_) => MachineErrorKind::Parse,
            MachineError::MissingSimType => MachineErrorKind::MissingSimType,
            MachineError::UnsupportedSimType(_) => MachineErrorKind::UnsupportedSimType,
            MachineError::Element { source, .. } => match source {
                ElementError::UnknownType(_) => MachineErrorKind::UnknownElement,
                ElementError::MissingParameter(_) => MachineErrorKind::MissingParameter,
                ElementError::WrongType { .. } | ElementError::Invalid(_) => {
                    MachineErrorKind::InvalidElement
                }
            },
        }
    }
}
