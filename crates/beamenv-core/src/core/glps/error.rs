use super::token::Position;
use thiserror::Error;

/// Classification of GLPS parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlpsErrorKind {
    InvalidCharacter,
    UnterminatedQuote,
    SyntaxError,
    UndefinedReference,
    Redefinition,
    TypeError,
    CalcError,
    NoBeamline,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GlpsError {
    #[error("invalid charactor {byte:#04x} at {pos}")]
    InvalidCharacter { pos: Position, byte: u8 },

    #[error("Unterminated quote starting at {pos}")]
    UnterminatedQuote { pos: Position },

    #[error("syntax error at {pos}: expected {expected}, found {found}")]
    Syntax {
        pos: Position,
        expected: &'static str,
        found: String,
    },

    #[error("'{name}' referenced before definition at {pos}")]
    UndefinedReference { pos: Position, name: String },

    #[error("'{name}' already defined, redefined at {pos}")]
    Redefinition { pos: Position, name: String },

    #[error("{message} at {pos}")]
    Type { pos: Position, message: String },

    #[error("{message} at {pos}")]
    Calc { pos: Position, message: String },

    #[error("No beamlines defined by this file")]
    NoBeamline,
}

impl GlpsError {
    pub fn kind(&self) -> GlpsErrorKind {
        match self {
            GlpsError::InvalidCharacter { .. } => GlpsErrorKind::InvalidCharacter,
            GlpsError::UnterminatedQuote { .. } => GlpsErrorKind::UnterminatedQuote,
            GlpsError::Syntax { .. } => GlpsErrorKind::SyntaxError,
            GlpsError::UndefinedReference { .. } => GlpsErrorKind::UndefinedReference,
            GlpsError::Redefinition { .. } => GlpsErrorKind::Redefinition,
            GlpsError::Type { .. } => GlpsErrorKind::TypeError,
            GlpsError::Calc { .. } => GlpsErrorKind::CalcError,
            GlpsError::NoBeamline => GlpsErrorKind::NoBeamline,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            GlpsError::InvalidCharacter { pos, .. }
            | GlpsError::UnterminatedQuote { pos }
            | GlpsError::Syntax { pos, .. }
            | GlpsError::UndefinedReference { pos, .. }
            | GlpsError::Redefinition { pos, .. }
            | GlpsError::Type { pos, .. }
            | GlpsError::Calc { pos, .. } => Some(*pos),
            GlpsError::NoBeamline => None,
        }
    }

    pub(crate) fn type_error(pos: Position, message: impl Into<String>) -> Self {
        GlpsError::Type {
            pos,
            message: message.into(),
        }
    }

    pub(crate) fn calc_error(pos: Position, message: impl Into<String>) -> Self {
        GlpsError::Calc {
            pos,
            message: message.into(),
        }
    }
}
