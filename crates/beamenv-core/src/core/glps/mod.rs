//! Reading and writing the GLPS lattice description language.
//!
//! A GLPS file is a sequence of statements:
//!
//! ```text
//! # comment
//! IonEk = 500e3;                      # global assignment
//! d1: drift, L = 0.072, aper = 0.02;  # element definition
//! cell: LINE = (d1, 2*q1, d1);        # line definition
//! ```
//!
//! [`parse`] evaluates every expression and flattens the last LINE into a
//! [`Config`]; [`printer::print`] goes the other way.

pub mod error;
pub mod eval;
pub mod expand;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod symbols;
pub mod token;

use crate::core::config::Config;
use error::GlpsError;
use tracing::debug;

/// Parses GLPS source bytes into a flattened configuration.
pub fn parse(source: impl AsRef<[u8]>) -> Result<Config, GlpsError> {
    let config = parser::Parser::new(source.as_ref())?.parse()?;
    debug!(
        beamline = %config.name,
        elements = config.elements.len(),
        globals = config.globals.len(),
        "Parsed GLPS configuration."
    );
    Ok(config)
}
