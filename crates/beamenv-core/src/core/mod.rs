//! # Core Module
//!
//! Stateless building blocks: the configuration model, the GLPS language, beam
//! physics and the typed lattice.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Parsed globals and flattened element records
//! - **Lattice Language** ([`glps`]) - Lexer, expression evaluator, line expansion and printer
//! - **Beam Physics** ([`physics`]) - Constants, particle kinematics and transfer maps
//! - **Lattice Model** ([`lattice`]) - Validated, typed beamline elements
//! - **File I/O** ([`io`]) - Translation of foreign lattice formats into GLPS

pub mod config;
pub mod glps;
pub mod io;
pub mod lattice;
pub mod physics;
