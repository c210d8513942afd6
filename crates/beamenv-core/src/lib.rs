//! # beamenv Core Library
//!
//! Beam envelope simulation for charged-particle accelerators. A lattice is
//! described in the GLPS language, flattened into an ordered element sequence,
//! and a statistical beam state (second-moment matrix, first-moment vector and
//! the kinematics of a reference and a real particle) is propagated through it
//! with per-element linear transfer maps.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** The configuration model, the GLPS parser and
//!   printer, beam physics (kinematics and transfer maps), typed lattice
//!   elements and the TLM translator.
//!
//! - **[`engine`]: The Logic Core.** The immutable `Machine`, the mutable `State`
//!   it propagates, observers and progress reporting.
//!
//! - **[`workflows`]: The Public API.** One-call simulation from GLPS text to a
//!   propagated state.
//!
//! ```no_run
//! use beamenv::engine::machine::Machine;
//! use beamenv::engine::state::StateOverrides;
//!
//! let machine = Machine::from_glps(std::fs::read("lattice.lat")?)?;
//! let mut state = machine.alloc_state(&StateOverrides::new());
//! machine.propagate(&mut state, ..);
//! println!("{}", state);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod core;
pub mod engine;
pub mod workflows;
