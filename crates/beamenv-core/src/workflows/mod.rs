//! # Workflows Module
//!
//! One-call entry points that tie the [`core`](crate::core) and
//! [`engine`](crate::engine) layers together.
//!
//! - **Simulation Workflow** ([`simulate`]) - Parse a GLPS lattice, build the machine,
//!   allocate a state and propagate it with progress reporting.

pub mod simulate;
