//! Beam physics: constants, particle kinematics and the linear transfer maps.
//!
//! The moment-matrix formalism tracks a 7×7 second-moment matrix Σ and a 7-vector
//! of first moments m over the phase-space coordinates (x, px, y, py, s, ps) plus a
//! homogeneous coordinate fixed at 1. Each element contributes a matrix R applied as
//! Σ′ = R·Σ·Rᵗ and m′ = R·m.

pub mod constants;
pub mod kinematics;
pub mod maps;

pub use kinematics::Particle;
pub use maps::{Matrix7, Vector7};
