//! # Engine Module
//!
//! The propagation engine: an immutable [`machine::Machine`] drives mutable
//! [`state::State`]s through its elements.
//!
//! ## Architecture
//!
//! - **Machine** ([`machine`]) - Element sequence, state allocation and propagation
//! - **State Tracking** ([`state`]) - Moment matrix, moment vector and both particle tracks
//! - **Observation** ([`observer`]) - Per-element callbacks during propagation
//! - **Progress Monitoring** ([`progress`]) - Progress events for long runs
//! - **Error Handling** ([`error`]) - Machine construction errors
//!
//! A `Machine` is `Send + Sync`; any number of threads may propagate their own
//! states through one shared instance.

pub mod error;
pub mod machine;
pub mod observer;
pub mod progress;
pub mod state;
