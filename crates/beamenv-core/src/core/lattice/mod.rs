//! Typed beamline elements built from a parsed configuration.

pub mod element;

pub use element::{Element, ElementError, ElementKind, ElementType};
