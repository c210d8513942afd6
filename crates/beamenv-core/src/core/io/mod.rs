//! Input/output for lattice formats other than GLPS.
//!
//! The TLM flat-file format of the upstream linac design tools is translated
//! line by line into GLPS text through the [`traits::LatticeTranslator`] interface.

pub mod tlm;
pub mod traits;
