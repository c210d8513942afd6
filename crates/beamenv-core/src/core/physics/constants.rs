/// Speed of light in vacuum [m/s].
pub const C0: f64 = 2.99792458e8;
pub const M_TO_MM: f64 = 1e3;
pub const MEV_TO_EV: f64 = 1e6;

/// Frequency at which synchrotron phases are measured when `SampleFreq` is not set [Hz].
pub const DEFAULT_SAMPLE_FREQ: f64 = 80.5e6;

/// Accelerating gradient of an `rfcavity` at unit scale factor when `E0` is not set [V/m].
pub const DEFAULT_CAVITY_GRADIENT: f64 = 1e6;

// Phase-space indices.
pub const PS_X: usize = 0;
pub const PS_PX: usize = 1;
pub const PS_Y: usize = 2;
pub const PS_PY: usize = 3;
pub const PS_S: usize = 4;
pub const PS_PS: usize = 5;
/// Homogeneous coordinate.
pub const PS_ONE: usize = 6;
pub const PS_DIM: usize = 7;
