use crate::core::lattice::element::Source;
use crate::core::physics::constants::{PS_DIM, PS_ONE};
use crate::core::physics::{Matrix7, Particle, Vector7};
use std::fmt;

/// The beam envelope carried through the machine.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    /// Second moments of (x, px, y, py, s, ps, 1).
    pub moment_matrix: Matrix7,
    /// First moments; the last coordinate is always 1.
    pub moment_vector: Vector7,
    pub real: Particle,
    pub reference: Particle,
    /// Longitudinal position at the end of the last traversed element [m].
    pub position: f64,
}

impl Default for State {
    fn default() -> Self {
        let mut moment_matrix = Matrix7::identity();
        moment_matrix[(PS_ONE, PS_ONE)] = 0.0;
        let mut moment_vector = Vector7::zeros();
        moment_vector[PS_ONE] = 1.0;
        Self {
            moment_matrix,
            moment_vector,
            real: Particle::default(),
            reference: Particle::default(),
            position: 0.0,
        }
    }
}

impl State {
    pub(crate) fn seed(&mut self, source: &Source) {
        if let Some(initial) = source.initial {
            self.moment_matrix = initial;
        }
        if let Some(moment) = source.moment {
            self.moment_vector = moment;
        }
        self.reseed(source.ion_z, source.ion_es, source.ion_ek);
    }

    fn reseed(&mut self, ion_z: f64, ion_es: f64, ion_ek: f64) {
        let particle = Particle::new(ion_z, ion_es, ion_ek);
        self.real = particle;
        self.reference = particle;
    }
}

/// Caller-supplied replacements applied after source seeding in
/// [`Machine::alloc_state`](super::machine::Machine::alloc_state).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateOverrides {
    pub moment_matrix: Option<Matrix7>,
    pub moment_vector: Option<Vector7>,
    pub ion_z: Option<f64>,
    pub ion_es: Option<f64>,
    pub ion_ek: Option<f64>,
}

impl StateOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_moment_matrix(mut self, matrix: Matrix7) -> Self {
        self.moment_matrix = Some(matrix);
        self
    }

    pub fn with_moment_vector(mut self, vector: Vector7) -> Self {
        self.moment_vector = Some(vector);
        self
    }

    pub fn with_ion_z(mut self, ion_z: f64) -> Self {
        self.ion_z = Some(ion_z);
        self
    }

    pub fn with_ion_es(mut self, ion_es: f64) -> Self {
        self.ion_es = Some(ion_es);
        self
    }

    pub fn with_ion_ek(mut self, ion_ek: f64) -> Self {
        self.ion_ek = Some(ion_ek);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Kinematic overrides reseed both tracks, keeping unspecified quantities.
    pub(crate) fn apply(&self, state: &mut State) {
        if let Some(matrix) = self.moment_matrix {
            state.moment_matrix = matrix;
        }
        if let Some(vector) = self.moment_vector {
            state.moment_vector = vector;
            state.moment_vector[PS_ONE] = 1.0;
        }
        if self.ion_z.is_some() || self.ion_es.is_some() || self.ion_ek.is_some() {
            let current = state.reference;
            state.reseed(
                self.ion_z.unwrap_or(current.ion_z),
                self.ion_es.unwrap_or(current.ion_es),
                self.ion_ek.unwrap_or(current.ion_ek),
            );
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State: pos={:.6} m", self.position)?;
        write!(f, "  moment0 = [")?;
        for (i, v) in self.moment_vector.iter().enumerate() {
            let sep = if i == 0 { "" } else { ", " };
            write!(f, "{}{:.6e}", sep, v)?;
        }
        writeln!(f, "]")?;
        writeln!(f, "  state =")?;
        for row in 0..PS_DIM {
            write!(f, "   ")?;
            for col in 0..PS_DIM {
                write!(f, " {:>14.6e}", self.moment_matrix[(row, col)])?;
            }
            writeln!(f)?;
        }
        writeln!(f, "  real: {}", self.real)?;
        write!(f, "  ref:  {}", self.reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ES: f64 = 931494320.0;

    #[test]
    fn default_state_has_unit_physical_block_and_pinned_moment() {
        let state = State::default();
        for i in 0..PS_ONE {
            assert_eq!(state.moment_matrix[(i, i)], 1.0);
        }
        assert_eq!(state.moment_matrix[(PS_ONE, PS_ONE)], 0.0);
        assert_eq!(state.moment_vector[PS_ONE], 1.0);
        assert_eq!(state.moment_vector.rows(0, PS_ONE).sum(), 0.0);
        assert_eq!(state.real, Particle::default());
        assert_eq!(state.reference.gamma, 1.0);
    }

    #[test]
    fn seeding_from_source_sets_both_tracks() {
        let mut state = State::default();
        let source = Source {
            ion_z: 0.138655462,
            ion_es: ES,
            ion_ek: 500e3,
            moment: Some(Vector7::from_column_slice(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0])),
            ..Default::default()
        };
        state.seed(&source);
        assert_eq!(state.real, state.reference);
        assert_eq!(state.real.ekinetic, 500e3);
        assert_eq!(state.moment_vector[0], 1.0);
        assert_eq!(state.moment_matrix[(0, 0)], 1.0);
    }

    #[test]
    fn overrides_replace_only_what_they_name() {
        let mut state = State::default();
        state.reseed(0.5, ES, 1e6);
        let mut vector = Vector7::zeros();
        vector[0] = 2.0;
        StateOverrides::new()
            .with_ion_ek(2e6)
            .with_moment_vector(vector)
            .apply(&mut state);
        assert_eq!(state.reference.ion_z, 0.5);
        assert_eq!(state.real.ion_ek, 2e6);
        assert_eq!(state.moment_vector[0], 2.0);
        assert_eq!(state.moment_vector[PS_ONE], 1.0);
        assert_eq!(state.moment_matrix[(0, 0)], 1.0);
    }

    #[test]
    fn empty_overrides_leave_state_untouched() {
        let overrides = StateOverrides::new();
        assert!(overrides.is_empty());
        let mut state = State::default();
        overrides.apply(&mut state);
        assert_eq!(state, State::default());
    }

    #[test]
    fn display_lists_moments_and_both_tracks() {
        let text = State::default().to_string();
        assert!(text.starts_with("State: pos=0.000000 m"));
        assert!(text.contains("moment0 = ["));
        assert!(text.contains("real: IonZ="));
        assert!(text.contains("ref:  IonZ="));
        assert_eq!(text.lines().count(), 1 + 1 + 1 + PS_DIM + 2);
    }
}
