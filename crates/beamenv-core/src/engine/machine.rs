use super::error::MachineError;
use super::observer::Observer;
use super::state::{State, StateOverrides};
use crate::core::config::{Config, Value};
use crate::core::glps;
use crate::core::lattice::element::{RfCavity, Strength};
use crate::core::lattice::{Element, ElementKind, ElementType};
use crate::core::physics::constants::{
    C0, DEFAULT_SAMPLE_FREQ, MEV_TO_EV, M_TO_MM, PS_PS, PS_S,
};
use crate::core::physics::kinematics::{phase_advance, velocity};
use crate::core::physics::maps::{self, MapKinematics};
use crate::core::physics::{Matrix7, Particle};
use std::f64::consts::PI;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use tracing::{debug, info, instrument, warn};

pub const SIM_TYPE: &str = "MomentMatrix";

/// An immutable, validated beamline ready to propagate [`State`]s.
#[derive(Debug, Clone)]
pub struct Machine {
    name: String,
    sample_freq: f64,
    elements: Vec<Element>,
}

impl Machine {
    #[instrument(skip_all, name = "machine_build", fields(beamline = %config.name))]
    pub fn new(config: &Config) -> Result<Self, MachineError> {
        match config.global("sim_type") {
            None => return Err(MachineError::MissingSimType),
            Some(Value::String(s)) if s == SIM_TYPE => {}
            Some(Value::String(s)) => return Err(MachineError::UnsupportedSimType(s.clone())),
            Some(other) => {
                return Err(MachineError::UnsupportedSimType(format!(
                    "<{}>",
                    other.type_name()
                )));
            }
        }

        let sample_freq = match config.global("SampleFreq") {
            None => DEFAULT_SAMPLE_FREQ,
            Some(Value::Scalar(f)) if *f > 0.0 && f.is_finite() => *f,
            Some(other) => {
                warn!(
                    value = ?other,
                    "Ignoring invalid SampleFreq; using {} Hz.",
                    DEFAULT_SAMPLE_FREQ
                );
                DEFAULT_SAMPLE_FREQ
            }
        };

        let elements = config
            .elements
            .iter()
            .enumerate()
            .map(|(index, ec)| {
                Element::from_config(config, ec, index).map_err(|source| MachineError::Element {
                    index,
                    name: ec.name.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(elements = elements.len(), sample_freq, "Machine constructed.");
        Ok(Self {
            name: config.name.clone(),
            sample_freq,
            elements,
        })
    }

    /// Parses GLPS text and builds the machine from its selected beamline.
    pub fn from_glps(source: impl AsRef<[u8]>) -> Result<Self, MachineError> {
        let config = glps::parse(source)?;
        Self::new(&config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_freq(&self) -> f64 {
        self.sample_freq
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Element> {
        self.elements.get(index)
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.elements.iter()
    }

    /// The `nth` (zero based) element called `name`.
    pub fn find(&self, name: &str, nth: usize) -> Option<&Element> {
        self.elements.iter().filter(|e| e.name == name).nth(nth)
    }

    pub fn find_by_type(&self, element_type: ElementType) -> impl Iterator<Item = &Element> {
        self.elements
            .iter()
            .filter(move |e| e.element_type() == element_type)
    }

    /// A fresh state seeded from the first `source` element, then from `overrides`.
    pub fn alloc_state(&self, overrides: &StateOverrides) -> State {
        let mut state = State::default();
        if let Some(source) = self.elements.iter().find_map(|e| match &e.kind {
            ElementKind::Source(source) => Some(source),
            _ => None,
        }) {
            state.seed(source);
        }
        overrides.apply(&mut state);
        state
    }

    /// Advances `state` through the elements in `range`, clamped to the machine.
    pub fn propagate(&self, state: &mut State, range: impl RangeBounds<usize>) {
        self.run(state, range, None);
    }

    /// Like [`propagate`](Self::propagate), calling `observer` after each element.
    pub fn propagate_observed(
        &self,
        state: &mut State,
        range: impl RangeBounds<usize>,
        observer: &mut dyn Observer,
    ) {
        self.run(state, range, Some(observer));
    }

    fn clamp(&self, range: impl RangeBounds<usize>) -> (usize, usize) {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e.saturating_add(1),
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.elements.len(),
        };
        let end = end.min(self.elements.len());
        (start.min(end), end)
    }

    #[instrument(skip_all, name = "propagate")]
    fn run(
        &self,
        state: &mut State,
        range: impl RangeBounds<usize>,
        mut observer: Option<&mut dyn Observer>,
    ) {
        let (start, end) = self.clamp(range);
        debug!(start, end, "Propagating state.");
        for element in &self.elements[start..end] {
            self.advance(element, state);
            debug!(
                index = element.index,
                element = %element.name,
                kind = %element.element_type(),
                pos = state.position,
                "Element applied."
            );
            if let Some(observer) = observer.as_deref_mut() {
                observer.view(element, state);
            }
        }
    }

    fn advance(&self, element: &Element, state: &mut State) {
        match &element.kind {
            ElementKind::Source(source) => state.seed(source),
            ElementKind::Generic(transfer) => {
                maps::transport(&mut state.moment_matrix, &mut state.moment_vector, transfer);
            }
            ElementKind::RfCavity(cavity) => self.advance_cavity(element, cavity, state),
            _ => {
                let kin = MapKinematics::from_reference(&state.reference, self.sample_freq);
                let transfer = self.transfer_map(element, &state.reference, kin.as_ref());
                maps::transport(&mut state.moment_matrix, &mut state.moment_vector, &transfer);
                self.advance_reference(element.length, &mut state.reference);
                self.sync_real(state);
            }
        }
        state.position += element.length;
    }

    fn transfer_map(
        &self,
        element: &Element,
        reference: &Particle,
        kin: Option<&MapKinematics>,
    ) -> Matrix7 {
        let length = element.length * M_TO_MM;
        match &element.kind {
            ElementKind::Drift => maps::drift(length, kin),
            ElementKind::Sbend(bend) => maps::sbend(
                length,
                bend.angle,
                bend.edge_in,
                bend.edge_out,
                bend.k / (M_TO_MM * M_TO_MM),
                kin,
            ),
            ElementKind::Quadrupole(strength) => {
                let k = resolve_strength(element, *strength, reference, 1.0);
                maps::quadrupole(length, k / (M_TO_MM * M_TO_MM), kin)
            }
            ElementKind::Solenoid(strength) => {
                let k = resolve_strength(element, *strength, reference, 2.0);
                maps::solenoid(length, k / M_TO_MM, kin)
            }
            _ => Matrix7::identity(),
        }
    }

    fn advance_reference(&self, length: f64, reference: &mut Particle) {
        reference.recalculate_velocity();
        reference.ekinetic = reference.ion_ek;
        reference.phis += phase_advance(length, reference.beta, self.sample_freq);
    }

    fn sync_real(&self, state: &mut State) {
        let real = &mut state.real;
        real.recalculate();
        real.phis = state.reference.phis + state.moment_vector[PS_S];
        real.ekinetic = real.ion_ek + state.moment_vector[PS_PS] * MEV_TO_EV;
    }

    fn advance_cavity(&self, element: &Element, cavity: &RfCavity, state: &mut State) {
        let fs = self.sample_freq;
        let half = element.length / 2.0;
        let ref_in = state.reference;
        let Some(kin_in) = MapKinematics::from_reference(&ref_in, fs) else {
            warn!(
                element = %element.name,
                "Reference particle undefined; rfcavity treated as a drift."
            );
            let transfer = maps::drift(element.length * M_TO_MM, None);
            maps::transport(&mut state.moment_matrix, &mut state.moment_vector, &transfer);
            self.advance_reference(element.length, &mut state.reference);
            self.sync_real(state);
            return;
        };

        let voltage = cavity.scale * cavity.gradient * element.length;
        let phase = cavity.phase.to_radians();
        let gain = ref_in.ion_z * voltage * phase.cos();

        // Reference: half length at the entrance velocity, kick, half length at the exit velocity.
        let ref_mid_phase = ref_in.phis + phase_advance(half, ref_in.beta, fs);
        let ek_out = ref_in.ion_ek + gain;
        let (gamma_out, beta_out) = velocity(ref_in.ion_es, ek_out);
        let ref_out_phase = ref_mid_phase + phase_advance(half, beta_out, fs);

        let exit = Particle::new(ref_in.ion_z, ref_in.ion_es, ek_out);
        let kin_out = MapKinematics::from_reference(&exit, fs);
        let beta_mean = (ref_in.beta + beta_out) / 2.0;
        let gamma_mean = (ref_in.gamma + gamma_out) / 2.0;
        let rf_wavelength = C0 / cavity.frequency * M_TO_MM;
        let transverse_kick = -PI * ref_in.ion_z * voltage * phase.sin()
            / (ref_in.ion_es * beta_mean.powi(2) * gamma_mean.powi(2) * rf_wavelength);
        let damping = if exit.bg > 0.0 {
            ref_in.beta * ref_in.gamma / exit.bg
        } else {
            1.0
        };
        let energy_kick =
            -ref_in.ion_z * voltage * phase.sin() * (cavity.frequency / fs) / MEV_TO_EV;

        let half_mm = half * M_TO_MM;
        let transfer = maps::drift(half_mm, kin_out.as_ref())
            * maps::rf_gap(transverse_kick, damping, energy_kick)
            * maps::drift(half_mm, Some(&kin_in));
        maps::transport(&mut state.moment_matrix, &mut state.moment_vector, &transfer);

        // Centroid, tracked exactly through the same gap.
        let centroid = if state.real.ion_es > 0.0 {
            let real = &state.real;
            let (_, beta_c) = velocity(real.ion_es, real.ekinetic);
            let mid_phase = real.phis + phase_advance(half, beta_c, fs);
            let gap_phase = phase + (cavity.frequency / fs) * (mid_phase - ref_mid_phase);
            let ek = real.ekinetic + real.ion_z * voltage * gap_phase.cos();
            let (_, beta_c_out) = velocity(real.ion_es, ek);
            Some((mid_phase + phase_advance(half, beta_c_out, fs), ek))
        } else {
            None
        };

        let reference = &mut state.reference;
        reference.ion_ek = ek_out;
        reference.recalculate_velocity();
        reference.bg = beta_mean * gamma_mean;
        reference.phis = ref_out_phase;
        reference.ekinetic = ek_out;

        if let Some((phase_c, ek_c)) = centroid {
            state.moment_vector[PS_S] = phase_c - ref_out_phase;
            state.moment_vector[PS_PS] = (ek_c - ek_out) / MEV_TO_EV;
        }
        state.real.ion_ek += gain;
        self.sync_real(state);

        debug!(
            element = %element.name,
            gain,
            bg = state.reference.bg,
            "Cavity applied."
        );
    }
}

/// Normalized strength in SI units; field values are divided by `divisor`·Bρ.
fn resolve_strength(element: &Element, strength: Strength, reference: &Particle, divisor: f64) -> f64 {
    match strength {
        Strength::Normalized(k) => k,
        Strength::Field(field) => {
            let rigidity = reference.rigidity();
            if rigidity == 0.0 {
                warn!(
                    element = %element.name,
                    field,
                    "Magnetic rigidity undefined; field-derived strength set to 0."
                );
                0.0
            } else {
                field / (divisor * rigidity)
            }
        }
    }
}

impl<'a> IntoIterator for &'a Machine {
    type Item = &'a Element;
    type IntoIter = std::slice::Iter<'a, Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sim_type: {}", SIM_TYPE)?;
        writeln!(f, "#Elements: {}", self.elements.len())?;
        for element in &self.elements {
            writeln!(f, "{}", element)?;
        }
        Ok(())
    }
}
