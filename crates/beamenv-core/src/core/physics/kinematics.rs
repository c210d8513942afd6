use super::constants::C0;
use std::f64::consts::PI;
use std::fmt;

/// Energy and velocity state of one tracked particle.
///
/// Energies are per nucleon in eV. `ion_z` is the charge-to-mass ratio Q/A.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub ion_z: f64,
    pub ion_es: f64,
    pub ion_ek: f64,
    pub ion_w: f64,
    pub gamma: f64,
    pub beta: f64,
    pub bg: f64,
    pub phis: f64,
    pub ekinetic: f64,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            ion_z: 0.0,
            ion_es: 0.0,
            ion_ek: 0.0,
            ion_w: 0.0,
            gamma: 1.0,
            beta: 0.0,
            bg: 0.0,
            phis: 0.0,
            ekinetic: 0.0,
        }
    }
}

/// Lorentz factor and velocity of a particle with the given energies.
pub fn velocity(rest_energy: f64, kinetic_energy: f64) -> (f64, f64) {
    let gamma = if rest_energy != 0.0 {
        (rest_energy + kinetic_energy) / rest_energy
    } else {
        1.0
    };
    let beta = (1.0 - 1.0 / (gamma * gamma)).max(0.0).sqrt();
    (gamma, beta)
}

/// Phase slip [rad] at `freq` over `length` metres travelled at `beta`.
pub fn phase_advance(length: f64, beta: f64, freq: f64) -> f64 {
    if beta > 0.0 {
        2.0 * PI * freq * length / (beta * C0)
    } else {
        0.0
    }
}

impl Particle {
    /// A freshly seeded particle at zero phase.
    pub fn new(ion_z: f64, ion_es: f64, ion_ek: f64) -> Self {
        let mut p = Self {
            ion_z,
            ion_es,
            ion_ek,
            ..Default::default()
        };
        p.recalculate();
        p.ekinetic = ion_ek;
        p
    }

    /// Recomputes total energy, gamma, beta and beta·gamma from the energies.
    pub fn recalculate(&mut self) {
        self.recalculate_velocity();
        self.bg = self.beta * self.gamma;
    }

    /// Recomputes total energy, gamma and beta, leaving `bg` untouched.
    pub fn recalculate_velocity(&mut self) {
        self.ion_w = self.ion_es + self.ion_ek;
        let (gamma, beta) = velocity(self.ion_es, self.ion_ek);
        self.gamma = gamma;
        self.beta = beta;
    }

    /// Whether momentum-dependent transport terms can be evaluated.
    pub fn is_defined(&self) -> bool {
        self.ion_es > 0.0 && self.beta > 0.0
    }

    /// Magnetic rigidity Bρ [T·m], zero when undefined.
    pub fn rigidity(&self) -> f64 {
        if self.is_defined() && self.ion_z != 0.0 {
            self.beta * self.gamma * self.ion_es / (C0 * self.ion_z)
        } else {
            0.0
        }
    }
}

impl fmt::Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IonZ={:.10} IonEs={:.6e} IonEk={:.6e} IonW={:.6e} gamma={:.10} beta={:.10} bg={:.10} phis={:.10} Ekinetic={:.6e}",
            self.ion_z,
            self.ion_es,
            self.ion_ek,
            self.ion_w,
            self.gamma,
            self.beta,
            self.bg,
            self.phis,
            self.ekinetic
        )
    }
}
