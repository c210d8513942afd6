//! Linear transfer maps of the beamline element types.
//!
//! Every constructor returns a 7×7 matrix acting on (x, px, y, py, s, ps, 1)
//! with x/y in mm, px/py in rad, s a phase in rad at the sampling frequency
//! and ps an energy offset in MeV/u. Lengths are in mm and focusing strengths
//! in the matching inverse powers of mm.

use super::constants::{C0, MEV_TO_EV, M_TO_MM, PS_PS, PS_PX, PS_PY, PS_S, PS_X, PS_Y};
use super::kinematics::Particle;
use nalgebra::{Matrix2, SMatrix, SVector};
use std::f64::consts::PI;

pub type Matrix7 = SMatrix<f64, 7, 7>;
pub type Vector7 = SVector<f64, 7>;

/// Reference kinematics consumed by the longitudinal and dispersive terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapKinematics {
    pub beta: f64,
    pub gamma: f64,
    pub bg: f64,
    pub rest_energy_mev: f64,
    pub sample_wavelength_mm: f64,
}

impl MapKinematics {
    /// `None` when the reference particle has no usable energy.
    pub fn from_reference(reference: &Particle, sample_freq: f64) -> Option<Self> {
        if !reference.is_defined() || reference.bg <= 0.0 || sample_freq <= 0.0 {
            return None;
        }
        Some(Self {
            beta: reference.beta,
            gamma: reference.gamma,
            bg: reference.bg,
            rest_energy_mev: reference.ion_es / MEV_TO_EV,
            sample_wavelength_mm: C0 / sample_freq * M_TO_MM,
        })
    }

    /// Phase change per unit energy offset over a straight section.
    pub fn slip(&self, length_mm: f64) -> f64 {
        -2.0 * PI * length_mm
            / (self.sample_wavelength_mm * self.rest_energy_mev * self.bg.powi(3))
    }

    /// Relative momentum offset per MeV/u of energy offset.
    fn momentum_per_energy(&self) -> f64 {
        1.0 / (self.beta * self.beta * self.gamma * self.rest_energy_mev)
    }

    fn phase_per_mm(&self) -> f64 {
        2.0 * PI / (self.beta * self.sample_wavelength_mm)
    }
}

/// Cosine-like and sine-like solutions of x'' + k x = 0 over `length`.
fn plane(k: f64, length: f64) -> Matrix2<f64> {
    if k > 0.0 {
        let sk = k.sqrt();
        let (sn, cs) = (sk * length).sin_cos();
        Matrix2::new(cs, sn / sk, -sk * sn, cs)
    } else if k < 0.0 {
        let sk = (-k).sqrt();
        let (sn, cs) = ((sk * length).sinh(), (sk * length).cosh());
        Matrix2::new(cs, sn / sk, sk * sn, cs)
    } else {
        Matrix2::new(1.0, length, 0.0, 1.0)
    }
}

fn with_planes(x: Matrix2<f64>, y: Matrix2<f64>) -> Matrix7 {
    let mut m = Matrix7::identity();
    m.fixed_view_mut::<2, 2>(PS_X, PS_X).copy_from(&x);
    m.fixed_view_mut::<2, 2>(PS_Y, PS_Y).copy_from(&y);
    m
}

fn add_slip(m: &mut Matrix7, length_mm: f64, kin: Option<&MapKinematics>) {
    if let Some(kin) = kin {
        m[(PS_S, PS_PS)] += kin.slip(length_mm);
    }
}

pub fn drift(length_mm: f64, kin: Option<&MapKinematics>) -> Matrix7 {
    let mut m = with_planes(plane(0.0, length_mm), plane(0.0, length_mm));
    add_slip(&mut m, length_mm, kin);
    m
}

/// `k` > 0 focuses horizontally and defocuses vertically.
pub fn quadrupole(length_mm: f64, k: f64, kin: Option<&MapKinematics>) -> Matrix7 {
    let mut m = with_planes(plane(k, length_mm), plane(-k, length_mm));
    add_slip(&mut m, length_mm, kin);
    m
}

fn edge(curvature: f64, angle: f64) -> Matrix7 {
    let mut m = Matrix7::identity();
    let kick = angle.tan() * curvature;
    m[(PS_PX, PS_X)] = kick;
    m[(PS_PY, PS_Y)] = -kick;
    m
}

/// Sector bend of total angle `angle` [rad] with pole-face angles and gradient `k`.
pub fn sbend(
    length_mm: f64,
    angle: f64,
    edge_in: f64,
    edge_out: f64,
    k: f64,
    kin: Option<&MapKinematics>,
) -> Matrix7 {
    let h = if length_mm != 0.0 { angle / length_mm } else { 0.0 };
    let kx = k + h * h;
    let x = plane(kx, length_mm);
    let mut body = with_planes(x, plane(-k, length_mm));

    if let Some(kin) = kin {
        let (cx, sx) = (x[(0, 0)], x[(0, 1)]);
        // Dispersion D(L) and its integral over the magnet, both per unit h.
        let (dx, dx_integral) = if kx != 0.0 {
            ((1.0 - cx) / kx, (length_mm - sx) / kx)
        } else {
            (length_mm * length_mm / 2.0, length_mm.powi(3) / 6.0)
        };
        let mpe = kin.momentum_per_energy();
        let ppm = kin.phase_per_mm();
        body[(PS_X, PS_PS)] = h * dx * mpe;
        body[(PS_PX, PS_PS)] = h * sx * mpe;
        body[(PS_S, PS_X)] = ppm * h * sx;
        body[(PS_S, PS_PX)] = ppm * h * dx;
        body[(PS_S, PS_PS)] = kin.slip(length_mm) + ppm * h * h * dx_integral * mpe;
    }

    edge(h, edge_out) * body * edge(h, edge_in)
}

/// Solenoid with strength `k` = B/(2Bρ) [1/mm]; couples the two transverse planes.
pub fn solenoid(length_mm: f64, k: f64, kin: Option<&MapKinematics>) -> Matrix7 {
    if k == 0.0 {
        return drift(length_mm, kin);
    }
    let (s, c) = (k * length_mm).sin_cos();
    let mut m = Matrix7::identity();

    m[(PS_X, PS_X)] = c * c;
    m[(PS_PX, PS_PX)] = c * c;
    m[(PS_Y, PS_Y)] = c * c;
    m[(PS_PY, PS_PY)] = c * c;

    m[(PS_X, PS_PX)] = s * c / k;
    m[(PS_X, PS_Y)] = s * c;
    m[(PS_X, PS_PY)] = s * s / k;

    m[(PS_PX, PS_X)] = -k * s * c;
    m[(PS_PX, PS_Y)] = -k * s * s;
    m[(PS_PX, PS_PY)] = s * c;

    m[(PS_Y, PS_X)] = -s * c;
    m[(PS_Y, PS_PX)] = -s * s / k;
    m[(PS_Y, PS_PY)] = s * c / k;

    m[(PS_PY, PS_X)] = k * s * s;
    m[(PS_PY, PS_PX)] = -s * c;
    m[(PS_PY, PS_Y)] = -k * s * c;

    add_slip(&mut m, length_mm, kin);
    m
}

/// Thin accelerating gap: transverse kick [1/mm], momentum damping, energy kick [MeV/rad].
pub fn rf_gap(transverse_kick: f64, damping: f64, energy_kick: f64) -> Matrix7 {
    let mut m = Matrix7::identity();
    m[(PS_PX, PS_X)] = transverse_kick;
    m[(PS_PY, PS_Y)] = transverse_kick;
    m[(PS_PX, PS_PX)] = damping;
    m[(PS_PY, PS_PY)] = damping;
    m[(PS_PS, PS_S)] = energy_kick;
    m
}

/// Σ ← R Σ Rᵗ, m ← R m; the homogeneous coordinate is pinned to 1.
pub fn transport(sigma: &mut Matrix7, moment: &mut Vector7, r: &Matrix7) {
    *sigma = r * *sigma * r.transpose();
    *moment = r * *moment;
    moment[super::constants::PS_ONE] = 1.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn approx_eq(a: &Matrix7, b: &Matrix7) -> bool {
        (a - b).abs().max() < TOLERANCE
    }

    fn kinematics() -> MapKinematics {
        let p = Particle::new(33.0 / 238.0, 931494320.0, 500e3);
        MapKinematics::from_reference(&p, 80.5e6).unwrap()
    }

    fn block_det(m: &Matrix7, i: usize) -> f64 {
        m[(i, i)] * m[(i + 1, i + 1)] - m[(i, i + 1)] * m[(i + 1, i)]
    }

    #[test]
    fn undefined_reference_yields_no_kinematics() {
        assert!(MapKinematics::from_reference(&Particle::default(), 80.5e6).is_none());
    }

    #[test]
    fn drift_moves_position_by_angle_times_length() {
        let m = drift(1234.0, None);
        assert_eq!(m[(PS_X, PS_PX)], 1234.0);
        assert_eq!(m[(PS_Y, PS_PY)], 1234.0);
        assert_eq!(m[(PS_S, PS_PS)], 0.0);
    }

    #[test]
    fn drift_slip_grows_as_beta_gamma_shrinks() {
        let fast = kinematics();
        let slow = MapKinematics {
            bg: fast.bg / 2.0,
            ..fast
        };
        let a = drift(100.0, Some(&fast))[(PS_S, PS_PS)];
        let b = drift(100.0, Some(&slow))[(PS_S, PS_PS)];
        assert!(a < 0.0);
        assert!((b / a - 8.0).abs() < 1e-9);
    }

    #[test]
    fn zero_strength_elements_reduce_to_drifts() {
        let kin = kinematics();
        let d = drift(250.0, Some(&kin));
        assert!(approx_eq(&quadrupole(250.0, 0.0, Some(&kin)), &d));
        assert!(approx_eq(&solenoid(250.0, 0.0, Some(&kin)), &d));
        assert!(approx_eq(&sbend(250.0, 0.0, 0.0, 0.0, 0.0, Some(&kin)), &d));
    }

    #[test]
    fn quadrupole_swaps_planes_with_sign_of_k() {
        let f = quadrupole(2.0, 1.1, None);
        let d = quadrupole(2.0, -1.1, None);
        assert!(f[(PS_PX, PS_X)] < 0.0 && f[(PS_PY, PS_Y)] > 0.0);
        assert!((f[(PS_X, PS_X)] - d[(PS_Y, PS_Y)]).abs() < TOLERANCE);
        assert!((block_det(&f, PS_X) - 1.0).abs() < 1e-9);
        assert!((block_det(&f, PS_Y) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sbend_couples_energy_into_horizontal_plane_only() {
        let m = sbend(1000.0, 0.1, 0.0, 0.0, 0.0, Some(&kinematics()));
        assert!(m[(PS_X, PS_PS)] > 0.0);
        assert!(m[(PS_PX, PS_PS)] > 0.0);
        assert_eq!(m[(PS_Y, PS_PS)], 0.0);
        assert_eq!(m[(PS_PY, PS_PS)], 0.0);
    }

    #[test]
    fn sbend_edges_focus_vertically_for_positive_angles() {
        let plain = sbend(1000.0, 0.1, 0.0, 0.0, 0.0, None);
        let edged = sbend(1000.0, 0.1, 0.05, 0.05, 0.0, None);
        assert!(edged[(PS_PY, PS_Y)] < plain[(PS_PY, PS_Y)]);
        assert!((block_det(&edged, PS_X) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn solenoid_is_a_rotation_of_the_transverse_planes() {
        let m = solenoid(1123.0, -1.0, None);
        let t = m.fixed_view::<4, 4>(0, 0).into_owned();
        let det = t.determinant();
        assert!((det - 1.0).abs() < 1e-9);
        assert!(m[(PS_X, PS_Y)] != 0.0);
    }

    #[test]
    fn transport_pins_homogeneous_coordinate() {
        let mut sigma = Matrix7::identity();
        let mut moment = Vector7::zeros();
        moment[6] = 1.0;
        let mut r = Matrix7::identity() * 2.0;
        r[(0, 6)] = 0.5;
        transport(&mut sigma, &mut moment, &r);
        assert_eq!(moment[6], 1.0);
        assert_eq!(moment[0], 0.5);
        assert_eq!(sigma[(1, 1)], 4.0);
    }
}
