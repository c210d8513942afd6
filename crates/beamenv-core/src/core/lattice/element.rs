use crate::core::config::{Config, ElementConfig, Value};
use crate::core::physics::constants::{DEFAULT_CAVITY_GRADIENT, PS_DIM, PS_ONE};
use crate::core::physics::{Matrix7, Vector7};
use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Marker,
    Drift,
    Sbend,
    Quadrupole,
    Solenoid,
    RfCavity,
    Source,
    Generic,
}

static ELEMENT_TYPES: Map<&'static str, ElementType> = phf_map! {
    "marker" => ElementType::Marker,
    "drift" => ElementType::Drift,
    "sbend" => ElementType::Sbend,
    "quadrupole" => ElementType::Quadrupole,
    "solenoid" => ElementType::Solenoid,
    "rfcavity" => ElementType::RfCavity,
    "source" => ElementType::Source,
    "generic" => ElementType::Generic,
};

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Marker => "marker",
            ElementType::Drift => "drift",
            ElementType::Sbend => "sbend",
            ElementType::Quadrupole => "quadrupole",
            ElementType::Solenoid => "solenoid",
            ElementType::RfCavity => "rfcavity",
            ElementType::Source => "source",
            ElementType::Generic => "generic",
        }
    }
}

impl FromStr for ElementType {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ELEMENT_TYPES
            .get(s)
            .copied()
            .ok_or_else(|| ElementError::UnknownType(s.to_string()))
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    #[error("unknown element type '{0}'")]
    UnknownType(String),
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),
    #[error("parameter '{key}' must be {expected}, not {found}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("{0}")]
    Invalid(String),
}

/// A focusing strength given either directly or as a field to be divided by the rigidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strength {
    /// Normalized strength in SI units (1/m² for quadrupoles, 1/m for solenoids).
    Normalized(f64),
    /// Field gradient [T/m] or longitudinal field [T].
    Field(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bend {
    /// Total bending angle [rad].
    pub angle: f64,
    pub edge_in: f64,
    pub edge_out: f64,
    /// Body gradient [1/m²].
    pub k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RfCavity {
    /// RF frequency [Hz].
    pub frequency: f64,
    /// Synchronous phase [deg].
    pub phase: f64,
    pub scale: f64,
    /// Accelerating gradient at unit scale [V/m].
    pub gradient: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub initial: Option<Matrix7>,
    pub moment: Option<Vector7>,
    pub ion_z: f64,
    pub ion_es: f64,
    pub ion_ek: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    Marker,
    Drift,
    Sbend(Bend),
    Quadrupole(Strength),
    Solenoid(Strength),
    RfCavity(RfCavity),
    Source(Box<Source>),
    Generic(Box<Matrix7>),
}

/// A validated beamline element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub index: usize,
    /// Length [m].
    pub length: f64,
    pub aperture: Vec<f64>,
    pub kind: ElementKind,
}

struct Params<'a> {
    config: &'a Config,
    element: &'a ElementConfig,
}

impl<'a> Params<'a> {
    fn value(&self, key: &str) -> Option<&'a Value> {
        self.config.lookup(self.element, key)
    }

    fn scalar(&self, key: &'static str) -> Result<Option<f64>, ElementError> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::Scalar(v)) => Ok(Some(*v)),
            Some(other) => Err(ElementError::WrongType {
                key,
                expected: "a scalar",
                found: other.type_name().to_string(),
            }),
        }
    }

    fn scalar_or(&self, key: &'static str, default: f64) -> Result<f64, ElementError> {
        Ok(self.scalar(key)?.unwrap_or(default))
    }

    fn required(&self, key: &'static str) -> Result<f64, ElementError> {
        self.scalar(key)?.ok_or(ElementError::MissingParameter(key))
    }

    fn vector(&self, key: &'static str, sizes: &[usize]) -> Result<Option<&'a [f64]>, ElementError> {
        match self.value(key) {
            None => Ok(None),
            Some(Value::Vector(v)) if sizes.contains(&v.len()) => Ok(Some(v)),
            Some(other) => {
                let found = match other {
                    Value::Vector(v) => format!("a vector of {} values", v.len()),
                    _ => other.type_name().to_string(),
                };
                let expected = if sizes.len() == 1 && sizes[0] == PS_DIM * PS_DIM {
                    "a vector of 49 values"
                } else {
                    "a vector of 6 or 7 values"
                };
                Err(ElementError::WrongType {
                    key,
                    expected,
                    found,
                })
            }
        }
    }

    fn matrix(&self, key: &'static str) -> Result<Option<Matrix7>, ElementError> {
        Ok(self
            .vector(key, &[PS_DIM * PS_DIM])?
            .map(Matrix7::from_row_slice))
    }

    fn aperture(&self) -> Result<Vec<f64>, ElementError> {
        match self.element.get("aper") {
            None => Ok(Vec::new()),
            Some(Value::Scalar(v)) => Ok(vec![*v]),
            Some(Value::Vector(v)) => Ok(v.clone()),
            Some(other) => Err(ElementError::WrongType {
                key: "aper",
                expected: "a scalar or vector",
                found: other.type_name().to_string(),
            }),
        }
    }
}

fn strength(
    params: &Params<'_>,
    normalized: &'static str,
    field: &'static str,
) -> Result<Strength, ElementError> {
    if let Some(k) = params.scalar(normalized)? {
        return Ok(Strength::Normalized(k));
    }
    Ok(params
        .scalar(field)?
        .map_or(Strength::Normalized(0.0), Strength::Field))
}

impl Element {
    /// Builds and validates the element at `index` of `config`.
    pub fn from_config(
        config: &Config,
        element: &ElementConfig,
        index: usize,
    ) -> Result<Self, ElementError> {
        let element_type: ElementType = element.type_name.parse()?;
        let params = Params { config, element };
        // Length is never taken from the globals.
        let length = match element.get("L") {
            None => 0.0,
            Some(Value::Scalar(v)) => *v,
            Some(other) => {
                return Err(ElementError::WrongType {
                    key: "L",
                    expected: "a scalar",
                    found: other.type_name().to_string(),
                });
            }
        };
        if length < 0.0 {
            return Err(ElementError::Invalid(format!(
                "negative length {}",
                length
            )));
        }

        let kind = match element_type {
            ElementType::Marker => {
                if length != 0.0 {
                    return Err(ElementError::Invalid(format!(
                        "marker must have zero length, not {}",
                        length
                    )));
                }
                ElementKind::Marker
            }
            ElementType::Drift => ElementKind::Drift,
            ElementType::Sbend => {
                let bend = Bend {
                    angle: params.scalar_or("phi", 0.0)?,
                    edge_in: params.scalar_or("phi1", 0.0)?,
                    edge_out: params.scalar_or("phi2", 0.0)?,
                    k: params.scalar_or("K", 0.0)?,
                };
                if length == 0.0 && bend.angle != 0.0 {
                    return Err(ElementError::Invalid(
                        "sbend with zero length cannot bend".to_string(),
                    ));
                }
                ElementKind::Sbend(bend)
            }
            ElementType::Quadrupole => ElementKind::Quadrupole(strength(&params, "K", "B2")?),
            ElementType::Solenoid => ElementKind::Solenoid(strength(&params, "K", "B")?),
            ElementType::RfCavity => ElementKind::RfCavity(RfCavity {
                frequency: params.required("f")?,
                phase: params.scalar_or("phi", 0.0)?,
                scale: params.scalar_or("scl_fac", 1.0)?,
                gradient: params.scalar_or("E0", DEFAULT_CAVITY_GRADIENT)?,
            }),
            ElementType::Source => {
                let moment = params.vector("moment0", &[PS_DIM - 1, PS_DIM])?.map(|v| {
                    let mut m = Vector7::zeros();
                    m.rows_mut(0, v.len()).copy_from_slice(v);
                    m[PS_ONE] = 1.0;
                    m
                });
                ElementKind::Source(Box::new(Source {
                    initial: params.matrix("initial")?,
                    moment,
                    ion_z: params.scalar_or("IonZ", 0.0)?,
                    ion_es: params.scalar_or("IonEs", 0.0)?,
                    ion_ek: params.scalar_or("IonEk", 0.0)?,
                }))
            }
            ElementType::Generic => ElementKind::Generic(Box::new(
                params
                    .matrix("transfer")?
                    .ok_or(ElementError::MissingParameter("transfer"))?,
            )),
        };

        Ok(Self {
            name: element.name.clone(),
            index,
            length,
            aperture: params.aperture()?,
            kind,
        })
    }

    pub fn element_type(&self) -> ElementType {
        match self.kind {
            ElementKind::Marker => ElementType::Marker,
            ElementKind::Drift => ElementType::Drift,
            ElementKind::Sbend(_) => ElementType::Sbend,
            ElementKind::Quadrupole(_) => ElementType::Quadrupole,
            ElementKind::Solenoid(_) => ElementType::Solenoid,
            ElementKind::RfCavity(_) => ElementType::RfCavity,
            ElementKind::Source(_) => ElementType::Source,
            ElementKind::Generic(_) => ElementType::Generic,
        }
    }

    /// Whether traversing the element moves the beam and updates its kinematics.
    pub fn is_transport(&self) -> bool {
        !matches!(self.kind, ElementKind::Source(_) | ElementKind::Generic(_))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Element {}: {} ({})",
            self.index,
            self.name,
            self.element_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(element: ElementConfig) -> Result<Element, ElementError> {
        let config = Config::new("cell").with_element(element.clone());
        Element::from_config(&config, &element, 3)
    }

    fn identity_entries() -> Vec<f64> {
        Matrix7::identity().iter().copied().collect()
    }

    #[test]
    fn element_types_parse_from_keywords() {
        assert_eq!("sbend".parse::<ElementType>(), Ok(ElementType::Sbend));
        assert_eq!("rfcavity".parse::<ElementType>(), Ok(ElementType::RfCavity));
        assert_eq!(
            "Drift".parse::<ElementType>(),
            Err(ElementError::UnknownType("Drift".into()))
        );
        for ty in ELEMENT_TYPES.values() {
            assert_eq!(ty.as_str().parse::<ElementType>(), Ok(*ty));
        }
    }

    #[test]
    fn drift_records_name_index_length_and_aperture() {
        let e = build(
            ElementConfig::new("d1", "drift")
                .with("L", 0.072)
                .with("aper", 0.02),
        )
        .unwrap();
        assert_eq!(e.name, "d1");
        assert_eq!(e.index, 3);
        assert_eq!(e.length, 0.072);
        assert_eq!(e.aperture, vec![0.02]);
        assert_eq!(e.kind, ElementKind::Drift);
        assert_eq!(e.to_string(), "Element 3: d1 (drift)");
    }

    #[test]
    fn marker_with_length_is_invalid() {
        assert!(build(ElementConfig::new("m", "marker")).is_ok());
        assert!(matches!(
            build(ElementConfig::new("m", "marker").with("L", 0.1)),
            Err(ElementError::Invalid(_))
        ));
    }

    #[test]
    fn zero_length_bend_is_invalid() {
        let bend = ElementConfig::new("b", "sbend").with("phi", 0.1);
        assert!(matches!(build(bend), Err(ElementError::Invalid(_))));
        let straight = ElementConfig::new("b", "sbend").with("L", 0.0);
        assert!(build(straight).is_ok());
    }

    #[test]
    fn normalized_strength_takes_precedence_over_field() {
        let both = ElementConfig::new("q", "quadrupole")
            .with("L", 0.25)
            .with("K", 2.0)
            .with("B2", 3.4);
        assert_eq!(build(both).unwrap().kind, ElementKind::Quadrupole(Strength::Normalized(2.0)));

        let field = ElementConfig::new("s", "solenoid").with("L", 0.1).with("B", 5.3);
        assert_eq!(build(field).unwrap().kind, ElementKind::Solenoid(Strength::Field(5.3)));

        let neither = ElementConfig::new("q", "quadrupole").with("L", 0.25);
        assert_eq!(
            build(neither).unwrap().kind,
            ElementKind::Quadrupole(Strength::Normalized(0.0))
        );
    }

    #[test]
    fn generic_requires_a_full_transfer_matrix() {
        assert_eq!(
            build(ElementConfig::new("g", "generic")),
            Err(ElementError::MissingParameter("transfer"))
        );
        assert!(matches!(
            build(ElementConfig::new("g", "generic").with("transfer", vec![1.0; 48])),
            Err(ElementError::WrongType { key: "transfer", .. })
        ));
        let e = build(ElementConfig::new("g", "generic").with("transfer", identity_entries())).unwrap();
        assert_eq!(e.kind, ElementKind::Generic(Box::new(Matrix7::identity())));
        assert!(!e.is_transport());
    }

    #[test]
    fn transfer_matrix_is_read_row_major() {
        let mut entries = identity_entries();
        entries[1] = 4.0;
        let e = build(ElementConfig::new("g", "generic").with("transfer", entries)).unwrap();
        let ElementKind::Generic(m) = e.kind else {
            panic!("expected generic element");
        };
        assert_eq!(m[(0, 1)], 4.0);
        assert_eq!(m[(1, 0)], 0.0);
    }

    #[test]
    fn rfcavity_requires_frequency_and_defaults_the_rest() {
        assert_eq!(
            build(ElementConfig::new("c", "rfcavity").with("L", 0.24)),
            Err(ElementError::MissingParameter("f"))
        );
        let e = build(ElementConfig::new("c", "rfcavity").with("L", 0.24).with("f", 80.5e6)).unwrap();
        assert_eq!(
            e.kind,
            ElementKind::RfCavity(RfCavity {
                frequency: 80.5e6,
                phase: 0.0,
                scale: 1.0,
                gradient: DEFAULT_CAVITY_GRADIENT,
            })
        );
    }

    #[test]
    fn source_pins_homogeneous_moment_and_falls_back_to_globals() {
        let element = ElementConfig::new("S", "source")
            .with("IonZ", 0.25)
            .with("moment0", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let config = Config::new("cell")
            .with_global("IonEs", 931494320.0)
            .with_global("IonEk", 500e3)
            .with_element(element.clone());
        let e = Element::from_config(&config, &element, 0).unwrap();
        let ElementKind::Source(source) = e.kind else {
            panic!("expected source element");
        };
        assert_eq!(source.ion_z, 0.25);
        assert_eq!(source.ion_es, 931494320.0);
        assert_eq!(source.ion_ek, 500e3);
        let moment = source.moment.unwrap();
        assert_eq!(moment[5], 6.0);
        assert_eq!(moment[PS_ONE], 1.0);
        assert!(source.initial.is_none());
    }

    #[test]
    fn wrong_parameter_types_are_reported() {
        let e = ElementConfig::new("d", "drift").with("L", "long");
        assert_eq!(
            build(e),
            Err(ElementError::WrongType {
                key: "L",
                expected: "a scalar",
                found: "string".into(),
            })
        );
    }

    #[test]
    fn global_length_does_not_leak_into_elements() {
        let element = ElementConfig::new("d", "drift");
        let config = Config::new("cell").with_global("L", 2.0).with_element(element.clone());
        assert_eq!(Element::from_config(&config, &element, 0).unwrap().length, 0.0);
    }
}
