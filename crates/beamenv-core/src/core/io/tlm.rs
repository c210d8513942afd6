use super::traits::LatticeTranslator;
use crate::core::glps::printer::is_identifier;
use phf::{Map, phf_map};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

const NAMES_PER_LINE: usize = 8;
const BEAMLINE: &str = "cell";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: ConvertErrorKind },
    #[error("Input defines no beamline elements")]
    NoElements,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertErrorKind {
    #[error("undefined keyword '{0}'")]
    UnknownKeyword(String),
    #[error("'{keyword}' record needs at least {expected} fields, found {found}")]
    TooFewFields {
        keyword: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("marker '{name}' has non-zero length {length}")]
    MarkerLength { name: String, length: String },
    #[error("field {index} ('{value}') is not a number")]
    InvalidNumber { index: usize, value: String },
    #[error("'{0}' cannot be used as an element name")]
    InvalidName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    Marker,
    Drift,
    Solenoid,
    Dipole,
    Quadrupole,
    RfCavity,
    ElectricDipole,
}

static KEYWORDS: Map<&'static str, Record> = phf_map! {
    "mark" => Record::Marker,
    "drift" => Record::Drift,
    "solenoid" => Record::Solenoid,
    "dipole" => Record::Dipole,
    "quadpole" => Record::Quadrupole,
    "rfcavity" => Record::RfCavity,
    "ebend" => Record::ElectricDipole,
};

impl Record {
    fn keyword(self) -> &'static str {
        match self {
            Record::Marker => "mark",
            Record::Drift => "drift",
            Record::Solenoid => "solenoid",
            Record::Dipole => "dipole",
            Record::Quadrupole => "quadpole",
            Record::RfCavity => "rfcavity",
            Record::ElectricDipole => "ebend",
        }
    }

    /// Fields including the keyword and the name.
    fn min_fields(self) -> usize {
        match self {
            Record::Marker => 3,
            Record::Drift => 4,
            Record::Solenoid | Record::Quadrupole => 5,
            Record::RfCavity => 7,
            Record::Dipole => 9,
            Record::ElectricDipole => 10,
        }
    }
}

/// Translates TLM flat files into GLPS lattices.
///
/// Markers, drifts, bends, solenoids and electric dipoles are numbered per kind
/// (`_1`, `_2`, ...) since TLM reuses their names. Each translation starts from
/// fresh counters; the collected beamline stays readable afterwards.
#[derive(Debug, Default, Clone)]
pub struct TlmConverter {
    markers: usize,
    drifts: usize,
    sbends: usize,
    solenoids: usize,
    edipoles: usize,
    beamline: Vec<String>,
}

impl TlmConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names collected so far, in beamline order.
    pub fn beamline(&self) -> &[String] {
        &self.beamline
    }

    fn numbered(&mut self, record: Record, name: String) -> String {
        let counter = match record {
            Record::Marker => &mut self.markers,
            Record::Drift => &mut self.drifts,
            Record::Dipole => &mut self.sbends,
            Record::Solenoid => &mut self.solenoids,
            Record::ElectricDipole => &mut self.edipoles,
            Record::Quadrupole | Record::RfCavity => return name,
        };
        *counter += 1;
        format!("{}_{}", name, counter)
    }

    /// Converts one logical (already joined, lower-cased) line.
    fn convert_line(&mut self, line: &str, line_no: usize) -> Result<String, ConvertError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(String::new());
        }
        if trimmed.starts_with('#') {
            return Ok(trimmed.to_string());
        }

        let parse_error = |kind| ConvertError::Parse {
            line: line_no,
            kind,
        };
        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let record = KEYWORDS
            .get(tokens[0])
            .copied()
            .ok_or_else(|| parse_error(ConvertErrorKind::UnknownKeyword(tokens[0].to_string())))?;
        if tokens.len() < record.min_fields() {
            return Err(parse_error(ConvertErrorKind::TooFewFields {
                keyword: record.keyword(),
                expected: record.min_fields(),
                found: tokens.len(),
            }));
        }
        for (index, value) in tokens.iter().enumerate().skip(2) {
            if !value.parse::<f64>().is_ok_and(f64::is_finite) {
                return Err(parse_error(ConvertErrorKind::InvalidNumber {
                    index,
                    value: value.to_string(),
                }));
            }
        }

        let base = tokens[1].replacen(':', "_", 1);
        if !is_identifier(&base) {
            return Err(parse_error(ConvertErrorKind::InvalidName(base)));
        }
        if record == Record::Marker && tokens[2].parse::<f64>().ok() != Some(0.0) {
            return Err(parse_error(ConvertErrorKind::MarkerLength {
                name: base,
                length: tokens[2].to_string(),
            }));
        }

        let name = self.numbered(record, base);
        let t = &tokens;
        let definition = match record {
            Record::Marker => format!("{}: marker;", name),
            Record::Drift => format!("{}: drift, L = {}, aper = {};", name, t[2], t[3]),
            Record::Solenoid => {
                format!("{}: solenoid, L = {}, B = {}, aper = {};", name, t[2], t[4], t[3])
            }
            Record::Dipole => format!(
                "{}: sbend, L = {}, phi = deg2rad({}), phi1 = deg2rad({}), phi2 = deg2rad({}), \
                 bg = {}, type = {}, aper = {};",
                name, t[2], t[4], t[7], t[8], t[5], t[6], t[3]
            ),
            Record::Quadrupole => {
                format!("{}: quadrupole, L = {}, B2 = {}, aper = {};", name, t[2], t[4], t[3])
            }
            Record::RfCavity => format!(
                "{}: rfcavity, L = {}, f = {}e6, phi = {}, scl_fac = {}, aper = {};",
                name, t[2], t[4], t[6], t[5], t[3]
            ),
            Record::ElectricDipole => format!(
                "{}: edipole, L = {}, phi = {}, phi1 = {}, phi2 = {}, E = {}, scl_fac = {}, \
                 aper = {};",
                name, t[3], t[6], t[8], t[9], t[7], t[5], t[4]
            ),
        };
        debug!(line = line_no, element = %name, "Converted TLM record.");
        self.beamline.push(name);
        Ok(definition)
    }

    fn write_beamline(&self, writer: &mut impl Write) -> io::Result<()> {
        write!(writer, "\n{}: LINE = (", BEAMLINE)?;
        for (i, chunk) in self.beamline.chunks(NAMES_PER_LINE).enumerate() {
            let sep = if i == 0 { "" } else { "," };
            write!(writer, "{}\n  {}", sep, chunk.join(", "))?;
        }
        writeln!(writer, "\n);")?;
        writeln!(writer, "\nUSE: {};", BEAMLINE)
    }
}

impl LatticeTranslator for TlmConverter {
    type Error = ConvertError;

    fn translate(
        &mut self,
        reader: &mut impl BufRead,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        *self = Self::default();
        writeln!(writer, "# Beam envelope simulation.")?;
        writeln!(writer, "\nsim_type = \"MomentMatrix\";\n")?;

        let mut lines = reader.lines().enumerate();
        while let Some((index, line)) = lines.next() {
            let line_no = index + 1;
            let mut logical = line?.to_lowercase();
            while let Some(stripped) = logical.trim_end().strip_suffix('&') {
                logical = stripped.to_string();
                match lines.next() {
                    Some((_, next)) => logical.push_str(&next?.to_lowercase()),
                    None => break,
                }
            }
            writeln!(writer, "{}", self.convert_line(&logical, line_no)?)?;
        }

        if self.beamline.is_empty() {
            return Err(ConvertError::NoElements);
        }
        self.write_beamline(writer)?;
        Ok(())
    }
}
