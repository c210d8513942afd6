use crate::core::config::{Config, ElementConfig, Value};
use std::collections::HashMap;
use thiserror::Error;

const NAMES_PER_LINE: usize = 8;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PrintError {
    #[error("'{0}' is not a valid GLPS identifier")]
    InvalidIdentifier(String),
    #[error("value of '{0}' is not finite")]
    NonFinite(String),
    #[error("string value of '{0}' contains a double quote")]
    QuoteInString(String),
    #[error("string value of '{0}' contains a NUL byte")]
    NulInString(String),
    #[error("'{0}' names two different definitions")]
    ConflictingDefinition(String),
    #[error("beamline '{0}' has no elements")]
    EmptyBeamline(String),
}

pub fn is_identifier(name: &str) -> bool {
    let bytes = name.as_bytes();
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return false,
    }
    bytes.last() != Some(&b':')
        && bytes
            .iter()
            .all(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b':')
}

fn identifier(name: &str) -> Result<&str, PrintError> {
    if is_identifier(name) {
        Ok(name)
    } else {
        Err(PrintError::InvalidIdentifier(name.to_string()))
    }
}

/// Formats a number so that the lexer reads back the identical value.
pub fn format_number(v: f64) -> String {
    let abs = v.abs();
    if abs != 0.0 && !(1e-4..1e15).contains(&abs) {
        format!("{:e}", v)
    } else {
        format!("{}", v)
    }
}

fn format_value(owner: &str, value: &Value) -> Result<String, PrintError> {
    let number = |v: f64| {
        if v.is_finite() {
            Ok(format_number(v))
        } else {
            Err(PrintError::NonFinite(owner.to_string()))
        }
    };
    match value {
        Value::Scalar(v) => number(*v),
        Value::Vector(items) => {
            let parts = items.iter().map(|v| number(*v)).collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", parts.join(", ")))
        }
        Value::String(s) if s.contains('"') => Err(PrintError::QuoteInString(owner.to_string())),
        Value::String(s) if s.contains('\0') => Err(PrintError::NulInString(owner.to_string())),
        Value::String(s) => Ok(format!("\"{}\"", s)),
    }
}

fn element_statement(element: &ElementConfig) -> Result<String, PrintError> {
    let mut out = format!(
        "{}: {}",
        identifier(&element.name)?,
        identifier(&element.type_name)?
    );
    for (key, value) in &element.params {
        out.push_str(&format!(
            ", {} = {}",
            identifier(key)?,
            format_value(&element.name, value)?
        ));
    }
    out.push(';');
    Ok(out)
}

/// Renders a configuration as GLPS text that parses back to an equal `Config`.
pub fn print(config: &Config) -> Result<String, PrintError> {
    let mut out = String::new();
    let mut defined: HashMap<&str, &ElementConfig> = HashMap::new();

    for (name, value) in &config.globals {
        out.push_str(&format!(
            "{} = {};\n",
            identifier(name)?,
            format_value(name, value)?
        ));
    }
    if !config.globals.is_empty() {
        out.push('\n');
    }

    for element in &config.elements {
        match defined.get(element.name.as_str()) {
            Some(previous) if *previous != element => {
                return Err(PrintError::ConflictingDefinition(element.name.clone()));
            }
            Some(_) => continue,
            None => {}
        }
        if config.globals.contains_key(&element.name) {
            return Err(PrintError::ConflictingDefinition(element.name.clone()));
        }
        out.push_str(&element_statement(element)?);
        out.push('\n');
        defined.insert(&element.name, element);
    }

    let beamline = identifier(&config.name)?;
    if config.elements.is_empty() {
        return Err(PrintError::EmptyBeamline(config.name.clone()));
    }
    if config.globals.contains_key(beamline) || defined.contains_key(beamline) {
        return Err(PrintError::ConflictingDefinition(config.name.clone()));
    }

    out.push_str(&format!("\n{}: LINE = (", beamline));
    for (i, chunk) in config.elements.chunks(NAMES_PER_LINE).enumerate() {
        let names: Vec<&str> = chunk.iter().map(|e| e.name.as_str()).collect();
        let sep = if i == 0 { "" } else { "," };
        out.push_str(&format!("{}\n  {}", sep, names.join(", ")));
    }
    out.push_str("\n);\n");
    Ok(out)
}
