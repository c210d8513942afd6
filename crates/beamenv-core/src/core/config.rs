use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// A value produced by evaluating a GLPS expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Vector(_) => "vector",
            Value::String(_) => "string",
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

/// One element record of a flattened beamline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(flatten)]
    pub params: BTreeMap<String, Value>,
}

impl ElementConfig {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// The result of parsing a GLPS file: global assignments, the selected
/// beamline and its flattened element list.
///
/// A `Config` can also be assembled by hand and handed straight to
/// [`Machine::new`](crate::engine::machine::Machine::new).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(default)]
    pub globals: BTreeMap<String, Value>,
    #[serde(default)]
    pub elements: Vec<ElementConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigFormatError {
    #[error("TOML parsing error: {0}")]
    Deserialize(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl Config {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_global(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(key.into(), value.into());
        self
    }

    pub fn with_element(mut self, element: ElementConfig) -> Self {
        self.elements.push(element);
        self
    }

    pub fn global(&self, key: &str) -> Option<&Value> {
        self.globals.get(key)
    }

    /// Looks a parameter up on the element first, then in the global scope.
    pub fn lookup<'a>(&'a self, element: &'a ElementConfig, key: &str) -> Option<&'a Value> {
        element.get(key).or_else(|| self.globals.get(key))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigFormatError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigFormatError> {
        Ok(toml::to_string(self)?)
    }
}
