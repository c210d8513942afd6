use super::error::GlpsError;
use super::token::Position;
use crate::core::config::{Config, ElementConfig, Value};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Value(Value),
    Element(ElementConfig),
    /// A line is stored already flattened.
    Line(Vec<ElementConfig>),
}

impl Symbol {
    fn describe(&self) -> &'static str {
        match self {
            Symbol::Value(_) => "a value",
            Symbol::Element(_) => "an element",
            Symbol::Line(_) => "a line",
        }
    }
}

/// Single global namespace of a GLPS file.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    globals: BTreeMap<String, Value>,
    last_line: Option<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: String, symbol: Symbol, pos: Position) -> Result<(), GlpsError> {
        if self.symbols.contains_key(&name) {
            return Err(GlpsError::Redefinition { pos, name });
        }
        match &symbol {
            Symbol::Value(value) => {
                self.globals.insert(name.clone(), value.clone());
            }
            Symbol::Line(_) => self.last_line = Some(name.clone()),
            Symbol::Element(_) => {}
        }
        self.symbols.insert(name, symbol);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Resolves `name` for use inside an expression.
    pub fn value(&self, name: &str, pos: Position) -> Result<&Value, GlpsError> {
        match self.symbols.get(name) {
            Some(Symbol::Value(value)) => Ok(value),
            Some(other) => Err(GlpsError::type_error(
                pos,
                format!("'{}' is {}, not a value", name, other.describe()),
            )),
            None => Err(GlpsError::UndefinedReference {
                pos,
                name: name.to_string(),
            }),
        }
    }

    /// Resolves `name` for use inside a LINE list.
    pub fn beamline_items(&self, name: &str, pos: Position) -> Result<&[ElementConfig], GlpsError> {
        match self.symbols.get(name) {
            Some(Symbol::Element(element)) => Ok(std::slice::from_ref(element)),
            Some(Symbol::Line(elements)) => Ok(elements),
            Some(other) => Err(GlpsError::type_error(
                pos,
                format!("'{}' is {}, not an element or line", name, other.describe()),
            )),
            None => Err(GlpsError::UndefinedReference {
                pos,
                name: name.to_string(),
            }),
        }
    }

    /// Consumes the table, selecting the most recently declared line.
    pub fn into_config(mut self) -> Result<Config, GlpsError> {
        let name = self.last_line.take().ok_or(GlpsError::NoBeamline)?;
        let elements = match self.symbols.remove(&name) {
            Some(Symbol::Line(elements)) => elements,
            _ => return Err(GlpsError::NoBeamline),
        };
        Ok(Config {
            name,
            globals: self.globals,
            elements,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::new(1, 1)
    }

    #[test]
    fn names_can_only_be_defined_once() {
        let mut table = SymbolTable::new();
        table
            .define("a".into(), Symbol::Value(Value::Scalar(1.0)), pos())
            .unwrap();
        let err = table
            .define("a".into(), Symbol::Element(ElementConfig::new("a", "drift")), pos())
            .unwrap_err();
        assert!(matches!(err, GlpsError::Redefinition { .. }));
    }

    #[test]
    fn value_lookup_distinguishes_undefined_from_wrong_kind() {
        let mut table = SymbolTable::new();
        table
            .define("d".into(), Symbol::Element(ElementConfig::new("d", "drift")), pos())
            .unwrap();
        assert!(matches!(
            table.value("x", pos()),
            Err(GlpsError::UndefinedReference { .. })
        ));
        assert!(matches!(table.value("d", pos()), Err(GlpsError::Type { .. })));
    }

    #[test]
    fn last_declared_line_is_selected() {
        let mut table = SymbolTable::new();
        let d = ElementConfig::new("d", "drift");
        table.define("d".into(), Symbol::Element(d.clone()), pos()).unwrap();
        table.define("l1".into(), Symbol::Line(vec![d.clone()]), pos()).unwrap();
        table
            .define("l2".into(), Symbol::Line(vec![d.clone(), d]), pos())
            .unwrap();
        let config = table.into_config().unwrap();
        assert_eq!(config.name, "l2");
        assert_eq!(config.elements.len(), 2);
    }

    #[test]
    fn table_without_lines_has_no_beamline() {
        let mut table = SymbolTable::new();
        table
            .define("a".into(), Symbol::Value(Value::Scalar(3.0)), pos())
            .unwrap();
        assert_eq!(table.into_config().unwrap_err(), GlpsError::NoBeamline);
    }
}
