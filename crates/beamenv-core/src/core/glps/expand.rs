use super::error::GlpsError;
use super::symbols::SymbolTable;
use super::token::Position;
use crate::core::config::{ElementConfig, Value};

/// Upper bound on the length of one flattened beamline.
pub const MAX_BEAMLINE_ELEMENTS: usize = 1 << 24;

/// Accumulates the flattened contents of a LINE statement item by item.
#[derive(Debug, Default)]
pub struct LineBuilder {
    elements: Vec<ElementConfig>,
}

impl LineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts an evaluated repeat factor into a count, truncating toward zero.
    pub fn repeat_count(factor: &Value, pos: Position) -> Result<usize, GlpsError> {
        let Value::Scalar(raw) = factor else {
            return Err(GlpsError::type_error(
                pos,
                format!("Line repeat factor must be scalar not type {}", factor.type_name()),
            ));
        };
        let count = raw.trunc();
        if !count.is_finite() || count < 0.0 || count > MAX_BEAMLINE_ELEMENTS as f64 {
            return Err(GlpsError::calc_error(
                pos,
                format!("line repeat factor {} is not a valid element count", raw),
            ));
        }
        Ok(count as usize)
    }

    /// Appends `count` independent copies of the element or line called `name`.
    pub fn push(
        &mut self,
        symbols: &SymbolTable,
        name: &str,
        count: usize,
        pos: Position,
    ) -> Result<(), GlpsError> {
        let items = symbols.beamline_items(name, pos)?;
        let total = items
            .len()
            .checked_mul(count)
            .and_then(|n| n.checked_add(self.elements.len()))
            .filter(|&n| n <= MAX_BEAMLINE_ELEMENTS);
        if total.is_none() {
            return Err(GlpsError::calc_error(
                pos,
                format!(
                    "line expansion exceeds {} elements",
                    MAX_BEAMLINE_ELEMENTS
                ),
            ));
        }
        for _ in 0..count {
            self.elements.extend_from_slice(items);
        }
        Ok(())
    }

    pub fn finish(self) -> Vec<ElementConfig> {
        self.elements
    }
}
