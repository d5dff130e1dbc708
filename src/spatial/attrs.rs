use std::collections::HashMap;

use shapefile::dbase::{FieldValue, Record};

/// Typed attribute value decoded from a DBF field.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl AttrValue {
    /// Integer view of the value, rounding numeric fields. DBF stores most
    /// code columns as numerics even when they are integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(value) => Some(*value),
            AttrValue::Float(value) if value.is_finite() => Some(value.round() as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(value) => Some(*value as f64),
            AttrValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

/// Attribute payload of one indexed record.
pub type AttrMap = HashMap<String, AttrValue>;

/// Decode a DBF record into an attribute map. Empty fields and unsupported
/// field types are dropped.
pub(super) fn record_to_attrs(record: Record) -> AttrMap {
    let mut attrs = AttrMap::new();
    for (name, value) in record {
        let decoded = match value {
            FieldValue::Character(Some(text)) => AttrValue::Text(text.trim().to_string()),
            FieldValue::Numeric(Some(value)) => AttrValue::Float(value),
            FieldValue::Float(Some(value)) => AttrValue::Float(f64::from(value)),
            FieldValue::Integer(value) => AttrValue::Int(i64::from(value)),
            FieldValue::Logical(Some(value)) => AttrValue::Bool(value),
            _ => continue,
        };
        attrs.insert(name, decoded);
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_code_reads_as_integer() {
        assert_eq!(AttrValue::Float(12.0).as_i64(), Some(12));
        assert_eq!(AttrValue::Int(7).as_i64(), Some(7));
        assert_eq!(AttrValue::Text("12".to_string()).as_i64(), None);
        assert_eq!(AttrValue::Float(f64::NAN).as_i64(), None);
    }
}
