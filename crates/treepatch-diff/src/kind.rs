//! Value classification: every value is a record, a sequence or a scalar.

use std::fmt;

use serde_json::Value;

/// The structural kind of a value, which selects the diff and apply branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A string-keyed mapping (JSON object).
    Record,
    /// An ordered, index-keyed list (JSON array).
    Sequence,
    /// Everything else: strings, numbers, booleans and null.
    Scalar,
}

impl ValueKind {
    /// Classify a value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => ValueKind::Record,
            Value::Array(_) => ValueKind::Sequence,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                ValueKind::Scalar
            }
        }
    }

    /// Returns `true` for records and sequences.
    pub fn is_container(self) -> bool {
        !matches!(self, ValueKind::Scalar)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Record => f.write_str("record"),
            ValueKind::Sequence => f.write_str("sequence"),
            ValueKind::Scalar => f.write_str("scalar"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn objects_are_records() {
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Record);
        assert_eq!(ValueKind::of(&json!({"a": [1]})), ValueKind::Record);
    }

    #[test]
    fn arrays_are_sequences() {
        assert_eq!(ValueKind::of(&json!([])), ValueKind::Sequence);
        assert_eq!(ValueKind::of(&json!([{"a": 1}])), ValueKind::Sequence);
    }

    #[test]
    fn everything_else_is_scalar() {
        for v in [json!(null), json!(true), json!(0), json!(-1.5), json!("x")] {
            assert_eq!(ValueKind::of(&v), ValueKind::Scalar, "{v}");
            assert!(!ValueKind::of(&v).is_container());
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(ValueKind::Record.to_string(), "record");
        assert_eq!(ValueKind::Sequence.to_string(), "sequence");
    }
}
