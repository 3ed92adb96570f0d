use serde::{Deserialize, Serialize};

/// How two JSON numbers are compared when diffing scalars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberEquality {
    /// Compare by JSON representation, so `1` and `1.0` differ. Applying a
    /// patch reproduces the target exactly.
    #[default]
    Strict,
    /// Compare by numeric value, so `1` and `1.0` are equal. A round trip
    /// then reproduces the target only up to numeric equality.
    Numeric,
}

/// Configuration shared by the diff engine and the patch applier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Maximum number of nested containers visited before giving up.
    pub max_depth: usize,
    /// Scalar number comparison mode.
    pub number_equality: NumberEquality,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            number_equality: NumberEquality::Strict,
        }
    }
}

impl DiffConfig {
    /// A configuration that treats numbers as equal only when their JSON
    /// representations match. This is the default.
    pub fn strict() -> Self {
        Self {
            number_equality: NumberEquality::Strict,
            ..Default::default()
        }
    }

    /// A configuration that treats `1` and `1.0` as the same value.
    pub fn numeric() -> Self {
        Self {
            number_equality: NumberEquality::Numeric,
            ..Default::default()
        }
    }
}
