//! Acceptance cases: literal before/after pairs with the patch expected
//! between them.
//!
//! Each case checks two things: the computed wire patch equals the expected
//! one, and applying it to a copy of `before` yields a value the differ
//! considers equal to `after`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::{DiffConfig, NumberEquality};
use crate::differ::Differ;
use crate::error::{DiffError, DiffResult};
use crate::patcher::Patcher;

/// A single acceptance case. A missing or `null` `expected` means no change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub name: String,
    pub before: Value,
    pub after: Value,
    #[serde(default)]
    pub expected: Option<Value>,
}

impl Case {
    pub fn new(name: impl Into<String>, before: Value, after: Value, expected: Value) -> Self {
        Self {
            name: name.into(),
            before,
            after,
            expected: (!expected.is_null()).then_some(expected),
        }
    }
}

/// Why a case failed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaseFailure {
    /// The computed patch differs from the expected one.
    UnexpectedPatch {
        expected: Option<Value>,
        actual: Option<Value>,
    },
    /// Applying the patch did not reproduce `after`.
    RoundTripMismatch { expected: Value, actual: Value },
    /// Diffing or applying returned an error.
    Error { message: String },
}

/// The outcome of running one case.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub failure: Option<CaseFailure>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Run one case.
pub fn run_case(case: &Case, config: &DiffConfig) -> CaseReport {
    let failure = match check_case(case, config) {
        Ok(failure) => failure,
        Err(e) => Some(CaseFailure::Error {
            message: e.to_string(),
        }),
    };
    CaseReport {
        name: case.name.clone(),
        failure,
    }
}

fn check_case(case: &Case, config: &DiffConfig) -> DiffResult<Option<CaseFailure>> {
    let differ = Differ::new(*config);
    let patch = differ.diff(&case.before, &case.after)?;
    let actual = patch.as_ref().map(|p| p.encode(&case.before)).transpose()?;
    if actual != case.expected {
        return Ok(Some(CaseFailure::UnexpectedPatch {
            expected: case.expected.clone(),
            actual,
        }));
    }

    let mut patched = case.before.clone();
    Patcher::new(*config).apply_optional(&mut patched, patch)?;
    let equivalent = match config.number_equality {
        NumberEquality::Strict => patched == case.after,
        NumberEquality::Numeric => differ.diff(&patched, &case.after)?.is_none(),
    };
    if !equivalent {
        return Ok(Some(CaseFailure::RoundTripMismatch {
            expected: case.after.clone(),
            actual: patched,
        }));
    }
    Ok(None)
}

/// A named collection of cases.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaseSuite {
    pub cases: Vec<Case>,
}

impl CaseSuite {
    /// Parse a JSON array of cases.
    pub fn from_json(text: &str) -> DiffResult<Self> {
        let cases = serde_json::from_str(text).map_err(|e| DiffError::Serialization(e.to_string()))?;
        Ok(Self { cases })
    }

    /// The built-in acceptance table.
    pub fn builtin() -> Self {
        Self {
            cases: builtin_cases(),
        }
    }

    /// Run every case in order.
    pub fn run(&self, config: &DiffConfig) -> SuiteReport {
        SuiteReport {
            reports: self.cases.iter().map(|c| run_case(c, config)).collect(),
        }
    }
}

/// Results of a suite run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SuiteReport {
    pub reports: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.passed()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }
}

/// The acceptance table every implementation of the patch format must pass.
pub fn builtin_cases() -> Vec<Case> {
    vec![
        Case::new("identity.0", json!({}), json!({}), json!(null)),
        Case::new("identity.1", json!({"a": "1", "b": "2"}), json!({"a": "1", "b": "2"}), json!(null)),
        Case::new("add.0", json!({}), json!({"a": 1}), json!({"a": 1})),
        Case::new(
            "add.1",
            json!({"a": "1"}),
            json!({"a": "1", "b": {"c": {"d": "3"}, "e": 4}}),
            json!({"b": {"c": {"d": "3"}, "e": 4}}),
        ),
        Case::new("remove.0", json!({"a": 1, "b": 2, "c": 3}), json!({"b": 2, "c": 3}), json!({"_r": "a"})),
        Case::new("remove.1", json!({"a": 1, "b": 2, "c": 3}), json!({"c": 3}), json!({"_r": ["a", "b"]})),
        Case::new("remove.2", json!({"a": 1, "b": 2, "c": 3}), json!({}), json!({"_r": ["a", "b", "c"]})),
        Case::new(
            "object.0",
            json!({"a": {"b": "1", "c": "3"}}),
            json!({"a": {"b": "2", "c": "3"}}),
            json!({"a": {"b": "2"}}),
        ),
        Case::new(
            "object.1",
            json!({"a": {"b": "1", "c": "3"}}),
            json!({"a": {"c": "3"}}),
            json!({"a": {"_r": "b"}}),
        ),
        Case::new(
            "object.2",
            json!({"a": {"b": "1", "c": "3"}}),
            json!({"a": {}}),
            json!({"a": {"_r": ["b", "c"]}}),
        ),
        Case::new(
            "object.3",
            json!({"a": {"b": "1", "c": "3"}}),
            json!({"a": {"d": "4"}}),
            json!({"a": {"_r": ["b", "c"], "d": "4"}}),
        ),
        Case::new("replace.0", json!({"a": 1}), json!({"a": "1"}), json!({"a": "1"})),
        Case::new("replace.1", json!({"a": 1}), json!({"a": {"b": "1"}}), json!({"a": {"b": "1"}})),
        Case::new("replace.2", json!({"a": 1}), json!({"a": []}), json!({"a": []})),
        Case::new("replace.3", json!({"a": []}), json!({"a": 1}), json!({"a": 1})),
        Case::new("replace.4", json!({"a": 1}), json!({"a": ["a", "b"]}), json!({"a": ["a", "b"]})),
        Case::new("array.0", json!({"a": [0, 1]}), json!({"a": [0, 1, 2]}), json!({"a": {"_2": 2, "_r": 3}})),
        Case::new("array.1", json!({"a": [0, 1, 2]}), json!({"a": [0, 1]}), json!({"a": {"_r": 2}})),
        Case::new("array.2", json!({"a": [0, 1, 2]}), json!({"a": [0, 2]}), json!({"a": {"_r": 2, "_1": 2}})),
        Case::new(
            "array.3",
            json!({"a": [0, "1", {"b": 2, "c": 3}]}),
            json!({"a": [0, "1", {"b": 2, "c": 3}]}),
            json!(null),
        ),
        Case::new(
            "array.4",
            json!({"a": [0, "1", {"b": 2, "c": 3}]}),
            json!({"a": ["a", "1", {"b": 2, "c": 3}]}),
            json!({"a": {"_0": "a"}}),
        ),
        Case::new(
            "array.5",
            json!({"a": [0, "1", {"b": 2, "c": 3}]}),
            json!({"a": [0, {"d": 4}, {"b": 2, "c": 3}]}),
            json!({"a": {"_1": {"d": 4}}}),
        ),
        Case::new(
            "array.6",
            json!({"a": [0, "1", {"b": 2, "c": 3}]}),
            json!({"a": [0, "1", "4"]}),
            json!({"a": {"_2": "4"}}),
        ),
        Case::new(
            "array.7",
            json!({"a": [0, "1", {"b": 2, "c": 3}]}),
            json!({"a": [0, "1", {"b": 4, "c": 3}]}),
            json!({"a": {"_2": {"b": 4}}}),
        ),
        Case::new(
            "array.8",
            json!({"a": [0, "1", {"b": 2, "c": 3}]}),
            json!({"a": [{"b": 2, "c": 3}, 0, "1"]}),
            json!({"a": {"_0": {"b": 2, "c": 3}, "_1": 0, "_2": "1"}}),
        ),
        Case::new("escape.0", json!({"_a": 1}), json!({"_a": 2}), json!({"__a": 2})),
        Case::new("escape.1", json!({"__a": 1}), json!({"__a": 2}), json!({"___a": 2})),
        Case::new("escape.2", json!({"_a": 1}), json!({}), json!({"_r": "_a"})),
        Case::new("escape.3", json!({"_a": 1, "_b": 2}), json!({}), json!({"_r": ["_a", "_b"]})),
    ]
}
