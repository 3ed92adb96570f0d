//! Structural diff and patch for JSON-shaped values.
//!
//! Computes a compact patch between two values built from records (objects),
//! sequences (arrays) and scalars, and applies it to a copy of the original to
//! reproduce the updated value. Unchanged subtrees contribute nothing to a
//! patch, and an unchanged value yields no patch at all.
//!
//! # Key Types
//!
//! - [`Patch`] / [`RecordPatch`] / [`SequencePatch`] -- typed patch tree and its wire form
//! - [`Differ`] -- computes patches
//! - [`Patcher`] -- applies patches, typed or wire-encoded
//! - [`DiffConfig`] -- depth limit and number comparison mode
//! - [`CaseSuite`] -- acceptance cases for the patch format
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//!
//! let before = json!({"a": [0, 1, 2], "_b": 1});
//! let after = json!({"a": [0, 2], "_b": 2});
//!
//! let patch = treepatch_diff::diff_values(&before, &after).unwrap().unwrap();
//! let wire = patch.encode(&before).unwrap();
//! assert_eq!(wire, json!({"a": {"_1": 2, "_r": 2}, "__b": 2}));
//!
//! let mut patched = before.clone();
//! treepatch_diff::apply_patch(&mut patched, patch).unwrap();
//! assert_eq!(patched, after);
//! ```

pub mod config;
pub mod differ;
pub mod error;
pub mod harness;
pub mod keys;
pub mod kind;
pub mod patch;
pub mod patcher;
pub mod path;

use serde::Serialize;
use serde_json::Value;

pub use config::{DiffConfig, NumberEquality};
pub use differ::Differ;
pub use error::{DiffError, DiffResult};
pub use harness::{builtin_cases, run_case, Case, CaseFailure, CaseReport, CaseSuite, SuiteReport};
pub use keys::{escape_key, unescape_key, REMOVED_KEY};
pub use kind::ValueKind;
pub use patch::{Patch, RecordPatch, SequencePatch};
pub use patcher::Patcher;
pub use path::ValuePath;

/// Compute the patch from `source` to `target` with the default configuration.
///
/// Returns `Ok(None)` when the values are equivalent.
pub fn diff_values(source: &Value, target: &Value) -> DiffResult<Option<Patch>> {
    Differ::default().diff(source, target)
}

/// Apply a patch produced by [`diff_values`] to the value it was computed from.
pub fn apply_patch(target: &mut Value, patch: Patch) -> DiffResult<()> {
    Patcher::default().apply(target, patch)
}

/// Decode a wire patch against `target` and apply it.
pub fn apply_wire(target: &mut Value, wire: Value) -> DiffResult<()> {
    Patcher::default().apply_wire(target, wire)
}

/// Diff two serializable values through their JSON representation.
pub fn diff_serializable<T: Serialize + ?Sized>(
    source: &T,
    target: &T,
) -> DiffResult<Option<Patch>> {
    let source = to_value(source)?;
    let target = to_value(target)?;
    diff_values(&source, &target)
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> DiffResult<Value> {
    serde_json::to_value(value).map_err(|e| DiffError::UnsupportedValueKind(e.to_string()))
}
