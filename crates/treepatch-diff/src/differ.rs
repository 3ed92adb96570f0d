//! The diff engine: compute a [`Patch`] between two values.
//!
//! Records are compared key by key, sequences strictly by position. Values of
//! different kinds, and records or sequences that gain entries with no
//! counterpart, are carried as full replacements. Unchanged subtrees produce
//! no patch at all, so they contribute nothing to the enclosing one.

use serde_json::{Map, Number, Value};
use tracing::{debug, trace};

use crate::config::{DiffConfig, NumberEquality};
use crate::error::{DiffError, DiffResult};
use crate::kind::ValueKind;
use crate::patch::{Patch, RecordPatch, SequencePatch};
use crate::path::ValuePath;

/// Computes patches according to a [`DiffConfig`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Differ {
    config: DiffConfig,
}

impl Differ {
    /// Create a differ with the given configuration.
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Compute the patch that turns `source` into `target`.
    ///
    /// Returns `Ok(None)` when the values are equivalent. Every pair of
    /// values has a patch; the one failure is
    /// [`DiffError::DepthLimitExceeded`], a deliberate limit on input nesting
    /// set by [`DiffConfig::max_depth`] so that hostile documents cannot
    /// exhaust the stack.
    pub fn diff(&self, source: &Value, target: &Value) -> DiffResult<Option<Patch>> {
        let mut path = ValuePath::root();
        let patch = self.diff_at(source, target, &mut path)?;
        debug!(
            kind = %ValueKind::of(source),
            changes = patch.as_ref().map_or(0, Patch::change_count),
            "diff computed"
        );
        Ok(patch)
    }

    fn diff_at(
        &self,
        source: &Value,
        target: &Value,
        path: &mut ValuePath,
    ) -> DiffResult<Option<Patch>> {
        match (source, target) {
            (Value::Object(source), Value::Object(target)) => {
                self.diff_record(source, target, path)
            }
            (Value::Array(source), Value::Array(target)) => {
                self.diff_sequence(source, target, path)
            }
            (source, target) if ValueKind::of(source) != ValueKind::of(target) => {
                trace!(%path, from = %ValueKind::of(source), to = %ValueKind::of(target), "kind changed");
                Ok(Some(Patch::Replace(target.clone())))
            }
            (source, target) if self.scalars_equal(source, target) => Ok(None),
            (_, target) => Ok(Some(Patch::Replace(target.clone()))),
        }
    }

    fn enter(&self, path: &ValuePath) -> DiffResult<()> {
        if path.depth() >= self.config.max_depth {
            return Err(DiffError::DepthLimitExceeded {
                limit: self.config.max_depth,
            });
        }
        Ok(())
    }

    fn diff_record(
        &self,
        source: &Map<String, Value>,
        target: &Map<String, Value>,
        path: &mut ValuePath,
    ) -> DiffResult<Option<Patch>> {
        self.enter(path)?;

        let removed: Vec<String> = source
            .keys()
            .filter(|key| !target.contains_key(*key))
            .cloned()
            .collect();

        let mut changes = Vec::new();
        for (key, new_value) in target {
            match source.get(key) {
                Some(old_value) => {
                    path.push_key(key);
                    let change = self.diff_at(old_value, new_value, path)?;
                    path.pop();
                    if let Some(change) = change {
                        changes.push((key.clone(), change));
                    }
                }
                None => changes.push((key.clone(), Patch::Replace(new_value.clone()))),
            }
        }

        let patch = RecordPatch { removed, changes };
        if patch.is_empty() {
            return Ok(None);
        }
        trace!(%path, removed = patch.removed.len(), changed = patch.changes.len(), "record differs");
        Ok(Some(Patch::Record(patch)))
    }

    fn diff_sequence(
        &self,
        source: &[Value],
        target: &[Value],
        path: &mut ValuePath,
    ) -> DiffResult<Option<Patch>> {
        self.enter(path)?;

        let shared = source.len().min(target.len());
        let mut changes = Vec::new();
        for (index, (old_value, new_value)) in source.iter().zip(target).enumerate() {
            path.push_index(index);
            let change = self.diff_at(old_value, new_value, path)?;
            path.pop();
            if let Some(change) = change {
                changes.push((index, change));
            }
        }
        for (index, new_value) in target.iter().enumerate().skip(shared) {
            changes.push((index, Patch::Replace(new_value.clone())));
        }

        let len = (source.len() != target.len()).then_some(target.len());
        let patch = SequencePatch { changes, len };
        if patch.is_empty() {
            return Ok(None);
        }
        trace!(%path, changed = patch.changes.len(), len = ?patch.len, "sequence differs");
        Ok(Some(Patch::Sequence(patch)))
    }

    fn scalars_equal(&self, a: &Value, b: &Value) -> bool {
        match (a, b, self.config.number_equality) {
            (Value::Number(a), Value::Number(b), NumberEquality::Numeric) => numbers_equal(a, b),
            _ => a == b,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    if a == b {
        return true;
    }
    match (a.is_f64(), b.is_f64()) {
        (false, false) => false,
        (true, true) => a.as_f64() == b.as_f64(),
        (true, false) => a.as_f64().is_some_and(|f| float_equals_integer(f, b)),
        (false, true) => b.as_f64().is_some_and(|f| float_equals_integer(f, a)),
    }
}

/// Exact comparison: the float must be integral, in range, and convert to
/// precisely the same integer.
fn float_equals_integer(f: f64, n: &Number) -> bool {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

    if !f.is_finite() || f.fract() != 0.0 {
        return false;
    }
    if let Some(i) = n.as_i64() {
        (-TWO_POW_63..TWO_POW_63).contains(&f) && f as i64 == i
    } else if let Some(u) = n.as_u64() {
        (0.0..TWO_POW_64).contains(&f) && f as u64 == u
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diff(source: Value, target: Value) -> Option<Value> {
        Differ::default()
            .diff(&source, &target)
            .unwrap()
            .map(|p| p.into_encoded(&source).unwrap())
    }

    #[test]
    fn equal_values_produce_no_patch() {
        assert_eq!(diff(json!({}), json!({})), None);
        assert_eq!(diff(json!({"a": "1", "b": "2"}), json!({"a": "1", "b": "2"})), None);
        assert_eq!(diff(json!([1, [2, {"x": null}]]), json!([1, [2, {"x": null}]])), None);
        assert_eq!(diff(json!("s"), json!("s")), None);
    }

    #[test]
    fn scalar_change_is_replacement() {
        assert_eq!(diff(json!(1), json!(2)), Some(json!(2)));
        assert_eq!(diff(json!(1), json!("1")), Some(json!("1")));
        assert_eq!(diff(json!(true), json!(null)), Some(json!(null)));
    }

    #[test]
    fn added_keys_are_full_values() {
        assert_eq!(
            diff(json!({"a": "1"}), json!({"a": "1", "b": {"c": {"d": "3"}, "e": 4}})),
            Some(json!({"b": {"c": {"d": "3"}, "e": 4}}))
        );
    }

    #[test]
    fn removals_follow_source_order() {
        assert_eq!(diff(json!({"a": 1, "b": 2, "c": 3}), json!({"b": 2, "c": 3})), Some(json!({"_r": "a"})));
        assert_eq!(diff(json!({"a": 1, "b": 2, "c": 3}), json!({"c": 3})), Some(json!({"_r": ["a", "b"]})));

        let patch = diff(json!({"c": 1, "a": 2, "b": 3}), json!({})).unwrap();
        assert_eq!(patch["_r"], json!(["c", "a", "b"]));
    }

    #[test]
    fn nested_record_changes() {
        assert_eq!(
            diff(json!({"a": {"b": "1", "c": "3"}}), json!({"a": {"b": "2", "c": "3"}})),
            Some(json!({"a": {"b": "2"}}))
        );
        assert_eq!(
            diff(json!({"a": {"b": "1", "c": "3"}}), json!({"a": {"d": "4"}})),
            Some(json!({"a": {"_r": ["b", "c"], "d": "4"}}))
        );
    }

    #[test]
    fn kind_change_is_replacement() {
        assert_eq!(diff(json!({"a": 1}), json!({"a": []})), Some(json!({"a": []})));
        assert_eq!(diff(json!({"a": []}), json!({"a": 1})), Some(json!({"a": 1})));
        assert_eq!(diff(json!({"a": [1]}), json!({"a": {"b": 1}})), Some(json!({"a": {"b": 1}})));
    }

    #[test]
    fn sequences_are_positional() {
        assert_eq!(diff(json!([0, 1]), json!([0, 1, 2])), Some(json!({"_2": 2, "_r": 3})));
        assert_eq!(diff(json!([0, 1, 2]), json!([0, 1])), Some(json!({"_r": 2})));
        assert_eq!(diff(json!([0, 1, 2]), json!([0, 2])), Some(json!({"_1": 2, "_r": 2})));
        assert_eq!(
            diff(json!([0, "1", {"b": 2, "c": 3}]), json!([{"b": 2, "c": 3}, 0, "1"])),
            Some(json!({"_0": {"b": 2, "c": 3}, "_1": 0, "_2": "1"}))
        );
    }

    #[test]
    fn nested_record_inside_sequence() {
        assert_eq!(
            diff(json!([0, "1", {"b": 2, "c": 3}]), json!([0, "1", {"b": 4, "c": 3}])),
            Some(json!({"_2": {"b": 4}}))
        );
    }

    #[test]
    fn escaped_keys() {
        assert_eq!(diff(json!({"_a": 1}), json!({"_a": 2})), Some(json!({"__a": 2})));
        assert_eq!(diff(json!({"__a": 1}), json!({"__a": 2})), Some(json!({"___a": 2})));
        assert_eq!(diff(json!({"_a": 1}), json!({})), Some(json!({"_r": "_a"})));
        assert_eq!(diff(json!({"_a": 1, "_b": 2}), json!({})), Some(json!({"_r": ["_a", "_b"]})));
    }

    #[test]
    fn strict_equality_keeps_representation() {
        assert_eq!(diff(json!({"n": 1}), json!({"n": 1.0})), Some(json!({"n": 1.0})));
        assert_eq!(diff(json!({"n": 1.0}), json!({"n": 1.0})), None);
    }

    #[test]
    fn numeric_equality_ignores_representation() {
        let numeric = Differ::new(DiffConfig::numeric());
        assert_eq!(numeric.diff(&json!({"n": 1}), &json!({"n": 1.0})).unwrap(), None);
        assert_eq!(numeric.diff(&json!(-3), &json!(-3.0)).unwrap(), None);
        assert_eq!(
            numeric.diff(&json!({"n": 1}), &json!({"n": 1.5})).unwrap(),
            Some(Patch::Record(RecordPatch {
                removed: Vec::new(),
                changes: vec![("n".into(), Patch::Replace(json!(1.5)))],
            }))
        );
    }

    #[test]
    fn large_integers_compare_exactly() {
        let a = json!(9_007_199_254_740_993_u64);
        let b = json!(9_007_199_254_740_992_u64);
        assert_eq!(diff(a, b.clone()), Some(b));
    }

    #[test]
    fn integer_and_float_compare_exactly() {
        let numeric = Differ::new(DiffConfig::numeric());
        let int = json!(9_007_199_254_740_993_u64);
        let float = json!(9_007_199_254_740_992.0);
        assert_eq!(numeric.diff(&int, &float).unwrap(), Some(Patch::Replace(float.clone())));
        assert_eq!(numeric.diff(&float, &int).unwrap(), Some(Patch::Replace(int)));

        let max = json!(u64::MAX);
        let two_pow_64 = json!(18_446_744_073_709_551_616.0);
        assert!(numeric.diff(&max, &two_pow_64).unwrap().is_some());
        let min = json!(i64::MIN);
        let neg_two_pow_63 = json!(-9_223_372_036_854_775_808.0);
        assert_eq!(numeric.diff(&min, &neg_two_pow_63).unwrap(), None);
    }

    #[test]
    fn sequence_replaced_by_control_looking_record() {
        let source = json!({"a": [1, 2]});
        let target = json!({"a": {"_0": 1}});
        let patch = Differ::default().diff(&source, &target).unwrap().unwrap();

        let mut patched = source.clone();
        crate::Patcher::default().apply(&mut patched, patch.clone()).unwrap();
        assert_eq!(patched, target);

        let err = patch.encode(&source).unwrap_err();
        assert_eq!(err, DiffError::AmbiguousReplacement { path: "/a".into() });

        // An empty record or one with ordinary keys encodes unambiguously.
        assert_eq!(diff(json!([1]), json!({})), Some(json!({})));
        assert_eq!(diff(json!([1]), json!({"_r": "x"})), Some(json!({"_r": "x"})));
    }

    #[test]
    fn depth_limit_is_enforced() {
        let differ = Differ::new(DiffConfig {
            max_depth: 2,
            ..Default::default()
        });
        assert!(differ.diff(&json!({"a": {"b": 1}}), &json!({"a": {"b": 2}})).is_ok());

        let err = differ
            .diff(&json!({"a": {"b": {"c": 1}}}), &json!({"a": {"b": {"c": 2}}}))
            .unwrap_err();
        assert_eq!(err, DiffError::DepthLimitExceeded { limit: 2 });
    }
}
