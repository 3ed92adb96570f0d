//! The patch applier.
//!
//! Application is directed by the kind of the live container being mutated:
//! a record patch only applies to a record and a sequence patch only to a
//! sequence. Anything else means the patch was computed against a different
//! value and is reported as [`DiffError::PatchTargetMismatch`]. On error the
//! target may already be partially mutated and must be discarded.

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::DiffConfig;
use crate::error::{DiffError, DiffResult};
use crate::kind::ValueKind;
use crate::patch::{Decoder, Patch, RecordPatch, SequencePatch};
use crate::path::ValuePath;

/// Applies patches according to a [`DiffConfig`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Patcher {
    config: DiffConfig,
}

impl Patcher {
    /// Create a patcher with the given configuration.
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    /// Apply `patch` to `target` in place.
    pub fn apply(&self, target: &mut Value, patch: Patch) -> DiffResult<()> {
        debug!(
            kind = %ValueKind::of(target),
            changes = patch.change_count(),
            "applying patch"
        );
        let mut path = ValuePath::root();
        self.apply_at(target, patch, &mut path)
    }

    /// Apply the result of a diff. `None` leaves the target untouched.
    pub fn apply_optional(&self, target: &mut Value, patch: Option<Patch>) -> DiffResult<()> {
        match patch {
            Some(patch) => self.apply(target, patch),
            None => Ok(()),
        }
    }

    /// Decode a wire patch against `target` and apply it.
    pub fn apply_wire(&self, target: &mut Value, wire: Value) -> DiffResult<()> {
        let decoder = Decoder {
            max_depth: self.config.max_depth,
        };
        let patch = decoder.decode(target, wire)?;
        self.apply(target, patch)
    }

    fn apply_at(&self, target: &mut Value, patch: Patch, path: &mut ValuePath) -> DiffResult<()> {
        match (target, patch) {
            (target, Patch::Replace(value)) => {
                *target = value;
                Ok(())
            }
            (Value::Object(map), Patch::Record(patch)) => self.apply_record(map, patch, path),
            (Value::Array(items), Patch::Sequence(patch)) => {
                self.apply_sequence(items, patch, path)
            }
            (target, patch) => Err(mismatch(
                path,
                format!(
                    "{} patch applied to a {}",
                    patch.target_kind().unwrap_or(ValueKind::Scalar),
                    ValueKind::of(target)
                ),
            )),
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

    fn apply_record(
        &self,
        map: &mut Map<String, Value>,
        patch: RecordPatch,
        path: &mut ValuePath,
    ) -> DiffResult<()> {
        self.enter(path)?;
        trace!(%path, removed = patch.removed.len(), changed = patch.changes.len(), "patching record");

        for key in &patch.removed {
            if map.shift_remove(key).is_none() {
                return Err(mismatch(path, format!("removed key `{key}` is not present")));
            }
        }

        for (key, change) in patch.changes {
            match change {
                Patch::Replace(value) => {
                    map.insert(key, value);
                }
                nested => {
                    let child = map.get_mut(&key).ok_or_else(|| {
                        mismatch(path, format!("nested patch for missing key `{key}`"))
                    })?;
                    path.push_key(&key);
                    self.apply_at(child, nested, path)?;
                    path.pop();
                }
            }
        }
        Ok(())
    }

    fn apply_sequence(
        &self,
        items: &mut Vec<Value>,
        mut patch: SequencePatch,
        path: &mut ValuePath,
    ) -> DiffResult<()> {
        self.enter(path)?;
        trace!(%path, changed = patch.changes.len(), len = ?patch.len, "patching sequence");

        patch.changes.sort_by_key(|(index, _)| *index);
        for (index, change) in patch.changes {
            let len = items.len();
            match change {
                Patch::Replace(value) if index < len => items[index] = value,
                Patch::Replace(value) if index == len => items.push(value),
                nested if index < len => {
                    path.push_index(index);
                    self.apply_at(&mut items[index], nested, path)?;
                    path.pop();
                }
                _ => {
                    return Err(mismatch(
                        path,
                        format!("index {index} is beyond sequence length {len}"),
                    ));
                }
            }
        }

        if let Some(len) = patch.len {
            if len > items.len() {
                return Err(mismatch(
                    path,
                    format!("new length {len} exceeds sequence length {}", items.len()),
                ));
            }
            items.truncate(len);
        }
        Ok(())
    }
}

fn mismatch(path: &ValuePath, reason: String) -> DiffError {
    DiffError::PatchTargetMismatch {
        path: path.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::Differ;
    use serde_json::json;

    fn round_trip(source: Value, target: Value) {
        let patch = Differ::default().diff(&source, &target).unwrap();
        let mut patched = source.clone();
        Patcher::default().apply_optional(&mut patched, patch).unwrap();
        assert_eq!(patched, target, "typed round trip from {source}");

        if let Some(patch) = Differ::default().diff(&source, &target).unwrap() {
            let mut patched = source.clone();
            Patcher::default()
                .apply_wire(&mut patched, patch.into_encoded(&source).unwrap())
                .unwrap();
            assert_eq!(patched, target, "wire round trip from {source}");
        }
    }

    #[test]
    fn record_round_trips() {
        round_trip(json!({}), json!({"a": 1}));
        round_trip(json!({"a": 1, "b": 2, "c": 3}), json!({"c": 3}));
        round_trip(json!({"a": {"b": "1", "c": "3"}}), json!({"a": {"d": "4"}}));
        round_trip(json!({"_a": 1, "__b": 2}), json!({"_a": 2}));
    }

    #[test]
    fn sequence_round_trips() {
        round_trip(json!({"a": [0, 1]}), json!({"a": [0, 1, 2]}));
        round_trip(json!({"a": [0, 1, 2]}), json!({"a": [0, 2]}));
        round_trip(json!([[1, 2], [3]]), json!([[1], [3, 4], []]));
        round_trip(json!([{"b": 2, "c": 3}]), json!([{"b": 4, "c": 3}, 5]));
    }

    #[test]
    fn kind_change_round_trips() {
        round_trip(json!({"a": [1, 2]}), json!({"a": {"b": 1}}));
        round_trip(json!({"a": [1, 2]}), json!({"a": {}}));
        round_trip(json!({"a": {"b": 1}}), json!({"a": [1]}));
        round_trip(json!([1]), json!("x"));
        round_trip(json!(null), json!({"a": [null]}));
    }

    #[test]
    fn removal_preserves_remaining_order() {
        let mut value = json!({"a": 1, "b": 2, "c": 3});
        Patcher::default()
            .apply_wire(&mut value, json!({"_r": "a"}))
            .unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn applying_no_change_is_a_no_op() {
        let mut value = json!({"a": [1, 2]});
        Patcher::default().apply_optional(&mut value, None).unwrap();
        assert_eq!(value, json!({"a": [1, 2]}));
    }

    #[test]
    fn record_patch_on_sequence_is_mismatch() {
        let mut value = json!({"a": [1, 2]});
        let patch = Patch::Record(RecordPatch {
            removed: vec![],
            changes: vec![(
                "a".into(),
                Patch::Record(RecordPatch {
                    removed: vec!["x".into()],
                    changes: vec![],
                }),
            )],
        });
        let err = Patcher::default().apply(&mut value, patch).unwrap_err();
        match err {
            DiffError::PatchTargetMismatch { path, reason } => {
                assert_eq!(path, "/a");
                assert!(reason.contains("record patch applied to a sequence"), "{reason}");
            }
            other => panic!("expected PatchTargetMismatch, got {:?}", other),
        }
    }

    #[test]
    fn missing_removed_key_is_mismatch() {
        let mut value = json!({"a": 1});
        let err = Patcher::default()
            .apply_wire(&mut value, json!({"_r": "zzz"}))
            .unwrap_err();
        assert!(matches!(err, DiffError::PatchTargetMismatch { .. }));
    }

    #[test]
    fn gap_in_sequence_is_mismatch() {
        let mut value = json!([1]);
        let err = Patcher::default()
            .apply_wire(&mut value, json!({"_3": 1, "_r": 4}))
            .unwrap_err();
        assert!(matches!(err, DiffError::PatchTargetMismatch { .. }));
    }

    #[test]
    fn growing_length_without_entries_is_mismatch() {
        let mut value = json!([1]);
        let err = Patcher::default()
            .apply_wire(&mut value, json!({"_r": 5}))
            .unwrap_err();
        assert!(matches!(err, DiffError::PatchTargetMismatch { .. }));
    }

    #[test]
    fn wire_patch_on_scalar_replaces() {
        let mut value = json!(3);
        Patcher::default()
            .apply_wire(&mut value, json!({"_0": 1}))
            .unwrap();
        assert_eq!(value, json!({"_0": 1}));
    }
}
