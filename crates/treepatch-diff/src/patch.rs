//! The patch model and its JSON wire form.
//!
//! A [`Patch`] is either a full replacement value or a nested patch for a
//! record or a sequence. On the wire both nested flavors are plain JSON
//! objects that reuse the same control keys, so a wire patch can only be
//! decoded against the value it is meant to be applied to.
//!
//! # Wire format
//!
//! - Record patch: escaped key -> replacement value or nested patch, plus
//!   `_r` naming the removed keys (a bare string for one, a list for more).
//! - Sequence patch: `_<index>` -> replacement value or nested patch, plus
//!   `_r` holding the new length when it changed.

use serde_json::{Map, Value};

use crate::error::{DiffError, DiffResult};
use crate::keys::{
    escape_key, index_key, is_control_form, parse_index_key, unescape_key, REMOVED_KEY,
};
use crate::kind::ValueKind;
use crate::path::ValuePath;

/// A structural description of how one value differs from another.
#[derive(Clone, Debug, PartialEq)]
pub enum Patch {
    /// Take this value verbatim.
    Replace(Value),
    /// Patch a record in place.
    Record(RecordPatch),
    /// Patch a sequence in place.
    Sequence(SequencePatch),
}

/// Changes to a record. Keys are stored unescaped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordPatch {
    /// Keys removed from the source, in source order.
    pub removed: Vec<String>,
    /// Added or changed keys, in target order.
    pub changes: Vec<(String, Patch)>,
}

impl RecordPatch {
    /// Returns `true` if nothing is added, changed or removed.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.changes.is_empty()
    }
}

/// Changes to a sequence, by position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SequencePatch {
    /// Changed or appended positions, ascending.
    pub changes: Vec<(usize, Patch)>,
    /// The new length, present only when it differs from the source.
    pub len: Option<usize>,
}

impl SequencePatch {
    /// Returns `true` if no position changed and the length is unchanged.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.len.is_none()
    }
}

impl Patch {
    /// The container kind a nested patch applies to, or `None` for a
    /// replacement.
    pub fn target_kind(&self) -> Option<ValueKind> {
        match self {
            Patch::Replace(_) => None,
            Patch::Record(_) => Some(ValueKind::Record),
            Patch::Sequence(_) => Some(ValueKind::Sequence),
        }
    }

    /// Number of individual edits: replacements, removals and length changes.
    pub fn change_count(&self) -> usize {
        match self {
            Patch::Replace(_) => 1,
            Patch::Record(p) => {
                p.removed.len() + p.changes.iter().map(|(_, c)| c.change_count()).sum::<usize>()
            }
            Patch::Sequence(p) => {
                usize::from(p.len.is_some())
                    + p.changes.iter().map(|(_, c)| c.change_count()).sum::<usize>()
            }
        }
    }

    /// Encode into the wire form for `source`, the value the patch was
    /// computed from.
    ///
    /// A sequence replaced by a record whose keys all read as sequence
    /// control keys cannot be told apart from a sequence patch on the wire,
    /// so that case is rejected with [`DiffError::AmbiguousReplacement`].
    /// The typed patch itself stays applicable.
    pub fn encode(&self, source: &Value) -> DiffResult<Value> {
        self.clone().into_encoded(source)
    }

    /// Like [`Patch::encode`], moving replacement payloads.
    pub fn into_encoded(self, source: &Value) -> DiffResult<Value> {
        let mut path = ValuePath::root();
        encode_at(self, Some(source), &mut path)
    }

    /// Decode a wire patch for `container`, the value it will be applied to.
    pub fn decode(container: &Value, wire: Value) -> DiffResult<Patch> {
        Decoder { max_depth: usize::MAX }.decode(container, wire)
    }
}

fn encode_at(patch: Patch, source: Option<&Value>, path: &mut ValuePath) -> DiffResult<Value> {
    match patch {
        Patch::Replace(value) => {
            if let (Some(Value::Array(_)), Value::Object(map)) = (source, &value) {
                if looks_like_sequence_patch(map) {
                    return Err(DiffError::AmbiguousReplacement {
                        path: path.to_string(),
                    });
                }
            }
            Ok(value)
        }
        Patch::Record(p) => {
            let children = source.and_then(Value::as_object);
            let mut map = Map::new();
            for (key, change) in p.changes {
                path.push_key(&key);
                let child = children.and_then(|c| c.get(&key));
                let wire = encode_at(change, child, path)?;
                path.pop();
                map.insert(escape_key(&key), wire);
            }
            if let Some(removed) = encode_removed(p.removed) {
                map.insert(REMOVED_KEY.to_owned(), removed);
            }
            Ok(Value::Object(map))
        }
        Patch::Sequence(p) => {
            let items = source.and_then(Value::as_array);
            let mut map = Map::new();
            for (index, change) in p.changes {
                path.push_index(index);
                let child = items.and_then(|items| items.get(index));
                let wire = encode_at(change, child, path)?;
                path.pop();
                map.insert(index_key(index), wire);
            }
            if let Some(len) = p.len {
                map.insert(REMOVED_KEY.to_owned(), Value::from(len));
            }
            Ok(Value::Object(map))
        }
    }
}

fn encode_removed(mut removed: Vec<String>) -> Option<Value> {
    match removed.len() {
        0 => None,
        1 => removed.pop().map(Value::String),
        _ => Some(Value::Array(removed.into_iter().map(Value::String).collect())),
    }
}

/// Returns `true` if `map` could be a sequence patch: non-empty, and every
/// key is either an index key or `_r` holding a non-negative integer.
pub fn looks_like_sequence_patch(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map.iter().all(|(key, value)| {
            if key == REMOVED_KEY {
                value.is_u64()
            } else {
                parse_index_key(key).is_some()
            }
        })
}

/// Type-directed wire decoder.
pub(crate) struct Decoder {
    pub(crate) max_depth: usize,
}

impl Decoder {
    pub(crate) fn decode(&self, container: &Value, wire: Value) -> DiffResult<Patch> {
        let mut path = ValuePath::root();
        self.decode_at(container, wire, &mut path)
    }

    fn decode_at(&self, container: &Value, wire: Value, path: &mut ValuePath) -> DiffResult<Patch> {
        match (container, wire) {
            (Value::Object(source), Value::Object(map)) => {
                self.check_depth(path)?;
                self.decode_record(source, map, path).map(Patch::Record)
            }
            (Value::Array(source), Value::Object(map)) if looks_like_sequence_patch(&map) => {
                self.check_depth(path)?;
                self.decode_sequence(source, map, path).map(Patch::Sequence)
            }
            (_, wire) => Ok(Patch::Replace(wire)),
        }
    }

    fn check_depth(&self, path: &ValuePath) -> DiffResult<()> {
        if path.depth() >= self.max_depth {
            return Err(DiffError::DepthLimitExceeded {
                limit: self.max_depth,
            });
        }
        Ok(())
    }

    fn decode_record(
        &self,
        source: &Map<String, Value>,
        map: Map<String, Value>,
        path: &mut ValuePath,
    ) -> DiffResult<RecordPatch> {
        let mut patch = RecordPatch::default();
        for (key, value) in map {
            if key == REMOVED_KEY {
                patch.removed = decode_removed(value, path)?;
                continue;
            }
            if is_control_form(&key) {
                return Err(DiffError::MalformedPatch {
                    path: path.to_string(),
                    reason: format!("unexpected control key `{key}` in record patch"),
                });
            }
            let real_key = unescape_key(&key).to_owned();
            let change = match source.get(&real_key) {
                Some(child) => {
                    path.push_key(&real_key);
                    let change = self.decode_at(child, value, path)?;
                    path.pop();
                    change
                }
                None => Patch::Replace(value),
            };
            patch.changes.push((real_key, change));
        }
        Ok(patch)
    }

    fn decode_sequence(
        &self,
        source: &[Value],
        map: Map<String, Value>,
        path: &mut ValuePath,
    ) -> DiffResult<SequencePatch> {
        let mut patch = SequencePatch::default();
        for (key, value) in map {
            if key == REMOVED_KEY {
                let len = value
                    .as_u64()
                    .and_then(|len| usize::try_from(len).ok())
                    .ok_or_else(|| DiffError::MalformedPatch {
                        path: path.to_string(),
                        reason: format!("sequence length {value} is not a valid length"),
                    })?;
                patch.len = Some(len);
                continue;
            }
            let index = parse_index_key(&key).ok_or_else(|| DiffError::MalformedPatch {
                path: path.to_string(),
                reason: format!("`{key}` is not a sequence index key"),
            })?;
            let change = match source.get(index) {
                Some(child) => {
                    path.push_index(index);
                    let change = self.decode_at(child, value, path)?;
                    path.pop();
                    change
                }
                None => Patch::Replace(value),
            };
            patch.changes.push((index, change));
        }
        patch.changes.sort_by_key(|(index, _)| *index);
        Ok(patch)
    }
}

fn decode_removed(value: Value, path: &ValuePath) -> DiffResult<Vec<String>> {
    let malformed = || DiffError::MalformedPatch {
        path: path.to_string(),
        reason: "`_r` in a record patch must be a key name or a list of key names".into(),
    };
    match value {
        Value::String(key) => Ok(vec![key]),
        Value::Array(keys) => keys
            .into_iter()
            .map(|key| match key {
                Value::String(key) => Ok(key),
                _ => Err(malformed()),
            })
            .collect(),
        _ => Err(malformed()),
    }
}
