//! The value mapping produced by argv extraction.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Presence of an argument in a [`ValueMapping`].
///
/// `Empty` and `Absent` are deliberately different: `Empty` means the user
/// explicitly supplied an empty/undefined value (`null`), `Absent` means the
/// argument was never touched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Presence<'a> {
    /// No key for this argument.
    Absent,
    /// Key present with the `null` marker.
    Empty,
    /// Key present with a value.
    Value(&'a Value),
}

impl Presence<'_> {
    /// Whether the key exists at all.
    pub fn is_present(&self) -> bool {
        !matches!(self, Presence::Absent)
    }
}

/// Mapping from canonical argument name to extracted value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueMapping {
    values: BTreeMap<String, Value>,
}

impl ValueMapping {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Three-state lookup.
    pub fn presence(&self, name: &str) -> Presence<'_> {
        match self.values.get(name) {
            None => Presence::Absent,
            Some(Value::Null) => Presence::Empty,
            Some(v) => Presence::Value(v),
        }
    }

    /// Whether the key exists (including the explicit-empty state).
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Raw lookup; `Some(&Value::Null)` for explicit-empty.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Insert or replace a value, returning the previous one.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    /// Mark an argument as explicitly empty.
    pub fn set_empty(&mut self, name: impl Into<String>) {
        self.values.insert(name.into(), Value::Null);
    }

    /// Append a string to the sequence stored under `name`.
    ///
    /// The first append creates the sequence. A non-sequence value already
    /// stored under `name` is replaced.
    pub fn append(&mut self, name: &str, item: impl Into<String>) {
        let item = Value::String(item.into());
        match self.values.get_mut(name) {
            Some(Value::Array(items)) => items.push(item),
            _ => {
                self.values.insert(name.to_string(), Value::Array(vec![item]));
            }
        }
    }

    /// Remove an argument, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    /// Number of present keys.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no key is present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over present keys and values in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Present keys in name order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.values
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for ValueMapping {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

type CallbackFn = dyn Fn(&mut ValueMapping, &Value) -> Result<(), String> + Send + Sync;

/// A side-effecting switch handler.
///
/// Receives the whole value mapping and the switch value: `true`/`false`
/// for flags, the raw string for value-taking switches. Returning `Err`
/// aborts the scan with the given message.
#[derive(Clone)]
pub struct SwitchCallback(Arc<CallbackFn>);

impl SwitchCallback {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ValueMapping, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the handler.
    pub fn call(&self, values: &mut ValueMapping, value: &Value) -> Result<(), String> {
        (self.0)(values, value)
    }
}

impl fmt::Debug for SwitchCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SwitchCallback(..)")
    }
}
