use crate::settle::{Settler, Slot};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Keys the adapter injects into every per-call context. Base entries with
/// these names are replaced.
pub const RESERVED_KEYS: [&str; 2] = ["resolve", "reject"];

/// A callable context entry. Handlers invoke it by name through `Argv::call`.
pub type Method = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

#[derive(Clone)]
pub enum ContextValue {
    Value(Value),
    Method(Method),
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Value(v) => write!(f, "{v}"),
            ContextValue::Method(_) => f.write_str("<method>"),
        }
    }
}

/// Base context supplied once to the adapter and merged into every argv.
///
/// Cloning is shallow: methods are shared through their `Arc`, so state they
/// capture (counters, recorders) is observable after a call settles.
#[derive(Clone, Default)]
pub struct Context {
    entries: BTreeMap<String, ContextValue>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert_value(key, value);
        self
    }

    pub fn with_method<F>(mut self, key: impl Into<String>, method: F) -> Self
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.insert_method(key, method);
        self
    }

    pub fn insert_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries
            .insert(key.into(), ContextValue::Value(value.into()));
    }

    pub fn insert_method<F>(&mut self, key: impl Into<String>, method: F)
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        self.entries
            .insert(key.into(), ContextValue::Method(Arc::new(method)));
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key) {
            Some(ContextValue::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn method(&self, key: &str) -> Option<&Method> {
        match self.entries.get(key) {
            Some(ContextValue::Method(m)) => Some(m),
            _ => None,
        }
    }

    /// Data entries only; methods have no JSON form.
    pub fn values(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            ContextValue::Value(value) => Some((k.as_str(), value)),
            ContextValue::Method(_) => None,
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        let entries = map
            .into_iter()
            .map(|(k, v)| (k, ContextValue::Value(v)))
            .collect();
        Self { entries }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

/// The context one `parse` call hands to its engine: a fresh copy of the
/// base plus that call's own `resolve`/`reject`.
#[derive(Clone, Debug)]
pub struct CallContext {
    base: Context,
    resolve: Settler,
    reject: Settler,
}

impl CallContext {
    pub(crate) fn new(base: &Context, slot: Slot) -> Self {
        let mut base = base.clone();
        for key in RESERVED_KEYS {
            if base.entries.remove(key).is_some() {
                debug!(key, "base context entry replaced by injected capability");
            }
        }
        Self {
            base,
            resolve: Settler::resolver(slot.clone()),
            reject: Settler::rejecter(slot),
        }
    }

    pub fn base(&self) -> &Context {
        &self.base
    }

    pub fn resolver(&self) -> &Settler {
        &self.resolve
    }

    pub fn rejecter(&self) -> &Settler {
        &self.reject
    }
}
