use crate::context::{CallContext, ContextValue};
use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Parsed arguments as seen by handlers and carried in every envelope.
///
/// Holds the positional list (`_`), the named fields the engine parsed, and
/// the per-call context. Parsed fields shadow base-context values of the same
/// name; `resolve` and `reject` always refer to the call's capabilities.
#[derive(Clone)]
pub struct Argv {
    positional: Vec<Value>,
    fields: Map<String, Value>,
    context: CallContext,
}

impl Argv {
    pub fn new(context: CallContext) -> Self {
        Self {
            positional: Vec::new(),
            fields: Map::new(),
            context,
        }
    }

    /// The `_` list.
    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn push_positional(&mut self, value: impl Into<Value>) {
        self.positional.push(value.into());
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// Parsed field, falling back to a base-context value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields
            .get(key)
            .or_else(|| self.context.base().value(key))
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Invoke a context method by name. `resolve` and `reject` take the
    /// payload as their first argument and return whether they settled.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        let data = || args.first().cloned().unwrap_or(Value::Null);
        match name {
            "resolve" => Some(Value::Bool(self.resolve(data(), self))),
            "reject" => Some(Value::Bool(self.reject(data(), self))),
            _ => self.context.base().method(name).map(|method| method(args)),
        }
    }

    /// Fulfill this call's promise with `{ data, argv }`.
    pub fn resolve(&self, data: impl Into<Value>, argv: &Argv) -> bool {
        self.context.resolver().call(data, argv)
    }

    /// Reject this call's promise with `{ data, argv }`.
    pub fn reject(&self, data: impl Into<Value>, argv: &Argv) -> bool {
        self.context.rejecter().call(data, argv)
    }

    /// JSON view: base-context values, then parsed fields, then `_`.
    pub fn to_json(&self) -> Value {
        let mut out: Map<String, Value> = self
            .context
            .base()
            .values()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        out.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        out.insert("_".into(), Value::Array(self.positional.clone()));
        Value::Object(out)
    }
}

impl Serialize for Argv {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Debug for Argv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods: Vec<&str> = self
            .context
            .base()
            .keys()
            .filter(|k| matches!(self.context.base().get(k), Some(ContextValue::Method(_))))
            .collect();
        f.debug_struct("Argv")
            .field("_", &self.positional)
            .field("fields", &self.fields)
            .field("methods", &methods)
            .finish_non_exhaustive()
    }
}
