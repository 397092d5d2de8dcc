//! Single-shot settlement shared by the handler path and the engine path.
//!
//! Every `parse` call owns one [`Slot`]. Both the injected `resolve`/`reject`
//! capabilities and the engine's completion callback write into it; the first
//! write takes the sender and every later write finds the slot empty.

use crate::argv::Argv;
use crate::errors::EngineError;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll};
use thiserror::Error;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::trace;

/// What a settled `parse` call yields.
pub type Outcome = std::result::Result<Fulfilled, Rejected>;

/// Fulfilled envelope: `{ data, argv }` from a handler or `{ argv, output }`
/// from the engine.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Fulfilled {
    Handler { data: Value, argv: Argv },
    Engine { argv: Argv, output: String },
}

impl Fulfilled {
    pub fn argv(&self) -> &Argv {
        match self {
            Fulfilled::Handler { argv, .. } | Fulfilled::Engine { argv, .. } => argv,
        }
    }

    pub fn into_argv(self) -> Argv {
        match self {
            Fulfilled::Handler { argv, .. } | Fulfilled::Engine { argv, .. } => argv,
        }
    }

    /// Handler payload; `None` for engine-driven fulfillment.
    pub fn data(&self) -> Option<&Value> {
        match self {
            Fulfilled::Handler { data, .. } => Some(data),
            Fulfilled::Engine { .. } => None,
        }
    }

    /// Text the engine produced itself (help, version); `None` when a handler settled.
    pub fn output(&self) -> Option<&str> {
        match self {
            Fulfilled::Handler { .. } => None,
            Fulfilled::Engine { output, .. } => Some(output),
        }
    }
}

/// Rejected envelope: `{ data, argv }` from a handler or `{ argv, error }`
/// from the engine's own validation. An abandoned call serializes as
/// `{ error: { kind: "abandoned", message } }`.
#[derive(Debug, Error)]
pub enum Rejected {
    #[error("rejected by handler: {data}")]
    Handler { data: Value, argv: Argv },

    #[error("{error}")]
    Engine {
        argv: Argv,
        #[source]
        error: EngineError,
    },

    /// Every settlement handle was dropped without settling.
    #[error("parse call was dropped before it settled")]
    Abandoned,
}

impl Rejected {
    pub fn argv(&self) -> Option<&Argv> {
        match self {
            Rejected::Handler { argv, .. } | Rejected::Engine { argv, .. } => Some(argv),
            Rejected::Abandoned => None,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Rejected::Handler { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&EngineError> {
        match self {
            Rejected::Engine { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl Serialize for Rejected {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Rejected::Handler { data, argv } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("data", data)?;
                map.serialize_entry("argv", argv)?;
                map.end()
            }
            Rejected::Engine { argv, error } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("argv", argv)?;
                map.serialize_entry("error", error)?;
                map.end()
            }
            Rejected::Abandoned => {
                let mut error = serde_json::Map::new();
                error.insert("kind".into(), "abandoned".into());
                error.insert("message".into(), self.to_string().into());
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &error)?;
                map.end()
            }
        }
    }
}

/// The write end of one call's settlement channel.
#[derive(Clone)]
pub(crate) struct Slot {
    sender: Arc<Mutex<Option<oneshot::Sender<Outcome>>>>,
}

impl Slot {
    /// Returns `false` when the call had already settled.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                // A dropped promise still counts as settled.
                let _ = tx.send(outcome);
                true
            }
            None => {
                trace!(fulfilled = outcome.is_ok(), "settlement ignored, call already settled");
                false
            }
        }
    }
}

pub(crate) fn channel() -> (Slot, Promise) {
    let (tx, rx) = oneshot::channel();
    let slot = Slot {
        sender: Arc::new(Mutex::new(Some(tx))),
    };
    (slot, Promise { rx })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Resolve,
    Reject,
}

/// A call-scoped `resolve` or `reject` capability injected into the context.
#[derive(Clone)]
pub struct Settler {
    slot: Slot,
    mode: Mode,
}

impl Settler {
    pub(crate) fn resolver(slot: Slot) -> Self {
        Self { slot, mode: Mode::Resolve }
    }

    pub(crate) fn rejecter(slot: Slot) -> Self {
        Self { slot, mode: Mode::Reject }
    }

    /// Settle the owning call with `{ data, argv }`. Returns `false` if the
    /// call had already settled.
    pub fn call(&self, data: impl Into<Value>, argv: &Argv) -> bool {
        let data = data.into();
        let argv = argv.clone();
        let outcome = match self.mode {
            Mode::Resolve => Ok(Fulfilled::Handler { data, argv }),
            Mode::Reject => Err(Rejected::Handler { data, argv }),
        };
        self.slot.settle(outcome)
    }
}

impl fmt::Debug for Settler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Settler").field(&self.mode).finish()
    }
}

/// The read end of a `parse` call. Resolves exactly once.
#[must_use = "a parse outcome is only observable through its promise"]
pub struct Promise {
    rx: oneshot::Receiver<Outcome>,
}

impl Promise {
    /// Block the current thread until the call settles.
    ///
    /// Panics when called from inside an async runtime; `.await` the promise there.
    pub fn wait(self) -> Outcome {
        self.rx.blocking_recv().unwrap_or(Err(Rejected::Abandoned))
    }

    /// Take the outcome if the call has settled, `None` while pending.
    pub fn try_outcome(&mut self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(Rejected::Abandoned)),
        }
    }
}

impl Future for Promise {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Outcome> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(Rejected::Abandoned)))
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").finish_non_exhaustive()
    }
}
