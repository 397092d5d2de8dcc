use crate::argv::Argv;
use crate::context::CallContext;
use crate::errors::{EngineError, Result};
use std::sync::Arc;

/// Raw input for one parse call, passed to the engine untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A command line still to be split into tokens.
    Line(String),
    /// Pre-split tokens.
    Tokens(Vec<String>),
}

impl From<&str> for Request {
    fn from(line: &str) -> Self {
        Request::Line(line.to_string())
    }
}

impl From<String> for Request {
    fn from(line: String) -> Self {
        Request::Line(line)
    }
}

impl From<Vec<String>> for Request {
    fn from(tokens: Vec<String>) -> Self {
        Request::Tokens(tokens)
    }
}

impl From<&[&str]> for Request {
    fn from(tokens: &[&str]) -> Self {
        Request::Tokens(tokens.iter().map(|t| t.to_string()).collect())
    }
}

/// The engine's completion callback: `(error, argv, output)`.
pub type Completion = Box<dyn FnOnce(Option<EngineError>, Argv, String) + Send>;

/// Command handler. Receives the argv with the merged context and the call's
/// `resolve`/`reject` capabilities.
pub type Handler = Arc<dyn Fn(&Argv) + Send + Sync>;

/// A callback-style argument parser the adapter can drive.
///
/// Implementations call `done` once per request under normal operation. They
/// may call it later or from another thread. Handlers run by the engine
/// settle the call through the `Argv` they are given.
pub trait Engine {
    fn parse(&self, request: Request, context: CallContext, done: Completion);
}

/// Command registration, forwarded unchanged by the adapter.
pub trait Commands {
    /// Register a command without a handler.
    fn command(&mut self, usage: &str, description: &str) -> Result<&mut Self>;

    /// Register a command whose handler runs when it matches.
    fn command_with<H>(&mut self, usage: &str, description: &str, handler: H) -> Result<&mut Self>
    where
        H: Fn(&Argv) + Send + Sync + 'static;
}
