pub mod argv;
pub mod commands;
pub mod context;
pub mod engine;
pub mod errors;
pub mod settle;
mod parser;

use context::CallContext;
use engine::Request;
use errors::Result;
use tracing::{debug, trace};

pub use argv::Argv;
pub use commands::CommandParser;
pub use context::{Context, ContextValue};
pub use engine::{Commands, Engine};
pub use errors::EngineError;
pub use settle::{Fulfilled, Outcome, Promise, Rejected};

/// Drives a callback-style [`Engine`] and hands back one [`Promise`] per parse.
///
/// Every call gets a fresh copy of the base context with that call's own
/// `resolve`/`reject` injected. A handler that settles through them wins; the
/// engine's completion for the same call then has no effect.
pub struct PromiseAdapter<E = commands::CommandParser> {
    engine: E,
    context: Context,
}

impl<E: Engine> PromiseAdapter<E> {
    pub fn new(engine: E) -> Self {
        Self::with_context(engine, Context::default())
    }

    pub fn with_context(engine: E, context: Context) -> Self {
        Self { engine, context }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The base context merged into every call.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Parse `request`. Never fails directly; engine and handler failures
    /// arrive as [`Rejected`].
    ///
    /// A panic raised by the engine before it completes propagates to the caller.
    pub fn parse(&self, request: impl Into<Request>) -> Promise {
        let request = request.into();
        debug!(?request, context_keys = self.context.len(), "parse");

        let (slot, promise) = settle::channel();
        let context = CallContext::new(&self.context, slot.clone());
        let done = Box::new(move |error: Option<EngineError>, argv: Argv, output: String| {
            let outcome = match error {
                Some(error) => Err(Rejected::Engine { argv, error }),
                None => Ok(Fulfilled::Engine { argv, output }),
            };
            if !slot.settle(outcome) {
                trace!("engine completion arrived after handler settlement");
            }
        });
        self.engine.parse(request, context, done);
        promise
    }
}

impl<E: Engine + Commands> PromiseAdapter<E> {
    /// Forwards to [`Commands::command`] on the wrapped engine.
    pub fn command(&mut self, usage: &str, description: &str) -> Result<&mut E> {
        self.engine.command(usage, description)
    }

    /// Forwards to [`Commands::command_with`] on the wrapped engine.
    pub fn command_with<H>(&mut self, usage: &str, description: &str, handler: H) -> Result<&mut E>
    where
        H: Fn(&Argv) + Send + Sync + 'static,
    {
        self.engine.command_with(usage, description, handler)
    }
}
