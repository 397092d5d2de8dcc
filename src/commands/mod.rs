//! Bundled callback-style command parser.
//!
//! Positionals collect under `_` and commands are declared with
//! `name <required> [optional]` usage strings. `--help` and `--version`
//! short-circuit validation. A missing required argument reports
//! `Not enough non-option arguments: got N, need at least M`.

mod help;
pub mod tokens;
pub mod usage;

use crate::argv::Argv;
use crate::context::CallContext;
use crate::engine::{Commands, Completion, Engine, Handler, Request};
use crate::errors::{EngineError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};
use usage::{parse_usage, Usage};

#[derive(Clone)]
pub(crate) struct Command {
    usage: Usage,
    description: String,
    handler: Option<Handler>,
}

/// Command registry plus parse-time switches.
///
/// Cloning is cheap: the registry is shared until the next registration.
#[derive(Clone)]
pub struct CommandParser {
    script: String,
    help: bool,
    version: Option<String>,
    strict_commands: bool,
    demand: usize,
    commands: Arc<Vec<Command>>,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self {
            script: "cli".to_string(),
            help: true,
            version: None,
            strict_commands: false,
            demand: 0,
            commands: Arc::new(Vec::new()),
        }
    }
}

enum Step {
    Output(String),
    Failed(EngineError),
    Run(Option<Handler>),
}

impl CommandParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name shown at the start of usage lines.
    pub fn script_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.script = name.into();
        self
    }

    pub fn help(&mut self) -> &mut Self {
        self.help = true;
        self
    }

    pub fn disable_help(&mut self) -> &mut Self {
        self.help = false;
        self
    }

    /// Enable `--version`, which outputs `version` instead of running anything.
    pub fn version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = Some(version.into());
        self
    }

    /// Fail when the first positional is not a registered command.
    pub fn strict_commands(&mut self) -> &mut Self {
        self.strict_commands = true;
        self
    }

    /// Require at least `min` positionals (command name included).
    pub fn demand_command(&mut self, min: usize) -> &mut Self {
        self.demand = min;
        self
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(|c| c.usage.name.as_str())
    }

    fn register(&mut self, usage: &str, description: &str, handler: Option<Handler>) -> Result<&mut Self> {
        let usage = parse_usage(usage)?;
        debug!(command = %usage.name, handler = handler.is_some(), "registering command");
        let command = Command {
            usage,
            description: description.to_string(),
            handler,
        };
        let list = Arc::make_mut(&mut self.commands);
        match list.iter().position(|c| c.usage.name == command.usage.name) {
            Some(i) => list[i] = command,
            None => list.push(command),
        }
        Ok(self)
    }

    fn find(&self, name: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.usage.name == name)
    }

    fn booleans(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.help {
            flags.push("help");
        }
        if self.version.is_some() {
            flags.push("version");
        }
        flags
    }

    fn flag_set(argv: &Argv, key: &str) -> bool {
        argv.fields().get(key) == Some(&Value::Bool(true))
    }

    fn set_field(argv: &mut Argv, key: &str, value: Value) {
        if let Some(alias) = tokens::camel_case(key) {
            argv.set(alias, value.clone());
        }
        argv.set(key, value);
    }

    /// Help or version output, when requested and enabled.
    fn builtin_output(&self, argv: &Argv, command: Option<&Command>) -> Option<String> {
        if self.help && Self::flag_set(argv, "help") {
            let version = self.version.is_some();
            return Some(match command {
                Some(cmd) => help::render_command(&self.script, &cmd.usage, &cmd.description, version),
                None => help::render_root(&self.script, &self.commands, version),
            });
        }
        match &self.version {
            Some(v) if Self::flag_set(argv, "version") => Some(v.clone()),
            _ => None,
        }
    }

    fn step(&self, argv: &mut Argv, positional: Vec<Value>) -> Step {
        let command = positional
            .first()
            .and_then(Value::as_str)
            .and_then(|name| self.find(name));

        let Some(command) = command else {
            let got = positional.len();
            let first = positional.first().cloned();
            for value in positional {
                argv.push_positional(value);
            }
            if let Some(text) = self.builtin_output(argv, None) {
                return Step::Output(text);
            }
            if self.strict_commands && !self.commands.is_empty() {
                if let Some(first) = first {
                    let name = match first {
                        Value::String(s) => s,
                        other => other.to_string(),
                    };
                    return Step::Failed(EngineError::UnknownCommand(name));
                }
            }
            if got < self.demand {
                return Step::Failed(EngineError::NotEnoughArguments { got, need: self.demand });
            }
            return Step::Run(None);
        };

        let mut values = positional.into_iter();
        if let Some(name) = values.next() {
            argv.push_positional(name);
        }
        let got = values.len();
        for arg in &command.usage.args {
            if arg.variadic {
                let rest: Vec<Value> = values.by_ref().collect();
                Self::set_field(argv, &arg.name, Value::Array(rest));
            } else if let Some(value) = values.next() {
                Self::set_field(argv, &arg.name, value);
            }
        }
        for extra in values {
            argv.push_positional(extra);
        }

        if let Some(text) = self.builtin_output(argv, Some(command)) {
            return Step::Output(text);
        }
        let need = command.usage.required();
        if got < need {
            return Step::Failed(EngineError::NotEnoughArguments { got, need });
        }
        if got + 1 < self.demand {
            return Step::Failed(EngineError::NotEnoughArguments {
                got: got + 1,
                need: self.demand,
            });
        }
        Step::Run(command.handler.clone())
    }
}

impl Commands for CommandParser {
    fn command(&mut self, usage: &str, description: &str) -> Result<&mut Self> {
        self.register(usage, description, None)
    }

    fn command_with<H>(&mut self, usage: &str, description: &str, handler: H) -> Result<&mut Self>
    where
        H: Fn(&Argv) + Send + Sync + 'static,
    {
        self.register(usage, description, Some(Arc::new(handler)))
    }
}

impl Engine for CommandParser {
    fn parse(&self, request: Request, context: CallContext, done: Completion) {
        let mut argv = Argv::new(context);
        let tokens = match request {
            Request::Tokens(tokens) => tokens,
            Request::Line(line) => match tokens::split(&line) {
                Ok(tokens) => tokens,
                Err(error) => {
                    debug!(%error, "request could not be tokenized");
                    return done(Some(error), argv, String::new());
                }
            },
        };

        let classified = tokens::classify(&tokens, &self.booleans());
        for (key, value) in classified.options {
            // caller-supplied context outranks options; bound positionals still win
            if argv.context().base().get(&key).is_some() {
                trace!(%key, "option shadowed by context entry");
                continue;
            }
            argv.set(key, value);
        }

        match self.step(&mut argv, classified.positional) {
            Step::Output(text) => {
                debug!(bytes = text.len(), "engine produced its own output");
                done(None, argv, text)
            }
            Step::Failed(error) => {
                debug!(%error, kind = error.kind(), "validation failed");
                done(Some(error), argv, String::new())
            }
            Step::Run(handler) => {
                if let Some(handler) = handler {
                    trace!(positional = ?argv.positional(), "running command handler");
                    handler(&argv);
                }
                done(None, argv, String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::settle::{self, Fulfilled, Outcome, Rejected};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Drive the engine directly, settling through a bare completion.
    fn run(parser: &CommandParser, request: &str) -> Outcome {
        let (slot, mut promise) = settle::channel();
        let context = CallContext::new(&Context::new(), slot.clone());
        parser.parse(
            request.into(),
            context,
            Box::new(move |error, argv, output| {
                let outcome = match error {
                    Some(error) => Err(Rejected::Engine { argv, error }),
                    None => Ok(Fulfilled::Engine { argv, output }),
                };
                slot.settle(outcome);
            }),
        );
        promise.try_outcome().expect("engine completes synchronously")
    }

    #[test]
    fn binds_declared_positionals_and_keeps_extras() {
        let mut parser = CommandParser::new();
        parser.command("copy <src> [dst] [rest..]", "").unwrap();

        let outcome = run(&parser, "copy a b c 4 --force").unwrap();
        let argv = outcome.argv();
        assert_eq!(argv.positional(), &[json!("copy")]);
        assert_eq!(argv.get("src"), Some(&json!("a")));
        assert_eq!(argv.get("dst"), Some(&json!("b")));
        assert_eq!(argv.get("rest"), Some(&json!(["c", 4])));
        assert_eq!(argv.get("force"), Some(&json!(true)));
        assert_eq!(outcome.output(), Some(""));
    }

    #[test]
    fn dashed_positional_gets_camel_alias() {
        let mut parser = CommandParser::new();
        parser.command("open <file-name>", "").unwrap();
        let outcome = run(&parser, "open notes.txt").unwrap();
        assert_eq!(outcome.argv().get("fileName"), Some(&json!("notes.txt")));
    }

    #[test]
    fn reregistering_replaces_command() {
        let mut parser = CommandParser::new();
        parser.command("hello <name>", "first").unwrap();
        parser.command("hello [name]", "second").unwrap();
        assert_eq!(parser.command_names().collect::<Vec<_>>(), vec!["hello"]);
        assert!(run(&parser, "hello").is_ok());
    }

    #[test]
    fn root_help_lists_commands() {
        let mut parser = CommandParser::new();
        parser.script_name("greet");
        parser.command("hello <name>", "say hello").unwrap();
        parser.command("bye", "").unwrap();

        let outcome = run(&parser, "--help").unwrap();
        assert_eq!(
            outcome.output().unwrap(),
            "greet <command>\n\
             \n\
             Commands:\n\
             \x20 greet hello <name>  say hello\n\
             \x20 greet bye\n\
             \n\
             Options:\n\
             \x20 --help  Show help  [boolean]"
        );
    }

    #[test]
    fn disabled_help_is_an_ordinary_flag() {
        let mut parser = CommandParser::new();
        parser.disable_help().command("hello <name>", "").unwrap();
        let rejected = run(&parser, "hello --help").unwrap_err();
        assert_eq!(
            rejected.error(),
            Some(&EngineError::NotEnoughArguments { got: 0, need: 1 })
        );
    }

    #[test]
    fn version_short_circuits() {
        let mut parser = CommandParser::new();
        parser.version("1.2.3").command("hello <name>", "").unwrap();
        let outcome = run(&parser, "hello --version").unwrap();
        assert_eq!(outcome.output(), Some("1.2.3"));
    }

    #[test]
    fn demand_counts_command_name() {
        let mut parser = CommandParser::new();
        parser.demand_command(2).command("hello [name]", "").unwrap();
        let rejected = run(&parser, "hello").unwrap_err();
        assert_eq!(
            rejected.error(),
            Some(&EngineError::NotEnoughArguments { got: 1, need: 2 })
        );
        assert!(run(&parser, "hello world").is_ok());
    }
}
