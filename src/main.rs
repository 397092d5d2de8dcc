use argv_promise::{CommandParser, Context, PromiseAdapter};
use clap::Parser;
use serde_json::{json, Value};
use tracing::Level;

/// Run a command line through the promise adapter and print the settled
/// envelope as JSON. Put the line to parse after `--`, e.g.
/// `argvp --command "hello <name>" -- hello world`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Tokens to parse
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    input: Vec<String>,
    /// Register a command from a usage string such as "hello <name>" (repeatable)
    #[arg(long = "command", value_name = "USAGE")]
    commands: Vec<String>,
    /// Description shown for registered commands in help output
    #[arg(long, default_value = "")]
    describe: String,
    /// Base context entry; VALUE is read as JSON when it parses, else as a string (repeatable)
    #[arg(long = "context", value_name = "KEY=VALUE")]
    context: Vec<String>,
    /// Have every command handler resolve with this payload
    #[arg(long, conflicts_with = "reject")]
    resolve: Option<String>,
    /// Have every command handler reject with this payload
    #[arg(long)]
    reject: Option<String>,
    /// Script name used in usage lines
    #[arg(long, default_value = "cli")]
    script: String,
    /// Fail on an unregistered first positional
    #[arg(long)]
    strict_commands: bool,
    /// Minimum number of positionals
    #[arg(long, default_value_t = 0)]
    demand: usize,
    /// Enable --version with this string
    #[arg(long)]
    app_version: Option<String>,
    /// Log adapter and engine activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn json_or_string(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn build_context(entries: &[String]) -> Result<Context, String> {
    let mut context = Context::new();
    for entry in entries {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| format!("context entry `{entry}` is not KEY=VALUE"))?;
        context.insert_value(key, json_or_string(value));
    }
    Ok(context)
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::TRACE } else { Level::WARN })
        .init();

    let context = match build_context(&args.context) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    let mut engine = CommandParser::new();
    engine.script_name(args.script.as_str()).demand_command(args.demand);
    if args.strict_commands {
        engine.strict_commands();
    }
    if let Some(v) = args.app_version.as_ref() {
        engine.version(v.as_str());
    }

    let mut adapter = PromiseAdapter::with_context(engine, context);
    for usage in &args.commands {
        let registered = match (&args.resolve, &args.reject) {
            (Some(data), _) => {
                let data = json_or_string(data);
                adapter.command_with(usage, &args.describe, move |argv| {
                    argv.resolve(data.clone(), argv);
                })
            }
            (None, Some(data)) => {
                let data = json_or_string(data);
                adapter.command_with(usage, &args.describe, move |argv| {
                    argv.reject(data.clone(), argv);
                })
            }
            (None, None) => adapter.command(usage, &args.describe),
        };
        if let Err(e) = registered {
            eprintln!("{e}");
            std::process::exit(2);
        }
    }

    // Engine completes synchronously, so blocking here never waits on a runtime.
    let outcome = adapter.parse(args.input).wait();
    let (report, code) = match &outcome {
        Ok(fulfilled) => (json!({"status": "fulfilled", "envelope": fulfilled}), 0),
        Err(rejected) => (json!({"status": "rejected", "envelope": rejected}), 1),
    };

    match serde_json::to_string_pretty(&report) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("could not render outcome: {e}");
            std::process::exit(2);
        }
    }
    std::process::exit(code);
}
