use argv_promise::argv::Argv;
use argv_promise::context::CallContext;
use argv_promise::engine::{Completion, Engine, Request};
use argv_promise::{Context, EngineError, Fulfilled, PromiseAdapter, Rejected};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Settles through the handler path first, then reports its own completion.
struct HandlerThenCompletion;

impl Engine for HandlerThenCompletion {
    fn parse(&self, request: Request, context: CallContext, done: Completion) {
        let mut argv = Argv::new(context);
        if let Request::Line(line) = request {
            argv.push_positional(line);
        }
        assert!(argv.resolve("from handler", &argv));
        assert!(!argv.reject("too late", &argv));
        done(
            Some(EngineError::Syntax("ignored".into())),
            argv,
            String::new(),
        );
    }
}

/// Completes later from another thread.
struct Deferred(Duration);

impl Engine for Deferred {
    fn parse(&self, _request: Request, context: CallContext, done: Completion) {
        let delay = self.0;
        thread::spawn(move || {
            thread::sleep(delay);
            done(None, Argv::new(context), "later".into());
        });
    }
}

/// Drops everything without completing.
struct Forgetful;

impl Engine for Forgetful {
    fn parse(&self, _request: Request, _context: CallContext, _done: Completion) {}
}

/// Keeps every call's handles so calls can be settled out of order.
#[derive(Clone, Default)]
struct Parked(Arc<Mutex<Vec<(String, Argv, Completion)>>>);

impl Engine for Parked {
    fn parse(&self, request: Request, context: CallContext, done: Completion) {
        let label = match request {
            Request::Line(line) => line,
            Request::Tokens(tokens) => tokens.join(" "),
        };
        self.0
            .lock()
            .unwrap()
            .push((label, Argv::new(context), done));
    }
}

/// Panics before touching its completion.
struct Exploding;

impl Engine for Exploding {
    fn parse(&self, _request: Request, _context: CallContext, _done: Completion) {
        panic!("engine exploded");
    }
}

#[tokio::test]
async fn handler_settlement_beats_engine_completion() {
    let adapter = PromiseAdapter::new(HandlerThenCompletion);
    match adapter.parse("go").await {
        Ok(Fulfilled::Handler { data, argv }) => {
            assert_eq!(data, json!("from handler"));
            assert_eq!(argv.positional(), &[json!("go")]);
        }
        other => panic!("handler should have won, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn engine_may_complete_from_another_thread() {
    let adapter = PromiseAdapter::new(Deferred(Duration::from_millis(20)));
    let fulfilled = adapter.parse("anything").await.unwrap();
    assert_eq!(fulfilled.output(), Some("later"));
}

#[tokio::test]
async fn engine_that_drops_its_handles_abandons_the_call() {
    let adapter = PromiseAdapter::new(Forgetful);
    assert!(matches!(adapter.parse("x").await, Err(Rejected::Abandoned)));
}

#[tokio::test]
async fn overlapping_calls_never_cross_settle() {
    let parked = Parked::default();
    let adapter = PromiseAdapter::with_context(
        parked.clone(),
        Context::new().with_value("shared", 1),
    );

    let first = adapter.parse("first");
    let second = adapter.parse("second");
    let third = adapter.parse("third");

    let mut calls = std::mem::take(&mut *parked.0.lock().unwrap());
    assert_eq!(calls.len(), 3);

    // settle in reverse order, each through a different path
    let (label, argv, done) = calls.pop().unwrap();
    assert_eq!(label, "third");
    done(None, argv, "third output".into());

    let (_, argv, done) = calls.pop().unwrap();
    argv.reject("second failed", &argv);
    done(None, argv, String::new());

    let (_, argv, _done) = calls.pop().unwrap();
    assert_eq!(argv.get("shared"), Some(&json!(1)));
    argv.resolve("first ok", &argv);

    assert_eq!(third.await.unwrap().output(), Some("third output"));
    assert_eq!(second.await.unwrap_err().data(), Some(&json!("second failed")));
    assert_eq!(first.await.unwrap().data(), Some(&json!("first ok")));
}

#[tokio::test]
async fn injected_capabilities_override_reserved_context_keys() {
    let context = Context::new()
        .with_value("resolve", "not a function")
        .with_value("reject", false)
        .with_value("kept", "yes");
    let mut adapter = PromiseAdapter::with_context(argv_promise::CommandParser::new(), context);
    adapter
        .command_with("run", "", |argv| {
            assert!(argv.get("resolve").is_none());
            argv.call("resolve", &[json!("via call")]);
        })
        .unwrap();

    let fulfilled = adapter.parse("run").await.unwrap();
    assert_eq!(fulfilled.data(), Some(&json!("via call")));
    assert_eq!(fulfilled.argv().get_str("kept"), Some("yes"));
    // the adapter's template still holds what the caller supplied
    assert_eq!(adapter.context().value("resolve"), Some(&json!("not a function")));
}

#[tokio::test]
async fn context_copies_do_not_leak_between_calls() {
    let mut adapter = PromiseAdapter::with_context(
        argv_promise::CommandParser::new(),
        Context::new().with_value("foo", "bar"),
    );
    adapter.command("set <foo>", "").unwrap();

    let first = adapter.parse("set changed").await.unwrap();
    assert_eq!(first.argv().get_str("foo"), Some("changed"));

    let second = adapter.parse("other").await.unwrap();
    assert_eq!(second.argv().get_str("foo"), Some("bar"));
}

#[test]
#[should_panic(expected = "engine exploded")]
fn engine_panic_propagates_out_of_parse() {
    let adapter = PromiseAdapter::new(Exploding);
    let _ = adapter.parse("x");
}

#[tokio::test]
async fn context_values_win_over_parsed_options() {
    let mut adapter = PromiseAdapter::with_context(
        argv_promise::CommandParser::new(),
        Context::new().with_value("foo", "bar"),
    );
    adapter.command("hello <name>", "").unwrap();

    let fulfilled = adapter.parse("hello world --foo baz").await.unwrap();
    assert_eq!(fulfilled.argv().get_str("foo"), Some("bar"));
    assert_eq!(fulfilled.argv().get_str("name"), Some("world"));
    assert_eq!(fulfilled.argv().to_json()["foo"], json!("bar"));
}
