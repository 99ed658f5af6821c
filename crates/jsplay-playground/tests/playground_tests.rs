//! Integration tests for the playground engine.
//!
//! - the scenarios of the output contract (success, throw, partial output)
//! - error taxonomy: throws, syntax errors, serialization failures, step limits
//! - capture restoration and isolation from engine state
//! - source bounds and the output placeholder
//! - properties over generated `console.log` sequences

use std::cell::RefCell;
use std::rc::Rc;

use jsplay_eval::{ConsoleLevel, ConsoleSink, Limits, Realm, Script};
use jsplay_playground::{
    fingerprint, Engine, EngineState, ExecutionResult, PlaygroundConfig, RunErrorKind,
    SourceError,
};
use proptest::prelude::*;

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn run(source: &str) -> ExecutionResult {
    let mut engine = Engine::new();
    engine.set_source(source).unwrap();
    engine.run()
}

fn error_kind(result: &ExecutionResult) -> Option<RunErrorKind> {
    result.error.as_ref().map(|e| e.kind)
}

/// Host console that keeps what reaches it.
#[derive(Default)]
struct HostConsole {
    lines: RefCell<Vec<String>>,
}

impl ConsoleSink for HostConsole {
    fn write(&self, _level: ConsoleLevel, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

fn engine_with_host_console() -> (Engine, Rc<HostConsole>) {
    let host = Rc::new(HostConsole::default());
    let realm = Realm::with_console_sink(host.clone());
    let engine = Engine::with_realm(PlaygroundConfig::default(), realm).unwrap();
    (engine, host)
}

// ══════════════════════════════════════════════════════════════════════════════
// Output contract
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn scenario_a_hello_world() {
    let result = run(r#"console.log("Hello, World!");"#);
    assert!(result.success);
    assert_eq!(result.output, "Hello, World!\n");
    assert_eq!(result.lines, vec!["Hello, World!"]);
    assert!(result.error.is_none());
}

#[test]
fn scenario_b_mixed_arguments() {
    let result = run(r#"console.log(1, "a", {x:1});"#);
    assert!(result.success);
    assert_eq!(result.output, "1 a {\"x\":1}\n");
}

#[test]
fn scenario_c_throw() {
    let result = run(r#"throw new Error("boom");"#);
    assert!(!result.success);
    assert_eq!(result.output, "Error: boom\n");
    assert_eq!(error_kind(&result), Some(RunErrorKind::UserCodeThrow));
    assert!(result.lines.is_empty());
}

#[test]
fn scenario_d_empty_source() {
    let result = run("");
    assert!(result.success);
    assert_eq!(result.output, "");
}

#[test]
fn scenario_e_partial_output_before_throw() {
    let result = run(r#"console.log("a"); throw new Error("x");"#);
    assert!(!result.success);
    assert_eq!(result.output, "a\nError: x\n");
    assert_eq!(result.lines, vec!["a"]);
}

#[test]
fn default_initial_source_prints_hello_world() {
    let mut engine = Engine::new();
    assert_eq!(
        engine.source().as_str(),
        "// Write your JavaScript code here\nconsole.log(\"Hello, World!\");"
    );
    assert_eq!(engine.run().output, "Hello, World!\n");
}

#[test]
fn no_diagnostics_means_empty_output() {
    let result = run("let x = 1 + 2; function f() { return x; } f();");
    assert!(result.success);
    assert_eq!(result.output, "");
}

#[test]
fn multiline_log_is_one_captured_line() {
    let result = run(r#"console.log("a\nb"); console.log("c");"#);
    assert_eq!(result.output, "a\nb\nc\n");
    assert_eq!(result.lines, vec!["a\nb", "c"]);
}

#[test]
fn null_and_arrays_are_json() {
    let result = run("console.log(null, [1, 'two'], undefined, true);");
    assert_eq!(result.output, "null [1,\"two\"] undefined true\n");
}

#[test]
fn functions_at_top_level_print_their_source() {
    let result = run("const f = (a) => a * 2;\nconsole.log(f);");
    assert!(result.success);
    assert_eq!(result.output, "(a) => a * 2\n");
}

// ══════════════════════════════════════════════════════════════════════════════
// Error taxonomy
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn thrown_primitive_renders_undefined_message() {
    let result = run("throw 'plain string';");
    assert_eq!(result.output, "Error: undefined\n");
    assert_eq!(error_kind(&result), Some(RunErrorKind::UserCodeThrow));
}

#[test]
fn thrown_plain_object_uses_its_message() {
    let result = run("throw { message: 'custom' };");
    assert_eq!(result.output, "Error: custom\n");
}

#[test]
fn interpreter_errors_are_user_code_throws() {
    let result = run("console.log('before'); undefinedFunction();");
    assert_eq!(result.output, "before\nError: undefinedFunction is not defined\n");
    assert_eq!(error_kind(&result), Some(RunErrorKind::UserCodeThrow));
}

#[test]
fn syntax_errors_render_like_throws() {
    let result = run("console.log('never runs');\nconsole.log(");
    assert!(!result.success);
    assert_eq!(error_kind(&result), Some(RunErrorKind::SyntaxError));
    assert!(result.lines.is_empty());
    assert!(result.output.starts_with("Error: "), "{}", result.output);
    assert!(result.output.ends_with('\n'));
    assert_eq!(result.output.matches('\n').count(), 1);
}

#[test]
fn cyclic_values_fail_serialization() {
    let result = run("console.log('a'); const o = {}; o.self = o; console.log(o);");
    assert!(!result.success);
    assert_eq!(result.output, "a\nError: Converting circular structure to JSON\n");
    assert_eq!(error_kind(&result), Some(RunErrorKind::SerializationFailure));
}

#[test]
fn functions_inside_objects_fail_serialization() {
    let result = run("console.log({ f() {} });");
    assert_eq!(
        result.output,
        "Error: Converting a function to JSON is not supported\n"
    );
    assert_eq!(error_kind(&result), Some(RunErrorKind::SerializationFailure));
}

#[test]
fn serialization_failures_can_be_caught() {
    let result = run("try { console.log([() => 1]); } catch (e) { console.log(e.name); }");
    assert!(result.success);
    assert_eq!(result.output, "TypeError\n");
}

#[test]
fn rethrown_serialization_failure_is_still_classified() {
    let result = run("try { console.log([() => 1]); } catch (e) { throw e; }");
    assert_eq!(error_kind(&result), Some(RunErrorKind::SerializationFailure));
}

#[test]
fn step_limit_ends_runaway_loops() {
    let config = PlaygroundConfig {
        step_limit: Some(10_000),
        ..PlaygroundConfig::default()
    };
    let mut engine = Engine::with_config(config).unwrap();
    engine
        .set_source("console.log('start'); try { while (true) {} } catch (e) { console.log('x'); }")
        .unwrap();
    let result = engine.run();
    assert!(!result.success);
    assert_eq!(error_kind(&result), Some(RunErrorKind::StepLimitExceeded));
    assert_eq!(result.output, "start\nError: step limit of 10000 exceeded\n");
    assert_eq!(engine.state(), EngineState::Idle);
}

/// Run `source` with `config` on a thread with a 1 MB stack.
fn run_on_small_stack(config: PlaygroundConfig, source: &'static str) -> ExecutionResult {
    std::thread::Builder::new()
        .stack_size(1 << 20)
        .spawn(move || {
            let mut engine = Engine::with_config(config).unwrap();
            engine.set_source(source).unwrap();
            engine.run()
        })
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn deep_recursion_is_a_range_error() {
    let result = run_on_small_stack(
        PlaygroundConfig::default(),
        "function down(n) { return down(n + 1); }\ndown(0);",
    );
    assert_eq!(result.output, "Error: Maximum call stack size exceeded\n");
    assert_eq!(error_kind(&result), Some(RunErrorKind::UserCodeThrow));
}

#[test]
fn ordinary_recursion_runs_on_the_default_config() {
    let result = run_on_small_stack(
        PlaygroundConfig::default(),
        "function f(n) { return n == 0 ? 0 : 1 + f(n - 1); }\nconsole.log(f(500), f(1000));",
    );
    assert!(result.success);
    assert_eq!(result.output, "500 1000\n");
}

#[test]
fn raised_call_depth_is_enforced_without_overflow() {
    let config = PlaygroundConfig::from_json(r#"{ "max_call_depth": 5000 }"#).unwrap();
    let result = run_on_small_stack(
        config,
        "function f(n) { return n == 0 ? 0 : 1 + f(n - 1); }\nconsole.log(f(4999));\nf(5000);",
    );
    assert_eq!(result.output, "4999\nError: Maximum call stack size exceeded\n");
}

#[test]
fn deeply_nested_object_is_logged() {
    let result = run_on_small_stack(
        PlaygroundConfig::default(),
        "let o = {}; for (let i = 0; i < 5000; i++) o = {n: o};\nconsole.log(o);",
    );
    assert!(result.success);
    assert_eq!(result.lines[0].len(), 30_002);
    assert!(result.lines[0].starts_with(r#"{"n":{"n":"#));
}

#[test]
fn nesting_past_the_cap_is_reported_not_fatal() {
    let result = run_on_small_stack(
        PlaygroundConfig::default(),
        "let o = {}; for (let i = 0; i < 20000; i++) o = {n: o};\n\
         console.log('built');\n\
         console.log(o);",
    );
    assert_eq!(result.output, "built\nError: Maximum call stack size exceeded\n");
    assert_eq!(error_kind(&result), Some(RunErrorKind::UserCodeThrow));
}

#[test]
fn long_chains_are_released_after_the_run() {
    let result = run_on_small_stack(
        PlaygroundConfig::default(),
        "let o = {}; for (let i = 0; i < 20000; i++) o = {n: o};\n\
         let a = []; for (let i = 0; i < 20000; i++) a = [a];\n\
         console.log(a.length);",
    );
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.output, "1\n");
}

// ══════════════════════════════════════════════════════════════════════════════
// Capture, isolation, sequential runs
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn console_log_reaches_host_after_run() {
    let (mut engine, host) = engine_with_host_console();
    engine.set_source("console.log('captured');").unwrap();
    engine.run();
    assert!(host.lines.borrow().is_empty());

    Script::compile("console.log('outside');")
        .unwrap()
        .run(engine.realm(), Limits::default())
        .unwrap();
    assert_eq!(*host.lines.borrow(), vec!["outside"]);
    assert_eq!(engine.output().as_str(), "captured\n");
}

#[test]
fn console_log_is_restored_after_failure() {
    let (mut engine, host) = engine_with_host_console();
    engine.set_source("console.log = null; throw new Error('x');").unwrap();
    engine.run();
    Script::compile("console.log('outside');")
        .unwrap()
        .run(engine.realm(), Limits::default())
        .unwrap();
    assert_eq!(*host.lines.borrow(), vec!["outside"]);
}

#[test]
fn other_console_methods_go_to_the_host() {
    let (mut engine, host) = engine_with_host_console();
    engine.set_source("console.warn('w'); console.log('l');").unwrap();
    let result = engine.run();
    assert_eq!(result.output, "l\n");
    assert_eq!(*host.lines.borrow(), vec!["w"]);
}

#[test]
fn stashed_capture_does_not_leak_into_later_runs() {
    let (mut engine, _host) = engine_with_host_console();
    engine.set_source("stash = console.log; console.log('one');").unwrap();
    assert_eq!(engine.run().output, "one\n");
    engine.set_source("stash('stale'); console.log('two');").unwrap();
    assert_eq!(engine.run().output, "two\n");
}

#[test]
fn engine_bindings_are_invisible() {
    let result = run(
        "console.log(typeof log, typeof output, typeof capture, typeof engine, typeof source);",
    );
    assert_eq!(result.output, "undefined undefined undefined undefined undefined\n");
}

#[test]
fn declarations_are_fresh_each_run() {
    let mut engine = Engine::new();
    engine.set_source("let count = 0; count++; console.log(count);").unwrap();
    assert_eq!(engine.run().output, "1\n");
    assert_eq!(engine.run().output, "1\n");
}

#[test]
fn each_run_replaces_the_previous_output() {
    let mut engine = Engine::new();
    engine.set_source("console.log('first');").unwrap();
    engine.run();
    engine.set_source("console.log('second');").unwrap();
    engine.run();
    assert_eq!(engine.output().as_str(), "second\n");
}

// ══════════════════════════════════════════════════════════════════════════════
// Source bounds and display
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn overlong_source_is_rejected_not_truncated() {
    let mut engine = Engine::new();
    let before = engine.source().as_str().to_string();
    let long = "x".repeat(1501);
    assert_eq!(
        engine.set_source(&long),
        Err(SourceError::TooLong {
            len: 1501,
            max: 1500
        })
    );
    assert_eq!(engine.source().as_str(), before);
    assert!(engine.set_source(&"x".repeat(1500)).is_ok());
}

#[test]
fn placeholder_shows_until_there_is_output() {
    let mut engine = Engine::new();
    assert_eq!(engine.display_text(), "Output will be displayed here.");
    engine.run();
    assert_eq!(engine.display_text(), "Hello, World!\n");
    engine.set_source("1 + 1;").unwrap();
    engine.run();
    assert_eq!(engine.display_text(), "Output will be displayed here.");
}

#[test]
fn result_carries_source_fingerprint() {
    let source = "console.log(42);";
    let result = run(source);
    assert_eq!(result.source_sha256, fingerprint(source));
    assert_eq!(result.source_sha256.len(), 64);
}

#[test]
fn result_serializes_to_json() {
    let result = run("throw new RangeError('r');");
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["kind"], "user_code_throw");
    assert_eq!(json["error"]["message"], "r");
    assert_eq!(json["output"], "Error: r\n");
}

// ══════════════════════════════════════════════════════════════════════════════
// Properties
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Primitive {
    Int(i32),
    Text(String),
    Bool(bool),
    Null,
}

impl Primitive {
    fn source(&self) -> String {
        match self {
            Primitive::Int(n) => format!("({n})"),
            Primitive::Text(s) => serde_json::to_string(s).unwrap(),
            Primitive::Bool(b) => b.to_string(),
            Primitive::Null => "null".to_string(),
        }
    }

    fn printed(&self) -> String {
        match self {
            Primitive::Int(n) => n.to_string(),
            Primitive::Text(s) => s.clone(),
            Primitive::Bool(b) => b.to_string(),
            Primitive::Null => "null".to_string(),
        }
    }
}

fn primitive() -> impl Strategy<Value = Primitive> {
    prop_oneof![
        any::<i32>().prop_map(Primitive::Int),
        "[a-zA-Z0-9 _.,!?-]{0,8}".prop_map(Primitive::Text),
        any::<bool>().prop_map(Primitive::Bool),
        Just(Primitive::Null),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_primitive_logs_are_joined_in_order(
        calls in prop::collection::vec(prop::collection::vec(primitive(), 1..4), 0..10)
    ) {
        let source: String = calls
            .iter()
            .map(|args| {
                let args: Vec<String> = args.iter().map(Primitive::source).collect();
                format!("console.log({});\n", args.join(", "))
            })
            .collect();
        let expected: String = calls
            .iter()
            .map(|args| {
                let args: Vec<String> = args.iter().map(Primitive::printed).collect();
                format!("{}\n", args.join(" "))
            })
            .collect();

        let result = run(&source);
        prop_assert!(result.success);
        prop_assert_eq!(result.output, expected);
        prop_assert_eq!(result.lines.len(), calls.len());
    }

    #[test]
    fn prop_runs_are_idempotent(
        values in prop::collection::vec(any::<i32>(), 0..20)
    ) {
        let list: Vec<String> = values.iter().map(|v| format!("({v})")).collect();
        let source = format!(
            "const xs = [{}];\nconsole.log(xs.length, JSON.stringify(xs.slice().sort((a, b) => a - b)));\nfor (const x of xs) console.log(x * 2);",
            list.join(", ")
        );
        let mut engine = Engine::new();
        engine.set_source(&source).unwrap();
        let first = engine.run();
        let second = engine.run();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_oversized_sources_never_run(extra in 1usize..200) {
        let mut engine = Engine::new();
        let text = format!("console.log(1);{}", " ".repeat(1500 - 15 + extra));
        let rejected = engine.set_source(&text).is_err();
        prop_assert!(rejected);
        let result = engine.run();
        prop_assert_eq!(result.output, "Hello, World!\n");
    }
}
