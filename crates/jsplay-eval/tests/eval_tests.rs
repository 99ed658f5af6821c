//! Integration tests for the jsplay evaluator.
//!
//! Tests key evaluator features:
//! - expressions, operators and conversions
//! - scoping: closures, hoisting, TDZ, per-iteration `let`
//! - control flow: loops, `switch`, `try/catch/finally`
//! - runtime error messages
//! - builtins: `JSON`, `Math`, `Object`, arrays, strings, numbers
//! - limits: step budget and call depth
//! - realm persistence across runs

use std::cell::RefCell;
use std::rc::Rc;

use jsplay_eval::{
    ConsoleLevel, ConsoleSink, EvalError, Limits, ObjectKind, Realm, Script, Value,
};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Console sink that keeps every line.
#[derive(Default)]
struct Collect {
    lines: RefCell<Vec<(ConsoleLevel, String)>>,
}

impl ConsoleSink for Collect {
    fn write(&self, level: ConsoleLevel, line: &str) {
        self.lines.borrow_mut().push((level, line.to_string()));
    }
}

fn realm() -> (Realm, Rc<Collect>) {
    let sink = Rc::new(Collect::default());
    let realm = Realm::with_console_sink(sink.clone());
    (realm, sink)
}

fn run_in(realm: &Realm, source: &str) -> Result<Value, EvalError> {
    let script = match Script::compile(source) {
        Ok(script) => script,
        Err(err) => panic!("compile error: {err}"),
    };
    script.run(realm, Limits::default())
}

/// Run `source` and return its console lines, panicking on an uncaught error.
fn logs(source: &str) -> Vec<String> {
    let (realm, sink) = realm();
    if let Err(err) = run_in(&realm, source) {
        panic!("unexpected error: {}", thrown_message(&err));
    }
    let lines = sink.lines.borrow();
    lines.iter().map(|(_, line)| line.clone()).collect()
}

/// Run `source` and return its single console line.
fn log1(source: &str) -> String {
    let lines = logs(source);
    assert_eq!(lines.len(), 1, "expected one line, got {lines:?}");
    lines[0].clone()
}

/// Value of `expr`, formatted the way `console.log` prints it.
fn show(expr: &str) -> String {
    log1(&format!("console.log({expr});"))
}

fn thrown_message(err: &EvalError) -> String {
    match err.thrown() {
        Some(Value::Object(obj)) => match &obj.borrow().kind {
            ObjectKind::Error { name, message } => format!("{name}: {message}"),
            _ => format!("{err}"),
        },
        _ => format!("{err}"),
    }
}

/// Run `source`, which must throw; returns `"Name: message"`.
fn error(source: &str) -> String {
    let (realm, _) = realm();
    match run_in(&realm, source) {
        Ok(value) => panic!("expected an error, got {value:?}"),
        Err(err) => thrown_message(&err),
    }
}

/// Run on a thread with a 1 MB stack, well below what deep recursion needs
/// without stack growth.
fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    let handle = std::thread::Builder::new()
        .stack_size(1 << 20)
        .spawn(f)
        .expect("spawn test thread");
    handle.join().expect("test thread panicked")
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions and conversions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn arithmetic_and_precedence() {
    assert_eq!(show("1 + 2 * 3"), "7");
    assert_eq!(show("(1 + 2) * 3"), "9");
    assert_eq!(show("2 ** 3 ** 2"), "512");
    assert_eq!(show("7 % 3"), "1");
    assert_eq!(show("-7 % 3"), "-1");
    assert_eq!(show("1 / 0"), "Infinity");
    assert_eq!(show("0 / 0"), "NaN");
}

#[test]
fn number_formatting() {
    assert_eq!(show("0.1 + 0.2"), "0.30000000000000004");
    assert_eq!(show("1e21"), "1e+21");
    assert_eq!(show("123456789012"), "123456789012");
    assert_eq!(show("0.000001"), "0.000001");
    assert_eq!(show("1e-7"), "1e-7");
    assert_eq!(show("-0"), "0");
    assert_eq!(show("(255).toString(16)"), "ff");
    assert_eq!(show("5..toString(2)"), "101");
    assert_eq!(show("7. + 1"), "8");
    assert_eq!(show("(1.005).toFixed(2)"), "1.00");
    assert_eq!(show("(2.5).toFixed(0)"), "3");
}

#[test]
fn string_concatenation_and_coercion() {
    assert_eq!(show("'a' + 1"), "a1");
    assert_eq!(show("1 + '2'"), "12");
    assert_eq!(show("'3' * '4'"), "12");
    assert_eq!(show("[1, 2] + ''"), "1,2");
    assert_eq!(show("({}) + ''"), "[object Object]");
    assert_eq!(show("true + 1"), "2");
    assert_eq!(show("null + 1"), "1");
    assert_eq!(show("undefined + 1"), "NaN");
}

#[test]
fn equality() {
    assert_eq!(show("1 == '1'"), "true");
    assert_eq!(show("1 === '1'"), "false");
    assert_eq!(show("null == undefined"), "true");
    assert_eq!(show("null === undefined"), "false");
    assert_eq!(show("NaN === NaN"), "false");
    assert_eq!(show("[1].includes(NaN)"), "false");
    assert_eq!(show("[NaN].includes(NaN)"), "true");
    assert_eq!(show("[NaN].indexOf(NaN)"), "-1");
}

#[test]
fn typeof_operator() {
    assert_eq!(show("typeof 1"), "number");
    assert_eq!(show("typeof 'x'"), "string");
    assert_eq!(show("typeof null"), "object");
    assert_eq!(show("typeof []"), "object");
    assert_eq!(show("typeof function () {}"), "function");
    assert_eq!(show("typeof notDeclared"), "undefined");
}

#[test]
fn logical_and_nullish_operators() {
    assert_eq!(show("0 || 'fallback'"), "fallback");
    assert_eq!(show("0 ?? 'fallback'"), "0");
    assert_eq!(show("null ?? 'fallback'"), "fallback");
    assert_eq!(show("1 && 2"), "2");
    assert_eq!(
        log1("let a = null; a ??= 5; let b = 1; b ||= 9; console.log(a, b);"),
        "5 1"
    );
}

#[test]
fn optional_chaining() {
    assert_eq!(show("null?.x"), "undefined");
    assert_eq!(show("({ a: { b: 2 } })?.a?.b"), "2");
    assert_eq!(show("undefined?.x.y.z"), "undefined");
}

#[test]
fn template_literals() {
    assert_eq!(log1("const n = 3; console.log(`n = ${n * 2}!`);"), "n = 6!");
}

// ══════════════════════════════════════════════════════════════════════════════
// Scoping
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn closures_capture_environment() {
    let out = logs(
        r#"
function counter() {
  let n = 0;
  return () => ++n;
}
const c = counter();
c(); c();
console.log(c());
"#,
    );
    assert_eq!(out, vec!["3"]);
}

#[test]
fn for_let_gets_fresh_binding_per_iteration() {
    let out = logs(
        r#"
const fns = [];
for (let i = 0; i < 3; i++) fns.push(() => i);
console.log(fns.map(f => f()));
var gs = [];
for (var j = 0; j < 3; j++) gs.push(() => j);
console.log(gs.map(g => g()));
"#,
    );
    assert_eq!(out, vec!["[0,1,2]", "[3,3,3]"]);
}

#[test]
fn function_and_var_hoisting() {
    let out = logs(
        r#"
console.log(typeof f, v);
function f() {}
var v = 1;
"#,
    );
    assert_eq!(out, vec!["function undefined"]);
}

#[test]
fn temporal_dead_zone() {
    assert_eq!(
        error("console.log(x); let x = 1;"),
        "ReferenceError: Cannot access 'x' before initialization"
    );
}

#[test]
fn const_reassignment_fails() {
    assert_eq!(
        error("const c = 1; c = 2;"),
        "TypeError: Assignment to constant variable."
    );
}

#[test]
fn undefined_variable() {
    assert_eq!(error("missing + 1"), "ReferenceError: missing is not defined");
}

#[test]
fn block_scoping_shadows() {
    assert_eq!(
        log1("let x = 1; { let x = 2; } console.log(x);"),
        "1"
    );
}

#[test]
fn default_and_rest_parameters() {
    assert_eq!(
        log1("function f(a, b = a * 2, ...rest) { return [a, b, rest]; } console.log(f(1));"),
        "[1,2,[]]"
    );
    assert_eq!(
        log1("function f(a, ...rest) { return rest.length; } console.log(f(1, 2, 3));"),
        "2"
    );
}

#[test]
fn this_binding_for_methods_and_new() {
    let out = logs(
        r#"
const o = { n: 4, get() { return this.n; } };
console.log(o.get());
function Point(x) { this.x = x; }
Point.prototype.double = function () { return this.x * 2; };
const p = new Point(5);
console.log(p.double(), p instanceof Point);
"#,
    );
    assert_eq!(out, vec!["4", "10 true"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Control flow
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn loops_with_break_and_continue() {
    let out = logs(
        r#"
let s = 0;
for (let i = 0; i < 10; i++) {
  if (i % 2) continue;
  if (i > 6) break;
  s += i;
}
let k = 0;
do { k++; } while (k < 5);
let w = 0;
while (true) { if (++w === 3) break; }
console.log(s, k, w);
"#,
    );
    assert_eq!(out, vec!["12 5 3"]);
}

#[test]
fn for_of_and_for_in() {
    let out = logs(
        r#"
const seen = [];
for (const c of "ab") seen.push(c);
for (const n of [1, 2]) seen.push(n);
for (const k in { x: 1, y: 2 }) seen.push(k);
console.log(seen.join(""));
"#,
    );
    assert_eq!(out, vec!["ab12xy"]);
}

#[test]
fn switch_falls_through_until_break() {
    let out = logs(
        r#"
function f(x) {
  const out = [];
  switch (x) {
    case 1: out.push("one");
    case 2: out.push("two"); break;
    default: out.push("other");
  }
  return out.join(",");
}
console.log(f(1), f(2), f(3));
"#,
    );
    assert_eq!(out, vec!["one,two two other"]);
}

#[test]
fn try_catch_finally() {
    let out = logs(
        r#"
function f() {
  try {
    throw new TypeError("bad");
  } catch (e) {
    console.log(e.name, e.message, e instanceof TypeError, e instanceof Error);
    return "caught";
  } finally {
    console.log("finally");
  }
}
console.log(f());
try { null.x; } catch { console.log("no binding"); }
"#,
    );
    assert_eq!(
        out,
        vec!["TypeError bad true true", "finally", "caught", "no binding"]
    );
}

#[test]
fn thrown_primitives_are_catchable() {
    assert_eq!(log1("try { throw 42; } catch (e) { console.log(e); }"), "42");
}

#[test]
fn top_level_return_ends_run() {
    let (realm, sink) = realm();
    let result = run_in(&realm, "console.log(1); return 7; console.log(2);");
    assert!(matches!(result, Ok(Value::Number(n)) if n == 7.0));
    assert_eq!(sink.lines.borrow().len(), 1);
}

// ══════════════════════════════════════════════════════════════════════════════
// Runtime errors
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn property_of_undefined() {
    assert_eq!(
        error("let o; o.k;"),
        "TypeError: Cannot read properties of undefined (reading 'k')"
    );
}

#[test]
fn calling_a_non_function() {
    assert_eq!(
        error("const o = {}; o.method();"),
        "TypeError: o.method is not a function"
    );
}

#[test]
fn error_to_string() {
    assert_eq!(show("String(new RangeError('r'))"), "RangeError: r");
    assert_eq!(show("new Error('m').message"), "m");
}

// ══════════════════════════════════════════════════════════════════════════════
// Builtins
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn console_formats_objects_as_json() {
    assert_eq!(show("1, 'a', {x: 1}"), r#"1 a {"x":1}"#);
    assert_eq!(show("null, [1, 'b']"), r#"null [1,"b"]"#);
    assert_eq!(show("undefined, true"), "undefined true");
}

#[test]
fn console_levels_reach_the_sink() {
    let (realm, sink) = realm();
    run_in(&realm, "console.warn('w'); console.error('e');").expect("run");
    let levels: Vec<ConsoleLevel> = sink.lines.borrow().iter().map(|(l, _)| *l).collect();
    assert_eq!(levels, vec![ConsoleLevel::Warn, ConsoleLevel::Error]);
}

#[test]
fn json_stringify_and_parse() {
    assert_eq!(
        show("JSON.stringify({a: [1, {b: null}], f() {}, u: undefined})"),
        r#"{"a":[1,{"b":null}]}"#
    );
    assert_eq!(show("JSON.stringify([undefined, () => 1])"), "[null,null]");
    assert_eq!(show("JSON.stringify('q\"')"), r#""q\"""#);
    assert_eq!(
        log1("console.log(JSON.stringify({a: 1, b: [2]}, null, 2));"),
        "{\n  \"a\": 1,\n  \"b\": [\n    2\n  ]\n}"
    );
    assert_eq!(show("JSON.parse('{\"x\": [1, 2]}').x[1]"), "2");
}

#[test]
fn json_rejects_cycles() {
    assert_eq!(
        error("const a = {}; a.self = a; JSON.stringify(a);"),
        "TypeError: Converting circular structure to JSON"
    );
}

#[test]
fn json_parse_errors_are_syntax_errors() {
    let message = error("JSON.parse('{bad');");
    assert!(message.starts_with("SyntaxError: "), "{message}");
}

#[test]
fn array_methods() {
    assert_eq!(show("[3, 1, 2].sort()"), "[1,2,3]");
    assert_eq!(show("[10, 9, 1].sort()"), "[1,10,9]");
    assert_eq!(show("[3, 1, 2].sort((a, b) => b - a)"), "[3,2,1]");
    assert_eq!(show("[1, 2, 3].map(x => x * 2).filter(x => x > 2)"), "[4,6]");
    assert_eq!(show("[1, 2, 3].reduce((a, b) => a + b)"), "6");
    assert_eq!(show("[[1, [2]], 3].flat()"), "[1,[2],3]");
    assert_eq!(show("[1, 2, 3, 4].slice(-2)"), "[3,4]");
    assert_eq!(show("[1, 2, 3].at(-1)"), "3");
    assert_eq!(show("[1, 2, 3].findLast(x => x < 3)"), "2");
    assert_eq!(show("Array.from({length: 3}, (_, i) => i * i)"), "[0,1,4]");
    assert_eq!(show("Array.isArray([]) && !Array.isArray('a')"), "true");
    assert_eq!(
        log1("const a = [1, 2, 3, 4]; const r = a.splice(1, 2, 'x'); console.log(a, r);"),
        r#"[1,"x",4] [2,3]"#
    );
}

#[test]
fn reduce_of_empty_array() {
    assert_eq!(
        error("[].reduce((a, b) => a + b);"),
        "TypeError: Reduce of empty array with no initial value"
    );
}

#[test]
fn sort_is_stable() {
    assert_eq!(
        show("[{k: 1, v: 'a'}, {k: 0, v: 'b'}, {k: 1, v: 'c'}].sort((x, y) => x.k - y.k).map(o => o.v).join('')"),
        "bac"
    );
}

#[test]
fn string_methods() {
    assert_eq!(show("'Hello'.toUpperCase()"), "HELLO");
    assert_eq!(show("'  pad '.trim()"), "pad");
    assert_eq!(show("'a,b,c'.split(',')"), r#"["a","b","c"]"#);
    assert_eq!(show("'abc'.split('')"), r#"["a","b","c"]"#);
    assert_eq!(show("'hello'.slice(1, -1)"), "ell");
    assert_eq!(show("'hello'.substring(3, 1)"), "el");
    assert_eq!(show("'5'.padStart(3, '0')"), "005");
    assert_eq!(show("'ab'.repeat(3)"), "ababab");
    assert_eq!(show("'a-b-c'.replace('-', '+')"), "a+b-c");
    assert_eq!(show("'a-b-c'.replaceAll('-', () => '+')"), "a+b+c");
    assert_eq!(show("'héllo'.length"), "5");
    assert_eq!(show("'abc'[1]"), "b");
    assert_eq!(show("'abc'.charCodeAt(0)"), "97");
    assert_eq!(show("String.fromCharCode(104, 105)"), "hi");
}

#[test]
fn strings_count_utf16_code_units() {
    assert_eq!(show(r"'\u{1F600}'.length"), "2");
    assert_eq!(show(r"'a\u{1F600}b'.charCodeAt(1)"), "55357");
    assert_eq!(show(r"'a\u{1F600}b'.codePointAt(1)"), "128512");
    assert_eq!(show(r"'a\u{1F600}b'.slice(1, 3) === '\u{1F600}'"), "true");
    assert_eq!(show(r"'a\u{1F600}b'.indexOf('b')"), "3");
    assert_eq!(show(r"'\u{1F600}'.padStart(4, '-')"), "--\u{1F600}");
    assert_eq!(show(r"String.fromCharCode(0xD83D, 0xDE00) === '\u{1F600}'"), "true");
    assert_eq!(show(r"[...'\u{1F600}x'].length"), "2");
    assert_eq!(show(r"Object.keys('\u{1F600}')"), r#"["0","1"]"#);
}

#[test]
fn string_repeat_rejects_negative_count() {
    assert_eq!(
        error("'x'.repeat(-1);"),
        "RangeError: Invalid count value: -1"
    );
}

#[test]
fn object_statics() {
    assert_eq!(show("Object.keys({a: 1, b: 2})"), r#"["a","b"]"#);
    assert_eq!(show("Object.values({a: 1, b: 2})"), "[1,2]");
    assert_eq!(show("Object.entries({a: 1})"), r#"[["a",1]]"#);
    assert_eq!(show("Object.assign({a: 1}, {b: 2})"), r#"{"a":1,"b":2}"#);
    assert_eq!(
        error("Object.keys(null);"),
        "TypeError: Cannot convert undefined or null to object"
    );
}

#[test]
fn math_and_number_helpers() {
    assert_eq!(show("Math.max(1, 5, 3)"), "5");
    assert_eq!(show("Math.round(-2.5)"), "-2");
    assert_eq!(show("Math.floor(Math.PI)"), "3");
    assert_eq!(show("parseInt('42px')"), "42");
    assert_eq!(show("parseInt('ff', 16)"), "255");
    assert_eq!(show("parseFloat('3.5e1x')"), "35");
    assert_eq!(show("Number('')"), "0");
    assert_eq!(show("Number('abc')"), "NaN");
    assert_eq!(show("Number.isInteger(5.0)"), "true");
    assert_eq!(show("isNaN('x')"), "true");
}

#[test]
fn math_random_is_in_unit_interval() {
    assert_eq!(
        show("Array.from({length: 50}, () => Math.random()).every(r => r >= 0 && r < 1)"),
        "true"
    );
}

#[test]
fn function_to_string_returns_source() {
    assert_eq!(
        log1("function add(a, b) { return a + b; }\nconsole.log(String(add));"),
        "function add(a, b) { return a + b; }"
    );
    assert_eq!(show("String(Math.max)"), "function max() { [native code] }");
}

#[test]
fn function_call_apply_bind() {
    assert_eq!(
        log1(
            r#"
function f(a, b) { return this.base + a + b; }
const o = { base: 10 };
console.log(f.call(o, 1, 2), f.apply(o, [3, 4]), f.bind(o, 5)(6));
"#
        ),
        "13 17 21"
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Limits
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn step_limit_stops_infinite_loop() {
    let (realm, _) = realm();
    let script = Script::compile("while (true) {}").expect("compile");
    let limits = Limits {
        step_limit: Some(10_000),
        ..Limits::default()
    };
    let result = script.run(&realm, limits);
    assert!(matches!(result, Err(EvalError::StepLimitExceeded { limit: 10_000 })));
}

#[test]
fn step_limit_is_not_catchable() {
    let (realm, sink) = realm();
    let script = Script::compile(
        "try { for (;;) {} } catch (e) { console.log('caught'); } finally { console.log('f'); }",
    )
    .expect("compile");
    let limits = Limits {
        step_limit: Some(1_000),
        ..Limits::default()
    };
    let result = script.run(&realm, limits);
    assert!(matches!(result, Err(EvalError::StepLimitExceeded { .. })));
    assert!(sink.lines.borrow().is_empty());
}

#[test]
fn deep_recursion_raises_range_error() {
    let message = on_small_stack(|| {
        let (realm, _) = realm();
        match run_in(&realm, "function f() { return f(); } f();") {
            Ok(_) => "no error".to_string(),
            Err(err) => thrown_message(&err),
        }
    });
    assert_eq!(message, "RangeError: Maximum call stack size exceeded");
}

#[test]
fn recursion_to_the_default_depth_succeeds() {
    let out = on_small_stack(|| {
        logs("function f(n) { return n == 0 ? 0 : 1 + f(n - 1); } console.log(f(1500));")
    });
    assert_eq!(out, vec!["1500"]);
}

#[test]
fn configured_call_depth_is_enforced_without_overflow() {
    let message = on_small_stack(|| {
        let (realm, _) = realm();
        let source = "function f(n) { return n == 0 ? 0 : 1 + f(n - 1); } f(5000);";
        let script = Script::compile(source).expect("compiles");
        let limits = Limits {
            max_call_depth: 3_000,
            ..Limits::default()
        };
        match script.run(&realm, limits) {
            Ok(_) => "no error".to_string(),
            Err(err) => thrown_message(&err),
        }
    });
    assert_eq!(message, "RangeError: Maximum call stack size exceeded");
}

#[test]
fn deeply_nested_values_stringify_and_join() {
    let out = on_small_stack(|| {
        logs(
            "let o = {}; for (let i = 0; i < 5000; i++) o = {n: o};\n\
             const s = JSON.stringify(o); console.log(s.length);\n\
             let a = []; for (let i = 0; i < 5000; i++) a = [a];\n\
             console.log(JSON.stringify(String(a)));\n\
             console.log(a.flat(Infinity).length);",
        )
    });
    assert_eq!(out, vec!["30002", "\"\"", "0"]);
}

#[test]
fn nesting_past_the_cap_is_a_range_error() {
    let messages = on_small_stack(|| {
        [
            "let o = {}; for (let i = 0; i < 20000; i++) o = {n: o}; JSON.stringify(o);",
            "let a = [1]; for (let i = 0; i < 20000; i++) a = [a]; String(a);",
            "const a = [1]; a.push(a); a.flat(Infinity);",
        ]
        .into_iter()
        .map(error)
        .collect::<Vec<_>>()
    });
    for message in messages {
        assert_eq!(message, "RangeError: Maximum call stack size exceeded");
    }
}

#[test]
fn long_object_chains_are_freed_after_the_run() {
    let out = on_small_stack(|| {
        logs(
            "let o = {}; for (let i = 0; i < 50000; i++) o = {n: o};\n\
             let f = () => 0; for (let i = 0; i < 50000; i++) { const g = f; f = () => g(); }\n\
             console.log('built');",
        )
    });
    assert_eq!(out, vec!["built"]);
}

#[test]
fn recursion_within_limit_succeeds() {
    let out = on_small_stack(|| {
        logs("function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); } console.log(fib(15));")
    });
    assert_eq!(out, vec!["610"]);
}

// ══════════════════════════════════════════════════════════════════════════════
// Realm
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn declarations_do_not_leak_between_runs() {
    let (realm, sink) = realm();
    run_in(&realm, "let hidden = 1; var alsoHidden = 2;").expect("first run");
    run_in(&realm, "console.log(typeof hidden, typeof alsoHidden);").expect("second run");
    assert_eq!(sink.lines.borrow()[0].1, "undefined undefined");
}

#[test]
fn undeclared_assignment_creates_global() {
    let (realm, sink) = realm();
    run_in(&realm, "leaked = 5;").expect("first run");
    assert!(matches!(realm.global("leaked"), Some(Value::Number(n)) if n == 5.0));
    run_in(&realm, "console.log(leaked);").expect("second run");
    assert_eq!(sink.lines.borrow()[0].1, "5");
}

#[test]
fn host_defined_globals_are_visible() {
    let (realm, sink) = realm();
    realm.define_global("answer", Value::Number(42.0));
    run_in(&realm, "console.log(answer);").expect("run");
    assert_eq!(sink.lines.borrow()[0].1, "42");
}

#[test]
fn syntax_errors_report_first_message() {
    let err = Script::compile("let = ;").expect_err("should fail");
    assert!(!err.message.is_empty());
    assert!(err.errors.has_errors());
}
