//! Built-in globals and prototype methods.
//!
//! Globals are installed once per realm. Prototype methods are resolved by
//! receiver type when a property lookup misses the object and its chain.

pub mod array;
pub mod console;
pub mod global;
pub mod json;
pub mod math;
pub mod object;
pub mod string;

use std::rc::Rc;

use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::{Object, ObjectKind, ObjectRef, Value};

use console::ConsoleSink;

/// A built-in function: `(interpreter, this, arguments)`.
pub type Method = fn(&mut Interpreter, &Value, &[Value]) -> EvalResult<Value>;

/// Install every global binding; returns the `console` object.
pub(crate) fn install(globals: &Rc<Scope>, sink: Rc<dyn ConsoleSink>) -> ObjectRef {
    global::install(globals);
    object::install(globals);
    array::install(globals);
    string::install(globals);
    math::install(globals);
    json::install(globals);
    console::install(globals, sink)
}

/// Built-in method `key` for a value of this type, if any.
pub(crate) fn method(target: &Value, key: &str) -> Option<Method> {
    let specific = match target {
        Value::String(_) => string::method(key),
        Value::Number(_) => global::number_method(key),
        Value::Object(obj) => match &obj.borrow().kind {
            ObjectKind::Array(_) => array::method(key),
            ObjectKind::Function(_) => object::function_method(key),
            ObjectKind::Error { .. } | ObjectKind::Ordinary => None,
        },
        Value::Bool(_) | Value::Undefined | Value::Null => None,
    };
    specific.or_else(|| object::common_method(key))
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Argument `i`, or `undefined` when absent.
pub(crate) fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// A plain object whose properties are the given built-in functions.
pub(crate) fn namespace(methods: &[(&str, Method)]) -> ObjectRef {
    let obj = ObjectRef::new(Object::new(ObjectKind::Ordinary));
    for (name, method) in methods {
        obj.set_own(name, Value::native(name, *method));
    }
    obj
}

/// Attach static functions such as `Array.isArray` to a constructor.
pub(crate) fn add_statics(ctor: &Value, methods: &[(&str, Method)]) {
    if let Value::Object(obj) = ctor {
        for (name, method) in methods {
            obj.set_own(name, Value::native(name, *method));
        }
    }
}

/// Clamp a relative index (negative counts from the end) into `0..=len`.
pub(crate) fn relative_index(n: f64, len: usize) -> usize {
    let len_f = len as f64;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let idx = if n < 0.0 { (len_f + n).max(0.0) } else { n.min(len_f) };
    idx as usize
}

/// Number argument `i`, converted with `ToNumber`; `default` when absent or `undefined`.
pub(crate) fn number_arg(
    interp: &mut Interpreter,
    args: &[Value],
    i: usize,
    default: f64,
) -> EvalResult<f64> {
    match args.get(i) {
        None | Some(Value::Undefined) => Ok(default),
        Some(value) => interp.to_number(value),
    }
}
