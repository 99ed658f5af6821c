//! The `JSON` global: `stringify` over script values, `parse` via `serde_json`.

use std::rc::Rc;

use crate::builtins::{arg, namespace};
use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::{enumerable_entries, Interpreter};
use crate::number::number_to_string;
use crate::stack::{self, MAX_NESTING_DEPTH, STACK_OVERFLOW_MESSAGE};
use crate::value::{ObjectKind, ObjectRef, Value};

/// How `stringify` treats members JSON has no form for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonMode {
    /// `JSON.stringify` behavior: functions and `undefined` members are omitted.
    Lenient,
    /// Function members raise a `TypeError` instead of vanishing.
    Strict,
}

pub(crate) fn install(globals: &Rc<Scope>) {
    let json = namespace(&[("stringify", json_stringify), ("parse", json_parse)]);
    globals.declare("JSON", Value::Object(json), true);
}

fn json_stringify(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let indent = match arg(args, 2) {
        Value::Number(n) => " ".repeat(n.clamp(0.0, 10.0) as usize),
        Value::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    Ok(stringify(interp, &arg(args, 0), &indent, JsonMode::Lenient)?
        .map(Value::String)
        .unwrap_or_default())
}

fn json_parse(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = interp.to_string(&arg(args, 0))?;
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(parsed) => Ok(from_json(parsed)),
        Err(err) => Err(interp.throw("SyntaxError", format!("Unexpected token in JSON ({err})"))),
    }
}

/// `JSON.stringify(value, null, indent)`; `None` where JavaScript returns `undefined`.
pub fn stringify(
    interp: &mut Interpreter,
    value: &Value,
    indent: &str,
    mode: JsonMode,
) -> EvalResult<Option<String>> {
    let mut writer = JsonWriter {
        mode,
        indent,
        stack: Vec::new(),
    };
    writer.write(interp, value, "")
}

/// Convert parsed JSON into script values; key order is preserved.
pub fn from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::array(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::object(map.into_iter().map(|(k, v)| (k, from_json(v)))),
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

struct JsonWriter<'a> {
    mode: JsonMode,
    indent: &'a str,
    /// Objects currently being written, for cycle detection and the depth cap.
    stack: Vec<usize>,
}

impl JsonWriter<'_> {
    fn write(
        &mut self,
        interp: &mut Interpreter,
        value: &Value,
        current: &str,
    ) -> EvalResult<Option<String>> {
        interp.tick()?;
        Ok(Some(match value {
            Value::Undefined => return Ok(None),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) if n.is_finite() => number_to_string(*n),
            Value::Number(_) => "null".to_string(),
            Value::String(s) => quote(s),
            Value::Object(obj) => {
                if obj.is_callable() {
                    return match self.mode {
                        JsonMode::Lenient => Ok(None),
                        JsonMode::Strict => {
                            Err(interp.type_error("Converting a function to JSON is not supported"))
                        }
                    };
                }
                if self.stack.contains(&obj.id()) {
                    return Err(interp.type_error("Converting circular structure to JSON"));
                }
                if self.stack.len() >= MAX_NESTING_DEPTH {
                    return Err(interp.range_error(STACK_OVERFLOW_MESSAGE));
                }
                self.stack.push(obj.id());
                let result = stack::guarded(|| self.write_object(interp, obj, value, current));
                self.stack.pop();
                result?
            }
        }))
    }

    fn write_object(
        &mut self,
        interp: &mut Interpreter,
        obj: &ObjectRef,
        value: &Value,
        current: &str,
    ) -> EvalResult<String> {
        let inner = format!("{current}{}", self.indent);
        let is_array = obj.is_array();
        let entries = enumerable_entries(value);

        let mut parts = Vec::with_capacity(entries.len());
        if is_array {
            let len = match &obj.borrow().kind {
                ObjectKind::Array(items) => items.len(),
                _ => 0,
            };
            for (_, item) in entries.into_iter().take(len) {
                let text = self.write(interp, &item, &inner)?;
                parts.push(text.unwrap_or_else(|| "null".to_string()));
            }
        } else {
            let separator = if self.indent.is_empty() { ":" } else { ": " };
            for (key, item) in entries {
                if let Some(text) = self.write(interp, &item, &inner)? {
                    parts.push(format!("{}{separator}{text}", quote(&key)));
                }
            }
        }

        let (open, close) = if is_array { ('[', ']') } else { ('{', '}') };
        if parts.is_empty() {
            return Ok(format!("{open}{close}"));
        }
        if self.indent.is_empty() {
            Ok(format!("{open}{}{close}", parts.join(",")))
        } else {
            let body = parts.join(&format!(",\n{inner}"));
            Ok(format!("{open}\n{inner}{body}\n{current}{close}"))
        }
    }
}
