//! The global `console` object and the line formatting shared with output capture.

use std::rc::Rc;

use crate::builtins::json::{self, JsonMode};
use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::{Object, ObjectKind, ObjectRef, Value};

/// `tracing` target for script console output.
pub const CONSOLE_TARGET: &str = "jsplay::console";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl ConsoleLevel {
    pub const ALL: [ConsoleLevel; 5] = [
        ConsoleLevel::Log,
        ConsoleLevel::Info,
        ConsoleLevel::Warn,
        ConsoleLevel::Error,
        ConsoleLevel::Debug,
    ];

    /// Method name on `console`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Log => "log",
            ConsoleLevel::Info => "info",
            ConsoleLevel::Warn => "warn",
            ConsoleLevel::Error => "error",
            ConsoleLevel::Debug => "debug",
        }
    }
}

/// Destination for `console.*` calls made outside output capture.
pub trait ConsoleSink {
    fn write(&self, level: ConsoleLevel, line: &str);
}

/// Forwards console lines to `tracing` under [`CONSOLE_TARGET`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn write(&self, level: ConsoleLevel, line: &str) {
        match level {
            ConsoleLevel::Log | ConsoleLevel::Info => {
                tracing::info!(target: CONSOLE_TARGET, level = level.as_str(), "{line}")
            }
            ConsoleLevel::Warn => tracing::warn!(target: CONSOLE_TARGET, "{line}"),
            ConsoleLevel::Error => tracing::error!(target: CONSOLE_TARGET, "{line}"),
            ConsoleLevel::Debug => tracing::debug!(target: CONSOLE_TARGET, "{line}"),
        }
    }
}

/// Render `console.log` arguments as one line: values whose `typeof` is
/// `"object"` as JSON, everything else with `String(value)`, joined by spaces.
///
/// In [`JsonMode::Strict`] a structure that JSON cannot represent (a cycle,
/// or a function inside an object) raises a `TypeError`.
pub fn format_line(interp: &mut Interpreter, args: &[Value], mode: JsonMode) -> EvalResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        let part = if arg.type_of() == "object" {
            json::stringify(interp, arg, "", mode)?.unwrap_or_else(|| "undefined".to_string())
        } else {
            interp.to_string(arg)?
        };
        parts.push(part);
    }
    Ok(parts.join(" "))
}

pub(crate) fn install(globals: &Rc<Scope>, sink: Rc<dyn ConsoleSink>) -> ObjectRef {
    let console = ObjectRef::new(Object::new(ObjectKind::Ordinary));
    for level in ConsoleLevel::ALL {
        let sink = Rc::clone(&sink);
        let method = Value::native(level.as_str(), move |interp, _this, args| {
            let line = format_line(interp, args, JsonMode::Lenient)?;
            sink.write(level, &line);
            Ok(Value::Undefined)
        });
        console.set_own(level.as_str(), method);
    }
    globals.declare("console", Value::Object(console.clone()), true);
    console
}
