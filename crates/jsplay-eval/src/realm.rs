//! The realm: global bindings shared by every script run against it.

use std::rc::Rc;

use crate::builtins;
use crate::builtins::console::{ConsoleSink, TracingConsole};
use crate::env::Scope;
use crate::value::{ObjectRef, Value};

/// Global environment for scripts.
///
/// Scripts run in their own function scope, but undeclared assignments and
/// mutations of built-ins (`console.log = …`) land here and persist across runs.
pub struct Realm {
    globals: Rc<Scope>,
    console: ObjectRef,
}

impl Realm {
    /// A realm whose `console` forwards to `tracing`.
    pub fn new() -> Self {
        Self::with_console_sink(Rc::new(TracingConsole))
    }

    /// A realm whose `console` writes to `sink`.
    pub fn with_console_sink(sink: Rc<dyn ConsoleSink>) -> Self {
        let globals = Scope::global();
        let console = builtins::install(&globals, sink);
        Self { globals, console }
    }

    pub fn globals(&self) -> &Rc<Scope> {
        &self.globals
    }

    /// The global `console` object.
    pub fn console(&self) -> &ObjectRef {
        &self.console
    }

    pub fn define_global(&self, name: &str, value: Value) {
        self.globals.declare(name, value, true);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.lookup(name).ok()
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
