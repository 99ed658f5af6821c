//! Scoped interception of `console.log`.

use std::cell::RefCell;
use std::rc::Rc;

use jsplay_eval::{format_line, EvalError, JsonMode, ObjectRef, Realm, Value};

use crate::output::OutputLog;

/// Replaces `console.log` on a realm's console object for as long as it
/// lives; the previous property is put back in `Drop`.
///
/// Captured calls format their arguments in [`JsonMode::Strict`], so a
/// value JSON cannot represent throws a `TypeError` at the call site.
pub struct ConsoleCapture<'r> {
    console: &'r ObjectRef,
    original: Option<Value>,
    log: Rc<RefCell<OutputLog>>,
    /// Last error object raised by a failed serialization.
    failure: Rc<RefCell<Option<ObjectRef>>>,
}

impl<'r> ConsoleCapture<'r> {
    pub fn install(realm: &'r Realm) -> Self {
        let console = realm.console();
        let original = console.get_own("log");
        let log = Rc::new(RefCell::new(OutputLog::new()));
        let failure = Rc::new(RefCell::new(None));

        let capture = {
            let log = Rc::clone(&log);
            let failure = Rc::clone(&failure);
            Value::native("log", move |interp, _this, args| {
                match format_line(interp, args, JsonMode::Strict) {
                    Ok(line) => {
                        log.borrow_mut().push_line(&line);
                        Ok(Value::Undefined)
                    }
                    Err(err) => {
                        if let EvalError::Thrown(Value::Object(obj)) = &err {
                            *failure.borrow_mut() = Some(obj.clone());
                        }
                        Err(err)
                    }
                }
            })
        };
        console.set_own("log", capture);

        Self {
            console,
            original,
            log,
            failure,
        }
    }

    /// Whether `err` is the exception a captured call raised while serializing.
    pub fn is_serialization_failure(&self, err: &EvalError) -> bool {
        let failure = self.failure.borrow();
        match (err.thrown(), failure.as_ref()) {
            (Some(Value::Object(thrown)), Some(raised)) => thrown.ptr_eq(raised),
            _ => false,
        }
    }

    /// Lines captured so far.
    pub fn line_count(&self) -> usize {
        self.log.borrow().line_count()
    }

    /// Stop capturing and hand back the log.
    pub fn finish(self) -> OutputLog {
        self.log.take()
    }
}

impl Drop for ConsoleCapture<'_> {
    fn drop(&mut self) {
        match self.original.take() {
            Some(original) => self.console.set_own("log", original),
            None => {
                self.console.borrow_mut().props.remove("log");
            }
        }
    }
}
