//! Runtime values: primitives plus reference-counted objects.
//!
//! Objects (ordinary objects, arrays, functions and error objects) live behind
//! [`ObjectRef`], a shared mutable handle. Identity comparisons use pointer
//! equality, matching JavaScript reference semantics.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use jsplay_types::ast::Function;
use jsplay_types::SourceFile;

use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::number::number_to_string;

/// Host function signature: `(interpreter, this, arguments)`.
pub type NativeFn = Rc<dyn Fn(&mut Interpreter, &Value, &[Value]) -> EvalResult<Value>>;

// ══════════════════════════════════════════════════════════════════════════════
// Value
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ObjectRef),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// A fresh array object.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Object(ObjectRef::new(Object::new(ObjectKind::Array(items))))
    }

    /// A fresh ordinary object with the given properties, in order.
    pub fn object(props: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut object = Object::new(ObjectKind::Ordinary);
        for (key, value) in props {
            object.props.set(&key, value);
        }
        Value::Object(ObjectRef::new(object))
    }

    /// A host function value.
    pub fn native(
        name: &str,
        func: impl Fn(&mut Interpreter, &Value, &[Value]) -> EvalResult<Value> + 'static,
    ) -> Self {
        Value::Object(ObjectRef::native(name, false, Rc::new(func)))
    }

    /// A host function that may also be invoked with `new`.
    pub fn native_constructor(
        name: &str,
        func: impl Fn(&mut Interpreter, &Value, &[Value]) -> EvalResult<Value> + 'static,
    ) -> Self {
        Value::Object(ObjectRef::native(name, true, Rc::new(func)))
    }

    /// An error object such as `new TypeError(message)`.
    pub fn error(name: &str, message: impl Into<String>) -> Self {
        Value::Object(ObjectRef::new(Object::new(ObjectKind::Error {
            name: name.to_string(),
            message: message.into(),
        })))
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        self.as_object().is_some_and(|o| o.is_callable())
    }

    /// The `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) if obj.is_callable() => "function",
            Value::Object(_) => "object",
        }
    }

    /// JavaScript `ToBoolean`.
    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) => true,
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// SameValueZero, used by `includes`: like `===` but `NaN` equals `NaN`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }

    /// String form of a primitive; `None` for objects, which need the interpreter.
    pub fn primitive_to_string(&self) -> Option<String> {
        Some(match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
            Value::Object(_) => return None,
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{}", number_to_string(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(obj) => write!(f, "{obj:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Objects
// ══════════════════════════════════════════════════════════════════════════════

/// Shared handle to a heap object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new(object: Object) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    fn native(name: &str, constructor: bool, func: NativeFn) -> Self {
        Self::new(Object::new(ObjectKind::Function(Callable::Native(NativeFunction {
            name: name.to_string(),
            func,
            constructor,
        }))))
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Object> {
        self.0.borrow_mut()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for cycle detection.
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.borrow().kind, ObjectKind::Array(_))
    }

    /// Own property lookup (no prototype chain, no built-in slots).
    pub fn get_own(&self, key: &str) -> Option<Value> {
        self.borrow().props.get(key).cloned()
    }

    pub fn set_own(&self, key: &str, value: Value) {
        self.borrow_mut().props.set(key, value);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow on purpose: objects may be cyclic.
        match self.0.try_borrow() {
            Ok(object) => match &object.kind {
                ObjectKind::Ordinary => write!(f, "[object Object]"),
                ObjectKind::Array(items) => write!(f, "[Array({})]", items.len()),
                ObjectKind::Function(callable) => write!(f, "[Function {}]", callable.name()),
                ObjectKind::Error { name, message } => write!(f, "[{name}: {message}]"),
            },
            Err(_) => write!(f, "[object]"),
        }
    }
}

pub struct Object {
    pub kind: ObjectKind,
    pub props: PropertyMap,
    /// Prototype link set by `new` on a user-defined constructor.
    pub proto: Option<ObjectRef>,
}

impl Object {
    pub fn new(kind: ObjectKind) -> Self {
        Self {
            kind,
            props: PropertyMap::default(),
            proto: None,
        }
    }

    /// Move out every value this object keeps alive.
    fn release_children(&mut self, pending: &mut Vec<Value>) {
        pending.extend(self.props.drain_values());
        if let Some(proto) = self.proto.take() {
            pending.push(Value::Object(proto));
        }
        match &mut self.kind {
            ObjectKind::Array(items) => pending.append(items),
            ObjectKind::Function(Callable::Closure(closure)) => {
                if Rc::strong_count(&closure.scope) == 1 {
                    closure.scope.release_values(pending);
                }
            }
            _ => {}
        }
    }
}

/// Teardown walks the object graph with a worklist, so a long chain such as
/// `o = {next: o}` is freed without one native frame per link.
impl Drop for Object {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.release_children(&mut pending);
        while let Some(value) = pending.pop() {
            if let Value::Object(obj) = value {
                if Rc::strong_count(&obj.0) == 1 {
                    if let Ok(mut object) = obj.0.try_borrow_mut() {
                        object.release_children(&mut pending);
                    }
                }
            }
        }
    }
}

pub enum ObjectKind {
    Ordinary,
    Array(Vec<Value>),
    Function(Callable),
    /// `name` and `message` are own but non-enumerable, as on real error objects.
    Error { name: String, message: String },
}

#[derive(Clone)]
pub enum Callable {
    Closure(Closure),
    Native(NativeFunction),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Closure(c) => &c.name,
            Callable::Native(n) => &n.name,
        }
    }
}

/// A user-defined function together with its defining scope.
#[derive(Clone)]
pub struct Closure {
    pub function: Rc<Function>,
    pub scope: Rc<Scope>,
    pub name: String,
    /// Script the function was written in, for `String(fn)`.
    pub source: Rc<SourceFile>,
}

impl Closure {
    /// The function's source text, as `Function.prototype.toString` returns it.
    pub fn source_text(&self) -> String {
        let span = self.function.span;
        let mut out = String::new();
        for line_no in span.start_line..=span.end_line {
            let line = self.source.line(line_no).unwrap_or("");
            let from = if line_no == span.start_line {
                span.start_col as usize - 1
            } else {
                0
            };
            let chars = line.chars().skip(from);
            if line_no == span.end_line {
                let take = (span.end_col as usize).saturating_sub(from);
                out.extend(chars.take(take));
            } else {
                out.extend(chars);
                out.push('\n');
            }
        }
        out
    }
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub func: NativeFn,
    pub constructor: bool,
}

// ══════════════════════════════════════════════════════════════════════════════
// Property storage
// ══════════════════════════════════════════════════════════════════════════════

/// Insertion-ordered property storage.
#[derive(Default, Clone)]
pub struct PropertyMap {
    entries: Vec<(String, Value)>,
}

impl PropertyMap {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Overwrite in place, or append a new key at the end.
    pub fn set(&mut self, key: &str, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Empty the map, yielding its values.
    pub fn drain_values(&mut self) -> impl Iterator<Item = Value> + '_ {
        self.entries.drain(..).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| k != key);
        self.entries.len() != before
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a canonical array index key (`"0"`, `"17"`, but not `"01"` or `"-1"`).
pub fn array_index(key: &str) -> Option<usize> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    if !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    key.parse::<usize>().ok()
}
