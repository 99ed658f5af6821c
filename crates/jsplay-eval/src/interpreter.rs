//! Tree-walking evaluator for jsplay scripts: expressions, property access,
//! type conversions and function calls.
//!
//! Statement execution lives in `exec.rs`. Every expression and statement
//! costs one step; when a step limit is configured the run is aborted with
//! [`EvalError::StepLimitExceeded`] once it is used up.

use std::cmp::Ordering;
use std::rc::Rc;

use jsplay_types::ast::{
    AssignOp, BinOp, Element, Expr, ExprKind, Function, FunctionBody, LogicalOp, MemberProperty,
    PropertyDef, PropertyKey, TemplatePart, UnaryOp, UpdateOp,
};
use jsplay_types::SourceFile;

use crate::builtins;
use crate::builtins::string::{unit_at, utf16_length};
use crate::env::{BindingError, Scope, ScopeKind};
use crate::error::{EvalError, EvalResult};
use crate::number::{number_to_string, string_to_number, to_int32, to_uint32};
use crate::realm::Realm;
use crate::stack::{self, MAX_NESTING_DEPTH, STACK_OVERFLOW_MESSAGE};
use crate::value::{array_index, Callable, Closure, Object, ObjectKind, ObjectRef, Value};

/// Default limit on nested script function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 2_000;

/// Highest call-depth limit a configuration may ask for.
pub const MAX_CALL_DEPTH: usize = 10_000;

/// Longest array a single index or `length` write may grow to.
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

/// Binding name for the receiver; not a valid identifier, so never shadowed.
pub(crate) const THIS: &str = "this";

/// Resource limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum evaluation steps; `None` is unbounded.
    pub step_limit: Option<u64>,
    /// Maximum depth of nested script function calls; values above
    /// [`MAX_CALL_DEPTH`] are clamped.
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            step_limit: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// A resolved assignment target.
enum Reference {
    Binding(String),
    Property(Value, String),
}

/// The jsplay evaluator.
///
/// One interpreter runs one script against a realm's global scope.
pub struct Interpreter {
    globals: Rc<Scope>,
    limits: Limits,
    steps: u64,
    call_depth: usize,
    /// Script whose code is currently running (for closure source text).
    source: Rc<SourceFile>,
    /// Arrays being stringified, to cut cycles.
    join_stack: Vec<usize>,
}

impl Interpreter {
    pub fn new(realm: &Realm, source: Rc<SourceFile>, limits: Limits) -> Self {
        let limits = Limits {
            max_call_depth: limits.max_call_depth.min(MAX_CALL_DEPTH),
            ..limits
        };
        Self {
            globals: Rc::clone(realm.globals()),
            limits,
            steps: 0,
            call_depth: 0,
            source,
            join_stack: Vec::new(),
        }
    }

    /// Steps consumed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Consume one step of the budget.
    pub fn tick(&mut self) -> EvalResult<()> {
        self.steps += 1;
        match self.limits.step_limit {
            Some(limit) if self.steps > limit => Err(EvalError::StepLimitExceeded { limit }),
            _ => Ok(()),
        }
    }

    // ── Errors ────────────────────────────────────────────────────────────────

    /// A script exception carrying a fresh error object, e.g. `TypeError`.
    pub fn throw(&self, name: &str, message: impl Into<String>) -> EvalError {
        EvalError::Thrown(Value::error(name, message))
    }

    pub fn type_error(&self, message: impl Into<String>) -> EvalError {
        self.throw("TypeError", message)
    }

    pub fn range_error(&self, message: impl Into<String>) -> EvalError {
        self.throw("RangeError", message)
    }

    pub fn reference_error(&self, message: impl Into<String>) -> EvalError {
        self.throw("ReferenceError", message)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════════

    pub(crate) fn eval_expr(&mut self, scope: &Rc<Scope>, expr: &Expr) -> EvalResult<Value> {
        stack::guarded(|| self.eval_expr_inner(scope, expr))
    }

    fn eval_expr_inner(&mut self, scope: &Rc<Scope>, expr: &Expr) -> EvalResult<Value> {
        self.tick()?;
        match &expr.kind {
            ExprKind::NumberLit(n) => Ok(Value::Number(*n)),
            ExprKind::StringLit(s) => Ok(Value::String(s.clone())),
            ExprKind::BoolLit(b) => Ok(Value::Bool(*b)),
            ExprKind::NullLit => Ok(Value::Null),
            ExprKind::Template(parts) => self.eval_template(scope, parts),
            ExprKind::ArrayLit(elements) => Ok(Value::array(self.eval_elements(scope, elements)?)),
            ExprKind::ObjectLit(props) => self.eval_object_literal(scope, props),
            ExprKind::Function(function) => Ok(self.make_closure(scope, function, None)),
            ExprKind::Identifier(name) => self.lookup(scope, name),
            ExprKind::This => Ok(scope.lookup(THIS).unwrap_or_default()),
            ExprKind::Member {
                object,
                property,
                optional,
            } => self.eval_member(scope, object, property, *optional),
            ExprKind::Call {
                callee,
                args,
                optional,
            } => self.eval_call(scope, callee, args, *optional),
            ExprKind::New { callee, args } => {
                let ctor = self.eval_expr(scope, callee)?;
                let args = self.eval_elements(scope, args)?;
                self.construct(&ctor, &args)
            }
            ExprKind::OptionalChain(inner) => match self.eval_expr(scope, inner) {
                Err(EvalError::ShortCircuit) => Ok(Value::Undefined),
                other => other,
            },
            ExprKind::Unary { op, operand } => self.eval_unary(scope, *op, operand),
            ExprKind::Update {
                op,
                prefix,
                target,
            } => self.eval_update(scope, *op, *prefix, target),
            ExprKind::Binary { left, op, right } => {
                let left = self.eval_expr(scope, left)?;
                let right = self.eval_expr(scope, right)?;
                self.binary_op(*op, &left, &right)
            }
            ExprKind::Logical { left, op, right } => {
                let left = self.eval_expr(scope, left)?;
                if short_circuits(*op, &left) {
                    Ok(left)
                } else {
                    self.eval_expr(scope, right)
                }
            }
            ExprKind::Assign { op, target, value } => self.eval_assign(scope, *op, target, value),
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval_expr(scope, test)?.to_boolean() {
                    self.eval_expr(scope, consequent)
                } else {
                    self.eval_expr(scope, alternate)
                }
            }
            ExprKind::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for e in exprs {
                    last = self.eval_expr(scope, e)?;
                }
                Ok(last)
            }
        }
    }

    /// Evaluate `expr`, naming an anonymous function after the binding it
    /// initializes (`const f = () => {}` has `f.name === "f"`).
    pub(crate) fn eval_named(
        &mut self,
        scope: &Rc<Scope>,
        expr: &Expr,
        name: &str,
    ) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Function(function) if function.name.is_none() => {
                self.tick()?;
                Ok(self.make_closure(scope, function, Some(name)))
            }
            _ => self.eval_expr(scope, expr),
        }
    }

    pub(crate) fn make_closure(
        &self,
        scope: &Rc<Scope>,
        function: &Rc<Function>,
        hint: Option<&str>,
    ) -> Value {
        let name = function
            .name
            .as_ref()
            .map(|n| n.name.as_str())
            .or(hint)
            .unwrap_or("")
            .to_string();
        let closure = Closure {
            function: Rc::clone(function),
            scope: Rc::clone(scope),
            name,
            source: Rc::clone(&self.source),
        };
        Value::Object(ObjectRef::new(Object::new(ObjectKind::Function(
            Callable::Closure(closure),
        ))))
    }

    fn lookup(&self, scope: &Rc<Scope>, name: &str) -> EvalResult<Value> {
        scope.lookup(name).map_err(|e| match e {
            BindingError::Uninitialized => {
                self.reference_error(format!("Cannot access '{name}' before initialization"))
            }
            _ => self.reference_error(format!("{name} is not defined")),
        })
    }

    /// Assign to a variable; an undeclared name becomes a new global.
    pub(crate) fn assign_identifier(
        &self,
        scope: &Rc<Scope>,
        name: &str,
        value: Value,
    ) -> EvalResult<()> {
        match scope.assign(name, value.clone()) {
            Ok(()) => Ok(()),
            Err(BindingError::NotFound) => {
                self.globals.declare(name, value, true);
                Ok(())
            }
            Err(BindingError::Immutable) => Err(self.type_error("Assignment to constant variable.")),
            Err(BindingError::Uninitialized) => Err(self.reference_error(format!(
                "Cannot access '{name}' before initialization"
            ))),
        }
    }

    fn eval_template(&mut self, scope: &Rc<Scope>, parts: &[TemplatePart]) -> EvalResult<Value> {
        let mut out = String::new();
        for part in parts {
            match part {
                TemplatePart::Literal(text) => out.push_str(text),
                TemplatePart::Expr(expr) => {
                    let value = self.eval_expr(scope, expr)?;
                    out.push_str(&self.to_string(&value)?);
                }
            }
        }
        Ok(Value::String(out))
    }

    /// Evaluate array literal items or call arguments, expanding spreads.
    pub(crate) fn eval_elements(
        &mut self,
        scope: &Rc<Scope>,
        elements: &[Element],
    ) -> EvalResult<Vec<Value>> {
        let mut out = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Element::Expr(expr) => out.push(self.eval_expr(scope, expr)?),
                Element::Spread(expr) => {
                    let value = self.eval_expr(scope, expr)?;
                    out.extend(self.iterable_items(&value, &expression_label(expr))?);
                }
            }
        }
        Ok(out)
    }

    fn eval_object_literal(
        &mut self,
        scope: &Rc<Scope>,
        props: &[PropertyDef],
    ) -> EvalResult<Value> {
        let object = ObjectRef::new(Object::new(ObjectKind::Ordinary));
        for prop in props {
            match prop {
                PropertyDef::Init { key, value } => {
                    let key = match key {
                        PropertyKey::Named(name) => name.clone(),
                        PropertyKey::Computed(expr) => {
                            let key = self.eval_expr(scope, expr)?;
                            self.to_property_key(&key)?
                        }
                    };
                    let value = self.eval_named(scope, value, &key)?;
                    object.set_own(&key, value);
                }
                PropertyDef::Spread(expr) => {
                    let source = self.eval_expr(scope, expr)?;
                    for (key, value) in enumerable_entries(&source) {
                        object.set_own(&key, value);
                    }
                }
            }
        }
        Ok(Value::Object(object))
    }

    fn member_key(&mut self, scope: &Rc<Scope>, property: &MemberProperty) -> EvalResult<String> {
        match property {
            MemberProperty::Named(ident) => Ok(ident.name.clone()),
            MemberProperty::Computed(expr) => {
                let key = self.eval_expr(scope, expr)?;
                self.to_property_key(&key)
            }
        }
    }

    fn eval_member(
        &mut self,
        scope: &Rc<Scope>,
        object: &Expr,
        property: &MemberProperty,
        optional: bool,
    ) -> EvalResult<Value> {
        let target = self.eval_expr(scope, object)?;
        if optional && target.is_nullish() {
            return Err(EvalError::ShortCircuit);
        }
        let key = self.member_key(scope, property)?;
        self.get_property(&target, &key)
    }

    fn eval_call(
        &mut self,
        scope: &Rc<Scope>,
        callee: &Expr,
        args: &[Element],
        optional: bool,
    ) -> EvalResult<Value> {
        let (this, func) = match &callee.kind {
            ExprKind::Member {
                object,
                property,
                optional: optional_member,
            } => {
                let target = self.eval_expr(scope, object)?;
                if *optional_member && target.is_nullish() {
                    return Err(EvalError::ShortCircuit);
                }
                let key = self.member_key(scope, property)?;
                let func = self.get_property(&target, &key)?;
                (target, func)
            }
            _ => (Value::Undefined, self.eval_expr(scope, callee)?),
        };
        if optional && func.is_nullish() {
            return Err(EvalError::ShortCircuit);
        }
        let args = self.eval_elements(scope, args)?;
        if !func.is_callable() {
            return Err(self.type_error(format!("{} is not a function", expression_label(callee))));
        }
        self.call(&func, this, &args)
    }

    fn eval_unary(&mut self, scope: &Rc<Scope>, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        match op {
            UnaryOp::TypeOf => {
                if let ExprKind::Identifier(name) = &operand.kind {
                    return Ok(match scope.lookup(name) {
                        Ok(value) => Value::string(value.type_of()),
                        Err(BindingError::NotFound) => Value::string("undefined"),
                        Err(_) => return self.lookup(scope, name),
                    });
                }
                let value = self.eval_expr(scope, operand)?;
                Ok(Value::string(value.type_of()))
            }
            UnaryOp::Delete => {
                if let ExprKind::Member {
                    object, property, ..
                } = &operand.kind
                {
                    let target = self.eval_expr(scope, object)?;
                    let key = self.member_key(scope, property)?;
                    if target.is_nullish() {
                        return Err(self.type_error(format!(
                            "Cannot convert undefined or null to object (deleting '{key}')"
                        )));
                    }
                    if let Value::Object(obj) = &target {
                        delete_property(obj, &key);
                    }
                    return Ok(Value::Bool(true));
                }
                self.eval_expr(scope, operand)?;
                Ok(Value::Bool(true))
            }
            _ => {
                let value = self.eval_expr(scope, operand)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.to_boolean()),
                    UnaryOp::Neg => Value::Number(-self.to_number(&value)?),
                    UnaryOp::Plus => Value::Number(self.to_number(&value)?),
                    UnaryOp::BitNot => Value::Number(!to_int32(self.to_number(&value)?) as f64),
                    UnaryOp::Void => Value::Undefined,
                    UnaryOp::TypeOf | UnaryOp::Delete => Value::Undefined,
                })
            }
        }
    }

    fn resolve_reference(&mut self, scope: &Rc<Scope>, target: &Expr) -> EvalResult<Reference> {
        match &target.kind {
            ExprKind::Identifier(name) => Ok(Reference::Binding(name.clone())),
            ExprKind::Member {
                object, property, ..
            } => {
                let object = self.eval_expr(scope, object)?;
                let key = self.member_key(scope, property)?;
                Ok(Reference::Property(object, key))
            }
            _ => Err(self.throw("SyntaxError", "Invalid left-hand side in assignment")),
        }
    }

    fn get_reference(&mut self, scope: &Rc<Scope>, reference: &Reference) -> EvalResult<Value> {
        match reference {
            Reference::Binding(name) => self.lookup(scope, name),
            Reference::Property(object, key) => self.get_property(object, key),
        }
    }

    fn put_reference(
        &mut self,
        scope: &Rc<Scope>,
        reference: &Reference,
        value: Value,
    ) -> EvalResult<()> {
        match reference {
            Reference::Binding(name) => self.assign_identifier(scope, name, value),
            Reference::Property(object, key) => self.set_property(object, key, value),
        }
    }

    fn eval_update(
        &mut self,
        scope: &Rc<Scope>,
        op: UpdateOp,
        prefix: bool,
        target: &Expr,
    ) -> EvalResult<Value> {
        let reference = self.resolve_reference(scope, target)?;
        let current = self.get_reference(scope, &reference)?;
        let old = self.to_number(&current)?;
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.put_reference(scope, &reference, Value::Number(new))?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    fn eval_assign(
        &mut self,
        scope: &Rc<Scope>,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
    ) -> EvalResult<Value> {
        let reference = self.resolve_reference(scope, target)?;
        let result = match op {
            AssignOp::Assign => match &reference {
                Reference::Binding(name) => self.eval_named(scope, value, name)?,
                Reference::Property(..) => self.eval_expr(scope, value)?,
            },
            AssignOp::Compound(bin) => {
                let current = self.get_reference(scope, &reference)?;
                let rhs = self.eval_expr(scope, value)?;
                self.binary_op(bin, &current, &rhs)?
            }
            AssignOp::Logical(logical) => {
                let current = self.get_reference(scope, &reference)?;
                if short_circuits(logical, &current) {
                    return Ok(current);
                }
                self.eval_expr(scope, value)?
            }
        };
        self.put_reference(scope, &reference, result.clone())?;
        Ok(result)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Operators
    // ══════════════════════════════════════════════════════════════════════════

    pub fn binary_op(&mut self, op: BinOp, left: &Value, right: &Value) -> EvalResult<Value> {
        let result = match op {
            BinOp::Add => {
                let l = self.to_primitive(left, true)?;
                let r = self.to_primitive(right, true)?;
                if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) {
                    let mut s = self.to_string(&l)?;
                    s.push_str(&self.to_string(&r)?);
                    Value::String(s)
                } else {
                    Value::Number(self.to_number(&l)? + self.to_number(&r)?)
                }
            }
            BinOp::Sub => Value::Number(self.to_number(left)? - self.to_number(right)?),
            BinOp::Mul => Value::Number(self.to_number(left)? * self.to_number(right)?),
            BinOp::Div => Value::Number(self.to_number(left)? / self.to_number(right)?),
            BinOp::Mod => Value::Number(self.to_number(left)? % self.to_number(right)?),
            BinOp::Exp => Value::Number(js_pow(self.to_number(left)?, self.to_number(right)?)),
            BinOp::Eq => Value::Bool(self.loose_equals(left, right)?),
            BinOp::NotEq => Value::Bool(!self.loose_equals(left, right)?),
            BinOp::StrictEq => Value::Bool(left.strict_equals(right)),
            BinOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
            BinOp::Less => Value::Bool(self.compare(left, right)? == Some(Ordering::Less)),
            BinOp::Greater => Value::Bool(self.compare(left, right)? == Some(Ordering::Greater)),
            BinOp::LessEq => Value::Bool(matches!(
                self.compare(left, right)?,
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinOp::GreaterEq => Value::Bool(matches!(
                self.compare(left, right)?,
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinOp::InstanceOf => Value::Bool(self.instance_of(left, right)?),
            BinOp::In => {
                let Value::Object(obj) = right else {
                    let key = self.to_string(left)?;
                    return Err(self.type_error(format!(
                        "Cannot use 'in' operator to search for '{key}' in {}",
                        describe_value(right)
                    )));
                };
                let key = self.to_property_key(left)?;
                Value::Bool(has_property(obj, &key))
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr => {
                let l = to_int32(self.to_number(left)?);
                let r = to_int32(self.to_number(right)?);
                let shift = (r as u32) & 31;
                let n = match op {
                    BinOp::BitAnd => l & r,
                    BinOp::BitOr => l | r,
                    BinOp::BitXor => l ^ r,
                    BinOp::Shl => l.wrapping_shl(shift),
                    _ => l >> shift,
                };
                Value::Number(n as f64)
            }
            BinOp::UShr => {
                let l = to_uint32(self.to_number(left)?);
                let shift = to_uint32(self.to_number(right)?) & 31;
                Value::Number((l >> shift) as f64)
            }
        };
        Ok(result)
    }

    /// `==`
    pub fn loose_equals(&mut self, left: &Value, right: &Value) -> EvalResult<bool> {
        Ok(match (left, right) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
                *n == string_to_number(s)
            }
            (Value::Bool(b), other) | (other, Value::Bool(b)) => {
                let n = Value::Number(if *b { 1.0 } else { 0.0 });
                return self.loose_equals(&n, other);
            }
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Object(_), other) | (other, Value::Object(_)) => {
                let object = if matches!(left, Value::Object(_)) { left } else { right };
                let primitive = self.to_primitive(object, true)?;
                return self.loose_equals(&primitive, other);
            }
            _ => left.strict_equals(right),
        })
    }

    /// Relational comparison; `None` when either side is `NaN`.
    fn compare(&mut self, left: &Value, right: &Value) -> EvalResult<Option<Ordering>> {
        let l = self.to_primitive(left, true)?;
        let r = self.to_primitive(right, true)?;
        if let (Value::String(a), Value::String(b)) = (&l, &r) {
            return Ok(Some(a.cmp(b)));
        }
        let a = self.to_number(&l)?;
        let b = self.to_number(&r)?;
        Ok(a.partial_cmp(&b))
    }

    /// `value instanceof ctor`
    pub fn instance_of(&mut self, value: &Value, ctor: &Value) -> EvalResult<bool> {
        let callable = ctor.as_object().and_then(|obj| match &obj.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        });
        let Some(callable) = callable else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        };
        let Value::Object(obj) = value else {
            return Ok(false);
        };
        match callable {
            Callable::Closure(_) => {
                let proto = self.get_property(ctor, "prototype")?;
                let Some(proto) = proto.as_object() else {
                    return Ok(false);
                };
                let mut current = obj.borrow().proto.clone();
                while let Some(link) = current {
                    if link.ptr_eq(proto) {
                        return Ok(true);
                    }
                    current = link.borrow().proto.clone();
                }
                Ok(false)
            }
            Callable::Native(native) => {
                let object = obj.borrow();
                Ok(match (native.name.as_str(), &object.kind) {
                    ("Object", _) => true,
                    ("Array", ObjectKind::Array(_)) => true,
                    ("Function", ObjectKind::Function(_)) => true,
                    ("Error", ObjectKind::Error { .. }) => true,
                    (wanted, ObjectKind::Error { name, .. }) => wanted == name,
                    _ => false,
                })
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════════

    /// Call `func` with the given receiver and arguments.
    pub fn call(&mut self, func: &Value, this: Value, args: &[Value]) -> EvalResult<Value> {
        let callable = func.as_object().and_then(|obj| match &obj.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        });
        match callable {
            Some(Callable::Native(native)) => (native.func)(self, &this, args),
            Some(Callable::Closure(closure)) => self.call_closure(func, &closure, this, args),
            None => Err(self.type_error(format!("{} is not a function", describe_value(func)))),
        }
    }

    /// `new ctor(...args)`
    pub fn construct(&mut self, ctor: &Value, args: &[Value]) -> EvalResult<Value> {
        let callable = ctor.as_object().and_then(|obj| match &obj.borrow().kind {
            ObjectKind::Function(callable) => Some(callable.clone()),
            _ => None,
        });
        match callable {
            Some(Callable::Native(native)) if native.constructor => {
                (native.func)(self, &Value::Undefined, args)
            }
            Some(Callable::Closure(closure)) if !closure.function.is_arrow => {
                let proto = self.get_property(ctor, "prototype")?;
                let mut object = Object::new(ObjectKind::Ordinary);
                object.proto = proto.as_object().cloned();
                let this = Value::Object(ObjectRef::new(object));
                let result = self.call_closure(ctor, &closure, this.clone(), args)?;
                Ok(if matches!(result, Value::Object(_)) { result } else { this })
            }
            Some(callable) => {
                let name = match callable.name() {
                    "" => "anonymous",
                    name => name,
                };
                Err(self.type_error(format!("{name} is not a constructor")))
            }
            None => Err(self.type_error(format!("{} is not a constructor", describe_value(ctor)))),
        }
    }

    fn call_closure(
        &mut self,
        callee: &Value,
        closure: &Closure,
        this: Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        if self.call_depth >= self.limits.max_call_depth {
            return Err(self.range_error(STACK_OVERFLOW_MESSAGE));
        }
        self.call_depth += 1;
        let saved = std::mem::replace(&mut self.source, Rc::clone(&closure.source));
        let result = stack::guarded(|| self.invoke_closure(callee, closure, this, args));
        self.source = saved;
        self.call_depth -= 1;
        result
    }

    fn invoke_closure(
        &mut self,
        callee: &Value,
        closure: &Closure,
        this: Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        let function = &closure.function;
        let scope = Scope::child(&closure.scope, ScopeKind::Function);
        if !function.is_arrow {
            if let Some(name) = &function.name {
                scope.declare(&name.name, callee.clone(), true);
            }
            scope.declare(THIS, this, false);
            scope.declare("arguments", Value::array(args.to_vec()), true);
        }

        for (i, param) in function.params.iter().enumerate() {
            let value = if param.rest {
                Value::array(args.get(i..).map(<[Value]>::to_vec).unwrap_or_default())
            } else {
                args.get(i).cloned().unwrap_or_default()
            };
            let value = match &param.default {
                Some(default) if value.is_undefined() => {
                    self.eval_named(&scope, default, &param.name.name)?
                }
                _ => value,
            };
            scope.declare(&param.name.name, value, true);
        }

        match &function.body {
            FunctionBody::Expr(expr) => self.eval_expr(&scope, expr),
            FunctionBody::Block(block) => {
                self.hoist_function_scope(&scope, &block.stmts);
                match self.exec_stmts(&scope, &block.stmts) {
                    Ok(()) => Ok(Value::Undefined),
                    Err(EvalError::Return(value)) => Ok(value),
                    Err(e) => Err(e),
                }
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Properties
    // ══════════════════════════════════════════════════════════════════════════

    /// `target[key]`
    pub fn get_property(&mut self, target: &Value, key: &str) -> EvalResult<Value> {
        match target {
            Value::Undefined | Value::Null => Err(self.type_error(format!(
                "Cannot read properties of {} (reading '{key}')",
                describe_value(target)
            ))),
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(utf16_length(s) as f64));
                }
                if let Some(i) = array_index(key) {
                    return Ok(unit_at(s, i).map(Value::String).unwrap_or_default());
                }
                Ok(builtin_method_value(target, key))
            }
            Value::Number(_) | Value::Bool(_) => Ok(builtin_method_value(target, key)),
            Value::Object(obj) => self.object_get(obj, target, key),
        }
    }

    fn object_get(&mut self, obj: &ObjectRef, target: &Value, key: &str) -> EvalResult<Value> {
        {
            let object = obj.borrow();
            match &object.kind {
                ObjectKind::Array(items) => {
                    if key == "length" {
                        return Ok(Value::Number(items.len() as f64));
                    }
                    if let Some(i) = array_index(key) {
                        return Ok(items.get(i).cloned().unwrap_or_default());
                    }
                }
                ObjectKind::Function(callable) if !object.props.contains(key) => match key {
                    "name" => return Ok(Value::string(callable.name())),
                    "length" => {
                        let arity = match callable {
                            Callable::Closure(c) => c.function.arity(),
                            Callable::Native(_) => 0,
                        };
                        return Ok(Value::Number(arity as f64));
                    }
                    _ => {}
                },
                ObjectKind::Error { name, message } => match key {
                    "name" => return Ok(Value::string(name.as_str())),
                    "message" => return Ok(Value::string(message.as_str())),
                    "stack" => return Ok(Value::String(error_summary(name, message))),
                    _ => {}
                },
                _ => {}
            }
        }

        if let Some(value) = find_in_chain(obj, key) {
            return Ok(value);
        }
        if key == "prototype" {
            if let Some(proto) = lazy_prototype(obj) {
                return Ok(proto);
            }
        }
        Ok(builtin_method_value(target, key))
    }

    /// `target[key] = value`
    pub fn set_property(&mut self, target: &Value, key: &str, value: Value) -> EvalResult<()> {
        let obj = match target {
            Value::Undefined | Value::Null => {
                return Err(self.type_error(format!(
                    "Cannot set properties of {} (setting '{key}')",
                    describe_value(target)
                )))
            }
            Value::Object(obj) => obj,
            _ => return Ok(()),
        };

        if obj.is_array() {
            if key == "length" {
                let n = self.to_number(&value)?;
                let len = self.array_length(n)?;
                if let ObjectKind::Array(items) = &mut obj.borrow_mut().kind {
                    items.resize(len, Value::Undefined);
                }
                return Ok(());
            }
            if let Some(i) = array_index(key) {
                if i >= MAX_ARRAY_LENGTH {
                    return Err(self.range_error("Invalid array length"));
                }
                if let ObjectKind::Array(items) = &mut obj.borrow_mut().kind {
                    if i >= items.len() {
                        items.resize(i + 1, Value::Undefined);
                    }
                    items[i] = value;
                }
                return Ok(());
            }
        }

        let is_error = matches!(obj.borrow().kind, ObjectKind::Error { .. });
        if is_error && (key == "message" || key == "name") {
            let text = self.to_string(&value)?;
            if let ObjectKind::Error { name, message } = &mut obj.borrow_mut().kind {
                if key == "message" {
                    *message = text;
                } else {
                    *name = text;
                }
            }
            return Ok(());
        }

        obj.set_own(key, value);
        Ok(())
    }

    /// Validate a requested array length.
    pub fn array_length(&self, n: f64) -> EvalResult<usize> {
        if n < 0.0 || n.fract() != 0.0 || n >= MAX_ARRAY_LENGTH as f64 {
            return Err(self.range_error("Invalid array length"));
        }
        Ok(n as usize)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Conversions
    // ══════════════════════════════════════════════════════════════════════════

    /// `ToPrimitive`: user-defined `valueOf`/`toString` first, then the
    /// built-in string form.
    pub fn to_primitive(&mut self, value: &Value, prefer_number: bool) -> EvalResult<Value> {
        let Value::Object(obj) = value else {
            return Ok(value.clone());
        };
        let order = if prefer_number {
            ["valueOf", "toString"]
        } else {
            ["toString", "valueOf"]
        };
        for name in order {
            if let Some(method) = find_in_chain(obj, name).filter(Value::is_callable) {
                let result = self.call(&method, value.clone(), &[])?;
                if !matches!(result, Value::Object(_)) {
                    return Ok(result);
                }
            }
        }
        Ok(Value::String(self.default_object_string(obj)?))
    }

    /// `String(value)`
    pub fn to_string(&mut self, value: &Value) -> EvalResult<String> {
        if let Some(s) = value.primitive_to_string() {
            return Ok(s);
        }
        let primitive = self.to_primitive(value, false)?;
        Ok(primitive.primitive_to_string().unwrap_or_default())
    }

    /// `Number(value)`
    pub fn to_number(&mut self, value: &Value) -> EvalResult<f64> {
        Ok(match value {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) => {
                let primitive = self.to_primitive(value, true)?;
                return self.to_number(&primitive);
            }
        })
    }

    pub fn to_property_key(&mut self, value: &Value) -> EvalResult<String> {
        match value {
            Value::Number(n) => Ok(number_to_string(*n)),
            _ => self.to_string(value),
        }
    }

    /// The string an object converts to without user overrides.
    pub fn default_object_string(&mut self, obj: &ObjectRef) -> EvalResult<String> {
        let items = {
            let object = obj.borrow();
            match &object.kind {
                ObjectKind::Array(items) => items.clone(),
                ObjectKind::Function(Callable::Closure(closure)) => return Ok(closure.source_text()),
                ObjectKind::Function(Callable::Native(native)) => {
                    return Ok(format!("function {}() {{ [native code] }}", native.name))
                }
                ObjectKind::Error { name, message } => return Ok(error_summary(name, message)),
                ObjectKind::Ordinary => return Ok("[object Object]".to_string()),
            }
        };
        self.join_values(obj, &items, ",")
    }

    /// `Array.prototype.join`; a cyclic reference joins as the empty string.
    pub fn join_values(
        &mut self,
        owner: &ObjectRef,
        items: &[Value],
        separator: &str,
    ) -> EvalResult<String> {
        if self.join_stack.contains(&owner.id()) {
            return Ok(String::new());
        }
        if self.join_stack.len() >= MAX_NESTING_DEPTH {
            return Err(self.range_error(STACK_OVERFLOW_MESSAGE));
        }
        self.join_stack.push(owner.id());
        let mut out = String::new();
        let mut result = Ok(());
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            if item.is_nullish() {
                continue;
            }
            match stack::guarded(|| self.to_string(item)) {
                Ok(s) => out.push_str(&s),
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        self.join_stack.pop();
        result.map(|()| out)
    }

    /// Items produced by spreading or `for…of`-iterating `value`.
    pub fn iterable_items(&self, value: &Value, label: &str) -> EvalResult<Vec<Value>> {
        match value {
            Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
            Value::Object(obj) => match &obj.borrow().kind {
                ObjectKind::Array(items) => Ok(items.clone()),
                _ => Err(self.type_error(format!("{label} is not iterable"))),
            },
            _ => Err(self.type_error(format!("{label} is not iterable"))),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.to_boolean(),
        LogicalOp::Or => left.to_boolean(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

pub(crate) fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

/// `"TypeError: message"`, or just the name when the message is empty.
pub(crate) fn error_summary(name: &str, message: &str) -> String {
    if message.is_empty() {
        name.to_string()
    } else {
        format!("{name}: {message}")
    }
}

/// Source-like label for error messages: `obj.method`, `fn`, `(intermediate value)`.
pub(crate) fn expression_label(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::This => "this".to_string(),
        ExprKind::Member {
            object, property, ..
        } => match property {
            MemberProperty::Named(ident) => format!("{}.{}", expression_label(object), ident.name),
            MemberProperty::Computed(_) => format!("{}[...]", expression_label(object)),
        },
        ExprKind::OptionalChain(inner) => expression_label(inner),
        ExprKind::Call { callee, .. } => format!("{}(...)", expression_label(callee)),
        _ => "(intermediate value)".to_string(),
    }
}

/// Short description of a value for error messages.
pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        Value::Object(obj) if obj.is_callable() => "function".to_string(),
        Value::Object(obj) if obj.is_array() => "array".to_string(),
        Value::Object(_) => "object".to_string(),
        other => other.primitive_to_string().unwrap_or_default(),
    }
}

/// Own property, then each prototype in turn.
pub(crate) fn find_in_chain(obj: &ObjectRef, key: &str) -> Option<Value> {
    let mut current = Some(obj.clone());
    while let Some(link) = current {
        if let Some(value) = link.get_own(key) {
            return Some(value);
        }
        current = link.borrow().proto.clone();
    }
    None
}

/// `F.prototype` for a user function, created on first access.
fn lazy_prototype(obj: &ObjectRef) -> Option<Value> {
    let constructible = matches!(
        &obj.borrow().kind,
        ObjectKind::Function(Callable::Closure(c)) if !c.function.is_arrow
    );
    if !constructible {
        return None;
    }
    let proto = Value::Object(ObjectRef::new(Object::new(ObjectKind::Ordinary)));
    obj.set_own("prototype", proto.clone());
    Some(proto)
}

fn builtin_method_value(target: &Value, key: &str) -> Value {
    match builtins::method(target, key) {
        Some(method) => Value::native(key, method),
        None => Value::Undefined,
    }
}

/// `key in obj`
pub(crate) fn has_property(obj: &ObjectRef, key: &str) -> bool {
    {
        let object = obj.borrow();
        let intrinsic = match &object.kind {
            ObjectKind::Array(items) => {
                key == "length" || array_index(key).is_some_and(|i| i < items.len())
            }
            ObjectKind::Function(_) => matches!(key, "name" | "length" | "prototype"),
            ObjectKind::Error { .. } => matches!(key, "name" | "message" | "stack"),
            ObjectKind::Ordinary => false,
        };
        if intrinsic {
            return true;
        }
    }
    find_in_chain(obj, key).is_some()
        || builtins::method(&Value::Object(obj.clone()), key).is_some()
}

fn delete_property(obj: &ObjectRef, key: &str) {
    let mut object = obj.borrow_mut();
    if let ObjectKind::Array(items) = &mut object.kind {
        if let Some(slot) = array_index(key).and_then(|i| items.get_mut(i)) {
            *slot = Value::Undefined;
            return;
        }
    }
    object.props.remove(key);
}

/// Own enumerable `(key, value)` pairs in property order: array indices,
/// string indices, then named properties.
pub fn enumerable_entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::String(s) => s
            .encode_utf16()
            .enumerate()
            .map(|(i, unit)| (i.to_string(), Value::String(String::from_utf16_lossy(&[unit]))))
            .collect(),
        Value::Object(obj) => {
            let object = obj.borrow();
            let mut out = Vec::new();
            if let ObjectKind::Array(items) = &object.kind {
                out.extend(
                    items
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (i.to_string(), v.clone())),
                );
            }
            let is_function = matches!(object.kind, ObjectKind::Function(_));
            out.extend(
                object
                    .props
                    .iter()
                    .filter(|(k, _)| !(is_function && *k == "prototype"))
                    .map(|(k, v)| (k.to_string(), v.clone())),
            );
            out
        }
        _ => Vec::new(),
    }
}
