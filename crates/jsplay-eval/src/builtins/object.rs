//! `Object` and its statics, methods every value shares (`toString`,
//! `hasOwnProperty`, `valueOf`) and `Function.prototype` methods.

use std::rc::Rc;

use crate::builtins::string::utf16_length;
use crate::builtins::{add_statics, arg, Method};
use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::{describe_value, enumerable_entries, Interpreter};
use crate::value::{array_index, Object, ObjectKind, ObjectRef, Value};

pub(crate) fn install(globals: &Rc<Scope>) {
    let object = Value::native_constructor("Object", object);
    add_statics(
        &object,
        &[
            ("keys", object_keys),
            ("values", object_values),
            ("entries", object_entries),
            ("assign", object_assign),
            ("fromEntries", object_from_entries),
            ("create", object_create),
            ("getPrototypeOf", object_get_prototype_of),
        ],
    );
    globals.declare("Object", object, true);
}

fn object(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match args.first() {
        Some(value @ Value::Object(_)) => Ok(value.clone()),
        _ => Ok(Value::object([])),
    }
}

/// Reject `null`/`undefined` where a statics method needs an object.
fn require_object_coercible(interp: &Interpreter, value: &Value) -> EvalResult<()> {
    if value.is_nullish() {
        return Err(interp.type_error("Cannot convert undefined or null to object"));
    }
    Ok(())
}

fn object_keys(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interp, &target)?;
    let keys = enumerable_entries(&target)
        .into_iter()
        .map(|(k, _)| Value::String(k))
        .collect();
    Ok(Value::array(keys))
}

fn object_values(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interp, &target)?;
    let values = enumerable_entries(&target).into_iter().map(|(_, v)| v).collect();
    Ok(Value::array(values))
}

fn object_entries(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interp, &target)?;
    let entries = enumerable_entries(&target)
        .into_iter()
        .map(|(k, v)| Value::array(vec![Value::String(k), v]))
        .collect();
    Ok(Value::array(entries))
}

fn object_assign(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interp, &target)?;
    for source in args.iter().skip(1) {
        for (key, value) in enumerable_entries(source) {
            interp.set_property(&target, &key, value)?;
        }
    }
    Ok(target)
}

fn object_from_entries(
    interp: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let entries = interp.iterable_items(&arg(args, 0), "object")?;
    let result = ObjectRef::new(Object::new(ObjectKind::Ordinary));
    for entry in entries {
        let key = interp.get_property(&entry, "0")?;
        let key = interp.to_property_key(&key)?;
        let value = interp.get_property(&entry, "1")?;
        result.set_own(&key, value);
    }
    Ok(Value::Object(result))
}

fn object_create(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut object = Object::new(ObjectKind::Ordinary);
    object.proto = match arg(args, 0) {
        Value::Object(proto) => Some(proto),
        Value::Null => None,
        other => {
            return Err(interp.type_error(format!(
                "Object prototype may only be an Object or null: {}",
                describe_value(&other)
            )))
        }
    };
    Ok(Value::Object(ObjectRef::new(object)))
}

fn object_get_prototype_of(
    interp: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let target = arg(args, 0);
    require_object_coercible(interp, &target)?;
    let proto = match &target {
        Value::Object(obj) => obj.borrow().proto.clone(),
        _ => None,
    };
    Ok(proto.map_or(Value::Null, Value::Object))
}

// ── Shared methods ────────────────────────────────────────────────────────────

/// Methods available on every value that has no more specific version.
pub(crate) fn common_method(key: &str) -> Option<Method> {
    Some(match key {
        "toString" => to_string,
        "hasOwnProperty" => has_own_property,
        "valueOf" => value_of,
        _ => return None,
    })
}

fn to_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(match this {
        Value::Object(obj) => interp.default_object_string(obj)?,
        other => interp.to_string(other)?,
    }))
}

fn value_of(_interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(this.clone())
}

fn has_own_property(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let key = interp.to_property_key(&arg(args, 0))?;
    let own = match this {
        Value::String(s) => {
            key == "length" || array_index(&key).is_some_and(|i| i < utf16_length(s))
        }
        Value::Object(obj) => {
            let object = obj.borrow();
            let intrinsic = match &object.kind {
                ObjectKind::Array(items) => {
                    key == "length" || array_index(&key).is_some_and(|i| i < items.len())
                }
                ObjectKind::Error { .. } => key == "message",
                _ => false,
            };
            intrinsic || object.props.contains(&key)
        }
        _ => false,
    };
    Ok(Value::Bool(own))
}

// ── Function.prototype ────────────────────────────────────────────────────────

pub(crate) fn function_method(key: &str) -> Option<Method> {
    Some(match key {
        "call" => function_call,
        "apply" => function_apply,
        "bind" => function_bind,
        _ => return None,
    })
}

fn function_call(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let rest = args.get(1..).unwrap_or_default();
    interp.call(this, arg(args, 0), rest)
}

fn function_apply(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let call_args = match arg(args, 1) {
        Value::Undefined | Value::Null => Vec::new(),
        list => interp.iterable_items(&list, "apply arguments")?,
    };
    interp.call(this, arg(args, 0), &call_args)
}

fn function_bind(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    if !this.is_callable() {
        return Err(interp.type_error("Bind must be called on a function"));
    }
    let target = this.clone();
    let bound_this = arg(args, 0);
    let bound_args: Vec<Value> = args.get(1..).unwrap_or_default().to_vec();
    let name = match interp.get_property(this, "name")? {
        Value::String(name) => format!("bound {name}"),
        _ => "bound ".to_string(),
    };
    Ok(Value::native(&name, move |interp, _this, args| {
        let mut all = bound_args.clone();
        all.extend_from_slice(args);
        interp.call(&target, bound_this.clone(), &all)
    }))
}
