//! `Array`, its statics and `Array.prototype` methods.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::builtins::{add_statics, arg, number_arg, relative_index, Method};
use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::{describe_value, Interpreter};
use crate::stack::{self, MAX_NESTING_DEPTH, STACK_OVERFLOW_MESSAGE};
use crate::value::{ObjectKind, ObjectRef, Value};

pub(crate) fn install(globals: &Rc<Scope>) {
    let array = Value::native_constructor("Array", array);
    add_statics(
        &array,
        &[("isArray", array_is_array), ("of", array_of), ("from", array_from)],
    );
    globals.declare("Array", array, true);
}

fn array(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match args {
        [Value::Number(n)] => {
            let len = interp.array_length(*n)?;
            Ok(Value::array(vec![Value::Undefined; len]))
        }
        _ => Ok(Value::array(args.to_vec())),
    }
}

fn array_is_array(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(arg(args, 0).as_object().is_some_and(ObjectRef::is_array)))
}

fn array_of(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::array(args.to_vec()))
}

/// `Array.from(iterable | {length}, mapFn?)`
fn array_from(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let source = arg(args, 0);
    let items = match &source {
        Value::Object(obj) if !obj.is_array() => {
            let len = interp.get_property(&source, "length")?;
            let len = interp.to_number(&len)?;
            let len = if len.is_nan() { 0 } else { interp.array_length(len.trunc())? };
            let mut items = Vec::with_capacity(len);
            for i in 0..len {
                items.push(interp.get_property(&source, &i.to_string())?);
            }
            items
        }
        Value::Undefined | Value::Null => {
            return Err(interp.type_error(format!("{} is not iterable", describe_value(&source))))
        }
        _ => interp.iterable_items(&source, &describe_value(&source))?,
    };
    let map_fn = arg(args, 1);
    if map_fn.is_undefined() {
        return Ok(Value::array(items));
    }
    let map_fn = callback(interp, &map_fn)?;
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        out.push(interp.call(&map_fn, Value::Undefined, &[item, Value::Number(i as f64)])?);
    }
    Ok(Value::array(out))
}

/// `Array.prototype` methods.
pub(crate) fn method(key: &str) -> Option<Method> {
    Some(match key {
        "push" => push,
        "pop" => pop,
        "shift" => shift,
        "unshift" => unshift,
        "slice" => slice,
        "splice" => splice,
        "concat" => concat,
        "join" => join,
        "toString" => to_string,
        "reverse" => reverse,
        "indexOf" => index_of,
        "lastIndexOf" => last_index_of,
        "includes" => includes,
        "find" => find,
        "findIndex" => find_index,
        "findLast" => find_last,
        "findLastIndex" => find_last_index,
        "filter" => filter,
        "map" => map,
        "forEach" => for_each,
        "reduce" => reduce,
        "reduceRight" => reduce_right,
        "some" => some,
        "every" => every,
        "sort" => sort,
        "fill" => fill,
        "flat" => flat,
        "flatMap" => flat_map,
        "at" => at,
        _ => return None,
    })
}

// ── Receiver helpers ──────────────────────────────────────────────────────────

fn this_array(interp: &Interpreter, this: &Value) -> EvalResult<ObjectRef> {
    match this {
        Value::Object(obj) if obj.is_array() => Ok(obj.clone()),
        _ => Err(interp.type_error("Array.prototype method called on a non-array")),
    }
}

/// Snapshot of the receiver's elements.
fn items(interp: &Interpreter, this: &Value) -> EvalResult<(ObjectRef, Vec<Value>)> {
    let obj = this_array(interp, this)?;
    let items = match &obj.borrow().kind {
        ObjectKind::Array(items) => items.clone(),
        _ => Vec::new(),
    };
    Ok((obj, items))
}

/// Mutate the receiver's element vector in place.
fn with_items<R>(
    interp: &Interpreter,
    this: &Value,
    f: impl FnOnce(&mut Vec<Value>) -> R,
) -> EvalResult<R> {
    let obj = this_array(interp, this)?;
    let mut object = obj.borrow_mut();
    match &mut object.kind {
        ObjectKind::Array(items) => Ok(f(items)),
        _ => Err(interp.type_error("Array.prototype method called on a non-array")),
    }
}

fn callback(interp: &Interpreter, value: &Value) -> EvalResult<Value> {
    if value.is_callable() {
        Ok(value.clone())
    } else {
        Err(interp.type_error(format!("{} is not a function", describe_value(value))))
    }
}

/// Call `f(element, index, array)` for each element until `stop` says so.
/// Returns the index it stopped at.
fn scan(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    reverse: bool,
    mut stop: impl FnMut(&Value, &Value) -> bool,
) -> EvalResult<Option<(usize, Value)>> {
    let (_, items) = items(interp, this)?;
    let f = callback(interp, &arg(args, 0))?;
    let this_arg = arg(args, 1);
    let order: Box<dyn Iterator<Item = usize>> = if reverse {
        Box::new((0..items.len()).rev())
    } else {
        Box::new(0..items.len())
    };
    for i in order {
        let item = items[i].clone();
        let call_args = [item.clone(), Value::Number(i as f64), this.clone()];
        let result = interp.call(&f, this_arg.clone(), &call_args)?;
        if stop(&item, &result) {
            return Ok(Some((i, item)));
        }
    }
    Ok(None)
}

// ── Mutators ──────────────────────────────────────────────────────────────────

fn push(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let len = with_items(interp, this, |items| {
        items.extend_from_slice(args);
        items.len()
    })?;
    Ok(Value::Number(len as f64))
}

fn pop(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(with_items(interp, this, Vec::pop)?.unwrap_or_default())
}

fn shift(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    let first = with_items(interp, this, |items| {
        (!items.is_empty()).then(|| items.remove(0))
    })?;
    Ok(first.unwrap_or_default())
}

fn unshift(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let len = with_items(interp, this, |items| {
        items.splice(0..0, args.iter().cloned());
        items.len()
    })?;
    Ok(Value::Number(len as f64))
}

fn splice(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, snapshot) = items(interp, this)?;
    let len = snapshot.len();
    let start = relative_index(number_arg(interp, args, 0, 0.0)?, len);
    let delete_count = match args.len() {
        0 => 0,
        1 => len - start,
        _ => {
            let n = number_arg(interp, args, 1, 0.0)?;
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            (n.max(0.0) as usize).min(len - start)
        }
    };
    let inserted: Vec<Value> = args.iter().skip(2).cloned().collect();
    let removed = with_items(interp, this, |items| {
        items.splice(start..start + delete_count, inserted).collect::<Vec<_>>()
    })?;
    Ok(Value::array(removed))
}

fn reverse(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    with_items(interp, this, |items| items.reverse())?;
    Ok(this.clone())
}

fn fill(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, snapshot) = items(interp, this)?;
    let len = snapshot.len();
    let value = arg(args, 0);
    let start = relative_index(number_arg(interp, args, 1, 0.0)?, len);
    let end = relative_index(number_arg(interp, args, 2, len as f64)?, len);
    with_items(interp, this, |items| {
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    })?;
    Ok(this.clone())
}

fn sort(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let comparator = match arg(args, 0) {
        Value::Undefined => None,
        f => Some(callback(interp, &f)?),
    };
    let (_, snapshot) = items(interp, this)?;
    let (defined, undefined): (Vec<Value>, Vec<Value>) =
        snapshot.into_iter().partition(|v| !v.is_undefined());
    let mut sorted = merge_sort(interp, defined, comparator.as_ref())?;
    sorted.extend(undefined);
    with_items(interp, this, |items| *items = sorted)?;
    Ok(this.clone())
}

/// Stable merge sort with a fallible comparator.
///
/// `slice::sort_by` may panic on an inconsistent ordering, which a script
/// comparator can easily produce.
fn merge_sort(
    interp: &mut Interpreter,
    mut items: Vec<Value>,
    comparator: Option<&Value>,
) -> EvalResult<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(interp, items, comparator)?;
    let right = merge_sort(interp, right, comparator)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        let take_right = compare(interp, comparator, r, l)? == Ordering::Less;
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

fn compare(
    interp: &mut Interpreter,
    comparator: Option<&Value>,
    a: &Value,
    b: &Value,
) -> EvalResult<Ordering> {
    match comparator {
        Some(f) => {
            let result = interp.call(f, Value::Undefined, &[a.clone(), b.clone()])?;
            let n = interp.to_number(&result)?;
            Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
        }
        None => {
            let a = interp.to_string(a)?;
            let b = interp.to_string(b)?;
            Ok(a.cmp(&b))
        }
    }
}

// ── Accessors ─────────────────────────────────────────────────────────────────

fn slice(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, items) = items(interp, this)?;
    let len = items.len();
    let start = relative_index(number_arg(interp, args, 0, 0.0)?, len);
    let end = relative_index(number_arg(interp, args, 1, len as f64)?, len);
    Ok(Value::array(items.get(start..end.max(start)).unwrap_or_default().to_vec()))
}

fn concat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, mut out) = items(interp, this)?;
    for value in args {
        match value {
            Value::Object(obj) if obj.is_array() => {
                out.extend(interp.iterable_items(value, "array")?);
            }
            other => out.push(other.clone()),
        }
    }
    Ok(Value::array(out))
}

fn join(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (obj, items) = items(interp, this)?;
    let separator = match arg(args, 0) {
        Value::Undefined => ",".to_string(),
        sep => interp.to_string(&sep)?,
    };
    Ok(Value::String(interp.join_values(&obj, &items, &separator)?))
}

fn to_string(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    join(interp, this, &[])
}

fn index_of(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, items) = items(interp, this)?;
    let target = arg(args, 0);
    let from = relative_index(number_arg(interp, args, 1, 0.0)?, items.len());
    let found = items
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, v)| v.strict_equals(&target))
        .map(|(i, _)| i);
    Ok(index_value(found))
}

fn last_index_of(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, items) = items(interp, this)?;
    let target = arg(args, 0);
    let found = items.iter().rposition(|v| v.strict_equals(&target));
    Ok(index_value(found))
}

fn includes(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, items) = items(interp, this)?;
    let target = arg(args, 0);
    let from = relative_index(number_arg(interp, args, 1, 0.0)?, items.len());
    Ok(Value::Bool(items.iter().skip(from).any(|v| v.same_value_zero(&target))))
}

fn at(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, items) = items(interp, this)?;
    let n = number_arg(interp, args, 0, 0.0)?;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let idx = if n < 0.0 { items.len() as f64 + n } else { n };
    if idx < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(items.get(idx as usize).cloned().unwrap_or_default())
}

fn index_value(index: Option<usize>) -> Value {
    Value::Number(index.map_or(-1.0, |i| i as f64))
}

// ── Iteration ─────────────────────────────────────────────────────────────────

fn find(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, false, |_, r| r.to_boolean())?;
    Ok(found.map(|(_, v)| v).unwrap_or_default())
}

fn find_index(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, false, |_, r| r.to_boolean())?;
    Ok(index_value(found.map(|(i, _)| i)))
}

fn find_last(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, true, |_, r| r.to_boolean())?;
    Ok(found.map(|(_, v)| v).unwrap_or_default())
}

fn find_last_index(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, true, |_, r| r.to_boolean())?;
    Ok(index_value(found.map(|(i, _)| i)))
}

fn some(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let found = scan(interp, this, args, false, |_, r| r.to_boolean())?;
    Ok(Value::Bool(found.is_some()))
}

fn every(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let failed = scan(interp, this, args, false, |_, r| !r.to_boolean())?;
    Ok(Value::Bool(failed.is_none()))
}

fn for_each(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    scan(interp, this, args, false, |_, _| false)?;
    Ok(Value::Undefined)
}

fn filter(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut kept = Vec::new();
    scan(interp, this, args, false, |item, r| {
        if r.to_boolean() {
            kept.push(item.clone());
        }
        false
    })?;
    Ok(Value::array(kept))
}

fn map(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut mapped = Vec::new();
    scan(interp, this, args, false, |_, r| {
        mapped.push(r.clone());
        false
    })?;
    Ok(Value::array(mapped))
}

fn reduce(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    fold(interp, this, args, false)
}

fn reduce_right(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    fold(interp, this, args, true)
}

fn fold(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    reverse: bool,
) -> EvalResult<Value> {
    let (_, items) = items(interp, this)?;
    let f = callback(interp, &arg(args, 0))?;
    let mut order: Vec<usize> = (0..items.len()).collect();
    if reverse {
        order.reverse();
    }
    let mut order = order.into_iter();
    let mut acc = match args.get(1) {
        Some(initial) => initial.clone(),
        None => match order.next() {
            Some(i) => items[i].clone(),
            None => return Err(interp.type_error("Reduce of empty array with no initial value")),
        },
    };
    for i in order {
        acc = interp.call(
            &f,
            Value::Undefined,
            &[acc, items[i].clone(), Value::Number(i as f64), this.clone()],
        )?;
    }
    Ok(acc)
}

fn flat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (_, items) = items(interp, this)?;
    let depth = number_arg(interp, args, 0, 1.0)?;
    let depth = if depth.is_nan() { 0.0 } else { depth.max(0.0) };
    Ok(Value::array(flatten(interp, items, depth, 0)?))
}

/// Splice nested arrays into `items` down to `depth` levels; `level` is how
/// deep this call already is.
fn flatten(
    interp: &mut Interpreter,
    items: Vec<Value>,
    depth: f64,
    level: usize,
) -> EvalResult<Vec<Value>> {
    if level >= MAX_NESTING_DEPTH {
        return Err(interp.range_error(STACK_OVERFLOW_MESSAGE));
    }
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        interp.tick()?;
        let nested = match &item {
            Value::Object(obj) if depth >= 1.0 => match &obj.borrow().kind {
                ObjectKind::Array(inner) => Some(inner.clone()),
                _ => None,
            },
            _ => None,
        };
        match nested {
            Some(inner) => {
                let flat = stack::guarded(|| flatten(interp, inner, depth - 1.0, level + 1))?;
                out.extend(flat);
            }
            None => out.push(item),
        }
    }
    Ok(out)
}

fn flat_map(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mapped = map(interp, this, args)?;
    let (_, items) = items(interp, &mapped)?;
    Ok(Value::array(flatten(interp, items, 1.0, 0)?))
}
