//! `String`, `String.fromCharCode` and `String.prototype` methods.
//!
//! Positions and lengths count UTF-16 code units, as in JavaScript. Text is
//! stored as UTF-8, so a slice that splits a surrogate pair yields U+FFFD.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::builtins::{add_statics, arg, number_arg, relative_index, Method};
use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::number::{number_to_string, to_uint32};
use crate::value::Value;

/// Longest string `repeat` and the padding methods will build.
const MAX_STRING_LENGTH: usize = 1 << 26;

pub(crate) fn install(globals: &Rc<Scope>) {
    let string = Value::native_constructor("String", string);
    add_statics(&string, &[("fromCharCode", string_from_char_code)]);
    globals.declare("String", string, true);
}

fn string(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match args.first() {
        None => Ok(Value::string("")),
        Some(value) => Ok(Value::String(interp.to_string(value)?)),
    }
}

fn string_from_char_code(
    interp: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let mut units = Vec::with_capacity(args.len());
    for value in args {
        units.push((to_uint32(interp.to_number(value)?) & 0xFFFF) as u16);
    }
    Ok(collect(&units))
}

/// `String.prototype` methods.
pub(crate) fn method(key: &str) -> Option<Method> {
    Some(match key {
        "charAt" => char_at,
        "charCodeAt" => char_code_at,
        "codePointAt" => code_point_at,
        "at" => at,
        "indexOf" => index_of,
        "lastIndexOf" => last_index_of,
        "includes" => includes,
        "startsWith" => starts_with,
        "endsWith" => ends_with,
        "slice" => slice,
        "substring" => substring,
        "substr" => substr,
        "toUpperCase" => to_upper_case,
        "toLowerCase" => to_lower_case,
        "trim" => trim,
        "trimStart" => trim_start,
        "trimEnd" => trim_end,
        "split" => split,
        "replace" => replace,
        "replaceAll" => replace_all,
        "repeat" => repeat,
        "padStart" => pad_start,
        "padEnd" => pad_end,
        "concat" => concat,
        "localeCompare" => locale_compare,
        "toString" | "valueOf" => value_of,
        _ => return None,
    })
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Length of `s` in UTF-16 code units.
pub(crate) fn utf16_length(s: &str) -> usize {
    s.chars().map(char::len_utf16).sum()
}

/// The code unit at `index` as a one-unit string, like `s[index]`.
pub(crate) fn unit_at(s: &str, index: usize) -> Option<String> {
    s.encode_utf16()
        .nth(index)
        .map(|unit| String::from_utf16_lossy(&[unit]))
}

fn this_units(interp: &mut Interpreter, this: &Value) -> EvalResult<Vec<u16>> {
    Ok(this_string(interp, this)?.encode_utf16().collect())
}

fn this_string(interp: &mut Interpreter, this: &Value) -> EvalResult<String> {
    match this {
        Value::String(s) => Ok(s.clone()),
        Value::Undefined | Value::Null => {
            Err(interp.type_error("String.prototype method called on null or undefined"))
        }
        other => interp.to_string(other),
    }
}

fn string_arg(interp: &mut Interpreter, args: &[Value], i: usize) -> EvalResult<Vec<u16>> {
    Ok(interp.to_string(&arg(args, i))?.encode_utf16().collect())
}

/// Integer position argument clamped into `0..=len`.
fn position_arg(
    interp: &mut Interpreter,
    args: &[Value],
    i: usize,
    default: f64,
    len: usize,
) -> EvalResult<usize> {
    let n = number_arg(interp, args, i, default)?;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    Ok(n.clamp(0.0, len as f64) as usize)
}

fn find(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn rfind(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = from.min(haystack.len() - needle.len());
    (0..=last).rev().find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn collect(units: &[u16]) -> Value {
    Value::String(String::from_utf16_lossy(units))
}

fn index_value(index: Option<usize>) -> Value {
    Value::Number(index.map_or(-1.0, |i| i as f64))
}

fn check_length(interp: &Interpreter, len: usize) -> EvalResult<()> {
    if len > MAX_STRING_LENGTH {
        return Err(interp.range_error("Invalid string length"));
    }
    Ok(())
}

// ── Character access ──────────────────────────────────────────────────────────

/// The units of `this` and the position in integer argument 0, `None` when
/// out of range.
fn unit_arg(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<(Vec<u16>, Option<usize>)> {
    let units = this_units(interp, this)?;
    let n = number_arg(interp, args, 0, 0.0)?;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let index = (n >= 0.0 && n < units.len() as f64).then_some(n as usize);
    Ok((units, index))
}

fn char_at(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (units, index) = unit_arg(interp, this, args)?;
    Ok(index.map_or_else(|| Value::string(""), |i| collect(&units[i..=i])))
}

fn char_code_at(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (units, index) = unit_arg(interp, this, args)?;
    Ok(Value::Number(index.map_or(f64::NAN, |i| f64::from(units[i]))))
}

/// The code point starting at the position: a surrogate pair combines,
/// a lone surrogate is returned as is.
fn code_point_at(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let (units, index) = unit_arg(interp, this, args)?;
    let Some(i) = index else {
        return Ok(Value::Undefined);
    };
    let code = match char::decode_utf16(units[i..].iter().copied()).next() {
        Some(Ok(c)) => u32::from(c),
        _ => u32::from(units[i]),
    };
    Ok(Value::Number(f64::from(code)))
}

fn at(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let n = number_arg(interp, args, 0, 0.0)?;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let idx = if n < 0.0 { units.len() as f64 + n } else { n };
    if idx < 0.0 {
        return Ok(Value::Undefined);
    }
    Ok(units
        .get(idx as usize)
        .map(|&unit| collect(&[unit]))
        .unwrap_or_default())
}

// ── Search ────────────────────────────────────────────────────────────────────

fn index_of(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let needle = string_arg(interp, args, 0)?;
    let from = position_arg(interp, args, 1, 0.0, units.len())?;
    Ok(index_value(find(&units, &needle, from)))
}

fn last_index_of(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let needle = string_arg(interp, args, 0)?;
    let from = position_arg(interp, args, 1, f64::INFINITY, units.len())?;
    Ok(index_value(rfind(&units, &needle, from)))
}

fn includes(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let needle = string_arg(interp, args, 0)?;
    let from = position_arg(interp, args, 1, 0.0, units.len())?;
    Ok(Value::Bool(find(&units, &needle, from).is_some()))
}

fn starts_with(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let needle = string_arg(interp, args, 0)?;
    let from = position_arg(interp, args, 1, 0.0, units.len())?;
    Ok(Value::Bool(units[from..].starts_with(&needle)))
}

fn ends_with(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let needle = string_arg(interp, args, 0)?;
    let end = position_arg(interp, args, 1, units.len() as f64, units.len())?;
    Ok(Value::Bool(units[..end].ends_with(&needle)))
}

// ── Extraction ────────────────────────────────────────────────────────────────

fn slice(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let len = units.len();
    let start = relative_index(number_arg(interp, args, 0, 0.0)?, len);
    let end = relative_index(number_arg(interp, args, 1, len as f64)?, len);
    Ok(collect(&units[start..end.max(start)]))
}

fn substring(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let len = units.len();
    let a = position_arg(interp, args, 0, 0.0, len)?;
    let b = position_arg(interp, args, 1, len as f64, len)?;
    Ok(collect(&units[a.min(b)..a.max(b)]))
}

fn substr(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let units = this_units(interp, this)?;
    let len = units.len();
    let start = relative_index(number_arg(interp, args, 0, 0.0)?, len);
    let count = position_arg(interp, args, 1, len as f64, len - start)?;
    Ok(collect(&units[start..start + count]))
}

fn split(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let limit = match arg(args, 1) {
        Value::Undefined => u32::MAX,
        limit => to_uint32(interp.to_number(&limit)?),
    } as usize;
    let parts: Vec<Value> = match arg(args, 0) {
        Value::Undefined => vec![Value::String(text)],
        separator => {
            let separator = interp.to_string(&separator)?;
            if separator.is_empty() {
                text.encode_utf16().map(|unit| collect(&[unit])).collect()
            } else {
                text.split(separator.as_str()).map(Value::string).collect()
            }
        }
    };
    Ok(Value::array(parts.into_iter().take(limit).collect()))
}

// ── Transformation ────────────────────────────────────────────────────────────

fn to_upper_case(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(this_string(interp, this)?.to_uppercase()))
}

fn to_lower_case(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(this_string(interp, this)?.to_lowercase()))
}

fn trim(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this_string(interp, this)?.trim()))
}

fn trim_start(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this_string(interp, this)?.trim_start()))
}

fn trim_end(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::string(this_string(interp, this)?.trim_end()))
}

fn replace(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    replace_matches(interp, this, args, false)
}

fn replace_all(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    replace_matches(interp, this, args, true)
}

/// String-pattern `replace`/`replaceAll`. A function replacement receives
/// `(match, offset, string)`; a string replacement expands `$$` and `$&`.
fn replace_matches(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    all: bool,
) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let units: Vec<u16> = text.encode_utf16().collect();
    let pattern = string_arg(interp, args, 0)?;
    let replacement = arg(args, 1);
    let template = match &replacement {
        f if f.is_callable() => None,
        other => Some(interp.to_string(other)?),
    };

    let matched = String::from_utf16_lossy(&pattern);
    let mut out: Vec<u16> = Vec::with_capacity(units.len());
    let mut cursor = 0;
    let mut from = 0;
    while let Some(pos) = find(&units, &pattern, from) {
        interp.tick()?;
        out.extend_from_slice(&units[cursor..pos]);
        match &template {
            Some(template) => out.extend(expand_template(template, &matched).encode_utf16()),
            None => {
                let call_args = [
                    Value::string(matched.as_str()),
                    Value::Number(pos as f64),
                    Value::string(text.as_str()),
                ];
                let result = interp.call(&replacement, Value::Undefined, &call_args)?;
                out.extend(interp.to_string(&result)?.encode_utf16());
            }
        }
        cursor = pos + pattern.len();
        // An empty pattern matches between every pair of characters.
        from = if pattern.is_empty() { pos + 1 } else { cursor };
        if !all || from > units.len() {
            break;
        }
    }
    out.extend_from_slice(&units[cursor.min(units.len())..]);
    Ok(collect(&out))
}

fn expand_template(template: &str, matched: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('$', Some('$')) => {
                chars.next();
                out.push('$');
            }
            ('$', Some('&')) => {
                chars.next();
                out.push_str(matched);
            }
            _ => out.push(c),
        }
    }
    out
}

fn repeat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let count = number_arg(interp, args, 0, 0.0)?;
    let count = if count.is_nan() { 0.0 } else { count.trunc() };
    if count < 0.0 || count.is_infinite() {
        return Err(interp.range_error(format!("Invalid count value: {}", number_to_string(count))));
    }
    let count = count as usize;
    check_length(interp, utf16_length(&text).saturating_mul(count))?;
    Ok(Value::String(text.repeat(count)))
}

fn pad_start(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    pad(interp, this, args, true)
}

fn pad_end(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    pad(interp, this, args, false)
}

fn pad(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
    at_start: bool,
) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let len = utf16_length(&text);
    let target = number_arg(interp, args, 0, 0.0)?;
    let target = if target.is_nan() { 0.0 } else { target.trunc() };
    let filler: Vec<u16> = match arg(args, 1) {
        Value::Undefined => vec![u16::from(b' ')],
        fill => interp.to_string(&fill)?.encode_utf16().collect(),
    };
    if target <= len as f64 || filler.is_empty() {
        return Ok(Value::String(text));
    }
    if target > MAX_STRING_LENGTH as f64 {
        return Err(interp.range_error("Invalid string length"));
    }
    let padding: Vec<u16> = filler.iter().copied().cycle().take(target as usize - len).collect();
    let padding = String::from_utf16_lossy(&padding);
    Ok(Value::String(if at_start {
        padding + &text
    } else {
        text + &padding
    }))
}

fn concat(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let mut out = this_string(interp, this)?;
    for value in args {
        out.push_str(&interp.to_string(value)?);
    }
    check_length(interp, out.len())?;
    Ok(Value::String(out))
}

fn locale_compare(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = this_string(interp, this)?;
    let other = interp.to_string(&arg(args, 0))?;
    Ok(Value::Number(match text.cmp(&other) {
        Ordering::Less => -1.0,
        Ordering::Equal => 0.0,
        Ordering::Greater => 1.0,
    }))
}

fn value_of(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::String(this_string(interp, this)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> Vec<u16> {
        s.encode_utf16().collect()
    }

    #[test]
    fn test_find_and_rfind() {
        let hay = units("abcabc");
        assert_eq!(find(&hay, &units("bc"), 0), Some(1));
        assert_eq!(find(&hay, &units("bc"), 2), Some(4));
        assert_eq!(find(&hay, &units("x"), 0), None);
        assert_eq!(find(&hay, &units(""), 3), Some(3));
        assert_eq!(rfind(&hay, &units("bc"), usize::MAX), Some(4));
        assert_eq!(rfind(&hay, &units("bc"), 3), Some(1));
        assert_eq!(find(&units("a"), &units("abc"), 0), None);
    }

    #[test]
    fn test_utf16_positions() {
        assert_eq!(utf16_length("a\u{1F600}"), 3);
        assert_eq!(unit_at("a\u{1F600}", 0).as_deref(), Some("a"));
        assert_eq!(unit_at("a\u{1F600}", 1).as_deref(), Some("\u{FFFD}"));
        assert_eq!(unit_at("a", 1), None);
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(expand_template("[$&]", "x"), "[x]");
        assert_eq!(expand_template("$$1", "x"), "$1");
        assert_eq!(expand_template("$", "x"), "$");
    }
}
