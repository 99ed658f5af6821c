//! Global constants and functions, `Boolean`, `Number`, the error
//! constructors and `Number.prototype` methods.

use std::rc::Rc;

use crate::builtins::{add_statics, arg, number_arg, Method};
use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::number::{number_to_radix_string, number_to_string, parse_float, parse_int, to_fixed, to_int32};
use crate::value::Value;

/// Error constructors available to scripts.
pub const ERROR_TYPES: [&str; 6] = [
    "Error",
    "TypeError",
    "RangeError",
    "SyntaxError",
    "ReferenceError",
    "EvalError",
];

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(crate) fn install(globals: &Rc<Scope>) {
    globals.declare("undefined", Value::Undefined, false);
    globals.declare("NaN", Value::Number(f64::NAN), false);
    globals.declare("Infinity", Value::Number(f64::INFINITY), false);

    let functions: [(&str, Method); 4] = [
        ("parseInt", global_parse_int),
        ("parseFloat", global_parse_float),
        ("isNaN", global_is_nan),
        ("isFinite", global_is_finite),
    ];
    for (name, f) in functions {
        globals.declare(name, Value::native(name, f), true);
    }

    globals.declare("Boolean", Value::native_constructor("Boolean", boolean), true);

    let number = Value::native_constructor("Number", number);
    add_statics(
        &number,
        &[
            ("isInteger", number_is_integer),
            ("isSafeInteger", number_is_safe_integer),
            ("isFinite", number_is_finite),
            ("isNaN", number_is_nan),
            ("parseInt", global_parse_int),
            ("parseFloat", global_parse_float),
        ],
    );
    if let Value::Object(obj) = &number {
        let constants = [
            ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
            ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
            ("EPSILON", f64::EPSILON),
            ("MAX_VALUE", f64::MAX),
            ("MIN_VALUE", 5e-324),
            ("POSITIVE_INFINITY", f64::INFINITY),
            ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
            ("NaN", f64::NAN),
        ];
        for (name, value) in constants {
            obj.set_own(name, Value::Number(value));
        }
    }
    globals.declare("Number", number, true);

    for name in ERROR_TYPES {
        let ctor = Value::native_constructor(name, move |interp, _this, args| {
            let message = match args.first() {
                None | Some(Value::Undefined) => String::new(),
                Some(value) => interp.to_string(value)?,
            };
            Ok(Value::error(name, message))
        });
        globals.declare(name, ctor, true);
    }
}

// ── Global functions ──────────────────────────────────────────────────────────

fn global_parse_int(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let text = interp.to_string(&arg(args, 0))?;
    let radix = to_int32(number_arg(interp, args, 1, 0.0)?);
    let radix = u32::try_from(radix).unwrap_or(u32::MAX);
    Ok(Value::Number(parse_int(&text, radix)))
}

fn global_parse_float(
    interp: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let text = interp.to_string(&arg(args, 0))?;
    Ok(Value::Number(parse_float(&text)))
}

fn global_is_nan(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(interp.to_number(&arg(args, 0))?.is_nan()))
}

fn global_is_finite(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(interp.to_number(&arg(args, 0))?.is_finite()))
}

fn boolean(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(arg(args, 0).to_boolean()))
}

// ── Number ────────────────────────────────────────────────────────────────────

fn number(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    match args.first() {
        None => Ok(Value::Number(0.0)),
        Some(value) => Ok(Value::Number(interp.to_number(value)?)),
    }
}

fn is_integer(n: f64) -> bool {
    n.is_finite() && n.trunc() == n
}

fn number_is_integer(
    _interp: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    Ok(Value::Bool(arg(args, 0).as_number().is_some_and(is_integer)))
}

fn number_is_safe_integer(
    _interp: &mut Interpreter,
    _this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let safe = arg(args, 0)
        .as_number()
        .is_some_and(|n| is_integer(n) && n.abs() <= MAX_SAFE_INTEGER);
    Ok(Value::Bool(safe))
}

fn number_is_finite(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(arg(args, 0).as_number().is_some_and(f64::is_finite)))
}

fn number_is_nan(_interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Bool(arg(args, 0).as_number().is_some_and(f64::is_nan)))
}

/// `Number.prototype` methods.
pub(crate) fn number_method(key: &str) -> Option<Method> {
    Some(match key {
        "toFixed" => number_to_fixed,
        "toString" => number_to_string_method,
        "toPrecision" => number_to_precision,
        "valueOf" => number_value_of,
        _ => return None,
    })
}

fn this_number(interp: &mut Interpreter, this: &Value) -> EvalResult<f64> {
    match this {
        Value::Number(n) => Ok(*n),
        _ => Err(interp.type_error("Number.prototype method called on a non-number")),
    }
}

fn number_to_fixed(interp: &mut Interpreter, this: &Value, args: &[Value]) -> EvalResult<Value> {
    let n = this_number(interp, this)?;
    let digits = number_arg(interp, args, 0, 0.0)?.trunc();
    if !(0.0..=100.0).contains(&digits) {
        return Err(interp.range_error("toFixed() digits argument must be between 0 and 100"));
    }
    Ok(Value::String(to_fixed(n, digits as usize)))
}

fn number_to_string_method(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let n = this_number(interp, this)?;
    let radix = number_arg(interp, args, 0, 10.0)?.trunc();
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.range_error("toString() radix must be between 2 and 36"));
    }
    Ok(Value::String(number_to_radix_string(n, radix as u32)))
}

fn number_to_precision(
    interp: &mut Interpreter,
    this: &Value,
    args: &[Value],
) -> EvalResult<Value> {
    let n = this_number(interp, this)?;
    if arg(args, 0).is_undefined() || !n.is_finite() {
        return Ok(Value::String(number_to_string(n)));
    }
    let precision = number_arg(interp, args, 0, 1.0)?.trunc();
    if !(1.0..=100.0).contains(&precision) {
        return Err(interp.range_error("toPrecision() argument must be between 1 and 100"));
    }
    Ok(Value::String(to_precision(n, precision as usize)))
}

fn number_value_of(interp: &mut Interpreter, this: &Value, _args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(this_number(interp, this)?))
}

/// `Number.prototype.toPrecision(precision)` for finite `n`.
fn to_precision(n: f64, precision: usize) -> String {
    if n < 0.0 {
        return format!("-{}", to_precision(-n, precision));
    }
    if n == 0.0 {
        return match precision {
            1 => "0".to_string(),
            p => format!("0.{}", "0".repeat(p - 1)),
        };
    }
    let sci = format!("{:.*e}", precision - 1, n);
    let (mantissa, exponent) = sci.split_once('e').unwrap_or((&sci, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let e: i32 = exponent.parse().unwrap_or(0);

    if e < -6 || e >= precision as i32 {
        let sign = if e < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{sign}{}", e.abs())
        }
    } else if e >= 0 {
        let (int, frac) = digits.split_at(e as usize + 1);
        if frac.is_empty() {
            int.to_string()
        } else {
            format!("{int}.{frac}")
        }
    } else {
        format!("0.{}{digits}", "0".repeat((-e - 1) as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_precision() {
        assert_eq!(to_precision(123.456, 4), "123.5");
        assert_eq!(to_precision(0.000123, 2), "0.00012");
        assert_eq!(to_precision(123456.0, 2), "1.2e+5");
        assert_eq!(to_precision(1.0, 3), "1.00");
        assert_eq!(to_precision(0.0, 3), "0.00");
        assert_eq!(to_precision(-5.0, 1), "-5");
    }
}
