//! The `Math` global.

use std::cell::Cell;
use std::rc::Rc;

use crate::builtins::number_arg;
use crate::env::Scope;
use crate::error::EvalResult;
use crate::interpreter::{js_pow, Interpreter};
use crate::value::{Object, ObjectKind, ObjectRef, Value};

/// Fixed seed: `Math.random()` sequences are reproducible per realm.
const RANDOM_SEED: u64 = 0x2545_f491_4f6c_dd1d;

const UNARY: &[(&str, fn(f64) -> f64)] = &[
    ("abs", f64::abs),
    ("floor", f64::floor),
    ("ceil", f64::ceil),
    ("trunc", f64::trunc),
    ("round", round),
    ("sign", sign),
    ("sqrt", f64::sqrt),
    ("cbrt", f64::cbrt),
    ("exp", f64::exp),
    ("log", f64::ln),
    ("log2", f64::log2),
    ("log10", f64::log10),
    ("sin", f64::sin),
    ("cos", f64::cos),
    ("tan", f64::tan),
    ("asin", f64::asin),
    ("acos", f64::acos),
    ("atan", f64::atan),
];

const CONSTANTS: &[(&str, f64)] = &[
    ("PI", std::f64::consts::PI),
    ("E", std::f64::consts::E),
    ("LN2", std::f64::consts::LN_2),
    ("LN10", std::f64::consts::LN_10),
    ("LOG2E", std::f64::consts::LOG2_E),
    ("LOG10E", std::f64::consts::LOG10_E),
    ("SQRT2", std::f64::consts::SQRT_2),
    ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
];

pub(crate) fn install(globals: &Rc<Scope>) {
    let math = ObjectRef::new(Object::new(ObjectKind::Ordinary));
    for (name, value) in CONSTANTS {
        math.set_own(name, Value::Number(*value));
    }
    for (name, f) in UNARY {
        let f = *f;
        let method = Value::native(name, move |interp, _this, args| {
            Ok(Value::Number(f(number_arg(interp, args, 0, f64::NAN)?)))
        });
        math.set_own(name, method);
    }
    math.set_own("min", Value::native("min", min));
    math.set_own("max", Value::native("max", max));
    math.set_own("pow", Value::native("pow", pow));
    math.set_own("atan2", Value::native("atan2", atan2));
    math.set_own("hypot", Value::native("hypot", hypot));

    let state = Rc::new(Cell::new(RANDOM_SEED));
    math.set_own(
        "random",
        Value::native("random", move |_interp, _this, _args| {
            Ok(Value::Number(next_random(&state)))
        }),
    );

    globals.declare("Math", Value::Object(math), true);
}

/// `Math.round`: halves round toward +∞.
fn round(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn sign(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn numbers(interp: &mut Interpreter, args: &[Value]) -> EvalResult<Vec<f64>> {
    args.iter().map(|a| interp.to_number(a)).collect()
}

fn min(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let values = numbers(interp, args)?;
    if values.iter().any(|n| n.is_nan()) {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(values.into_iter().fold(f64::INFINITY, f64::min)))
}

fn max(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let values = numbers(interp, args)?;
    if values.iter().any(|n| n.is_nan()) {
        return Ok(Value::Number(f64::NAN));
    }
    Ok(Value::Number(values.into_iter().fold(f64::NEG_INFINITY, f64::max)))
}

fn pow(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let base = number_arg(interp, args, 0, f64::NAN)?;
    let exponent = number_arg(interp, args, 1, f64::NAN)?;
    Ok(Value::Number(js_pow(base, exponent)))
}

fn atan2(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let y = number_arg(interp, args, 0, f64::NAN)?;
    let x = number_arg(interp, args, 1, f64::NAN)?;
    Ok(Value::Number(y.atan2(x)))
}

fn hypot(interp: &mut Interpreter, _this: &Value, args: &[Value]) -> EvalResult<Value> {
    let values = numbers(interp, args)?;
    Ok(Value::Number(values.iter().map(|n| n * n).sum::<f64>().sqrt()))
}

/// xorshift64*, mapped to `[0, 1)`.
fn next_random(state: &Cell<u64>) -> f64 {
    let mut x = state.get();
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    state.set(x);
    let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
    bits as f64 / (1u64 << 53) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_halves_toward_positive_infinity() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(0.49999999999999994), 0.0);
        assert_eq!(round(-0.6), -1.0);
    }

    #[test]
    fn test_random_stays_in_unit_interval() {
        let state = Cell::new(RANDOM_SEED);
        for _ in 0..1000 {
            let r = next_random(&state);
            assert!((0.0..1.0).contains(&r));
        }
    }
}
