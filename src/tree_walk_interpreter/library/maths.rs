use std::f64::consts;

use crate::tree_walk_interpreter::{callable::Function, Value};

use super::entry;

fn unary(name: &str, f: fn(f64) -> f64) -> (String, Value) {
    entry(
        name,
        Function::builtin(name, 1, move |_, arguments| {
            Ok(Value::Number(f(arguments[0].as_number()?)))
        }),
    )
}

fn binary(name: &str, f: fn(f64, f64) -> f64) -> (String, Value) {
    entry(
        name,
        Function::builtin(name, 2, move |_, arguments| {
            Ok(Value::Number(f(
                arguments[0].as_number()?,
                arguments[1].as_number()?,
            )))
        }),
    )
}

/// Folds any number of numeric arguments, starting from `initial`.
fn fold(name: &str, initial: f64, f: fn(f64, f64) -> f64) -> (String, Value) {
    entry(
        name,
        Function::variadic_builtin(name, 0, move |_, arguments| {
            let mut result = initial;
            for argument in &arguments {
                result = f(result, argument.as_number()?);
            }
            Ok(Value::Number(result))
        }),
    )
}

/// Halves round up, so `round(-2.5)` is `-2`.
fn round(n: f64) -> f64 {
    (n + 0.5).floor()
}

fn sign(n: f64) -> f64 {
    if n.is_nan() || n == 0.0 {
        n
    } else {
        n.signum()
    }
}

pub fn module() -> Value {
    Value::frozen_dictionary([
        ("PI".to_string(), Value::Number(consts::PI)),
        ("E".to_string(), Value::Number(consts::E)),
        ("INFINITY".to_string(), Value::Number(f64::INFINITY)),
        ("NAN".to_string(), Value::Number(f64::NAN)),
        unary("floor", f64::floor),
        unary("ceil", f64::ceil),
        unary("round", round),
        unary("trunc", f64::trunc),
        unary("abs", f64::abs),
        unary("sign", sign),
        unary("sqrt", f64::sqrt),
        unary("cbrt", f64::cbrt),
        unary("exp", f64::exp),
        unary("ln", f64::ln),
        unary("log10", f64::log10),
        unary("log2", f64::log2),
        unary("sin", f64::sin),
        unary("cos", f64::cos),
        unary("tan", f64::tan),
        unary("asin", f64::asin),
        unary("acos", f64::acos),
        unary("atan", f64::atan),
        binary("atan2", f64::atan2),
        unary("sinh", f64::sinh),
        unary("cosh", f64::cosh),
        unary("tanh", f64::tanh),
        binary("pow", f64::powf),
        fold("hypot", 0.0, f64::hypot),
        fold("min", f64::INFINITY, f64::min),
        fold("max", f64::NEG_INFINITY, f64::max),
        entry(
            "isNaN",
            Function::builtin("isNaN", 1, |_, arguments| {
                Ok(Value::Boolean(
                    matches!(arguments[0], Value::Number(n) if n.is_nan()),
                ))
            }),
        ),
        unary("degreesToRadians", f64::to_radians),
        unary("radiansToDegrees", f64::to_degrees),
    ])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(round(2.5), 3.0);
        assert_eq!(round(-2.5), -2.0);
        assert_eq!(round(-2.6), -3.0);
    }

    #[test]
    fn test_sign_keeps_zero() {
        assert_eq!(sign(-4.0), -1.0);
        assert_eq!(sign(0.0), 0.0);
        assert!(sign(f64::NAN).is_nan());
    }

    #[test]
    fn test_module_is_frozen() {
        let Value::Dictionary(module) = module() else {
            panic!("maths should be a dictionary");
        };
        assert!(module.is_frozen());
        assert_eq!(module.get("PI"), Some(Value::Number(consts::PI)));
        assert!(module.has("radiansToDegrees"));
    }
}
