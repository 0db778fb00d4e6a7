use std::collections::HashMap;

use rand::Rng;

use super::{arg, expect_number, table};
use crate::error::{Result, ShravError};
use crate::value::Value;

fn unary(name: &'static str, op: fn(f64) -> f64) -> (&'static str, Value) {
    let native = Value::native(name, 1, move |_, args| {
        let x: f64 = expect_number(name, &arg(args, 0))?;
        Ok(Value::Float(op(x)))
    });
    (name, native)
}

fn sqrt(x: f64) -> Result<f64> {
    if x < 0.0 {
        return Err(ShravError::Type(format!(
            "sqrt() of negative number {}",
            x
        )));
    }
    Ok(x.sqrt())
}

pub fn functions() -> HashMap<String, Value> {
    table([
        (
            "sqrt",
            Value::native("sqrt", 1, |_, args| {
                Ok(Value::Float(sqrt(expect_number("sqrt", &arg(args, 0))?)?))
            }),
        ),
        (
            "pow",
            Value::native("pow", 2, |_, args| {
                let base: f64 = expect_number("pow", &arg(args, 0))?;
                let exponent: f64 = expect_number("pow", &arg(args, 1))?;
                Ok(Value::Float(base.powf(exponent)))
            }),
        ),
        (
            "random",
            Value::native("random", 0, |_, _| {
                Ok(Value::Float(rand::thread_rng().gen::<f64>()))
            }),
        ),
        unary("sin", f64::sin),
        unary("cos", f64::cos),
        unary("tan", f64::tan),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_rejects_negative_input() {
        assert_eq!(sqrt(9.0).unwrap(), 3.0);
        assert!(sqrt(-1.0).is_err());
    }
}
