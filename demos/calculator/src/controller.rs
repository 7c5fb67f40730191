//! The exposed controller: a greeter owning a float and an int calculator.

use objgate::prelude::*;
use serde::Deserialize;

/// Settings shipped with the demo.
pub const CONFIG_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/objgate.toml");

/// A binary operation, named after what it computes.
///
/// Requests spell operators as symbols; the `float_op` and `int_op`
/// coercions translate them, so `/` means a different operation for each
/// calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Truediv,
    Floordiv,
}

impl Operator {
    fn from_symbol(symbol: &str, division: Self) -> Option<Self> {
        match symbol {
            "+" => Some(Self::Add),
            "-" => Some(Self::Sub),
            "x" | "*" => Some(Self::Mul),
            "/" => Some(division),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Truediv => "truediv",
            Self::Floordiv => "floordiv",
        }
    }

    /// Applies the operation. Non-finite results are rejected as invalid
    /// operands.
    pub fn apply(self, x: f64, y: f64) -> CallResult<f64> {
        if matches!(self, Self::Truediv | Self::Floordiv) && y == 0.0 {
            return Err(CallError::failed("division by zero"));
        }
        let result = match self {
            Self::Add => x + y,
            Self::Sub => x - y,
            Self::Mul => x * y,
            Self::Truediv => x / y,
            Self::Floordiv => (x / y).floor(),
        };
        if !result.is_finite() {
            return Err(CallError::invalid(
                "x",
                format!("{x} {} {y} is not a finite number", self.name()),
            ));
        }
        Ok(result)
    }
}

/// Narrows a float result to an integer, rejecting values outside `i64`.
fn to_int(value: f64) -> CallResult<i64> {
    // 2^63 is exact as f64; the valid range is [-2^63, 2^63).
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    let value = value.trunc();
    if (-BOUND..BOUND).contains(&value) {
        Ok(value as i64)
    } else {
        Err(CallError::invalid(
            "x",
            format!("{value} does not fit in a 64-bit integer"),
        ))
    }
}

/// Coercion of an operator symbol, with `/` mapped to `division`.
fn operator(label: &'static str, division: Operator) -> Transform {
    Transform::new(label, move |value| {
        let symbol = value.as_str().ok_or_else(|| TransformError::TypeMismatch {
            expected: "string",
            got: objgate::core::kind_name(&value),
        })?;
        Operator::from_symbol(symbol, division)
            .map(|op| Value::from(op.name()))
            .ok_or_else(|| TransformError::custom(format!("No such operation: {symbol}")))
    })
}

/// Coercions referenced by `objgate.toml`.
pub fn coercions() -> CoercionRegistry {
    let mut registry = CoercionRegistry::with_builtins();
    registry
        .register("float_op", operator("float_op", Operator::Truediv))
        .register("int_op", operator("int_op", Operator::Floordiv))
        .register("result_envelope", envelope("_result"));
    registry
}

fn compute_signature(doc: &str) -> Signature {
    Signature::new("compute")
        .param("x")
        .param("op")
        .param("y")
        .doc(doc)
}

fn float_calculator() -> Namespace {
    let compute = Method::new(
        compute_signature(
            "A float \"x op y\" operation (that is, division will be as expected).",
        ),
        |args| {
            let x: f64 = args.required("x")?;
            let op: Operator = args.required("op")?;
            let y: f64 = args.required("y")?;
            Ok(json!(op.apply(x, y)?))
        },
    );

    Namespace::new("FloatCalculator")
        .doc("A float calculator (that is, division will be as expected).")
        .value("whoami", "a float calculator")
        .method(compute)
}

fn int_calculator() -> Namespace {
    let compute = Method::new(
        compute_signature("An int \"x op y\" operation (that is, division will be euclidean)."),
        |args| {
            let x: f64 = args.required("x")?;
            let op: Operator = args.required("op")?;
            let y: f64 = args.required("y")?;
            Ok(json!(to_int(op.apply(x, y)?)?))
        },
    );

    Namespace::new("IntCalculator")
        .value("whoami", "an int calculator")
        .method(compute)
}

/// Builds a controller from the `user` and `dflt_greeting` constructor arguments.
pub fn build(args: &CtorArgs) -> CallResult<SharedObject> {
    let text = |name: &str, default: &str| -> CallResult<String> {
        match args.get(name) {
            None | Some(Value::Null) => Ok(default.to_string()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(CallError::invalid(name, format!("expected a string, got {other}"))),
        }
    };
    let user = text("user", "world")?;
    let dflt_greeting = text("dflt_greeting", "Hello")?;

    let greet = Method::new(
        Signature::new("greet").param_or("greeting", Value::Null),
        move |args| {
            let greeting = args
                .optional::<String>("greeting")?
                .unwrap_or_else(|| dflt_greeting.clone());
            Ok(json!(format!("{greeting} {user}!")))
        },
    );

    let secret = Method::new(Signature::new("do_not_give_access_to_this"), |_| {
        Ok(json!("it's a secret"))
    });

    Ok(Namespace::new("Controller")
        .method(greet)
        .method(secret)
        .object("fcalc", float_calculator())
        .object("icalc", int_calculator())
        .into_shared())
}
