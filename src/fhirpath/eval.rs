use serde_json::Value;

use crate::error::{ReferoError, Result};
use crate::types::ORDINAL_VALUE_URL;

use super::parser::{BinaryOp, Expr, Literal};

/// A single value flowing through expression evaluation. Complex FHIR values
/// (codings, quantities, response items) stay as raw JSON objects.
#[derive(Debug, Clone, PartialEq)]
pub enum FpValue {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Object(Value),
}

impl FpValue {
    /// Numeric view of this value. Codings contribute their `ordinalValue`
    /// extension weight, quantities their `value` field; this is what makes
    /// score aggregation over coded options work.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FpValue::Integer(v) => Some(*v as f64),
            FpValue::Decimal(v) => Some(*v),
            FpValue::Object(value) => {
                if let Some(ordinal) = coding_ordinal(value) {
                    return Some(ordinal);
                }
                value.get("value").and_then(Value::as_f64)
            }
            _ => None,
        }
    }
}

fn coding_ordinal(value: &Value) -> Option<f64> {
    let extensions = value.get("extension")?.as_array()?;
    extensions
        .iter()
        .find(|e| e.get("url").and_then(Value::as_str) == Some(ORDINAL_VALUE_URL))
        .and_then(|e| e.get("valueDecimal"))
        .and_then(Value::as_f64)
}

fn json_to_fp(value: &Value) -> Vec<FpValue> {
    match value {
        Value::Null => Vec::new(),
        Value::Bool(b) => vec![FpValue::Boolean(*b)],
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                vec![FpValue::Integer(i)]
            } else {
                vec![FpValue::Decimal(n.as_f64().unwrap_or(0.0))]
            }
        }
        Value::String(s) => vec![FpValue::String(s.clone())],
        Value::Array(items) => items.iter().flat_map(json_to_fp).collect(),
        Value::Object(_) => vec![FpValue::Object(value.clone())],
    }
}

/// Evaluation context: the serialized response the expression runs against.
pub struct EvalContext {
    root: Value,
    root_type: &'static str,
}

impl EvalContext {
    pub fn new(root: Value) -> Self {
        Self {
            root,
            root_type: "QuestionnaireResponse",
        }
    }

    pub fn root_collection(&self) -> Vec<FpValue> {
        vec![FpValue::Object(self.root.clone())]
    }
}

/// Evaluate `expr` against `focus`. The focus is the collection the
/// expression navigates from; top-level calls pass the response root.
pub fn evaluate(expr: &Expr, focus: &[FpValue], ctx: &EvalContext) -> Result<Vec<FpValue>> {
    match expr {
        Expr::Literal(literal) => Ok(vec![literal_value(literal)]),
        Expr::Identifier(name) => {
            if name == ctx.root_type {
                Ok(ctx.root_collection())
            } else {
                Ok(member_access(focus, name))
            }
        }
        Expr::Member(target, name) => {
            let base = evaluate(target, focus, ctx)?;
            Ok(member_access(&base, name))
        }
        Expr::Function { target, name, args } => {
            let base = match target {
                Some(target) => evaluate(target, focus, ctx)?,
                None => focus.to_vec(),
            };
            call_function(name, args, &base, ctx)
        }
        Expr::Binary { op, lhs, rhs } => {
            let left = evaluate(lhs, focus, ctx)?;
            let right = evaluate(rhs, focus, ctx)?;
            binary(*op, &left, &right)
        }
        Expr::Negate(inner) => {
            let values = evaluate(inner, focus, ctx)?;
            match singleton_number(&values) {
                Some(n) => Ok(vec![number_value(-n, all_integers(&values))]),
                None => Ok(Vec::new()),
            }
        }
    }
}

fn literal_value(literal: &Literal) -> FpValue {
    match literal {
        Literal::Boolean(b) => FpValue::Boolean(*b),
        Literal::Integer(i) => FpValue::Integer(*i),
        Literal::Decimal(d) => FpValue::Decimal(*d),
        Literal::String(s) => FpValue::String(s.clone()),
    }
}

fn member_access(focus: &[FpValue], name: &str) -> Vec<FpValue> {
    let mut result = Vec::new();
    for value in focus {
        let FpValue::Object(object) = value else {
            continue;
        };
        if let Some(found) = object.get(name) {
            result.extend(json_to_fp(found));
            continue;
        }
        // `value` resolves FHIR choice fields: valueInteger, valueCoding, ...
        if name == "value" {
            if let Value::Object(map) = object {
                for (key, found) in map {
                    if key.starts_with("value") {
                        result.extend(json_to_fp(found));
                    }
                }
            }
        }
    }
    result
}

fn call_function(
    name: &str,
    args: &[Expr],
    base: &[FpValue],
    ctx: &EvalContext,
) -> Result<Vec<FpValue>> {
    match name {
        "descendants" => Ok(descendants(base)),
        "where" => {
            let condition = args
                .first()
                .ok_or_else(|| ReferoError::evaluation("where() requires a condition"))?;
            let mut kept = Vec::new();
            for value in base {
                let item = std::slice::from_ref(value);
                let outcome = evaluate(condition, item, ctx)?;
                if is_truthy(&outcome) {
                    kept.push(value.clone());
                }
            }
            Ok(kept)
        }
        "first" => Ok(base.first().cloned().into_iter().collect()),
        "count" => Ok(vec![FpValue::Integer(base.len() as i64)]),
        "empty" => Ok(vec![FpValue::Boolean(base.is_empty())]),
        "exists" => Ok(vec![FpValue::Boolean(!base.is_empty())]),
        "not" => match base {
            [FpValue::Boolean(b)] => Ok(vec![FpValue::Boolean(!b)]),
            [] => Ok(Vec::new()),
            _ => Err(ReferoError::evaluation("not() requires a boolean singleton")),
        },
        "sum" => {
            let numbers = numbers_of(base, "sum")?;
            let total: f64 = numbers.iter().sum();
            Ok(vec![number_value(total, all_integers(base))])
        }
        "avg" => {
            let numbers = numbers_of(base, "avg")?;
            if numbers.is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![FpValue::Decimal(
                numbers.iter().sum::<f64>() / numbers.len() as f64,
            )])
        }
        "min" => {
            let numbers = numbers_of(base, "min")?;
            Ok(numbers
                .into_iter()
                .fold(None::<f64>, |acc, n| Some(acc.map_or(n, |a| a.min(n))))
                .map(|n| number_value(n, all_integers(base)))
                .into_iter()
                .collect())
        }
        "max" => {
            let numbers = numbers_of(base, "max")?;
            Ok(numbers
                .into_iter()
                .fold(None::<f64>, |acc, n| Some(acc.map_or(n, |a| a.max(n))))
                .map(|n| number_value(n, all_integers(base)))
                .into_iter()
                .collect())
        }
        "iif" => {
            if args.len() < 2 || args.len() > 3 {
                return Err(ReferoError::evaluation("iif() takes 2 or 3 arguments"));
            }
            let condition = evaluate(&args[0], base, ctx)?;
            if is_truthy(&condition) {
                evaluate(&args[1], base, ctx)
            } else if let Some(otherwise) = args.get(2) {
                evaluate(otherwise, base, ctx)
            } else {
                Ok(Vec::new())
            }
        }
        other => Err(ReferoError::evaluation(format!(
            "unsupported function '{other}'"
        ))),
    }
}

/// All descendant nodes of the focus, depth-first. Only objects are collected;
/// primitives are reached through member access on their parents.
fn descendants(focus: &[FpValue]) -> Vec<FpValue> {
    fn walk(value: &Value, out: &mut Vec<FpValue>) {
        match value {
            Value::Object(map) => {
                for child in map.values() {
                    collect(child, out);
                }
            }
            Value::Array(items) => {
                for child in items {
                    collect(child, out);
                }
            }
            _ => {}
        }
    }

    fn collect(value: &Value, out: &mut Vec<FpValue>) {
        match value {
            Value::Object(_) => {
                out.push(FpValue::Object(value.clone()));
                walk(value, out);
            }
            Value::Array(_) => walk(value, out),
            _ => {}
        }
    }

    let mut out = Vec::new();
    for value in focus {
        if let FpValue::Object(object) = value {
            walk(object, &mut out);
        }
    }
    out
}

fn binary(op: BinaryOp, left: &[FpValue], right: &[FpValue]) -> Result<Vec<FpValue>> {
    match op {
        BinaryOp::And => {
            let (l, r) = (is_truthy(left), is_truthy(right));
            Ok(vec![FpValue::Boolean(l && r)])
        }
        BinaryOp::Or => {
            let (l, r) = (is_truthy(left), is_truthy(right));
            Ok(vec![FpValue::Boolean(l || r)])
        }
        BinaryOp::Eq | BinaryOp::Ne => {
            if left.is_empty() || right.is_empty() {
                return Ok(Vec::new());
            }
            let equal = singleton_eq(left, right);
            Ok(vec![FpValue::Boolean(if op == BinaryOp::Eq {
                equal
            } else {
                !equal
            })])
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (Some(l), Some(r)) = (singleton_number(left), singleton_number(right)) else {
                return Ok(Vec::new());
            };
            let outcome = match op {
                BinaryOp::Lt => l < r,
                BinaryOp::Le => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            };
            Ok(vec![FpValue::Boolean(outcome)])
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let (Some(l), Some(r)) = (singleton_number(left), singleton_number(right)) else {
                // String concatenation is the one non-numeric use of `+`.
                if op == BinaryOp::Add {
                    if let ([FpValue::String(a)], [FpValue::String(b)]) = (left, right) {
                        return Ok(vec![FpValue::String(format!("{a}{b}"))]);
                    }
                }
                return Ok(Vec::new());
            };
            let integers = all_integers(left) && all_integers(right);
            let value = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Ok(Vec::new());
                    }
                    return Ok(vec![FpValue::Decimal(l / r)]);
                }
                _ => unreachable!(),
            };
            Ok(vec![number_value(value, integers)])
        }
    }
}

fn singleton_eq(left: &[FpValue], right: &[FpValue]) -> bool {
    if let (Some(l), Some(r)) = (singleton_number(left), singleton_number(right)) {
        return l == r;
    }
    match (left, right) {
        ([FpValue::String(a)], [FpValue::String(b)]) => a == b,
        ([FpValue::Boolean(a)], [FpValue::Boolean(b)]) => a == b,
        ([FpValue::Object(a)], [FpValue::Object(b)]) => a == b,
        _ => false,
    }
}

fn is_truthy(values: &[FpValue]) -> bool {
    match values {
        [FpValue::Boolean(b)] => *b,
        [] => false,
        _ => true,
    }
}

fn singleton_number(values: &[FpValue]) -> Option<f64> {
    match values {
        [single] => single.as_number(),
        _ => None,
    }
}

fn all_integers(values: &[FpValue]) -> bool {
    !values.is_empty() && values.iter().all(|v| matches!(v, FpValue::Integer(_)))
}

fn numbers_of(values: &[FpValue], function: &str) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|v| {
            v.as_number().ok_or_else(|| {
                ReferoError::evaluation(format!("{function}() over a non-numeric value"))
            })
        })
        .collect()
}

fn number_value(value: f64, integers: bool) -> FpValue {
    if integers && value.fract() == 0.0 {
        FpValue::Integer(value as i64)
    } else {
        FpValue::Decimal(value)
    }
}
