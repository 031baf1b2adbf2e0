use serde_json::Value;
use std::cmp::Ordering;

use crate::errors::{EvalError, Result};
use crate::value::type_name;

/// `==` semantics: numbers compare by value across integer/decimal,
/// containers compare element-wise, mixed types are never equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => match (na.as_i64(), nb.as_i64()) {
            (Some(ia), Some(ib)) => ia == ib,
            _ => na.as_f64() == nb.as_f64(),
        },
        (Value::Array(xa), Value::Array(xb)) => {
            xa.len() == xb.len() && xa.iter().zip(xb).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(ma), Value::Object(mb)) => {
            ma.len() == mb.len()
                && ma
                    .iter()
                    .all(|(k, v)| mb.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}

/// Ordering for `<`, `<=`, `>` and `>=`. `null` sorts before everything.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(Ordering::Equal),
        (Value::Null, _) => Ok(Ordering::Less),
        (_, Value::Null) => Ok(Ordering::Greater),
        (Value::String(sa), Value::String(sb)) => Ok(sa.cmp(sb)),
        (Value::Bool(ba), Value::Bool(bb)) => Ok(ba.cmp(bb)),
        (Value::Number(na), Value::Number(nb)) => {
            if let (Some(ia), Some(ib)) = (na.as_i64(), nb.as_i64()) {
                return Ok(ia.cmp(&ib));
            }
            match (na.as_f64(), nb.as_f64()) {
                (Some(da), Some(db)) => da
                    .partial_cmp(&db)
                    .ok_or_else(|| EvalError::Runtime("cannot order NaN".into())),
                _ => Err(EvalError::Runtime("number out of range".into())),
            }
        }
        _ => Err(EvalError::Runtime(format!(
            "cannot compare {} with {}",
            type_name(a),
            type_name(b)
        ))),
    }
}
