use model::{core::value::Value, query::BinaryOp};
use std::cmp::Ordering;
use tracing::warn;

/// Binary operation evaluator that handles different value type combinations.
/// `And`/`Or` are short-circuited by the caller before reaching here.
pub(crate) struct BinaryOpEvaluator<'a> {
    left: &'a Value,
    right: &'a Value,
    op: &'a BinaryOp,
}

impl<'a> BinaryOpEvaluator<'a> {
    pub fn new(left: &'a Value, right: &'a Value, op: &'a BinaryOp) -> Self {
        Self { left, right, op }
    }

    pub fn evaluate(&self) -> Option<Value> {
        use Value::*;

        match (self.left, self.right) {
            (Null, Null) => self.eval_null_null(),
            (Null, _) | (_, Null) => self.eval_null_other(),
            (Int(l), Int(r)) => self.eval_int(*l, *r),
            (Uint(l), Uint(r)) => self.eval_uint(*l, *r),
            (Int(_), Uint(_)) | (Uint(_), Int(_)) => self.eval_ordered(),
            (Float(_), _) | (_, Float(_)) => self.eval_float(),
            (String(l), String(r)) => self.eval_string(l, r),
            (Boolean(l), Boolean(r)) => self.eval_boolean(*l, *r),
            (Uuid(_), Uuid(_)) | (Timestamp(_), Timestamp(_)) => self.eval_ordered(),
            _ => None,
        }
    }

    fn eval_int(&self, l: i64, r: i64) -> Option<Value> {
        use Value::*;
        Some(match self.op {
            BinaryOp::Add => Int(l.checked_add(r)?),
            BinaryOp::Subtract => Int(l.checked_sub(r)?),
            BinaryOp::Multiply => Int(l.checked_mul(r)?),
            BinaryOp::Divide => Int(l.checked_div(r)?),
            BinaryOp::Modulo => Int(l.checked_rem(r)?),
            BinaryOp::Equal => Boolean(l == r),
            BinaryOp::NotEqual => Boolean(l != r),
            BinaryOp::GreaterThan => Boolean(l > r),
            BinaryOp::LessThan => Boolean(l < r),
            BinaryOp::GreaterOrEqual => Boolean(l >= r),
            BinaryOp::LessOrEqual => Boolean(l <= r),
            _ => {
                warn!("Unsupported binary operation for Int: {:?}", self.op);
                return None;
            }
        })
    }

    fn eval_uint(&self, l: u64, r: u64) -> Option<Value> {
        use Value::*;
        Some(match self.op {
            BinaryOp::Add => Uint(l.checked_add(r)?),
            BinaryOp::Subtract => Uint(l.checked_sub(r)?),
            BinaryOp::Multiply => Uint(l.checked_mul(r)?),
            BinaryOp::Divide => Uint(l.checked_div(r)?),
            BinaryOp::Modulo => Uint(l.checked_rem(r)?),
            _ => return self.eval_ordered(),
        })
    }

    fn eval_float(&self) -> Option<Value> {
        use Value::*;
        let l = self.left.as_f64()?;
        let r = self.right.as_f64()?;

        Some(match self.op {
            BinaryOp::Add => Float(l + r),
            BinaryOp::Subtract => Float(l - r),
            BinaryOp::Multiply => Float(l * r),
            BinaryOp::Divide => Float(l / r),
            BinaryOp::Modulo => Float(l % r),
            BinaryOp::Equal => Boolean((l - r).abs() < f64::EPSILON),
            BinaryOp::NotEqual => Boolean((l - r).abs() >= f64::EPSILON),
            BinaryOp::GreaterThan => Boolean(l > r),
            BinaryOp::LessThan => Boolean(l < r),
            BinaryOp::GreaterOrEqual => Boolean(l >= r),
            BinaryOp::LessOrEqual => Boolean(l <= r),
            _ => {
                warn!("Unsupported binary operation for Float: {:?}", self.op);
                return None;
            }
        })
    }

    fn eval_string(&self, l: &str, r: &str) -> Option<Value> {
        use Value::*;
        Some(match self.op {
            BinaryOp::Equal => Boolean(l == r),
            BinaryOp::NotEqual => Boolean(l != r),
            BinaryOp::GreaterThan => Boolean(l > r),
            BinaryOp::LessThan => Boolean(l < r),
            BinaryOp::GreaterOrEqual => Boolean(l >= r),
            BinaryOp::LessOrEqual => Boolean(l <= r),
            BinaryOp::Add => String(format!("{}{}", l, r)),
            _ => {
                warn!("Unsupported binary operation for String: {:?}", self.op);
                return None;
            }
        })
    }

    fn eval_boolean(&self, l: bool, r: bool) -> Option<Value> {
        use Value::*;
        Some(match self.op {
            BinaryOp::And => Boolean(l && r),
            BinaryOp::Or => Boolean(l || r),
            BinaryOp::Equal => Boolean(l == r),
            BinaryOp::NotEqual => Boolean(l != r),
            _ => {
                warn!("Unsupported binary operation for Boolean: {:?}", self.op);
                return None;
            }
        })
    }

    /// Comparison-only operands: mixed-sign integers, uuids and timestamps.
    fn eval_ordered(&self) -> Option<Value> {
        let ordering = self.left.compare(self.right)?;
        let result = match self.op {
            BinaryOp::Equal => ordering == Ordering::Equal,
            BinaryOp::NotEqual => ordering != Ordering::Equal,
            BinaryOp::GreaterThan => ordering == Ordering::Greater,
            BinaryOp::LessThan => ordering == Ordering::Less,
            BinaryOp::GreaterOrEqual => ordering != Ordering::Less,
            BinaryOp::LessOrEqual => ordering != Ordering::Greater,
            _ => {
                warn!(
                    "Unsupported binary operation for {}: {:?}",
                    self.left.type_name(),
                    self.op
                );
                return None;
            }
        };
        Some(Value::Boolean(result))
    }

    fn eval_null_null(&self) -> Option<Value> {
        use Value::*;
        match self.op {
            BinaryOp::Equal => Some(Boolean(true)),
            BinaryOp::NotEqual => Some(Boolean(false)),
            _ => None,
        }
    }

    fn eval_null_other(&self) -> Option<Value> {
        use Value::*;
        match self.op {
            BinaryOp::Equal => Some(Boolean(false)),
            BinaryOp::NotEqual => Some(Boolean(true)),
            _ => Some(Null),
        }
    }
}
