use super::VariableStore;
use crate::ast::{Expression, Value, ValueType};
use crate::error::EvaluationError;

// This macro generates a match arm for a binary operation.
macro_rules! eval_op {
    ($self:ident, $expr:ident, $l:ident, $r:ident, $op_fn:expr, number) => {
        $self.eval_arithmetic($expr, $l, $r, $op_fn)
    };
    ($self:ident, $expr:ident, $l:ident, $r:ident, $op_fn:expr, bool) => {
        $self.eval_comparison($expr, $l, $r, $op_fn)
    };
}

/// The recursive engine that evaluates one expression against a variable store.
pub(super) struct AstEngine<'a> {
    store: &'a VariableStore,
}

impl<'a> AstEngine<'a> {
    pub(super) fn new(store: &'a VariableStore) -> Self {
        Self { store }
    }

    pub(super) fn evaluate(&self, expr: &Expression) -> Result<Value, EvaluationError> {
        match expr {
            // --- Arithmetic Operations ---
            Expression::Sum(l, r) => eval_op!(self, expr, l, r, |a, b| a + b, number),
            Expression::Subtract(l, r) => eval_op!(self, expr, l, r, |a, b| a - b, number),
            Expression::Multiply(l, r) => eval_op!(self, expr, l, r, |a, b| a * b, number),
            Expression::Divide(l, r) => {
                let lv = self.number_operand(expr, l)?;
                let rv = self.number_operand(expr, r)?;
                if rv == 0.0 {
                    return Err(EvaluationError::DivisionByZero(expr.to_string()));
                }
                Ok(Value::Number(lv / rv))
            }

            // --- Comparison Operations ---
            Expression::GreaterThan(l, r) => eval_op!(self, expr, l, r, |a, b| a > b, bool),
            Expression::SmallerThan(l, r) => eval_op!(self, expr, l, r, |a, b| a < b, bool),
            Expression::GreaterThanOrEqual(l, r) => {
                eval_op!(self, expr, l, r, |a, b| a >= b, bool)
            }
            Expression::SmallerThanOrEqual(l, r) => {
                eval_op!(self, expr, l, r, |a, b| a <= b, bool)
            }

            // --- Equality ---
            Expression::Equal(l, r) => Ok(Value::Bool(self.eval_equality(expr, l, r)?)),
            Expression::NotEqual(l, r) => Ok(Value::Bool(!self.eval_equality(expr, l, r)?)),

            // --- Logical Operations ---
            Expression::And(l, r) => {
                if !self.bool_operand(expr, l)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.bool_operand(expr, r)?))
            }
            Expression::Or(l, r) => {
                if self.bool_operand(expr, l)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.bool_operand(expr, r)?))
            }
            Expression::Not(v) => Ok(Value::Bool(!self.bool_operand(expr, v)?)),

            // --- Leaves ---
            Expression::Literal(val) => Ok(*val),
            Expression::Variable(name) => self.store.get(name),
        }
    }

    fn eval_arithmetic<F>(
        &self,
        expr: &Expression,
        l: &Expression,
        r: &Expression,
        f: F,
    ) -> Result<Value, EvaluationError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let lv = self.number_operand(expr, l)?;
        let rv = self.number_operand(expr, r)?;
        Ok(Value::Number(f(lv, rv)))
    }

    fn eval_comparison<F>(
        &self,
        expr: &Expression,
        l: &Expression,
        r: &Expression,
        f: F,
    ) -> Result<Value, EvaluationError>
    where
        F: Fn(f64, f64) -> bool,
    {
        let lv = self.number_operand(expr, l)?;
        let rv = self.number_operand(expr, r)?;
        Ok(Value::Bool(f(lv, rv)))
    }

    fn eval_equality(
        &self,
        expr: &Expression,
        l: &Expression,
        r: &Expression,
    ) -> Result<bool, EvaluationError> {
        let lv = self.evaluate(l)?;
        let rv = self.evaluate(r)?;
        if lv.value_type() != rv.value_type() {
            return Err(type_mismatch(expr, lv.value_type(), rv));
        }
        Ok(lv == rv)
    }

    fn number_operand(&self, parent: &Expression, e: &Expression) -> Result<f64, EvaluationError> {
        let value = self.evaluate(e)?;
        value
            .as_number()
            .ok_or_else(|| type_mismatch(parent, ValueType::Number, value))
    }

    fn bool_operand(&self, parent: &Expression, e: &Expression) -> Result<bool, EvaluationError> {
        let value = self.evaluate(e)?;
        value
            .as_bool()
            .ok_or_else(|| type_mismatch(parent, ValueType::Bool, value))
    }
}

fn type_mismatch(expr: &Expression, expected: ValueType, found: Value) -> EvaluationError {
    EvaluationError::TypeMismatch {
        operation: expr.to_string(),
        expected,
        found,
    }
}
