use super::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean and arithmetic expressions over the named variables of a protocol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expression {
    // Arithmetic
    Sum(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),

    // Logical
    Not(Box<Expression>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),

    // Comparison
    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),
    SmallerThan(Box<Expression>, Box<Expression>),
    SmallerThanOrEqual(Box<Expression>, Box<Expression>),

    // Leaf nodes
    Literal(Value),
    Variable(String),
}

impl Expression {
    pub fn number(n: f64) -> Self {
        Expression::Literal(Value::Number(n))
    }

    pub fn boolean(b: bool) -> Self {
        Expression::Literal(Value::Bool(b))
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    pub fn plus(self, rhs: Expression) -> Self {
        Expression::Sum(Box::new(self), Box::new(rhs))
    }

    pub fn minus(self, rhs: Expression) -> Self {
        Expression::Subtract(Box::new(self), Box::new(rhs))
    }

    pub fn times(self, rhs: Expression) -> Self {
        Expression::Multiply(Box::new(self), Box::new(rhs))
    }

    pub fn divided_by(self, rhs: Expression) -> Self {
        Expression::Divide(Box::new(self), Box::new(rhs))
    }

    pub fn and(self, rhs: Expression) -> Self {
        Expression::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Expression) -> Self {
        Expression::Or(Box::new(self), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expression::Not(Box::new(self))
    }

    pub fn equals(self, rhs: Expression) -> Self {
        Expression::Equal(Box::new(self), Box::new(rhs))
    }

    pub fn not_equals(self, rhs: Expression) -> Self {
        Expression::NotEqual(Box::new(self), Box::new(rhs))
    }

    pub fn greater_than(self, rhs: Expression) -> Self {
        Expression::GreaterThan(Box::new(self), Box::new(rhs))
    }

    pub fn greater_or_equal(self, rhs: Expression) -> Self {
        Expression::GreaterThanOrEqual(Box::new(self), Box::new(rhs))
    }

    pub fn less_than(self, rhs: Expression) -> Self {
        Expression::SmallerThan(Box::new(self), Box::new(rhs))
    }

    pub fn less_or_equal(self, rhs: Expression) -> Self {
        Expression::SmallerThanOrEqual(Box::new(self), Box::new(rhs))
    }

    /// Conjunction of the negations of `conditions`; `true` when the list is empty.
    pub fn none_of<'a>(conditions: impl IntoIterator<Item = &'a Expression>) -> Self {
        conditions
            .into_iter()
            .map(|c| c.clone().not())
            .reduce(Expression::and)
            .unwrap_or(Expression::boolean(true))
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Expression::Or(..) => 1,
            Expression::And(..) => 2,
            Expression::Equal(..) | Expression::NotEqual(..) => 3,
            Expression::GreaterThan(..)
            | Expression::GreaterThanOrEqual(..)
            | Expression::SmallerThan(..)
            | Expression::SmallerThanOrEqual(..) => 4,
            Expression::Sum(..) | Expression::Subtract(..) => 5,
            Expression::Multiply(..) | Expression::Divide(..) => 6,
            Expression::Not(_) => 7,
            Expression::Literal(_) | Expression::Variable(_) => 8,
        }
    }

    fn binary_parts(&self) -> Option<(&Expression, &'static str, &Expression)> {
        let parts = match self {
            Expression::Sum(l, r) => (l, "+", r),
            Expression::Subtract(l, r) => (l, "-", r),
            Expression::Multiply(l, r) => (l, "*", r),
            Expression::Divide(l, r) => (l, "/", r),
            Expression::And(l, r) => (l, "and", r),
            Expression::Or(l, r) => (l, "or", r),
            Expression::Equal(l, r) => (l, "==", r),
            Expression::NotEqual(l, r) => (l, "!=", r),
            Expression::GreaterThan(l, r) => (l, ">", r),
            Expression::GreaterThanOrEqual(l, r) => (l, ">=", r),
            Expression::SmallerThan(l, r) => (l, "<", r),
            Expression::SmallerThanOrEqual(l, r) => (l, "<=", r),
            Expression::Not(_) | Expression::Literal(_) | Expression::Variable(_) => return None,
        };
        Some((parts.0.as_ref(), parts.1, parts.2.as_ref()))
    }

    /// Formats the expression, adding parentheses only when necessary.
    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        let current = self.precedence();
        let needs_parens = current < parent;
        if needs_parens {
            write!(f, "(")?;
        }
        match self {
            Expression::Literal(v) => write!(f, "{}", v)?,
            Expression::Variable(name) => write!(f, "{}", name)?,
            Expression::Not(v) => {
                write!(f, "not ")?;
                v.fmt_with_precedence(f, current)?;
            }
            _ => {
                if let Some((l, symbol, r)) = self.binary_parts() {
                    l.fmt_with_precedence(f, current)?;
                    write!(f, " {} ", symbol)?;
                    // Operators are left-associative: an equal-precedence right child keeps
                    // its parentheses.
                    r.fmt_with_precedence(f, current + 1)?;
                }
            }
        }
        if needs_parens {
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_precedence(f, 0)
    }
}

impl From<f64> for Expression {
    fn from(n: f64) -> Self {
        Expression::number(n)
    }
}

impl From<bool> for Expression {
    fn from(b: bool) -> Self {
        Expression::boolean(b)
    }
}
