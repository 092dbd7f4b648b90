use crate::ast::{Expression, Value, ValueType};
use crate::error::TranslationError;
use crate::evaluator::VariableStore;
use crate::protocol::Statement;
use ahash::{AHashMap, AHashSet};

/// What the translator knows about names while walking a description in order.
#[derive(Debug, Default)]
pub(super) struct Scope {
    containers: AHashSet<String>,
    variables: AHashMap<String, ValueType>,
    /// Variables whose value is fixed before execution starts.
    constants: VariableStore,
}

impl Scope {
    pub(super) fn declare_container(&mut self, name: &str) -> Result<(), TranslationError> {
        if !self.containers.insert(name.to_string()) {
            return Err(TranslationError::Structural(format!(
                "container '{}' is declared twice",
                name
            )));
        }
        Ok(())
    }

    pub(super) fn require_container(&self, name: &str) -> Result<(), TranslationError> {
        if self.containers.contains(name) {
            Ok(())
        } else {
            Err(TranslationError::UndefinedContainer(name.to_string()))
        }
    }

    pub(super) fn define(&mut self, name: &str, value_type: ValueType) {
        self.variables.insert(name.to_string(), value_type);
    }

    /// Records the value of a top-level assignment when it can be computed now.
    pub(super) fn assign_constant(&mut self, name: &str, value: &Expression) {
        match self.fold(value) {
            Some(folded) => self.constants.set(name, folded),
            None => {
                self.constants.remove(name);
            }
        }
    }

    pub(super) fn forget_constant(&mut self, name: &str) {
        self.constants.remove(name);
    }

    pub(super) fn constants(&self) -> &VariableStore {
        &self.constants
    }

    pub(super) fn fold(&self, expr: &Expression) -> Option<Value> {
        self.constants.evaluate(expr).ok()
    }

    /// Checks that `expr` is well formed and has the `expected` type.
    pub(super) fn check(
        &self,
        expr: &Expression,
        expected: ValueType,
        context: &str,
    ) -> Result<(), TranslationError> {
        let found = self.infer(expr, context)?;
        if found != expected {
            return Err(malformed(
                expr,
                format!("{} must be {}, found {}", context, expected, found),
            ));
        }
        Ok(())
    }

    /// Infers the static type of `expr`, rejecting undefined variables and operand mismatches.
    pub(super) fn infer(
        &self,
        expr: &Expression,
        context: &str,
    ) -> Result<ValueType, TranslationError> {
        let operands = |l: &Expression,
                        r: &Expression,
                        wanted: ValueType,
                        op: &str|
         -> Result<(), TranslationError> {
            let lt = self.infer(l, context)?;
            let rt = self.infer(r, context)?;
            if lt != wanted || rt != wanted {
                return Err(malformed(
                    expr,
                    format!("'{}' needs {} operands, found {} and {}", op, wanted, lt, rt),
                ));
            }
            Ok(())
        };

        match expr {
            Expression::Literal(value) => Ok(value.value_type()),
            Expression::Variable(name) => self.variables.get(name).copied().ok_or_else(|| {
                TranslationError::UndefinedVariable {
                    variable: name.clone(),
                    context: context.to_string(),
                }
            }),
            Expression::Sum(l, r) => {
                operands(l, r, ValueType::Number, "+").map(|_| ValueType::Number)
            }
            Expression::Subtract(l, r) => {
                operands(l, r, ValueType::Number, "-").map(|_| ValueType::Number)
            }
            Expression::Multiply(l, r) => {
                operands(l, r, ValueType::Number, "*").map(|_| ValueType::Number)
            }
            Expression::Divide(l, r) => {
                operands(l, r, ValueType::Number, "/").map(|_| ValueType::Number)
            }
            Expression::GreaterThan(l, r) => {
                operands(l, r, ValueType::Number, ">").map(|_| ValueType::Bool)
            }
            Expression::GreaterThanOrEqual(l, r) => {
                operands(l, r, ValueType::Number, ">=").map(|_| ValueType::Bool)
            }
            Expression::SmallerThan(l, r) => {
                operands(l, r, ValueType::Number, "<").map(|_| ValueType::Bool)
            }
            Expression::SmallerThanOrEqual(l, r) => {
                operands(l, r, ValueType::Number, "<=").map(|_| ValueType::Bool)
            }
            Expression::And(l, r) => {
                operands(l, r, ValueType::Bool, "and").map(|_| ValueType::Bool)
            }
            Expression::Or(l, r) => operands(l, r, ValueType::Bool, "or").map(|_| ValueType::Bool),
            Expression::Not(v) => match self.infer(v, context)? {
                ValueType::Bool => Ok(ValueType::Bool),
                other => Err(malformed(
                    expr,
                    format!("'not' needs a Bool operand, found {}", other),
                )),
            },
            Expression::Equal(l, r) | Expression::NotEqual(l, r) => {
                let lt = self.infer(l, context)?;
                let rt = self.infer(r, context)?;
                if lt != rt {
                    return Err(malformed(
                        expr,
                        format!("cannot compare {} with {}", lt, rt),
                    ));
                }
                Ok(ValueType::Bool)
            }
        }
    }
}

/// Every variable a block may write, including nested blocks and measurement bindings.
pub(super) fn written_variables(block: &[Statement]) -> Vec<&str> {
    let mut names = Vec::new();
    collect_written(block, &mut names);
    names
}

fn collect_written<'a>(block: &'a [Statement], names: &mut Vec<&'a str>) {
    for statement in block {
        match statement {
            Statement::Assign { variable, .. } => names.push(variable),
            Statement::Operation { primitive, .. } => names.extend(primitive.binding()),
            Statement::If {
                clauses, otherwise, ..
            } => {
                for clause in clauses {
                    collect_written(&clause.body, names);
                }
                if let Some(body) = otherwise {
                    collect_written(body, names);
                }
            }
            Statement::While { body, .. } => collect_written(body, names),
            Statement::Thermocycling { .. } => {}
        }
    }
}

fn malformed(expr: &Expression, reason: String) -> TranslationError {
    TranslationError::MalformedExpression {
        expression: expr.to_string(),
        reason,
    }
}
