use crate::ast::{Expression, Value, ValueType};
use crate::error::EvaluationError;
use ahash::AHashMap;

mod engine;

use engine::AstEngine;

/// Named numeric and boolean values visible to expressions during one run.
///
/// A fresh store is created for every execution. Assignments and measurement
/// retrievals write into it; edge predicates and operation arguments read from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableStore {
    values: AHashMap<String, Value>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Result<Value, EvaluationError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| EvaluationError::UndefinedVariable(name.to_string()))
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Evaluates `expr` against the current contents of the store.
    pub fn evaluate(&self, expr: &Expression) -> Result<Value, EvaluationError> {
        AstEngine::new(self).evaluate(expr)
    }

    pub fn evaluate_number(&self, expr: &Expression) -> Result<f64, EvaluationError> {
        let value = self.evaluate(expr)?;
        value.as_number().ok_or_else(|| EvaluationError::TypeMismatch {
            operation: expr.to_string(),
            expected: ValueType::Number,
            found: value,
        })
    }

    pub fn evaluate_bool(&self, expr: &Expression) -> Result<bool, EvaluationError> {
        let value = self.evaluate(expr)?;
        value.as_bool().ok_or_else(|| EvaluationError::TypeMismatch {
            operation: expr.to_string(),
            expected: ValueType::Bool,
            found: value,
        })
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for VariableStore {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
