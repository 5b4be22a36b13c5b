#![allow(clippy::result_large_err)] // Expression helpers return AppError so compile failures keep their code.

use crate::core::config::Condition;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use rhai::packages::{Package, StandardPackage};
use rhai::{Array, Dynamic, Engine, Map, Scope, AST};
use serde_json::{Map as JsonMap, Number, Value};

/// Predicate evaluation engine using a locked-down Rhai configuration.
///
/// Expressions see two variables: `form`, the whole submission as a map, and
/// `value`, the value of the field the predicate is attached to (`()` when the
/// field is absent).
pub struct ExpressionEngine {
    engine: Engine,
}

impl Default for ExpressionEngine {
    fn default() -> Self {
        let mut engine = Engine::new_raw();
        engine.register_global_module(StandardPackage::new().as_shared_module());
        engine.set_max_operations(50_000);
        engine.set_max_call_levels(64);
        engine.set_max_expr_depths(64, 64);
        engine.set_max_string_size(64 * 1024);
        engine.on_print(|_| {});
        engine.on_debug(|_, _, _| {});
        ExpressionEngine { engine }
    }
}

impl ExpressionEngine {
    /// Compile the given expression string into an AST.
    pub fn compile(&self, expr: &str) -> Result<AST, AppError> {
        self.engine.compile_expression(expr).map_err(|err| {
            AppError::new(
                ErrorCategory::ConfigurationError,
                format!("expression compile error in '{}': {}", expr, err),
            )
            .with_code("FR-EXPR-001")
        })
    }

    /// Evaluate `expr` with `form` and `value` bound in scope.
    pub fn evaluate(&self, expr: &str, form: &Value, value: Option<&Value>) -> Result<Value, AppError> {
        let mut scope = Scope::new();
        scope.push_dynamic("form", to_dynamic(form));
        scope.push_dynamic("value", value.map(to_dynamic).unwrap_or(Dynamic::UNIT));

        let result = self
            .engine
            .eval_expression_with_scope::<Dynamic>(&mut scope, expr)
            .map_err(|err| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    format!("expression execution error in '{}': {}", expr, err),
                )
                .with_code("FR-EXPR-002")
            })?;
        Ok(from_dynamic(result))
    }

    /// Evaluate a predicate condition to a boolean.
    pub fn check(
        &self,
        condition: &Condition,
        form: &Value,
        value: Option<&Value>,
    ) -> Result<bool, AppError> {
        match condition {
            Condition::Bool(flag) => Ok(*flag),
            Condition::Expr { expr } => {
                let evaluated = self.evaluate(expr, form, value)?;
                Ok(is_truthy(&evaluated))
            }
        }
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => {
            if let Some(i) = number.as_i64() {
                i != 0
            } else if let Some(u) = number.as_u64() {
                u != 0
            } else if let Some(f) = number.as_f64() {
                f != 0.0
            } else {
                false
            }
        }
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Null => Dynamic::UNIT,
        Value::Bool(b) => Dynamic::from(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Dynamic::from(i)
            } else if let Some(f) = n.as_f64() {
                Dynamic::from(f)
            } else {
                Dynamic::from(0_i64)
            }
        }
        Value::String(s) => Dynamic::from(s.clone()),
        Value::Array(items) => {
            let mut arr = Array::new();
            for item in items {
                arr.push(to_dynamic(item));
            }
            Dynamic::from_array(arr)
        }
        Value::Object(map) => {
            let mut rhai_map = Map::new();
            for (key, value) in map {
                rhai_map.insert(key.as_str().into(), to_dynamic(value));
            }
            Dynamic::from_map(rhai_map)
        }
    }
}

fn from_dynamic(value: Dynamic) -> Value {
    if value.is_unit() {
        return Value::Null;
    }
    if let Some(b) = value.clone().try_cast::<bool>() {
        return Value::Bool(b);
    }
    if let Some(i) = value.clone().try_cast::<i64>() {
        return Value::Number(Number::from(i));
    }
    if let Some(f) = value.clone().try_cast::<f64>() {
        if let Some(num) = Number::from_f64(f) {
            return Value::Number(num);
        }
    }
    if let Some(s) = value.clone().try_cast::<String>() {
        return Value::String(s);
    }
    if let Some(arr) = value.clone().try_cast::<Array>() {
        return Value::Array(arr.into_iter().map(from_dynamic).collect());
    }
    if let Some(map) = value.clone().try_cast::<Map>() {
        let mut json_map = JsonMap::new();
        for (key, value) in map {
            json_map.insert(key.to_string(), from_dynamic(value));
        }
        return Value::Object(json_map);
    }
    Value::Null
}
