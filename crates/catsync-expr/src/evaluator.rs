//! Rhai-backed expression programs.

use catsync_core::Record;
use rhai::{Dynamic, Engine, Scope, AST};
use serde_json::Value;

use crate::error::ExprError;

// Sandbox limits: expressions are one-liners over a single record, so these
// are generous while still bounding a pathological config.
const MAX_OPERATIONS: u64 = 100_000;
const MAX_CALL_DEPTH: usize = 32;
const MAX_STRING_SIZE: usize = 65_536;
const MAX_ARRAY_SIZE: usize = 10_000;
const MAX_MAP_SIZE: usize = 10_000;

/// A compiled expression, reusable across many records.
#[derive(Debug, Clone)]
pub struct Program {
    source: String,
    ast: AST,
}

impl Program {
    /// The original expression text, for diagnostics.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Compiles and evaluates expression programs against records.
///
/// Evaluation is deterministic and side-effect free: the engine is sandboxed
/// with no IO, no time or randomness, and hard resource limits.
pub struct Evaluator {
    engine: Engine,
}

impl Evaluator {
    pub fn new() -> Self {
        let mut engine = Engine::new();

        engine.set_max_operations(MAX_OPERATIONS);
        engine.set_max_call_levels(MAX_CALL_DEPTH);
        engine.set_max_string_size(MAX_STRING_SIZE);
        engine.set_max_array_size(MAX_ARRAY_SIZE);
        engine.set_max_map_size(MAX_MAP_SIZE);

        Self { engine }
    }

    /// Compile an expression into a reusable [`Program`].
    pub fn compile(&self, expr: &str) -> Result<Program, ExprError> {
        let ast = self.engine.compile(expr).map_err(|e| ExprError::Compile {
            expr: expr.to_string(),
            message: e.to_string(),
        })?;

        Ok(Program {
            source: expr.to_string(),
            ast,
        })
    }

    /// Evaluate a program against a record, yielding a JSON value.
    ///
    /// Record fields are pushed into scope as variables; the full record is
    /// also available as `record`. A unit result maps to `null`.
    pub fn eval(
        &self,
        program: &Program,
        record: &Record,
        origin: &str,
    ) -> Result<Value, ExprError> {
        let mut scope = Scope::new();
        for (key, value) in record {
            let dynamic = to_dynamic(program, origin, value)?;
            scope.push_dynamic(key.as_str(), dynamic);
        }
        let whole = Value::Object(record.clone());
        scope.push_constant_dynamic("record", to_dynamic(program, origin, &whole)?);

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, &program.ast)
            .map_err(|e| ExprError::Eval {
                expr: program.source.clone(),
                origin: origin.to_string(),
                message: e.to_string(),
            })?;

        if result.is_unit() {
            return Ok(Value::Null);
        }

        rhai::serde::from_dynamic(&result).map_err(|e| ExprError::Eval {
            expr: program.source.clone(),
            origin: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Evaluate to a boolean; anything else is a type mismatch.
    pub fn eval_bool(
        &self,
        program: &Program,
        record: &Record,
        origin: &str,
    ) -> Result<bool, ExprError> {
        match self.eval(program, record, origin)? {
            Value::Bool(b) => Ok(b),
            other => Err(self.type_mismatch(program, origin, "bool", &other)),
        }
    }

    /// Evaluate to a string. Scalars coerce (numbers and booleans render as
    /// text); lists and objects do not.
    pub fn eval_string(
        &self,
        program: &Program,
        record: &Record,
        origin: &str,
    ) -> Result<String, ExprError> {
        match self.eval(program, record, origin)? {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(self.type_mismatch(program, origin, "string", &other)),
        }
    }

    /// Evaluate to an integer.
    pub fn eval_int(
        &self,
        program: &Program,
        record: &Record,
        origin: &str,
    ) -> Result<i64, ExprError> {
        match self.eval(program, record, origin)? {
            Value::Number(n) => n.as_i64().ok_or_else(|| ExprError::TypeMismatch {
                expr: program.source.clone(),
                origin: origin.to_string(),
                expected: "integer",
                actual: format!("number {n}"),
            }),
            other => Err(self.type_mismatch(program, origin, "integer", &other)),
        }
    }

    /// Evaluate to a list of values; a non-array result is a type mismatch.
    pub fn eval_list(
        &self,
        program: &Program,
        record: &Record,
        origin: &str,
    ) -> Result<Vec<Value>, ExprError> {
        match self.eval(program, record, origin)? {
            Value::Array(items) => Ok(items),
            other => Err(self.type_mismatch(program, origin, "list", &other)),
        }
    }

    fn type_mismatch(
        &self,
        program: &Program,
        origin: &str,
        expected: &'static str,
        actual: &Value,
    ) -> ExprError {
        ExprError::TypeMismatch {
            expr: program.source.clone(),
            origin: origin.to_string(),
            expected,
            actual: json_type_name(actual).to_string(),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn to_dynamic(program: &Program, origin: &str, value: &Value) -> Result<Dynamic, ExprError> {
    rhai::serde::to_dynamic(value).map_err(|e| ExprError::Eval {
        expr: program.source.clone(),
        origin: origin.to_string(),
        message: e.to_string(),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
