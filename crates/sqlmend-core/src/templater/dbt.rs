//! dbt builtin macro stubs.
//!
//! Just enough of dbt's Jinja surface to render models into lintable SQL
//! without a dbt project:
//!
//! - `ref('model')` / `ref('package', 'model')` render the (qualified) model name
//! - `source('schema', 'table')` renders `schema.table`
//! - `config(...)` renders nothing
//! - `var('name')` / `var('name', default)` read `context["vars"]`, falling back
//!   to the default or the variable name
//! - `env_var(...)` reads `context["env_vars"]` only, never the process environment
//! - `is_incremental()` and `execute` are always false
//! - `this` renders `context["model_name"]` when given

use minijinja::{Environment, Error, ErrorKind, Value};
use std::collections::HashMap;

pub(crate) fn register_dbt_builtins(
    env: &mut Environment<'_>,
    context: &HashMap<String, serde_json::Value>,
) {
    env.add_function("ref", |args: &[Value]| -> Result<Value, Error> {
        match args {
            [model] => Ok(Value::from(string_arg(model, "model"))),
            [package, model] => Ok(Value::from(format!(
                "{}.{}",
                string_arg(package, "package"),
                string_arg(model, "model")
            ))),
            _ => Err(Error::new(
                ErrorKind::InvalidOperation,
                "ref() expects 1 or 2 arguments",
            )),
        }
    });

    env.add_function("source", |schema: Value, table: Value| -> Value {
        Value::from(format!(
            "{}.{}",
            string_arg(&schema, "schema"),
            string_arg(&table, "table")
        ))
    });

    env.add_function("config", |_args: &[Value]| -> Value { Value::from("") });
    env.add_function("is_incremental", || -> Value { Value::from(false) });
    env.add_global("execute", Value::from(false));

    let vars = lookup_table(context, "vars");
    env.add_function("var", move |args: &[Value]| -> Result<Value, Error> {
        lookup(&vars, args, "var", |name| name.to_string())
    });

    let env_vars = lookup_table(context, "env_vars");
    env.add_function("env_var", move |args: &[Value]| -> Result<Value, Error> {
        lookup(&env_vars, args, "env_var", |name| format!("__ENV_VAR_{name}__"))
    });

    if let Some(model) = context.get("model_name").and_then(serde_json::Value::as_str) {
        env.add_global("this", Value::from(model.to_string()));
    }
}

fn string_arg(value: &Value, fallback: &str) -> String {
    value.as_str().unwrap_or(fallback).to_string()
}

fn lookup_table(context: &HashMap<String, serde_json::Value>, key: &str) -> HashMap<String, Value> {
    match context.get(key) {
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(name, value)| (name.clone(), Value::from_serialize(value)))
            .collect(),
        _ => HashMap::new(),
    }
}

/// Shared body of `var()` and `env_var()`: one-argument calls fall back to
/// `missing(name)`, two-argument calls to the given default.
fn lookup(
    table: &HashMap<String, Value>,
    args: &[Value],
    function: &str,
    missing: impl Fn(&str) -> String,
) -> Result<Value, Error> {
    match args {
        [name] => {
            let name = name.as_str().unwrap_or_default();
            Ok(table
                .get(name)
                .cloned()
                .unwrap_or_else(|| Value::from(missing(name))))
        }
        [name, default] => {
            let name = name.as_str().unwrap_or_default();
            Ok(table.get(name).cloned().unwrap_or_else(|| default.clone()))
        }
        _ => Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("{function}() expects 1 or 2 arguments"),
        )),
    }
}
