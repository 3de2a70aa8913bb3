//! MiniJinja wrapper for template rendering.

use super::error::TemplateError;
use minijinja::{Environment, Value};
use std::collections::{HashMap, HashSet};

/// Lower than MiniJinja's default of 500; SQL templates never nest deeply.
const RECURSION_LIMIT: usize = 100;

/// Upper bound on distinct unknown macros stubbed while rendering dbt.
const MAX_STUBBED_MACROS: usize = 50;

/// Renders a plain Jinja template. Undefined variables are errors.
pub(crate) fn render_jinja(
    template: &str,
    context: &HashMap<String, serde_json::Value>,
) -> Result<String, TemplateError> {
    let mut env = base_environment(minijinja::UndefinedBehavior::Strict);
    env.add_template("sql", template)?;
    let rendered = env.get_template("sql")?.render(Value::from_serialize(context))?;
    Ok(rendered)
}

/// Renders a template with dbt builtins available.
///
/// Unknown project macros are stubbed one at a time and the render retried,
/// so templates that call macros we do not know still produce lintable SQL.
pub(crate) fn render_dbt(
    template: &str,
    context: &HashMap<String, serde_json::Value>,
) -> Result<String, TemplateError> {
    let mut stubbed: HashSet<String> = HashSet::new();
    while stubbed.len() <= MAX_STUBBED_MACROS {
        let mut env = base_environment(minijinja::UndefinedBehavior::Lenient);
        super::dbt::register_dbt_builtins(&mut env, context);
        for name in &stubbed {
            register_passthrough_function(&mut env, name);
        }
        env.add_template("sql", template)?;

        match env.get_template("sql")?.render(Value::from_serialize(context)) {
            Ok(rendered) => {
                #[cfg(feature = "tracing")]
                if !stubbed.is_empty() {
                    tracing::debug!(stubbed = ?stubbed, "template rendered with stubbed macros");
                }
                return Ok(rendered);
            }
            Err(err) => match extract_unknown_function(&err) {
                Some(name) if !stubbed.contains(&name) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(function = %name, "stubbing unknown dbt macro");
                    stubbed.insert(name);
                }
                _ => return Err(TemplateError::RenderError(err.to_string())),
            },
        }
    }
    Err(TemplateError::RenderError(format!(
        "too many unknown macros in template (limit: {MAX_STUBBED_MACROS})"
    )))
}

fn base_environment<'source>(undefined: minijinja::UndefinedBehavior) -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(undefined);
    env.set_recursion_limit(RECURSION_LIMIT);
    env.set_keep_trailing_newline(true);
    env
}

/// Unknown macros render as their first string argument, or as a
/// `__name__` placeholder identifier when called without one.
fn register_passthrough_function(env: &mut Environment<'_>, name: &str) {
    let placeholder = format!("__{name}__");
    env.add_function(name.to_string(), move |args: &[Value]| -> Value {
        match args.first().and_then(Value::as_str) {
            Some(first) => Value::from(first),
            None => Value::from(placeholder.clone()),
        }
    });
}

/// Name of the function an `UnknownFunction` error refers to.
fn extract_unknown_function(err: &minijinja::Error) -> Option<String> {
    const PREFIX: &str = "unknown function: ";
    const SUFFIX: &str = " is unknown";

    if err.kind() != minijinja::ErrorKind::UnknownFunction {
        return None;
    }
    let message = err.to_string();
    let start = message.find(PREFIX)? + PREFIX.len();
    let rest = &message[start..];
    let name = &rest[..rest.find(SUFFIX)?];
    let valid = !name.is_empty()
        && name.len() <= 100
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    valid.then(|| name.to_string())
}
