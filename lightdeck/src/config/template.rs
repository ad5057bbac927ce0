use crate::error::{Error, Result};
use crate::utils::describe_chain;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

const ENV_FUNCTIONS: [&str; 2] = ["must_env(", "get_env("];

/// Where an expanded value lands. JSON documents get the value escaped for
/// use inside a string literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Json,
    Yaml,
}

/// Expands environment lookups in a configuration document before it is
/// parsed.
///
/// Only `{{ get_env(name=.., default=..) }}` and `{{ must_env(name=..) }}`
/// are evaluated, each through tera. `must_env` fails the load when the
/// variable is unset. Any other brace text is kept as written.
pub fn render_with_env(source: &str, origin: &str, syntax: Syntax) -> Result<String> {
    let mut tera = Tera::default();
    tera.register_function("must_env", must_env);

    let mut rendered = String::with_capacity(source.len());
    let mut rest = source;
    while let Some(start) = rest.find("{{") {
        let inner = &rest[start + 2..];
        let end = match inner.find("}}") {
            Some(end) => end,
            None => break,
        };
        rendered.push_str(&rest[..start]);

        let expression = inner[..end].trim();
        if ENV_FUNCTIONS.iter().any(|function| expression.starts_with(function)) {
            let template = format!("{{{{ {} }}}}", expression);
            let value = tera
                .render_str(&template, &Context::new())
                .map_err(|e| load_error(origin, describe_chain(&e)))?;
            rendered.push_str(&escape(&value, syntax, origin)?);
        } else {
            rendered.push_str(&rest[start..start + 2 + end + 2]);
        }
        rest = &inner[end + 2..];
    }
    rendered.push_str(rest);
    Ok(rendered)
}

fn load_error(origin: &str, reason: String) -> Error {
    Error::ConfigLoad {
        path: origin.to_string(),
        reason,
    }
}

fn escape(value: &str, syntax: Syntax, origin: &str) -> Result<String> {
    match syntax {
        Syntax::Yaml => Ok(value.to_string()),
        Syntax::Json => {
            let quoted = serde_json::to_string(value).map_err(|e| load_error(origin, e.to_string()))?;
            Ok(quoted[1..quoted.len() - 1].to_string())
        }
    }
}

fn must_env(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let name = match args.get("name").and_then(Value::as_str) {
        Some(name) => name,
        None => return Err(tera::Error::msg("must_env requires a `name` argument")),
    };
    match std::env::var(name) {
        Ok(value) => Ok(Value::String(value)),
        Err(_) => Err(tera::Error::msg(format!(
            "environment variable {} is not defined",
            name
        ))),
    }
}
