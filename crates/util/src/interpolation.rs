//! Environment interpolation for configuration values.
//!
//! Values may embed `${env:NAME}` placeholders which are replaced with the
//! named environment variable when the configuration is loaded.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

static ENV_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{env:([\w+_-]*)}").expect("valid env placeholder pattern"));

/// Errors that can occur during interpolation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    #[error("Missing environment variable: {name}")]
    MissingEnvVar { name: String },
}

/// Replaces every `${env:NAME}` placeholder in `value` with the variable's value.
///
/// Text without placeholders is returned unchanged. An unset variable is an error
/// rather than an empty substitution.
pub fn interpolate_env(value: &str) -> Result<String, InterpolationError> {
    interpolate_with(value, |name| std::env::var(name).ok())
}

/// Same as [`interpolate_env`] with a caller supplied variable lookup.
pub fn interpolate_with<F>(value: &str, lookup: F) -> Result<String, InterpolationError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = Vec::new();
    for cap in ENV_PLACEHOLDER.captures_iter(value) {
        let var_name = cap[1].to_string();
        let env_value = lookup(&var_name).ok_or_else(|| InterpolationError::MissingEnvVar { name: var_name.clone() })?;
        debug!("Interpolated env var: {} -> [REDACTED]", var_name);
        resolved.push((cap[0].to_string(), env_value));
    }

    let mut result = value.to_string();
    for (placeholder, env_value) in resolved {
        result = result.replace(&placeholder, &env_value);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "HOST" => Some("10.0.0.5".into()),
            "PORT" => Some("9001".into()),
            _ => None,
        }
    }

    #[test]
    fn replaces_all_placeholders() {
        let value = interpolate_with("http://${env:HOST}:${env:PORT}/invoke", lookup).unwrap();
        assert_eq!(value, "http://10.0.0.5:9001/invoke");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(interpolate_with("localhost:8080", lookup).unwrap(), "localhost:8080");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let error = interpolate_with("${env:NOPE}", lookup).unwrap_err();
        assert_eq!(error, InterpolationError::MissingEnvVar { name: "NOPE".into() });
    }

    #[test]
    fn reads_process_environment() {
        temp_env::with_var("LAMBDACHAIN_TEST_ADDR", Some("127.0.0.1:7000"), || {
            assert_eq!(interpolate_env("${env:LAMBDACHAIN_TEST_ADDR}").unwrap(), "127.0.0.1:7000");
        });
    }
}
