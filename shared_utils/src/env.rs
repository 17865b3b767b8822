use thiserror::Error;

/// An environment variable required by the application is not set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVarError(pub String);

/// Reads an environment variable, returning a structured error if it's missing.
///
/// A variable that is set but blank (only whitespace) counts as missing, so a
/// stray `FOO=` in a shell profile doesn't silently produce an empty value.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, MissingEnvVarError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MissingEnvVarError(name.to_string())),
    }
}

/// Optional variant of [`get_env_var`] for settings that only override a default.
pub fn env_override(name: &str) -> Option<String> {
    get_env_var(name).ok().map(|v| v.trim().to_string())
}
