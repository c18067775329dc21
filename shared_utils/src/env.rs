use thiserror::Error;

/// Errors raised while resolving settings from the process environment.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// A variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    Missing(String),

    /// The variable is set but holds nothing but whitespace.
    #[error("Environment variable {0} is empty")]
    Empty(String),
}

/// Reads an environment variable, returning a structured error if it's missing
/// or blank. Surrounding whitespace is trimmed from the returned value.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn require_env(name: &str) -> Result<String, EnvError> {
    let raw = std::env::var(name).map_err(|_| EnvError::Missing(name.to_string()))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvError::Empty(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Prefers an explicit value (e.g. from a config file) and falls back to the
/// environment variable `name` when the explicit value is absent or blank.
pub fn explicit_or_env(explicit: Option<&str>, name: &str) -> Result<String, EnvError> {
    match explicit.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => require_env(name),
    }
}
