use std::fmt::Display;

use thiserror::Error;

/// Errors related to application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting is present but unusable (e.g. a malformed URL).
    #[error("invalid value for `{key}`: {message}")]
    InvalidValue {
        /// Setting name as it appears in the config file.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// A numeric setting falls outside its allowed range.
    #[error("`{key}` = {value} is out of range ({min}..={max})")]
    OutOfRange {
        /// Setting name as it appears in the config file.
        key: String,
        /// The rejected value, rendered.
        value: String,
        /// Inclusive lower bound, rendered.
        min: String,
        /// Inclusive upper bound, rendered.
        max: String,
    },
}

/// Returns `value` unchanged if it lies in `min..=max`, otherwise an
/// [`ConfigError::OutOfRange`] naming `key`.
pub fn ensure_range<T>(key: &str, value: T, min: T, max: T) -> Result<T, ConfigError>
where
    T: PartialOrd + Display,
{
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key: key.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    Ok(value)
}

/// Shorthand for building a [`ConfigError::InvalidValue`].
pub fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}
