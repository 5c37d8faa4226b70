use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Invalid database URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Port number validator
pub struct PortValidator {
    pub field: String,
}

impl ConfigValidator<u16> for PortValidator {
    fn validate(&self, value: &u16) -> Result<(), ConfigError> {
        if *value == 0 {
            return Err(ConfigError::invalid_value(
                self.field.clone(),
                value.to_string(),
                "port between 1 and 65535",
            ));
        }
        Ok(())
    }
}

/// Database URL validator
pub struct UrlValidator {
    pub schemes: &'static [&'static str],
}

impl ConfigValidator<String> for UrlValidator {
    fn validate(&self, value: &String) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
            url: value.clone(),
            message: e.to_string(),
        })?;

        if !self.schemes.contains(&parsed.scheme()) {
            return Err(ConfigError::InvalidUrl {
                url: value.clone(),
                message: format!("scheme must be one of: {}", self.schemes.join(", ")),
            });
        }
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(ConfigError::InvalidUrl {
                url: value.clone(),
                message: "missing host".to_string(),
            });
        }
        Ok(())
    }
}

/// Log level validator
pub struct LogLevelValidator;

impl ConfigValidator<String> for LogLevelValidator {
    fn validate(&self, value: &String) -> Result<(), ConfigError> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&value.to_lowercase().as_str()) {
            return Err(ConfigError::invalid_value(
                "log_level",
                value.clone(),
                format!("one of: {}", valid_levels.join(", ")),
            ));
        }
        Ok(())
    }
}
