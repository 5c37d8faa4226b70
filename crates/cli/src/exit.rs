use tabula_core::ConfigError;
use tabula_orm::OrmError;

pub const SUCCESS: u8 = 0;
pub const RUNTIME_FAILURE: u8 = 1;
pub const INVALID_INPUT: u8 = 2;
pub const UNAVAILABLE: u8 = 3;

/// Process exit code for a failed command
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<OrmError>() {
        return match err {
            OrmError::InvalidDocument(_) | OrmError::MissingOperator(_) => INVALID_INPUT,
            OrmError::ConnectionUnavailable(_) | OrmError::UnsupportedDialect(_) => UNAVAILABLE,
            _ => RUNTIME_FAILURE,
        };
    }
    if err.downcast_ref::<ConfigError>().is_some() {
        return INVALID_INPUT;
    }
    RUNTIME_FAILURE
}
