use crate::config::{
    ConfigError, ConfigSource, ConfigValidator, DatabaseSettings, LogLevelValidator, PortValidator, UrlValidator,
};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Configuration trait for application configuration
pub trait AppConfigTrait: Sized {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self, ConfigError>;

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError>;

    /// Get configuration source information for debugging
    fn config_sources(&self) -> HashMap<String, ConfigSource>;
}

/// Environment enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testing,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testing" | "test" => Ok(Environment::Testing),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue {
                field: "environment".to_string(),
                value: s.to_string(),
                expected: "development, testing, or production".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let env_str = match self {
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Production => "production",
        };
        write!(f, "{}", env_str)
    }
}

impl Environment {
    /// Check if environment is development
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    /// Check if environment is testing
    pub fn is_testing(&self) -> bool {
        matches!(self, Environment::Testing)
    }

    /// Check if environment is production
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

const ENV_KEYS: &[&str] = &["TABULA_ENV", "APP_ENV"];

/// Settings for the tabula toolkit
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    /// Backend used when a command gets no `--db`
    pub default_db: String,
    pub log_level: String,
    /// Root holding `migrations/`, `seeders/` and `factory/`
    pub database_dir: String,
    pub postgres: DatabaseSettings,
    pub mysql: DatabaseSettings,
    sources: HashMap<String, ConfigSource>,
}

impl AppConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self {
            environment: Environment::Development,
            default_db: "mysql".to_string(),
            log_level: "info".to_string(),
            database_dir: "database".to_string(),
            postgres: DatabaseSettings::postgres(),
            mysql: DatabaseSettings::mysql(),
            sources: HashMap::new(),
        }
    }

    /// Build configuration from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        match ENV_KEYS.iter().find_map(|key| get(key).map(|v| (*key, v))) {
            Some((key, value)) => {
                config.environment = value.parse()?;
                config.track(key, ConfigSource::EnvVar(key.to_string()));
            }
            None => config.track("TABULA_ENV", ConfigSource::Default(config.environment.to_string())),
        }

        for (key, slot) in [
            ("DEFAULT_DB_TYPE", &mut config.default_db),
            ("LOG_LEVEL", &mut config.log_level),
            ("DATABASE_DIR", &mut config.database_dir),
        ] {
            let source = match get(key) {
                Some(value) => {
                    *slot = value;
                    ConfigSource::EnvVar(key.to_string())
                }
                None => ConfigSource::Default(slot.clone()),
            };
            config.sources.insert(key.to_string(), source);
        }

        let mut sources = Vec::new();
        for settings in [&mut config.postgres, &mut config.mysql] {
            read_settings(settings, &get, &mut sources)?;
        }
        for (key, source) in sources {
            config.sources.insert(key, source);
        }

        tracing::debug!(
            environment = %config.environment,
            default_db = %config.default_db,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Settings for a backend name such as `pg` or `mysql`
    pub fn database(&self, kind: &str) -> Result<&DatabaseSettings, ConfigError> {
        match kind.trim().to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(&self.postgres),
            "mysql" => Ok(&self.mysql),
            _ => Err(ConfigError::invalid_value("db", kind, "pg or mysql")),
        }
    }

    fn track(&mut self, key: &str, source: ConfigSource) {
        self.sources.insert(key.to_string(), source);
    }
}

fn read_settings<F>(
    settings: &mut DatabaseSettings,
    get: &F,
    sources: &mut Vec<(String, ConfigSource)>,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = settings.env_prefix;
    let mut read = |field: &str| {
        let key = format!("{}_{}", prefix, field);
        let value = get(&key);
        if value.is_some() {
            sources.push((key.clone(), ConfigSource::EnvVar(key)));
        }
        value
    };

    settings.host = read("HOST");
    settings.user = read("USER");
    settings.password = read("PASSWORD");
    settings.database = read("DATABASE");
    settings.url_override = read("DATABASE_URL");

    if let Some(port) = read("PORT") {
        settings.port = port.trim().parse().map_err(|_| {
            ConfigError::invalid_value(format!("{}_PORT", prefix), port, "valid port number (1-65535)")
        })?;
    }
    Ok(())
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfigTrait for AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        LogLevelValidator.validate(&self.log_level)?;
        self.database(&self.default_db)?;

        if self.database_dir.trim().is_empty() {
            return Err(ConfigError::validation_failed("DATABASE_DIR must not be empty"));
        }

        let backends: [(&DatabaseSettings, &'static [&'static str]); 2] = [
            (&self.postgres, &["postgres", "postgresql"]),
            (&self.mysql, &["mysql"]),
        ];
        for (settings, schemes) in backends {
            PortValidator {
                field: settings.env_key("PORT"),
            }
            .validate(&settings.port)?;

            if let Some(url) = &settings.url_override {
                UrlValidator { schemes }.validate(url)?;
            }
        }

        // The default backend must be reachable with what we have
        self.database(&self.default_db)?.url()?;
        Ok(())
    }

    fn config_sources(&self) -> HashMap<String, ConfigSource> {
        self.sources.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("TEST".parse::<Environment>().unwrap(), Environment::Testing);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(|_| None).unwrap();

        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.default_db, "mysql");
        assert_eq!(config.database_dir, "database");
        assert_eq!(config.postgres.port, 5432);
        assert_eq!(config.mysql.port, 3306);
        assert!(config.config_sources()["DEFAULT_DB_TYPE"].is_default());
    }

    #[test]
    fn test_reads_backend_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("APP_ENV", "production"),
            ("DEFAULT_DB_TYPE", "pg"),
            ("PG_HOST", "db"),
            ("PG_PORT", "6543"),
            ("PG_USER", "app"),
            ("PG_DATABASE", "shop"),
        ]))
        .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.database("pg").unwrap().url().unwrap(), "postgres://app@db:6543/shop");
        assert!(config.config_sources()["PG_HOST"].is_env_var());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("MYSQL_PORT", "abc")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "MYSQL_PORT"));

        let config = AppConfig::from_lookup(lookup(&[("DEFAULT_DB_TYPE", "oracle")])).unwrap();
        assert!(config.validate().is_err());
        assert!(config.database("oracle").is_err());
    }

    #[test]
    fn test_validate_requires_default_backend_settings() {
        let config = AppConfig::from_lookup(lookup(&[("MYSQL_HOST", "localhost")])).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired { ref field, .. }) if field == "MYSQL_DATABASE"
        ));

        let config = AppConfig::from_lookup(lookup(&[(
            "MYSQL_DATABASE_URL",
            "mysql://root@localhost:3306/shop",
        )]))
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("TABULA_ENV", "testing");
        env::set_var("DATABASE_DIR", "db");

        let config = AppConfig::from_env().unwrap();
        assert!(config.environment.is_testing());
        assert_eq!(config.database_dir, "db");

        env::remove_var("TABULA_ENV");
        env::remove_var("DATABASE_DIR");
    }
}
