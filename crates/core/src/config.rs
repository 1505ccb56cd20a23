use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roles::{RoleHierarchy, RoleLevel};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub roles: RolesConfig,
    pub notifier: NotifierConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// The injected role hierarchy. Explicit configuration rather than a
/// compiled-in constant map, so role sets stay testable and replaceable.
#[derive(Clone, Debug)]
pub struct RolesConfig {
    pub levels: Vec<RoleLevel>,
    pub min_approver_level: u8,
}

impl RolesConfig {
    pub fn hierarchy(&self) -> RoleHierarchy {
        RoleHierarchy::new(self.levels.clone())
            .with_min_approver_level(self.min_approver_level)
    }
}

#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Option<SecretString>,
    pub from_address: String,
    pub approvals_inbox: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://assetflow.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            roles: RolesConfig {
                levels: vec![
                    RoleLevel::new("employee", 0),
                    RoleLevel::new("supervisor", 1),
                    RoleLevel::new("admin", 2),
                    RoleLevel::new("super_admin", 3),
                ],
                min_approver_level: 1,
            },
            notifier: NotifierConfig {
                enabled: false,
                api_url: "https://api.resend.com/emails".to_string(),
                api_key: None,
                from_address: "Assetflow <onboarding@resend.dev>".to_string(),
                approvals_inbox: "approvals@example.com".to_string(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
    roles: Option<RolesPatch>,
    notifier: Option<NotifierPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct RolesPatch {
    levels: Option<Vec<RoleLevel>>,
    min_approver_level: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifierPatch {
    enabled: Option<bool>,
    api_url: Option<String>,
    api_key: Option<String>,
    from_address: Option<String>,
    approvals_inbox: Option<String>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("assetflow.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(roles) = patch.roles {
            if let Some(levels) = roles.levels {
                self.roles.levels = levels;
            }
            if let Some(min_approver_level) = roles.min_approver_level {
                self.roles.min_approver_level = min_approver_level;
            }
        }

        if let Some(notifier) = patch.notifier {
            if let Some(enabled) = notifier.enabled {
                self.notifier.enabled = enabled;
            }
            if let Some(api_url) = notifier.api_url {
                self.notifier.api_url = api_url;
            }
            if let Some(api_key) = notifier.api_key {
                self.notifier.api_key = Some(api_key.into());
            }
            if let Some(from_address) = notifier.from_address {
                self.notifier.from_address = from_address;
            }
            if let Some(approvals_inbox) = notifier.approvals_inbox {
                self.notifier.approvals_inbox = approvals_inbox;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ASSETFLOW_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ASSETFLOW_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("ASSETFLOW_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ASSETFLOW_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ASSETFLOW_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ASSETFLOW_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("ASSETFLOW_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("ASSETFLOW_MIN_APPROVER_LEVEL") {
            self.roles.min_approver_level = parse_u8("ASSETFLOW_MIN_APPROVER_LEVEL", &value)?;
        }

        if let Some(value) = read_env("ASSETFLOW_NOTIFIER_ENABLED") {
            self.notifier.enabled = parse_bool("ASSETFLOW_NOTIFIER_ENABLED", &value)?;
        }
        if let Some(value) = read_env("ASSETFLOW_NOTIFIER_API_URL") {
            self.notifier.api_url = value;
        }
        if let Some(value) = read_env("ASSETFLOW_NOTIFIER_API_KEY") {
            self.notifier.api_key = Some(value.into());
        }
        if let Some(value) = read_env("ASSETFLOW_NOTIFIER_FROM_ADDRESS") {
            self.notifier.from_address = value;
        }
        if let Some(value) = read_env("ASSETFLOW_APPROVALS_INBOX") {
            self.notifier.approvals_inbox = value;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        validate_roles(&self.roles)?;
        validate_notifier(&self.notifier)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("assetflow.toml"), PathBuf::from("config/assetflow.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
    let level = logging.level.trim().to_ascii_lowercase();
    if !LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::Validation(format!(
            "logging.level must be one of trace|debug|info|warn|error, got `{}`",
            logging.level
        )));
    }

    Ok(())
}

fn validate_roles(roles: &RolesConfig) -> Result<(), ConfigError> {
    if roles.levels.is_empty() {
        return Err(ConfigError::Validation(
            "roles.levels must declare at least one role".to_string(),
        ));
    }

    let mut names: Vec<&str> = roles.levels.iter().map(|role| role.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    if names.len() != roles.levels.len() {
        return Err(ConfigError::Validation("roles.levels contains duplicate names".to_string()));
    }

    Ok(())
}

fn validate_notifier(notifier: &NotifierConfig) -> Result<(), ConfigError> {
    if !notifier.enabled {
        return Ok(());
    }

    if notifier.api_key.is_none() {
        return Err(ConfigError::Validation(
            "notifier.api_key is required when the notifier is enabled".to_string(),
        ));
    }
    if notifier.from_address.trim().is_empty() {
        return Err(ConfigError::Validation("notifier.from_address must not be empty".to_string()));
    }
    if notifier.approvals_inbox.trim().is_empty() {
        return Err(ConfigError::Validation(
            "notifier.approvals_inbox must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_u8(key: &str, value: &str) -> Result<u8, ConfigError> {
    value.parse::<u8>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        config.validate().expect("defaults must be valid");
        assert_eq!(config.roles.min_approver_level, 1);
    }

    #[test]
    fn overrides_take_precedence() {
        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                log_level: Some("debug".to_string()),
            },
            ..LoadOptions::default()
        })
        .expect("load with overrides");

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn file_patch_is_applied() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            file,
            "[database]\nurl = \"sqlite://custom.db\"\n\n[logging]\nformat = \"json\"\n\n[roles]\nmin_approver_level = 0\n"
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        })
        .expect("load from file");

        assert_eq!(config.database.url, "sqlite://custom.db");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.roles.min_approver_level, 0);
        assert!(config.roles.hierarchy().authorizes("employee", "employee"));
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: true,
            overrides: ConfigOverrides::default(),
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }

    #[test]
    fn enabled_notifier_requires_an_api_key() {
        let mut config = AppConfig::default();
        config.notifier.enabled = true;

        let error = config.validate().expect_err("missing api key must fail validation");
        assert!(matches!(error, ConfigError::Validation(_)));
    }

    #[test]
    fn non_sqlite_database_url_is_rejected() {
        let mut config = AppConfig::default();
        config.database.url = "postgres://localhost/assetflow".to_string();

        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }
}
