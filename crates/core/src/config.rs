use std::env;
use std::fmt::Display;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::WallClock;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    pub attendance: AttendanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Messaging gateway endpoint. Without an `api_base_url` outbound messages
/// are only logged.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub api_base_url: Option<String>,
    pub channel_token: SecretString,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub tick_secs: u64,
}

#[derive(Clone, Debug)]
pub struct AttendanceConfig {
    pub utc_offset_minutes: i32,
}

impl AttendanceConfig {
    pub fn wall_clock(&self) -> Result<WallClock, ConfigError> {
        WallClock::from_offset_minutes(self.utc_offset_minutes).ok_or_else(|| {
            ConfigError::Validation(
                "attendance.utc_offset_minutes must be in range -1439..=1439".to_string(),
            )
        })
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub gateway_api_base_url: Option<String>,
    pub gateway_channel_token: Option<String>,
    pub scheduler_enabled: Option<bool>,
    pub utc_offset_minutes: Option<i32>,
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
                url: "sqlite://timeclock.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            gateway: GatewayConfig {
                api_base_url: None,
                channel_token: String::new().into(),
                timeout_secs: 10,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            scheduler: SchedulerConfig { enabled: true, tick_secs: 60 },
            attendance: AttendanceConfig { utc_offset_minutes: 9 * 60 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.apply_patch(read_patch(&path)?),
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from("timeclock.toml"));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            replace(&mut self.database.url, database.url);
            replace(&mut self.database.max_connections, database.max_connections);
            replace(&mut self.database.timeout_secs, database.timeout_secs);
        }
        if let Some(gateway) = patch.gateway {
            if gateway.api_base_url.is_some() {
                self.gateway.api_base_url = gateway.api_base_url;
            }
            replace(&mut self.gateway.channel_token, gateway.channel_token.map(SecretString::from));
            replace(&mut self.gateway.timeout_secs, gateway.timeout_secs);
        }
        if let Some(server) = patch.server {
            replace(&mut self.server.bind_address, server.bind_address);
            replace(&mut self.server.port, server.port);
            replace(&mut self.server.graceful_shutdown_secs, server.graceful_shutdown_secs);
        }
        if let Some(scheduler) = patch.scheduler {
            replace(&mut self.scheduler.enabled, scheduler.enabled);
            replace(&mut self.scheduler.tick_secs, scheduler.tick_secs);
        }
        if let Some(attendance) = patch.attendance {
            replace(&mut self.attendance.utc_offset_minutes, attendance.utc_offset_minutes);
        }
        if let Some(logging) = patch.logging {
            replace(&mut self.logging.level, logging.level);
            replace(&mut self.logging.format, logging.format);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        env_override("TIMECLOCK_DATABASE_URL", &mut self.database.url)?;
        env_override("TIMECLOCK_DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections)?;
        env_override("TIMECLOCK_DATABASE_TIMEOUT_SECS", &mut self.database.timeout_secs)?;

        if let Some(url) = read_env("TIMECLOCK_GATEWAY_API_BASE_URL") {
            self.gateway.api_base_url = Some(url);
        }
        if let Some(token) = read_env("TIMECLOCK_GATEWAY_CHANNEL_TOKEN") {
            self.gateway.channel_token = token.into();
        }
        env_override("TIMECLOCK_GATEWAY_TIMEOUT_SECS", &mut self.gateway.timeout_secs)?;

        env_override("TIMECLOCK_SERVER_BIND_ADDRESS", &mut self.server.bind_address)?;
        env_override("TIMECLOCK_SERVER_PORT", &mut self.server.port)?;
        env_override(
            "TIMECLOCK_SERVER_GRACEFUL_SHUTDOWN_SECS",
            &mut self.server.graceful_shutdown_secs,
        )?;

        env_override("TIMECLOCK_SCHEDULER_ENABLED", &mut self.scheduler.enabled)?;
        env_override("TIMECLOCK_SCHEDULER_TICK_SECS", &mut self.scheduler.tick_secs)?;

        env_override(
            "TIMECLOCK_ATTENDANCE_UTC_OFFSET_MINUTES",
            &mut self.attendance.utc_offset_minutes,
        )?;

        // `TIMECLOCK_LOG_*` is the short spelling; the section name wins.
        if let Some(level) =
            read_env("TIMECLOCK_LOGGING_LEVEL").or_else(|| read_env("TIMECLOCK_LOG_LEVEL"))
        {
            self.logging.level = level;
        }
        if let Some(format) =
            read_env("TIMECLOCK_LOGGING_FORMAT").or_else(|| read_env("TIMECLOCK_LOG_FORMAT"))
        {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        replace(&mut self.database.url, overrides.database_url);
        replace(&mut self.logging.level, overrides.log_level);
        if overrides.gateway_api_base_url.is_some() {
            self.gateway.api_base_url = overrides.gateway_api_base_url;
        }
        replace(
            &mut self.gateway.channel_token,
            overrides.gateway_channel_token.map(SecretString::from),
        );
        replace(&mut self.scheduler.enabled, overrides.scheduler_enabled);
        replace(&mut self.attendance.utc_offset_minutes, overrides.utc_offset_minutes);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let database = &self.database;
        if !is_sqlite_url(&database.url) {
            return Err(invalid(
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
            ));
        }
        positive("database.max_connections", database.max_connections)?;
        in_range("database.timeout_secs", database.timeout_secs, 1..=300)?;

        let gateway = &self.gateway;
        in_range("gateway.timeout_secs", gateway.timeout_secs, 1..=120)?;
        if let Some(base_url) = &gateway.api_base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(invalid("gateway.api_base_url must start with http:// or https://"));
            }
            if gateway.channel_token.expose_secret().trim().is_empty() {
                return Err(invalid(
                    "gateway.channel_token is required when gateway.api_base_url is set",
                ));
            }
        }

        positive("server.port", self.server.port)?;
        positive("server.graceful_shutdown_secs", self.server.graceful_shutdown_secs)?;
        in_range("scheduler.tick_secs", self.scheduler.tick_secs, 1..=3_600)?;
        self.attendance.wall_clock()?;

        match self.logging.level.trim().to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(invalid("logging.level must be one of trace|debug|info|warn|error")),
        }
    }
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_owned())
}

fn in_range<T>(field: &str, value: T, range: RangeInclusive<T>) -> Result<(), ConfigError>
where
    T: PartialOrd + Display,
{
    if range.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::Validation(format!(
        "{field} must be in range {}..={}",
        range.start(),
        range.end()
    )))
}

fn positive<T: Default + PartialOrd>(field: &str, value: T) -> Result<(), ConfigError> {
    if value > T::default() {
        return Ok(());
    }
    Err(ConfigError::Validation(format!("{field} must be greater than zero")))
}

fn is_sqlite_url(url: &str) -> bool {
    let url = url.trim();
    url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:"
}

/// An explicit path that does not exist resolves to nothing rather than
/// falling back to the default locations.
fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => ["timeclock.toml", "config/timeclock.toml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|path| path.exists()),
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str(&interpolate_env_vars(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands every `${VAR}` in the raw file text.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &tail[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_owned() })?;
        output.push_str(&value);
        rest = &tail[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_override<T: FromStr>(key: &str, slot: &mut T) -> Result<(), ConfigError> {
    let Some(value) = read_env(key) else {
        return Ok(());
    };
    *slot = value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.clone(),
    })?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    gateway: Option<GatewayPatch>,
    server: Option<ServerPatch>,
    scheduler: Option<SchedulerPatch>,
    attendance: Option<AttendancePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayPatch {
    api_base_url: Option<String>,
    channel_token: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct SchedulerPatch {
    enabled: Option<bool>,
    tick_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AttendancePatch {
    utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
