use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use timeclock_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in effective_values(&config) {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String, &'static str)> {
    vec![
        ("database.url", config.database.url.clone(), "TIMECLOCK_DATABASE_URL"),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            "TIMECLOCK_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            "TIMECLOCK_DATABASE_TIMEOUT_SECS",
        ),
        (
            "gateway.api_base_url",
            config.gateway.api_base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            "TIMECLOCK_GATEWAY_API_BASE_URL",
        ),
        (
            "gateway.channel_token",
            redact_token(config.gateway.channel_token.expose_secret()),
            "TIMECLOCK_GATEWAY_CHANNEL_TOKEN",
        ),
        (
            "gateway.timeout_secs",
            config.gateway.timeout_secs.to_string(),
            "TIMECLOCK_GATEWAY_TIMEOUT_SECS",
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            "TIMECLOCK_SERVER_BIND_ADDRESS",
        ),
        ("server.port", config.server.port.to_string(), "TIMECLOCK_SERVER_PORT"),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            "TIMECLOCK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        ),
        (
            "scheduler.enabled",
            config.scheduler.enabled.to_string(),
            "TIMECLOCK_SCHEDULER_ENABLED",
        ),
        (
            "scheduler.tick_secs",
            config.scheduler.tick_secs.to_string(),
            "TIMECLOCK_SCHEDULER_TICK_SECS",
        ),
        (
            "attendance.utc_offset_minutes",
            config.attendance.utc_offset_minutes.to_string(),
            "TIMECLOCK_ATTENDANCE_UTC_OFFSET_MINUTES",
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            "TIMECLOCK_LOGGING_LEVEL",
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            "TIMECLOCK_LOGGING_FORMAT",
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("timeclock.toml"), PathBuf::from("config/timeclock.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let short_alias = env_key.replace("_LOGGING_", "_LOG_");
    if let Some(set_key) =
        [env_key, short_alias.as_str()].into_iter().find(|key| env::var_os(key).is_some())
    {
        return format!("env ({set_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps the last four characters of long tokens so operators can tell
/// two credentials apart without exposing either.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() < 12 {
        return "<redacted>".to_string();
    }

    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}
