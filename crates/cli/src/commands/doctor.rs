use secrecy::ExposeSecret;
use serde::Serialize;
use timeclock_core::config::{AppConfig, LoadOptions};
use timeclock_db::{connect_with_config, ping};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Exit code is 0 when every check passes and 1 otherwise.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let checks = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            },
            check_attendance_clock(&config),
            check_gateway_readiness(&config),
            check_database_connectivity(&config),
        ],
        Err(error) => vec![
            DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            },
            skipped("attendance_clock"),
            skipped("gateway_readiness"),
            skipped("database_connectivity"),
        ],
    };

    summarize(checks)
}

fn summarize(checks: Vec<DoctorCheck>) -> DoctorReport {
    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn skipped(name: &'static str) -> DoctorCheck {
    DoctorCheck {
        name,
        status: CheckStatus::Skipped,
        details: "skipped because configuration did not load".to_string(),
    }
}

fn check_attendance_clock(config: &AppConfig) -> DoctorCheck {
    match config.attendance.wall_clock() {
        Ok(clock) => DoctorCheck {
            name: "attendance_clock",
            status: CheckStatus::Pass,
            details: format!(
                "UTC offset {} minutes, local time now {}",
                config.attendance.utc_offset_minutes,
                clock.now().format("%Y-%m-%d %H:%M")
            ),
        },
        Err(error) => DoctorCheck {
            name: "attendance_clock",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

/// Without a base URL the messenger only logs, which is valid for local runs.
fn check_gateway_readiness(config: &AppConfig) -> DoctorCheck {
    let gateway = &config.gateway;
    match gateway.api_base_url.as_deref() {
        None => DoctorCheck {
            name: "gateway_readiness",
            status: CheckStatus::Pass,
            details: "no gateway.api_base_url; outbound messages are logged only".to_string(),
        },
        Some(base_url) if gateway.channel_token.expose_secret().trim().is_empty() => DoctorCheck {
            name: "gateway_readiness",
            status: CheckStatus::Fail,
            details: format!("gateway `{base_url}` configured without a channel token"),
        },
        Some(base_url) => DoctorCheck {
            name: "gateway_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "delivering through `{base_url}` with a {}s request timeout",
                gateway.timeout_secs
            ),
        },
    }
}

fn check_database_connectivity(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "database_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| format!("failed to connect to database: {error}"))?;
        let pinged = ping(&pool).await.map_err(|error| format!("database query failed: {error}"));

        pool.close().await;
        pinged
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "database_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.database.url),
        },
        Err(error) => {
            DoctorCheck { name: "database_connectivity", status: CheckStatus::Fail, details: error }
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
