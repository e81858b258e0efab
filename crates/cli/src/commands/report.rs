use std::sync::Arc;

use serde_json::Value;
use timeclock_assistant::report::{day_attendance_list, render_month_report};
use timeclock_assistant::Stores;
use timeclock_core::calendar::parse_year_month;
use timeclock_core::domain::user::UserId;
use timeclock_core::messaging::RecordingMessenger;

use crate::commands::{open_migrated, prepare, CommandResult};

enum ReportOutput {
    Text(String),
    Days { count: usize, data: Value },
}

/// With `--user`, prints the same text the chat list flow replies with.
/// Without it, lists every user's days for the month as JSON.
pub fn run(month: &str, user: Option<i64>) -> CommandResult {
    let Some(month) = parse_year_month(month) else {
        return CommandResult::failure(
            "report",
            "argument_validation",
            format!("`{month}` is not a month; expected yyyyMM, yyyy/M or yyyy-M"),
            2,
        );
    };

    let (config, runtime) = match prepare("report") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;
        // Reports never send anything; the recorder satisfies the store bundle.
        let stores = Stores::sql(pool.clone(), Arc::new(RecordingMessenger::default()));

        let output = match user {
            Some(user_id) => render_month_report(&stores, UserId(user_id), month)
                .await
                .map(ReportOutput::Text)
                .map_err(|error| ("report_query", error.to_string(), 7u8)),
            None => day_attendance_list(stores.attendance.as_ref(), month)
                .await
                .map_err(|error| ("report_query", error.to_string(), 7u8))
                .and_then(|days| {
                    let count = days.len();
                    serde_json::to_value(days)
                        .map(|data| ReportOutput::Days { count, data })
                        .map_err(|error| ("serialization", error.to_string(), 7u8))
                }),
        };

        pool.close().await;
        output
    });

    match result {
        Ok(ReportOutput::Text(text)) => CommandResult::success("report", text),
        Ok(ReportOutput::Days { count, data }) => CommandResult::success_with_data(
            "report",
            format!("{count} attendance day(s) in {month}"),
            Some(data),
        ),
        Err(failure) => CommandResult::from_failure("report", failure),
    }
}
