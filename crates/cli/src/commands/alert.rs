use chrono::{Duration, NaiveDateTime};
use timeclock_assistant::{AlertDispatcher, Stores};
use timeclock_gateway::messenger::messenger_from_config;

use crate::commands::{open_migrated, prepare, CommandResult};

/// One alert scan over `[now - since_minutes, now]` in attendance wall-clock
/// time. Shares the dedupe table with the server scheduler, so running it
/// alongside a live server never doubles a reminder round.
pub fn run(since_minutes: u32) -> CommandResult {
    let (config, runtime) = match prepare("alert") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let clock = match config.attendance.wall_clock() {
        Ok(clock) => clock,
        Err(error) => {
            return CommandResult::failure("alert", "config_validation", error.to_string(), 2);
        }
    };

    let result = runtime.block_on(async {
        let messenger = messenger_from_config(&config.gateway)
            .map_err(|error| ("gateway_setup", error.to_string(), 3u8))?;
        let pool = open_migrated(&config).await?;

        let (begin, end) = window(clock.now(), since_minutes);
        let dispatched = AlertDispatcher::new(Stores::sql(pool.clone(), messenger))
            .dispatch(begin, end)
            .await
            .map(|sent| (begin, end, sent))
            .map_err(|error| ("alert_dispatch", error.to_string(), 7u8));

        pool.close().await;
        dispatched
    });

    match result {
        Ok((begin, end, sent)) => CommandResult::success(
            "alert",
            format!("pushed {sent} reminder(s) for window {begin} .. {end}"),
        ),
        Err(failure) => CommandResult::from_failure("alert", failure),
    }
}

fn window(now: NaiveDateTime, since_minutes: u32) -> (NaiveDateTime, NaiveDateTime) {
    (now - Duration::minutes(i64::from(since_minutes)), now)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::window;

    #[test]
    fn window_ends_now_and_spans_the_requested_minutes() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 3)
            .and_then(|day| day.and_hms_opt(9, 32, 0))
            .expect("timestamp");

        let (begin, end) = window(now, 5);

        assert_eq!(end, now);
        assert_eq!(begin.to_string(), "2024-06-03 09:27:00");
    }

    #[test]
    fn zero_minutes_scans_a_single_instant() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 3)
            .and_then(|day| day.and_hms_opt(9, 30, 0))
            .expect("timestamp");

        assert_eq!(window(now, 0), (now, now));
    }
}
