use crate::commands::{open_migrated, prepare, CommandFailure, CommandResult};
use timeclock_db::{DemoOrganization, SeededUser};

pub fn run() -> CommandResult {
    let (config, runtime) = match prepare("seed") {
        Ok(prepared) => prepared,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated(&config).await?;

        let seed_result = DemoOrganization::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoOrganization::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<Vec<SeededUser>, CommandFailure> = if verification.all_present {
            Ok(seed_result.users_seeded)
        } else {
            Err(("seed_verification", verification_message(&verification.checks), 6u8))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(users) => {
            let lines: Vec<String> = users.iter().map(describe_user).collect();
            let message =
                format!("demo organization loaded ({} users):\n{}", users.len(), lines.join("\n"));
            CommandResult::success("seed", message)
        }
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn describe_user(user: &SeededUser) -> String {
    format!(
        "  - {} {} ({}, messaging: {})",
        user.id,
        user.name,
        user.role,
        user.messaging_id.unwrap_or("<unlinked>")
    )
}

fn verification_message(checks: &[(&str, bool)]) -> String {
    let failed_checks =
        checks.iter().filter_map(|(check, passed)| (!passed).then_some(*check)).collect::<Vec<_>>();

    if failed_checks.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed_checks.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use timeclock_db::SeededUser;

    use super::{describe_user, verification_message};

    #[test]
    fn verification_error_message_targets_failed_checks() {
        let checks = [("Aiko Admin", true), ("Mika Manager", false), ("Rin Unlinked", false)];

        assert_eq!(
            verification_message(&checks),
            "Seed verification failed for checks: Mika Manager, Rin Unlinked"
        );
    }

    #[test]
    fn verification_error_message_falls_back_to_generic_when_no_labels() {
        let checks = [("Aiko Admin", true), ("Mika Manager", true)];

        assert_eq!(verification_message(&checks), "Some seed data failed to load");
    }

    #[test]
    fn unlinked_users_are_marked() {
        let user = SeededUser { id: 5, messaging_id: None, name: "Rin Unlinked", role: "employee" };

        assert_eq!(describe_user(&user), "  - 5 Rin Unlinked (employee, messaging: <unlinked>)");
    }
}
