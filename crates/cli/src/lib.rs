pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "timeclock",
    about = "Timeclock operator CLI",
    long_about = "Operate timeclock migrations, demo data, config inspection, readiness checks, \
                  alert dispatch and attendance reports.",
    after_help = "Examples:\n  timeclock doctor --json\n  timeclock alert --since-minutes 5\n  \
                  timeclock report --month 202406 --user 3"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo organization users (idempotent)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, gateway readiness, and DB connectivity checks")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Run one missing-punch alert scan over the trailing window")]
    Alert {
        #[arg(long, default_value_t = 5, help = "Window length ending now, in minutes")]
        since_minutes: u32,
    },
    #[command(about = "Print a month of attendance for one user, or every user as JSON")]
    Report {
        #[arg(long, help = "Month as yyyyMM, yyyy/M or yyyy-M")]
        month: String,
        #[arg(long, help = "User id; omit to list every user's days")]
        user: Option<i64>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Alert { since_minutes } => commands::alert::run(since_minutes),
        Command::Report { month, user } => commands::report::run(&month, user),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
