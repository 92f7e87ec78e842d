pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "hanbot-admin",
    about = "Hanbot operator CLI",
    long_about = "Create and migrate the bot's two SQLite databases, load demo content, and check readiness.",
    after_help = "Examples:\n  hanbot-admin migrate\n  hanbot-admin seed\n  hanbot-admin doctor --json"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Create missing database files and apply pending migrations to both")]
    Migrate,
    #[command(about = "Migrate, then load the demo jokes, lunch list, and responses")]
    Seed,
    #[command(about = "Validate config and check both databases with per-table row counts")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
