pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use concierge_core::config::{AppConfig, LoadOptions};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "concierge",
    about = "Hotel concierge operator CLI",
    long_about = "Prepare the booking store, inspect configuration and readiness, and invoke concierge tools by hand.",
    after_help = "Examples:\n  concierge seed\n  concierge doctor --json\n  concierge tool check_room_availability --args '{\"room_type\":\"Deluxe King\",\"check_in\":\"2026-01-22\",\"check_out\":\"2026-01-24\"}'"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the hotel reference data (room categories, units, service menu)")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Check config, DB connectivity, reference data and bill artifacts")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Invoke an orchestrator tool by name and print its status line")]
    Tool {
        #[arg(help = "Tool name, e.g. finalize_hotel_booking", required_unless_present = "list")]
        name: Option<String>,
        #[arg(long, help = "JSON arguments object passed to the tool")]
        args: Option<String>,
        #[arg(long, help = "Print the tool definitions instead of invoking one", conflicts_with = "args")]
        list: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Seed => "seed",
            Self::Config => "config",
            Self::Doctor { .. } => "doctor",
            Self::Tool { .. } => "tool",
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        logging::init(&config);
    }

    let command_name = cli.command.name();
    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Tool { list: true, .. } => commands::tool::list(),
        Command::Tool { name, args, .. } => {
            commands::tool::run(name.as_deref().unwrap_or_default(), args.as_deref())
        }
    };

    tracing::info!(
        event_name = "system.cli.completed",
        command = command_name,
        exit_code = result.exit_code,
        "command finished"
    );
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
