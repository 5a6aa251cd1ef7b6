pub mod commands;

use clap::{Parser, Subcommand};
use shelfbot_agent::ChatMode;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shelfbot",
    about = "Shelfbot operator CLI",
    long_about = "Prepare the catalog database, inspect configuration, check readiness, and talk to the catalog chatbot.",
    after_help = "Examples:\n  shelfbot migrate\n  shelfbot seed\n  shelfbot doctor --json\n  shelfbot chat \"Check stock for Cool T-Shirt\"\n  shelfbot chat --mode ai \"Which products are running low?\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo catalog fixture and verify row counts")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, generative backend readiness, and database access")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Send one message to the chatbot against the configured database")]
    Chat {
        #[arg(help = "Message text, e.g. \"Show all products\"")]
        message: String,
        #[arg(long, value_parser = ["structured", "ai"], ignore_case = true, help = "Processing mode")]
        mode: Option<String>,
        #[arg(long, help = "Emit the reply payload as JSON")]
        json: bool,
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
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Chat { message, mode, json } => {
            commands::chat::run(&message, ChatMode::from_request(mode.as_deref()), json)
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
