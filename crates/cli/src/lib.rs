pub mod bootstrap;
pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "canvass",
    about = "Canvass operator CLI",
    long_about = "Run agents, apply migrations, inspect configuration and check provider readiness.",
    after_help = "Examples:\n  canvass doctor --json\n  canvass config\n  \
                  canvass run --profile P-1 --agent lead_discovery --input '{\"keywords\":[\"burst pipe\"]}'"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, database connectivity and provider credentials")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Launch one agent run for a profile and print the finished run as JSON")]
    Run {
        #[arg(long, help = "Profile id the run belongs to")]
        profile: String,
        #[arg(long, help = "lead_discovery | outreach_writer | intel_report | sentiment_scan")]
        agent: String,
        #[arg(long, help = "Run input as a JSON object")]
        input: Option<String>,
        #[arg(long, help = "Contact id for contact-scoped agents")]
        contact: Option<String>,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    if let Err(error) = logging::init() {
        eprintln!("{error}");
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Run { profile, agent, input, contact } => {
            commands::run::run(commands::run::RunArgs { profile, agent, input, contact })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
