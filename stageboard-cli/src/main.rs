//! Stageboard CLI
//!
//! Commands:
//! - `stageboard init`: Create a `.stageboard` directory here
//! - `stageboard stages [--from <stage>]`: List stages
//! - `stageboard add <name>`: Add an entity
//! - `stageboard show [--json]`: Show the board
//! - `stageboard move <id> <stage>`: Move an entity through the transition pipeline
//! - `stageboard contact <id>`: Log a contact
//!
//! Exit codes:
//! - 0: Success
//! - 1: Error, including a rolled-back transition

use clap::Parser;
use tracing_subscriber::EnvFilter;

use stageboard_cli::commands::{self, NewEntity};
use stageboard_cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("stageboard=debug,stageboard_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = result_to_exit(dispatch_command(cli).await);
    std::process::exit(exit_code);
}

/// Dispatch a parsed CLI to the appropriate command handler.
async fn dispatch_command(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    if let Commands::Init = cli.command {
        return commands::init(cli.board, &cwd).await;
    }

    let backend = commands::resolve_backend(cli.board.as_deref(), &cwd)?;
    match cli.command {
        Commands::Init => Ok(()),
        Commands::Stages { from } => commands::stages(backend, from).await,
        Commands::Add {
            name,
            stage,
            priority,
            email,
            telegram,
        } => {
            commands::add(
                backend,
                NewEntity {
                    name,
                    stage,
                    priority,
                    email,
                    telegram,
                },
            )
            .await
        }
        Commands::Show { json } => commands::show(backend, json).await,
        Commands::Move { id, stage } => commands::move_entity(backend, id, stage).await,
        Commands::Contact { id, note } => commands::contact(backend, id, note).await,
    }
}

/// Convert a `Result<(), E: Display>` to an exit code.
fn result_to_exit<E: std::fmt::Display>(result: Result<(), E>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}
