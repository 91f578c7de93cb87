//! CLI definition for the stageboard command-line interface.
//!
//! Only depends on `clap` and `std`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Stageboard - move entities through a staged pipeline
#[derive(Parser, Debug)]
#[command(name = "stageboard")]
#[command(version)]
#[command(about = "Pipeline board with optimistic stage transitions")]
pub struct Cli {
    /// Enable debug output to stderr
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Board directory (default: nearest .stageboard walking up from the current directory)
    #[arg(short, long, global = true)]
    pub board: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a board directory
    Init,
    /// List the configured stages
    Stages {
        /// Only show stages an entity in this stage can move to
        #[arg(long)]
        from: Option<String>,
    },
    /// Add an entity to the board
    Add {
        /// Display name
        name: String,
        /// Starting stage (default: first configured stage)
        #[arg(short, long)]
        stage: Option<String>,
        /// high, medium or low
        #[arg(short, long, default_value = "medium")]
        priority: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        telegram: Option<String>,
    },
    /// Show the board grouped by stage
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move an entity to another stage
    Move {
        /// Entity id
        id: String,
        /// Target stage
        stage: String,
    },
    /// Log a contact with an entity
    Contact {
        /// Entity id
        id: String,
        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
    },
}
