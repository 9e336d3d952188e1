//! CLI module for graph-ogm.
//!
//! Subcommands:
//! - `check`: Connect to the configured database and ensure the graph exists
//! - `find`: Query nodes of one label and print them as JSON lines

mod check;
mod find;

use clap::{Parser, Subcommand};

pub use find::FindCommand;

/// graph-ogm - object-graph mapper over PostgreSQL + Apache AGE
#[derive(Parser)]
#[command(name = "graph-ogm")]
#[command(about = "Object-graph mapper for PostgreSQL + Apache AGE")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check connectivity and create the graph if it is missing
    Check,

    /// Find nodes by label, property filters and ordering
    Find(FindCommand),
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Check => self.run_check().await,
            Command::Find(ref cmd) => cmd.run().await,
        }
    }
}
