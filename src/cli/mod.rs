//! Command line entry points
//!
//! - `serve`: run the HTTP API
//! - `migrate`: apply or revert PostgreSQL schema migrations

pub mod migrate;
pub mod serve;

use clap::{Parser, Subcommand};

/// Language course enrollment service
#[derive(Parser)]
#[command(name = "language-courses")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve(serve::ServeArgs),

    /// Manage the PostgreSQL schema and exit
    Migrate(migrate::MigrateArgs),
}
