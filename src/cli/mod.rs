//! Command-line interface for Techinder, parsed with clap.

mod commands;

use clap::{Parser, Subcommand};

/// Techinder - find collaborators for your projects
#[derive(Parser)]
#[command(name = "techinder")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    Init,

    /// Apply pending database migrations
    Migrate,

    /// Issue a new identifier
    GenerateId {
        /// Kind of identifier (user, project, channel, misconduct, like,
        /// application, location, message) or its prefix
        kind: String,
        /// Only suggest an unused identifier, without recording it
        #[arg(long)]
        sample: bool,
    },

    /// Manage misconduct report cases
    ReportCases {
        #[command(subcommand)]
        command: ReportCaseCommands,
    },
}

#[derive(Subcommand)]
pub enum ReportCaseCommands {
    /// List report cases
    #[command(alias = "ls")]
    List,
    /// Add a report case
    Add {
        /// Case type, e.g. "Fake Profile"
        case_type: String,
        /// What the case covers
        description: String,
    },
}

pub use commands::*;
