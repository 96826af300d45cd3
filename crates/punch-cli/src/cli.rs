//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Employee punch clock.
///
/// Records check-in/check-out events per user, derives worked and
/// overtime hours, and publishes domain events to the message bus.
#[derive(Debug, Parser)]
#[command(name = "punch", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a check-in for a user.
    In {
        /// The user punching in.
        #[arg(long)]
        user: i64,
    },

    /// Register a check-out for a user.
    Out {
        /// The user punching out.
        #[arg(long)]
        user: i64,
    },

    /// Show a user's punch history as JSON lines.
    History {
        #[arg(long)]
        user: i64,

        /// Inclusive range start (ISO 8601).
        #[arg(long)]
        start: Option<String>,

        /// Inclusive range end (ISO 8601).
        #[arg(long)]
        end: Option<String>,
    },

    /// Show worked and overtime hours for a user over a range.
    Summary {
        #[arg(long)]
        user: i64,

        /// Inclusive range start (ISO 8601).
        #[arg(long)]
        start: Option<String>,

        /// Inclusive range end (ISO 8601).
        #[arg(long)]
        end: Option<String>,
    },

    /// Generate the administrative CSV report for a range.
    Report {
        /// Inclusive range start (ISO 8601).
        #[arg(long)]
        start: String,

        /// Inclusive range end (ISO 8601).
        #[arg(long)]
        end: String,

        /// Output path; defaults to the fixed report filename.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Administrative claim supplied by the external authorizer.
        #[arg(long)]
        admin: bool,
    },

    /// Inspect or replace attendance settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

/// Settings subcommands.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Print the active settings.
    Show,

    /// Replace the active settings record.
    Set {
        /// Standard workday length in hours.
        #[arg(long)]
        workday_hours: f64,

        /// Overtime display multiplier.
        #[arg(long)]
        overtime_rate: f64,

        /// Administrative claim supplied by the external authorizer.
        #[arg(long)]
        admin: bool,
    },
}
