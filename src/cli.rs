//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

/// tickq - deterministic tick-driven event scheduler
#[derive(Parser, Debug)]
#[command(name = "tickq")]
#[command(version)]
#[command(about = "Schedule named callbacks against a simulated clock")]
#[command(
    long_about = "tickq keeps a persistent queue of named events, fires them in tick order, and saves whatever is still pending between runs."
)]
pub struct Cli {
    /// Configuration file (TOML, or JSON by extension)
    #[arg(short, long, global = true, default_value = "tickq.toml")]
    pub config: PathBuf,

    /// Save file, overriding the configured one
    #[arg(short, long, global = true)]
    pub save: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Advance the clock, firing due events
    Run {
        /// First tick to simulate
        #[arg(long, allow_negative_numbers = true)]
        from: Option<i64>,

        /// Number of ticks to simulate
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Schedule a function or function tag
    #[command(group(ArgGroup::new("target").required(true).args(["function", "tag"])))]
    Schedule {
        /// Function to run
        #[arg(short, long)]
        function: Option<String>,

        /// Function tag to run
        #[arg(short, long)]
        tag: Option<String>,

        /// Tick to fire at
        #[arg(long, allow_negative_numbers = true)]
        at: i64,

        /// Event name (defaults to the function, or `#tag`)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Cancel every pending event with a name
    Cancel {
        /// Event name
        name: String,
    },

    /// List pending events in firing order
    List,
}
