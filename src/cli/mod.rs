//! CLI module - Command-line interface for Premierr

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Premierr - Jellyfin "new media" notifications for Telegram
#[derive(Parser)]
#[command(name = "premierr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default search locations
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Default)]
pub enum Commands {
    /// Run the webhook server
    #[default]
    Serve,

    /// Validate the configuration and print a summary
    Check {
        /// Also call Jellyfin and Telegram to verify the credentials
        #[arg(long)]
        remote: bool,
    },

    /// Feed a saved webhook payload through the pipeline once
    Replay {
        /// JSON file holding the payload
        file: PathBuf,
    },
}

pub use commands::*;
