use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "togglaunch", version)]
#[command(about = "Start, stop and restart Toggl Track timers from a launcher")]
pub struct Cli {
    /// Read preferences from this file instead of ~/.togglaunch.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Answer launcher events as JSON lines on stdin/stdout
    Serve,
    /// Route one query and print the resulting options
    Query {
        /// Print the render payload as JSON
        #[arg(long)]
        json: bool,
        /// Query text; empty shows the running timer
        text: Vec<String>,
    },
    /// Interactive launcher in the terminal
    Tui,
}
